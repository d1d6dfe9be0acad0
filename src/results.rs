// src/results.rs
//! Per-target result files

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::persist;
use crate::targets::TargetDomain;

/// Appends discovered domains to one file per target
#[derive(Debug, Clone)]
pub struct ResultSink {
    dir: PathBuf,
}

impl ResultSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for `target`, with anything outside `[a-z0-9._-]` replaced by `_`
    pub fn path_for(&self, target: &TargetDomain) -> PathBuf {
        self.dir.join(file_name_for(target.as_str()))
    }

    pub async fn append(&self, target: &TargetDomain, domain: &str) -> Result<()> {
        persist::append_line(&self.path_for(target), domain).await
    }

    /// Truncate the file for `target`. A missing file is left missing.
    pub async fn clear(&self, target: &TargetDomain) -> Result<()> {
        let path = self.path_for(target);

        match fs::metadata(&path).await {
            Ok(_) => {
                fs::write(&path, b"")
                    .await
                    .with_context(|| format!("Failed to clear result file {:?}", path))?;
                debug!("Cleared result file {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to stat result file {:?}", path)),
        }
    }

    /// Domains currently recorded for `target`
    pub async fn read(&self, target: &TargetDomain) -> Result<Vec<String>> {
        persist::read_lines_if_exists(&self.path_for(target)).await
    }
}

fn file_name_for(target: &str) -> String {
    let name: String = target
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();

    // Keep "." and ".." from escaping the results directory
    if name.chars().all(|c| c == '.') {
        name.replace('.', "_")
    } else {
        name
    }
}
