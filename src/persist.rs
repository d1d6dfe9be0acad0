// src/persist.rs
//! Small file helpers shared by the durable stores

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append one line to `path`, creating the file and its parent directory.
///
/// The line is written with a single `write_all` and synced before the handle
/// is dropped, so a reader never sees half a line from this call.
pub async fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {:?} for append", path))?;

    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');

    file.write_all(buf.as_bytes())
        .await
        .with_context(|| format!("Failed to append to {:?}", path))?;
    file.flush().await?;
    file.sync_data()
        .await
        .with_context(|| format!("Failed to sync {:?}", path))?;

    Ok(())
}

/// Replace `path` with `contents` via a temporary file and rename
pub async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }

    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, contents)
        .await
        .context("Failed to write temporary file")?;

    fs::rename(&temp_path, path)
        .await
        .context("Failed to rename temporary file")?;

    Ok(())
}

/// Read a file as lines. A missing file reads as empty.
pub async fn read_lines_if_exists(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
    }
}
