// src/targets.rs
//! Target domain list loading

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::matcher::DomainMatcher;

/// A domain to watch, normalized to lowercase without a leading `*.`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDomain(String);

impl TargetDomain {
    /// Normalize a raw entry. Returns `None` for entries that end up empty.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = DomainMatcher::normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TargetDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parse a newline-delimited target list.
///
/// Blank lines and `#` comments are skipped, duplicates dropped, order kept.
pub fn parse_targets(content: &str) -> Vec<TargetDomain> {
    let mut seen = HashSet::new();

    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(TargetDomain::new)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Load targets from a file. A missing file or an empty list is an error.
pub fn load_targets(path: &Path) -> Result<Vec<TargetDomain>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read target list {:?}", path))?;

    let targets = parse_targets(&content);
    if targets.is_empty() {
        anyhow::bail!("Target list {:?} contains no domains", path);
    }

    Ok(targets)
}
