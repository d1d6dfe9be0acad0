// src/seen.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::matcher::DomainMatcher;
use crate::persist;
use crate::stats::StatsCollector;

/// Durable set of every domain ever reported.
///
/// Backed by an append-only file with one normalized domain per line.
/// Entries are never removed.
pub struct SeenStore {
    path: PathBuf,
    domains: HashSet<String>,
    stats: Option<StatsCollector>,
}

impl SeenStore {
    /// Load the store from `path`.
    ///
    /// A missing file gives an empty store. So does an unreadable one, with a
    /// warning; this never fails.
    pub async fn load(path: PathBuf) -> Self {
        let mut domains = HashSet::new();

        match fs::read_to_string(&path).await {
            Ok(contents) => {
                domains.extend(
                    contents
                        .lines()
                        .map(DomainMatcher::normalize)
                        .filter(|d| !d.is_empty()),
                );
                info!("Loaded {} seen domains from {:?}", domains.len(), path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Seen-domain log {:?} does not exist, starting fresh", path);
            }
            Err(e) => {
                warn!(
                    "Failed to read seen-domain log {:?}: {}. Starting with an empty set",
                    path, e
                );
            }
        }

        Self {
            path,
            domains,
            stats: None,
        }
    }

    /// Count persistence failures in `stats`
    pub fn with_stats(mut self, stats: StatsCollector) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    /// Record `domain` as seen. Returns false if it already was.
    ///
    /// The in-memory insert happens first. A failed durable append is logged
    /// and otherwise ignored; the domain will be detected again after a
    /// restart if the source still reports it.
    pub async fn add(&mut self, domain: &str) -> bool {
        if !self.domains.insert(domain.to_string()) {
            return false;
        }

        if let Err(e) = persist::append_line(&self.path, domain).await {
            warn!("Failed to persist seen domain {}: {:#}", domain, e);
            if let Some(stats) = &self.stats {
                stats.increment_persistence_failures();
            }
        } else {
            debug!("Recorded seen domain {}", domain);
        }

        true
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
