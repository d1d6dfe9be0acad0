// src/baseline.rs
//! First-run baseline tracking
//!
//! The gate is in [`GateMode::Baseline`] until a marker file exists in the
//! state directory. Once written, the marker is never removed by the monitor.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::persist;

/// Marker file name inside the state directory
pub const BASELINE_FLAG_FILE: &str = "baseline_complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Record domains silently
    Baseline,
    /// Write result files and notify
    Monitoring,
}

impl GateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateMode::Baseline => "baseline",
            GateMode::Monitoring => "monitoring",
        }
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct BaselineGate {
    flag_path: PathBuf,
}

impl BaselineGate {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            flag_path: state_dir.join(BASELINE_FLAG_FILE),
        }
    }

    pub fn flag_path(&self) -> &Path {
        &self.flag_path
    }

    /// Current mode, read from disk on every call
    pub async fn current_mode(&self) -> Result<GateMode> {
        let exists = fs::try_exists(&self.flag_path)
            .await
            .with_context(|| format!("Failed to check baseline flag {:?}", self.flag_path))?;

        Ok(if exists {
            GateMode::Monitoring
        } else {
            GateMode::Baseline
        })
    }

    /// Persist the flag with `completed_at` as its payload
    pub async fn mark_complete(&self, completed_at: DateTime<Utc>) -> Result<()> {
        let payload = format!("baseline completed at {}\n", completed_at.to_rfc3339());

        persist::write_atomic(&self.flag_path, &payload)
            .await
            .with_context(|| format!("Failed to write baseline flag {:?}", self.flag_path))?;

        info!("Baseline flag written to {:?}", self.flag_path);
        Ok(())
    }

    /// The flag's payload, if the flag exists and is readable
    pub async fn completed_at(&self) -> Option<String> {
        fs::read_to_string(&self.flag_path)
            .await
            .ok()
            .map(|s| s.trim().to_string())
    }
}
