// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::matcher::MatchMode;
use crate::source::DEFAULT_CRTSH_URL;

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub url: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u64,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_source_url() -> String { DEFAULT_CRTSH_URL.to_string() }
fn default_lookback_days() -> u64 { 2 }
fn default_max_records() -> usize { 15 }
fn default_request_timeout() -> u64 { 30 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            lookback_days: default_lookback_days(),
            max_records: default_max_records(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl SourceConfig {
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_days.saturating_mul(86_400))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Politeness delay between targets
    #[serde(default = "default_target_delay")]
    pub target_delay_secs: u64,
    /// Rest between the end of one cycle and the start of the next
    #[serde(default = "default_cycle_delay")]
    pub cycle_delay_secs: u64,
    /// Wait after a cycle failed unexpectedly
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

fn default_target_delay() -> u64 { 5 }
fn default_cycle_delay() -> u64 { 300 }
fn default_error_backoff() -> u64 { 60 }

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            target_delay_secs: default_target_delay(),
            cycle_delay_secs: default_cycle_delay(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_state_dir() -> PathBuf { PathBuf::from("state") }
fn default_results_dir() -> PathBuf { PathBuf::from("results") }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            results_dir: default_results_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MatchingConfig {
    #[serde(default)]
    pub mode: MatchMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    /// Program run after each monitoring cycle. Unset disables notification.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,
}

fn default_notifier_timeout() -> u64 { 60 }

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: default_notifier_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatusConfig {
    #[serde(default = "default_status_enabled")]
    pub enabled: bool,
    #[serde(default = "default_status_bind")]
    pub bind: String,
}

fn default_status_enabled() -> bool { true }
fn default_status_bind() -> String { "127.0.0.1:8080".to_string() }

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: default_status_enabled(),
            bind: default_status_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Newline-delimited list of domains to watch
    #[serde(default = "default_targets_file")]
    pub targets_file: PathBuf,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_targets_file() -> PathBuf { PathBuf::from("domains.txt") }

impl Default for Config {
    fn default() -> Self {
        Self {
            targets_file: default_targets_file(),
            source: SourceConfig::default(),
            polling: PollingConfig::default(),
            storage: StorageConfig::default(),
            matching: MatchingConfig::default(),
            notifier: NotifierConfig::default(),
            status: StatusConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the poller cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source.max_records == 0 {
            anyhow::bail!("source.max_records must be greater than 0");
        }

        if self.source.lookback_days == 0 {
            anyhow::bail!("source.lookback_days must be greater than 0");
        }

        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }

        if self.notifier.program.as_deref().is_some_and(|p| p.trim().is_empty()) {
            anyhow::bail!("notifier.program must not be empty when set");
        }

        Ok(())
    }

    pub fn seen_log_path(&self) -> PathBuf {
        self.storage.state_dir.join("seen_domains.txt")
    }
}
