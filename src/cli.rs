// src/cli.rs
use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// ct-sentry: Certificate Transparency new-hostname monitor
///
/// Polls crt.sh for certificates issued under your domains and runs a
/// notifier whenever a hostname shows up that has never been seen before.
#[derive(Parser, Debug, Clone)]
#[command(name = "ct-sentry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Input & Configuration =====
    /// Path to TOML config file (defaults are used when omitted)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// File with target domains, one per line
    #[arg(short = 't', long = "targets")]
    pub targets: Option<PathBuf>,

    /// Directory holding the seen-domain log and baseline flag
    #[arg(long = "state-dir")]
    pub state_dir: Option<PathBuf>,

    /// Directory holding per-target result files
    #[arg(long = "results-dir")]
    pub results_dir: Option<PathBuf>,

    // ===== Polling =====
    /// Seconds to rest after each cycle
    #[arg(long = "cycle-delay")]
    pub cycle_delay: Option<u64>,

    /// Seconds to wait between targets
    #[arg(long = "target-delay")]
    pub target_delay: Option<u64>,

    /// How many days back to look for certificates
    #[arg(long = "lookback-days")]
    pub lookback_days: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long = "once")]
    pub once: bool,

    // ===== Notification =====
    /// Program to run after each monitoring cycle
    #[arg(short = 'n', long = "notifier")]
    pub notifier: Option<String>,

    // ===== Status Dashboard =====
    /// Address for the status dashboard
    #[arg(long = "status-bind")]
    pub status_bind: Option<String>,

    /// Disable the status dashboard
    #[arg(long = "no-status")]
    pub no_status: bool,

    // ===== Display =====
    /// Disable the baseline progress spinner
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        if self.lookback_days == Some(0) {
            anyhow::bail!("--lookback-days must be greater than 0");
        }

        if self.notifier.as_deref().is_some_and(|n| n.trim().is_empty()) {
            anyhow::bail!("--notifier must not be empty");
        }

        Ok(())
    }

    /// Apply command-line overrides on top of the file config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref path) = self.targets {
            config.targets_file = path.clone();
        }
        if let Some(ref dir) = self.state_dir {
            config.storage.state_dir = dir.clone();
        }
        if let Some(ref dir) = self.results_dir {
            config.storage.results_dir = dir.clone();
        }
        if let Some(secs) = self.cycle_delay {
            config.polling.cycle_delay_secs = secs;
        }
        if let Some(secs) = self.target_delay {
            config.polling.target_delay_secs = secs;
        }
        if let Some(days) = self.lookback_days {
            config.source.lookback_days = days;
        }
        if let Some(ref program) = self.notifier {
            config.notifier.program = Some(program.clone());
        }
        if let Some(ref bind) = self.status_bind {
            config.status.bind = bind.clone();
        }
        if self.no_status {
            config.status.enabled = false;
        }
    }

    /// Log level from flags, falling back to the configured one
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            configured
        }
    }

    /// Spinner only makes sense on an interactive terminal
    pub fn should_show_progress(&self) -> bool {
        !self.no_progress && !self.quiet && is_terminal::is_terminal(std::io::stderr())
    }
}
