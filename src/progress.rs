// src/progress.rs
//! Baseline progress spinner using indicatif

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::baseline::GateMode;

/// Shows baseline progress instead of one line per suppressed domain.
///
/// Disabled instances are no-ops, so callers never need to check.
#[derive(Clone)]
pub struct BaselineProgress {
    spinner: Option<ProgressBar>,
}

impl BaselineProgress {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { spinner: None };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("Invalid template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.set_message("Building baseline...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            spinner: Some(spinner),
        }
    }

    /// Spinner only while a baseline is being built
    pub fn for_mode(enabled: bool, mode: GateMode) -> Self {
        Self::new(enabled && mode == GateMode::Baseline)
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Update the baseline status line
    pub fn update(&self, target: &str, position: usize, total: usize, recorded: u64) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(format!(
                "Building baseline: target {}/{} ({}) | {} domains recorded",
                position, total, target, recorded
            ));
        }
    }

    /// Temporarily hide the spinner to print other output
    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if let Some(ref spinner) = self.spinner {
            spinner.suspend(f)
        } else {
            f()
        }
    }

    pub fn finish(&self) {
        if let Some(ref spinner) = self.spinner {
            spinner.finish_and_clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.spinner.is_some()
    }
}
