// src/lib.rs
// Library interface for ct-sentry
pub mod baseline;
pub mod cli;
pub mod config;
pub mod console;
pub mod dedupe;
pub mod matcher;
pub mod metrics;
pub mod notifier;
pub mod orchestrator;
pub mod persist;
pub mod progress;
pub mod results;
pub mod seen;
pub mod source;
pub mod stats;
pub mod status;
pub mod targets;
