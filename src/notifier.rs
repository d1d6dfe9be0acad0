// src/notifier.rs
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::NotifierConfig;

/// Fired once at the end of every monitoring-mode cycle
#[async_trait]
pub trait CycleNotifier: Send + Sync {
    async fn notify(&self) -> anyhow::Result<()>;
}

/// Runs an external program. Arguments are passed as a list, never through a
/// shell, so nothing from certificate data can be injected.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from config. `None` when no program is configured.
    pub fn from_config(cfg: &NotifierConfig) -> Option<Self> {
        cfg.program.as_ref().map(|program| {
            Self::new(
                program,
                cfg.args.clone(),
                Duration::from_secs(cfg.timeout_secs),
            )
        })
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

#[async_trait]
impl CycleNotifier for CommandNotifier {
    async fn notify(&self) -> anyhow::Result<()> {
        debug!("Running notifier {:?} {:?}", self.program, self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start notifier {:?}", self.program))?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.context("Failed to wait for notifier")?,
            Err(_) => {
                // kill_on_drop reaps it, but don't leave it running until then
                let _ = child.start_kill();
                anyhow::bail!("Notifier timed out after {:?}", self.timeout);
            }
        };

        if !status.success() {
            anyhow::bail!("Notifier {:?} exited with {}", self.program, status);
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_success() {
        let notifier = CommandNotifier::new("true", vec![], Duration::from_secs(5));
        assert!(notifier.notify().await.is_ok());
    }

    #[tokio::test]
    async fn test_notify_nonzero_exit() {
        let notifier = CommandNotifier::new("false", vec![], Duration::from_secs(5));
        assert!(notifier.notify().await.is_err());
    }

    #[tokio::test]
    async fn test_notify_missing_program() {
        let notifier = CommandNotifier::new(
            "/nonexistent/notify-program",
            vec![],
            Duration::from_secs(5),
        );
        assert!(notifier.notify().await.is_err());
    }

    #[tokio::test]
    async fn test_notify_timeout() {
        let notifier = CommandNotifier::new(
            "sleep",
            vec!["10".to_string()],
            Duration::from_millis(200),
        );
        assert!(notifier.notify().await.is_err());
    }

    #[tokio::test]
    async fn test_args_passed_verbatim() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("touched; rm -rf x");

        let notifier = CommandNotifier::new(
            "touch",
            vec![out.to_string_lossy().into_owned()],
            Duration::from_secs(5),
        );
        notifier.notify().await.unwrap();

        assert!(out.exists());
    }

    #[test]
    fn test_from_config() {
        let cfg = NotifierConfig {
            program: Some("/usr/local/bin/notify".to_string()),
            args: vec!["--all".to_string()],
            timeout_secs: 30,
        };

        let notifier = CommandNotifier::from_config(&cfg).unwrap();
        assert_eq!(notifier.program(), &PathBuf::from("/usr/local/bin/notify"));

        let none = CommandNotifier::from_config(&NotifierConfig::default());
        assert!(none.is_none());
    }
}
