// src/console.rs
//! Human-readable terminal output for newly discovered domains

use chrono::Utc;
use colored::Colorize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    enabled: bool,
    use_colors: bool,
}

impl ConsoleReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            use_colors: is_terminal::is_terminal(io::stdout()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            use_colors: false,
        }
    }

    /// One line per new domain, on stdout
    pub fn new_domain(&self, target: &str, domain: &str) {
        if !self.enabled {
            return;
        }

        let line = self.format_line(target, domain);
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", line);
    }

    fn format_line(&self, target: &str, domain: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");

        if self.use_colors {
            format!(
                "{} {} {} {}",
                format!("[{}]", timestamp).dimmed(),
                "[+]".green().bold(),
                domain.cyan().bold(),
                format!("({})", target).yellow()
            )
        } else {
            format!("[{}] [+] {} ({})", timestamp, domain, target)
        }
    }
}
