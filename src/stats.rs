// src/stats.rs
//! Statistics tracking for ct-sentry

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::baseline::GateMode;
use crate::metrics;

/// Thread-safe statistics collector, shared with the status server
#[derive(Clone)]
pub struct StatsCollector {
    inner: Arc<Counters>,
    start_time: Instant,
}

#[derive(Default)]
struct Counters {
    cycles_completed: AtomicU64,
    certificates_processed: AtomicU64,
    new_domains: AtomicU64,
    baseline_domains: AtomicU64,
    source_failures: AtomicU64,
    persistence_failures: AtomicU64,
    notifier_failures: AtomicU64,
    cycle_failures: AtomicU64,
    last_cycle_unix: AtomicI64,
    last_cycle_domains: RwLock<Vec<String>>,
}

/// Snapshot of statistics at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub cycles_completed: u64,
    pub certificates_processed: u64,
    pub new_domains: u64,
    pub baseline_domains: u64,
    pub source_failures: u64,
    pub persistence_failures: u64,
    pub notifier_failures: u64,
    pub cycle_failures: u64,
    /// Unix time the last cycle finished, if any has
    pub last_cycle_unix: Option<i64>,
    pub uptime_secs: u64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    pub fn increment_processed(&self) {
        self.inner.certificates_processed.fetch_add(1, Ordering::Relaxed);
        metrics::CERTIFICATES_PROCESSED_TOTAL.inc();
    }

    /// A domain seen for the first time, counted by the mode it was seen in
    pub fn increment_new_domain(&self, mode: GateMode) {
        match mode {
            GateMode::Baseline => self.inner.baseline_domains.fetch_add(1, Ordering::Relaxed),
            GateMode::Monitoring => self.inner.new_domains.fetch_add(1, Ordering::Relaxed),
        };
        metrics::NEW_DOMAINS_TOTAL
            .with_label_values(&[mode.as_str()])
            .inc();
    }

    pub fn increment_source_failures(&self) {
        self.inner.source_failures.fetch_add(1, Ordering::Relaxed);
        metrics::FAILURES_TOTAL.with_label_values(&["source"]).inc();
    }

    pub fn increment_persistence_failures(&self) {
        self.inner.persistence_failures.fetch_add(1, Ordering::Relaxed);
        metrics::FAILURES_TOTAL.with_label_values(&["persistence"]).inc();
    }

    pub fn increment_notifier_failures(&self) {
        self.inner.notifier_failures.fetch_add(1, Ordering::Relaxed);
        metrics::FAILURES_TOTAL.with_label_values(&["notifier"]).inc();
    }

    pub fn increment_cycle_failures(&self) {
        self.inner.cycle_failures.fetch_add(1, Ordering::Relaxed);
        metrics::FAILURES_TOTAL.with_label_values(&["cycle"]).inc();
    }

    pub fn record_cycle(&self, mode: GateMode, finished_unix: i64) {
        self.inner.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.inner.last_cycle_unix.store(finished_unix, Ordering::Relaxed);
        metrics::CYCLES_TOTAL.with_label_values(&[mode.as_str()]).inc();
    }

    /// Replace the domains reported by the most recent monitoring cycle
    pub fn set_last_cycle_domains(&self, domains: Vec<String>) {
        if let Ok(mut guard) = self.inner.last_cycle_domains.write() {
            *guard = domains;
        }
    }

    pub fn last_cycle_domains(&self) -> Vec<String> {
        self.inner
            .last_cycle_domains
            .read()
            .map(|domains| domains.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = &self.inner;
        let last = c.last_cycle_unix.load(Ordering::Relaxed);

        StatsSnapshot {
            cycles_completed: c.cycles_completed.load(Ordering::Relaxed),
            certificates_processed: c.certificates_processed.load(Ordering::Relaxed),
            new_domains: c.new_domains.load(Ordering::Relaxed),
            baseline_domains: c.baseline_domains.load(Ordering::Relaxed),
            source_failures: c.source_failures.load(Ordering::Relaxed),
            persistence_failures: c.persistence_failures.load(Ordering::Relaxed),
            notifier_failures: c.notifier_failures.load(Ordering::Relaxed),
            cycle_failures: c.cycle_failures.load(Ordering::Relaxed),
            last_cycle_unix: (last != 0).then_some(last),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_stats(&self) -> String {
        let s = self.snapshot();
        format!(
            "{} cycles | {} certs | {} new | {} baseline | {} source errors | uptime: {}",
            s.cycles_completed,
            s.certificates_processed,
            s.new_domains,
            s.baseline_domains,
            s.source_failures,
            Self::format_uptime(s.uptime_secs)
        )
    }

    /// Format uptime duration
    pub fn format_uptime(secs: u64) -> String {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
