// src/metrics.rs
//! Prometheus metrics for ct-sentry
//!
//! Counters are bumped through [`crate::stats::StatsCollector`] and exported
//! by the status server at `/metrics`.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::warn;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Completed polling cycles
    /// Labels: mode="baseline|monitoring"
    pub static ref CYCLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ctsentry_cycles_total", "Total number of completed polling cycles"),
        &["mode"]
    ).expect("metric cannot be created");

    /// Certificate records processed
    pub static ref CERTIFICATES_PROCESSED_TOTAL: IntCounter = IntCounter::new(
        "ctsentry_certificates_processed_total",
        "Total number of certificate records processed"
    ).expect("metric cannot be created");

    /// Newly seen domains
    /// Labels: mode="baseline|monitoring"
    pub static ref NEW_DOMAINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ctsentry_new_domains_total", "Total number of newly seen domains"),
        &["mode"]
    ).expect("metric cannot be created");

    /// Failures by kind
    /// Labels: kind="source|persistence|notifier|cycle"
    pub static ref FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ctsentry_failures_total", "Total number of recovered failures"),
        &["kind"]
    ).expect("metric cannot be created");

    /// 1 once the baseline flag is set
    pub static ref BASELINE_COMPLETE: IntGauge = IntGauge::new(
        "ctsentry_baseline_complete",
        "Whether the baseline phase has completed (1) or not (0)"
    ).expect("metric cannot be created");
}

/// Initialize metrics registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(CYCLES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CERTIFICATES_PROCESSED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(NEW_DOMAINS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BASELINE_COMPLETE.clone()))?;

    Ok(())
}

/// Export metrics in Prometheus text format
pub fn export_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}
