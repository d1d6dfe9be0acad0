// src/orchestrator.rs
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::baseline::{BaselineGate, GateMode};
use crate::config::Config;
use crate::console::ConsoleReporter;
use crate::dedupe::ProcessedCertIds;
use crate::matcher::DomainMatcher;
use crate::metrics;
use crate::notifier::CycleNotifier;
use crate::progress::BaselineProgress;
use crate::results::ResultSink;
use crate::seen::SeenStore;
use crate::source::{CertSource, CertificateRecord};
use crate::stats::StatsCollector;
use crate::targets::TargetDomain;

/// Waits and query window used by the orchestrator
#[derive(Debug, Clone)]
pub struct CycleTiming {
    pub target_delay: Duration,
    pub cycle_delay: Duration,
    pub error_backoff: Duration,
    pub lookback: Duration,
}

impl CycleTiming {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            target_delay: Duration::from_secs(cfg.polling.target_delay_secs),
            cycle_delay: Duration::from_secs(cfg.polling.cycle_delay_secs),
            error_backoff: Duration::from_secs(cfg.polling.error_backoff_secs),
            lookback: cfg.source.lookback(),
        }
    }
}

/// What happened during one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub mode: GateMode,
    pub targets_queried: usize,
    pub source_failures: usize,
    pub records_processed: usize,
    /// Domains recorded silently while in baseline
    pub baseline_recorded: usize,
    /// Domains written to result files, in discovery order
    pub new_domains: Vec<String>,
    pub baseline_completed: bool,
    pub notified: bool,
    /// Stopped early by a shutdown request
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl CycleReport {
    fn new(mode: GateMode) -> Self {
        Self {
            mode,
            targets_queried: 0,
            source_failures: 0,
            records_processed: 0,
            baseline_recorded: 0,
            new_domains: Vec::new(),
            baseline_completed: false,
            notified: false,
            interrupted: false,
            elapsed: Duration::ZERO,
        }
    }
}

/// Drives polling cycles over all targets, one query at a time
pub struct CycleOrchestrator {
    source: Arc<dyn CertSource>,
    targets: Arc<Vec<TargetDomain>>,
    matcher: DomainMatcher,
    seen: SeenStore,
    processed: ProcessedCertIds,
    gate: BaselineGate,
    sink: ResultSink,
    notifier: Option<Arc<dyn CycleNotifier>>,
    timing: CycleTiming,
    stats: StatsCollector,
    progress: BaselineProgress,
    console: ConsoleReporter,
}

impl CycleOrchestrator {
    pub fn new(
        source: Arc<dyn CertSource>,
        targets: Vec<TargetDomain>,
        seen: SeenStore,
        gate: BaselineGate,
        sink: ResultSink,
        timing: CycleTiming,
    ) -> Self {
        Self {
            source,
            targets: Arc::new(targets),
            matcher: DomainMatcher::default(),
            seen,
            processed: ProcessedCertIds::new(),
            gate,
            sink,
            notifier: None,
            timing,
            stats: StatsCollector::new(),
            progress: BaselineProgress::disabled(),
            console: ConsoleReporter::disabled(),
        }
    }

    pub fn with_matcher(mut self, matcher: DomainMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CycleNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_stats(mut self, stats: StatsCollector) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_progress(mut self, progress: BaselineProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_console(mut self, console: ConsoleReporter) -> Self {
        self.console = console;
        self
    }

    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }

    /// Main loop. Returns only when `shutdown` flips to true.
    ///
    /// The rest between cycles is measured from the end of a cycle. A cycle
    /// that fails outright is followed by the longer error backoff instead.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting poller: {} targets, {:?} between targets, {:?} between cycles",
            self.targets.len(),
            self.timing.target_delay,
            self.timing.cycle_delay
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.run_cycle(&mut shutdown).await {
                Ok(report) if report.interrupted => break,
                Ok(report) => {
                    info!(
                        "{} cycle finished in {:?}: {} targets queried, {} source failures, {} records, {} new domains",
                        report.mode,
                        report.elapsed,
                        report.targets_queried,
                        report.source_failures,
                        report.records_processed,
                        report.new_domains.len() + report.baseline_recorded
                    );
                    self.timing.cycle_delay
                }
                Err(e) => {
                    error!(
                        "Cycle failed: {:#}. Retrying in {:?}",
                        e, self.timing.error_backoff
                    );
                    self.stats.increment_cycle_failures();
                    self.timing.error_backoff
                }
            };

            debug!("{}", self.stats.format_stats());

            if sleep_or_shutdown(wait, &mut shutdown).await {
                break;
            }
        }

        self.progress.finish();
        info!("Poller stopped");
    }

    /// Run one full pass over every target.
    ///
    /// Errors returned here are the unexpected kind; per-target failures are
    /// absorbed and counted in the report.
    pub async fn run_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<CycleReport> {
        let started = Instant::now();
        let mode = self.gate.current_mode().await?;
        metrics::BASELINE_COMPLETE.set(i64::from(mode == GateMode::Monitoring));

        let mut report = CycleReport::new(mode);
        let targets = Arc::clone(&self.targets);
        let total = targets.len();

        debug!("Starting {} cycle over {} targets", mode, total);

        for (idx, target) in targets.iter().enumerate() {
            if idx > 0 && sleep_or_shutdown(self.timing.target_delay, shutdown).await {
                report.interrupted = true;
                break;
            }

            if self.process_target(target, mode, shutdown, &mut report).await {
                report.interrupted = true;
                break;
            }

            if mode == GateMode::Baseline {
                let recorded = self.stats.snapshot().baseline_domains;
                self.progress.update(target.as_str(), idx + 1, total, recorded);
            }
        }

        report.elapsed = started.elapsed();

        if report.interrupted {
            info!("Cycle interrupted by shutdown after {:?}", report.elapsed);
            return Ok(report);
        }

        match mode {
            GateMode::Baseline => self.complete_baseline(&mut report).await,
            GateMode::Monitoring => {
                self.stats.set_last_cycle_domains(report.new_domains.clone());
                self.fire_notifier(&mut report).await;
            }
        }

        self.stats.record_cycle(mode, Utc::now().timestamp());
        report.elapsed = started.elapsed();

        Ok(report)
    }

    /// Query one target and process its records. Returns true if shutdown was
    /// requested part-way.
    async fn process_target(
        &mut self,
        target: &TargetDomain,
        mode: GateMode,
        shutdown: &watch::Receiver<bool>,
        report: &mut CycleReport,
    ) -> bool {
        let records = match self.source.query(target, self.timing.lookback).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Query for {} failed: {:#}. Moving on", target, e);
                self.stats.increment_source_failures();
                report.source_failures += 1;
                return false;
            }
        };

        report.targets_queried += 1;
        debug!("{}: {} records to process", target, records.len());

        for record in &records {
            if *shutdown.borrow() {
                return true;
            }

            self.process_record(target, record, mode, report).await;
        }

        false
    }

    async fn process_record(
        &mut self,
        target: &TargetDomain,
        record: &CertificateRecord,
        mode: GateMode,
        report: &mut CycleReport,
    ) {
        if !self.processed.should_process(target.as_str(), &record.id) {
            debug!("{}: certificate {} already processed", target, record.id);
            return;
        }

        report.records_processed += 1;
        self.stats.increment_processed();

        for name in record.names() {
            let domain = DomainMatcher::normalize(name);

            if !self.matcher.matches_normalized(&domain, target.as_str()) {
                continue;
            }

            if !self.seen.add(&domain).await {
                continue;
            }

            self.stats.increment_new_domain(mode);

            match mode {
                GateMode::Baseline => {
                    debug!("Baseline: recorded {} (certificate {})", domain, record.id);
                    report.baseline_recorded += 1;
                }
                GateMode::Monitoring => {
                    if let Err(e) = self.sink.append(target, &domain).await {
                        warn!("Failed to write {} to result file: {:#}", domain, e);
                        self.stats.increment_persistence_failures();
                    }

                    info!("New domain {} for {} (certificate {})", domain, target, record.id);
                    self.progress
                        .suspend(|| self.console.new_domain(target.as_str(), &domain));
                    report.new_domains.push(domain);
                }
            }
        }
    }

    /// Persist the flag, then clear every result file
    async fn complete_baseline(&mut self, report: &mut CycleReport) {
        if let Err(e) = self.gate.mark_complete(Utc::now()).await {
            warn!("{:#}. Staying in baseline mode for the next cycle", e);
            self.stats.increment_persistence_failures();
            return;
        }

        for target in self.targets.iter() {
            if let Err(e) = self.sink.clear(target).await {
                warn!("{:#}", e);
                self.stats.increment_persistence_failures();
            }
        }

        self.progress.finish();
        metrics::BASELINE_COMPLETE.set(1);
        report.baseline_completed = true;

        info!(
            "Baseline complete: {} domains known. Monitoring for new ones from now on",
            self.seen.len()
        );
    }

    async fn fire_notifier(&self, report: &mut CycleReport) {
        let Some(notifier) = &self.notifier else {
            debug!("No notifier configured");
            return;
        };

        report.notified = true;

        match notifier.notify().await {
            Ok(()) => debug!("Notifier ran successfully"),
            Err(e) => {
                warn!("Notifier failed: {:#}", e);
                self.stats.increment_notifier_failures();
            }
        }
    }
}

/// Sleep for `duration` unless shutdown is requested first.
///
/// Returns true if shutdown was requested. A dropped sender is treated as
/// "no shutdown coming" and the full duration is slept.
pub async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = tokio::time::Instant::now() + duration;

    loop {
        if *shutdown.borrow() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    tokio::time::sleep_until(deadline).await;
                    return *shutdown.borrow();
                }
            }
        }
    }
}
