// src/main.rs
use anyhow::Context;
use clap::Parser;
use ct_sentry::baseline::BaselineGate;
use ct_sentry::cli::Cli;
use ct_sentry::config::Config;
use ct_sentry::console::ConsoleReporter;
use ct_sentry::matcher::DomainMatcher;
use ct_sentry::metrics;
use ct_sentry::notifier::CommandNotifier;
use ct_sentry::orchestrator::{CycleOrchestrator, CycleTiming};
use ct_sentry::progress::BaselineProgress;
use ct_sentry::results::ResultSink;
use ct_sentry::seen::SeenStore;
use ct_sentry::source::CrtShClient;
use ct_sentry::stats::StatsCollector;
use ct_sentry::status::{self, StatusState};
use ct_sentry::targets;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Validate arguments
    cli.validate()?;

    // Load config file, or run on defaults
    let mut config = match cli.config {
        Some(ref path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => Config::default(),
    };

    cli.apply_overrides(&mut config);
    config.validate()?;

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level(&config.logging.level)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    tracing::info!("Starting ct-sentry...");

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!("Failed to register metrics: {}", e);
    }

    // Anything wrong with the target list is fatal before the loop starts
    let targets = targets::load_targets(&config.targets_file)?;
    tracing::info!(
        "Loaded {} target domains from {:?}",
        targets.len(),
        config.targets_file
    );

    let stats = StatsCollector::new();

    let seen = SeenStore::load(config.seen_log_path())
        .await
        .with_stats(stats.clone());
    let gate = BaselineGate::new(&config.storage.state_dir);
    let sink = ResultSink::new(config.storage.results_dir.clone());

    // The first cycle reads the mode again and backs off if it still fails
    let startup_mode = match gate.current_mode().await {
        Ok(mode) => Some(mode),
        Err(e) => {
            tracing::warn!("Cannot read baseline state: {:#}", e);
            None
        }
    };

    tracing::info!(
        "State in {:?}, results in {:?}, mode: {}",
        config.storage.state_dir,
        config.storage.results_dir,
        startup_mode.map_or("unknown", |m| m.as_str())
    );

    let progress = match startup_mode {
        Some(mode) => BaselineProgress::for_mode(cli.should_show_progress(), mode),
        None => BaselineProgress::disabled(),
    };

    let source = CrtShClient::new(
        &config.source.url,
        Duration::from_secs(config.source.timeout_secs),
        config.source.max_records,
    )?;

    let mut orchestrator = CycleOrchestrator::new(
        Arc::new(source),
        targets,
        seen,
        gate.clone(),
        sink,
        CycleTiming::from_config(&config),
    )
    .with_matcher(DomainMatcher::new(config.matching.mode))
    .with_stats(stats.clone())
    .with_progress(progress)
    .with_console(ConsoleReporter::new(!cli.quiet));

    match CommandNotifier::from_config(&config.notifier) {
        Some(notifier) => {
            tracing::info!("Notifier enabled: {:?}", notifier.program());
            orchestrator = orchestrator.with_notifier(Arc::new(notifier));
        }
        None => tracing::info!("No notifier configured"),
    }

    // Shutdown signal shared by the poller and the status server
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx.clone());

    let status_handle = if config.status.enabled {
        let state = StatusState::new(
            config.storage.results_dir.clone(),
            gate,
            stats.clone(),
        );
        let bind = config.status.bind.clone();
        let rx = shutdown_rx.clone();

        Some(tokio::spawn(async move {
            if let Err(e) = status::serve(&bind, state, rx).await {
                tracing::error!("Status server stopped: {:#}", e);
            }
        }))
    } else {
        tracing::debug!("Status server disabled");
        None
    };

    if cli.once {
        let mut rx = shutdown_rx.clone();
        let report = orchestrator.run_cycle(&mut rx).await?;
        tracing::info!(
            "Single {} cycle done: {} targets queried, {} new domains, baseline completed: {}",
            report.mode,
            report.targets_queried,
            report.new_domains.len(),
            report.baseline_completed
        );
    } else {
        orchestrator.run(shutdown_rx).await;
    }

    shutdown_tx.send(true).ok();
    if let Some(handle) = status_handle {
        handle.await.ok();
    }

    tracing::info!("Final statistics: {}", stats.format_stats());

    Ok(())
}

/// Flip the shutdown channel on SIGINT or SIGTERM
fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match (
                signal(SignalKind::terminate()),
                signal(SignalKind::interrupt()),
            ) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                        _ = sigint.recv() => tracing::info!("Received SIGINT"),
                    }
                }
                _ => {
                    tracing::warn!("Failed to install signal handlers, falling back to Ctrl+C");
                    if tokio::signal::ctrl_c().await.is_err() {
                        return;
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("Failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Received Ctrl+C");
        }

        tracing::info!("Finishing current write and shutting down...");
        shutdown_tx.send(true).ok();
    });
}
