// src/status.rs
//! Read-only status dashboard
//!
//! Serves a summary page and JSON views over the result directory. It never
//! writes anything; result files may be appended to or cleared while it reads
//! them, so missing files are treated as empty.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::baseline::{BaselineGate, GateMode};
use crate::metrics;
use crate::persist;
use crate::stats::{StatsCollector, StatsSnapshot};

#[derive(Clone)]
pub struct StatusState {
    results_dir: PathBuf,
    gate: BaselineGate,
    stats: StatsCollector,
}

impl StatusState {
    pub fn new(results_dir: PathBuf, gate: BaselineGate, stats: StatsCollector) -> Self {
        Self {
            results_dir,
            gate,
            stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AllDomainsResponse {
    pub domains: Vec<String>,
    pub count: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct NewDomainsResponse {
    pub new_domains: Vec<String>,
    pub count: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct TargetCount {
    pub target: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    pub targets: Vec<TargetCount>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mode: Option<String>,
    pub baseline: Option<String>,
    pub stats: StatsSnapshot,
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/all", get(all_domains))
        .route("/new", get(new_domains))
        .route("/targets", get(targets))
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .fallback(|| async { "ct-sentry - OK" })
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` flips to true
pub async fn serve(addr: &str, state: StatusState, shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind status server to {}", addr))?;

    serve_on(listener, state, shutdown).await
}

pub async fn serve_on(
    listener: TcpListener,
    state: StatusState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    info!("Status server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("Status server failed")?;

    Ok(())
}

/// Every result file in `dir` with its lines, sorted by file name.
///
/// Unreadable entries are skipped; a missing directory yields nothing.
pub async fn read_result_files(dir: &Path) -> Vec<(String, Vec<String>)> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                debug!("Cannot list result directory {:?}: {}", dir, e);
            }
            return Vec::new();
        }
    };

    let mut files = Vec::new();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".tmp") {
            continue;
        }

        match persist::read_lines_if_exists(&entry.path()).await {
            Ok(lines) => files.push((name, lines)),
            Err(e) => debug!("Skipping result file {}: {:#}", name, e),
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

/// Deduplicated, sorted domains across all result files
pub fn all_domains_from(files: &[(String, Vec<String>)]) -> Vec<String> {
    files
        .iter()
        .flat_map(|(_, lines)| lines.iter())
        .filter(|l| l.contains('.'))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

async fn all_domains(State(state): State<StatusState>) -> Json<AllDomainsResponse> {
    let files = read_result_files(&state.results_dir).await;
    let domains = all_domains_from(&files);

    Json(AllDomainsResponse {
        count: domains.len(),
        domains,
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Domains reported by the most recent monitoring cycle
async fn new_domains(State(state): State<StatusState>) -> Json<NewDomainsResponse> {
    let new_domains = state.stats.last_cycle_domains();

    Json(NewDomainsResponse {
        count: new_domains.len(),
        new_domains,
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn targets(State(state): State<StatusState>) -> Json<TargetsResponse> {
    let files = read_result_files(&state.results_dir).await;

    let targets: Vec<TargetCount> = files
        .into_iter()
        .map(|(target, lines)| TargetCount {
            target,
            count: lines.len(),
        })
        .collect();

    Json(TargetsResponse {
        total: targets.iter().map(|t| t.count).sum(),
        targets,
    })
}

async fn health(State(state): State<StatusState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        mode: state.gate.current_mode().await.ok().map(|m| m.to_string()),
        baseline: state.gate.completed_at().await,
        stats: state.stats.snapshot(),
    })
}

async fn metrics_text() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::export_metrics(),
    )
}

async fn index(State(state): State<StatusState>) -> Html<String> {
    let files = read_result_files(&state.results_dir).await;
    let total = all_domains_from(&files).len();
    let stats = state.stats.snapshot();

    let mode = match state.gate.current_mode().await {
        Ok(GateMode::Monitoring) => "Monitoring",
        Ok(GateMode::Baseline) => "Building baseline",
        Err(_) => "Unknown",
    };

    let rows: String = files
        .iter()
        .map(|(target, lines)| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(target),
                lines.len()
            )
        })
        .collect();

    Html(format!(
        r#"<html>
<head>
    <title>ct-sentry</title>
    <meta http-equiv="refresh" content="30">
    <style>
        body {{ font-family: Arial; padding: 40px; background: #1a1a1a; color: #fff; }}
        h1 {{ color: #00ff88; }}
        .status {{ color: #00ff88; font-weight: bold; }}
        a {{ color: #00aaff; text-decoration: none; }}
        .box {{ background: #2a2a2a; padding: 20px; border-radius: 8px; margin: 20px 0; }}
        td {{ padding: 2px 16px 2px 0; }}
    </style>
</head>
<body>
    <h1>ct-sentry CT Monitor</h1>
    <div class="box">
        <p><strong>Status:</strong> <span class="status">Running</span></p>
        <p><strong>Mode:</strong> {mode}</p>
        <p><strong>Time:</strong> {time}</p>
        <p><strong>Domains found:</strong> {total}</p>
        <p><strong>Cycles:</strong> {cycles} | <strong>Uptime:</strong> {uptime}</p>
    </div>
    <div class="box">
        <table>{rows}</table>
    </div>
    <div class="box">
        <p><a href="/new">New domains from the last cycle (JSON)</a></p>
        <p><a href="/all">All domains (JSON)</a></p>
        <p><a href="/targets">Per-target counts (JSON)</a></p>
        <p><a href="/metrics">Prometheus metrics</a></p>
    </div>
    <p style="color: #666; font-size: 12px;">Auto-refresh every 30 seconds</p>
</body>
</html>"#,
        mode = mode,
        time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        total = total,
        cycles = stats.cycles_completed,
        uptime = StatsCollector::format_uptime(stats.uptime_secs),
        rows = rows,
    ))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_missing_dir() {
        let dir = TempDir::new().unwrap();
        let files = read_result_files(&dir.path().join("nope")).await;
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_all_domains_dedup_and_filter() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("example.com"), "b.example.com\na.example.com\n").unwrap();
        std::fs::write(dir.path().join("test.org"), "x.test.org\na.example.com\nnodot\n").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let files = read_result_files(dir.path()).await;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, "example.com");

        assert_eq!(
            all_domains_from(&files),
            vec!["a.example.com", "b.example.com", "x.test.org"]
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a&b>"), "&lt;a&amp;b&gt;");
    }

    #[tokio::test]
    async fn test_server_endpoints() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results");
        std::fs::create_dir(&results).unwrap();
        std::fs::write(results.join("example.com"), "new.example.com\n").unwrap();

        let gate = BaselineGate::new(&dir.path().join("state"));
        let stats = StatsCollector::new();
        stats.set_last_cycle_domains(vec!["new.example.com".to_string()]);
        let state = StatusState::new(results, gate, stats);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(serve_on(listener, state, rx));

        let base = format!("http://{}", addr);

        let all: serde_json::Value = reqwest::get(format!("{}/all", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all["count"], 1);
        assert_eq!(all["domains"][0], "new.example.com");

        let recent: serde_json::Value = reqwest::get(format!("{}/new", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(recent["count"], 1);
        assert_eq!(recent["new_domains"][0], "new.example.com");
        assert!(recent["timestamp"].is_string());

        let targets: serde_json::Value = reqwest::get(format!("{}/targets", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(targets["total"], 1);
        assert_eq!(targets["targets"][0]["target"], "example.com");

        let health: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["mode"], "baseline");

        let page = reqwest::get(&base).await.unwrap().text().await.unwrap();
        assert!(page.contains("Domains found:</strong> 1"));
        assert!(page.contains(r#"href="/new""#));

        let other = reqwest::get(format!("{}/anything", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(other, "ct-sentry - OK");

        tx.send(true).unwrap();
        server.await.unwrap().unwrap();
    }
}
