// src/source/crtsh.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::cmp::Reverse;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::types::CertificateRecord;
use super::CertSource;
use crate::targets::TargetDomain;

pub const DEFAULT_CRTSH_URL: &str = "https://crt.sh/";

/// HTTP client for crt.sh's JSON search
pub struct CrtShClient {
    base_url: Url,
    http_client: reqwest::Client,
    max_records: usize,
}

impl CrtShClient {
    /// Create a new crt.sh client
    pub fn new(base_url: &str, timeout: Duration, max_records: usize) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid crt.sh URL: {}", base_url))?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            http_client,
            max_records,
        })
    }

    /// Search URL for certificates issued under `*.domain`
    fn search_url(&self, domain: &TargetDomain) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("q", &format!("%.{}", domain))
            .append_pair("output", "json");
        url
    }

    /// Fetch every record crt.sh returns for `domain`, unfiltered
    /// Endpoint: GET {base_url}?q=%.{domain}&output=json
    pub async fn fetch(&self, domain: &TargetDomain) -> Result<Vec<CertificateRecord>> {
        let url = self.search_url(domain);

        debug!("Querying crt.sh for {}", domain);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to query crt.sh")?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!("Rate limited by crt.sh while querying {}", domain);
            }

            anyhow::bail!("crt.sh query for {} failed with status {}", domain, status);
        }

        let body = response
            .text()
            .await
            .context("Failed to read crt.sh response body")?;

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<CertificateRecord> =
            serde_json::from_str(&body).context("Failed to parse crt.sh JSON")?;

        debug!("crt.sh returned {} records for {}", records.len(), domain);

        Ok(records)
    }
}

#[async_trait]
impl CertSource for CrtShClient {
    async fn query(
        &self,
        domain: &TargetDomain,
        window: Duration,
    ) -> Result<Vec<CertificateRecord>> {
        let records = self.fetch(domain).await?;

        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .naive_utc()
            .checked_sub_signed(window)
            .unwrap_or(NaiveDateTime::MIN);

        Ok(select_recent(records, cutoff, self.max_records))
    }
}

/// Keep records newer than `cutoff`, newest first, at most `cap` of them.
///
/// Records without a usable timestamp are kept and sort after dated ones.
/// The sort is stable, so ties keep their original order.
pub fn select_recent(
    records: Vec<CertificateRecord>,
    cutoff: NaiveDateTime,
    cap: usize,
) -> Vec<CertificateRecord> {
    let mut recent: Vec<(Option<NaiveDateTime>, CertificateRecord)> = records
        .into_iter()
        .map(|r| (r.entry_time(), r))
        .filter(|(ts, _)| ts.is_none_or(|ts| ts >= cutoff))
        .collect();

    recent.sort_by_key(|(ts, _)| Reverse(*ts));
    recent.truncate(cap);

    recent.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(id: u64, name: &str, ts: Option<NaiveDateTime>) -> CertificateRecord {
        CertificateRecord {
            id: id.to_string(),
            name_value: name.to_string(),
            entry_timestamp: ts.map(|t| t.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()),
            common_name: None,
            issuer_name: None,
            not_before: None,
            not_after: None,
        }
    }

    fn target(name: &str) -> TargetDomain {
        TargetDomain::new(name).unwrap()
    }

    fn hours_ago(h: i64) -> NaiveDateTime {
        Utc::now().naive_utc() - chrono::Duration::hours(h)
    }

    #[test]
    fn test_select_recent_orders_and_caps() {
        let records = (0..20)
            .map(|i| record(i, &format!("h{}.example.com", i), Some(hours_ago(20 - i as i64))))
            .collect();

        let selected = select_recent(records, hours_ago(48), 5);

        assert_eq!(selected.len(), 5);
        let ids: Vec<_> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["19", "18", "17", "16", "15"]);
    }

    #[test]
    fn test_select_recent_drops_old_entries() {
        let records = vec![
            record(1, "old.example.com", Some(hours_ago(72))),
            record(2, "new.example.com", Some(hours_ago(1))),
        ];

        let selected = select_recent(records, hours_ago(48), 15);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "2");
    }

    #[test]
    fn test_select_recent_stable_ties_and_undated_last() {
        let ts = hours_ago(2);
        let records = vec![
            record(1, "undated.example.com", None),
            record(2, "a.example.com", Some(ts)),
            record(3, "b.example.com", Some(ts)),
        ];

        let selected = select_recent(records, hours_ago(48), 15);
        let ids: Vec<_> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[tokio::test]
    async fn test_query_success() {
        let mock_server = MockServer::start().await;

        let body = serde_json::json!([
            {
                "id": 1,
                "name_value": "a.example.com",
                "entry_timestamp": hours_ago(3).format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
            },
            {
                "id": 2,
                "name_value": "b.example.com\nc.example.com",
                "entry_timestamp": hours_ago(1).format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
            },
            {
                "id": 3,
                "name_value": "stale.example.com",
                "entry_timestamp": hours_ago(24 * 10).format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
            }
        ]);

        Mock::given(method("GET"))
            .and(query_param("q", "%.example.com"))
            .and(query_param("output", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CrtShClient::new(&mock_server.uri(), Duration::from_secs(5), 15).unwrap();
        let records = client
            .query(&target("example.com"), Duration::from_secs(2 * 24 * 3600))
            .await
            .unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_query_respects_cap() {
        let mock_server = MockServer::start().await;

        let entries: Vec<_> = (0..30)
            .map(|i| {
                serde_json::json!({
                    "id": i,
                    "name_value": format!("h{}.example.com", i),
                    "entry_timestamp": hours_ago(30 - i).format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
                })
            })
            .collect();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(entries))
            .mount(&mock_server)
            .await;

        let client = CrtShClient::new(&mock_server.uri(), Duration::from_secs(5), 10).unwrap();
        let records = client
            .query(&target("example.com"), Duration::from_secs(2 * 24 * 3600))
            .await
            .unwrap();

        assert_eq!(records.len(), 10);
        assert_eq!(records[0].id, "29");
    }

    #[tokio::test]
    async fn test_query_empty_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&mock_server)
            .await;

        let client = CrtShClient::new(&mock_server.uri(), Duration::from_secs(5), 15).unwrap();
        let records = client
            .query(&target("example.com"), Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_query_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let client = CrtShClient::new(&mock_server.uri(), Duration::from_secs(5), 15).unwrap();
        let result = client
            .query(&target("example.com"), Duration::from_secs(3600))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_query_invalid_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&mock_server)
            .await;

        let client = CrtShClient::new(&mock_server.uri(), Duration::from_secs(5), 15).unwrap();
        let result = client
            .query(&target("example.com"), Duration::from_secs(3600))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_query_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&mock_server)
            .await;

        let client = CrtShClient::new(&mock_server.uri(), Duration::from_secs(1), 15).unwrap();
        let result = client
            .query(&target("example.com"), Duration::from_secs(3600))
            .await;

        assert!(result.is_err());
    }
}
