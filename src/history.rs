//! Remote alert history source and the fixed offline fallback dataset.
//!
//! The wire protocol is opaque to the engine: the source either yields a JSON
//! array of raw records or it fails, and any failure makes the reconciler
//! substitute [`offline_history`]. Raw records are untrusted `Value`s until
//! the reconciler normalizes them.

use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client as HttpClient;
use serde_json::{Value, json};
use tracing::info;

// ─────────────────────────── Source seam ─────────────────────────────────

/// Anything that can produce the remote alert history.
#[async_trait]
pub trait HistorySource {
    /// Fetch the raw history set. Any error triggers offline fallback in the
    /// reconciler; nothing here is surfaced to callers of the engine.
    async fn fetch(&self) -> Result<Vec<Value>>;
}

// ─────────────────────────── HTTP client ─────────────────────────────────

/// Production history source: a single GET returning a JSON array.
pub struct RemoteHistory {
    http: HttpClient,
    endpoint: Option<String>,
    timeout: Duration,
}

impl RemoteHistory {
    /// Build from environment variables.
    ///
    /// | Env var              | Default | Purpose                          |
    /// |----------------------|---------|----------------------------------|
    /// | `HISTORY_ENDPOINT`   | —       | URL returning the history array  |
    /// | `HISTORY_TIMEOUT_MS` | `10000` | Request timeout in ms            |
    ///
    /// A missing endpoint is not an error at construction time: the fetch
    /// fails instead, which the reconciler absorbs as offline mode.
    pub fn from_env() -> Self {
        let timeout_ms: u64 = std::env::var("HISTORY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);

        Self {
            http: HttpClient::new(),
            endpoint: std::env::var("HISTORY_ENDPOINT").ok(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: HttpClient::new(),
            endpoint: Some(endpoint.into()),
            timeout,
        }
    }
}

#[async_trait]
impl HistorySource for RemoteHistory {
    async fn fetch(&self) -> Result<Vec<Value>> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| anyhow!("HISTORY_ENDPOINT not set"))?;

        let resp = self
            .http
            .get(endpoint)
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("history fetch failed: {status}"));
        }

        let records: Vec<Value> = resp.json().await?;
        info!("Fetched {} history record(s).", records.len());
        Ok(records)
    }
}

// ─────────────────────────── Offline dataset ─────────────────────────────

/// Fixed fallback history used verbatim when the remote source fails.
/// Schema-compatible with the remote wire shape; timestamps are relative to
/// "now" so the set always reads as recent.
pub fn offline_history() -> Vec<Value> {
    let hours_ago = |h: i64| (Utc::now() - chrono::Duration::hours(h)).to_rfc3339();

    vec![
        json!({
            "id": "1",
            "name": "Rajesh Kumar",
            "phone": "9876543210",
            "tags": ["injury"],
            "description": "Fell from bike, minor cuts on hand. Need first aid assistance.",
            "severity": "Medium",
            "location": "17.3850, 78.4867",
            "timestamp": hours_ago(2),
            "completed": false,
        }),
        json!({
            "id": "2",
            "name": "Priya Sharma",
            "phone": "9123456789",
            "tags": ["lost"],
            "description": "Lost in unfamiliar area near metro station. Phone battery low.",
            "severity": "Medium",
            "location": "28.6139, 77.2090",
            "timestamp": hours_ago(5),
            "completed": true,
        }),
        json!({
            "id": "3",
            "name": "Amit Patel",
            "phone": "9987654321",
            "tags": ["trapped"],
            "description": "Stuck in elevator between 5th and 6th floor. Emergency help needed.",
            "severity": "High",
            "location": "19.0760, 72.8777",
            "timestamp": hours_ago(8),
            "completed": true,
        }),
        json!({
            "id": "4",
            "name": "Sunita Reddy",
            "phone": "9555666777",
            "tags": ["food"],
            "description": "Family of 4 without food for 2 days due to flood situation.",
            "severity": "High",
            "location": "13.0827, 80.2707",
            "timestamp": hours_ago(12),
            "completed": false,
        }),
        json!({
            "id": "5",
            "name": "Vikram Singh",
            "phone": "9444333222",
            "tags": ["suspicious"],
            "description": "Suspicious activity near school area. Multiple unknown persons.",
            "severity": "Medium",
            "location": "26.9124, 75.7873",
            "timestamp": hours_ago(24),
            "completed": true,
        }),
        json!({
            "id": "6",
            "name": "Meera Joshi",
            "phone": "9111222333",
            "tags": ["other"],
            "description": "Power outage in residential area for 6+ hours. Need generator support.",
            "severity": "Low",
            "location": "18.5204, 73.8567",
            "timestamp": hours_ago(36),
            "completed": false,
        }),
    ]
}

// ─────────────────────────────── Tests ───────────────────────────────────
