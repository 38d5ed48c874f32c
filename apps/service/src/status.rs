//! Latest result per target URL, shared with the dashboard.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::monitoring::scheduler::{ResultSink, SinkClosed};
use crate::monitoring::types::{Outcome, ProbeResult};

/// Last known result for every URL, overwritten on each update
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    latest: Arc<RwLock<HashMap<String, ProbeResult>>>,
}

/// Render-ready view of one board entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRow {
    pub url: String,
    pub status: Outcome,
    pub response_time: String,
    pub response_time_ms: f64,
    pub status_code: u16,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl From<&ProbeResult> for StatusRow {
    fn from(result: &ProbeResult) -> Self {
        Self {
            url: result.url.clone(),
            status: result.outcome(),
            response_time: format!("{:?}", result.elapsed),
            response_time_ms: result.elapsed.as_secs_f64() * 1000.0,
            status_code: result.status_code_or_zero(),
            error: result.error.as_ref().map(ToString::to_string),
            checked_at: result.checked_at,
        }
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update(&self, result: ProbeResult) {
        self.latest.write().await.insert(result.url.clone(), result);
    }

    pub async fn get(&self, url: &str) -> Option<ProbeResult> {
        self.latest.read().await.get(url).cloned()
    }

    pub async fn len(&self) -> usize {
        self.latest.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.latest.read().await.is_empty()
    }

    /// All entries sorted by URL
    pub async fn snapshot(&self) -> Vec<StatusRow> {
        let latest = self.latest.read().await;
        let mut rows: Vec<StatusRow> = latest.values().map(StatusRow::from).collect();
        rows.sort_by(|a, b| a.url.cmp(&b.url));
        rows
    }
}

#[async_trait::async_trait]
impl ResultSink for StatusBoard {
    async fn publish(&self, result: ProbeResult) -> Result<(), SinkClosed> {
        self.update(result).await;
        Ok(())
    }
}
