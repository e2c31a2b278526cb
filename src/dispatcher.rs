//! dispatcher.rs - Client for the remote work dispatcher
//!
//! `claim` hands out tokens for this worker, `submit` reports prices back.
//! The dispatcher runs on a self-managed endpoint, so certificate
//! validation is disabled for this client only.

use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use serde_json::Value;

use crate::error::{check_status, FetchError, FetchResult};
use crate::models::{ResultRecord, WorkItem};

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Claim up to `count` tokens; empty on any failure
    async fn claim(&self, count: usize) -> Vec<WorkItem>;

    /// Report results; failures are logged and the results are lost
    async fn submit(&self, results: &[ResultRecord]);
}

/// Work items from a claim payload: an array, a single object with a
/// non-empty `mint`, or anything else meaning nothing is pending.
/// Array entries that do not decode are logged and skipped.
fn items_from_value(value: Value) -> Vec<WorkItem> {
    match value {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<WorkItem>(entry.clone()) {
                Ok(item) if !item.mint.is_empty() => Some(item),
                Ok(_) => {
                    warn!("Claimed entry without mint skipped: {}", entry);
                    None
                }
                Err(e) => {
                    warn!("Claimed entry skipped ({}): {}", e, entry);
                    None
                }
            })
            .collect(),
        Value::Object(_) => serde_json::from_value::<WorkItem>(value)
            .ok()
            .filter(|item| !item.mint.is_empty())
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// HTTP dispatcher at `{base}/assign-token` and `{base}/update-token`
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    base_url: String,
    worker_id: String,
}

impl HttpDispatcher {
    pub fn new(base_url: &str, worker_id: &str) -> FetchResult<Self> {
        let client = Client::builder().danger_accept_invalid_certs(true).build()?;

        Ok(HttpDispatcher {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            worker_id: worker_id.to_string(),
        })
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    async fn try_claim(&self, count: usize) -> FetchResult<Vec<WorkItem>> {
        let url = format!("{}/assign-token", self.base_url);
        let count = count.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("worker", self.worker_id.as_str()), ("count", count.as_str())])
            .send()
            .await?;

        let body = check_status(response)?.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(items_from_value(value))
    }

    async fn try_submit(&self, results: &[ResultRecord]) -> FetchResult<()> {
        let url = format!("{}/update-token", self.base_url);
        let response = self.client.post(&url).json(results).send().await?;
        check_status(response)?;
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn claim(&self, count: usize) -> Vec<WorkItem> {
        match self.try_claim(count).await {
            Ok(items) => items,
            Err(e) => {
                error!("✗ assign-token failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn submit(&self, results: &[ResultRecord]) {
        if results.is_empty() {
            return;
        }

        match self.try_submit(results).await {
            Ok(()) => info!("🚀 Submitted {} token prices", results.len()),
            Err(e) => error!("✗ Submit of {} results failed: {}", results.len(), e),
        }
    }
}
