//! config.rs - Worker configuration
//!
//! Identity, listen port and dispatcher location come from the environment
//! (a `.env` file is honoured by `main`). Cadence constants live in
//! [`ScanSettings`].

use anyhow::{Context, Result};
use std::time::Duration;

/// Default worker identity when `WORKER` is unset
pub const DEFAULT_WORKER_ID: &str = "node_004";

/// Default liveness port when `PORT` is unset
pub const DEFAULT_PORT: u16 = 3000;

/// Default dispatcher base URL when `DISPATCHER_URL` is unset
pub const DEFAULT_DISPATCHER_URL: &str = "https://dienlanhquangphat.vn/toolvip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub port: u16,
    pub dispatcher_url: String,
}

impl WorkerConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let worker_id = non_empty("WORKER").unwrap_or_else(|| DEFAULT_WORKER_ID.to_string());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT value: {raw}"))?,
            None => DEFAULT_PORT,
        };

        let dispatcher_url = non_empty("DISPATCHER_URL")
            .unwrap_or_else(|| DEFAULT_DISPATCHER_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(WorkerConfig {
            worker_id,
            port,
            dispatcher_url,
        })
    }
}

/// Batch size and timing budget of one scan round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Tokens claimed per round
    pub batch_size: usize,
    /// Pause after every token, throttles provider traffic
    pub item_delay: Duration,
    /// Pause between two rounds
    pub round_delay: Duration,
    /// Deadline for resolving one token's price
    pub price_timeout: Duration,
    /// Elapsed round time after which results are flushed early
    pub flush_after: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            batch_size: 5,
            item_delay: Duration::from_millis(2400),
            round_delay: Duration::from_millis(500),
            price_timeout: Duration::from_millis(5000),
            flush_after: Duration::from_millis(25_000),
        }
    }
}
