//! In-memory providers and dispatcher for unit tests

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::dispatcher::Dispatcher;
use crate::models::{PriceQuote, PriceSnapshot, PriceSource, ResultRecord, WorkItem};
use crate::price_feed::{PriceProvider, SnapshotSource, WSOL_MINT};

/// Fixed price table with optional simulated latency
pub struct StaticProvider {
    source: PriceSource,
    prices: HashMap<String, Decimal>,
    latency: Duration,
}

impl StaticProvider {
    pub fn new(source: PriceSource) -> Self {
        StaticProvider {
            source,
            prices: HashMap::new(),
            latency: Duration::ZERO,
        }
    }

    pub fn with_price(mut self, mint: &str, price: Decimal) -> Self {
        self.prices.insert(mint.to_string(), price);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl PriceProvider for StaticProvider {
    fn source(&self) -> PriceSource {
        self.source
    }

    async fn quote(&self, mint: &str, _snapshot: &PriceSnapshot) -> Option<PriceQuote> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.prices
            .get(mint)
            .map(|price| PriceQuote::new(*price, self.source))
    }
}

/// Pair-table provider without the listing request
#[derive(Default)]
pub struct SnapshotProvider;

#[async_trait]
impl PriceProvider for SnapshotProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Raydium
    }

    async fn quote(&self, mint: &str, snapshot: &PriceSnapshot) -> Option<PriceQuote> {
        snapshot
            .reference_price(mint, WSOL_MINT)
            .map(|price| PriceQuote::new(price, PriceSource::Raydium))
    }
}

pub struct PanickingProvider;

#[async_trait]
impl PriceProvider for PanickingProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Jupiter
    }

    async fn quote(&self, mint: &str, _snapshot: &PriceSnapshot) -> Option<PriceQuote> {
        panic!("provider blew up on {mint}");
    }
}

pub struct FixedSnapshots {
    snapshot: PriceSnapshot,
}

impl FixedSnapshots {
    pub fn new(snapshot: PriceSnapshot) -> Self {
        FixedSnapshots { snapshot }
    }
}

#[async_trait]
impl SnapshotSource for FixedSnapshots {
    async fn fetch_snapshot(&self) -> PriceSnapshot {
        self.snapshot.clone()
    }
}

pub struct PanickingSnapshots;

#[async_trait]
impl SnapshotSource for PanickingSnapshots {
    async fn fetch_snapshot(&self) -> PriceSnapshot {
        panic!("snapshot source blew up");
    }
}

/// Hands out the same batch on every claim and records every call
pub struct RecordingDispatcher {
    batch: Vec<WorkItem>,
    claims: Mutex<Vec<usize>>,
    submissions: Mutex<Vec<Vec<ResultRecord>>>,
}

impl RecordingDispatcher {
    pub fn new(batch: Vec<WorkItem>) -> Self {
        RecordingDispatcher {
            batch,
            claims: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn claimed_counts(&self) -> Vec<usize> {
        self.claims.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<Vec<ResultRecord>> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn claim(&self, count: usize) -> Vec<WorkItem> {
        self.claims.lock().unwrap().push(count);
        self.batch.iter().take(count).cloned().collect()
    }

    async fn submit(&self, results: &[ResultRecord]) {
        if results.is_empty() {
            return;
        }
        self.submissions.lock().unwrap().push(results.to_vec());
    }
}

/// Serve `router` on an ephemeral localhost port, returns its base URL
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a localhost port nothing listens on
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
