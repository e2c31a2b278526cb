//! round.rs - One claim → resolve → submit cycle
//!
//! A round fetches the Raydium pair snapshot, claims a batch from the
//! dispatcher and prices each token in claim order. Results are buffered and
//! flushed early once the round runs past its time budget, then once more at
//! the end. Nothing escapes a round: failures only mean fewer results.

use async_trait::async_trait;
use futures::FutureExt;
use log::{error, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::ScanSettings;
use crate::dispatcher::Dispatcher;
use crate::models::ResultRecord;
use crate::price_feed::SnapshotSource;
use crate::reconciler::PriceReconciler;

/// What a round did, for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Tokens claimed from the dispatcher
    pub claimed: usize,
    /// Tokens that got a canonical price
    pub resolved: usize,
    /// Submit calls made because the round ran past its time budget
    pub early_flushes: usize,
    /// Whether the end-of-round flush had anything to send
    pub final_flush: bool,
}

/// Something the worker loop can run once per round
#[async_trait]
pub trait ScanRound: Send + Sync {
    /// Run round `round`; never fails
    async fn run_round(&self, round: u64) -> RoundReport;
}

pub struct RoundController {
    snapshots: Arc<dyn SnapshotSource>,
    reconciler: PriceReconciler,
    dispatcher: Arc<dyn Dispatcher>,
    settings: ScanSettings,
}

impl RoundController {
    pub fn new(
        snapshots: Arc<dyn SnapshotSource>,
        reconciler: PriceReconciler,
        dispatcher: Arc<dyn Dispatcher>,
        settings: ScanSettings,
    ) -> Self {
        RoundController {
            snapshots,
            reconciler,
            dispatcher,
            settings,
        }
    }

    async fn scan(&self, round: u64) -> RoundReport {
        let mut report = RoundReport::default();

        let snapshot = Arc::new(self.snapshots.fetch_snapshot().await);
        if snapshot.is_empty() {
            warn!("Round {}: empty Raydium snapshot, Jupiter only", round);
        }

        let scan_time = local_time();
        let items = self.dispatcher.claim(self.settings.batch_size).await;
        report.claimed = items.len();

        if items.is_empty() {
            info!("⏳ Round {}: no pending tokens", round);
            return report;
        }

        let mut buffer: Vec<ResultRecord> = Vec::with_capacity(items.len());
        let started = Instant::now();

        for item in &items {
            match self
                .reconciler
                .resolve(&item.mint, &snapshot, self.settings.price_timeout)
                .await
            {
                Some(quote) => {
                    info!("✅ [{}] price: {}", item, quote);
                    buffer.push(ResultRecord::new(item, &quote, &scan_time));
                    report.resolved += 1;
                }
                None => warn!("✗ [{}] skipped: no price in time", item),
            }

            tokio::time::sleep(self.settings.item_delay).await;

            if !buffer.is_empty() && started.elapsed() > self.settings.flush_after {
                warn!(
                    "Round {}: {:?} elapsed, flushing {} results early",
                    round,
                    started.elapsed(),
                    buffer.len()
                );
                self.flush(&mut buffer).await;
                report.early_flushes += 1;
            }
        }

        if !buffer.is_empty() {
            self.flush(&mut buffer).await;
            report.final_flush = true;
        }

        report
    }

    async fn flush(&self, buffer: &mut Vec<ResultRecord>) {
        self.dispatcher.submit(buffer).await;
        buffer.clear();
    }
}

#[async_trait]
impl ScanRound for RoundController {
    async fn run_round(&self, round: u64) -> RoundReport {
        match AssertUnwindSafe(self.scan(round)).catch_unwind().await {
            Ok(report) => report,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("✗ Round {} aborted: {}", round, reason);
                RoundReport::default()
            }
        }
    }
}

/// Wall-clock time of day, `HH:MM:SS`
fn local_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
