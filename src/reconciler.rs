//! reconciler.rs - Turns two provider quotes into one canonical price
//!
//! Both lookups run on a detached task raced against a deadline. When the
//! deadline wins the task is left to finish on its own; provider calls are
//! read-only so a late result has no effect.

use futures::FutureExt;
use log::{debug, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{PriceQuote, PriceSnapshot};
use crate::price_feed::PriceProvider;

/// Pick the canonical quote.
///
/// With two quotes the higher value wins and ties go to the primary source.
/// The preference for the higher price is a business rule and is kept as is.
pub fn reconcile(primary: Option<PriceQuote>, secondary: Option<PriceQuote>) -> Option<PriceQuote> {
    match (primary, secondary) {
        (Some(a), Some(b)) => Some(if b.value > a.value { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// One provider lookup; a panicking provider counts as unavailable
async fn guarded_quote(
    provider: &dyn PriceProvider,
    mint: &str,
    snapshot: &PriceSnapshot,
) -> Option<PriceQuote> {
    match AssertUnwindSafe(provider.quote(mint, snapshot)).catch_unwind().await {
        Ok(quote) => quote,
        Err(_) => {
            warn!("{} lookup for {} panicked", provider.source(), mint);
            None
        }
    }
}

pub struct PriceReconciler {
    primary: Arc<dyn PriceProvider>,
    secondary: Arc<dyn PriceProvider>,
}

impl PriceReconciler {
    /// `primary` is the direct-quote source, `secondary` the pair-table source
    pub fn new(primary: Arc<dyn PriceProvider>, secondary: Arc<dyn PriceProvider>) -> Self {
        PriceReconciler { primary, secondary }
    }

    /// Resolve one mint within `deadline`; `None` if nothing usable arrived in time
    pub async fn resolve(
        &self,
        mint: &str,
        snapshot: &Arc<PriceSnapshot>,
        deadline: Duration,
    ) -> Option<PriceQuote> {
        let primary = Arc::clone(&self.primary);
        let secondary = Arc::clone(&self.secondary);
        let snapshot = Arc::clone(snapshot);
        let owned_mint = mint.to_string();

        let lookup = tokio::spawn(async move {
            let (a, b) = tokio::join!(
                guarded_quote(primary.as_ref(), &owned_mint, &snapshot),
                guarded_quote(secondary.as_ref(), &owned_mint, &snapshot),
            );
            reconcile(a, b)
        });

        // Dropping the JoinHandle on timeout detaches the task without aborting it
        match tokio::time::timeout(deadline, lookup).await {
            Ok(Ok(quote)) => quote,
            Ok(Err(e)) => {
                warn!("Price lookup task for {} failed: {}", mint, e);
                None
            }
            Err(_) => {
                debug!("Price lookup for {} exceeded {:?}", mint, deadline);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PairRecord, PriceSource};
    use crate::price_feed::WSOL_MINT;
    use crate::test_support::{PanickingProvider, SnapshotProvider, StaticProvider};
    use rust_decimal_macros::dec;

    const DEADLINE: Duration = Duration::from_millis(5000);

    fn jupiter(value: rust_decimal::Decimal) -> PriceQuote {
        PriceQuote::new(value, PriceSource::Jupiter)
    }

    fn raydium(value: rust_decimal::Decimal) -> PriceQuote {
        PriceQuote::new(value, PriceSource::Raydium)
    }

    #[test]
    fn test_reconcile_prefers_higher() {
        assert_eq!(
            reconcile(Some(jupiter(dec!(1.0))), Some(raydium(dec!(1.2)))),
            Some(raydium(dec!(1.2)))
        );
        assert_eq!(
            reconcile(Some(jupiter(dec!(2.0))), Some(raydium(dec!(1.2)))),
            Some(jupiter(dec!(2.0)))
        );
    }

    #[test]
    fn test_reconcile_tie_keeps_primary() {
        assert_eq!(
            reconcile(Some(jupiter(dec!(1.5))), Some(raydium(dec!(1.5)))),
            Some(jupiter(dec!(1.5)))
        );
    }

    #[test]
    fn test_reconcile_single_or_none() {
        assert_eq!(reconcile(Some(jupiter(dec!(3))), None), Some(jupiter(dec!(3))));
        assert_eq!(reconcile(None, Some(raydium(dec!(4)))), Some(raydium(dec!(4))));
        assert_eq!(reconcile(None, None), None);
    }

    #[tokio::test]
    async fn test_resolve_only_primary() {
        let reconciler = PriceReconciler::new(
            Arc::new(StaticProvider::new(PriceSource::Jupiter).with_price("mintA", dec!(0.7))),
            Arc::new(StaticProvider::new(PriceSource::Raydium)),
        );
        let snapshot = Arc::new(PriceSnapshot::empty());

        let quote = reconciler.resolve("mintA", &snapshot, DEADLINE).await;
        assert_eq!(quote, Some(jupiter(dec!(0.7))));
    }

    #[tokio::test]
    async fn test_resolve_both_takes_max() {
        let reconciler = PriceReconciler::new(
            Arc::new(StaticProvider::new(PriceSource::Jupiter).with_price("mintA", dec!(0.7))),
            Arc::new(StaticProvider::new(PriceSource::Raydium).with_price("mintA", dec!(0.9))),
        );
        let snapshot = Arc::new(PriceSnapshot::empty());

        let quote = reconciler.resolve("mintA", &snapshot, DEADLINE).await;
        assert_eq!(quote, Some(raydium(dec!(0.9))));
    }

    #[tokio::test]
    async fn test_secondary_uses_snapshot_reference_pairs_only() {
        let reconciler = PriceReconciler::new(
            Arc::new(StaticProvider::new(PriceSource::Jupiter)),
            Arc::new(SnapshotProvider::default()),
        );
        let snapshot = Arc::new(PriceSnapshot::new(vec![
            PairRecord::new("mintA", WSOL_MINT, Some(dec!(0.2))),
            PairRecord::new("mintB", "usdc", Some(dec!(9))),
        ]));

        assert_eq!(
            reconciler.resolve("mintA", &snapshot, DEADLINE).await,
            Some(raydium(dec!(0.2)))
        );
        assert_eq!(reconciler.resolve("mintB", &snapshot, DEADLINE).await, None);
    }

    #[tokio::test]
    async fn test_empty_snapshot_leaves_primary_unaffected() {
        let reconciler = PriceReconciler::new(
            Arc::new(StaticProvider::new(PriceSource::Jupiter).with_price("mintA", dec!(0.1))),
            Arc::new(SnapshotProvider::default()),
        );
        let snapshot = Arc::new(PriceSnapshot::empty());

        assert_eq!(
            reconciler.resolve("mintA", &snapshot, DEADLINE).await,
            Some(jupiter(dec!(0.1)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_past_deadline_is_dropped() {
        let slow = Duration::from_millis(6000);
        let reconciler = PriceReconciler::new(
            Arc::new(
                StaticProvider::new(PriceSource::Jupiter)
                    .with_price("mintA", dec!(1))
                    .with_latency(slow),
            ),
            Arc::new(
                StaticProvider::new(PriceSource::Raydium)
                    .with_price("mintA", dec!(2))
                    .with_latency(slow),
            ),
        );
        let snapshot = Arc::new(PriceSnapshot::empty());

        let started = tokio::time::Instant::now();
        let quote = reconciler.resolve("mintA", &snapshot, DEADLINE).await;
        assert_eq!(quote, None);
        assert!(started.elapsed() >= DEADLINE);
        assert!(started.elapsed() < slow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_within_deadline() {
        let reconciler = PriceReconciler::new(
            Arc::new(
                StaticProvider::new(PriceSource::Jupiter)
                    .with_price("mintA", dec!(1))
                    .with_latency(Duration::from_millis(4000)),
            ),
            Arc::new(
                StaticProvider::new(PriceSource::Raydium)
                    .with_latency(Duration::from_millis(4500)),
            ),
        );
        let snapshot = Arc::new(PriceSnapshot::empty());

        let quote = reconciler.resolve("mintA", &snapshot, DEADLINE).await;
        assert_eq!(quote, Some(jupiter(dec!(1))));
    }

    #[tokio::test]
    async fn test_panicking_provider_leaves_other_quote() {
        let reconciler = PriceReconciler::new(
            Arc::new(PanickingProvider),
            Arc::new(StaticProvider::new(PriceSource::Raydium).with_price("mintA", dec!(2))),
        );
        let snapshot = Arc::new(PriceSnapshot::empty());

        assert_eq!(
            reconciler.resolve("mintA", &snapshot, DEADLINE).await,
            Some(raydium(dec!(2)))
        );
    }

    #[tokio::test]
    async fn test_both_providers_panicking_is_unavailable() {
        let reconciler =
            PriceReconciler::new(Arc::new(PanickingProvider), Arc::new(PanickingProvider));
        let snapshot = Arc::new(PriceSnapshot::empty());

        assert_eq!(reconciler.resolve("mintA", &snapshot, DEADLINE).await, None);
    }
}
