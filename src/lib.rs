//! Token Price Scan Worker
//!
//! One replica of a fleet that prices Solana tokens for a central dispatcher.
//!
//! # Round
//! - Claim a small batch of tokens for this worker identity
//! - Price each token from Jupiter and Raydium under a 5 s deadline
//! - Keep the higher of the two quotes, report results back in claim order
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Worker Loop                       │
//! │  (rounds back-to-back, 500 ms pause, shutdown hook)  │
//! └────────────────────────┬────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                 RoundController                      │
//! │  - fetch snapshot, claim batch                       │
//! │  - resolve per token, paced                          │
//! │  - early / final flush                               │
//! └───────────┬─────────────────────────────┬───────────┘
//!             │                             │
//!             ▼                             ▼
//! ┌─────────────────────┐         ┌─────────────────────┐
//! │   PriceReconciler   │         │    HttpDispatcher   │
//! │  race + tie-break   │         │   claim / submit    │
//! └──────────┬──────────┘         └─────────────────────┘
//!            │
//!     ┌──────┴───────┐
//!     ▼              ▼
//! ┌─────────┐  ┌─────────┐
//! │ Jupiter │  │ Raydium │
//! └─────────┘  └─────────┘
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod price_feed;
pub mod reconciler;
pub mod round;
pub mod server;
pub mod worker;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{ScanSettings, WorkerConfig};
pub use dispatcher::{Dispatcher, HttpDispatcher};
pub use error::FetchError;
pub use models::{PairRecord, PriceQuote, PriceSnapshot, PriceSource, ResultRecord, WorkItem};
pub use price_feed::{JupiterQuoteFeed, PriceProvider, RaydiumPairFeed, SnapshotSource};
pub use reconciler::{reconcile, PriceReconciler};
pub use round::{RoundController, RoundReport, ScanRound};
pub use worker::{shutdown_channel, ShutdownHandle, Worker};

/// Version of the worker
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the package
pub const NAME: &str = env!("CARGO_PKG_NAME");
