//! main.rs - Entry point for the token price scan worker
//!
//! - Loads configuration from the environment (and `.env`)
//! - Starts the liveness endpoint
//! - Runs scan rounds until Ctrl+C

use log::{error, info};
use price_scan_worker::{
    shutdown_channel, HttpDispatcher, JupiterQuoteFeed, PriceReconciler, RaydiumPairFeed,
    RoundController, ScanSettings, Worker, WorkerConfig, NAME, VERSION,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = WorkerConfig::from_env()?;
    let settings = ScanSettings::default();

    info!("Starting {} v{} (worker={})", NAME, VERSION, config.worker_id);
    info!("  - Dispatcher: {}", config.dispatcher_url);
    info!(
        "  - Batch: {} tokens, {:?} per token, {:?} deadline",
        settings.batch_size, settings.item_delay, settings.price_timeout
    );

    price_scan_worker::server::spawn_liveness(&config.worker_id, config.port).await?;

    let raydium = Arc::new(RaydiumPairFeed::new()?);
    let jupiter = Arc::new(JupiterQuoteFeed::new()?);
    let dispatcher = Arc::new(HttpDispatcher::new(&config.dispatcher_url, &config.worker_id)?);

    let reconciler = PriceReconciler::new(jupiter, raydium.clone());
    let rounds = Arc::new(RoundController::new(raydium, reconciler, dispatcher, settings));

    let (handle, signal) = shutdown_channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", e);
            // Dropping the handle would stop the worker, keep it until the process is killed
            futures::future::pending::<()>().await;
        }
        info!("Shutdown signal received, finishing current round...");
        handle.shutdown();
    });

    let mut worker = Worker::new(rounds, settings.round_delay);
    worker.run(signal).await;

    info!("{} shut down cleanly.", NAME);
    Ok(())
}
