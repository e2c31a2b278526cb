//! server.rs - Liveness endpoint
//!
//! `GET /` answers in plain text so the hosting platform keeps the worker up.

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Router};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct LivenessState {
    worker_id: Arc<str>,
}

/// Build the liveness router for `worker_id`
pub fn build_router(worker_id: &str) -> Router {
    Router::new()
        .route("/", get(liveness))
        .with_state(LivenessState {
            worker_id: Arc::from(worker_id),
        })
}

async fn liveness(State(state): State<LivenessState>) -> String {
    format!("✅ Worker [{}] is running.", state.worker_id)
}

/// Bind `0.0.0.0:port` and serve the router on a background task.
///
/// Binding happens before returning so a taken port fails startup.
pub async fn spawn_liveness(worker_id: &str, port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind liveness port {port}"))?;
    let local_addr = listener.local_addr()?;
    let app = build_router(worker_id);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Liveness server stopped: {}", e);
        }
    });

    info!("✓ Liveness endpoint listening on {}", local_addr);
    Ok(local_addr)
}
