//! # Probe and Metrics Server
//!
//! HTTP endpoints for liveness (`/healthz`), readiness (`/readyz`), and
//! Prometheus metrics (`/metrics`). Binding this listener is the third
//! bootstrap stage: once the socket is bound, the server signals the
//! coordinator and then serves. The readiness flag itself is flipped by the
//! coordinator, exactly once, after all stages complete — a bound listener
//! alone does not make the store ready.

use crate::observability::metrics;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared server state for health checks
#[derive(Debug, Default)]
pub struct ServerState {
    /// Flipped once by the bootstrap coordinator on READY
    pub is_ready: AtomicBool,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.is_ready.store(true, Ordering::Relaxed);
    }

    pub fn ready(&self) -> bool {
        self.is_ready.load(Ordering::Relaxed)
    }
}

/// Bind the probe/metrics listener and serve until the process exits
///
/// Sends on `started` exactly once, after the bind succeeds.
pub async fn start_server(
    port: u16,
    state: Arc<ServerState>,
    started: mpsc::Sender<()>,
) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::clone(&state))
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Probe server listening on {}", addr);

    let _ = started.send(()).await;

    axum::serve(listener, app).await?;
    Ok(())
}

/// Liveness: the process is running and able to answer
async fn healthz() -> &'static str {
    "OK"
}

/// Readiness: 200 once bootstrap completed, 503 before that
async fn readyz(State(state): State<Arc<ServerState>>) -> (StatusCode, &'static str) {
    if state.ready() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics_handler() -> (StatusCode, String) {
    match metrics::metrics_text() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_starts_not_ready_and_flips_once() {
        let state = ServerState::new();
        assert!(!state.ready());
        state.mark_ready();
        assert!(state.ready());
        state.mark_ready();
        assert!(state.ready());
    }
}
