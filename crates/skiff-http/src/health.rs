//! Operational check endpoints, opt-in via configuration.
//!
//! `/health` reports status, uptime, and a timestamp; `/health/ready` and
//! `/health/live` exist for orchestrators that probe them separately. In
//! secure mode the detailed body is reserved for loopback peers, everyone
//! else gets a bare `OK`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthOptions {
    pub enabled: bool,
    /// Restrict detailed output to loopback peers.
    pub secure: bool,
}

struct HealthState {
    started: Instant,
    secure: bool,
}

/// The `/health` route tree. Callers merge this into their router only when
/// the feature is enabled.
pub fn router(options: HealthOptions) -> Router {
    let state = Arc::new(HealthState {
        started: Instant::now(),
        secure: options.secure,
    });
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(|| async { "READY" }))
        .route("/health/live", get(|| async { "ALIVE" }))
        .with_state(state)
}

async fn health(
    State(state): State<Arc<HealthState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    if state.secure && !peer.ip().is_loopback() {
        return "OK".into_response();
    }
    Json(json!({
        "status": "UP",
        "uptimeSeconds": state.started.elapsed().as_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response()
}
