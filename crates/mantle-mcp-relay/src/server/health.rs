//! Liveness probe for load balancers.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::routes::AppState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    /// Sessions whose stream is held by this worker.
    pub sessions: usize,
    /// Channels with at least one in-process listener.
    pub channels: usize,
    /// Whether messages can cross to other workers.
    pub shared_store: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let relay = state.transport.relay();
    Json(HealthReport {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.transport.sessions().active_count().await,
        channels: relay.registry().channel_count(),
        shared_store: relay.has_store(),
    })
}
