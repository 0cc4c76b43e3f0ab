use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub record_store: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Liveness plus record-store reachability. Always 200; an unreachable
/// store is reported in the body, not as an error status.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = state.store.health_check().await;

    Json(HealthResponse {
        status: "healthy",
        record_store: if reachable { "connected" } else { "disconnected" },
        timestamp: Utc::now(),
    })
}
