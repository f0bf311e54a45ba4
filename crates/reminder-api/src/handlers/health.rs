//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::dto::HealthResponse;
use crate::state::AppState;

/// GET /api/health
///
/// Liveness only: a queue read failure is logged and reported by omitting
/// the stats, never by failing the probe.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue = match state.schedule_store.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read queue stats for health check");
            None
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        queue,
    })
}
