//! Health check endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use skillpass_training::application::outbox::OutboxStats;

use crate::error::ApiError;
use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Modules in the loaded catalog.
    pub modules: usize,
    /// Sessions currently open.
    pub open_sessions: usize,
    /// Persistence queue counters.
    pub persistence: OutboxStats,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        modules: state.services.catalog.len(),
        open_sessions: state.sessions.open_count()?,
        persistence: state.services.outbox.stats(),
    }))
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
