//! Health check endpoint.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::error;

use saldo_db::repositories::OutboxCounts;
use saldo_shared::AppError;

use crate::AppState;
use crate::dispatcher::WorkerMetrics;
use crate::routes::error_response;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Worker counters.
    pub metrics: WorkerMetrics,
    /// Outbox depth by status.
    pub outbox: OutboxCounts,
}

/// Health check handler.
async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<serde_json::Value>)> {
    let outbox = state.outbox.status_counts().await.map_err(|err| {
        error!(error = %err, "Health check failed to read outbox");
        error_response(&AppError::Database(err.to_string()))
    })?;

    Ok(Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        metrics: state.dispatcher.status().metrics(),
        outbox,
    }))
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
