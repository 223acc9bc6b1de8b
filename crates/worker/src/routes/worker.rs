//! Dispatcher control endpoints: status and manual processing.

use axum::{Json, Router, extract::State, http::StatusCode, routing::{get, post}};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use saldo_shared::AppError;

use crate::AppState;
use crate::dispatcher::{BatchOutcome, WorkerMetrics};
use crate::routes::error_response;

/// Worker status response.
#[derive(Serialize)]
pub struct WorkerStatusResponse {
    /// Whether the polling loop is active.
    pub is_running: bool,
    /// When the dispatcher started.
    pub started_at: DateTime<Utc>,
    /// Last poll tick, if any.
    pub last_poll_at: Option<DateTime<Utc>>,
    /// Configured poll interval in seconds.
    pub poll_interval_secs: u64,
    /// Lifetime counters.
    pub metrics: WorkerMetrics,
}

/// Request body for the manual processing trigger.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessOutboxRequest {
    /// Batch size override; defaults to the configured batch size.
    pub batch_size: Option<u64>,
    /// Re-queue failed and dead events before claiming.
    #[serde(default)]
    pub force_retry: bool,
}

/// Worker status handler.
async fn get_worker_status(State(state): State<AppState>) -> Json<WorkerStatusResponse> {
    let status = state.dispatcher.status();
    Json(WorkerStatusResponse {
        is_running: status.is_running.load(std::sync::atomic::Ordering::Relaxed),
        started_at: status.started_at,
        last_poll_at: status.last_poll_at(),
        poll_interval_secs: state.dispatcher.poll_interval_secs(),
        metrics: status.metrics(),
    })
}

/// Manual processing trigger for operational intervention.
async fn process_outbox(
    State(state): State<AppState>,
    body: Option<Json<ProcessOutboxRequest>>,
) -> Result<Json<BatchOutcome>, (StatusCode, Json<serde_json::Value>)> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let batch_size = request
        .batch_size
        .unwrap_or_else(|| state.dispatcher.batch_size());

    info!(
        batch_size,
        force_retry = request.force_retry,
        "Manual outbox processing triggered"
    );

    let outcome = state
        .dispatcher
        .process_batch(batch_size, request.force_retry)
        .await
        .map_err(|err| {
            error!(error = %err, "Manual outbox processing failed");
            error_response(&AppError::Database(err.to_string()))
        })?;

    Ok(Json(outcome))
}

/// Creates the worker control routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/worker/status", get(get_worker_status))
        .route("/worker/process", post(process_outbox))
}
