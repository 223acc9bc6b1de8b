//! Outbox dispatcher, posting engine, and HTTP control surface.
//!
//! This crate provides:
//! - The posting engine orchestrating rules, account resolution, and
//!   idempotent persistence
//! - The polling dispatcher with retry/backoff and clean shutdown
//! - Axum routes for operational control (`/health`, `/worker/*`)

pub mod dispatcher;
pub mod engine;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use saldo_db::repositories::{OutboxRepository, ReconRepository};
use saldo_shared::config::DefaultAccounts;

use crate::dispatcher::Dispatcher;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// The outbox dispatcher (also serves manual processing triggers).
    pub dispatcher: Arc<Dispatcher>,
    /// Outbox repository for health metrics.
    pub outbox: OutboxRepository,
    /// Reconciliation repository.
    pub recon: ReconRepository,
    /// Fallback account codes (the AP code drives reconciliation).
    pub default_accounts: DefaultAccounts,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
