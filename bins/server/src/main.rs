//! Saldo worker server
//!
//! Main entry point for the ledger-posting pipeline: runs the outbox
//! dispatcher and serves the operational control API.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saldo_db::connect;
use saldo_db::repositories::{
    AccountRepository, JournalRepository, OutboxRepository, ReconRepository, RuleRepository,
};
use saldo_shared::AppConfig;
use saldo_worker::dispatcher::Dispatcher;
use saldo_worker::engine::PostingEngine;
use saldo_worker::{AppState, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saldo=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Connect to database
    let db = connect(&config.database).await?;
    info!("Connected to database");

    // Wire up repositories and the posting engine
    let journal = JournalRepository::new(db.clone());
    let accounts = AccountRepository::new(db.clone());
    let rules = RuleRepository::new(db.clone());
    let outbox = OutboxRepository::new(db.clone());
    let recon = ReconRepository::new(db.clone());

    let engine = PostingEngine::new(journal, accounts, rules, config.default_accounts.clone());
    let dispatcher = Arc::new(Dispatcher::new(
        config.worker.clone(),
        engine,
        outbox.clone(),
    ));

    // Start the polling loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher_task = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move { dispatcher.run(shutdown_rx).await }
    });

    // Create application state and router
    let state = AppState {
        db: Arc::new(db),
        dispatcher,
        outbox,
        recon,
        default_accounts: config.default_accounts,
    };
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop polling; the in-flight batch is allowed to finish.
    shutdown_tx.send(true).ok();
    dispatcher_task.await.ok();
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install shutdown signal handler");
}
