//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//! - Per-tenant connection context for row isolation

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod tenant;

pub use repositories::{
    AccountRepository, JournalRepository, OutboxRepository, ReconRepository, RuleRepository,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use saldo_shared::config::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// Connection acquisition and statements carry timeouts so no caller
/// blocks indefinitely on a wedged pool.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(&config.url);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}
