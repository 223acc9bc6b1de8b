//! Per-tenant connection context for multi-tenant row isolation.
//!
//! Repositories that operate on tenant-scoped tables run inside a
//! transaction whose `app.current_tenant_id` session variable is set via
//! `SET LOCAL`, enabling the row-level security policies created by the
//! initial migration.

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use uuid::Uuid;

/// A database transaction pinned to a tenant context.
pub struct TenantConnection {
    txn: DatabaseTransaction,
}

impl TenantConnection {
    /// Begins a transaction with the given tenant as the RLS context.
    ///
    /// `SET LOCAL` scopes the setting to this transaction only.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the
    /// context cannot be set.
    pub async fn new(db: &DatabaseConnection, tenant_id: Uuid) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        set_tenant_context(&txn, tenant_id).await?;
        Ok(Self { txn })
    }

    /// Returns a reference to the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction, persisting all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the transaction, discarding all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Extension trait for `DatabaseConnection` to open tenant-scoped transactions.
#[async_trait::async_trait]
pub trait TenantExt {
    /// Opens a transaction with the given tenant as the RLS context.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be created.
    async fn with_tenant(&self, tenant_id: Uuid) -> Result<TenantConnection, DbErr>;
}

#[async_trait::async_trait]
impl TenantExt for DatabaseConnection {
    async fn with_tenant(&self, tenant_id: Uuid) -> Result<TenantConnection, DbErr> {
        TenantConnection::new(self, tenant_id).await
    }
}

/// Sets the tenant context on an existing transaction.
///
/// # Errors
///
/// Returns an error if the context cannot be set.
pub async fn set_tenant_context(txn: &DatabaseTransaction, tenant_id: Uuid) -> Result<(), DbErr> {
    let sql = format!("SET LOCAL app.current_tenant_id = '{tenant_id}'");
    txn.execute_unprepared(&sql).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    #[test]
    fn test_tenant_context_sql_format() {
        let tenant_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let sql = format!("SET LOCAL app.current_tenant_id = '{tenant_id}'");
        assert_eq!(
            sql,
            "SET LOCAL app.current_tenant_id = '550e8400-e29b-41d4-a716-446655440000'"
        );
    }
}
