//! Chart of accounts repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use saldo_core::ledger::{AccountRef, PostingError};
use saldo_shared::types::{AccountId, TenantId};

use crate::entities::{chart_of_accounts, sea_orm_active_enums::AccountType};

/// Repository for the chart_of_accounts table.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an account by tenant and code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<chart_of_accounts::Model>, DbErr> {
        chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(chart_of_accounts::Column::Code.eq(code))
            .one(&self.db)
            .await
    }

    /// Resolves a code to an active posting target.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::AccountNotFound` when the code does not exist
    /// for the tenant or the account is inactive; `PostingError::Database`
    /// on query failure.
    pub async fn require_active_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<AccountRef, PostingError> {
        let account = self
            .find_by_code(tenant_id, code)
            .await
            .map_err(|err| PostingError::Database(err.to_string()))?
            .filter(|a| a.is_active)
            .ok_or_else(|| PostingError::AccountNotFound {
                code: code.to_string(),
            })?;

        Ok(AccountRef::new(AccountId::from_uuid(account.id), account.code))
    }

    /// Inserts an account. Used by seeding and tenant provisioning.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn insert(
        &self,
        tenant_id: TenantId,
        code: &str,
        name: &str,
        account_type: AccountType,
    ) -> Result<chart_of_accounts::Model, DbErr> {
        chart_of_accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id.into_inner()),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            account_type: Set(account_type),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
    }
}
