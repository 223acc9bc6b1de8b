//! Rule repository: persistence and caching for tenant rule sets.
//!
//! Read-heavy: every posted event consults up to three rule types. Rule
//! sets are cached per `(tenant_id, rule_type)` with write-through
//! invalidation on upsert plus a short TTL bounding staleness in other
//! worker instances.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use thiserror::Error;
use tracing::warn;

use saldo_core::rules::{Rule, RuleError, RuleType};
use saldo_shared::types::{RuleId, TenantId};

use crate::entities::rules;

/// Cache capacity (rule sets, not individual rules).
const CACHE_CAPACITY: u64 = 10_000;

/// Cache TTL bounding staleness across worker instances.
const CACHE_TTL_SECS: u64 = 60;

/// Errors from rule store operations.
#[derive(Debug, Error)]
pub enum RuleStoreError {
    /// The rule definition failed validation; nothing was written.
    #[error("Invalid rule: {0}")]
    Invalid(#[from] RuleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Repository for the rules table with a per-`(tenant, type)` cache.
#[derive(Clone)]
pub struct RuleRepository {
    db: DatabaseConnection,
    cache: Cache<(TenantId, RuleType), Arc<Vec<Rule>>>,
}

impl RuleRepository {
    /// Creates a new rule repository with the default cache settings.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .build();
        Self { db, cache }
    }

    /// Returns the active rules for a tenant and type, cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the load query fails.
    pub async fn get_rules(
        &self,
        tenant_id: TenantId,
        rule_type: RuleType,
    ) -> Result<Arc<Vec<Rule>>, DbErr> {
        let db = self.db.clone();
        self.cache
            .try_get_with((tenant_id, rule_type), async move {
                load_rules(&db, tenant_id, rule_type).await
            })
            .await
            .map_err(|err: Arc<DbErr>| DbErr::Custom(err.to_string()))
    }

    /// Validates and writes a rule, invalidating the tenant's cache entries.
    ///
    /// Malformed definitions are rejected with the specific problem, never
    /// silently accepted.
    ///
    /// # Errors
    ///
    /// Returns `RuleStoreError::Invalid` on validation failure, or
    /// `RuleStoreError::Database` if the write fails.
    pub async fn upsert_rule(&self, rule: &Rule) -> Result<(), RuleStoreError> {
        rule.validate()?;

        let now = chrono::Utc::now().into();
        let model = rules::ActiveModel {
            id: Set(rule.id.into_inner()),
            tenant_id: Set(rule.tenant_id.into_inner()),
            rule_type: Set(rule.rule_type.into()),
            name: Set(rule.name.clone()),
            condition: Set(serde_json::to_value(&rule.condition).unwrap_or_default()),
            action: Set(serde_json::Value::Object(rule.action.clone())),
            priority: Set(rule.priority),
            is_active: Set(rule.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        rules::Entity::insert(model)
            .on_conflict(
                OnConflict::column(rules::Column::Id)
                    .update_columns([
                        rules::Column::RuleType,
                        rules::Column::Name,
                        rules::Column::Condition,
                        rules::Column::Action,
                        rules::Column::Priority,
                        rules::Column::IsActive,
                        rules::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(RuleStoreError::Database)?;

        self.invalidate_tenant(rule.tenant_id).await;
        Ok(())
    }

    /// Deactivates a rule, invalidating the tenant's cache entries.
    ///
    /// Returns false when the rule does not exist for the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn deactivate_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
    ) -> Result<bool, DbErr> {
        let result = rules::Entity::update_many()
            .col_expr(
                rules::Column::IsActive,
                sea_orm::sea_query::Expr::value(false),
            )
            .col_expr(
                rules::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now()),
            )
            .filter(rules::Column::Id.eq(rule_id.into_inner()))
            .filter(rules::Column::TenantId.eq(tenant_id.into_inner()))
            .exec(&self.db)
            .await?;

        self.invalidate_tenant(tenant_id).await;
        Ok(result.rows_affected > 0)
    }

    /// Lists every rule configured for a tenant, uncached.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_rules(&self, tenant_id: TenantId) -> Result<Vec<Rule>, DbErr> {
        let models = rules::Entity::find()
            .filter(rules::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_desc(rules::Column::Priority)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().filter_map(to_domain).collect())
    }

    /// A rule's type may have changed, so every type key for the tenant is
    /// dropped.
    async fn invalidate_tenant(&self, tenant_id: TenantId) {
        for rule_type in [
            RuleType::ProductMapping,
            RuleType::TaxCalculation,
            RuleType::DiscountCalculation,
            RuleType::InventoryAlert,
        ] {
            self.cache.invalidate(&(tenant_id, rule_type)).await;
        }
    }

    /// Number of cached rule sets, for metrics.
    #[must_use]
    pub fn cached_entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

async fn load_rules(
    db: &DatabaseConnection,
    tenant_id: TenantId,
    rule_type: RuleType,
) -> Result<Arc<Vec<Rule>>, DbErr> {
    let models = rules::Entity::find()
        .filter(rules::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(rules::Column::RuleType.eq(crate::entities::sea_orm_active_enums::RuleType::from(
            rule_type,
        )))
        .filter(rules::Column::IsActive.eq(true))
        .order_by_desc(rules::Column::Priority)
        .all(db)
        .await?;

    Ok(Arc::new(models.into_iter().filter_map(to_domain).collect()))
}

/// Maps a stored row to the domain rule, skipping rows whose JSON no
/// longer parses (pre-validation legacy data).
fn to_domain(model: rules::Model) -> Option<Rule> {
    let condition = match serde_json::from_value(model.condition) {
        Ok(condition) => condition,
        Err(err) => {
            warn!(rule_id = %model.id, error = %err, "Skipping rule with unparseable condition");
            return None;
        }
    };
    let serde_json::Value::Object(action) = model.action else {
        warn!(rule_id = %model.id, "Skipping rule with non-object action");
        return None;
    };

    Some(Rule {
        id: RuleId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        rule_type: model.rule_type.into(),
        name: model.name,
        condition,
        action,
        priority: model.priority,
        is_active: model.is_active,
    })
}
