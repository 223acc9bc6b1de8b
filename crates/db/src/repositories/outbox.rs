//! Outbox repository: durable event queue access for the dispatcher.
//!
//! Rows are appended by upstream writers (and the seeder), mutated only
//! through the claim/complete/retry transitions here, and never deleted.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, Set, Statement,
};
use serde_json::Value;
use uuid::Uuid;

use saldo_shared::types::{OutboxEventId, TenantId};

use crate::entities::{outbox_events, sea_orm_active_enums::OutboxStatus};

/// Outbox row counts by status, for health metrics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct OutboxCounts {
    /// Rows waiting to be claimed.
    pub pending: u64,
    /// Rows claimed by a dispatcher instance.
    pub processing: u64,
    /// Successfully processed rows.
    pub done: u64,
    /// Rows whose retry budget is exhausted.
    pub failed: u64,
    /// Permanently failed rows.
    pub dead: u64,
}

#[derive(FromQueryResult)]
struct StatusCount {
    status: String,
    count: i64,
}

/// Repository for the outbox_events table.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    db: DatabaseConnection,
}

impl OutboxRepository {
    /// Creates a new outbox repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends a pending event.
    ///
    /// In production, upstream services append within their own database
    /// transaction; this method serves seeding, tests, and manual ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn append(
        &self,
        tenant_id: TenantId,
        event_type: &str,
        payload: Value,
    ) -> Result<outbox_events::Model, DbErr> {
        let now = Utc::now().into();
        let event = outbox_events::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id.into_inner()),
            event_type: Set(event_type.to_string()),
            payload: Set(payload),
            status: Set(OutboxStatus::Pending),
            attempt_count: Set(0),
            last_error: Set(None),
            next_attempt_at: Set(now),
            created_at: Set(now),
            processed_at: Set(None),
        };
        event.insert(&self.db).await
    }

    /// Atomically claims a batch of due pending events.
    ///
    /// The conditional update with `FOR UPDATE SKIP LOCKED` guarantees two
    /// dispatcher instances never both claim the same event.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim query fails.
    pub async fn claim_batch(&self, limit: u64) -> Result<Vec<outbox_events::Model>, DbErr> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r"
            UPDATE outbox_events SET status = 'processing'
            WHERE id IN (
                SELECT id FROM outbox_events
                WHERE status = 'pending' AND next_attempt_at <= now()
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            ",
            [limit.into()],
        );
        outbox_events::Entity::find().from_raw_sql(stmt).all(&self.db).await
    }

    /// Re-queues failed and dead events for another attempt.
    ///
    /// `attempt_count` is left untouched for audit; only eligibility is reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn requeue_failed(&self) -> Result<u64, DbErr> {
        let result = outbox_events::Entity::update_many()
            .col_expr(
                outbox_events::Column::Status,
                sea_orm::sea_query::Expr::value(OutboxStatus::Pending),
            )
            .col_expr(
                outbox_events::Column::NextAttemptAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(
                outbox_events::Column::Status
                    .is_in([OutboxStatus::Failed, OutboxStatus::Dead]),
            )
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Marks an event done (posted, or idempotently skipped).
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_done(&self, id: OutboxEventId) -> Result<(), DbErr> {
        let event = outbox_events::ActiveModel {
            id: Set(id.into_inner()),
            status: Set(OutboxStatus::Done),
            last_error: Set(None),
            processed_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };
        event.update(&self.db).await?;
        Ok(())
    }

    /// Records a transient failure and schedules the retry.
    ///
    /// Returns the status the event transitioned to: back to `pending` with
    /// exponential backoff, or `failed` once the retry budget is spent.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_retry(
        &self,
        event: &outbox_events::Model,
        error: &str,
        max_retries: i32,
        backoff_base_secs: i64,
    ) -> Result<OutboxStatus, DbErr> {
        let attempt = event.attempt_count + 1;
        let status = if attempt >= max_retries {
            OutboxStatus::Failed
        } else {
            OutboxStatus::Pending
        };
        let next_attempt_at = Utc::now() + backoff(backoff_base_secs, attempt);

        let update = outbox_events::ActiveModel {
            id: Set(event.id),
            status: Set(status.clone()),
            attempt_count: Set(attempt),
            last_error: Set(Some(error.to_string())),
            next_attempt_at: Set(next_attempt_at.into()),
            ..Default::default()
        };
        update.update(&self.db).await?;
        Ok(status)
    }

    /// Parks an event as dead after a permanent validation failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_dead(
        &self,
        event: &outbox_events::Model,
        error: &str,
    ) -> Result<(), DbErr> {
        let update = outbox_events::ActiveModel {
            id: Set(event.id),
            status: Set(OutboxStatus::Dead),
            attempt_count: Set(event.attempt_count + 1),
            last_error: Set(Some(error.to_string())),
            processed_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };
        update.update(&self.db).await?;
        Ok(())
    }

    /// Returns row counts by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn status_counts(&self) -> Result<OutboxCounts, DbErr> {
        let stmt = Statement::from_string(
            DbBackend::Postgres,
            "SELECT status::text AS status, COUNT(*) AS count FROM outbox_events GROUP BY status",
        );
        let rows = StatusCount::find_by_statement(stmt).all(&self.db).await?;

        let mut counts = OutboxCounts::default();
        for row in rows {
            let count = u64::try_from(row.count).unwrap_or(0);
            match row.status.as_str() {
                "pending" => counts.pending = count,
                "processing" => counts.processing = count,
                "done" => counts.done = count,
                "failed" => counts.failed = count,
                "dead" => counts.dead = count,
                _ => {}
            }
        }
        Ok(counts)
    }
}

/// Longest delay between retry attempts.
const MAX_BACKOFF_SECS: i64 = 86_400;

/// Exponential backoff, capped at one day.
fn backoff(base_secs: i64, attempt: i32) -> Duration {
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(0).min(10);
    let secs = base_secs
        .saturating_mul(1i64 << exponent)
        .clamp(0, MAX_BACKOFF_SECS);
    Duration::seconds(secs)
}
