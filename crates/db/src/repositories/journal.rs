//! Journal repository: idempotent, atomic journal persistence.
//!
//! The check-then-insert idempotency read is only a fast path; the real
//! guarantee is the `UNIQUE (tenant_id, source_id)` constraint. A unique
//! violation on insert means another worker won the race, so the existing
//! entry is re-fetched and returned as `AlreadyPosted`.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, FromQueryResult, QueryFilter, Set, SqlErr, Statement,
};
use uuid::Uuid;

use saldo_core::ledger::{JournalDraft, PostOutcome, PostedJournal, PostingError};
use saldo_shared::types::{JournalEntryId, TenantId};

use crate::entities::{journal_entries, journal_lines, sea_orm_active_enums::JournalStatus};
use crate::tenant::TenantExt;

#[derive(FromQueryResult)]
struct NextNo {
    next: i64,
}

#[derive(FromQueryResult)]
struct GlBalance {
    balance: Decimal,
}

/// Repository for journal entries and lines.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Looks up the journal entry for an idempotency key, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_source(
        &self,
        tenant_id: TenantId,
        source_id: &str,
    ) -> Result<Option<journal_entries::Model>, DbErr> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(journal_entries::Column::SourceId.eq(source_id))
            .one(&self.db)
            .await
    }

    /// Persists a balanced draft as a posted journal entry, at most once
    /// per `(tenant_id, source_id)`.
    ///
    /// Entry and lines are written in one transaction; there is no partial
    /// commit. Retries with the same idempotency key are safe.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::Database` on storage failures other than the
    /// idempotency conflict, which is resolved by returning the existing
    /// entry instead.
    pub async fn insert_posted(
        &self,
        tenant_id: TenantId,
        trace_id: Option<String>,
        draft: &JournalDraft,
    ) -> Result<PostOutcome, PostingError> {
        // Fast path: a previous attempt may already have posted this source.
        if let Some(existing) = self
            .find_by_source(tenant_id, &draft.source_id)
            .await
            .map_err(db_error)?
        {
            return Ok(PostOutcome::AlreadyPosted(to_posted(&existing)));
        }

        match self.try_insert(tenant_id, trace_id, draft).await {
            Ok(entry) => Ok(PostOutcome::Posted(to_posted(&entry))),
            Err(err) if is_unique_violation(&err) => {
                // Lost the race: the constraint fired, so the winner's entry
                // must exist.
                let existing = self
                    .find_by_source(tenant_id, &draft.source_id)
                    .await
                    .map_err(db_error)?
                    .ok_or_else(|| {
                        PostingError::Database(
                            "unique violation but no existing journal entry".to_string(),
                        )
                    })?;
                Ok(PostOutcome::AlreadyPosted(to_posted(&existing)))
            }
            Err(err) => Err(db_error(err)),
        }
    }

    /// Inserts entry and lines inside one tenant-scoped transaction.
    async fn try_insert(
        &self,
        tenant_id: TenantId,
        trace_id: Option<String>,
        draft: &JournalDraft,
    ) -> Result<journal_entries::Model, DbErr> {
        let tenant_uuid = tenant_id.into_inner();
        let tenant = self.db.with_tenant(tenant_uuid).await?;
        let txn = tenant.transaction();

        let journal_no = next_journal_no(txn, tenant_uuid).await?;
        let now = Utc::now();

        let entry = journal_entries::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_uuid),
            journal_no: Set(journal_no),
            journal_number: Set(format_journal_number(journal_no)),
            source_id: Set(draft.source_id.clone()),
            trace_id: Set(trace_id),
            status: Set(JournalStatus::Posted),
            description: Set(draft.description.clone()),
            total_debit: Set(draft.totals.total_debit),
            total_credit: Set(draft.totals.total_credit),
            reverses_journal_id: Set(None),
            posted_at: Set(Some(now.into())),
            created_at: Set(now.into()),
        }
        .insert(txn)
        .await?;

        for line in &draft.lines {
            journal_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                journal_id: Set(entry.id),
                account_id: Set(line.account.id.into_inner()),
                debit: Set(line.debit),
                credit: Set(line.credit),
                memo: Set(None),
                created_at: Set(now.into()),
            }
            .insert(txn)
            .await?;
        }

        tenant.commit().await?;
        Ok(entry)
    }

    /// Creates a reversing entry for a posted journal and voids the original.
    ///
    /// Corrections are always new entries; the original is never edited.
    /// Reversal is itself idempotent: the mirrored entry's source id derives
    /// from the original, so a repeated reversal resolves to `AlreadyPosted`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the journal does not exist or is not
    /// posted, or `PostingError::Database` on storage failures.
    pub async fn reverse(
        &self,
        tenant_id: TenantId,
        journal_id: JournalEntryId,
    ) -> Result<PostOutcome, PostingError> {
        let tenant_uuid = tenant_id.into_inner();

        let original = journal_entries::Entity::find_by_id(journal_id.into_inner())
            .filter(journal_entries::Column::TenantId.eq(tenant_uuid))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| PostingError::InvalidPayload {
                reason: format!("journal entry {journal_id} not found"),
            })?;

        // A voided original with an existing mirror means the reversal
        // already happened; treat it like any other duplicate source.
        let reversal_source = format!("reversal:{}", original.source_id);
        if let Some(existing) = self
            .find_by_source(tenant_id, &reversal_source)
            .await
            .map_err(db_error)?
        {
            return Ok(PostOutcome::AlreadyPosted(to_posted(&existing)));
        }

        if original.status != JournalStatus::Posted {
            return Err(PostingError::InvalidPayload {
                reason: format!("journal entry {journal_id} is not posted"),
            });
        }

        let lines = journal_lines::Entity::find()
            .filter(journal_lines::Column::JournalId.eq(original.id))
            .all(&self.db)
            .await
            .map_err(db_error)?;

        match self.try_reverse(&original, &lines, &reversal_source).await {
            Ok(entry) => Ok(PostOutcome::Posted(to_posted(&entry))),
            Err(err) if is_unique_violation(&err) => {
                let existing = self
                    .find_by_source(tenant_id, &reversal_source)
                    .await
                    .map_err(db_error)?
                    .ok_or_else(|| {
                        PostingError::Database(
                            "unique violation but no existing reversal".to_string(),
                        )
                    })?;
                Ok(PostOutcome::AlreadyPosted(to_posted(&existing)))
            }
            Err(err) => Err(db_error(err)),
        }
    }

    async fn try_reverse(
        &self,
        original: &journal_entries::Model,
        lines: &[journal_lines::Model],
        reversal_source: &str,
    ) -> Result<journal_entries::Model, DbErr> {
        let tenant = self.db.with_tenant(original.tenant_id).await?;
        let txn = tenant.transaction();

        let journal_no = next_journal_no(txn, original.tenant_id).await?;
        let now = Utc::now();

        let entry = journal_entries::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(original.tenant_id),
            journal_no: Set(journal_no),
            journal_number: Set(format_journal_number(journal_no)),
            source_id: Set(reversal_source.to_string()),
            trace_id: Set(original.trace_id.clone()),
            status: Set(JournalStatus::Posted),
            description: Set(format!("Reversal of {}", original.journal_number)),
            total_debit: Set(original.total_credit),
            total_credit: Set(original.total_debit),
            reverses_journal_id: Set(Some(original.id)),
            posted_at: Set(Some(now.into())),
            created_at: Set(now.into()),
        }
        .insert(txn)
        .await?;

        // Mirror each line: debits become credits and vice versa.
        for line in lines {
            journal_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                journal_id: Set(entry.id),
                account_id: Set(line.account_id),
                debit: Set(line.credit),
                credit: Set(line.debit),
                memo: Set(line.memo.clone()),
                created_at: Set(now.into()),
            }
            .insert(txn)
            .await?;
        }

        journal_entries::ActiveModel {
            id: Set(original.id),
            status: Set(JournalStatus::Voided),
            ..Default::default()
        }
        .update(txn)
        .await?;

        tenant.commit().await?;
        Ok(entry)
    }

    /// Returns all lines of a journal entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_lines(
        &self,
        journal_id: JournalEntryId,
    ) -> Result<Vec<journal_lines::Model>, DbErr> {
        journal_lines::Entity::find()
            .filter(journal_lines::Column::JournalId.eq(journal_id.into_inner()))
            .all(&self.db)
            .await
    }

    /// Computes the GL balance for an account code: `sum(credit - debit)`
    /// over posted journal lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn gl_balance_for_account_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Decimal, DbErr> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r"
            SELECT COALESCE(SUM(l.credit - l.debit), 0) AS balance
            FROM journal_lines l
            JOIN journal_entries e ON e.id = l.journal_id
            JOIN chart_of_accounts a ON a.id = l.account_id
            WHERE e.tenant_id = $1
              AND e.status = 'posted'
              AND a.code = $2
            ",
            [tenant_id.into_inner().into(), code.into()],
        );
        let row = GlBalance::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.map_or(Decimal::ZERO, |r| r.balance))
    }
}

/// Serializes per-tenant numbering and returns the next sequential number.
///
/// The advisory lock is transaction-scoped, so any unique violation on the
/// subsequent insert can only come from a duplicate source id.
async fn next_journal_no<C: ConnectionTrait>(txn: &C, tenant_id: Uuid) -> Result<i64, DbErr> {
    let lock = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1))",
        [tenant_id.to_string().into()],
    );
    txn.execute(lock).await?;

    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT COALESCE(MAX(journal_no), 0) + 1 AS next FROM journal_entries WHERE tenant_id = $1",
        [tenant_id.into()],
    );
    let row = NextNo::find_by_statement(stmt).one(txn).await?;
    Ok(row.map_or(1, |r| r.next))
}

fn format_journal_number(journal_no: i64) -> String {
    format!("JRN-{journal_no:06}")
}

fn to_posted(entry: &journal_entries::Model) -> PostedJournal {
    PostedJournal {
        journal_id: JournalEntryId::from_uuid(entry.id),
        journal_number: entry.journal_number.clone(),
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn db_error(err: DbErr) -> PostingError {
    PostingError::Database(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_number_format() {
        assert_eq!(format_journal_number(1), "JRN-000001");
        assert_eq!(format_journal_number(42), "JRN-000042");
        assert_eq!(format_journal_number(1_234_567), "JRN-1234567");
    }
}
