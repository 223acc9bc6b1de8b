//! `SeaORM` Entity for the journal_entries table.
//!
//! `(tenant_id, source_id)` is unique at the storage layer: the backstop
//! for at-most-once posting under concurrent dispatchers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::JournalStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Per-tenant sequential number backing `journal_number`.
    pub journal_no: i64,
    /// Human-readable journal number, e.g. `JRN-000042`.
    pub journal_number: String,
    /// Originating business transaction id (idempotency key).
    pub source_id: String,
    pub trace_id: Option<String>,
    pub status: JournalStatus,
    pub description: String,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    /// Set on reversing entries: the journal this entry reverses.
    pub reverses_journal_id: Option<Uuid>,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::journal_lines::Entity")]
    JournalLines,
}

impl Related<super::journal_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
