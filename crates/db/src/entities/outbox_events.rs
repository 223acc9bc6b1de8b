//! `SeaORM` Entity for the outbox_events table.
//!
//! Rows are appended by upstream transactional writers in the same database
//! transaction as their own domain write, mutated only by the dispatcher,
//! and never deleted (retained for audit/replay).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::OutboxStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outbox_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_type: String,
    pub payload: Json,
    pub status: OutboxStatus,
    pub attempt_count: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub processed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
