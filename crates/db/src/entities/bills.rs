//! `SeaORM` Entity for the bills subledger table.
//!
//! Read-only from this crate's perspective: the reconciliation checker
//! compares it against the AP subledger and the GL, never mutates it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::BillStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub bill_number: String,
    pub vendor_name: String,
    pub amount: Decimal,
    pub status: BillStatus,
    /// The posted journal entry recording this bill, if any.
    pub journal_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ap_entries::Entity")]
    ApEntries,
}

impl Related<super::ap_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
