//! `SeaORM` entity definitions.

pub mod ap_entries;
pub mod bills;
pub mod chart_of_accounts;
pub mod journal_entries;
pub mod journal_lines;
pub mod outbox_events;
pub mod rules;
pub mod sea_orm_active_enums;
