//! Double-entry journal construction from business events.
//!
//! Pure logic: payload validation, account-role resolution contracts, and
//! balanced line construction. Persistence (idempotent insert, numbering)
//! lives in the db crate; orchestration lives in the worker crate.

pub mod accounts;
pub mod builder;
pub mod error;
pub mod types;

#[cfg(test)]
mod builder_props;

pub use accounts::{AccountRef, AccountRole};
pub use builder::{JournalBuilder, PostingAdjustments};
pub use error::PostingError;
pub use types::{
    BusinessEvent, EventKind, ExpensePayload, JournalDraft, JournalStatus, JournalTotals,
    LineDraft, PaymentMethod, PostOutcome, PostedJournal, PurchasePayload, SalePayload,
};
