//! Ledger/subledger reconciliation checks.
//!
//! Pure comparison logic over three independently maintained totals:
//! outstanding bills, the AP subledger, and the GL AP account balance.
//! Read-only by construction; the db crate supplies the inputs.

pub mod checker;
pub mod types;

pub use checker::ReconciliationChecker;
pub use types::{ApRecord, BillRecord, ReconIssue, ReconciliationReport};
