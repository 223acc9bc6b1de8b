//! Reconciliation input and result types.

use rust_decimal::Decimal;
use serde::Serialize;

use saldo_shared::types::{ApEntryId, BillId, TenantId};

/// An outstanding vendor bill, as read from the bills subledger.
#[derive(Debug, Clone)]
pub struct BillRecord {
    /// Bill id.
    pub id: BillId,
    /// Human-readable bill number.
    pub bill_number: String,
    /// Outstanding amount.
    pub amount: Decimal,
    /// Whether a posted journal entry is linked to the bill.
    pub has_journal: bool,
}

/// An accounts payable subledger entry.
#[derive(Debug, Clone)]
pub struct ApRecord {
    /// AP entry id.
    pub id: ApEntryId,
    /// The bill this entry belongs to, if linked.
    pub bill_id: Option<BillId>,
    /// Payable amount.
    pub amount: Decimal,
}

/// A single itemized reconciliation finding.
///
/// Each category is distinct; findings are never merged into a single count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ReconIssue {
    /// A bill with no linked AP subledger entry.
    BillMissingApRecord {
        /// The orphaned bill.
        bill_id: BillId,
        /// Its bill number.
        bill_number: String,
    },
    /// A bill with no linked posted journal entry.
    BillMissingJournal {
        /// The unposted bill.
        bill_id: BillId,
        /// Its bill number.
        bill_number: String,
    },
    /// An AP entry with no matching bill.
    ApRecordMissingBill {
        /// The orphaned AP entry.
        ap_entry_id: ApEntryId,
    },
    /// A bill and its AP entries disagree on amount.
    BillAmountMismatch {
        /// The bill in question.
        bill_id: BillId,
        /// The bill amount.
        bill_amount: Decimal,
        /// The summed AP amount for the bill.
        ap_amount: Decimal,
    },
    /// The AP subledger and GL AP balance disagree.
    GlApMismatch {
        /// The AP subledger total.
        ap_subledger_total: Decimal,
        /// The GL AP account balance.
        gl_ap_balance: Decimal,
        /// Absolute variance.
        variance: Decimal,
    },
}

/// Result of a reconciliation check.
///
/// Derived, not a row of record: recomputed on every check and used only
/// for alerting and reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    /// The checked tenant.
    pub tenant_id: TenantId,
    /// Outstanding-bills subledger total.
    pub bills_outstanding: Decimal,
    /// AP subledger total.
    pub ap_subledger_total: Decimal,
    /// GL AP account balance (sum of credit - debit over posted lines).
    pub gl_ap_balance: Decimal,
    /// Absolute variance between bills and AP subledger.
    pub variance_bills_ap: Decimal,
    /// Absolute variance between AP subledger and GL balance.
    pub variance_ap_gl: Decimal,
    /// True only when both pairwise variances are below tolerance.
    pub is_in_sync: bool,
    /// Itemized findings for operator follow-up.
    pub issues: Vec<ReconIssue>,
}
