//! Ledger domain types: business events, journal drafts, and outcomes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use saldo_shared::types::JournalEntryId;

use super::accounts::AccountRef;
use super::error::PostingError;

/// Journal entry status.
///
/// Posted and voided entries are immutable; corrections are new reversing
/// entries, never in-place edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    /// Entry is being drafted.
    Draft,
    /// Entry has been posted to the ledger (immutable).
    Posted,
    /// Entry has been voided by a reversal (immutable).
    Voided,
}

impl JournalStatus {
    /// Returns true if the entry is immutable.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        matches!(self, Self::Posted | Self::Voided)
    }
}

/// How the counterparty settled (or will settle) the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Settled in cash.
    Cash,
    /// Settled via bank transfer.
    BankTransfer,
    /// On credit (receivable/payable).
    Credit,
}

/// Business event categories consumed from the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A completed sale.
    #[serde(rename = "sale.completed")]
    SaleCompleted,
    /// A completed purchase.
    #[serde(rename = "purchase.completed")]
    PurchaseCompleted,
    /// A recorded expense.
    #[serde(rename = "expense.recorded")]
    ExpenseRecorded,
}

impl EventKind {
    /// Parse an event kind from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale.completed" => Some(Self::SaleCompleted),
            "purchase.completed" => Some(Self::PurchaseCompleted),
            "expense.recorded" => Some(Self::ExpenseRecorded),
            _ => None,
        }
    }

    /// Returns the wire representation of the event kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SaleCompleted => "sale.completed",
            Self::PurchaseCompleted => "purchase.completed",
            Self::ExpenseRecorded => "expense.recorded",
        }
    }
}

/// Payload of a completed sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalePayload {
    /// Originating business transaction id (idempotency key).
    pub source_id: String,
    /// Gross sale amount.
    pub total_amount: Decimal,
    /// Settlement method.
    pub payment_method: PaymentMethod,
    /// Customer name, if known.
    #[serde(default)]
    pub counterparty_name: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Units sold, if tracked.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Product category for mapping rules.
    #[serde(default)]
    pub product_category: Option<String>,
}

/// Payload of a completed purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasePayload {
    /// Originating business transaction id (idempotency key).
    pub source_id: String,
    /// Purchase amount.
    pub total_amount: Decimal,
    /// Settlement method.
    pub payment_method: PaymentMethod,
    /// Vendor name, if known.
    #[serde(default)]
    pub counterparty_name: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Units purchased, if tracked.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Product category for mapping rules.
    #[serde(default)]
    pub product_category: Option<String>,
}

/// Payload of a recorded expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpensePayload {
    /// Originating business transaction id (idempotency key).
    pub source_id: String,
    /// Expense amount.
    pub total_amount: Decimal,
    /// Settlement method.
    pub payment_method: PaymentMethod,
    /// Expense account code override.
    #[serde(default)]
    pub expense_account: Option<String>,
    /// Payee name, if known.
    #[serde(default)]
    pub counterparty_name: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A business event with its typed payload.
///
/// Payloads are validated at the boundary so downstream code never guesses
/// at field presence.
#[derive(Debug, Clone)]
pub enum BusinessEvent {
    /// A completed sale.
    SaleCompleted(SalePayload),
    /// A completed purchase.
    PurchaseCompleted(PurchasePayload),
    /// A recorded expense.
    ExpenseRecorded(ExpensePayload),
}

impl BusinessEvent {
    /// Parses and validates a raw outbox payload for the given event kind.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the payload does not match the
    /// kind's schema, or when the amount is zero or negative.
    pub fn from_payload(
        kind: EventKind,
        payload: &serde_json::Value,
    ) -> Result<Self, PostingError> {
        let event = match kind {
            EventKind::SaleCompleted => serde_json::from_value(payload.clone())
                .map(Self::SaleCompleted)
                .map_err(|e| PostingError::InvalidPayload {
                    reason: e.to_string(),
                })?,
            EventKind::PurchaseCompleted => serde_json::from_value(payload.clone())
                .map(Self::PurchaseCompleted)
                .map_err(|e| PostingError::InvalidPayload {
                    reason: e.to_string(),
                })?,
            EventKind::ExpenseRecorded => serde_json::from_value(payload.clone())
                .map(Self::ExpenseRecorded)
                .map_err(|e| PostingError::InvalidPayload {
                    reason: e.to_string(),
                })?,
        };

        if event.total_amount() == Decimal::ZERO {
            return Err(PostingError::ZeroAmount);
        }
        if event.total_amount() < Decimal::ZERO {
            return Err(PostingError::NegativeAmount);
        }

        Ok(event)
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::SaleCompleted(_) => EventKind::SaleCompleted,
            Self::PurchaseCompleted(_) => EventKind::PurchaseCompleted,
            Self::ExpenseRecorded(_) => EventKind::ExpenseRecorded,
        }
    }

    /// Returns the originating business transaction id (idempotency key).
    #[must_use]
    pub fn source_id(&self) -> &str {
        match self {
            Self::SaleCompleted(p) => &p.source_id,
            Self::PurchaseCompleted(p) => &p.source_id,
            Self::ExpenseRecorded(p) => &p.source_id,
        }
    }

    /// Returns the event's gross amount.
    #[must_use]
    pub const fn total_amount(&self) -> Decimal {
        match self {
            Self::SaleCompleted(p) => p.total_amount,
            Self::PurchaseCompleted(p) => p.total_amount,
            Self::ExpenseRecorded(p) => p.total_amount,
        }
    }

    /// Returns the settlement method.
    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        match self {
            Self::SaleCompleted(p) => p.payment_method,
            Self::PurchaseCompleted(p) => p.payment_method,
            Self::ExpenseRecorded(p) => p.payment_method,
        }
    }

    /// Returns the event's description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::SaleCompleted(p) => p.description.as_deref(),
            Self::PurchaseCompleted(p) => p.description.as_deref(),
            Self::ExpenseRecorded(p) => p.description.as_deref(),
        }
    }

    /// Serializes the payload as the rule-evaluation context.
    #[must_use]
    pub fn rule_context(&self) -> serde_json::Value {
        match self {
            Self::SaleCompleted(p) => serde_json::to_value(p),
            Self::PurchaseCompleted(p) => serde_json::to_value(p),
            Self::ExpenseRecorded(p) => serde_json::to_value(p),
        }
        .unwrap_or(serde_json::Value::Null)
    }
}

/// A single draft journal line.
///
/// Exactly one of `debit`/`credit` is non-zero; the builder never emits
/// zero-amount lines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDraft {
    /// The account to post to.
    pub account: AccountRef,
    /// Debit amount (zero if credit).
    pub debit: Decimal,
    /// Credit amount (zero if debit).
    pub credit: Decimal,
}

impl LineDraft {
    /// Creates a debit line.
    #[must_use]
    pub const fn debit(account: AccountRef, amount: Decimal) -> Self {
        Self {
            account,
            debit: amount,
            credit: Decimal::ZERO,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub const fn credit(account: AccountRef, amount: Decimal) -> Self {
        Self {
            account,
            debit: Decimal::ZERO,
            credit: amount,
        }
    }
}

/// Journal totals for balance validation.
#[derive(Debug, Clone)]
pub struct JournalTotals {
    /// Total debit amount.
    pub total_debit: Decimal,
    /// Total credit amount.
    pub total_credit: Decimal,
    /// Whether the journal is balanced (debits == credits).
    pub is_balanced: bool,
}

impl JournalTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(total_debit: Decimal, total_credit: Decimal) -> Self {
        Self {
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_debit - self.total_credit
    }
}

/// A validated, balanced journal ready for persistence.
#[derive(Debug, Clone)]
pub struct JournalDraft {
    /// Idempotency key: the originating business transaction id.
    pub source_id: String,
    /// Human-readable description.
    pub description: String,
    /// Balanced journal lines.
    pub lines: Vec<LineDraft>,
    /// Validated totals.
    pub totals: JournalTotals,
}

/// A persisted journal entry reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedJournal {
    /// The journal entry id.
    pub journal_id: JournalEntryId,
    /// The human-readable journal number.
    pub journal_number: String,
}

/// Outcome of posting a business event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// A new journal entry was created.
    Posted(PostedJournal),
    /// The event was posted before; the existing entry is returned unchanged.
    AlreadyPosted(PostedJournal),
}

impl PostOutcome {
    /// Returns the journal reference regardless of outcome.
    #[must_use]
    pub const fn journal(&self) -> &PostedJournal {
        match self {
            Self::Posted(j) | Self::AlreadyPosted(j) => j,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_event_kind_roundtrip() {
        for kind in [
            EventKind::SaleCompleted,
            EventKind::PurchaseCompleted,
            EventKind::ExpenseRecorded,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("inventory.adjusted"), None);
    }

    #[test]
    fn test_parse_sale_payload() {
        let payload = json!({
            "source_id": "tx-1001",
            "total_amount": "750000",
            "payment_method": "cash",
            "counterparty_name": "Budi"
        });
        let event = BusinessEvent::from_payload(EventKind::SaleCompleted, &payload).unwrap();
        assert_eq!(event.source_id(), "tx-1001");
        assert_eq!(event.total_amount(), dec!(750000));
        assert_eq!(event.payment_method(), PaymentMethod::Cash);
    }

    #[test]
    fn test_parse_missing_required_field() {
        let payload = json!({"source_id": "tx-1", "payment_method": "cash"});
        let err = BusinessEvent::from_payload(EventKind::SaleCompleted, &payload).unwrap_err();
        assert!(matches!(err, PostingError::InvalidPayload { ref reason } if reason.contains("total_amount")));
    }

    #[test]
    fn test_parse_zero_and_negative_amounts() {
        let zero = json!({"source_id": "tx-1", "total_amount": "0", "payment_method": "cash"});
        assert!(matches!(
            BusinessEvent::from_payload(EventKind::SaleCompleted, &zero),
            Err(PostingError::ZeroAmount)
        ));

        let negative =
            json!({"source_id": "tx-1", "total_amount": "-5", "payment_method": "cash"});
        assert!(matches!(
            BusinessEvent::from_payload(EventKind::SaleCompleted, &negative),
            Err(PostingError::NegativeAmount)
        ));
    }

    #[test]
    fn test_expense_account_override() {
        let payload = json!({
            "source_id": "tx-2",
            "total_amount": "120.50",
            "payment_method": "bank_transfer",
            "expense_account": "6100"
        });
        let event = BusinessEvent::from_payload(EventKind::ExpenseRecorded, &payload).unwrap();
        match event {
            BusinessEvent::ExpenseRecorded(p) => {
                assert_eq!(p.expense_account.as_deref(), Some("6100"));
            }
            _ => panic!("expected expense"),
        }
    }

    #[test]
    fn test_rule_context_is_payload() {
        let payload = json!({
            "source_id": "tx-3",
            "total_amount": "10",
            "payment_method": "cash",
            "quantity": "15"
        });
        let event = BusinessEvent::from_payload(EventKind::SaleCompleted, &payload).unwrap();
        let ctx = event.rule_context();
        assert_eq!(ctx.get("source_id"), Some(&json!("tx-3")));
        assert!(ctx.get("quantity").is_some());
    }

    #[test]
    fn test_totals_balanced() {
        let totals = JournalTotals::new(dec!(100.00), dec!(100.00));
        assert!(totals.is_balanced);
        assert_eq!(totals.difference(), Decimal::ZERO);

        let totals = JournalTotals::new(dec!(100.00), dec!(50.00));
        assert!(!totals.is_balanced);
        assert_eq!(totals.difference(), dec!(50.00));
    }

    #[test]
    fn test_journal_status_immutability() {
        assert!(!JournalStatus::Draft.is_immutable());
        assert!(JournalStatus::Posted.is_immutable());
        assert!(JournalStatus::Voided.is_immutable());
    }

    #[test]
    fn test_post_outcome_journal_accessor() {
        let posted = PostedJournal {
            journal_id: JournalEntryId::new(),
            journal_number: "JRN-000042".to_string(),
        };
        assert_eq!(
            PostOutcome::AlreadyPosted(posted.clone()).journal(),
            &posted
        );
    }
}
