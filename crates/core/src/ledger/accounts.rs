//! Account roles used during posting.
//!
//! Each event type maps to a small fixed set of candidate roles; tenant
//! mapping rules (or configured defaults) resolve a role to a concrete
//! chart-of-accounts entry.

use serde::{Deserialize, Serialize};

use saldo_shared::types::AccountId;

use super::types::{EventKind, PaymentMethod};

/// A posting role to be resolved to a concrete account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Cash on hand.
    Cash,
    /// Bank account.
    Bank,
    /// Accounts receivable.
    AccountsReceivable,
    /// Accounts payable.
    AccountsPayable,
    /// Sales revenue.
    SalesRevenue,
    /// Sales discounts (contra-revenue).
    SalesDiscounts,
    /// Inventory / purchases.
    Inventory,
    /// Tax payable.
    TaxPayable,
    /// Expense account.
    Expense,
}

impl AccountRole {
    /// Returns the wire representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::AccountsReceivable => "accounts_receivable",
            Self::AccountsPayable => "accounts_payable",
            Self::SalesRevenue => "sales_revenue",
            Self::SalesDiscounts => "sales_discounts",
            Self::Inventory => "inventory",
            Self::TaxPayable => "tax_payable",
            Self::Expense => "expense",
        }
    }

    /// The settlement-side role for an event, by payment method.
    ///
    /// Sales settle against an asset (what we receive); purchases and
    /// expenses settle against cash/bank or a payable.
    #[must_use]
    pub const fn settlement(kind: EventKind, method: PaymentMethod) -> Self {
        match (kind, method) {
            (_, PaymentMethod::Cash) => Self::Cash,
            (_, PaymentMethod::BankTransfer) => Self::Bank,
            (EventKind::SaleCompleted, PaymentMethod::Credit) => Self::AccountsReceivable,
            (
                EventKind::PurchaseCompleted | EventKind::ExpenseRecorded,
                PaymentMethod::Credit,
            ) => Self::AccountsPayable,
        }
    }
}

/// A resolved chart-of-accounts reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    /// The account id.
    pub id: AccountId,
    /// The account code.
    pub code: String,
}

impl AccountRef {
    /// Creates a new account reference.
    #[must_use]
    pub const fn new(id: AccountId, code: String) -> Self {
        Self { id, code }
    }
}
