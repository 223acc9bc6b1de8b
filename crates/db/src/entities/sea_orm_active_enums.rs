//! Database enum mappings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outbox event lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "outbox_status")]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Waiting to be claimed.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Claimed by a dispatcher instance.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Successfully posted (or idempotently skipped).
    #[sea_orm(string_value = "done")]
    Done,
    /// Transient failures exhausted the retry budget.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Permanent validation failure; requeued only by manual intervention.
    #[sea_orm(string_value = "dead")]
    Dead,
}

/// Journal entry status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "journal_status")]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    /// Entry is being drafted.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Entry is posted (immutable).
    #[sea_orm(string_value = "posted")]
    Posted,
    /// Entry is voided by a reversal (immutable).
    #[sea_orm(string_value = "voided")]
    Voided,
}

/// Rule category.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "rule_type")]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Maps products/events to account codes.
    #[sea_orm(string_value = "product_mapping")]
    ProductMapping,
    /// Derives a tax rate.
    #[sea_orm(string_value = "tax_calculation")]
    TaxCalculation,
    /// Derives a discount rate.
    #[sea_orm(string_value = "discount_calculation")]
    DiscountCalculation,
    /// Flags low-stock conditions.
    #[sea_orm(string_value = "inventory_alert")]
    InventoryAlert,
}

/// Account classification.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Asset account (debit-normal).
    #[sea_orm(string_value = "asset")]
    Asset,
    /// Liability account (credit-normal).
    #[sea_orm(string_value = "liability")]
    Liability,
    /// Equity account (credit-normal).
    #[sea_orm(string_value = "equity")]
    Equity,
    /// Revenue account (credit-normal).
    #[sea_orm(string_value = "revenue")]
    Revenue,
    /// Expense account (debit-normal).
    #[sea_orm(string_value = "expense")]
    Expense,
}

/// Vendor bill status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "bill_status")]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Unpaid and counted in the outstanding subledger.
    #[sea_orm(string_value = "outstanding")]
    Outstanding,
    /// Fully settled.
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Voided.
    #[sea_orm(string_value = "void")]
    Void,
}

impl From<saldo_core::rules::RuleType> for RuleType {
    fn from(value: saldo_core::rules::RuleType) -> Self {
        match value {
            saldo_core::rules::RuleType::ProductMapping => Self::ProductMapping,
            saldo_core::rules::RuleType::TaxCalculation => Self::TaxCalculation,
            saldo_core::rules::RuleType::DiscountCalculation => Self::DiscountCalculation,
            saldo_core::rules::RuleType::InventoryAlert => Self::InventoryAlert,
        }
    }
}

impl From<RuleType> for saldo_core::rules::RuleType {
    fn from(value: RuleType) -> Self {
        match value {
            RuleType::ProductMapping => Self::ProductMapping,
            RuleType::TaxCalculation => Self::TaxCalculation,
            RuleType::DiscountCalculation => Self::DiscountCalculation,
            RuleType::InventoryAlert => Self::InventoryAlert,
        }
    }
}
