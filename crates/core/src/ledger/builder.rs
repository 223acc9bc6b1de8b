//! Balanced journal line construction.
//!
//! Builds debit/credit lines for a validated business event, applying
//! rule-resolved tax and discount adjustments. The result is checked for
//! balance and rejected if it does not hold; an unbalanced journal is never
//! silently forced to balance.

use rust_decimal::{Decimal, RoundingStrategy};

use super::accounts::{AccountRef, AccountRole};
use super::error::PostingError;
use super::types::{
    BusinessEvent, ExpensePayload, JournalDraft, JournalTotals, LineDraft, PurchasePayload,
    SalePayload,
};

/// Adjustments resolved from tenant rules before line construction.
#[derive(Debug, Clone, Default)]
pub struct PostingAdjustments {
    /// Tax rate applied to the net amount (e.g. 0.11).
    pub tax_rate: Option<Decimal>,
    /// Discount rate applied to the gross amount (e.g. 0.05).
    pub discount_rate: Option<Decimal>,
}

/// Stateless builder turning business events into balanced journal drafts.
///
/// Account resolution is injected so the builder stays free of I/O.
pub struct JournalBuilder;

impl JournalBuilder {
    /// Builds a balanced journal draft for the event.
    ///
    /// # Errors
    ///
    /// Returns a validation error when an adjustment rate is out of range,
    /// when an account role cannot be resolved, or when the constructed
    /// lines do not balance.
    pub fn build<R>(
        event: &BusinessEvent,
        adjustments: &PostingAdjustments,
        resolve: R,
    ) -> Result<JournalDraft, PostingError>
    where
        R: Fn(AccountRole) -> Result<AccountRef, PostingError>,
    {
        Self::validate_adjustments(adjustments)?;

        let lines = match event {
            BusinessEvent::SaleCompleted(p) => Self::sale_lines(p, adjustments, &resolve)?,
            BusinessEvent::PurchaseCompleted(p) => Self::purchase_lines(p, &resolve)?,
            BusinessEvent::ExpenseRecorded(p) => Self::expense_lines(p, &resolve)?,
        };

        Self::validate_lines(&lines)?;

        let totals = Self::calculate_totals(&lines);
        if !totals.is_balanced {
            return Err(PostingError::Unbalanced {
                debit: totals.total_debit,
                credit: totals.total_credit,
            });
        }

        Ok(JournalDraft {
            source_id: event.source_id().to_string(),
            description: Self::description(event),
            lines,
            totals,
        })
    }

    /// Calculates journal totals from lines.
    #[must_use]
    pub fn calculate_totals(lines: &[LineDraft]) -> JournalTotals {
        let total_debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit).sum();
        JournalTotals::new(total_debit, total_credit)
    }

    fn validate_adjustments(adjustments: &PostingAdjustments) -> Result<(), PostingError> {
        if let Some(rate) = adjustments.discount_rate
            && (rate < Decimal::ZERO || rate >= Decimal::ONE)
        {
            return Err(PostingError::InvalidPayload {
                reason: format!("discount_rate out of range: {rate}"),
            });
        }
        if let Some(rate) = adjustments.tax_rate
            && rate < Decimal::ZERO
        {
            return Err(PostingError::InvalidPayload {
                reason: format!("tax_rate out of range: {rate}"),
            });
        }
        Ok(())
    }

    /// Sale: debit the settlement asset for the net receivable, debit
    /// discounts, credit gross revenue and tax payable.
    fn sale_lines<R>(
        payload: &SalePayload,
        adjustments: &PostingAdjustments,
        resolve: &R,
    ) -> Result<Vec<LineDraft>, PostingError>
    where
        R: Fn(AccountRole) -> Result<AccountRef, PostingError>,
    {
        let gross = payload.total_amount;
        let discount = adjustments
            .discount_rate
            .map_or(Decimal::ZERO, |rate| round_half_even(gross * rate));
        let tax = adjustments
            .tax_rate
            .map_or(Decimal::ZERO, |rate| round_half_even((gross - discount) * rate));
        let receivable = gross - discount + tax;

        let settlement = AccountRole::settlement(super::types::EventKind::SaleCompleted, payload.payment_method);

        let mut lines = vec![LineDraft::debit(resolve(settlement)?, receivable)];
        if discount > Decimal::ZERO {
            lines.push(LineDraft::debit(
                resolve(AccountRole::SalesDiscounts)?,
                discount,
            ));
        }
        lines.push(LineDraft::credit(resolve(AccountRole::SalesRevenue)?, gross));
        if tax > Decimal::ZERO {
            lines.push(LineDraft::credit(resolve(AccountRole::TaxPayable)?, tax));
        }

        Ok(lines)
    }

    /// Purchase: debit inventory, credit the settlement side.
    fn purchase_lines<R>(
        payload: &PurchasePayload,
        resolve: &R,
    ) -> Result<Vec<LineDraft>, PostingError>
    where
        R: Fn(AccountRole) -> Result<AccountRef, PostingError>,
    {
        let settlement = AccountRole::settlement(
            super::types::EventKind::PurchaseCompleted,
            payload.payment_method,
        );
        Ok(vec![
            LineDraft::debit(resolve(AccountRole::Inventory)?, payload.total_amount),
            LineDraft::credit(resolve(settlement)?, payload.total_amount),
        ])
    }

    /// Expense: debit the expense account, credit the settlement side.
    fn expense_lines<R>(
        payload: &ExpensePayload,
        resolve: &R,
    ) -> Result<Vec<LineDraft>, PostingError>
    where
        R: Fn(AccountRole) -> Result<AccountRef, PostingError>,
    {
        let settlement = AccountRole::settlement(
            super::types::EventKind::ExpenseRecorded,
            payload.payment_method,
        );
        Ok(vec![
            LineDraft::debit(resolve(AccountRole::Expense)?, payload.total_amount),
            LineDraft::credit(resolve(settlement)?, payload.total_amount),
        ])
    }

    /// Each line must carry exactly one positive side; two lines minimum.
    fn validate_lines(lines: &[LineDraft]) -> Result<(), PostingError> {
        if lines.len() < 2 {
            return Err(PostingError::InvalidLine);
        }
        for line in lines {
            let debit_set = line.debit > Decimal::ZERO;
            let credit_set = line.credit > Decimal::ZERO;
            if debit_set == credit_set || line.debit < Decimal::ZERO || line.credit < Decimal::ZERO
            {
                return Err(PostingError::InvalidLine);
            }
        }
        Ok(())
    }

    fn description(event: &BusinessEvent) -> String {
        if let Some(description) = event.description() {
            return description.to_string();
        }
        match event {
            BusinessEvent::SaleCompleted(p) => p.counterparty_name.as_ref().map_or_else(
                || "Sale".to_string(),
                |name| format!("Sale to {name}"),
            ),
            BusinessEvent::PurchaseCompleted(p) => p.counterparty_name.as_ref().map_or_else(
                || "Purchase".to_string(),
                |name| format!("Purchase from {name}"),
            ),
            BusinessEvent::ExpenseRecorded(p) => p.counterparty_name.as_ref().map_or_else(
                || "Expense".to_string(),
                |name| format!("Expense - {name}"),
            ),
        }
    }
}

/// Banker's rounding to 2 decimal places for derived amounts.
fn round_half_even(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}
