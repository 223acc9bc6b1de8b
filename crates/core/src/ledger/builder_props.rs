//! Property tests for journal construction.

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

use saldo_shared::types::AccountId;

use super::accounts::{AccountRef, AccountRole};
use super::builder::{JournalBuilder, PostingAdjustments};
use super::error::PostingError;
use super::types::{BusinessEvent, EventKind};

fn resolver(role: AccountRole) -> Result<AccountRef, PostingError> {
    Ok(AccountRef::new(AccountId::new(), role.as_str().to_string()))
}

/// Strategy for positive 2-decimal amounts.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for rates in [0, 0.5) with 4 decimals.
fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..5000i64).prop_map(|n| Decimal::new(n, 4))
}

fn method_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("cash"), Just("bank_transfer"), Just("credit")]
}

fn kind_strategy() -> impl Strategy<Value = EventKind> {
    prop_oneof![
        Just(EventKind::SaleCompleted),
        Just(EventKind::PurchaseCompleted),
        Just(EventKind::ExpenseRecorded),
    ]
}

fn make_event(kind: EventKind, amount: Decimal, method: &str) -> BusinessEvent {
    BusinessEvent::from_payload(
        kind,
        &json!({
            "source_id": "tx-prop",
            "total_amount": amount.to_string(),
            "payment_method": method
        }),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every built journal balances, for every event kind and method.
    #[test]
    fn prop_built_journal_always_balances(
        kind in kind_strategy(),
        amount in amount_strategy(),
        method in method_strategy(),
        tax in rate_strategy(),
        discount in rate_strategy(),
    ) {
        let event = make_event(kind, amount, method);
        let adjustments = PostingAdjustments {
            tax_rate: Some(tax),
            discount_rate: Some(discount),
        };
        let draft = JournalBuilder::build(&event, &adjustments, resolver).unwrap();

        prop_assert!(draft.totals.is_balanced);
        prop_assert_eq!(draft.totals.total_debit, draft.totals.total_credit);
    }

    /// Every line carries exactly one positive side.
    #[test]
    fn prop_lines_have_exactly_one_side(
        amount in amount_strategy(),
        tax in rate_strategy(),
        discount in rate_strategy(),
    ) {
        let event = make_event(EventKind::SaleCompleted, amount, "cash");
        let adjustments = PostingAdjustments {
            tax_rate: Some(tax),
            discount_rate: Some(discount),
        };
        let draft = JournalBuilder::build(&event, &adjustments, resolver).unwrap();

        for line in &draft.lines {
            let debit_set = line.debit > Decimal::ZERO;
            let credit_set = line.credit > Decimal::ZERO;
            prop_assert!(debit_set != credit_set);
            prop_assert!(line.debit >= Decimal::ZERO);
            prop_assert!(line.credit >= Decimal::ZERO);
        }
    }

    /// Without adjustments, journal totals equal the event amount exactly.
    #[test]
    fn prop_unadjusted_totals_equal_event_amount(
        kind in kind_strategy(),
        amount in amount_strategy(),
        method in method_strategy(),
    ) {
        let event = make_event(kind, amount, method);
        let draft = JournalBuilder::build(&event, &PostingAdjustments::default(), resolver).unwrap();

        prop_assert_eq!(draft.totals.total_debit, amount);
        prop_assert_eq!(draft.totals.total_credit, amount);
    }

    /// Sale revenue is always credited at gross, independent of adjustments.
    #[test]
    fn prop_sale_revenue_credited_at_gross(
        amount in amount_strategy(),
        tax in rate_strategy(),
        discount in rate_strategy(),
    ) {
        let event = make_event(EventKind::SaleCompleted, amount, "cash");
        let adjustments = PostingAdjustments {
            tax_rate: Some(tax),
            discount_rate: Some(discount),
        };
        let draft = JournalBuilder::build(&event, &adjustments, resolver).unwrap();

        let revenue = draft
            .lines
            .iter()
            .find(|l| l.account.code == "sales_revenue")
            .unwrap();
        prop_assert_eq!(revenue.credit, amount);
    }
}
