//! Three-way reconciliation between bills, AP subledger, and the GL.

use rust_decimal::Decimal;
use std::collections::HashMap;

use saldo_shared::types::{BillId, TenantId};

use super::types::{ApRecord, BillRecord, ReconIssue, ReconciliationReport};

/// Variance tolerance in currency units.
fn tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

/// Stateless reconciliation checker.
pub struct ReconciliationChecker;

impl ReconciliationChecker {
    /// Compares the three sources of truth and itemizes divergences.
    ///
    /// `is_in_sync` requires **both** pairwise variances below tolerance;
    /// a single matching pair can mask a third-source divergence.
    #[must_use]
    pub fn check(
        tenant_id: TenantId,
        bills: &[BillRecord],
        ap_entries: &[ApRecord],
        gl_ap_balance: Decimal,
    ) -> ReconciliationReport {
        let bills_outstanding: Decimal = bills.iter().map(|b| b.amount).sum();
        let ap_subledger_total: Decimal = ap_entries.iter().map(|a| a.amount).sum();

        let variance_bills_ap = (bills_outstanding - ap_subledger_total).abs();
        let variance_ap_gl = (ap_subledger_total - gl_ap_balance).abs();
        let is_in_sync = variance_bills_ap < tolerance() && variance_ap_gl < tolerance();

        let mut issues = Vec::new();

        // Index AP amounts per bill for the cross-link checks.
        let mut ap_by_bill: HashMap<BillId, Decimal> = HashMap::new();
        for entry in ap_entries {
            if let Some(bill_id) = entry.bill_id {
                *ap_by_bill.entry(bill_id).or_insert(Decimal::ZERO) += entry.amount;
            }
        }
        let known_bills: HashMap<BillId, &BillRecord> =
            bills.iter().map(|b| (b.id, b)).collect();

        for bill in bills {
            match ap_by_bill.get(&bill.id) {
                None => issues.push(ReconIssue::BillMissingApRecord {
                    bill_id: bill.id,
                    bill_number: bill.bill_number.clone(),
                }),
                Some(ap_amount) if (bill.amount - *ap_amount).abs() >= tolerance() => {
                    issues.push(ReconIssue::BillAmountMismatch {
                        bill_id: bill.id,
                        bill_amount: bill.amount,
                        ap_amount: *ap_amount,
                    });
                }
                Some(_) => {}
            }
            if !bill.has_journal {
                issues.push(ReconIssue::BillMissingJournal {
                    bill_id: bill.id,
                    bill_number: bill.bill_number.clone(),
                });
            }
        }

        for entry in ap_entries {
            let linked = entry
                .bill_id
                .is_some_and(|bill_id| known_bills.contains_key(&bill_id));
            if !linked {
                issues.push(ReconIssue::ApRecordMissingBill { ap_entry_id: entry.id });
            }
        }

        if variance_ap_gl >= tolerance() {
            issues.push(ReconIssue::GlApMismatch {
                ap_subledger_total,
                gl_ap_balance,
                variance: variance_ap_gl,
            });
        }

        ReconciliationReport {
            tenant_id,
            bills_outstanding,
            ap_subledger_total,
            gl_ap_balance,
            variance_bills_ap,
            variance_ap_gl,
            is_in_sync,
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use saldo_shared::types::ApEntryId;

    fn bill(number: &str, amount: Decimal) -> BillRecord {
        BillRecord {
            id: BillId::new(),
            bill_number: number.to_string(),
            amount,
            has_journal: true,
        }
    }

    fn ap_for(bill_id: BillId, amount: Decimal) -> ApRecord {
        ApRecord {
            id: ApEntryId::new(),
            bill_id: Some(bill_id),
            amount,
        }
    }

    #[test]
    fn test_in_sync_when_all_sources_agree() {
        let b = bill("BILL-001", dec!(1000));
        let ap = ap_for(b.id, dec!(1000));
        let report =
            ReconciliationChecker::check(TenantId::new(), &[b], &[ap], dec!(1000));

        assert!(report.is_in_sync);
        assert!(report.issues.is_empty());
        assert_eq!(report.variance_bills_ap, Decimal::ZERO);
        assert_eq!(report.variance_ap_gl, Decimal::ZERO);
    }

    #[test]
    fn test_sub_tolerance_variance_is_in_sync() {
        let b = bill("BILL-001", dec!(1000));
        let ap = ap_for(b.id, dec!(1000));
        let report =
            ReconciliationChecker::check(TenantId::new(), &[b], &[ap], dec!(1000.005));
        assert!(report.is_in_sync);
    }

    #[test]
    fn test_variance_of_one_unit_is_out_of_sync() {
        let b = bill("BILL-001", dec!(1000));
        let ap = ap_for(b.id, dec!(1000));
        let report = ReconciliationChecker::check(TenantId::new(), &[b], &[ap], dec!(999.00));
        assert!(!report.is_in_sync);
        assert_eq!(report.variance_ap_gl, dec!(1.00));
    }

    #[test]
    fn test_exact_tolerance_is_out_of_sync() {
        // The comparison is strictly-below: a 0.01 variance is a divergence.
        let b = bill("BILL-001", dec!(1000));
        let ap = ap_for(b.id, dec!(1000));
        let report = ReconciliationChecker::check(TenantId::new(), &[b], &[ap], dec!(999.99));
        assert!(!report.is_in_sync);
    }

    #[test]
    fn test_gl_divergence_itemized_as_gl_ap_mismatch() {
        // Bills and AP agree at 20,000,000; the GL trails by 0.50.
        let b = bill("BILL-001", dec!(20000000));
        let ap = ap_for(b.id, dec!(20000000));
        let report =
            ReconciliationChecker::check(TenantId::new(), &[b], &[ap], dec!(19999999.50));

        assert!(!report.is_in_sync);
        assert_eq!(report.variance_bills_ap, Decimal::ZERO);
        assert_eq!(report.variance_ap_gl, dec!(0.50));
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            report.issues[0],
            ReconIssue::GlApMismatch { variance, .. } if variance == dec!(0.50)
        ));
    }

    #[test]
    fn test_matching_pair_does_not_mask_third_source() {
        // Bills == GL but AP diverges from both: still out of sync.
        let b = bill("BILL-001", dec!(500));
        let ap = ap_for(b.id, dec!(400));
        let report = ReconciliationChecker::check(TenantId::new(), &[b], &[ap], dec!(500));
        assert!(!report.is_in_sync);
    }

    #[test]
    fn test_bill_without_ap_record() {
        let b = bill("BILL-007", dec!(100));
        let report = ReconciliationChecker::check(TenantId::new(), &[b.clone()], &[], dec!(0));

        assert!(report.issues.iter().any(|i| matches!(
            i,
            ReconIssue::BillMissingApRecord { bill_id, .. } if *bill_id == b.id
        )));
    }

    #[test]
    fn test_bill_without_journal_link() {
        let mut b = bill("BILL-008", dec!(100));
        b.has_journal = false;
        let ap = ap_for(b.id, dec!(100));
        let report =
            ReconciliationChecker::check(TenantId::new(), &[b.clone()], &[ap], dec!(100));

        assert!(report.issues.iter().any(|i| matches!(
            i,
            ReconIssue::BillMissingJournal { bill_id, .. } if *bill_id == b.id
        )));
    }

    #[test]
    fn test_ap_record_without_bill() {
        let orphan = ApRecord {
            id: ApEntryId::new(),
            bill_id: None,
            amount: dec!(50),
        };
        let report = ReconciliationChecker::check(TenantId::new(), &[], &[orphan.clone()], dec!(50));

        assert!(report.issues.iter().any(|i| matches!(
            i,
            ReconIssue::ApRecordMissingBill { ap_entry_id } if *ap_entry_id == orphan.id
        )));
    }

    #[test]
    fn test_ap_record_linked_to_unknown_bill() {
        let dangling = ApRecord {
            id: ApEntryId::new(),
            bill_id: Some(BillId::new()),
            amount: dec!(50),
        };
        let report = ReconciliationChecker::check(TenantId::new(), &[], &[dangling], dec!(50));
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, ReconIssue::ApRecordMissingBill { .. })));
    }

    #[test]
    fn test_amount_mismatch_is_distinct_category() {
        let b = bill("BILL-010", dec!(300));
        let ap = ap_for(b.id, dec!(250));
        let report =
            ReconciliationChecker::check(TenantId::new(), &[b.clone()], &[ap], dec!(250));

        assert!(report.issues.iter().any(|i| matches!(
            i,
            ReconIssue::BillAmountMismatch { bill_id, bill_amount, ap_amount }
                if *bill_id == b.id && *bill_amount == dec!(300) && *ap_amount == dec!(250)
        )));
        // The missing-ap category is NOT reported for a mere mismatch.
        assert!(!report
            .issues
            .iter()
            .any(|i| matches!(i, ReconIssue::BillMissingApRecord { .. })));
    }

    #[test]
    fn test_empty_tenant_is_in_sync() {
        let report = ReconciliationChecker::check(TenantId::new(), &[], &[], Decimal::ZERO);
        assert!(report.is_in_sync);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_multiple_ap_entries_summed_per_bill() {
        let b = bill("BILL-011", dec!(300));
        let ap1 = ap_for(b.id, dec!(100));
        let ap2 = ap_for(b.id, dec!(200));
        let report =
            ReconciliationChecker::check(TenantId::new(), &[b], &[ap1, ap2], dec!(300));
        assert!(report.is_in_sync);
        assert!(report.issues.is_empty());
    }
}
