//! Reconciliation repository: read-only inputs for the checker.
//!
//! Loads the three sources of truth (outstanding bills, AP subledger, GL
//! AP balance) and hands them to the pure checker. Never writes; safe to
//! run concurrently with posting.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use saldo_core::recon::{ApRecord, BillRecord, ReconciliationChecker, ReconciliationReport};
use saldo_shared::types::{ApEntryId, BillId, TenantId};

use crate::entities::{ap_entries, bills, sea_orm_active_enums::BillStatus};
use crate::repositories::journal::JournalRepository;

/// Repository computing reconciliation reports.
#[derive(Debug, Clone)]
pub struct ReconRepository {
    db: DatabaseConnection,
    journal: JournalRepository,
}

impl ReconRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let journal = JournalRepository::new(db.clone());
        Self { db, journal }
    }

    /// Compares bills, AP subledger, and the GL AP account for a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three load queries fails.
    pub async fn check(
        &self,
        tenant_id: TenantId,
        ap_account_code: &str,
    ) -> Result<ReconciliationReport, DbErr> {
        let bill_models = bills::Entity::find()
            .filter(bills::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(bills::Column::Status.eq(BillStatus::Outstanding))
            .all(&self.db)
            .await?;

        let ap_models = ap_entries::Entity::find()
            .filter(ap_entries::Column::TenantId.eq(tenant_id.into_inner()))
            .all(&self.db)
            .await?;

        let gl_ap_balance = self
            .journal
            .gl_balance_for_account_code(tenant_id, ap_account_code)
            .await?;

        let bill_records: Vec<BillRecord> = bill_models
            .into_iter()
            .map(|b| BillRecord {
                id: BillId::from_uuid(b.id),
                bill_number: b.bill_number,
                amount: b.amount,
                has_journal: b.journal_id.is_some(),
            })
            .collect();

        let ap_records: Vec<ApRecord> = ap_models
            .into_iter()
            .map(|a| ApRecord {
                id: ApEntryId::from_uuid(a.id),
                bill_id: a.bill_id.map(BillId::from_uuid),
                amount: a.amount,
            })
            .collect();

        Ok(ReconciliationChecker::check(
            tenant_id,
            &bill_records,
            &ap_records,
            gl_ap_balance,
        ))
    }
}
