//! On-demand reconciliation endpoint.

use axum::{Json, Router, extract::{Path, State}, http::StatusCode, routing::get};
use tracing::{error, warn};
use uuid::Uuid;

use saldo_core::recon::ReconciliationReport;
use saldo_shared::AppError;
use saldo_shared::types::TenantId;

use crate::AppState;
use crate::routes::error_response;

/// Runs the reconciliation check for a tenant.
///
/// Divergence is never an error: the report itemizes every finding and is
/// additionally surfaced as a warning-level structured log.
async fn check_reconciliation(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ReconciliationReport>, (StatusCode, Json<serde_json::Value>)> {
    let tenant_id = TenantId::from_uuid(tenant_id);
    let report = state
        .recon
        .check(tenant_id, &state.default_accounts.accounts_payable)
        .await
        .map_err(|err| {
            error!(tenant_id = %tenant_id, error = %err, "Reconciliation check failed");
            error_response(&AppError::Database(err.to_string()))
        })?;

    if !report.is_in_sync {
        warn!(
            tenant_id = %tenant_id,
            bills_outstanding = %report.bills_outstanding,
            ap_subledger_total = %report.ap_subledger_total,
            gl_ap_balance = %report.gl_ap_balance,
            variance_bills_ap = %report.variance_bills_ap,
            variance_ap_gl = %report.variance_ap_gl,
            issue_count = report.issues.len(),
            "Ledger out of sync with subledgers"
        );
    }

    Ok(Json(report))
}

/// Creates the reconciliation routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/tenants/{tenant_id}/reconciliation",
        get(check_reconciliation),
    )
}
