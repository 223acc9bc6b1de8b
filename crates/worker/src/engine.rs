//! Posting engine: turns outbox events into posted journal entries.
//!
//! Orchestrates payload validation, rule evaluation, account resolution,
//! balanced line construction, and idempotent persistence. All pure logic
//! lives in saldo-core; all storage access goes through repositories.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use saldo_core::ledger::{
    AccountRef, AccountRole, BusinessEvent, EventKind, JournalBuilder, PostOutcome,
    PostingAdjustments, PostingError,
};
use saldo_core::rules::{RuleEvaluator, RuleType};
use saldo_db::entities::outbox_events;
use saldo_db::repositories::{AccountRepository, JournalRepository, RuleRepository};
use saldo_shared::config::DefaultAccounts;
use saldo_shared::types::TenantId;

/// The ledger posting engine.
#[derive(Clone)]
pub struct PostingEngine {
    journal: JournalRepository,
    accounts: AccountRepository,
    rules: RuleRepository,
    defaults: DefaultAccounts,
}

impl PostingEngine {
    /// Creates a new posting engine.
    #[must_use]
    pub const fn new(
        journal: JournalRepository,
        accounts: AccountRepository,
        rules: RuleRepository,
        defaults: DefaultAccounts,
    ) -> Self {
        Self {
            journal,
            accounts,
            rules,
            defaults,
        }
    }

    /// Posts one outbox event, at most once per `(tenant_id, source_id)`.
    ///
    /// # Errors
    ///
    /// Validation errors are permanent; `Database`/`Timeout` errors are
    /// retried by the dispatcher with the same idempotency key.
    pub async fn post_event(
        &self,
        row: &outbox_events::Model,
    ) -> Result<PostOutcome, PostingError> {
        let tenant_id = TenantId::from_uuid(row.tenant_id);
        let kind = EventKind::parse(&row.event_type)
            .ok_or_else(|| PostingError::UnknownEventType(row.event_type.clone()))?;
        let event = BusinessEvent::from_payload(kind, &row.payload)?;

        // Fast-path idempotency read; the storage unique constraint backs
        // this up against concurrent workers.
        if let Some(existing) = self
            .journal
            .find_by_source(tenant_id, event.source_id())
            .await
            .map_err(|err| PostingError::Database(err.to_string()))?
        {
            debug!(
                tenant_id = %tenant_id,
                source_id = %event.source_id(),
                journal_number = %existing.journal_number,
                "Event already posted"
            );
            return Ok(PostOutcome::AlreadyPosted(
                saldo_core::ledger::PostedJournal {
                    journal_id: saldo_shared::types::JournalEntryId::from_uuid(existing.id),
                    journal_number: existing.journal_number,
                },
            ));
        }

        let context = event.rule_context();
        let adjustments = self.resolve_adjustments(tenant_id, kind, &context).await?;
        let resolved = self
            .resolve_accounts(tenant_id, &event, &adjustments, &context)
            .await?;

        let draft = JournalBuilder::build(&event, &adjustments, |role| {
            resolved
                .get(&role)
                .cloned()
                .ok_or_else(|| PostingError::AccountNotFound {
                    code: role.as_str().to_string(),
                })
        })?;

        self.journal
            .insert_posted(tenant_id, Some(row.id.to_string()), &draft)
            .await
    }

    /// Derives tax/discount rates from tenant rules.
    async fn resolve_adjustments(
        &self,
        tenant_id: TenantId,
        kind: EventKind,
        context: &Value,
    ) -> Result<PostingAdjustments, PostingError> {
        // Only sales carry tax/discount adjustments.
        if kind != EventKind::SaleCompleted {
            return Ok(PostingAdjustments::default());
        }

        let tax_rate = self
            .evaluate_rules(tenant_id, RuleType::TaxCalculation, context)
            .await?
            .and_then(|action| action_decimal(&action, "tax_rate"));
        let discount_rate = self
            .evaluate_rules(tenant_id, RuleType::DiscountCalculation, context)
            .await?
            .and_then(|action| action_decimal(&action, "discount_rate"));

        Ok(PostingAdjustments {
            tax_rate,
            discount_rate,
        })
    }

    /// Pre-resolves every account role the builder may need.
    async fn resolve_accounts(
        &self,
        tenant_id: TenantId,
        event: &BusinessEvent,
        adjustments: &PostingAdjustments,
        context: &Value,
    ) -> Result<HashMap<AccountRole, AccountRef>, PostingError> {
        let mapping_action = self
            .evaluate_rules(tenant_id, RuleType::ProductMapping, context)
            .await?;

        let mut resolved = HashMap::new();
        for role in candidate_roles(event, adjustments) {
            let code = self.code_for_role(role, event, mapping_action.as_ref());
            let account = self.accounts.require_active_by_code(tenant_id, &code).await?;
            resolved.insert(role, account);
        }
        Ok(resolved)
    }

    /// Account code precedence: per-event payload override, then tenant
    /// mapping rule, then configured default.
    fn code_for_role(
        &self,
        role: AccountRole,
        event: &BusinessEvent,
        mapping_action: Option<&serde_json::Map<String, Value>>,
    ) -> String {
        if role == AccountRole::Expense
            && let BusinessEvent::ExpenseRecorded(payload) = event
            && let Some(code) = payload.expense_account.as_deref()
        {
            return code.to_string();
        }

        if let Some(action) = mapping_action {
            let key = format!("{}_account", role.as_str());
            if let Some(Value::String(code)) = action.get(&key) {
                return code.clone();
            }
        }

        let defaults = &self.defaults;
        match role {
            AccountRole::Cash => defaults.cash.clone(),
            AccountRole::Bank => defaults.bank.clone(),
            AccountRole::AccountsReceivable => defaults.accounts_receivable.clone(),
            AccountRole::AccountsPayable => defaults.accounts_payable.clone(),
            AccountRole::SalesRevenue => defaults.sales_revenue.clone(),
            AccountRole::SalesDiscounts => defaults.sales_discounts.clone(),
            AccountRole::Inventory => defaults.inventory.clone(),
            AccountRole::TaxPayable => defaults.tax_payable.clone(),
            AccountRole::Expense => defaults.general_expense.clone(),
        }
    }

    async fn evaluate_rules(
        &self,
        tenant_id: TenantId,
        rule_type: RuleType,
        context: &Value,
    ) -> Result<Option<saldo_core::rules::RuleAction>, PostingError> {
        let rules = self
            .rules
            .get_rules(tenant_id, rule_type)
            .await
            .map_err(|err| PostingError::Database(err.to_string()))?;
        Ok(RuleEvaluator::evaluate(&rules, context).map(|m| m.action))
    }
}

/// The fixed candidate roles for an event, given its adjustments.
fn candidate_roles(event: &BusinessEvent, adjustments: &PostingAdjustments) -> Vec<AccountRole> {
    let settlement = AccountRole::settlement(event.kind(), event.payment_method());
    match event.kind() {
        EventKind::SaleCompleted => {
            let mut roles = vec![settlement, AccountRole::SalesRevenue];
            if adjustments.discount_rate.is_some_and(|r| r > Decimal::ZERO) {
                roles.push(AccountRole::SalesDiscounts);
            }
            if adjustments.tax_rate.is_some_and(|r| r > Decimal::ZERO) {
                roles.push(AccountRole::TaxPayable);
            }
            roles
        }
        EventKind::PurchaseCompleted => vec![AccountRole::Inventory, settlement],
        EventKind::ExpenseRecorded => vec![AccountRole::Expense, settlement],
    }
}

/// Reads a decimal from a rule action payload, coercing strings.
fn action_decimal(action: &serde_json::Map<String, Value>, key: &str) -> Option<Decimal> {
    match action.get(key)? {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}
