//! Database seeder for Saldo development and testing.
//!
//! Seeds a demo tenant with a default chart of accounts, posting rules,
//! sample outbox events, and matching bills/AP subledger rows.
//!
//! Usage: cargo run --bin seeder

use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use uuid::Uuid;

use saldo_core::rules::{Rule, RuleType};
use saldo_db::entities::{ap_entries, bills, sea_orm_active_enums};
use saldo_db::repositories::{AccountRepository, OutboxRepository, RuleRepository};
use saldo_shared::config::DatabaseConfig;
use saldo_shared::types::{RuleId, TenantId};

/// Demo tenant ID (consistent for all seeds)
const DEMO_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let config = DatabaseConfig {
        url: database_url,
        max_connections: 5,
        min_connections: 1,
    };

    println!("Connecting to database...");
    let db = saldo_db::connect(&config)
        .await
        .expect("Failed to connect to database");

    let tenant_id = TenantId::from_uuid(Uuid::parse_str(DEMO_TENANT_ID).unwrap());

    println!("Seeding chart of accounts...");
    seed_chart_of_accounts(&db, tenant_id).await;

    println!("Seeding posting rules...");
    seed_rules(&db, tenant_id).await;

    println!("Seeding outbox events...");
    seed_outbox_events(&db, tenant_id).await;

    println!("Seeding bills and AP subledger...");
    seed_subledgers(&db, tenant_id).await;

    println!("Done.");
}

async fn seed_chart_of_accounts(db: &sea_orm::DatabaseConnection, tenant_id: TenantId) {
    use sea_orm_active_enums::AccountType::{Asset, Expense, Liability, Revenue};

    let accounts = AccountRepository::new(db.clone());
    let defaults = [
        ("1000", "Cash on Hand", Asset),
        ("1010", "Bank", Asset),
        ("1100", "Accounts Receivable", Asset),
        ("1200", "Inventory", Asset),
        ("2000", "Accounts Payable", Liability),
        ("2100", "Tax Payable", Liability),
        ("4000", "Sales Revenue", Revenue),
        ("4900", "Sales Discounts", Revenue),
        ("6000", "General Expense", Expense),
        ("6100", "Rent Expense", Expense),
    ];

    for (code, name, account_type) in defaults {
        if accounts
            .find_by_code(tenant_id, code)
            .await
            .expect("Failed to query chart of accounts")
            .is_some()
        {
            continue;
        }
        accounts
            .insert(tenant_id, code, name, account_type)
            .await
            .expect("Failed to seed account");
    }
}

async fn seed_rules(db: &sea_orm::DatabaseConnection, tenant_id: TenantId) {
    let rules = RuleRepository::new(db.clone());

    let bulk_discount = Rule {
        id: RuleId::from_uuid(Uuid::parse_str("00000000-0000-0000-0000-0000000000a1").unwrap()),
        tenant_id,
        rule_type: RuleType::DiscountCalculation,
        name: "Bulk order discount".to_string(),
        condition: serde_json::from_value(json!({"quantity": ">= 10"})).unwrap(),
        action: object(json!({"discount_rate": "0.05"})),
        priority: 8,
        is_active: true,
    };

    let standard_vat = Rule {
        id: RuleId::from_uuid(Uuid::parse_str("00000000-0000-0000-0000-0000000000a2").unwrap()),
        tenant_id,
        rule_type: RuleType::TaxCalculation,
        name: "Standard VAT".to_string(),
        condition: serde_json::from_value(json!({"total_amount": ">= 0.01"})).unwrap(),
        action: object(json!({"tax_rate": "0.11"})),
        priority: 1,
        is_active: true,
    };

    // Same write-time validation path tenant configuration goes through.
    let wholesale_mapping = Rule::parse(
        tenant_id,
        &json!({
            "rule_id": "00000000-0000-0000-0000-0000000000a3",
            "rule_type": "product_mapping",
            "name": "Wholesale revenue account",
            "condition": {"product_category": "wholesale"},
            "action": {"sales_revenue_account": "4000"},
            "priority": 5
        }),
    )
    .expect("Invalid wholesale mapping rule");

    for rule in [bulk_discount, standard_vat, wholesale_mapping] {
        rules.upsert_rule(&rule).await.expect("Failed to seed rule");
    }
}

async fn seed_outbox_events(db: &sea_orm::DatabaseConnection, tenant_id: TenantId) {
    let outbox = OutboxRepository::new(db.clone());

    outbox
        .append(
            tenant_id,
            "sale.completed",
            json!({
                "source_id": "demo-sale-1",
                "total_amount": "750000",
                "payment_method": "cash",
                "counterparty_name": "Walk-in customer"
            }),
        )
        .await
        .expect("Failed to seed sale event");

    outbox
        .append(
            tenant_id,
            "expense.recorded",
            json!({
                "source_id": "demo-expense-1",
                "total_amount": "1500000",
                "payment_method": "bank_transfer",
                "expense_account": "6100",
                "description": "Office rent July"
            }),
        )
        .await
        .expect("Failed to seed expense event");

    outbox
        .append(
            tenant_id,
            "purchase.completed",
            json!({
                "source_id": "demo-purchase-1",
                "total_amount": "2500000",
                "payment_method": "credit",
                "counterparty_name": "PT Sumber Makmur"
            }),
        )
        .await
        .expect("Failed to seed purchase event");
}

async fn seed_subledgers(db: &sea_orm::DatabaseConnection, tenant_id: TenantId) {
    let now = chrono::Utc::now();
    let bill_id = Uuid::parse_str("00000000-0000-0000-0000-0000000000b1").unwrap();

    let bill = bills::ActiveModel {
        id: Set(bill_id),
        tenant_id: Set(tenant_id.into_inner()),
        bill_number: Set("BILL-0001".to_string()),
        vendor_name: Set("PT Sumber Makmur".to_string()),
        amount: Set(Decimal::from_str("2500000").unwrap()),
        status: Set(sea_orm_active_enums::BillStatus::Outstanding),
        journal_id: Set(None),
        created_at: Set(now.into()),
    };
    // Idempotent re-runs: ignore the duplicate bill number.
    if bill.insert(db).await.is_err() {
        return;
    }

    ap_entries::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id.into_inner()),
        bill_id: Set(Some(bill_id)),
        amount: Set(Decimal::from_str("2500000").unwrap()),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await
    .expect("Failed to seed AP entry");
}

fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}
