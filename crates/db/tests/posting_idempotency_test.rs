//! Integration tests for idempotent journal posting.
//!
//! Verifies that posting the same `(tenant_id, source_id)` twice -
//! sequentially or concurrently - yields exactly one journal entry, with
//! the storage-level unique constraint as the backstop.
//!
//! Requires a PostgreSQL database; tests skip when DATABASE_URL is unset.

use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sea_orm_migration::MigratorTrait;
use serde_json::json;

use saldo_core::ledger::{
    AccountRole, BusinessEvent, EventKind, JournalBuilder, JournalDraft, PostOutcome,
    PostingAdjustments,
};
use saldo_db::entities::{journal_entries, sea_orm_active_enums::AccountType};
use saldo_db::migration::Migrator;
use saldo_db::repositories::{AccountRepository, JournalRepository};
use saldo_shared::config::DatabaseConfig;
use saldo_shared::types::TenantId;

fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| std::env::var("SALDO__DATABASE__URL").ok())
}

async fn setup() -> Option<(DatabaseConnection, TenantId)> {
    let url = database_url()?;
    let config = DatabaseConfig {
        url,
        max_connections: 10,
        min_connections: 1,
    };
    let db = saldo_db::connect(&config)
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None).await.expect("Migration failed");

    let tenant_id = TenantId::new();
    let accounts = AccountRepository::new(db.clone());
    accounts
        .insert(tenant_id, "1000", "Cash on Hand", AccountType::Asset)
        .await
        .expect("Failed to seed cash account");
    accounts
        .insert(tenant_id, "4000", "Sales Revenue", AccountType::Revenue)
        .await
        .expect("Failed to seed revenue account");

    Some((db, tenant_id))
}

async fn cash_sale_draft(
    db: &DatabaseConnection,
    tenant_id: TenantId,
    source_id: &str,
) -> JournalDraft {
    let event = BusinessEvent::from_payload(
        EventKind::SaleCompleted,
        &json!({
            "source_id": source_id,
            "total_amount": "750000",
            "payment_method": "cash"
        }),
    )
    .unwrap();

    let accounts = AccountRepository::new(db.clone());
    let cash = accounts
        .require_active_by_code(tenant_id, "1000")
        .await
        .unwrap();
    let revenue = accounts
        .require_active_by_code(tenant_id, "4000")
        .await
        .unwrap();

    JournalBuilder::build(&event, &PostingAdjustments::default(), move |role| {
        Ok(match role {
            AccountRole::Cash => cash.clone(),
            _ => revenue.clone(),
        })
    })
    .unwrap()
}

#[tokio::test]
async fn test_posted_entry_is_balanced() {
    let Some((db, tenant_id)) = setup().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let repo = JournalRepository::new(db.clone());
    let draft = cash_sale_draft(&db, tenant_id, "tx-balanced-1").await;
    let outcome = repo.insert_posted(tenant_id, None, &draft).await.unwrap();

    let PostOutcome::Posted(posted) = outcome else {
        panic!("expected a fresh posting");
    };

    let entry = journal_entries::Entity::find_by_id(posted.journal_id.into_inner())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.total_debit, entry.total_credit);
    assert_eq!(entry.total_debit, dec!(750000));

    let lines = repo.find_lines(posted.journal_id).await.unwrap();
    assert_eq!(lines.len(), 2);
    let debit_sum: rust_decimal::Decimal = lines.iter().map(|l| l.debit).sum();
    let credit_sum: rust_decimal::Decimal = lines.iter().map(|l| l.credit).sum();
    assert_eq!(debit_sum, credit_sum);
}

#[tokio::test]
async fn test_sequential_double_post_returns_first_entry() {
    let Some((db, tenant_id)) = setup().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let repo = JournalRepository::new(db.clone());
    let draft = cash_sale_draft(&db, tenant_id, "tx-seq-1").await;

    let first = repo.insert_posted(tenant_id, None, &draft).await.unwrap();
    let second = repo.insert_posted(tenant_id, None, &draft).await.unwrap();

    assert!(matches!(first, PostOutcome::Posted(_)));
    let PostOutcome::AlreadyPosted(existing) = second else {
        panic!("second post must be an idempotent no-op");
    };
    assert_eq!(existing.journal_id, first.journal().journal_id);

    let count = journal_entries::Entity::find()
        .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(journal_entries::Column::SourceId.eq("tx-seq-1"))
        .all(&db)
        .await
        .unwrap()
        .len();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_concurrent_double_post_creates_single_entry() {
    let Some((db, tenant_id)) = setup().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let repo = JournalRepository::new(db.clone());
    let draft = cash_sale_draft(&db, tenant_id, "tx-42").await;

    let (a, b) = tokio::join!(
        repo.insert_posted(tenant_id, None, &draft),
        repo.insert_posted(tenant_id, None, &draft),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    // Both calls resolve to the same journal entry.
    assert_eq!(a.journal().journal_id, b.journal().journal_id);

    let entries = journal_entries::Entity::find()
        .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(journal_entries::Column::SourceId.eq("tx-42"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_journal_numbers_are_sequential_per_tenant() {
    let Some((db, tenant_id)) = setup().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let repo = JournalRepository::new(db.clone());
    for i in 1..=3 {
        let draft = cash_sale_draft(&db, tenant_id, &format!("tx-seq-no-{i}")).await;
        repo.insert_posted(tenant_id, None, &draft).await.unwrap();
    }

    let mut numbers: Vec<i64> = journal_entries::Entity::find()
        .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()))
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.journal_no)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_reversal_voids_original_and_mirrors_lines() {
    let Some((db, tenant_id)) = setup().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let repo = JournalRepository::new(db.clone());
    let draft = cash_sale_draft(&db, tenant_id, "tx-rev-1").await;
    let posted = match repo.insert_posted(tenant_id, None, &draft).await.unwrap() {
        PostOutcome::Posted(p) => p,
        PostOutcome::AlreadyPosted(_) => panic!("expected fresh posting"),
    };

    let reversal = repo.reverse(tenant_id, posted.journal_id).await.unwrap();
    let PostOutcome::Posted(reversal) = reversal else {
        panic!("expected fresh reversal");
    };

    let original = journal_entries::Entity::find_by_id(posted.journal_id.into_inner())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        original.status,
        saldo_db::entities::sea_orm_active_enums::JournalStatus::Voided
    );

    let reversal_lines = repo.find_lines(reversal.journal_id).await.unwrap();
    let original_lines = repo.find_lines(posted.journal_id).await.unwrap();
    assert_eq!(reversal_lines.len(), original_lines.len());
    let original_debits: rust_decimal::Decimal = original_lines.iter().map(|l| l.debit).sum();
    let reversal_credits: rust_decimal::Decimal = reversal_lines.iter().map(|l| l.credit).sum();
    assert_eq!(original_debits, reversal_credits);

    // Reversing again is an idempotent no-op.
    let again = repo.reverse(tenant_id, posted.journal_id).await;
    match again {
        Ok(PostOutcome::AlreadyPosted(existing)) => {
            assert_eq!(existing.journal_id, reversal.journal_id);
        }
        other => panic!("expected AlreadyPosted, got {other:?}"),
    }
}
