//! Initial database migration.
//!
//! Creates all core tables, enums, indexes, and RLS policies for the
//! ledger-posting pipeline.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS & RULES
        // ============================================================
        db.execute_unprepared(CHART_OF_ACCOUNTS_SQL).await?;
        db.execute_unprepared(RULES_SQL).await?;

        // ============================================================
        // PART 3: OUTBOX
        // ============================================================
        db.execute_unprepared(OUTBOX_EVENTS_SQL).await?;

        // ============================================================
        // PART 4: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;

        // ============================================================
        // PART 5: SUBLEDGERS
        // ============================================================
        db.execute_unprepared(BILLS_SQL).await?;
        db.execute_unprepared(AP_ENTRIES_SQL).await?;

        // ============================================================
        // PART 6: ROW-LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Outbox event lifecycle
CREATE TYPE outbox_status AS ENUM (
    'pending',
    'processing',
    'done',
    'failed',
    'dead'
);

-- Journal entry status
CREATE TYPE journal_status AS ENUM ('draft', 'posted', 'voided');

-- Rule categories
CREATE TYPE rule_type AS ENUM (
    'product_mapping',
    'tax_calculation',
    'discount_calculation',
    'inventory_alert'
);

-- Account types
CREATE TYPE account_type AS ENUM (
    'asset',
    'liability',
    'equity',
    'revenue',
    'expense'
);

-- Vendor bill status
CREATE TYPE bill_status AS ENUM ('outstanding', 'paid', 'void');
";

const CHART_OF_ACCOUNTS_SQL: &str = r"
CREATE TABLE chart_of_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, code)
);

CREATE INDEX idx_coa_tenant ON chart_of_accounts(tenant_id);
";

const RULES_SQL: &str = r"
CREATE TABLE rules (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    rule_type rule_type NOT NULL,
    name VARCHAR(255) NOT NULL,
    condition JSONB NOT NULL,
    action JSONB NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Rule lookups are always per (tenant, type)
CREATE INDEX idx_rules_tenant_type ON rules(tenant_id, rule_type) WHERE is_active;
";

const OUTBOX_EVENTS_SQL: &str = r"
CREATE TABLE outbox_events (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    event_type VARCHAR(100) NOT NULL,
    payload JSONB NOT NULL,
    status outbox_status NOT NULL DEFAULT 'pending',
    attempt_count INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    next_attempt_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    processed_at TIMESTAMPTZ
);

-- Partial index serving the dispatcher's claim query
CREATE INDEX idx_outbox_claim ON outbox_events(next_attempt_at, created_at)
    WHERE status = 'pending';
CREATE INDEX idx_outbox_tenant ON outbox_events(tenant_id, created_at);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    journal_no BIGINT NOT NULL,
    journal_number VARCHAR(20) NOT NULL,
    source_id VARCHAR(255) NOT NULL,
    trace_id VARCHAR(255),
    status journal_status NOT NULL DEFAULT 'draft',
    description TEXT NOT NULL,
    total_debit NUMERIC(20, 4) NOT NULL,
    total_credit NUMERIC(20, 4) NOT NULL,
    reverses_journal_id UUID REFERENCES journal_entries(id),
    posted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    -- At-most-once posting backstop under concurrent dispatchers
    CONSTRAINT uq_journal_tenant_source UNIQUE (tenant_id, source_id),
    CONSTRAINT uq_journal_tenant_no UNIQUE (tenant_id, journal_no),
    CONSTRAINT ck_journal_balanced CHECK (total_debit = total_credit)
);

CREATE INDEX idx_journal_tenant_created ON journal_entries(tenant_id, created_at);
CREATE INDEX idx_journal_tenant_status ON journal_entries(tenant_id, status);
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    journal_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES chart_of_accounts(id),
    debit NUMERIC(20, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(20, 4) NOT NULL DEFAULT 0,
    memo TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    -- Exactly one side per line
    CONSTRAINT ck_line_single_side CHECK (
        (debit > 0 AND credit = 0) OR (credit > 0 AND debit = 0)
    )
);

CREATE INDEX idx_lines_journal ON journal_lines(journal_id);
CREATE INDEX idx_lines_account ON journal_lines(account_id);
";

const BILLS_SQL: &str = r"
CREATE TABLE bills (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    bill_number VARCHAR(100) NOT NULL,
    vendor_name VARCHAR(255) NOT NULL,
    amount NUMERIC(20, 4) NOT NULL,
    status bill_status NOT NULL DEFAULT 'outstanding',
    journal_id UUID REFERENCES journal_entries(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, bill_number)
);

CREATE INDEX idx_bills_tenant_status ON bills(tenant_id, status);
";

const AP_ENTRIES_SQL: &str = r"
CREATE TABLE ap_entries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    bill_id UUID REFERENCES bills(id),
    amount NUMERIC(20, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_ap_tenant ON ap_entries(tenant_id);
CREATE INDEX idx_ap_bill ON ap_entries(bill_id);
";

const RLS_SQL: &str = r"
-- Tenant isolation on tenant-scoped tables. The session variable
-- app.current_tenant_id is set per transaction by TenantConnection.
ALTER TABLE chart_of_accounts ENABLE ROW LEVEL SECURITY;
ALTER TABLE rules ENABLE ROW LEVEL SECURITY;
ALTER TABLE journal_entries ENABLE ROW LEVEL SECURITY;
ALTER TABLE bills ENABLE ROW LEVEL SECURITY;
ALTER TABLE ap_entries ENABLE ROW LEVEL SECURITY;

CREATE POLICY tenant_isolation_coa ON chart_of_accounts
    USING (tenant_id = current_setting('app.current_tenant_id', true)::uuid);
CREATE POLICY tenant_isolation_rules ON rules
    USING (tenant_id = current_setting('app.current_tenant_id', true)::uuid);
CREATE POLICY tenant_isolation_journal ON journal_entries
    USING (tenant_id = current_setting('app.current_tenant_id', true)::uuid);
CREATE POLICY tenant_isolation_bills ON bills
    USING (tenant_id = current_setting('app.current_tenant_id', true)::uuid);
CREATE POLICY tenant_isolation_ap ON ap_entries
    USING (tenant_id = current_setting('app.current_tenant_id', true)::uuid);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS ap_entries CASCADE;
DROP TABLE IF EXISTS bills CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS outbox_events CASCADE;
DROP TABLE IF EXISTS rules CASCADE;
DROP TABLE IF EXISTS chart_of_accounts CASCADE;

DROP TYPE IF EXISTS bill_status;
DROP TYPE IF EXISTS account_type;
DROP TYPE IF EXISTS rule_type;
DROP TYPE IF EXISTS journal_status;
DROP TYPE IF EXISTS outbox_status;
";
