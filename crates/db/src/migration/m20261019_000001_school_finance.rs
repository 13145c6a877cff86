//! School finance schema: students, fee catalog, ledger records and the
//! append-only audit trail, with row-level security on every table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: TABLES
        // ============================================================
        db.execute_unprepared(STUDENTS_SQL).await?;
        db.execute_unprepared(FEE_CATALOG_SQL).await?;
        db.execute_unprepared(FINANCIAL_RECORDS_SQL).await?;
        db.execute_unprepared(AUDIT_ENTRIES_SQL).await?;

        // ============================================================
        // PART 2: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        // ============================================================
        // PART 3: ROW-LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const STUDENTS_SQL: &str = r"
-- ============================================================
-- TABLE: students
-- Read-only mirror of the external student directory
-- ============================================================
CREATE TABLE students (
    id              UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL,
    classroom_id    UUID,
    grade           TEXT,
    level           TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_students_classroom ON students (tenant_id, classroom_id);
CREATE INDEX idx_students_grade_level ON students (tenant_id, grade, level);
";

const FEE_CATALOG_SQL: &str = r"
-- ============================================================
-- TABLE: fee_catalog
-- ============================================================
CREATE TABLE fee_catalog (
    id                          UUID PRIMARY KEY,
    tenant_id                   UUID NOT NULL,
    name                        VARCHAR(120) NOT NULL CHECK (length(btrim(name)) > 0),
    amount                      NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    category                    TEXT NOT NULL
        CHECK (category IN ('tuition', 'bus', 'books', 'uniform', 'activity', 'other')),
    applicability_level         TEXT,
    applicability_grade         TEXT,
    applicability_classroom_id  UUID,
    created_by                  UUID NOT NULL,
    created_at                  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at                  TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_fee_applicability
        CHECK (applicability_level IS NOT NULL OR applicability_classroom_id IS NOT NULL)
);

CREATE INDEX idx_fee_catalog_tenant_name ON fee_catalog (tenant_id, name);
";

const FINANCIAL_RECORDS_SQL: &str = r"
-- ============================================================
-- TABLE: financial_records
-- fee_catalog_id is informational: no foreign key, so a catalog entry
-- can only be deleted after checking references explicitly.
-- ============================================================
CREATE TABLE financial_records (
    id              UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL,
    student_id      UUID NOT NULL REFERENCES students(id),
    fee_catalog_id  UUID,
    type            TEXT NOT NULL CHECK (type IN ('fee', 'payment', 'discount')),
    amount          NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    description     TEXT NOT NULL DEFAULT '',
    status          TEXT NOT NULL
        CHECK (status IN ('completed', 'pending', 'overdue', 'cancelled')),
    date            DATE NOT NULL,
    invoice_number  VARCHAR(64),
    created_by      UUID NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_financial_records_student
    ON financial_records (tenant_id, student_id, date);
CREATE INDEX idx_financial_records_fee
    ON financial_records (fee_catalog_id) WHERE fee_catalog_id IS NOT NULL;
";

const AUDIT_ENTRIES_SQL: &str = r"
-- ============================================================
-- TABLE: audit_entries
-- ============================================================
CREATE TABLE audit_entries (
    id              UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL,
    actor_id        UUID NOT NULL,
    actor_role      TEXT NOT NULL
        CHECK (actor_role IN ('teacher', 'secretary', 'student', 'parent', 'admin')),
    action_type     VARCHAR(64) NOT NULL CHECK (action_type ~ '^[a-z][a-z0-9_]*$'),
    entity_type     TEXT NOT NULL,
    entity_id       UUID NOT NULL,
    details         JSONB NOT NULL CHECK (jsonb_typeof(details) = 'object'),
    checksum        CHAR(64) NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_audit_entries_tenant_created
    ON audit_entries (tenant_id, created_at DESC, id DESC);
CREATE INDEX idx_audit_entries_action ON audit_entries (tenant_id, action_type);
CREATE INDEX idx_audit_entries_created ON audit_entries (created_at DESC, id DESC);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_record_mutation
-- Amount, type, student and tenant never change; rows are never deleted
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_record_mutation()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        RAISE EXCEPTION 'financial_records rows cannot be deleted';
    END IF;

    IF NEW.amount <> OLD.amount
        OR NEW.type <> OLD.type
        OR NEW.student_id <> OLD.student_id
        OR NEW.tenant_id <> OLD.tenant_id THEN
        RAISE EXCEPTION 'only status may change on financial_records';
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_record_mutation
BEFORE UPDATE OR DELETE ON financial_records
FOR EACH ROW
EXECUTE FUNCTION prevent_record_mutation();

-- ============================================================
-- FUNCTION: prevent_audit_mutation
-- audit_entries is append-only
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_audit_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'audit_entries is append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_audit_mutation
BEFORE UPDATE OR DELETE ON audit_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_audit_mutation();
";

const RLS_SQL: &str = r"
-- ============================================================
-- ROW-LEVEL SECURITY
-- NULLIF guards pooled sessions where a previous SET LOCAL left ''
-- ============================================================
ALTER TABLE students ENABLE ROW LEVEL SECURITY;
ALTER TABLE fee_catalog ENABLE ROW LEVEL SECURITY;
ALTER TABLE financial_records ENABLE ROW LEVEL SECURITY;
ALTER TABLE audit_entries ENABLE ROW LEVEL SECURITY;

ALTER TABLE students FORCE ROW LEVEL SECURITY;
ALTER TABLE fee_catalog FORCE ROW LEVEL SECURITY;
ALTER TABLE financial_records FORCE ROW LEVEL SECURITY;
ALTER TABLE audit_entries FORCE ROW LEVEL SECURITY;

CREATE POLICY tenant_isolation ON students
    USING (tenant_id = NULLIF(current_setting('app.current_tenant_id', true), '')::UUID);

CREATE POLICY tenant_isolation ON fee_catalog
    USING (tenant_id = NULLIF(current_setting('app.current_tenant_id', true), '')::UUID);

CREATE POLICY tenant_isolation ON financial_records
    USING (tenant_id = NULLIF(current_setting('app.current_tenant_id', true), '')::UUID);

CREATE POLICY tenant_isolation ON audit_entries
    USING (tenant_id = NULLIF(current_setting('app.current_tenant_id', true), '')::UUID);

CREATE POLICY admin_read ON audit_entries
    FOR SELECT
    USING (current_setting('app.current_role', true) = 'admin');
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS audit_entries;
DROP TABLE IF EXISTS financial_records;
DROP TABLE IF EXISTS fee_catalog;
DROP TABLE IF EXISTS students;
DROP FUNCTION IF EXISTS prevent_audit_mutation();
DROP FUNCTION IF EXISTS prevent_record_mutation();
";
