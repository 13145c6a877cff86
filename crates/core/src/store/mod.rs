//! Storage ports.
//!
//! Services hold these as `Arc<dyn ...>`; `bursar-db` implements them over
//! PostgreSQL and [`InMemoryStore`] implements them for tests and embedding.
//! Every method takes the tenant explicitly and must never return or touch
//! another tenant's rows.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bursar_shared::types::{
    ClassroomId, FeeCatalogId, FinancialRecordId, StudentId, TenantId,
};

use crate::audit::{AuditEntry, AuditFilter};
use crate::fees::{FeeCatalogEntry, FeeFilter};
use crate::ledger::{Cohort, CohortCharge, FinancialRecord, RecordStatus, TransactionFilter};

pub use memory::InMemoryStore;

/// Storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The row does not exist in this tenant.
    #[error("Not found")]
    NotFound,

    /// A state precondition checked inside the store failed.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store is temporarily unreachable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A student as known to the external student directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Student ID.
    pub id: StudentId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Current classroom.
    pub classroom_id: Option<ClassroomId>,
    /// Grade within the level.
    pub grade: Option<String>,
    /// School level.
    pub level: Option<String>,
}

impl Student {
    /// Returns true if the student belongs to `cohort`.
    #[must_use]
    pub fn in_cohort(&self, cohort: &Cohort) -> bool {
        match cohort {
            Cohort::Classroom { classroom_id } => self.classroom_id == Some(*classroom_id),
            Cohort::GradeLevel { grade, level } => {
                self.grade.as_deref() == Some(grade.as_str())
                    && self.level.as_deref() == Some(level.as_str())
            }
        }
    }
}

/// Read access to the student directory.
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    /// Looks up a student inside a tenant.
    async fn find_student(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> Result<Option<Student>, StoreError>;

    /// Returns true if the classroom has at least one student in the tenant.
    async fn classroom_exists(
        &self,
        tenant_id: TenantId,
        classroom_id: ClassroomId,
    ) -> Result<bool, StoreError>;
}

/// Fee catalog persistence.
#[async_trait]
pub trait FeeCatalogStore: Send + Sync {
    /// Inserts a new entry.
    async fn insert_fee(&self, entry: FeeCatalogEntry) -> Result<(), StoreError>;

    /// Finds an entry inside a tenant.
    async fn find_fee(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
    ) -> Result<Option<FeeCatalogEntry>, StoreError>;

    /// Lists a tenant's entries, ordered by name.
    async fn list_fees(
        &self,
        tenant_id: TenantId,
        filter: &FeeFilter,
    ) -> Result<Vec<FeeCatalogEntry>, StoreError>;

    /// Renames an entry and returns it.
    async fn rename_fee(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<FeeCatalogEntry, StoreError>;

    /// Deletes an entry no ledger record refers to, atomically with the check.
    ///
    /// Returns the deleted entry; `Conflict` if it is referenced.
    async fn delete_unreferenced(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
    ) -> Result<FeeCatalogEntry, StoreError>;
}

/// Ledger persistence.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts one record.
    async fn insert_record(&self, record: FinancialRecord) -> Result<(), StoreError>;

    /// Finds a record inside a tenant.
    async fn find_record(
        &self,
        tenant_id: TenantId,
        id: FinancialRecordId,
    ) -> Result<Option<FinancialRecord>, StoreError>;

    /// Lists a tenant's records, ordered by date then creation.
    async fn list_records(
        &self,
        tenant_id: TenantId,
        filter: &TransactionFilter,
    ) -> Result<Vec<FinancialRecord>, StoreError>;

    /// Moves a record from `from` to `to` and returns the updated row.
    ///
    /// `Conflict` if the stored status is no longer `from`.
    async fn update_status(
        &self,
        tenant_id: TenantId,
        id: FinancialRecordId,
        from: RecordStatus,
        to: RecordStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<FinancialRecord, StoreError>;

    /// Resolves `cohort` and inserts one charge per member in a single
    /// transaction. Either every record is stored or none is.
    async fn assign_cohort(
        &self,
        cohort: &Cohort,
        charge: &CohortCharge,
    ) -> Result<Vec<FinancialRecord>, StoreError>;
}

/// Audit trail persistence. Append and read only.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends one entry.
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Returns matching entries, newest first, at most `filter.limit`.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError>;
}
