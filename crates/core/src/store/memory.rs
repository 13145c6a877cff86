//! In-process implementation of every storage port.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bursar_shared::types::{
    ClassroomId, FeeCatalogId, FinancialRecordId, StudentId, TenantId,
};

use super::{
    AuditStore, FeeCatalogStore, LedgerStore, Student, StudentDirectory, StoreError,
};
use crate::audit::{AuditEntry, AuditFilter};
use crate::fees::{FeeCatalogEntry, FeeFilter};
use crate::ledger::{Cohort, CohortCharge, FinancialRecord, RecordStatus, TransactionFilter};

#[derive(Debug, Default)]
struct State {
    students: HashMap<StudentId, Student>,
    fees: HashMap<FeeCatalogId, FeeCatalogEntry>,
    records: Vec<FinancialRecord>,
    audit: Vec<AuditEntry>,
}

/// Memory-backed store with switchable faults.
///
/// One lock guards all tables, so a cohort assignment is trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    fail_next_cohort_commit: AtomicBool,
    audit_offline: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a student in the directory.
    pub async fn add_student(&self, student: Student) {
        self.state.write().await.students.insert(student.id, student);
    }

    /// Makes the next `assign_cohort` fail after staging its records,
    /// before anything becomes visible.
    pub fn fail_next_cohort_commit(&self) {
        self.fail_next_cohort_commit.store(true, Ordering::SeqCst);
    }

    /// Takes the audit table offline (or back online).
    pub fn set_audit_offline(&self, offline: bool) {
        self.audit_offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl StudentDirectory for InMemoryStore {
    async fn find_student(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> Result<Option<Student>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .students
            .get(&student_id)
            .filter(|s| s.tenant_id == tenant_id)
            .cloned())
    }

    async fn classroom_exists(
        &self,
        tenant_id: TenantId,
        classroom_id: ClassroomId,
    ) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .students
            .values()
            .any(|s| s.tenant_id == tenant_id && s.classroom_id == Some(classroom_id)))
    }
}

#[async_trait]
impl FeeCatalogStore for InMemoryStore {
    async fn insert_fee(&self, entry: FeeCatalogEntry) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.fees.contains_key(&entry.id) {
            return Err(StoreError::Conflict("fee catalog id already exists".to_string()));
        }
        state.fees.insert(entry.id, entry);
        Ok(())
    }

    async fn find_fee(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
    ) -> Result<Option<FeeCatalogEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .fees
            .get(&id)
            .filter(|f| f.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_fees(
        &self,
        tenant_id: TenantId,
        filter: &FeeFilter,
    ) -> Result<Vec<FeeCatalogEntry>, StoreError> {
        let state = self.state.read().await;
        let mut fees: Vec<_> = state
            .fees
            .values()
            .filter(|f| f.tenant_id == tenant_id && filter.matches(f))
            .cloned()
            .collect();
        fees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(fees)
    }

    async fn rename_fee(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<FeeCatalogEntry, StoreError> {
        let mut state = self.state.write().await;
        let fee = state
            .fees
            .get_mut(&id)
            .filter(|f| f.tenant_id == tenant_id)
            .ok_or(StoreError::NotFound)?;
        fee.name = name.to_string();
        fee.updated_at = updated_at;
        Ok(fee.clone())
    }

    async fn delete_unreferenced(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
    ) -> Result<FeeCatalogEntry, StoreError> {
        let mut state = self.state.write().await;
        if !state.fees.get(&id).is_some_and(|f| f.tenant_id == tenant_id) {
            return Err(StoreError::NotFound);
        }
        if state.records.iter().any(|r| r.fee_catalog_id == Some(id)) {
            return Err(StoreError::Conflict(
                "fee catalog entry is referenced by ledger records".to_string(),
            ));
        }
        state.fees.remove(&id).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_record(&self, record: FinancialRecord) -> Result<(), StoreError> {
        self.state.write().await.records.push(record);
        Ok(())
    }

    async fn find_record(
        &self,
        tenant_id: TenantId,
        id: FinancialRecordId,
    ) -> Result<Option<FinancialRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .find(|r| r.id == id && r.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_records(
        &self,
        tenant_id: TenantId,
        filter: &TransactionFilter,
    ) -> Result<Vec<FinancialRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .records
            .iter()
            .filter(|r| r.tenant_id == tenant_id && filter.matches(r))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal keys.
        records.sort_by_key(|r| (r.date, r.created_at));
        Ok(records)
    }

    async fn update_status(
        &self,
        tenant_id: TenantId,
        id: FinancialRecordId,
        from: RecordStatus,
        to: RecordStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<FinancialRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id && r.tenant_id == tenant_id)
            .ok_or(StoreError::NotFound)?;
        if record.status != from {
            return Err(StoreError::Conflict(format!(
                "record status changed concurrently to {}",
                record.status
            )));
        }
        record.status = to;
        record.updated_at = updated_at;
        Ok(record.clone())
    }

    async fn assign_cohort(
        &self,
        cohort: &Cohort,
        charge: &CohortCharge,
    ) -> Result<Vec<FinancialRecord>, StoreError> {
        let mut state = self.state.write().await;

        let mut members: Vec<&Student> = state
            .students
            .values()
            .filter(|s| s.tenant_id == charge.tenant_id && s.in_cohort(cohort))
            .collect();
        members.sort_by_key(|s| s.id);
        let staged: Vec<FinancialRecord> = members.iter().map(|s| charge.charge(s.id)).collect();

        if self.fail_next_cohort_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "cohort assignment aborted before commit".to_string(),
            ));
        }

        state.records.extend(staged.iter().cloned());
        Ok(staged)
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        if self.audit_offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("audit store offline".to_string()));
        }
        self.state.write().await.audit.push(entry);
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(filter.limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{RecordType, TransactionFilter};
    use bursar_shared::types::ActorId;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn student(tenant_id: TenantId, classroom_id: ClassroomId) -> Student {
        Student {
            id: StudentId::new(),
            tenant_id,
            classroom_id: Some(classroom_id),
            grade: Some("5".to_string()),
            level: Some("primary".to_string()),
        }
    }

    fn charge(tenant_id: TenantId) -> CohortCharge {
        CohortCharge {
            tenant_id,
            fee_catalog_id: FeeCatalogId::new(),
            amount: dec!(1500),
            description: "Term 1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            created_by: ActorId::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_directory_is_tenant_scoped() {
        let store = InMemoryStore::new();
        let (tenant_a, tenant_b) = (TenantId::new(), TenantId::new());
        let classroom = ClassroomId::new();
        let s = student(tenant_a, classroom);
        store.add_student(s.clone()).await;

        assert_eq!(store.find_student(tenant_a, s.id).await.unwrap(), Some(s.clone()));
        assert_eq!(store.find_student(tenant_b, s.id).await.unwrap(), None);
        assert!(store.classroom_exists(tenant_a, classroom).await.unwrap());
        assert!(!store.classroom_exists(tenant_b, classroom).await.unwrap());
    }

    #[tokio::test]
    async fn test_assign_cohort_only_bills_tenant_members() {
        let store = InMemoryStore::new();
        let (tenant_a, tenant_b) = (TenantId::new(), TenantId::new());
        let classroom = ClassroomId::new();
        store.add_student(student(tenant_a, classroom)).await;
        store.add_student(student(tenant_a, classroom)).await;
        store.add_student(student(tenant_b, classroom)).await;
        store.add_student(student(tenant_a, ClassroomId::new())).await;

        let created = store
            .assign_cohort(&Cohort::Classroom { classroom_id: classroom }, &charge(tenant_a))
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|r| r.tenant_id == tenant_a));
        let stored = store
            .list_records(tenant_a, &TransactionFilter::default())
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert!(store
            .list_records(tenant_b, &TransactionFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_failed_cohort_commit_leaves_nothing() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let classroom = ClassroomId::new();
        store.add_student(student(tenant, classroom)).await;

        store.fail_next_cohort_commit();
        let cohort = Cohort::Classroom { classroom_id: classroom };
        let result = store.assign_cohort(&cohort, &charge(tenant)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store
            .list_records(tenant, &TransactionFilter::default())
            .await
            .unwrap()
            .is_empty());

        // The fault fires once.
        assert_eq!(store.assign_cohort(&cohort, &charge(tenant)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_is_compare_and_set() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let record = charge(tenant).charge(StudentId::new());
        store.insert_record(record.clone()).await.unwrap();

        let updated = store
            .update_status(tenant, record.id, RecordStatus::Pending, RecordStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.status, RecordStatus::Completed);
        assert_eq!(updated.record_type, RecordType::Fee);

        let stale = store
            .update_status(tenant, record.id, RecordStatus::Pending, RecordStatus::Cancelled, Utc::now())
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict(_))));

        let foreign = store
            .update_status(TenantId::new(), record.id, RecordStatus::Completed, RecordStatus::Completed, Utc::now())
            .await;
        assert_eq!(foreign.unwrap_err(), StoreError::NotFound);
    }
}
