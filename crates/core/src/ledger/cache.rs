//! Incrementally maintained balance hints.
//!
//! Entries are only ever created from a full scan; writes then adjust the
//! entries that exist. Nothing here is authoritative: the ledger service
//! recomputes from rows and repairs an entry whenever the two disagree.

use std::sync::Arc;

use dashmap::DashMap;

use bursar_shared::types::{StudentId, TenantId};

use super::balance::BalanceSummary;
use super::types::{FinancialRecord, RecordStatus};

/// Disagreement between a cached hint and the full scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDrift {
    /// What the cache held.
    pub cached: BalanceSummary,
    /// What the rows say.
    pub actual: BalanceSummary,
}

/// Concurrent per-student balance cache, keyed by tenant and student.
#[derive(Debug, Clone, Default)]
pub struct BalanceCache {
    entries: Arc<DashMap<(TenantId, StudentId), BalanceSummary>>,
}

impl BalanceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached hint, if any.
    #[must_use]
    pub fn get(&self, tenant_id: TenantId, student_id: StudentId) -> Option<BalanceSummary> {
        self.entries.get(&(tenant_id, student_id)).map(|e| *e)
    }

    /// Follows a newly inserted record.
    pub fn record_created(&self, record: &FinancialRecord) {
        if let Some(mut entry) = self.entries.get_mut(&(record.tenant_id, record.student_id)) {
            entry.apply_record(record);
        }
    }

    /// Follows a status transition of `record` (which still holds the old status).
    pub fn status_changed(&self, record: &FinancialRecord, to: RecordStatus) {
        if let Some(mut entry) = self.entries.get_mut(&(record.tenant_id, record.student_id)) {
            entry.apply_status_change(record.record_type, record.amount, record.status, to);
        }
    }

    /// Compares the hint with a fresh full scan and stores the scan.
    ///
    /// Returns the drift when a previous hint existed and disagreed.
    pub fn reconcile(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        actual: BalanceSummary,
    ) -> Option<BalanceDrift> {
        let previous = self.entries.insert((tenant_id, student_id), actual);
        previous
            .filter(|cached| *cached != actual)
            .map(|cached| BalanceDrift { cached, actual })
    }

    /// Number of cached students.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
