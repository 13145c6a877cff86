//! Ledger engine: records, cohort billing, balances and status changes.
//!
//! Every call takes the tenant context first and never reads or writes
//! outside `ctx.tenant_id`. Audit writes are best effort and happen after the
//! primary write has succeeded.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use bursar_shared::types::{FinancialRecordId, StudentId};

use super::balance::BalanceSummary;
use super::cache::{BalanceCache, BalanceDrift};
use super::types::{
    AssignCohortInput, CohortCharge, FinancialRecord, RecordStatus, RecordTransactionInput,
    TransactionFilter,
};
use super::validation::{validate_amount, validate_description, validate_invoice_number};
use crate::audit::{
    AssignFeeDetails, AuditDetails, AuditLog, EntityRef, StatusChangeDetails, TransactionDetails,
};
use crate::error::{CoreError, ValidationError};
use crate::store::{FeeCatalogStore, LedgerStore, StudentDirectory};
use crate::tenant::{Action, FINANCE_STAFF, OVERSIGHT, TenantContext, authorize};

/// Tenant-scoped ledger operations.
#[derive(Clone)]
pub struct LedgerService {
    ledger: Arc<dyn LedgerStore>,
    students: Arc<dyn StudentDirectory>,
    fees: Arc<dyn FeeCatalogStore>,
    audit: AuditLog,
    cache: BalanceCache,
}

impl std::fmt::Debug for LedgerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerService")
            .field("cached_balances", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl LedgerService {
    /// Creates the service with an empty balance cache.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        students: Arc<dyn StudentDirectory>,
        fees: Arc<dyn FeeCatalogStore>,
        audit: AuditLog,
    ) -> Self {
        Self {
            ledger,
            students,
            fees,
            audit,
            cache: BalanceCache::new(),
        }
    }

    /// Records one fee, payment or discount.
    ///
    /// With a catalog id the catalog amount is the default and an explicit
    /// amount wins. Without one an explicit amount is required.
    ///
    /// # Errors
    ///
    /// `Forbidden` outside finance staff, `Validation` for bad input,
    /// `NotFound` for a student or catalog entry outside the tenant.
    pub async fn record_transaction(
        &self,
        ctx: &TenantContext,
        input: RecordTransactionInput,
    ) -> Result<FinancialRecord, CoreError> {
        authorize(ctx, Action::RecordTransaction, FINANCE_STAFF)?;
        let invoice_number = validate_invoice_number(input.invoice_number.as_deref())?;
        let mut description = validate_description(&input.description)?;

        self.require_student(ctx, input.student_id).await?;

        let fee = match input.fee_catalog_id {
            Some(id) => Some(
                self.fees
                    .find_fee(ctx.tenant_id, id)
                    .await?
                    .ok_or(CoreError::NotFound)?,
            ),
            None => None,
        };

        let amount = input
            .amount
            .or_else(|| fee.as_ref().map(|f| f.amount))
            .ok_or(ValidationError::AmountRequired)?;
        let amount = validate_amount(amount)?;

        if description.is_empty()
            && let Some(fee) = &fee
        {
            description.clone_from(&fee.name);
        }

        let now = Utc::now();
        let record = FinancialRecord {
            id: FinancialRecordId::new(),
            tenant_id: ctx.tenant_id,
            student_id: input.student_id,
            fee_catalog_id: input.fee_catalog_id,
            record_type: input.record_type,
            amount,
            description,
            status: input.status,
            date: input.date.unwrap_or_else(|| now.date_naive()),
            invoice_number,
            created_by: ctx.actor_id,
            created_at: now,
            updated_at: now,
        };
        self.ledger.insert_record(record.clone()).await?;
        self.cache.record_created(&record);

        info!(
            tenant_id = %ctx.tenant_id,
            record_id = %record.id,
            student_id = %record.student_id,
            record_type = %record.record_type,
            amount = %record.amount,
            "Ledger record created"
        );
        self.audit
            .record_best_effort(
                ctx,
                EntityRef::financial_record(record.id),
                AuditDetails::for_transaction(TransactionDetails {
                    amount: record.amount,
                    record_type: record.record_type,
                    student_id: record.student_id,
                }),
            )
            .await;

        Ok(record)
    }

    /// Bills every student of a cohort from a catalog entry.
    ///
    /// One pending fee per member, all inserted in one storage transaction.
    /// Calling twice bills twice. Returns the number of records created.
    ///
    /// # Errors
    ///
    /// `Forbidden` outside finance staff, `Validation` for a bad cohort
    /// filter, `NotFound` for a catalog entry outside the tenant, `Storage`
    /// when the transaction fails (nothing is written then).
    pub async fn assign_to_cohort(
        &self,
        ctx: &TenantContext,
        input: AssignCohortInput,
    ) -> Result<usize, CoreError> {
        authorize(ctx, Action::AssignCohort, FINANCE_STAFF)?;
        let cohort = input.cohort.resolve()?;
        let description = input
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?
            .filter(|d| !d.is_empty());

        let fee = self
            .fees
            .find_fee(ctx.tenant_id, input.fee_catalog_id)
            .await?
            .ok_or(CoreError::NotFound)?;

        let now = Utc::now();
        let charge = CohortCharge {
            tenant_id: ctx.tenant_id,
            fee_catalog_id: fee.id,
            amount: fee.amount,
            description: description.unwrap_or_else(|| fee.name.clone()),
            date: input.date.unwrap_or_else(|| now.date_naive()),
            created_by: ctx.actor_id,
            created_at: now,
        };
        let created = self.ledger.assign_cohort(&cohort, &charge).await?;
        for record in &created {
            self.cache.record_created(record);
        }

        let affected = created.len();
        info!(
            tenant_id = %ctx.tenant_id,
            fee_catalog_id = %fee.id,
            affected_students = affected,
            "Fee assigned to cohort"
        );
        self.audit
            .record_best_effort(
                ctx,
                EntityRef::fee_catalog(fee.id),
                AuditDetails::AssignFee(AssignFeeDetails {
                    cohort,
                    fee_catalog_id: fee.id,
                    affected_students: u64::try_from(affected).unwrap_or(u64::MAX),
                }),
            )
            .await;

        Ok(affected)
    }

    /// Aggregates a student's balance from every stored record.
    ///
    /// The result always comes from the full scan; a disagreeing cache entry
    /// is repaired and logged.
    ///
    /// # Errors
    ///
    /// `Forbidden` outside oversight roles, `NotFound` for a student outside
    /// the tenant.
    pub async fn compute_balance(
        &self,
        ctx: &TenantContext,
        student_id: StudentId,
    ) -> Result<BalanceSummary, CoreError> {
        let (summary, _) = self.scan_balance(ctx, student_id).await?;
        Ok(summary)
    }

    /// Returns the incrementally maintained hint, if one exists.
    ///
    /// Hints only exist for students whose balance has been computed at
    /// least once.
    pub async fn cached_balance(
        &self,
        ctx: &TenantContext,
        student_id: StudentId,
    ) -> Result<Option<BalanceSummary>, CoreError> {
        authorize(ctx, Action::ViewLedger, OVERSIGHT)?;
        self.require_student(ctx, student_id).await?;
        Ok(self.cache.get(ctx.tenant_id, student_id))
    }

    /// Recomputes a student's balance and reports whether the cache had
    /// drifted from it.
    pub async fn reconcile(
        &self,
        ctx: &TenantContext,
        student_id: StudentId,
    ) -> Result<Option<BalanceDrift>, CoreError> {
        let (_, drift) = self.scan_balance(ctx, student_id).await?;
        Ok(drift)
    }

    /// Lists records of the context's tenant.
    ///
    /// # Errors
    ///
    /// `Forbidden` outside oversight roles, `Validation` for an inverted
    /// date range.
    pub async fn list_transactions(
        &self,
        ctx: &TenantContext,
        filter: &TransactionFilter,
    ) -> Result<Vec<FinancialRecord>, CoreError> {
        authorize(ctx, Action::ViewLedger, OVERSIGHT)?;
        filter.date_range.validate()?;
        Ok(self.ledger.list_records(ctx.tenant_id, filter).await?)
    }

    /// Fetches one record.
    pub async fn get_transaction(
        &self,
        ctx: &TenantContext,
        id: FinancialRecordId,
    ) -> Result<FinancialRecord, CoreError> {
        authorize(ctx, Action::ViewLedger, OVERSIGHT)?;
        self.ledger
            .find_record(ctx.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)
    }

    /// Moves a record to another status.
    ///
    /// Re-applying the current status returns the record unchanged and
    /// writes no audit entry.
    ///
    /// # Errors
    ///
    /// `Forbidden` outside finance staff, `NotFound` for a record outside the
    /// tenant, `Conflict` for a transition out of a settled or cancelled
    /// state or back to pending.
    pub async fn update_status(
        &self,
        ctx: &TenantContext,
        id: FinancialRecordId,
        status: RecordStatus,
    ) -> Result<FinancialRecord, CoreError> {
        authorize(ctx, Action::UpdateRecordStatus, FINANCE_STAFF)?;
        let record = self
            .ledger
            .find_record(ctx.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;

        if record.status == status {
            return Ok(record);
        }
        if !record.status.can_transition_to(status) {
            return Err(CoreError::Conflict(format!(
                "cannot move record from {} to {status}",
                record.status
            )));
        }

        let updated = self
            .ledger
            .update_status(ctx.tenant_id, id, record.status, status, Utc::now())
            .await?;
        self.cache.status_changed(&record, status);

        info!(
            tenant_id = %ctx.tenant_id,
            record_id = %id,
            from = %record.status,
            to = %status,
            "Ledger record status changed"
        );
        self.audit
            .record_best_effort(
                ctx,
                EntityRef::financial_record(id),
                AuditDetails::UpdateFinancialStatus(StatusChangeDetails {
                    from: record.status,
                    to: status,
                }),
            )
            .await;

        Ok(updated)
    }

    async fn scan_balance(
        &self,
        ctx: &TenantContext,
        student_id: StudentId,
    ) -> Result<(BalanceSummary, Option<BalanceDrift>), CoreError> {
        authorize(ctx, Action::ViewLedger, OVERSIGHT)?;
        self.require_student(ctx, student_id).await?;

        let records = self
            .ledger
            .list_records(ctx.tenant_id, &TransactionFilter::for_student(student_id))
            .await?;
        let summary = BalanceSummary::from_records(&records);

        let drift = self.cache.reconcile(ctx.tenant_id, student_id, summary);
        if let Some(drift) = &drift {
            warn!(
                tenant_id = %ctx.tenant_id,
                student_id = %student_id,
                cached = %drift.cached.balance,
                actual = %drift.actual.balance,
                "Balance cache drifted from ledger; repaired"
            );
        }
        Ok((summary, drift))
    }

    async fn require_student(
        &self,
        ctx: &TenantContext,
        student_id: StudentId,
    ) -> Result<(), CoreError> {
        self.students
            .find_student(ctx.tenant_id, student_id)
            .await?
            .map(|_| ())
            .ok_or(CoreError::NotFound)
    }
}
