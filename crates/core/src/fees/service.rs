//! Fee catalog operations.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use bursar_shared::types::FeeCatalogId;

use super::types::{CreateFeeInput, FeeCatalogEntry, FeeFilter};
use super::validation::{validate_create, validate_name};
use crate::audit::{AuditDetails, AuditLog, EntityRef, FeeCatalogDetails, RenameDetails};
use crate::error::CoreError;
use crate::store::{FeeCatalogStore, StudentDirectory};
use crate::tenant::{Action, FINANCE_STAFF, TenantContext, authorize};

/// Tenant-scoped fee catalog.
#[derive(Clone)]
pub struct FeeCatalogService {
    fees: Arc<dyn FeeCatalogStore>,
    students: Arc<dyn StudentDirectory>,
    audit: AuditLog,
}

impl std::fmt::Debug for FeeCatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeCatalogService").finish_non_exhaustive()
    }
}

impl FeeCatalogService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        fees: Arc<dyn FeeCatalogStore>,
        students: Arc<dyn StudentDirectory>,
        audit: AuditLog,
    ) -> Self {
        Self {
            fees,
            students,
            audit,
        }
    }

    /// Creates a catalog entry.
    ///
    /// # Errors
    ///
    /// `Forbidden` outside finance staff, `Validation` for bad input,
    /// `NotFound` for a classroom unknown to the tenant.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreateFeeInput,
    ) -> Result<FeeCatalogEntry, CoreError> {
        authorize(ctx, Action::CreateFee, FINANCE_STAFF)?;
        validate_create(&input)?;

        if let Some(classroom_id) = input.applicability.classroom_id
            && !self.students.classroom_exists(ctx.tenant_id, classroom_id).await?
        {
            return Err(CoreError::NotFound);
        }

        let now = Utc::now();
        let entry = FeeCatalogEntry {
            id: FeeCatalogId::new(),
            tenant_id: ctx.tenant_id,
            name: validate_name(&input.name)?,
            amount: input.amount,
            category: input.category,
            applicability: input.applicability,
            created_by: ctx.actor_id,
            created_at: now,
            updated_at: now,
        };
        self.fees.insert_fee(entry.clone()).await?;

        info!(
            tenant_id = %ctx.tenant_id,
            fee_catalog_id = %entry.id,
            amount = %entry.amount,
            "Fee catalog entry created"
        );
        self.audit
            .record_best_effort(
                ctx,
                EntityRef::fee_catalog(entry.id),
                AuditDetails::CreateFeeCatalog(snapshot(&entry)),
            )
            .await;

        Ok(entry)
    }

    /// Lists the tenant's entries.
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: &FeeFilter,
    ) -> Result<Vec<FeeCatalogEntry>, CoreError> {
        Ok(self.fees.list_fees(ctx.tenant_id, filter).await?)
    }

    /// Fetches one entry.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown or foreign ids.
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: FeeCatalogId,
    ) -> Result<FeeCatalogEntry, CoreError> {
        self.fees
            .find_fee(ctx.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)
    }

    /// Renames an entry. Amount, category and applicability never change.
    pub async fn rename(
        &self,
        ctx: &TenantContext,
        id: FeeCatalogId,
        name: &str,
    ) -> Result<FeeCatalogEntry, CoreError> {
        authorize(ctx, Action::RenameFee, FINANCE_STAFF)?;
        let name = validate_name(name)?;
        let previous = self.get(ctx, id).await?;
        if previous.name == name {
            return Ok(previous);
        }

        let entry = self
            .fees
            .rename_fee(ctx.tenant_id, id, &name, Utc::now())
            .await?;

        info!(tenant_id = %ctx.tenant_id, fee_catalog_id = %id, "Fee catalog entry renamed");
        self.audit
            .record_best_effort(
                ctx,
                EntityRef::fee_catalog(id),
                AuditDetails::RenameFeeCatalog(RenameDetails {
                    from: previous.name,
                    to: entry.name.clone(),
                }),
            )
            .await;

        Ok(entry)
    }

    /// Deletes an entry no ledger record references.
    ///
    /// # Errors
    ///
    /// `Conflict` when referenced, `NotFound` for unknown or foreign ids.
    pub async fn delete(&self, ctx: &TenantContext, id: FeeCatalogId) -> Result<(), CoreError> {
        authorize(ctx, Action::DeleteFee, FINANCE_STAFF)?;
        let deleted = self.fees.delete_unreferenced(ctx.tenant_id, id).await?;

        info!(tenant_id = %ctx.tenant_id, fee_catalog_id = %id, "Fee catalog entry deleted");
        self.audit
            .record_best_effort(
                ctx,
                EntityRef::fee_catalog(id),
                AuditDetails::DeleteFeeCatalog(snapshot(&deleted)),
            )
            .await;

        Ok(())
    }
}

fn snapshot(entry: &FeeCatalogEntry) -> FeeCatalogDetails {
    FeeCatalogDetails {
        name: entry.name.clone(),
        amount: entry.amount,
        category: entry.category,
    }
}
