//! The audit log service: append, best-effort append, and scoped queries.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use super::types::{AuditDetails, AuditEntry, AuditFilter, AuditQuery, EntityRef};
use crate::error::{CoreError, ValidationError};
use crate::store::AuditStore;
use crate::tenant::{Action, OVERSIGHT, TenantContext, authorize};

/// Default page size when the caller gives none.
pub const DEFAULT_QUERY_LIMIT: u32 = 100;

/// Hard cap on the page size.
pub const MAX_QUERY_LIMIT: u32 = 1000;

/// Why an audit write did not happen.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The details were rejected.
    #[error("Invalid audit entry: {0}")]
    Invalid(#[from] ValidationError),

    /// The audit store could not take the entry.
    #[error("Audit log degraded: {0}")]
    Degraded(String),
}

/// Result of a best-effort audit write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    /// The entry was stored.
    Recorded,
    /// The entry was lost; a warning has been logged.
    Degraded,
}

impl AuditOutcome {
    /// Returns true if the entry was lost.
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded)
    }
}

/// Page size bounds for [`AuditLog::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Used when the query names no limit.
    pub default_limit: u32,
    /// Upper bound on any limit.
    pub max_limit: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_QUERY_LIMIT,
            max_limit: MAX_QUERY_LIMIT,
        }
    }
}

impl QueryLimits {
    fn clamp(self, requested: Option<u32>) -> usize {
        let limit = requested
            .filter(|l| *l > 0)
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
            .max(1);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

/// Append-only activity log.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
    limits: QueryLimits,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl AuditLog {
    /// Creates a log over `store` with the default limits.
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self::with_limits(store, QueryLimits::default())
    }

    /// Creates a log with custom query limits.
    #[must_use]
    pub fn with_limits(store: Arc<dyn AuditStore>, limits: QueryLimits) -> Self {
        Self { store, limits }
    }

    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// `Invalid` for malformed custom details, `Degraded` when the store is
    /// unavailable.
    pub async fn record(
        &self,
        ctx: &TenantContext,
        entity: EntityRef,
        details: AuditDetails,
    ) -> Result<AuditEntry, AuditError> {
        details.validate()?;
        let entry = AuditEntry::new(ctx, entity, &details);
        self.store
            .append(entry.clone())
            .await
            .map_err(|e| AuditError::Degraded(e.to_string()))?;
        Ok(entry)
    }

    /// Appends one entry, never failing the caller.
    ///
    /// A lost entry is logged and not retried.
    pub async fn record_best_effort(
        &self,
        ctx: &TenantContext,
        entity: EntityRef,
        details: AuditDetails,
    ) -> AuditOutcome {
        let action_type = details.action_type().to_string();
        match self.record(ctx, entity, details).await {
            Ok(_) => AuditOutcome::Recorded,
            Err(err) => {
                warn!(
                    tenant_id = %ctx.tenant_id,
                    action_type = %action_type,
                    error = %err,
                    "Audit entry dropped"
                );
                AuditOutcome::Degraded
            }
        }
    }

    /// Reads entries, newest first.
    ///
    /// Non-admins always read their own tenant. Admins read the tenant they
    /// name, or every tenant when they name none.
    ///
    /// # Errors
    ///
    /// `Forbidden` outside [`OVERSIGHT`] or when a non-admin names another
    /// tenant, `Validation` for an inverted date range, `Storage` when the
    /// store fails.
    pub async fn query(
        &self,
        ctx: &TenantContext,
        query: AuditQuery,
    ) -> Result<Vec<AuditEntry>, CoreError> {
        authorize(ctx, Action::QueryAudit, OVERSIGHT)?;
        query.date_range.validate()?;

        let tenant_id = if ctx.is_admin() {
            query.tenant_id
        } else {
            match query.tenant_id {
                Some(requested) if requested != ctx.tenant_id => {
                    return Err(CoreError::Forbidden {
                        action: Action::ActForTenant,
                        role: ctx.role,
                    });
                }
                _ => Some(ctx.tenant_id),
            }
        };

        let filter = AuditFilter {
            tenant_id,
            role: query.role,
            action_type: query.action_type,
            entity_type: query.entity_type,
            date_range: query.date_range,
            limit: self.limits.clamp(query.limit),
        };
        Ok(self.store.query(&filter).await?)
    }
}
