//! The explicit tenant context and the role check guarding every mutation.

use serde::{Deserialize, Serialize};

use bursar_shared::types::{ActorId, TenantId};

use crate::error::CoreError;

/// The single role an actor holds inside a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Teaching staff.
    Teacher,
    /// Administrative staff handling fees and payments.
    Secretary,
    /// Enrolled student.
    Student,
    /// Parent or guardian.
    Parent,
    /// Platform administrator; the only role that reaches across tenants.
    Admin,
}

impl Role {
    /// Returns the storage/wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Secretary => "secretary",
            Self::Student => "student",
            Self::Parent => "parent",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "teacher" => Ok(Self::Teacher),
            "secretary" => Ok(Self::Secretary),
            "student" => Ok(Self::Student),
            "parent" => Ok(Self::Parent),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// Roles allowed to change fees and ledger records.
pub const FINANCE_STAFF: &[Role] = &[Role::Teacher, Role::Secretary];

/// Roles allowed to read ledgers and the audit trail.
pub const OVERSIGHT: &[Role] = &[Role::Teacher, Role::Secretary, Role::Admin];

/// Actions subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a fee catalog entry.
    CreateFee,
    /// Rename a fee catalog entry.
    RenameFee,
    /// Delete a fee catalog entry.
    DeleteFee,
    /// Record a single ledger transaction.
    RecordTransaction,
    /// Bill a cohort from the catalog.
    AssignCohort,
    /// Move a ledger record to another status.
    UpdateRecordStatus,
    /// Read balances and ledger records.
    ViewLedger,
    /// Read the audit trail.
    QueryAudit,
    /// Bind an admin context to another tenant.
    ActForTenant,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::CreateFee => "create fees",
            Self::RenameFee => "rename fees",
            Self::DeleteFee => "delete fees",
            Self::RecordTransaction => "record transactions",
            Self::AssignCohort => "assign fees to a cohort",
            Self::UpdateRecordStatus => "change record status",
            Self::ViewLedger => "view the ledger",
            Self::QueryAudit => "query the audit log",
            Self::ActForTenant => "act for another tenant",
        })
    }
}

/// Who is acting, for which tenant, in which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// Tenant every read and write is scoped to.
    pub tenant_id: TenantId,
    /// Acting user.
    pub actor_id: ActorId,
    /// Role of the acting user.
    pub role: Role,
}

impl TenantContext {
    /// Creates a context.
    #[must_use]
    pub const fn new(tenant_id: TenantId, actor_id: ActorId, role: Role) -> Self {
        Self {
            tenant_id,
            actor_id,
            role,
        }
    }

    /// Returns true for the cross-tenant administrator role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Rebinds an admin context to an explicit target tenant.
    ///
    /// Ledger reads never span tenants, so an admin names the tenant it
    /// operates on through this call.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` for any role other than admin.
    pub fn acting_for(&self, target: TenantId) -> Result<Self, CoreError> {
        if !self.is_admin() {
            return Err(CoreError::Forbidden {
                action: Action::ActForTenant,
                role: self.role,
            });
        }
        Ok(Self {
            tenant_id: target,
            ..*self
        })
    }
}

/// Checks that the context's role is one of `allowed`.
///
/// # Errors
///
/// Returns `CoreError::Forbidden` when the role is not in the set.
pub fn authorize(context: &TenantContext, action: Action, allowed: &[Role]) -> Result<(), CoreError> {
    if allowed.contains(&context.role) {
        Ok(())
    } else {
        Err(CoreError::Forbidden {
            action,
            role: context.role,
        })
    }
}
