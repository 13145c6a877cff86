//! Bearer token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActorId, TenantId};

/// JWT claims carried by access tokens issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (actor ID).
    pub sub: ActorId,
    /// Tenant the actor belongs to.
    pub org: TenantId,
    /// Actor's role inside the tenant, e.g. `"secretary"`.
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for an actor.
    #[must_use]
    pub fn new(actor_id: ActorId, tenant_id: TenantId, role: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: actor_id,
            org: tenant_id,
            role: role.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the actor ID from claims.
    #[must_use]
    pub const fn actor_id(&self) -> ActorId {
        self.sub
    }

    /// Returns the tenant ID from claims.
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.org
    }
}
