//! Resolves a bearer token into a [`TenantContext`].
//!
//! Token verification belongs to the external identity provider; this module
//! only adapts it and keeps resolved contexts in a short-lived cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use tracing::debug;

use bursar_shared::types::{ActorId, TenantId};
use bursar_shared::{JwtError, JwtService};

use super::context::{Role, TenantContext};
use crate::error::CoreError;

/// Default time-to-live for a resolved context (1 minute).
const DEFAULT_TTL_SECS: u64 = 60;

/// Default number of cached contexts.
const DEFAULT_CAPACITY: u64 = 10_000;

/// An authenticated actor as reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorIdentity {
    /// The actor.
    pub actor_id: ActorId,
    /// The tenant the actor is bound to.
    pub tenant_id: TenantId,
    /// The actor's role in that tenant.
    pub role: Role,
    /// When the presented credentials stop being valid, if they expire.
    pub expires_at: Option<DateTime<Utc>>,
}

/// External identity/session provider.
pub trait IdentityProvider: Send + Sync {
    /// Verifies `token` and returns the actor it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Unauthenticated` for any unusable token.
    fn authenticate(&self, token: &str) -> Result<ActorIdentity, CoreError>;
}

/// Identity provider backed by HS256 access tokens.
#[derive(Debug, Clone)]
pub struct JwtIdentityProvider {
    jwt: JwtService,
}

impl JwtIdentityProvider {
    /// Wraps a configured JWT service.
    #[must_use]
    pub const fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn authenticate(&self, token: &str) -> Result<ActorIdentity, CoreError> {
        let claims = self.jwt.validate_token(token).map_err(|e| match e {
            JwtError::Expired => CoreError::Unauthenticated("token has expired".to_string()),
            _ => CoreError::Unauthenticated("invalid token".to_string()),
        })?;

        let role = claims
            .role
            .parse::<Role>()
            .map_err(CoreError::Unauthenticated)?;

        Ok(ActorIdentity {
            actor_id: claims.actor_id(),
            tenant_id: claims.tenant_id(),
            role,
            expires_at: DateTime::from_timestamp(claims.exp, 0),
        })
    }
}

/// A resolved context together with the expiry of its token.
#[derive(Debug, Clone, Copy)]
struct CachedSession {
    context: TenantContext,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedSession {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// Turns credentials into a [`TenantContext`].
///
/// Side-effect free apart from the session cache.
#[derive(Clone)]
pub struct TenantContextResolver {
    provider: Arc<dyn IdentityProvider>,
    cache: Cache<String, CachedSession>,
}

impl std::fmt::Debug for TenantContextResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContextResolver")
            .field("cached_sessions", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl TenantContextResolver {
    /// Creates a resolver with the default cache settings.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self::with_cache_config(provider, DEFAULT_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a resolver with a custom session cache.
    #[must_use]
    pub fn with_cache_config(
        provider: Arc<dyn IdentityProvider>,
        max_capacity: u64,
        ttl_secs: u64,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { provider, cache }
    }

    /// Resolves `actor_token` into a tenant context.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Unauthenticated` if the token is blank or rejected
    /// by the identity provider.
    pub fn resolve(&self, actor_token: &str) -> Result<TenantContext, CoreError> {
        let token = actor_token.trim();
        if token.is_empty() {
            return Err(CoreError::Unauthenticated("missing token".to_string()));
        }

        let now = Utc::now();
        if let Some(session) = self.cache.get(token) {
            if session.is_live(now) {
                return Ok(session.context);
            }
            self.cache.invalidate(token);
        }

        let identity = self.provider.authenticate(token)?;
        let context = TenantContext::new(identity.tenant_id, identity.actor_id, identity.role);
        debug!(
            tenant_id = %context.tenant_id,
            actor_id = %context.actor_id,
            role = %context.role,
            "Resolved tenant context"
        );

        let session = CachedSession {
            context,
            expires_at: identity.expires_at,
        };
        // Tokens accepted within the verifier's leeway are served but not kept.
        if session.is_live(now) {
            self.cache.insert(token.to_string(), session);
        }
        Ok(context)
    }

    /// Drops a cached session, e.g. after logout.
    pub fn forget(&self, actor_token: &str) {
        self.cache.invalidate(actor_token.trim());
    }
}
