//! Tenant context resolution and role-based authorization.
//!
//! Every service call takes a [`TenantContext`] as its first argument; there
//! is no ambient "current tenant".

pub mod context;
pub mod resolver;

pub use context::{Action, FINANCE_STAFF, OVERSIGHT, Role, TenantContext, authorize};
pub use resolver::{ActorIdentity, IdentityProvider, JwtIdentityProvider, TenantContextResolver};
