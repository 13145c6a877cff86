//! Request middleware.

pub mod auth;

pub use auth::{Tenant, auth_middleware};
