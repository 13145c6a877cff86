//! Core business logic for Bursar.
//!
//! This crate has no web or database dependencies. Persistence sits behind
//! the async ports in [`store`]; everything else is domain logic.
//!
//! # Modules
//!
//! - `tenant` - Tenant context resolution and role checks
//! - `fees` - Fee catalog
//! - `ledger` - Student ledger, cohort billing and balances
//! - `audit` - Append-only activity log
//! - `store` - Storage ports and the in-memory store
//! - `error` - Error taxonomy

pub mod audit;
pub mod error;
pub mod fees;
pub mod ledger;
pub mod store;
pub mod tenant;

pub use error::{CoreError, ValidationError};
