//! Fee catalog: reusable, priced fee templates per tenant.

pub mod service;
pub mod types;
pub mod validation;

pub use service::FeeCatalogService;
pub use types::{Applicability, CreateFeeInput, FeeCatalogEntry, FeeCategory, FeeFilter};
