//! Append-only, tamper-evident activity log.
//!
//! Every mutating fee and ledger operation writes one entry through
//! [`AuditLog::record_best_effort`]; a failed write is logged and never fails
//! the operation that triggered it.

pub mod service;
pub mod types;

pub use service::{AuditError, AuditLog, AuditOutcome, QueryLimits};
pub use types::{
    AssignFeeDetails, AuditDetails, AuditEntry, AuditFilter, AuditQuery, EntityRef,
    FeeCatalogDetails, RenameDetails, StatusChangeDetails, TransactionDetails,
};
