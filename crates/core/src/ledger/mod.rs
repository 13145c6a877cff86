//! Per-student school fee ledger.
//!
//! - Domain types for records, cohorts and filters
//! - Balance aggregation and the incremental balance cache
//! - Field validation
//! - The ledger service

pub mod balance;
pub mod cache;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod service_props;

pub use balance::BalanceSummary;
pub use cache::{BalanceCache, BalanceDrift};
pub use service::LedgerService;
pub use types::{
    AssignCohortInput, Cohort, CohortCharge, CohortSelector, DateRange, FinancialRecord,
    RecordStatus, RecordTransactionInput, RecordType, TransactionFilter,
};
