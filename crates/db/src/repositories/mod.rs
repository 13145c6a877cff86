//! Repositories implementing the `bursar-core` storage ports over PostgreSQL.
//!
//! Every call runs in its own transaction with the RLS tenant context set;
//! queries still filter on `tenant_id` explicitly.

pub mod audit;
pub mod fee_catalog;
pub mod financial_record;
pub mod student;

pub use audit::AuditRepository;
pub use fee_catalog::FeeCatalogRepository;
pub use financial_record::FinancialRecordRepository;
pub use student::StudentRepository;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::DbErr;
use tracing::error;

use bursar_core::store::StoreError;

/// Maps a database error onto the storage port's error.
pub(crate) fn store_err(err: DbErr) -> StoreError {
    match err {
        DbErr::RecordNotFound(_) => StoreError::NotFound,
        DbErr::Conn(e) => StoreError::Unavailable(e.to_string()),
        DbErr::ConnectionAcquire(e) => StoreError::Unavailable(e.to_string()),
        other => {
            error!(error = %other, "Database error");
            StoreError::Backend(other.to_string())
        }
    }
}

pub(crate) fn to_utc(ts: DateTime<FixedOffset>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}
