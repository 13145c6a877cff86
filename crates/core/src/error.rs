//! Error taxonomy shared by every core service.
//!
//! `Validation`, `NotFound`, `Forbidden` and `Conflict` abort the primary
//! operation and reach the caller unchanged. Audit degradation is not part of
//! this enum: it is reported through [`crate::audit::AuditOutcome`] and never
//! fails a primary operation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use bursar_shared::AppError;

use crate::store::StoreError;
use crate::tenant::{Action, Role};

/// Input shape or value problems. Always the caller's fault; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Amount is zero or negative.
    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    /// Amount has more fractional digits than storage keeps.
    #[error("amount must have at most {max} decimal places")]
    TooManyDecimals {
        /// Maximum number of decimal places.
        max: u32,
    },

    /// Amount does not fit the storage precision.
    #[error("amount must be less than {max}")]
    AmountTooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },

    /// No amount given and no catalog entry to take it from.
    #[error("amount is required when no fee catalog entry is referenced")]
    AmountRequired,

    /// Fee applicability names neither a level nor a classroom.
    #[error("applicability required")]
    ApplicabilityRequired,

    /// A required text field is blank.
    #[error("{0} must not be empty")]
    Blank(&'static str),

    /// A text field exceeds its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Offending field.
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },

    /// Cohort filter is missing or incomplete.
    #[error("cohort filter required: classroom_id, or grade and level")]
    CohortRequired,

    /// Cohort filter mixes a classroom with grade/level.
    #[error("cohort filter must be either classroom_id or grade and level, not both")]
    AmbiguousCohort,

    /// Date range is inverted.
    #[error("date range start {from} is after end {to}")]
    InvertedDateRange {
        /// Range start.
        from: NaiveDate,
        /// Range end.
        to: NaiveDate,
    },

    /// Audit action type is not a snake_case identifier.
    #[error("invalid audit action type: {0}")]
    InvalidActionType(String),

    /// Audit details do not match the schema of their action type.
    #[error("invalid audit details for {action_type}: {reason}")]
    InvalidAuditDetails {
        /// Action type whose schema was violated.
        action_type: String,
        /// What was wrong.
        reason: String,
    },
}

/// Errors returned by fee catalog, ledger and audit services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No actor could be resolved from the presented credentials.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Bad input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity is absent or belongs to another tenant.
    ///
    /// Deliberately carries no identifier: the two cases must be
    /// indistinguishable to the caller.
    #[error("Not found")]
    NotFound,

    /// Role not permitted for the action.
    #[error("Role {role} may not {action}")]
    Forbidden {
        /// Attempted action.
        action: Action,
        /// Role of the acting context.
        role: Role,
    },

    /// State precondition violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) => 401,
            Self::Validation(_) => 400,
            Self::NotFound => 404,
            Self::Forbidden { .. } => 403,
            Self::Conflict(_) => 409,
            Self::Storage(_) => 500,
        }
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Unavailable(msg) | StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthenticated(msg) => Self::Unauthorized(msg),
            CoreError::Validation(e) => Self::Validation(e.to_string()),
            CoreError::NotFound => Self::NotFound("resource".to_string()),
            e @ CoreError::Forbidden { .. } => Self::Forbidden(e.to_string()),
            CoreError::Conflict(msg) => Self::Conflict(msg),
            CoreError::Storage(msg) => Self::Database(msg),
        }
    }
}
