//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types, as seen by API callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// No valid session could be resolved.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// The actor's role does not permit the action.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found (or not visible to the caller's tenant).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input shape or values.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A state precondition was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the message that is safe to show to the caller.
    ///
    /// Server-side failures are collapsed to a generic message so that
    /// storage details never leak into responses.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "An internal error occurred".to_string(),
            Self::NotFound(_) => "Not found".to_string(),
            other => other.to_string(),
        }
    }
}
