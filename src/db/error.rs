//! Data-client error type.
//!
//! Errors coming back from the underlying client carry an optional
//! machine-readable code (a Postgres SQLSTATE such as `42P05`, or an ORM code
//! such as `P2025`) and a human-readable message. The retry wrapper inspects
//! both to decide whether a failure is transient; it never rewrites them.

use thiserror::Error;

use crate::resilience::classify::Classify;

/// Record targeted by `update`/`delete` does not exist.
pub const RECORD_NOT_FOUND: &str = "P2025";

/// Unique constraint failed on insert.
pub const UNIQUE_CONSTRAINT: &str = "P2002";

/// Query arguments failed validation.
pub const INVALID_ARGUMENTS: &str = "P2009";

/// Database server unreachable.
pub const CONNECTION_FAILED: &str = "P1001";

/// Error returned by a [`DataClient`](crate::db::DataClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DbError {
    /// Error code reported by the store, if any.
    pub code: Option<String>,
    /// Error message reported by the store.
    pub message: String,
}

/// Result type for data-client operations.
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Error without a code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Error with a code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn record_not_found(model: &str, operation: &str) -> Self {
        Self::with_code(
            RECORD_NOT_FOUND,
            format!("Record to {} not found in `{}`", operation, model),
        )
    }

    pub fn unique_violation(model: &str, field: &str) -> Self {
        Self::with_code(
            UNIQUE_CONSTRAINT,
            format!("Unique constraint failed on `{}`.`{}`", model, field),
        )
    }

    pub fn invalid_arguments(detail: impl Into<String>) -> Self {
        Self::with_code(INVALID_ARGUMENTS, detail)
    }

    /// Returns true if the error carries the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl Classify for DbError {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message() {
        let err = DbError::with_code("42P05", "prepared statement \"s0\" already exists");
        assert_eq!(err.to_string(), "prepared statement \"s0\" already exists");
    }

    #[test]
    fn test_record_not_found_code() {
        let err = DbError::record_not_found("account", "update");
        assert!(err.has_code(RECORD_NOT_FOUND));
        assert!(!err.is_transient());
    }
}
