//! Transient-error classification.
//!
//! # Responsibilities
//! - Decide whether a failed database call is worth retrying
//!
//! # Design Decisions
//! - Only prepared-statement mismatches are transient; these appear when a
//!   transaction-mode pooler (PgBouncer) hands a session a backend that does
//!   not know its statements, and go away after reconnecting
//! - Everything else (constraint violations, not-found, validation,
//!   unrelated network errors) is final on first occurrence
//! - Message matching is case-sensitive, as Postgres reports it in lower case

/// SQLSTATE: prepared statement already exists.
pub const PREPARED_STATEMENT_ALREADY_EXISTS: &str = "42P05";

/// SQLSTATE: prepared statement does not exist.
pub const PREPARED_STATEMENT_DOES_NOT_EXIST: &str = "26000";

const PREPARED_STATEMENT_MARKER: &str = "prepared statement";

/// Returns true if a failure with this message and code should be retried.
pub fn is_transient(message: &str, code: Option<&str>) -> bool {
    message.contains(PREPARED_STATEMENT_MARKER)
        || matches!(
            code,
            Some(PREPARED_STATEMENT_ALREADY_EXISTS) | Some(PREPARED_STATEMENT_DOES_NOT_EXIST)
        )
}

/// An error the retry loop can classify.
pub trait Classify {
    /// Human-readable message.
    fn message(&self) -> &str;

    /// Store error code, if the error carries one.
    fn code(&self) -> Option<&str>;

    fn is_transient(&self) -> bool {
        is_transient(self.message(), self.code())
    }
}
