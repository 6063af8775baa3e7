//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Database call:
//!     → retries.rs (run, classify failure via classify.rs)
//!     → On transient failure: connection refresh (db::connection)
//!     → backoff.rs (linear delay) → next attempt
//!     → On anything else, or budget spent: original error to caller
//! ```
//!
//! # Design Decisions
//! - Retrying is reserved for pooler-induced prepared-statement errors
//! - Callers see the same error shape with or without the wrapper
//! - The retry loop knows nothing about connections; recovery is a hook

pub mod backoff;
pub mod classify;
pub mod retries;

pub use classify::{is_transient, Classify};
pub use retries::{run_with_retry, RetryPolicy};
