//! Data-access subsystem.
//!
//! # Data Flow
//! ```text
//! Application code
//!     → safe_query.rs (findMany/create/... by model name)
//!     → connection.rs (Database::with_retry, refresh between attempts)
//!     → client.rs (DataClient trait)
//!     → memory.rs or an external ORM client
//! ```
//!
//! # Design Decisions
//! - One client per process, constructed at startup and shared via `Arc`
//! - Errors from the client are returned unchanged (error.rs)

pub mod client;
pub mod connection;
pub mod error;
pub mod memory;
pub mod safe_query;

pub use client::{BatchStep, DataClient, Operation};
pub use connection::{Database, RefreshOutcome};
pub use error::{DbError, DbResult};
pub use memory::MemoryClient;
pub use safe_query::SafeQuery;
