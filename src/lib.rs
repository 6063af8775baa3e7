//! Resilient data access for the personal-finance app.
//!
//! # Architecture Overview
//!
//! ```text
//!   actions (savings goals)        diagnostics (connection check)
//!            │                                 │
//!            ▼                                 │
//!   db::SafeQuery (findMany, create, ...)      │
//!            │                                 │
//!            ▼                                 │
//!   db::Database::with_retry ──── resilience   │
//!            │      ▲            (classify,    │
//!            │      │             backoff)     │
//!            │   refresh                       │
//!            ▼                                 ▼
//!   db::DataClient (MemoryClient or an external ORM client)
//!
//!   Cross-cutting: config, observability (tracing, metrics), lifecycle
//! ```

pub mod actions;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use db::{DataClient, Database, DbError, SafeQuery};
pub use lifecycle::Shutdown;
pub use resilience::RetryPolicy;
