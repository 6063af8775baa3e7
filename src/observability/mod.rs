//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Retry loop, connection refresh, convenience queries produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
