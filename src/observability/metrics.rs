//! Metrics collection and exposition.
//!
//! # Metrics
//! - `db_operations_total` (counter): wrapped operations by model, operation, outcome
//! - `db_retries_total` (counter): transient failures that were retried
//! - `db_refresh_total` (counter): connection refreshes by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_operation(model: &str, operation: &'static str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!(
        "db_operations_total",
        "model" => model.to_string(),
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_retry() {
    metrics::counter!("db_retries_total").increment(1);
}

pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("db_refresh_total", "outcome" => outcome).increment(1);
}
