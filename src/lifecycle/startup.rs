//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Connect the shared data client
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The client connects last, after observability is up

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{load_config_or_default, AppConfig, ConfigError};
use crate::db::client::DataClient;
use crate::db::connection::Database;
use crate::db::error::DbError;
use crate::db::safe_query::SafeQuery;
use crate::observability::{logging, metrics};

/// Error raised while bringing the process up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] DbError),
}

/// Everything a running process needs.
pub struct App<C: DataClient> {
    pub config: AppConfig,
    pub db: Arc<Database<C>>,
    pub queries: SafeQuery<C>,
}

/// Load config and initialize observability.
pub fn prepare(config_path: Option<&Path>) -> Result<AppConfig, StartupError> {
    let config = load_config_or_default(config_path)?;
    logging::init_logging(&config.observability);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        environment = ?config.observability.environment,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );
    Ok(config)
}

/// Connect `client` under `config` and build the shared handles.
pub async fn start<C: DataClient>(config: AppConfig, client: C) -> Result<App<C>, StartupError> {
    let db = Arc::new(Database::connect(client, &config.retries).await?);
    let queries = SafeQuery::new(Arc::clone(&db));
    Ok(App {
        config,
        db,
        queries,
    })
}
