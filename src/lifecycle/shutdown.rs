//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use crate::db::client::DataClient;
use crate::db::connection::Database;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe; the first `trigger` notifies all of them.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Later calls are no-ops.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Disconnect the shared client, logging instead of failing.
pub async fn close_database<C: DataClient>(db: &Database<C>) {
    match db.shutdown().await {
        Ok(()) => tracing::info!("Database client disconnected"),
        Err(e) => tracing::error!(error = %e, "Failed to disconnect database client"),
    }
}
