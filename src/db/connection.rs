//! Shared client handle with connection refresh.
//!
//! # Responsibilities
//! - Own the process-wide data client (constructed once at startup)
//! - Run operations under the retry policy
//! - Refresh the connection (disconnect + reconnect) between retries
//! - Disconnect on shutdown
//!
//! # Design Decisions
//! - Passed explicitly as `Arc<Database<C>>`; there is no global client
//! - Refreshes are serialized and coalesced by a generation counter: each
//!   attempt records the generation it ran under, and a refresh is skipped
//!   if the generation moved on since (someone else already reconnected)
//! - A failed refresh is logged and discarded; the retry loop carries on and
//!   will most likely exhaust its budget on the original error

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::schema::RetryConfig;
use crate::db::client::DataClient;
use crate::db::error::DbResult;
use crate::observability::metrics;
use crate::resilience::classify::Classify;
use crate::resilience::retries::{run_with_retry, RetryPolicy};

/// What a refresh request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The client was disconnected and reconnected.
    Refreshed,
    /// A concurrent call already refreshed since the failure was observed.
    Coalesced,
    /// Disconnect or reconnect failed; the error was logged.
    Failed,
}

impl RefreshOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshOutcome::Refreshed => "refreshed",
            RefreshOutcome::Coalesced => "coalesced",
            RefreshOutcome::Failed => "failed",
        }
    }
}

/// The process-wide data client plus its retry policy.
pub struct Database<C: DataClient> {
    client: Arc<C>,
    policy: RetryPolicy,
    coalesce_refresh: bool,
    refresh_lock: Mutex<()>,
    /// Completed refreshes.
    generation: AtomicU64,
}

impl<C: DataClient> Database<C> {
    /// Wrap an already constructed client.
    pub fn new(client: C, config: &RetryConfig) -> Self {
        Self::with_policy(client, RetryPolicy::from(config)).coalescing(config.coalesce_refresh)
    }

    /// Wrap a client with an explicit policy; refreshes are coalesced.
    pub fn with_policy(client: C, policy: RetryPolicy) -> Self {
        Self {
            client: Arc::new(client),
            policy,
            coalesce_refresh: true,
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Enable or disable refresh coalescing.
    pub fn coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_refresh = enabled;
        self
    }

    /// Connect `client` and wrap it. Intended to run once at process start.
    pub async fn connect(client: C, config: &RetryConfig) -> DbResult<Self> {
        client.connect().await?;
        tracing::info!(
            max_attempts = config.max_attempts,
            base_delay_ms = config.base_delay_ms,
            coalesce_refresh = config.coalesce_refresh,
            "Database client connected"
        );
        Ok(Self::new(client, config))
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Number of completed refreshes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Run `operation` with the configured attempt ceiling.
    pub async fn with_retry<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        E: Classify,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.with_retry_limit(operation, self.policy.max_attempts)
            .await
    }

    /// Run `operation` with at most `max_attempts` attempts.
    pub async fn with_retry_limit<T, E, F, Fut>(
        &self,
        mut operation: F,
        max_attempts: u32,
    ) -> Result<T, E>
    where
        E: Classify,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let observed = AtomicU64::new(self.generation());
        let observed = &observed;
        let this = self;

        run_with_retry(
            self.policy.with_max_attempts(max_attempts),
            || {
                observed.store(this.generation(), Ordering::SeqCst);
                operation()
            },
            move |_attempt| {
                let seen = observed.load(Ordering::SeqCst);
                async move {
                    this.refresh_since(seen).await;
                }
            },
        )
        .await
    }

    /// Disconnect and reconnect the client now.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_since(self.generation()).await
    }

    async fn refresh_since(&self, observed: u64) -> RefreshOutcome {
        let outcome = if self.coalesce_refresh {
            let _guard = self.refresh_lock.lock().await;
            if self.generation() != observed {
                tracing::debug!(
                    observed,
                    current = self.generation(),
                    "Connection already refreshed by a concurrent call"
                );
                RefreshOutcome::Coalesced
            } else {
                self.cycle_connection().await
            }
        } else {
            self.cycle_connection().await
        };

        metrics::record_refresh(outcome.as_str());
        outcome
    }

    async fn cycle_connection(&self) -> RefreshOutcome {
        let result = async {
            self.client.disconnect().await?;
            self.client.connect().await
        }
        .await;

        match result {
            Ok(()) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(generation, "Connection refreshed");
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                tracing::error!(error = %e, "Connection refresh failed");
                RefreshOutcome::Failed
            }
        }
    }

    /// Disconnect the client. Call once before the process exits.
    pub async fn shutdown(&self) -> DbResult<()> {
        tracing::info!("Disconnecting database client");
        self.client.disconnect().await
    }
}
