//! Retry logic.
//!
//! # Responsibilities
//! - Run an operation, classifying each failure
//! - Hand transient failures to a recovery hook, then back off linearly
//! - Enforce the attempt ceiling
//!
//! # Design Decisions
//! - Non-transient errors are returned on first occurrence, untouched
//! - On exhaustion the error of the final attempt is returned, not an earlier one
//! - Backoff suspends only the calling task
//! - No per-attempt timeout: a hung operation is not bounded here

use std::future::Future;
use std::time::Duration;

use crate::config::schema::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::classify::Classify;

/// Default number of attempts (the first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Retry parameters for a single wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first try included. Zero is treated as one.
    pub max_attempts: u32,
    /// Backoff unit; the wait after attempt `n` is `base_delay_ms * n`.
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
        }
    }

    /// Same backoff unit, different attempt ceiling.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }

    /// Delay before the retry that follows failed attempt `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms)
    }

    fn attempt_ceiling(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY_MS)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay_ms)
    }
}

/// Run `operation` under `policy`.
///
/// After every transient failure that leaves budget, `on_transient` is awaited
/// with the failed attempt number, then the task sleeps for the policy's
/// backoff before trying again.
pub async fn run_with_retry<T, E, Op, Fut, Hook, HookFut>(
    policy: RetryPolicy,
    mut operation: Op,
    mut on_transient: Hook,
) -> Result<T, E>
where
    E: Classify,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Hook: FnMut(u32) -> HookFut,
    HookFut: Future<Output = ()>,
{
    let max_attempts = policy.attempt_ceiling();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Database operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if attempt < max_attempts && error.is_transient() {
                    let delay = policy.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay = ?delay,
                        code = error.code().unwrap_or("-"),
                        error = error.message(),
                        "Prepared statement error, retrying"
                    );
                    metrics::record_retry();

                    on_transient(attempt).await;
                    tokio::time::sleep(delay).await;
                    continue;
                }

                if error.is_transient() {
                    tracing::error!(
                        attempts = attempt,
                        error = error.message(),
                        "Retries exhausted"
                    );
                }
                return Err(error);
            }
        }
    }
}
