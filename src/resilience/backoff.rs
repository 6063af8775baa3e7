//! Linear backoff.

use std::time::Duration;

/// Delay before the retry that follows failed attempt `attempt` (1-based).
///
/// Grows linearly: `base_ms * attempt`.
pub fn calculate_backoff(attempt: u32, base_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    Duration::from_millis(base_ms.saturating_mul(attempt as u64))
}

/// Total time spent waiting if attempts `1..failed_attempts` all back off.
pub fn cumulative_backoff(failed_attempts: u32, base_ms: u64) -> Duration {
    (1..=failed_attempts)
        .map(|attempt| calculate_backoff(attempt, base_ms))
        .sum()
}
