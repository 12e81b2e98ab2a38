use std::time::Duration;

use super::LlmError;

/// Total attempts per generation call (one initial call plus two retries).
pub const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Result of a single upstream attempt. The retry loop is driven by this value.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// 5xx, 429, transport failure or missing API key.
    Retryable(LlmError),
    /// Any other non-success status. Returned to the caller without waiting.
    Terminal(LlmError),
}

/// Exponential backoff without jitter or cap: `base_delay * 2^attempt_index`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt `attempt_index` (0-based).
    pub fn delay_after(&self, attempt_index: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt_index))
    }

    pub fn has_attempts_left(&self, attempt_index: u32) -> bool {
        attempt_index + 1 < self.max_attempts
    }
}
