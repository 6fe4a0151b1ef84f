//! Retry policy for callback delivery.

use std::time::Duration;

/// Linear-backoff retry policy: after failed attempt `n`, wait `base_delay * n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Base delay between attempts
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after a failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Longest a full delivery can take when every attempt runs into
    /// `per_attempt` timeout: all attempts plus every backoff sleep.
    pub fn worst_case(&self, per_attempt: Duration) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .fold(per_attempt.saturating_mul(self.max_attempts), Duration::saturating_add)
    }

    /// Whether another attempt follows `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
