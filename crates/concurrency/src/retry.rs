//! Bounded retry with exponential backoff for busy/locked stores.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use trellis_core::{TrellisError, TrellisResult};

/// How often and how patiently a unit of work is retried on contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 10,
            max_backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based): doubles each
    /// time, capped at `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Run `work` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts. `work` receives the 1-based attempt number.
    pub fn run<T>(&self, mut work: impl FnMut(u32) -> TrellisResult<T>) -> TrellisResult<T> {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match work(attempt) {
                Ok(v) => return Ok(v),
                Err(TrellisError::Contention { message, .. }) => {
                    if attempt >= max {
                        return Err(TrellisError::Contention {
                            attempts: attempt,
                            message,
                        });
                    }
                    let delay = self.backoff(attempt);
                    warn!(attempt, max_attempts = max, delay_ms = delay.as_millis() as u64, %message, "store busy, retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
