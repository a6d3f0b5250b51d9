//! Retry policy for transient storage failures.
//!
//! An explicit policy object applied by the executor, so every
//! higher-level operation inherits the same behavior: exponential
//! backoff, a fixed attempt ceiling, and retry of transient errors
//! only. Constraint and usage errors surface on the first attempt.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Exponential backoff with a fixed attempt ceiling
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Lower bound on the backoff delay
    pub initial: Duration,
    /// Upper bound on the backoff delay
    pub cap: Duration,
    /// Seconds multiplier applied to the exponential term
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial: Duration::from_secs(1),
            cap: Duration::from_secs(10),
            multiplier: 1,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following attempt number `attempt`
    /// (1-based): `multiplier * 2^(attempt-1)` seconds, clamped to
    /// `[initial, cap]`. With the defaults: 1s, 2s, 4s, 8s.
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let raw = Duration::from_secs((self.multiplier as u64) << shift);
        raw.clamp(self.initial, self.cap)
    }

    /// Run `op`, retrying transient failures under the backoff
    /// schedule. Records elapsed wall-clock time; the last error is
    /// surfaced unchanged once attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => {
                    tracing::debug!(
                        label,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "operation succeeded"
                    );
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay(attempt);
                    tracing::warn!(
                        label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient storage error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        label,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %err,
                        "operation failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}
