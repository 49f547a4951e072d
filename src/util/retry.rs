//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::ParleyError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts run out.
    ///
    /// Only errors reporting [`ParleyError::is_retryable`] are retried;
    /// cancellation and protocol failures return immediately.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ParleyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ParleyError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if attempt >= attempts || !err.is_retryable() {
                return Err(err);
            }

            let delay = self.delay_for(attempt, &err);
            tracing::warn!(
                attempt,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "endpoint request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    ///
    /// A rate limit that names its own wait is honored, capped at
    /// `max_backoff`. Otherwise the exponential backoff is scaled by a
    /// random factor in `[0.75, 1.25)`.
    fn delay_for(&self, attempt: u32, err: &ParleyError) -> Duration {
        if let ParleyError::RateLimited {
            retry_after_ms: Some(ms),
        } = err
        {
            return Duration::from_millis(*ms).min(self.max_backoff);
        }
        let exponent = attempt.saturating_sub(1) as i32;
        let base = (self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent))
            .min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(base * (0.75 + jitter() * 0.5))
    }
}

/// Uniform-ish factor in `[0, 1)` drawn from a v4 uuid's random bits.
fn jitter() -> f64 {
    (uuid::Uuid::new_v4().as_u128() % 10_000) as f64 / 10_000.0
}
