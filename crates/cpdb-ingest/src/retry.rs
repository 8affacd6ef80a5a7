//! Retry with exponential back-off and jitter for storage calls.

use std::future::Future;
use std::time::Duration;

use cpdb_db::DbError;

const MAX_DELAY: Duration = Duration::from_secs(30);

/// Per-run retry budget for [`CouponStore`](cpdb_db::CouponStore) calls.
///
/// Only errors for which [`DbError::is_transient`] holds are retried; anything
/// else is returned on the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Always at least 1.
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &cpdb_core::AppConfig) -> Self {
        Self::new(
            config.store_max_attempts,
            Duration::from_millis(config.store_backoff_base_ms),
        )
    }

    /// Sleep before retry number `attempt` (1-based).
    ///
    /// | Attempt | Delay                            |
    /// |---------|----------------------------------|
    /// | 1       | base × 2⁰ ± 25 % jitter          |
    /// | 2       | base × 2¹ ± 25 % jitter          |
    /// | 3       | base × 2² ± 25 % jitter          |
    ///
    /// The un-jittered delay is capped at 30 s.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let computed = self.backoff_base.saturating_mul(1u32 << exponent);
        computed
            .min(MAX_DELAY)
            .mul_f64(rand::random::<f64>() * 0.5 + 0.75)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the last [`DbError`] produced by `op`.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, DbError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbError>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient storage error; retrying after back-off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
