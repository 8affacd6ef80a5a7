use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Longest Retry-After honoured; larger values are clamped.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// `backoff_base_secs * 2^attempt`, raised to the server's Retry-After.
fn retry_delay(err: &ScraperError, attempt: u32, backoff_base_secs: u64) -> Duration {
    let backoff = Duration::from_secs(backoff_base_secs.saturating_mul(1u64 << attempt.min(62)));
    let requested = err.retry_after().unwrap_or_default().min(MAX_RETRY_AFTER);
    backoff.max(requested)
}

/// Run `operation`, retrying [`ScraperError::is_retriable`] failures up to
/// `max_retries` extra times. See [`retry_delay`] for the wait.
///
/// Anything else is returned on first sight.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retriable() || attempt >= max_retries => return Err(err),
            Err(err) => err,
        };

        let delay = retry_delay(&err, attempt, backoff_base_secs);
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs = delay.as_secs(),
            error = %err,
            "transient listing fetch error, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
