//! Exponential backoff around any fallible async operation.
//!
//! The engine is oblivious to what the operation does; it asks the error's
//! [`Classify`] impl whether another attempt makes sense. No jitter is added,
//! so the delay sequence is fully determined by [`RetryConfig`].

use crate::feed::classify::{should_retry, Classify};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// Backoff settings for [`retry_with_backoff`].
///
/// With the defaults an operation is attempted three times, sleeping 1s and
/// then 2s between attempts. Delays never exceed `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay that follows `current`: `min(current * multiplier, max_delay)`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let multiplier = if self.backoff_multiplier.is_finite() && self.backoff_multiplier > 0.0 {
            self.backoff_multiplier
        } else {
            1.0
        };
        let scaled_ms = current.as_millis() as f64 * multiplier;
        Duration::from_millis(scaled_ms as u64).min(self.max_delay())
    }
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of attempts.
///
/// After each failure the error is classified: permanent errors are returned
/// immediately, otherwise the engine sleeps for the current delay and grows it
/// by `backoff_multiplier` (capped at `max_delay_ms`). When attempts are
/// exhausted the last error is returned unchanged.
///
/// `context` labels the log lines, typically the URL being fetched.
///
/// # Example
///
/// ```ignore
/// let bytes = retry_with_backoff(|| download(&client, url), &config, url).await?;
/// ```
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    config: &RetryConfig,
    context: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay();
    let mut attempt = 1;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(context = %context, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let classified = err.classify();

        if !should_retry(&classified) {
            tracing::info!(
                context = %context,
                attempt,
                error = %classified,
                "Permanent error, not retrying"
            );
            return Err(err);
        }

        if attempt >= max_attempts {
            tracing::warn!(
                context = %context,
                attempts = max_attempts,
                error = %classified,
                "All attempts failed"
            );
            return Err(err);
        }

        tracing::warn!(
            context = %context,
            attempt,
            max_attempts,
            kind = %classified.kind,
            error = %classified,
            delay_ms = delay.as_millis() as u64,
            "Attempt failed, retrying after delay"
        );

        tokio::time::sleep(delay).await;
        delay = config.next_delay(delay);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::classify::{classify, ClassifiedError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    /// Paused-clock sleeps land on millisecond ticks, so allow a tick of slack.
    fn assert_elapsed(start: Instant, expected_ms: u64) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(expected_ms)
                && elapsed < Duration::from_millis(expected_ms + 50),
            "expected ~{expected_ms}ms, got {elapsed:?}"
        );
    }

    fn server_error() -> ClassifiedError {
        classify("upstream", Some(503))
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay(), Duration::from_millis(1000));
        assert_eq!(config.max_delay(), Duration::from_millis(10_000));
        assert_eq!(config.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_next_delay_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(config.next_delay(Duration::from_secs(4)), Duration::from_secs(8));
        assert_eq!(config.next_delay(Duration::from_secs(8)), Duration::from_secs(10));
        assert_eq!(config.next_delay(Duration::from_secs(10)), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::default();
        let start = Instant::now();

        let counter = calls.clone();
        let result = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(server_error())
                    } else {
                        Ok(n)
                    }
                }
            },
            &config,
            "test",
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms after the first failure, 2000ms after the second
        assert_elapsed(start, 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = calls.clone();
        let result: Result<(), _> = retry_with_backoff(
            || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(classify("not found", Some(404))) }
            },
            &RetryConfig::default(),
            "test",
        )
        .await;

        assert_eq!(result.unwrap_err().status_code, Some(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = calls.clone();
        let result: Result<(), _> = retry_with_backoff(
            || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(classify(&format!("mystery failure #{n}"), None)) }
            },
            &RetryConfig::default(),
            "test",
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.message, "mystery failure #3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_elapsed(start, 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_sequence_respects_cap() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 4000,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        };
        let start = Instant::now();

        let result: Result<(), _> =
            retry_with_backoff(|| async { Err(server_error()) }, &config, "test").await;

        assert!(result.is_err());
        // 4000 + 5000 + 5000 + 5000
        assert_elapsed(start, 19_000);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        let result: Result<u8, ClassifiedError> =
            retry_with_backoff(|| async { Ok(7) }, &config, "test").await;
        assert_eq!(result.unwrap(), 7);
    }
}
