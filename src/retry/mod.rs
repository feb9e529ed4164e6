//! # Retry
//!
//! Generic retry-with-backoff executor used by every component that talks to
//! a remote dependency: identity-provider connectivity, root key Secret
//! persistence, and any other operation whose failure is plausibly transient.
//!
//! Retries block only their own task for the backoff duration; call-sites run
//! in dedicated background tasks, never inside a latency-sensitive request
//! path. A [`CancellationToken`] aborts a pending wait on shutdown instead of
//! sleeping out the full strategy.

use crate::constants;
use crate::observability::metrics;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Configuration for the backoff behavior of a retried operation
///
/// Constructed per call-site and immutable afterwards. Zero values take the
/// documented defaults at execution time.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    /// Maximum number of retries before giving up (inclusive); default 5
    pub max_retries: u32,
    /// Delay between retries; with `exponential` set this is the jitter
    /// bound instead. Default 1000 ms
    pub delay: Duration,
    /// Whether the delay grows exponentially with each attempt
    pub exponential: bool,
    /// Cap on any single wait; default 10 s when exponential
    pub max_duration: Duration,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            max_retries: constants::DEFAULT_RETRY_MAX_RETRIES,
            delay: Duration::from_millis(constants::DEFAULT_RETRY_DELAY_MS),
            exponential: false,
            max_duration: Duration::from_millis(constants::DEFAULT_RETRY_MAX_DURATION_MS),
        }
    }
}

impl Strategy {
    /// Apply defaults to zero-valued fields
    fn with_defaults(mut self) -> Self {
        if self.max_retries == 0 {
            self.max_retries = constants::DEFAULT_RETRY_MAX_RETRIES;
        }
        if self.delay.is_zero() {
            self.delay = Duration::from_millis(constants::DEFAULT_RETRY_DELAY_MS);
        }
        if self.exponential && self.max_duration.is_zero() {
            self.max_duration = Duration::from_millis(constants::DEFAULT_RETRY_MAX_DURATION_MS);
        }
        self
    }

    /// The wait before the next attempt, given the 0-indexed attempt that
    /// just failed
    fn backoff(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.delay;
        }

        // 2^attempt seconds, plus randomness to avoid the thundering herd
        // problem, capped at max_duration.
        let base = Duration::from_secs(1u64 << attempt.min(32));
        let jitter_bound = self.delay.as_millis() as u64;
        let jitter = if jitter_bound == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_bound))
        };

        (base + jitter).min(self.max_duration)
    }
}

/// Invoke `f` up to `strategy.max_retries + 1` times
///
/// Returns the first success immediately. After a failed attempt the task
/// sleeps for the strategy's backoff before trying again; after the final
/// failed attempt that attempt's error is returned — the error always
/// reaches the caller, it is never swallowed here.
///
/// Cancelling `cancel` while a backoff wait is pending returns the last
/// observed error without waiting out the strategy.
pub async fn retry<F, Fut, T, E>(
    scope: &str,
    mut f: F,
    strategy: Strategy,
    cancel: &CancellationToken,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let strategy = strategy.with_defaults();
    let mut last_err: Option<E> = None;

    for attempt in 0..=strategy.max_retries {
        metrics::increment_retry_attempt(scope);
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }

        // No wait after the final attempt; its error goes straight back.
        if attempt == strategy.max_retries {
            break;
        }

        let wait = strategy.backoff(attempt);
        let next_attempt_at =
            chrono::Utc::now() + chrono::Duration::from_std(wait).unwrap_or_else(|_| chrono::Duration::zero());
        info!(
            "Retrying after {} ms for the scope '{}' -- attempt {} of {} (next attempt: {})",
            wait.as_millis(),
            scope,
            attempt + 1,
            strategy.max_retries + 1,
            next_attempt_at.to_rfc3339(),
        );

        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = cancel.cancelled() => {
                warn!("Retry for scope '{}' cancelled during backoff", scope);
                return Err(last_err.expect("at least one attempt has failed"));
            }
        }
    }

    Err(last_err.expect("at least one attempt has failed"))
}

/// Retry with exponential backoff and the documented defaults
/// (5 retries, 1000 ms jitter bound, 10 s cap)
pub async fn retry_exponential<F, Fut, T, E>(
    scope: &str,
    f: F,
    cancel: &CancellationToken,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry(
        scope,
        f,
        Strategy {
            exponential: true,
            ..Strategy::default()
        },
        cancel,
    )
    .await
}

/// Retry with a fixed delay and the documented defaults (5 retries, 1000 ms)
pub async fn retry_fixed<F, Fut, T, E>(
    scope: &str,
    f: F,
    cancel: &CancellationToken,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry(scope, f, Strategy::default(), cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_retries: u32) -> Strategy {
        Strategy {
            max_retries,
            delay: Duration::from_millis(1),
            exponential: false,
            max_duration: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retrying() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(
            "test",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            },
            quick(3),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(
            "test",
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(())
                    }
                }
            },
            quick(3),
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error_after_max_plus_one_calls() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(
            "test",
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {n}")) }
            },
            quick(2),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_backoff_wait() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = std::time::Instant::now();
        let result: Result<(), String> = retry(
            "test",
            || async { Err("always".to_string()) },
            Strategy {
                max_retries: 3,
                delay: Duration::from_secs(30),
                exponential: false,
                max_duration: Duration::ZERO,
            },
            &cancel,
        )
        .await;
        assert_eq!(result.unwrap_err(), "always");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn zero_values_take_defaults() {
        let s = Strategy {
            max_retries: 0,
            delay: Duration::ZERO,
            exponential: true,
            max_duration: Duration::ZERO,
        }
        .with_defaults();
        assert_eq!(s.max_retries, 5);
        assert_eq!(s.delay, Duration::from_millis(1000));
        assert_eq!(s.max_duration, Duration::from_secs(10));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let s = Strategy {
            max_retries: 10,
            delay: Duration::from_millis(1),
            exponential: true,
            max_duration: Duration::from_secs(4),
        };
        assert!(s.backoff(0) >= Duration::from_secs(1));
        assert_eq!(s.backoff(9), Duration::from_secs(4));
    }
}
