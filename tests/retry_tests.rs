//! # Retry Tests
//!
//! Verifies the retry executor's counting contract: a function failing N
//! times then succeeding returns success after exactly N+1 calls when
//! N <= max_retries, and the last error after exactly max_retries+1 calls
//! otherwise.

use secrets_safe::retry::{retry, retry_exponential, retry_fixed, Strategy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn failing_then_ok(failures: u32) -> (Arc<AtomicU32>, impl FnMut() -> futures::future::Ready<Result<(), String>>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let f = move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            futures::future::ready(Err(format!("failure {n}")))
        } else {
            futures::future::ready(Ok(()))
        }
    };
    (calls, f)
}

fn quick_strategy(max_retries: u32) -> Strategy {
    Strategy {
        max_retries,
        delay: Duration::from_millis(10),
        exponential: false,
        max_duration: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_failing_twice_then_succeeding_returns_ok_after_three_calls() {
    let (calls, f) = failing_then_ok(2);
    let result = retry("scenario-c", f, quick_strategy(3), &CancellationToken::new()).await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_success_on_first_attempt_calls_exactly_once() {
    let (calls, f) = failing_then_ok(0);
    let result = retry("once", f, quick_strategy(5), &CancellationToken::new()).await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exhaustion_returns_last_error_after_max_plus_one_calls() {
    let (calls, f) = failing_then_ok(10);
    let result = retry("exhaust", f, quick_strategy(2), &CancellationToken::new()).await;
    assert_eq!(result.unwrap_err(), "failure 2");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failures_equal_to_max_retries_still_succeed() {
    let (calls, f) = failing_then_ok(3);
    let result = retry("edge", f, quick_strategy(3), &CancellationToken::new()).await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_fixed_wrapper_uses_documented_defaults() {
    let (calls, f) = failing_then_ok(100);
    // Default is 5 retries with a 1 s fixed delay; pause tokio time so the
    // test does not sleep for real.
    tokio::time::pause();
    let result = retry_fixed("fixed-defaults", f, &CancellationToken::new()).await;
    assert_eq!(result.unwrap_err(), "failure 5");
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_exponential_wrapper_survives_exhaustion() {
    let (calls, f) = failing_then_ok(100);
    tokio::time::pause();
    let result = retry_exponential("exp-defaults", f, &CancellationToken::new()).await;
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_cancellation_short_circuits_the_wait() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let (calls, f) = failing_then_ok(100);
    let started = std::time::Instant::now();
    let result = retry(
        "cancelled",
        f,
        Strategy {
            max_retries: 5,
            delay: Duration::from_secs(60),
            exponential: false,
            max_duration: Duration::ZERO,
        },
        &cancel,
    )
    .await;
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}
