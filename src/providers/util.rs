use crate::core::FetchError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Attempt count and fixed backoff for [`with_retry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Retries a fetch with a fixed backoff between attempts
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `policy`: Total number of runs (at least one) and the sleep between them
///
/// # Returns
/// The first successful result, or `RetriesExhausted` wrapping the last
/// error once every attempt failed. Errors that are not retryable are
/// returned as-is.
pub async fn with_retry<F, Fut, T>(mut operation: F, policy: RetryPolicy) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, max_attempts, err
                );
                attempt += 1;
                tokio::time::sleep(policy.backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_single_call_on_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FetchError>(42)
            },
            instant_policy(3),
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(FetchError::provider("timeout"))
                } else {
                    Ok(n)
                }
            },
            instant_policy(3),
        )
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::NoData)
            },
            instant_policy(3),
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            result,
            Err(FetchError::RetriesExhausted {
                attempts: 3,
                last: Box::new(FetchError::NoData),
            })
        );
    }

    #[tokio::test]
    async fn test_storage_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Storage {
                    detail: "disk full".to_string(),
                })
            },
            instant_policy(3),
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().kind(), "Storage");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_between_attempts() {
        let start = tokio::time::Instant::now();
        let _: Result<(), _> = with_retry(
            || async { Err(FetchError::NoData) },
            RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_secs(1),
            },
        )
        .await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
