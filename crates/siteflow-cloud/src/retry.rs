//! Bounded retry with exponential backoff and per-attempt timeouts

use crate::error::{CloudError, Result};
use crate::provider::RetryConfig;
use std::future::Future;
use std::time::Duration;

/// Run `op` until it succeeds, fails with a non-retryable error, or the retry
/// budget is spent.
///
/// Each attempt is bounded by `timeout`. An attempt that times out is dropped,
/// which abandons the in-flight request; its outcome is never trusted, the
/// caller re-observes remote state instead.
pub async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    timeout: Duration,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(CloudError::Timeout(format!(
                "{} did not finish within {:?}",
                label, timeout
            ))),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation = label, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = retry.delay_for(attempt);
                tracing::warn!(
                    operation = label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_retryable() => {
                return Err(CloudError::RetryExhausted {
                    operation: label.to_string(),
                    attempts: attempt,
                    last_error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry(&fast_retry(3), Duration::from_secs(1), "op", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(CloudError::Transient("SlowDown".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = with_retry(&fast_retry(3), Duration::from_secs(1), "op", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CloudError::Transient("throttled".into()))
            }
        })
        .await;

        match result {
            Err(CloudError::RetryExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = with_retry(&fast_retry(5), Duration::from_secs(1), "op", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CloudError::BucketNameConflict("taken".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(CloudError::BucketNameConflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transient() {
        let result: Result<()> =
            with_retry(&fast_retry(2), Duration::from_millis(50), "slow-op", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        match result {
            Err(CloudError::RetryExhausted {
                operation,
                attempts,
                last_error,
            }) => {
                assert_eq!(operation, "slow-op");
                assert_eq!(attempts, 2);
                assert!(last_error.contains("did not finish"));
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }
}
