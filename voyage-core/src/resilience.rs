use std::future::Future;
use std::time::Duration;

use crate::provider::ProviderError;

/// Timeout and retry budget applied to every external call.
///
/// Retries are capped at one regardless of configuration, so a failing
/// collaborator costs at most `2 * timeout + backoff` before the caller
/// switches to its deterministic fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl CallPolicy {
    pub const MAX_RETRIES: u32 = 1;

    pub fn new(timeout: Duration, max_retries: u32, backoff: Duration) -> Self {
        Self {
            timeout,
            max_retries: max_retries.min(Self::MAX_RETRIES),
            backoff,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Run `op` under the timeout, retrying once on a retryable failure
    pub async fn call<T, F, Fut>(&self, name: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.timeout.as_millis() as u64)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    attempt += 1;
                    tracing::warn!("{} failed ({}), retrying in {:?}", name, e, self.backoff);
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => {
                    tracing::debug!("{} gave up after {} attempt(s): {}", name, attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 1, Duration::from_millis(250))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_retries_once_then_gives_up() {
        let policy = CallPolicy::new(Duration::from_secs(1), 5, Duration::from_millis(10));
        assert_eq!(policy.max_retries, 1);

        let calls = Arc::new(AtomicUsize::new(0));
        let result: Result<(), _> = policy
            .call("flaky", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::Unavailable("down".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_attempt_can_succeed() {
        let policy = CallPolicy::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let result = policy
            .call("recovering", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ProviderError::Unavailable("cold start".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported() {
        let policy = CallPolicy::new(Duration::from_millis(100), 0, Duration::ZERO);
        let result: Result<(), _> = policy
            .call("slow", || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(ProviderError::Timeout(100)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_errors_are_not_retried() {
        let policy = CallPolicy::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let _: Result<(), _> = policy
            .call("quota", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::QuotaExceeded("daily limit".to_string()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
