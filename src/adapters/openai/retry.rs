//! Retry policy with exponential backoff for remote API requests.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// A failed remote call, classified for retry decisions.
///
/// Transient: 429, 5xx, and transport errors. Permanent: everything else
/// (bad request, bad credentials, malformed response).
#[derive(Debug)]
pub struct RequestFailure {
    pub message: String,
    pub transient: bool,
}

impl RequestFailure {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let message = format!("{}: {}", status, body);
        if status.as_u16() == 429 || status.is_server_error() {
            Self::transient(message)
        } else {
            Self::permanent(message)
        }
    }
}

/// Retry policy with exponential backoff.
///
/// Backoff doubles per attempt and is capped at `max_backoff_ms`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Execute an operation, retrying transient failures.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, RequestFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestFailure>>,
    {
        let mut attempt = 0;
        let mut backoff_ms = self.initial_backoff_ms;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) if failure.transient && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        backoff_ms,
                        error = %failure.message,
                        "transient remote failure, retrying"
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms * 2).min(self.max_backoff_ms);
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let policy = RetryPolicy::new(3, 1, 10);
        let result: Result<u32, _> = policy.execute(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let policy = RetryPolicy::new(3, 1, 10);
        let calls = AtomicU32::new(0);
        let result = policy
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RequestFailure::transient("503"))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let policy = RetryPolicy::new(3, 1, 10);
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RequestFailure::permanent("401")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let policy = RetryPolicy::new(2, 1, 10);
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RequestFailure::transient("500")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_status_classification() {
        let too_many = RequestFailure::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(too_many.transient);
        let server = RequestFailure::from_status(reqwest::StatusCode::BAD_GATEWAY, String::new());
        assert!(server.transient);
        let unauthorized = RequestFailure::from_status(reqwest::StatusCode::UNAUTHORIZED, String::new());
        assert!(!unauthorized.transient);
    }
}
