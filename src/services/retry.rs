//! Retry with exponential backoff.
//!
//! The engine never loops on its own. Callers that want to resubmit after a
//! `Conflict` wrap the whole reload-and-retry operation in
//! `RetryPolicy::retry_on_conflict`. The notification deriver uses
//! `retry_on_storage` for transient repository failures.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::{DomainResult, ErrorKind};
use crate::domain::models::RetryConfig;

/// Exponential backoff: `initial_backoff_ms * 2^attempt`, capped at
/// `max_backoff_ms`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Resubmissions allowed after the first attempt
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 25, 1000)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_conflict_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
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

    /// Run `operation`, re-running it while it fails with a conflict and
    /// retries remain. Every other error is returned immediately.
    pub async fn retry_on_conflict<F, Fut, T>(&self, operation: F) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        self.retry_on(ErrorKind::Conflict, operation).await
    }

    /// Same as [`retry_on_conflict`](Self::retry_on_conflict) for storage
    /// failures.
    pub async fn retry_on_storage<F, Fut, T>(&self, operation: F) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        self.retry_on(ErrorKind::Storage, operation).await
    }

    async fn retry_on<F, Fut, T>(&self, retriable: ErrorKind, mut operation: F) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempt, kind = ?retriable, "operation succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(err) if err.kind() == retriable && attempt < self.max_retries => {
                    let backoff = self.calculate_backoff(attempt);
                    warn!(attempt = attempt + 1, ?backoff, error = %err, "retrying");
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    fn conflict() -> DomainError {
        DomainError::Conflict {
            task_id: Uuid::nil(),
            expected_version: 1,
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(5, 10, 100);
        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(10));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(20));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(80));
        assert_eq!(policy.calculate_backoff(4), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(40), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_retries_conflicts_until_success() {
        let policy = RetryPolicy::new(3, 1, 2);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = policy
            .retry_on_conflict(|| async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(conflict())
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let policy = RetryPolicy::new(2, 1, 1);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: DomainResult<()> = policy
            .retry_on_conflict(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_storage_errors_retried_separately() {
        let policy = RetryPolicy::new(2, 1, 1);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = policy
            .retry_on_storage(|| async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DomainError::Storage("database is locked".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);

        let conflicts: DomainResult<()> = policy.retry_on_storage(|| async { Err(conflict()) }).await;
        assert_eq!(conflicts.unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: DomainResult<()> = policy
            .retry_on_conflict(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::validation("bad"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
