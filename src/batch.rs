//! Bounded-concurrency batch fetch
//!
//! Fans a list of keys out to an async operation with at most `concurrency`
//! in flight, and fans results back in positionally. A batch never fails as a
//! whole: per-key failures are recorded alongside the successes.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::client::{ClientError, ClientResult};

/// Default number of in-flight operations for a batch.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// One failed key within a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the key in the input list
    pub index: usize,
    /// The key that failed
    pub key: String,
    /// The failure
    pub error: ClientError,
}

/// Outcome of a batch fetch.
///
/// `results` is positionally aligned with the input keys; a `None` slot means
/// the corresponding key failed and has an entry in `failures`.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Per-key results in input order
    pub results: Vec<Option<T>>,
    /// Keys that failed, with their errors
    pub failures: Vec<BatchFailure>,
}

impl<T> BatchOutcome<T> {
    /// Iterate over the successful results in input order.
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.results.iter().flatten()
    }

    /// Whether every key succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run `op` for every key with at most `concurrency` in flight.
///
/// Each key runs as its own task; a concurrency of zero is treated as one.
pub async fn fetch_all<T, F, Fut>(
    keys: Vec<String>,
    concurrency: usize,
    op: F,
) -> BatchOutcome<T>
where
    T: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ClientResult<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let op = Arc::new(op);

    let mut handles = Vec::with_capacity(keys.len());
    for (index, key) in keys.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let op = Arc::clone(&op);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Err(ClientError::Cancelled),
            };
            op(task_key).await
        });
        handles.push((index, key, handle));
    }

    let mut results: Vec<Option<T>> = Vec::with_capacity(handles.len());
    results.resize_with(handles.len(), || None);
    let mut failures = Vec::new();

    for (index, key, handle) in handles {
        match handle.await {
            Ok(Ok(value)) => results[index] = Some(value),
            Ok(Err(error)) => {
                warn!(key = %key, index, error = %error, "batch key failed");
                failures.push(BatchFailure { index, key, error });
            }
            Err(join_error) => {
                warn!(key = %key, index, error = %join_error, "batch task aborted");
                failures.push(BatchFailure {
                    index,
                    key,
                    error: ClientError::Network(format!("task aborted: {join_error}")),
                });
            }
        }
    }

    BatchOutcome { results, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_are_positionally_aligned() {
        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let outcome = fetch_all(keys, 2, |key| async move {
            if key == "b" {
                Err(ClientError::Http("boom".to_string()))
            } else {
                Ok(format!("value-{key}"))
            }
        })
        .await;

        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results[0].as_deref(), Some("value-a"));
        assert!(outcome.results[1].is_none());
        assert_eq!(outcome.results[2].as_deref(), Some("value-c"));

        assert!(!outcome.is_complete());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].key, "b");
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let keys: Vec<String> = (0..20).map(|i| format!("k{i}")).collect();
        let in_flight_op = Arc::clone(&in_flight);
        let peak_op = Arc::clone(&peak);

        let outcome = fetch_all(keys, 3, move |_key| {
            let in_flight = Arc::clone(&in_flight_op);
            let peak = Arc::clone(&peak_op);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(outcome.is_complete());
        assert!(
            peak.load(Ordering::SeqCst) <= 3,
            "peak concurrency {} exceeded limit",
            peak.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_failure_variants_survive_into_the_outcome() {
        let keys = vec!["a".to_string(), "b".to_string()];

        let outcome: BatchOutcome<()> = fetch_all(keys, 2, |key| async move {
            if key == "a" {
                Err(ClientError::Cancelled)
            } else {
                Err(ClientError::Http("500".to_string()))
            }
        })
        .await;

        // Callers distinguish cancellation from upstream failure by variant.
        assert!(outcome
            .failures
            .iter()
            .any(|f| f.key == "a" && matches!(f.error, ClientError::Cancelled)));
        assert!(outcome
            .failures
            .iter()
            .any(|f| f.key == "b" && matches!(f.error, ClientError::Http(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_completes_immediately() {
        let outcome: BatchOutcome<String> =
            fetch_all(Vec::new(), DEFAULT_CONCURRENCY, |_key| async {
                Ok(String::new())
            })
            .await;

        assert!(outcome.results.is_empty());
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped_to_one() {
        let keys = vec!["a".to_string(), "b".to_string()];
        let outcome = fetch_all(keys, 0, |key| async move { Ok(key) }).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.successes().count(), 2);
    }
}
