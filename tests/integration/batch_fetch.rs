//! Integration tests for bounded-concurrency batch fetching

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use esports_data_ingest::{fetch_all, ClientError};

#[tokio::test]
async fn test_large_batch_with_scattered_failures() {
    let keys: Vec<String> = (0..50).map(|i| format!("series-{i}")).collect();

    let outcome = fetch_all(keys, 10, |key| async move {
        let index: usize = key.trim_start_matches("series-").parse().unwrap();
        if index % 7 == 0 {
            Err(ClientError::Http(format!("upstream rejected {key}")))
        } else {
            Ok(index)
        }
    })
    .await;

    assert_eq!(outcome.results.len(), 50);
    // 0, 7, 14, 21, 28, 35, 42, 49 fail.
    assert_eq!(outcome.failures.len(), 8);
    assert_eq!(outcome.successes().count(), 42);

    for failure in &outcome.failures {
        assert!(outcome.results[failure.index].is_none());
        assert_eq!(failure.key, format!("series-{}", failure.index));
    }
    for (index, result) in outcome.results.iter().enumerate() {
        if index % 7 != 0 {
            assert_eq!(*result, Some(index));
        }
    }
}

#[tokio::test]
async fn test_all_failures_still_returns_full_shape() {
    let keys: Vec<String> = (0..5).map(|i| format!("k{i}")).collect();

    let outcome = fetch_all(keys, 2, |_key| async {
        Err::<(), _>(ClientError::Network("unreachable".to_string()))
    })
    .await;

    assert_eq!(outcome.results.len(), 5);
    assert!(outcome.results.iter().all(Option::is_none));
    assert_eq!(outcome.failures.len(), 5);
    assert!(!outcome.is_complete());
}

#[tokio::test]
async fn test_work_overlaps_up_to_the_limit() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let keys: Vec<String> = (0..30).map(|i| format!("k{i}")).collect();
    let in_flight_op = Arc::clone(&in_flight);
    let peak_op = Arc::clone(&peak);

    let outcome = fetch_all(keys, 10, move |_key| {
        let in_flight = Arc::clone(&in_flight_op);
        let peak = Arc::clone(&peak_op);
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    })
    .await;

    assert!(outcome.is_complete());
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 10, "peak concurrency {peak} exceeded the limit");
    assert!(peak > 1, "batch ran sequentially");
}
