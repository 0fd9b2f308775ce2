//! Integration tests for rate limiting and cancellation

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use esports_data_ingest::client::{LimiterPool, TokenBucket};
use esports_data_ingest::ShutdownCoordinator;

#[tokio::test(start_paused = true)]
async fn test_bucket_enforces_configured_rate_under_load() {
    let shutdown = ShutdownCoordinator::new();
    let bucket = TokenBucket::per_minute(600, 1);

    // 600/min is one token every 100ms. Drain the burst token, then time ten
    // more acquisitions.
    bucket.acquire(&shutdown).await.unwrap();

    let start = Instant::now();
    for _ in 0..10 {
        bucket.acquire(&shutdown).await.unwrap();
    }
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(990),
        "ten acquisitions should take ~1s at 600/min, took {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waiters_all_complete() {
    let shutdown = Arc::new(ShutdownCoordinator::new());
    let bucket = Arc::new(TokenBucket::per_minute(600, 1));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let bucket = Arc::clone(&bucket);
        let shutdown = Arc::clone(&shutdown);
        handles.push(tokio::spawn(
            async move { bucket.acquire(&shutdown).await },
        ));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_pool_provides_separate_endpoint_buckets() {
    let pool = LimiterPool::new();
    let shutdown = ShutdownCoordinator::new();

    // Each endpoint class has its own burst token, so one immediate acquire
    // per class must succeed without waiting.
    pool.central_data().acquire(&shutdown).await.unwrap();
    pool.file_download().acquire(&shutdown).await.unwrap();
    pool.series_state().acquire(&shutdown).await.unwrap();
}

#[tokio::test]
async fn test_per_series_buckets_are_isolated() {
    let pool = LimiterPool::new();
    let shutdown = ShutdownCoordinator::new();

    // Draining one series' burst token must not affect another series.
    pool.series_limiter("series-a")
        .acquire(&shutdown)
        .await
        .unwrap();
    pool.series_limiter("series-b")
        .acquire(&shutdown)
        .await
        .unwrap();

    assert_eq!(pool.series_limiter_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_all_blocked_waiters() {
    let shutdown = Arc::new(ShutdownCoordinator::new());
    let bucket = Arc::new(TokenBucket::per_minute(1, 1));

    // Use up the only token.
    bucket.acquire(&shutdown).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let bucket = Arc::clone(&bucket);
        let shutdown = Arc::clone(&shutdown);
        handles.push(tokio::spawn(
            async move { bucket.acquire(&shutdown).await },
        ));
    }

    tokio::time::advance(Duration::from_millis(10)).await;
    shutdown.request_shutdown();

    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }
}
