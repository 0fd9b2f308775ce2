//! Token-bucket rate limiting
//!
//! One bucket exists per fixed endpoint class, plus one lazily-created bucket
//! per series for the series-state endpoint. All buckets are owned by a
//! [`LimiterPool`] that is injected into the client rather than held in
//! module-global state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::client::config::{
    CENTRAL_DATA_RATE_PER_MINUTE, FILE_DOWNLOAD_RATE_PER_MINUTE, PER_SERIES_RATE_PER_MINUTE,
    SERIES_STATE_BURST, SERIES_STATE_RATE_PER_MINUTE,
};
use crate::client::{ClientError, ClientResult};
use crate::shutdown::ShutdownCoordinator;

/// A token bucket refilling continuously at a fixed rate up to a burst cap.
///
/// Uses [`tokio::time::Instant`] so that paused-clock tests observe refill
/// without real waiting.
#[derive(Debug)]
pub struct TokenBucket {
    rate_per_sec: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket allowing `rate_per_minute` acquisitions per minute with
    /// the given burst capacity (clamped to at least 1).
    pub fn per_minute(rate_per_minute: u32, burst: u32) -> Self {
        let burst = burst.max(1) as f64;
        Self {
            rate_per_sec: f64::from(rate_per_minute) / 60.0,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Block until one token is available or cancellation fires.
    ///
    /// Returns [`ClientError::Cancelled`] instead of waiting indefinitely once
    /// shutdown has been requested.
    pub async fn acquire(&self, shutdown: &ShutdownCoordinator) -> ClientResult<()> {
        loop {
            if shutdown.is_shutdown_requested() {
                return Err(ClientError::Cancelled);
            }

            let wait = {
                let mut state = self.state.lock().expect("token bucket lock poisoned");
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.burst);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.rate_per_sec)
            };

            tokio::select! {
                _ = sleep(wait) => {}
                _ = shutdown.wait_for_shutdown() => return Err(ClientError::Cancelled),
            }
        }
    }

    /// Tokens currently available, after refill. Primarily for diagnostics.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock().expect("token bucket lock poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.burst);
        state.last_refill = now;
        state.tokens
    }
}

/// Owns the endpoint-class buckets and the dynamic per-series bucket map.
///
/// Exactly one bucket exists per distinct series for the lifetime of the
/// pool; creation is idempotent under concurrent callers via a read-then-write
/// double-checked pattern.
#[derive(Debug)]
pub struct LimiterPool {
    central_data: TokenBucket,
    series_state: TokenBucket,
    file_download: TokenBucket,
    per_series: RwLock<HashMap<String, Arc<TokenBucket>>>,
}

impl LimiterPool {
    /// Create a pool with the configured endpoint-class rates.
    pub fn new() -> Self {
        Self {
            central_data: TokenBucket::per_minute(CENTRAL_DATA_RATE_PER_MINUTE, 1),
            series_state: TokenBucket::per_minute(SERIES_STATE_RATE_PER_MINUTE, SERIES_STATE_BURST),
            file_download: TokenBucket::per_minute(FILE_DOWNLOAD_RATE_PER_MINUTE, 1),
            per_series: RwLock::new(HashMap::new()),
        }
    }

    /// Bucket gating the reference-data endpoint.
    pub fn central_data(&self) -> &TokenBucket {
        &self.central_data
    }

    /// Global bucket gating the series-state endpoint.
    pub fn series_state(&self) -> &TokenBucket {
        &self.series_state
    }

    /// Bucket gating the file-download endpoint.
    pub fn file_download(&self) -> &TokenBucket {
        &self.file_download
    }

    /// Get or lazily create the bucket for a specific series.
    ///
    /// The read lock covers the common hit path; on miss the write lock
    /// re-checks before inserting so concurrent first users share one bucket.
    pub fn series_limiter(&self, series_id: &str) -> Arc<TokenBucket> {
        {
            let limiters = self.per_series.read().expect("limiter map lock poisoned");
            if let Some(limiter) = limiters.get(series_id) {
                return Arc::clone(limiter);
            }
        }

        let mut limiters = self.per_series.write().expect("limiter map lock poisoned");
        if let Some(limiter) = limiters.get(series_id) {
            return Arc::clone(limiter);
        }

        let limiter = Arc::new(TokenBucket::per_minute(PER_SERIES_RATE_PER_MINUTE, 1));
        limiters.insert(series_id.to_string(), Arc::clone(&limiter));
        limiter
    }

    /// Number of per-series buckets allocated so far.
    pub fn series_limiter_count(&self) -> usize {
        self.per_series
            .read()
            .expect("limiter map lock poisoned")
            .len()
    }
}

impl Default for LimiterPool {
    fn default() -> Self {
        Self::new()
    }
}
