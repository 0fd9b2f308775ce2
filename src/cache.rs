//! Cache collaborator interface.
//!
//! The API client treats the cache as an optional, best-effort collaborator:
//! read errors fall through to the authoritative source and write errors are
//! swallowed. Implementations are responsible for honoring TTLs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Cache errors.
///
/// These never escape the client's cache-aside helpers; they exist so that
/// implementations can report failures for logging.
#[derive(Debug, thiserror::Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// Byte-oriented cache with per-entry TTL.
///
/// Implementations must be thread-safe by their own contract; the client does
/// not add any guarding of its own.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up a key. `Ok(None)` is a miss; expired entries are misses.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value under a key for at most `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

/// In-memory [`Cache`] implementation with TTL expiry.
///
/// Suitable for tests and single-process deployments; entries are dropped
/// lazily on read after their deadline passes.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

#[derive(Debug)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired but not yet evicted) entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
