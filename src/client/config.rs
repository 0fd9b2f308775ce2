//! Client configuration constants

use std::time::Duration;

/// Reference-data GraphQL endpoint (tournaments, teams, series listings).
pub const CENTRAL_DATA_URL: &str = "https://api-op.grid.gg/central-data/graphql";

/// Live-state GraphQL endpoint (per-series match state).
pub const SERIES_STATE_URL: &str = "https://api-op.grid.gg/live-data-feed/series-state/graphql";

/// Plain HTTP base for bulk file listings and downloads.
pub const FILE_DOWNLOAD_URL: &str = "https://api.grid.gg";

/// Reference-data endpoint budget. The upstream allows tens of requests per
/// minute for relatively static data.
pub const CENTRAL_DATA_RATE_PER_MINUTE: u32 = 40;

/// Global series-state endpoint budget, shared across all series.
pub const SERIES_STATE_RATE_PER_MINUTE: u32 = 1200;

/// Burst capacity for the global series-state bucket.
pub const SERIES_STATE_BURST: u32 = 10;

/// Per-series budget on the series-state endpoint; each series gets its own
/// lazily-created bucket on top of the global one.
pub const PER_SERIES_RATE_PER_MINUTE: u32 = 75;

/// File-download endpoint budget.
pub const FILE_DOWNLOAD_RATE_PER_MINUTE: u32 = 20;

/// Maximum attempts for any single API operation.
/// 3 attempts with exponential backoff recovers from transient failures
/// without stalling a batch for long on persistent ones.
pub const MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// HTTP connect timeout (seconds) - time to establish TCP connection
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout (seconds) - overall time for the entire request
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Cache TTL for game titles.
pub const TITLES_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache TTL for tournament listings.
pub const TOURNAMENTS_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache TTL for team lookups.
pub const TEAMS_CACHE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Cache TTL for per-team series listings.
pub const SERIES_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Cache TTL for series state.
pub const SERIES_STATE_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache TTL for decoded bulk event downloads.
pub const EVENTS_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache TTL for end-of-series state files.
pub const END_STATE_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Calculate exponential backoff delay for a 0-indexed attempt.
///
/// Saturates rather than overflowing for large attempt counts; the cap makes
/// the exact value irrelevant well before then.
pub fn calculate_backoff(attempt: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt.min(63)));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}
