//! Authenticated API transport
//!
//! [`ApiClient`] talks to three upstream endpoint classes, each gated by its
//! own token bucket(s) from an injected [`LimiterPool`]:
//!
//! - the reference-data GraphQL endpoint (low rate, static data)
//! - the series-state GraphQL endpoint (high global rate, plus a per-series
//!   bucket; a request must hold tokens from **both** before transmitting)
//! - the plain file-download endpoint (moderate rate)
//!
//! Every request attaches the `x-api-key` credential header, and every public
//! operation is wrapped by the bounded retry policy.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod central;
pub mod config;
pub mod rate_limit;
pub mod retry;
pub mod series_state;

pub use rate_limit::{LimiterPool, TokenBucket};

use crate::cache::Cache;
use crate::shutdown::{SharedShutdown, ShutdownCoordinator};

/// Client errors (all ingestion failure classes).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Non-success HTTP response
    #[error("HTTP error: {0}")]
    Http(String),

    /// Transport-level failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(String),

    /// API-level error reported inside a successful response
    #[error("API error: {0}")]
    Api(String),

    /// Response failed to decode
    #[error("parse error: {0}")]
    Parse(String),

    /// The cancellation signal fired during a wait
    #[error("operation cancelled")]
    Cancelled,

    /// All retry attempts failed; wraps the last underlying failure
    #[error("max attempts exceeded: {0}")]
    RetryExhausted(#[source] Box<ClientError>),

    /// A required bulk artifact is missing or not ready
    #[error("file not available: {0}")]
    FileUnavailable(String),

    /// Archive could not be opened or read
    #[error("archive error: {0}")]
    Archive(String),

    /// A scanned line exceeded the hard buffer cap
    #[error("line exceeds maximum size: {size} > {max}")]
    LineTooLong {
        /// Observed (partial) line size in bytes
        size: usize,
        /// Configured hard cap in bytes
        max: usize,
    },
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Endpoint URLs for the three upstream classes. Overridable for tests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Reference-data GraphQL URL
    pub central_data_url: String,
    /// Series-state GraphQL URL
    pub series_state_url: String,
    /// File-download base URL
    pub file_download_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            central_data_url: config::CENTRAL_DATA_URL.to_string(),
            series_state_url: config::SERIES_STATE_URL.to_string(),
            file_download_url: config::FILE_DOWNLOAD_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Authenticated, rate-limited client for the match-data API.
pub struct ApiClient {
    http: reqwest::Client,
    api_key: String,
    config: ClientConfig,
    limiters: LimiterPool,
    cache: Option<Arc<dyn Cache>>,
    shutdown: SharedShutdown,
}

impl ApiClient {
    /// Create a client with default endpoints, no cache and a fresh shutdown
    /// coordinator.
    pub fn new(api_key: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config::HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config::HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Network(format!("build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            config: ClientConfig::default(),
            limiters: LimiterPool::new(),
            cache: None,
            shutdown: ShutdownCoordinator::shared(),
        })
    }

    /// Override endpoint URLs.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a cache collaborator. Without one, caching is disabled.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a shared cancellation signal.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// The cancellation signal this client observes.
    pub fn shutdown(&self) -> &SharedShutdown {
        &self.shutdown
    }

    /// The limiter pool gating this client's endpoints.
    pub fn limiters(&self) -> &LimiterPool {
        &self.limiters
    }

    /// The endpoint configuration in effect.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a GraphQL query against the reference-data endpoint.
    pub(crate) async fn run_central_query<T>(
        &self,
        query: &str,
        variables: Value,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.limiters.central_data().acquire(&self.shutdown).await?;
        self.post_graphql(&self.config.central_data_url, query, variables)
            .await
    }

    /// Execute a GraphQL query against the series-state endpoint.
    ///
    /// Acquires the global series-state token and the per-series token before
    /// transmitting.
    pub(crate) async fn run_series_state_query<T>(
        &self,
        series_id: &str,
        query: &str,
        variables: Value,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.limiters.series_state().acquire(&self.shutdown).await?;
        self.limiters
            .series_limiter(series_id)
            .acquire(&self.shutdown)
            .await?;
        self.post_graphql(&self.config.series_state_url, query, variables)
            .await
    }

    async fn post_graphql<T>(&self, url: &str, query: &str, variables: Value) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        debug!(url, "issuing GraphQL request");

        let response = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http(format!("{status}: {body}")));
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("decode GraphQL response: {e}")))?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> =
                envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(ClientError::Api(messages.join("; ")));
        }

        envelope
            .data
            .ok_or_else(|| ClientError::Api("response carried no data".to_string()))
    }

    /// Fetch raw bytes from the file-download endpoint, gated by its limiter.
    pub(crate) async fn fetch_file_url(&self, url: &str) -> ClientResult<Bytes> {
        self.limiters
            .file_download()
            .acquire(&self.shutdown)
            .await?;

        debug!(url, "downloading file");

        let response = self
            .http
            .get(url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http(format!("download failed: {status}")));
        }

        response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(format!("read body: {e}")))
    }

    /// Cache-aside read: any cache or decode failure is treated as a miss.
    pub(crate) async fn get_cached<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    debug!(key, error = %e, "cached entry failed to decode, treating as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, falling through");
                None
            }
        }
    }

    /// Cache-aside write: best-effort, failures are swallowed.
    pub(crate) async fn set_cache<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize,
    {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "cache serialization failed, skipping write");
                return;
            }
        };
        if let Err(e) = cache.set(key, bytes, ttl).await {
            warn!(key, error = %e, "cache write failed");
        }
    }
}
