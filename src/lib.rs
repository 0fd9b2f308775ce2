//! # Esports Data Ingest Library
//!
//! A library for ingesting match data from a rate-limited esports data API and
//! its companion bulk file-download service, and for reconstructing a typed
//! stream of domain events from the generic actor/action/target wire format.
//!
//! ## Features
//!
//! - **Multi-Tier Rate Limiting**: Token buckets per endpoint class plus
//!   lazily-created per-series buckets
//! - **Retrying Transport**: Bounded exponential backoff around authenticated
//!   requests, cancellation-aware
//! - **Cache-Aside Reads**: Pluggable cache collaborator with TTL, fail-open
//! - **Bounded Batch Fetching**: Concurrent fan-out with order-preserving fan-in
//! - **Bulk Event Archives**: ZIP download, JSONL member scanning with a hard
//!   line-size cap, best-effort decoding
//! - **Event Reconstruction**: Classifies raw events into kills, objective
//!   captures, structure destructions, drafts, round outcomes, plants and
//!   defuses
//!
//! ## Quick Start
//!
//! ```no_run
//! use esports_data_ingest::{reconstruct, ApiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new("api-key")?;
//!
//! let download = client.download_events("series-123").await?;
//! let reconstruction = reconstruct(&download.envelopes);
//!
//! for event in &reconstruction.events {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - Authenticated transport with per-endpoint rate limiting and retry
//! - [`cache`] - Optional cache collaborator used on the read path
//! - [`batch`] - Bounded-concurrency batch fetch orchestration
//! - [`bulk`] - Bulk artifact retrieval, decompression and line scanning
//! - [`reconstruct`] - Generic-to-typed event reconstruction engine

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bounded-concurrency batch fetch orchestration
pub mod batch;
/// Bulk artifact retrieval and decompression
pub mod bulk;
/// Cache collaborator interface and in-memory implementation
pub mod cache;
/// Authenticated API transport
pub mod client;
/// Event reconstruction engine
pub mod reconstruct;
/// Cancellation signalling
pub mod shutdown;

pub use batch::{fetch_all, BatchFailure, BatchOutcome};
pub use bulk::EventDownload;
pub use cache::{Cache, CacheError, MemoryCache};
pub use client::{ApiClient, ClientConfig, ClientError, ClientResult};
pub use reconstruct::{reconstruct, Reconstruction, TypedDomainEvent};
pub use shutdown::{SharedShutdown, ShutdownCoordinator};

/// One line of the bulk JSONL feed: a timestamped, sequenced wrapper around
/// one or more raw events.
///
/// Envelopes must be consumed in arrival order; the reconstruction engine
/// does not re-sort them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Envelope identifier
    #[serde(default)]
    pub id: String,
    /// Correlation identifier shared across related envelopes
    #[serde(default)]
    pub correlation_id: String,
    /// Wall-clock timestamp at which the contained events occurred
    pub occurred_at: DateTime<Utc>,
    /// Series this envelope belongs to
    #[serde(default)]
    pub series_id: String,
    /// Monotonic sequence number within the series feed
    #[serde(default)]
    pub sequence_number: i64,
    /// Raw events delivered in this envelope, in order
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// A single generically-typed event within an [`EventEnvelope`].
///
/// The effective event type is the triple `(actor.type, action, target.type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Event identifier
    #[serde(default)]
    pub id: String,
    /// Verb describing what happened (e.g. "killed", "started")
    pub action: String,
    /// Entity that performed the action
    #[serde(default)]
    pub actor: Option<EventEntity>,
    /// Entity the action was performed on
    #[serde(default)]
    pub target: Option<EventEntity>,
    /// Embedded snapshot of series state at event time, when delivered
    #[serde(default)]
    pub series_state: Option<Value>,
    /// Embedded delta of series state caused by this event, when delivered
    #[serde(default)]
    pub series_state_delta: Option<Value>,
    /// Whether `series_state` is a full snapshot rather than a partial view
    #[serde(default)]
    pub includes_full_state: bool,
}

impl RawEvent {
    /// Actor type, or `""` when no actor is attached.
    pub fn actor_type(&self) -> &str {
        self.actor
            .as_ref()
            .map(|e| e.entity_type.as_str())
            .unwrap_or("")
    }

    /// Target type, or `""` when no target is attached.
    pub fn target_type(&self) -> &str {
        self.target
            .as_ref()
            .map(|e| e.entity_type.as_str())
            .unwrap_or("")
    }

    /// The in-game clock reading embedded in the state snapshot, in
    /// milliseconds, if the snapshot carries one.
    pub fn embedded_clock_ms(&self) -> Option<i64> {
        let state = self.series_state.as_ref()?;
        let seconds = get_path(state, &["games", "0", "clock", "currentSeconds"])?.as_f64()?;
        Some((seconds * 1000.0) as i64)
    }
}

/// An actor or target attached to a [`RawEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEntity {
    /// Entity identifier
    #[serde(default)]
    pub id: String,
    /// Entity type (e.g. "player", "team", "round", "game")
    #[serde(rename = "type", default)]
    pub entity_type: String,
    /// Loosely-typed entity state at event time
    #[serde(default)]
    pub state: Option<Value>,
    /// Loosely-typed state delta caused by the event
    #[serde(default)]
    pub state_delta: Option<Value>,
}

impl EventEntity {
    /// Navigate into the entity state; `None` if any step is absent.
    pub fn state_path(&self, path: &[&str]) -> Option<&Value> {
        get_path(self.state.as_ref()?, path)
    }

    /// Read a string field out of the entity state.
    pub fn state_str(&self, path: &[&str]) -> Option<&str> {
        self.state_path(path)?.as_str()
    }

    /// Read a numeric field out of the entity state.
    pub fn state_f64(&self, path: &[&str]) -> Option<f64> {
        self.state_path(path)?.as_f64()
    }

    /// Position carried in the per-game entity state, if any.
    pub fn position(&self) -> Option<Position> {
        let pos = self.state_path(&["game", "position"])?;
        Some(Position {
            x: get_path(pos, &["x"])?.as_f64()?,
            y: get_path(pos, &["y"])?.as_f64()?,
        })
    }
}

/// Safe navigation into nested JSON. Each path segment is either an object
/// key or, for arrays, a decimal index.
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// A 2D in-game position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate in map units
    pub x: f64,
    /// Y coordinate in map units
    pub y: f64,
}

/// A downloadable bulk artifact advertised by the file-download listing
/// endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Artifact identifier (e.g. "events-grid-compressed")
    pub id: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Readiness status; only "ready" artifacts are downloadable
    #[serde(default)]
    pub status: String,
    /// File name of the artifact
    #[serde(default)]
    pub file_name: String,
    /// Direct download URL
    #[serde(rename = "fullURL", default)]
    pub full_url: String,
}

/// A game title served by the reference-data endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Title {
    /// Title identifier
    pub id: String,
    /// Title display name
    pub name: String,
}

/// A tournament served by the reference-data endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    /// Tournament identifier
    pub id: String,
    /// Tournament display name
    #[serde(default)]
    pub name: String,
    /// Game title this tournament belongs to
    #[serde(default)]
    pub title_id: String,
    /// Logo image URL, when published
    #[serde(default)]
    pub logo_url: String,
    /// First day of play
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Last day of play
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

/// Minimal team reference carried on series summaries and team lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRef {
    /// Team identifier
    pub id: String,
    /// Team display name
    #[serde(default)]
    pub name: String,
    /// Logo image URL, when published
    #[serde(default)]
    pub logo_url: String,
}

/// Summary of a match series as returned by the reference-data endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    /// Series identifier
    pub id: String,
    /// Owning tournament identifier
    #[serde(default)]
    pub tournament_id: String,
    /// Game title identifier
    #[serde(default)]
    pub title_id: String,
    /// Series format (e.g. "Bo3")
    #[serde(default)]
    pub format: String,
    /// Scheduled start time
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Participating teams
    #[serde(default)]
    pub teams: Vec<TeamRef>,
}

/// Detailed state of a series as served by the series-state endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesState {
    /// Series identifier
    pub id: String,
    /// Whether the series has started
    #[serde(default)]
    pub started: bool,
    /// Whether the series has finished
    #[serde(default)]
    pub finished: bool,
    /// Series-level team results
    #[serde(default)]
    pub teams: Vec<TeamState>,
    /// Individual games within the series
    #[serde(default)]
    pub games: Vec<GameState>,
}

/// Series-level result for one team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamState {
    /// Team identifier
    pub id: String,
    /// Team display name
    #[serde(default)]
    pub name: String,
    /// Whether this team won the series
    #[serde(default)]
    pub won: bool,
    /// Maps/games won
    #[serde(default)]
    pub score: i32,
    /// Total kills across the series
    #[serde(default)]
    pub kills: i32,
    /// Total deaths across the series
    #[serde(default)]
    pub deaths: i32,
}

/// State of one game within a series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Game identifier
    pub id: String,
    /// 1-based position of this game within the series
    #[serde(default)]
    pub sequence: i32,
    /// Map played, when the title has maps
    #[serde(default)]
    pub map_name: String,
    /// In-game clock reading at capture time, in seconds
    #[serde(default)]
    pub duration_secs: i32,
    /// Whether the game has started
    #[serde(default)]
    pub started: bool,
    /// Whether the game has finished
    #[serde(default)]
    pub finished: bool,
    /// Per-game team results
    #[serde(default)]
    pub teams: Vec<GameTeamState>,
    /// Rounds or phases within the game
    #[serde(default)]
    pub segments: Vec<SegmentState>,
    /// Draft picks and bans recorded for the game, in draft order
    #[serde(default)]
    pub draft_actions: Vec<DraftActionState>,
}

/// A draft pick or ban as reported by the series-state endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftActionState {
    /// "picked" or "banned"
    #[serde(default)]
    pub action: String,
    /// The drafting team identifier
    #[serde(default)]
    pub team_id: String,
    /// Drafted character identifier
    #[serde(default)]
    pub character_id: String,
    /// Drafted character name
    #[serde(default)]
    pub character_name: String,
}

/// Per-game result for one team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTeamState {
    /// Team identifier
    pub id: String,
    /// Team display name
    #[serde(default)]
    pub name: String,
    /// Side played (title-specific, e.g. "attack" or "blue")
    #[serde(default)]
    pub side: String,
    /// Rounds or points won in this game
    #[serde(default)]
    pub score: i32,
    /// Whether this team won the game
    #[serde(default)]
    pub won: bool,
    /// Kills in this game
    #[serde(default)]
    pub kills: i32,
    /// Deaths in this game
    #[serde(default)]
    pub deaths: i32,
}

/// A round or phase within a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentState {
    /// Segment identifier
    pub id: String,
    /// 1-based sequence number of the segment
    #[serde(default)]
    pub sequence_number: i32,
    /// Segment type (e.g. "round")
    #[serde(rename = "type", default)]
    pub segment_type: String,
    /// Whether the segment has finished
    #[serde(default)]
    pub finished: bool,
    /// Per-segment team results
    #[serde(default)]
    pub teams: Vec<GameTeamState>,
}
