//! Series-state operations
//!
//! Detailed per-series match state from the live-state GraphQL endpoint, plus
//! the bounded-concurrency batch fetch built on top of it.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::batch::{self, BatchOutcome};
use crate::client::config::{MAX_RETRIES, SERIES_STATE_CACHE_TTL};
use crate::client::{retry, ApiClient, ClientResult};
use crate::{
    DraftActionState, GameState, GameTeamState, SegmentState, SeriesState, SeriesSummary,
    TeamState,
};

const SERIES_STATE_QUERY: &str = r#"
    query SeriesState($seriesId: ID!) {
        seriesState(id: $seriesId) {
            id
            started
            finished
            teams {
                id
                name
                won
                score
                kills
                deaths
            }
            games {
                id
                started
                finished
                map {
                    name
                }
                clock {
                    currentSeconds
                }
                draftActions {
                    id
                    type
                    drafter {
                        id
                    }
                    draftable {
                        id
                        name
                    }
                }
                segments {
                    id
                    sequenceNumber
                    type
                    finished
                    teams {
                        id
                        name
                        side
                        won
                        kills
                        deaths
                    }
                }
                teams {
                    id
                    name
                    side
                    score
                    won
                    kills
                    deaths
                }
            }
        }
    }
"#;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesStateData {
    series_state: Option<SeriesStateNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesStateNode {
    id: String,
    #[serde(default)]
    started: bool,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    teams: Vec<TeamState>,
    #[serde(default)]
    games: Vec<GameNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameNode {
    id: String,
    #[serde(default)]
    started: bool,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    map: Option<MapNode>,
    #[serde(default)]
    clock: Option<ClockNode>,
    #[serde(default)]
    draft_actions: Vec<DraftActionNode>,
    #[serde(default)]
    segments: Vec<SegmentState>,
    #[serde(default)]
    teams: Vec<GameTeamState>,
}

#[derive(Deserialize)]
struct DraftActionNode {
    #[serde(rename = "type", default)]
    action: String,
    #[serde(default)]
    drafter: Option<IdRef>,
    #[serde(default)]
    draftable: Option<NamedRef>,
}

#[derive(Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Deserialize)]
struct NamedRef {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct MapNode {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClockNode {
    #[serde(default)]
    current_seconds: i32,
}

impl From<SeriesStateNode> for SeriesState {
    fn from(node: SeriesStateNode) -> Self {
        let games = node
            .games
            .into_iter()
            .enumerate()
            .map(|(i, g)| GameState {
                id: g.id,
                // The endpoint returns games in play order without a sequence
                // field of their own.
                sequence: i as i32 + 1,
                map_name: g.map.map(|m| m.name).unwrap_or_default(),
                duration_secs: g.clock.map(|c| c.current_seconds).unwrap_or_default(),
                started: g.started,
                finished: g.finished,
                teams: g.teams,
                segments: g.segments,
                draft_actions: g
                    .draft_actions
                    .into_iter()
                    .map(|d| {
                        let (character_id, character_name) = match d.draftable {
                            Some(draftable) => (draftable.id, draftable.name),
                            None => (String::new(), String::new()),
                        };
                        DraftActionState {
                            action: d.action,
                            team_id: d.drafter.map(|t| t.id).unwrap_or_default(),
                            character_id,
                            character_name,
                        }
                    })
                    .collect(),
            })
            .collect();

        SeriesState {
            id: node.id,
            started: node.started,
            finished: node.finished,
            teams: node.teams,
            games,
        }
    }
}

/// A team's recent series listings joined with their detailed states.
#[derive(Debug)]
pub struct TeamMatchData {
    /// Recent series for the team, newest first
    pub series: Vec<SeriesSummary>,
    /// Detailed state per series, positionally aligned with `series`
    pub states: BatchOutcome<SeriesState>,
}

impl ApiClient {
    /// Fetch detailed match state for one series.
    pub async fn get_series_state(&self, series_id: &str) -> ClientResult<SeriesState> {
        let cache_key = format!("series:state:{series_id}");
        if let Some(state) = self.get_cached(&cache_key).await {
            return Ok(state);
        }

        let data: SeriesStateData = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.run_series_state_query(
                series_id,
                SERIES_STATE_QUERY,
                json!({ "seriesId": series_id }),
            )
        })
        .await?;

        let state: SeriesState = match data.series_state {
            Some(node) => node.into(),
            // The endpoint returns null for series without state yet; callers
            // get an empty default rather than an error.
            None => SeriesState {
                id: series_id.to_string(),
                ..SeriesState::default()
            },
        };

        debug!(series_id, games = state.games.len(), "fetched series state");
        self.set_cache(&cache_key, &state, SERIES_STATE_CACHE_TTL)
            .await;
        Ok(state)
    }

    /// Fetch states for many series with bounded concurrency.
    ///
    /// Results are positionally aligned with `series_ids`; individual failures
    /// are recorded per key and never fail the batch.
    pub async fn get_series_states(
        self: &Arc<Self>,
        series_ids: Vec<String>,
    ) -> BatchOutcome<SeriesState> {
        let client = Arc::clone(self);
        batch::fetch_all(series_ids, batch::DEFAULT_CONCURRENCY, move |series_id| {
            let client = Arc::clone(&client);
            async move { client.get_series_state(&series_id).await }
        })
        .await
    }

    /// Fetch a team's recent series and the detailed state of each.
    pub async fn get_match_data_for_team(
        self: &Arc<Self>,
        team_id: &str,
        limit: i32,
    ) -> ClientResult<TeamMatchData> {
        let series = self.get_series_for_team(team_id, limit).await?;
        let ids: Vec<String> = series.iter().map(|s| s.id.clone()).collect();
        let states = self.get_series_states(ids).await;
        Ok(TeamMatchData { series, states })
    }
}
