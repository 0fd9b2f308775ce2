//! Reference-data operations
//!
//! Titles, tournaments, teams and series listings from the central GraphQL
//! endpoint. All reads are cache-aside (except free-text team search) and
//! wrapped in the retry policy.

use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

use crate::client::config::{
    MAX_RETRIES, SERIES_CACHE_TTL, TEAMS_CACHE_TTL, TITLES_CACHE_TTL, TOURNAMENTS_CACHE_TTL,
};
use crate::client::{retry, ApiClient, ClientResult};
use crate::{SeriesSummary, TeamRef, Title, Tournament};

const TITLES_QUERY: &str = r#"
    query Titles {
        titles {
            id
            name
        }
    }
"#;

const SERIES_FOR_TEAM_QUERY: &str = r#"
    query SeriesForTeam($teamId: ID!, $limit: Int!) {
        allSeries(
            filter: { teamId: $teamId }
            orderBy: StartTimeScheduled
            orderDirection: DESC
            first: $limit
        ) {
            edges {
                node {
                    id
                    startTimeScheduled
                    format {
                        nameShortened
                    }
                    teams {
                        baseInfo {
                            id
                            name
                            logoUrl
                        }
                    }
                    tournament {
                        id
                    }
                    title {
                        id
                    }
                }
            }
        }
    }
"#;

const TOURNAMENTS_QUERY: &str = r#"
    query Tournaments($titleId: [ID!]) {
        tournaments(filter: { title: { id: { in: $titleId } } }, first: 100) {
            edges {
                node {
                    id
                    name
                    logoUrl
                    startDate
                    endDate
                }
            }
        }
    }
"#;

const TEAMS_IN_TOURNAMENT_QUERY: &str = r#"
    query TeamsInTournament($tournamentId: [ID!]!) {
        allSeries(
            filter: { tournament: { id: { in: $tournamentId }, includeChildren: { equals: true } } }
            first: 50
        ) {
            edges {
                node {
                    teams {
                        baseInfo {
                            id
                            name
                            logoUrl
                        }
                    }
                }
            }
        }
    }
"#;

const SEARCH_TEAMS_QUERY: &str = r#"
    query SearchTeams($query: String!, $titleId: ID) {
        teams(
            filter: {
                name: { contains: $query }
                titleId: $titleId
            }
            first: 20
        ) {
            edges {
                node {
                    id
                    name
                    logoUrl
                }
            }
        }
    }
"#;

const TEAM_FROM_SERIES_QUERY: &str = r#"
    query TeamFromSeries($teamId: ID!) {
        allSeries(
            filter: { teamId: $teamId }
            first: 1
        ) {
            edges {
                node {
                    teams {
                        baseInfo {
                            id
                            name
                            logoUrl
                        }
                    }
                }
            }
        }
    }
"#;

#[derive(Deserialize)]
struct TitlesData {
    titles: Vec<Title>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesForTeamData {
    all_series: Connection<SeriesNode>,
}

#[derive(Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesNode {
    id: String,
    #[serde(default)]
    start_time_scheduled: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    format: Option<FormatNode>,
    #[serde(default)]
    teams: Vec<SeriesTeamNode>,
    #[serde(default)]
    tournament: Option<IdNode>,
    #[serde(default)]
    title: Option<IdNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatNode {
    #[serde(default)]
    name_shortened: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesTeamNode {
    #[serde(default)]
    base_info: Option<TeamRef>,
}

#[derive(Deserialize)]
struct IdNode {
    id: String,
}

#[derive(Deserialize)]
struct TournamentsData {
    tournaments: Connection<TournamentNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TournamentNode {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    logo_url: String,
    #[serde(default)]
    start_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    end_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamsFromSeriesData {
    all_series: Connection<SeriesTeamsNode>,
}

#[derive(Deserialize)]
struct SeriesTeamsNode {
    #[serde(default)]
    teams: Vec<SeriesTeamNode>,
}

#[derive(Deserialize)]
struct SearchTeamsData {
    teams: Connection<TeamRef>,
}

impl From<SeriesNode> for SeriesSummary {
    fn from(node: SeriesNode) -> Self {
        SeriesSummary {
            id: node.id,
            tournament_id: node.tournament.map(|t| t.id).unwrap_or_default(),
            title_id: node.title.map(|t| t.id).unwrap_or_default(),
            format: node.format.map(|f| f.name_shortened).unwrap_or_default(),
            start_time: node.start_time_scheduled,
            teams: node.teams.into_iter().filter_map(|t| t.base_info).collect(),
        }
    }
}

impl ApiClient {
    /// Fetch the available game titles.
    pub async fn get_titles(&self) -> ClientResult<Vec<Title>> {
        let cache_key = "titles:all";
        if let Some(titles) = self.get_cached(cache_key).await {
            return Ok(titles);
        }

        let data: TitlesData = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.run_central_query(TITLES_QUERY, json!({}))
        })
        .await?;

        debug!(count = data.titles.len(), "fetched titles");
        self.set_cache(cache_key, &data.titles, TITLES_CACHE_TTL)
            .await;
        Ok(data.titles)
    }

    /// Fetch the most recent series a team has played, newest first.
    ///
    /// A non-positive `limit` falls back to 10.
    pub async fn get_series_for_team(
        &self,
        team_id: &str,
        limit: i32,
    ) -> ClientResult<Vec<SeriesSummary>> {
        let limit = if limit <= 0 { 10 } else { limit };

        let cache_key = format!("series:team:{team_id}:limit:{limit}");
        if let Some(series) = self.get_cached(&cache_key).await {
            return Ok(series);
        }

        let variables = json!({ "teamId": team_id, "limit": limit });
        let data: SeriesForTeamData = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.run_central_query(SERIES_FOR_TEAM_QUERY, variables.clone())
        })
        .await?;

        let series: Vec<SeriesSummary> = data
            .all_series
            .edges
            .into_iter()
            .map(|edge| edge.node.into())
            .collect();

        debug!(team_id, count = series.len(), "fetched series for team");
        self.set_cache(&cache_key, &series, SERIES_CACHE_TTL).await;
        Ok(series)
    }

    /// Fetch the tournaments run under a game title.
    pub async fn get_tournaments(&self, title_id: &str) -> ClientResult<Vec<Tournament>> {
        let cache_key = format!("tournaments:{title_id}");
        if let Some(tournaments) = self.get_cached(&cache_key).await {
            return Ok(tournaments);
        }

        let variables = json!({ "titleId": [title_id] });
        let data: TournamentsData = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.run_central_query(TOURNAMENTS_QUERY, variables.clone())
        })
        .await?;

        let tournaments: Vec<Tournament> = data
            .tournaments
            .edges
            .into_iter()
            .map(|edge| Tournament {
                id: edge.node.id,
                name: edge.node.name,
                title_id: title_id.to_string(),
                logo_url: edge.node.logo_url,
                start_date: edge.node.start_date,
                end_date: edge.node.end_date,
            })
            .collect();

        debug!(title_id, count = tournaments.len(), "fetched tournaments");
        self.set_cache(&cache_key, &tournaments, TOURNAMENTS_CACHE_TTL)
            .await;
        Ok(tournaments)
    }

    /// Fetch the teams that have played in a tournament.
    ///
    /// The endpoint has no direct tournament-roster query, so teams are
    /// collected from the tournament's series and de-duplicated by id.
    pub async fn get_teams(&self, tournament_id: &str) -> ClientResult<Vec<TeamRef>> {
        let cache_key = format!("teams:tournament:{tournament_id}");
        if let Some(teams) = self.get_cached(&cache_key).await {
            return Ok(teams);
        }

        let variables = json!({ "tournamentId": [tournament_id] });
        let data: TeamsFromSeriesData = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.run_central_query(TEAMS_IN_TOURNAMENT_QUERY, variables.clone())
        })
        .await?;

        let teams = unique_teams(data);

        debug!(tournament_id, count = teams.len(), "fetched tournament teams");
        self.set_cache(&cache_key, &teams, TEAMS_CACHE_TTL).await;
        Ok(teams)
    }

    /// Search teams by name, optionally scoped to a title. Not cached.
    pub async fn search_teams(
        &self,
        query: &str,
        title_id: Option<&str>,
    ) -> ClientResult<Vec<TeamRef>> {
        let variables = json!({ "query": query, "titleId": title_id });
        let data: SearchTeamsData = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.run_central_query(SEARCH_TEAMS_QUERY, variables.clone())
        })
        .await?;

        Ok(data.teams.edges.into_iter().map(|edge| edge.node).collect())
    }

    /// Look up a single team by id.
    ///
    /// The endpoint has no direct team-by-id query, so the team is read off
    /// one of its series. A team with no series resolves to a bare reference
    /// carrying only the id, and that fallback is not cached.
    pub async fn get_team_by_id(&self, team_id: &str) -> ClientResult<TeamRef> {
        let cache_key = format!("team:{team_id}");
        if let Some(team) = self.get_cached(&cache_key).await {
            return Ok(team);
        }

        let variables = json!({ "teamId": team_id });
        let data: TeamsFromSeriesData = retry::run(self.shutdown(), MAX_RETRIES, || {
            self.run_central_query(TEAM_FROM_SERIES_QUERY, variables.clone())
        })
        .await?;

        for edge in data.all_series.edges {
            for team in edge.node.teams.into_iter().filter_map(|t| t.base_info) {
                if team.id == team_id {
                    self.set_cache(&cache_key, &team, TEAMS_CACHE_TTL).await;
                    return Ok(team);
                }
            }
        }

        Ok(TeamRef {
            id: team_id.to_string(),
            ..TeamRef::default()
        })
    }
}

/// Collapse the teams seen across a set of series into one entry per team id.
fn unique_teams(data: TeamsFromSeriesData) -> Vec<TeamRef> {
    let mut by_id: HashMap<String, TeamRef> = HashMap::new();
    for edge in data.all_series.edges {
        for team in edge.node.teams.into_iter().filter_map(|t| t.base_info) {
            if !team.id.is_empty() {
                by_id.insert(team.id.clone(), team);
            }
        }
    }
    by_id.into_values().collect()
}
