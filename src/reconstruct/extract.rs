//! Per-variant field extraction
//!
//! Pulls participant identity, positions, assist lists and structure metadata
//! out of the loosely-typed entity state attached to raw events. Every lookup
//! is defensive; missing fields degrade to empty values rather than failing
//! the event.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::events::{
    DefuseEvent, DraftActionEvent, DraftKind, KillEvent, ObjectiveCaptureEvent, ObjectiveKind,
    Participant, PlantEvent, RoundResolvedEvent, StructureDestroyedEvent,
};
use crate::{EventEntity, RawEvent};

/// Structure identifiers follow "<side>-<class>-<lane>[-<n>]".
static STRUCTURE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(red|blue)-(?:turret|inhibitor)-(\w+)-?(\d*)")
        .expect("structure id pattern is valid")
});

/// Build a [`Participant`] from a player entity.
pub(super) fn participant(entity: &EventEntity) -> Participant {
    Participant {
        id: entity.id.clone(),
        name: entity.state_str(&["name"]).unwrap_or_default().to_string(),
        team_id: entity
            .state_str(&["teamId"])
            .unwrap_or_default()
            .to_string(),
        character: entity
            .state_str(&["game", "character", "name"])
            .unwrap_or_default()
            .to_string(),
    }
}

/// Assist credits are delivered on the killer's per-game state.
fn assist_ids(actor: &EventEntity) -> Vec<String> {
    actor
        .state_path(&["game", "killAssistsReceivedFromPlayer"])
        .and_then(|v| v.as_array())
        .map(|assists| {
            assists
                .iter()
                .filter_map(|a| a.get("playerId")?.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub(super) fn kill(
    event: &RawEvent,
    occurred_at: DateTime<Utc>,
    first_blood: bool,
    round: Option<u32>,
    elapsed_ms: i64,
) -> Option<KillEvent> {
    let actor = event.actor.as_ref()?;
    let target = event.target.as_ref()?;

    Some(KillEvent {
        killer: participant(actor),
        victim: participant(target),
        assist_ids: assist_ids(actor),
        first_blood,
        round,
        killer_position: actor.position(),
        victim_position: target.position(),
        occurred_at,
        elapsed_ms,
    })
}

pub(super) fn objective_capture(
    event: &RawEvent,
    occurred_at: DateTime<Utc>,
    elapsed_ms: i64,
) -> Option<ObjectiveCaptureEvent> {
    let target = event.target.as_ref()?;
    let kind = ObjectiveKind::from_identifier(&target.id)?;

    Some(ObjectiveCaptureEvent {
        kind,
        objective_id: target.id.clone(),
        player: event.actor.as_ref().map(participant).unwrap_or_default(),
        position: event.actor.as_ref().and_then(EventEntity::position),
        occurred_at,
        elapsed_ms,
    })
}

pub(super) fn structure_destroyed(
    event: &RawEvent,
    occurred_at: DateTime<Utc>,
    elapsed_ms: i64,
) -> Option<StructureDestroyedEvent> {
    let target = event.target.as_ref()?;

    let (lane, position_number) = match STRUCTURE_ID.captures(&target.id) {
        Some(captures) => (
            captures.get(2).map(|m| m.as_str().to_string()),
            captures.get(3).and_then(|m| m.as_str().parse().ok()),
        ),
        None => (None, None),
    };

    let mut destroyed = StructureDestroyedEvent {
        structure_id: target.id.clone(),
        lane,
        position_number,
        team_id: String::new(),
        team_name: String::new(),
        player: None,
        occurred_at,
        elapsed_ms,
    };

    // The actor may be the whole team or the last-hitting player.
    if let Some(actor) = event.actor.as_ref() {
        if actor.entity_type == "team" {
            destroyed.team_id = actor.id.clone();
            destroyed.team_name = actor.state_str(&["name"]).unwrap_or_default().to_string();
        } else {
            let player = participant(actor);
            destroyed.team_id = player.team_id.clone();
            destroyed.player = Some(player);
        }
    }

    Some(destroyed)
}

pub(super) fn draft_action(
    event: &RawEvent,
    occurred_at: DateTime<Utc>,
    kind: DraftKind,
) -> Option<DraftActionEvent> {
    let target = event.target.as_ref()?;

    let (team_id, team_name) = match event.actor.as_ref() {
        Some(actor) => (
            actor.id.clone(),
            actor.state_str(&["name"]).unwrap_or_default().to_string(),
        ),
        None => (String::new(), String::new()),
    };

    Some(DraftActionEvent {
        kind,
        team_id,
        team_name,
        character_id: target.id.clone(),
        character_name: target.state_str(&["name"]).unwrap_or_default().to_string(),
        occurred_at,
    })
}

pub(super) fn round_resolved(
    event: &RawEvent,
    occurred_at: DateTime<Utc>,
) -> Option<RoundResolvedEvent> {
    let target = event.target.as_ref()?;

    let round = target.state_f64(&["sequenceNumber"]).map(|seq| seq as u32);

    // The win type lives on whichever team in the round state won.
    let win_type = target
        .state_path(&["teams"])
        .and_then(|v| v.as_array())
        .and_then(|teams| {
            teams.iter().find_map(|team| {
                if team.get("won")?.as_bool()? {
                    team.get("winType")?.as_str().map(str::to_string)
                } else {
                    None
                }
            })
        });

    let (winner_id, winner_name) = match event.actor.as_ref() {
        Some(actor) => (
            actor.id.clone(),
            actor.state_str(&["name"]).unwrap_or_default().to_string(),
        ),
        None => (String::new(), String::new()),
    };

    Some(RoundResolvedEvent {
        round,
        winner_id,
        winner_name,
        win_type,
        occurred_at,
    })
}

pub(super) fn plant(
    event: &RawEvent,
    occurred_at: DateTime<Utc>,
    round: Option<u32>,
    map_name: &str,
    elapsed_ms: i64,
) -> Option<PlantEvent> {
    let actor = event.actor.as_ref()?;

    Some(PlantEvent {
        player: participant(actor),
        round,
        map_name: map_name.to_string(),
        position: actor.position(),
        occurred_at,
        elapsed_ms,
    })
}

pub(super) fn defuse(
    event: &RawEvent,
    occurred_at: DateTime<Utc>,
    round: Option<u32>,
    elapsed_ms: i64,
) -> Option<DefuseEvent> {
    let actor = event.actor.as_ref()?;

    Some(DefuseEvent {
        player: participant(actor),
        round,
        position: actor.position(),
        occurred_at,
        elapsed_ms,
    })
}
