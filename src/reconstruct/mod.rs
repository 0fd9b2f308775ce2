//! Event reconstruction engine
//!
//! Walks envelopes in arrival order and turns the generic
//! actor/action/target events into the typed variants of
//! [`TypedDomainEvent`]. Unrecognized triples are ignored; reconstruction
//! never fails on content.
//!
//! Elapsed time per event prefers the in-game clock embedded in the event's
//! state snapshot. Without one, round-scoped events fall back to the delta
//! from their round's start marker, others to the delta from the game start
//! marker, and finally to zero.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::EventEnvelope;

mod events;
mod extract;

pub use events::{
    DefuseEvent, DraftActionEvent, DraftKind, KillEvent, ObjectiveCaptureEvent, ObjectiveKind,
    Participant, PlantEvent, RoundResolvedEvent, StructureDestroyedEvent, TypedDomainEvent,
};

/// Output of one reconstruction pass.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Typed events in arrival order
    pub events: Vec<TypedDomainEvent>,
    /// Wall-clock game start, when a game start marker was seen
    pub game_start: Option<DateTime<Utc>>,
    /// Map in play, when a round marker carried one
    pub map_name: String,
}

/// Mutable scan state threaded through the ordered pass.
#[derive(Default)]
struct ScanState {
    current_round: Option<u32>,
    map_name: String,
    game_start: Option<DateTime<Utc>>,
    round_starts: HashMap<u32, DateTime<Utc>>,
    first_kill_seen: bool,
}

impl ScanState {
    /// Milliseconds since the current round started, when round-scoped timing
    /// applies.
    fn round_elapsed_ms(&self, occurred_at: DateTime<Utc>) -> Option<i64> {
        let round = self.current_round?;
        let start = self.round_starts.get(&round)?;
        Some((occurred_at - *start).num_milliseconds())
    }

    /// Milliseconds since the game started.
    fn game_elapsed_ms(&self, occurred_at: DateTime<Utc>) -> Option<i64> {
        self.game_start
            .map(|start| (occurred_at - start).num_milliseconds())
    }
}

/// Reconstruct typed events from envelopes, in arrival order.
pub fn reconstruct(envelopes: &[EventEnvelope]) -> Reconstruction {
    let mut scan = ScanState::default();
    let mut events = Vec::new();

    for envelope in envelopes {
        for event in &envelope.events {
            let occurred_at = envelope.occurred_at;

            observe_markers(&mut scan, event, occurred_at);

            if let Some(typed) = classify(&mut scan, event, occurred_at) {
                events.push(typed);
            }
        }
    }

    Reconstruction {
        events,
        game_start: scan.game_start,
        map_name: scan.map_name,
    }
}

/// Track round and game start markers that later events are timed against.
fn observe_markers(scan: &mut ScanState, event: &crate::RawEvent, occurred_at: DateTime<Utc>) {
    if event.action != "started" {
        return;
    }

    match event.target_type() {
        "round" => {
            if let Some(target) = event.target.as_ref() {
                if let Some(seq) = target.state_f64(&["sequenceNumber"]) {
                    let round = seq as u32;
                    scan.current_round = Some(round);
                    scan.round_starts.insert(round, occurred_at);
                }
            }
            // The acting game entity carries the map name.
            if let Some(actor) = event.actor.as_ref() {
                if let Some(name) = actor.state_str(&["map", "name"]) {
                    scan.map_name = name.to_string();
                }
            }
        }
        "game" => {
            if scan.game_start.is_none() {
                scan.game_start = Some(occurred_at);
            }
        }
        _ => {}
    }
}

fn classify(
    scan: &mut ScanState,
    event: &crate::RawEvent,
    occurred_at: DateTime<Utc>,
) -> Option<TypedDomainEvent> {
    let triple = (event.actor_type(), event.action.as_str(), event.target_type());

    match triple {
        ("player", "killed", "player") => {
            let elapsed_ms = event
                .embedded_clock_ms()
                .or_else(|| scan.round_elapsed_ms(occurred_at))
                .or_else(|| scan.game_elapsed_ms(occurred_at))
                .unwrap_or(0);
            let first_blood = !scan.first_kill_seen;
            let kill = extract::kill(
                event,
                occurred_at,
                first_blood,
                scan.current_round,
                elapsed_ms,
            )?;
            scan.first_kill_seen = true;
            Some(TypedDomainEvent::Kill(kill))
        }
        (_, "killed", "ATierNPC") => {
            let elapsed_ms = game_scoped_elapsed(scan, event, occurred_at);
            extract::objective_capture(event, occurred_at, elapsed_ms)
                .map(TypedDomainEvent::ObjectiveCapture)
        }
        (_, "destroyed", "tower") | (_, "destroyed", "fortifier") => {
            let elapsed_ms = game_scoped_elapsed(scan, event, occurred_at);
            extract::structure_destroyed(event, occurred_at, elapsed_ms)
                .map(TypedDomainEvent::StructureDestroyed)
        }
        (_, "picked", "character") => {
            extract::draft_action(event, occurred_at, DraftKind::Picked)
                .map(TypedDomainEvent::DraftAction)
        }
        (_, "banned", "character") => {
            extract::draft_action(event, occurred_at, DraftKind::Banned)
                .map(TypedDomainEvent::DraftAction)
        }
        (_, "won", "round") => {
            extract::round_resolved(event, occurred_at).map(TypedDomainEvent::RoundResolved)
        }
        (_, "completed", "plantBomb") => {
            let elapsed_ms = round_scoped_elapsed(scan, event, occurred_at);
            extract::plant(
                event,
                occurred_at,
                scan.current_round,
                &scan.map_name,
                elapsed_ms,
            )
            .map(TypedDomainEvent::Plant)
        }
        (_, "completed", "defuseBomb") => {
            let elapsed_ms = round_scoped_elapsed(scan, event, occurred_at);
            extract::defuse(event, occurred_at, scan.current_round, elapsed_ms)
                .map(TypedDomainEvent::Defuse)
        }
        _ => None,
    }
}

fn game_scoped_elapsed(
    scan: &ScanState,
    event: &crate::RawEvent,
    occurred_at: DateTime<Utc>,
) -> i64 {
    event
        .embedded_clock_ms()
        .or_else(|| scan.game_elapsed_ms(occurred_at))
        .unwrap_or(0)
}

fn round_scoped_elapsed(
    scan: &ScanState,
    event: &crate::RawEvent,
    occurred_at: DateTime<Utc>,
) -> i64 {
    event
        .embedded_clock_ms()
        .or_else(|| scan.round_elapsed_ms(occurred_at))
        .unwrap_or(0)
}
