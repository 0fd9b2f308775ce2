//! Typed domain events
//!
//! The closed set of events the reconstruction engine emits. Variants carry
//! only what the wire format actually delivers; absent data stays `Option`
//! rather than being defaulted to fake values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Position;

/// A player referenced by an event, with whatever identity the event state
/// carried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Player identifier
    pub id: String,
    /// Display name, when the state carried one
    pub name: String,
    /// Team identifier, when the state carried one
    pub team_id: String,
    /// Character or agent played, when the state carried one
    pub character: String,
}

/// Neutral objective classes recognized from target identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectiveKind {
    /// Dragons and drakes
    Dragon,
    /// Baron Nashor
    Baron,
    /// Rift Herald
    Herald,
    /// Void grubs
    VoidGrub,
}

impl ObjectiveKind {
    /// Classify an objective from its target identifier vocabulary.
    ///
    /// Returns `None` for identifiers outside the known vocabulary; such
    /// events are dropped rather than mislabelled.
    pub fn from_identifier(id: &str) -> Option<Self> {
        let id = id.to_lowercase();
        if id.contains("drake") || id.contains("dragon") {
            Some(Self::Dragon)
        } else if id.contains("baron") || id.contains("nashor") {
            Some(Self::Baron)
        } else if id.contains("herald") || id.contains("rift") {
            Some(Self::Herald)
        } else if id.contains("voidgrub") || id.contains("grub") {
            Some(Self::VoidGrub)
        } else {
            None
        }
    }
}

/// Whether a draft action selected or removed a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftKind {
    /// Character picked for play
    Picked,
    /// Character banned from the game
    Banned,
}

/// A reconstructed, fully-typed domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypedDomainEvent {
    /// One player killed another
    Kill(KillEvent),
    /// A neutral objective was taken
    ObjectiveCapture(ObjectiveCaptureEvent),
    /// A structure (tower or inhibitor) was destroyed
    StructureDestroyed(StructureDestroyedEvent),
    /// A character was picked or banned in draft
    DraftAction(DraftActionEvent),
    /// A round finished with a winner
    RoundResolved(RoundResolvedEvent),
    /// The bomb/spike was planted
    Plant(PlantEvent),
    /// The bomb/spike was defused
    Defuse(DefuseEvent),
}

/// A player-versus-player kill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillEvent {
    /// The killing player
    pub killer: Participant,
    /// The killed player
    pub victim: Participant,
    /// Identifiers of players credited with assists on this kill
    pub assist_ids: Vec<String>,
    /// Whether this was the first kill seen in the stream
    pub first_blood: bool,
    /// Round the kill happened in, for round-structured titles
    pub round: Option<u32>,
    /// Killer map position at the moment of the kill
    pub killer_position: Option<Position>,
    /// Victim map position at the moment of the kill
    pub victim_position: Option<Position>,
    /// Wall-clock timestamp
    pub occurred_at: DateTime<Utc>,
    /// Milliseconds into the game or round
    pub elapsed_ms: i64,
}

/// A neutral objective capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveCaptureEvent {
    /// The recognized objective class
    pub kind: ObjectiveKind,
    /// Raw target identifier (carries subtype detail, e.g. the dragon element)
    pub objective_id: String,
    /// The capturing player
    pub player: Participant,
    /// Capturing player position
    pub position: Option<Position>,
    /// Wall-clock timestamp
    pub occurred_at: DateTime<Utc>,
    /// Milliseconds into the game
    pub elapsed_ms: i64,
}

/// A destroyed tower or inhibitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDestroyedEvent {
    /// Raw structure identifier (e.g. "red-turret-mid-2")
    pub structure_id: String,
    /// Lane parsed from the identifier, when it follows the known shape
    pub lane: Option<String>,
    /// Structure position number within the lane, when present
    pub position_number: Option<u32>,
    /// Destroying team identifier
    pub team_id: String,
    /// Destroying team name, when a team actor carried one
    pub team_name: String,
    /// Destroying player, when the actor was a player rather than a team
    pub player: Option<Participant>,
    /// Wall-clock timestamp
    pub occurred_at: DateTime<Utc>,
    /// Milliseconds into the game
    pub elapsed_ms: i64,
}

/// A draft pick or ban.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftActionEvent {
    /// Pick or ban
    pub kind: DraftKind,
    /// Acting team identifier
    pub team_id: String,
    /// Acting team name, when the state carried one
    pub team_name: String,
    /// Drafted character identifier
    pub character_id: String,
    /// Drafted character name, when the state carried one
    pub character_name: String,
    /// Wall-clock timestamp
    pub occurred_at: DateTime<Utc>,
}

/// A round that finished with a winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResolvedEvent {
    /// Round sequence number, from the round's own state
    pub round: Option<u32>,
    /// Winning team identifier
    pub winner_id: String,
    /// Winning team name, when the state carried one
    pub winner_name: String,
    /// How the round was won (e.g. "elimination"), when reported
    pub win_type: Option<String>,
    /// Wall-clock timestamp
    pub occurred_at: DateTime<Utc>,
}

/// A completed bomb/spike plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantEvent {
    /// The planting player
    pub player: Participant,
    /// Round the plant happened in, as tracked from round markers
    pub round: Option<u32>,
    /// Map in play, as tracked from round markers
    pub map_name: String,
    /// Planting player position
    pub position: Option<Position>,
    /// Wall-clock timestamp
    pub occurred_at: DateTime<Utc>,
    /// Milliseconds into the round
    pub elapsed_ms: i64,
}

/// A completed bomb/spike defuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefuseEvent {
    /// The defusing player
    pub player: Participant,
    /// Round the defuse happened in, as tracked from round markers
    pub round: Option<u32>,
    /// Defusing player position
    pub position: Option<Position>,
    /// Wall-clock timestamp
    pub occurred_at: DateTime<Utc>,
    /// Milliseconds into the round
    pub elapsed_ms: i64,
}
