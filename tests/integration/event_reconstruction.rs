//! End-to-end reconstruction from archived JSONL to typed events

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use esports_data_ingest::bulk::parse_event_archive;
use esports_data_ingest::reconstruct::{DraftKind, ObjectiveKind, TypedDomainEvent};
use esports_data_ingest::reconstruct;

fn build_zip(jsonl: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("events.jsonl", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(jsonl.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// A condensed game: draft, game start, a kill with embedded clock, a dragon
/// take and a tower destruction.
fn lol_feed() -> String {
    [
        r#"{"id":"env-1","occurredAt":"2024-03-01T17:45:00Z","seriesId":"s-1","sequenceNumber":1,"events":[{"id":"e-1","action":"banned","actor":{"id":"t-1","type":"team","state":{"name":"Alpha"}},"target":{"id":"char-zed","type":"character","state":{"name":"Zed"}}}]}"#,
        r#"{"id":"env-2","occurredAt":"2024-03-01T17:46:00Z","seriesId":"s-1","sequenceNumber":2,"events":[{"id":"e-2","action":"picked","actor":{"id":"t-2","type":"team","state":{"name":"Bravo"}},"target":{"id":"char-ahri","type":"character","state":{"name":"Ahri"}}}]}"#,
        r#"{"id":"env-3","occurredAt":"2024-03-01T18:00:00Z","seriesId":"s-1","sequenceNumber":3,"events":[{"id":"e-3","action":"started","actor":{"id":"series-1","type":"series"},"target":{"id":"g-1","type":"game"}}]}"#,
        r#"{"id":"env-4","occurredAt":"2024-03-01T18:05:00Z","seriesId":"s-1","sequenceNumber":4,"events":[{"id":"e-4","action":"killed","actor":{"id":"p-1","type":"player","state":{"name":"TopAlpha","teamId":"t-1","game":{"position":{"x":100.0,"y":200.0},"killAssistsReceivedFromPlayer":[{"playerId":"p-3","killAssistsReceived":1}]}}},"target":{"id":"p-6","type":"player","state":{"name":"TopBravo","teamId":"t-2"}},"seriesState":{"games":[{"clock":{"currentSeconds":290}}]}}]}"#,
        r#"{"id":"env-5","occurredAt":"2024-03-01T18:12:00Z","seriesId":"s-1","sequenceNumber":5,"events":[{"id":"e-5","action":"killed","actor":{"id":"p-2","type":"player","state":{"name":"JglAlpha","teamId":"t-1"}},"target":{"id":"infernal-drake","type":"ATierNPC"}}]}"#,
        r#"{"id":"env-6","occurredAt":"2024-03-01T18:15:00Z","seriesId":"s-1","sequenceNumber":6,"events":[{"id":"e-6","action":"destroyed","actor":{"id":"t-1","type":"team","state":{"name":"Alpha"}},"target":{"id":"red-turret-mid-1","type":"tower"}}]}"#,
    ]
    .join("\n")
}

/// A condensed round-based game: round start with map, plant, defuse, round
/// win.
fn val_feed() -> String {
    [
        r#"{"id":"env-1","occurredAt":"2024-03-01T20:00:00Z","seriesId":"s-2","sequenceNumber":1,"events":[{"id":"e-1","action":"started","actor":{"id":"g-1","type":"game","state":{"map":{"name":"Ascent"}}},"target":{"id":"r-1","type":"round","state":{"sequenceNumber":1}}}]}"#,
        r#"{"id":"env-2","occurredAt":"2024-03-01T20:00:40Z","seriesId":"s-2","sequenceNumber":2,"events":[{"id":"e-2","action":"completed","actor":{"id":"p-1","type":"player","state":{"name":"Spike","teamId":"t-1","game":{"character":{"id":"c-1","name":"Jett"},"position":{"x":5.0,"y":9.0}}}},"target":{"id":"bomb","type":"plantBomb"}}]}"#,
        r#"{"id":"env-3","occurredAt":"2024-03-01T20:01:10Z","seriesId":"s-2","sequenceNumber":3,"events":[{"id":"e-3","action":"completed","actor":{"id":"p-6","type":"player","state":{"name":"Wire","teamId":"t-2"}},"target":{"id":"bomb","type":"defuseBomb"}}]}"#,
        r#"{"id":"env-4","occurredAt":"2024-03-01T20:01:15Z","seriesId":"s-2","sequenceNumber":4,"events":[{"id":"e-4","action":"won","actor":{"id":"t-2","type":"team","state":{"name":"Bravo"}},"target":{"id":"r-1","type":"round","state":{"sequenceNumber":1,"teams":[{"id":"t-1","won":false},{"id":"t-2","won":true,"winType":"defuse"}]}}}]}"#,
    ]
    .join("\n")
}

#[test]
fn test_lol_feed_reconstructs_draft_kill_objective_and_structure() {
    let download = parse_event_archive(&build_zip(&lol_feed())).unwrap();
    assert!(download.fatal.is_none());

    let reconstruction = reconstruct(&download.envelopes);
    assert_eq!(
        reconstruction.game_start,
        Some("2024-03-01T18:00:00Z".parse().unwrap())
    );
    assert_eq!(reconstruction.events.len(), 5);

    match &reconstruction.events[0] {
        TypedDomainEvent::DraftAction(ban) => {
            assert_eq!(ban.kind, DraftKind::Banned);
            assert_eq!(ban.team_name, "Alpha");
            assert_eq!(ban.character_name, "Zed");
        }
        other => panic!("expected ban, got {other:?}"),
    }

    match &reconstruction.events[2] {
        TypedDomainEvent::Kill(kill) => {
            assert!(kill.first_blood);
            assert_eq!(kill.killer.name, "TopAlpha");
            assert_eq!(kill.victim.team_id, "t-2");
            assert_eq!(kill.assist_ids, ["p-3"]);
            // Embedded clock (290s) wins over the 5 minute wall-clock delta.
            assert_eq!(kill.elapsed_ms, 290_000);
            assert!(kill.killer_position.is_some());
        }
        other => panic!("expected kill, got {other:?}"),
    }

    match &reconstruction.events[3] {
        TypedDomainEvent::ObjectiveCapture(capture) => {
            assert_eq!(capture.kind, ObjectiveKind::Dragon);
            assert_eq!(capture.player.team_id, "t-1");
            // No embedded clock: wall-clock delta from game start (12 min).
            assert_eq!(capture.elapsed_ms, 720_000);
        }
        other => panic!("expected objective capture, got {other:?}"),
    }

    match &reconstruction.events[4] {
        TypedDomainEvent::StructureDestroyed(destroyed) => {
            assert_eq!(destroyed.structure_id, "red-turret-mid-1");
            assert_eq!(destroyed.lane.as_deref(), Some("mid"));
            assert_eq!(destroyed.position_number, Some(1));
            assert_eq!(destroyed.team_id, "t-1");
        }
        other => panic!("expected structure destroyed, got {other:?}"),
    }
}

#[test]
fn test_val_feed_reconstructs_round_scoped_events() {
    let download = parse_event_archive(&build_zip(&val_feed())).unwrap();
    let reconstruction = reconstruct(&download.envelopes);

    assert_eq!(reconstruction.map_name, "Ascent");
    assert_eq!(reconstruction.events.len(), 3);

    match &reconstruction.events[0] {
        TypedDomainEvent::Plant(plant) => {
            assert_eq!(plant.round, Some(1));
            assert_eq!(plant.map_name, "Ascent");
            assert_eq!(plant.player.character, "Jett");
            // 40s after the round start marker.
            assert_eq!(plant.elapsed_ms, 40_000);
        }
        other => panic!("expected plant, got {other:?}"),
    }

    match &reconstruction.events[1] {
        TypedDomainEvent::Defuse(defuse) => {
            assert_eq!(defuse.round, Some(1));
            assert_eq!(defuse.player.name, "Wire");
            assert_eq!(defuse.elapsed_ms, 70_000);
        }
        other => panic!("expected defuse, got {other:?}"),
    }

    match &reconstruction.events[2] {
        TypedDomainEvent::RoundResolved(resolved) => {
            assert_eq!(resolved.round, Some(1));
            assert_eq!(resolved.winner_id, "t-2");
            assert_eq!(resolved.win_type.as_deref(), Some("defuse"));
        }
        other => panic!("expected round resolved, got {other:?}"),
    }
}

#[test]
fn test_empty_envelope_stream_reconstructs_to_nothing() {
    let reconstruction = reconstruct(&[]);
    assert!(reconstruction.events.is_empty());
    assert!(reconstruction.game_start.is_none());
    assert!(reconstruction.map_name.is_empty());
}
