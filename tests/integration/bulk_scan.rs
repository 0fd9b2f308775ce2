//! Integration tests for bulk archive decoding

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use esports_data_ingest::bulk::parse_event_archive;
use esports_data_ingest::ClientError;

fn envelope_line(sequence: i64, occurred_at: &str) -> String {
    format!(
        r#"{{"id":"env-{sequence}","occurredAt":"{occurred_at}","seriesId":"s-1","sequenceNumber":{sequence},"events":[{{"id":"ev-{sequence}","action":"paused"}}]}}"#
    )
}

fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_archive_with_multiple_members_preserves_arrival_order() {
    let member_a: String = (0..100)
        .map(|i| envelope_line(i, "2024-03-01T18:00:00Z") + "\n")
        .collect();
    let member_b: String = (100..150)
        .map(|i| envelope_line(i, "2024-03-01T19:00:00Z") + "\n")
        .collect();

    let zip = build_zip(&[
        ("events-1.jsonl", member_a.as_bytes()),
        ("events-2.jsonl", member_b.as_bytes()),
    ]);

    let download = parse_event_archive(&zip).unwrap();
    assert!(download.fatal.is_none());
    assert_eq!(download.envelopes.len(), 150);

    let sequences: Vec<i64> = download
        .envelopes
        .iter()
        .map(|e| e.sequence_number)
        .collect();
    let expected: Vec<i64> = (0..150).collect();
    assert_eq!(sequences, expected);
}

#[test]
fn test_mixed_good_and_bad_lines_decode_best_effort() {
    let mut member = String::new();
    member.push_str(&envelope_line(1, "2024-03-01T18:00:00Z"));
    member.push('\n');
    member.push_str("this is not json\n");
    member.push_str("{\"partial\":\n");
    member.push('\n');
    member.push_str(&envelope_line(2, "2024-03-01T18:00:05Z"));
    member.push('\n');

    let zip = build_zip(&[("events.jsonl", member.as_bytes())]);
    let download = parse_event_archive(&zip).unwrap();

    assert!(download.fatal.is_none());
    assert_eq!(download.envelopes.len(), 2);
    assert_eq!(download.envelopes[1].sequence_number, 2);
}

#[test]
fn test_empty_archive_yields_empty_download() {
    let zip = build_zip(&[]);
    let download = parse_event_archive(&zip).unwrap();
    assert!(download.envelopes.is_empty());
    assert!(download.fatal.is_none());
}

#[test]
fn test_corrupt_archive_is_reported_as_archive_error() {
    let err = parse_event_archive(&[0x50, 0x4b, 0x00, 0x00, 0xff]).unwrap_err();
    assert!(matches!(err, ClientError::Archive(_)));
}

#[test]
fn test_decoded_envelopes_carry_their_events() {
    let member = envelope_line(7, "2024-03-01T18:00:00Z") + "\n";
    let zip = build_zip(&[("events.jsonl", member.as_bytes())]);

    let download = parse_event_archive(&zip).unwrap();
    let envelope = &download.envelopes[0];
    assert_eq!(envelope.series_id, "s-1");
    assert_eq!(envelope.events.len(), 1);
    assert_eq!(envelope.events[0].action, "paused");
}
