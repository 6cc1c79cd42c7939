//! Tests for event extraction

use super::*;

const SAMPLE_LOG: &str = r#"
[UnityCrossThreadLogger]2025-10-08T01:00:00Z {"event":"matchStart","matchId":"match-123"}
[UnityCrossThreadLogger]2025-10-08T01:00:02Z {"event":"library","matchId":"match-123","cards":[{"grpId":69172,"quantity":4},{"grpId":123,"quantity":20}]}
[UnityCrossThreadLogger]2025-10-08T01:00:05Z {"event":"draw","matchId":"match-123","ownerSeatId":1,"grpId":69172}
[UnityCrossThreadLogger]2025-10-08T01:00:06Z {"event":"draw","matchId":"match-123","ownerSeatId":1,"grpId":123}
"#;

fn draw_ids(extractor: &EventExtractor, text: &str) -> Vec<Option<u32>> {
    let events = extractor.parse_log_text(text);
    extractor
        .filter_draws(&events)
        .iter()
        .map(|d| d.grp_id)
        .collect()
}

#[test]
fn parses_custom_events_in_order() {
    let events = EventExtractor::default().parse_log_text(SAMPLE_LOG);
    assert_eq!(events.len(), 5);
    assert_eq!(
        events[0],
        LogEvent::MatchStart {
            match_id: Some("match-123".to_string())
        }
    );
    assert_eq!(
        events[1],
        LogEvent::Library(LibraryEntry {
            match_id: Some("match-123".to_string()),
            grp_id: 69172,
            count: 4,
            owner_seat_id: None,
        })
    );
    assert!(matches!(&events[4], LogEvent::Draw(d) if d.grp_id == Some(123)));
}

#[test]
fn filters_single_draw_for_seat() {
    let extractor = EventExtractor::new(1);
    let log = r#"{"event":"draw","ownerSeatId":1,"grpId":69172}"#;
    assert_eq!(draw_ids(&extractor, log), vec![Some(69172)]);
}

#[test]
fn excludes_other_seat_draws() {
    let extractor = EventExtractor::new(1);
    let log = concat!(
        r#"{"event":"draw","ownerSeatId":2,"grpId":5000}"#,
        "\n",
        r#"{"event":"draw","ownerSeatId":1,"grpId":69172}"#,
    );
    assert_eq!(draw_ids(&extractor, log), vec![Some(69172)]);
    assert_eq!(draw_ids(&EventExtractor::new(2), log), vec![Some(5000)]);
}

#[test]
fn seatless_draws_are_kept() {
    let extractor = EventExtractor::new(2);
    let log = r#"prefix {"event":"draw","grpId":42} suffix"#;
    assert_eq!(draw_ids(&extractor, log), vec![Some(42)]);
}

#[test]
fn mulligan_and_unknown_events() {
    let log = concat!(
        r#"{"event":"mulligan","matchId":"m1","ownerSeatId":1}"#,
        "\n",
        r#"{"event":"somethingElse","matchId":"m1"}"#,
    );
    let events = EventExtractor::default().parse_log_text(log);
    assert_eq!(
        events,
        vec![LogEvent::Mulligan {
            match_id: Some("m1".to_string()),
            owner_seat_id: Some(1)
        }]
    );
}

#[test]
fn malformed_lines_are_skipped() {
    let log = concat!(
        "plain text line\n",
        r#"{"event":"draw","grpId": }"#,
        "\n",
        r#"[Logger] {"event":"draw","ownerSeatId":1,"grpId":7"#,
        "\n",
        r#"{"event":"draw","ownerSeatId":1,"grpId":8}"#,
        "\r\n",
    );
    assert_eq!(draw_ids(&EventExtractor::default(), log), vec![Some(8)]);
}

#[test]
fn library_entries_need_numeric_fields() {
    let log = r#"{"event":"library","cards":[{"grpId":1,"quantity":2},{"grpId":"x","quantity":1},{"grpId":3}]}"#;
    let events = EventExtractor::default().parse_log_text(log);
    assert_eq!(events.len(), 1);
}

#[test]
fn zone_change_from_library_to_hand_is_a_draw() {
    let log = r#"[UnityCrossThreadLogger] {"matchId":"root-match","greToClientEvent":{"greToClientMessages":[{"type":"GREMessageType_ZoneChange","zoneChange":{"ownerSeatId":1,"grpId":69172,"enterZone":"Hand","exitZone":"Library"}}]}}"#;
    let events = EventExtractor::default().parse_log_text(log);
    assert_eq!(
        events,
        vec![LogEvent::Draw(DrawEvent {
            match_id: Some("root-match".to_string()),
            owner_seat_id: Some(1),
            grp_id: Some(69172),
            timestamp: None,
        })]
    );
}

#[test]
fn zone_change_by_numeric_zone_ids() {
    let log = r#"{"greToClientEvent":{"greToClientMessages":[{"type":"GREMessageType_ZoneChange","matchId":"m2","zoneChange":{"grpId":10,"zoneIdBefore":2,"zoneIdAfter":3}}]}}"#;
    let events = EventExtractor::default().parse_log_text(log);
    assert!(matches!(&events[..], [LogEvent::Draw(d)] if d.match_id.as_deref() == Some("m2")));
}

#[test]
fn zone_change_elsewhere_is_ignored() {
    let log = r#"{"greToClientEvent":{"greToClientMessages":[{"type":"GREMessageType_ZoneChange","zoneChange":{"grpId":10,"enterZone":"Battlefield","exitZone":"Hand"}}]}}"#;
    assert!(EventExtractor::default().parse_log_text(log).is_empty());
}

#[test]
fn game_state_library_zone_emits_library_entries() {
    let log = r#"{"greToClientEvent":{"greToClientMessages":[{"type":"GREMessageType_QueuedGameStateMessage","matchId":"m3","gameStateMessage":{"zones":[{"zoneType":"ZoneType_Hand","objects":[{"grpId":99}]},{"zoneType":"ZoneType_Library","objects":[{"grpId":11,"quantity":3,"ownerSeatId":1},{"grpId":12},{"noGrp":true}]}]}}]}}"#;
    let events = EventExtractor::default().parse_log_text(log);
    assert_eq!(
        events,
        vec![
            LogEvent::Library(LibraryEntry {
                match_id: Some("m3".to_string()),
                grp_id: 11,
                count: 3,
                owner_seat_id: Some(1),
            }),
            LogEvent::Library(LibraryEntry {
                match_id: Some("m3".to_string()),
                grp_id: 12,
                count: 1,
                owner_seat_id: None,
            }),
        ]
    );
}

#[test]
fn mistyped_optional_fields_keep_the_draw() {
    let log = r#"{"event":"draw","ownerSeatId":"1","grpId":69172,"matchId":7}"#;
    let events = EventExtractor::default().parse_log_text(log);
    assert_eq!(
        events,
        vec![LogEvent::Draw(DrawEvent {
            match_id: None,
            owner_seat_id: None,
            grp_id: Some(69172),
            timestamp: None,
        })]
    );
    // no seat means the draw is kept for any player
    assert_eq!(draw_ids(&EventExtractor::new(2), log), vec![Some(69172)]);
}
