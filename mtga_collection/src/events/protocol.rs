//! Structured `greToClientEvent` messages
//!
//! Only two message kinds matter here: zone changes (a library -> hand move is
//! a draw) and game-state snapshots (library zone contents).

use super::{DrawEvent, LibraryEntry, LogEvent};
use serde_json::{Map, Value};

const ZONE_CHANGE: &str = "GREMessageType_ZoneChange";
const GAME_STATE_MESSAGES: [&str; 2] = [
    "GREMessageType_QueuedGameStateMessage",
    "GREMessageType_GameStateMessage",
];

// Numeric zone ids used by the client when the zone name is absent
const LIBRARY_ZONE_ID: u64 = 2;
const HAND_ZONE_ID: u64 = 3;

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str()
}

fn u32_field(value: &Value, key: &str) -> Option<u32> {
    u32::try_from(value.get(key)?.as_u64()?).ok()
}

/// `"Hand"`, `"hand"` and `"ZoneType_Hand"` all name the same zone
fn zone_is(name: &str, zone: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.strip_prefix("zonetype_").unwrap_or(lower.as_str()) == zone
}

pub(super) fn parse(object: &Map<String, Value>) -> Vec<LogEvent> {
    let Some(messages) = object
        .get("greToClientEvent")
        .and_then(|gre| gre.get("greToClientMessages"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    let root_match_id = object.get("matchId").and_then(Value::as_str);

    let mut events = Vec::new();
    for message in messages.iter().filter(|m| m.is_object()) {
        match str_field(message, "type") {
            Some(ZONE_CHANGE) => {
                if let Some(draw) = zone_change_draw(message, root_match_id) {
                    events.push(LogEvent::Draw(draw));
                }
            }
            Some(kind) if GAME_STATE_MESSAGES.contains(&kind) => {
                library_entries(message, &mut events);
            }
            _ => {}
        }
    }
    events
}

fn zone_change_draw(message: &Value, root_match_id: Option<&str>) -> Option<DrawEvent> {
    let change = message.get("zoneChange")?;
    let grp_id = u32_field(change, "grpId")?;

    let enters_hand = str_field(change, "enterZone").is_some_and(|z| zone_is(z, "hand"))
        || change.get("zoneIdAfter").and_then(Value::as_u64) == Some(HAND_ZONE_ID);
    let leaves_library = str_field(change, "exitZone").is_some_and(|z| zone_is(z, "library"))
        || change.get("zoneIdBefore").and_then(Value::as_u64) == Some(LIBRARY_ZONE_ID);
    if !(enters_hand && leaves_library) {
        return None;
    }

    Some(DrawEvent {
        match_id: str_field(message, "matchId")
            .or(root_match_id)
            .map(str::to_string),
        owner_seat_id: u32_field(change, "ownerSeatId"),
        grp_id: Some(grp_id),
        timestamp: None,
    })
}

fn library_entries(message: &Value, events: &mut Vec<LogEvent>) {
    let Some(zones) = message
        .get("gameStateMessage")
        .and_then(|state| state.get("zones"))
        .and_then(Value::as_array)
    else {
        return;
    };
    let match_id = str_field(message, "matchId").map(str::to_string);

    let libraries = zones
        .iter()
        .filter(|zone| str_field(zone, "zoneType").is_some_and(|z| zone_is(z, "library")));
    for zone in libraries {
        let Some(objects) = zone.get("objects").and_then(Value::as_array) else {
            continue;
        };
        for object in objects {
            let Some(grp_id) = u32_field(object, "grpId") else {
                continue;
            };
            events.push(LogEvent::Library(LibraryEntry {
                match_id: match_id.clone(),
                grp_id,
                count: u32_field(object, "quantity").unwrap_or(1),
                owner_seat_id: u32_field(object, "ownerSeatId"),
            }));
        }
    }
}
