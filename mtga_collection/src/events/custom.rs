//! Lightweight `{"event": "..."}` envelope

use super::{DrawEvent, LibraryEntry, LogEvent};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum Envelope {
    #[serde(rename_all = "camelCase")]
    MatchStart {
        #[serde(default, deserialize_with = "lenient_string")]
        match_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Draw {
        #[serde(default, deserialize_with = "lenient_string")]
        match_id: Option<String>,
        #[serde(default, deserialize_with = "lenient_u32")]
        owner_seat_id: Option<u32>,
        #[serde(default, deserialize_with = "lenient_u32")]
        grp_id: Option<u32>,
        #[serde(default, deserialize_with = "lenient_string")]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Mulligan {
        #[serde(default, deserialize_with = "lenient_string")]
        match_id: Option<String>,
        #[serde(default, deserialize_with = "lenient_u32")]
        owner_seat_id: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Library {
        #[serde(default, deserialize_with = "lenient_string")]
        match_id: Option<String>,
        #[serde(default, deserialize_with = "lenient_u32")]
        owner_seat_id: Option<u32>,
        #[serde(default, deserialize_with = "lenient_cards")]
        cards: Vec<Value>,
    },
}

// Optional fields of the wrong type read as absent instead of dropping the event.

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok()))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).map(str::to_string))
}

fn lenient_cards<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(cards)) => Ok(cards),
        _ => Ok(Vec::new()),
    }
}

/// Events from a custom envelope; empty when the object is not one
pub(super) fn parse(object: &Map<String, Value>) -> Vec<LogEvent> {
    if !object.get("event").is_some_and(Value::is_string) {
        return Vec::new();
    }
    let envelope: Envelope = match serde_json::from_value(Value::Object(object.clone())) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::trace!("Skipping custom event: {}", e);
            return Vec::new();
        }
    };

    match envelope {
        Envelope::MatchStart { match_id } => vec![LogEvent::MatchStart { match_id }],
        Envelope::Draw {
            match_id,
            owner_seat_id,
            grp_id,
            timestamp,
        } => vec![LogEvent::Draw(DrawEvent {
            match_id,
            owner_seat_id,
            grp_id,
            timestamp,
        })],
        Envelope::Mulligan {
            match_id,
            owner_seat_id,
        } => vec![LogEvent::Mulligan {
            match_id,
            owner_seat_id,
        }],
        Envelope::Library {
            match_id,
            owner_seat_id,
            cards,
        } => cards
            .iter()
            .filter_map(|card| {
                let grp_id = card.get("grpId")?.as_u64()?;
                let count = card.get("quantity")?.as_u64()?;
                Some(LogEvent::Library(LibraryEntry {
                    match_id: match_id.clone(),
                    grp_id: u32::try_from(grp_id).ok()?,
                    count: u32::try_from(count).ok()?,
                    owner_seat_id,
                }))
            })
            .collect(),
    }
}
