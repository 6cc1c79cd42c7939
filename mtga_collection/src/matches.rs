//! Opponent cards seen per match
//!
//! Needs detailed logging enabled in the client; only timestamped
//! `[UnityCrossThreadLogger]` lines that carry a JSON payload are considered.

use crate::error::{CollectionError, Result};
use crate::events::parse_line_object;
use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const QUEUED_GAME_STATE: &str = "GREMessageType_QueuedGameStateMessage";
const UI_MESSAGE: &str = "GREMessageType_UIMessage";
const REVEALED_CARDS: &str = "ClientMessageType_RevealedCards";

/// Matches returned when no limit is given
pub const DEFAULT_MATCH_LIMIT: usize = 10;

lazy_static! {
    static ref LINE_TIMESTAMP: Regex =
        Regex::new(r"\[UnityCrossThreadLogger\](\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})")
            .expect("valid timestamp regex");
}

/// How an opponent card became visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Cast,
    Etb,
    Revealed,
    Move,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Cast,
        EventKind::Etb,
        EventKind::Revealed,
        EventKind::Move,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Cast => "cast",
            EventKind::Etb => "etb",
            EventKind::Revealed => "revealed",
            EventKind::Move => "move",
        }
    }

    /// Comma-separated list such as `cast,etb`
    pub fn parse_list(list: &str) -> Result<Vec<EventKind>> {
        let mut kinds = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind = part.parse::<EventKind>()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return Err(CollectionError::InvalidInput(
                "event list is empty".to_string(),
            ));
        }
        Ok(kinds)
    }
}

impl FromStr for EventKind {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                CollectionError::InvalidInput(format!(
                    "unknown event type '{}' (expected cast, etb, revealed or move)",
                    s
                ))
            })
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSighting {
    pub arena_id: u32,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpponentCard {
    pub arena_id: u32,
    pub first_seen: EventKind,
    pub seen_count: u32,
    pub events: Vec<CardSighting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub match_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub opponent: Option<String>,
    pub opponent_cards: BTreeMap<u32, OpponentCard>,
}

impl Match {
    fn record(&mut self, arena_id: u32, kind: EventKind, timestamp: DateTime<Utc>) {
        let sighting = CardSighting {
            arena_id,
            kind,
            timestamp,
        };
        self.opponent_cards
            .entry(arena_id)
            .and_modify(|card| {
                card.seen_count += 1;
                card.events.push(sighting.clone());
            })
            .or_insert_with(|| OpponentCard {
                arena_id,
                first_seen: kind,
                seen_count: 1,
                events: vec![sighting.clone()],
            });
    }
}

#[derive(Debug, Clone)]
pub struct MatchParseOptions {
    pub limit: usize,
    pub include: Vec<EventKind>,
}

impl Default for MatchParseOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_MATCH_LIMIT,
            include: EventKind::ALL.to_vec(),
        }
    }
}

fn line_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let caps = LINE_TIMESTAMP.captures(line)?;
    NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn gre_messages(payload: &Map<String, Value>) -> &[Value] {
    payload
        .get("greToClientEvent")
        .and_then(|gre| gre.get("greToClientMessages"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Opponent game objects across every queued game-state message
fn opponent_objects<'a>(
    payload: &'a Map<String, Value>,
    player_seat: u64,
) -> impl Iterator<Item = &'a Value> {
    gre_messages(payload)
        .iter()
        .filter(|msg| msg.get("type").and_then(Value::as_str) == Some(QUEUED_GAME_STATE))
        .flat_map(move |msg| opponent_objects_in(msg, player_seat))
}

/// Classify a payload by the first opponent object's zone or a reveal message
fn detect_event_kind(payload: &Map<String, Value>, player_seat: u64) -> Option<EventKind> {
    for msg in gre_messages(payload) {
        match msg.get("type").and_then(Value::as_str) {
            Some(QUEUED_GAME_STATE) => {
                let zoned = opponent_objects_in(msg, player_seat)
                    .find_map(|obj| zone_event(obj.get("zoneId").and_then(Value::as_u64)?));
                if zoned.is_some() {
                    return zoned;
                }
            }
            Some(UI_MESSAGE) => {
                let ui_type = msg
                    .get("uiMessage")
                    .and_then(|ui| ui.get("type"))
                    .and_then(Value::as_str);
                if ui_type == Some(REVEALED_CARDS) {
                    return Some(EventKind::Revealed);
                }
            }
            _ => {}
        }
    }
    None
}

/// Objects with a card id owned by anyone other than `player_seat`
fn opponent_objects_in(msg: &Value, player_seat: u64) -> impl Iterator<Item = &Value> {
    msg.get("gameStateMessage")
        .and_then(|state| state.get("gameObjects"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |obj| {
            obj.get("ownerSeatId").and_then(Value::as_u64) != Some(player_seat)
                && obj.get("grpId").and_then(Value::as_u64).unwrap_or(0) != 0
        })
}

fn zone_event(zone_id: u64) -> Option<EventKind> {
    match zone_id {
        4 => Some(EventKind::Cast),
        2 => Some(EventKind::Etb),
        3 | 5 => Some(EventKind::Move),
        _ => None,
    }
}

/// Split log text into matches with the opponent cards seen in each.
///
/// A match still open at the end of the text is included. At most
/// `options.limit` matches are returned, oldest first.
pub fn parse_matches(text: &str, options: &MatchParseOptions) -> Vec<Match> {
    let mut matches = Vec::new();
    let mut current: Option<Match> = None;
    let mut player_seat: u64 = 1;

    if options.limit == 0 {
        return matches;
    }

    for line in text.lines() {
        let Some(timestamp) = line_timestamp(line) else {
            continue;
        };
        let Some(payload) = parse_line_object(line) else {
            continue;
        };

        if line.contains("MatchCreated") {
            let match_id = payload
                .get("matchId")
                .or_else(|| payload.get("params").and_then(|p| p.get("matchId")))
                .and_then(id_string)
                .unwrap_or_else(|| format!("match_{}", timestamp.timestamp_millis()));
            current = Some(Match {
                match_id,
                started_at: timestamp,
                ended_at: None,
                opponent: payload
                    .get("opponentScreenName")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                opponent_cards: BTreeMap::new(),
            });
        }

        if let Some(seat) = payload.get("playerId").and_then(Value::as_u64) {
            player_seat = seat;
        }

        if let Some(open) = current.as_mut() {
            if let Some(kind) = detect_event_kind(&payload, player_seat) {
                if options.include.contains(&kind) {
                    let arena_ids: Vec<u32> = opponent_objects(&payload, player_seat)
                        .filter_map(|obj| obj.get("grpId")?.as_u64())
                        .filter_map(|id| u32::try_from(id).ok())
                        .collect();
                    for arena_id in arena_ids {
                        open.record(arena_id, kind, timestamp);
                    }
                }
            }
        }

        if line.contains("MatchCompleted") || line.contains("Event_MatchEnd") {
            if let Some(mut finished) = current.take() {
                finished.ended_at = Some(timestamp);
                matches.push(finished);
                if matches.len() >= options.limit {
                    return matches;
                }
            }
        }
    }

    if let Some(open) = current {
        matches.push(open);
    }
    matches.truncate(options.limit);
    matches
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardAggregate {
    pub seen_total: u32,
    pub matches: Vec<String>,
}

/// Sightings per arena id across matches
pub fn aggregate_cards_by_match(matches: &[Match]) -> BTreeMap<u32, CardAggregate> {
    let mut aggregated: BTreeMap<u32, CardAggregate> = BTreeMap::new();
    for m in matches {
        for (arena_id, card) in &m.opponent_cards {
            let entry = aggregated.entry(*arena_id).or_insert_with(|| CardAggregate {
                seen_total: 0,
                matches: Vec::new(),
            });
            entry.seen_total += card.seen_count;
            entry.matches.push(m.match_id.clone());
        }
    }
    aggregated
}
