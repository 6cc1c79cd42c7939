//! Typed events decoded from Arena log text
//!
//! Two encodings are understood: a lightweight `{"event": ...}` envelope and the
//! client's structured `greToClientEvent` messages. Malformed lines contribute
//! nothing and never abort extraction.

mod custom;
pub mod json_slice;
mod protocol;

pub use json_slice::{extract_balanced_object, parse_line_object};

/// Seat assumed for the local player when none is configured
pub const DEFAULT_SEAT_ID: u32 = 1;

/// A card moving from library to hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawEvent {
    pub match_id: Option<String>,
    pub owner_seat_id: Option<u32>,
    pub grp_id: Option<u32>,
    pub timestamp: Option<String>,
}

/// One library entry: `count` copies of `grp_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub match_id: Option<String>,
    pub grp_id: u32,
    pub count: u32,
    pub owner_seat_id: Option<u32>,
}

/// Events extracted from the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    MatchStart { match_id: Option<String> },
    Draw(DrawEvent),
    Mulligan {
        match_id: Option<String>,
        owner_seat_id: Option<u32>,
    },
    Library(LibraryEntry),
}

/// Splits log text into events and selects the local player's draws
#[derive(Debug, Clone)]
pub struct EventExtractor {
    player_seat_id: u32,
}

impl Default for EventExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SEAT_ID)
    }
}

impl EventExtractor {
    pub fn new(player_seat_id: u32) -> Self {
        Self { player_seat_id }
    }

    pub fn player_seat_id(&self) -> u32 {
        self.player_seat_id
    }

    /// Decode every event in `text`, in log order
    pub fn parse_log_text(&self, text: &str) -> Vec<LogEvent> {
        let mut events = Vec::new();
        for line in text.lines() {
            if !line.contains('{') {
                continue;
            }
            let Some(object) = parse_line_object(line) else {
                continue;
            };
            let custom = custom::parse(&object);
            if !custom.is_empty() {
                events.extend(custom);
                continue;
            }
            events.extend(protocol::parse(&object));
        }
        events
    }

    /// Draws belonging to the player's seat; draws without a seat are kept
    pub fn filter_draws<'a>(&self, events: &'a [LogEvent]) -> Vec<&'a DrawEvent> {
        events
            .iter()
            .filter_map(|event| match event {
                LogEvent::Draw(draw)
                    if draw
                        .owner_seat_id
                        .map_or(true, |seat| seat == self.player_seat_id) =>
                {
                    Some(draw)
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
