//! MTG Arena log tooling
//!
//! Reads the Arena client's `Player.log` to export the owned collection, list
//! cards opponents played, keep a local match history and show live draw odds
//! for a deck while a game is in progress.

pub mod collection;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod error;
pub mod events;
pub mod formatters;
pub mod ingest;
pub mod journal;
pub mod logs;
pub mod matches;
pub mod odds;
pub mod resolver;
pub mod stats;
pub mod time_filter;

pub use config::{Config, Settings};
pub use error::{CollectionError, Result};
pub use events::{DrawEvent, EventExtractor, LogEvent};
pub use logs::{LiveTailer, LogSnapshot, LogStreamPayload, SnapshotReader, TailOptions};
pub use odds::{DeckFile, OddsEngine};
