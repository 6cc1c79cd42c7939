//! Reading the Arena client log
//!
//! [`SnapshotReader`] produces one combined, point-in-time view of the current
//! and previous log files, caching each live read in a bounded on-disk ring.
//! [`LiveTailer`] follows a single growing file and yields appended bytes.

pub mod retry;
pub mod snapshot;
pub mod source;
pub mod tail;

pub use retry::{is_lock_contention, RetryPolicy};
pub use snapshot::{SnapshotMeta, SnapshotReader, SnapshotStore};
pub use source::{FileStat, FsSource, LogSource};
pub use tail::{LiveTailer, TailOptions};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const PLAYER_LOG: &str = "Player.log";
pub const PREVIOUS_PLAYER_LOG: &str = "Player-prev.log";

/// `~/Library/Logs/Wizards Of The Coast/MTGA`
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Library")
        .join("Logs")
        .join("Wizards Of The Coast")
        .join("MTGA")
}

/// Current log followed by the rotated previous one
pub fn default_log_paths() -> Vec<PathBuf> {
    let dir = default_log_dir();
    vec![dir.join(PLAYER_LOG), dir.join(PREVIOUS_PLAYER_LOG)]
}

/// Combined read of one or more log files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub primary_path: PathBuf,
    /// Contributing files in the order their text was combined
    pub paths: Vec<PathBuf>,
    pub text: String,
    pub byte_length: usize,
    pub modified: BTreeMap<PathBuf, DateTime<Utc>>,
    pub from_cache: bool,
}

impl LogSnapshot {
    pub fn empty(primary_path: PathBuf) -> Self {
        Self {
            primary_path,
            paths: Vec::new(),
            text: String::new(),
            byte_length: 0,
            modified: BTreeMap::new(),
            from_cache: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Bytes appended to a tailed file since the previous poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStreamPayload {
    pub path: PathBuf,
    pub data: String,
    /// Offset just past `data`
    pub offset: u64,
    /// File size when the delta was read
    pub size: u64,
}
