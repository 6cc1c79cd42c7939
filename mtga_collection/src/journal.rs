//! Optional JSONL journal of command runs
//!
//! Enabled with `MTGA_TRACING_ENABLED=1` (or `true`); records land in
//! `<cache_dir>/traces/events.jsonl`. Write failures never affect the command.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const TRACING_ENV: &str = "MTGA_TRACING_ENABLED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Start,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalRecord {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub command: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn tracing_enabled(value: Option<&str>) -> bool {
    value.map_or(false, |raw| {
        let raw = raw.trim().to_ascii_lowercase();
        raw == "1" || raw == "true"
    })
}

#[derive(Debug, Clone)]
pub struct Journal {
    /// `None` when disabled
    path: Option<PathBuf>,
}

impl Journal {
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn from_env(cache_dir: &Path) -> Self {
        if tracing_enabled(std::env::var(TRACING_ENV).ok().as_deref()) {
            Self::to_file(cache_dir.join("traces").join("events.jsonl"))
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self, record: &JournalRecord) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = append_line(path, record) {
            log::warn!("Failed to write journal {}: {}", path.display(), e);
        }
    }

    /// Record a start and return the span that closes it
    pub fn start(&self, command: &str) -> JournalSpan<'_> {
        self.record(&JournalRecord {
            kind: RecordKind::Start,
            command: command.to_string(),
            timestamp: Utc::now(),
            elapsed_ms: None,
            message: None,
        });
        JournalSpan {
            journal: self,
            command: command.to_string(),
            started: Instant::now(),
        }
    }
}

fn append_line(path: &Path, record: &JournalRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())
}

pub struct JournalSpan<'a> {
    journal: &'a Journal,
    command: String,
    started: Instant,
}

impl JournalSpan<'_> {
    /// Error record (if any) followed by the closing success record with elapsed time
    pub fn finish<T, E: std::fmt::Display>(self, outcome: &Result<T, E>) {
        if let Err(e) = outcome {
            self.journal.record(&JournalRecord {
                kind: RecordKind::Error,
                command: self.command.clone(),
                timestamp: Utc::now(),
                elapsed_ms: None,
                message: Some(e.to_string()),
            });
        }
        self.journal.record(&JournalRecord {
            kind: RecordKind::Success,
            command: self.command,
            timestamp: Utc::now(),
            elapsed_ms: Some(self.started.elapsed().as_millis() as u64),
            message: None,
        });
    }
}
