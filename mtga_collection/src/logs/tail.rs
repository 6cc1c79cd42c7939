//! Follow a growing log file and yield appended bytes
//!
//! State per poll tick: uninitialized (no offset yet, or file gone) or tracking
//! an offset. A file smaller than the tracked offset is treated as rotated and
//! re-read from zero. That heuristic cannot tell a truncate-and-rewrite from a
//! replacement with a different file; both restart at offset 0.

use super::retry::{is_lock_contention, wait_until_accessible, RetryPolicy};
use super::source::{FsSource, LogSource};
use super::LogStreamPayload;
use crate::error::{CollectionError, Result};
use async_stream::try_stream;
use futures::Stream;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct TailOptions {
    pub path: PathBuf,
    /// Tried in order when `path` disappears
    pub alternates: Vec<PathBuf>,
    pub poll_interval: Duration,
    /// Start at end-of-file on the first tick instead of replaying from zero
    pub start_at_end: bool,
    pub retry: RetryPolicy,
}

impl TailOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            alternates: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_at_end: true,
            retry: RetryPolicy::default(),
        }
    }

    pub fn alternates(mut self, alternates: Vec<PathBuf>) -> Self {
        self.alternates = alternates;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn start_at_end(mut self, start_at_end: bool) -> Self {
        self.start_at_end = start_at_end;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TailState {
    Uninitialized,
    Tracking { offset: u64 },
}

pub struct LiveTailer {
    options: TailOptions,
    source: Arc<dyn LogSource>,
}

impl LiveTailer {
    pub fn new(options: TailOptions) -> Self {
        Self::with_source(options, Arc::new(FsSource))
    }

    pub fn with_source(options: TailOptions, source: Arc<dyn LogSource>) -> Self {
        Self { options, source }
    }

    /// Endless stream of appended text, ending only when `cancel` fires or an
    /// unrecoverable I/O error is yielded. Missing files are waited for.
    pub fn into_stream(
        self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<LogStreamPayload>> {
        let options = self.options;
        let source = self.source;
        try_stream! {
            let mut current = options.path.clone();
            let mut state = TailState::Uninitialized;
            let mut first_tick = true;

            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let stat = source.stat(&current).await;
                if cancel.is_cancelled() {
                    break;
                }
                let start_at_end = first_tick && options.start_at_end;
                first_tick = false;

                match stat {
                    Ok(stat) => {
                        let size = stat.len;
                        let offset = match state {
                            TailState::Uninitialized if start_at_end => size,
                            TailState::Uninitialized => 0,
                            TailState::Tracking { offset } if size < offset => {
                                log::info!(
                                    "{} shrank from {} to {} bytes, treating as rotated",
                                    current.display(),
                                    offset,
                                    size
                                );
                                0
                            }
                            TailState::Tracking { offset } => offset,
                        };
                        state = TailState::Tracking { offset };

                        if size > offset {
                            match source.read_range(&current, offset, size).await {
                                Ok(data) => {
                                    if cancel.is_cancelled() {
                                        break;
                                    }
                                    let (text, consumed) = decode_complete(&data);
                                    if consumed > 0 {
                                        let next_offset = offset + consumed as u64;
                                        state = TailState::Tracking { offset: next_offset };
                                        yield LogStreamPayload {
                                            path: current.clone(),
                                            data: text,
                                            offset: next_offset,
                                            size,
                                        };
                                    }
                                }
                                Err(e) if is_lock_contention(&e) => {
                                    log::debug!("{} busy during read: {}", current.display(), e);
                                    let retry = &options.retry;
                                    wait_until_accessible(&*source, &current, retry, &cancel).await;
                                }
                                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                                    state = TailState::Uninitialized;
                                }
                                Err(e) => {
                                    Err::<(), CollectionError>(e.into())?;
                                }
                            }
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        if let Some(alternate) =
                            accessible_alternate(&*source, &options, &current).await
                        {
                            log::info!(
                                "{} is gone, switching to {}",
                                current.display(),
                                alternate.display()
                            );
                            current = alternate;
                            state = TailState::Tracking { offset: 0 };
                            continue;
                        }
                        if state != TailState::Uninitialized {
                            log::debug!("{} disappeared, waiting for it", current.display());
                        }
                        state = TailState::Uninitialized;
                    }
                    Err(e) if is_lock_contention(&e) => {
                        log::debug!("{} busy during stat: {}", current.display(), e);
                        wait_until_accessible(&*source, &current, &options.retry, &cancel).await;
                    }
                    Err(e) => {
                        Err::<(), CollectionError>(e.into())?;
                    }
                }

                if cancel.is_cancelled() {
                    break;
                }
                let cancelled = tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(options.poll_interval) => false,
                };
                if cancelled {
                    break;
                }
            }
            log::debug!("Stopped tailing {}", current.display());
        }
    }
}

/// First candidate other than `current` that exists and opens
async fn accessible_alternate(
    source: &dyn LogSource,
    options: &TailOptions,
    current: &Path,
) -> Option<PathBuf> {
    let candidates = std::iter::once(&options.path).chain(options.alternates.iter());
    for candidate in candidates {
        if candidate == current {
            continue;
        }
        if source.probe(candidate).await.is_ok() {
            return Some(candidate.clone());
        }
    }
    None
}

/// Decode `data` up to the last complete character.
///
/// Returns the text and the number of bytes it covers. A multi-byte
/// character cut off at the end is left for the next read; invalid bytes
/// elsewhere become U+FFFD.
fn decode_complete(data: &[u8]) -> (String, usize) {
    let mut text = String::with_capacity(data.len());
    let mut rest = data;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                return (text, data.len());
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                text.push_str(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None => return (text, data.len() - after.len()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
