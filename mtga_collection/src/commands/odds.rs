//! `odds-watch`: live draw odds for tracked cards

use crate::config::Config;
use crate::error::Result;
use crate::events::EventExtractor;
use crate::logs::{LiveTailer, TailOptions};
use crate::odds::{DeckFile, OddsEngine};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct OddsWatchArgs {
    /// Path to the deck JSON file
    #[arg(long)]
    pub deck: PathBuf,

    /// Custom path to Player.log
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Track a specific arena_id (repeatable)
    #[arg(long)]
    pub track: Vec<u32>,

    /// Player seat id
    #[arg(long)]
    pub seat: Option<u32>,

    /// Process the current log once and exit
    #[arg(long)]
    pub replay: bool,

    /// Stop after this many rendered updates (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_updates: usize,

    /// Poll interval in milliseconds for live mode
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

/// One watch session: the odds state plus the extractor feeding it.
///
/// Chunks from the tailer may end mid-line; the incomplete tail is held
/// back until the rest of the line arrives.
#[derive(Debug)]
pub struct OddsSession {
    engine: OddsEngine,
    extractor: EventExtractor,
    pending: String,
}

impl OddsSession {
    pub fn new(engine: OddsEngine, extractor: EventExtractor) -> Self {
        Self {
            engine,
            extractor,
            pending: String::new(),
        }
    }

    pub fn from_deck(deck: &DeckFile, tracked: &[u32], seat_id: u32) -> Self {
        Self::new(OddsEngine::from_deck(deck, tracked), EventExtractor::new(seat_id))
    }

    pub fn engine(&self) -> &OddsEngine {
        &self.engine
    }

    /// Apply the complete lines of `chunk`; returns the number of draws applied
    pub fn process_chunk(&mut self, chunk: &str) -> usize {
        self.pending.push_str(chunk);
        let Some(end) = self.pending.rfind('\n') else {
            return 0;
        };
        let complete: String = self.pending.drain(..=end).collect();
        self.apply_text(&complete)
    }

    /// Apply any held-back partial line
    pub fn flush(&mut self) -> usize {
        let rest = std::mem::take(&mut self.pending);
        self.apply_text(&rest)
    }

    /// Apply a complete text such as a snapshot
    pub fn process_text(&mut self, text: &str) -> usize {
        self.process_chunk(text) + self.flush()
    }

    fn apply_text(&mut self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }
        let events = self.extractor.parse_log_text(text);
        let draws = self.extractor.filter_draws(&events);
        for draw in &draws {
            self.engine.apply_draw(draw);
        }
        if !draws.is_empty() {
            log::debug!(
                "Applied {} draws, library now {}",
                draws.len(),
                self.engine.library_size()
            );
        }
        draws.len()
    }

    /// The odds table, or `None` when nothing is tracked
    pub fn render(&self) -> Result<Option<String>> {
        if self.engine.groups().is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("\n{}\n", self.engine.render()?)))
    }
}

/// Render once from the latest snapshot
pub async fn run_replay(
    session: &mut OddsSession,
    args: &OddsWatchArgs,
    config: &Config,
    stdout: &mut dyn Write,
) -> Result<()> {
    let snapshot = config
        .snapshot_reader()
        .read_latest(args.log.as_deref())
        .await?;
    let draws = session.process_text(&snapshot.text);
    log::info!(
        "Replayed {} bytes from {} ({} draws)",
        snapshot.byte_length,
        snapshot.primary_path.display(),
        draws
    );
    if let Some(table) = session.render()? {
        stdout.write_all(table.as_bytes())?;
    }
    Ok(())
}

/// Tail the log and re-render after every chunk until `cancel` fires or
/// `max_updates` renders were written. Returns the number of renders.
pub async fn watch_live(
    session: &mut OddsSession,
    options: TailOptions,
    cancel: CancellationToken,
    max_updates: usize,
    stdout: &mut dyn Write,
) -> Result<usize> {
    let stream = LiveTailer::new(options).into_stream(cancel.clone());
    tokio::pin!(stream);

    let mut updates = 0;
    while let Some(payload) = stream.next().await {
        let payload = payload?;
        session.process_chunk(&payload.data);
        let Some(table) = session.render()? else {
            continue;
        };
        stdout.write_all(table.as_bytes())?;
        stdout.flush()?;
        updates += 1;
        if max_updates > 0 && updates >= max_updates {
            cancel.cancel();
            break;
        }
    }
    Ok(updates)
}

pub fn tail_options(args: &OddsWatchArgs, config: &Config) -> TailOptions {
    let poll_interval = args
        .poll_interval
        .map(Duration::from_millis)
        .unwrap_or(config.poll_interval);
    let options = match &args.log {
        Some(custom) => TailOptions::new(custom),
        None => TailOptions::new(&config.log_path)
            .alternates(vec![config.previous_log_path.clone()]),
    };
    options.poll_interval(poll_interval).start_at_end(false)
}

pub async fn run(args: &OddsWatchArgs, config: &Config, stdout: &mut dyn Write) -> Result<()> {
    let deck = DeckFile::load(&args.deck)?;
    let seat_id = args.seat.unwrap_or(config.seat_id);
    let mut session = OddsSession::from_deck(&deck, &args.track, seat_id);
    log::info!(
        "Tracking {} groups over {} cards (seat {})",
        session.engine().groups().len(),
        session.engine().library_size(),
        seat_id
    );

    if args.replay {
        return run_replay(&mut session, args, config, stdout).await;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, stopping watch");
            on_interrupt.cancel();
        }
    });

    let updates = watch_live(
        &mut session,
        tail_options(args, config),
        cancel,
        args.max_updates,
        stdout,
    )
    .await?;
    log::info!("Watch finished after {} updates", updates);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::DeckGroup;
    use std::collections::HashMap;

    const DRAW_LAND: &str = "{\"event\":\"draw\",\"ownerSeatId\":1,\"grpId\":10}\n";
    const DRAW_OTHER_SEAT: &str = "{\"event\":\"draw\",\"ownerSeatId\":2,\"grpId\":10}\n";

    fn session() -> OddsSession {
        let groups = vec![DeckGroup {
            id: "lands".to_string(),
            label: "Lands".to_string(),
            arena_ids: vec![10],
        }];
        let engine = OddsEngine::new(52, &groups, &HashMap::from([(10, 22)]));
        OddsSession::new(engine, EventExtractor::new(1))
    }

    #[test]
    fn partial_lines_wait_for_completion() {
        let mut session = session();
        let (head, tail) = DRAW_LAND.split_at(20);

        assert_eq!(session.process_chunk(head), 0);
        assert_eq!(session.engine().library_size(), 52);

        assert_eq!(session.process_chunk(tail), 1);
        assert_eq!(session.engine().library_size(), 51);
        assert_eq!(session.engine().groups()[0].remaining, 21);
    }

    #[test]
    fn other_seats_are_ignored() {
        let mut session = session();
        assert_eq!(session.process_text(DRAW_OTHER_SEAT), 0);
        assert_eq!(session.engine().library_size(), 52);
    }

    #[test]
    fn process_text_applies_unterminated_last_line() {
        let mut session = session();
        let text = format!("{}{}", DRAW_LAND, DRAW_LAND.trim_end());
        assert_eq!(session.process_text(&text), 2);
        assert_eq!(session.engine().groups()[0].remaining, 20);
    }

    #[test]
    fn render_wraps_table() {
        let rendered = session().render().unwrap().unwrap();
        assert!(rendered.starts_with("\nLibrary size: 52\n"));
        assert!(rendered.ends_with('\n'));

        let empty = OddsSession::new(
            OddsEngine::new(10, &[], &HashMap::new()),
            EventExtractor::default(),
        );
        assert!(empty.render().unwrap().is_none());
    }
}
