//! `opponent-seen`: cards opponents revealed, per match or per card

use super::{emit, read_log, scryfall_client};
use crate::config::Config;
use crate::error::{CollectionError, Result};
use crate::formatters::{to_csv, to_json};
use crate::matches::{aggregate_cards_by_match, parse_matches, EventKind, Match, MatchParseOptions};
use crate::resolver::{CardResolver, NameMode};
use crate::time_filter::TimeFilter;
use mtg_common::CardMeta;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SeenGrouping {
    #[default]
    Match,
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, clap::Args)]
pub struct OpponentSeenArgs {
    /// Output JSON instead of CSV
    #[arg(long)]
    pub json: bool,

    /// Write to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Number of matches to scan
    #[arg(long, default_value_t = crate::matches::DEFAULT_MATCH_LIMIT)]
    pub limit: usize,

    /// Relative time window (e.g. 24h, 7d, 2w)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub since: Option<String>,

    /// Start date (use with --to)
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// End date (use with --from)
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Only matches against this opponent name/tag
    #[arg(long)]
    pub opponent: Option<String>,

    #[arg(long, value_enum, default_value_t = SeenGrouping::Match)]
    pub group_by: SeenGrouping,

    /// Comma-separated event types to track
    #[arg(long, default_value = "cast,etb,revealed,move")]
    pub include: String,

    /// Skip Scryfall lookups
    #[arg(long)]
    pub no_names: bool,

    /// Use the Scryfall bulk dataset for name resolution
    #[arg(long)]
    pub bulk: bool,

    /// Custom path to Player.log
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Sort order for per-card results (by times seen)
    #[arg(long, value_enum)]
    pub sort: Option<SortOrder>,
}

impl Default for OpponentSeenArgs {
    fn default() -> Self {
        Self {
            json: false,
            out: None,
            limit: crate::matches::DEFAULT_MATCH_LIMIT,
            since: None,
            from: None,
            to: None,
            opponent: None,
            group_by: SeenGrouping::Match,
            include: "cast,etb,revealed,move".to_string(),
            no_names: false,
            bulk: false,
            log: None,
            sort: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchCardRow {
    pub match_id: String,
    pub started_at: String,
    pub opponent: String,
    pub card_name: Option<String>,
    pub set: Option<String>,
    pub collector_number: Option<String>,
    pub arena_id: u32,
    pub first_seen: EventKind,
    pub seen_count: u32,
}

#[derive(Debug, Clone, Serialize)]
struct MatchCardIdRow<'a> {
    match_id: &'a str,
    started_at: &'a str,
    opponent: &'a str,
    arena_id: u32,
    first_seen: EventKind,
    seen_count: u32,
}

impl MatchCardRow {
    fn without_names(&self) -> MatchCardIdRow<'_> {
        MatchCardIdRow {
            match_id: &self.match_id,
            started_at: &self.started_at,
            opponent: &self.opponent,
            arena_id: self.arena_id,
            first_seen: self.first_seen,
            seen_count: self.seen_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CardRow {
    pub arena_id: u32,
    pub card_name: Option<String>,
    pub set: Option<String>,
    pub collector_number: Option<String>,
    pub rarity: Option<String>,
    pub seen_total: u32,
    pub match_count: usize,
}

#[derive(Debug, Clone, Serialize)]
struct CardIdRow {
    arena_id: u32,
    seen_total: u32,
    match_count: usize,
}

#[derive(Serialize)]
struct Scope {
    matches_scanned: usize,
    unique_cards: usize,
}

/// Matches from the log after the time window and opponent filters
pub fn select_matches(text: &str, args: &OpponentSeenArgs) -> Result<Vec<Match>> {
    let options = MatchParseOptions {
        limit: args.limit,
        include: EventKind::parse_list(&args.include)?,
    };
    let parsed = parse_matches(text, &options);
    if parsed.is_empty() {
        return Err(CollectionError::NoLogData(
            "No matches found in the log. Ensure Detailed Logs (Plugin Support) are enabled \
             and you have played at least one match this session."
                .to_string(),
        ));
    }

    let window =
        TimeFilter::from_options(args.since.as_deref(), args.from.as_deref(), args.to.as_deref())?;
    let selected: Vec<Match> = parsed
        .into_iter()
        .filter(|m| window.contains(m.started_at))
        .filter(|m| {
            args.opponent
                .as_ref()
                .map_or(true, |wanted| m.opponent.as_ref() == Some(wanted))
        })
        .collect();
    if selected.is_empty() {
        return Err(CollectionError::NoLogData(
            "No matches found matching the specified filters.".to_string(),
        ));
    }
    Ok(selected)
}

pub fn match_rows(matches: &[Match], names: &HashMap<u32, CardMeta>) -> Vec<MatchCardRow> {
    let mut rows = Vec::new();
    for m in matches {
        for (arena_id, card) in &m.opponent_cards {
            let meta = names.get(arena_id);
            rows.push(MatchCardRow {
                match_id: m.match_id.clone(),
                started_at: m.started_at.to_rfc3339(),
                opponent: m.opponent.clone().unwrap_or_else(|| "Unknown".to_string()),
                card_name: meta.map(|c| c.name.clone()),
                set: meta.and_then(|c| c.set.clone()),
                collector_number: meta.and_then(|c| c.collector_number.clone()),
                arena_id: *arena_id,
                first_seen: card.first_seen,
                seen_count: card.seen_count,
            });
        }
    }
    rows
}

pub fn card_rows(
    matches: &[Match],
    names: &HashMap<u32, CardMeta>,
    sort: Option<SortOrder>,
) -> Vec<CardRow> {
    let mut rows: Vec<CardRow> = aggregate_cards_by_match(matches)
        .into_iter()
        .map(|(arena_id, aggregate)| {
            let meta = names.get(&arena_id);
            CardRow {
                arena_id,
                card_name: meta.map(|c| c.name.clone()),
                set: meta.and_then(|c| c.set.clone()),
                collector_number: meta.and_then(|c| c.collector_number.clone()),
                rarity: meta.and_then(|c| c.rarity.clone()),
                seen_total: aggregate.seen_total,
                match_count: aggregate.matches.len(),
            }
        })
        .collect();
    match sort {
        Some(SortOrder::Asc) => rows.sort_by_key(|row| row.seen_total),
        Some(SortOrder::Desc) => rows.sort_by(|a, b| b.seen_total.cmp(&a.seen_total)),
        None => {}
    }
    rows
}

fn render_by_match(
    rows: &[MatchCardRow],
    scanned: usize,
    args: &OpponentSeenArgs,
) -> Result<String> {
    if args.json {
        return to_json(&serde_json::json!({
            "matches_scanned": scanned,
            "cards": rows,
        }));
    }
    if args.no_names {
        let stripped: Vec<MatchCardIdRow<'_>> =
            rows.iter().map(MatchCardRow::without_names).collect();
        to_csv(&stripped)
    } else {
        to_csv(rows)
    }
}

fn render_by_card(rows: &[CardRow], scanned: usize, args: &OpponentSeenArgs) -> Result<String> {
    if args.json {
        let scope = Scope {
            matches_scanned: scanned,
            unique_cards: rows.len(),
        };
        return to_json(&serde_json::json!({ "scope": scope, "cards": rows }));
    }
    if args.no_names {
        let stripped: Vec<CardIdRow> = rows
            .iter()
            .map(|row| CardIdRow {
                arena_id: row.arena_id,
                seen_total: row.seen_total,
                match_count: row.match_count,
            })
            .collect();
        to_csv(&stripped)
    } else {
        to_csv(rows)
    }
}

pub async fn run(args: &OpponentSeenArgs, config: &Config, stdout: &mut dyn Write) -> Result<()> {
    let snapshot = read_log(config, args.log.as_ref()).await?;
    let matches = select_matches(&snapshot.text, args)?;
    log::info!("Scanning {} matches", matches.len());

    let resolver = if args.no_names {
        CardResolver::disabled()
    } else {
        let mode = NameMode::from_flags(false, args.bulk, false);
        CardResolver::prepare(mode, scryfall_client(config)).await
    };
    let ids = matches
        .iter()
        .flat_map(|m| m.opponent_cards.keys().copied())
        .collect::<Vec<_>>();
    let names = resolver.resolve_all(ids).await;

    let payload = match args.group_by {
        SeenGrouping::Match => render_by_match(&match_rows(&matches, &names), matches.len(), args)?,
        SeenGrouping::Card => {
            render_by_card(&card_rows(&matches, &names, args.sort), matches.len(), args)?
        }
    };
    emit(&payload, args.out.as_deref(), stdout)
}
