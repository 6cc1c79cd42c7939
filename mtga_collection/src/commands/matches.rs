//! `matches-ingest` and `matches-stats`

use super::emit;
use crate::config::Config;
use crate::datastore::{load_matches, open_datastore};
use crate::error::Result;
use crate::formatters::{records_to_csv, to_json, Align, Table};
use crate::ingest::{ingest_matches, IngestReport};
use crate::stats::{aggregate_stats, filter_matches, MatchFilter, MatchStatRow, StatGroup};
use crate::time_filter::TimeFilter;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, clap::Args)]
pub struct MatchesIngestArgs {
    /// Custom path to Player.log
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Custom datastore path
    #[arg(long)]
    pub datastore: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct MatchesStatsArgs {
    #[arg(long, value_enum, default_value_t = StatGroup::Deck)]
    pub group_by: StatGroup,

    /// Only this queue
    #[arg(long)]
    pub queue: Option<String>,

    /// Only this deck name or deck id
    #[arg(long)]
    pub deck: Option<String>,

    /// Relative time window (e.g. 7d, 24h)
    #[arg(long)]
    pub since: Option<String>,

    /// Start date
    #[arg(long)]
    pub from: Option<String>,

    /// End date
    #[arg(long)]
    pub to: Option<String>,

    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Write CSV (or JSON with --json) to a file
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Custom datastore path
    #[arg(long)]
    pub datastore: Option<PathBuf>,
}

impl Default for MatchesStatsArgs {
    fn default() -> Self {
        Self {
            group_by: StatGroup::Deck,
            queue: None,
            deck: None,
            since: None,
            from: None,
            to: None,
            json: false,
            out: None,
            datastore: None,
        }
    }
}

fn datastore_path<'a>(custom: Option<&'a Path>, config: &'a Config) -> &'a Path {
    custom.unwrap_or(config.datastore_path.as_path())
}

pub fn ingest_message(report: &IngestReport) -> String {
    match report.added {
        0 => "No new matches found.\n".to_string(),
        1 => "Ingested 1 new match.\n".to_string(),
        n => format!("Ingested {} new matches.\n", n),
    }
}

pub async fn run_ingest(
    args: &MatchesIngestArgs,
    config: &Config,
    stdout: &mut dyn Write,
) -> Result<()> {
    let mut conn = open_datastore(datastore_path(args.datastore.as_deref(), config))?;
    let reader = config.snapshot_reader();
    let report = ingest_matches(&reader, args.log.as_deref(), &mut conn).await?;
    stdout.write_all(ingest_message(&report).as_bytes())?;
    Ok(())
}

fn win_rate_percent(row: &MatchStatRow) -> String {
    format!("{:.1}", row.win_rate * 100.0)
}

fn stat_records(rows: &[MatchStatRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            vec![
                row.key.clone(),
                row.matches.to_string(),
                row.wins.to_string(),
                row.losses.to_string(),
                row.draws.to_string(),
                win_rate_percent(row),
            ]
        })
        .collect()
}

/// Stats output: JSON, CSV when writing to a file, otherwise a text table
pub fn render_stats(
    rows: &[MatchStatRow],
    group: StatGroup,
    json: bool,
    to_file: bool,
) -> Result<String> {
    if json {
        return to_json(&serde_json::json!({
            "groupBy": group.label(),
            "matches": rows,
        }));
    }
    let headers = [group.label(), "Matches", "Wins", "Losses", "Draws", "Win Rate %"];
    let records = stat_records(rows);
    if to_file {
        return records_to_csv(&headers, &records);
    }
    let mut table = Table::new(&[
        (headers[0], Align::Left),
        (headers[1], Align::Right),
        (headers[2], Align::Right),
        (headers[3], Align::Right),
        (headers[4], Align::Right),
        (headers[5], Align::Right),
    ]);
    for record in records {
        table.push(record);
    }
    Ok(format!("{}\n", table.render()))
}

pub fn run_stats(args: &MatchesStatsArgs, config: &Config, stdout: &mut dyn Write) -> Result<()> {
    let conn = open_datastore(datastore_path(args.datastore.as_deref(), config))?;
    let stored = load_matches(&conn)?;
    let filter = MatchFilter {
        queue: args.queue.clone(),
        deck: args.deck.clone(),
        window: TimeFilter::from_options(
            args.since.as_deref(),
            args.from.as_deref(),
            args.to.as_deref(),
        )?,
    };
    let selected = filter_matches(&stored, &filter);
    log::info!(
        "{} of {} stored matches selected ({})",
        selected.len(),
        stored.len(),
        filter.window.describe()
    );

    let rows = aggregate_stats(&selected, &[args.group_by]);
    let payload = render_stats(&rows, args.group_by, args.json, args.out.is_some())?;
    emit(&payload, args.out.as_deref(), stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{make_test_match, MatchResult};

    fn rows() -> Vec<MatchStatRow> {
        let matches = vec![
            make_test_match("1", "2025-10-01T10:00:00Z", MatchResult::Win),
            make_test_match("2", "2025-10-02T10:00:00Z", MatchResult::Loss),
        ];
        aggregate_stats(&matches, &[StatGroup::Deck])
    }

    #[test]
    fn ingest_message_pluralizes() {
        let report = |added| IngestReport {
            parsed: 3,
            added,
            total: 3,
        };
        assert_eq!(ingest_message(&report(0)), "No new matches found.\n");
        assert_eq!(ingest_message(&report(1)), "Ingested 1 new match.\n");
        assert_eq!(ingest_message(&report(3)), "Ingested 3 new matches.\n");
    }

    #[test]
    fn stats_csv_uses_group_header() {
        let csv = render_stats(&rows(), StatGroup::Deck, false, true).unwrap();
        assert_eq!(
            csv,
            "deck,Matches,Wins,Losses,Draws,Win Rate %\nMono Red,2,1,1,0,50.0\n"
        );
    }

    #[test]
    fn stats_table_and_json() {
        let table = render_stats(&rows(), StatGroup::Deck, false, false).unwrap();
        assert!(table.starts_with("deck      Matches"));
        assert!(table.contains("Mono Red"));

        let json = render_stats(&rows(), StatGroup::Deck, true, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["groupBy"], "deck");
        assert_eq!(value["matches"][0]["winRate"], 0.5);
    }
}
