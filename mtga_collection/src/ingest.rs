//! Match summaries from the log into the datastore

use crate::datastore::{self, GameRecord, MatchRecord, MatchResult};
use crate::error::Result;
use crate::events::parse_line_object;
use crate::logs::SnapshotReader;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::path::Path;

const MATCH_SUMMARY_EVENT: &str = "matchSummary";

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key)?.as_str().map(str::to_string)
}

fn result(object: &Map<String, Value>) -> Option<MatchResult> {
    MatchResult::parse(object.get("result")?.as_str()?)
}

fn game_record(value: &Value) -> Option<GameRecord> {
    let game = value.as_object()?;
    Some(GameRecord {
        game_id: text(game, "gameId")?,
        result: result(game)?,
        opponent_archetype: text(game, "opponentArchetype"),
        duration_seconds: game
            .get("durationSeconds")
            .and_then(Value::as_f64)
            .filter(|secs| *secs >= 0.0)
            .map(|secs| secs.round() as u32),
    })
}

fn match_record(object: &Map<String, Value>) -> Option<MatchRecord> {
    if object.get("event").and_then(Value::as_str) != Some(MATCH_SUMMARY_EVENT) {
        return None;
    }
    Some(MatchRecord {
        match_id: text(object, "matchId")?,
        queue: text(object, "queue")?,
        deck_id: text(object, "deckId"),
        deck_name: text(object, "deckName"),
        opponent: text(object, "opponent"),
        opponent_archetype: text(object, "opponentArchetype"),
        started_at: text(object, "startedAt")?,
        ended_at: text(object, "endedAt"),
        result: result(object)?,
        games: object
            .get("games")
            .and_then(Value::as_array)
            .map(|games| games.iter().filter_map(game_record).collect())
            .unwrap_or_default(),
    })
}

/// `{"event":"matchSummary", ...}` lines as match records, in log order.
///
/// Summaries missing `matchId`, `queue`, `startedAt` or a known `result` are
/// skipped, as are malformed games inside an otherwise valid summary.
pub fn parse_match_summaries(text: &str) -> Vec<MatchRecord> {
    text.lines()
        .filter(|line| line.contains('{'))
        .filter_map(parse_line_object)
        .filter_map(|object| match_record(&object))
        .collect()
}

/// Outcome of one ingest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Summaries found in the log
    pub parsed: usize,
    /// Summaries not previously stored
    pub added: usize,
    pub total: i64,
}

/// Read the latest log snapshot and store match summaries not seen before
pub async fn ingest_matches(
    reader: &SnapshotReader,
    log_path: Option<&Path>,
    conn: &mut Connection,
) -> Result<IngestReport> {
    let snapshot = reader.read_latest(log_path).await?;
    if snapshot.from_cache {
        log::warn!("Ingesting from cached snapshot of {}", snapshot.primary_path.display());
    }
    let parsed = parse_match_summaries(&snapshot.text);

    let known = datastore::match_ids(conn)?;
    let mut fresh: Vec<MatchRecord> = Vec::new();
    for record in &parsed {
        let already_queued = fresh.iter().any(|f| f.match_id == record.match_id);
        if !known.contains(&record.match_id) && !already_queued {
            fresh.push(record.clone());
        }
    }

    if !fresh.is_empty() {
        datastore::upsert_matches(conn, &fresh)?;
    }
    let report = IngestReport {
        parsed: parsed.len(),
        added: fresh.len(),
        total: datastore::get_match_count(conn)?,
    };
    log::info!(
        "Ingested {} new of {} match summaries",
        report.added,
        report.parsed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SUMMARIES: &str = concat!(
        "[UnityCrossThreadLogger]2025-10-08 {\"event\":\"matchSummary\",\"matchId\":\"m1\",\"queue\":\"ranked\",",
        "\"deckName\":\"Mono Red\",\"startedAt\":\"2025-10-08T01:00:00Z\",\"result\":\"win\",",
        "\"games\":[{\"gameId\":\"g1\",\"result\":\"win\",\"durationSeconds\":312.4},{\"gameId\":7,\"result\":\"loss\"}]}\n",
        "{\"event\":\"matchSummary\",\"matchId\":\"m2\",\"queue\":\"play\",\"startedAt\":\"2025-10-08T02:00:00Z\",\"result\":\"loss\"}\n",
        "{\"event\":\"matchSummary\",\"matchId\":\"m3\",\"startedAt\":\"2025-10-08T03:00:00Z\",\"result\":\"loss\"}\n",
        "{\"event\":\"matchSummary\",\"matchId\":\"m4\",\"queue\":\"play\",\"startedAt\":\"x\",\"result\":\"forfeit\"}\n",
        "{\"event\":\"draw\",\"grpId\":1}\n",
    );

    #[test]
    fn parses_valid_summaries_only() {
        let matches = parse_match_summaries(SUMMARIES);
        assert_eq!(matches.len(), 2);

        let first = &matches[0];
        assert_eq!(first.match_id, "m1");
        assert_eq!(first.deck_name.as_deref(), Some("Mono Red"));
        assert_eq!(first.result, MatchResult::Win);
        assert_eq!(first.games.len(), 1);
        assert_eq!(first.games[0].duration_seconds, Some(312));

        assert_eq!(matches[1].queue, "play");
        assert!(matches[1].games.is_empty());
    }

    #[tokio::test]
    async fn ingest_adds_only_new_matches() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("Player.log");
        std::fs::write(&log, SUMMARIES).unwrap();
        let reader = SnapshotReader::new(vec![log.clone()], None);
        let mut conn = datastore::open_datastore(&dir.path().join("datastore.db")).unwrap();

        let first = ingest_matches(&reader, None, &mut conn).await.unwrap();
        assert_eq!(
            first,
            IngestReport {
                parsed: 2,
                added: 2,
                total: 2
            }
        );

        let again = ingest_matches(&reader, Some(&log), &mut conn).await.unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.total, 2);
    }

    #[tokio::test]
    async fn ingest_with_no_log_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let reader = SnapshotReader::new(vec![dir.path().join("missing.log")], None);
        let mut conn = datastore::open_datastore(&dir.path().join("datastore.db")).unwrap();
        let report = ingest_matches(&reader, None, &mut conn).await.unwrap();
        assert_eq!(report.parsed, 0);
        assert_eq!(report.total, 0);
    }
}
