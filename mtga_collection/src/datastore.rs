//! SQLite storage for ingested match summaries
//!
//! Uses parameterized queries exclusively. Writes go through one transaction.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Result type for datastore operations
pub type DbResult<T> = rusqlite::Result<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

impl MatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResult::Win => "win",
            MatchResult::Loss => "loss",
            MatchResult::Draw => "draw",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "win" => Some(MatchResult::Win),
            "loss" => Some(MatchResult::Loss),
            "draw" => Some(MatchResult::Draw),
            _ => None,
        }
    }
}

impl ToSql for MatchResult {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MatchResult {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        MatchResult::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown match result '{}'", text).into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub game_id: String,
    pub result: MatchResult,
    pub opponent_archetype: Option<String>,
    pub duration_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub match_id: String,
    pub queue: String,
    pub deck_id: Option<String>,
    pub deck_name: Option<String>,
    pub opponent: Option<String>,
    pub opponent_archetype: Option<String>,
    /// As written by the client, normally RFC 3339
    pub started_at: String,
    pub ended_at: Option<String>,
    pub result: MatchResult,
    pub games: Vec<GameRecord>,
}

/// Initialize the datastore schema
///
/// - `matches`: one row per match summary
/// - `games`: games of a match, in log order
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS matches (
            match_id TEXT PRIMARY KEY,
            queue TEXT NOT NULL,
            deck_id TEXT,
            deck_name TEXT,
            opponent TEXT,
            opponent_archetype TEXT,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            result TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_matches_started ON matches(started_at);

        CREATE TABLE IF NOT EXISTS games (
            match_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            game_id TEXT NOT NULL,
            result TEXT NOT NULL,
            opponent_archetype TEXT,
            duration_seconds INTEGER,
            PRIMARY KEY (match_id, position),
            FOREIGN KEY (match_id) REFERENCES matches(match_id)
        );
        ",
    )?;

    log::debug!("Datastore schema initialized");
    Ok(())
}

/// Open (creating if needed) the datastore at `path`
pub fn open_datastore(path: &Path) -> crate::error::Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            log::info!("Created directory: {}", parent.display());
        }
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    log::debug!("Opened datastore: {}", path.display());
    Ok(conn)
}

/// Insert or replace matches and their games in one transaction
pub fn upsert_matches(conn: &mut Connection, matches: &[MatchRecord]) -> DbResult<usize> {
    let tx = conn.transaction()?;
    let count = upsert_matches_tx(&tx, matches)?;
    tx.commit()?;
    Ok(count)
}

fn upsert_matches_tx(tx: &Transaction<'_>, matches: &[MatchRecord]) -> DbResult<usize> {
    let mut insert_match = tx.prepare_cached(
        "INSERT OR REPLACE INTO matches
         (match_id, queue, deck_id, deck_name, opponent, opponent_archetype,
          started_at, ended_at, result, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))",
    )?;
    let mut clear_games = tx.prepare_cached("DELETE FROM games WHERE match_id = ?1")?;
    let mut insert_game = tx.prepare_cached(
        "INSERT INTO games
         (match_id, position, game_id, result, opponent_archetype, duration_seconds)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let mut count = 0;
    for record in matches {
        insert_match.execute(params![
            &record.match_id,
            &record.queue,
            &record.deck_id,
            &record.deck_name,
            &record.opponent,
            &record.opponent_archetype,
            &record.started_at,
            &record.ended_at,
            record.result,
        ])?;
        clear_games.execute(params![&record.match_id])?;
        for (position, game) in record.games.iter().enumerate() {
            insert_game.execute(params![
                &record.match_id,
                position as i64,
                &game.game_id,
                game.result,
                &game.opponent_archetype,
                game.duration_seconds,
            ])?;
        }
        count += 1;
    }

    log::info!("Upserted {} matches into datastore", count);
    Ok(count)
}

/// All matches, newest first
pub fn load_matches(conn: &Connection) -> DbResult<Vec<MatchRecord>> {
    let mut stmt = conn.prepare(
        "SELECT match_id, queue, deck_id, deck_name, opponent, opponent_archetype,
                started_at, ended_at, result
         FROM matches
         ORDER BY started_at DESC, match_id",
    )?;
    let mut matches: Vec<MatchRecord> = stmt
        .query_map([], |row| {
            Ok(MatchRecord {
                match_id: row.get(0)?,
                queue: row.get(1)?,
                deck_id: row.get(2)?,
                deck_name: row.get(3)?,
                opponent: row.get(4)?,
                opponent_archetype: row.get(5)?,
                started_at: row.get(6)?,
                ended_at: row.get(7)?,
                result: row.get(8)?,
                games: Vec::new(),
            })
        })?
        .collect::<DbResult<_>>()?;

    let mut games_stmt = conn.prepare_cached(
        "SELECT game_id, result, opponent_archetype, duration_seconds
         FROM games
         WHERE match_id = ?1
         ORDER BY position",
    )?;
    for record in &mut matches {
        record.games = games_stmt
            .query_map(params![&record.match_id], |row| {
                Ok(GameRecord {
                    game_id: row.get(0)?,
                    result: row.get(1)?,
                    opponent_archetype: row.get(2)?,
                    duration_seconds: row.get(3)?,
                })
            })?
            .collect::<DbResult<_>>()?;
    }
    Ok(matches)
}

pub fn match_ids(conn: &Connection) -> DbResult<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT match_id FROM matches")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<DbResult<HashSet<String>>>()?;
    Ok(ids)
}

pub fn get_match_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))
}

#[cfg(test)]
pub(crate) fn make_test_match(
    match_id: &str,
    started_at: &str,
    result: MatchResult,
) -> MatchRecord {
    MatchRecord {
        match_id: match_id.to_string(),
        queue: "ranked".to_string(),
        deck_id: None,
        deck_name: Some("Mono Red".to_string()),
        opponent: None,
        opponent_archetype: None,
        started_at: started_at.to_string(),
        ended_at: None,
        result,
        games: Vec::new(),
    }
}
