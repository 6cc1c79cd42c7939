//! Win/loss aggregates over stored matches

use crate::datastore::{MatchRecord, MatchResult};
use crate::time_filter::{parse_date, TimeFilter};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum StatGroup {
    Deck,
    Queue,
    #[value(alias = "opponentArchetype")]
    OpponentArchetype,
}

impl StatGroup {
    pub fn label(&self) -> &'static str {
        match self {
            StatGroup::Deck => "deck",
            StatGroup::Queue => "queue",
            StatGroup::OpponentArchetype => "opponentArchetype",
        }
    }

    fn key<'a>(&self, record: &'a MatchRecord) -> Option<&'a str> {
        let key = match self {
            StatGroup::Deck => record.deck_name.as_deref().or(record.deck_id.as_deref()),
            StatGroup::Queue => Some(record.queue.as_str()),
            StatGroup::OpponentArchetype => record
                .opponent_archetype
                .as_deref()
                .or(record.opponent.as_deref()),
        };
        key.filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatRow {
    pub group: StatGroup,
    pub key: String,
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub queue: Option<String>,
    /// Deck name or deck id
    pub deck: Option<String>,
    pub window: TimeFilter,
}

impl MatchFilter {
    pub fn matches(&self, record: &MatchRecord) -> bool {
        if let Some(queue) = &self.queue {
            if &record.queue != queue {
                return false;
            }
        }
        if let Some(deck) = &self.deck {
            if record.deck_name.as_ref() != Some(deck) && record.deck_id.as_ref() != Some(deck) {
                return false;
            }
        }
        if self.window.is_unbounded() {
            return true;
        }
        match parse_date(&record.started_at) {
            Ok(started) => self.window.contains(started),
            Err(_) => {
                log::debug!(
                    "Match {} has unparseable start '{}', excluded from time window",
                    record.match_id,
                    record.started_at
                );
                false
            }
        }
    }
}

pub fn filter_matches(matches: &[MatchRecord], filter: &MatchFilter) -> Vec<MatchRecord> {
    matches
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect()
}

/// One row per (group, key), most matches first; ties keep first-seen order
pub fn aggregate_stats(matches: &[MatchRecord], groups: &[StatGroup]) -> Vec<MatchStatRow> {
    let mut rows: Vec<MatchStatRow> = Vec::new();
    for &group in groups {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for record in matches {
            let Some(key) = group.key(record) else {
                continue;
            };
            let position = *positions.entry(key).or_insert_with(|| {
                rows.push(MatchStatRow {
                    group,
                    key: key.to_string(),
                    matches: 0,
                    wins: 0,
                    losses: 0,
                    draws: 0,
                    win_rate: 0.0,
                });
                rows.len() - 1
            });
            let row = &mut rows[position];
            row.matches += 1;
            match record.result {
                MatchResult::Win => row.wins += 1,
                MatchResult::Loss => row.losses += 1,
                MatchResult::Draw => row.draws += 1,
            }
            row.win_rate = f64::from(row.wins) / f64::from(row.matches);
        }
    }
    rows.sort_by(|a, b| b.matches.cmp(&a.matches));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::make_test_match;

    fn sample() -> Vec<MatchRecord> {
        let mut matches = vec![
            make_test_match("1", "2025-10-01T10:00:00Z", MatchResult::Win),
            make_test_match("2", "2025-10-02T10:00:00Z", MatchResult::Loss),
            make_test_match("3", "2025-10-03T10:00:00Z", MatchResult::Win),
            make_test_match("4", "2025-10-04T10:00:00Z", MatchResult::Draw),
        ];
        matches[2].deck_name = None;
        matches[2].deck_id = Some("deck-uuid".to_string());
        matches[3].queue = "play".to_string();
        matches[3].opponent = Some("Rival".to_string());
        matches
    }

    #[test]
    fn aggregates_by_deck_sorted_by_count() {
        let rows = aggregate_stats(&sample(), &[StatGroup::Deck]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "Mono Red");
        assert_eq!(rows[0].matches, 3);
        assert_eq!((rows[0].wins, rows[0].losses, rows[0].draws), (1, 1, 1));
        assert!((rows[0].win_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(rows[1].key, "deck-uuid");
        assert_eq!(rows[1].win_rate, 1.0);
    }

    #[test]
    fn opponent_archetype_falls_back_to_opponent() {
        let rows = aggregate_stats(&sample(), &[StatGroup::OpponentArchetype]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "Rival");
    }

    #[test]
    fn multiple_groups_share_ordering() {
        let rows = aggregate_stats(&sample(), &[StatGroup::Queue, StatGroup::Deck]);
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["ranked", "Mono Red", "play", "deck-uuid"]);
    }

    #[test]
    fn filters_by_queue_deck_and_window() {
        let matches = sample();
        let by_queue = MatchFilter {
            queue: Some("play".to_string()),
            ..MatchFilter::default()
        };
        assert_eq!(filter_matches(&matches, &by_queue).len(), 1);

        let by_deck_id = MatchFilter {
            deck: Some("deck-uuid".to_string()),
            ..MatchFilter::default()
        };
        assert_eq!(filter_matches(&matches, &by_deck_id)[0].match_id, "3");

        let window = MatchFilter {
            window: TimeFilter::from_options(None, Some("2025-10-02"), Some("2025-10-03T23:59:59"))
                .unwrap(),
            ..MatchFilter::default()
        };
        let ids: Vec<String> = filter_matches(&matches, &window)
            .into_iter()
            .map(|m| m.match_id)
            .collect();
        assert_eq!(ids, vec!["2".to_string(), "3".to_string()]);
    }
}
