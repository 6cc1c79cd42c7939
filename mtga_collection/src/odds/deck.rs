//! Deck definition files for odds tracking
//!
//! ```json
//! {"cards": [{"arena_id": 69172, "name": "Lightning Strike", "quantity": 4}],
//!  "groups": [{"id": "burn", "label": "Burn", "arena_ids": [69172]}]}
//! ```

use crate::error::{CollectionError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Groups synthesized from the head of the decklist when none are given
const DEFAULT_GROUP_COUNT: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct DeckCard {
    pub arena_id: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeckGroup {
    pub id: String,
    pub label: String,
    pub arena_ids: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeckFile {
    pub cards: Vec<DeckCard>,
    #[serde(default)]
    pub groups: Option<Vec<DeckGroup>>,
}

impl DeckFile {
    /// Read and validate a deck file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse and validate deck JSON
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| CollectionError::InvalidDeck(format!("not valid JSON: {}", e)))?;

        let cards = value
            .get("cards")
            .and_then(Value::as_array)
            .filter(|cards| !cards.is_empty())
            .ok_or_else(|| {
                CollectionError::InvalidDeck(
                    "deck file must include a non-empty \"cards\" array".to_string(),
                )
            })?;
        let numeric = |card: &Value, key: &str| card.get(key).is_some_and(Value::is_u64);
        if let Some(position) = cards
            .iter()
            .position(|card| !numeric(card, "arena_id") || !numeric(card, "quantity"))
        {
            return Err(CollectionError::InvalidDeck(format!(
                "card #{} requires numeric arena_id and quantity",
                position + 1
            )));
        }

        let deck: DeckFile = serde_json::from_value(value)
            .map_err(|e| CollectionError::InvalidDeck(e.to_string()))?;
        deck.cards
            .iter()
            .try_fold(0u32, |total, card| total.checked_add(card.quantity))
            .ok_or_else(|| {
                CollectionError::InvalidDeck("total card quantity is too large".to_string())
            })?;
        Ok(deck)
    }

    /// Total cards in the deck
    pub fn library_size(&self) -> u32 {
        self.cards
            .iter()
            .fold(0u32, |total, card| total.saturating_add(card.quantity))
    }

    /// Starting quantity per arena id
    pub fn quantities(&self) -> HashMap<u32, u32> {
        let mut quantities = HashMap::new();
        for card in &self.cards {
            quantities.insert(card.arena_id, card.quantity);
        }
        quantities
    }

    /// Groups to track: the file's own, or one singleton group per tracked id
    /// (falling back to the first ten cards when nothing is tracked)
    pub fn group_definitions(&self, tracked: &[u32]) -> Vec<DeckGroup> {
        if let Some(groups) = self.groups.as_ref().filter(|groups| !groups.is_empty()) {
            return groups.clone();
        }

        let selected: HashSet<u32> = if tracked.is_empty() {
            self.cards
                .iter()
                .take(DEFAULT_GROUP_COUNT)
                .map(|card| card.arena_id)
                .collect()
        } else {
            tracked.iter().copied().collect()
        };

        self.cards
            .iter()
            .filter(|card| selected.contains(&card.arena_id))
            .map(|card| DeckGroup {
                id: card.arena_id.to_string(),
                label: card
                    .name
                    .clone()
                    .unwrap_or_else(|| card.arena_id.to_string()),
                arena_ids: vec![card.arena_id],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO_RED: &str = r#"{
        "cards": [
            {"arena_id": 1, "name": "Lightning Strike", "quantity": 4},
            {"arena_id": 2, "name": "Shock", "quantity": 4},
            {"arena_id": 3, "name": "Mountain", "quantity": 22},
            {"arena_id": 4, "quantity": 30}
        ],
        "groups": [
            {"id": "burn", "label": "Burn", "arena_ids": [1, 2]},
            {"id": "lands", "label": "Lands", "arena_ids": [3]}
        ]
    }"#;

    #[test]
    fn loads_valid_deck() {
        let deck = DeckFile::from_json(MONO_RED).unwrap();
        assert_eq!(deck.cards.len(), 4);
        assert_eq!(deck.library_size(), 60);
        assert_eq!(deck.quantities()[&3], 22);
        assert_eq!(deck.group_definitions(&[]).len(), 2);
    }

    #[test]
    fn rejects_empty_cards() {
        let err = DeckFile::from_json(r#"{"cards": []}"#).unwrap_err();
        assert!(matches!(err, CollectionError::InvalidDeck(msg) if msg.contains("non-empty")));
    }

    #[test]
    fn rejects_missing_cards() {
        assert!(matches!(
            DeckFile::from_json(r#"{"groups": []}"#),
            Err(CollectionError::InvalidDeck(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_fields() {
        let err = DeckFile::from_json(
            r#"{"cards": [{"arena_id": 1, "quantity": 2}, {"arena_id": "x", "quantity": 1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CollectionError::InvalidDeck(msg) if msg.contains("card #2")));
        assert!(DeckFile::from_json(r#"{"cards": [{"arena_id": 1}]}"#).is_err());
    }

    #[test]
    fn rejects_quantity_overflow() {
        let err = DeckFile::from_json(
            r#"{"cards": [{"arena_id": 1, "quantity": 4294967295}, {"arena_id": 2, "quantity": 1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CollectionError::InvalidDeck(msg) if msg.contains("too large")));
    }

    #[test]
    fn default_groups_from_tracked_ids() {
        let deck = DeckFile::from_json(
            r#"{"cards": [{"arena_id": 1, "name": "Bolt", "quantity": 4}, {"arena_id": 2, "quantity": 20}]}"#,
        )
        .unwrap();
        let groups = deck.group_definitions(&[2]);
        assert_eq!(
            groups,
            vec![DeckGroup {
                id: "2".to_string(),
                label: "2".to_string(),
                arena_ids: vec![2]
            }]
        );
    }

    #[test]
    fn default_groups_cover_first_ten_cards() {
        let cards: Vec<String> = (1..=12)
            .map(|id| format!(r#"{{"arena_id": {}, "quantity": 1}}"#, id))
            .collect();
        let deck = DeckFile::from_json(&format!(r#"{{"cards": [{}]}}"#, cards.join(","))).unwrap();
        let groups = deck.group_definitions(&[]);
        assert_eq!(groups.len(), 10);
        assert_eq!(groups[9].arena_ids, vec![10]);
    }
}
