//! Remaining-card state per tracked group and the probabilities derived from it

use super::deck::{DeckFile, DeckGroup};
use super::hypergeometric::{self, HypergeometricInput};
use crate::error::Result;
use crate::events::DrawEvent;
use crate::formatters::{Align, Table};
use serde::Serialize;
use std::collections::HashMap;

/// Draw horizon for the "within 3" column
const LOOKAHEAD_DRAWS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupState {
    pub id: String,
    pub label: String,
    pub arena_ids: Vec<u32>,
    pub remaining: u32,
}

/// Derived probabilities for one group, recomputed on every render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddsRow {
    pub label: String,
    pub remaining: u32,
    pub next_draw: f64,
    pub within_three: f64,
    /// `None` once the group is exhausted
    pub expected_draws: Option<f64>,
}

impl OddsRow {
    pub fn compute(label: &str, remaining: u32, library_size: u32) -> Result<Self> {
        let next_draw = chance_of_any(library_size, remaining, 1)?;
        let within_three =
            chance_of_any(library_size, remaining, LOOKAHEAD_DRAWS.min(library_size))?;
        let expected_draws =
            (remaining > 0).then(|| f64::from(library_size) / f64::from(remaining));

        Ok(Self {
            label: label.to_string(),
            remaining,
            next_draw,
            within_three,
            expected_draws,
        })
    }
}

fn chance_of_any(library_size: u32, remaining: u32, draws: u32) -> Result<f64> {
    if library_size == 0 || remaining == 0 {
        return Ok(0.0);
    }
    // Floor-at-zero on both counters can leave remaining above library size
    let successes = remaining.min(library_size);
    hypergeometric::at_least(HypergeometricInput::new(
        library_size,
        successes,
        draws.min(library_size),
        1,
    ))
}

/// Live odds state owned by a single watch session
#[derive(Debug, Clone)]
pub struct OddsEngine {
    library_size: u32,
    groups: Vec<GroupState>,
    /// arena id -> indices into `groups`
    index: HashMap<u32, Vec<usize>>,
}

impl OddsEngine {
    /// Build group state from definitions and per-card starting quantities
    pub fn new(
        library_size: u32,
        definitions: &[DeckGroup],
        quantities: &HashMap<u32, u32>,
    ) -> Self {
        let mut groups = Vec::with_capacity(definitions.len());
        let mut index: HashMap<u32, Vec<usize>> = HashMap::new();

        for (position, definition) in definitions.iter().enumerate() {
            let mut arena_ids: Vec<u32> = Vec::with_capacity(definition.arena_ids.len());
            for id in &definition.arena_ids {
                if !arena_ids.contains(id) {
                    arena_ids.push(*id);
                }
            }
            for id in &arena_ids {
                index.entry(*id).or_default().push(position);
            }
            let remaining = arena_ids
                .iter()
                .map(|id| quantities.get(id).copied().unwrap_or(0))
                .fold(0u32, u32::saturating_add);
            groups.push(GroupState {
                id: definition.id.clone(),
                label: definition.label.clone(),
                arena_ids,
                remaining,
            });
        }

        Self {
            library_size,
            groups,
            index,
        }
    }

    pub fn from_deck(deck: &DeckFile, tracked: &[u32]) -> Self {
        Self::new(
            deck.library_size(),
            &deck.group_definitions(tracked),
            &deck.quantities(),
        )
    }

    pub fn library_size(&self) -> u32 {
        self.library_size
    }

    pub fn groups(&self) -> &[GroupState] {
        &self.groups
    }

    /// Remove one card from the library and from every group holding it
    pub fn apply_draw(&mut self, draw: &DrawEvent) {
        self.library_size = self.library_size.saturating_sub(1);

        let Some(grp_id) = draw.grp_id else {
            return;
        };
        if let Some(positions) = self.index.get(&grp_id) {
            for &position in positions {
                let group = &mut self.groups[position];
                group.remaining = group.remaining.saturating_sub(1);
            }
        }
    }

    pub fn rows(&self) -> Result<Vec<OddsRow>> {
        self.groups
            .iter()
            .map(|group| OddsRow::compute(&group.label, group.remaining, self.library_size))
            .collect()
    }

    /// Header line plus the odds table
    pub fn render(&self) -> Result<String> {
        let mut table = Table::new(&[
            ("Target", Align::Left),
            ("Remaining", Align::Right),
            ("Next Draw %", Align::Right),
            ("Within 3 %", Align::Right),
            ("Expected Draws", Align::Right),
        ]);
        for row in self.rows()? {
            table.push(vec![
                row.label,
                row.remaining.to_string(),
                format_percent(row.next_draw),
                format_percent(row.within_three),
                row.expected_draws
                    .map(|draws| format!("{:.1}", draws))
                    .unwrap_or_else(|| "-".to_string()),
            ]);
        }
        Ok(format!("Library size: {}\n{}", self.library_size, table.render()))
    }
}

fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}
