//! Card name resolution for exports

use mtg_common::{CardMeta, ScryfallClient};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMode {
    /// Arena ids only
    NoNames,
    /// One bulk dataset load, then in-memory lookups
    Bulk { force_refresh: bool },
    /// One request per card
    PerCard,
}

impl NameMode {
    pub fn from_flags(no_names: bool, bulk: bool, force_refresh: bool) -> Self {
        if no_names {
            NameMode::NoNames
        } else if bulk {
            NameMode::Bulk { force_refresh }
        } else {
            NameMode::PerCard
        }
    }
}

pub struct CardResolver {
    client: Option<ScryfallClient>,
    bulk: Option<HashMap<u32, CardMeta>>,
}

impl CardResolver {
    pub fn disabled() -> Self {
        Self {
            client: None,
            bulk: None,
        }
    }

    /// A failed bulk load falls back to per-card lookups
    pub async fn prepare(mode: NameMode, mut client: ScryfallClient) -> Self {
        match mode {
            NameMode::NoNames => Self::disabled(),
            NameMode::PerCard => Self {
                client: Some(client),
                bulk: None,
            },
            NameMode::Bulk { force_refresh } => {
                let bulk = match client.bulk_map(force_refresh).await {
                    Ok(map) => Some(map.clone()),
                    Err(e) => {
                        log::warn!("Bulk load failed: {}. Falling back to per-card lookups", e);
                        None
                    }
                };
                Self {
                    client: Some(client),
                    bulk,
                }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn uses_bulk(&self) -> bool {
        self.bulk.is_some()
    }

    pub async fn resolve(&self, arena_id: u32) -> Option<CardMeta> {
        if let Some(map) = &self.bulk {
            return map.get(&arena_id).cloned();
        }
        let client = self.client.as_ref()?;
        match client.card_by_arena_id(arena_id).await {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!("Scryfall lookup failed for arena_id {}: {}", arena_id, e);
                None
            }
        }
    }

    /// Resolve each id once
    pub async fn resolve_all(
        &self,
        arena_ids: impl IntoIterator<Item = u32>,
    ) -> HashMap<u32, CardMeta> {
        let mut resolved = HashMap::new();
        if !self.is_enabled() {
            return resolved;
        }
        let source = if self.uses_bulk() {
            "bulk data"
        } else {
            "per-card lookups"
        };
        log::debug!("Resolving card names from {}", source);
        for arena_id in arena_ids {
            if resolved.contains_key(&arena_id) {
                continue;
            }
            if let Some(meta) = self.resolve(arena_id).await {
                resolved.insert(arena_id, meta);
            }
        }
        resolved
    }
}
