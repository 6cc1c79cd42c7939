//! Scryfall API client for resolving Arena card ids to card metadata
//!
//! Uses async reqwest for non-blocking HTTP requests. Per-card lookups hit
//! `/cards/arena/{id}`; the bulk `default_cards` dataset is cached on disk and
//! only re-downloaded when Scryfall reports a newer `updated_at`.

use crate::error::{MtgError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Public Scryfall API root
pub const SCRYFALL_API: &str = "https://api.scryfall.com";

const USER_AGENT: &str = "mtga-collection/0.1.0";
const BULK_CACHE_FILE: &str = "default_cards.json";
const BULK_META_FILE: &str = "default_cards.meta.json";
const BULK_DATASET: &str = "default_cards";

/// Minimal card metadata needed for exports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMeta {
    pub name: String,
    pub set: Option<String>,
    pub collector_number: Option<String>,
    pub rarity: Option<String>,
}

/// Card shape shared by the per-card endpoint and bulk dataset entries
#[derive(Debug, Deserialize)]
pub struct ArenaCard {
    #[serde(default)]
    pub arena_id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub collector_number: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
}

impl ArenaCard {
    /// Convert to metadata; cards without a name are useless for exports
    pub fn card_meta(&self) -> Option<CardMeta> {
        let name = self.name.clone()?;
        Some(CardMeta {
            name,
            set: self.set.as_ref().map(|s| s.to_uppercase()),
            collector_number: self.collector_number.clone(),
            rarity: self.rarity.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct BulkDataIndex {
    #[serde(default)]
    data: Vec<BulkDataEntry>,
}

#[derive(Debug, Deserialize)]
struct BulkDataEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    download_uri: Option<String>,
    updated_at: Option<String>,
}

/// Sidecar describing which bulk download is cached on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCacheMeta {
    pub updated_at: String,
    pub downloaded_at: DateTime<Utc>,
    pub download_uri: String,
}

/// Build the arena_id -> metadata map from bulk entries
pub fn build_bulk_map(cards: &[ArenaCard]) -> HashMap<u32, CardMeta> {
    cards
        .iter()
        .filter_map(|card| Some((card.arena_id?, card.card_meta()?)))
        .collect()
}

/// Scryfall client with an on-disk bulk cache
pub struct ScryfallClient {
    client: reqwest::Client,
    /// API root, overridable for tests
    pub base_url: String,
    cache_dir: PathBuf,
    bulk: Option<HashMap<u32, CardMeta>>,
}

impl ScryfallClient {
    /// Create a client caching bulk data under `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: SCRYFALL_API.to_string(),
            cache_dir: cache_dir.into(),
            bulk: None,
        }
    }

    /// Directory holding the bulk cache files
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MtgError::HttpStatus(response.status()));
        }
        Ok(response.text().await?)
    }

    /// Fetch a single card by Arena id. A 404 means Scryfall has no such card.
    pub async fn card_by_arena_id(&self, arena_id: u32) -> Result<Option<CardMeta>> {
        let url = format!("{}/cards/arena/{}", self.base_url, arena_id);
        log::debug!("Fetching card from Scryfall: arena_id={}", arena_id);

        match self.get_text(&url).await {
            Ok(body) => {
                let card: ArenaCard = serde_json::from_str(&body)?;
                Ok(card.card_meta())
            }
            Err(MtgError::HttpStatus(status)) if status == reqwest::StatusCode::NOT_FOUND => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Load the bulk arena_id map, downloading only when the cached copy is stale.
    ///
    /// Falls back to the cached dataset when Scryfall cannot be reached.
    pub async fn bulk_map(&mut self, force_refresh: bool) -> Result<&HashMap<u32, CardMeta>> {
        std::fs::create_dir_all(&self.cache_dir)?;

        let cards = match self.refresh_bulk(force_refresh).await {
            Ok(cards) => cards,
            Err(e) => match self.read_cached_bulk() {
                Some(cards) => {
                    log::warn!("Bulk refresh failed, using cached dataset: {}", e);
                    cards
                }
                None => return Err(e),
            },
        };

        let map = build_bulk_map(&cards);
        log::info!("Loaded {} Arena cards from Scryfall bulk data", map.len());
        Ok(self.bulk.insert(map))
    }

    async fn refresh_bulk(&self, force_refresh: bool) -> Result<Vec<ArenaCard>> {
        let index_body = self.get_text(&format!("{}/bulk-data", self.base_url)).await?;
        let index: BulkDataIndex = serde_json::from_str(&index_body)?;

        let (download_uri, updated_at) = index
            .data
            .into_iter()
            .find(|entry| entry.kind.as_deref() == Some(BULK_DATASET))
            .and_then(|entry| Some((entry.download_uri?, entry.updated_at?)))
            .ok_or_else(|| MtgError::BulkDataMissing(BULK_DATASET.to_string()))?;

        let cached_meta = self.read_cache_meta();
        let stale = force_refresh
            || cached_meta
                .as_ref()
                .map_or(true, |meta| meta.updated_at != updated_at);

        if !stale {
            if let Some(cards) = self.read_cached_bulk() {
                log::debug!("Bulk cache is current ({})", updated_at);
                return Ok(cards);
            }
        }

        log::info!("Downloading Scryfall bulk dataset from {}", download_uri);
        let body = self.get_text(&download_uri).await?;
        let cards: Vec<ArenaCard> = serde_json::from_str(&body)?;

        std::fs::write(self.cache_dir.join(BULK_CACHE_FILE), &body)?;
        let meta = BulkCacheMeta {
            updated_at,
            downloaded_at: Utc::now(),
            download_uri,
        };
        std::fs::write(
            self.cache_dir.join(BULK_META_FILE),
            serde_json::to_string_pretty(&meta)?,
        )?;

        Ok(cards)
    }

    fn read_cache_meta(&self) -> Option<BulkCacheMeta> {
        let raw = std::fs::read_to_string(self.cache_dir.join(BULK_META_FILE)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn read_cached_bulk(&self) -> Option<Vec<ArenaCard>> {
        let raw = std::fs::read_to_string(self.cache_dir.join(BULK_CACHE_FILE)).ok()?;
        match serde_json::from_str(&raw) {
            Ok(cards) => Some(cards),
            Err(e) => {
                log::warn!("Failed to parse cached bulk dataset: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
