//! `collection-export`: owned cards as CSV or JSON

use super::{emit, read_log, scryfall_client};
use crate::collection::extract_owned_from_log;
use crate::config::Config;
use crate::error::{CollectionError, Result};
use crate::formatters::{to_csv, to_json};
use crate::resolver::{CardResolver, NameMode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct CollectionExportArgs {
    /// Output JSON instead of CSV
    #[arg(long)]
    pub json: bool,

    /// Skip Scryfall lookups (arena_id + quantity only)
    #[arg(long)]
    pub no_names: bool,

    /// Use the Scryfall bulk dataset for name resolution
    #[arg(long)]
    pub bulk: bool,

    /// Custom path to Player.log
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Write to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedCard {
    pub arena_id: u32,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCard {
    pub arena_id: u32,
    pub quantity: u32,
    pub name: Option<String>,
    pub set: Option<String>,
    pub collector_number: Option<String>,
    pub rarity: Option<String>,
}

#[derive(Serialize)]
struct Payload<'a, T> {
    count: usize,
    cards: &'a [T],
}

fn render<T: Serialize>(rows: &[T], json: bool) -> Result<String> {
    if json {
        to_json(&Payload {
            count: rows.len(),
            cards: rows,
        })
    } else {
        to_csv(rows)
    }
}

pub async fn named_cards(owned: &BTreeMap<u32, u32>, resolver: &CardResolver) -> Vec<NamedCard> {
    let mut rows = Vec::with_capacity(owned.len());
    for (&arena_id, &quantity) in owned {
        let meta = resolver.resolve(arena_id).await;
        rows.push(NamedCard {
            arena_id,
            quantity,
            name: meta.as_ref().map(|m| m.name.clone()),
            set: meta.as_ref().and_then(|m| m.set.clone()),
            collector_number: meta.as_ref().and_then(|m| m.collector_number.clone()),
            rarity: meta.and_then(|m| m.rarity),
        });
    }
    rows
}

pub async fn run(
    args: &CollectionExportArgs,
    config: &Config,
    stdout: &mut dyn Write,
) -> Result<()> {
    let snapshot = read_log(config, args.log.as_ref()).await?;
    let owned = extract_owned_from_log(&snapshot.text);
    if owned.is_empty() {
        return Err(CollectionError::NoLogData(
            "No owned cards found in the log. Make sure Detailed Logs (Plugin Support) are enabled \
             and you opened the Collection screen this session."
                .to_string(),
        ));
    }
    log::info!("Found {} owned cards", owned.len());

    let payload = if args.no_names {
        let rows: Vec<OwnedCard> = owned
            .iter()
            .map(|(&arena_id, &quantity)| OwnedCard { arena_id, quantity })
            .collect();
        render(&rows, args.json)?
    } else {
        let mode = NameMode::from_flags(false, args.bulk, true);
        let resolver = CardResolver::prepare(mode, scryfall_client(config)).await;
        render(&named_cards(&owned, &resolver).await, args.json)?
    };
    emit(&payload, args.out.as_deref(), stdout)
}
