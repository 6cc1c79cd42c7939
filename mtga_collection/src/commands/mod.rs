//! Command implementations behind the `mtga-collection` binary
//!
//! Each command writes its result to the given writer (normally stdout) or,
//! with `--out`, to a file.

pub mod collection;
pub mod matches;
pub mod odds;
pub mod opponent;

use crate::config::Config;
use crate::error::{CollectionError, Result};
use crate::logs::LogSnapshot;
use mtg_common::ScryfallClient;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use collection::CollectionExportArgs;
pub use matches::{MatchesIngestArgs, MatchesStatsArgs};
pub use odds::{OddsSession, OddsWatchArgs};
pub use opponent::OpponentSeenArgs;

/// Write `payload` to `out` when given, otherwise to `stdout`
pub fn emit(payload: &str, out: Option<&Path>, stdout: &mut dyn Write) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, payload)?;
            log::info!("Wrote {} bytes to {}", payload.len(), path.display());
        }
        None => stdout.write_all(payload.as_bytes())?,
    }
    Ok(())
}

/// Scryfall client caching bulk data under the configured cache dir
pub fn scryfall_client(config: &Config) -> ScryfallClient {
    ScryfallClient::new(config.cache_dir.join("scryfall"))
}

/// Latest log snapshot, failing when neither a live file nor a cached snapshot has text
pub async fn read_log(config: &Config, custom: Option<&PathBuf>) -> Result<LogSnapshot> {
    let snapshot = config
        .snapshot_reader()
        .read_latest(custom.map(PathBuf::as_path))
        .await?;
    if snapshot.is_empty() {
        return Err(CollectionError::NoLogData(format!(
            "Could not read {}. Verify MTG Arena is installed and Detailed Logs are enabled.",
            snapshot.primary_path.display()
        )));
    }
    if snapshot.from_cache {
        log::warn!(
            "Live log unavailable, using cached snapshot of {}",
            snapshot.primary_path.display()
        );
    }
    Ok(snapshot)
}
