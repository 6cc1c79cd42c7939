//! Layered settings: CLI flag > environment > profile > defaults > built-in
//!
//! The config file lives at `$MTGA_CONFIG_DIR/config.json` or
//! `~/.mtga-cli/config.json`:
//!
//! ```json
//! {"defaults": {"poll_interval_ms": 250},
//!  "profiles": {"windows": {
//!      "log_path": "C:/Users/me/AppData/LocalLow/Wizards Of The Coast/MTGA/Player.log"}}}
//! ```

use crate::events::DEFAULT_SEAT_ID;
use crate::logs::snapshot::DEFAULT_SNAPSHOT_CAPACITY;
use crate::logs::{
    default_log_dir, SnapshotReader, SnapshotStore, PLAYER_LOG, PREVIOUS_PLAYER_LOG,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR_ENV: &str = "MTGA_CONFIG_DIR";
pub const LOG_PATH_ENV: &str = "MTGA_LOG_PATH";
pub const CACHE_DIR_ENV: &str = "MTGA_CACHE_DIR";
pub const CONFIG_FILE: &str = "config.json";

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// One layer of settings; unset fields fall through to the next layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_path: Option<PathBuf>,
    pub previous_log_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub datastore_path: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub seat_id: Option<u32>,
    pub snapshot_capacity: Option<usize>,
}

impl Settings {
    /// Fields set in `over` win
    pub fn overlay(self, over: Settings) -> Settings {
        Settings {
            log_path: over.log_path.or(self.log_path),
            previous_log_path: over.previous_log_path.or(self.previous_log_path),
            cache_dir: over.cache_dir.or(self.cache_dir),
            datastore_path: over.datastore_path.or(self.datastore_path),
            poll_interval_ms: over.poll_interval_ms.or(self.poll_interval_ms),
            seat_id: over.seat_id.or(self.seat_id),
            snapshot_capacity: over.snapshot_capacity.or(self.snapshot_capacity),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub defaults: Settings,
    pub profiles: HashMap<String, Settings>,
}

impl ConfigFile {
    /// Missing or unparsable files are an empty config
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("Cannot read config {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Defaults with the named profile laid over them
    pub fn layer(&self, profile: Option<&str>) -> Settings {
        let Some(name) = profile else {
            return self.defaults.clone();
        };
        match self.profiles.get(name) {
            Some(settings) => self.defaults.clone().overlay(settings.clone()),
            None => {
                log::warn!("Profile '{}' not found in config, using defaults", name);
                self.defaults.clone()
            }
        }
    }
}

/// `override`, else `$MTGA_CONFIG_DIR`, else `~/.mtga-cli`
pub fn config_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mtga-cli")
}

/// `~/.cache/mtga_collection` (platform cache dir)
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("mtga_collection")
}

/// Fully resolved settings for one command run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_path: PathBuf,
    pub previous_log_path: PathBuf,
    pub cache_dir: PathBuf,
    pub datastore_path: PathBuf,
    pub poll_interval: Duration,
    pub seat_id: u32,
    pub snapshot_capacity: usize,
    pub profile: Option<String>,
}

impl Config {
    /// Read the config file from `config_dir` and resolve against the process environment
    pub fn load(config_dir_override: Option<&Path>, profile: Option<&str>, cli: Settings) -> Self {
        let path = config_dir(config_dir_override).join(CONFIG_FILE);
        let file = ConfigFile::load(&path);
        Self::resolve(cli, &file, profile, |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    pub fn resolve(
        cli: Settings,
        file: &ConfigFile,
        profile: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env_layer = Settings {
            log_path: env(LOG_PATH_ENV).map(PathBuf::from),
            cache_dir: env(CACHE_DIR_ENV).map(PathBuf::from),
            ..Settings::default()
        };
        let merged = file.layer(profile).overlay(env_layer).overlay(cli);

        let log_dir = default_log_dir();
        let cache_dir = merged.cache_dir.unwrap_or_else(default_cache_dir);
        let datastore_path = merged
            .datastore_path
            .unwrap_or_else(|| cache_dir.join("data").join("datastore.db"));

        Self {
            log_path: merged.log_path.unwrap_or_else(|| log_dir.join(PLAYER_LOG)),
            previous_log_path: merged
                .previous_log_path
                .unwrap_or_else(|| log_dir.join(PREVIOUS_PLAYER_LOG)),
            datastore_path,
            poll_interval: Duration::from_millis(
                merged.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            seat_id: merged.seat_id.unwrap_or(DEFAULT_SEAT_ID),
            snapshot_capacity: merged
                .snapshot_capacity
                .unwrap_or(DEFAULT_SNAPSHOT_CAPACITY),
            cache_dir,
            profile: profile.map(str::to_string),
        }
    }

    pub fn log_paths(&self) -> Vec<PathBuf> {
        vec![self.log_path.clone(), self.previous_log_path.clone()]
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.cache_dir.join("snapshots")
    }

    pub fn snapshot_reader(&self) -> SnapshotReader {
        SnapshotReader::new(
            self.log_paths(),
            Some(SnapshotStore::new(self.snapshot_dir(), self.snapshot_capacity)),
        )
    }
}
