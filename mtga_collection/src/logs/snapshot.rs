//! Snapshot reads of the log files and the on-disk snapshot ring
//!
//! Layout under the snapshot directory:
//!
//! ```text
//! snapshot-<id>.log    combined raw text
//! snapshot-<id>.json   SnapshotMeta
//! latest.json          LatestPointer to the newest entry
//! ```
//!
//! Ids are zero-padded nanosecond timestamps, so lexical order is creation order.

use super::retry::{retry_on_contention, RetryPolicy};
use super::source::{FsSource, LogSource};
use super::LogSnapshot;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const SNAPSHOT_PREFIX: &str = "snapshot-";
const LATEST_POINTER: &str = "latest.json";

/// Default number of snapshots kept on disk
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 5;

/// Metadata stored next to each snapshot's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub primary_path: PathBuf,
    pub sources: Vec<PathBuf>,
    pub byte_length: usize,
    #[serde(default)]
    pub modified: BTreeMap<PathBuf, DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LatestPointer {
    id: String,
    created_at: DateTime<Utc>,
    primary_path: PathBuf,
    sources: Vec<PathBuf>,
}

/// One snapshot found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub id: u64,
    pub text_path: PathBuf,
    pub meta_path: PathBuf,
}

/// Bounded ring of persisted snapshots, oldest evicted first
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    capacity: usize,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn entry(&self, id: u64) -> SnapshotEntry {
        let stem = format!("{}{:020}", SNAPSHOT_PREFIX, id);
        SnapshotEntry {
            id,
            text_path: self.dir.join(format!("{}.log", stem)),
            meta_path: self.dir.join(format!("{}.json", stem)),
        }
    }

    /// Snapshots on disk, oldest first
    pub async fn list(&self) -> Result<Vec<SnapshotEntry>> {
        let mut read_dir = match fs::read_dir(&self.dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(dir_entry) = read_dir.next_entry().await? {
            let name = dir_entry.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix(SNAPSHOT_PREFIX))
                .and_then(|n| n.strip_suffix(".log"))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids.into_iter().map(|id| self.entry(id)).collect())
    }

    /// Write `snapshot` as the newest entry, update the pointer and prune
    pub async fn persist(&self, snapshot: &LogSnapshot) -> Result<SnapshotMeta> {
        fs::create_dir_all(&self.dir).await?;

        let now = Utc::now();
        let clock = now
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or_default();
        let id = match self.list().await?.last() {
            Some(newest) if newest.id >= clock => newest.id + 1,
            _ => clock,
        };
        let entry = self.entry(id);

        let meta = SnapshotMeta {
            id: format!("{:020}", id),
            created_at: now,
            primary_path: snapshot.primary_path.clone(),
            sources: snapshot.paths.clone(),
            byte_length: snapshot.byte_length,
            modified: snapshot.modified.clone(),
        };
        let pointer = LatestPointer {
            id: meta.id.clone(),
            created_at: meta.created_at,
            primary_path: meta.primary_path.clone(),
            sources: meta.sources.clone(),
        };

        atomic_write(&entry.text_path, snapshot.text.as_bytes()).await?;
        atomic_write(&entry.meta_path, &serde_json::to_vec_pretty(&meta)?).await?;
        atomic_write(
            &self.dir.join(LATEST_POINTER),
            &serde_json::to_vec_pretty(&pointer)?,
        )
        .await?;
        log::debug!(
            "Persisted log snapshot {} ({} bytes)",
            meta.id,
            meta.byte_length
        );

        self.prune().await?;
        Ok(meta)
    }

    /// Delete the oldest entries beyond capacity, returning how many went
    pub async fn prune(&self) -> Result<usize> {
        let entries = self.list().await?;
        let excess = entries.len().saturating_sub(self.capacity);
        for entry in &entries[..excess] {
            for path in [&entry.text_path, &entry.meta_path] {
                match fs::remove_file(path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        if excess > 0 {
            log::info!("Pruned {} old log snapshot(s)", excess);
        }
        Ok(excess)
    }

    /// Most recent snapshot: the pointer's target, else the newest readable entry
    pub async fn latest(&self) -> Result<Option<LogSnapshot>> {
        if let Some(id) = self.pointer_id().await {
            match self.load(&self.entry(id)).await {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => log::warn!("Snapshot pointer target {} unreadable: {}", id, e),
            }
        }

        for entry in self.list().await?.iter().rev() {
            match self.load(entry).await {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => log::warn!("Skipping unreadable snapshot {}: {}", entry.id, e),
            }
        }
        Ok(None)
    }

    async fn pointer_id(&self) -> Option<u64> {
        let raw = fs::read(self.dir.join(LATEST_POINTER)).await.ok()?;
        match serde_json::from_slice::<LatestPointer>(&raw) {
            Ok(pointer) => pointer.id.parse().ok(),
            Err(e) => {
                log::warn!("Ignoring corrupt snapshot pointer: {}", e);
                None
            }
        }
    }

    async fn load(&self, entry: &SnapshotEntry) -> Result<LogSnapshot> {
        let text = fs::read_to_string(&entry.text_path).await?;
        let meta: SnapshotMeta = serde_json::from_slice(&fs::read(&entry.meta_path).await?)?;
        Ok(LogSnapshot {
            primary_path: meta.primary_path,
            paths: meta.sources,
            byte_length: text.len(),
            text,
            modified: meta.modified,
            from_cache: true,
        })
    }
}

/// Write to a temp file then rename over `path`
async fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp = path.with_extension("tmp");
    let mut file = fs::File::create(&temp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(&temp, path).await
}

/// Reads the newest combined view of the log files
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    default_paths: Vec<PathBuf>,
    store: Option<SnapshotStore>,
    retry: RetryPolicy,
    source: Arc<dyn LogSource>,
}

struct FileRead {
    path: PathBuf,
    text: String,
    modified: DateTime<Utc>,
}

impl SnapshotReader {
    pub fn new(default_paths: Vec<PathBuf>, store: Option<SnapshotStore>) -> Self {
        Self {
            default_paths,
            store,
            retry: RetryPolicy::default(),
            source: Arc::new(FsSource),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn LogSource>) -> Self {
        self.source = source;
        self
    }

    pub fn store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    /// The explicit path alone, or the default pair; duplicates removed
    pub fn candidates(&self, custom: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        let source = match custom {
            Some(path) => vec![path.to_path_buf()],
            None => self.default_paths.clone(),
        };
        for path in source {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }
        candidates
    }

    /// Read and combine the candidate files.
    ///
    /// Missing files count as empty. Lock contention is retried and only the
    /// final failure propagates. With nothing readable the newest cached
    /// snapshot is returned, or an empty one if the cache is empty too.
    pub async fn read_latest(&self, custom: Option<&Path>) -> Result<LogSnapshot> {
        let candidates = self.candidates(custom);
        let fallback_primary = candidates.first().cloned().unwrap_or_default();

        let mut reads = Vec::new();
        for path in &candidates {
            if let Some(read) = self.read_file(path).await? {
                if !read.text.is_empty() {
                    reads.push(read);
                }
            }
        }

        if reads.is_empty() {
            return self.cached_or_empty(fallback_primary).await;
        }

        let mut primary = 0;
        for (position, read) in reads.iter().enumerate() {
            if read.text.len() > reads[primary].text.len() {
                primary = position;
            }
        }
        let primary_read = reads.remove(primary);
        reads.insert(0, primary_read);

        let text = reads
            .iter()
            .map(|read| read.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let snapshot = LogSnapshot {
            primary_path: reads[0].path.clone(),
            paths: reads.iter().map(|read| read.path.clone()).collect(),
            byte_length: text.len(),
            text,
            modified: reads
                .iter()
                .map(|read| (read.path.clone(), read.modified))
                .collect(),
            from_cache: false,
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.persist(&snapshot).await {
                log::warn!("Failed to persist log snapshot: {}", e);
            }
        }
        Ok(snapshot)
    }

    async fn cached_or_empty(&self, primary: PathBuf) -> Result<LogSnapshot> {
        if let Some(store) = &self.store {
            match store.latest().await {
                Ok(Some(cached)) => {
                    log::warn!(
                        "No live log data, using cached snapshot of {}",
                        cached.primary_path.display()
                    );
                    return Ok(cached);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Snapshot cache unavailable: {}", e),
            }
        }
        Ok(LogSnapshot::empty(primary))
    }

    async fn read_file(&self, path: &Path) -> Result<Option<FileRead>> {
        let read = retry_on_contention(&self.retry, || {
            let path = path.to_path_buf();
            let source = Arc::clone(&self.source);
            async move {
                let stat = match source.stat(&path).await {
                    Ok(stat) => stat,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e),
                };
                let bytes = match source.read(&path).await {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e),
                };
                let modified = stat.modified.unwrap_or_else(Utc::now);
                Ok(Some(FileRead {
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                    path,
                    modified,
                }))
            }
        })
        .await?;
        Ok(read)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
