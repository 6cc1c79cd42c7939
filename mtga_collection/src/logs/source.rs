//! File access behind the snapshot reader and the live tailer

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Size and modification time of a log file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait LogSource: Send + Sync + fmt::Debug {
    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Bytes in `[offset, end)`; fewer if the file shrank meanwhile
    async fn read_range(&self, path: &Path, offset: u64, end: u64) -> io::Result<Vec<u8>>;

    /// Succeeds when `path` can be opened for reading
    async fn probe(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem, through `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

#[async_trait]
impl LogSource for FsSource {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileStat {
            len: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn read_range(&self, path: &Path, offset: u64, end: u64) -> io::Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let wanted = end.saturating_sub(offset);
        let mut data = Vec::with_capacity(usize::try_from(wanted).unwrap_or_default());
        file.take(wanted).read_to_end(&mut data).await?;
        Ok(data)
    }

    async fn probe(&self, path: &Path) -> io::Result<()> {
        tokio::fs::File::open(path).await.map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Real files, with the first N stats and reads failing as if locked
    #[derive(Debug, Default)]
    pub(crate) struct LockedSource {
        pub stat_failures: AtomicUsize,
        pub read_failures: AtomicUsize,
        pub stats: AtomicUsize,
        pub reads: AtomicUsize,
        pub probes: AtomicUsize,
    }

    impl LockedSource {
        pub(crate) fn new(stat_failures: usize, read_failures: usize) -> Arc<Self> {
            Arc::new(Self {
                stat_failures: AtomicUsize::new(stat_failures),
                read_failures: AtomicUsize::new(read_failures),
                ..Self::default()
            })
        }

        fn take_failure(counter: &AtomicUsize) -> io::Result<()> {
            let failed = counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failed {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl LogSource for LockedSource {
        async fn stat(&self, path: &Path) -> io::Result<FileStat> {
            self.stats.fetch_add(1, Ordering::SeqCst);
            Self::take_failure(&self.stat_failures)?;
            FsSource.stat(path).await
        }

        async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Self::take_failure(&self.read_failures)?;
            FsSource.read(path).await
        }

        async fn read_range(&self, path: &Path, offset: u64, end: u64) -> io::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Self::take_failure(&self.read_failures)?;
            FsSource.read_range(path, offset, end).await
        }

        async fn probe(&self, path: &Path) -> io::Result<()> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            FsSource.probe(path).await
        }
    }
}
