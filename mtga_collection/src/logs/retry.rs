//! Backoff for reads that collide with the game client's file lock

use super::source::LogSource;
use std::future::Future;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
const CONTENTION_CODES: &[i32] = &[16]; // EBUSY
#[cfg(windows)]
const CONTENTION_CODES: &[i32] = &[32, 33]; // sharing / lock violation
#[cfg(not(any(unix, windows)))]
const CONTENTION_CODES: &[i32] = &[];

/// Exponential backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed try number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Busy/locked/permission-denied class errors that are worth retrying
pub fn is_lock_contention(err: &io::Error) -> bool {
    match err.kind() {
        io::ErrorKind::PermissionDenied | io::ErrorKind::WouldBlock => true,
        _ => err
            .raw_os_error()
            .is_some_and(|code| CONTENTION_CODES.contains(&code)),
    }
}

/// Run `op` until it succeeds, fails with a non-contention error, or the
/// schedule runs out; the last error is returned on exhaustion.
pub async fn retry_on_contention<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> io::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_lock_contention(&e) && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                log::debug!(
                    "Log file busy ({}), retrying in {:?} ({}/{})",
                    e,
                    delay,
                    attempt + 1,
                    attempts
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if is_lock_contention(&e) {
                    log::warn!("Log file still busy after {} attempts: {}", attempts, e);
                }
                return Err(e);
            }
        }
    }
}

/// Wait out a lock on `path`, probing between backoff delays.
///
/// Returns `true` once the file opens, `false` when the schedule is exhausted,
/// the file fails for another reason, or `cancel` fires.
pub async fn wait_until_accessible(
    source: &dyn LogSource,
    path: &Path,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> bool {
    for attempt in 0..policy.attempts.max(1) {
        let delay = policy.delay_for(attempt);
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = sleep(delay) => {}
        }
        match source.probe(path).await {
            Ok(_) => return true,
            Err(e) if is_lock_contention(&e) => {
                log::debug!("{} still locked: {}", path.display(), e);
            }
            Err(_) => return false,
        }
    }
    log::warn!("{} stayed locked, resuming polling", path.display());
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::source::FsSource;

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn default_schedule_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..7).map(|a| policy.delay_for(a).as_millis()).collect();
        assert_eq!(delays, vec![50, 100, 200, 400, 800, 1000, 1000]);
        assert_eq!(policy.delay_for(64), Duration::from_secs(1));
    }

    #[test]
    fn classifies_contention_errors() {
        assert!(is_lock_contention(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(is_lock_contention(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_lock_contention(&io::Error::from(io::ErrorKind::NotFound)));
        assert!(!is_lock_contention(&io::Error::from(io::ErrorKind::InvalidData)));
        #[cfg(unix)]
        assert!(is_lock_contention(&io::Error::from_raw_os_error(16)));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mut calls = 0;
        let result = retry_on_contention(&fast_policy(5), || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(io::Error::from(io::ErrorKind::PermissionDenied))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempts() {
        let mut calls = 0;
        let result: io::Result<()> = retry_on_contention(&fast_policy(4), || {
            calls += 1;
            async { Err(io::Error::from(io::ErrorKind::WouldBlock)) }
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::WouldBlock);
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let mut calls = 0;
        let result: io::Result<()> = retry_on_contention(&fast_policy(5), || {
            calls += 1;
            async { Err(io::Error::from(io::ErrorKind::InvalidData)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn accessible_file_is_detected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Player.log");
        std::fs::write(&path, "x").unwrap();
        let cancel = CancellationToken::new();
        assert!(wait_until_accessible(&FsSource, &path, &fast_policy(3), &cancel).await);
        let missing = dir.path().join("missing");
        assert!(!wait_until_accessible(&FsSource, &missing, &fast_policy(3), &cancel).await);
        cancel.cancel();
        assert!(!wait_until_accessible(&FsSource, &path, &fast_policy(3), &cancel).await);
    }
}
