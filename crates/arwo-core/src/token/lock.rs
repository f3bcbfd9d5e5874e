//! Cross-process refresh lock.
//!
//! One marker file per user under the credential directory. Creation is
//! atomic (`O_EXCL`), so two processes can never both believe they created
//! the marker. The advisory flock on the marker, not its existence, is
//! authoritative for ownership: a marker left behind by a crashed holder
//! has a free flock and is adopted by the next waiter.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Poll interval while waiting for a contended refresh lock.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on the random jitter added to each poll sleep, so waiters
/// that woke together do not re-contend in lockstep.
const LOCK_POLL_JITTER_MS: u64 = 100;

/// Holder metadata written into the marker for diagnostics.
///
/// Mutual exclusion rests on the flock alone; this record only tells an
/// operator who was refreshing when they inspect a leftover marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshLockHolder {
    /// Process id of the holder.
    pub pid: u32,
    /// User whose token is being refreshed.
    pub user: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
}

/// Outcome of one attempt to enter the refresh critical section.
#[derive(Debug)]
pub enum LockAttempt {
    /// This process owns the refresh critical section.
    Acquired(RefreshLockGuard),

    /// Another process is refreshing, or just finished. The caller must
    /// not log in; it re-reads the token store and retries its original
    /// operation.
    Deferred,
}

/// RAII guard for an exclusively-held refresh lock.
///
/// Dropping the guard removes the marker and then releases the flock, in
/// that order: a waiter that acquires the flock next observes the marker
/// path gone (or a different inode) and defers instead of adopting a
/// refresh that already completed.
pub struct RefreshLockGuard {
    path: PathBuf,
    /// Held open for the guard's lifetime; the OS releases the flock when
    /// the descriptor closes.
    _lock_file: File,
}

impl std::fmt::Debug for RefreshLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshLockGuard")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for RefreshLockGuard {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            if error.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %error,
                    "failed to remove refresh lock marker"
                );
            }
        }
    }
}

/// Attempts to enter the refresh critical section for `user`.
///
/// Waits up to `wait` for a contended lock, polling with jitter. Returns
/// [`LockAttempt::Deferred`] when another live process holds the lock for
/// the whole window, and also when the holder finishes during the wait
/// (its refresh supersedes ours). A marker whose flock is free but whose
/// file survived belongs to a dead holder and is adopted.
///
/// # Errors
///
/// Returns an error on marker I/O failures other than contention.
pub fn acquire(lock_path: &Path, user: &str, wait: Duration) -> Result<LockAttempt, TokenError> {
    let lock_error = |source: io::Error| TokenError::Lock {
        path: lock_path.to_path_buf(),
        source,
    };

    match OpenOptions::new()
        .create_new(true)
        .read(true)
        .write(true)
        .open(lock_path)
    {
        Ok(file) => {
            restrict_permissions(lock_path);
            match try_flock_exclusive(&file) {
                Ok(true) => {
                    write_holder(&file, lock_path, user);
                    Ok(LockAttempt::Acquired(RefreshLockGuard {
                        path: lock_path.to_path_buf(),
                        _lock_file: file,
                    }))
                },
                // A waiter flocked our fresh marker before we could; it
                // owns the refresh now.
                Ok(false) => wait_for_holder(file, lock_path, user, wait),
                Err(source) => Err(lock_error(source)),
            }
        },
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
            let file = match OpenOptions::new().read(true).write(true).open(lock_path) {
                Ok(file) => file,
                // Marker vanished between the create attempt and the open:
                // the holder finished.
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    return Ok(LockAttempt::Deferred);
                },
                Err(source) => return Err(lock_error(source)),
            };
            wait_for_holder(file, lock_path, user, wait)
        },
        Err(source) => Err(lock_error(source)),
    }
}

/// Polls the flock on an existing marker until it frees up or `wait`
/// elapses.
fn wait_for_holder(
    file: File,
    lock_path: &Path,
    user: &str,
    wait: Duration,
) -> Result<LockAttempt, TokenError> {
    let lock_error = |source: io::Error| TokenError::Lock {
        path: lock_path.to_path_buf(),
        source,
    };

    let start = Instant::now();
    loop {
        match try_flock_exclusive(&file) {
            Ok(true) => {
                return if same_file(&file, lock_path).map_err(lock_error)? {
                    // Flock free but marker intact: the previous holder
                    // died without cleanup. Take over its marker.
                    tracing::warn!(
                        path = %lock_path.display(),
                        "adopting refresh lock marker left by a dead holder"
                    );
                    write_holder(&file, lock_path, user);
                    Ok(LockAttempt::Acquired(RefreshLockGuard {
                        path: lock_path.to_path_buf(),
                        _lock_file: file,
                    }))
                } else {
                    // Marker removed or replaced: that refresh completed.
                    Ok(LockAttempt::Deferred)
                };
            },
            Ok(false) => {
                if start.elapsed() >= wait {
                    return Ok(LockAttempt::Deferred);
                }
                let jitter_ms = rand::random::<u64>() % (LOCK_POLL_JITTER_MS + 1);
                std::thread::sleep(LOCK_POLL_INTERVAL.min(wait) + Duration::from_millis(jitter_ms));
            },
            Err(source) => return Err(lock_error(source)),
        }
    }
}

/// Try to acquire an exclusive flock (non-blocking). `Ok(false)` means the
/// lock is held elsewhere.
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    match FileExt::try_lock_exclusive(file) {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(false),
        Err(error) => Err(error),
    }
}

/// Whether the open handle still refers to the file at `path`.
fn same_file(held: &File, path: &Path) -> io::Result<bool> {
    let held_meta = held.metadata()?;
    let path_meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Ok(held_meta.dev() == path_meta.dev() && held_meta.ino() == path_meta.ino())
    }
    #[cfg(not(unix))]
    {
        let _ = (held_meta, path_meta);
        Ok(true)
    }
}

fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        if let Err(error) = fs::set_permissions(path, perms) {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to set refresh lock permissions"
            );
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn write_holder(file: &File, path: &Path, user: &str) {
    let holder = RefreshLockHolder {
        pid: std::process::id(),
        user: user.to_string(),
        acquired_at: Utc::now(),
    };
    let result = serde_json::to_vec(&holder)
        .map_err(io::Error::other)
        .and_then(|bytes| {
            file.set_len(0)?;
            let mut handle = file;
            handle.seek(SeekFrom::Start(0))?;
            handle.write_all(&bytes)
        });
    if let Err(error) = result {
        tracing::warn!(
            path = %path.display(),
            error = %error,
            "failed to write refresh lock holder metadata"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_WAIT: Duration = Duration::from_millis(100);

    fn lock_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("token_refresh_svc_arwo.lock")
    }

    #[test]
    fn test_acquire_creates_marker_with_holder_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        let attempt = acquire(&path, "svc_arwo", TEST_WAIT).unwrap();
        let LockAttempt::Acquired(_guard) = attempt else {
            panic!("expected to acquire an uncontended lock");
        };
        let raw = fs::read(&path).unwrap();
        let holder: RefreshLockHolder = serde_json::from_slice(&raw).unwrap();
        assert_eq!(holder.pid, std::process::id());
        assert_eq!(holder.user, "svc_arwo");
    }

    #[test]
    fn test_drop_removes_marker_and_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        {
            let attempt = acquire(&path, "svc_arwo", TEST_WAIT).unwrap();
            assert!(matches!(attempt, LockAttempt::Acquired(_)));
            assert!(path.exists());
        }
        assert!(!path.exists());
        let again = acquire(&path, "svc_arwo", TEST_WAIT).unwrap();
        assert!(matches!(again, LockAttempt::Acquired(_)));
    }

    #[test]
    fn test_second_caller_defers_while_lock_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        let first = acquire(&path, "svc_arwo", TEST_WAIT).unwrap();
        assert!(matches!(first, LockAttempt::Acquired(_)));

        let second = acquire(&path, "svc_arwo", TEST_WAIT).unwrap();
        assert!(matches!(second, LockAttempt::Deferred));
        // First holder's marker must survive the deferred attempt.
        assert!(path.exists());
    }

    #[test]
    fn test_stale_marker_from_dead_holder_is_adopted() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        // Marker exists but nothing holds the flock, as after a crash.
        fs::write(&path, b"{}").unwrap();

        let attempt = acquire(&path, "svc_arwo", TEST_WAIT).unwrap();
        let LockAttempt::Acquired(_guard) = attempt else {
            panic!("expected to adopt the stale marker");
        };
        let holder: RefreshLockHolder = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(holder.pid, std::process::id());
    }

    #[test]
    fn test_concurrent_acquire_admits_exactly_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        let barrier = std::sync::Barrier::new(2);

        let (first, second) = std::thread::scope(|scope| {
            let a = scope.spawn(|| {
                barrier.wait();
                acquire(&path, "svc_arwo", TEST_WAIT).unwrap()
            });
            let b = scope.spawn(|| {
                barrier.wait();
                acquire(&path, "svc_arwo", TEST_WAIT).unwrap()
            });
            (a.join().unwrap(), b.join().unwrap())
        });

        let acquired = [&first, &second]
            .iter()
            .filter(|attempt| matches!(attempt, LockAttempt::Acquired(_)))
            .count();
        assert_eq!(acquired, 1, "exactly one caller may own the refresh");
    }
}
