// crates/taskgate-store/src/lock.rs
// ============================================================================
// Module: Per-Run Filesystem Lock
// Description: Exclusive-create lock file with bounded-backoff acquisition
//              and stale-lock reclamation (spec §4.1).
// Purpose: Serialize every mutation to a given run_id's `run.json` and
//          `artifact-registry.json` across threads and processes sharing the
//          filesystem.
// Dependencies: std, taskgate-core
// ============================================================================

//! ## Overview
//! Grounded on the teacher's exclusive-create-then-rename idiom
//! (`decision-gate-contract::contract::write_file_atomic`), generalised here
//! to a lock *file* rather than a content file: `OpenOptions::create_new`
//! fails if another writer holds the lock, so acquisition is a tight retry
//! loop with backoff up to a deadline. The lock body records `{pid}:{unix_millis}`
//! so a stale lock (older than its TTL) can be identified and reclaimed
//! without a second bookkeeping file.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use taskgate_core::CoreError;

/// Default deadline for lock acquisition (spec §4.1, §5).
pub const DEFAULT_ACQUIRE_DEADLINE: Duration = Duration::from_secs(5);
/// Default age after which a held lock is considered stale and reclaimable.
pub const DEFAULT_STALE_TTL: Duration = Duration::from_secs(30);

const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_millis(250);

/// A held per-run lock. Dropping it without calling [`RunLock::release`]
/// still removes the lock file via `Drop`, but callers should prefer the
/// explicit method so release errors are observable.
#[derive(Debug)]
pub struct RunLock {
    /// Path of the lock file this handle owns.
    path: PathBuf,
    /// Whether `release` has already run, so `Drop` does not double-release.
    released: bool,
}

impl RunLock {
    /// Acquires the lock at `path`, retrying with bounded backoff until
    /// `deadline` elapses. A lock file older than `stale_ttl` is treated as
    /// abandoned and reclaimed (removed, then re-attempted).
    ///
    /// # Errors
    /// Returns [`CoreError::LockTimeout`] if the deadline elapses without
    /// acquiring the lock.
    pub fn acquire(path: &Path, run_id: &str, deadline: Duration, stale_ttl: Duration) -> Result<Self, CoreError> {
        let start = SystemTime::now();
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match try_create(path) {
                Ok(()) => return Ok(Self { path: path.to_path_buf(), released: false }),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if is_stale(path, stale_ttl) {
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    let waited = start.elapsed().unwrap_or_default();
                    if waited >= deadline {
                        #[allow(clippy::cast_possible_truncation, reason = "acquisition deadlines stay well under u64::MAX milliseconds")]
                        let waited_ms = waited.as_millis().min(u128::from(u64::MAX)) as u64;
                        return Err(CoreError::LockTimeout { run_id: run_id.to_string(), waited_ms });
                    }
                    thread::sleep(backoff.min(deadline.saturating_sub(waited)));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(err) => return Err(CoreError::Corrupt(format!("failed creating lock {}: {err}", path.display()))),
            }
        }
    }

    /// Releases the lock by deleting the lock file. Idempotent: calling it
    /// twice is a no-op the second time.
    ///
    /// # Errors
    /// Returns [`CoreError::Corrupt`] if the file exists but could not be
    /// removed.
    pub fn release(mut self) -> Result<(), CoreError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), CoreError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(_) if !self.path.exists() => Ok(()),
            Err(err) => Err(CoreError::Corrupt(format!("failed releasing lock {}: {err}", self.path.display()))),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.release_inner();
    }
}

/// Attempts to create and populate the lock file, failing with
/// `AlreadyExists` if another writer currently holds it.
fn try_create(path: &Path) -> std::io::Result<()> {
    let pid = std::process::id();
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(format!("{pid}:{millis}").as_bytes())?;
    file.sync_all()
}

/// Reports whether the lock file at `path` is older than `stale_ttl`.
fn is_stale(path: &Path, stale_ttl: Duration) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    SystemTime::now().duration_since(modified).map(|age| age >= stale_ttl).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::RunLock;

    #[test]
    fn acquire_then_release_leaves_no_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("run.json.lock");
        let lock = RunLock::acquire(&path, "run-1", Duration::from_millis(200), Duration::from_secs(30)).expect("acquires");
        assert!(path.exists());
        lock.release().expect("releases");
        assert!(!path.exists());
    }

    #[test]
    fn second_acquire_times_out_while_first_is_held() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("run.json.lock");
        let _held = RunLock::acquire(&path, "run-1", Duration::from_millis(200), Duration::from_secs(30)).expect("first acquires");

        let second = RunLock::acquire(&path, "run-1", Duration::from_millis(50), Duration::from_secs(30));
        assert!(matches!(second, Err(taskgate_core::CoreError::LockTimeout { .. })));
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("run.json.lock");
        std::fs::write(&path, b"99999999:0").expect("write stale lock");
        let old = std::time::SystemTime::now() - Duration::from_secs(60);
        let file = std::fs::File::open(&path).expect("open");
        file.set_modified(old).expect("set_modified");

        let lock = RunLock::acquire(&path, "run-1", Duration::from_millis(200), Duration::from_secs(30)).expect("reclaims stale lock");
        lock.release().expect("releases");
    }
}
