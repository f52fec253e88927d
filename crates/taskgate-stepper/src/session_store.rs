// crates/taskgate-stepper/src/session_store.rs
// ============================================================================
// Module: Session State Store
// Description: Persistence for per-orchestrator-session compliance counters
//              and optional cost accounting (spec §2 row 11).
// Purpose: Give the Stepper a durable place to accumulate session counters
//          across runs. No CLI subcommand exposes this store directly; it
//          backs the Stepper's own bookkeeping (see DESIGN.md).
// Dependencies: serde_json, taskgate-core, taskgate-store, std
// ============================================================================

//! ## Overview
//! Same one-document-per-key shape as [`crate::iteration_store::IterationStore`],
//! keyed by `session_id` under `<root>/sessions/<session_id>.json`.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use taskgate_core::CoreError;
use taskgate_core::SessionState;
use taskgate_store::atomic::write_atomic;
use taskgate_store::lock::DEFAULT_ACQUIRE_DEADLINE;
use taskgate_store::lock::DEFAULT_STALE_TTL;
use taskgate_store::lock::RunLock;

/// Persistence for [`SessionState`], one document per session id.
pub struct SessionStore {
    root: PathBuf,
    acquire_deadline: Duration,
    stale_ttl: Duration,
}

impl SessionStore {
    /// Builds a store rooted at `root` with default lock tuning.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root, acquire_deadline: DEFAULT_ACQUIRE_DEADLINE, stale_ttl: DEFAULT_STALE_TTL }
    }

    /// Builds a store with explicit lock tuning, for tests.
    #[must_use]
    pub fn with_tuning(root: PathBuf, acquire_deadline: Duration, stale_ttl: Duration) -> Self {
        Self { root, acquire_deadline, stale_ttl }
    }

    fn doc_path(&self, session_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_file_stem(session_id)))
    }

    fn lock_path(&self, session_id: &str) -> PathBuf {
        self.root.join(format!("{}.json.lock", sanitize_file_stem(session_id)))
    }

    /// Returns the existing session state for `session_id`, creating one on
    /// first use.
    ///
    /// # Errors
    /// Propagates I/O and corruption failures from the underlying document.
    pub fn get_or_create(&self, session_id: &str) -> Result<SessionState, CoreError> {
        match self.get(session_id) {
            Ok(state) => Ok(state),
            Err(CoreError::NotFound(_)) => {
                let state = SessionState::new(session_id.to_string());
                self.write(&state)?;
                Ok(state)
            }
            Err(err) => Err(err),
        }
    }

    /// Reads the current session state for `session_id`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no state exists, or
    /// [`CoreError::Corrupt`] if the document fails to parse.
    pub fn get(&self, session_id: &str) -> Result<SessionState, CoreError> {
        let path = self.doc_path(session_id);
        let bytes = fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(format!("no session state for {session_id}")),
            _ => CoreError::Corrupt(format!("failed reading {}: {err}", path.display())),
        })?;
        serde_json::from_slice(&bytes).map_err(|err| CoreError::Corrupt(format!("malformed session state {}: {err}", path.display())))
    }

    /// Records one task dispatch against the session, creating it if absent.
    ///
    /// # Errors
    /// Propagates lock and I/O failures.
    pub fn record_task(&self, session_id: &str, blocked: bool) -> Result<SessionState, CoreError> {
        fs::create_dir_all(&self.root).map_err(|err| CoreError::Corrupt(format!("failed creating {}: {err}", self.root.display())))?;
        let lock = RunLock::acquire(&self.lock_path(session_id), session_id, self.acquire_deadline, self.stale_ttl)?;
        let mut state = self.get_or_create(session_id)?;
        state.record_task(blocked);
        self.write(&state)?;
        lock.release()?;
        Ok(state)
    }

    /// Records one gate outcome against the session, creating it if absent.
    ///
    /// # Errors
    /// Propagates lock and I/O failures.
    pub fn record_gate(&self, session_id: &str, allowed: bool) -> Result<SessionState, CoreError> {
        fs::create_dir_all(&self.root).map_err(|err| CoreError::Corrupt(format!("failed creating {}: {err}", self.root.display())))?;
        let lock = RunLock::acquire(&self.lock_path(session_id), session_id, self.acquire_deadline, self.stale_ttl)?;
        let mut state = self.get_or_create(session_id)?;
        state.record_gate(allowed);
        self.write(&state)?;
        lock.release()?;
        Ok(state)
    }

    fn write(&self, state: &SessionState) -> Result<(), CoreError> {
        fs::create_dir_all(&self.root).map_err(|err| CoreError::Corrupt(format!("failed creating {}: {err}", self.root.display())))?;
        let bytes = serde_json::to_vec_pretty(state).map_err(|err| CoreError::Corrupt(format!("failed serializing session state: {err}")))?;
        write_atomic(&self.doc_path(&state.session_id), &bytes)
    }
}

fn sanitize_file_stem(raw: &str) -> String {
    raw.chars().map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::SessionStore;

    #[test]
    fn get_or_create_starts_from_zero() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());
        let state = store.get_or_create("sess-1").expect("get_or_create");
        assert_eq!(state.tasks_seen, 0);
    }

    #[test]
    fn record_task_and_gate_accumulate() {
        let dir = tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());
        store.record_task("sess-1", true).expect("record_task");
        store.record_task("sess-1", false).expect("record_task");
        let state = store.record_gate("sess-1", true).expect("record_gate");
        assert_eq!(state.tasks_seen, 2);
        assert_eq!(state.tasks_blocked, 1);
        assert_eq!(state.gates_passed, 1);
    }
}
