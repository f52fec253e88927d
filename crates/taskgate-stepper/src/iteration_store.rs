// crates/taskgate-stepper/src/iteration_store.rs
// ============================================================================
// Module: Iteration State Store
// Description: Persistence for per-workflow-id self-healing loop state
//              (spec §3.5).
// Purpose: Give the Stepper and CLI a place to init/read/advance iteration
//          state without duplicating the Pattern Learner's per-key
//          lock-then-atomic-write discipline.
// Dependencies: serde_json, taskgate-core, taskgate-store, std
// ============================================================================

//! ## Overview
//! Grounded on `taskgate_learner::PatternStore`: one JSON document per key
//! (here, `workflow_id` rather than task type) under
//! `<root>/iterations/<workflow_id>.json`, guarded by
//! [`taskgate_store::lock::RunLock`] and written through
//! [`taskgate_store::atomic::write_atomic`].

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use taskgate_core::ComponentRating;
use taskgate_core::CoreError;
use taskgate_core::IterationState;
use taskgate_core::IterationStatus;
use taskgate_core::Timestamp;
use taskgate_store::atomic::write_atomic;
use taskgate_store::lock::DEFAULT_ACQUIRE_DEADLINE;
use taskgate_store::lock::DEFAULT_STALE_TTL;
use taskgate_store::lock::RunLock;

/// Persistence for [`IterationState`], one document per workflow id
/// (spec §3.5).
pub struct IterationStore {
    /// Root directory holding one JSON document per workflow id.
    root: PathBuf,
    /// Maximum time to wait for a per-workflow lock before failing.
    acquire_deadline: Duration,
    /// Age after which a held lock is considered abandoned.
    stale_ttl: Duration,
}

impl IterationStore {
    /// Builds a store rooted at `root` with default lock tuning.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root, acquire_deadline: DEFAULT_ACQUIRE_DEADLINE, stale_ttl: DEFAULT_STALE_TTL }
    }

    /// Builds a store with explicit lock tuning, for tests that need short
    /// deadlines.
    #[must_use]
    pub fn with_tuning(root: PathBuf, acquire_deadline: Duration, stale_ttl: Duration) -> Self {
        Self { root, acquire_deadline, stale_ttl }
    }

    fn doc_path(&self, workflow_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_file_stem(workflow_id)))
    }

    fn lock_path(&self, workflow_id: &str) -> PathBuf {
        self.root.join(format!("{}.json.lock", sanitize_file_stem(workflow_id)))
    }

    /// Creates a fresh iteration state for `workflow_id`.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidArgument`] if a state already exists for
    /// this workflow id.
    pub fn init(&self, workflow_id: String, target_rating: f64) -> Result<IterationState, CoreError> {
        fs::create_dir_all(&self.root).map_err(|err| CoreError::Corrupt(format!("failed creating {}: {err}", self.root.display())))?;
        if self.doc_path(&workflow_id).is_file() {
            return Err(CoreError::InvalidArgument(format!("iteration state already exists for workflow {workflow_id}")));
        }
        let state = IterationState::new(workflow_id, target_rating);
        self.write(&state)?;
        Ok(state)
    }

    /// Reads the current iteration state for `workflow_id`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no state has been initialized, or
    /// [`CoreError::Corrupt`] if the document fails to parse.
    pub fn get(&self, workflow_id: &str) -> Result<IterationState, CoreError> {
        let path = self.doc_path(workflow_id);
        let bytes = fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(format!("no iteration state for workflow {workflow_id}")),
            _ => CoreError::Corrupt(format!("failed reading {}: {err}", path.display())),
        })?;
        serde_json::from_slice(&bytes).map_err(|err| CoreError::Corrupt(format!("malformed iteration state {}: {err}", path.display())))
    }

    /// Advances one iteration: increments `iteration_count`, records
    /// `component` at `rating`, appends `fix_note` to the history if
    /// supplied, and flips to [`IterationStatus::Complete`] when every rated
    /// component now meets the target (spec §3.5).
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no state exists, or propagates lock
    /// and I/O failures.
    pub fn bump(&self, workflow_id: &str, component: String, rating: ComponentRating, fix_note: Option<String>) -> Result<IterationState, CoreError> {
        let lock = RunLock::acquire(&self.lock_path(workflow_id), workflow_id, self.acquire_deadline, self.stale_ttl)?;
        let mut state = self.get(workflow_id)?;

        state.iteration_count = state.iteration_count.saturating_add(1);
        state.component_ratings.insert(component, rating);
        if let Some(note) = fix_note {
            state.fix_history.push(note);
        }
        if state.all_ratings_meet_target() {
            state.status = IterationStatus::Complete;
        }
        state.updated_at = Timestamp::now();

        self.write(&state)?;
        lock.release()?;
        Ok(state)
    }

    /// Sets `status` directly, without touching ratings or history.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no state exists.
    pub fn set_status(&self, workflow_id: &str, status: IterationStatus) -> Result<IterationState, CoreError> {
        let lock = RunLock::acquire(&self.lock_path(workflow_id), workflow_id, self.acquire_deadline, self.stale_ttl)?;
        let mut state = self.get(workflow_id)?;
        state.status = status;
        state.updated_at = Timestamp::now();
        self.write(&state)?;
        lock.release()?;
        Ok(state)
    }

    /// Marks the loop [`IterationStatus::Complete`] (or
    /// [`IterationStatus::Abandoned`] if `completion_status` signals a
    /// giving-up rather than a success) and records `completion_status`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no state exists.
    pub fn complete(&self, workflow_id: &str, completion_status: String, abandoned: bool) -> Result<IterationState, CoreError> {
        let lock = RunLock::acquire(&self.lock_path(workflow_id), workflow_id, self.acquire_deadline, self.stale_ttl)?;
        let mut state = self.get(workflow_id)?;
        state.status = if abandoned { IterationStatus::Abandoned } else { IterationStatus::Complete };
        state.completion_status = Some(completion_status);
        state.updated_at = Timestamp::now();
        self.write(&state)?;
        lock.release()?;
        Ok(state)
    }

    fn write(&self, state: &IterationState) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|err| CoreError::Corrupt(format!("failed serializing iteration state: {err}")))?;
        write_atomic(&self.doc_path(&state.workflow_id), &bytes)
    }
}

/// Replaces filesystem-unsafe bytes in a workflow id with `_`, mirroring
/// `taskgate_learner`'s task-type file-stem sanitizer.
fn sanitize_file_stem(raw: &str) -> String {
    raw.chars().map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use taskgate_core::ComponentRating;
    use taskgate_core::IterationStatus;
    use tempfile::tempdir;

    use super::IterationStore;

    #[test]
    fn init_then_get_round_trips() {
        let dir = tempdir().expect("tempdir");
        let store = IterationStore::new(dir.path().to_path_buf());
        store.init("wf-impl".to_string(), 8.0).expect("init");
        let state = store.get("wf-impl").expect("get");
        assert_eq!(state.iteration_count, 0);
        assert_eq!(state.status, IterationStatus::InProgress);
    }

    #[test]
    fn init_twice_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let store = IterationStore::new(dir.path().to_path_buf());
        store.init("wf-impl".to_string(), 8.0).expect("init");
        assert!(store.init("wf-impl".to_string(), 8.0).is_err());
    }

    #[test]
    fn bump_completes_once_every_rating_meets_target() {
        let dir = tempdir().expect("tempdir");
        let store = IterationStore::new(dir.path().to_path_buf());
        store.init("wf-impl".to_string(), 8.0).expect("init");

        let state = store.bump("wf-impl", "tests".to_string(), ComponentRating { score: 9.0 }, Some("added coverage".to_string())).expect("bump");
        assert_eq!(state.status, IterationStatus::InProgress);
        assert_eq!(state.iteration_count, 1);

        let state = store.bump("wf-impl", "docs".to_string(), ComponentRating { score: 8.5 }, None).expect("bump");
        assert_eq!(state.status, IterationStatus::Complete);
        assert_eq!(state.iteration_count, 2);
    }

    #[test]
    fn get_on_unknown_workflow_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = IterationStore::new(dir.path().to_path_buf());
        let err = store.get("nonexistent").expect_err("not found");
        assert!(matches!(err, taskgate_core::CoreError::NotFound(_)));
    }
}
