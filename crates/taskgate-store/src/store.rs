// crates/taskgate-store/src/store.rs
// ============================================================================
// Module: Run Store
// Description: Crash-safe, concurrency-safe persistence for run records and
//              artifact registries (spec §4.1).
// Purpose: The single writer of `run.json`, `artifact-registry.json`, and the
//          derived `project-db.json` for every run_id.
// Dependencies: std, serde_json, taskgate-core, crate::{atomic, cache, lock,
//               layout, project_db, registry}
// ============================================================================

//! ## Overview
//! Every mutating method acquires the per-run lock (`crate::lock::RunLock`)
//! before touching `run.json` or `artifact-registry.json`, writes through
//! `crate::atomic::write_atomic`, and re-derives `project-db.json` before
//! releasing the lock. Read-only methods may consult the short-TTL registry
//! cache (`crate::cache::RegistryCache`) instead of the lock, tolerating a
//! concurrent rewrite per spec §5.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use taskgate_core::ArtifactRecord;
use taskgate_core::CoreError;
use taskgate_core::IdempotencyPolicy;
use taskgate_core::Owners;
use taskgate_core::PublishAttempt;
use taskgate_core::PublishStatus;
use taskgate_core::RunId;
use taskgate_core::RunRecord;
use taskgate_core::RunStatus;
use taskgate_core::StepIndex;
use taskgate_core::TaskQueueEntry;
use taskgate_core::Timestamp;
use taskgate_core::ValidationStatus;

use crate::atomic::write_atomic;
use crate::cache::DEFAULT_TTL;
use crate::cache::RegistryCache;
use crate::layout::RunLayout;
use crate::lock::DEFAULT_ACQUIRE_DEADLINE;
use crate::lock::DEFAULT_STALE_TTL;
use crate::lock::RunLock;
use crate::project_db::ProjectDatabase;
use crate::registry::IndexedRegistry;
use crate::registry::RegistryDocument;

/// Options accepted by [`RunStore::create_run`].
#[derive(Debug, Clone, Default)]
pub struct CreateRunOptions {
    /// Identifier of the workflow definition this run executes.
    pub workflow_id: String,
    /// The specific selected workflow variant.
    pub selected_workflow: String,
    /// Orchestrator session id that is creating this run, if known.
    pub orchestrator_session_id: Option<String>,
}

/// A partial update to a [`RunRecord`], applied by [`RunStore::update_run`].
///
/// Only `metadata` is deep-merged; every other `Some(_)` field replaces the
/// run's current value outright (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct RunPatch {
    /// Replacement status, if the caller wants to transition it.
    pub status: Option<RunStatus>,
    /// Replacement current step.
    pub current_step: Option<StepIndex>,
    /// Replacement task queue.
    pub task_queue: Option<Vec<TaskQueueEntry>>,
    /// Replacement owners.
    pub owners: Option<Owners>,
    /// Metadata fragment to deep-merge into the run's existing metadata.
    pub metadata: BTreeMap<String, Value>,
}

/// A request to mutate only an artifact's publishing sub-record (spec §4.1).
#[derive(Debug, Clone)]
pub struct PublishingUpdate {
    /// Destination this attempt targeted.
    pub target: String,
    /// Outcome of the attempt.
    pub status: PublishStatus,
    /// Error detail, present when `status == Failed`.
    pub error: Option<String>,
}

/// The crash-safe, concurrency-safe persistence layer for runs (spec §4.1).
pub struct RunStore {
    /// Root directory containing the `runs/` tree.
    runs_root: PathBuf,
    /// Short-TTL in-process cache of artifact registries.
    cache: RegistryCache,
    /// Maximum time to wait for a per-run lock before failing.
    acquire_deadline: Duration,
    /// Age after which a held lock is considered abandoned.
    stale_ttl: Duration,
}

impl RunStore {
    /// Builds a store rooted at `runs_root` with default cache TTL, lock
    /// deadline, and stale-lock TTL.
    #[must_use]
    pub fn new(runs_root: PathBuf) -> Self {
        Self { runs_root, cache: RegistryCache::new(DEFAULT_TTL), acquire_deadline: DEFAULT_ACQUIRE_DEADLINE, stale_ttl: DEFAULT_STALE_TTL }
    }

    /// Builds a store with explicit cache/lock tuning, for tests that need
    /// short deadlines.
    #[must_use]
    pub fn with_tuning(runs_root: PathBuf, cache_ttl: Duration, acquire_deadline: Duration, stale_ttl: Duration) -> Self {
        Self { runs_root, cache: RegistryCache::new(cache_ttl), acquire_deadline, stale_ttl }
    }

    /// Builds the path layout for `run_id` rooted at this store's `runs_root`.
    fn layout(&self, run_id: &RunId) -> RunLayout {
        RunLayout::new(&self.runs_root, run_id)
    }

    /// Acquires the per-run lock for `run_id`, bounded by this store's tuning.
    fn lock(&self, run_id: &RunId) -> Result<RunLock, CoreError> {
        RunLock::acquire(&self.layout(run_id).lock_file(), run_id.as_str(), self.acquire_deadline, self.stale_ttl)
    }

    /// The run's own directory, for callers (the Workflow Stepper, the CLI)
    /// that need to resolve artifact paths relative to it without
    /// duplicating this store's layout rules.
    #[must_use]
    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.layout(run_id).dir().to_path_buf()
    }

    /// Creates a new run directory and its empty artifact registry.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidArgument`] if the run directory already
    /// exists, or [`CoreError::Corrupt`] if any I/O step fails.
    pub fn create_run(&self, run_id: &RunId, opts: CreateRunOptions) -> Result<RunRecord, CoreError> {
        let layout = self.layout(run_id);
        if layout.dir().exists() {
            return Err(CoreError::InvalidArgument(format!("run directory already exists for {run_id}")));
        }
        fs::create_dir_all(layout.dir()).map_err(|err| CoreError::Corrupt(format!("failed creating run directory: {err}")))?;
        for subdir in layout.subdirectories() {
            fs::create_dir_all(&subdir).map_err(|err| CoreError::Corrupt(format!("failed creating {}: {err}", subdir.display())))?;
        }

        let mut run = RunRecord::new(run_id.clone(), opts.workflow_id, opts.selected_workflow);
        run.owners.orchestrator_session_id = opts.orchestrator_session_id;

        write_json(&layout.run_file(), &run)?;
        write_json(&layout.registry_file(), &RegistryDocument::new())?;
        self.sync_project_db(&layout, &run, &RegistryDocument::new())?;

        Ok(run)
    }

    /// Reads a run record from disk.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if the run directory or `run.json` is
    /// absent, or [`CoreError::Corrupt`] if the file fails to parse.
    pub fn read_run(&self, run_id: &RunId) -> Result<RunRecord, CoreError> {
        read_json(&self.layout(run_id).run_file(), run_id.as_str())
    }

    /// Lists every run directory under this store's root, for callers (the
    /// Health Monitor) that need to scan all runs rather than read one.
    ///
    /// Entries that are not valid run directories (no `run.json`, or a
    /// directory name that doesn't parse as a [`RunId`]) are skipped rather
    /// than failing the whole scan.
    ///
    /// # Errors
    /// Returns [`CoreError::Corrupt`] if `runs_root` itself cannot be read.
    pub fn list_run_ids(&self) -> Result<Vec<RunId>, CoreError> {
        if !self.runs_root.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.runs_root).map_err(|err| CoreError::Corrupt(format!("failed listing {}: {err}", self.runs_root.display())))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| CoreError::Corrupt(format!("failed reading directory entry under {}: {err}", self.runs_root.display())))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
            let Ok(run_id) = RunId::parse(name) else { continue };
            if self.layout(&run_id).run_file().is_file() {
                ids.push(run_id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Applies `patch` to the run's record: replaces every `Some(_)` field,
    /// deep-merges `metadata`, and re-stamps timestamps per spec §4.1.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`]/[`CoreError::Corrupt`] from the
    /// underlying read, or [`CoreError::LockTimeout`] if the per-run lock
    /// could not be acquired before the deadline.
    pub fn update_run(&self, run_id: &RunId, patch: RunPatch) -> Result<RunRecord, CoreError> {
        let layout = self.layout(run_id);
        let lock = self.lock(run_id)?;

        let mut run = read_json::<RunRecord>(&layout.run_file(), run_id.as_str())?;
        let previous_step = run.current_step;
        let was_in_progress = run.status == RunStatus::InProgress;

        if let Some(status) = patch.status {
            run.status = status;
        }
        if let Some(step) = patch.current_step {
            run.current_step = step;
        }
        if let Some(task_queue) = patch.task_queue {
            run.task_queue = task_queue;
        }
        if let Some(owners) = patch.owners {
            run.owners = owners;
        }
        deep_merge_metadata(&mut run.metadata, patch.metadata);

        let now = Timestamp::now();
        run.updated_at = now;
        if run.status == RunStatus::InProgress && !was_in_progress && run.timestamps.started_at.is_none() {
            run.timestamps.started_at = Some(now);
        }
        if run.status == RunStatus::Completed {
            run.timestamps.completed_at = Some(now);
        }
        if run.current_step != previous_step {
            run.timestamps.last_step_completed_at = Some(now);
        }

        write_json(&layout.run_file(), &run)?;
        let registry = read_json::<RegistryDocument>(&layout.registry_file(), run_id.as_str()).unwrap_or_default();
        self.sync_project_db(&layout, &run, &registry)?;

        lock.release()?;
        Ok(run)
    }

    /// Reads the artifact registry for `run_id`, consulting the TTL cache
    /// first (spec §4.1 "Caching").
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`]/[`CoreError::Corrupt`] if the registry
    /// file is missing or malformed.
    pub fn read_artifact_registry(&self, run_id: &RunId) -> Result<IndexedRegistry, CoreError> {
        if let Some(cached) = self.cache.get(run_id.as_str()) {
            return Ok(cached);
        }
        let document = read_json::<RegistryDocument>(&self.layout(run_id).registry_file(), run_id.as_str())?;
        let registry = IndexedRegistry::from_document(document);
        self.cache.put(run_id.as_str(), registry.clone());
        Ok(registry)
    }

    /// Registers `artifact` under `run_id`'s registry, applying `policy` if
    /// an artifact with the same name already exists (spec §4.1).
    ///
    /// # Errors
    /// Returns [`CoreError::LockTimeout`] if the lock could not be acquired,
    /// or the usual read/write failures.
    pub fn register_artifact(&self, run_id: &RunId, artifact: ArtifactRecord, policy: IdempotencyPolicy) -> Result<ArtifactRecord, CoreError> {
        let layout = self.layout(run_id);
        let lock = self.lock(run_id)?;
        self.cache.invalidate(run_id.as_str());

        let document = read_json::<RegistryDocument>(&layout.registry_file(), run_id.as_str())?;
        let mut registry = IndexedRegistry::from_document(document);

        let stored = apply_idempotency_policy(&mut registry, artifact, policy);

        write_json(&layout.registry_file(), &registry.to_document())?;
        self.cache.put(run_id.as_str(), registry.clone());

        let run = read_json::<RunRecord>(&layout.run_file(), run_id.as_str())?;
        self.sync_project_db(&layout, &run, &registry.to_document())?;

        lock.release()?;
        Ok(stored)
    }

    /// Mutates only the publishing fields of the named artifact, appending
    /// an attempt record (spec §4.1).
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no artifact with that name exists,
    /// [`CoreError::SchemaValidationFailure`] if the update would mark the
    /// artifact published without a passing validation status, or the usual
    /// lock/read/write failures.
    pub fn update_artifact_publishing_status(&self, run_id: &RunId, name: &str, update: PublishingUpdate) -> Result<ArtifactRecord, CoreError> {
        let layout = self.layout(run_id);
        let lock = self.lock(run_id)?;
        self.cache.invalidate(run_id.as_str());

        let document = read_json::<RegistryDocument>(&layout.registry_file(), run_id.as_str())?;
        let mut registry = IndexedRegistry::from_document(document);

        let Some(existing) = registry.get_by_name(name).cloned() else {
            return Err(CoreError::NotFound(format!("artifact {name} not found in run {run_id}")));
        };
        let mut record = existing;
        if update.status == PublishStatus::Success && record.validation_status != ValidationStatus::Pass {
            return Err(CoreError::SchemaValidationFailure(format!("artifact {name} cannot publish without a passing validation status")));
        }

        let now = Timestamp::now();
        record.publish_attempts.push(PublishAttempt { target: update.target.clone(), status: update.status, attempted_at: now, error: update.error.clone() });
        record.publish_status = update.status;
        record.publish_error = update.error;
        if update.status == PublishStatus::Success {
            record.published = true;
            record.published_at = Some(now);
        }
        if !record.publish_targets.contains(&update.target) {
            record.publish_targets.push(update.target);
        }
        record.updated_at = now;

        registry.set(record.clone());
        write_json(&layout.registry_file(), &registry.to_document())?;
        self.cache.put(run_id.as_str(), registry.clone());

        let run = read_json::<RunRecord>(&layout.run_file(), run_id.as_str())?;
        self.sync_project_db(&layout, &run, &registry.to_document())?;

        lock.release()?;
        Ok(record)
    }

    /// Re-derives and writes `project-db.json`. This is the *only* writer of
    /// the derived project database in the workspace (spec §9 Open Question,
    /// resolved in DESIGN.md).
    fn sync_project_db(&self, layout: &RunLayout, run: &RunRecord, registry: &RegistryDocument) -> Result<(), CoreError> {
        let projection = ProjectDatabase::derive(run, registry).map_err(CoreError::Corrupt)?;
        write_json(&layout.project_db_file(), &projection)
    }
}

/// Resolves a write under `policy` against whatever already occupies
/// `artifact.name` in `registry`, mutating the registry and returning the
/// record that was actually stored (spec §4.1).
fn apply_idempotency_policy(registry: &mut IndexedRegistry, artifact: ArtifactRecord, policy: IdempotencyPolicy) -> ArtifactRecord {
    let Some(existing) = registry.get_by_name(&artifact.name).cloned() else {
        registry.set(artifact.clone());
        return artifact;
    };

    match policy {
        IdempotencyPolicy::Overwrite => {
            let mut replacement = artifact;
            replacement.created_at = existing.created_at;
            replacement.version = existing.version;
            registry.set(replacement.clone());
            replacement
        }
        IdempotencyPolicy::Skip => {
            if existing.validation_status == ValidationStatus::Pass {
                existing
            } else {
                let mut replacement = artifact;
                replacement.created_at = existing.created_at;
                registry.set(replacement.clone());
                replacement
            }
        }
        IdempotencyPolicy::Version => {
            let next_version = existing.version + 1;
            let mut versioned = artifact;
            versioned.name = format!("{}-v{next_version}", versioned.name);
            versioned.version = next_version;
            registry.set(versioned.clone());
            versioned
        }
    }
}

/// Deep-merges `patch` into `base`, recursing into nested JSON objects and
/// replacing any non-object value outright (spec §4.1 "deep-merging metadata").
fn deep_merge_metadata(base: &mut BTreeMap<String, Value>, patch: BTreeMap<String, Value>) {
    for (key, value) in patch {
        let slot = base.entry(key).or_insert(Value::Null);
        merge_json_value(slot, value);
    }
}

/// Recursive step of [`deep_merge_metadata`] for a single JSON value.
fn merge_json_value(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                let slot = base_map.entry(key).or_insert(Value::Null);
                merge_json_value(slot, value);
            }
        }
        (slot, patch_value) => *slot = patch_value,
    }
}

/// Reads and parses a JSON document, mapping a missing file to
/// [`CoreError::NotFound`] and a malformed one to [`CoreError::Corrupt`].
fn read_json<T: serde::de::DeserializeOwned>(path: &Path, run_id: &str) -> Result<T, CoreError> {
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => CoreError::NotFound(format!("{} for run {run_id}", path.display())),
        _ => CoreError::Corrupt(format!("failed reading {}: {err}", path.display())),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| CoreError::Corrupt(format!("malformed JSON in {}: {err}", path.display())))
}

/// Serializes `value` to pretty JSON and writes it atomically to `path`.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|err| CoreError::Corrupt(format!("failed serializing {}: {err}", path.display())))?;
    write_atomic(path, &bytes)
}

/// Moves a corrupt file aside to `<name>.corrupt-<ts>` for forensics,
/// matching the recovery-read behaviour documented in spec §4.1.
///
/// # Errors
/// Returns [`CoreError::Corrupt`] if the rename fails.
pub fn quarantine_corrupt_file(path: &Path) -> Result<PathBuf, CoreError> {
    let millis = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
    let mut quarantined = path.to_path_buf();
    let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or("document");
    quarantined.set_file_name(format!("{file_name}.corrupt-{millis}"));
    fs::rename(path, &quarantined).map_err(|err| CoreError::Corrupt(format!("failed quarantining {}: {err}", path.display())))?;
    Ok(quarantined)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use taskgate_core::AgentId;
    use taskgate_core::IdempotencyPolicy;
    use taskgate_core::StepIndex;
    use tempfile::tempdir;

    use super::ArtifactRecord;
    use super::CreateRunOptions;
    use super::RunId;
    use super::RunPatch;
    use super::RunStatus;
    use super::RunStore;

    fn store(root: &std::path::Path) -> RunStore {
        RunStore::new(root.to_path_buf())
    }

    #[test]
    fn create_run_fails_if_directory_already_exists() {
        let dir = tempdir().expect("tempdir");
        let store = store(dir.path());
        let run_id = RunId::parse("run-1").expect("valid");
        store.create_run(&run_id, CreateRunOptions::default()).expect("first create succeeds");
        let second = store.create_run(&run_id, CreateRunOptions::default());
        assert!(second.is_err());
    }

    #[test]
    fn update_run_sets_started_at_on_first_in_progress_transition() {
        let dir = tempdir().expect("tempdir");
        let store = store(dir.path());
        let run_id = RunId::parse("run-1").expect("valid");
        store.create_run(&run_id, CreateRunOptions::default()).expect("create");

        let patch = RunPatch { status: Some(RunStatus::InProgress), ..RunPatch::default() };
        let run = store.update_run(&run_id, patch).expect("update");
        assert!(run.timestamps.started_at.is_some());
        assert!(!store.layout(&run_id).lock_file().exists());
    }

    #[test]
    fn update_run_sets_completed_at_on_completion() {
        let dir = tempdir().expect("tempdir");
        let store = store(dir.path());
        let run_id = RunId::parse("run-1").expect("valid");
        store.create_run(&run_id, CreateRunOptions::default()).expect("create");
        store.update_run(&run_id, RunPatch { status: Some(RunStatus::InProgress), ..RunPatch::default() }).expect("to in_progress");
        let run = store.update_run(&run_id, RunPatch { status: Some(RunStatus::Completed), ..RunPatch::default() }).expect("to completed");
        assert_eq!(run.timestamps.completed_at, Some(run.updated_at));
    }

    #[test]
    fn update_run_deep_merges_metadata_without_clobbering_sibling_keys() {
        let dir = tempdir().expect("tempdir");
        let store = store(dir.path());
        let run_id = RunId::parse("run-1").expect("valid");
        store.create_run(&run_id, CreateRunOptions::default()).expect("create");

        let mut first_meta = std::collections::BTreeMap::new();
        first_meta.insert("blockers".to_string(), serde_json::json!(["needs review"]));
        store.update_run(&run_id, RunPatch { metadata: first_meta, ..RunPatch::default() }).expect("first patch");

        let mut second_meta = std::collections::BTreeMap::new();
        second_meta.insert("next_steps".to_string(), serde_json::json!(["deploy"]));
        let run = store.update_run(&run_id, RunPatch { metadata: second_meta, ..RunPatch::default() }).expect("second patch");

        assert!(run.metadata.contains_key("blockers"));
        assert!(run.metadata.contains_key("next_steps"));
    }

    #[test]
    fn register_artifact_version_policy_suffixes_name() {
        let dir = tempdir().expect("tempdir");
        let store = store(dir.path());
        let run_id = RunId::parse("run-1").expect("valid");
        store.create_run(&run_id, CreateRunOptions::default()).expect("create");

        let artifact = ArtifactRecord::new("design".to_string(), StepIndex::ZERO, AgentId::new("architect"), "artifacts/design".to_string());
        store.register_artifact(&run_id, artifact.clone(), IdempotencyPolicy::Overwrite).expect("first register");

        let versioned = store.register_artifact(&run_id, artifact, IdempotencyPolicy::Version).expect("second register");
        assert_eq!(versioned.name, "design-v2");
        assert_eq!(versioned.version, 2);
    }

    #[test]
    fn register_artifact_skip_policy_no_ops_when_already_passing() {
        let dir = tempdir().expect("tempdir");
        let store = store(dir.path());
        let run_id = RunId::parse("run-1").expect("valid");
        store.create_run(&run_id, CreateRunOptions::default()).expect("create");

        let mut artifact = ArtifactRecord::new("design".to_string(), StepIndex::ZERO, AgentId::new("architect"), "artifacts/design".to_string());
        artifact.validation_status = taskgate_core::ValidationStatus::Pass;
        store.register_artifact(&run_id, artifact.clone(), IdempotencyPolicy::Overwrite).expect("first register");

        let mut changed = artifact;
        changed.path = "artifacts/design-v2".to_string();
        let result = store.register_artifact(&run_id, changed, IdempotencyPolicy::Skip).expect("skip no-ops");
        assert_eq!(result.path, "artifacts/design");
    }

    #[test]
    fn concurrent_updates_are_linearisable_and_preserve_both_fields() {
        let dir = tempdir().expect("tempdir");
        let store = Arc::new(store(dir.path()));
        let run_id = RunId::parse("run-1").expect("valid");
        store.create_run(&run_id, CreateRunOptions::default()).expect("create");

        let store_a = Arc::clone(&store);
        let run_id_a = run_id.clone();
        let handle_a = thread::spawn(move || {
            let mut meta = std::collections::BTreeMap::new();
            meta.insert("field_a".to_string(), serde_json::json!(1));
            store_a.update_run(&run_id_a, RunPatch { metadata: meta, ..RunPatch::default() })
        });

        let store_b = Arc::clone(&store);
        let run_id_b = run_id.clone();
        let handle_b = thread::spawn(move || {
            let mut meta = std::collections::BTreeMap::new();
            meta.insert("field_b".to_string(), serde_json::json!(2));
            store_b.update_run(&run_id_b, RunPatch { metadata: meta, ..RunPatch::default() })
        });

        handle_a.join().expect("thread a").expect("update a");
        handle_b.join().expect("thread b").expect("update b");

        let final_run = store.read_run(&run_id).expect("read");
        assert_eq!(final_run.metadata.get("field_a"), Some(&serde_json::json!(1)));
        assert_eq!(final_run.metadata.get("field_b"), Some(&serde_json::json!(2)));
        assert!(!store.layout(&run_id).lock_file().exists());
    }
}
