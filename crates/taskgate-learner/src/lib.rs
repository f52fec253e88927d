// crates/taskgate-learner/src/lib.rs
// ============================================================================
// Module: Taskgate Learner
// Description: Append-only Pattern Learner: persists one execution log per
//              task type and computes non-binding routing suggestions
//              (spec §4.9).
// Purpose: Let the Agent Router and Health Monitor observe historical
//          routing outcomes without either one owning the persistence.
// Dependencies: serde, serde_json, taskgate-core, taskgate-store
// ============================================================================

//! ## Overview
//! Grounded on `taskgate-store::store::RunStore`'s lock-then-atomic-write
//! discipline, generalised from a per-run document to a per-task-type one:
//! `<patterns_root>/<task_type>.json` holds a [`taskgate_core::TaskPatternLog`],
//! guarded by the same [`taskgate_store::lock`] primitive keyed on the task
//! type name instead of a run id. [`PatternStore::record`] appends an
//! execution; [`PatternStore::suggest`] computes the (non-binding) routing
//! suggestion spec §4.9 describes, never applied silently by the caller.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use taskgate_core::CoreError;
use taskgate_core::ExecutionOutcome;
use taskgate_core::PatternExecution;
use taskgate_core::TaskPatternLog;
use taskgate_core::TaskType;
use taskgate_store::atomic::write_atomic;
use taskgate_store::lock::DEFAULT_ACQUIRE_DEADLINE;
use taskgate_store::lock::DEFAULT_STALE_TTL;
use taskgate_store::lock::RunLock;

/// Minimum number of recorded executions before a suggestion is offered
/// (spec §4.9: sparse history is not a reliable signal).
pub const MIN_EXECUTIONS_FOR_SUGGESTION: usize = 3;

/// A non-binding improvement suggestion the Router may surface but never
/// applies automatically (spec §4.5 step 7, §4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingSuggestion {
    /// The task type this suggestion concerns.
    pub task_type: TaskType,
    /// Observed success rate across every recorded execution.
    pub observed_success_rate: f64,
    /// Human-readable rationale for the suggestion.
    pub rationale: String,
    /// The agent ordering most frequently associated with a successful
    /// outcome, if one ordering dominates.
    pub suggested_agent_order: Option<Vec<String>>,
}

/// Persistence for the append-only per-task-type pattern log (spec §4.9).
pub struct PatternStore {
    /// Root directory holding one JSON document per task type.
    patterns_root: PathBuf,
    /// Maximum time to wait for a per-task-type lock before failing.
    acquire_deadline: Duration,
    /// Age after which a held lock is considered abandoned.
    stale_ttl: Duration,
}

impl PatternStore {
    /// Builds a store rooted at `patterns_root` with default lock tuning.
    #[must_use]
    pub fn new(patterns_root: PathBuf) -> Self {
        Self { patterns_root, acquire_deadline: DEFAULT_ACQUIRE_DEADLINE, stale_ttl: DEFAULT_STALE_TTL }
    }

    /// Builds a store with explicit lock tuning, for tests that need short
    /// deadlines.
    #[must_use]
    pub fn with_tuning(patterns_root: PathBuf, acquire_deadline: Duration, stale_ttl: Duration) -> Self {
        Self { patterns_root, acquire_deadline, stale_ttl }
    }

    /// Path of the log document for `task_type`.
    fn log_path(&self, task_type: &TaskType) -> PathBuf {
        self.patterns_root.join(format!("{}.json", sanitize_file_stem(task_type.as_str())))
    }

    /// Path of the lock file guarding `task_type`'s log document.
    fn lock_path(&self, task_type: &TaskType) -> PathBuf {
        self.patterns_root.join(format!("{}.json.lock", sanitize_file_stem(task_type.as_str())))
    }

    /// Reads the pattern log for `task_type`, returning an empty log if none
    /// has been recorded yet.
    ///
    /// # Errors
    /// Returns [`CoreError::Corrupt`] if the document exists but fails to
    /// parse.
    pub fn read(&self, task_type: &TaskType) -> Result<TaskPatternLog, CoreError> {
        let path = self.log_path(task_type);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| CoreError::Corrupt(format!("malformed pattern log {}: {err}", path.display()))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(TaskPatternLog::new()),
            Err(err) => Err(CoreError::Corrupt(format!("failed reading {}: {err}", path.display()))),
        }
    }

    /// Appends `execution` to `task_type`'s log, creating the document (and
    /// `patterns_root`) if this is its first execution.
    ///
    /// # Errors
    /// Returns [`CoreError::LockTimeout`] if the per-task-type lock could not
    /// be acquired, or [`CoreError::Corrupt`] on any I/O failure.
    pub fn record(&self, task_type: &TaskType, execution: PatternExecution) -> Result<TaskPatternLog, CoreError> {
        fs::create_dir_all(&self.patterns_root).map_err(|err| CoreError::Corrupt(format!("failed creating {}: {err}", self.patterns_root.display())))?;
        let lock = RunLock::acquire(&self.lock_path(task_type), task_type.as_str(), self.acquire_deadline, self.stale_ttl)?;

        let mut log = self.read(task_type)?;
        log.record(execution);

        let bytes = serde_json::to_vec_pretty(&log).map_err(|err| CoreError::Corrupt(format!("failed serializing pattern log: {err}")))?;
        write_atomic(&self.log_path(task_type), &bytes)?;

        lock.release()?;
        Ok(log)
    }

    /// Computes a non-binding routing suggestion for `task_type` from its
    /// recorded history, or `None` if fewer than
    /// [`MIN_EXECUTIONS_FOR_SUGGESTION`] executions have been recorded
    /// (spec §4.9).
    ///
    /// # Errors
    /// Returns [`CoreError::Corrupt`] if the underlying log fails to parse.
    pub fn suggest(&self, task_type: &TaskType) -> Result<Option<RoutingSuggestion>, CoreError> {
        let log = self.read(task_type)?;
        if log.executions.len() < MIN_EXECUTIONS_FOR_SUGGESTION {
            return Ok(None);
        }
        let Some(success_rate) = log.success_rate() else {
            return Ok(None);
        };

        let mut successful_orders: Vec<&Vec<String>> = log.executions.iter().filter(|execution| execution.outcome == ExecutionOutcome::Success).map(|execution| &execution.agents).collect();
        successful_orders.sort();
        let dominant_order = most_common(&successful_orders);

        let rationale = if success_rate < 0.5 {
            format!("Observed success rate {success_rate:.2} is below 50% across {} executions; consider reviewing the routing chain", log.executions.len())
        } else {
            format!("Observed success rate {success_rate:.2} across {} executions", log.executions.len())
        };

        Ok(Some(RoutingSuggestion { task_type: task_type.clone(), observed_success_rate: success_rate, rationale, suggested_agent_order: dominant_order.cloned() }))
    }
}

/// Returns the most frequently occurring slice in `orders`, or `None` if the
/// input is empty or every ordering is equally frequent.
fn most_common<'order>(orders: &[&'order Vec<String>]) -> Option<&'order Vec<String>> {
    let mut best: Option<(&Vec<String>, usize)> = None;
    for candidate in orders {
        let count = orders.iter().filter(|other| other == &candidate).count();
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((candidate, count)),
        }
    }
    best.filter(|(_, count)| *count > 1).map(|(order, _)| order)
}

/// Restricts a task-type name to filesystem-safe characters for use as a
/// file stem.
fn sanitize_file_stem(task_type: &str) -> String {
    task_type.chars().map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use taskgate_core::ExecutionOutcome;
    use taskgate_core::PatternExecution;
    use taskgate_core::TaskType;
    use taskgate_core::Timestamp;
    use tempfile::tempdir;

    use super::MIN_EXECUTIONS_FOR_SUGGESTION;
    use super::PatternStore;

    fn execution(outcome: ExecutionOutcome, agents: &[&str]) -> PatternExecution {
        PatternExecution { outcome, duration_minutes: 10.0, agents: agents.iter().map(|a| (*a).to_string()).collect(), feedback: None, timestamp: Timestamp::now() }
    }

    #[test]
    fn record_creates_the_root_and_appends() {
        let dir = tempdir().expect("tempdir");
        let store = PatternStore::new(dir.path().join("patterns"));
        let task_type = TaskType::new("SECURITY");

        store.record(&task_type, execution(ExecutionOutcome::Success, &["security-architect"])).expect("records");
        let log = store.read(&task_type).expect("reads");
        assert_eq!(log.executions.len(), 1);
    }

    #[test]
    fn suggestion_is_withheld_below_the_minimum_sample_size() {
        let dir = tempdir().expect("tempdir");
        let store = PatternStore::with_tuning(dir.path().join("patterns"), Duration::from_millis(200), Duration::from_secs(30));
        let task_type = TaskType::new("API");

        for _ in 0 .. MIN_EXECUTIONS_FOR_SUGGESTION - 1 {
            store.record(&task_type, execution(ExecutionOutcome::Success, &["backend-developer"])).expect("records");
        }
        assert!(store.suggest(&task_type).expect("suggests").is_none());
    }

    #[test]
    fn suggestion_appears_once_the_minimum_sample_size_is_reached() {
        let dir = tempdir().expect("tempdir");
        let store = PatternStore::with_tuning(dir.path().join("patterns"), Duration::from_millis(200), Duration::from_secs(30));
        let task_type = TaskType::new("API");

        for _ in 0 .. MIN_EXECUTIONS_FOR_SUGGESTION {
            store.record(&task_type, execution(ExecutionOutcome::Success, &["backend-developer"])).expect("records");
        }
        let suggestion = store.suggest(&task_type).expect("suggests").expect("present");
        assert!((suggestion.observed_success_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(suggestion.suggested_agent_order, Some(vec!["backend-developer".to_string()]));
    }

    #[test]
    fn low_success_rate_is_called_out_in_the_rationale() {
        let dir = tempdir().expect("tempdir");
        let store = PatternStore::with_tuning(dir.path().join("patterns"), Duration::from_millis(200), Duration::from_secs(30));
        let task_type = TaskType::new("DATABASE");

        store.record(&task_type, execution(ExecutionOutcome::Failure, &["database-engineer"])).expect("records");
        store.record(&task_type, execution(ExecutionOutcome::Failure, &["database-engineer"])).expect("records");
        store.record(&task_type, execution(ExecutionOutcome::Success, &["database-engineer"])).expect("records");

        let suggestion = store.suggest(&task_type).expect("suggests").expect("present");
        assert!(suggestion.rationale.contains("below 50%"));
    }
}
