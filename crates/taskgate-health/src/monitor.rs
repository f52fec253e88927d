// crates/taskgate-health/src/monitor.rs
// ============================================================================
// Module: Health Monitor
// Description: Scans the Run Store and Pattern Learner to produce a
//              snapshot-in-time health report (spec §4.10).
// Purpose: The one place `taskgate-cli`'s `monitor` subcommand reads from;
//          read-only, never mutates a run or pattern log.
// Dependencies: taskgate-config, taskgate-core, taskgate-learner,
//               taskgate-store
// ============================================================================

//! ## Overview
//! [`HealthMonitor::scan`] is a single read pass: list every run directory,
//! read each run record, read every known task type's pattern log, and fold
//! the result through [`crate::metrics::compute`]. Spec §4.10 notes this
//! read path shares the Run Store's short-TTL cache discipline so repeated
//! `monitor --watch` polls do not thrash the filesystem; that caching lives
//! in [`taskgate_store::RunStore`] and [`taskgate_learner::PatternStore`]
//! themselves, so this module only needs to call through, not re-implement it.

use std::collections::BTreeMap;

use taskgate_config::RoutingMatrixEntry;
use taskgate_core::CoreError;
use taskgate_core::RunRecord;
use taskgate_core::TaskType;
use taskgate_core::Timestamp;
use taskgate_learner::PatternStore;
use taskgate_store::RunStore;

use crate::metrics::AggregateMetrics;
use crate::metrics::compute;
use crate::stall::DEFAULT_STALL_THRESHOLD_SECS;
use crate::stall::is_stalled;

/// Read-only health/progress view over a Run Store and Pattern Learner
/// (spec §4.10).
pub struct HealthMonitor {
    run_store: RunStore,
    pattern_store: PatternStore,
    routing_matrix: Vec<RoutingMatrixEntry>,
    known_task_types: Vec<TaskType>,
    stall_threshold_secs: i64,
}

impl HealthMonitor {
    /// Builds a monitor over the given collaborators, using the default
    /// 5-minute stall threshold (spec §4.10).
    #[must_use]
    pub fn new(run_store: RunStore, pattern_store: PatternStore, routing_matrix: Vec<RoutingMatrixEntry>, known_task_types: Vec<TaskType>) -> Self {
        Self { run_store, pattern_store, routing_matrix, known_task_types, stall_threshold_secs: DEFAULT_STALL_THRESHOLD_SECS }
    }

    /// Overrides the stall threshold (seconds), for deployments that tune it
    /// away from the spec default.
    #[must_use]
    pub fn with_stall_threshold_secs(mut self, threshold_secs: i64) -> Self {
        self.stall_threshold_secs = threshold_secs;
        self
    }

    /// Reads every run and every known task type's pattern log and computes
    /// the composite [`AggregateMetrics`] (spec §4.10).
    ///
    /// # Errors
    /// Returns [`CoreError::Corrupt`] if the runs directory cannot be listed,
    /// or if any individual run record or pattern log fails to parse.
    pub fn scan(&self) -> Result<AggregateMetrics, CoreError> {
        let runs = self.read_all_runs()?;
        let pattern_logs = self.read_all_pattern_logs()?;
        Ok(compute(&runs, &self.routing_matrix, &self.known_task_types, &pattern_logs, Timestamp::now(), self.stall_threshold_secs))
    }

    /// Reads a single run's record plus whether it is currently stalled, for
    /// `monitor --run-id`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if the run does not exist.
    pub fn run_status(&self, run_id: &taskgate_core::RunId) -> Result<RunStatusView, CoreError> {
        let run = self.run_store.read_run(run_id)?;
        let stalled = is_stalled(&run, Timestamp::now(), self.stall_threshold_secs);
        Ok(RunStatusView { run, stalled })
    }

    /// Lists every run's id, for `monitor --list`.
    ///
    /// # Errors
    /// Returns [`CoreError::Corrupt`] if the runs directory cannot be listed.
    pub fn list_run_ids(&self) -> Result<Vec<taskgate_core::RunId>, CoreError> {
        self.run_store.list_run_ids()
    }

    fn read_all_runs(&self) -> Result<Vec<RunRecord>, CoreError> {
        self.run_store.list_run_ids()?.iter().map(|run_id| self.run_store.read_run(run_id)).collect()
    }

    fn read_all_pattern_logs(&self) -> Result<BTreeMap<TaskType, taskgate_core::TaskPatternLog>, CoreError> {
        self.known_task_types.iter().map(|task_type| self.pattern_store.read(task_type).map(|log| (task_type.clone(), log))).collect()
    }
}

/// A single run's record plus its current stall status, for `monitor
/// --run-id` (spec §4.10, §6.3).
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatusView {
    /// The run's current record.
    pub run: RunRecord,
    /// Whether the run is currently stalled.
    pub stalled: bool,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use taskgate_config::default_routing_matrix;
    use taskgate_core::RunId;
    use taskgate_learner::PatternStore;
    use taskgate_store::CreateRunOptions;
    use taskgate_store::RunStore;
    use tempfile::tempdir;

    use super::HealthMonitor;

    #[test]
    fn scan_over_an_empty_store_reports_zero_runs() {
        let dir = tempdir().expect("tempdir");
        let run_store = RunStore::with_tuning(dir.path().join("runs"), Duration::from_millis(200), Duration::from_millis(500), Duration::from_secs(30));
        let pattern_store = PatternStore::with_tuning(dir.path().join("patterns"), Duration::from_millis(500), Duration::from_secs(30));
        let monitor = HealthMonitor::new(run_store, pattern_store, default_routing_matrix(), vec![]);

        let metrics = monitor.scan().expect("scan succeeds");
        assert_eq!(metrics.total_runs, 0);
    }

    #[test]
    fn scan_counts_a_created_run() {
        let dir = tempdir().expect("tempdir");
        let run_store = RunStore::with_tuning(dir.path().join("runs"), Duration::from_millis(200), Duration::from_millis(500), Duration::from_secs(30));
        let run_id = RunId::parse("run-1").expect("valid id");
        run_store.create_run(&run_id, CreateRunOptions { workflow_id: "wf".to_string(), selected_workflow: "wf-v1".to_string(), orchestrator_session_id: None }).expect("create run");

        let pattern_store = PatternStore::with_tuning(dir.path().join("patterns"), Duration::from_millis(500), Duration::from_secs(30));
        let monitor = HealthMonitor::new(run_store, pattern_store, default_routing_matrix(), vec![]);

        let metrics = monitor.scan().expect("scan succeeds");
        assert_eq!(metrics.total_runs, 1);
        assert_eq!(metrics.active_runs, 1);
    }

    #[test]
    fn run_status_reports_the_record_for_a_single_run() {
        let dir = tempdir().expect("tempdir");
        let run_store = RunStore::with_tuning(dir.path().join("runs"), Duration::from_millis(200), Duration::from_millis(500), Duration::from_secs(30));
        let run_id = RunId::parse("run-1").expect("valid id");
        run_store.create_run(&run_id, CreateRunOptions { workflow_id: "wf".to_string(), selected_workflow: "wf-v1".to_string(), orchestrator_session_id: None }).expect("create run");

        let pattern_store = PatternStore::with_tuning(dir.path().join("patterns"), Duration::from_millis(500), Duration::from_secs(30));
        let monitor = HealthMonitor::new(run_store, pattern_store, default_routing_matrix(), vec![]);

        let view = monitor.run_status(&run_id).expect("run exists");
        assert!(!view.stalled);
        assert_eq!(view.run.run_id, run_id);
    }
}
