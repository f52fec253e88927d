// crates/taskgate-core/src/pattern.rs
// ============================================================================
// Module: Taskgate Pattern Registry Record
// Description: Per-task-type append-only execution log (spec §3.6).
// Purpose: Carry the shape the Pattern Learner appends to and the Router /
//          Health Monitor read from.
// Dependencies: serde, crate::time
// ============================================================================

//! ## Overview
//! `taskgate-learner` owns the append and persistence; this module only
//! defines [`TaskPatternLog`] and its nested [`PatternExecution`] entries, one
//! log per task type, keyed externally by [`crate::identifiers::TaskType`].

use serde::Deserialize;
use serde::Serialize;

use crate::time::Timestamp;

/// Outcome of one recorded execution (spec §3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The task completed with all gates passing.
    Success,
    /// The task failed outright.
    Failure,
    /// The task completed with some gates failing or warnings surfaced.
    Partial,
}

/// One execution entry within a task type's pattern log (spec §3.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternExecution {
    /// How the execution concluded.
    pub outcome: ExecutionOutcome,
    /// Wall-clock duration of the execution, in minutes.
    pub duration_minutes: f64,
    /// Agents involved, in the order they participated.
    pub agents: Vec<String>,
    /// Free-form feedback captured alongside the outcome.
    #[serde(default)]
    pub feedback: Option<String>,
    /// When the execution was recorded.
    pub timestamp: Timestamp,
}

/// The append-only execution log for a single task type (spec §3.6).
///
/// # Invariants
/// - `executions` is append-only; entries are never rewritten or reordered.
/// - `metadata_total_executions == executions.len()` after every append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPatternLog {
    /// Every recorded execution, oldest first.
    #[serde(default)]
    pub executions: Vec<PatternExecution>,
    /// Running count, kept in lockstep with `executions.len()`.
    pub metadata_total_executions: u64,
}

impl TaskPatternLog {
    /// Creates an empty pattern log.
    #[must_use]
    pub const fn new() -> Self {
        Self { executions: Vec::new(), metadata_total_executions: 0 }
    }

    /// Appends an execution and keeps the running total in sync.
    pub fn record(&mut self, execution: PatternExecution) {
        self.executions.push(execution);
        self.metadata_total_executions = self.metadata_total_executions.saturating_add(1);
    }

    /// Returns the fraction of recorded executions that were [`ExecutionOutcome::Success`],
    /// or `None` if no executions have been recorded yet.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        if self.executions.is_empty() {
            return None;
        }
        let successes = self.executions.iter().filter(|execution| execution.outcome == ExecutionOutcome::Success).count();
        #[allow(clippy::cast_precision_loss, reason = "execution counts stay well under f64's exact-integer range")]
        Some(successes as f64 / self.executions.len() as f64)
    }
}

impl Default for TaskPatternLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionOutcome;
    use super::PatternExecution;
    use super::TaskPatternLog;
    use crate::time::Timestamp;

    fn execution(outcome: ExecutionOutcome) -> PatternExecution {
        PatternExecution { outcome, duration_minutes: 12.0, agents: vec!["developer".to_string()], feedback: None, timestamp: Timestamp::now() }
    }

    #[test]
    fn empty_log_has_no_success_rate() {
        assert_eq!(TaskPatternLog::new().success_rate(), None);
    }

    #[test]
    fn record_keeps_total_in_lockstep() {
        let mut log = TaskPatternLog::new();
        log.record(execution(ExecutionOutcome::Success));
        log.record(execution(ExecutionOutcome::Failure));
        assert_eq!(log.metadata_total_executions, 2);
        assert!((log.success_rate().expect("non-empty") - 0.5).abs() < f64::EPSILON);
    }
}
