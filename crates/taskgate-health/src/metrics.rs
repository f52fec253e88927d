// crates/taskgate-health/src/metrics.rs
// ============================================================================
// Module: Aggregate Health Metrics
// Description: Composite health score and its components, computed from a
//              snapshot of run records and pattern logs (spec §4.10).
// Purpose: Pure, synchronous scoring logic the Health Monitor feeds
//          filesystem-read data into, kept independent of I/O so it is
//          trivially unit-testable.
// Dependencies: std, serde, taskgate-core, taskgate-config
// ============================================================================

//! ## Overview
//! [`compute`] takes everything the Run Store and Pattern Learner can hand
//! it (a run snapshot, the static routing matrix, the known task-type
//! universe, and per-task-type pattern logs) and derives spec §4.10's
//! composite score:
//!
//! `score = 0.4·routingAccuracy + 0.3·successRate + 0.2·patternCoverage +
//! 0.1·utilizationBalance`, `utilizationBalance = 1 − |0.5 −
//! avgUtilizationFraction|`, reported on a 0–100 scale.
//!
//! Routing accuracy compares the routing matrix's primary agent for a run's
//! task type against the first agent actually dispatched
//! (`run.task_queue[0].agent`); runs whose task type was never recorded in
//! `metadata["task_type"]` are excluded from the denominator rather than
//! counted as misses, since there is nothing to compare against.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use taskgate_config::RoutingMatrixEntry;
use taskgate_core::ExecutionOutcome;
use taskgate_core::RunRecord;
use taskgate_core::RunStatus;
use taskgate_core::TaskPatternLog;
use taskgate_core::TaskType;
use taskgate_core::Timestamp;

use crate::stall::is_stalled;

/// The key a run's `metadata` bag carries its classified task type under,
/// written by whichever caller created the run (typically the CLI's
/// `run create`, after consulting the Router).
pub const TASK_TYPE_METADATA_KEY: &str = "task_type";

/// Qualitative banding of the composite score (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Score ≥ 80.
    Healthy,
    /// Score ≥ 60, < 80.
    Warning,
    /// Score < 60.
    Critical,
}

impl HealthStatus {
    /// Bands a 0–100 composite score into a [`HealthStatus`] (spec §4.10).
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Healthy
        } else if score >= 60.0 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// Aggregate metrics and composite score for a snapshot of runs
/// (spec §4.10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    /// Total number of runs scanned.
    pub total_runs: usize,
    /// Runs in a non-terminal status.
    pub active_runs: usize,
    /// Runs currently stalled (subset of `active_runs`).
    pub stalled_runs: usize,
    /// Runs that completed successfully.
    pub completed_runs: usize,
    /// Runs that failed.
    pub failed_runs: usize,
    /// Fraction of task-typed runs whose first dispatched agent matched the
    /// routing matrix's primary for that type.
    pub routing_accuracy: f64,
    /// Share of recorded pattern executions attributed to each agent.
    pub agent_utilization: BTreeMap<String, f64>,
    /// Fraction of known task types with at least
    /// [`taskgate_learner::MIN_EXECUTIONS_FOR_SUGGESTION`] recorded executions.
    pub pattern_coverage: f64,
    /// Fraction of recorded pattern executions that succeeded outright.
    pub success_rate: f64,
    /// Mean duration, in minutes, across all recorded pattern executions.
    pub avg_duration_minutes: f64,
    /// Composite score on a 0–100 scale.
    pub score: f64,
    /// Qualitative band of `score`.
    pub status: HealthStatus,
}

/// Computes [`AggregateMetrics`] over `runs` and `pattern_logs` (spec §4.10).
///
/// `pattern_logs` should carry one entry per task type in `known_task_types`
/// that has ever been recorded; types with no log are treated as having zero
/// executions.
#[must_use]
pub fn compute(runs: &[RunRecord], routing_matrix: &[RoutingMatrixEntry], known_task_types: &[TaskType], pattern_logs: &BTreeMap<TaskType, TaskPatternLog>, now: Timestamp, stall_threshold_secs: i64) -> AggregateMetrics {
    let total_runs = runs.len();
    let stalled_runs = runs.iter().filter(|run| is_stalled(run, now, stall_threshold_secs)).count();
    let active_runs = runs.iter().filter(|run| !run.status.is_terminal()).count();
    let completed_runs = runs.iter().filter(|run| run.status == RunStatus::Completed).count();
    let failed_runs = runs.iter().filter(|run| run.status == RunStatus::Failed).count();

    let routing_accuracy = routing_accuracy(runs, routing_matrix);
    let agent_utilization = agent_utilization(pattern_logs);
    let pattern_coverage = pattern_coverage(known_task_types, pattern_logs);
    let (success_rate, avg_duration_minutes) = execution_quality(pattern_logs);

    let avg_utilization_fraction = if agent_utilization.is_empty() { 0.0 } else { agent_utilization.values().sum::<f64>() / agent_utilization.len() as f64 };
    let utilization_balance = 1.0 - (0.5 - avg_utilization_fraction).abs();

    let score = 100.0 * (0.4 * routing_accuracy + 0.3 * success_rate + 0.2 * pattern_coverage + 0.1 * utilization_balance);
    let status = HealthStatus::from_score(score);

    AggregateMetrics { total_runs, active_runs, stalled_runs, completed_runs, failed_runs, routing_accuracy, agent_utilization, pattern_coverage, success_rate, avg_duration_minutes, score, status }
}

/// Fraction of task-typed runs whose first dispatched agent matches the
/// routing matrix's primary agent for that run's task type.
fn routing_accuracy(runs: &[RunRecord], routing_matrix: &[RoutingMatrixEntry]) -> f64 {
    let mut scored = 0u64;
    let mut matched = 0u64;
    for run in runs {
        let Some(task_type) = run.metadata.get(TASK_TYPE_METADATA_KEY).and_then(|value| value.as_str()) else { continue };
        let Some(entry) = routing_matrix.iter().find(|entry| entry.task_type.as_str() == task_type) else { continue };
        let Some(first_task) = run.task_queue.first() else { continue };

        scored += 1;
        if first_task.agent.as_str() == entry.primary.as_str() {
            matched += 1;
        }
    }
    if scored == 0 { 0.0 } else { matched as f64 / scored as f64 }
}

/// Share of recorded pattern executions attributed to each agent, across
/// every task type's log.
fn agent_utilization(pattern_logs: &BTreeMap<TaskType, TaskPatternLog>) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut total = 0u64;
    for log in pattern_logs.values() {
        for execution in &log.executions {
            for agent in &execution.agents {
                *counts.entry(agent.clone()).or_insert(0) += 1;
                total += 1;
            }
        }
    }
    if total == 0 {
        return BTreeMap::new();
    }
    counts.into_iter().map(|(agent, count)| (agent, count as f64 / total as f64)).collect()
}

/// Fraction of `known_task_types` with at least
/// [`taskgate_learner::MIN_EXECUTIONS_FOR_SUGGESTION`] recorded executions.
fn pattern_coverage(known_task_types: &[TaskType], pattern_logs: &BTreeMap<TaskType, TaskPatternLog>) -> f64 {
    if known_task_types.is_empty() {
        return 0.0;
    }
    let covered = known_task_types
        .iter()
        .filter(|task_type| pattern_logs.get(task_type).is_some_and(|log| log.executions.len() >= taskgate_learner::MIN_EXECUTIONS_FOR_SUGGESTION))
        .count();
    covered as f64 / known_task_types.len() as f64
}

/// `(success_rate, avg_duration_minutes)` across every recorded execution in
/// every supplied pattern log.
fn execution_quality(pattern_logs: &BTreeMap<TaskType, TaskPatternLog>) -> (f64, f64) {
    let mut total = 0u64;
    let mut successes = 0u64;
    let mut duration_sum = 0.0;
    for log in pattern_logs.values() {
        for execution in &log.executions {
            total += 1;
            duration_sum += execution.duration_minutes;
            if execution.outcome == ExecutionOutcome::Success {
                successes += 1;
            }
        }
    }
    if total == 0 {
        (0.0, 0.0)
    } else {
        (successes as f64 / total as f64, duration_sum / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use taskgate_core::AgentId;
    use taskgate_core::ExecutionOutcome;
    use taskgate_core::PatternExecution;
    use taskgate_core::RunId;
    use taskgate_core::TaskQueueEntry;
    use taskgate_core::TaskStatus;
    use taskgate_core::Timestamp;

    use super::AggregateMetrics;
    use super::HealthStatus;
    use super::TASK_TYPE_METADATA_KEY;
    use super::compute;

    fn matrix() -> Vec<taskgate_config::RoutingMatrixEntry> {
        taskgate_config::default_routing_matrix()
    }

    fn run_with_task_type(task_type: &str, first_agent: &str) -> taskgate_core::RunRecord {
        let mut run = taskgate_core::RunRecord::new(RunId::parse("run-1").expect("valid id"), "wf".to_string(), "wf-v1".to_string());
        run.metadata.insert(TASK_TYPE_METADATA_KEY.to_string(), serde_json::json!(task_type));
        run.task_queue.push(TaskQueueEntry { task_id: "t-1".to_string(), description: "step 0".to_string(), agent: AgentId::new(first_agent), step: taskgate_core::StepIndex::ZERO, status: TaskStatus::Completed });
        run
    }

    #[test]
    fn routing_accuracy_rewards_a_matching_primary_agent() {
        let matrix = matrix();
        let security_primary = matrix.iter().find(|entry| entry.task_type.as_str() == "SECURITY").expect("security entry exists").primary.as_str().to_string();

        let runs = vec![run_with_task_type("SECURITY", &security_primary)];
        let metrics = compute(&runs, &matrix, &[], &std::collections::BTreeMap::new(), Timestamp::now(), 300);
        assert_eq!(metrics.routing_accuracy, 1.0);
    }

    #[test]
    fn runs_with_no_recorded_task_type_do_not_affect_accuracy() {
        let matrix = matrix();
        let run = taskgate_core::RunRecord::new(RunId::parse("run-1").expect("valid id"), "wf".to_string(), "wf-v1".to_string());
        let metrics = compute(&[run], &matrix, &[], &std::collections::BTreeMap::new(), Timestamp::now(), 300);
        assert_eq!(metrics.routing_accuracy, 0.0);
        assert_eq!(metrics.total_runs, 1);
    }

    #[test]
    fn empty_snapshot_is_critical_not_a_crash() {
        let metrics: AggregateMetrics = compute(&[], &[], &[], &std::collections::BTreeMap::new(), Timestamp::now(), 300);
        assert_eq!(metrics.status, HealthStatus::Critical);
        assert!((metrics.score - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pattern_coverage_counts_logs_meeting_the_minimum_execution_threshold() {
        let mut logs = std::collections::BTreeMap::new();
        let mut log = taskgate_core::TaskPatternLog::new();
        for _ in 0 .. 3 {
            log.record(PatternExecution { outcome: ExecutionOutcome::Success, duration_minutes: 5.0, agents: vec!["developer".to_string()], feedback: None, timestamp: Timestamp::now() });
        }
        logs.insert(taskgate_core::TaskType::new("API"), log);

        let known = vec![taskgate_core::TaskType::new("API"), taskgate_core::TaskType::new("DATABASE")];
        let metrics = compute(&[], &[], &known, &logs, Timestamp::now(), 300);
        assert_eq!(metrics.pattern_coverage, 0.5);
        assert_eq!(metrics.success_rate, 1.0);
    }
}
