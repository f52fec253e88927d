// crates/taskgate-health/src/stall.rs
// ============================================================================
// Module: Stall Detector
// Description: Flags runs stuck in a non-terminal status past a liveness
//              threshold (spec §4.10).
// Purpose: Give the Health Monitor and CLI a single, testable predicate
//          instead of duplicating the `status`/`updated_at` check.
// Dependencies: taskgate-core
// ============================================================================

use taskgate_core::RunRecord;
use taskgate_core::RunStatus;
use taskgate_core::Timestamp;

/// Default stall threshold: 5 minutes (spec §4.10).
pub const DEFAULT_STALL_THRESHOLD_SECS: i64 = 300;

/// Reports whether `run` is stalled as of `now`: still non-terminal and its
/// `updated_at` is older than `threshold_secs` (spec §4.10).
#[must_use]
pub fn is_stalled(run: &RunRecord, now: Timestamp, threshold_secs: i64) -> bool {
    let liveness_eligible = matches!(run.status, RunStatus::Pending | RunStatus::InProgress | RunStatus::AwaitingApproval);
    if !liveness_eligible {
        return false;
    }
    let age_secs = (now.unix_millis() - run.updated_at.unix_millis()) / 1_000;
    age_secs > threshold_secs
}

#[cfg(test)]
mod tests {
    use taskgate_core::RunId;
    use taskgate_core::Timestamp;

    use super::DEFAULT_STALL_THRESHOLD_SECS;
    use super::is_stalled;

    fn sample_run() -> taskgate_core::RunRecord {
        taskgate_core::RunRecord::new(RunId::parse("run-1").expect("valid id"), "wf-impl".to_string(), "wf-impl-v1".to_string())
    }

    #[test]
    fn fresh_run_is_not_stalled() {
        let run = sample_run();
        assert!(!is_stalled(&run, run.updated_at, DEFAULT_STALL_THRESHOLD_SECS));
    }

    #[test]
    fn run_past_the_threshold_is_stalled() {
        let run = sample_run();
        let later = Timestamp::from_unix_millis(run.updated_at.unix_millis() + (DEFAULT_STALL_THRESHOLD_SECS + 1) * 1_000).expect("in range");
        assert!(is_stalled(&run, later, DEFAULT_STALL_THRESHOLD_SECS));
    }

    #[test]
    fn terminal_runs_are_never_stalled() {
        let mut run = sample_run();
        run.status = taskgate_core::RunStatus::Completed;
        let far_future = Timestamp::from_unix_millis(run.updated_at.unix_millis() + 10 * DEFAULT_STALL_THRESHOLD_SECS * 1_000).expect("in range");
        assert!(!is_stalled(&run, far_future, DEFAULT_STALL_THRESHOLD_SECS));
    }
}
