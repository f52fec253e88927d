// crates/taskgate-core/src/run.rs
// ============================================================================
// Module: Taskgate Run Record
// Description: The canonical run record persisted at `<root>/runs/<id>/run.json`.
// Purpose: Model spec §3.1 exactly: status machine, task queue, owners,
//          timestamps, and the free-form metadata bag.
// Dependencies: serde, serde_json, crate::identifiers, crate::time
// ============================================================================

//! ## Overview
//! [`RunRecord`] is a plain data type; it enforces no behaviour of its own.
//! The state-machine legality of a transition (spec §4.8) is the Workflow
//! Stepper's responsibility — this module only carries the shape and the
//! `can_transition_to` helper used by every caller that needs to check it.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::AgentId;
use crate::identifiers::RunId;
use crate::identifiers::StepIndex;
use crate::time::Timestamp;

/// Run-level lifecycle status (spec §3.1).
///
/// # Invariants
/// - `Completed` is terminal: no other status may follow it.
/// - `Failed` is terminal: no other status may follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but not yet advanced past its first step.
    Pending,
    /// Actively executing steps.
    InProgress,
    /// Paused at a step with `requires_approval` pending external acknowledgement.
    AwaitingApproval,
    /// Finished successfully; terminal.
    Completed,
    /// Finished unsuccessfully; terminal.
    Failed,
}

impl RunStatus {
    /// Reports whether `self` is a terminal status (`Completed` or `Failed`).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Reports whether a transition from `self` to `next` is legal under the
    /// state machine in spec §4.8.
    ///
    /// The only non-obvious rule is that `AwaitingApproval` may resolve back
    /// into `InProgress` (approved) or forward into `Failed` (denied), and a
    /// terminal status never transitions again.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress | Self::Failed)
                | (Self::InProgress, Self::AwaitingApproval | Self::Completed | Self::Failed)
                | (Self::AwaitingApproval, Self::InProgress | Self::Failed)
        )
    }
}

/// Per-task status within [`RunRecord::task_queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet started.
    Pending,
    /// Currently executing.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
}

/// A single entry in the run's task queue (spec §3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQueueEntry {
    /// Opaque task identifier, unique within the run.
    pub task_id: String,
    /// Human-readable task description.
    pub description: String,
    /// Agent assigned to execute the task.
    pub agent: AgentId,
    /// Workflow step the task corresponds to.
    pub step: StepIndex,
    /// Current status of the task.
    pub status: TaskStatus,
}

/// Ownership metadata for a run (spec §3.1, `owners.*`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Owners {
    /// Session id of the orchestrator that created the run, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_session_id: Option<String>,
    /// Agent currently holding the step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_agent: Option<AgentId>,
    /// Every agent that has participated in the run so far.
    #[serde(default)]
    pub assigned_agents: Vec<AgentId>,
}

/// Run-level timestamps (spec §3.1, `timestamps.*`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Set when the run first transitions to `in_progress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// Set whenever `current_step` changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_step_completed_at: Option<Timestamp>,
    /// Set when the run transitions to `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

/// The canonical run record (spec §3.1).
///
/// # Invariants
/// - `updated_at >= created_at`.
/// - `status == Completed` implies `timestamps.completed_at.is_some()`.
/// - `current_step` is monotonically non-decreasing over the run's lifetime
///   (enforced by the Workflow Stepper, not by this type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Stable identifier for the run.
    pub run_id: RunId,
    /// Identifier of the workflow definition this run executes.
    pub workflow_id: String,
    /// The specific selected workflow variant, if the definition branches.
    pub selected_workflow: String,
    /// Zero-based index of the step the run is currently on.
    pub current_step: StepIndex,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Ordered queue of tasks dispatched so far.
    #[serde(default)]
    pub task_queue: Vec<TaskQueueEntry>,
    /// Ownership metadata.
    #[serde(default)]
    pub owners: Owners,
    /// Run-level timestamps.
    #[serde(default)]
    pub timestamps: Timestamps,
    /// Creation time; never changes after `CreateRun`.
    pub created_at: Timestamp,
    /// Last mutation time; re-stamped by every `UpdateRun`.
    pub updated_at: Timestamp,
    /// Free-form metadata bag (user request, router handoff, approvals,
    /// blockers, next steps).
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl RunRecord {
    /// Creates a freshly initialized run record in `Pending` status.
    #[must_use]
    pub fn new(run_id: RunId, workflow_id: String, selected_workflow: String) -> Self {
        let now = Timestamp::now();
        Self {
            run_id,
            workflow_id,
            selected_workflow,
            current_step: StepIndex::ZERO,
            status: RunStatus::Pending,
            task_queue: Vec::new(),
            owners: Owners::default(),
            timestamps: Timestamps::default(),
            created_at: now,
            updated_at: now,
            metadata: BTreeMap::new(),
        }
    }

    /// Returns the blockers list from `metadata.blockers`, if present and
    /// well-formed (spec §7, "failures ... surface via ... `metadata.blockers[]`").
    #[must_use]
    pub fn blockers(&self) -> Vec<String> {
        self.metadata
            .get("blockers")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}
