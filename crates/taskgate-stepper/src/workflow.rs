// crates/taskgate-stepper/src/workflow.rs
// ============================================================================
// Module: Workflow Definition
// Description: The per-step shape the Workflow Stepper executes against
//              (spec §4.8).
// Purpose: Give callers a plain, serializable workflow shape instead of
//          coupling the Stepper to any one workflow-authoring format.
// Dependencies: serde, std, taskgate-core
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use taskgate_core::AgentId;
use taskgate_core::IdempotencyPolicy;

/// Retry tuning for a step whose executor invocation fails or times out
/// (spec §4.8, "Failure & retry semantics").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first failure.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling the exponential backoff never exceeds.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(250), max_delay: Duration::from_secs(10) }
    }
}

impl RetryPolicy {
    /// The backoff delay before retry attempt number `attempt` (1-indexed),
    /// doubling each time and saturating at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }
}

/// One step of a workflow definition (spec §4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Agent this step is dispatched to.
    pub agent: AgentId,
    /// Human-readable task description, fed into the context builder.
    pub task_description: String,
    /// Condition expression gating whether this step runs at all
    /// (spec §4.3). `None` always runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Whether this step pauses for external approval instead of executing.
    #[serde(default)]
    pub requires_approval: bool,
    /// Named injections resolved into this step's context (spec §4.6).
    #[serde(default)]
    pub injections: Vec<String>,
    /// Retry tuning applied when this step's executor invocation fails.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Idempotency policy applied when registering this step's artifacts.
    #[serde(default = "default_artifact_policy")]
    pub artifact_policy: IdempotencyPolicy,
}

fn default_artifact_policy() -> IdempotencyPolicy {
    IdempotencyPolicy::Overwrite
}

/// A full workflow definition: an ordered list of steps (spec §4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Identifier of this workflow, matching `RunRecord::selected_workflow`.
    pub id: String,
    /// Steps executed in order.
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// The step definition at `index`, if the workflow has one.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    /// Reports whether `index` is past the workflow's last step.
    #[must_use]
    pub fn is_complete(&self, index: usize) -> bool {
        index >= self.steps.len()
    }
}
