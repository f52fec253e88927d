// crates/taskgate-executor/src/lib.rs
// ============================================================================
// Module: Taskgate Executor Adapter
// Description: The backend-agnostic capability interface the Workflow
//              Stepper invokes to actually run a step (spec §4.7).
// Purpose: Keep agent-runtime invocation out of this workspace's scope while
//          still giving the Stepper a stable, testable contract to call.
// Dependencies: serde, taskgate-context, taskgate-core
// ============================================================================

//! ## Overview
//! Grounded on `decision-gate-core`'s `interfaces` module: a small trait, a
//! context struct carrying everything the call needs, and a dedicated error
//! enum rather than a shared one (`EvidenceProvider`/`Dispatcher` there,
//! [`ExecutorAdapter`] here). No concrete adapter ships in this crate; the
//! agent runtime behind it is out of scope (spec §1). The Stepper probes a
//! caller-supplied list of adapters in order via [`ExecutorAdapter::is_available`]
//! and invokes the first that reports itself ready.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use taskgate_context::BuiltContext;
use taskgate_core::AgentId;
use taskgate_core::RunId;
use taskgate_core::StepIndex;

/// Everything an [`ExecutorAdapter::execute`] call needs (spec §4.7).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteRequest<'a> {
    /// Agent role being invoked.
    pub agent: &'a AgentId,
    /// The assembled prompt context (spec §4.6).
    pub context: &'a BuiltContext,
    /// Run this invocation belongs to.
    pub run_id: &'a RunId,
    /// Step this invocation is executing.
    pub step: StepIndex,
    /// Deadline after which the adapter must be treated as timed out
    /// (spec §5, "Cancellation & timeouts").
    pub deadline: Duration,
}

/// Outcome status of an executor invocation (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The step ran to completion.
    Completed,
    /// The step ran but did not succeed.
    Failed,
    /// The step did not finish before its deadline.
    Timeout,
    /// The step paused pending external approval.
    AwaitingApproval,
}

/// Where a reported token count came from (spec §4.7, `token_usage.source`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUsageSource {
    /// Reported directly by the provider API.
    Api,
    /// Derived from the adapter's own session accounting.
    Session,
    /// Estimated from request/response sizes.
    Estimate,
    /// A rough heuristic with no measurement behind it.
    Heuristic,
}

/// Confidence the adapter has in its own [`TokenUsage`] figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUsageConfidence {
    /// Measured or reported directly.
    High,
    /// Derived via a documented estimation rule.
    Medium,
    /// A guess with no supporting measurement.
    Low,
}

/// Reported token consumption for one invocation (spec §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by this invocation.
    pub used: u64,
    /// The adapter's configured or negotiated ceiling, if known.
    pub limit: Option<u64>,
    /// Provenance of `used`/`limit`.
    pub source: TokenUsageSource,
    /// How much to trust `source`'s figures.
    pub confidence: TokenUsageConfidence,
}

/// The full result of one executor invocation (spec §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResult {
    /// Outcome status.
    pub status: ExecutionStatus,
    /// Filesystem paths (relative to the run root) the invocation wrote.
    #[serde(default)]
    pub artifacts_written: Vec<String>,
    /// Path of the gate record the invocation produced, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_path: Option<String>,
    /// Path of the reasoning record the invocation produced, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_path: Option<String>,
    /// Reported token consumption.
    pub token_usage: TokenUsage,
    /// Captured standard output.
    #[serde(default)]
    pub stdout: String,
    /// Captured standard error.
    #[serde(default)]
    pub stderr: String,
    /// Wall-clock duration of the invocation, in milliseconds.
    pub duration_ms: u64,
    /// Error detail, present when `status != Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecuteResult {
    /// Applies the anti-false-success rewrite (spec §4.7): a `Completed`
    /// result with no artifacts, or with any artifact path that does not
    /// exist under `run_dir`, is rewritten to `Failed` before the caller
    /// observes it.
    #[must_use]
    pub fn rewrite_false_success(mut self, run_dir: &std::path::Path) -> Self {
        if self.status != ExecutionStatus::Completed {
            return self;
        }
        let missing = self.artifacts_written.is_empty() || self.artifacts_written.iter().any(|path| !run_dir.join(path).exists());
        if missing {
            self.status = ExecutionStatus::Failed;
            self.error.get_or_insert_with(|| "completed with no verifiable artifacts written".to_string());
        }
        self
    }
}

/// Errors an [`ExecutorAdapter`] may raise (spec §4.7, §7 `ExecutorFailure`).
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The adapter itself is not reachable or not configured.
    #[error("executor adapter unavailable: {0}")]
    Unavailable(String),
    /// The adapter ran but failed.
    #[error("executor invocation failed: {0}")]
    Failed(String),
}

/// Backend-agnostic executor capability (spec §4.7).
///
/// Implementations live outside this workspace; this crate only defines the
/// contract the Workflow Stepper probes and invokes.
pub trait ExecutorAdapter {
    /// A short, stable name used in probe-order diagnostics.
    fn name(&self) -> &str;

    /// Reports whether this adapter is currently able to accept work.
    fn is_available(&self) -> bool;

    /// Executes one step.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Unavailable`] if called despite
    /// `is_available` returning `false`, or [`ExecutorError::Failed`] if the
    /// invocation itself errors before producing an [`ExecuteResult`].
    fn execute(&self, request: &ExecuteRequest<'_>) -> Result<ExecuteResult, ExecutorError>;
}

/// Probes `adapters` in order and returns the first one reporting itself
/// available (spec §4.7, "Stepper probes adapters in a fixed order").
#[must_use]
pub fn first_available<'a>(adapters: &'a [&'a dyn ExecutorAdapter]) -> Option<&'a dyn ExecutorAdapter> {
    adapters.iter().find(|adapter| adapter.is_available()).copied()
}
