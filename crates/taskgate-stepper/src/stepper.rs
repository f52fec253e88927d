// crates/taskgate-stepper/src/stepper.rs
// ============================================================================
// Module: Workflow Stepper
// Description: The central per-step state machine (spec §4.8): evaluates the
//              step condition, handles approval gates, builds context,
//              invokes the first available executor, registers artifacts,
//              and advances the run.
// Purpose: The one place every step of every run actually executes through.
// Dependencies: std, taskgate-condition, taskgate-context, taskgate-core,
//               taskgate-executor, taskgate-learner, taskgate-store
// ============================================================================

//! ## Overview
//! [`Stepper::advance`] runs the algorithm spec §4.8 describes for a single
//! step: load the run, evaluate its condition, honour an approval gate,
//! build context, probe executors in the caller's declared order, apply the
//! anti-false-success rewrite, register artifacts, advance the run record,
//! and emit a [`taskgate_core::PatternExecution`]. Retries on executor
//! failure follow the step's own [`crate::workflow::RetryPolicy`] with
//! exponential backoff, mirroring `taskgate-store::lock::RunLock`'s bounded
//! retry idiom.

use std::collections::HashMap;
use std::path::Path;
use std::thread;

use serde_json::Value;
use taskgate_condition::EvalContext;
use taskgate_condition::evaluate;
use taskgate_context::ContextBuilder;
use taskgate_context::Message;
use taskgate_core::ArtifactRecord;
use taskgate_core::CoreError;
use taskgate_core::ExecutionOutcome;
use taskgate_core::PatternExecution;
use taskgate_core::RunId;
use taskgate_core::RunStatus;
use taskgate_core::StepIndex;
use taskgate_core::TaskQueueEntry;
use taskgate_core::TaskStatus;
use taskgate_core::TaskType;
use taskgate_core::Timestamp;
use taskgate_executor::ExecuteRequest;
use taskgate_executor::ExecutionStatus;
use taskgate_executor::ExecutorAdapter;
use taskgate_executor::first_available;
use taskgate_learner::PatternStore;
use taskgate_store::RunPatch;
use taskgate_store::RunStore;

use crate::workflow::StepDefinition;
use crate::workflow::WorkflowDefinition;

/// The surfaces a step's `condition` expression evaluates against, supplied
/// by the caller since only it knows the run's config and prior artifacts
/// (spec §4.3).
#[derive(Debug, Clone)]
pub struct StepEvalInputs {
    /// Resolved workflow/orchestrator configuration.
    pub config: Value,
    /// The previous step's recorded output, or `Value::Null` at step zero.
    pub step_output: Value,
    /// Environment surface flattened for condition evaluation
    /// (`taskgate_config::EnvSurface::to_condition_map`).
    pub env: HashMap<String, String>,
    /// The run's artifact metadata, addressable by dotted path.
    pub artifacts: Value,
    /// Providers/agents available for `providers.includes(...)`.
    pub providers: Vec<String>,
}

/// The result of one [`Stepper::advance`] call (spec §4.8).
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step's condition evaluated false; the run advanced without
    /// executing anything.
    Skipped { step: StepIndex },
    /// The step requires approval; the run is now `awaiting_approval`.
    AwaitingApproval { step: StepIndex },
    /// The step executed successfully and the run advanced.
    Completed { step: StepIndex, artifacts_written: Vec<String> },
    /// The step failed after exhausting its retry policy; the run is now
    /// `failed`.
    Failed { step: StepIndex, error: String },
    /// The workflow has no more steps; the run is now `completed`.
    WorkflowCompleted,
}

/// The Workflow Stepper (spec §4.8).
pub struct Stepper {
    /// Persistence for run records and artifact registries.
    run_store: RunStore,
    /// Context assembly for executor invocations.
    context_builder: ContextBuilder,
    /// Append-only pattern log persistence.
    pattern_store: PatternStore,
}

impl Stepper {
    /// Builds a stepper over the given collaborators.
    #[must_use]
    pub fn new(run_store: RunStore, context_builder: ContextBuilder, pattern_store: PatternStore) -> Self {
        Self { run_store, context_builder, pattern_store }
    }

    /// Reads a run's current record, for callers (the CLI's `monitor`
    /// command, tests) that need to observe state without advancing it.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `run_id` has no run directory.
    pub fn read_run(&self, run_id: &RunId) -> Result<taskgate_core::RunRecord, CoreError> {
        self.run_store.read_run(run_id)
    }

    /// Advances `run_id` by exactly one workflow step (spec §4.8).
    ///
    /// # Errors
    /// Returns [`CoreError::IllegalStateTransition`] if the run is already
    /// terminal, [`CoreError::NoExecutorAvailable`] if no adapter in
    /// `adapters` reports itself available, or the usual Run Store
    /// read/write/lock failures.
    pub fn advance(&self, run_id: &RunId, workflow: &WorkflowDefinition, task_type: &TaskType, adapters: &[&dyn ExecutorAdapter], eval_inputs: &StepEvalInputs) -> Result<StepOutcome, CoreError> {
        let run = self.run_store.read_run(run_id)?;
        if run.status.is_terminal() {
            return Err(CoreError::IllegalStateTransition(format!("run {run_id} is already {:?} and cannot be advanced", run.status)));
        }

        if run.status == RunStatus::Pending {
            self.transition(run_id, RunStatus::InProgress)?;
        }

        let step_index = run.current_step;
        let Some(step_def) = workflow.step(step_index.get() as usize) else {
            self.transition(run_id, RunStatus::Completed)?;
            return Ok(StepOutcome::WorkflowCompleted);
        };

        if let Some(condition) = &step_def.condition {
            let ctx = EvalContext { config: &eval_inputs.config, step_output: &eval_inputs.step_output, env: &eval_inputs.env, artifacts: &eval_inputs.artifacts, providers: &eval_inputs.providers };
            let outcome = evaluate(condition, &ctx);
            if !outcome.result {
                self.advance_step_index(run_id, step_index, &step_def.agent, TaskStatus::Completed)?;
                return Ok(StepOutcome::Skipped { step: step_index });
            }
        }

        if step_def.requires_approval {
            self.transition(run_id, RunStatus::AwaitingApproval)?;
            return Ok(StepOutcome::AwaitingApproval { step: step_index });
        }

        let run_dir = self.run_store.run_dir(run_id);
        let context = self.context_builder.build(&step_def.agent, run_id, step_index, &step_def.injections, &step_def.task_description, prior_messages(&eval_inputs.step_output))?;

        let Some(adapter) = first_available(adapters) else {
            self.record_failure(run_id, task_type, step_def, "no executor adapter is available")?;
            return Err(CoreError::NoExecutorAvailable);
        };

        let result = self.invoke_with_retry(adapter, &context, run_id, step_index, step_def, &run_dir)?;

        match result.status {
            ExecutionStatus::Completed => {
                for path in &result.artifacts_written {
                    self.register_one_artifact(run_id, step_index, &step_def.agent, path, step_def.artifact_policy)?;
                }
                #[allow(clippy::cast_precision_loss, reason = "duration in milliseconds converted to minutes for a log entry; precision loss here is immaterial")]
                let duration_minutes = result.duration_ms as f64 / 60_000.0;
                self.pattern_store.record(task_type, PatternExecution { outcome: ExecutionOutcome::Success, duration_minutes, agents: vec![step_def.agent.as_str().to_string()], feedback: None, timestamp: Timestamp::now() })?;
                self.advance_step_index(run_id, step_index, &step_def.agent, TaskStatus::Completed)?;
                Ok(StepOutcome::Completed { step: step_index, artifacts_written: result.artifacts_written })
            }
            ExecutionStatus::AwaitingApproval => {
                self.transition(run_id, RunStatus::AwaitingApproval)?;
                Ok(StepOutcome::AwaitingApproval { step: step_index })
            }
            ExecutionStatus::Failed | ExecutionStatus::Timeout => {
                let error = result.error.unwrap_or_else(|| "executor invocation failed".to_string());
                self.record_failure(run_id, task_type, step_def, &error)?;
                Ok(StepOutcome::Failed { step: step_index, error })
            }
        }
    }

    /// Invokes `adapter`, retrying on `Failed`/`Timeout` per `step_def`'s
    /// retry policy with exponential backoff (spec §4.8).
    fn invoke_with_retry(&self, adapter: &dyn ExecutorAdapter, context: &taskgate_context::BuiltContext, run_id: &RunId, step: StepIndex, step_def: &StepDefinition, run_dir: &Path) -> Result<taskgate_executor::ExecuteResult, CoreError> {
        let mut attempt = 0u32;
        loop {
            let request = ExecuteRequest { agent: &step_def.agent, context, run_id, step, deadline: step_def.retry.max_delay };
            let result = adapter.execute(&request).map_err(|err| CoreError::ExecutorFailure(err.to_string()))?.rewrite_false_success(run_dir);

            let retryable = matches!(result.status, ExecutionStatus::Failed | ExecutionStatus::Timeout);
            if !retryable || attempt >= step_def.retry.max_attempts {
                return Ok(result);
            }
            attempt += 1;
            thread::sleep(step_def.retry.delay_for_attempt(attempt));
        }
    }

    /// Registers one executor-written artifact under the run's registry.
    fn register_one_artifact(&self, run_id: &RunId, step: StepIndex, agent: &taskgate_core::AgentId, path: &str, policy: taskgate_core::IdempotencyPolicy) -> Result<ArtifactRecord, CoreError> {
        let name = Path::new(path).file_stem().and_then(|stem| stem.to_str()).unwrap_or(path).to_string();
        let artifact = ArtifactRecord::new(name, step, agent.clone(), path.to_string());
        self.run_store.register_artifact(run_id, artifact, policy)
    }

    /// Persists a step failure: logs the failure outcome to the Pattern
    /// Learner and transitions the run to `failed`.
    fn record_failure(&self, run_id: &RunId, task_type: &TaskType, step_def: &StepDefinition, error: &str) -> Result<(), CoreError> {
        self.pattern_store.record(task_type, PatternExecution { outcome: ExecutionOutcome::Failure, duration_minutes: 0.0, agents: vec![step_def.agent.as_str().to_string()], feedback: Some(error.to_string()), timestamp: Timestamp::now() })?;
        self.transition(run_id, RunStatus::Failed)
    }

    /// Transitions `run_id` to `next`, rejecting illegal transitions before
    /// ever touching the Run Store (spec §4.8's state machine).
    fn transition(&self, run_id: &RunId, next: RunStatus) -> Result<(), CoreError> {
        let run = self.run_store.read_run(run_id)?;
        if !run.status.can_transition_to(next) {
            return Err(CoreError::IllegalStateTransition(format!("run {run_id} cannot move from {:?} to {next:?}", run.status)));
        }
        self.run_store.update_run(run_id, RunPatch { status: Some(next), ..RunPatch::default() })?;
        Ok(())
    }

    /// Advances the run's `current_step` by one and appends a task-queue
    /// entry for the step just resolved (spec §4.8, "advance current_step").
    fn advance_step_index(&self, run_id: &RunId, completed: StepIndex, agent: &taskgate_core::AgentId, status: TaskStatus) -> Result<(), CoreError> {
        let run = self.run_store.read_run(run_id)?;
        let mut task_queue = run.task_queue.clone();
        task_queue.push(TaskQueueEntry { task_id: format!("{run_id}-step-{}", completed.get()), description: format!("step {}", completed.get()), agent: agent.clone(), step: completed, status });
        self.run_store.update_run(run_id, RunPatch { current_step: Some(completed.next()), task_queue: Some(task_queue), ..RunPatch::default() })?;
        Ok(())
    }
}

/// Derives the single prior message the Stepper carries forward: the
/// previous step's recorded output, if it was textual.
fn prior_messages(step_output: &Value) -> Vec<Message> {
    match step_output.as_str() {
        Some(text) if !text.is_empty() => vec![Message { role: "previous_step".to_string(), content: text.to_string() }],
        _ => Vec::new(),
    }
}
