// crates/taskgate-stepper/src/lib.rs
// ============================================================================
// Module: Taskgate Stepper
// Description: Workflow Stepper: the central per-step state machine driving
//              every run from `pending` to a terminal status (spec §4.8).
// Purpose: Compose the condition evaluator, context builder, executor
//          adapters, run store, and pattern learner into one advance-one-step
//          operation.
// Dependencies: serde, taskgate-condition, taskgate-context, taskgate-core,
//               taskgate-executor, taskgate-learner, taskgate-store, thiserror
// ============================================================================

//! ## Overview
//! [`Stepper::advance`] is the only entry point: it loads a run, resolves
//! exactly one step against a [`WorkflowDefinition`], and returns a
//! [`StepOutcome`] describing what happened. Repeated calls drive a run to
//! completion; the CLI and any future scheduler are thin callers over this
//! one operation.

pub mod iteration_store;
pub mod session_store;
pub mod stepper;
pub mod workflow;

pub use iteration_store::IterationStore;
pub use session_store::SessionStore;
pub use stepper::StepEvalInputs;
pub use stepper::StepOutcome;
pub use stepper::Stepper;
pub use workflow::RetryPolicy;
pub use workflow::StepDefinition;
pub use workflow::WorkflowDefinition;

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use serde_json::json;
    use taskgate_context::ContextBuilder;
    use taskgate_core::AgentId;
    use taskgate_core::IdempotencyPolicy;
    use taskgate_core::RunId;
    use taskgate_core::RunStatus;
    use taskgate_core::TaskType;
    use taskgate_executor::ExecuteRequest;
    use taskgate_executor::ExecuteResult;
    use taskgate_executor::ExecutionStatus;
    use taskgate_executor::ExecutorAdapter;
    use taskgate_executor::ExecutorError;
    use taskgate_executor::TokenUsage;
    use taskgate_executor::TokenUsageConfidence;
    use taskgate_executor::TokenUsageSource;
    use taskgate_learner::PatternStore;
    use taskgate_store::CreateRunOptions;
    use taskgate_store::RunStore;
    use tempfile::tempdir;

    use super::StepDefinition;
    use super::StepEvalInputs;
    use super::Stepper;
    use super::WorkflowDefinition;

    struct AlwaysSucceeds;

    impl ExecutorAdapter for AlwaysSucceeds {
        fn name(&self) -> &str {
            "always-succeeds"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn execute(&self, request: &ExecuteRequest<'_>) -> Result<ExecuteResult, ExecutorError> {
            let artifact_path = format!("artifacts/step-{}.md", request.step.get());
            Ok(ExecuteResult {
                status: ExecutionStatus::Completed,
                artifacts_written: vec![artifact_path],
                gate_path: None,
                reasoning_path: None,
                token_usage: TokenUsage { used: 100, limit: Some(10_000), source: TokenUsageSource::Estimate, confidence: TokenUsageConfidence::Medium },
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: 5,
                error: None,
            })
        }
    }

    struct AlwaysFails;

    impl ExecutorAdapter for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn execute(&self, _request: &ExecuteRequest<'_>) -> Result<ExecuteResult, ExecutorError> {
            Ok(ExecuteResult { status: ExecutionStatus::Failed, artifacts_written: vec![], gate_path: None, reasoning_path: None, token_usage: TokenUsage { used: 0, limit: None, source: TokenUsageSource::Heuristic, confidence: TokenUsageConfidence::Low }, stdout: String::new(), stderr: String::new(), duration_ms: 1, error: Some("adapter always fails".to_string()) })
        }
    }

    fn harness() -> (tempfile::TempDir, Stepper, RunId) {
        let dir = tempdir().expect("tempdir");
        let run_store = RunStore::with_tuning(dir.path().join("runs"), Duration::from_millis(200), Duration::from_millis(500), Duration::from_secs(30));
        let run_id = RunId::parse("run-1").expect("valid id");
        run_store.create_run(&run_id, CreateRunOptions { workflow_id: "wf-impl".to_string(), selected_workflow: "wf-impl-v1".to_string(), orchestrator_session_id: None }).expect("create run");

        std::fs::create_dir_all(dir.path().join("personas")).expect("mkdir");
        std::fs::write(dir.path().join("personas").join("developer.md"), "You are a developer.").expect("write persona");
        let context_builder = ContextBuilder::new(dir.path().join("personas"), dir.path().join("injections"));
        let pattern_store = PatternStore::with_tuning(dir.path().join("patterns"), Duration::from_millis(200), Duration::from_secs(30));

        let stepper = Stepper::new(run_store, context_builder, pattern_store);
        (dir, stepper, run_id)
    }

    fn eval_inputs() -> StepEvalInputs {
        StepEvalInputs { config: json!({}), step_output: serde_json::Value::Null, env: HashMap::new(), artifacts: json!({}), providers: vec!["developer".to_string()] }
    }

    #[test]
    fn completed_step_writes_an_artifact_and_advances_the_run() {
        let (dir, stepper, run_id) = harness();
        let workflow = WorkflowDefinition { id: "wf-impl-v1".to_string(), steps: vec![StepDefinition { agent: AgentId::new("developer"), task_description: "write the design doc".to_string(), condition: None, requires_approval: false, injections: vec![], retry: Default::default(), artifact_policy: IdempotencyPolicy::Overwrite }] };
        let task_type = TaskType::new("GENERAL");
        let adapter = AlwaysSucceeds;
        let adapters: Vec<&dyn ExecutorAdapter> = vec![&adapter];

        std::fs::create_dir_all(dir.path().join("runs").join("run-1").join("artifacts")).expect("mkdir");
        std::fs::write(dir.path().join("runs").join("run-1").join("artifacts").join("step-0.md"), "done").expect("write artifact");

        let outcome = stepper.advance(&run_id, &workflow, &task_type, &adapters, &eval_inputs()).expect("advances");
        assert!(matches!(outcome, super::StepOutcome::Completed { .. }));
    }

    #[test]
    fn step_with_false_condition_is_skipped_without_executing() {
        let (_dir, stepper, run_id) = harness();
        let workflow = WorkflowDefinition { id: "wf-impl-v1".to_string(), steps: vec![StepDefinition { agent: AgentId::new("developer"), task_description: "optional cleanup".to_string(), condition: Some("config.enabled".to_string()), requires_approval: false, injections: vec![], retry: Default::default(), artifact_policy: IdempotencyPolicy::Overwrite }] };
        let task_type = TaskType::new("GENERAL");
        let adapters: Vec<&dyn ExecutorAdapter> = vec![];

        let outcome = stepper.advance(&run_id, &workflow, &task_type, &adapters, &eval_inputs()).expect("advances");
        assert!(matches!(outcome, super::StepOutcome::Skipped { .. }));
    }

    #[test]
    fn step_requiring_approval_pauses_the_run() {
        let (_dir, stepper, run_id) = harness();
        let workflow = WorkflowDefinition { id: "wf-impl-v1".to_string(), steps: vec![StepDefinition { agent: AgentId::new("developer"), task_description: "needs a human".to_string(), condition: None, requires_approval: true, injections: vec![], retry: Default::default(), artifact_policy: IdempotencyPolicy::Overwrite }] };
        let task_type = TaskType::new("GENERAL");
        let adapters: Vec<&dyn ExecutorAdapter> = vec![];

        let outcome = stepper.advance(&run_id, &workflow, &task_type, &adapters, &eval_inputs()).expect("advances");
        assert!(matches!(outcome, super::StepOutcome::AwaitingApproval { .. }));

        let run = stepper.read_run(&run_id).expect("run exists");
        assert_eq!(run.status, RunStatus::AwaitingApproval);
    }

    #[test]
    fn failing_adapter_marks_the_run_failed_after_exhausting_retries() {
        let (_dir, stepper, run_id) = harness();
        let retry = super::RetryPolicy { max_attempts: 1, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) };
        let workflow = WorkflowDefinition { id: "wf-impl-v1".to_string(), steps: vec![StepDefinition { agent: AgentId::new("developer"), task_description: "always fails".to_string(), condition: None, requires_approval: false, injections: vec![], retry, artifact_policy: IdempotencyPolicy::Overwrite }] };
        let task_type = TaskType::new("GENERAL");
        let adapter = AlwaysFails;
        let adapters: Vec<&dyn ExecutorAdapter> = vec![&adapter];

        let outcome = stepper.advance(&run_id, &workflow, &task_type, &adapters, &eval_inputs()).expect("advances");
        assert!(matches!(outcome, super::StepOutcome::Failed { .. }));

        let run = stepper.read_run(&run_id).expect("run exists");
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[test]
    fn no_available_adapter_is_fatal() {
        let (_dir, stepper, run_id) = harness();
        let workflow = WorkflowDefinition { id: "wf-impl-v1".to_string(), steps: vec![StepDefinition { agent: AgentId::new("developer"), task_description: "needs an adapter".to_string(), condition: None, requires_approval: false, injections: vec![], retry: Default::default(), artifact_policy: IdempotencyPolicy::Overwrite }] };
        let task_type = TaskType::new("GENERAL");
        let adapters: Vec<&dyn ExecutorAdapter> = vec![];

        let err = stepper.advance(&run_id, &workflow, &task_type, &adapters, &eval_inputs()).expect_err("no adapter available");
        assert!(matches!(err, taskgate_core::CoreError::NoExecutorAvailable));
    }

    #[test]
    fn workflow_with_no_remaining_steps_completes_the_run() {
        let (_dir, stepper, run_id) = harness();
        let workflow = WorkflowDefinition { id: "wf-impl-v1".to_string(), steps: vec![] };
        let task_type = TaskType::new("GENERAL");
        let adapters: Vec<&dyn ExecutorAdapter> = vec![];

        let outcome = stepper.advance(&run_id, &workflow, &task_type, &adapters, &eval_inputs()).expect("advances");
        assert!(matches!(outcome, super::StepOutcome::WorkflowCompleted));
    }
}
