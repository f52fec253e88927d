// crates/taskgate-cli/src/main.rs
// ============================================================================
// Module: Taskgate CLI Entry Point
// Description: Command dispatcher for the core orchestrator's line-oriented
//              surface (spec §6.3): run lifecycle, health/monitor, classify,
//              route, and iteration-state management.
// Purpose: The only binary in the workspace that touches stdout/stderr;
//          every other crate returns structured data.
// Dependencies: clap, serde, serde_json, taskgate-classifier, taskgate-config,
//               taskgate-core, taskgate-health, taskgate-learner,
//               taskgate-router, taskgate-stepper, taskgate-store, thiserror
// ============================================================================

//! ## Overview
//! `taskgate` dispatches to one function per subcommand. Every function
//! builds its own collaborators from [`OrchestratorConfig`] (so a single
//! invocation never pays for state it doesn't need), does exactly one thing,
//! and returns a [`CliOutput`] that `main` renders either as pretty JSON
//! (`--json`) or as a short human-readable line. Exit codes follow spec
//! §6.3 and §7: `0` success, `1` logical failure (blocked route, stalled
//! run), `2` fatal error (bad input, corrupt state, missing executor).

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;
use taskgate_classifier::ClassificationRequest;
use taskgate_classifier::GlobCache;
use taskgate_config::OrchestratorConfig;
use taskgate_config::default_complexity_tables;
use taskgate_config::default_cross_cutting_triggers;
use taskgate_config::default_routing_matrix;
use taskgate_config::default_security_categories;
use taskgate_config::default_task_type_tables;
use taskgate_core::CoreError;
use taskgate_core::ExitSeverity;
use taskgate_core::IterationStatus;
use taskgate_core::RunId;
use taskgate_core::RunStatus;
use taskgate_core::StepIndex;
use taskgate_core::TaskType;
use taskgate_health::HealthMonitor;
use taskgate_learner::PatternStore;
use taskgate_router::route as run_router;
use taskgate_stepper::IterationStore;
use taskgate_store::CreateRunOptions;
use taskgate_store::RunPatch;
use taskgate_store::RunStore;

/// How many times `monitor --watch` polls before giving up and reporting
/// the last-observed status (2s between polls, so ~2 minutes total).
const WATCH_MAX_POLLS: u32 = 60;
/// Delay between `monitor --watch` polls.
const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(2);

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "taskgate", about = "Multi-agent workflow orchestrator core", disable_help_subcommand = true)]
struct Cli {
    /// Emit machine-readable JSON instead of a short human-readable line.
    #[arg(long, global = true)]
    json: bool,
    /// Overrides `runs_root` from the loaded configuration.
    #[arg(long, global = true, value_name = "PATH")]
    runs_root: Option<PathBuf>,
    /// Overrides `patterns_root` from the loaded configuration.
    #[arg(long, global = true, value_name = "PATH")]
    patterns_root: Option<PathBuf>,
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands (spec §6.3).
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run lifecycle operations.
    Run {
        #[command(subcommand)]
        command: RunCommand,
    },
    /// Health, progress, and stall reporting.
    Monitor(MonitorArgs),
    /// Runs the Task Classifier over a description.
    Classify(ClassifyArgs),
    /// Runs the Agent Router over a description.
    Route(RouteArgs),
    /// Self-healing iteration-loop state.
    Iteration {
        #[command(subcommand)]
        command: IterationCommand,
    },
}

/// `run` subcommands.
#[derive(Subcommand, Debug)]
enum RunCommand {
    /// Creates a new run.
    Create {
        /// The run's identifier.
        #[arg(long)]
        run_id: String,
        /// Identifier of the workflow definition this run executes.
        #[arg(long, default_value = "default-workflow")]
        workflow_id: String,
        /// The specific selected workflow variant.
        #[arg(long)]
        selected_workflow: Option<String>,
        /// Orchestrator session id creating this run, if known.
        #[arg(long)]
        orchestrator_session_id: Option<String>,
    },
    /// Prints a run's current record.
    Read {
        /// The run's identifier.
        #[arg(long)]
        run_id: String,
    },
    /// Patches a single field on a run's record.
    Update {
        /// The run's identifier.
        #[arg(long)]
        run_id: String,
        /// Field to patch: `status`, `current_step`, or any other name
        /// (patched as `metadata.<field>`).
        #[arg(long)]
        field: String,
        /// New value. Parsed as JSON when possible, otherwise kept as a
        /// plain string.
        #[arg(long)]
        value: String,
    },
    /// Prints a run's `current_step`.
    GetCurrentStep {
        /// The run's identifier.
        #[arg(long)]
        run_id: String,
    },
}

/// `monitor` arguments.
#[derive(clap::Args, Debug)]
struct MonitorArgs {
    /// Restricts reporting to a single run.
    #[arg(long)]
    run_id: Option<String>,
    /// Polls the selected run (or the aggregate scan) until it reaches a
    /// terminal state or the poll budget is exhausted.
    #[arg(long)]
    watch: bool,
    /// Emits only the composite health status and score.
    #[arg(long)]
    status: bool,
    /// Lists every known run id instead of reporting metrics.
    #[arg(long)]
    list: bool,
}

/// `classify` arguments.
#[derive(clap::Args, Debug)]
struct ClassifyArgs {
    /// The task description to classify.
    #[arg(long)]
    task: String,
    /// File patterns the task is expected to touch.
    #[arg(long)]
    files: Vec<String>,
}

/// `route` arguments.
#[derive(clap::Args, Debug)]
struct RouteArgs {
    /// The task description to route.
    #[arg(long)]
    task: String,
    /// File patterns the task is expected to touch.
    #[arg(long)]
    files: Vec<String>,
}

/// `iteration` subcommands.
#[derive(Subcommand, Debug)]
enum IterationCommand {
    /// Initializes iteration state for a workflow id.
    Init {
        /// Workflow id to track.
        #[arg(long)]
        id: String,
        /// Minimum score every component must reach for completion.
        #[arg(long)]
        target_rating: f64,
    },
    /// Prints the current iteration state.
    Get {
        /// Workflow id to read.
        #[arg(long)]
        id: String,
    },
    /// Records one component's rating and advances the iteration count.
    Bump {
        /// Workflow id to advance.
        #[arg(long)]
        id: String,
        /// Component being rated.
        #[arg(long)]
        component: String,
        /// The component's new score.
        #[arg(long)]
        rating: f64,
        /// Free-form note describing the fix applied this iteration.
        #[arg(long)]
        note: Option<String>,
    },
    /// Sets the iteration status directly.
    SetStatus {
        /// Workflow id to update.
        #[arg(long)]
        id: String,
        /// New status: `in_progress`, `complete`, or `abandoned`.
        #[arg(long)]
        status: String,
    },
    /// Marks the iteration loop finished.
    Complete {
        /// Workflow id to complete.
        #[arg(long)]
        id: String,
        /// Free-form description of how the loop concluded.
        #[arg(long)]
        status: String,
        /// Marks the loop abandoned rather than successfully complete.
        #[arg(long)]
        abandoned: bool,
    },
}

// ============================================================================
// SECTION: Error Handling
// ============================================================================

/// Errors the CLI layer itself can raise, distinct from [`CoreError`] so a
/// bad `--value` or config load failure doesn't masquerade as a domain error.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// A collaborator in `taskgate-core` or a dependent crate failed.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] taskgate_config::ConfigError),
    /// A command-line argument was malformed in a way clap cannot catch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Maps this error to the CLI's three-bucket exit-code scheme
    /// (spec §6.3, §7).
    fn exit_code(&self) -> ExitCode {
        match self {
            Self::Core(err) => match err.exit_severity() {
                ExitSeverity::Success => ExitCode::SUCCESS,
                ExitSeverity::Logical => ExitCode::from(1),
                ExitSeverity::Fatal => ExitCode::from(2),
            },
            Self::Config(_) | Self::InvalidArgument(_) => ExitCode::from(2),
        }
    }
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// A command's result: a human-readable summary line plus the full JSON
/// payload emitted under `--json`.
struct CliOutput {
    /// One-line human-readable summary.
    summary: String,
    /// Full structured payload.
    payload: Value,
    /// Exit code this outcome maps to once rendered (independent of any
    /// error: a successfully reported stall still exits `1`).
    exit_code: ExitCode,
}

impl CliOutput {
    /// Builds a successful output from a summary and a serializable payload.
    fn success(summary: impl Into<String>, payload: impl Serialize) -> Self {
        Self { summary: summary.into(), payload: serde_json::to_value(payload).unwrap_or(Value::Null), exit_code: ExitCode::SUCCESS }
    }

    /// Overrides the exit code this output renders to.
    fn with_exit_code(mut self, exit_code: ExitCode) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Writes this output to stdout (or a serialization failure to stderr)
    /// and returns the process exit code.
    #[allow(clippy::print_stdout, reason = "the CLI's one sanctioned output point")]
    #[allow(clippy::print_stderr, reason = "the CLI's one sanctioned output point")]
    fn render(self, json: bool) -> ExitCode {
        if json {
            match serde_json::to_string_pretty(&self.payload) {
                Ok(body) => println!("{body}"),
                Err(err) => eprintln!("failed to serialize output: {err}"),
            }
        } else {
            println!("{}", self.summary);
        }
        self.exit_code
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Entry point: parses arguments, dispatches to the selected subcommand, and
/// maps the outcome onto the process exit code (spec §6.3, §7).
#[allow(clippy::print_stderr, reason = "the CLI's one sanctioned output point")]
fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;
    match dispatch(&cli) {
        Ok(output) => output.render(json),
        Err(err) => {
            if json {
                let body = serde_json::json!({ "error": err.to_string() });
                if let Ok(rendered) = serde_json::to_string_pretty(&body) {
                    eprintln!("{rendered}");
                }
            } else {
                eprintln!("error: {err}");
            }
            err.exit_code()
        }
    }
}

/// Loads configuration and applies the global path overrides, then
/// dispatches to the selected subcommand.
fn dispatch(cli: &Cli) -> Result<CliOutput, CliError> {
    let mut config = OrchestratorConfig::load_default()?;
    if let Some(runs_root) = &cli.runs_root {
        config.runs_root = runs_root.clone();
    }
    if let Some(patterns_root) = &cli.patterns_root {
        config.patterns_root = patterns_root.clone();
    }

    match &cli.command {
        Commands::Run { command } => command_run(command, &config),
        Commands::Monitor(args) => command_monitor(args, &config),
        Commands::Classify(args) => command_classify(args, &config),
        Commands::Route(args) => command_route(args, &config),
        Commands::Iteration { command } => command_iteration(command, &config),
    }
}

// ============================================================================
// SECTION: `run` Command
// ============================================================================

/// Builds a [`RunStore`] rooted at the configured `runs_root`.
fn run_store(config: &OrchestratorConfig) -> RunStore {
    RunStore::new(config.runs_root.clone())
}

/// Dispatches a `run` subcommand.
fn command_run(command: &RunCommand, config: &OrchestratorConfig) -> Result<CliOutput, CliError> {
    let store = run_store(config);
    match command {
        RunCommand::Create { run_id, workflow_id, selected_workflow, orchestrator_session_id } => {
            let run_id = parse_run_id(run_id)?;
            let opts = CreateRunOptions {
                workflow_id: workflow_id.clone(),
                selected_workflow: selected_workflow.clone().unwrap_or_else(|| workflow_id.clone()),
                orchestrator_session_id: orchestrator_session_id.clone(),
            };
            let run = store.create_run(&run_id, opts)?;
            Ok(CliOutput::success(format!("created run {run_id} (status: {:?})", run.status), run))
        }
        RunCommand::Read { run_id } => {
            let run_id = parse_run_id(run_id)?;
            let run = store.read_run(&run_id)?;
            Ok(CliOutput::success(format!("run {run_id}: {:?}, step {}", run.status, run.current_step), run))
        }
        RunCommand::Update { run_id, field, value } => {
            let run_id = parse_run_id(run_id)?;
            let patch = build_run_patch(field, value)?;
            let run = store.update_run(&run_id, patch)?;
            Ok(CliOutput::success(format!("updated run {run_id}: {field} <- {value}"), run))
        }
        RunCommand::GetCurrentStep { run_id } => {
            let run_id = parse_run_id(run_id)?;
            let run = store.read_run(&run_id)?;
            Ok(CliOutput::success(run.current_step.get().to_string(), serde_json::json!({ "current_step": run.current_step.get() })))
        }
    }
}

/// Parses a raw run-id string, mapping a validation failure to
/// [`CoreError::InvalidArgument`] (spec §6.2).
fn parse_run_id(raw: &str) -> Result<RunId, CliError> {
    RunId::parse(raw).map_err(CoreError::InvalidArgument).map_err(CliError::from)
}

/// Builds a [`RunPatch`] for `run update --field F --value V` (spec §6.3).
///
/// `status` and `current_step` are recognised as top-level fields; anything
/// else is deep-merged into `metadata` under that field name, matching the
/// free-form metadata bag spec §3.1 describes.
fn build_run_patch(field: &str, value: &str) -> Result<RunPatch, CliError> {
    let mut patch = RunPatch::default();
    match field {
        "status" => {
            patch.status = Some(parse_run_status(value)?);
        }
        "current_step" => {
            let step: u32 = value.parse().map_err(|_| CliError::InvalidArgument(format!("current_step must be a non-negative integer, got {value:?}")))?;
            patch.current_step = Some(StepIndex::new(step));
        }
        _ => {
            let parsed: Value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            patch.metadata.insert(field.to_string(), parsed);
        }
    }
    Ok(patch)
}

/// Parses a run status string into [`RunStatus`], accepting the same
/// `snake_case` spelling the wire format uses (spec §3.1).
fn parse_run_status(raw: &str) -> Result<RunStatus, CliError> {
    match raw {
        "pending" => Ok(RunStatus::Pending),
        "in_progress" => Ok(RunStatus::InProgress),
        "awaiting_approval" => Ok(RunStatus::AwaitingApproval),
        "completed" => Ok(RunStatus::Completed),
        "failed" => Ok(RunStatus::Failed),
        other => Err(CliError::InvalidArgument(format!("unknown run status {other:?}"))),
    }
}

// ============================================================================
// SECTION: `monitor` Command
// ============================================================================

/// Dispatches the `monitor` command: `--list`, a single `--run-id`, or an
/// aggregate scan, each optionally polled under `--watch`.
fn command_monitor(args: &MonitorArgs, config: &OrchestratorConfig) -> Result<CliOutput, CliError> {
    let monitor = HealthMonitor::new(run_store(config), PatternStore::new(config.patterns_root.clone()), default_routing_matrix(), known_task_types()).with_stall_threshold_secs(i64::try_from(config.stall_threshold_secs).unwrap_or(i64::MAX));

    if args.list {
        let ids = monitor.list_run_ids()?;
        let summary = format!("{} run(s)", ids.len());
        return Ok(CliOutput::success(summary, ids.iter().map(RunId::as_str).collect::<Vec<_>>()));
    }

    if let Some(run_id) = &args.run_id {
        let run_id = parse_run_id(run_id)?;
        let mut view = monitor.run_status(&run_id)?;
        let mut polls = 0;
        while args.watch && !view.run.status.is_terminal() && !view.stalled && polls < WATCH_MAX_POLLS {
            thread::sleep(WATCH_POLL_INTERVAL);
            view = monitor.run_status(&run_id)?;
            polls += 1;
        }
        let summary = format!("run {run_id}: {:?}, step {} (stalled: {})", view.run.status, view.run.current_step, view.stalled);
        let exit_code = if view.stalled { ExitCode::from(1) } else { ExitCode::SUCCESS };
        return Ok(CliOutput::success(summary, &view).with_exit_code(exit_code));
    }

    let mut metrics = monitor.scan()?;
    let mut polls = 0;
    while args.watch && metrics.stalled_runs == 0 && metrics.active_runs > 0 && polls < WATCH_MAX_POLLS {
        thread::sleep(WATCH_POLL_INTERVAL);
        metrics = monitor.scan()?;
        polls += 1;
    }

    if args.status {
        let summary = format!("health: {:?} (score {:.1})", metrics.status, metrics.score);
        let exit_code = if metrics.status == taskgate_health::HealthStatus::Critical { ExitCode::from(1) } else { ExitCode::SUCCESS };
        return Ok(CliOutput::success(summary, serde_json::json!({ "status": metrics.status, "score": metrics.score })).with_exit_code(exit_code));
    }

    let summary = format!("{} runs ({} active, {} stalled, {} completed, {} failed), health {:?} ({:.1})", metrics.total_runs, metrics.active_runs, metrics.stalled_runs, metrics.completed_runs, metrics.failed_runs, metrics.status, metrics.score);
    let exit_code = if metrics.stalled_runs > 0 { ExitCode::from(1) } else { ExitCode::SUCCESS };
    Ok(CliOutput::success(summary, &metrics).with_exit_code(exit_code))
}

/// The fixed universe of task types the router's matrix knows about, used
/// to scope the Pattern Learner's per-task-type log reads (spec §4.10).
fn known_task_types() -> Vec<TaskType> {
    default_routing_matrix().into_iter().map(|entry| entry.task_type).collect()
}

// ============================================================================
// SECTION: `classify` / `route` Commands
// ============================================================================

/// Dispatches the `classify` command.
fn command_classify(args: &ClassifyArgs, config: &OrchestratorConfig) -> Result<CliOutput, CliError> {
    let request = ClassificationRequest::new(args.task.clone()).with_file_patterns(args.files.clone());
    let project_root = std::env::current_dir().map_err(|err| CliError::InvalidArgument(format!("failed resolving current directory: {err}")))?;
    let glob_cache = GlobCache::new(Duration::from_secs(config.glob_cache_ttl_secs));
    let routing_matrix = default_routing_matrix();

    let primary_agent_for = |task_type: &TaskType| routing_matrix.iter().find(|entry| &entry.task_type == task_type).map_or_else(|| taskgate_core::AgentId::new("developer"), |entry| entry.primary.clone());

    let result = taskgate_classifier::classify(&request, &project_root, &glob_cache, &default_complexity_tables(), &default_task_type_tables(), primary_agent_for)?;

    let summary = format!("{:?}/{} -> {} (planner: {}, review: {}, impact: {})", result.complexity, result.task_type, result.primary_agent, result.gate_planner, result.gate_review, result.gate_impact_analysis);
    Ok(CliOutput::success(summary, &result))
}

/// Dispatches the `route` command.
fn command_route(args: &RouteArgs, config: &OrchestratorConfig) -> Result<CliOutput, CliError> {
    let request = ClassificationRequest::new(args.task.clone()).with_file_patterns(args.files.clone());
    let project_root = std::env::current_dir().map_err(|err| CliError::InvalidArgument(format!("failed resolving current directory: {err}")))?;
    let glob_cache = GlobCache::new(Duration::from_secs(config.glob_cache_ttl_secs));
    let pattern_store = PatternStore::new(config.patterns_root.clone());

    let result = run_router(&request, &project_root, &glob_cache, &default_complexity_tables(), &default_task_type_tables(), &default_routing_matrix(), &default_cross_cutting_triggers(), &default_security_categories(), &pattern_store)?;

    let chain = result.full_chain.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");
    let summary = if result.blocked { format!("BLOCKED ({}): {chain}", result.security_enforcement.priority) } else { format!("{} [{}]: {chain}", result.workflow, result.classification.complexity) };
    let exit_code = if result.blocked { ExitCode::from(1) } else { ExitCode::SUCCESS };
    Ok(CliOutput::success(summary, &result).with_exit_code(exit_code))
}

// ============================================================================
// SECTION: `iteration` Command
// ============================================================================

/// Dispatches an `iteration` subcommand.
fn command_iteration(command: &IterationCommand, config: &OrchestratorConfig) -> Result<CliOutput, CliError> {
    let store = IterationStore::new(config.patterns_root.join("iterations"));
    match command {
        IterationCommand::Init { id, target_rating } => {
            let state = store.init(id.clone(), *target_rating)?;
            Ok(CliOutput::success(format!("initialized iteration state for {id} (target {target_rating})"), state))
        }
        IterationCommand::Get { id } => {
            let state = store.get(id)?;
            Ok(CliOutput::success(format!("{id}: iteration {}, status {:?}", state.iteration_count, state.status), state))
        }
        IterationCommand::Bump { id, component, rating, note } => {
            let state = store.bump(id, component.clone(), taskgate_core::ComponentRating { score: *rating }, note.clone())?;
            Ok(CliOutput::success(format!("{id}: {component} <- {rating} (iteration {}, status {:?})", state.iteration_count, state.status), state))
        }
        IterationCommand::SetStatus { id, status } => {
            let status = parse_iteration_status(status)?;
            let state = store.set_status(id, status)?;
            Ok(CliOutput::success(format!("{id}: status -> {:?}", state.status), state))
        }
        IterationCommand::Complete { id, status, abandoned } => {
            let state = store.complete(id, status.clone(), *abandoned)?;
            Ok(CliOutput::success(format!("{id}: completed ({:?})", state.status), state))
        }
    }
}

/// Parses an iteration status string (spec §3.5).
fn parse_iteration_status(raw: &str) -> Result<IterationStatus, CliError> {
    match raw {
        "in_progress" => Ok(IterationStatus::InProgress),
        "complete" => Ok(IterationStatus::Complete),
        "abandoned" => Ok(IterationStatus::Abandoned),
        other => Err(CliError::InvalidArgument(format!("unknown iteration status {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use taskgate_core::RunStatus;
    use taskgate_store::RunPatch;

    use super::build_run_patch;
    use super::parse_run_status;

    #[test]
    fn status_field_parses_into_the_typed_enum() {
        let patch = build_run_patch("status", "completed").expect("parses");
        assert_eq!(patch.status, Some(RunStatus::Completed));
    }

    #[test]
    fn current_step_field_parses_into_a_step_index() {
        let patch = build_run_patch("current_step", "3").expect("parses");
        assert_eq!(patch.current_step.map(|step| step.get()), Some(3));
    }

    #[test]
    fn unknown_field_is_deep_merged_into_metadata() {
        let patch: RunPatch = build_run_patch("blockers", "[\"needs review\"]").expect("parses");
        assert!(patch.metadata.contains_key("blockers"));
        assert_eq!(patch.status, None);
    }

    #[test]
    fn plain_string_value_is_kept_as_a_json_string_when_not_valid_json() {
        let patch = build_run_patch("next_step", "deploy to staging").expect("parses");
        assert_eq!(patch.metadata.get("next_step"), Some(&serde_json::json!("deploy to staging")));
    }

    #[test]
    fn unknown_status_value_is_rejected() {
        assert!(parse_run_status("sideways").is_err());
    }
}
