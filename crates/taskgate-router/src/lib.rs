// crates/taskgate-router/src/lib.rs
// ============================================================================
// Module: Taskgate Router
// Description: Agent Router: classifies a task, assembles its execution
//              chain, and enforces security review requirements (spec §4.5).
// Purpose: Turn a sanitised task into the ordered agent chain, gates, and
//          security decision the Workflow Stepper executes against.
// Dependencies: serde, taskgate-classifier, taskgate-config, taskgate-core,
//               taskgate-learner
// ============================================================================

//! ## Overview
//! [`route`] runs the seven-step algorithm spec §4.5 describes: classify,
//! look up the task type's base chain in the routing matrix, layer in any
//! compatible cross-cutting triggers, compute plan-reviewer/signoff
//! requirements, run the security-enforcement scan (which may block the
//! result outright), assemble the deduplicated execution chain, and consult
//! the Pattern Learner for a non-binding suggestion.

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use taskgate_classifier::ClassificationRequest;
use taskgate_classifier::ClassificationResult;
use taskgate_classifier::GlobCache;
use taskgate_classifier::classify;
use taskgate_config::CrossCuttingTrigger;
use taskgate_config::RoutingMatrixEntry;
use taskgate_config::SecurityCategory;
use taskgate_core::AgentId;
use taskgate_core::CoreError;
use taskgate_learner::PatternStore;
use taskgate_learner::RoutingSuggestion;

/// The outcome of the security-enforcement scan (spec §4.5 step 5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEnforcement {
    /// Highest-priority category matched, if any (`"critical"` when a
    /// blocking category fired, otherwise the matched category's name).
    pub priority: String,
    /// Whether this result blocks the Stepper from executing any step.
    pub blocking: bool,
    /// Whether a human sign-off is required even when not blocking.
    pub require_signoff: bool,
    /// Matched category names, in priority order.
    pub categories: Vec<String>,
    /// Agents this result additionally requires in the execution chain.
    pub required_agents: Vec<AgentId>,
}

impl SecurityEnforcement {
    /// The enforcement result when no security category matched.
    fn none() -> Self {
        Self { priority: "none".to_string(), blocking: false, require_signoff: false, categories: Vec::new(), required_agents: Vec::new() }
    }
}

/// The Agent Router's output (spec §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    /// The classification that produced this routing.
    pub classification: ClassificationResultView,
    /// The deduplicated, ordered execution chain.
    pub full_chain: Vec<AgentId>,
    /// The workflow identifier selected for this task type.
    pub workflow: String,
    /// Review agents attached to the chain.
    pub reviewers: Vec<AgentId>,
    /// Agents whose sign-off is required.
    pub signoffs: Vec<AgentId>,
    /// Outcome of the security-enforcement scan.
    pub security_enforcement: SecurityEnforcement,
    /// Whether the Stepper must halt before executing any step.
    pub blocked: bool,
    /// A non-binding Pattern Learner suggestion, if enough history exists.
    pub pattern_suggestion: Option<RoutingSuggestion>,
}

/// A serializable projection of [`ClassificationResult`] for routing output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResultView {
    /// The classified complexity level, as its table label.
    pub complexity: String,
    /// The classified task type.
    pub task_type: String,
    /// The agent the classifier nominated as primary.
    pub primary_agent: AgentId,
    /// Reasoning steps carried over from classification.
    pub reasoning: Vec<String>,
}

impl From<&ClassificationResult> for ClassificationResultView {
    fn from(result: &ClassificationResult) -> Self {
        Self { complexity: format!("{:?}", result.complexity).to_lowercase(), task_type: result.task_type.to_string(), primary_agent: result.primary_agent.clone(), reasoning: result.reasoning.clone() }
    }
}

/// Routes a task: classifies it, assembles its execution chain, and applies
/// security enforcement (spec §4.5).
///
/// # Errors
/// Returns [`CoreError::InvalidArgument`] if classification fails; never
/// fails on a security block, which is instead reported via
/// [`RoutingResult::blocked`].
#[allow(clippy::too_many_arguments, reason = "a router needs every table and its two collaborators; a config struct would just move these fields, not reduce the surface")]
pub fn route(request: &ClassificationRequest, project_root: &Path, glob_cache: &GlobCache, complexity_tables: &[taskgate_config::ComplexityTable], task_type_tables: &[taskgate_config::TaskTypeTable], routing_matrix: &[RoutingMatrixEntry], cross_cutting_triggers: &[CrossCuttingTrigger], security_categories: &[SecurityCategory], pattern_store: &PatternStore) -> Result<RoutingResult, CoreError> {
    let primary_agent_for = |task_type: &taskgate_core::TaskType| routing_matrix.iter().find(|entry| &entry.task_type == task_type).map_or_else(|| AgentId::new("developer"), |entry| entry.primary.clone());

    let classification = classify(request, project_root, glob_cache, complexity_tables, task_type_tables, primary_agent_for)?;

    let entry = routing_matrix.iter().find(|entry| entry.task_type == classification.task_type);

    let mut chain: Vec<AgentId> = Vec::new();
    push_unique(&mut chain, classification.primary_agent.clone());
    let mut reviewers = Vec::new();
    let mut signoffs = Vec::new();
    let workflow;

    if let Some(entry) = entry {
        workflow = entry.workflow.clone();
        for agent in &entry.supporting {
            push_unique(&mut chain, agent.clone());
        }
        for trigger in cross_cutting_triggers {
            if trigger_fires(trigger, &request.description, classification.complexity) {
                push_unique(&mut chain, trigger.agent.clone());
            }
        }
        if !skips_role(entry, "review") {
            for agent in &entry.review {
                push_unique(&mut chain, agent.clone());
                reviewers.push(agent.clone());
            }
        }
        for agent in &entry.approval {
            push_unique(&mut chain, agent.clone());
            signoffs.push(agent.clone());
        }
    } else {
        workflow = "standard-change".to_string();
    }

    let security_enforcement = scan_security(&request.description, security_categories);
    if security_enforcement.blocking {
        push_unique(&mut chain, AgentId::new("security-architect"));
        for agent in &security_enforcement.required_agents {
            push_unique(&mut chain, agent.clone());
        }
    }

    let pattern_suggestion = pattern_store.suggest(&classification.task_type)?;

    Ok(RoutingResult {
        classification: ClassificationResultView::from(&classification),
        full_chain: chain,
        workflow,
        reviewers,
        signoffs,
        blocked: security_enforcement.blocking,
        security_enforcement,
        pattern_suggestion,
    })
}

/// Appends `agent` to `chain` unless already present, preserving first
/// occurrence order (spec §4.5 step 6).
fn push_unique(chain: &mut Vec<AgentId>, agent: AgentId) {
    if !chain.contains(&agent) {
        chain.push(agent);
    }
}

/// Reports whether `entry` skips `role` for its task type
/// (spec §4.5 step 6, e.g. trivial tasks skipping review).
fn skips_role(entry: &RoutingMatrixEntry, role: &str) -> bool {
    entry.skip_roles.iter().any(|skip| skip.as_str() == role)
}

/// Reports whether a cross-cutting trigger fires for this task
/// (spec §4.5 step 3).
fn trigger_fires(trigger: &CrossCuttingTrigger, description: &str, complexity: taskgate_config::ComplexityLevel) -> bool {
    let lowercase = description.to_lowercase();
    let keyword_matches = trigger.keywords.iter().any(|keyword| lowercase.contains(&keyword.to_lowercase()));
    keyword_matches && trigger.trigger_level.is_compatible_with(complexity)
}

/// Runs the security-enforcement scan (spec §4.5 step 5): the highest
/// priority matching category (lowest `priority` value) determines blocking
/// and sign-off requirements.
fn scan_security(description: &str, categories: &[SecurityCategory]) -> SecurityEnforcement {
    let lowercase = description.to_lowercase();
    let mut matched: Vec<&SecurityCategory> = categories.iter().filter(|category| category.keywords.iter().any(|keyword| lowercase.contains(&keyword.to_lowercase()))).collect();
    if matched.is_empty() {
        return SecurityEnforcement::none();
    }
    matched.sort_by_key(|category| category.priority);

    let blocking = matched.iter().any(|category| category.blocking);
    let require_signoff = matched.iter().any(|category| category.require_signoff);
    let mut required_agents = Vec::new();
    for category in &matched {
        for agent in &category.required_agents {
            if !required_agents.contains(agent) {
                required_agents.push(agent.clone());
            }
        }
    }

    SecurityEnforcement { priority: if blocking { "critical".to_string() } else { matched[0].name.clone() }, blocking, require_signoff, categories: matched.iter().map(|category| category.name.clone()).collect(), required_agents }
}
