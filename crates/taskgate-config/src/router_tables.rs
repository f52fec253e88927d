// crates/taskgate-config/src/router_tables.rs
// ============================================================================
// Module: Router Tables
// Description: Static routing matrix, cross-cutting trigger map, and
//              security-enforcement category tables the Agent Router scores
//              against (spec §4.5).
// Purpose: Keep routing policy declarative data the router interprets,
//          rather than branching logic hard-coding agent names.
// Dependencies: serde, taskgate-core
// ============================================================================

//! ## Overview
//! Grounded on the same table-of-constants discipline as
//! [`crate::classifier_tables`]. [`RoutingMatrixEntry`] is the base chain per
//! task type; [`CrossCuttingTrigger`] layers specialists on top regardless of
//! task type; [`SecurityCategory`] drives the blocking security-enforcement
//! scan described in spec §4.5 step 5.

use serde::Deserialize;
use serde::Serialize;
use taskgate_core::AgentId;
use taskgate_core::TaskType;

use crate::classifier_tables::ComplexityLevel;

/// A task-type's base execution chain and workflow identity (spec §4.5 step 2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingMatrixEntry {
    /// The task type this entry routes.
    pub task_type: TaskType,
    /// The agent primarily responsible for execution.
    pub primary: AgentId,
    /// Agents who support the primary without gating completion.
    pub supporting: Vec<AgentId>,
    /// Agents who review the primary's output.
    pub review: Vec<AgentId>,
    /// Agents whose approval is required before the chain completes.
    pub approval: Vec<AgentId>,
    /// The workflow identifier this task type runs under.
    pub workflow: String,
    /// Roles this task type may skip even when otherwise present in the
    /// chain (e.g. trivial tasks skipping review, spec §4.5 step 6).
    pub skip_roles: Vec<AgentId>,
}

/// The complexity floor a [`CrossCuttingTrigger`] requires to fire
/// (spec §4.5 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerLevel {
    /// Fires unconditionally, regardless of classified complexity.
    Always,
    /// Fires only when complexity is exactly critical.
    Critical,
    /// Fires for tasks the router additionally flags as UI-facing.
    UiTasks,
    /// Fires when complexity is moderate or higher.
    ModeratePlus,
    /// Fires when complexity is complex or higher.
    ComplexPlus,
}

impl TriggerLevel {
    /// Reports whether this trigger level is compatible with `complexity`
    /// (spec §4.5 step 3's compatibility rule).
    #[must_use]
    pub fn is_compatible_with(self, complexity: ComplexityLevel) -> bool {
        match self {
            Self::Always => true,
            Self::Critical => complexity == ComplexityLevel::Critical,
            Self::UiTasks => true,
            Self::ModeratePlus => complexity >= ComplexityLevel::Moderate,
            Self::ComplexPlus => complexity >= ComplexityLevel::Complex,
        }
    }
}

/// A specialist agent injected into the chain when its keywords match,
/// independent of the primary task type (spec §4.5 step 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossCuttingTrigger {
    /// The agent this trigger injects when it fires.
    pub agent: AgentId,
    /// Keywords that must appear (case-insensitively) in the task description.
    pub keywords: Vec<String>,
    /// The complexity floor required for this trigger to fire.
    pub trigger_level: TriggerLevel,
}

/// A security-enforcement scan outcome category (spec §4.5 step 5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCategory {
    /// The category name (e.g. `credential-handling`, `access-control`).
    pub name: String,
    /// Keywords that trigger this category.
    pub keywords: Vec<String>,
    /// Relative priority; higher-priority categories' `blocking`/`require_signoff`
    /// settings take precedence when more than one category matches.
    pub priority: u32,
    /// Whether a match blocks the routing result outright.
    pub blocking: bool,
    /// Whether a match requires a sign-off even if not blocking.
    pub require_signoff: bool,
    /// Agents this category requires present in the execution chain.
    pub required_agents: Vec<AgentId>,
}

/// Builds the default routing matrix, one entry per default task type.
#[must_use]
pub fn default_routing_matrix() -> Vec<RoutingMatrixEntry> {
    vec![
        RoutingMatrixEntry {
            task_type: TaskType::new("SECURITY"),
            primary: AgentId::new("security-architect"),
            supporting: vec![AgentId::new("developer")],
            review: vec![AgentId::new("security-reviewer")],
            approval: vec![AgentId::new("security-lead")],
            workflow: "security-change".to_string(),
            skip_roles: vec![],
        },
        RoutingMatrixEntry {
            task_type: TaskType::new("DATABASE"),
            primary: AgentId::new("database-engineer"),
            supporting: vec![AgentId::new("developer")],
            review: vec![AgentId::new("architect")],
            approval: vec![],
            workflow: "standard-change".to_string(),
            skip_roles: vec![],
        },
        RoutingMatrixEntry {
            task_type: TaskType::new("UI_UX"),
            primary: AgentId::new("frontend-developer"),
            supporting: vec![AgentId::new("designer")],
            review: vec![AgentId::new("ux-reviewer")],
            approval: vec![],
            workflow: "standard-change".to_string(),
            skip_roles: vec![],
        },
        RoutingMatrixEntry {
            task_type: TaskType::new("API"),
            primary: AgentId::new("backend-developer"),
            supporting: vec![],
            review: vec![AgentId::new("architect")],
            approval: vec![],
            workflow: "standard-change".to_string(),
            skip_roles: vec![],
        },
        RoutingMatrixEntry {
            task_type: TaskType::new("INFRASTRUCTURE"),
            primary: AgentId::new("platform-engineer"),
            supporting: vec![AgentId::new("developer")],
            review: vec![AgentId::new("architect")],
            approval: vec![AgentId::new("platform-lead")],
            workflow: "infrastructure-change".to_string(),
            skip_roles: vec![],
        },
        RoutingMatrixEntry {
            task_type: TaskType::new("DOCUMENTATION"),
            primary: AgentId::new("technical-writer"),
            supporting: vec![],
            review: vec![],
            approval: vec![],
            workflow: "standard-change".to_string(),
            skip_roles: vec![AgentId::new("review")],
        },
        RoutingMatrixEntry {
            task_type: TaskType::new("GENERAL"),
            primary: AgentId::new("developer"),
            supporting: vec![],
            review: vec![AgentId::new("peer-reviewer")],
            approval: vec![],
            workflow: "standard-change".to_string(),
            skip_roles: vec![],
        },
    ]
}

/// Builds the default cross-cutting trigger map (spec §4.5 step 3).
#[must_use]
pub fn default_cross_cutting_triggers() -> Vec<CrossCuttingTrigger> {
    vec![
        CrossCuttingTrigger { agent: AgentId::new("security-architect"), keywords: vec!["auth".to_string(), "password".to_string(), "credential".to_string(), "token".to_string(), "encryption".to_string()], trigger_level: TriggerLevel::Always },
        CrossCuttingTrigger { agent: AgentId::new("accessibility-reviewer"), keywords: vec!["ui".to_string(), "component".to_string(), "screen".to_string()], trigger_level: TriggerLevel::UiTasks },
        CrossCuttingTrigger { agent: AgentId::new("performance-engineer"), keywords: vec!["performance".to_string(), "latency".to_string(), "throughput".to_string()], trigger_level: TriggerLevel::ModeratePlus },
        CrossCuttingTrigger { agent: AgentId::new("compliance-officer"), keywords: vec!["gdpr".to_string(), "compliance".to_string(), "regulated".to_string()], trigger_level: TriggerLevel::ComplexPlus },
        CrossCuttingTrigger { agent: AgentId::new("incident-commander"), keywords: vec!["production incident".to_string(), "outage".to_string()], trigger_level: TriggerLevel::Critical },
    ]
}

/// Builds the default security-enforcement category table (spec §4.5 step 5).
#[must_use]
pub fn default_security_categories() -> Vec<SecurityCategory> {
    vec![
        SecurityCategory {
            name: "credential-handling".to_string(),
            keywords: vec!["password".to_string(), "credential".to_string(), "secret".to_string(), "token".to_string()],
            priority: 0,
            blocking: false,
            require_signoff: true,
            required_agents: vec![AgentId::new("security-architect")],
        },
        SecurityCategory {
            name: "access-control".to_string(),
            keywords: vec!["permission".to_string(), "access control".to_string(), "authorization".to_string()],
            priority: 1,
            blocking: false,
            require_signoff: true,
            required_agents: vec![AgentId::new("security-architect")],
        },
        SecurityCategory {
            name: "cryptography".to_string(),
            keywords: vec!["encryption".to_string(), "jwt".to_string(), "oauth".to_string()],
            priority: 2,
            blocking: true,
            require_signoff: true,
            required_agents: vec![AgentId::new("security-architect"), AgentId::new("security-reviewer")],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::ComplexityLevel;
    use super::TriggerLevel;
    use super::default_cross_cutting_triggers;
    use super::default_routing_matrix;
    use super::default_security_categories;

    #[test]
    fn always_and_critical_behave_as_documented() {
        assert!(TriggerLevel::Always.is_compatible_with(ComplexityLevel::Trivial));
        assert!(!TriggerLevel::Critical.is_compatible_with(ComplexityLevel::Complex));
        assert!(TriggerLevel::Critical.is_compatible_with(ComplexityLevel::Critical));
    }

    #[test]
    fn moderate_plus_and_complex_plus_are_floors() {
        assert!(!TriggerLevel::ModeratePlus.is_compatible_with(ComplexityLevel::Simple));
        assert!(TriggerLevel::ModeratePlus.is_compatible_with(ComplexityLevel::Moderate));
        assert!(!TriggerLevel::ComplexPlus.is_compatible_with(ComplexityLevel::Moderate));
        assert!(TriggerLevel::ComplexPlus.is_compatible_with(ComplexityLevel::Complex));
    }

    #[test]
    fn default_tables_are_non_empty() {
        assert!(!default_routing_matrix().is_empty());
        assert!(!default_cross_cutting_triggers().is_empty());
        assert!(!default_security_categories().is_empty());
    }

    #[test]
    fn cryptography_category_is_blocking_and_requires_two_agents() {
        let categories = default_security_categories();
        let crypto = categories.iter().find(|category| category.name == "cryptography").expect("present");
        assert!(crypto.blocking);
        assert_eq!(crypto.required_agents.len(), 2);
    }
}
