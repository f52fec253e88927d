// crates/taskgate-core/src/gate.rs
// ============================================================================
// Module: Taskgate Gate and Reasoning Records
// Description: The per-step observable side-records under `gates/` and
//              `reasoning/` (spec §3.4).
// Purpose: Give the Stepper a type to write and external observers a type to
//          read, without feeding back into the Stepper's own decisions.
// Dependencies: serde, crate::identifiers, crate::time
// ============================================================================

//! ## Overview
//! Gate and reasoning records are write-only from the Stepper's perspective:
//! spec §3.4 is explicit that they are "observable outputs, never inputs to
//! the Stepper itself." Nothing in this workspace reads a [`GateDecision`]
//! back to make a routing or stepping decision.

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AgentId;
use crate::time::Timestamp;

/// Whether a gate allowed the step to proceed, and why (spec §3.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    /// `"pass"` or `"fail"`, kept as a string to match the persisted schema.
    pub status: String,
    /// Agent that produced the decision.
    pub agent: AgentId,
    /// Whether the step was allowed to proceed.
    pub allowed: bool,
    /// Reasons the step was blocked, if any.
    #[serde(default)]
    pub blockers: Vec<String>,
    /// Non-blocking concerns surfaced alongside the decision.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// When the decision was recorded.
    pub recorded_at: Timestamp,
}

impl GateDecision {
    /// Builds a passing gate decision with no blockers.
    #[must_use]
    pub fn pass(agent: AgentId, warnings: Vec<String>) -> Self {
        Self {
            status: "pass".to_string(),
            agent,
            allowed: true,
            blockers: Vec::new(),
            warnings,
            recorded_at: Timestamp::now(),
        }
    }

    /// Builds a failing gate decision carrying the given blockers.
    #[must_use]
    pub fn fail(agent: AgentId, blockers: Vec<String>) -> Self {
        Self {
            status: "fail".to_string(),
            agent,
            allowed: false,
            blockers,
            warnings: Vec::new(),
            recorded_at: Timestamp::now(),
        }
    }
}

/// Free-form reasoning text attached to a step (spec §3.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningRecord {
    /// Agent that authored the reasoning.
    pub agent: AgentId,
    /// The reasoning text itself, in whatever form the agent produced it.
    pub text: String,
    /// When the reasoning was recorded.
    pub recorded_at: Timestamp,
}

impl ReasoningRecord {
    /// Builds a new reasoning record stamped with the current time.
    #[must_use]
    pub fn new(agent: AgentId, text: String) -> Self {
        Self { agent, text, recorded_at: Timestamp::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::GateDecision;
    use crate::identifiers::AgentId;

    #[test]
    fn pass_decision_has_no_blockers() {
        let decision = GateDecision::pass(AgentId::new("reviewer"), vec!["minor nit".to_string()]);
        assert!(decision.allowed);
        assert!(decision.blockers.is_empty());
        assert_eq!(decision.warnings.len(), 1);
    }

    #[test]
    fn fail_decision_carries_blockers_and_no_warnings() {
        let decision = GateDecision::fail(AgentId::new("security-architect"), vec!["unsafe block".to_string()]);
        assert!(!decision.allowed);
        assert_eq!(decision.blockers.len(), 1);
        assert!(decision.warnings.is_empty());
    }
}
