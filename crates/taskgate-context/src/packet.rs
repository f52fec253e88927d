// crates/taskgate-context/src/packet.rs
// ============================================================================
// Module: Context Packet
// Description: The optional, further-restricted `{goal, constraints[],
//              references[], definitionOfDone}` view (spec §4.6).
// Purpose: Let a caller hand an executor a minimal packet instead of the
//          full system prompt, when only goal/constraints/DoD are needed.
// Dependencies: serde, taskgate-core
// ============================================================================

//! ## Overview
//! `goal` and `definition_of_done` are mandatory; building a packet without
//! either is a hard [`CoreError::InvalidArgument`] (spec §4.6).

use serde::Deserialize;
use serde::Serialize;
use taskgate_core::CoreError;

/// A minimal context view restricted to goal, constraints, references, and
/// the definition of done (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPacket {
    /// What the agent is being asked to accomplish. Mandatory.
    pub goal: String,
    /// Constraint strings carried over from resolved injections.
    pub constraints: Vec<String>,
    /// Reference artifact paths or identifiers.
    pub references: Vec<String>,
    /// The condition under which the task is considered complete. Mandatory.
    pub definition_of_done: String,
}

impl ContextPacket {
    /// Builds a packet, validating that `goal` and `definition_of_done` are
    /// both non-empty.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidArgument`] if either mandatory field is
    /// empty.
    pub fn new(goal: impl Into<String>, constraints: Vec<String>, references: Vec<String>, definition_of_done: impl Into<String>) -> Result<Self, CoreError> {
        let goal = goal.into();
        let definition_of_done = definition_of_done.into();
        if goal.trim().is_empty() {
            return Err(CoreError::InvalidArgument("context packet requires a non-empty goal".to_string()));
        }
        if definition_of_done.trim().is_empty() {
            return Err(CoreError::InvalidArgument("context packet requires a non-empty definition of done".to_string()));
        }
        Ok(Self { goal, constraints, references, definition_of_done })
    }
}
