// crates/taskgate-core/src/iteration.rs
// ============================================================================
// Module: Taskgate Iteration State
// Description: Per-workflow-id self-healing loop state (spec §3.5).
// Purpose: Track component ratings against a target and the fix history that
//          drove each iteration, so the Stepper can decide whether another
//          iteration is warranted.
// Dependencies: serde, crate::time
// ============================================================================

//! ## Overview
//! [`IterationState`] is keyed externally by `workflow_id`; this module only
//! carries the record shape and the completion predicate from spec §3.5
//! ("Completion: all ratings ≥ target_rating").

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::time::Timestamp;

/// Status of an iteration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    /// Still iterating; not all components meet the target rating.
    InProgress,
    /// Every component rating met or exceeded `target_rating`.
    Complete,
    /// Abandoned without reaching completion (e.g. iteration budget exhausted).
    Abandoned,
}

/// A single component's latest rating (spec §3.5, `component_ratings`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentRating {
    /// Score on whatever scale the workflow's rating rubric defines.
    pub score: f64,
}

/// Per-workflow-id iteration state (spec §3.5).
///
/// # Invariants
/// - `status == Complete` implies every entry in `component_ratings` has
///   `score >= target_rating`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationState {
    /// Workflow id this iteration state tracks.
    pub workflow_id: String,
    /// Number of iterations performed so far.
    pub iteration_count: u32,
    /// Minimum score every component must reach for completion.
    pub target_rating: f64,
    /// Current status of the loop.
    pub status: IterationStatus,
    /// Latest rating per named component.
    #[serde(default)]
    pub component_ratings: BTreeMap<String, ComponentRating>,
    /// Ordered history of fixes applied across iterations.
    #[serde(default)]
    pub fix_history: Vec<String>,
    /// Free-form description of how the loop concluded, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_status: Option<String>,
    /// When the state was first created.
    pub created_at: Timestamp,
    /// When the state was last mutated.
    pub updated_at: Timestamp,
}

impl IterationState {
    /// Creates a fresh iteration state with no ratings recorded yet.
    #[must_use]
    pub fn new(workflow_id: String, target_rating: f64) -> Self {
        let now = Timestamp::now();
        Self {
            workflow_id,
            iteration_count: 0,
            target_rating,
            status: IterationStatus::InProgress,
            component_ratings: BTreeMap::new(),
            fix_history: Vec::new(),
            completion_status: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reports whether every recorded component rating meets `target_rating`.
    ///
    /// An empty `component_ratings` map is not considered complete: there is
    /// nothing yet to confirm against the target.
    #[must_use]
    pub fn all_ratings_meet_target(&self) -> bool {
        !self.component_ratings.is_empty()
            && self.component_ratings.values().all(|rating| rating.score >= self.target_rating)
    }
}

#[cfg(test)]
mod tests {
    use super::ComponentRating;
    use super::IterationState;

    #[test]
    fn empty_ratings_are_not_complete() {
        let state = IterationState::new("wf-impl".to_string(), 8.0);
        assert!(!state.all_ratings_meet_target());
    }

    #[test]
    fn completion_requires_every_component_to_meet_target() {
        let mut state = IterationState::new("wf-impl".to_string(), 8.0);
        state.component_ratings.insert("tests".to_string(), ComponentRating { score: 9.0 });
        state.component_ratings.insert("docs".to_string(), ComponentRating { score: 7.5 });
        assert!(!state.all_ratings_meet_target());

        state.component_ratings.insert("docs".to_string(), ComponentRating { score: 8.0 });
        assert!(state.all_ratings_meet_target());
    }
}
