// crates/taskgate-core/src/session.rs
// ============================================================================
// Module: Taskgate Session State
// Description: Per-orchestrator-session compliance counters and optional cost
//              accounting (spec §2 row 11).
// Purpose: Give the Stepper a place to accumulate cross-run counters for a
//          single orchestrator session without conflating them with any one
//          run's record.
// Dependencies: serde, crate::time
// ============================================================================

//! ## Overview
//! The source material the distilled specification was drawn from carries
//! two variants of session state, one with cost tracking and one without
//! (spec §9, Open Question). [`SessionState`] keeps cost accounting as an
//! optional field rather than a second type, so a session that never sees
//! API-sourced token usage pays nothing for the field beyond `None`.

use serde::Deserialize;
use serde::Serialize;

use crate::time::Timestamp;

/// Aggregate token cost accounting for a session (optional half of
/// [`SessionState`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAccounting {
    /// Total tokens reported as used across every step executed this session.
    pub tokens_used: u64,
    /// Sum of each step's reported `token_usage.limit`, where known.
    pub tokens_limit: u64,
    /// Count of steps whose usage came from `source == "estimate"` or
    /// `"heuristic"` rather than `"api"` or `"session"`.
    pub estimated_steps: u32,
}

impl CostAccounting {
    /// Folds one step's token usage into the running totals.
    pub fn record(&mut self, used: u64, limit: u64, is_estimated: bool) {
        self.tokens_used = self.tokens_used.saturating_add(used);
        self.tokens_limit = self.tokens_limit.saturating_add(limit);
        if is_estimated {
            self.estimated_steps = self.estimated_steps.saturating_add(1);
        }
    }
}

/// Per-session compliance and (optionally) cost state.
///
/// # Invariants
/// - `tasks_blocked <= tasks_seen`; a blocked task is always also a seen task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Opaque session identifier, matching `owners.orchestrator_session_id`.
    pub session_id: String,
    /// Total tasks the session has dispatched across every run it touched.
    pub tasks_seen: u64,
    /// Tasks blocked by a security or gate decision.
    pub tasks_blocked: u64,
    /// Gates that passed across the session.
    pub gates_passed: u64,
    /// Gates that failed across the session.
    pub gates_failed: u64,
    /// Cost accounting, present only for sessions that track it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostAccounting>,
    /// When the session state was first created.
    pub created_at: Timestamp,
    /// When the session state was last mutated.
    pub updated_at: Timestamp,
}

impl SessionState {
    /// Creates a fresh session state with cost tracking disabled.
    #[must_use]
    pub fn new(session_id: String) -> Self {
        let now = Timestamp::now();
        Self { session_id, tasks_seen: 0, tasks_blocked: 0, gates_passed: 0, gates_failed: 0, cost: None, created_at: now, updated_at: now }
    }

    /// Enables cost accounting for this session, starting from zero.
    pub fn enable_cost_tracking(&mut self) {
        self.cost.get_or_insert_with(CostAccounting::default);
    }

    /// Records one gate outcome against the session's compliance counters.
    pub fn record_gate(&mut self, allowed: bool) {
        if allowed {
            self.gates_passed = self.gates_passed.saturating_add(1);
        } else {
            self.gates_failed = self.gates_failed.saturating_add(1);
        }
    }

    /// Records one task dispatch, optionally flagged as blocked.
    pub fn record_task(&mut self, blocked: bool) {
        self.tasks_seen = self.tasks_seen.saturating_add(1);
        if blocked {
            self.tasks_blocked = self.tasks_blocked.saturating_add(1);
        }
    }
}
