// crates/taskgate-core/src/error.rs
// ============================================================================
// Module: Core Error Taxonomy
// Description: The ten error kinds shared across every orchestrator crate.
// Purpose: Give callers a single stable enum to match on regardless of which
//          crate raised the failure.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every fallible boundary in the workspace returns (or converts into)
//! [`CoreError`]. Recovery semantics are documented per variant; see
//! spec §7 for the authoritative table.

use std::fmt;

/// Stable error taxonomy shared by the whole orchestrator.
///
/// # Invariants
/// - Variants are never renamed; new failure modes extend the enum rather
///   than repurpose an existing variant.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Caller supplied a malformed or out-of-bounds argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Requested entity does not exist on disk.
    #[error("not found: {0}")]
    NotFound(String),
    /// Persisted document exists but failed to parse or is missing required fields.
    #[error("corrupt state: {0}")]
    Corrupt(String),
    /// A per-run lock could not be acquired before its deadline.
    #[error("lock timeout after {waited_ms}ms acquiring lock for {run_id}")]
    LockTimeout {
        /// Run the lock was held for.
        run_id: String,
        /// Milliseconds waited before giving up.
        waited_ms: u64,
    },
    /// A state machine transition was attempted that the model forbids.
    #[error("illegal state transition: {0}")]
    IllegalStateTransition(String),
    /// No executor adapter reported itself available.
    #[error("no executor available")]
    NoExecutorAvailable,
    /// The executor adapter ran but reported failure.
    #[error("executor failure: {0}")]
    ExecutorFailure(String),
    /// A registered artifact failed schema validation.
    #[error("schema validation failed: {0}")]
    SchemaValidationFailure(String),
    /// The router determined the request must be blocked pending security review.
    #[error("blocked pending review: {0}")]
    Blocked(String),
    /// The condition evaluator could not parse or evaluate an expression.
    ///
    /// Callers must treat this as fail-open (see spec §4.3 / §9): the
    /// condition is taken to be `true` and a warning is attached, not
    /// propagated as a hard failure.
    #[error("condition evaluation error: {0}")]
    ConditionEvalError(String),
}

impl CoreError {
    /// Returns the stable kind label used in CLI `--json` output and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Corrupt(_) => "corrupt",
            Self::LockTimeout { .. } => "lock_timeout",
            Self::IllegalStateTransition(_) => "illegal_state_transition",
            Self::NoExecutorAvailable => "no_executor_available",
            Self::ExecutorFailure(_) => "executor_failure",
            Self::SchemaValidationFailure(_) => "schema_validation_failure",
            Self::Blocked(_) => "blocked",
            Self::ConditionEvalError(_) => "condition_eval_error",
        }
    }
}

impl fmt::Display for ExitSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Logical => write!(f, "logical"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Maps a [`CoreError`] to the CLI exit-code bucket from spec §6.3.
///
/// # Invariants
/// - `Success` is never returned by this function; it only classifies errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSeverity {
    /// Exit code 0 (not produced by this classifier; listed for completeness).
    Success,
    /// Exit code 1: logical failure (e.g. a stalled run, a blocked route).
    Logical,
    /// Exit code 2: fatal error (missing input, corrupt state).
    Fatal,
}

impl CoreError {
    /// Classifies the error into the CLI's three-bucket exit-code scheme.
    #[must_use]
    pub const fn exit_severity(&self) -> ExitSeverity {
        match self {
            Self::Blocked(_) | Self::IllegalStateTransition(_) | Self::ExecutorFailure(_) => {
                ExitSeverity::Logical
            }
            Self::InvalidArgument(_)
            | Self::NotFound(_)
            | Self::Corrupt(_)
            | Self::LockTimeout { .. }
            | Self::NoExecutorAvailable
            | Self::SchemaValidationFailure(_)
            | Self::ConditionEvalError(_) => ExitSeverity::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CoreError;
    use super::ExitSeverity;

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(CoreError::NoExecutorAvailable.kind(), "no_executor_available");
        assert_eq!(CoreError::Blocked("x".to_string()).kind(), "blocked");
    }

    #[test]
    fn blocked_is_logical_not_fatal() {
        assert_eq!(CoreError::Blocked("x".to_string()).exit_severity(), ExitSeverity::Logical);
        assert_eq!(CoreError::NotFound("x".to_string()).exit_severity(), ExitSeverity::Fatal);
    }

    #[test]
    fn lock_timeout_message_includes_run_id() {
        let err = CoreError::LockTimeout {
            run_id: "run-1".to_string(),
            waited_ms: 5_000,
        };
        assert!(err.to_string().contains("run-1"));
        assert_eq!(err.exit_severity(), ExitSeverity::Fatal);
    }
}
