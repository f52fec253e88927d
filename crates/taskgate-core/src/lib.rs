// crates/taskgate-core/src/lib.rs
// ============================================================================
// Module: Taskgate Core
// Description: Shared domain model for the Taskgate workflow orchestrator.
// Purpose: Provide identifiers, timestamps, hashing, the run record, the
//          artifact registry record, and the error taxonomy used by every
//          other crate in the workspace.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, time, rand
// ============================================================================

//! ## Overview
//!
//! `taskgate-core` is the leaf crate of the orchestrator: it defines the
//! persistent entities described by the data model (run records, artifact
//! registries, gate/reasoning records, iteration and pattern state) and the
//! single error taxonomy (`error::CoreError`) that every other crate
//! converts into at its public boundary. It does not perform any I/O itself.

pub mod artifact;
pub mod error;
pub mod gate;
pub mod hashing;
pub mod identifiers;
pub mod iteration;
pub mod pattern;
pub mod run;
pub mod session;
pub mod time;

pub use artifact::ArtifactRecord;
pub use artifact::IdempotencyPolicy;
pub use artifact::PublishAttempt;
pub use artifact::PublishStatus;
pub use artifact::ValidationStatus;
pub use error::CoreError;
pub use error::ExitSeverity;
pub use gate::GateDecision;
pub use gate::ReasoningRecord;
pub use identifiers::AgentId;
pub use identifiers::ArtifactId;
pub use identifiers::RunId;
pub use identifiers::StepIndex;
pub use identifiers::TaskType;
pub use iteration::ComponentRating;
pub use iteration::IterationState;
pub use iteration::IterationStatus;
pub use pattern::ExecutionOutcome;
pub use pattern::PatternExecution;
pub use pattern::TaskPatternLog;
pub use run::Owners;
pub use run::RunRecord;
pub use run::RunStatus;
pub use run::TaskQueueEntry;
pub use run::TaskStatus;
pub use run::Timestamps;
pub use session::SessionState;
pub use time::Timestamp;
