// crates/taskgate-classifier/src/lib.rs
// ============================================================================
// Module: Taskgate Classifier
// Description: Deterministic task classification: complexity, task type,
//              primary agent, and approval gates (spec §4.4).
// Purpose: Give the Agent Router and CLI a single entry point for turning a
//          task description into a structured classification.
// Dependencies: regex, serde, taskgate-config, taskgate-core
// ============================================================================

//! ## Overview
//! See [`classify::classify`] for the algorithm. [`glob`] resolves file
//! patterns against a project root with a TTL cache; [`sanitize`] enforces
//! the input bounds and safety checks spec §4.4 step 1 requires before any
//! scoring runs.

pub mod classify;
pub mod glob;
pub mod sanitize;

pub use classify::ClassificationRequest;
pub use classify::ClassificationResult;
pub use classify::classify;
pub use glob::DEFAULT_GLOB_CACHE_TTL;
pub use glob::GlobCache;
pub use glob::GlobResolution;
pub use glob::MAX_RESOLVED_FILES;
