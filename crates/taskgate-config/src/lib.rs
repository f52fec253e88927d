// crates/taskgate-config/src/lib.rs
// ============================================================================
// Module: Taskgate Config
// Description: Canonical configuration model, environment surface, and the
//              data-driven classifier/routing tables shared by every other
//              crate (spec §6.4, §9 "classifier and router use dynamic regex
//              tables").
// Purpose: Keep every tunable threshold, path, and keyword table declarative
//          and centrally loaded, so the classifier and router stay pure
//          functions over data rather than hard-coded logic.
// Dependencies: serde, toml, thiserror, taskgate-core
// ============================================================================

//! ## Overview
//!
//! Grounded on `decision-gate-config`'s strict, fail-closed TOML loader:
//! bounds on every numeric and path field, a `CONFIG_ENV_VAR`-style override,
//! and a size ceiling on the file itself. This crate carries the same
//! discipline for a much smaller surface: [`runtime::OrchestratorConfig`]
//! (paths, timeouts, cache TTLs) and the static keyword/pattern tables in
//! [`classifier_tables`] and [`router_tables`] that `taskgate-classifier` and
//! `taskgate-router` compile and score against.

pub mod classifier_tables;
pub mod env;
pub mod router_tables;
pub mod runtime;

pub use classifier_tables::ComplexityLevel;
pub use classifier_tables::ComplexityTable;
pub use classifier_tables::GateSet;
pub use classifier_tables::KeywordWeight;
pub use classifier_tables::RegexWeight;
pub use classifier_tables::SECURITY_KEYWORDS;
pub use classifier_tables::TaskTypeTable;
pub use classifier_tables::default_complexity_tables;
pub use classifier_tables::default_task_type_tables;
pub use classifier_tables::gates_for;
pub use env::EnvSurface;
pub use env::collect_env_map;
pub use router_tables::CrossCuttingTrigger;
pub use router_tables::RoutingMatrixEntry;
pub use router_tables::SecurityCategory;
pub use router_tables::TriggerLevel;
pub use router_tables::default_cross_cutting_triggers;
pub use router_tables::default_routing_matrix;
pub use router_tables::default_security_categories;
pub use runtime::ConfigError;
pub use runtime::OrchestratorConfig;
