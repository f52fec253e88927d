// crates/taskgate-health/src/lib.rs
// ============================================================================
// Module: Taskgate Health
// Description: Health / Monitor: stall detection, aggregate routing/success
//              metrics, composite health score, and memory pressure response
//              (spec §4.10, §5).
// Purpose: The one read-only vantage point over every run and pattern log,
//          consumed by `taskgate-cli`'s `monitor` subcommand.
// Dependencies: serde, taskgate-config, taskgate-core, taskgate-learner,
//               taskgate-store
// ============================================================================

//! ## Overview
//! This crate never writes to a run or pattern log; it only reads what
//! [`taskgate_store::RunStore`] and [`taskgate_learner::PatternStore`] have
//! already persisted. [`monitor::HealthMonitor`] is the entry point;
//! [`metrics::compute`] and [`pressure::classify`] are pure functions callers
//! can exercise directly.

pub mod metrics;
pub mod monitor;
pub mod pressure;
pub mod stall;

pub use metrics::AggregateMetrics;
pub use metrics::HealthStatus;
pub use metrics::TASK_TYPE_METADATA_KEY;
pub use monitor::HealthMonitor;
pub use monitor::RunStatusView;
pub use pressure::EVICT_WATERMARK_FRACTION;
pub use pressure::HIGH_WATERMARK_FRACTION;
pub use pressure::MemoryPressureSignal;
pub use pressure::classify as classify_memory_pressure;
pub use stall::DEFAULT_STALL_THRESHOLD_SECS;
pub use stall::is_stalled;
