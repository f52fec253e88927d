// crates/taskgate-health/src/pressure.rs
// ============================================================================
// Module: Memory Pressure Response
// Description: Pure classification of a resident-size sample against a
//              configured ceiling (spec §5, "Memory pressure response").
// Purpose: Keep the threshold logic callable and testable without touching
//          the OS; the caller owns sampling cadence and acting on the signal.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Spec §5 samples resident size every 10 seconds, logs `high` at 75% of a
//! configured ceiling, and triggers cache eviction at 85%. It never kills
//! in-flight runs; [`MemoryPressureSignal::Evict`] only tells the caller
//! which in-process caches (artifact registry, pattern-learner aggregates)
//! to drop, never to abort a run.

/// The 75% threshold at which spec §5 calls for a `high` log signal.
pub const HIGH_WATERMARK_FRACTION: f64 = 0.75;
/// The 85% threshold at which spec §5 calls for cache eviction.
pub const EVICT_WATERMARK_FRACTION: f64 = 0.85;

/// The response a resident-size sample calls for (spec §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPressureSignal {
    /// Below the high watermark; no action.
    Normal,
    /// At or above 75% of ceiling, below 85%: log a `high` signal.
    High,
    /// At or above 85% of ceiling: evict in-process caches.
    Evict,
}

/// Classifies a resident-size sample against `ceiling_bytes` (spec §5).
///
/// A `ceiling_bytes` of zero is treated as "no ceiling configured" and
/// always resolves to [`MemoryPressureSignal::Normal`]; this mirrors the
/// Run Store's own fail-open stance on absent configuration rather than
/// dividing by zero.
#[must_use]
pub fn classify(resident_bytes: u64, ceiling_bytes: u64) -> MemoryPressureSignal {
    if ceiling_bytes == 0 {
        return MemoryPressureSignal::Normal;
    }
    #[allow(clippy::cast_precision_loss, reason = "byte counts compared as a ratio; precision loss at this magnitude never crosses a watermark boundary")]
    let fraction = resident_bytes as f64 / ceiling_bytes as f64;
    if fraction >= EVICT_WATERMARK_FRACTION {
        MemoryPressureSignal::Evict
    } else if fraction >= HIGH_WATERMARK_FRACTION {
        MemoryPressureSignal::High
    } else {
        MemoryPressureSignal::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryPressureSignal;
    use super::classify;

    #[test]
    fn below_high_watermark_is_normal() {
        assert_eq!(classify(700, 1_000), MemoryPressureSignal::Normal);
    }

    #[test]
    fn at_high_watermark_logs_high() {
        assert_eq!(classify(750, 1_000), MemoryPressureSignal::High);
        assert_eq!(classify(840, 1_000), MemoryPressureSignal::High);
    }

    #[test]
    fn at_evict_watermark_triggers_eviction() {
        assert_eq!(classify(850, 1_000), MemoryPressureSignal::Evict);
        assert_eq!(classify(1_000, 1_000), MemoryPressureSignal::Evict);
    }

    #[test]
    fn unconfigured_ceiling_never_signals() {
        assert_eq!(classify(u64::MAX, 0), MemoryPressureSignal::Normal);
    }
}
