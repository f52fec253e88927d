// crates/taskgate-core/src/time.rs
// ============================================================================
// Module: Taskgate Time Model
// Description: Canonical timestamp representation for run records and logs.
// Purpose: Give every persisted document a single RFC 3339 timestamp type
//          with total ordering, so invariants like `updated_at >= created_at`
//          (spec §3.1) are plain comparisons.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! `Timestamp` wraps [`time::OffsetDateTime`] and serializes as an RFC 3339
//! string, matching the JSON documents described in spec §6.5. Callers obtain
//! the current time via [`Timestamp::now`]; nothing else in the workspace
//! reads the wall clock directly, which keeps the Run Store, Stepper, and
//! Health Monitor trivially testable against fixed clocks.

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// A point in time, serialized as an RFC 3339 string.
///
/// # Invariants
/// - Total order matches wall-clock order; values round-trip exactly through
///   RFC 3339 serialization at millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Builds a timestamp from unix milliseconds.
    ///
    /// # Errors
    /// Returns an error string if `millis` is out of the representable range.
    pub fn from_unix_millis(millis: i64) -> Result<Self, String> {
        let nanos = i128::from(millis) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map(Self)
            .map_err(|err| format!("timestamp out of range: {err}"))
    }

    /// Returns unix milliseconds.
    #[must_use]
    pub fn unix_millis(&self) -> i64 {
        i64::try_from(self.0.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
    }

    /// Parses a timestamp from an RFC 3339 string.
    ///
    /// # Errors
    /// Returns an error string if the input is not valid RFC 3339.
    pub fn parse(raw: &str) -> Result<Self, String> {
        OffsetDateTime::parse(raw, &Rfc3339).map(Self).map_err(|err| err.to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.format(&Rfc3339) {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => f.write_str("<unrepresentable timestamp>"),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rendered = self.0.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&rendered)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;

    #[test]
    fn round_trips_through_millis() {
        let original = Timestamp::now();
        let rebuilt = Timestamp::from_unix_millis(original.unix_millis())
            .expect("millis derived from now() are always in range");
        assert_eq!(original.unix_millis(), rebuilt.unix_millis());
    }

    #[test]
    fn round_trips_through_rfc3339() {
        let original = Timestamp::from_unix_millis(1_700_000_000_000).expect("valid millis");
        let rendered = original.to_string();
        let parsed = Timestamp::parse(&rendered).expect("rendered timestamp reparses");
        assert_eq!(original, parsed);
    }

    #[test]
    fn ordering_matches_millis() {
        let earlier = Timestamp::from_unix_millis(1_000).expect("valid millis");
        let later = Timestamp::from_unix_millis(2_000).expect("valid millis");
        assert!(earlier < later);
    }
}
