// crates/taskgate-core/src/identifiers.rs
// ============================================================================
// Module: Taskgate Identifiers
// Description: Canonical opaque identifiers for runs, agents, artifacts, and
//              task types.
// Purpose: Provide strongly typed, serializable identifiers with stable wire
//          forms and centralize the run_id generation/validation rules.
// Dependencies: serde, rand
// ============================================================================

//! ## Overview
//! Identifiers are newtypes over `String`/`u64` so that, for example, a
//! [`RunId`] can never be passed where an [`AgentId`] is expected. Run
//! identifiers additionally enforce the filename-safety rule from spec §6.2.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Maximum length, in bytes, of a `run_id` (spec §6.2).
pub const MAX_RUN_ID_LENGTH: usize = 128;

/// Run identifier: opaque, collision-resistant, filename-safe.
///
/// # Invariants
/// - Non-empty, `<= 128` bytes, and every byte is `[A-Za-z0-9-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Validates and wraps a caller-supplied run id.
    ///
    /// # Errors
    /// Returns a description of the violation when the id is empty, too
    /// long, or contains a byte outside `[A-Za-z0-9-]`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err("run_id must not be empty".to_string());
        }
        if raw.len() > MAX_RUN_ID_LENGTH {
            return Err(format!("run_id exceeds {MAX_RUN_ID_LENGTH} bytes"));
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err("run_id must contain only [A-Za-z0-9-]".to_string());
        }
        Ok(Self(raw))
    }

    /// Generates a fresh random run id, optionally prefixed, retrying on the
    /// astronomically unlikely event of a caller-observed collision.
    ///
    /// # Errors
    /// Returns an error if every retry within `max_attempts` collides
    /// according to `exists`.
    pub fn generate(
        prefix: Option<&str>,
        max_attempts: u32,
        mut exists: impl FnMut(&str) -> bool,
    ) -> Result<Self, String> {
        for _ in 0 .. max_attempts.max(1) {
            let uuid = random_uuid_v4();
            let candidate = match prefix {
                Some(p) if !p.is_empty() => format!("{p}-{uuid}"),
                _ => uuid,
            };
            let Ok(run_id) = Self::parse(&candidate) else {
                continue;
            };
            if !exists(run_id.as_str()) {
                return Ok(run_id);
            }
        }
        Err("exhausted run_id generation attempts without finding a free id".to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Renders a random UUID v4 using only the `rand` crate (the teacher's stack
/// has no `uuid` dependency; see DESIGN.md).
fn random_uuid_v4() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0],
        bytes[1],
        bytes[2],
        bytes[3],
        bytes[4],
        bytes[5],
        bytes[6],
        bytes[7],
        bytes[8],
        bytes[9],
        bytes[10],
        bytes[11],
        bytes[12],
        bytes[13],
        bytes[14],
        bytes[15]
    )
}

/// Identifier for an agent role (`developer`, `architect`, `security-architect`, ...).
///
/// # Invariants
/// - Opaque, non-empty string; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates a new agent identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Coarse task-type classification (`UI_UX`, `DATABASE`, `SECURITY`, ...).
///
/// # Invariants
/// - Opaque, non-empty, upper-snake-case by convention (not enforced).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    /// Creates a new task type identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Artifact identifier, optional and distinct from the unique artifact name.
///
/// # Invariants
/// - Opaque, non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Creates a new artifact identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Zero-based index of a step within a workflow's step sequence.
///
/// # Invariants
/// - Non-negative; monotonically non-decreasing within a run (enforced by
///   the stepper, not by this type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepIndex(u32);

impl StepIndex {
    /// The initial step index.
    pub const ZERO: Self = Self(0);

    /// Creates a step index from a raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the next step index.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw index value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::RunId;
    use super::StepIndex;

    #[test]
    fn run_id_rejects_shell_metacharacters() {
        assert!(RunId::parse("../etc/passwd").is_err());
        assert!(RunId::parse("run;rm -rf").is_err());
        assert!(RunId::parse("").is_err());
    }

    #[test]
    fn run_id_accepts_alphanumerics_and_hyphens() {
        assert!(RunId::parse("feature-123-ABC").is_ok());
    }

    #[test]
    fn run_id_generate_retries_on_collision() {
        let mut calls = 0;
        let mut seen_once = false;
        let id = RunId::generate(Some("wf"), 8, |_candidate| {
            calls += 1;
            if seen_once {
                false
            } else {
                seen_once = true;
                true
            }
        })
        .expect("should find a free id within the attempt budget");
        assert!(id.as_str().starts_with("wf-"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn step_index_advances_monotonically() {
        let a = StepIndex::ZERO;
        let b = a.next();
        assert!(b > a);
        assert_eq!(b.get(), 1);
    }
}
