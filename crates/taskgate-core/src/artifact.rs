// crates/taskgate-core/src/artifact.rs
// ============================================================================
// Module: Taskgate Artifact Registry Record
// Description: Per-artifact record persisted in a run's `artifact-registry.json`.
// Purpose: Model spec §3.2 exactly, including the publishing sub-record and
//          the idempotency policy consulted by the Indexed Artifact Registry.
// Dependencies: serde, serde_json, crate::identifiers, crate::time
// ============================================================================

//! ## Overview
//! One [`ArtifactRecord`] exists per artifact name within a run. The registry
//! itself (`name -> ArtifactRecord`) lives in `taskgate-store`; this module
//! only carries the record shape, since `taskgate-core` performs no I/O.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::AgentId;
use crate::identifiers::ArtifactId;
use crate::identifiers::StepIndex;
use crate::time::Timestamp;

/// Validation outcome recorded against an artifact (spec §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Not yet validated.
    Pending,
    /// Validated successfully against `schema`, if any.
    Pass,
    /// Failed validation.
    Fail,
}

/// Outcome of a single publish attempt (spec §3.2, `publish_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// No attempt has completed yet.
    Pending,
    /// The artifact was published successfully.
    Success,
    /// The most recent attempt failed.
    Failed,
}

/// A single recorded publish attempt (spec §3.2, `publish_attempts[]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishAttempt {
    /// Target the attempt was made against.
    pub target: String,
    /// Outcome of this specific attempt.
    pub status: PublishStatus,
    /// When the attempt was made.
    pub attempted_at: Timestamp,
    /// Error detail, if `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How a second write to an existing artifact name is resolved (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdempotencyPolicy {
    /// Replace the existing record in place; `version` is not incremented.
    Overwrite,
    /// Keep the existing record and write the new one under an incremented
    /// `version`.
    Version,
    /// Leave the existing record untouched and discard the new write.
    Skip,
}

/// One artifact's full record within a run (spec §3.2).
///
/// # Invariants
/// - `name` is unique within the owning run's registry.
/// - `published == true` implies `validation_status == Pass`.
/// - `version` only increases, and only when written under
///   [`IdempotencyPolicy::Version`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Name, unique within the run.
    pub name: String,
    /// Optional stable identifier, distinct from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ArtifactId>,
    /// Step that produced this artifact.
    pub step: StepIndex,
    /// Agent that produced this artifact.
    pub agent: AgentId,
    /// Filesystem path of the artifact contents, relative to the run root.
    pub path: String,
    /// Monotonically increasing version number, starting at 1.
    pub version: u32,
    /// Names of artifacts this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Current validation outcome.
    pub validation_status: ValidationStatus,
    /// Optional schema identifier used for validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Free-form metadata; `metadata.type` is the conventional artifact kind.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Whether this artifact is a candidate for publishing at all.
    pub publishable: bool,
    /// Whether this artifact has been published successfully.
    pub published: bool,
    /// When `published` last became `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    /// Configured publish destinations.
    #[serde(default)]
    pub publish_targets: Vec<String>,
    /// History of publish attempts, oldest first.
    #[serde(default)]
    pub publish_attempts: Vec<PublishAttempt>,
    /// Status of the most recent publish attempt.
    pub publish_status: PublishStatus,
    /// Error detail for the most recent failed publish attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_error: Option<String>,
    /// When the record was first created.
    pub created_at: Timestamp,
    /// When the record was last mutated.
    pub updated_at: Timestamp,
}

impl ArtifactRecord {
    /// Creates a new, unpublished, unvalidated artifact record at version 1.
    #[must_use]
    pub fn new(name: String, step: StepIndex, agent: AgentId, path: String) -> Self {
        let now = Timestamp::now();
        Self {
            name,
            id: None,
            step,
            agent,
            path,
            version: 1,
            dependencies: Vec::new(),
            validation_status: ValidationStatus::Pending,
            schema: None,
            metadata: BTreeMap::new(),
            publishable: false,
            published: false,
            published_at: None,
            publish_targets: Vec::new(),
            publish_attempts: Vec::new(),
            publish_status: PublishStatus::Pending,
            publish_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reports whether the record is in a self-consistent published state.
    #[must_use]
    pub fn publish_invariant_holds(&self) -> bool {
        !self.published || self.validation_status == ValidationStatus::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::ArtifactRecord;
    use super::ValidationStatus;
    use crate::identifiers::AgentId;
    use crate::identifiers::StepIndex;

    fn sample() -> ArtifactRecord {
        ArtifactRecord::new(
            "design-doc".to_string(),
            StepIndex::ZERO,
            AgentId::new("architect"),
            "artifacts/design-doc.md".to_string(),
        )
    }

    #[test]
    fn new_artifact_starts_at_version_one_unpublished() {
        let artifact = sample();
        assert_eq!(artifact.version, 1);
        assert!(!artifact.published);
        assert!(artifact.publish_invariant_holds());
    }

    #[test]
    fn published_without_passing_validation_violates_invariant() {
        let mut artifact = sample();
        artifact.published = true;
        assert!(!artifact.publish_invariant_holds());
        artifact.validation_status = ValidationStatus::Pass;
        assert!(artifact.publish_invariant_holds());
    }
}
