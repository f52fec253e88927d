// crates/taskgate-store/src/project_db.rs
// ============================================================================
// Module: Derived Project Database
// Description: A read-optimised projection of the run record + artifact
//              registry, persisted at `project-db.json` (spec §3.3).
// Purpose: Give external observers (CLI, dashboards) a single flattened
//          document without ever becoming a second source of truth.
// Dependencies: serde, serde_json, taskgate-core
// ============================================================================

//! ## Overview
//! [`ProjectDatabase`] is never written by anything except
//! [`crate::store::RunStore`]'s own internal sync routine, triggered whenever
//! an update changes the run record's `updated_at` (spec §9, the teacher's
//! deprecated `updateProjectDatabase` path is resolved here by making the
//! derivation the *only* writer; see DESIGN.md). `derived_from_run_updated_at`
//! plus `content_hash` let a caller detect staleness without re-deriving.

use serde::Deserialize;
use serde::Serialize;
use taskgate_core::RunRecord;
use taskgate_core::RunStatus;
use taskgate_core::Timestamp;
use taskgate_core::hashing::hash_canonical_json;

use crate::registry::RegistryDocument;

/// A read-optimised, strictly derived projection of one run (spec §3.3).
///
/// # Invariants
/// - Re-derived whenever `run.json`'s `updated_at` changes; never hand-edited.
/// - `content_hash` is the canonical-JSON SHA-256 of `{run, artifact_count,
///   artifact_names}`, so two derivations of the same state hash identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDatabase {
    /// The run's identifier, duplicated here for convenient filtering.
    pub run_id: String,
    /// The run's current lifecycle status.
    pub status: RunStatus,
    /// The run's current step.
    pub current_step: u32,
    /// Total artifacts registered for this run.
    pub artifact_count: usize,
    /// Names of every registered artifact, in registry order.
    pub artifact_names: Vec<String>,
    /// The `run.json` `updated_at` this projection was derived from.
    pub derived_from_run_updated_at: Timestamp,
    /// Canonical-JSON SHA-256 hash of the derived content, for staleness checks.
    pub content_hash: String,
}

impl ProjectDatabase {
    /// Derives a fresh projection from a run record and its artifact registry.
    ///
    /// # Errors
    /// Returns a description of the failure if canonical hashing fails (only
    /// possible if the inputs contain a non-canonicalizable float such as NaN).
    pub fn derive(run: &RunRecord, registry: &RegistryDocument) -> Result<Self, String> {
        let artifact_names: Vec<String> = registry.keys().cloned().collect();
        #[derive(Serialize)]
        struct Fingerprint<'a> {
            run_id: &'a str,
            status: RunStatus,
            current_step: u32,
            artifact_names: &'a [String],
        }
        let fingerprint = Fingerprint { run_id: run.run_id.as_str(), status: run.status, current_step: run.current_step.get(), artifact_names: &artifact_names };
        let content_hash = hash_canonical_json(&fingerprint).map_err(|err| err.to_string())?;

        Ok(Self {
            run_id: run.run_id.as_str().to_string(),
            status: run.status,
            current_step: run.current_step.get(),
            artifact_count: registry.len(),
            artifact_names,
            derived_from_run_updated_at: run.updated_at,
            content_hash,
        })
    }

    /// Reports whether this projection is stale relative to `run`'s current
    /// `updated_at`.
    #[must_use]
    pub fn is_stale_against(&self, run: &RunRecord) -> bool {
        self.derived_from_run_updated_at != run.updated_at
    }
}

#[cfg(test)]
mod tests {
    use taskgate_core::RunId;
    use taskgate_core::RunRecord;

    use super::ProjectDatabase;
    use crate::registry::RegistryDocument;

    #[test]
    fn derivation_matches_run_updated_at() {
        let run = RunRecord::new(RunId::parse("run-1").expect("valid"), "wf".to_string(), "wf-v1".to_string());
        let registry = RegistryDocument::new();
        let db = ProjectDatabase::derive(&run, &registry).expect("derives");
        assert!(!db.is_stale_against(&run));
    }

    #[test]
    fn touching_run_updated_at_makes_prior_projection_stale() {
        let mut run = RunRecord::new(RunId::parse("run-1").expect("valid"), "wf".to_string(), "wf-v1".to_string());
        let registry = RegistryDocument::new();
        let db = ProjectDatabase::derive(&run, &registry).expect("derives");

        run.updated_at = taskgate_core::Timestamp::from_unix_millis(run.updated_at.unix_millis() + 1_000).expect("valid millis");
        assert!(db.is_stale_against(&run));
    }
}
