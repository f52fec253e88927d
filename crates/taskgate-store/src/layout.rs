// crates/taskgate-store/src/layout.rs
// ============================================================================
// Module: Run Store Filesystem Layout
// Description: Path helpers for the on-disk run directory (spec §6.1).
// Purpose: Centralise every path the Run Store touches so the directory
//          layout only needs to change in one place.
// Dependencies: std, taskgate-core
// ============================================================================

//! ## Overview
//! `<root>/runs/<run_id>/` holds `run.json`, `artifact-registry.json`,
//! `project-db.json`, and the `artifacts/`, `plans/`, `reasoning/`, `gates/`
//! subdirectories, plus `run.json.lock` while a writer holds the lock.

use std::path::Path;
use std::path::PathBuf;

use taskgate_core::RunId;

/// Path helpers scoped to a single run directory.
#[derive(Debug, Clone)]
pub struct RunLayout {
    /// The run's own directory: `<root>/runs/<run_id>`.
    dir: PathBuf,
}

impl RunLayout {
    /// Builds the layout for `run_id` rooted at `runs_root`.
    #[must_use]
    pub fn new(runs_root: &Path, run_id: &RunId) -> Self {
        Self { dir: runs_root.join(run_id.as_str()) }
    }

    /// The run's own directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `run.json`.
    #[must_use]
    pub fn run_file(&self) -> PathBuf {
        self.dir.join("run.json")
    }

    /// `artifact-registry.json`.
    #[must_use]
    pub fn registry_file(&self) -> PathBuf {
        self.dir.join("artifact-registry.json")
    }

    /// `project-db.json`.
    #[must_use]
    pub fn project_db_file(&self) -> PathBuf {
        self.dir.join("project-db.json")
    }

    /// `run.json.lock`.
    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.dir.join("run.json.lock")
    }

    /// `artifacts/`.
    #[must_use]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.dir.join("artifacts")
    }

    /// `plans/`.
    #[must_use]
    pub fn plans_dir(&self) -> PathBuf {
        self.dir.join("plans")
    }

    /// `reasoning/`.
    #[must_use]
    pub fn reasoning_dir(&self) -> PathBuf {
        self.dir.join("reasoning")
    }

    /// `gates/`.
    #[must_use]
    pub fn gates_dir(&self) -> PathBuf {
        self.dir.join("gates")
    }

    /// The subdirectories created by `CreateRun`, in creation order.
    #[must_use]
    pub fn subdirectories(&self) -> [PathBuf; 4] {
        [self.artifacts_dir(), self.plans_dir(), self.reasoning_dir(), self.gates_dir()]
    }
}
