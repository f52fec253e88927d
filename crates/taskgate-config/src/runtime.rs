// crates/taskgate-config/src/runtime.rs
// ============================================================================
// Module: Orchestrator Runtime Configuration
// Description: The TOML-backed configuration document controlling paths,
//              timeouts, and cache TTLs across the workspace.
// Purpose: Give every crate a single, strictly validated, fail-closed source
//          of truth for the tunables spec §4.1/§4.3/§4.4/§5/§6.4 leave as
//          defaults.
// Dependencies: serde, toml, thiserror, std
// ============================================================================

//! ## Overview
//! Grounded on `decision-gate-config`'s `DecisionGateConfig` loader: bounds
//! are enforced on every field at load time (`validate`), and a missing or
//! malformed file is a hard, fail-closed error rather than a silently
//! defaulted value. The two override environment variables
//! (`TASKGATE_RUNS_ROOT`, `TASKGATE_PATTERNS_ROOT`) implement spec §6.4's
//! "Runtime root and runs-dir paths are configurable via path-resolver
//! variables."

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Maximum accepted configuration file size, in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Environment variable overriding the runs directory.
pub const RUNS_ROOT_ENV_VAR: &str = "TASKGATE_RUNS_ROOT";
/// Environment variable overriding the pattern-registry directory.
pub const PATTERNS_ROOT_ENV_VAR: &str = "TASKGATE_PATTERNS_ROOT";

/// Errors raised while loading or validating [`OrchestratorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file exceeded [`MAX_CONFIG_FILE_SIZE`].
    #[error("config file {path} exceeds the {MAX_CONFIG_FILE_SIZE}-byte limit")]
    TooLarge {
        /// Path of the oversized file.
        path: PathBuf,
    },
    /// The configuration file failed to parse as TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// A parsed field violated its documented bound.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root, fail-closed configuration document for the orchestrator (spec §6.4).
///
/// # Invariants
/// - Every duration/size field is validated to a documented, non-zero,
///   bounded range by [`OrchestratorConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Root directory under which `runs/<run_id>/` directories are created.
    pub runs_root: PathBuf,
    /// Directory holding the append-only pattern registry documents.
    pub patterns_root: PathBuf,
    /// Deadline, in milliseconds, for acquiring a per-run lock (spec §4.1).
    pub lock_acquire_deadline_ms: u64,
    /// Age, in milliseconds, after which a held lock is reclaimable (spec §4.1).
    pub lock_stale_ttl_ms: u64,
    /// TTL, in milliseconds, of the in-process artifact registry cache (spec §4.1).
    pub registry_cache_ttl_ms: u64,
    /// TTL, in seconds, of the classifier's glob resolution cache (spec §4.4).
    pub glob_cache_ttl_secs: u64,
    /// Maximum number of files a single glob resolution may expand to (spec §4.4).
    pub glob_max_files: usize,
    /// Threshold, in seconds, past which a non-terminal run is stalled (spec §4.10).
    pub stall_threshold_secs: u64,
    /// Default deadline, in seconds, for an executor invocation (spec §5).
    pub executor_deadline_secs: u64,
    /// Configured resident-memory ceiling, in bytes, for the pressure monitor (spec §5).
    pub memory_ceiling_bytes: u64,
    /// Maximum accepted length of a task description string (spec §4.4).
    pub max_task_description_len: usize,
    /// Maximum accepted number of file patterns per classification (spec §4.4).
    pub max_file_patterns: usize,
    /// Maximum accepted length of a single file pattern (spec §4.4).
    pub max_file_pattern_len: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            runs_root: PathBuf::from("runs"),
            patterns_root: PathBuf::from("patterns"),
            lock_acquire_deadline_ms: 5_000,
            lock_stale_ttl_ms: 30_000,
            registry_cache_ttl_ms: 5_000,
            glob_cache_ttl_secs: 30,
            glob_max_files: 1_000,
            stall_threshold_secs: 300,
            executor_deadline_secs: 300,
            memory_ceiling_bytes: 2 * 1024 * 1024 * 1024,
            max_task_description_len: 10_000,
            max_file_patterns: 50,
            max_file_pattern_len: 500,
        }
    }
}

impl OrchestratorConfig {
    /// Loads and validates configuration from `path`, applying any override
    /// environment variables from spec §6.4 afterward.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read, exceeds the size
    /// ceiling, fails to parse, or fails validation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let metadata = fs::metadata(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge { path: path.to_path_buf() });
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies the default configuration, then any override environment
    /// variables and validation, without reading a file from disk.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if an override produces an
    /// out-of-bounds value.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Overlays `TASKGATE_RUNS_ROOT` / `TASKGATE_PATTERNS_ROOT`, if set, onto
    /// the loaded document (spec §6.4).
    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var(RUNS_ROOT_ENV_VAR) {
            if !value.is_empty() {
                self.runs_root = PathBuf::from(value);
            }
        }
        if let Ok(value) = env::var(PATTERNS_ROOT_ENV_VAR) {
            if !value.is_empty() {
                self.patterns_root = PathBuf::from(value);
            }
        }
    }

    /// Validates every bounded field, failing closed on the first violation.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first field found out
    /// of bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runs_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("runs_root must not be empty".to_string()));
        }
        if self.patterns_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("patterns_root must not be empty".to_string()));
        }
        if self.lock_acquire_deadline_ms == 0 {
            return Err(ConfigError::Invalid("lock_acquire_deadline_ms must be positive".to_string()));
        }
        if self.lock_stale_ttl_ms < self.lock_acquire_deadline_ms {
            return Err(ConfigError::Invalid("lock_stale_ttl_ms must be at least lock_acquire_deadline_ms".to_string()));
        }
        if self.registry_cache_ttl_ms == 0 {
            return Err(ConfigError::Invalid("registry_cache_ttl_ms must be positive".to_string()));
        }
        if self.glob_max_files == 0 {
            return Err(ConfigError::Invalid("glob_max_files must be positive".to_string()));
        }
        if self.stall_threshold_secs == 0 {
            return Err(ConfigError::Invalid("stall_threshold_secs must be positive".to_string()));
        }
        if self.executor_deadline_secs == 0 {
            return Err(ConfigError::Invalid("executor_deadline_secs must be positive".to_string()));
        }
        if self.memory_ceiling_bytes == 0 {
            return Err(ConfigError::Invalid("memory_ceiling_bytes must be positive".to_string()));
        }
        if self.max_task_description_len == 0 || self.max_task_description_len > 1_000_000 {
            return Err(ConfigError::Invalid("max_task_description_len must be in 1..=1_000_000".to_string()));
        }
        if self.max_file_patterns == 0 || self.max_file_patterns > 10_000 {
            return Err(ConfigError::Invalid("max_file_patterns must be in 1..=10_000".to_string()));
        }
        if self.max_file_pattern_len == 0 || self.max_file_pattern_len > 10_000 {
            return Err(ConfigError::Invalid("max_file_pattern_len must be in 1..=10_000".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::OrchestratorConfig;

    #[test]
    fn defaults_validate_cleanly() {
        assert!(OrchestratorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_lock_deadline_is_rejected() {
        let mut config = OrchestratorConfig::default();
        config.lock_acquire_deadline_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn stale_ttl_below_acquire_deadline_is_rejected() {
        let mut config = OrchestratorConfig::default();
        config.lock_stale_ttl_ms = 1;
        config.lock_acquire_deadline_ms = 5_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_a_minimal_toml_document() {
        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(file, "runs_root = \"/tmp/runs\"").expect("write");
        let config = OrchestratorConfig::load_from_file(file.path()).expect("loads");
        assert_eq!(config.runs_root, std::path::PathBuf::from("/tmp/runs"));
        assert_eq!(config.stall_threshold_secs, 300);
    }

    #[test]
    fn oversized_file_is_rejected() {
        let mut file = NamedTempFile::new().expect("tempfile");
        let oversized = "x".repeat(2 * 1024 * 1024);
        writeln!(file, "# {oversized}").expect("write");
        let err = OrchestratorConfig::load_from_file(file.path()).expect_err("too large");
        assert!(matches!(err, super::ConfigError::TooLarge { .. }));
    }
}
