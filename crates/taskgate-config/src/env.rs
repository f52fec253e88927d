// crates/taskgate-config/src/env.rs
// ============================================================================
// Module: Environment Surface
// Description: The subset of process environment variables the condition
//              evaluator exposes under its `env.*` surface (spec §4.3, §6.4).
// Purpose: Keep environment access in one place, behind a typed snapshot,
//          instead of scattering `std::env::var` calls through the workflow
//          stepper and condition evaluator.
// Dependencies: std, serde
// ============================================================================

//! ## Overview
//! [`EnvSurface`] captures the three variables spec §6.4 names explicitly
//! (`MULTI_AI_ENABLED`, `CI`, `NODE_ENV`) plus a generic passthrough map, so
//! a condition like `env.CI == 'true'` resolves against a snapshot taken
//! once per evaluation rather than live process state.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::env;

use serde::Deserialize;
use serde::Serialize;

/// A snapshot of the environment-variable surface available to conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvSurface {
    /// Whether multi-agent-AI mode is enabled (`MULTI_AI_ENABLED`).
    pub multi_ai_enabled: bool,
    /// Whether the process is running under continuous integration (`CI`).
    pub ci: bool,
    /// The declared Node-style environment name (`NODE_ENV`), if set.
    pub node_env: Option<String>,
    /// Every other environment variable, for generic `env.<NAME>` lookups.
    pub other: BTreeMap<String, String>,
}

impl EnvSurface {
    /// Flattens this snapshot into the plain string map the condition
    /// evaluator's `env.*` surface expects (spec §4.3).
    ///
    /// Typed fields are re-serialised as `"true"`/`"false"` so
    /// `env.CI == 'true'` resolves the same way whether `CI` came in
    /// through its typed field or the passthrough map would have carried
    /// it. `other` entries are copied verbatim.
    #[must_use]
    pub fn to_condition_map(&self) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = self.other.iter().map(|(key, value)| (key.clone(), value.clone())).collect();
        map.insert("MULTI_AI_ENABLED".to_string(), self.multi_ai_enabled.to_string());
        map.insert("CI".to_string(), self.ci.to_string());
        if let Some(node_env) = &self.node_env {
            map.insert("NODE_ENV".to_string(), node_env.clone());
        }
        map
    }
}

/// Names consumed into the typed fields rather than the `other` passthrough.
const TYPED_VARS: [&str; 3] = ["MULTI_AI_ENABLED", "CI", "NODE_ENV"];

/// Reads `MULTI_AI_ENABLED`/`CI`/`NODE_ENV` plus every other process
/// environment variable into an [`EnvSurface`] snapshot.
#[must_use]
pub fn collect_env_map() -> EnvSurface {
    let mut surface = EnvSurface {
        multi_ai_enabled: truthy(env::var("MULTI_AI_ENABLED").ok().as_deref()),
        ci: truthy(env::var("CI").ok().as_deref()),
        node_env: env::var("NODE_ENV").ok(),
        other: BTreeMap::new(),
    };
    for (key, value) in env::vars() {
        if !TYPED_VARS.contains(&key.as_str()) {
            surface.other.insert(key, value);
        }
    }
    surface
}

/// Parses a shell-style boolean environment value (`1`, `true`, `yes`, case
/// insensitively) and otherwise treats it as false, including when unset.
fn truthy(value: Option<&str>) -> bool {
    matches!(value.map(str::trim).map(str::to_lowercase).as_deref(), Some("1" | "true" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::EnvSurface;
    use super::truthy;

    #[test]
    fn truthy_accepts_common_spellings() {
        assert!(truthy(Some("1")));
        assert!(truthy(Some("true")));
        assert!(truthy(Some("TRUE")));
        assert!(truthy(Some("yes")));
    }

    #[test]
    fn truthy_rejects_everything_else() {
        assert!(!truthy(Some("0")));
        assert!(!truthy(Some("false")));
        assert!(!truthy(Some("")));
        assert!(!truthy(None));
    }

    #[test]
    fn condition_map_carries_typed_and_passthrough_vars() {
        let mut surface = EnvSurface { multi_ai_enabled: true, ci: false, node_env: Some("production".to_string()), other: super::BTreeMap::new() };
        surface.other.insert("CUSTOM_FLAG".to_string(), "enabled".to_string());

        let map = surface.to_condition_map();
        assert_eq!(map.get("MULTI_AI_ENABLED").map(String::as_str), Some("true"));
        assert_eq!(map.get("CI").map(String::as_str), Some("false"));
        assert_eq!(map.get("NODE_ENV").map(String::as_str), Some("production"));
        assert_eq!(map.get("CUSTOM_FLAG").map(String::as_str), Some("enabled"));
    }
}
