// crates/taskgate-condition/src/context.rs
// ============================================================================
// Module: Condition Evaluation Context
// Description: The typed surfaces a condition expression can reference.
// Purpose: Give the evaluator read-only views of `config`, `step.output`,
//          `env`, `artifacts`, and `providers` without coupling it to any
//          particular crate's concrete types (spec §4.3).
// Dependencies: serde_json
// ============================================================================

use std::collections::HashMap;

use serde_json::Value;

/// Read-only view over the surfaces a condition expression may reference.
///
/// # Invariants
/// - None of the fields are mutated by evaluation; `evaluate` only reads.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Resolved workflow/orchestrator configuration.
    pub config: &'a Value,
    /// The current step's recorded output.
    pub step_output: &'a Value,
    /// Process environment variables, keyed by name as-is (not uppercased).
    pub env: &'a HashMap<String, String>,
    /// The run's artifact metadata, addressable by dotted path.
    pub artifacts: &'a Value,
    /// Provider/agent names available for this step, for `providers.includes(...)`.
    pub providers: &'a [String],
}

impl EvalContext<'_> {
    /// Looks up `key` for the bare-identifier truthy-lookup fallback chain:
    /// `config.*`, then `artifacts.*`, then `env.UPPERCASE`, then `None`.
    pub(crate) fn bare_lookup(&self, key: &str) -> Option<Value> {
        lookup_path(self.config, &[key])
            .or_else(|| lookup_path(self.artifacts, &[key]))
            .or_else(|| self.env.get(&key.to_ascii_uppercase()).map(|value| Value::String(value.clone())))
    }
}

/// Walks `value` through a sequence of object keys, returning a clone of
/// whatever is found, or `None` if any segment is missing.
pub(crate) fn lookup_path(value: &Value, segments: &[&str]) -> Option<Value> {
    let mut current = value;
    for segment in segments {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current.clone())
}
