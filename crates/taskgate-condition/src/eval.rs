// crates/taskgate-condition/src/eval.rs
// ============================================================================
// Module: Condition Evaluator
// Description: Evaluates a parsed condition tree against an `EvalContext`.
// Purpose: Implement the comparison and truthy-lookup semantics from spec
//          §4.3, including fail-open-on-parse-error and fail-closed-on-
//          unresolved-variable behaviour.
// Dependencies: serde_json, crate::ast, crate::context, crate::parser
// ============================================================================

//! ## Overview
//! `evaluate` never propagates a parse failure to the caller: spec §4.3 asks
//! for liveness over strictness ("any tokenisation or parsing exception
//! results in `true` ... with a logged warning"). Warnings are returned as
//! data on [`EvalOutcome`] rather than logged directly, matching this
//! workspace's no-logging-crate discipline (see `taskgate-core`).

use serde_json::Value;

use crate::ast::Atom;
use crate::ast::CmpOp;
use crate::ast::Expr;
use crate::ast::Literal;
use crate::context::EvalContext;
use crate::context::lookup_path;
use crate::parser::parse;

/// Result of evaluating a condition string.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    /// The boolean result of the condition.
    pub result: bool,
    /// Non-fatal warnings surfaced during evaluation (unrecognised atoms,
    /// parse failures that were failed open).
    pub warnings: Vec<String>,
}

/// Evaluates `input` against `ctx`.
///
/// A condition that fails to tokenize or parse is treated as satisfied
/// (`result: true`) to preserve workflow liveness, with a warning describing
/// why. A condition that parses but references an unresolved or unrecognised
/// variable fails closed (`false` for that atom) instead.
#[must_use]
pub fn evaluate(input: &str, ctx: &EvalContext<'_>) -> EvalOutcome {
    match parse(input) {
        Ok(expr) => {
            let mut warnings = Vec::new();
            let result = eval_expr(&expr, ctx, &mut warnings);
            EvalOutcome { result, warnings }
        }
        Err(err) => EvalOutcome { result: true, warnings: vec![format!("condition {input:?} failed to parse ({err}); failing open")] },
    }
}

fn eval_expr(expr: &Expr, ctx: &EvalContext<'_>, warnings: &mut Vec<String>) -> bool {
    match expr {
        Expr::And(parts) => parts.iter().all(|part| eval_expr(part, ctx, warnings)),
        Expr::Or(parts) => parts.iter().any(|part| eval_expr(part, ctx, warnings)),
        Expr::Not(inner) => !eval_expr(inner, ctx, warnings),
        Expr::Leaf(atom) => eval_atom(atom, ctx, warnings),
    }
}

fn eval_atom(atom: &Atom, ctx: &EvalContext<'_>, warnings: &mut Vec<String>) -> bool {
    match atom {
        Atom::Bool(value) => *value,
        Atom::Truthy(path) => eval_truthy(path, ctx, warnings),
        Atom::Compare { path, op, literal } => eval_compare(path, *op, literal, ctx, warnings),
    }
}

/// Outcome of resolving a named path against the context surfaces.
enum Resolution {
    /// The namespace was recognised but the path is absent; fails closed
    /// silently per the "undefined" rule.
    Missing,
    /// The namespace itself was not recognised; fails closed with a warning.
    Unrecognised,
    /// The path resolved to a concrete value.
    Found(Value),
}

fn eval_truthy(path: &str, ctx: &EvalContext<'_>, warnings: &mut Vec<String>) -> bool {
    if let Some(call) = parse_includes_call(path) {
        return ctx.providers.iter().any(|provider| provider == call);
    }
    if path.contains('(') {
        warnings.push(format!("unrecognised function call `{path}`; failing closed"));
        return false;
    }

    match resolve_named_path(path, ctx) {
        Resolution::Found(value) => is_truthy(&value),
        Resolution::Missing => false,
        Resolution::Unrecognised => {
            warnings.push(format!("unrecognised atom `{path}`; failing closed"));
            false
        }
    }
}

fn eval_compare(path: &str, op: CmpOp, literal: &Literal, ctx: &EvalContext<'_>, warnings: &mut Vec<String>) -> bool {
    match resolve_named_path(path, ctx) {
        Resolution::Found(value) => compare(&value, op, literal),
        Resolution::Missing => false,
        Resolution::Unrecognised => {
            warnings.push(format!("unrecognised atom `{path}`; failing closed"));
            false
        }
    }
}

/// Parses `path` as a `providers.includes('name')` call, returning the
/// argument string if it matches; this is the only recognised atomic
/// function call in the DSL (spec §4.3).
fn parse_includes_call(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("providers.includes(")?;
    let rest = rest.strip_suffix(')')?;
    let trimmed = rest.trim();
    trimmed.strip_prefix('\'').and_then(|value| value.strip_suffix('\'')).or_else(|| trimmed.strip_prefix('"').and_then(|value| value.strip_suffix('"')))
}

fn resolve_named_path(path: &str, ctx: &EvalContext<'_>) -> Resolution {
    let segments: Vec<&str> = path.split('.').collect();

    if segments.len() == 1 {
        return match ctx.bare_lookup(segments[0]) {
            Some(value) => Resolution::Found(value),
            None => Resolution::Missing,
        };
    }

    match segments[0] {
        "config" => lookup_or_missing(ctx.config, &segments[1 ..]),
        "step" if segments.get(1) == Some(&"output") => lookup_or_missing(ctx.step_output, &segments[2 ..]),
        "artifacts" => lookup_or_missing(ctx.artifacts, &segments[1 ..]),
        "env" => {
            let name = segments[1 ..].join(".");
            ctx.env.get(&name).map_or(Resolution::Missing, |value| Resolution::Found(Value::String(value.clone())))
        }
        _ => Resolution::Unrecognised,
    }
}

fn lookup_or_missing(root: &Value, segments: &[&str]) -> Resolution {
    if segments.is_empty() {
        return Resolution::Found(root.clone());
    }
    lookup_path(root, segments).map_or(Resolution::Missing, Resolution::Found)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty() && text != "false",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn compare(lhs: &Value, op: CmpOp, literal: &Literal) -> bool {
    match op {
        CmpOp::Eq => values_equal(lhs, literal),
        CmpOp::NotEq => !values_equal(lhs, literal),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => compare_ordered(lhs, op, literal),
    }
}

fn values_equal(lhs: &Value, literal: &Literal) -> bool {
    match (lhs, literal) {
        (Value::String(text), Literal::Str(expected)) => text == expected,
        (Value::Number(number), Literal::Num(expected)) => number.as_f64().is_some_and(|n| (n - expected).abs() < f64::EPSILON),
        (Value::Bool(flag), Literal::Bool(expected)) => flag == expected,
        (Value::String(text), Literal::Bool(expected)) => (*expected && text == "true") || (!*expected && text == "false"),
        (Value::Bool(flag), Literal::Str(expected)) => (*flag && expected == "true") || (!*flag && expected == "false"),
        _ => false,
    }
}

fn compare_ordered(lhs: &Value, op: CmpOp, literal: &Literal) -> bool {
    let (Value::Number(number), Literal::Num(expected)) = (lhs, literal) else {
        return false;
    };
    let Some(actual) = number.as_f64() else {
        return false;
    };
    match op {
        CmpOp::Lt => actual < *expected,
        CmpOp::Le => actual <= *expected,
        CmpOp::Gt => actual > *expected,
        CmpOp::Ge => actual >= *expected,
        CmpOp::Eq | CmpOp::NotEq => unreachable!("handled by compare's outer match"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::Value;
    use serde_json::json;

    use super::EvalContext;
    use super::evaluate;

    fn ctx<'a>(config: &'a Value, step_output: &'a Value, env: &'a HashMap<String, String>, artifacts: &'a Value, providers: &'a [String]) -> EvalContext<'a> {
        EvalContext { config, step_output, env, artifacts, providers }
    }

    #[test]
    fn bare_snake_case_identifier_falls_back_through_config_then_artifacts_then_env() {
        let config = json!({ "ci_mode": true });
        let step_output = json!({});
        let env = HashMap::new();
        let artifacts = json!({});
        let providers = Vec::new();
        let outcome = evaluate("ci_mode", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(outcome.result);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn missing_path_fails_closed_without_warning() {
        let config = json!({});
        let step_output = json!({});
        let env = HashMap::new();
        let artifacts = json!({});
        let providers = Vec::new();
        let outcome = evaluate("config.nonexistent == 'x'", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(!outcome.result);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn unrecognised_namespace_fails_closed_with_warning() {
        let config = json!({});
        let step_output = json!({});
        let env = HashMap::new();
        let artifacts = json!({});
        let providers = Vec::new();
        let outcome = evaluate("bogus.thing", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(!outcome.result);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn parse_failure_fails_open() {
        let config = json!({});
        let step_output = json!({});
        let env = HashMap::new();
        let artifacts = json!({});
        let providers = Vec::new();
        let outcome = evaluate("a AND", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(outcome.result);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn providers_includes_checks_membership() {
        let config = json!({});
        let step_output = json!({});
        let env = HashMap::new();
        let artifacts = json!({});
        let providers = vec!["claude".to_string(), "gpt-4".to_string()];
        let outcome = evaluate("providers.includes('claude')", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(outcome.result);
        let outcome = evaluate("providers.includes('unknown')", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(!outcome.result);
    }

    #[test]
    fn env_bool_compares_against_string_coercion() {
        let config = json!({});
        let step_output = json!({});
        let mut env = HashMap::new();
        env.insert("CI".to_string(), "true".to_string());
        let artifacts = json!({});
        let providers = Vec::new();
        let outcome = evaluate("env.CI == true", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(outcome.result);
    }

    #[test]
    fn config_ordering_comparison() {
        let config = json!({ "retries": 5 });
        let step_output = json!({});
        let env = HashMap::new();
        let artifacts = json!({});
        let providers = Vec::new();
        let outcome = evaluate("config.retries >= 3", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(outcome.result);
    }

    #[test]
    fn step_output_dotted_equality() {
        let config = json!({});
        let step_output = json!({ "output": { "passed": true } });
        let env = HashMap::new();
        let artifacts = json!({});
        let providers = Vec::new();
        let outcome = evaluate("step.output.passed == true", &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(outcome.result);
    }

    #[test]
    fn composite_and_or_not_expression() {
        let config = json!({ "strict": false });
        let step_output = json!({ "output": { "passed": true } });
        let env = HashMap::new();
        let artifacts = json!({});
        let providers = vec!["claude".to_string()];
        let expr = "step.output.passed == true AND (NOT config.strict OR providers.includes('claude'))";
        let outcome = evaluate(expr, &ctx(&config, &step_output, &env, &artifacts, &providers));
        assert!(outcome.result);
    }

    proptest::proptest! {
        #[test]
        fn and_chain_of_booleans_matches_rust_all(flags in proptest::collection::vec(proptest::bool::ANY, 1 .. 6)) {
            let config = json!({});
            let step_output = json!({});
            let env = HashMap::new();
            let artifacts = json!({});
            let providers: Vec<String> = Vec::new();
            let words: Vec<&str> = flags.iter().map(|flag| if *flag { "true" } else { "false" }).collect();
            let expr = words.join(" AND ");
            let outcome = evaluate(&expr, &ctx(&config, &step_output, &env, &artifacts, &providers));
            proptest::prop_assert_eq!(outcome.result, flags.iter().all(|flag| *flag));
        }

        #[test]
        fn or_chain_of_booleans_matches_rust_any(flags in proptest::collection::vec(proptest::bool::ANY, 1 .. 6)) {
            let config = json!({});
            let step_output = json!({});
            let env = HashMap::new();
            let artifacts = json!({});
            let providers: Vec<String> = Vec::new();
            let words: Vec<&str> = flags.iter().map(|flag| if *flag { "true" } else { "false" }).collect();
            let expr = words.join(" OR ");
            let outcome = evaluate(&expr, &ctx(&config, &step_output, &env, &artifacts, &providers));
            proptest::prop_assert_eq!(outcome.result, flags.iter().any(|flag| *flag));
        }
    }
}
