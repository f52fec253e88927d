// crates/taskgate-condition/src/lib.rs
// ============================================================================
// Module: Taskgate Condition Evaluator
// Description: Parses and evaluates the step `condition` DSL (spec §4.3).
// Purpose: Give the Workflow Stepper a pure function from a condition string
//          plus a typed context to a boolean, with documented fail-open and
//          fail-closed behaviour.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//!
//! Grounded on `ret-logic::dsl`'s lexer/parser architecture: a byte-offset
//! [`lexer`], a recursive-descent [`parser`] with the same
//! `parse_or -> parse_and -> parse_unary -> parse_primary` precedence climb,
//! and function calls lexed as single atomic tokens. The generalisation this
//! crate makes over that DSL is evaluating against a typed runtime context
//! (`config`, `step.output`, `env`, `artifacts`, `providers`) instead of a
//! caller-supplied symbol table, and comparing values rather than only
//! composing boolean conditions.
//!
//! ```
//! use std::collections::HashMap;
//!
//! use serde_json::json;
//! use taskgate_condition::EvalContext;
//! use taskgate_condition::evaluate;
//!
//! let config = json!({ "strict": false });
//! let step_output = json!({});
//! let env = HashMap::new();
//! let artifacts = json!({});
//! let providers = vec!["claude".to_string()];
//! let ctx = EvalContext { config: &config, step_output: &step_output, env: &env, artifacts: &artifacts, providers: &providers };
//! let outcome = evaluate("NOT config.strict AND providers.includes('claude')", &ctx);
//! assert!(outcome.result);
//! ```

mod ast;
mod context;
mod eval;
mod lexer;
mod parser;

pub use ast::Atom;
pub use ast::CmpOp;
pub use ast::Expr;
pub use ast::Literal;
pub use context::EvalContext;
pub use eval::EvalOutcome;
pub use eval::evaluate;
pub use parser::parse;

/// Errors produced while tokenising or parsing a condition string.
///
/// # Invariants
/// - None. These are surfaced to [`evaluate`]'s fail-open path, not returned
///   directly from it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    /// The input contained a character or literal the lexer could not
    /// recognise.
    #[error("lex error at byte {position}: {found}")]
    Lex {
        /// Description of what was found.
        found: String,
        /// Byte offset where the problem was detected.
        position: usize,
    },
    /// The token stream did not match the grammar.
    #[error("parse error at byte {position}: expected {expected}, found `{found}`")]
    Parse {
        /// Human-readable description of what the parser expected.
        expected: &'static str,
        /// The token that was actually seen.
        found: String,
        /// Byte offset where the problem was detected.
        position: usize,
    },
}
