// crates/taskgate-condition/src/ast.rs
// ============================================================================
// Module: Condition AST
// Description: Parsed representation of a step condition expression.
// Purpose: Decouple the parser's output from the evaluator's input so each
//          can be tested independently.
// Dependencies: none
// ============================================================================

//! ## Overview
//! An [`Expr`] tree mirrors the grammar in spec §4.3: boolean composition
//! (`And`/`Or`/`Not`) over [`Atom`] leaves, where each leaf is either a bare
//! path (truthy lookup or an atomic function call) or a path compared against
//! a literal with a comparison operator.

/// A literal value on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A quoted string literal.
    Str(String),
    /// A numeric literal.
    Num(f64),
    /// A bare `true` / `false` literal.
    Bool(bool),
}

/// A comparison operator (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `==` or `===`.
    Eq,
    /// `!=` or `!==`.
    NotEq,
    /// `<`.
    Lt,
    /// `<=`.
    Le,
    /// `>`.
    Gt,
    /// `>=`.
    Ge,
}

/// A single leaf condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// A bare `true` / `false` literal, evaluating to itself.
    Bool(bool),
    /// A bare path (or atomic function-call path) evaluated for truthiness.
    Truthy(String),
    /// A path compared against a literal with an operator.
    Compare {
        /// The left-hand dotted path.
        path: String,
        /// The comparison operator.
        op: CmpOp,
        /// The right-hand literal.
        literal: Literal,
    },
}

/// A parsed condition expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Conjunction of two or more sub-expressions.
    And(Vec<Expr>),
    /// Disjunction of two or more sub-expressions.
    Or(Vec<Expr>),
    /// Negation of a sub-expression.
    Not(Box<Expr>),
    /// A leaf condition.
    Leaf(Atom),
}
