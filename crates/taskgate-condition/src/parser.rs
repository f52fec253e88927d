// crates/taskgate-condition/src/parser.rs
// ============================================================================
// Module: Condition Parser
// Description: Recursive-descent parser building an `ast::Expr` from tokens.
// Purpose: Implement the `NOT > AND > OR` precedence climb from spec §4.3.
// Dependencies: crate::lexer, crate::ast
// ============================================================================

//! ## Overview
//! Grounded directly on `ret-logic::dsl`'s `Parser`: the same
//! `parse_or -> parse_and -> parse_unary -> parse_primary` structure, token
//! index cursor, and `matches`/`expect` helpers. `parse_primary` here additionally
//! folds an optional trailing comparison operator and literal into the atom,
//! since this DSL compares values rather than only composing boolean symbols.

use crate::ConditionError;
use crate::ast::Atom;
use crate::ast::CmpOp;
use crate::ast::Expr;
use crate::ast::Literal;
use crate::lexer::SpannedToken;
use crate::lexer::Token;
use crate::lexer::tokenize;

/// Parses a full condition string into an [`Expr`] tree.
///
/// # Errors
/// Returns [`ConditionError`] if the input fails to tokenize or does not
/// match the grammar.
pub fn parse(input: &str) -> Result<Expr, ConditionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, index: 0 };
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    index: usize,
}

impl Parser {
    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut parts = vec![self.parse_and()?];
        while self.matches(&Token::Or) {
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 { parts.remove(0) } else { Expr::Or(parts) })
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut parts = vec![self.parse_unary()?];
        while self.matches(&Token::And) {
            parts.push(self.parse_unary()?);
        }
        Ok(if parts.len() == 1 { parts.remove(0) } else { Expr::And(parts) })
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if self.matches(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        if self.matches(&Token::LParen) {
            let expr = self.parse_or()?;
            self.expect(&Token::RParen, "`)`")?;
            return Ok(expr);
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, ConditionError> {
        let position = self.current().position;
        let path = match &self.current().token {
            Token::Path(path) => path.clone(),
            Token::Bool(value) => {
                let value = *value;
                self.advance();
                return Ok(Expr::Leaf(Atom::Bool(value)));
            }
            other => {
                return Err(ConditionError::Parse { expected: "a path or `(`", found: describe(other), position });
            }
        };
        self.advance();

        let Some(op) = self.peek_cmp_op() else {
            return Ok(Expr::Leaf(Atom::Truthy(path)));
        };
        self.advance();
        let literal = self.parse_literal()?;
        Ok(Expr::Leaf(Atom::Compare { path, op, literal }))
    }

    fn parse_literal(&mut self) -> Result<Literal, ConditionError> {
        let position = self.current().position;
        let literal = match &self.current().token {
            Token::String(value) => Literal::Str(value.clone()),
            Token::Number(value) => Literal::Num(*value),
            Token::Bool(value) => Literal::Bool(*value),
            other => {
                return Err(ConditionError::Parse {
                    expected: "a string, number, or boolean literal",
                    found: describe(other),
                    position,
                });
            }
        };
        self.advance();
        Ok(literal)
    }

    fn peek_cmp_op(&self) -> Option<CmpOp> {
        match self.current().token {
            Token::Eq => Some(CmpOp::Eq),
            Token::NotEq => Some(CmpOp::NotEq),
            Token::Lt => Some(CmpOp::Lt),
            Token::Le => Some(CmpOp::Le),
            Token::Gt => Some(CmpOp::Gt),
            Token::Ge => Some(CmpOp::Ge),
            _ => None,
        }
    }

    fn matches(&mut self, expected: &Token) -> bool {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, label: &'static str) -> Result<(), ConditionError> {
        if self.matches(expected) {
            Ok(())
        } else {
            let position = self.current().position;
            Err(ConditionError::Parse { expected: label, found: describe(&self.current().token), position })
        }
    }

    fn expect_eof(&self) -> Result<(), ConditionError> {
        if matches!(self.current().token, Token::Eof) {
            Ok(())
        } else {
            Err(ConditionError::Parse { expected: "end of input", found: describe(&self.current().token), position: self.current().position })
        }
    }

    fn current(&self) -> &SpannedToken {
        &self.tokens[self.index]
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Path(path) => path.clone(),
        Token::String(value) => format!("'{value}'"),
        Token::Number(value) => value.to_string(),
        Token::Bool(value) => value.to_string(),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::Not => "NOT".to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::Eq => "==".to_string(),
        Token::NotEq => "!=".to_string(),
        Token::Lt => "<".to_string(),
        Token::Le => "<=".to_string(),
        Token::Gt => ">".to_string(),
        Token::Ge => ">=".to_string(),
        Token::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::ast::Atom;
    use crate::ast::Expr;

    #[test]
    fn not_binds_tighter_than_and_which_binds_tighter_than_or() {
        let expr = parse("a AND NOT b OR c").expect("parses");
        match expr {
            Expr::Or(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected Or at the top, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse("a AND (b OR c)").expect("parses");
        match expr {
            Expr::And(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], Expr::Or(_)));
            }
            other => panic!("expected And at the top, got {other:?}"),
        }
    }

    #[test]
    fn function_call_parses_as_a_truthy_leaf() {
        let expr = parse("providers.includes('claude')").expect("parses");
        assert!(matches!(expr, Expr::Leaf(Atom::Truthy(ref path)) if path == "providers.includes('claude')"));
    }

    #[test]
    fn comparison_parses_into_a_compare_leaf() {
        let expr = parse("config.retries >= 3").expect("parses");
        assert!(matches!(expr, Expr::Leaf(Atom::Compare { .. })));
    }

    #[test]
    fn trailing_input_is_rejected() {
        assert!(parse("a AND b )").is_err());
    }
}
