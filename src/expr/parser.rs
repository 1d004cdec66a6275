//! Recursive-descent parser for condition expressions.
//!
//! Precedence, low to high: `||` < `&&` < comparison (`==` `!=` `<` `<=` `>`
//! `>=` `in`, non-chaining) < unary `!` < primary (literal | path |
//! parenthesized).

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::error::{EvaluationError, EvaluationErrorKind, Result};
use super::lexer::{tokenize, Spanned, Token};
use crate::value::Value;

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

const MAX_DEPTH: usize = 64;

pub fn parse(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn column(&self) -> usize {
        self.tokens[self.pos].column
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvaluationError::at(
                EvaluationErrorKind::TooComplex,
                self.column(),
                format!("expression nesting exceeds {MAX_DEPTH} levels"),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expect_eof(&mut self) -> Result<()> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(EvaluationError::at(
                EvaluationErrorKind::InvalidSyntax,
                self.column(),
                format!("unexpected trailing token {:?}", self.peek()),
            ))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.enter()?;
        let mut lhs = self.parse_and()?;
        while *self.peek() == Token::Or {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary { op: BinaryOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.leave();
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.enter()?;
        let mut lhs = self.parse_comparison()?;
        while *self.peek() == Token::And {
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary { op: BinaryOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.leave();
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        self.enter()?;
        let lhs = self.parse_unary()?;
        let op = match self.peek() {
            Token::Eq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::In => BinaryOp::In,
            _ => {
                self.leave();
                return Ok(lhs);
            }
        };
        self.advance();
        let rhs = self.parse_unary()?;
        // Comparisons don't chain: `a == b == c` is a syntax error, not
        // left-associative.
        if matches!(
            self.peek(),
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge | Token::In
        ) {
            return Err(EvaluationError::at(
                EvaluationErrorKind::InvalidSyntax,
                self.column(),
                "comparison operators do not chain",
            ));
        }
        self.leave();
        Ok(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.enter()?;
        if *self.peek() == Token::Not {
            self.advance();
            let inner = self.parse_unary()?;
            self.leave();
            return Ok(Expr::Unary { op: UnaryOp::Not, inner: Box::new(inner) });
        }
        let expr = self.parse_primary()?;
        self.leave();
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = match self.peek().clone() {
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                if *self.peek() != Token::RParen {
                    return Err(EvaluationError::at(
                        EvaluationErrorKind::InvalidSyntax,
                        self.column(),
                        "expected closing ')'",
                    ));
                }
                self.advance();
                inner
            }
            Token::True => {
                self.advance();
                Expr::Literal(Value::Bool(true))
            }
            Token::False => {
                self.advance();
                Expr::Literal(Value::Bool(false))
            }
            Token::Null => {
                self.advance();
                Expr::Literal(Value::Null)
            }
            Token::Int(n) => {
                self.advance();
                Expr::Literal(Value::Int(n))
            }
            Token::Float(n) => {
                self.advance();
                Expr::Literal(Value::Float(n))
            }
            Token::Str(s) => {
                self.advance();
                Expr::Literal(Value::String(s))
            }
            Token::Ident(name) => {
                self.advance();
                let mut segments = vec![name];
                while *self.peek() == Token::Dot {
                    self.advance();
                    match self.advance() {
                        Token::Ident(part) => segments.push(part),
                        other => {
                            return Err(EvaluationError::at(
                                EvaluationErrorKind::InvalidSyntax,
                                self.column(),
                                format!("expected identifier after '.', found {other:?}"),
                            ));
                        }
                    }
                }
                Expr::Path(segments)
            }
            other => {
                return Err(EvaluationError::at(
                    EvaluationErrorKind::InvalidSyntax,
                    self.column(),
                    format!("unexpected token {other:?}"),
                ));
            }
        };
        self.leave();
        Ok(expr)
    }
}
