//! Parsed condition-expression AST.
//!
//! `Expr = Binary{op, lhs, rhs} | Unary{op, inner} | Path{segments} | Literal{value}`.

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A dotted identifier path, e.g. `principal.attributes.ownerId`.
    Path(Vec<String>),
    Unary {
        op: UnaryOp,
        inner: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}
