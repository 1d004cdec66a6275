//! Evaluation-time (not validation-time) error taxonomy for the expression
//! evaluator. Raised only from `evaluate`/parsing inside it — never
//! surfaced as a panic, always a `Result`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationErrorKind {
    InvalidSyntax,
    UnknownIdentifier,
    TypeMismatch,
    /// Reserved for a future arithmetic-division operator; the current
    /// grammar has no division operator, so this never fires today.
    DivisionByZero,
    TooComplex,
}

impl fmt::Display for EvaluationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidSyntax => "InvalidSyntax",
            Self::UnknownIdentifier => "UnknownIdentifier",
            Self::TypeMismatch => "TypeMismatch",
            Self::DivisionByZero => "DivisionByZero",
            Self::TooComplex => "TooComplex",
        };
        write!(f, "{s}")
    }
}

/// A failure to parse or evaluate a condition expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct EvaluationError {
    pub kind: EvaluationErrorKind,
    /// Best-effort column number, 0-indexed, when the error was raised
    /// during parsing.
    pub location: Option<usize>,
    pub message: String,
}

impl EvaluationError {
    pub fn new(kind: EvaluationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: None,
            message: message.into(),
        }
    }

    pub fn at(kind: EvaluationErrorKind, column: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: Some(column),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EvaluationError>;
