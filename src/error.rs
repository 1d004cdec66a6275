//! Error types for the authorization engine.

use thiserror::Error;

/// Fatal, caller-side errors. These are the only conditions that abort a
/// `check` call outright rather than flowing into a `CheckResponse` — see
/// `EvaluationError` and `policy::ValidationError` for the two non-fatal
/// taxonomies.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed request (null principal/resource, or a value that fails
    /// the type invariants the engine assumes the caller already enforced).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A policy batch failed validation and was rejected atomically.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

pub type Result<T> = std::result::Result<T, AuthzError>;
