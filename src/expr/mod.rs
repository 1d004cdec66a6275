//! The condition-expression subsystem: lexer, parser, AST, and evaluator
//! for the small boolean grammar policy conditions are written in.
//!
//! This is deliberately not a CEL implementation — see `Engine` below for
//! the compile-once-per-source-text cache that plays the same architectural
//! role a full CEL engine would.

pub mod ast;
pub mod context;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::Expr;
pub use context::EvalContext;
pub use error::{EvaluationError, EvaluationErrorKind};

use std::collections::HashMap;
use std::sync::RwLock;

/// Compiles condition source text into an `Expr` AST and caches the result
/// keyed by the exact source string, so a policy index referencing the same
/// condition text many times across rules only pays the parse cost once.
#[derive(Default)]
pub struct Engine {
    cache: RwLock<HashMap<String, Expr>>,
}

impl Engine {
    pub fn new() -> Self {
        Self { cache: RwLock::new(HashMap::new()) }
    }

    /// Compile `src`, consulting (and populating) the cache. Returns a clone
    /// of the cached AST; ASTs are cheap, owned trees so cloning is fine.
    pub fn compile(&self, src: &str) -> error::Result<Expr> {
        if let Some(expr) = self.cache.read().expect("expr cache poisoned").get(src) {
            return Ok(expr.clone());
        }
        let expr = parser::parse(src)?;
        self.cache
            .write()
            .expect("expr cache poisoned")
            .insert(src.to_string(), expr.clone());
        Ok(expr)
    }

    pub fn evaluate(&self, src: &str, ctx: &EvalContext<'_>) -> error::Result<bool> {
        let expr = self.compile(src)?;
        eval::evaluate(&expr, ctx)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().expect("expr cache poisoned").len()
    }
}
