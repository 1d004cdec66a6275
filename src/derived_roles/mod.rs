//! The derived-roles subsystem: graph acyclicity checking and
//! per-request role resolution.

pub mod graph;
pub mod resolver;
pub mod types;

pub use resolver::{resolve, MemoCache, ResolveKey};
pub use types::{compile_parent_pattern, parent_role_matches, CompiledDerivedRole, CompiledParentPattern};
