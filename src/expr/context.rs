//! Read-only binding environment for expression evaluation.

use crate::value::Value;

/// The `{principal, resource, request}` binding that conditions are
/// evaluated against. Each top-level name resolves against one of these
/// three root values; `request` is optional since some evaluation sites
/// (derived-role matching) only have principal/resource in scope.
#[derive(Debug, Clone)]
pub struct EvalContext<'a> {
    pub principal: &'a Value,
    pub resource: &'a Value,
    pub request: Option<&'a Value>,
}

impl<'a> EvalContext<'a> {
    pub fn new(principal: &'a Value, resource: &'a Value) -> Self {
        Self { principal, resource, request: None }
    }

    pub fn with_request(principal: &'a Value, resource: &'a Value, request: &'a Value) -> Self {
        Self { principal, resource, request: Some(request) }
    }

    /// Resolve a dotted path against the appropriate root. Returns `None`
    /// (evaluator's `undefined`) when the root name is unrecognized, the
    /// `request` root isn't bound, or any segment of the walk is missing.
    pub fn resolve(&self, segments: &[String]) -> Option<&'a Value> {
        let (root, rest) = segments.split_first()?;
        let root_value = match root.as_str() {
            "principal" => self.principal,
            "resource" => self.resource,
            "request" => self.request?,
            _ => return None,
        };
        if rest.is_empty() {
            Some(root_value)
        } else {
            root_value.get_path(rest)
        }
    }
}
