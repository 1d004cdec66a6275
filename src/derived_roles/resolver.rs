//! Derived-role resolution: monotonic fixed-point computation of the
//! derived roles that apply to a principal/resource pair, with per-request
//! memoization.

use super::types::{parent_role_matches, CompiledDerivedRole};
use crate::expr::{eval, EvalContext};
use std::collections::{BTreeSet, HashMap};

/// Key for the per-request memo cache: principal id, the principal's sorted
/// base roles, and the resource's kind and id, canonicalized so two
/// structurally-equal requests collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveKey {
    pub principal_id: String,
    pub roles: Vec<String>,
    pub resource_kind: String,
    pub resource_id: String,
}

impl ResolveKey {
    pub fn new(principal_id: &str, roles: &[String], resource_kind: &str, resource_id: &str) -> Self {
        let mut roles: Vec<String> = roles.to_vec();
        roles.sort();
        roles.dedup();
        Self {
            principal_id: principal_id.to_string(),
            roles,
            resource_kind: resource_kind.to_string(),
            resource_id: resource_id.to_string(),
        }
    }
}

/// Request-scoped cache. Owned by a single `check` call; never shared
/// across requests or threads.
#[derive(Debug, Default)]
pub struct MemoCache {
    entries: HashMap<ResolveKey, BTreeSet<String>>,
    hits: u64,
    misses: u64,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Returns the cached role set for `key`, computing and storing it via
    /// `compute` on a miss. `compute` runs at most once per distinct key.
    pub fn get_or_compute(
        &mut self,
        key: ResolveKey,
        compute: impl FnOnce() -> BTreeSet<String>,
    ) -> BTreeSet<String> {
        if let Some(cached) = self.entries.get(&key) {
            self.hits += 1;
            return cached.clone();
        }
        self.misses += 1;
        let result = compute();
        self.entries.insert(key, result.clone());
        result
    }
}

/// Resolve the derived roles that apply for `base_roles` against the bound
/// `ctx`, given the corpus of compiled derived-role definitions.
///
/// This is a monotonic fixed-point over `definitions`: a role, once
/// accepted, can itself satisfy another definition's parent-role match.
/// Acyclicity (enforced at validation time) guarantees termination in at
/// most `definitions.len()` passes.
///
/// Parent-role matching is **OR**: a definition applies if *any* of its
/// `parent_roles` patterns matches *any* role already known to apply. This
/// differs from a stricter "principal must hold every parent role" (AND)
/// reading of the same field name — OR is what this engine implements.
pub fn resolve(
    definitions: &[CompiledDerivedRole],
    base_roles: &[String],
    ctx: &EvalContext<'_>,
) -> BTreeSet<String> {
    let mut applied: BTreeSet<String> = base_roles.iter().cloned().collect();
    let mut applied_definitions: BTreeSet<&str> = BTreeSet::new();

    loop {
        let mut added = false;
        for def in definitions {
            if applied_definitions.contains(def.name.as_str()) {
                continue;
            }
            let parent_matches = def
                .parent_roles
                .iter()
                .any(|pattern| applied.iter().any(|role| parent_role_matches(pattern, role)));
            if !parent_matches {
                continue;
            }
            let condition_holds = eval::evaluate(&def.condition, ctx).unwrap_or(false);
            if condition_holds {
                applied.insert(def.name.clone());
                applied_definitions.insert(def.name.as_str());
                added = true;
            }
        }
        if !added {
            break;
        }
    }

    applied.retain(|role| definitions.iter().any(|d| d.name == *role));
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser;
    use crate::value::Value;
    use serde_json::json;

    fn def(name: &str, parents: &[&str], expr: &str) -> CompiledDerivedRole {
        CompiledDerivedRole {
            name: name.into(),
            parent_roles: parents.iter().map(|s| crate::derived_roles::types::compile_parent_pattern(s)).collect(),
            condition: parser::parse(expr).unwrap(),
        }
    }

    #[test]
    fn resolves_simple_parent_match() {
        let defs = vec![def("owner", &["user"], "true")];
        let p = Value::from_json(&json!({}));
        let r = Value::from_json(&json!({}));
        let ctx = EvalContext::new(&p, &r);
        let roles = vec!["user".to_string()];
        let resolved = resolve(&defs, &roles, &ctx);
        assert!(resolved.contains("owner"));
    }

    #[test]
    fn condition_gates_applicability() {
        let defs = vec![def("owner", &["user"], "resource.attributes.ownerId == principal.id")];
        let p = Value::from_json(&json!({"id": "u1"}));
        let r = Value::from_json(&json!({"attributes": {"ownerId": "u2"}}));
        let ctx = EvalContext::new(&p, &r);
        let roles = vec!["user".to_string()];
        assert!(!resolve(&defs, &roles, &ctx).contains("owner"));
    }

    #[test]
    fn or_semantics_any_parent_matches() {
        // Only "user" is held, but the pattern list also requires "admin"
        // in a naive AND reading; OR semantics means one match suffices.
        let defs = vec![def("privileged", &["admin", "user"], "true")];
        let p = Value::from_json(&json!({}));
        let r = Value::from_json(&json!({}));
        let ctx = EvalContext::new(&p, &r);
        let roles = vec!["user".to_string()];
        assert!(resolve(&defs, &roles, &ctx).contains("privileged"));
    }

    #[test]
    fn fixed_point_chains_derived_roles() {
        let defs = vec![
            def("manager", &["employee"], "true"),
            def("senior_manager", &["manager"], "true"),
        ];
        let p = Value::from_json(&json!({}));
        let r = Value::from_json(&json!({}));
        let ctx = EvalContext::new(&p, &r);
        let roles = vec!["employee".to_string()];
        let resolved = resolve(&defs, &roles, &ctx);
        assert!(resolved.contains("manager"));
        assert!(resolved.contains("senior_manager"));
    }

    #[test]
    fn memoization_computes_once_per_key() {
        let mut cache = MemoCache::new();
        let key = ResolveKey::new("u1", &["b".into(), "a".into()], "document", "d1");
        let key2 = ResolveKey::new("u1", &["a".into(), "b".into()], "document", "d1");
        assert_eq!(key, key2);

        let mut calls = 0;
        cache.get_or_compute(key.clone(), || {
            calls += 1;
            BTreeSet::from(["owner".to_string()])
        });
        cache.get_or_compute(key2, || {
            calls += 1;
            BTreeSet::from(["owner".to_string()])
        });
        assert_eq!(calls, 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }
}
