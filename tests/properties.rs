//! Property-based checks for the invariants the engine is supposed to hold
//! regardless of which concrete policy corpus it's loaded with.

use authz_engine::derived_roles::resolve;
use authz_engine::engine::{CheckRequest, Principal, Resource};
use authz_engine::expr::EvalContext;
use authz_engine::policy::types::{
    Condition, DerivedRoleDefinition, Effect, Metadata, Policy, ResourcePolicySpec, Rule, API_VERSION,
};
use authz_engine::wildcard::matches;
use authz_engine::value::Value;
use authz_engine::AuthzEngine;
use proptest::prelude::*;
use std::collections::HashMap;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        "[a-z]{1,6}".prop_map(|s| s),
    ]
}

fn path(max_segments: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..=max_segments).prop_map(|segs| segs.join(":"))
}

fn action_segment() -> impl Strategy<Value = String> {
    "[a-z]{1,6}".prop_map(|s| s)
}

fn action_path(max_segments: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(action_segment(), 1..=max_segments).prop_map(|segs| segs.join(":"))
}

fn basic_policy() -> Policy {
    Policy::ResourcePolicy {
        api_version: API_VERSION.to_string(),
        metadata: Metadata { name: "p".into(), description: None, version: None, labels: HashMap::new() },
        spec: ResourcePolicySpec {
            resource: "document".into(),
            rules: vec![
                Rule {
                    actions: vec!["documents:*".into()],
                    effect: Effect::Allow,
                    roles: vec!["viewer".into()],
                    derived_roles: vec![],
                    condition: None,
                    name: Some("allow-viewer".into()),
                },
                Rule {
                    actions: vec!["documents:delete".into()],
                    effect: Effect::Deny,
                    roles: vec!["viewer".into()],
                    derived_roles: vec![],
                    condition: None,
                    name: Some("deny-delete".into()),
                },
            ],
        },
    }
}

fn sample_request(action: &str) -> CheckRequest {
    CheckRequest {
        request_id: None,
        principal: Principal { id: "u1".into(), roles: vec!["viewer".into()], attributes: Default::default() },
        resource: Resource { kind: "document".into(), id: "d1".into(), attributes: Default::default() },
        actions: vec![action.to_string()],
    }
}

proptest! {
    /// Determinism: checking the same request twice against the same loaded
    /// corpus yields the same decision.
    #[test]
    fn check_is_deterministic(action in action_path(3)) {
        let engine = AuthzEngine::new();
        engine.load(&[basic_policy()]).unwrap();
        let req = sample_request(&action);
        let r1 = engine.check(&req);
        let r2 = engine.check(&req);
        prop_assert_eq!(r1.results[&action].effect, r2.results[&action].effect);
    }

    /// Deny always wins over allow regardless of authoring order, since
    /// `documents:delete` is always reachable via both the wildcard allow
    /// and the exact deny rule.
    #[test]
    fn deny_overrides_allow_for_delete_action(_seed in 0..10u8) {
        let engine = AuthzEngine::new();
        engine.load(&[basic_policy()]).unwrap();
        let resp = engine.check(&sample_request("documents:delete"));
        prop_assert_eq!(resp.results["documents:delete"].effect, authz_engine::engine::Effect::Deny);
    }

    /// Unknown resource kinds are always denied, for any action string.
    #[test]
    fn unknown_kind_is_always_denied(action in action_path(3)) {
        let engine = AuthzEngine::new();
        engine.load(&[basic_policy()]).unwrap();
        let mut req = sample_request(&action);
        req.resource.kind = "nonexistent-kind".into();
        let resp = engine.check(&req);
        prop_assert_eq!(resp.results[&action].effect, authz_engine::engine::Effect::Deny);
        prop_assert_eq!(resp.results[&action].policy.as_str(), "default-deny");
    }

    /// Wildcard specificity invariant: a pattern and an action with a
    /// different number of colon segments never match, except through the
    /// documented trailing-star empty-segment absorption.
    #[test]
    fn segment_count_mismatch_without_stars_never_matches(
        a in prop::collection::vec("[a-z]{1,4}", 1..=4),
        b in prop::collection::vec("[a-z]{1,4}", 1..=5),
    ) {
        prop_assume!(a.len() != b.len());
        let pattern = a.join(":");
        let action = b.join(":");
        prop_assert!(!matches(&pattern, &action));
    }

    /// Case sensitivity: matching is never case-insensitive.
    #[test]
    fn matching_is_case_sensitive(s in "[a-z]{1,8}") {
        let upper = s.to_uppercase();
        prop_assume!(upper != s);
        prop_assert!(!matches(&s, &upper));
    }

    /// Matching a pattern against itself always succeeds for literal
    /// (non-wildcard) segments.
    #[test]
    fn literal_pattern_matches_itself(p in path(4).prop_filter("no stars", |p| !p.contains('*'))) {
        prop_assert!(matches(&p, &p));
    }
}

#[test]
fn derived_role_memoization_is_idempotent() {
    let definitions = vec![DerivedRoleDefinition {
        name: "owner".into(),
        parent_roles: vec!["user".into()],
        condition: Condition { expression: "true".into() },
    }];
    let compiled: Vec<authz_engine::derived_roles::CompiledDerivedRole> = definitions
        .iter()
        .map(|d| authz_engine::derived_roles::CompiledDerivedRole {
            name: d.name.clone(),
            parent_roles: d.parent_roles.iter().map(|p| authz_engine::derived_roles::compile_parent_pattern(p)).collect(),
            condition: authz_engine::expr::Engine::new().compile(&d.condition.expression).unwrap(),
        })
        .collect();

    let principal = Value::Map(Default::default());
    let resource = Value::Map(Default::default());
    let ctx = EvalContext::new(&principal, &resource);
    let base_roles = vec!["user".to_string()];

    let first = resolve(&compiled, &base_roles, &ctx);
    let second = resolve(&compiled, &base_roles, &ctx);
    assert_eq!(first, second);
}

#[test]
fn loading_policies_twice_is_idempotent() {
    let engine = AuthzEngine::new();
    engine.load(&[basic_policy()]).unwrap();
    let before = engine.check(&sample_request("documents:read"));
    engine.load(&[basic_policy()]).unwrap();
    let after = engine.check(&sample_request("documents:read"));
    assert_eq!(before.results["documents:read"].effect, after.results["documents:read"].effect);
}
