//! End-to-end scenarios against the full `check` pipeline: indexing,
//! wildcard matching, derived-role resolution, and deny-override
//! combination working together.

use authz_engine::engine::{CheckRequest, Effect, Principal, Resource};
use authz_engine::policy::types::{
    Condition, DerivedRoleDefinition, DerivedRolesSpec, Effect as PolicyEffect, Metadata, Policy, ResourcePolicySpec,
    Rule, API_VERSION,
};
use authz_engine::AuthzEngine;
use std::collections::HashMap;

fn metadata(name: &str) -> Metadata {
    Metadata { name: name.to_string(), description: None, version: None, labels: HashMap::new() }
}

fn resource_policy(name: &str, resource: &str, rules: Vec<Rule>) -> Policy {
    Policy::ResourcePolicy {
        api_version: API_VERSION.to_string(),
        metadata: metadata(name),
        spec: ResourcePolicySpec { resource: resource.to_string(), rules },
    }
}

fn rule(actions: &[&str], effect: PolicyEffect, roles: &[&str], derived_roles: &[&str], name: &str) -> Rule {
    Rule {
        actions: actions.iter().map(|s| s.to_string()).collect(),
        effect,
        roles: roles.iter().map(|s| s.to_string()).collect(),
        derived_roles: derived_roles.iter().map(|s| s.to_string()).collect(),
        condition: None,
        name: Some(name.to_string()),
    }
}

fn principal(id: &str, roles: &[&str]) -> Principal {
    Principal { id: id.to_string(), roles: roles.iter().map(|s| s.to_string()).collect(), attributes: Default::default() }
}

fn resource(kind: &str, id: &str) -> Resource {
    Resource { kind: kind.to_string(), id: id.to_string(), attributes: Default::default() }
}

fn request(principal: Principal, resource: Resource, actions: &[&str]) -> CheckRequest {
    CheckRequest {
        request_id: None,
        principal,
        resource,
        actions: actions.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn scenario_1_exact_and_wildcard_precedence_within_same_role() {
    let engine = AuthzEngine::new();
    engine
        .load(&[resource_policy(
            "documents",
            "document",
            vec![
                rule(&["documents:read"], PolicyEffect::Allow, &["viewer"], &[], "R1"),
                rule(&["documents:*"], PolicyEffect::Allow, &["editor"], &[], "R2"),
            ],
        )])
        .unwrap();

    let resp = engine.check(&request(principal("u1", &["viewer"]), resource("document", "d1"), &["documents:read"]));
    let result = &resp.results["documents:read"];
    assert_eq!(result.effect, Effect::Allow);
    assert_eq!(result.meta.matched_rule.as_deref(), Some("R1"));
}

#[test]
fn scenario_2_deny_override_via_wildcard() {
    let engine = AuthzEngine::new();
    engine
        .load(&[resource_policy(
            "documents",
            "document",
            vec![
                rule(&["*:read"], PolicyEffect::Allow, &["reader"], &[], "A"),
                rule(&["*:delete"], PolicyEffect::Deny, &["user"], &[], "D"),
            ],
        )])
        .unwrap();

    let resp = engine.check(&request(
        principal("u1", &["user", "reader"]),
        resource("document", "d1"),
        &["documents:read", "documents:delete"],
    ));
    assert_eq!(resp.results["documents:read"].effect, Effect::Allow);
    assert_eq!(resp.results["documents:delete"].effect, Effect::Deny);
}

#[test]
fn scenario_3_derived_role_with_condition() {
    let engine = AuthzEngine::new();
    let derived_roles = Policy::DerivedRoles {
        api_version: API_VERSION.to_string(),
        metadata: metadata("roles"),
        spec: DerivedRolesSpec {
            definitions: vec![DerivedRoleDefinition {
                name: "owner".into(),
                parent_roles: vec!["user".into()],
                condition: Condition { expression: "resource.attributes.ownerId == principal.id".into() },
            }],
        },
    };
    let resource_pol = resource_policy(
        "documents",
        "document",
        vec![rule(&["delete"], PolicyEffect::Allow, &[], &["owner"], "R1")],
    );
    engine.load(&[derived_roles, resource_pol]).unwrap();

    let mut owned = resource("document", "d1");
    owned.attributes.insert("ownerId".into(), authz_engine::Value::String("u1".into()));
    let resp_a = engine.check(&request(principal("u1", &["user"]), owned, &["delete"]));
    assert_eq!(resp_a.results["delete"].effect, Effect::Allow);

    let mut not_owned = resource("document", "d1");
    not_owned.attributes.insert("ownerId".into(), authz_engine::Value::String("u2".into()));
    let resp_b = engine.check(&request(principal("u1", &["user"]), not_owned, &["delete"]));
    assert_eq!(resp_b.results["delete"].effect, Effect::Deny);
}

#[test]
fn scenario_4_wildcard_non_greediness() {
    let engine = AuthzEngine::new();
    engine
        .load(&[resource_policy(
            "api",
            "api",
            vec![rule(&["api:*:read"], PolicyEffect::Allow, &["user"], &[], "R1")],
        )])
        .unwrap();

    let resp = engine.check(&request(
        principal("u1", &["user"]),
        resource("api", "r1"),
        &["api:users:posts:read", "api:users:read"],
    ));
    assert_eq!(resp.results["api:users:posts:read"].effect, Effect::Deny);
    assert_eq!(resp.results["api:users:read"].effect, Effect::Allow);
}

#[test]
fn scenario_5_circular_derived_roles_rejected_at_validation() {
    let make = |name: &str, parent: &str| DerivedRoleDefinition {
        name: name.to_string(),
        parent_roles: vec![parent.to_string()],
        condition: Condition { expression: "true".into() },
    };
    let policy = Policy::DerivedRoles {
        api_version: API_VERSION.to_string(),
        metadata: metadata("roles"),
        spec: DerivedRolesSpec { definitions: vec![make("A", "B"), make("B", "C"), make("C", "A")] },
    };

    let report = authz_engine::validate_policy(&policy, &authz_engine::ValidatorOptions::default());
    assert!(!report.valid);
    assert!(report
        .errors
        .iter()
        .any(|e| matches!(e.code, authz_engine::policy::ErrorCode::CircularDependency)));
}

#[test]
fn scenario_6_unknown_resource_kind_is_default_deny() {
    let engine = AuthzEngine::new();
    engine
        .load(&[resource_policy("documents", "document", vec![rule(&["read"], PolicyEffect::Allow, &["viewer"], &[], "R1")])])
        .unwrap();

    let resp = engine.check(&request(principal("u1", &["viewer"]), resource("unknown", "x"), &["read"]));
    assert_eq!(resp.results["read"].effect, Effect::Deny);
    assert_eq!(resp.results["read"].policy, "default-deny");
}

#[test]
fn principal_policy_allow_overrides_resource_policy_deny() {
    let engine = AuthzEngine::new();
    let principal_pol = Policy::PrincipalPolicy {
        api_version: API_VERSION.to_string(),
        metadata: metadata("alice-overrides"),
        spec: authz_engine::policy::types::PrincipalPolicySpec {
            principal: "u1".into(),
            version: None,
            rules: HashMap::from([(
                "document".to_string(),
                vec![rule(&["documents:delete"], PolicyEffect::Allow, &[], &[], "P1")],
            )]),
        },
    };
    let resource_pol = resource_policy(
        "documents",
        "document",
        vec![rule(&["documents:*"], PolicyEffect::Deny, &[], &[], "D1")],
    );
    engine.load(&[principal_pol, resource_pol]).unwrap();

    let resp = engine.check(&request(principal("u1", &[]), resource("document", "d1"), &["documents:delete"]));
    assert_eq!(resp.results["documents:delete"].effect, Effect::Allow);
    assert_eq!(resp.results["documents:delete"].policy, "alice-overrides");
}

#[test]
fn principal_policy_deny_is_final() {
    let engine = AuthzEngine::new();
    let principal_pol = Policy::PrincipalPolicy {
        api_version: API_VERSION.to_string(),
        metadata: metadata("alice-blocks"),
        spec: authz_engine::policy::types::PrincipalPolicySpec {
            principal: "u1".into(),
            version: None,
            rules: HashMap::from([(
                "document".to_string(),
                vec![rule(&["documents:delete"], PolicyEffect::Deny, &[], &[], "P1")],
            )]),
        },
    };
    let resource_pol = resource_policy(
        "documents",
        "document",
        vec![rule(&["documents:*"], PolicyEffect::Allow, &[], &[], "R1")],
    );
    engine.load(&[principal_pol, resource_pol]).unwrap();

    let resp = engine.check(&request(principal("u1", &[]), resource("document", "d1"), &["documents:delete"]));
    assert_eq!(resp.results["documents:delete"].effect, Effect::Deny);
    assert_eq!(resp.results["documents:delete"].policy, "alice-blocks");
}
