//! Decision engine throughput: 100-rule lookup < 5 ms, multi-action
//! request (5 actions, 3 wildcards) < 1 ms.

use authz_engine::engine::{CheckRequest, Principal, Resource};
use authz_engine::policy::types::{
    Condition, Effect, Metadata, Policy, ResourcePolicySpec, Rule, API_VERSION,
};
use authz_engine::AuthzEngine;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;

fn resource_policy_with_rules(count: usize) -> Policy {
    let rules = (0..count)
        .map(|i| Rule {
            actions: vec![format!("documents:action-{}", i % 10), "documents:*:read".into()],
            effect: if i % 5 == 0 { Effect::Deny } else { Effect::Allow },
            roles: vec![format!("role-{}", i % 20)],
            derived_roles: vec![],
            condition: if i % 3 == 0 {
                Some(Condition { expression: "principal.attributes.department == resource.attributes.department".into() })
            } else {
                None
            },
            name: Some(format!("R{i}")),
        })
        .collect();

    Policy::ResourcePolicy {
        api_version: API_VERSION.to_string(),
        metadata: Metadata { name: "bench".into(), description: None, version: None, labels: HashMap::new() },
        spec: ResourcePolicySpec { resource: "document".into(), rules },
    }
}

fn bench_rule_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_lookup");
    for &count in &[10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("rules", count), &count, |b, &count| {
            let engine = AuthzEngine::new();
            engine.load(&[resource_policy_with_rules(count)]).unwrap();

            let request = CheckRequest {
                request_id: None,
                principal: Principal {
                    id: "u1".into(),
                    roles: vec!["role-5".into()],
                    attributes: Default::default(),
                },
                resource: Resource { kind: "document".into(), id: "d1".into(), attributes: Default::default() },
                actions: vec!["documents:action-5".into()],
            };

            b.iter(|| black_box(engine.check(black_box(&request))));
        });
    }
    group.finish();
}

fn bench_multi_action_request(c: &mut Criterion) {
    let engine = AuthzEngine::new();
    engine.load(&[resource_policy_with_rules(100)]).unwrap();

    let request = CheckRequest {
        request_id: None,
        principal: Principal { id: "u1".into(), roles: vec!["role-5".into()], attributes: Default::default() },
        resource: Resource { kind: "document".into(), id: "d1".into(), attributes: Default::default() },
        actions: vec![
            "documents:action-1".into(),
            "documents:action-2".into(),
            "documents:x:read".into(),
            "documents:y:read".into(),
            "documents:z:read".into(),
        ],
    };

    c.bench_function("multi_action_request", |b| {
        b.iter(|| black_box(engine.check(black_box(&request))));
    });
}

criterion_group!(benches, bench_rule_lookup, bench_multi_action_request);
criterion_main!(benches);
