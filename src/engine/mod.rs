//! The decision engine: evaluates a `CheckRequest` against the loaded
//! Policy Index. Synchronous, re-entrant, pure function of
//! (index, request) plus the side channel of `metrics`.

pub mod decision;
pub mod metrics;

pub use decision::{ActionMeta, ActionResult, CheckRequest, CheckResponse, Effect, Principal, Resource, ResponseMeta};
pub use metrics::EngineMetrics;

use crate::derived_roles::{self, CompiledDerivedRole, MemoCache, ResolveKey};
use crate::error::Result;
use crate::expr::{self, eval, EvalContext};
use crate::index::{CompiledRule, IndexStats, PolicyIndex};
use crate::policy::types::{Effect as PolicyEffect, Policy};
use crate::wildcard;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::time::Instant;
use tracing::{debug, warn};

enum RuleOutcome<'a> {
    Allow(&'a CompiledRule),
    Deny(&'a CompiledRule),
    Error(String),
    NoMatch,
}

/// The decision engine. Holds an immutable, swappable Policy Index and an
/// expression-compilation cache shared across loads.
pub struct AuthzEngine {
    index: RwLock<PolicyIndex>,
    expr_engine: expr::Engine,
    metrics: EngineMetrics,
}

impl Default for AuthzEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthzEngine {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(PolicyIndex::empty()),
            expr_engine: expr::Engine::new(),
            metrics: EngineMetrics::new(),
        }
    }

    /// Replace the loaded policy batch wholesale. Must not be called
    /// concurrently with `check` — callers are expected to hold exclusive
    /// access during a reload (the index itself uses a reader/writer lock
    /// to enforce this at the data level).
    pub fn load(&self, policies: &[Policy]) -> Result<()> {
        let new_index = PolicyIndex::build(policies, &self.expr_engine)?;
        let mut guard = self.index.write().expect("policy index lock poisoned");
        *guard = new_index;
        Ok(())
    }

    /// Loads a batch containing only resource policies, merging it into
    /// whatever is already loaded rather than replacing the whole index —
    /// an empty `policies` is a true no-op. Callers that want to replace
    /// the entire corpus atomically should call `load` directly.
    pub fn load_resource_policies(&self, policies: Vec<Policy>) -> Result<()> {
        self.load_into_existing(&policies)
    }

    pub fn load_derived_roles_policies(&self, policies: Vec<Policy>) -> Result<()> {
        self.load_into_existing(&policies)
    }

    pub fn load_principal_policies(&self, policies: Vec<Policy>) -> Result<()> {
        self.load_into_existing(&policies)
    }

    fn load_into_existing(&self, policies: &[Policy]) -> Result<()> {
        let addition = PolicyIndex::build(policies, &self.expr_engine)?;
        let mut guard = self.index.write().expect("policy index lock poisoned");
        guard.merge(addition);
        Ok(())
    }

    pub fn clear_policies(&self) {
        let mut guard = self.index.write().expect("policy index lock poisoned");
        *guard = PolicyIndex::empty();
    }

    pub fn stats(&self) -> IndexStats {
        self.index.read().expect("policy index lock poisoned").stats()
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Synchronous, re-entrant; safe to call concurrently from multiple
    /// threads against the same engine as long as no `load`/`clear_policies`
    /// call races it.
    pub fn check(&self, request: &CheckRequest) -> CheckResponse {
        let started = Instant::now();
        self.metrics.record_check();

        let index = self.index.read().expect("policy index lock poisoned");
        let principal_value = request.principal.as_value();
        let resource_value = request.resource.as_value();
        let ctx = EvalContext::new(&principal_value, &resource_value);

        let definitions = index.derived_role_definitions();
        let mut memo = MemoCache::new();
        let mut policies_evaluated: Vec<String> = Vec::new();
        let mut results = HashMap::with_capacity(request.actions.len());

        for action in &request.actions {
            let key = ResolveKey::new(
                &request.principal.id,
                &request.principal.roles,
                &request.resource.kind,
                &request.resource.id,
            );
            let derived_roles = memo.get_or_compute(key, || {
                resolve_derived(&definitions, &request.principal.roles, &ctx)
            });

            let (result, evaluated_policy) =
                self.evaluate_action(&index, action, request, &derived_roles, &ctx);
            if let Some(name) = evaluated_policy {
                if !policies_evaluated.contains(&name) {
                    policies_evaluated.push(name);
                }
            }
            let allowed = result.effect == Effect::Allow;
            self.metrics.record_action(allowed, result.meta.error.is_some());
            results.insert(action.clone(), result);
        }

        debug!(
            derived_role_cache_hits = memo.hits(),
            derived_role_cache_misses = memo.misses(),
            "check completed"
        );

        CheckResponse {
            request_id: request.request_id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            results,
            meta: ResponseMeta {
                evaluation_duration_ms: started.elapsed().as_secs_f64() * 1000.0,
                policies_evaluated,
            },
        }
    }

    fn evaluate_action(
        &self,
        index: &PolicyIndex,
        action: &str,
        request: &CheckRequest,
        derived_roles: &BTreeSet<String>,
        ctx: &EvalContext<'_>,
    ) -> (ActionResult, Option<String>) {
        if let Some(principal_rules) = index.principal_rules(&request.principal.id, &request.resource.kind) {
            match evaluate_rule_set(principal_rules, action, &request.principal, derived_roles, ctx) {
                RuleOutcome::Deny(rule) => {
                    return (deny_result(rule, None), Some(rule.policy_name.clone()));
                }
                RuleOutcome::Allow(rule) => {
                    return (allow_result(rule), Some(rule.policy_name.clone()));
                }
                RuleOutcome::Error(message) => {
                    warn!(action, error = %message, "condition evaluation failed; failing closed");
                    return (error_result(message), None);
                }
                RuleOutcome::NoMatch => {}
            }
        }

        let Some(resource_rules) = index.resource_rules(&request.resource.kind) else {
            return (default_deny(), None);
        };

        match evaluate_rule_set(resource_rules, action, &request.principal, derived_roles, ctx) {
            RuleOutcome::Deny(rule) => (deny_result(rule, Some(derived_roles)), Some(rule.policy_name.clone())),
            RuleOutcome::Allow(rule) => (allow_result(rule), Some(rule.policy_name.clone())),
            RuleOutcome::Error(message) => {
                warn!(action, error = %message, "condition evaluation failed; failing closed");
                (error_result(message), None)
            }
            RuleOutcome::NoMatch => (default_deny(), None),
        }
    }
}

fn resolve_derived(
    definitions: &[&CompiledDerivedRole],
    base_roles: &[String],
    ctx: &EvalContext<'_>,
) -> BTreeSet<String> {
    let owned: Vec<CompiledDerivedRole> = definitions.iter().map(|d| (*d).clone()).collect();
    derived_roles::resolve(&owned, base_roles, ctx)
}

fn evaluate_rule_set<'a>(
    rules: &'a [CompiledRule],
    action: &str,
    principal: &Principal,
    derived_roles: &BTreeSet<String>,
    ctx: &EvalContext<'_>,
) -> RuleOutcome<'a> {
    let mut first_allow: Option<&CompiledRule> = None;

    for rule in rules {
        if !action_matches(rule, action) {
            continue;
        }
        if !role_matches(rule, principal, derived_roles) {
            continue;
        }
        let holds = match &rule.condition {
            None => true,
            Some(expr) => match eval::evaluate(expr, ctx) {
                Ok(b) => b,
                Err(e) => return RuleOutcome::Error(e.to_string()),
            },
        };
        if !holds {
            continue;
        }
        match rule.effect {
            PolicyEffect::Deny => return RuleOutcome::Deny(rule),
            PolicyEffect::Allow => {
                first_allow.get_or_insert(rule);
            }
        }
    }

    match first_allow {
        Some(rule) => RuleOutcome::Allow(rule),
        None => RuleOutcome::NoMatch,
    }
}

fn action_matches(rule: &CompiledRule, action: &str) -> bool {
    rule.actions.iter().any(|pattern| wildcard::matches_compiled(pattern, action))
}

fn role_matches(rule: &CompiledRule, principal: &Principal, derived_roles: &BTreeSet<String>) -> bool {
    if rule.roles.is_empty() && rule.derived_roles.is_empty() {
        return true;
    }
    rule.roles.iter().any(|r| principal.roles.contains(r))
        || rule.derived_roles.iter().any(|d| derived_roles.contains(d))
}

fn allow_result(rule: &CompiledRule) -> ActionResult {
    ActionResult {
        effect: Effect::Allow,
        policy: rule.policy_name.clone(),
        meta: ActionMeta { matched_rule: rule.name.clone(), derived_roles: Vec::new(), error: None },
    }
}

fn deny_result(rule: &CompiledRule, derived_roles: Option<&BTreeSet<String>>) -> ActionResult {
    ActionResult {
        effect: Effect::Deny,
        policy: rule.policy_name.clone(),
        meta: ActionMeta {
            matched_rule: rule.name.clone(),
            derived_roles: derived_roles.map(|set| set.iter().cloned().collect()).unwrap_or_default(),
            error: None,
        },
    }
}

fn default_deny() -> ActionResult {
    ActionResult {
        effect: Effect::Deny,
        policy: "default-deny".to_string(),
        meta: ActionMeta::default(),
    }
}

fn error_result(message: String) -> ActionResult {
    ActionResult {
        effect: Effect::Deny,
        policy: "default-deny".to_string(),
        meta: ActionMeta { matched_rule: None, derived_roles: Vec::new(), error: Some(message) },
    }
}
