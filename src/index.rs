//! The policy index: compiles a validated policy batch into the
//! read-only tables the Decision Engine consults. Built once; immutable for
//! the lifetime of the loaded batch.

use crate::derived_roles::{self, CompiledDerivedRole};
use crate::error::{AuthzError, Result};
use crate::expr::{self, Expr};
use crate::policy::types::{Effect, Policy, Rule};
use crate::wildcard::{self, CompiledPattern};
use std::collections::HashMap;

/// A rule with its condition pre-parsed, its action patterns pre-compiled
/// into segment matchers, and its owning policy name attached for
/// provenance.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub policy_name: String,
    pub name: Option<String>,
    pub actions: Vec<CompiledPattern>,
    pub effect: Effect,
    pub roles: Vec<String>,
    pub derived_roles: Vec<String>,
    pub condition: Option<Expr>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub resource_policies: usize,
    pub derived_roles_policies: usize,
    pub principal_policies: usize,
    pub resource_kinds: usize,
}

/// Built once per loaded batch; read-only during `check`. Safe to share
/// across threads without locking.
#[derive(Debug, Default)]
pub struct PolicyIndex {
    resource_policies: HashMap<String, Vec<CompiledRule>>,
    derived_roles: HashMap<String, CompiledDerivedRole>,
    principal_policies: HashMap<String, HashMap<String, Vec<CompiledRule>>>,
    stats: IndexStats,
}

impl PolicyIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile a validated batch. Callers are expected to have already run
    /// the batch through `policy::validate_policies` and rejected it on
    /// failure — this never re-validates, only compiles.
    pub fn build(policies: &[Policy], expr_engine: &expr::Engine) -> Result<Self> {
        let mut index = Self::default();

        for policy in policies {
            match policy {
                Policy::ResourcePolicy { metadata, spec, .. } => {
                    index.stats.resource_policies += 1;
                    let compiled = compile_rules(&spec.rules, &metadata.name, expr_engine)?;
                    index.resource_policies.entry(spec.resource.clone()).or_default().extend(compiled);
                }
                Policy::DerivedRoles { metadata: _, spec, .. } => {
                    index.stats.derived_roles_policies += 1;
                    for def in &spec.definitions {
                        let condition = expr_engine
                            .compile(&def.condition.expression)
                            .map_err(|e| AuthzError::InvalidPolicy(format!("{}: {e}", def.name)))?;
                        let parent_roles =
                            def.parent_roles.iter().map(|p| derived_roles::compile_parent_pattern(p)).collect();
                        index.derived_roles.insert(
                            def.name.clone(),
                            CompiledDerivedRole { name: def.name.clone(), parent_roles, condition },
                        );
                    }
                }
                Policy::PrincipalPolicy { metadata, spec, .. } => {
                    index.stats.principal_policies += 1;
                    let by_kind = index.principal_policies.entry(spec.principal.clone()).or_default();
                    for (kind, rules) in &spec.rules {
                        let compiled = compile_rules(rules, &metadata.name, expr_engine)?;
                        by_kind.entry(kind.clone()).or_default().extend(compiled);
                    }
                }
            }
        }

        index.stats.resource_kinds = index.resource_policies.len();
        Ok(index)
    }

    /// Fold `other`'s compiled tables into `self`, additively. Used by the
    /// per-channel loaders (`load_resource_policies` and friends) so that
    /// loading one channel never clobbers what another channel already
    /// installed; an empty `other` is a true no-op. Derived-role
    /// definitions with a name already present are overwritten, matching
    /// `build`'s own last-write-wins behavior for duplicate names within a
    /// single batch.
    pub fn merge(&mut self, other: PolicyIndex) {
        for (kind, rules) in other.resource_policies {
            self.resource_policies.entry(kind).or_default().extend(rules);
        }
        for (name, def) in other.derived_roles {
            self.derived_roles.insert(name, def);
        }
        for (principal_id, by_kind) in other.principal_policies {
            let existing = self.principal_policies.entry(principal_id).or_default();
            for (kind, rules) in by_kind {
                existing.entry(kind).or_default().extend(rules);
            }
        }

        self.stats.resource_policies += other.stats.resource_policies;
        self.stats.derived_roles_policies += other.stats.derived_roles_policies;
        self.stats.principal_policies += other.stats.principal_policies;
        self.stats.resource_kinds = self.resource_policies.len();
    }

    pub fn resource_rules(&self, kind: &str) -> Option<&[CompiledRule]> {
        self.resource_policies.get(kind).map(Vec::as_slice)
    }

    pub fn principal_rules(&self, principal_id: &str, kind: &str) -> Option<&[CompiledRule]> {
        self.principal_policies.get(principal_id)?.get(kind).map(Vec::as_slice)
    }

    pub fn derived_role_definitions(&self) -> Vec<&CompiledDerivedRole> {
        self.derived_roles.values().collect()
    }

    pub fn resource_kinds(&self) -> impl Iterator<Item = &str> {
        self.resource_policies.keys().map(String::as_str)
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }
}

fn compile_rules(rules: &[Rule], policy_name: &str, expr_engine: &expr::Engine) -> Result<Vec<CompiledRule>> {
    rules
        .iter()
        .map(|rule| {
            let condition = rule
                .condition
                .as_ref()
                .map(|c| expr_engine.compile(&c.expression))
                .transpose()
                .map_err(|e| AuthzError::InvalidPolicy(format!("{}: {e}", policy_name)))?;
            Ok(CompiledRule {
                policy_name: policy_name.to_string(),
                name: rule.name.clone(),
                actions: rule.actions.iter().map(|a| wildcard::compile(a)).collect(),
                effect: rule.effect,
                roles: rule.roles.clone(),
                derived_roles: rule.derived_roles.clone(),
                condition,
            })
        })
        .collect()
}
