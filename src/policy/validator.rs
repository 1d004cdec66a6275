//! Static policy validation: structural, syntactic, and semantic checks
//! over a batch of parsed policies, producing a `ValidationReport`.

use super::types::{Policy, Rule, API_VERSION};
use crate::derived_roles::graph::find_cycle;
use crate::expr::parser;
use crate::wildcard;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*(:[A-Za-z0-9_-]+)*$").expect("static regex"));

const RESERVED_KEYWORDS: &[&str] = &["true", "false", "null", "undefined", "NaN"];
const VALID_KINDS: &[&str] = &["ResourcePolicy", "DerivedRoles", "PrincipalPolicy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    MissingRequiredField,
    InvalidEffect,
    InvalidCelSyntax,
    InvalidRoleName,
    InvalidActionName,
    InvalidApiVersion,
    InvalidKind,
    UndefinedDerivedRole,
    CircularDependency,
    DuplicateDefinition,
    EmptyArray,
    EmptyExpression,
    ReservedKeyword,
    UnknownVariable,
    InvalidPolicyName,
    InvalidResourceName,
    InvalidParentRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
}

impl ValidationError {
    fn new(code: ErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
            suggestion: None,
            location: None,
            context: None,
            policy_name: None,
        }
    }

    fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    fn with_policy_name(mut self, name: impl Into<String>) -> Self {
        self.policy_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ValidationReport {
    fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }
}

#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    pub strict: bool,
    pub warn_on_unknown_variables: bool,
    pub known_variables: Vec<String>,
    pub validate_cel: bool,
    pub available_derived_roles: Vec<String>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            strict: false,
            warn_on_unknown_variables: false,
            known_variables: Vec::new(),
            validate_cel: true,
            available_derived_roles: Vec::new(),
        }
    }
}

/// Validate a single policy document in isolation. Cross-policy checks
/// (duplicate/undefined derived roles, cycles) require `validate_policies`.
pub fn validate_policy(policy: &Policy, options: &ValidatorOptions) -> ValidationReport {
    validate_policies(std::slice::from_ref(policy), options)
}

/// Validate a batch of policies together, cross-referencing derived roles
/// across documents. The batch is rejected atomically: callers should only
/// load `policies` into the index when `report.valid` is `true`.
pub fn validate_policies(policies: &[Policy], options: &ValidatorOptions) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut derived_role_names: HashSet<String> = options.available_derived_roles.iter().cloned().collect();
    let mut derived_role_defs = Vec::new();
    let mut seen_derived_role_names: HashMap<String, ()> = HashMap::new();

    for policy in policies {
        check_structural(policy, options, &mut report);
    }

    for policy in policies {
        if let Policy::DerivedRoles { spec, metadata, .. } = policy {
            for def in &spec.definitions {
                if seen_derived_role_names.insert(def.name.clone(), ()).is_some() {
                    report.errors.push(
                        ValidationError::new(
                            ErrorCode::DuplicateDefinition,
                            format!("definitions[{}]", def.name),
                            format!("derived role '{}' is defined more than once", def.name),
                        )
                        .with_policy_name(metadata.name.clone()),
                    );
                } else {
                    derived_role_names.insert(def.name.clone());
                    derived_role_defs.push((metadata.name.clone(), def.clone()));
                }
            }
        }
    }

    for (policy_name, def) in &derived_role_defs {
        check_derived_role_syntax(def, policy_name, options, &mut report);
    }

    if let Some(cycle) = find_cycle(&derived_role_defs.iter().map(|(_, d)| d.clone()).collect::<Vec<_>>()) {
        report.errors.push(ValidationError::new(
            ErrorCode::CircularDependency,
            "definitions",
            format!("circular dependency among derived roles: {}", cycle.join(" -> ")),
        ));
    }

    for policy in policies {
        check_semantic(policy, &derived_role_names, options, &mut report);
    }

    report.finish()
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && IDENTIFIER_RE.is_match(name)
}

fn is_reserved(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(&name)
}

fn check_structural(policy: &Policy, options: &ValidatorOptions, report: &mut ValidationReport) {
    let metadata = policy.metadata();
    let policy_name = metadata.name.clone();

    if policy.api_version() != API_VERSION {
        report.errors.push(
            ValidationError::new(
                ErrorCode::InvalidApiVersion,
                "apiVersion",
                format!("unsupported apiVersion '{}'", policy.api_version()),
            )
            .with_suggestion(API_VERSION)
            .with_policy_name(policy_name.clone()),
        );
    }

    if !VALID_KINDS.contains(&policy.kind_name()) {
        let suggestion = closest_by_edit_distance(policy.kind_name(), VALID_KINDS);
        report.errors.push(
            ValidationError::new(ErrorCode::InvalidKind, "kind", format!("unknown kind '{}'", policy.kind_name()))
                .with_suggestion(suggestion)
                .with_policy_name(policy_name.clone()),
        );
    }

    if metadata.name.is_empty() {
        report.errors.push(
            ValidationError::new(ErrorCode::MissingRequiredField, "metadata.name", "metadata.name is required")
                .with_policy_name(policy_name.clone()),
        );
    } else if !is_valid_identifier(&metadata.name) {
        report.errors.push(
            ValidationError::new(
                ErrorCode::InvalidPolicyName,
                "metadata.name",
                format!("'{}' is not a valid policy name", metadata.name),
            )
            .with_policy_name(policy_name.clone()),
        );
    }

    match policy {
        Policy::ResourcePolicy { spec, .. } => {
            if !is_valid_identifier(&spec.resource) {
                report.errors.push(
                    ValidationError::new(
                        ErrorCode::InvalidResourceName,
                        "spec.resource",
                        format!("'{}' is not a valid resource name", spec.resource),
                    )
                    .with_policy_name(policy_name.clone()),
                );
            }
            if spec.rules.is_empty() {
                report.errors.push(
                    ValidationError::new(ErrorCode::EmptyArray, "spec.rules", "spec.rules must not be empty")
                        .with_policy_name(policy_name.clone()),
                );
            }
            for (i, rule) in spec.rules.iter().enumerate() {
                check_rule_structural(rule, &format!("spec.rules[{i}]"), &policy_name, options, report);
            }
        }
        Policy::DerivedRoles { spec, .. } => {
            if spec.definitions.is_empty() {
                report.errors.push(
                    ValidationError::new(
                        ErrorCode::EmptyArray,
                        "spec.definitions",
                        "spec.definitions must not be empty",
                    )
                    .with_policy_name(policy_name.clone()),
                );
            }
        }
        Policy::PrincipalPolicy { spec, .. } => {
            if !is_valid_identifier(&spec.principal) {
                report.errors.push(
                    ValidationError::new(
                        ErrorCode::MissingRequiredField,
                        "spec.principal",
                        format!("'{}' is not a valid principal identifier", spec.principal),
                    )
                    .with_policy_name(policy_name.clone()),
                );
            }
            for (kind, rules) in &spec.rules {
                for (i, rule) in rules.iter().enumerate() {
                    check_rule_structural(rule, &format!("spec.rules.{kind}[{i}]"), &policy_name, options, report);
                }
            }
        }
    }
}

fn check_rule_structural(
    rule: &Rule,
    path: &str,
    policy_name: &str,
    options: &ValidatorOptions,
    report: &mut ValidationReport,
) {
    if rule.actions.is_empty() {
        report.errors.push(
            ValidationError::new(ErrorCode::EmptyArray, format!("{path}.actions"), "actions must not be empty")
                .with_policy_name(policy_name),
        );
    }
    for action in &rule.actions {
        if !is_valid_action_pattern(action) {
            report.errors.push(
                ValidationError::new(
                    ErrorCode::InvalidActionName,
                    format!("{path}.actions"),
                    format!("'{action}' is not a valid action pattern"),
                )
                .with_policy_name(policy_name),
            );
        }
    }
    for role in &rule.roles {
        if !is_valid_identifier(role) || role.contains('*') {
            report.errors.push(
                ValidationError::new(
                    ErrorCode::InvalidRoleName,
                    format!("{path}.roles"),
                    format!("'{role}' is not a valid role name"),
                )
                .with_policy_name(policy_name),
            );
        } else if is_reserved(role) {
            report.errors.push(
                ValidationError::new(
                    ErrorCode::ReservedKeyword,
                    format!("{path}.roles"),
                    format!("'{role}' is a reserved keyword"),
                )
                .with_policy_name(policy_name),
            );
        }
    }

    if options.strict && rule.roles.is_empty() && rule.derived_roles.is_empty() {
        report.warnings.push(
            ValidationError::new(
                ErrorCode::MissingRequiredField,
                format!("{path}"),
                "rule with no roles or derivedRoles applies to all roles",
            )
            .with_policy_name(policy_name),
        );
    }

    if let Some(condition) = &rule.condition {
        check_expression_syntax(
            &condition.expression,
            &format!("{path}.condition.expression"),
            policy_name,
            options,
            report,
        );
    }
}

fn is_valid_action_pattern(action: &str) -> bool {
    if wildcard::is_match_any(action) {
        return true;
    }
    action.split(':').all(|segment| segment == "*" || (!segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')))
}

fn check_expression_syntax(
    expression: &str,
    path: &str,
    policy_name: &str,
    options: &ValidatorOptions,
    report: &mut ValidationReport,
) {
    if expression.trim().is_empty() {
        report.errors.push(
            ValidationError::new(ErrorCode::EmptyExpression, path, "condition expression must not be empty")
                .with_policy_name(policy_name),
        );
        return;
    }
    if !options.validate_cel {
        return;
    }
    if let Err(err) = parser::parse(expression) {
        report.errors.push(
            ValidationError::new(ErrorCode::InvalidCelSyntax, path, err.message.clone())
                .with_policy_name(policy_name),
        );
    }
}

fn check_derived_role_syntax(
    def: &super::types::DerivedRoleDefinition,
    policy_name: &str,
    options: &ValidatorOptions,
    report: &mut ValidationReport,
) {
    if !is_valid_derived_role_name(&def.name) {
        report.errors.push(
            ValidationError::new(
                ErrorCode::InvalidRoleName,
                format!("definitions[{}].name", def.name),
                format!("'{}' is not a valid derived role name", def.name),
            )
            .with_policy_name(policy_name),
        );
    }
    if def.parent_roles.is_empty() {
        report.errors.push(
            ValidationError::new(
                ErrorCode::EmptyArray,
                format!("definitions[{}].parentRoles", def.name),
                "parentRoles must not be empty",
            )
            .with_policy_name(policy_name),
        );
    }
    for parent in &def.parent_roles {
        if !is_valid_parent_role_pattern(parent) {
            report.errors.push(
                ValidationError::new(
                    ErrorCode::InvalidParentRole,
                    format!("definitions[{}].parentRoles", def.name),
                    format!("'{parent}' is not a valid parent role pattern"),
                )
                .with_policy_name(policy_name),
            );
        }
    }
    check_expression_syntax(
        &def.condition.expression,
        &format!("definitions[{}].condition.expression", def.name),
        policy_name,
        options,
        report,
    );
}

fn is_valid_derived_role_name(name: &str) -> bool {
    if name.is_empty() || name.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        return false;
    }
    is_valid_identifier(name) && !is_reserved(name)
}

/// Only `*` (full segment) or `prefix:*` (trailing) are valid parent-role
/// patterns; embedded wildcards like `admin*` or `admin:*:role` are not.
fn is_valid_parent_role_pattern(pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(":*") {
        return !prefix.is_empty() && !prefix.contains('*') && is_valid_identifier(prefix);
    }
    !pattern.contains('*') && is_valid_identifier(pattern)
}

fn check_semantic(
    policy: &Policy,
    derived_role_names: &HashSet<String>,
    options: &ValidatorOptions,
    report: &mut ValidationReport,
) {
    let policy_name = policy.metadata().name.clone();

    let rules: Vec<(&Rule, String)> = match policy {
        Policy::ResourcePolicy { spec, .. } => {
            spec.rules.iter().enumerate().map(|(i, r)| (r, format!("spec.rules[{i}]"))).collect()
        }
        Policy::PrincipalPolicy { spec, .. } => spec
            .rules
            .iter()
            .flat_map(|(kind, rules)| {
                rules.iter().enumerate().map(move |(i, r)| (r, format!("spec.rules.{kind}[{i}]")))
            })
            .collect(),
        Policy::DerivedRoles { .. } => Vec::new(),
    };

    for (rule, path) in rules {
        for derived in &rule.derived_roles {
            if !derived_role_names.contains(derived) {
                report.errors.push(
                    ValidationError::new(
                        ErrorCode::UndefinedDerivedRole,
                        format!("{path}.derivedRoles"),
                        format!("derived role '{derived}' is not defined in this corpus"),
                    )
                    .with_policy_name(policy_name.clone()),
                );
            }
        }

        if let Some(condition) = &rule.condition {
            if options.validate_cel && options.warn_on_unknown_variables {
                check_unknown_variables(&condition.expression, &path, &policy_name, options, report);
            }
        }

        if options.strict && metadata_name_is_long(&policy_name) {
            report.warnings.push(
                ValidationError::new(ErrorCode::InvalidPolicyName, "metadata.name", "policy name is unusually long")
                    .with_policy_name(policy_name.clone()),
            );
        }
    }
}

fn metadata_name_is_long(name: &str) -> bool {
    name.len() > 128
}

fn check_unknown_variables(
    expression: &str,
    path: &str,
    policy_name: &str,
    options: &ValidatorOptions,
    report: &mut ValidationReport,
) {
    let Ok(ast) = parser::parse(expression) else { return };
    let mut known: HashSet<&str> = ["principal", "resource", "request"].into_iter().collect();
    for extra in &options.known_variables {
        known.insert(extra.as_str());
    }
    let mut roots = Vec::new();
    collect_path_roots(&ast, &mut roots);
    for root in roots {
        if !known.contains(root.as_str()) {
            report.warnings.push(
                ValidationError::new(
                    ErrorCode::UnknownVariable,
                    path,
                    format!("'{root}' is not a known variable root"),
                )
                .with_policy_name(policy_name),
            );
        }
    }
}

fn collect_path_roots(expr: &crate::expr::Expr, out: &mut Vec<String>) {
    use crate::expr::ast::Expr as E;
    match expr {
        E::Literal(_) => {}
        E::Path(segments) => {
            if let Some(root) = segments.first() {
                out.push(root.clone());
            }
        }
        E::Unary { inner, .. } => collect_path_roots(inner, out),
        E::Binary { lhs, rhs, .. } => {
            collect_path_roots(lhs, out);
            collect_path_roots(rhs, out);
        }
    }
}

fn closest_by_edit_distance(input: &str, candidates: &[&str]) -> String {
    candidates
        .iter()
        .min_by_key(|candidate| levenshtein(input, candidate))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        dp[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1).min(dp[i][j - 1] + 1).min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}
