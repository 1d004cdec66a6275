//! Compiled derived-role definition: the form the Policy Index stores,
//! with the condition pre-parsed to an AST and each parent-role pattern
//! pre-classified into its matcher shape.

use crate::expr::Expr;

#[derive(Debug, Clone)]
pub struct CompiledDerivedRole {
    pub name: String,
    pub parent_roles: Vec<CompiledParentPattern>,
    pub condition: Expr,
}

/// A parent-role pattern compiled once at index-build time. Parent-role
/// patterns are restricted at validation time to exactly these three
/// shapes, narrower than the general action wildcard grammar.
#[derive(Debug, Clone)]
pub enum CompiledParentPattern {
    MatchAny,
    Prefix(String),
    Literal(String),
}

pub fn compile_parent_pattern(pattern: &str) -> CompiledParentPattern {
    if pattern == "*" {
        return CompiledParentPattern::MatchAny;
    }
    if let Some(prefix) = pattern.strip_suffix(":*") {
        return CompiledParentPattern::Prefix(prefix.to_string());
    }
    CompiledParentPattern::Literal(pattern.to_string())
}

/// Does `role` satisfy compiled parent-role pattern `pattern`?
pub fn parent_role_matches(pattern: &CompiledParentPattern, role: &str) -> bool {
    match pattern {
        CompiledParentPattern::MatchAny => true,
        CompiledParentPattern::Prefix(prefix) => {
            role.starts_with(prefix.as_str()) && role[prefix.len()..].starts_with(':')
        }
        CompiledParentPattern::Literal(literal) => literal == role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_star_matches_anything() {
        let p = compile_parent_pattern("*");
        assert!(parent_role_matches(&p, "admin"));
        assert!(parent_role_matches(&p, "admin:region1"));
    }

    #[test]
    fn prefix_star_matches_prefixed_roles() {
        let p = compile_parent_pattern("admin:*");
        assert!(parent_role_matches(&p, "admin:region1"));
        assert!(!parent_role_matches(&p, "administrator"));
        assert!(!parent_role_matches(&p, "admin"));
    }

    #[test]
    fn literal_pattern_requires_exact_match() {
        let p = compile_parent_pattern("user");
        assert!(parent_role_matches(&p, "user"));
        assert!(!parent_role_matches(&p, "users"));
    }
}
