//! The validated policy schema: the three policy kinds and their shared
//! pieces. These are the types an external YAML/JSON parser is expected to
//! produce — the engine itself never touches raw documents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const API_VERSION: &str = "authz.engine/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub expression: String,
}

/// One rule inside a resource or principal policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub actions: Vec<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePolicySpec {
    pub resource: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRoleDefinition {
    pub name: String,
    /// Identifiers or wildcard patterns (`*`, `prefix:*`). Matching against
    /// an applicable role is OR across this list — see
    /// `derived_roles::resolver`.
    pub parent_roles: Vec<String>,
    pub condition: Condition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRolesSpec {
    pub definitions: Vec<DerivedRoleDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalPolicySpec {
    pub principal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Principal-scoped rules, indexed by resource kind.
    pub rules: HashMap<String, Vec<Rule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Policy {
    ResourcePolicy {
        #[serde(rename = "apiVersion")]
        api_version: String,
        metadata: Metadata,
        spec: ResourcePolicySpec,
    },
    DerivedRoles {
        #[serde(rename = "apiVersion")]
        api_version: String,
        metadata: Metadata,
        spec: DerivedRolesSpec,
    },
    PrincipalPolicy {
        #[serde(rename = "apiVersion")]
        api_version: String,
        metadata: Metadata,
        spec: PrincipalPolicySpec,
    },
}

impl Policy {
    pub fn api_version(&self) -> &str {
        match self {
            Policy::ResourcePolicy { api_version, .. }
            | Policy::DerivedRoles { api_version, .. }
            | Policy::PrincipalPolicy { api_version, .. } => api_version,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Policy::ResourcePolicy { metadata, .. }
            | Policy::DerivedRoles { metadata, .. }
            | Policy::PrincipalPolicy { metadata, .. } => metadata,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Policy::ResourcePolicy { .. } => "ResourcePolicy",
            Policy::DerivedRoles { .. } => "DerivedRoles",
            Policy::PrincipalPolicy { .. } => "PrincipalPolicy",
        }
    }
}
