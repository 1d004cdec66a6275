//! The validated policy schema and static validator.

pub mod types;
pub mod validator;

pub use types::{
    Condition, DerivedRoleDefinition, DerivedRolesSpec, Effect, Metadata, Policy, PrincipalPolicySpec, Rule,
    ResourcePolicySpec, API_VERSION,
};
pub use validator::{validate_policies, validate_policy, ErrorCode, ValidationError, ValidationReport, ValidatorOptions};
