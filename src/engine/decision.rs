//! Request/response types for `AuthzEngine::check`.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub principal: Principal,
    pub resource: Resource,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub derived_roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub effect: Effect,
    pub policy: String,
    pub meta: ActionMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub evaluation_duration_ms: f64,
    pub policies_evaluated: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub request_id: String,
    pub results: HashMap<String, ActionResult>,
    pub meta: ResponseMeta,
}

impl Principal {
    pub fn attributes_value(&self) -> Value {
        Value::Map(self.attributes.clone().into_iter().collect())
    }

    pub fn as_value(&self) -> Value {
        let mut map = std::collections::BTreeMap::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert(
            "roles".to_string(),
            Value::List(self.roles.iter().map(|r| Value::String(r.clone())).collect()),
        );
        map.insert("attributes".to_string(), self.attributes_value());
        Value::Map(map)
    }
}

impl Resource {
    pub fn attributes_value(&self) -> Value {
        Value::Map(self.attributes.clone().into_iter().collect())
    }

    pub fn as_value(&self) -> Value {
        let mut map = std::collections::BTreeMap::new();
        map.insert("kind".to_string(), Value::String(self.kind.clone()));
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("attributes".to_string(), self.attributes_value());
        Value::Map(map)
    }
}
