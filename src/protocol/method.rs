//! Callable method definitions

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CollabError, CollabResult};

/// Method definition as listed by `methods/list`
#[derive(Serialize, Debug, Clone)]
pub struct MethodDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "paramsSchema")]
    pub params_schema: Value,
}

impl MethodDefinition {
    pub fn new(name: &str, description: &str, params_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params_schema,
        }
    }
}

/// Server identity reported by `ping`
#[derive(Clone, Debug)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: String, version: String) -> Self {
        Self { name, version }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: crate::NAME.to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

/// A JSON-RPC method backed by the session registry
///
/// Every method must implement this trait to be registered with the server.
pub trait Method: Send + Sync {
    fn definition(&self) -> MethodDefinition;

    /// Run the method with the request's `params` (an empty object if absent)
    fn execute(&self, params: Value) -> CollabResult<Value>;

    fn name(&self) -> String {
        self.definition().name
    }
}

/// Decode method params, reporting shape errors as invalid params
pub fn parse_params<T: DeserializeOwned>(params: Value) -> CollabResult<T> {
    serde_json::from_value(params).map_err(|e| CollabError::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Deserialize)]
    struct Params {
        user_id: String,
    }

    #[test]
    fn test_parse_params() {
        let params: Params = parse_params(json!({"user_id": "u1"})).unwrap();
        assert_eq!(params.user_id, "u1");

        let err = parse_params::<Params>(json!({"user": 1})).err().unwrap();
        assert!(matches!(err, CollabError::InvalidParams(_)));
    }

    #[test]
    fn test_definition_serializes_schema_key() {
        let def = MethodDefinition::new("ping", "Liveness check", json!({"type": "object"}));
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["paramsSchema"]["type"], "object");
    }
}
