//! Lecturer assistance method

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CollabResult;
use crate::protocol::{parse_params, Method, MethodDefinition};
use crate::registry::SessionRegistry;

#[derive(Deserialize)]
struct AssistanceParams {
    session_id: String,
    user_id: String,
    message: Option<String>,
}

pub struct RequestAssistanceMethod {
    registry: Arc<SessionRegistry>,
}

impl RequestAssistanceMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for RequestAssistanceMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "request_assistance",
            "Ask a lecturer for help. Sets the session's assistance flag and notifies every participant.",
            json!({
                "type": "object",
                "properties": {
                    "session_id": { "type": "string" },
                    "user_id": { "type": "string" },
                    "message": { "type": "string" }
                },
                "required": ["session_id", "user_id"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: AssistanceParams = parse_params(params)?;
        self.registry.request_lecturer_assistance(
            &params.session_id,
            &params.user_id,
            params.message,
        )?;
        Ok(json!({ "lecturer_assistance": true }))
    }
}
