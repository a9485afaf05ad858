//! Document editing and cursor presence methods

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CollabResult;
use crate::protocol::{parse_params, Method, MethodDefinition};
use crate::registry::SessionRegistry;
use crate::types::Operation;

#[derive(Deserialize)]
struct ChangeParams {
    session_id: String,
    author_id: String,
    #[serde(rename = "type")]
    kind: String,
    position: usize,
    text: Option<String>,
    length: Option<usize>,
}

pub struct ApplyChangeMethod {
    registry: Arc<SessionRegistry>,
}

impl ApplyChangeMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for ApplyChangeMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "apply_change",
            "Apply an insert, delete or replace to the shared document. Positions and lengths count characters and are clamped to the document.",
            json!({
                "type": "object",
                "properties": {
                    "session_id": { "type": "string" },
                    "author_id": { "type": "string" },
                    "type": { "type": "string", "enum": ["insert", "delete", "replace"] },
                    "position": { "type": "integer", "minimum": 0 },
                    "text": { "type": "string", "description": "Required for insert and replace" },
                    "length": { "type": "integer", "minimum": 0, "description": "Required for delete and replace" }
                },
                "required": ["session_id", "author_id", "type", "position"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: ChangeParams = parse_params(params)?;
        let operation =
            Operation::from_parts(&params.kind, params.position, params.text, params.length)?;
        let change = self
            .registry
            .apply_change(&params.session_id, &params.author_id, operation)?;
        Ok(serde_json::to_value(change)?)
    }
}

#[derive(Deserialize)]
struct CursorParams {
    user_id: String,
    position: usize,
}

pub struct UpdateCursorMethod {
    registry: Arc<SessionRegistry>,
}

impl UpdateCursorMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for UpdateCursorMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "update_cursor",
            "Publish the caller's cursor position to the other participants",
            json!({
                "type": "object",
                "properties": {
                    "user_id": { "type": "string" },
                    "position": { "type": "integer", "minimum": 0 }
                },
                "required": ["user_id", "position"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: CursorParams = parse_params(params)?;
        self.registry
            .update_cursor_position(&params.user_id, params.position)?;
        Ok(json!({ "ok": true }))
    }
}
