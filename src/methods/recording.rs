//! Recording retrieval method

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CollabError, CollabResult};
use crate::protocol::{parse_params, Method, MethodDefinition};
use crate::registry::SessionRegistry;

#[derive(Deserialize)]
struct RecordingParams {
    session_id: String,
    /// Also fold the recorded changes into the final document
    #[serde(default)]
    replay: bool,
}

pub struct GetRecordingMethod {
    registry: Arc<SessionRegistry>,
}

impl GetRecordingMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for GetRecordingMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "get_recording",
            "Fetch a session's recorded events. Recordings remain available after the session is removed.",
            json!({
                "type": "object",
                "properties": {
                    "session_id": { "type": "string" },
                    "replay": { "type": "boolean", "default": false }
                },
                "required": ["session_id"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: RecordingParams = parse_params(params)?;
        let recording = self
            .registry
            .get_recording(&params.session_id)
            .ok_or_else(|| CollabError::SessionNotFound(params.session_id.clone()))?;

        let duration_ms = recording.duration().num_milliseconds();
        let replayed = if params.replay {
            recording.replay()
        } else {
            None
        };

        let mut result = serde_json::to_value(&recording)?;
        result["duration_ms"] = json!(duration_ms);
        if let Some(content) = replayed {
            result["content"] = json!(content);
        }
        Ok(result)
    }
}
