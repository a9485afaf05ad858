//! Session lifecycle methods

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CollabError, CollabResult};
use crate::protocol::{parse_params, Method, MethodDefinition};
use crate::registry::SessionRegistry;
use crate::types::{ParticipantRole, SessionOptions};

#[derive(Deserialize)]
struct CreateParams {
    host_id: String,
    #[serde(default)]
    host_name: String,
    assignment_id: String,
    #[serde(flatten)]
    options: SessionOptions,
}

pub struct CreateSessionMethod {
    registry: Arc<SessionRegistry>,
}

impl CreateSessionMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for CreateSessionMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "create_session",
            "Create a collaboration session hosted by the caller. The session waits until a second participant joins.",
            json!({
                "type": "object",
                "properties": {
                    "host_id": { "type": "string" },
                    "host_name": { "type": "string" },
                    "assignment_id": { "type": "string" },
                    "title": { "type": "string", "description": "Defaults to \"<host_name>'s session\"" },
                    "is_public": { "type": "boolean" },
                    "lecturer_assistance": { "type": "boolean" },
                    "language": { "type": "string" },
                    "max_participants": { "type": "integer", "minimum": 1 }
                },
                "required": ["host_id", "assignment_id"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: CreateParams = parse_params(params)?;
        let info = self.registry.create_session(
            &params.host_id,
            &params.host_name,
            &params.assignment_id,
            params.options,
        )?;
        Ok(serde_json::to_value(info)?)
    }
}

#[derive(Deserialize)]
struct JoinParams {
    session_id: String,
    user_id: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    role: ParticipantRole,
}

pub struct JoinSessionMethod {
    registry: Arc<SessionRegistry>,
}

impl JoinSessionMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for JoinSessionMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "join_session",
            "Join a session. Lecturers are admitted even when the session is full.",
            json!({
                "type": "object",
                "properties": {
                    "session_id": { "type": "string" },
                    "user_id": { "type": "string" },
                    "user_name": { "type": "string" },
                    "role": {
                        "type": "string",
                        "enum": ["participant", "observer", "lecturer"],
                        "default": "participant"
                    }
                },
                "required": ["session_id", "user_id"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: JoinParams = parse_params(params)?;
        let info = self.registry.join_session(
            &params.session_id,
            &params.user_id,
            &params.user_name,
            params.role,
        )?;
        Ok(serde_json::to_value(info)?)
    }
}

#[derive(Deserialize)]
struct UserParams {
    user_id: String,
}

pub struct LeaveSessionMethod {
    registry: Arc<SessionRegistry>,
}

impl LeaveSessionMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for LeaveSessionMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "leave_session",
            "Leave the caller's current session. A host leaving ends the session.",
            json!({
                "type": "object",
                "properties": { "user_id": { "type": "string" } },
                "required": ["user_id"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: UserParams = parse_params(params)?;
        let left = self.registry.leave_session(&params.user_id)?;
        Ok(json!({ "left": left }))
    }
}

#[derive(Deserialize)]
struct SessionParams {
    session_id: String,
}

pub struct GetSessionInfoMethod {
    registry: Arc<SessionRegistry>,
}

impl GetSessionInfoMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for GetSessionInfoMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "get_session_info",
            "Snapshot of a session: status, roster and current document",
            json!({
                "type": "object",
                "properties": { "session_id": { "type": "string" } },
                "required": ["session_id"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: SessionParams = parse_params(params)?;
        let info = self
            .registry
            .get_session_info(&params.session_id)
            .ok_or(CollabError::SessionNotFound(params.session_id))?;
        Ok(serde_json::to_value(info)?)
    }
}

pub struct GetPublicSessionsMethod {
    registry: Arc<SessionRegistry>,
}

impl GetPublicSessionsMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for GetPublicSessionsMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "get_public_sessions",
            "List public sessions that are open and have a free seat, newest first",
            json!({ "type": "object", "properties": {} }),
        )
    }

    fn execute(&self, _params: Value) -> CollabResult<Value> {
        let sessions = self.registry.get_public_sessions();
        Ok(json!({ "sessions": sessions }))
    }
}
