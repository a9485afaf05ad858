//! Event delivery attachment methods

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{require, CollabResult};
use crate::protocol::{parse_params, Method, MethodDefinition};
use crate::registry::SessionRegistry;
use crate::server::{ClientConnection, Outbound};

#[derive(Deserialize)]
struct ConnectionParams {
    user_id: String,
}

/// Route a user's session events to this client as notifications
pub struct ConnectMethod {
    registry: Arc<SessionRegistry>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ConnectMethod {
    pub fn new(registry: Arc<SessionRegistry>, outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { registry, outbound }
    }
}

impl Method for ConnectMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "connect",
            "Start delivering a user's session events as session/event notifications. Replaces any earlier connection for the user.",
            json!({
                "type": "object",
                "properties": { "user_id": { "type": "string" } },
                "required": ["user_id"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: ConnectionParams = parse_params(params)?;
        require(&params.user_id, "user_id")?;

        self.registry.register_connection(
            &params.user_id,
            ClientConnection::new(params.user_id.clone(), self.outbound.clone()),
        );
        debug!(user_id = %params.user_id, "Connection registered");
        Ok(json!({ "connected": true }))
    }
}

pub struct DisconnectMethod {
    registry: Arc<SessionRegistry>,
}

impl DisconnectMethod {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl Method for DisconnectMethod {
    fn definition(&self) -> MethodDefinition {
        MethodDefinition::new(
            "disconnect",
            "Stop delivering a user's events. Does not leave the session.",
            json!({
                "type": "object",
                "properties": { "user_id": { "type": "string" } },
                "required": ["user_id"]
            }),
        )
    }

    fn execute(&self, params: Value) -> CollabResult<Value> {
        let params: ConnectionParams = parse_params(params)?;
        let removed = self.registry.unregister_connection(&params.user_id);
        Ok(json!({ "disconnected": removed }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_then_disconnect() {
        let registry = Arc::new(SessionRegistry::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        ConnectMethod::new(registry.clone(), tx)
            .execute(json!({ "user_id": "u1" }))
            .unwrap();
        assert!(registry.gateway().is_connected("u1"));

        let result = DisconnectMethod::new(registry.clone())
            .execute(json!({ "user_id": "u1" }))
            .unwrap();
        assert_eq!(result["disconnected"], true);
        assert!(!registry.gateway().is_connected("u1"));
    }
}
