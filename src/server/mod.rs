//! Collaboration server over stdio
//!
//! Reads one JSON-RPC request per line from stdin and writes responses and
//! `session/event` notifications to stdout, one JSON object per line.

mod outbound;

use std::collections::HashMap;

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::CollabResult;
use crate::protocol::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Method, MethodDefinition,
    ServerInfo,
};

pub use outbound::{ClientConnection, Outbound};

/// Notification method carrying broadcast session events
pub const SESSION_EVENT_METHOD: &str = "session/event";

/// JSON-RPC server dispatching to registered methods
pub struct CollabServer {
    server_info: ServerInfo,
    methods: HashMap<String, Box<dyn Method>>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
}

impl CollabServer {
    pub fn new() -> Self {
        Self::with_info(ServerInfo::default())
    }

    pub fn with_info(info: ServerInfo) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            server_info: info,
            methods: HashMap::new(),
            outbound_tx,
            outbound_rx,
        }
    }

    /// Register a method with the server
    pub fn register_method(&mut self, method: Box<dyn Method>) -> &mut Self {
        let name = method.name();
        self.methods.insert(name, method);
        self
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Channel that connections use to reach this server's client
    pub fn outbound_sender(&self) -> mpsc::UnboundedSender<Outbound> {
        self.outbound_tx.clone()
    }

    /// Serve stdin/stdout until stdin closes
    pub async fn run(self) -> CollabResult<()> {
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Serve any line-oriented reader and writer until the reader hits EOF
    pub async fn serve<R, W>(mut self, reader: R, mut writer: W) -> CollabResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            name = %self.server_info.name,
            version = %self.server_info.version,
            methods = self.methods.len(),
            "Server started"
        );
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if let Some(response) = self.handle_request(trimmed) {
                        write_line(&mut writer, &response).await?;
                    }
                    // Events caused by this request follow its response
                    while let Ok(outbound) = self.outbound_rx.try_recv() {
                        self.write_event(&mut writer, outbound).await?;
                    }
                }

                Some(outbound) = self.outbound_rx.recv() => {
                    self.write_event(&mut writer, outbound).await?;
                }
            }
        }

        writer.flush().await?;
        info!("Input closed, server stopping");
        Ok(())
    }

    /// Handle one request line; `None` when no response is due
    pub fn handle_request(&self, request_str: &str) -> Option<String> {
        let request: JsonRpcRequest = match serde_json::from_str(request_str) {
            Ok(req) => req,
            Err(e) => {
                return encode(&JsonRpcError::parse_error(Value::Null, e.to_string()));
            }
        };

        let id = request.id.clone().unwrap_or(Value::Null);
        if !request.is_valid() {
            return encode(&JsonRpcError::invalid_request(
                id,
                "jsonrpc must be '2.0'".to_string(),
            ));
        }

        let result = match request.method.as_str() {
            "ping" => Ok(json!({
                "name": self.server_info.name,
                "version": self.server_info.version
            })),
            "methods/list" => Ok(self.list_methods()),
            name => match self.methods.get(name) {
                Some(method) => {
                    let params = request.params.clone().unwrap_or_else(|| json!({}));
                    method.execute(params).map_err(|e| {
                        debug!(
                            method = name,
                            category = e.category().as_str(),
                            "Method failed: {}",
                            e
                        );
                        JsonRpcError::from_collab(id.clone(), &e)
                    })
                }
                None => {
                    warn!(method = name, "Unknown method");
                    Err(JsonRpcError::method_not_found(id.clone(), name.to_string()))
                }
            },
        };

        if request.is_notification() {
            return None;
        }
        match result {
            Ok(value) => encode(&JsonRpcResponse::new(id, value)),
            Err(error) => encode(&error),
        }
    }

    fn list_methods(&self) -> Value {
        let mut methods: Vec<MethodDefinition> =
            self.methods.values().map(|m| m.definition()).collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        json!({ "methods": methods })
    }

    async fn write_event<W>(&self, writer: &mut W, outbound: Outbound) -> CollabResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let notification = JsonRpcNotification::new(
            SESSION_EVENT_METHOD,
            json!({
                "user_id": outbound.user_id,
                "message": outbound.message,
            }),
        );
        let line = serde_json::to_string(&notification)?;
        write_line(writer, &line).await
    }
}

impl Default for CollabServer {
    fn default() -> Self {
        Self::new()
    }
}

fn encode<T: serde::Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("Failed to encode response: {}", e);
            None
        }
    }
}

async fn write_line<W>(writer: &mut W, line: &str) -> CollabResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error() {
        let server = CollabServer::new();
        let response = server.handle_request("{not json").unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["id"], Value::Null);
    }

    #[test]
    fn test_wrong_version_is_invalid_request() {
        let server = CollabServer::new();
        let response = server
            .handle_request(r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#)
            .unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], -32600);
    }

    #[test]
    fn test_ping_and_unknown_method() {
        let server = CollabServer::new();
        let pong: Value = serde_json::from_str(
            &server
                .handle_request(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(pong["result"]["name"], crate::NAME);

        let missing: Value = serde_json::from_str(
            &server
                .handle_request(r#"{"jsonrpc":"2.0","id":2,"method":"nope"}"#)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(missing["error"]["code"], -32601);
    }

    #[test]
    fn test_notification_gets_no_response() {
        let server = CollabServer::new();
        assert!(server
            .handle_request(r#"{"jsonrpc":"2.0","method":"ping"}"#)
            .is_none());
    }
}
