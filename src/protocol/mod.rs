//! Protocol types for the JSON-RPC transport
//!
//! Wire envelopes live in `jsonrpc`; the `Method` trait every callable
//! operation implements lives in `method`.

mod jsonrpc;
mod method;

pub use jsonrpc::{ErrorObject, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
pub use method::{parse_params, Method, MethodDefinition, ServerInfo};
