//! JSON-RPC methods
//!
//! - Session methods (5): create, join, leave, info, public listing
//! - Editing methods (2): document changes and cursor presence
//! - Assistance methods (1): lecturer escalation
//! - Recording methods (1): recording and replay
//! - Connection methods (2): attach and detach event delivery

mod assistance;
mod connection;
mod editing;
mod recording;
mod session;

use std::sync::Arc;

use crate::registry::SessionRegistry;
use crate::server::CollabServer;

pub use assistance::RequestAssistanceMethod;
pub use connection::{ConnectMethod, DisconnectMethod};
pub use editing::{ApplyChangeMethod, UpdateCursorMethod};
pub use recording::GetRecordingMethod;
pub use session::{
    CreateSessionMethod, GetPublicSessionsMethod, GetSessionInfoMethod, JoinSessionMethod,
    LeaveSessionMethod,
};

/// Register every method with the server
pub fn register_all_methods(server: &mut CollabServer, registry: Arc<SessionRegistry>) {
    server.register_method(Box::new(CreateSessionMethod::new(registry.clone())));
    server.register_method(Box::new(JoinSessionMethod::new(registry.clone())));
    server.register_method(Box::new(LeaveSessionMethod::new(registry.clone())));
    server.register_method(Box::new(GetSessionInfoMethod::new(registry.clone())));
    server.register_method(Box::new(GetPublicSessionsMethod::new(registry.clone())));

    server.register_method(Box::new(ApplyChangeMethod::new(registry.clone())));
    server.register_method(Box::new(UpdateCursorMethod::new(registry.clone())));

    server.register_method(Box::new(RequestAssistanceMethod::new(registry.clone())));

    server.register_method(Box::new(GetRecordingMethod::new(registry.clone())));

    let outbound = server.outbound_sender();
    server.register_method(Box::new(ConnectMethod::new(registry.clone(), outbound)));
    server.register_method(Box::new(DisconnectMethod::new(registry)));
}
