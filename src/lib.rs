//! Collaboration Engine
//!
//! Real-time collaborative editing sessions for an educational grading
//! platform: a host opens a session for an assignment, peers join and edit
//! a shared document, lecturers can be called in, and every session is
//! recorded for later replay.
//!
//! # Modules
//!
//! - `registry`: Session lifecycle authority (create, join, leave, edit, reap)
//! - `session`: Per-session state machine and roster
//! - `document`: Character-offset edit application
//! - `broadcast`: Best-effort fan-out to connected users
//! - `recording`: Append-only per-session event logs and replay
//! - `protocol`: JSON-RPC types and the `Method` trait
//! - `methods`: JSON-RPC method implementations
//! - `server`: Stdio JSON-RPC server
//! - `config`: Environment-driven engine settings
//! - `error`: Error taxonomy
//! - `types`: Shared data structures
//! - `utils`: Time and logging helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use collab_engine::{CollabServer, EngineConfig, SessionRegistry};
//! use collab_engine::methods::register_all_methods;
//!
//! #[tokio::main]
//! async fn main() -> collab_engine::CollabResult<()> {
//!     let registry = Arc::new(SessionRegistry::new(EngineConfig::from_env()));
//!     let mut server = CollabServer::new();
//!     register_all_methods(&mut server, registry);
//!     server.run().await
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod document;
pub mod error;
pub mod methods;
pub mod protocol;
pub mod recording;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use broadcast::{BroadcastGateway, BroadcastMessage, Connection, DeliveryReport};
pub use config::EngineConfig;
pub use error::{CollabError, CollabResult, ErrorCategory};
pub use protocol::{Method, ServerInfo};
pub use recording::{RecordingStore, SessionRecording};
pub use registry::{spawn_reaper, ReapReport, SessionRegistry};
pub use server::CollabServer;
pub use types::{
    Change, EndReason, Operation, Participant, ParticipantRole, PublicSessionSummary,
    RecordedEvent, RecordedEventKind, SessionEvent, SessionInfo, SessionOptions, SessionStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
