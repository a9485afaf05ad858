//! Session Registry - lifecycle authority for collaborative sessions
//!
//! Owns `session_id -> Session` and `user_id -> session_id`. Both maps sit
//! behind one directory lock so a join and a leave for the same user cannot
//! interleave. Each session has its own mutex; edits to different sessions
//! never contend.
//!
//! Lock order is always directory, then session. Broadcasting and recording
//! happen while the session lock is held, so both observe mutations in the
//! same order they were applied.

mod editing;
mod lifecycle;
mod query;
mod reaper;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::broadcast::{BroadcastGateway, Connection};
use crate::config::EngineConfig;
use crate::error::CollabResult;
use crate::recording::{RecordingStore, SessionRecording};
use crate::session::Session;
use crate::types::{Change, Operation, ParticipantRole, PublicSessionSummary, SessionInfo, SessionOptions};

pub use reaper::{spawn_reaper, ReapReport};

/// Shared, individually locked session
pub type SessionHandle = Arc<Mutex<Session>>;

/// The registry's two maps, guarded together
#[derive(Default)]
pub(crate) struct Directory {
    pub(crate) sessions: HashMap<String, SessionHandle>,
    pub(crate) user_sessions: HashMap<String, String>,
}

/// Explicit, injectable registry of live sessions
pub struct SessionRegistry {
    pub(crate) directory: RwLock<Directory>,
    pub(crate) gateway: Arc<BroadcastGateway>,
    pub(crate) recordings: Arc<RecordingStore>,
    pub(crate) config: EngineConfig,
}

impl SessionRegistry {
    /// Create a registry with its own gateway and recording store
    pub fn new(config: EngineConfig) -> Self {
        let gateway = Arc::new(BroadcastGateway::new(config.tap_capacity));
        let recordings = Arc::new(RecordingStore::new());
        Self::with_parts(config, gateway, recordings)
    }

    /// Create a registry around existing collaborators
    pub fn with_parts(
        config: EngineConfig,
        gateway: Arc<BroadcastGateway>,
        recordings: Arc<RecordingStore>,
    ) -> Self {
        Self {
            directory: RwLock::new(Directory::default()),
            gateway,
            recordings,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<BroadcastGateway> {
        &self.gateway
    }

    pub fn recordings(&self) -> &Arc<RecordingStore> {
        &self.recordings
    }

    pub(crate) fn session_handle(&self, session_id: &str) -> Option<SessionHandle> {
        self.directory.read().sessions.get(session_id).cloned()
    }

    /// Transport write surface: attach a user's delivery channel
    pub fn register_connection<C>(&self, user_id: &str, connection: C)
    where
        C: Connection + 'static,
    {
        self.gateway.register_connection(user_id, connection);
    }

    /// Transport write surface: detach a user's delivery channel
    pub fn unregister_connection(&self, user_id: &str) -> bool {
        self.gateway.unregister_connection(user_id)
    }

    pub fn get_recording(&self, session_id: &str) -> Option<SessionRecording> {
        self.recordings.get_recording(session_id)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

// Operations live in submodules
impl SessionRegistry {
    // Lifecycle (from lifecycle.rs)
    pub fn create_session(
        &self,
        host_id: &str,
        host_name: &str,
        assignment_id: &str,
        options: SessionOptions,
    ) -> CollabResult<SessionInfo> {
        lifecycle::create_session(self, host_id, host_name, assignment_id, options)
    }

    pub fn join_session(
        &self,
        session_id: &str,
        user_id: &str,
        user_name: &str,
        role: ParticipantRole,
    ) -> CollabResult<SessionInfo> {
        lifecycle::join_session(self, session_id, user_id, user_name, role)
    }

    pub fn leave_session(&self, user_id: &str) -> CollabResult<bool> {
        lifecycle::leave_session(self, user_id)
    }

    // Editing, presence and escalation (from editing.rs)
    pub fn apply_change(
        &self,
        session_id: &str,
        author_id: &str,
        operation: Operation,
    ) -> CollabResult<Change> {
        editing::apply_change(self, session_id, author_id, operation)
    }

    pub fn update_cursor_position(&self, user_id: &str, position: usize) -> CollabResult<()> {
        editing::update_cursor_position(self, user_id, position)
    }

    pub fn request_lecturer_assistance(
        &self,
        session_id: &str,
        user_id: &str,
        message: Option<String>,
    ) -> CollabResult<()> {
        editing::request_lecturer_assistance(self, session_id, user_id, message)
    }

    // Read-only queries (from query.rs)
    pub fn get_session_info(&self, session_id: &str) -> Option<SessionInfo> {
        query::get_session_info(self, session_id)
    }

    pub fn get_public_sessions(&self) -> Vec<PublicSessionSummary> {
        query::get_public_sessions(self)
    }

    pub fn user_session(&self, user_id: &str) -> Option<String> {
        query::user_session(self, user_id)
    }

    pub fn session_count(&self) -> usize {
        query::session_count(self)
    }

    pub fn active_user_count(&self) -> usize {
        query::active_user_count(self)
    }

    // Maintenance (from reaper.rs)
    pub fn reap(&self, now: chrono::DateTime<chrono::Utc>) -> ReapReport {
        reaper::reap(self, now)
    }
}
