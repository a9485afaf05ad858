//! Broadcast and recording event types
//!
//! `SessionEvent` is what connected participants receive in real time.
//! `RecordedEvent` is the append-only entry kept for replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::change::Change;
use super::participant::ParticipantRole;
use super::session::SessionStatus;

/// Why a session reached `Ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    HostLeft,
    /// Last online participant left
    Empty,
    /// Closed by the idle reaper
    Idle,
}

/// Real-time events fanned out to a session's participants
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    UserJoined {
        user_id: String,
        user_name: String,
        role: ParticipantRole,
        color: String,
        online_count: usize,
        status: SessionStatus,
    },

    UserLeft {
        user_id: String,
        user_name: String,
        online_count: usize,
    },

    /// Carries the full document, not a diff
    CodeChange { change: Change, content: String },

    CursorUpdate {
        user_id: String,
        user_name: String,
        position: usize,
        color: String,
    },

    LecturerAssistanceRequested {
        user_id: String,
        user_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    SessionEnded { reason: EndReason },
}

impl SessionEvent {
    /// Wire name of the event, as serialized in `type`
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::UserJoined { .. } => "user_joined",
            SessionEvent::UserLeft { .. } => "user_left",
            SessionEvent::CodeChange { .. } => "code_change",
            SessionEvent::CursorUpdate { .. } => "cursor_update",
            SessionEvent::LecturerAssistanceRequested { .. } => "lecturer_assistance_requested",
            SessionEvent::SessionEnded { .. } => "session_ended",
        }
    }
}

/// Domain events kept in a session recording
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordedEventKind {
    SessionCreated {
        host_id: String,
        host_name: String,
        title: String,
        language: String,
        /// Document content before any change
        seed: String,
    },

    ParticipantJoined {
        user_id: String,
        user_name: String,
        role: ParticipantRole,
    },

    ParticipantLeft { user_id: String },

    ChangeApplied { change: Change },

    LecturerAssistanceRequested {
        user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    SessionEnded { reason: EndReason },
}

/// A timestamped entry in a recording
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Position in the recording, starting at 0
    pub sequence: u64,

    /// Never earlier than the previous entry's timestamp
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: RecordedEventKind,
}
