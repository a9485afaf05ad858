//! Error taxonomy for the collaboration engine
//!
//! Every fallible engine call returns [`CollabResult`]. The transport layer
//! maps failures to protocol codes through [`CollabError::category`].

use thiserror::Error;

use crate::types::SessionStatus;

/// Result type for engine operations
pub type CollabResult<T> = Result<T, CollabError>;

/// Errors surfaced by the collaboration engine
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session {session_id} is full ({max_participants} max)")]
    SessionFull {
        session_id: String,
        max_participants: usize,
    },

    #[error("session {session_id} is {status}, expected {expected}")]
    SessionInactive {
        session_id: String,
        status: SessionStatus,
        expected: &'static str,
    },

    #[error("user {0} is not connected to a session")]
    NotInSession(String),

    #[error("user {user_id} is not a participant of session {session_id}")]
    ParticipantNotFound { session_id: String, user_id: String },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure categories, stable across error variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown session; recoverable, never retried by the engine
    NotFound,
    /// Capacity or state conflict (full, not active, not joined)
    Conflict,
    /// Request rejected before touching state
    Validation,
    /// Malformed or unexpected input; fails closed
    Internal,
}

impl ErrorCategory {
    /// JSON-RPC error code used by the stdio transport
    pub fn json_rpc_code(self) -> i32 {
        match self {
            ErrorCategory::NotFound => -32004,
            ErrorCategory::Conflict => -32009,
            ErrorCategory::Validation => -32602,
            ErrorCategory::Internal => -32603,
        }
    }

    /// Short machine-readable label
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl CollabError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CollabError::SessionNotFound(_) => ErrorCategory::NotFound,
            CollabError::SessionFull { .. }
            | CollabError::SessionInactive { .. }
            | CollabError::NotInSession(_)
            | CollabError::ParticipantNotFound { .. } => ErrorCategory::Conflict,
            CollabError::MissingField(_) | CollabError::InvalidParams(_) => {
                ErrorCategory::Validation
            }
            CollabError::InvalidOperation(_)
            | CollabError::Serialization(_)
            | CollabError::Io(_) => ErrorCategory::Internal,
        }
    }
}

/// Reject empty identifiers before any state is touched
pub(crate) fn require(value: &str, field: &'static str) -> CollabResult<()> {
    if value.trim().is_empty() {
        Err(CollabError::MissingField(field))
    } else {
        Ok(())
    }
}
