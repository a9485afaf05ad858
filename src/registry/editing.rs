//! Document edits, cursor presence and lecturer escalation

use tracing::{debug, info};

use super::{SessionHandle, SessionRegistry};
use crate::error::{require, CollabError, CollabResult};
use crate::types::{Change, Operation, RecordedEventKind, SessionEvent};
use crate::utils::time::now;

/// Apply one edit in arrival order
///
/// The session lock is held from the mutation through the broadcast and the
/// recording, so every observer sees changes in the order they were applied.
pub fn apply_change(
    registry: &SessionRegistry,
    session_id: &str,
    author_id: &str,
    operation: Operation,
) -> CollabResult<Change> {
    require(session_id, "session_id")?;
    require(author_id, "author_id")?;

    let handle = {
        let dir = registry.directory.read();
        let handle = dir
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| CollabError::SessionNotFound(session_id.to_string()))?;
        if dir.user_sessions.get(author_id).map(String::as_str) != Some(session_id) {
            return Err(CollabError::NotInSession(author_id.to_string()));
        }
        handle
    };

    let mut session = handle.lock();
    let change = session.apply_change(author_id, operation, now())?;

    if let Some(limit) = registry.config.history_limit {
        let compacted = session.compact(limit);
        if compacted > 0 {
            debug!(session_id, compacted, "Compacted change history");
        }
    }

    registry.gateway.broadcast(
        session_id,
        SessionEvent::CodeChange {
            change: change.clone(),
            content: session.content().to_string(),
        },
        Some(author_id),
    );
    registry.recordings.record_at(
        session_id,
        RecordedEventKind::ChangeApplied {
            change: change.clone(),
        },
        change.timestamp,
    );

    debug!(
        session_id,
        author_id,
        kind = change.operation.kind(),
        position = change.operation.position(),
        "Change applied"
    );
    Ok(change)
}

/// Move a participant's cursor and tell everyone else
pub fn update_cursor_position(
    registry: &SessionRegistry,
    user_id: &str,
    position: usize,
) -> CollabResult<()> {
    require(user_id, "user_id")?;

    let (session_id, handle) = mapped_session(registry, user_id)?;
    let mut session = handle.lock();
    let participant = session.move_cursor(user_id, position, now())?;

    registry.gateway.broadcast(
        &session_id,
        SessionEvent::CursorUpdate {
            user_id: user_id.to_string(),
            user_name: participant.user_name,
            position,
            color: participant.color,
        },
        Some(user_id),
    );
    Ok(())
}

/// Raise the assistance flag and notify the whole session, sender included
pub fn request_lecturer_assistance(
    registry: &SessionRegistry,
    session_id: &str,
    user_id: &str,
    message: Option<String>,
) -> CollabResult<()> {
    require(session_id, "session_id")?;
    require(user_id, "user_id")?;

    let handle = registry
        .session_handle(session_id)
        .ok_or_else(|| CollabError::SessionNotFound(session_id.to_string()))?;
    let mut session = handle.lock();
    let participant = session.request_assistance(user_id, now())?;

    registry.recordings.record(
        session_id,
        RecordedEventKind::LecturerAssistanceRequested {
            user_id: user_id.to_string(),
            message: message.clone(),
        },
    );
    registry.gateway.broadcast(
        session_id,
        SessionEvent::LecturerAssistanceRequested {
            user_id: user_id.to_string(),
            user_name: participant.user_name,
            message,
        },
        None,
    );

    info!(session_id, user_id, "Lecturer assistance requested");
    Ok(())
}

/// The session a user is currently mapped to
fn mapped_session(
    registry: &SessionRegistry,
    user_id: &str,
) -> CollabResult<(String, SessionHandle)> {
    let dir = registry.directory.read();
    let session_id = dir
        .user_sessions
        .get(user_id)
        .ok_or_else(|| CollabError::NotInSession(user_id.to_string()))?;
    let handle = dir
        .sessions
        .get(session_id)
        .cloned()
        .ok_or_else(|| CollabError::SessionNotFound(session_id.clone()))?;
    Ok((session_id.clone(), handle))
}
