//! Create, join and leave

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{Directory, SessionRegistry};
use crate::error::{require, CollabError, CollabResult};
use crate::session::{Session, SessionSettings};
use crate::types::{
    EndReason, ParticipantRole, RecordedEventKind, SessionEvent, SessionInfo, SessionOptions,
};
use crate::utils::time::now;

/// Create a session with the host as its only participant
pub fn create_session(
    registry: &SessionRegistry,
    host_id: &str,
    host_name: &str,
    assignment_id: &str,
    options: SessionOptions,
) -> CollabResult<SessionInfo> {
    require(host_id, "host_id")?;
    let host_name = if host_name.trim().is_empty() {
        host_id
    } else {
        host_name
    };

    let max_participants = options
        .max_participants
        .unwrap_or(registry.config.max_participants);
    if max_participants == 0 {
        return Err(CollabError::InvalidParams(
            "max_participants must be at least 1".to_string(),
        ));
    }

    let settings = SessionSettings {
        title: options
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("{}'s session", host_name)),
        language: options
            .language
            .unwrap_or_else(|| registry.config.default_language.clone()),
        max_participants,
        is_public: options.is_public,
        lecturer_assistance: options.lecturer_assistance,
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let now = now();

    let mut dir = registry.directory.write();
    if let Some(previous) = dir.user_sessions.remove(host_id) {
        depart(registry, &dir, &previous, host_id);
    }

    let session = Session::new(&session_id, host_id, host_name, assignment_id, settings, now);
    registry.recordings.record_at(
        &session_id,
        RecordedEventKind::SessionCreated {
            host_id: host_id.to_string(),
            host_name: host_name.to_string(),
            title: session.title().to_string(),
            language: session.language().to_string(),
            seed: session.content().to_string(),
        },
        now,
    );
    registry.gateway.subscribe(&session_id, host_id);

    let info = session.info();
    dir.sessions
        .insert(session_id.clone(), Arc::new(Mutex::new(session)));
    dir.user_sessions
        .insert(host_id.to_string(), session_id.clone());

    info!(session_id = %session_id, host_id, assignment_id, "Session created");
    Ok(info)
}

/// Admit a user to a session, activating it on the second live participant
pub fn join_session(
    registry: &SessionRegistry,
    session_id: &str,
    user_id: &str,
    user_name: &str,
    role: ParticipantRole,
) -> CollabResult<SessionInfo> {
    require(session_id, "session_id")?;
    require(user_id, "user_id")?;
    let user_name = if user_name.trim().is_empty() {
        user_id
    } else {
        user_name
    };

    let mut dir = registry.directory.write();
    let handle = dir
        .sessions
        .get(session_id)
        .cloned()
        .ok_or_else(|| CollabError::SessionNotFound(session_id.to_string()))?;

    let info = {
        let mut session = handle.lock();
        let admission = session.admit(user_id, user_name, role, now())?;
        let participant = &admission.participant;

        registry.gateway.subscribe(session_id, user_id);
        if !admission.already_online {
            registry.recordings.record(
                session_id,
                RecordedEventKind::ParticipantJoined {
                    user_id: user_id.to_string(),
                    user_name: participant.user_name.clone(),
                    role: participant.role,
                },
            );
        }
        registry.gateway.broadcast(
            session_id,
            SessionEvent::UserJoined {
                user_id: user_id.to_string(),
                user_name: participant.user_name.clone(),
                role: participant.role,
                color: participant.color.clone(),
                online_count: session.online_count(),
                status: session.status(),
            },
            None,
        );

        if admission.activated {
            info!(session_id, "Session activated");
        }
        info!(
            session_id,
            user_id,
            role = %participant.role,
            rejoined = admission.rejoined,
            "User joined session"
        );
        session.info()
    };

    // A user is in at most one session at a time
    let previous = dir
        .user_sessions
        .insert(user_id.to_string(), session_id.to_string());
    if let Some(previous) = previous.filter(|prev| prev != session_id) {
        depart(registry, &dir, &previous, user_id);
    }

    Ok(info)
}

/// Take a user out of their session; false if they weren't in one
pub fn leave_session(registry: &SessionRegistry, user_id: &str) -> CollabResult<bool> {
    require(user_id, "user_id")?;

    let mut dir = registry.directory.write();
    let Some(session_id) = dir.user_sessions.remove(user_id) else {
        debug!(user_id, "Leave ignored: no session mapping");
        return Ok(false);
    };

    depart(registry, &dir, &session_id, user_id);
    Ok(true)
}

/// Mark a user offline in `session_id` and run the end-of-session rules
///
/// The caller holds the directory lock and has already removed or replaced
/// the user's mapping.
fn depart(registry: &SessionRegistry, dir: &Directory, session_id: &str, user_id: &str) {
    let Some(handle) = dir.sessions.get(session_id) else {
        warn!(session_id, user_id, "Stale mapping to a removed session");
        return;
    };

    let mut session = handle.lock();
    let departure = match session.mark_offline(user_id, now()) {
        Ok(departure) => departure,
        Err(e) => {
            warn!(session_id, user_id, "Leave failed: {}", e);
            return;
        }
    };

    registry.gateway.unsubscribe(session_id, user_id);
    registry.recordings.record(
        session_id,
        RecordedEventKind::ParticipantLeft {
            user_id: user_id.to_string(),
        },
    );
    registry.gateway.broadcast(
        session_id,
        SessionEvent::UserLeft {
            user_id: user_id.to_string(),
            user_name: departure.participant.user_name.clone(),
            online_count: session.online_count(),
        },
        None,
    );
    info!(session_id, user_id, "User left session");

    if let Some(reason) = departure.ended {
        announce_end(registry, session_id, reason);
    }
}

/// Record and broadcast that a session ended
pub(super) fn announce_end(registry: &SessionRegistry, session_id: &str, reason: EndReason) {
    registry
        .recordings
        .record(session_id, RecordedEventKind::SessionEnded { reason });
    registry
        .gateway
        .broadcast(session_id, SessionEvent::SessionEnded { reason }, None);
    info!(session_id, ?reason, "Session ended");
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::error::CollabError;
    use crate::registry::SessionRegistry;
    use crate::types::{ParticipantRole, RecordedEventKind, SessionOptions, SessionStatus};

    #[test]
    fn test_create_defaults() {
        let registry = SessionRegistry::new(EngineConfig::default());
        let info = registry
            .create_session("h1", "Host", "a1", SessionOptions::default())
            .unwrap();

        assert_eq!(info.title, "Host's session");
        assert_eq!(info.status, SessionStatus::Waiting);
        assert_eq!(info.max_participants, 4);
        assert_eq!(info.language, "python");
        assert_eq!(registry.user_session("h1"), Some(info.id));
    }

    #[test]
    fn test_create_requires_host_id() {
        let registry = SessionRegistry::default();
        let err = registry
            .create_session("", "Host", "a1", SessionOptions::default())
            .unwrap_err();
        assert!(matches!(err, CollabError::MissingField("host_id")));
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn test_create_rejects_zero_capacity() {
        let registry = SessionRegistry::default();
        let err = registry
            .create_session(
                "h1",
                "Host",
                "a1",
                SessionOptions::default().with_max_participants(0),
            )
            .unwrap_err();
        assert!(matches!(err, CollabError::InvalidParams(_)));
        assert_eq!(err.category().json_rpc_code(), -32602);
        assert_eq!(registry.session_count(), 0);
        assert_eq!(registry.user_session("h1"), None);

        // A zero default from config is refused the same way
        let registry = SessionRegistry::new(EngineConfig::default().with_max_participants(0));
        assert!(matches!(
            registry.create_session("h1", "Host", "a1", SessionOptions::default()),
            Err(CollabError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_rejoin_while_online_records_one_join() {
        let registry = SessionRegistry::default();
        let info = registry
            .create_session("h1", "Host", "a1", SessionOptions::default())
            .unwrap();
        for _ in 0..2 {
            registry
                .join_session(&info.id, "p1", "Bob", ParticipantRole::Participant)
                .unwrap();
        }

        let recording = registry.get_recording(&info.id).unwrap();
        let joins = recording
            .events
            .iter()
            .filter(|e| matches!(e.kind, RecordedEventKind::ParticipantJoined { .. }))
            .count();
        assert_eq!(joins, 1);

        // Coming back after a leave is a real join again
        registry.leave_session("p1").unwrap();
        registry
            .join_session(&info.id, "p1", "Bob", ParticipantRole::Participant)
            .unwrap();
        let recording = registry.get_recording(&info.id).unwrap();
        assert_eq!(
            recording
                .events
                .iter()
                .filter(|e| matches!(e.kind, RecordedEventKind::ParticipantJoined { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_join_unknown_session() {
        let registry = SessionRegistry::default();
        let err = registry
            .join_session("missing", "u1", "Ann", ParticipantRole::Participant)
            .unwrap_err();
        assert!(matches!(err, CollabError::SessionNotFound(_)));
        assert_eq!(registry.user_session("u1"), None);
    }

    #[test]
    fn test_failed_join_keeps_previous_session() {
        let registry = SessionRegistry::new(EngineConfig::default().with_max_participants(1));
        let first = registry
            .create_session("h1", "Host", "a1", SessionOptions::default())
            .unwrap();
        let second = registry
            .create_session("h2", "Other", "a1", SessionOptions::default())
            .unwrap();

        // h1 cannot squeeze into a full session, and stays where they were
        let err = registry
            .join_session(&second.id, "h1", "Host", ParticipantRole::Participant)
            .unwrap_err();
        assert!(matches!(err, CollabError::SessionFull { .. }));
        assert_eq!(registry.user_session("h1"), Some(first.id.clone()));
        assert_eq!(
            registry.get_session_info(&first.id).unwrap().status,
            SessionStatus::Waiting
        );
    }

    #[test]
    fn test_joining_elsewhere_leaves_previous_session() {
        let registry = SessionRegistry::default();
        let first = registry
            .create_session("h1", "Host", "a1", SessionOptions::default())
            .unwrap();
        registry
            .join_session(&first.id, "p1", "Bob", ParticipantRole::Participant)
            .unwrap();
        let second = registry
            .create_session("h2", "Other", "a2", SessionOptions::default())
            .unwrap();

        registry
            .join_session(&second.id, "p1", "Bob", ParticipantRole::Participant)
            .unwrap();

        assert_eq!(registry.user_session("p1"), Some(second.id.clone()));
        let first_info = registry.get_session_info(&first.id).unwrap();
        assert_eq!(first_info.online_count, 1);
        assert_eq!(first_info.status, SessionStatus::Active);
    }

    #[test]
    fn test_leave_without_session_is_noop() {
        let registry = SessionRegistry::default();
        assert!(!registry.leave_session("nobody").unwrap());
        assert!(matches!(
            registry.leave_session(""),
            Err(CollabError::MissingField("user_id"))
        ));
    }
}
