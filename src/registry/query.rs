//! Read-only views over the registry

use std::cmp::Reverse;

use super::SessionRegistry;
use crate::types::{PublicSessionSummary, SessionInfo};

pub fn get_session_info(registry: &SessionRegistry, session_id: &str) -> Option<SessionInfo> {
    let handle = registry.session_handle(session_id)?;
    let info = handle.lock().info();
    Some(info)
}

/// Public, open sessions with a free seat, newest first
pub fn get_public_sessions(registry: &SessionRegistry) -> Vec<PublicSessionSummary> {
    let dir = registry.directory.read();
    let mut summaries: Vec<PublicSessionSummary> = dir
        .sessions
        .values()
        .filter_map(|handle| {
            let session = handle.lock();
            session
                .is_joinable_publicly()
                .then(|| session.public_summary())
        })
        .collect();

    summaries.sort_by_key(|summary| Reverse(summary.created_at));
    summaries
}

pub fn user_session(registry: &SessionRegistry, user_id: &str) -> Option<String> {
    registry.directory.read().user_sessions.get(user_id).cloned()
}

pub fn session_count(registry: &SessionRegistry) -> usize {
    registry.directory.read().sessions.len()
}

/// Users currently mapped to a session
pub fn active_user_count(registry: &SessionRegistry) -> usize {
    registry.directory.read().user_sessions.len()
}
