//! Idle and retention sweeps
//!
//! Waiting sessions that nobody joins are ended after the idle timeout.
//! Ended sessions are dropped from the registry once the retention window
//! passes; their recordings are kept.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::{lifecycle, SessionRegistry};
use crate::types::{EndReason, SessionStatus};

/// What a single sweep did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapReport {
    /// Sessions moved to `Ended` because they sat idle
    pub idle_ended: Vec<String>,
    /// Ended sessions removed from the registry
    pub removed: Vec<String>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.idle_ended.is_empty() && self.removed.is_empty()
    }
}

pub fn reap(registry: &SessionRegistry, now: DateTime<Utc>) -> ReapReport {
    let idle_timeout = registry.config.idle_timeout();
    let retention = registry.config.ended_retention();
    let mut report = ReapReport::default();

    let mut dir = registry.directory.write();
    for (session_id, handle) in &dir.sessions {
        let mut session = handle.lock();
        match session.status() {
            SessionStatus::Ended => {
                if now - session.updated_at() >= retention {
                    report.removed.push(session_id.clone());
                }
            }
            _ if session.is_idle(now, idle_timeout) => {
                if session.end(now) {
                    lifecycle::announce_end(registry, session_id, EndReason::Idle);
                    report.idle_ended.push(session_id.clone());
                }
            }
            _ => {}
        }
    }

    for session_id in &report.removed {
        dir.sessions.remove(session_id);
        registry.gateway.drop_session(session_id);
    }
    if !report.removed.is_empty() {
        dir.user_sessions
            .retain(|_, session_id| !report.removed.contains(session_id));
    }

    if !report.is_empty() {
        info!(
            idle_ended = report.idle_ended.len(),
            removed = report.removed.len(),
            remaining = dir.sessions.len(),
            "Reaped sessions"
        );
    }
    report
}

/// Sweep the registry on the configured interval until the task is aborted
pub fn spawn_reaper(registry: Arc<SessionRegistry>) -> JoinHandle<()> {
    let period = registry.config.reap_interval();
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            let report = registry.reap(crate::utils::time::now());
            debug!(?report, "Reaper tick");
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::types::{ParticipantRole, SessionOptions};
    use crate::utils::time::now;

    #[test]
    fn test_idle_waiting_session_is_ended_then_removed() {
        let registry = SessionRegistry::default();
        let info = registry
            .create_session("h1", "Ann", "a1", SessionOptions::default())
            .unwrap();
        let start = now();

        assert!(registry.reap(start).is_empty());

        let later = start + Duration::seconds(1801);
        let report = registry.reap(later);
        assert_eq!(report.idle_ended, vec![info.id.clone()]);
        assert_eq!(
            registry.get_session_info(&info.id).unwrap().status,
            SessionStatus::Ended
        );

        let report = registry.reap(later + Duration::seconds(601));
        assert_eq!(report.removed, vec![info.id.clone()]);
        assert_eq!(registry.session_count(), 0);
        assert_eq!(registry.user_session("h1"), None);

        // The recording outlives the session
        let recording = registry.get_recording(&info.id).unwrap();
        assert!(recording.len() >= 2);
    }

    #[test]
    fn test_active_sessions_are_not_reaped() {
        let registry = SessionRegistry::default();
        let info = registry
            .create_session("h1", "Ann", "a1", SessionOptions::default())
            .unwrap();
        registry
            .join_session(&info.id, "p1", "Ben", ParticipantRole::Participant)
            .unwrap();

        let report = registry.reap(now() + Duration::days(2));
        assert!(report.is_empty());
        assert_eq!(registry.session_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_reaper_runs_until_aborted() {
        let registry = Arc::new(SessionRegistry::default());
        let handle = spawn_reaper(Arc::clone(&registry));
        tokio::task::yield_now().await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
