//! Recording store - append-only, per-session event logs
//!
//! Recordings outlive their sessions (the reaper never removes them) but
//! live only in process memory.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{ParticipantRole, RecordedEvent, RecordedEventKind};
use crate::utils::time::{at_or_after, now};

/// Someone who appeared in a recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedParticipant {
    pub user_id: String,
    pub user_name: String,
    pub role: ParticipantRole,
    pub first_seen: DateTime<Utc>,
}

/// One session's ordered event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecording {
    pub session_id: String,
    pub events: Vec<RecordedEvent>,
    pub participants: Vec<RecordedParticipant>,
}

impl SessionRecording {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            events: Vec::new(),
            participants: Vec::new(),
        }
    }

    /// Time between the first and last event; zero with fewer than two
    pub fn duration(&self) -> Duration {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) if self.events.len() >= 2 => {
                last.timestamp - first.timestamp
            }
            _ => Duration::zero(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append an event, forcing timestamps to be non-decreasing
    pub(crate) fn push(&mut self, kind: RecordedEventKind, at: DateTime<Utc>) -> RecordedEvent {
        let timestamp = at_or_after(self.events.last().map(|e| e.timestamp), at);

        if let RecordedEventKind::SessionCreated {
            host_id, host_name, ..
        } = &kind
        {
            self.note_participant(host_id, host_name, ParticipantRole::Host, timestamp);
        }
        if let RecordedEventKind::ParticipantJoined {
            user_id,
            user_name,
            role,
        } = &kind
        {
            self.note_participant(user_id, user_name, *role, timestamp);
        }

        let event = RecordedEvent {
            sequence: self.events.len() as u64,
            timestamp,
            kind,
        };
        self.events.push(event.clone());
        event
    }

    fn note_participant(
        &mut self,
        user_id: &str,
        user_name: &str,
        role: ParticipantRole,
        at: DateTime<Utc>,
    ) {
        if let Some(existing) = self.participants.iter_mut().find(|p| p.user_id == user_id) {
            existing.user_name = user_name.to_string();
            return;
        }
        self.participants.push(RecordedParticipant {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            role,
            first_seen: at,
        });
    }
}

/// In-memory store of all recordings
pub struct RecordingStore {
    recordings: RwLock<HashMap<String, SessionRecording>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            recordings: RwLock::new(HashMap::new()),
        }
    }

    /// Append an event stamped with the current time
    pub fn record(&self, session_id: &str, kind: RecordedEventKind) -> RecordedEvent {
        self.record_at(session_id, kind, now())
    }

    /// Append an event with an explicit timestamp
    ///
    /// A timestamp earlier than the previous event is raised to match it.
    pub fn record_at(
        &self,
        session_id: &str,
        kind: RecordedEventKind,
        at: DateTime<Utc>,
    ) -> RecordedEvent {
        self.recordings
            .write()
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecording::new(session_id))
            .push(kind, at)
    }

    /// Copy of a session's recording, if anything was recorded
    pub fn get_recording(&self, session_id: &str) -> Option<SessionRecording> {
        self.recordings.read().get(session_id).cloned()
    }

    pub fn event_count(&self, session_id: &str) -> usize {
        self.recordings
            .read()
            .get(session_id)
            .map(SessionRecording::len)
            .unwrap_or(0)
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.recordings.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.recordings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.read().is_empty()
    }
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self::new()
    }
}
