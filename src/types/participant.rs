//! Participant roster entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cursor colours handed out in join order
pub const PARTICIPANT_COLORS: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
];

/// Pick the colour for the n-th roster entry
pub fn color_for_index(index: usize) -> &'static str {
    PARTICIPANT_COLORS[index % PARTICIPANT_COLORS.len()]
}

/// Role of a user inside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// Creator of the session; fixed at creation
    Host,
    #[default]
    Participant,
    Observer,
    /// May join over capacity
    Lecturer,
}

impl ParticipantRole {
    /// Lecturers are never turned away by the capacity check
    pub fn bypasses_capacity(&self) -> bool {
        matches!(self, ParticipantRole::Lecturer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Host => "host",
            ParticipantRole::Participant => "participant",
            ParticipantRole::Observer => "observer",
            ParticipantRole::Lecturer => "lecturer",
        }
    }
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user attached to a session
///
/// Entries are never removed from a roster; leaving only clears `is_online`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub role: ParticipantRole,
    /// Advisory offset in the document, not bounds-checked
    pub cursor_position: usize,
    pub joined_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_online: bool,
    pub color: String,
}

impl Participant {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        role: ParticipantRole,
        color: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            role,
            cursor_position: 0,
            joined_at: now,
            last_activity: now,
            is_online: true,
            color: color.into(),
        }
    }

    /// Refresh last activity
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }
}
