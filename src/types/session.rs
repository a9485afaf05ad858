//! Session-level types: status, creation options and read-only snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::participant::Participant;

/// Lifecycle status of a session
///
/// Transitions only ever go `Waiting -> Active -> Ended`, or straight
/// `Waiting -> Ended` when the host leaves before anyone else joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, host alone
    Waiting,
    /// Two or more live participants have been present
    Active,
    /// Terminal
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        }
    }

    /// Whether the session still accepts joins
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionStatus::Ended)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional arguments for `create_session`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Defaults to "{host_name}'s session"
    pub title: Option<String>,
    pub is_public: bool,
    pub lecturer_assistance: bool,
    /// Defaults to the engine's configured language
    pub language: Option<String>,
    /// Defaults to the engine's configured capacity
    pub max_participants: Option<usize>,
}

impl SessionOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_max_participants(mut self, max: usize) -> Self {
        self.max_participants = Some(max);
        self
    }

    pub fn with_lecturer_assistance(mut self) -> Self {
        self.lecturer_assistance = true;
        self
    }
}

/// Read-only snapshot of a session, including offline participants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub assignment_id: String,
    pub host_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
    pub content: String,
    pub language: String,
    pub online_count: usize,
    pub max_participants: usize,
    pub is_public: bool,
    pub lecturer_assistance: bool,
    /// Changes applied since creation, compacted ones included
    pub change_count: usize,
}

/// Listing entry for the public session browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSessionSummary {
    pub id: String,
    pub title: String,
    pub assignment_id: String,
    pub host_id: String,
    pub host_name: String,
    pub status: SessionStatus,
    pub language: String,
    pub online_count: usize,
    pub max_participants: usize,
    pub created_at: DateTime<Utc>,
}
