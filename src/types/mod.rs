//! Data types for the collaboration engine
//!
//! This module contains the core data structures shared by the session,
//! registry, broadcast and recording layers.

mod change;
mod event;
mod participant;
mod session;

pub use change::{Change, Operation};
pub use event::{EndReason, RecordedEvent, RecordedEventKind, SessionEvent};
pub use participant::{color_for_index, Participant, ParticipantRole, PARTICIPANT_COLORS};
pub use session::{PublicSessionSummary, SessionInfo, SessionOptions, SessionStatus};

