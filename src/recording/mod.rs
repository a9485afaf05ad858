//! Session recordings for replay
//!
//! - `RecordingStore`: per-session append-only event logs, kept in memory
//! - `SessionRecording`: one session's log plus replay and export helpers
//!
//! # Architecture
//!
//! ```text
//! Write Path (under the session lock):
//! ┌──────────────┐    ┌──────────────────┐    ┌────────────────────────┐
//! │ Registry op  │───►│ record()         │───►│ clamp timestamp,       │
//! │ committed    │    │ per session      │    │ assign sequence, append│
//! └──────────────┘    └──────────────────┘    └────────────────────────┘
//!
//! Read Path:
//! ┌──────────────────┐    ┌──────────────────────┐
//! │ get_recording()  │───►│ replay(): fold change │───► document content
//! │ (cloned log)     │    │ events over the seed  │
//! └──────────────────┘    └──────────────────────┘
//! ```

mod replay;
mod store;

pub use store::{RecordedParticipant, RecordingStore, SessionRecording};
