//! Utility functions and helpers
//!
//! Timestamp helpers and tracing setup.

pub mod logging;
pub mod time;

pub use logging::init_tracing;
pub use time::{at_or_after, now};
