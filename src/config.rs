//! Engine configuration
//!
//! Defaults match a small classroom setup. Every field can be overridden
//! through a `COLLAB_*` environment variable; see [`EngineConfig::from_env`].

use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::time::seconds;

/// Configuration for the session registry and its side channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Live participant cap for new sessions (lecturers may exceed it)
    pub max_participants: usize,
    /// Language tag for sessions that don't specify one
    pub default_language: String,
    /// Waiting sessions idle this long are ended by the reaper
    pub idle_timeout_secs: u64,
    /// Ended sessions stay queryable this long before removal
    pub ended_retention_secs: u64,
    /// Reaper tick
    pub reap_interval_secs: u64,
    /// Keep at most this many changes in memory per session
    pub history_limit: Option<usize>,
    /// Buffer for the observer tap; slow observers lose messages past it
    pub tap_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_participants: 4,
            default_language: "python".to_string(),
            idle_timeout_secs: 30 * 60,
            ended_retention_secs: 10 * 60,
            reap_interval_secs: 60,
            history_limit: None,
            tap_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by any parseable `COLLAB_*` variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by `from_env` and tests)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        match parse::<_, usize>(&lookup, "COLLAB_MAX_PARTICIPANTS") {
            Some(0) => warn!("Ignoring COLLAB_MAX_PARTICIPANTS=0, a session must fit its host"),
            Some(v) => config.max_participants = v,
            None => {}
        }
        if let Some(lang) = lookup("COLLAB_DEFAULT_LANGUAGE").filter(|l| !l.trim().is_empty()) {
            config.default_language = lang.trim().to_string();
        }
        if let Some(v) = parse(&lookup, "COLLAB_IDLE_TIMEOUT_SECS") {
            config.idle_timeout_secs = v;
        }
        if let Some(v) = parse(&lookup, "COLLAB_ENDED_RETENTION_SECS") {
            config.ended_retention_secs = v;
        }
        if let Some(v) = parse(&lookup, "COLLAB_REAP_INTERVAL_SECS") {
            config.reap_interval_secs = v;
        }
        if let Some(v) = parse(&lookup, "COLLAB_HISTORY_LIMIT") {
            config.history_limit = Some(v);
        }
        if let Some(v) = parse(&lookup, "COLLAB_TAP_CAPACITY") {
            config.tap_capacity = v;
        }

        config
    }

    pub fn with_max_participants(mut self, max: usize) -> Self {
        self.max_participants = max;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn idle_timeout(&self) -> chrono::Duration {
        seconds(self.idle_timeout_secs)
    }

    pub fn ended_retention(&self) -> chrono::Duration {
        seconds(self.ended_retention_secs)
    }

    /// Never zero; tokio intervals panic on a zero period
    pub fn reap_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reap_interval_secs.max(1))
    }
}

fn parse<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}
