//! Replay and export of recorded sessions

use std::io::Write;

use chrono::{DateTime, Utc};

use super::SessionRecording;
use crate::document::apply_operation;
use crate::error::CollabResult;
use crate::types::{Change, RecordedEventKind};

impl SessionRecording {
    /// Document content at session creation, if the creation was recorded
    pub fn seed(&self) -> Option<&str> {
        self.events.iter().find_map(|event| match &event.kind {
            RecordedEventKind::SessionCreated { seed, .. } => Some(seed.as_str()),
            _ => None,
        })
    }

    /// Applied changes in recorded order
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.events.iter().filter_map(|event| match &event.kind {
            RecordedEventKind::ChangeApplied { change } => Some(change),
            _ => None,
        })
    }

    /// Rebuild the final document by folding every change over the seed
    pub fn replay(&self) -> Option<String> {
        self.replay_while(|_| true)
    }

    /// Rebuild the document as it was at `at` (events at `at` included)
    pub fn content_at(&self, at: DateTime<Utc>) -> Option<String> {
        self.replay_while(|timestamp| timestamp <= at)
    }

    fn replay_while<F>(&self, keep: F) -> Option<String>
    where
        F: Fn(DateTime<Utc>) -> bool,
    {
        let seed = self.seed()?;
        let content = self
            .events
            .iter()
            .take_while(|event| keep(event.timestamp))
            .filter_map(|event| match &event.kind {
                RecordedEventKind::ChangeApplied { change } => Some(&change.operation),
                _ => None,
            })
            .fold(seed.to_string(), |content, op| apply_operation(&content, op));
        Some(content)
    }

    /// Write one JSON object per event, oldest first
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> CollabResult<()> {
        for event in &self.events {
            serde_json::to_writer(&mut writer, event)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::recording::RecordingStore;
    use crate::types::{Change, Operation, RecordedEvent, RecordedEventKind};

    fn created(seed: &str) -> RecordedEventKind {
        RecordedEventKind::SessionCreated {
            host_id: "h1".to_string(),
            host_name: "Host".to_string(),
            title: "t".to_string(),
            language: "python".to_string(),
            seed: seed.to_string(),
        }
    }

    fn applied(op: Operation) -> RecordedEventKind {
        RecordedEventKind::ChangeApplied {
            change: Change::new("h1", op, chrono::Utc::now()),
        }
    }

    #[test]
    fn test_replay_folds_changes_over_seed() {
        let store = RecordingStore::new();
        store.record("s1", created("abc"));
        store.record("s1", applied(Operation::insert(3, "def")));
        store.record("s1", applied(Operation::delete(0, 1)));

        let recording = store.get_recording("s1").unwrap();
        assert_eq!(recording.seed(), Some("abc"));
        assert_eq!(recording.changes().count(), 2);
        assert_eq!(recording.replay().as_deref(), Some("bcdef"));
    }

    #[test]
    fn test_content_at_stops_at_timestamp() {
        let store = RecordingStore::new();
        let t0 = chrono::Utc::now();
        store.record_at("s1", created(""), t0);
        store.record_at("s1", applied(Operation::insert(0, "one")), t0 + Duration::seconds(1));
        store.record_at("s1", applied(Operation::insert(3, " two")), t0 + Duration::seconds(2));

        let recording = store.get_recording("s1").unwrap();
        assert_eq!(recording.content_at(t0).as_deref(), Some(""));
        assert_eq!(
            recording.content_at(t0 + Duration::seconds(1)).as_deref(),
            Some("one")
        );
        assert_eq!(recording.replay().as_deref(), Some("one two"));
    }

    #[test]
    fn test_replay_without_seed() {
        let store = RecordingStore::new();
        store.record("s1", applied(Operation::insert(0, "x")));
        assert!(store.get_recording("s1").unwrap().replay().is_none());
    }

    #[test]
    fn test_write_jsonl() {
        let store = RecordingStore::new();
        store.record("s1", created("seed"));
        store.record("s1", applied(Operation::insert(0, "x")));

        let mut out = Vec::new();
        store.get_recording("s1").unwrap().write_jsonl(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: RecordedEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.sequence, 1);
        assert!(matches!(parsed.kind, RecordedEventKind::ChangeApplied { .. }));
    }
}
