//! Broadcast gateway - best-effort fan-out of session events
//!
//! The transport registers one [`Connection`] per user. The registry keeps
//! the per-session subscriber sets current as users join and leave, and calls
//! [`BroadcastGateway::broadcast`] after every committed mutation.
//!
//! Delivery never blocks and never fails the caller: a full or closed
//! connection is logged, counted and skipped.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::types::SessionEvent;

/// Envelope delivered to every recipient
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub session_id: String,

    /// Gateway-wide, monotonically increasing; clients use it for gap detection
    pub sequence_id: u64,

    /// Unix timestamp in milliseconds
    pub timestamp: i64,

    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Why a single delivery failed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection buffer is full")]
    Full,
    #[error("connection is closed")]
    Closed,
}

/// A per-user delivery channel supplied by the transport
///
/// Implementations must not block.
pub trait Connection: Send + Sync {
    fn deliver(&self, message: &BroadcastMessage) -> Result<(), DeliveryError>;
}

impl Connection for mpsc::Sender<BroadcastMessage> {
    fn deliver(&self, message: &BroadcastMessage) -> Result<(), DeliveryError> {
        self.try_send(message.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

impl Connection for mpsc::UnboundedSender<BroadcastMessage> {
    fn deliver(&self, message: &BroadcastMessage) -> Result<(), DeliveryError> {
        self.send(message.clone()).map_err(|_| DeliveryError::Closed)
    }
}

/// Result of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sequence_id: u64,
    pub delivered: usize,
    pub failed: usize,
}

/// Counters for monitoring gateway health
#[derive(Debug, Clone, Default)]
pub struct BroadcastStats {
    pub messages_sent: u64,
    pub delivery_failures: u64,
    pub connected_users: usize,
}

/// Fan-out hub shared by the registry and the transport
pub struct BroadcastGateway {
    /// User ID -> delivery channel
    connections: RwLock<HashMap<String, Arc<dyn Connection>>>,

    /// Session ID -> users that should receive its events
    subscribers: RwLock<HashMap<String, HashSet<String>>>,

    /// Every message of every session, for observers
    tap: broadcast::Sender<BroadcastMessage>,

    /// Next sequence id; held while an id is taken and published to the tap
    sequence: Mutex<u64>,
    messages_sent: AtomicU64,
    delivery_failures: AtomicU64,
}

impl BroadcastGateway {
    /// Create a gateway whose observer tap buffers `tap_capacity` messages
    pub fn new(tap_capacity: usize) -> Self {
        let (tap, _) = broadcast::channel(tap_capacity.max(1));
        Self {
            connections: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            tap,
            sequence: Mutex::new(0),
            messages_sent: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
        }
    }

    /// Register (or replace) the delivery channel for a user
    pub fn register_connection<C>(&self, user_id: &str, connection: C)
    where
        C: Connection + 'static,
    {
        let replaced = self
            .connections
            .write()
            .insert(user_id.to_string(), Arc::new(connection))
            .is_some();
        debug!(user_id, replaced, "Registered connection");
    }

    /// Drop a user's delivery channel; returns false if none was registered
    pub fn unregister_connection(&self, user_id: &str) -> bool {
        let removed = self.connections.write().remove(user_id).is_some();
        if removed {
            debug!(user_id, "Unregistered connection");
        }
        removed
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.connections.read().contains_key(user_id)
    }

    /// Route a session's events to a user
    pub fn subscribe(&self, session_id: &str, user_id: &str) {
        self.subscribers
            .write()
            .entry(session_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    /// Stop routing a session's events to a user
    pub fn unsubscribe(&self, session_id: &str, user_id: &str) {
        let mut subscribers = self.subscribers.write();
        if let Some(users) = subscribers.get_mut(session_id) {
            users.remove(user_id);
            if users.is_empty() {
                subscribers.remove(session_id);
            }
        }
    }

    /// Forget every subscriber of a session
    pub fn drop_session(&self, session_id: &str) {
        self.subscribers.write().remove(session_id);
    }

    pub fn session_subscribers(&self, session_id: &str) -> Vec<String> {
        self.subscribers
            .read()
            .get(session_id)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Observe every broadcast message
    pub fn subscribe_tap(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.tap.subscribe()
    }

    /// Fan an event out to a session's subscribers, optionally skipping one
    pub fn broadcast(
        &self,
        session_id: &str,
        event: SessionEvent,
        exclude_user: Option<&str>,
    ) -> DeliveryReport {
        // Observers on the tap see ids in increasing order across sessions
        let message = {
            let mut next = self.sequence.lock();
            let message = BroadcastMessage {
                session_id: session_id.to_string(),
                sequence_id: *next,
                timestamp: chrono::Utc::now().timestamp_millis(),
                event,
            };
            *next += 1;
            // No observers is fine
            let _ = self.tap.send(message.clone());
            message
        };
        let sequence_id = message.sequence_id;

        let recipients = self.recipients(session_id, exclude_user);
        let mut report = DeliveryReport {
            sequence_id,
            ..Default::default()
        };

        for (user_id, connection) in recipients {
            match connection.deliver(&message) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        session_id,
                        user_id = %user_id,
                        event = message.event.name(),
                        "Delivery failed: {}",
                        e
                    );
                }
            }
        }

        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);

        report
    }

    /// Snapshot connections outside the delivery loop so no lock is held
    /// while a connection runs
    fn recipients(
        &self,
        session_id: &str,
        exclude_user: Option<&str>,
    ) -> Vec<(String, Arc<dyn Connection>)> {
        let subscribers = self.subscribers.read();
        let Some(users) = subscribers.get(session_id) else {
            return Vec::new();
        };
        let connections = self.connections.read();

        users
            .iter()
            .filter(|user_id| Some(user_id.as_str()) != exclude_user)
            .filter_map(|user_id| {
                connections
                    .get(user_id)
                    .map(|conn| (user_id.clone(), Arc::clone(conn)))
            })
            .collect()
    }

    pub fn current_sequence_id(&self) -> u64 {
        *self.sequence.lock()
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            connected_users: self.connections.read().len(),
        }
    }
}

impl Default for BroadcastGateway {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EndReason;

    fn ended() -> SessionEvent {
        SessionEvent::SessionEnded {
            reason: EndReason::HostLeft,
        }
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let gateway = BroadcastGateway::new(16);
        let (tx_a, mut rx_a) = mpsc::unbounded_channel::<BroadcastMessage>();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel::<BroadcastMessage>();
        gateway.register_connection("a", tx_a);
        gateway.register_connection("b", tx_b);
        gateway.subscribe("s1", "a");
        gateway.subscribe("s1", "b");

        let report = gateway.broadcast("s1", ended(), Some("a"));
        assert_eq!(report.delivered, 1);
        assert!(rx_a.try_recv().is_err());

        let msg = rx_b.try_recv().unwrap();
        assert_eq!(msg.session_id, "s1");
        assert_eq!(msg.sequence_id, 0);
    }

    #[test]
    fn test_failed_recipient_does_not_stop_others() {
        let gateway = BroadcastGateway::new(16);
        let (tx_full, _rx_full) = mpsc::channel::<BroadcastMessage>(1);
        let (tx_closed, rx_closed) = mpsc::unbounded_channel::<BroadcastMessage>();
        let (tx_ok, mut rx_ok) = mpsc::unbounded_channel::<BroadcastMessage>();
        drop(rx_closed);

        gateway.register_connection("full", tx_full);
        gateway.register_connection("closed", tx_closed);
        gateway.register_connection("ok", tx_ok);
        for user in ["full", "closed", "ok"] {
            gateway.subscribe("s1", user);
        }

        gateway.broadcast("s1", ended(), None);
        let report = gateway.broadcast("s1", ended(), None);

        // "full" accepted the first message only; "closed" never accepts
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(rx_ok.try_recv().unwrap().sequence_id, 0);
        assert_eq!(rx_ok.try_recv().unwrap().sequence_id, 1);
        assert_eq!(gateway.stats().delivery_failures, 3);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let gateway = BroadcastGateway::new(16);
        let (tx, mut rx) = mpsc::unbounded_channel::<BroadcastMessage>();
        gateway.register_connection("a", tx);
        gateway.subscribe("s1", "a");

        gateway.broadcast("s2", ended(), None);
        assert!(rx.try_recv().is_err());

        gateway.unsubscribe("s1", "a");
        gateway.broadcast("s1", ended(), None);
        assert!(rx.try_recv().is_err());
        assert!(gateway.session_subscribers("s1").is_empty());
    }

    #[test]
    fn test_unregistered_user_is_skipped() {
        let gateway = BroadcastGateway::new(16);
        gateway.subscribe("s1", "ghost");
        let report = gateway.broadcast("s1", ended(), None);
        assert_eq!(report, DeliveryReport { sequence_id: 0, delivered: 0, failed: 0 });
        assert!(!gateway.unregister_connection("ghost"));
    }

    #[tokio::test]
    async fn test_tap_sees_every_message() {
        let gateway = BroadcastGateway::new(16);
        let mut tap = gateway.subscribe_tap();

        gateway.broadcast("s1", ended(), None);
        gateway.broadcast("s2", ended(), None);

        assert_eq!(tap.recv().await.unwrap().session_id, "s1");
        assert_eq!(tap.recv().await.unwrap().session_id, "s2");
        assert_eq!(gateway.current_sequence_id(), 2);
    }

    #[test]
    fn test_tap_order_matches_ids_across_threads() {
        use std::thread;

        let gateway = Arc::new(BroadcastGateway::new(1024));
        let mut tap = gateway.subscribe_tap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let gateway = Arc::clone(&gateway);
                thread::spawn(move || {
                    let session_id = format!("s{}", t);
                    for _ in 0..50 {
                        gateway.broadcast(&session_id, ended(), None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut ids = Vec::new();
        while let Ok(message) = tap.try_recv() {
            ids.push(message.sequence_id);
        }
        assert_eq!(ids.len(), 200);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(gateway.current_sequence_id(), 200);
    }
}
