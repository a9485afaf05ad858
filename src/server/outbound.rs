//! Client connections for the stdio transport
//!
//! One stdio client speaks for many users. Each connected user gets a
//! [`ClientConnection`] that tags broadcasts with the recipient and hands
//! them to the server's write loop.

use tokio::sync::mpsc;

use crate::broadcast::{BroadcastMessage, Connection, DeliveryError};

/// A broadcast addressed to one user
#[derive(Debug, Clone)]
pub struct Outbound {
    pub user_id: String,
    pub message: BroadcastMessage,
}

pub struct ClientConnection {
    user_id: String,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ClientConnection {
    pub fn new(user_id: impl Into<String>, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            user_id: user_id.into(),
            tx,
        }
    }
}

impl Connection for ClientConnection {
    fn deliver(&self, message: &BroadcastMessage) -> Result<(), DeliveryError> {
        self.tx
            .send(Outbound {
                user_id: self.user_id.clone(),
                message: message.clone(),
            })
            .map_err(|_| DeliveryError::Closed)
    }
}
