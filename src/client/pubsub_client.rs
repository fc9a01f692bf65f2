use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::identity::ConnectionId;
use crate::utils::error::{BrokerError, Result};

/// A connected WebSocket client as seen by the broker.
#[derive(Debug)]
pub struct Client {
    /// Identity assigned at accept time. Never changes.
    pub id: ConnectionId,

    /// Names of the channels this client has joined.
    pub channels: HashSet<String>,

    /// Bounded queue drained by the connection's writer task.
    sender: Sender<WsMessage>,

    /// Fired when the broker drops this client, so the transport can tear
    /// the socket down even while a write is stuck.
    shutdown: Arc<Notify>,
}

impl Client {
    pub fn new(id: ConnectionId, sender: Sender<WsMessage>) -> Self {
        Self {
            id,
            channels: HashSet::new(),
            sender,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Queues a frame without waiting.
    pub fn deliver(&self, frame: WsMessage) -> Result<()> {
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => BrokerError::Backpressure(self.id.clone()),
            TrySendError::Closed(_) => BrokerError::Closed(self.id.clone()),
        })
    }

    /// Handle the connection's tasks wait on for [`Client::shut_down`].
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Signals the connection to close. The permit is stored, so a task
    /// that starts waiting later still sees it.
    pub fn shut_down(&self) {
        self.shutdown.notify_one();
    }

    /// True once the writer task has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
