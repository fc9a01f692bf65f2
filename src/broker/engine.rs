//! Broker engine
//!
//! This module owns the broker state:
//! - the `ChannelTable` (channel name → subscriber identities)
//! - the `ConnectionRegistry` (identity → outbound queue + joined channels)
//! - the `IdentityAllocator` used at accept time
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to be held behind one lock
//!   (`Arc<Mutex<Broker>>`) by the transport layer. Every call is one atomic
//!   step relative to other connections.
//! - Outbound frames are pushed with `try_send` into bounded queues, so no
//!   call here ever waits on a socket. Peers whose queue is full or closed
//!   are evicted.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::channel::ChannelTable;
use crate::broker::identity::{ConnectionId, IdentityAllocator};
use crate::client::{Client, ConnectionRegistry};
use crate::config::BrokerSettings;
use crate::transport::codec::ServerFrame;
use crate::utils::error::{BrokerError, Result};

#[derive(Debug)]
pub struct Broker {
    pub(crate) channels: ChannelTable,
    pub(crate) clients: ConnectionRegistry,
    identities: IdentityAllocator,
    settings: BrokerSettings,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerSettings::default())
    }
}

impl Broker {
    pub fn new(settings: BrokerSettings) -> Self {
        Self::with_identity_allocator(settings, IdentityAllocator::new())
    }

    pub fn with_identity_allocator(settings: BrokerSettings, identities: IdentityAllocator) -> Self {
        Self {
            channels: ChannelTable::new(settings.prune_empty_channels),
            clients: ConnectionRegistry::new(),
            identities,
            settings,
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn clients(&self) -> &ConnectionRegistry {
        &self.clients
    }

    /// Admits a new connection whose outbound queue is fed by `sender`.
    ///
    /// Allocates and registers an identity, then queues the `IDENTITY` frame
    /// followed by the `CHANNELS` snapshot.
    pub fn connect(&mut self, sender: mpsc::Sender<WsMessage>) -> Result<ConnectionId> {
        if self.clients.len() >= self.settings.max_connections {
            return Err(BrokerError::ServerFull {
                limit: self.settings.max_connections,
            });
        }

        let clients = &self.clients;
        let client_id = self.identities.allocate(|id| clients.contains(id));
        self.clients.register(Client::new(client_id.clone(), sender))?;
        info!("Registered {client_id} ({} live)", self.clients.len());

        let snapshot = self.channels.channel_names();
        self.reply(&client_id, ServerFrame::Identity(client_id.clone()));
        self.reply(&client_id, ServerFrame::Channels(snapshot));

        Ok(client_id)
    }

    /// Removes a connection and all of its subscriptions, and signals its
    /// transport tasks to close the socket.
    ///
    /// Safe to call more than once; returns whether the identity was live.
    pub fn disconnect(&mut self, client_id: &str) -> bool {
        match self.clients.unregister(client_id) {
            Some(client) => {
                client.shut_down();
                for channel in &client.channels {
                    self.channels.unsubscribe(channel, client_id);
                    debug!("Unsubscribed {client_id} from channel {channel}");
                }
                info!("Cleaned up client {client_id}");
                true
            }
            None => {
                self.channels.remove_everywhere(client_id);
                false
            }
        }
    }

    /// Subscribes a live connection to a channel. Duplicate subscribes are
    /// ignored.
    pub fn subscribe(&mut self, client_id: &str, channel: &str) -> Result<()> {
        let client = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| BrokerError::UnknownConnection(client_id.to_string()))?;
        client.channels.insert(channel.to_string());
        self.channels.subscribe(channel, client_id.to_string());
        Ok(())
    }

    /// Unsubscribes a live connection. Leaving a channel never joined is a
    /// no-op.
    pub fn unsubscribe(&mut self, client_id: &str, channel: &str) -> Result<()> {
        let client = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| BrokerError::UnknownConnection(client_id.to_string()))?;
        client.channels.remove(channel);
        self.channels.unsubscribe(channel, client_id);
        Ok(())
    }

    /// Queues one frame for a single connection, evicting it if its
    /// outbound path is full or gone.
    pub(crate) fn reply(&mut self, client_id: &str, frame: ServerFrame) -> bool {
        match self.clients.send(client_id, frame.into()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send to {client_id}: {e}");
                if e.is_dead_peer() {
                    self.disconnect(client_id);
                }
                false
            }
        }
    }
}
