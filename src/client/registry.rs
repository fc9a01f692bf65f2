//! Connection registry
//!
//! Maps identities to live `Client`s. Registering an identity twice is an
//! internal invariant violation and is reported as
//! `BrokerError::DuplicateIdentity`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tungstenite::protocol::Message as WsMessage;

use crate::broker::identity::ConnectionId;
use crate::client::Client;
use crate::utils::error::{BrokerError, Result};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: HashMap<ConnectionId, Client>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn register(&mut self, client: Client) -> Result<()> {
        match self.clients.entry(client.id.clone()) {
            Entry::Occupied(entry) => Err(BrokerError::DuplicateIdentity(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(client);
                Ok(())
            }
        }
    }

    /// Removes a client and hands it back so the caller can clear its
    /// subscriptions.
    pub fn unregister(&mut self, client_id: &str) -> Option<Client> {
        self.clients.remove(client_id)
    }

    /// Queues one frame for `client_id`.
    pub fn send(&self, client_id: &str, frame: WsMessage) -> Result<()> {
        self.clients
            .get(client_id)
            .ok_or_else(|| BrokerError::UnknownConnection(client_id.to_string()))?
            .deliver(frame)
    }

    pub fn get(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn get_mut(&mut self, client_id: &str) -> Option<&mut Client> {
        self.clients.get_mut(client_id)
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ConnectionId> {
        self.clients.keys()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
