//! Channel management
//!
//! A `Channel` holds the identities subscribed to one channel name, and the
//! `ChannelTable` maps names to channels. Channels are created on first
//! subscribe. Whether a channel that loses its last subscriber is dropped
//! depends on `prune_empty`; by default it stays listed.
//!
//! Concurrency note: the table is owned by the `Broker` and only touched
//! under the broker lock.

use std::collections::{BTreeMap, HashSet};

use crate::broker::identity::ConnectionId;

#[derive(Debug, Default)]
pub struct Channel {
    pub name: String,
    pub subscribers: HashSet<ConnectionId>,
}

impl Channel {
    /// Create a new channel with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Add a subscriber. Returns false if it was already present.
    pub fn subscribe(&mut self, id: ConnectionId) -> bool {
        self.subscribers.insert(id)
    }

    /// Remove a subscriber. Returns false if it was not present.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        self.subscribers.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ChannelTable {
    channels: BTreeMap<String, Channel>,
    prune_empty: bool,
}

impl ChannelTable {
    pub fn new(prune_empty: bool) -> Self {
        Self {
            channels: BTreeMap::new(),
            prune_empty,
        }
    }

    /// Subscribes `id` to `channel`, creating the channel if needed.
    pub fn subscribe(&mut self, channel: &str, id: ConnectionId) -> bool {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| Channel::new(channel))
            .subscribe(id)
    }

    /// Unsubscribes `id` from `channel`. Unknown channels are a no-op.
    pub fn unsubscribe(&mut self, channel: &str, id: &str) -> bool {
        let Some(entry) = self.channels.get_mut(channel) else {
            return false;
        };
        let removed = entry.unsubscribe(id);
        if removed && self.prune_empty && entry.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }

    /// Drops `id` from every channel and returns the names it was removed from.
    pub fn remove_everywhere(&mut self, id: &str) -> Vec<String> {
        let joined: Vec<String> = self
            .channels
            .values()
            .filter(|c| c.subscribers.contains(id))
            .map(|c| c.name.clone())
            .collect();
        for name in &joined {
            self.unsubscribe(name, id);
        }
        joined
    }

    /// Owned copy of the channel's current subscribers.
    ///
    /// Fan-out iterates this copy, never the live set.
    pub fn subscribers_of(&self, channel: &str) -> Vec<ConnectionId> {
        self.channels
            .get(channel)
            .map(|c| c.subscribers.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, channel: &str, id: &str) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|c| c.subscribers.contains(id))
    }

    /// Known channel names in sorted order.
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn get(&self, channel: &str) -> Option<&Channel> {
        self.channels.get(channel)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
