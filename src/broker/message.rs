//! Message definitions for the broker
//!
//! A `Message` only lives for the duration of one fan-out. The sender's
//! identity is captured when the message is built and never looked up
//! again.
//!
//! - `channel`: channel name used for routing
//! - `sender`: identity of the publishing connection
//! - `body`: opaque text, may contain colons
//! - `timestamp`: milliseconds since UNIX epoch, set at publish

use crate::broker::identity::ConnectionId;
use crate::transport::codec::ServerFrame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: String,
    pub sender: ConnectionId,
    pub body: String,
    pub timestamp: i64,
}

impl Message {
    pub fn new(channel: &str, sender: ConnectionId, body: String) -> Self {
        Self {
            channel: channel.to_string(),
            sender,
            body,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl From<&Message> for ServerFrame {
    fn from(msg: &Message) -> Self {
        ServerFrame::Msg {
            channel: msg.channel.clone(),
            sender: msg.sender.clone(),
            body: msg.body.clone(),
        }
    }
}
