//! Error types for broker operations.
//!
//! Failures local to one connection are reported through `BrokerError` and
//! handled by the caller; none of them are allowed to take the process down.

use thiserror::Error;

use crate::broker::identity::ConnectionId;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("identity {0} is already registered")]
    DuplicateIdentity(ConnectionId),

    #[error("no live connection with identity {0}")]
    UnknownConnection(ConnectionId),

    #[error("outbound queue for {0} is full")]
    Backpressure(ConnectionId),

    #[error("outbound path for {0} is closed")]
    Closed(ConnectionId),

    #[error("{connection} is not subscribed to {channel}")]
    NotSubscribed {
        connection: ConnectionId,
        channel: String,
    },

    #[error("connection limit of {limit} reached")]
    ServerFull { limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl BrokerError {
    /// Whether a delivery failure means the peer should be evicted.
    pub fn is_dead_peer(&self) -> bool {
        matches!(
            self,
            Self::Backpressure(_) | Self::Closed(_) | Self::UnknownConnection(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
