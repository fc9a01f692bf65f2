//! The `broker` module holds the shared routing state and its operations.
//!
//! - `identity`: issues a unique identity to each new connection.
//! - `channel`: the channel subscription table.
//! - `engine`: the `Broker` itself (connect, disconnect, subscribe,
//!   unsubscribe).
//! - `router`: command dispatch and publish fan-out.
//!
//! The transport keeps one `Broker` behind an `Arc<Mutex<_>>`.

pub mod channel;
pub mod engine;
pub mod identity;
pub mod message;
pub mod router;

pub use engine::Broker;
pub use identity::ConnectionId;
pub use router::FanOutReport;
