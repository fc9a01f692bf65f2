//! The `client` module defines the broker-side view of a connected client.
//!
//! `Client` bundles a connection's identity, its bounded outbound queue, and
//! the channels it has joined. `ConnectionRegistry` tracks every live
//! `Client` by identity.

pub mod pubsub_client;
pub mod registry;

pub use pubsub_client::Client;
pub use registry::ConnectionRegistry;

#[cfg(test)]
mod tests;
