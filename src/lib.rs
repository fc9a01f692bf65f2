//! # chanbus
//!
//! `chanbus` is an in-memory channel publish/subscribe broker. Clients connect
//! over WebSockets, receive an identity, join named channels, and publish
//! text that is fanned out to every current subscriber of the channel.
//!
//! ## Core Modules
//!
//! - `broker`: channel table, identity allocation, and the fan-out router.
//! - `client`: the broker-side connection handle and the connection registry.
//! - `config`: loads server, broker, and logging settings.
//! - `transport`: the text frame codec and the WebSocket server.
//! - `agent`: a small protocol client used for smoke tests.
//! - `utils`: error types and logging setup.

pub mod agent;
pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
