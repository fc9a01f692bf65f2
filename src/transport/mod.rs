//! The `transport` module handles network communication with clients over
//! WebSockets.
//!
//! `codec` defines the colon-delimited text protocol; `websocket` runs the
//! server, one reader and one writer task per connection.

pub mod codec;
pub mod websocket;

#[cfg(test)]
mod tests;

pub use codec::{Command, FrameError, ServerFrame};
pub use websocket::{serve, start_websocket_server};
