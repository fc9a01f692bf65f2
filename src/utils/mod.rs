//! The `utils` module provides shared building blocks used across `chanbus`.
//!
//! - `error`: the crate-wide `BrokerError` type and `Result` alias.
//! - `logging`: installs the `tracing` subscriber.

pub mod error;
pub mod logging;
