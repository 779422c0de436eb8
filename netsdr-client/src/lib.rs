//! # netsdr-client
//!
//! Client library for NetSDR receivers.
//!
//! This crate provides:
//! - Async TCP control channel with request/reply matching
//! - High-level API for getting, setting and ranging control items
//! - UDP receiver for the data item stream with loss detection

pub mod client;
pub mod connection;
pub mod error;
pub mod receiver;
pub mod sequence;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
pub use receiver::{DataReceiver, ReceiverConfig};
pub use sequence::{SequenceEvent, SequenceStats, SequenceTracker};
