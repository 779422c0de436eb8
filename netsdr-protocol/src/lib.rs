//! # netsdr-protocol
//!
//! Wire protocol implementation for NetSDR-class receivers.
//!
//! This crate provides:
//! - 16-bit header packing (3-bit message type, 13-bit length)
//! - Control item messages addressed by 16-bit item codes
//! - Data item messages carrying sequence-numbered sample blocks
//! - Sample extraction at 8, 16, 24 or 32 bits per sample
//! - Stream reassembly for the TCP control channel
//!
//! Every codec function is pure: it reads its arguments and returns a freshly
//! allocated result.

pub mod codec;
pub mod control;
pub mod data;
pub mod error;
pub mod header;
pub mod message;
pub mod samples;

pub use codec::{Decoder, Encoder};
pub use control::{ControlItem, ControlItemCode, MAX_CONTROL_PARAMETERS};
pub use data::{DataItem, MAX_DATA_ITEM_LENGTH};
pub use error::{InvalidFrame, ProtocolError};
pub use header::{Header, MessageType, HEADER_SIZE, MAX_MESSAGE_LENGTH};
pub use message::Message;
pub use samples::{extract, Sample, SampleWidth, Samples};

/// Default TCP port of the control channel.
pub const DEFAULT_CONTROL_PORT: u16 = 50000;

/// Default UDP port the receiver streams data items to.
pub const DEFAULT_DATA_PORT: u16 = 60000;
