//! 16-bit message header.
//!
//! Every NetSDR message starts with a little-endian 16-bit header:
//!
//! ```text
//! 15    13 12                                      0
//! +-------+-----------------------------------------+
//! | type  |                 length                  |
//! | 3 bits|                 13 bits                 |
//! +-------+-----------------------------------------+
//! ```
//!
//! `length` is the total message length in bytes, header included.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 2;

/// Largest value the 13-bit length field can hold.
pub const MAX_MESSAGE_LENGTH: usize = 0x1FFF;

const LENGTH_MASK: u16 = 0x1FFF;
const TYPE_SHIFT: u16 = 13;

/// Message type carried in the top three header bits.
///
/// The first four tags use control-item framing, the last four data-item
/// framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    SetControlItem,
    CurrentControlItem,
    ControlItemRange,
    Ack,
    DataItem0,
    DataItem1,
    DataItem2,
    DataItem3,
}

impl MessageType {
    /// All message types in wire order.
    pub const ALL: [MessageType; 8] = [
        MessageType::SetControlItem,
        MessageType::CurrentControlItem,
        MessageType::ControlItemRange,
        MessageType::Ack,
        MessageType::DataItem0,
        MessageType::DataItem1,
        MessageType::DataItem2,
        MessageType::DataItem3,
    ];

    /// Returns the 3-bit wire value.
    pub fn bits(self) -> u8 {
        match self {
            MessageType::SetControlItem => 0,
            MessageType::CurrentControlItem => 1,
            MessageType::ControlItemRange => 2,
            MessageType::Ack => 3,
            MessageType::DataItem0 => 4,
            MessageType::DataItem1 => 5,
            MessageType::DataItem2 => 6,
            MessageType::DataItem3 => 7,
        }
    }

    /// Decodes a 3-bit wire value. Bits above the low three are ignored.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => MessageType::SetControlItem,
            1 => MessageType::CurrentControlItem,
            2 => MessageType::ControlItemRange,
            3 => MessageType::Ack,
            4 => MessageType::DataItem0,
            5 => MessageType::DataItem1,
            6 => MessageType::DataItem2,
            _ => MessageType::DataItem3,
        }
    }

    /// Returns whether messages of this type carry an item code.
    pub fn is_control_item(self) -> bool {
        !self.is_data_item()
    }

    /// Returns whether messages of this type carry a sample payload.
    pub fn is_data_item(self) -> bool {
        matches!(
            self,
            MessageType::DataItem0
                | MessageType::DataItem1
                | MessageType::DataItem2
                | MessageType::DataItem3
        )
    }
}

/// A decoded message header.
///
/// The length always fits in 13 bits; headers are only built through
/// [`Header::new`] and [`Header::unpack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub(crate) msg_type: MessageType,
    pub(crate) length: u16,
}

impl Header {
    /// Creates a header, rejecting lengths the 13-bit field cannot hold.
    pub fn new(msg_type: MessageType, length: usize) -> Result<Self, ProtocolError> {
        if length > MAX_MESSAGE_LENGTH {
            return Err(ProtocolError::LengthExceeded {
                length,
                max: MAX_MESSAGE_LENGTH,
            });
        }
        Ok(Self {
            msg_type,
            length: length as u16,
        })
    }

    /// Message type.
    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    /// Total message length in bytes, or `0` for a data item whose length
    /// is not expressible.
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Packs the header into its 16-bit wire value.
    pub fn pack(&self) -> u16 {
        (self.length & LENGTH_MASK) | ((self.msg_type.bits() as u16) << TYPE_SHIFT)
    }

    /// Unpacks a 16-bit wire value. Every input decodes to some header.
    pub fn unpack(raw: u16) -> Self {
        Self {
            msg_type: MessageType::from_bits((raw >> TYPE_SHIFT) as u8),
            length: raw & LENGTH_MASK,
        }
    }

    /// Returns the little-endian wire bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        self.pack().to_le_bytes()
    }

    /// Reads a header from the first two bytes of `buf`.
    ///
    /// Returns `None` if `buf` is shorter than the header.
    pub fn peek(buf: &[u8]) -> Option<Self> {
        match buf {
            [lo, hi, ..] => Some(Self::unpack(u16::from_le_bytes([*lo, *hi]))),
            _ => None,
        }
    }
}

/// Packs a message type and total length into a header value.
pub fn pack(msg_type: MessageType, total_length: usize) -> Result<u16, ProtocolError> {
    Ok(Header::new(msg_type, total_length)?.pack())
}

/// Unpacks a header value into its message type and length.
pub fn unpack(raw: u16) -> (MessageType, u16) {
    let header = Header::unpack(raw);
    (header.msg_type, header.length)
}
