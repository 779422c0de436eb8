//! Data item messages.
//!
//! ```text
//! +--------+-----------------+--------------------------+
//! | header | sequence number | sample body              |
//! | 2 bytes| 2 bytes LE      | variable                 |
//! +--------+-----------------+--------------------------+
//! ```
//!
//! The builder treats everything after the header as opaque parameters. The
//! parser always splits the first two bytes off as the block sequence number.
//!
//! Data blocks may be longer than the 13-bit length field allows. Such
//! messages are written with length `0`, meaning the length is not
//! expressible and must be taken from the datagram. The device uses the same
//! convention for its largest block, [`MAX_DATA_ITEM_LENGTH`] bytes.

use crate::error::{InvalidFrame, ProtocolError};
use crate::header::{Header, MessageType, HEADER_SIZE, MAX_MESSAGE_LENGTH};
use bytes::{BufMut, Bytes, BytesMut};

/// Size of the sequence number field in bytes.
pub const SEQUENCE_NUMBER_SIZE: usize = 2;

/// Header length value used when the real length does not fit in 13 bits.
pub const LENGTH_NOT_EXPRESSIBLE: u16 = 0;

/// Length of the largest data block the device sends (8192 bytes of data,
/// framed).
pub const MAX_DATA_ITEM_LENGTH: usize = 8194;

/// A decoded data item message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    pub msg_type: MessageType,
    pub sequence_number: u16,
    pub body: Bytes,
}

impl DataItem {
    pub fn new(msg_type: MessageType, sequence_number: u16, body: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            sequence_number,
            body: body.into(),
        }
    }

    /// Encodes this message, writing the sequence number ahead of the body.
    ///
    /// Fails with [`ProtocolError::FramingMismatch`] when `msg_type` is a
    /// control item type.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        if !self.msg_type.is_data_item() {
            return Err(ProtocolError::FramingMismatch(self.msg_type));
        }
        let mut parameters = BytesMut::with_capacity(SEQUENCE_NUMBER_SIZE + self.body.len());
        parameters.put_u16_le(self.sequence_number);
        parameters.put_slice(&self.body);
        build(self.msg_type, &parameters)
    }
}

/// Returns the header length value for a data item of `total` bytes.
pub fn length_field(total: usize) -> u16 {
    if total > MAX_MESSAGE_LENGTH {
        LENGTH_NOT_EXPRESSIBLE
    } else {
        total as u16
    }
}

/// Builds a data item message.
///
/// Payloads of any size and any message type are accepted; see the module
/// docs for how oversize messages are framed. Never fails today; the
/// `Result` matches the other builders.
pub fn build(msg_type: MessageType, parameters: &[u8]) -> Result<BytesMut, ProtocolError> {
    let total = HEADER_SIZE + parameters.len();
    let header = Header {
        msg_type,
        length: length_field(total),
    };

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u16_le(header.pack());
    buf.put_slice(parameters);
    Ok(buf)
}

/// Parses a data item message.
///
/// When fewer than two bytes follow the header the sequence number is
/// reported as `0` and the body holds whatever remains. The header length is
/// not checked against `bytes`, so oversize blocks parse whatever length
/// field they carry.
pub fn parse(bytes: &[u8]) -> Result<DataItem, InvalidFrame> {
    if bytes.len() < HEADER_SIZE {
        return Err(InvalidFrame::TooShort {
            len: bytes.len(),
            min: HEADER_SIZE,
        });
    }

    let header = Header::unpack(u16::from_le_bytes([bytes[0], bytes[1]]));

    let rest = &bytes[HEADER_SIZE..];
    let (sequence_number, body) = match rest {
        [lo, hi, body @ ..] => (u16::from_le_bytes([*lo, *hi]), body),
        short => (0, short),
    };

    Ok(DataItem {
        msg_type: header.msg_type,
        sequence_number,
        body: Bytes::copy_from_slice(body),
    })
}
