//! Encoder and stream decoder for NetSDR messages.
//!
//! The control channel is a TCP byte stream, so reads do not line up with
//! message boundaries. [`Decoder`] buffers incoming bytes and splits them into
//! whole frames using the header length.
//!
//! A data item written with the length-not-expressible header has no
//! recoverable boundary on a stream. The decoder reports it and drops
//! everything buffered; such blocks only travel as UDP datagrams.

use crate::control::{self, ControlItemCode};
use crate::data::{self, LENGTH_NOT_EXPRESSIBLE, MAX_DATA_ITEM_LENGTH};
use crate::error::{InvalidFrame, ProtocolError};
use crate::header::{Header, MessageType, HEADER_SIZE};
use crate::message::Message;
use bytes::{Buf, Bytes, BytesMut};

/// Encodes messages into wire frames.
pub struct Encoder;

impl Encoder {
    /// Encodes a control item message.
    pub fn encode_control_item(
        msg_type: MessageType,
        item_code: ControlItemCode,
        parameters: &[u8],
    ) -> Result<BytesMut, ProtocolError> {
        control::build(msg_type, item_code, parameters)
    }

    /// Encodes a data item message.
    pub fn encode_data_item(
        msg_type: MessageType,
        parameters: &[u8],
    ) -> Result<BytesMut, ProtocolError> {
        data::build(msg_type, parameters)
    }

    /// Encodes any message.
    pub fn encode(message: &Message) -> Result<BytesMut, ProtocolError> {
        message.encode()
    }
}

/// Reassembles frames from a byte stream.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_DATA_ITEM_LENGTH),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to split the next complete frame off the buffer.
    ///
    /// Returns `Ok(None)` if more data is needed. A header whose length cannot
    /// describe any frame is dropped and reported, so the caller can keep
    /// reading. A data item without an expressible length clears the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Bytes>, InvalidFrame> {
        let header = match Header::peek(&self.buffer) {
            Some(header) => header,
            None => return Ok(None),
        };

        if header.msg_type().is_data_item() && header.length() == LENGTH_NOT_EXPRESSIBLE {
            self.buffer.clear();
            return Err(InvalidFrame::LengthNotExpressible);
        }

        let frame_len = header.length() as usize;
        if frame_len < HEADER_SIZE {
            self.buffer.advance(HEADER_SIZE);
            return Err(InvalidFrame::TooShort {
                len: frame_len,
                min: HEADER_SIZE,
            });
        }

        if self.buffer.len() < frame_len {
            return Ok(None);
        }

        Ok(Some(self.buffer.split_to(frame_len).freeze()))
    }

    /// Attempts to decode the next complete message from the buffer.
    pub fn decode_message(&mut self) -> Result<Option<Message>, InvalidFrame> {
        match self.decode_frame()? {
            Some(frame) => Message::parse(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
