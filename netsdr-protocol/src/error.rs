//! Protocol error types.
//!
//! Two families of failure exist. [`ProtocolError`] is returned by the
//! encoders and the sample extractor when the caller passes arguments the
//! wire format cannot carry. [`InvalidFrame`] is returned by the parsers for
//! bytes received from the network; it never indicates a bug in the caller
//! and a receive loop is expected to log it and carry on.

use crate::header::MessageType;
use thiserror::Error;

/// Errors raised while encoding messages or decoding samples.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("message length exceeded: {length} bytes (max {max})")]
    LengthExceeded { length: usize, max: usize },

    #[error("sample size out of range: {0} bits (expected 8, 16, 24 or 32)")]
    SampleSizeOutOfRange(u16),

    #[error("message type {0:?} cannot be used with this framing")]
    FramingMismatch(MessageType),

    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] InvalidFrame),
}

/// Reasons an inbound buffer is not a valid message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidFrame {
    #[error("frame too short: {len} bytes (need at least {min})")]
    TooShort { len: usize, min: usize },

    #[error("unknown control item code: {0:#06x}")]
    UnknownItemCode(u16),

    #[error("data item length not expressible in a byte stream")]
    LengthNotExpressible,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::LengthExceeded {
            length: 8192,
            max: 8191,
        };
        let msg = err.to_string();
        assert!(msg.contains("8192"));
        assert!(msg.contains("8191"));

        let err = ProtocolError::SampleSizeOutOfRange(40);
        assert!(err.to_string().contains("40"));

        let err = ProtocolError::FramingMismatch(MessageType::DataItem2);
        assert!(err.to_string().contains("DataItem2"));
    }

    #[test]
    fn test_invalid_frame_display() {
        let err = InvalidFrame::TooShort { len: 1, min: 2 };
        assert!(err.to_string().contains("too short"));

        // Item codes are shown in hex
        let err = InvalidFrame::UnknownItemCode(0x1234);
        assert!(err.to_string().contains("0x1234"));

        let err = InvalidFrame::LengthNotExpressible;
        assert!(err.to_string().contains("not expressible"));
    }

    #[test]
    fn test_invalid_frame_converts_to_protocol_error() {
        let err: ProtocolError = InvalidFrame::UnknownItemCode(0xFFFF).into();
        assert!(matches!(
            err,
            ProtocolError::InvalidFrame(InvalidFrame::UnknownItemCode(0xFFFF))
        ));
    }
}
