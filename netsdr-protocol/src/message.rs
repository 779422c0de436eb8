//! Typed NetSDR messages.

use crate::control::{self, ControlItem, ControlItemCode};
use crate::data::{self, DataItem};
use crate::error::{InvalidFrame, ProtocolError};
use crate::header::{Header, MessageType, HEADER_SIZE};
use bytes::{Bytes, BytesMut};

/// A decoded message of either framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Control(ControlItem),
    Data(DataItem),
}

impl Message {
    /// Parses one complete message, choosing the framing from the header type.
    ///
    /// Never panics on malformed input; every failure is reported as
    /// [`InvalidFrame`].
    pub fn parse(bytes: &[u8]) -> Result<Self, InvalidFrame> {
        let header = Header::peek(bytes).ok_or(InvalidFrame::TooShort {
            len: bytes.len(),
            min: HEADER_SIZE,
        })?;

        if header.msg_type.is_control_item() {
            control::parse(bytes).map(Message::Control)
        } else {
            data::parse(bytes).map(Message::Data)
        }
    }

    /// Encodes this message.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        match self {
            Message::Control(item) => item.encode(),
            Message::Data(item) => item.encode(),
        }
    }

    pub fn msg_type(&self) -> MessageType {
        match self {
            Message::Control(item) => item.msg_type,
            Message::Data(item) => item.msg_type,
        }
    }

    /// Item code, or [`ControlItemCode::None`] for data items.
    pub fn item_code(&self) -> ControlItemCode {
        match self {
            Message::Control(item) => item.item_code,
            Message::Data(_) => ControlItemCode::None,
        }
    }

    /// Sequence number, or `0` for control items.
    pub fn sequence_number(&self) -> u16 {
        match self {
            Message::Control(_) => 0,
            Message::Data(item) => item.sequence_number,
        }
    }

    /// Control item parameters or data item body.
    pub fn body(&self) -> &Bytes {
        match self {
            Message::Control(item) => &item.parameters,
            Message::Data(item) => &item.body,
        }
    }

    pub fn as_control(&self) -> Option<&ControlItem> {
        match self {
            Message::Control(item) => Some(item),
            Message::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataItem> {
        match self {
            Message::Control(_) => None,
            Message::Data(item) => Some(item),
        }
    }
}

impl From<ControlItem> for Message {
    fn from(item: ControlItem) -> Self {
        Message::Control(item)
    }
}

impl From<DataItem> for Message {
    fn from(item: DataItem) -> Self {
        Message::Data(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_item() {
        let msg = control::build(
            MessageType::SetControlItem,
            ControlItemCode::IQOutputDataSampleRate,
            &[0x01, 0x02, 0x03, 0x04],
        )
        .unwrap();

        let parsed = Message::parse(&msg).unwrap();
        assert_eq!(parsed.msg_type(), MessageType::SetControlItem);
        assert_eq!(parsed.item_code(), ControlItemCode::IQOutputDataSampleRate);
        assert_eq!(parsed.sequence_number(), 0);
        assert_eq!(parsed.body().as_ref(), &[0x01, 0x02, 0x03, 0x04]);
        assert!(parsed.as_control().is_some());
        assert!(parsed.as_data().is_none());
    }

    #[test]
    fn test_parse_data_item() {
        let msg = data::build(MessageType::DataItem1, &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();

        let parsed = Message::parse(&msg).unwrap();
        assert_eq!(parsed.msg_type(), MessageType::DataItem1);
        assert_eq!(parsed.item_code(), ControlItemCode::None);
        assert_eq!(parsed.sequence_number(), 0xBBAA);
        assert_eq!(parsed.body().as_ref(), &[0xCC, 0xDD]);
        assert!(parsed.as_data().is_some());
    }

    #[test]
    fn test_parse_one_byte() {
        assert_eq!(
            Message::parse(&[0x00]),
            Err(InvalidFrame::TooShort { len: 1, min: 2 })
        );
    }

    #[test]
    fn test_parse_short_control_frame() {
        // Control type with only three bytes
        assert_eq!(
            Message::parse(&[0x03, 0x00, 0x18]),
            Err(InvalidFrame::TooShort { len: 3, min: 4 })
        );
    }

    #[test]
    fn test_parse_unknown_item_code() {
        assert_eq!(
            Message::parse(&[0x04, 0x20, 0xFF, 0xFF]),
            Err(InvalidFrame::UnknownItemCode(0xFFFF))
        );
    }

    #[test]
    fn test_encode_roundtrip() {
        let messages = [
            Message::from(ControlItem::new(
                MessageType::Ack,
                ControlItemCode::ReceiverState,
                vec![0x02u8],
            )),
            Message::from(DataItem::new(MessageType::DataItem0, 7, vec![1u8, 2])),
        ];

        for message in messages {
            let encoded = message.encode().unwrap();
            assert_eq!(Message::parse(&encoded).unwrap(), message);
        }
    }
}
