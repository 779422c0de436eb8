//! Control item messages.
//!
//! ```text
//! +--------+-----------+------------------+
//! | header | item code | parameters       |
//! | 2 bytes| 2 bytes LE| variable         |
//! +--------+-----------+------------------+
//! ```

use crate::error::{InvalidFrame, ProtocolError};
use crate::header::{Header, MessageType, HEADER_SIZE, MAX_MESSAGE_LENGTH};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the item code field in bytes.
pub const ITEM_CODE_SIZE: usize = 2;

/// Largest parameter block a control item can carry.
pub const MAX_CONTROL_PARAMETERS: usize = MAX_MESSAGE_LENGTH - HEADER_SIZE - ITEM_CODE_SIZE;

/// Negative acknowledgement: a bare header sent by the device when it
/// rejects a control item.
pub const NAK: [u8; HEADER_SIZE] = [0x02, 0x00];

/// Returns whether `frame` is the device's NAK reply.
pub fn is_nak(frame: &[u8]) -> bool {
    frame == NAK
}

/// Device parameters addressable by control items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlItemCode {
    None,
    ReceiverState,
    ReceiverFrequency,
    #[serde(rename = "rf_filter")]
    RFFilter,
    #[serde(rename = "ad_modes")]
    ADModes,
    #[serde(rename = "iq_output_data_sample_rate")]
    IQOutputDataSampleRate,
}

impl ControlItemCode {
    /// All known item codes.
    pub const ALL: [ControlItemCode; 6] = [
        ControlItemCode::None,
        ControlItemCode::ReceiverState,
        ControlItemCode::ReceiverFrequency,
        ControlItemCode::RFFilter,
        ControlItemCode::ADModes,
        ControlItemCode::IQOutputDataSampleRate,
    ];

    /// Returns the 16-bit wire value.
    pub fn code(self) -> u16 {
        match self {
            ControlItemCode::None => 0x0000,
            ControlItemCode::ReceiverState => 0x0018,
            ControlItemCode::ReceiverFrequency => 0x0020,
            ControlItemCode::RFFilter => 0x0044,
            ControlItemCode::ADModes => 0x008A,
            ControlItemCode::IQOutputDataSampleRate => 0x00B8,
        }
    }

    /// Looks up a wire value; `None` for codes this crate does not know.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0000 => Some(ControlItemCode::None),
            0x0018 => Some(ControlItemCode::ReceiverState),
            0x0020 => Some(ControlItemCode::ReceiverFrequency),
            0x0044 => Some(ControlItemCode::RFFilter),
            0x008A => Some(ControlItemCode::ADModes),
            0x00B8 => Some(ControlItemCode::IQOutputDataSampleRate),
            _ => None,
        }
    }
}

impl TryFrom<u16> for ControlItemCode {
    type Error = InvalidFrame;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(InvalidFrame::UnknownItemCode(code))
    }
}

impl fmt::Display for ControlItemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlItemCode::None => write!(f, "NONE"),
            ControlItemCode::ReceiverState => write!(f, "RECEIVER_STATE"),
            ControlItemCode::ReceiverFrequency => write!(f, "RECEIVER_FREQUENCY"),
            ControlItemCode::RFFilter => write!(f, "RF_FILTER"),
            ControlItemCode::ADModes => write!(f, "AD_MODES"),
            ControlItemCode::IQOutputDataSampleRate => write!(f, "IQ_OUTPUT_DATA_SAMPLE_RATE"),
        }
    }
}

/// A decoded control item message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlItem {
    pub msg_type: MessageType,
    pub item_code: ControlItemCode,
    pub parameters: Bytes,
}

impl ControlItem {
    pub fn new(
        msg_type: MessageType,
        item_code: ControlItemCode,
        parameters: impl Into<Bytes>,
    ) -> Self {
        Self {
            msg_type,
            item_code,
            parameters: parameters.into(),
        }
    }

    /// Encodes this message.
    ///
    /// Fails with [`ProtocolError::FramingMismatch`] when `msg_type` is a
    /// data item type, since such a frame would not parse back as a control
    /// item.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        if !self.msg_type.is_control_item() {
            return Err(ProtocolError::FramingMismatch(self.msg_type));
        }
        build(self.msg_type, self.item_code, &self.parameters)
    }
}

/// Builds a control item message.
///
/// Any message type is written as given. Fails only with
/// [`ProtocolError::LengthExceeded`] when `parameters` is longer than
/// [`MAX_CONTROL_PARAMETERS`].
pub fn build(
    msg_type: MessageType,
    item_code: ControlItemCode,
    parameters: &[u8],
) -> Result<BytesMut, ProtocolError> {
    if parameters.len() > MAX_CONTROL_PARAMETERS {
        return Err(ProtocolError::LengthExceeded {
            length: parameters.len(),
            max: MAX_CONTROL_PARAMETERS,
        });
    }

    let total = HEADER_SIZE + ITEM_CODE_SIZE + parameters.len();
    let header = Header::new(msg_type, total)?;

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u16_le(header.pack());
    buf.put_u16_le(item_code.code());
    buf.put_slice(parameters);
    Ok(buf)
}

/// Parses a control item message.
///
/// The header type is taken as-is; callers that need to route between
/// framings should use [`crate::Message::parse`]. The header length is not
/// checked against `bytes`; the body is everything after the item code.
pub fn parse(bytes: &[u8]) -> Result<ControlItem, InvalidFrame> {
    let min = HEADER_SIZE + ITEM_CODE_SIZE;
    if bytes.len() < min {
        return Err(InvalidFrame::TooShort {
            len: bytes.len(),
            min,
        });
    }

    let header = Header::unpack(u16::from_le_bytes([bytes[0], bytes[1]]));

    let item_code = ControlItemCode::try_from(u16::from_le_bytes([bytes[2], bytes[3]]))?;

    Ok(ControlItem {
        msg_type: header.msg_type,
        item_code,
        parameters: Bytes::copy_from_slice(&bytes[min..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CONTROL_TYPES: [MessageType; 4] = [
        MessageType::SetControlItem,
        MessageType::CurrentControlItem,
        MessageType::ControlItemRange,
        MessageType::Ack,
    ];

    #[test]
    fn test_item_code_values() {
        assert_eq!(ControlItemCode::None.code(), 0x0000);
        assert_eq!(ControlItemCode::ReceiverState.code(), 0x0018);
        assert_eq!(ControlItemCode::ReceiverFrequency.code(), 0x0020);
        assert_eq!(ControlItemCode::RFFilter.code(), 0x0044);
        assert_eq!(ControlItemCode::ADModes.code(), 0x008A);
        assert_eq!(ControlItemCode::IQOutputDataSampleRate.code(), 0x00B8);
    }

    #[test]
    fn test_item_code_lookup() {
        for code in ControlItemCode::ALL {
            assert_eq!(ControlItemCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ControlItemCode::from_code(0x0001), None);
        assert_eq!(
            ControlItemCode::try_from(0xBEEF),
            Err(InvalidFrame::UnknownItemCode(0xBEEF))
        );
    }

    #[test]
    fn test_item_code_display() {
        assert_eq!(ControlItemCode::RFFilter.to_string(), "RF_FILTER");
        assert_eq!(
            ControlItemCode::IQOutputDataSampleRate.to_string(),
            "IQ_OUTPUT_DATA_SAMPLE_RATE"
        );
    }

    #[test]
    fn test_build_layout() {
        let msg = build(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverFrequency,
            &[0x01, 0x02, 0x03],
        )
        .unwrap();

        assert_eq!(&msg[..], &[0x07, 0x00, 0x20, 0x00, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_build_header_matches_length() {
        let msg = build(
            MessageType::Ack,
            ControlItemCode::ReceiverState,
            &vec![0u8; 7500],
        )
        .unwrap();

        let header = Header::peek(&msg).unwrap();
        assert_eq!(header.msg_type(), MessageType::Ack);
        assert_eq!(header.length() as usize, msg.len());
        assert_eq!(msg.len(), 7504);
        assert_eq!(u16::from_le_bytes([msg[2], msg[3]]), 0x0018);
    }

    #[test]
    fn test_build_empty_parameters() {
        let msg = build(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverFrequency,
            &[],
        )
        .unwrap();
        assert_eq!(msg.len(), 4);
    }

    #[test]
    fn test_build_length_limit() {
        let ok = build(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &vec![0u8; MAX_CONTROL_PARAMETERS],
        )
        .unwrap();
        assert_eq!(ok.len(), MAX_MESSAGE_LENGTH);

        let result = build(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &vec![0u8; MAX_CONTROL_PARAMETERS + 1],
        );
        assert!(matches!(
            result,
            Err(ProtocolError::LengthExceeded {
                length: 8188,
                max: 8187
            })
        ));

        let result = build(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &vec![0u8; 8200],
        );
        assert!(matches!(result, Err(ProtocolError::LengthExceeded { .. })));
    }

    #[test]
    fn test_build_any_type() {
        let msg = build(MessageType::DataItem0, ControlItemCode::ReceiverState, &[]).unwrap();
        assert_eq!(&msg[..], &[0x04, 0x80, 0x18, 0x00]);

        let item = parse(&msg).unwrap();
        assert_eq!(item.msg_type, MessageType::DataItem0);
        assert_eq!(item.item_code, ControlItemCode::ReceiverState);
    }

    #[test]
    fn test_encode_rejects_data_types() {
        let item = ControlItem::new(MessageType::DataItem1, ControlItemCode::ReceiverState, vec![]);
        assert_eq!(
            item.encode(),
            Err(ProtocolError::FramingMismatch(MessageType::DataItem1))
        );
    }

    #[test]
    fn test_build_all_control_types() {
        for msg_type in CONTROL_TYPES {
            let msg = build(msg_type, ControlItemCode::ReceiverState, &[0x01, 0x02]).unwrap();
            assert_eq!(msg.len(), 6);
            assert_eq!(Header::peek(&msg).unwrap().msg_type(), msg_type);
        }
    }

    #[test]
    fn test_parse_roundtrip_all_codes() {
        for code in ControlItemCode::ALL {
            let msg = build(MessageType::CurrentControlItem, code, &[0x01, 0x02]).unwrap();
            let item = parse(&msg).unwrap();
            assert_eq!(item.msg_type, MessageType::CurrentControlItem);
            assert_eq!(item.item_code, code);
            assert_eq!(item.parameters.as_ref(), &[0x01, 0x02]);
        }
    }

    #[test]
    fn test_parse_large_body() {
        let msg = build(
            MessageType::CurrentControlItem,
            ControlItemCode::RFFilter,
            &vec![0x55u8; 5000],
        )
        .unwrap();
        let item = parse(&msg).unwrap();
        assert_eq!(item.item_code, ControlItemCode::RFFilter);
        assert_eq!(item.parameters.len(), 5000);
        assert!(item.parameters.iter().all(|&b| b == 0x55));
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(
            parse(&[0x00]),
            Err(InvalidFrame::TooShort { len: 1, min: 4 })
        );
        assert_eq!(
            parse(&[0x03, 0x00, 0x18]),
            Err(InvalidFrame::TooShort { len: 3, min: 4 })
        );
    }

    #[test]
    fn test_nak() {
        assert!(is_nak(&[0x02, 0x00]));
        assert!(!is_nak(&[0x02, 0x00, 0x00]));
        assert!(!is_nak(&[0x04, 0x00]));
        // NAK is never a parseable control item
        assert!(parse(&NAK).is_err());
    }

    #[test]
    fn test_parse_unknown_code() {
        let msg = [0x04, 0x00, 0x34, 0x12];
        assert_eq!(parse(&msg), Err(InvalidFrame::UnknownItemCode(0x1234)));
    }

    #[test]
    fn test_parse_ignores_header_length() {
        // Header says 2 bytes, buffer carries 6
        let item = parse(&[0x02, 0x00, 0x18, 0x00, 0x01, 0x02]).unwrap();
        assert_eq!(item.msg_type, MessageType::SetControlItem);
        assert_eq!(item.item_code, ControlItemCode::ReceiverState);
        assert_eq!(item.parameters.as_ref(), &[0x01, 0x02]);

        let mut msg = build(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &[0x01, 0x02],
        )
        .unwrap();
        msg.put_u8(0xFF);
        assert_eq!(parse(&msg).unwrap().parameters.as_ref(), &[0x01, 0x02, 0xFF]);
    }

    #[test]
    fn test_parse_does_not_alias_input() {
        let mut msg = build(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &[0x01],
        )
        .unwrap()
        .to_vec();
        let item = parse(&msg).unwrap();

        msg[4] = 0xEE;
        assert_eq!(item.parameters.as_ref(), &[0x01]);
    }

    #[test]
    fn test_control_item_encode() {
        let item = ControlItem::new(
            MessageType::SetControlItem,
            ControlItemCode::ADModes,
            vec![0x03],
        );
        let encoded = item.encode().unwrap();
        assert_eq!(parse(&encoded).unwrap(), item);
    }

    proptest! {
        #[test]
        fn prop_build_parse_roundtrip(
            type_index in 0usize..4,
            code_index in 0usize..6,
            parameters in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let msg_type = CONTROL_TYPES[type_index];
            let code = ControlItemCode::ALL[code_index];

            let msg = build(msg_type, code, &parameters).unwrap();
            let item = parse(&msg).unwrap();

            prop_assert_eq!(item.msg_type, msg_type);
            prop_assert_eq!(item.item_code, code);
            prop_assert_eq!(item.parameters.as_ref(), parameters.as_slice());
        }

        #[test]
        fn prop_parse_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = parse(&bytes);
        }
    }
}
