//! Sample extraction from data item bodies.

use crate::error::ProtocolError;
use bytes::Bytes;
use std::iter::FusedIterator;

/// A single decoded sample.
pub type Sample = u32;

/// Width of one sample on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleWidth {
    Bits8,
    Bits16,
    Bits24,
    Bits32,
}

impl SampleWidth {
    /// Returns the number of bytes per sample.
    pub fn bytes(self) -> usize {
        match self {
            SampleWidth::Bits8 => 1,
            SampleWidth::Bits16 => 2,
            SampleWidth::Bits24 => 3,
            SampleWidth::Bits32 => 4,
        }
    }

    /// Returns the number of bits per sample.
    pub fn bits(self) -> u16 {
        self.bytes() as u16 * 8
    }
}

impl TryFrom<u16> for SampleWidth {
    type Error = ProtocolError;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(SampleWidth::Bits8),
            16 => Ok(SampleWidth::Bits16),
            24 => Ok(SampleWidth::Bits24),
            32 => Ok(SampleWidth::Bits32),
            other => Err(ProtocolError::SampleSizeOutOfRange(other)),
        }
    }
}

/// Decodes `body` into samples of `bit_width` bits.
///
/// The width is checked before anything is decoded, so an unsupported width
/// fails even for an empty body. Trailing bytes that do not fill a whole
/// sample are ignored.
pub fn extract(bit_width: u16, body: impl Into<Bytes>) -> Result<Samples, ProtocolError> {
    let width = SampleWidth::try_from(bit_width)?;
    Ok(Samples::new(width, body.into()))
}

/// Iterator over the samples of a data item body.
///
/// Cloning is cheap and yields an independent iterator starting from the same
/// position.
#[derive(Debug, Clone)]
pub struct Samples {
    body: Bytes,
    width: SampleWidth,
    front: usize,
    back: usize,
}

impl Samples {
    fn new(width: SampleWidth, body: Bytes) -> Self {
        let count = body.len() / width.bytes();
        Self {
            body,
            width,
            front: 0,
            back: count,
        }
    }

    /// Returns the sample width.
    pub fn width(&self) -> SampleWidth {
        self.width
    }

    fn decode(&self, index: usize) -> Sample {
        let size = self.width.bytes();
        let start = index * size;
        let mut word = [0u8; 4];
        word[..size].copy_from_slice(&self.body[start..start + size]);
        u32::from_le_bytes(word)
    }
}

impl Iterator for Samples {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.front >= self.back {
            return None;
        }
        let sample = self.decode(self.front);
        self.front += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Samples {
    fn next_back(&mut self) -> Option<Sample> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.decode(self.back))
    }
}

impl ExactSizeIterator for Samples {}

impl FusedIterator for Samples {}
