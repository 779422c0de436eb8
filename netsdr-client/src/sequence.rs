//! Data block sequence tracking.
//!
//! The device numbers data blocks with a 16-bit counter. The first block of a
//! stream carries `0`; afterwards the counter runs `1..=65535` and wraps back
//! to `1`.

/// Outcome of observing one sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    /// First block seen, or the stream restarted at `0`.
    Start,
    /// The expected block.
    InOrder,
    /// `missing` blocks were skipped before this one.
    Gap { missing: u16 },
    /// A block that arrived after a later one (or a duplicate).
    Late,
}

/// Counters kept by [`SequenceTracker`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceStats {
    pub received: u64,
    pub lost: u64,
    pub late: u64,
    pub restarts: u64,
}

/// Detects lost and reordered data blocks.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    expected: Option<u16>,
    stats: SequenceStats,
}

const CYCLE: u32 = u16::MAX as u32;

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence number that follows `seq`.
    pub fn next_after(seq: u16) -> u16 {
        if seq == u16::MAX {
            1
        } else {
            seq + 1
        }
    }

    /// Records a received block.
    pub fn observe(&mut self, seq: u16) -> SequenceEvent {
        self.stats.received += 1;

        let expected = match self.expected {
            Some(expected) if seq != 0 => expected,
            Some(_) => {
                self.stats.restarts += 1;
                self.expected = Some(1);
                return SequenceEvent::Start;
            }
            None => {
                self.expected = Some(Self::next_after(seq));
                return SequenceEvent::Start;
            }
        };

        // Distance on the 1..=65535 cycle
        let distance = (seq as u32 + CYCLE - expected as u32) % CYCLE;
        if distance == 0 {
            self.expected = Some(Self::next_after(seq));
            SequenceEvent::InOrder
        } else if distance < CYCLE / 2 {
            self.stats.lost += distance as u64;
            self.expected = Some(Self::next_after(seq));
            SequenceEvent::Gap {
                missing: distance as u16,
            }
        } else {
            self.stats.late += 1;
            SequenceEvent::Late
        }
    }

    /// Returns the counters collected so far.
    pub fn stats(&self) -> SequenceStats {
        self.stats
    }

    /// Forgets the stream position and counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
