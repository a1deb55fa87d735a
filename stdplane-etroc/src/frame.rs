//! ETROC event framing and 40-bit payload word types.

use serde::{Deserialize, Serialize};
use stdplane_core::Error as CoreError;

use crate::Result;

/// Event header magic, bits 31:4 of the first container word.
pub const EVENT_HEADER_MAGIC: u32 = 0xC3A_3C3A;
/// Event trailer magic, bits 31:26 of the last container word.
pub const EVENT_TRAILER_MAGIC: u32 = 0x0B;
/// Chip frame header/filler marker, bits 38:24 of a payload word.
pub const FRAME_MARKER: u64 = 0x3C5C;

/// Bits 23:22 of a filler word.
const FILLER_TAG: u64 = 0b10;

#[inline]
fn field(word: u64, lsb: u32, width: u32) -> u64 {
    (word >> lsb) & ((1 << width) - 1)
}

/// Validated event header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Chips active in this event, one bit per chip slot.
    pub chip_mask: u8,
    /// Firmware version.
    pub version: u8,
    /// Event number.
    pub event_number: u16,
    /// Declared number of 40-bit payload words.
    pub word_count: u16,
    /// Event type.
    pub event_type: u8,
}

impl EventHeader {
    /// Parses the two leading container words of a block.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptHeader`] if the magic does not match.
    #[allow(clippy::cast_possible_truncation)]
    pub fn parse(first: u32, second: u32) -> Result<Self> {
        let magic = first >> 4;
        if magic != EVENT_HEADER_MAGIC {
            return Err(CoreError::CorruptHeader(format!(
                "magic {magic:#09x}, expected {EVENT_HEADER_MAGIC:#09x}"
            ))
            .into());
        }

        let second = u64::from(second);
        Ok(Self {
            chip_mask: (first & 0xF) as u8,
            version: field(second, 28, 4) as u8,
            event_number: field(second, 12, 16) as u16,
            word_count: field(second, 2, 10) as u16,
            event_type: field(second, 0, 2) as u8,
        })
    }

    /// Number of chips flagged active.
    #[must_use]
    pub fn n_active_chips(&self) -> u32 {
        self.chip_mask.count_ones()
    }
}

/// Validated event trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTrailer {
    /// Total number of hits in the event.
    pub hits: u16,
    /// Overflow count.
    pub overflow: u8,
    /// Hamming error count.
    pub hamming: u8,
    /// CRC.
    pub crc: u8,
}

impl EventTrailer {
    /// Parses the final container word of a block.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptTrailer`] if the magic does not match.
    #[allow(clippy::cast_possible_truncation)]
    pub fn parse(word: u32) -> Result<Self> {
        let magic = word >> 26;
        if magic != EVENT_TRAILER_MAGIC {
            return Err(CoreError::CorruptTrailer(format!(
                "magic {magic:#04x}, expected {EVENT_TRAILER_MAGIC:#04x}"
            ))
            .into());
        }

        let word = u64::from(word);
        Ok(Self {
            hits: field(word, 14, 12) as u16,
            overflow: field(word, 11, 3) as u8,
            hamming: field(word, 8, 3) as u8,
            crc: field(word, 0, 8) as u8,
        })
    }
}

/// Pixel data word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWord {
    pub ea: u8,
    pub col: u8,
    pub row: u8,
    pub toa: u16,
    pub tot: u16,
    pub cal: u16,
}

/// Chip frame header or filler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Level-one trigger counter.
    pub l1_counter: u8,
    /// Bunch crossing id.
    pub bcid: u16,
}

/// Chip trailer, closing the frame of one chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipTrailer {
    pub chip_id: u32,
    pub status: u8,
    pub hits: u8,
    pub crc: u8,
}

/// A classified 40-bit payload word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtrocWord {
    /// Pixel hit (bit 39 set).
    Data(DataWord),
    /// Start of a chip frame.
    FrameHeader(FrameHeader),
    /// Idle word between frames.
    Filler(FrameHeader),
    /// End of a chip frame.
    ChipTrailer(ChipTrailer),
}

impl EtrocWord {
    /// Classifies a 40-bit word by its top bits.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn classify(word: u64) -> Self {
        if field(word, 39, 1) == 1 {
            return EtrocWord::Data(DataWord {
                ea: field(word, 37, 2) as u8,
                col: field(word, 33, 4) as u8,
                row: field(word, 29, 4) as u8,
                toa: field(word, 19, 10) as u16,
                tot: field(word, 10, 9) as u16,
                cal: field(word, 0, 10) as u16,
            });
        }

        if field(word, 24, 15) == FRAME_MARKER {
            let header = FrameHeader {
                l1_counter: field(word, 14, 8) as u8,
                bcid: field(word, 0, 12) as u16,
            };
            return if field(word, 22, 2) == FILLER_TAG {
                EtrocWord::Filler(header)
            } else {
                EtrocWord::FrameHeader(header)
            };
        }

        EtrocWord::ChipTrailer(ChipTrailer {
            chip_id: field(word, 22, 17) as u32,
            status: field(word, 16, 6) as u8,
            hits: field(word, 8, 8) as u8,
            crc: field(word, 0, 8) as u8,
        })
    }

    /// Returns true if this is a pixel data word.
    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(self, EtrocWord::Data(_))
    }
}
