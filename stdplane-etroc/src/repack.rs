//! Container word extraction and bit-level word repacking.
//!
//! ETROC readout ships 40-bit words inside 32-bit transport words. The
//! bits of consecutive container words, most significant bit first, form
//! one continuous bitstream that is re-sliced into logical words.

use serde::{Deserialize, Serialize};
use stdplane_core::Error as CoreError;

use crate::{Error, Result};

/// Byte order of the bytes within one 32-bit container word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

/// Splits a byte block into 32-bit container words.
///
/// # Errors
///
/// Returns [`CoreError::MisalignedBlock`] if the block length is not a
/// multiple of 4.
pub fn container_words(bytes: &[u8], order: ByteOrder) -> Result<Vec<u32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(CoreError::MisalignedBlock {
            len: bytes.len(),
            word_bytes: 4,
        }
        .into());
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| {
            let raw = [c[0], c[1], c[2], c[3]];
            match order {
                ByteOrder::Little => u32::from_le_bytes(raw),
                ByteOrder::Big => u32::from_be_bytes(raw),
            }
        })
        .collect())
}

#[inline]
fn mask(width: u32) -> u128 {
    (1u128 << width) - 1
}

/// Re-slices a stream of fixed-width words into words of another width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRepacker {
    input_width: u32,
    output_width: u32,
}

impl WordRepacker {
    /// Creates a repacker from `input_width`-bit to `output_width`-bit words.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWordWidth`] if a width is outside `1..=64`.
    pub fn new(input_width: u32, output_width: u32) -> Result<Self> {
        for width in [input_width, output_width] {
            if !(1..=64).contains(&width) {
                return Err(Error::InvalidWordWidth(width));
            }
        }
        Ok(Self {
            input_width,
            output_width,
        })
    }

    /// The ETROC layout: 32-bit containers, 40-bit logical words.
    #[must_use]
    pub fn etroc() -> Self {
        Self {
            input_width: 32,
            output_width: 40,
        }
    }

    /// Width of the input words in bits.
    #[must_use]
    pub fn input_width(&self) -> u32 {
        self.input_width
    }

    /// Width of the output words in bits.
    #[must_use]
    pub fn output_width(&self) -> u32 {
        self.output_width
    }

    /// Number of output words produced from `n_input` input words.
    #[must_use]
    pub fn n_output_words(&self, n_input: usize) -> usize {
        (n_input * self.input_width as usize).div_ceil(self.output_width as usize)
    }

    /// Repacks `words`. Bits above the input width are ignored and a short
    /// final output word is zero-padded on the right.
    #[must_use]
    pub fn repack(&self, words: &[u64]) -> Vec<u64> {
        let in_mask = mask(self.input_width);
        let out_mask = mask(self.output_width);

        let mut out = Vec::with_capacity(self.n_output_words(words.len()));
        let mut acc: u128 = 0;
        let mut n_bits: u32 = 0;

        for &word in words {
            acc = (acc << self.input_width) | (u128::from(word) & in_mask);
            n_bits += self.input_width;
            while n_bits >= self.output_width {
                n_bits -= self.output_width;
                #[allow(clippy::cast_possible_truncation)]
                out.push(((acc >> n_bits) & out_mask) as u64);
            }
            acc &= mask(n_bits);
        }

        if n_bits > 0 {
            #[allow(clippy::cast_possible_truncation)]
            out.push(((acc << (self.output_width - n_bits)) & out_mask) as u64);
        }
        out
    }

    /// Repacks 32-bit container words.
    #[must_use]
    pub fn repack_containers(&self, words: &[u32]) -> Vec<u64> {
        let wide: Vec<u64> = words.iter().map(|&w| u64::from(w)).collect();
        self.repack(&wide)
    }
}

impl Default for WordRepacker {
    fn default() -> Self {
        Self::etroc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_words_byte_order() {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE];
        assert_eq!(
            container_words(&bytes, ByteOrder::Little).unwrap(),
            vec![0x1234_5678, 0xDEAD_BEEF]
        );
        assert_eq!(
            container_words(&bytes, ByteOrder::Big).unwrap(),
            vec![0x7856_3412, 0xEFBE_ADDE]
        );
    }

    #[test]
    fn test_container_words_misaligned() {
        let err = container_words(&[0u8; 7], ByteOrder::Little).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreError(CoreError::MisalignedBlock { len: 7, word_bytes: 4 })
        ));
    }

    #[test]
    fn test_invalid_widths() {
        assert!(matches!(
            WordRepacker::new(0, 40),
            Err(Error::InvalidWordWidth(0))
        ));
        assert!(matches!(
            WordRepacker::new(32, 65),
            Err(Error::InvalidWordWidth(65))
        ));
        assert!(WordRepacker::new(64, 1).is_ok());
    }

    #[test]
    fn test_five_containers_make_four_words() {
        // 160 bits: 0x01..0x14 as a byte sequence, MSB first.
        let containers = [0x0102_0304, 0x0506_0708, 0x090A_0B0C, 0x0D0E_0F10, 0x1112_1314];
        let words = WordRepacker::etroc().repack_containers(&containers);
        assert_eq!(
            words,
            vec![0x01_0203_0405, 0x06_0708_090A, 0x0B_0C0D_0E0F, 0x10_1112_1314]
        );
    }

    #[test]
    fn test_short_tail_is_zero_padded() {
        let words = WordRepacker::etroc().repack_containers(&[0xFFFF_FFFF, 0x8000_0001]);
        // 64 bits -> one full word and 24 bits padded with 16 zeros.
        assert_eq!(words, vec![0xFF_FFFF_FF80, 0x00_0001_0000]);
        assert_eq!(WordRepacker::etroc().n_output_words(2), 2);
    }

    #[test]
    fn test_upper_bits_ignored() {
        let repacker = WordRepacker::new(4, 8).unwrap();
        assert_eq!(repacker.repack(&[0xFA, 0x5B]), vec![0xAB]);
    }

    #[test]
    fn test_empty_input() {
        assert!(WordRepacker::etroc().repack(&[]).is_empty());
    }
}
