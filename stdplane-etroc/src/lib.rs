//! stdplane-etroc: ETROC frame decoder.
//!
//! ETROC readout boards ship 40-bit chip words packed into 32-bit
//! transport words. This crate extracts the container words, repacks the
//! payload into 40-bit words and walks the chip frames to produce one
//! plane per chip.
//!
//! # Key Components
//!
//! - [`WordRepacker`] - Bit-level re-slicing between word widths
//! - [`EtrocWord`] - Classification of a 40-bit payload word
//! - [`EtrocDecoder`] - Block decoder with framing and count checks
//! - [`EtrocConfig`] - Grid size, byte order and word width
//!
//! # Block Layout
//!
//! 1. Two header container words (magic, chip mask, declared word count)
//! 2. Payload container words, repacked into 40-bit words
//! 3. One trailer container word (magic, hit count, CRC)

mod decoder;
mod error;
pub mod frame;
pub mod repack;

pub use decoder::{DecodedChipEvent, EtrocDecoder, HitCountMismatch};
pub use error::{Error, Result};
pub use frame::{ChipTrailer, DataWord, EtrocWord, EventHeader, EventTrailer, FrameHeader};
pub use repack::{container_words, ByteOrder, WordRepacker};

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use stdplane_core::TagMap;

/// Begin-of-run tag holding a JSON [`EtrocConfig`].
pub const DECODER_CONFIG_TAG: &str = "decoder_config";
/// Begin-of-run tag overriding the chip column count.
pub const CHIP_COLUMNS_TAG: &str = "chip_columns";
/// Begin-of-run tag overriding the chip row count.
pub const CHIP_ROWS_TAG: &str = "chip_rows";

/// Decoder configuration for ETROC processing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtrocConfig {
    /// Pixel columns per chip (default: 16).
    pub chip_columns: u16,
    /// Pixel rows per chip (default: 16).
    pub chip_rows: u16,
    /// Byte order within a 32-bit container word.
    pub container_byte_order: ByteOrder,
    /// Width of the repacked payload words in bits (default: 40).
    pub logical_word_width: u32,
    /// Name given to the produced planes.
    pub sensor_name: String,
}

impl Default for EtrocConfig {
    fn default() -> Self {
        Self {
            chip_columns: 16,
            chip_rows: 16,
            container_byte_order: ByteOrder::Little,
            logical_word_width: 40,
            sensor_name: "ETROC".to_string(),
        }
    }
}

impl EtrocConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chip grid size.
    #[must_use]
    pub fn with_grid(mut self, columns: u16, rows: u16) -> Self {
        self.chip_columns = columns;
        self.chip_rows = rows;
        self
    }

    /// Sets the container byte order.
    #[must_use]
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.container_byte_order = order;
        self
    }

    /// Load configuration from a JSON file.
    ///
    /// Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from begin-of-run tags.
    ///
    /// `decoder_config` supplies a base JSON configuration; `chip_columns`
    /// and `chip_rows` override the grid. Absent tags keep the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a tag value cannot be interpreted.
    pub fn from_tags(tags: &TagMap) -> Result<Self> {
        let mut config = match tags.get(DECODER_CONFIG_TAG) {
            Some(json) => serde_json::from_str(json)?,
            None => Self::default(),
        };
        if let Some(columns) = tags.parse_opt(CHIP_COLUMNS_TAG)? {
            config.chip_columns = columns;
        }
        if let Some(rows) = tags.parse_opt(CHIP_ROWS_TAG)? {
            config.chip_rows = rows;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks grid extents and word width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for a zero-sized grid and
    /// [`Error::InvalidWordWidth`] for a width outside `1..=64`.
    pub fn validate(&self) -> Result<()> {
        if self.chip_columns == 0 || self.chip_rows == 0 {
            return Err(Error::ConfigError(format!(
                "chip grid {}x{} has no pixels",
                self.chip_columns, self.chip_rows
            )));
        }
        if !(1..=64).contains(&self.logical_word_width) {
            return Err(Error::InvalidWordWidth(self.logical_word_width));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EtrocConfig::default();
        assert_eq!((config.chip_columns, config.chip_rows), (16, 16));
        assert_eq!(config.container_byte_order, ByteOrder::Little);
        assert_eq!(config.logical_word_width, 40);
        assert_eq!(config.sensor_name, "ETROC");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_partial_config() {
        let config = EtrocConfig::from_json(r#"{ "container_byte_order": "big" }"#)
            .expect("Should parse partial config");
        assert_eq!(config.container_byte_order, ByteOrder::Big);
        assert_eq!(config.chip_columns, 16); // Default
    }

    #[test]
    fn test_json_rejects_empty_grid() {
        let result = EtrocConfig::from_json(r#"{ "chip_rows": 0 }"#);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_json_rejects_word_width() {
        let result = EtrocConfig::from_json(r#"{ "logical_word_width": 65 }"#);
        assert!(matches!(result, Err(Error::InvalidWordWidth(65))));
    }

    #[test]
    fn test_json_malformed() {
        assert!(matches!(
            EtrocConfig::from_json("{ chip_rows"),
            Err(Error::JsonError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "chip_columns": 8, "sensor_name": "ETROC2" }}"#).unwrap();

        let config = EtrocConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chip_columns, 8);
        assert_eq!(config.chip_rows, 16);
        assert_eq!(config.sensor_name, "ETROC2");
    }

    #[test]
    fn test_from_tags() {
        let tags = TagMap::new()
            .with(DECODER_CONFIG_TAG, r#"{ "container_byte_order": "big", "chip_rows": 4 }"#)
            .with(CHIP_COLUMNS_TAG, "32");
        let config = EtrocConfig::from_tags(&tags).unwrap();
        assert_eq!(config.chip_columns, 32);
        assert_eq!(config.chip_rows, 4);
        assert_eq!(config.container_byte_order, ByteOrder::Big);

        assert_eq!(EtrocConfig::from_tags(&TagMap::new()).unwrap(), EtrocConfig::default());

        let bad = TagMap::new().with(CHIP_ROWS_TAG, "many");
        assert_eq!(
            EtrocConfig::from_tags(&bad).unwrap_err().kind(),
            stdplane_core::ErrorKind::Configuration
        );
    }
}
