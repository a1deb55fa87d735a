//! ETROC-specific error types.

use stdplane_core::ErrorKind;
use thiserror::Error;

/// Result type for ETROC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// ETROC-specific error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Word width outside `1..=64` bits.
    #[error("invalid word width: {0} bits (expected 1..=64)")]
    InvalidWordWidth(u32),

    /// Decoder configuration could not be used.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] stdplane_core::Error),
}

impl Error {
    /// Returns the taxonomy class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CoreError(e) => e.kind(),
            Error::InvalidWordWidth(_)
            | Error::ConfigError(_)
            | Error::JsonError(_)
            | Error::IoError(_) => ErrorKind::Configuration,
        }
    }
}
