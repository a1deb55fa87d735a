//! Digitizer-specific error types.

use stdplane_core::ErrorKind;
use thiserror::Error;

/// Result type for digitizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Digitizer-specific error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Sampling frequency tag is zero.
    #[error("sampling frequency must be positive")]
    ZeroSamplingFrequency,

    /// The begin-of-run event names no DUT.
    #[error("begin-of-run event lists no DUT")]
    NoDuts,

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
            Error::ZeroSamplingFrequency | Error::NoDuts => ErrorKind::Configuration,
        }
    }
}
