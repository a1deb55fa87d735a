//! Conversion error types.

use stdplane_core::ErrorKind;
use thiserror::Error;

use crate::event::Protocol;

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while registering devices or converting events.
#[derive(Error, Debug)]
pub enum Error {
    /// A data event arrived where a begin-of-run event was expected.
    #[error("device {0}: expected a begin-of-run event")]
    NotBeginOfRun(u32),

    /// A begin-of-run event arrived after the run context was frozen.
    #[error("device {0}: begin-of-run event after the run was frozen")]
    LateBeginOfRun(u32),

    /// A data event names a different protocol than its device registered.
    #[error("device {device_id}: event labelled {event}, device registered as {registered}")]
    ProtocolMismatch {
        device_id: u32,
        registered: Protocol,
        event: Protocol,
    },

    /// ETROC decoder error.
    #[error("ETROC error: {0}")]
    EtrocError(#[from] stdplane_etroc::Error),

    /// Digitizer decoder error.
    #[error("digitizer error: {0}")]
    CaenError(#[from] stdplane_caen::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] stdplane_core::Error),
}

impl Error {
    /// Returns the taxonomy class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotBeginOfRun(_) | Error::LateBeginOfRun(_) | Error::ProtocolMismatch { .. } => {
                ErrorKind::Configuration
            }
            Error::EtrocError(e) => e.kind(),
            Error::CaenError(e) => e.kind(),
            Error::CoreError(e) => e.kind(),
        }
    }
}
