//! Error types for stdplane-core.

use thiserror::Error;

/// Result type alias for stdplane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of decode failures.
///
/// None of these is fatal: each one names the smallest unit of work that
/// gets dropped (one event, one channel or one hit) when it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Magic-number mismatch at a header, trailer or frame boundary.
    Framing,
    /// Malformed topology, or a channel/device that the topology lacks.
    Topology,
    /// Declared counts that disagree with what the data holds.
    Consistency,
    /// Empty or truncated payload for one channel.
    Data,
    /// Invalid begin-of-run tags or decoder configuration.
    Configuration,
}

/// Core error types for stdplane operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Event header magic or length check failed.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// Event trailer magic or length check failed.
    #[error("corrupt trailer: {0}")]
    CorruptTrailer(String),

    /// Declared payload word count disagrees with the payload length.
    #[error("declared {declared} payload words but the block holds {available_bits} payload bits")]
    WordCountMismatch { declared: usize, available_bits: usize },

    /// Number of data blocks differs from the number of configured channels.
    #[error("expected {expected} data blocks, received {found}")]
    BlockCountMismatch { expected: usize, found: usize },

    /// Byte block length is not a whole number of container words.
    #[error("block length {len} is not a multiple of {word_bytes} bytes")]
    MisalignedBlock { len: usize, word_bytes: usize },

    /// Channel is not part of the topology (or has no data block).
    #[error("channel {0} not found")]
    ChannelNotFound(u32),

    /// No begin-of-run event was registered for this device.
    #[error("device {0} not initialized: no begin-of-run event registered")]
    DeviceNotInitialized(u32),

    /// Topology string could not be used.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Channel data block contained no samples.
    #[error("empty data for channel {0}")]
    EmptyChannel(u32),

    /// A required begin-of-run tag is absent.
    #[error("missing begin-of-run tag `{0}`")]
    MissingTag(String),

    /// A begin-of-run tag has a value that cannot be interpreted.
    #[error("invalid value `{value}` for begin-of-run tag `{tag}`")]
    InvalidTag { tag: String, value: String },

    /// Unknown protocol identifier.
    #[error("unknown protocol `{0}`")]
    UnknownProtocol(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Returns the taxonomy class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CorruptHeader(_) | Error::CorruptTrailer(_) => ErrorKind::Framing,
            Error::ChannelNotFound(_) | Error::DeviceNotInitialized(_) | Error::Topology(_) => {
                ErrorKind::Topology
            }
            Error::WordCountMismatch { .. }
            | Error::BlockCountMismatch { .. }
            | Error::MisalignedBlock { .. } => ErrorKind::Consistency,
            Error::EmptyChannel(_) => ErrorKind::Data,
            Error::MissingTag(_)
            | Error::InvalidTag { .. }
            | Error::UnknownProtocol(_)
            | Error::ConfigError(_) => ErrorKind::Configuration,
        }
    }
}

/// Diagnostics produced while parsing a channel topology string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// The topology string is empty.
    #[error("empty topology string")]
    Empty,

    /// A clause has neither a `CH<n>:` token nor a trigger-group literal.
    #[error("no channel token in clause `{0}`")]
    MissingChannel(String),

    /// A clause names a trigger group other than 0 or 1.
    #[error("expected `trigger_group_0` or `trigger_group_1`, found `{0}`")]
    UnknownTriggerGroup(String),

    /// A number in the clause does not fit the channel or pixel range.
    #[error("number out of range in clause `{0}`")]
    InvalidNumber(String),

    /// A channel clause binds no pixel.
    #[error("channel {channel} has no pixel in clause `{clause}`")]
    NoPixels { channel: u32, clause: String },
}
