//! Raw events as handed over by the event reader.

use std::fmt;
use std::str::FromStr;

use stdplane_core::{DataBlock, TagMap};

/// Hardware protocol family of a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// ETROC chip readout: framed 40-bit words in 32-bit containers.
    Etroc,
    /// CAEN digitizer: one float waveform block per channel.
    Digitizer,
}

impl Protocol {
    /// Resolves a protocol identifier, ignoring case.
    ///
    /// # Errors
    /// Returns `UnknownProtocol` for identifiers outside the known set.
    pub fn from_id(id: &str) -> stdplane_core::Result<Self> {
        match id.trim().to_ascii_uppercase().as_str() {
            "ETROC" => Ok(Protocol::Etroc),
            "CAENDT5742" | "CAENDT5748" | "CAEN_DT5748" => Ok(Protocol::Digitizer),
            _ => Err(stdplane_core::Error::UnknownProtocol(id.to_string())),
        }
    }
}

impl FromStr for Protocol {
    type Err = stdplane_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::from_id(s)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Etroc => f.write_str("ETROC"),
            Protocol::Digitizer => f.write_str("CAEN digitizer"),
        }
    }
}

/// Event content.
#[derive(Clone, Debug)]
pub enum Payload {
    /// Configuration tags of a begin-of-run event.
    BeginOfRun(TagMap),
    /// Raw byte blocks of a data event.
    Data(Vec<DataBlock>),
}

/// One event from one device.
#[derive(Clone, Debug)]
pub struct RawEvent {
    /// Source device.
    pub device_id: u32,
    /// Event number within the run.
    pub event_number: u64,
    /// Protocol identifier string, e.g. `"ETROC"` or `"CAENDT5742"`.
    pub protocol: String,
    /// Tags or blocks.
    pub payload: Payload,
}

impl RawEvent {
    /// Creates a begin-of-run event.
    pub fn begin_of_run(device_id: u32, protocol: impl Into<String>, tags: TagMap) -> Self {
        Self {
            device_id,
            event_number: 0,
            protocol: protocol.into(),
            payload: Payload::BeginOfRun(tags),
        }
    }

    /// Creates a data event.
    pub fn data(
        device_id: u32,
        event_number: u64,
        protocol: impl Into<String>,
        blocks: Vec<DataBlock>,
    ) -> Self {
        Self {
            device_id,
            event_number,
            protocol: protocol.into(),
            payload: Payload::Data(blocks),
        }
    }

    /// Returns true for begin-of-run events.
    #[must_use]
    pub fn is_begin_of_run(&self) -> bool {
        matches!(self.payload, Payload::BeginOfRun(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stdplane_core::ErrorKind;

    #[test]
    fn test_protocol_ids() {
        assert_eq!(Protocol::from_id("ETROC").unwrap(), Protocol::Etroc);
        assert_eq!(Protocol::from_id("etroc").unwrap(), Protocol::Etroc);
        for id in ["CAENDT5742", "CAENDT5748", "CAEN_DT5748", "caendt5742"] {
            assert_eq!(id.parse::<Protocol>().unwrap(), Protocol::Digitizer);
        }
    }

    #[test]
    fn test_unknown_protocol() {
        let err = Protocol::from_id("TLU").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("TLU"));
    }

    #[test]
    fn test_event_constructors() {
        let bore = RawEvent::begin_of_run(3, "ETROC", TagMap::new());
        assert!(bore.is_begin_of_run());
        assert_eq!(bore.event_number, 0);

        let data = RawEvent::data(3, 17, "ETROC", vec![DataBlock::new(0, vec![])]);
        assert!(!data.is_begin_of_run());
        assert_eq!(data.event_number, 17);
    }
}
