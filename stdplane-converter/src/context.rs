//! Run-level decoder state.
//!
//! Begin-of-run events are registered on a mutable [`RunSetup`]. Freezing
//! the setup yields a shared, read-only [`RunContext`] that converts data
//! events from any number of threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use stdplane_algorithms::Algorithm;
use stdplane_caen::{DigitizerDecoder, DigitizerTopology};
use stdplane_core::{ClusteringAlgorithm, ClusteringConfig, DataBlock, Plane, TagMap};
use stdplane_etroc::{EtrocConfig, EtrocDecoder};

use crate::event::{Payload, Protocol, RawEvent};
use crate::{Error, Result};

/// Decoder for one device, selected by its protocol.
#[derive(Debug, Clone)]
pub enum DeviceDecoder {
    /// ETROC chip readout.
    Etroc(EtrocDecoder),
    /// CAEN digitizer.
    Digitizer(DigitizerDecoder),
}

impl DeviceDecoder {
    /// Builds the decoder for `protocol` from begin-of-run tags.
    ///
    /// # Errors
    /// Returns an error if the tags do not configure the decoder.
    pub fn from_tags(protocol: Protocol, tags: &TagMap) -> Result<Self> {
        Ok(match protocol {
            Protocol::Etroc => {
                DeviceDecoder::Etroc(EtrocDecoder::with_config(EtrocConfig::from_tags(tags)?)?)
            }
            Protocol::Digitizer => {
                DeviceDecoder::Digitizer(DigitizerDecoder::new(DigitizerTopology::from_tags(tags)?))
            }
        })
    }

    /// Returns the protocol family.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        match self {
            DeviceDecoder::Etroc(_) => Protocol::Etroc,
            DeviceDecoder::Digitizer(_) => Protocol::Digitizer,
        }
    }

    /// Decodes the blocks of one data event.
    ///
    /// # Errors
    /// Returns the decoder's error when the event is rejected.
    pub fn decode(&self, blocks: &[DataBlock]) -> Result<Vec<Plane>> {
        match self {
            DeviceDecoder::Etroc(decoder) => Ok(decoder.decode_event(blocks)?),
            DeviceDecoder::Digitizer(decoder) => Ok(decoder.decode_event(blocks)?),
        }
    }
}

/// Mutable registration phase of a run.
#[derive(Debug, Default)]
pub struct RunSetup {
    decoders: BTreeMap<u32, DeviceDecoder>,
    clustering: Option<(Algorithm, ClusteringConfig)>,
}

impl RunSetup {
    /// Creates an empty setup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clusters every converted plane with `algorithm`.
    #[must_use]
    pub fn with_clustering(mut self, algorithm: Algorithm, config: ClusteringConfig) -> Self {
        self.clustering = Some((algorithm, config));
        self
    }

    /// Registers the decoder described by a begin-of-run event.
    ///
    /// A second begin-of-run event for the same device replaces the first.
    ///
    /// # Errors
    /// Returns an error for data events, unknown protocols and tags that
    /// do not configure the decoder.
    pub fn register_bore(&mut self, event: &RawEvent) -> Result<()> {
        let Payload::BeginOfRun(tags) = &event.payload else {
            return Err(Error::NotBeginOfRun(event.device_id));
        };
        let protocol = Protocol::from_id(&event.protocol)?;
        let decoder = DeviceDecoder::from_tags(protocol, tags).inspect_err(|e| {
            log::warn!("device {}: begin-of-run rejected: {e}", event.device_id);
        })?;

        log::info!("device {}: registered {protocol} decoder", event.device_id);
        if self.decoders.insert(event.device_id, decoder).is_some() {
            log::warn!(
                "device {}: repeated begin-of-run replaces the previous decoder",
                event.device_id
            );
        }
        Ok(())
    }

    /// Returns the number of registered devices.
    #[must_use]
    pub fn n_devices(&self) -> usize {
        self.decoders.len()
    }

    /// Ends registration and returns the shared run context.
    #[must_use]
    pub fn freeze(self) -> Arc<RunContext> {
        let clustering = self
            .clustering
            .map(|(algorithm, config)| algorithm.build(&config));
        Arc::new(RunContext {
            decoders: self.decoders,
            clustering,
        })
    }
}

/// Read-only decoder state of a running run.
pub struct RunContext {
    decoders: BTreeMap<u32, DeviceDecoder>,
    clustering: Option<Box<dyn ClusteringAlgorithm>>,
}

impl RunContext {
    /// Returns the decoder registered for `device_id`.
    #[must_use]
    pub fn decoder(&self, device_id: u32) -> Option<&DeviceDecoder> {
        self.decoders.get(&device_id)
    }

    /// Registered device ids, ascending.
    pub fn device_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.decoders.keys().copied()
    }

    /// Converts one data event into planes.
    ///
    /// # Errors
    /// Returns an error if the device has no registered decoder, if the
    /// event is a begin-of-run event or names another protocol than the
    /// device registered, or if the decoder rejects it.
    pub fn convert(&self, event: &RawEvent) -> Result<Vec<Plane>> {
        let result = self.convert_inner(event);
        match &result {
            Ok(planes) => log::debug!(
                "device {} event {}: {} planes",
                event.device_id,
                event.event_number,
                planes.len()
            ),
            Err(e) => log::warn!(
                "device {} event {} rejected: {e}",
                event.device_id,
                event.event_number
            ),
        }
        result
    }

    fn convert_inner(&self, event: &RawEvent) -> Result<Vec<Plane>> {
        let Payload::Data(blocks) = &event.payload else {
            return Err(Error::LateBeginOfRun(event.device_id));
        };
        let decoder = self
            .decoders
            .get(&event.device_id)
            .ok_or(stdplane_core::Error::DeviceNotInitialized(event.device_id))?;
        let protocol = Protocol::from_id(&event.protocol)?;
        if protocol != decoder.protocol() {
            return Err(Error::ProtocolMismatch {
                device_id: event.device_id,
                registered: decoder.protocol(),
                event: protocol,
            });
        }

        let mut planes = decoder.decode(blocks)?;
        if let Some(algorithm) = &self.clustering {
            for plane in &mut planes {
                plane.compute_clusters(algorithm.as_ref());
            }
        }
        Ok(planes)
    }

    /// Converts events in parallel, one result per event in input order.
    #[must_use]
    pub fn convert_all(&self, events: &[RawEvent]) -> Vec<Result<Vec<Plane>>> {
        events.par_iter().map(|event| self.convert(event)).collect()
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("decoders", &self.decoders)
            .field("clustering", &self.clustering.as_ref().map(|a| a.name()))
            .finish()
    }
}
