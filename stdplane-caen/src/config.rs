//! Begin-of-run configuration of a digitizer run.

use std::collections::BTreeSet;

use stdplane_core::{ChannelPixelMap, Plane, SensorType, TagMap, TopologyParser};

use crate::{Error, Result};

pub const PRODUCER_NAME_TAG: &str = "producer_name";
pub const N_SAMPLES_TAG: &str = "n_samples_per_waveform";
pub const SAMPLING_FREQUENCY_TAG: &str = "sampling_frequency_MHz";
pub const DUT_NAMES_TAG: &str = "dut_names";

/// Splits a Python list repr of names, optionally wrapped in `dict_keys(...)`.
///
/// `"dict_keys(['DUT_1', 'DUT_2'])"` gives `["DUT_1", "DUT_2"]`.
#[must_use]
pub fn parse_dut_names(value: &str) -> Vec<String> {
    let mut list = value.trim();
    if let Some(inner) = list
        .strip_prefix("dict_keys(")
        .and_then(|s| s.strip_suffix(')'))
    {
        list = inner.trim();
    }
    let list = list.trim_start_matches('[').trim_end_matches(']');

    list.split(',')
        .map(|name| name.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Acquisition settings announced at begin of run.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitizerRunConfig {
    pub producer_name: Option<String>,
    /// Expected samples per channel waveform.
    pub n_samples: usize,
    pub sampling_frequency_mhz: u32,
    /// DUT names, in tag order.
    pub dut_names: Vec<String>,
}

impl DigitizerRunConfig {
    /// Reads the acquisition settings from begin-of-run tags.
    ///
    /// # Errors
    ///
    /// Returns an error if a required tag is missing or unparsable, the
    /// sampling frequency is zero, or no DUT is listed.
    pub fn from_tags(tags: &TagMap) -> Result<Self> {
        let n_samples = tags.parse_required(N_SAMPLES_TAG)?;
        let sampling_frequency_mhz = tags.parse_required(SAMPLING_FREQUENCY_TAG)?;
        if sampling_frequency_mhz == 0 {
            return Err(Error::ZeroSamplingFrequency);
        }

        let dut_names = parse_dut_names(tags.require(DUT_NAMES_TAG)?);
        if dut_names.is_empty() {
            return Err(Error::NoDuts);
        }

        Ok(Self {
            producer_name: tags.get(PRODUCER_NAME_TAG).map(str::to_string),
            n_samples,
            sampling_frequency_mhz,
            dut_names,
        })
    }

    /// Time between two samples in nanoseconds.
    #[must_use]
    pub fn sample_interval_ns(&self) -> f64 {
        1e3 / f64::from(self.sampling_frequency_mhz)
    }
}

/// One DUT wired to the digitizer.
#[derive(Debug, Clone, PartialEq)]
pub struct DutTopology {
    pub name: String,
    /// Position in the DUT name list, used as plane id.
    pub index: u32,
    pub map: ChannelPixelMap,
}

impl DutTopology {
    /// An empty plane for this DUT.
    #[must_use]
    pub fn plane_template(&self) -> Plane {
        let (max_x, max_y) = self.map.grid_extent();
        Plane::with_sensor(
            self.name.clone(),
            self.index,
            SensorType::CaenDt5742,
            max_x,
            max_y,
        )
    }
}

/// Run configuration plus the channel topology of every DUT.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitizerTopology {
    pub config: DigitizerRunConfig,
    pub duts: Vec<DutTopology>,
}

impl DigitizerTopology {
    /// Builds the topology from begin-of-run tags.
    ///
    /// Every DUT name must have a tag holding its topology string.
    /// Malformed clauses inside a topology string are skipped.
    ///
    /// # Errors
    ///
    /// See [`DigitizerRunConfig::from_tags`]; a DUT without topology tag is
    /// reported as a missing tag.
    pub fn from_tags(tags: &TagMap) -> Result<Self> {
        let config = DigitizerRunConfig::from_tags(tags)?;
        let parser = TopologyParser::new();

        let mut duts = Vec::with_capacity(config.dut_names.len());
        for (index, name) in config.dut_names.iter().enumerate() {
            let parsed = parser.parse(tags.require(name)?);
            let map = parsed.map;
            let (nx, ny) = map.grid_extent();
            let channels: Vec<u32> = map.channels().collect();
            log::info!(
                "DUT {name}: {nx}x{ny} pixels, {} bound, channels {channels:?}",
                map.n_pixels()
            );
            if map.is_empty() {
                log::warn!("DUT {name}: topology binds no channel");
            }
            duts.push(DutTopology {
                name: name.clone(),
                index: u32::try_from(index).unwrap_or(u32::MAX),
                map,
            });
        }

        Ok(Self { config, duts })
    }

    /// Distinct channels over all DUTs, ascending.
    #[must_use]
    pub fn channels(&self) -> Vec<u32> {
        self.duts
            .iter()
            .flat_map(|dut| dut.map.channels())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of distinct channels, i.e. data blocks expected per event.
    #[must_use]
    pub fn n_channels(&self) -> usize {
        self.channels().len()
    }

    /// Empty planes, one per DUT.
    #[must_use]
    pub fn plane_templates(&self) -> Vec<Plane> {
        self.duts.iter().map(DutTopology::plane_template).collect()
    }
}
