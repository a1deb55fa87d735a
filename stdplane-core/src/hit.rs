//! Hit types for decoded detector data.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pixel coordinate on a plane.
///
/// Coordinates are signed so that out-of-grid hits coming from a faulty
/// mapping can be kept and flagged rather than silently wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelCoord {
    /// X coordinate (column).
    pub x: i32,
    /// Y coordinate (row).
    pub y: i32,
}

impl PixelCoord {
    /// Creates a new pixel coordinate.
    #[inline]
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Checks if this coordinate touches another one (8-connectivity).
    ///
    /// A coordinate touches itself.
    #[inline]
    #[must_use]
    pub fn touches(&self, other: &Self) -> bool {
        self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }

    /// Checks if this coordinate is adjacent to another (8-connectivity).
    #[inline]
    #[must_use]
    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.touches(other) && self != other
    }
}

impl From<(i32, i32)> for PixelCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// A sampled waveform attached to a hit.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Waveform {
    /// Samples in acquisition order.
    pub samples: Vec<f64>,
    /// Time of the first sample.
    pub start_time: f64,
    /// Time between two consecutive samples.
    pub sample_interval: f64,
}

impl Waveform {
    /// Creates a waveform from samples and its time axis.
    #[must_use]
    pub fn new(samples: Vec<f64>, start_time: f64, sample_interval: f64) -> Self {
        Self {
            samples,
            start_time,
            sample_interval,
        }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of the sample at `index`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn time_at(&self, index: usize) -> f64 {
        self.start_time + index as f64 * self.sample_interval
    }
}

/// A single decoded hit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Pixel coordinate.
    pub coord: PixelCoord,
    /// Signal magnitude.
    pub amplitude: f64,
    /// Time over threshold, in protocol units.
    pub tot: Option<u32>,
    /// Time of arrival, in protocol units.
    pub toa: Option<u32>,
    /// Pipeline/trigger tag.
    pub level_one_id: Option<u32>,
    /// Raw waveform, when the protocol provides one.
    pub waveform: Option<Waveform>,
    /// Origin metadata, `<dut>:CH<channel>:col<col>:row<row>`.
    pub aux_info: Option<String>,
}

impl Hit {
    /// Creates a hit with only coordinates and amplitude set.
    #[must_use]
    pub fn new(x: i32, y: i32, amplitude: f64) -> Self {
        Self {
            coord: PixelCoord::new(x, y),
            amplitude,
            tot: None,
            toa: None,
            level_one_id: None,
            waveform: None,
            aux_info: None,
        }
    }

    /// Sets the time over threshold.
    #[must_use]
    pub fn with_tot(mut self, tot: u32) -> Self {
        self.tot = Some(tot);
        self
    }

    /// Sets the time of arrival.
    #[must_use]
    pub fn with_toa(mut self, toa: u32) -> Self {
        self.toa = Some(toa);
        self
    }

    /// Sets the level-one (trigger) identifier.
    #[must_use]
    pub fn with_level_one_id(mut self, lvl1: u32) -> Self {
        self.level_one_id = Some(lvl1);
        self
    }

    /// Attaches a waveform.
    #[must_use]
    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = Some(waveform);
        self
    }

    /// Attaches origin metadata.
    #[must_use]
    pub fn with_aux_info(mut self, aux: impl Into<String>) -> Self {
        self.aux_info = Some(aux.into());
        self
    }

    /// Returns the x coordinate.
    #[inline]
    #[must_use]
    pub fn x(&self) -> i32 {
        self.coord.x
    }

    /// Returns the y coordinate.
    #[inline]
    #[must_use]
    pub fn y(&self) -> i32 {
        self.coord.y
    }

    /// Returns true if both coordinates are non-negative.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.coord.x >= 0 && self.coord.y >= 0
    }

    /// Parses the aux info string, if any.
    #[must_use]
    pub fn pixel_aux_info(&self) -> Option<PixelAuxInfo> {
        self.aux_info.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Structured origin metadata of a hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelAuxInfo {
    /// Name of the device under test.
    pub dut: String,
    /// Readout channel.
    pub channel: u32,
    /// Source column.
    pub col: u32,
    /// Source row.
    pub row: u32,
}

impl PixelAuxInfo {
    /// Creates aux info for one pixel of a channel.
    #[must_use]
    pub fn new(dut: impl Into<String>, channel: u32, col: u32, row: u32) -> Self {
        Self {
            dut: dut.into(),
            channel,
            col,
            row,
        }
    }
}

impl fmt::Display for PixelAuxInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:CH{}:col{}:row{}",
            self.dut, self.channel, self.col, self.row
        )
    }
}

/// Error returned when an aux info string does not follow
/// `<dut>:CH<channel>:col<col>:row<row>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("aux info is not of the form <dut>:CH<n>:col<c>:row<r>")]
pub struct ParseAuxInfoError;

impl FromStr for PixelAuxInfo {
    type Err = ParseAuxInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // DUT names may themselves contain ':', so peel tokens off the right.
        let mut parts = s.rsplitn(4, ':');
        let row = parts.next().and_then(|t| t.strip_prefix("row"));
        let col = parts.next().and_then(|t| t.strip_prefix("col"));
        let channel = parts.next().and_then(|t| t.strip_prefix("CH"));
        let dut = parts.next();

        match (dut, channel, col, row) {
            (Some(dut), Some(channel), Some(col), Some(row)) if !dut.is_empty() => Ok(Self {
                dut: dut.to_string(),
                channel: channel.parse().map_err(|_| ParseAuxInfoError)?,
                col: col.parse().map_err(|_| ParseAuxInfoError)?,
                row: row.parse().map_err(|_| ParseAuxInfoError)?,
            }),
            _ => Err(ParseAuxInfoError),
        }
    }
}
