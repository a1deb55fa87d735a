//! Digitizer event decoding.

use std::collections::BTreeMap;

use rayon::prelude::*;
use stdplane_core::{DataBlock, Error as CoreError, Hit, PixelAuxInfo, Plane, Waveform};

use crate::amplitude::{estimate, WaveformAmplitude};
use crate::config::DigitizerTopology;
use crate::Result;

const SAMPLE_BYTES: usize = 4;

/// Estimate and waveform of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReadout {
    pub channel: u32,
    pub amplitude: WaveformAmplitude,
    pub waveform: Waveform,
}

/// Decodes a block of little-endian f32 samples.
///
/// Trailing bytes that do not form a whole sample are dropped, and so are
/// NaN and infinite samples.
#[must_use]
pub fn decode_samples(bytes: &[u8]) -> Vec<f64> {
    let remainder = bytes.len() % SAMPLE_BYTES;
    if remainder != 0 {
        log::warn!("ignoring {remainder} trailing bytes after the last sample");
    }
    let samples: Vec<f64> = bytes
        .chunks_exact(SAMPLE_BYTES)
        .map(|c| f64::from(f32::from_le_bytes([c[0], c[1], c[2], c[3]])))
        .collect();
    let n_total = samples.len();
    let finite: Vec<f64> = samples.into_iter().filter(|v| v.is_finite()).collect();
    if finite.len() != n_total {
        log::warn!(
            "dropping {} non-finite samples out of {n_total}",
            n_total - finite.len()
        );
    }
    finite
}

/// Decoder for one digitizer, set up from its begin-of-run event.
#[derive(Debug, Clone)]
pub struct DigitizerDecoder {
    topology: DigitizerTopology,
    templates: Vec<Plane>,
    channels: Vec<u32>,
}

impl DigitizerDecoder {
    /// Creates a decoder for a run topology.
    #[must_use]
    pub fn new(topology: DigitizerTopology) -> Self {
        let templates = topology.plane_templates();
        let channels = topology.channels();
        Self {
            topology,
            templates,
            channels,
        }
    }

    /// Returns the run topology.
    #[must_use]
    pub fn topology(&self) -> &DigitizerTopology {
        &self.topology
    }

    fn read_channel(&self, channel: u32, block: Option<&DataBlock>) -> Result<ChannelReadout> {
        let block = block.ok_or(CoreError::ChannelNotFound(channel))?;
        let samples = decode_samples(&block.bytes);

        let expected = self.topology.config.n_samples;
        if !samples.is_empty() && samples.len() != expected {
            log::warn!(
                "channel {channel}: {} samples, run configured {expected}",
                samples.len()
            );
        }

        let amplitude = estimate(&samples).ok_or(CoreError::EmptyChannel(channel))?;
        let waveform = Waveform::new(samples, 0.0, self.topology.config.sample_interval_ns());
        Ok(ChannelReadout {
            channel,
            amplitude,
            waveform,
        })
    }

    /// Estimates every configured channel of one event in parallel.
    ///
    /// Channels without a block or without samples are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BlockCountMismatch`] if the event does not hold
    /// exactly one block per configured channel.
    pub fn read_channels(&self, blocks: &[DataBlock]) -> Result<BTreeMap<u32, ChannelReadout>> {
        if blocks.len() != self.channels.len() {
            return Err(CoreError::BlockCountMismatch {
                expected: self.channels.len(),
                found: blocks.len(),
            }
            .into());
        }

        let by_index: BTreeMap<u32, &DataBlock> = blocks.iter().map(|b| (b.index, b)).collect();

        Ok(self
            .channels
            .par_iter()
            .filter_map(|&channel| {
                match self.read_channel(channel, by_index.get(&channel).copied()) {
                    Ok(readout) => Some((channel, readout)),
                    Err(e) => {
                        log::warn!("skipping channel {channel}: {e}");
                        None
                    }
                }
            })
            .collect())
    }

    /// Decodes one event into one plane per DUT.
    ///
    /// Each pixel bound to a channel gets a hit carrying the channel
    /// amplitude, waveform and origin.
    ///
    /// # Errors
    ///
    /// See [`DigitizerDecoder::read_channels`].
    pub fn decode_event(&self, blocks: &[DataBlock]) -> Result<Vec<Plane>> {
        let readouts = self.read_channels(blocks)?;

        let planes = self
            .topology
            .duts
            .iter()
            .zip(&self.templates)
            .map(|(dut, template)| {
                let mut plane = template.empty_like();
                for (channel, pixels) in dut.map.iter() {
                    let Some(readout) = readouts.get(&channel) else {
                        continue;
                    };
                    for pixel in pixels {
                        let aux = PixelAuxInfo::new(
                            dut.name.clone(),
                            channel,
                            pixel.x.unsigned_abs(),
                            pixel.y.unsigned_abs(),
                        );
                        plane.add_hit(
                            Hit::new(pixel.x, pixel.y, readout.amplitude.amplitude)
                                .with_waveform(readout.waveform.clone())
                                .with_aux_info(aux.to_string()),
                        );
                    }
                }
                plane
            })
            .collect::<Vec<_>>();

        log::debug!(
            "digitizer event: {} channels read, {} planes",
            readouts.len(),
            planes.len()
        );
        Ok(planes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_samples() {
        let bytes: Vec<u8> = [1.5f32, -2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(decode_samples(&bytes), vec![1.5, -2.0]);

        let mut short = bytes.clone();
        short.push(0xFF);
        assert_eq!(decode_samples(&short).len(), 2);
        assert!(decode_samples(&[]).is_empty());
    }

    #[test]
    fn test_non_finite_samples_dropped() {
        let bytes: Vec<u8> = [0.0f32, f32::NAN, 500.0, f32::INFINITY, 0.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let samples = decode_samples(&bytes);
        assert_eq!(samples, vec![0.0, 500.0, 0.0]);

        let nan_only: Vec<u8> = f32::NAN.to_le_bytes().to_vec();
        assert!(decode_samples(&nan_only).is_empty());
    }
}
