//! ETROC block decoder.

use std::collections::BTreeMap;

use rayon::prelude::*;
use stdplane_core::{DataBlock, Error as CoreError, Hit, Plane, SensorType};

use crate::frame::{ChipTrailer, DataWord, EtrocWord, EventHeader, EventTrailer};
use crate::repack::{container_words, WordRepacker};
use crate::{EtrocConfig, Result};

/// Container words taken by the event header.
const HEADER_WORDS: usize = 2;
/// Container words taken by the event trailer.
const TRAILER_WORDS: usize = 1;

/// A chip whose trailer hit count disagrees with its decoded data words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitCountMismatch {
    pub chip_id: u32,
    pub declared: u8,
    pub decoded: usize,
}

/// Everything decoded from one block, before it is turned into planes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChipEvent {
    pub header: EventHeader,
    pub trailer: EventTrailer,
    /// Chip trailers in stream order; the length is the chip slot count.
    pub chip_trailers: Vec<ChipTrailer>,
    /// Hits per chip id.
    pub hits: BTreeMap<u32, Vec<Hit>>,
    /// Data words seen after the last chip trailer, dropped.
    pub orphan_hits: usize,
    /// Total data words decoded, orphans included.
    pub n_data_words: usize,
    /// Chips whose trailer hit count did not match.
    pub mismatches: Vec<HitCountMismatch>,
}

impl DecodedChipEvent {
    /// Number of hits attributed to a chip.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.hits.values().map(Vec::len).sum()
    }

    /// Whether the event trailer hit count matches the decoded data words.
    #[must_use]
    pub fn trailer_consistent(&self) -> bool {
        usize::from(self.trailer.hits) == self.n_data_words
    }
}

/// Running state of the payload walk.
#[derive(Default)]
struct PayloadState {
    pending: Vec<Hit>,
    level_one_id: Option<u32>,
    chip_trailers: Vec<ChipTrailer>,
    hits: BTreeMap<u32, Vec<Hit>>,
    n_data_words: usize,
    mismatches: Vec<HitCountMismatch>,
}

impl PayloadState {
    fn push_data(&mut self, data: DataWord) {
        let mut hit = Hit::new(i32::from(data.col), i32::from(data.row), f64::from(data.tot))
            .with_tot(u32::from(data.tot))
            .with_toa(u32::from(data.toa));
        if let Some(l1) = self.level_one_id {
            hit = hit.with_level_one_id(l1);
        }
        self.pending.push(hit);
        self.n_data_words += 1;
    }

    fn close_chip(&mut self, trailer: ChipTrailer) {
        let decoded = self.pending.len();
        if usize::from(trailer.hits) != decoded {
            log::warn!(
                "chip {}: trailer declares {} hits, decoded {}",
                trailer.chip_id,
                trailer.hits,
                decoded
            );
            self.mismatches.push(HitCountMismatch {
                chip_id: trailer.chip_id,
                declared: trailer.hits,
                decoded,
            });
        }
        self.hits
            .entry(trailer.chip_id)
            .or_default()
            .append(&mut self.pending);
        self.chip_trailers.push(trailer);
        self.level_one_id = None;
    }
}

/// Decoder for ETROC readout blocks.
#[derive(Debug, Clone)]
pub struct EtrocDecoder {
    config: EtrocConfig,
    repacker: WordRepacker,
}

impl Default for EtrocDecoder {
    fn default() -> Self {
        Self {
            config: EtrocConfig::default(),
            repacker: WordRepacker::etroc(),
        }
    }
}

impl EtrocDecoder {
    /// Creates a decoder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: EtrocConfig) -> Result<Self> {
        config.validate()?;
        let repacker = WordRepacker::new(32, config.logical_word_width)?;
        Ok(Self { config, repacker })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EtrocConfig {
        &self.config
    }

    /// Decodes one block into its header, per-chip hits and trailer.
    ///
    /// # Errors
    ///
    /// Rejects the block on a misaligned length, a corrupt header or
    /// trailer, or a declared word count that does not match the payload.
    pub fn decode_block(&self, bytes: &[u8]) -> Result<DecodedChipEvent> {
        let words = container_words(bytes, self.config.container_byte_order)?;

        if words.len() < HEADER_WORDS {
            return Err(CoreError::CorruptHeader(format!(
                "block holds {} container words",
                words.len()
            ))
            .into());
        }
        let header = EventHeader::parse(words[0], words[1])?;

        if words.len() < HEADER_WORDS + TRAILER_WORDS {
            return Err(CoreError::CorruptTrailer("block ends after the header".into()).into());
        }
        let trailer = EventTrailer::parse(words[words.len() - 1])?;

        let payload = &words[HEADER_WORDS..words.len() - TRAILER_WORDS];
        let declared = usize::from(header.word_count);
        let available_bits = payload.len() * 32;
        let declared_bits = declared * self.repacker.output_width() as usize;
        if declared_bits > available_bits || available_bits - declared_bits >= 32 {
            return Err(CoreError::WordCountMismatch {
                declared,
                available_bits,
            }
            .into());
        }

        let mut state = PayloadState::default();
        for word in self
            .repacker
            .repack_containers(payload)
            .into_iter()
            .take(declared)
        {
            let classified = EtrocWord::classify(word);
            log::trace!("payload word {word:#012x}: {classified:?}");
            match classified {
                EtrocWord::Data(data) => state.push_data(data),
                EtrocWord::FrameHeader(frame) => {
                    state.level_one_id = Some(u32::from(frame.l1_counter));
                }
                EtrocWord::Filler(_) => {}
                EtrocWord::ChipTrailer(chip) => state.close_chip(chip),
            }
        }

        let orphan_hits = state.pending.len();
        if orphan_hits > 0 {
            log::warn!(
                "event {}: dropping {orphan_hits} hits not closed by a chip trailer",
                header.event_number
            );
        }

        let event = DecodedChipEvent {
            header,
            trailer,
            chip_trailers: state.chip_trailers,
            hits: state.hits,
            orphan_hits,
            n_data_words: state.n_data_words,
            mismatches: state.mismatches,
        };

        if !event.trailer_consistent() {
            log::warn!(
                "event {}: trailer declares {} hits, decoded {}",
                header.event_number,
                trailer.hits,
                event.n_data_words
            );
        }
        log::debug!(
            "event {}: {} chips, {} hits",
            header.event_number,
            event.hits.len(),
            event.n_hits()
        );
        Ok(event)
    }

    /// Decodes one block into one plane per chip id, sorted by chip id.
    ///
    /// # Errors
    ///
    /// See [`EtrocDecoder::decode_block`].
    pub fn decode_planes(&self, bytes: &[u8]) -> Result<Vec<Plane>> {
        let event = self.decode_block(bytes)?;
        Ok(self.to_planes(event))
    }

    /// Converts a decoded block into planes.
    #[must_use]
    pub fn to_planes(&self, event: DecodedChipEvent) -> Vec<Plane> {
        event
            .hits
            .into_iter()
            .map(|(chip_id, hits)| {
                let mut plane = Plane::with_sensor(
                    self.config.sensor_name.clone(),
                    chip_id,
                    SensorType::Etroc,
                    i32::from(self.config.chip_columns),
                    i32::from(self.config.chip_rows),
                );
                for hit in hits {
                    plane.add_hit(hit);
                }
                plane
            })
            .collect()
    }

    /// Decodes all blocks of one event in parallel.
    ///
    /// Planes are returned in block order, then chip id order. A failing
    /// block rejects the whole event.
    ///
    /// # Errors
    ///
    /// Returns the first block error encountered.
    pub fn decode_event(&self, blocks: &[DataBlock]) -> Result<Vec<Plane>> {
        let per_block: Vec<Vec<Plane>> = blocks
            .par_iter()
            .map(|block| self.decode_planes(&block.bytes))
            .collect::<Result<_>>()?;
        Ok(per_block.into_iter().flatten().collect())
    }
}
