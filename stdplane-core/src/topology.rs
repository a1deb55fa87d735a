//! Channel-to-pixel topology of a device under test.
//!
//! A DUT topology is configured as a string such as
//!
//! ```text
//! CH1: [(0,0),(0,1),(1,1)], CH3: [(0,1)], trigger_group_0: []
//! ```
//!
//! Each clause binds one readout channel to the `(col,row)` pixels it is
//! wire-bonded to. The trigger groups of the digitizer are hard-wired to
//! channels 16 and 17 at pixels `(0,0)` and `(0,1)`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

use crate::{PixelCoord, TopologyError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Channel id of `trigger_group_0`.
pub const TRIGGER_GROUP_0_CHANNEL: u32 = 16;
/// Channel id of `trigger_group_1`.
pub const TRIGGER_GROUP_1_CHANNEL: u32 = 17;

/// Mapping from readout channel to the pixels it reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelPixelMap {
    channels: BTreeMap<u32, Vec<PixelCoord>>,
}

impl ChannelPixelMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a pixel to a channel. Returns false if it was already bound.
    pub fn insert(&mut self, channel: u32, pixel: PixelCoord) -> bool {
        let pixels = self.channels.entry(channel).or_default();
        if pixels.contains(&pixel) {
            return false;
        }
        pixels.push(pixel);
        true
    }

    /// Pixels bound to a channel, in configuration order.
    #[must_use]
    pub fn get(&self, channel: u32) -> Option<&[PixelCoord]> {
        self.channels.get(&channel).map(Vec::as_slice)
    }

    /// Whether the channel is part of the topology.
    #[must_use]
    pub fn contains_channel(&self, channel: u32) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Channel ids in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = u32> + '_ {
        self.channels.keys().copied()
    }

    /// Iterates over `(channel, pixels)` in ascending channel order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[PixelCoord])> {
        self.channels.iter().map(|(ch, px)| (*ch, px.as_slice()))
    }

    /// Number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channel is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Total number of bound pixels over all channels.
    #[must_use]
    pub fn n_pixels(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// Grid extent `(max(col)+1, max(row)+1)`, `(0, 0)` when empty.
    #[must_use]
    pub fn grid_extent(&self) -> (i32, i32) {
        self.channels
            .values()
            .flatten()
            .fold((0, 0), |(nx, ny), p| {
                (nx.max(p.x.saturating_add(1)), ny.max(p.y.saturating_add(1)))
            })
    }

    /// Renders the map back into topology-string form.
    #[must_use]
    pub fn to_topology_string(&self) -> String {
        let mut out = String::new();
        for (i, (channel, pixels)) in self.channels.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "CH{channel}: [");
            for (j, p) in pixels.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                let _ = write!(out, "({},{})", p.x, p.y);
            }
            out.push(']');
        }
        out
    }
}

/// Result of parsing one topology string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTopology {
    /// Channels that parsed cleanly.
    pub map: ChannelPixelMap,
    /// Clauses that were skipped, and why.
    pub diagnostics: Vec<TopologyError>,
}

impl ParsedTopology {
    /// Returns true when every clause was usable.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

fn channel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"CH(\d+):").expect("channel pattern is valid"))
}

fn pixel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(\s*(\d+)\s*,\s*(\d+)\s*\)").expect("pixel pattern is valid")
    })
}

/// What the channel token of a clause resolved to.
enum ClauseHead {
    Channel(u32),
    TriggerGroup(u32, PixelCoord),
}

/// Parser for the channel topology grammar.
///
/// Parsing never fails as a whole: malformed clauses are skipped, reported
/// through [`ParsedTopology::diagnostics`] and logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyParser;

impl TopologyParser {
    /// Creates a parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses a topology string.
    #[must_use]
    pub fn parse(&self, topology: &str) -> ParsedTopology {
        let mut parsed = ParsedTopology::default();

        if topology.trim().is_empty() {
            parsed.diagnostics.push(TopologyError::Empty);
        }

        for clause in topology.split(']') {
            let body = clause.trim_matches(|c: char| c.is_whitespace() || c == ',');
            if body.is_empty() {
                continue;
            }
            if let Err(diag) = Self::parse_clause(body, &mut parsed.map) {
                parsed.diagnostics.push(diag);
            }
        }

        for diag in &parsed.diagnostics {
            log::warn!("skipping topology clause: {diag}");
        }
        parsed
    }

    fn parse_clause(clause: &str, map: &mut ChannelPixelMap) -> Result<(), TopologyError> {
        match Self::clause_head(clause)? {
            ClauseHead::TriggerGroup(channel, pixel) => {
                map.insert(channel, pixel);
                Ok(())
            }
            ClauseHead::Channel(channel) => {
                let mut pixels = Vec::new();
                for caps in pixel_regex().captures_iter(clause) {
                    // The grid extent is max + 1, so it must fit as well.
                    let col = caps[1].parse::<i32>().ok().filter(|&c| c < i32::MAX);
                    let row = caps[2].parse::<i32>().ok().filter(|&r| r < i32::MAX);
                    match (col, row) {
                        (Some(col), Some(row)) => pixels.push(PixelCoord::new(col, row)),
                        _ => return Err(TopologyError::InvalidNumber(clause.to_string())),
                    }
                }
                if pixels.is_empty() {
                    return Err(TopologyError::NoPixels {
                        channel,
                        clause: clause.to_string(),
                    });
                }
                for pixel in pixels {
                    map.insert(channel, pixel);
                }
                Ok(())
            }
        }
    }

    fn clause_head(clause: &str) -> Result<ClauseHead, TopologyError> {
        // The last channel token of a clause wins.
        if let Some(caps) = channel_regex().captures_iter(clause).last() {
            return caps[1]
                .parse()
                .map(ClauseHead::Channel)
                .map_err(|_| TopologyError::InvalidNumber(clause.to_string()));
        }

        if !clause.contains("trigger_group") {
            return Err(TopologyError::MissingChannel(clause.to_string()));
        }
        if clause.contains("group_0") {
            Ok(ClauseHead::TriggerGroup(
                TRIGGER_GROUP_0_CHANNEL,
                PixelCoord::new(0, 0),
            ))
        } else if clause.contains("group_1") {
            Ok(ClauseHead::TriggerGroup(
                TRIGGER_GROUP_1_CHANNEL,
                PixelCoord::new(0, 1),
            ))
        } else {
            Err(TopologyError::UnknownTriggerGroup(clause.to_string()))
        }
    }
}
