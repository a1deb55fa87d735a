//! stdplane-core: Core types for decoding detector front-end data.
//!
//! This crate provides the shared data model (hits, planes, clusters),
//! the channel topology grammar, and the error taxonomy used by the
//! protocol decoders.
//!

pub mod block;
pub mod clustering;
pub mod error;
pub mod hit;
pub mod plane;
pub mod topology;

pub use block::{DataBlock, TagMap};
pub use clustering::{Cluster, ClusteringAlgorithm, ClusteringConfig};
pub use error::{Error, ErrorKind, Result, TopologyError};
pub use hit::{Hit, ParseAuxInfoError, PixelAuxInfo, PixelCoord, Waveform};
pub use plane::{Plane, SectionLayout, SensorType};
pub use topology::{
    ChannelPixelMap, ParsedTopology, TopologyParser, TRIGGER_GROUP_0_CHANNEL,
    TRIGGER_GROUP_1_CHANNEL,
};
