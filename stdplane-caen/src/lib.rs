//! stdplane-caen: CAEN waveform digitizer decoder.
//!
//! The digitizer records one waveform per channel. At begin of run the
//! producer announces the acquisition settings and, for every DUT, which
//! pixels each channel is bonded to. Every data event then carries one
//! block of f32 samples per channel; each waveform is reduced to a signed
//! amplitude and copied onto the pixels of its channel.

pub mod amplitude;
pub mod config;
mod decoder;
mod error;

pub use amplitude::{estimate, WaveformAmplitude, SIGNIFICANCE};
pub use config::{parse_dut_names, DigitizerRunConfig, DigitizerTopology, DutTopology};
pub use decoder::{decode_samples, ChannelReadout, DigitizerDecoder};
pub use error::{Error, Result};
