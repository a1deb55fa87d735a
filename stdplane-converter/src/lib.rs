//! stdplane-converter: Run-level conversion of raw events into planes.
//!
//! A run starts with one begin-of-run event per device. Each one selects a
//! protocol decoder and configures it from the event's tags:
//!
//! ```text
//! RawEvent (BORE) --register_bore--> RunSetup --freeze--> Arc<RunContext>
//! RawEvent (data) ----------------------convert------------> Vec<Plane>
//! ```
//!
//! The frozen context is read-only, so data events may be converted from
//! several threads at once; [`RunContext::convert_all`] does so with rayon.

mod context;
mod error;
mod event;

pub use context::{DeviceDecoder, RunContext, RunSetup};
pub use error::{Error, Result};
pub use event::{Payload, Protocol, RawEvent};
