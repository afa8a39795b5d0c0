//! gsv-core: host-side measuring-value handling for GSV-6/GSV-8 amplifiers
//!
//! This library covers the parts of an amplifier client that do not depend on the
//! physical link:
//!
//! - Value-object mapping and measurement-frame decoding
//! - Per-object ring buffers with overrun accounting and blocking reads
//! - Butterworth IIR and windowed FIR filter design with safety checks
//! - Offline frequency- and step-response simulation with text export
//!
//! Transports and device commands are reached through the traits in [`hal::traits`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gsv_core::acquisition::{ObjectSelector, Receiver, Session};
//! use gsv_core::config::SessionConfig;
//! use gsv_core::hal::mock::{ChannelTransport, MockDevice};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = MockDevice::with_channels(2);
//!     let session = Arc::new(Session::open(SessionConfig::default(), &device)?);
//!
//!     let (sender, transport) = ChannelTransport::pair(64);
//!     let receiver = Receiver::spawn(Arc::clone(&session), transport)?;
//!     // frames pushed into `sender` end up in the session buffers
//!     drop(sender);
//!
//!     let batch = session.read_many(ObjectSelector::All, 2)?;
//!     println!("read {} values", batch.read_count);
//!     receiver.stop();
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod processing;

// Re-export commonly used types for convenience
pub use acquisition::{ChannelBufferSet, ReadBatch, Receiver, Session};
pub use config::{ConfigLoader, SessionConfig};
pub use error::{ErrorKind, GsvError, GsvResult};
pub use hal::{decode_frame, FrameDataType, MeasurementFrame, ObjectMap, ObjectMapping, Sample};
pub use processing::dfilter::{
    Cutoff, FilterCoefficients, FilterDesigner, FilterDomain, FilterShape, FilterSpec, SimulationRequest,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
