// src/hal/traits.rs
//! Collaborator traits at the device boundary
//!
//! Transport open/close and the command protocol live outside this crate. The core
//! only needs these narrow views of them.

use crate::error::{ErrorContext, ErrorKind, GsvError};
use crate::hal::types::{MeasurementFrame, ModeFlags};
use std::time::Duration;

/// Failure reported by a transport or command collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("transport I/O failure: {0}")]
    Io(String),
    #[error("device rejected request with code 0x{0:02X}")]
    Device(u8),
}

impl From<TransportError> for GsvError {
    fn from(err: TransportError) -> Self {
        let kind = match err {
            TransportError::Device(code) => ErrorKind::Device(code),
            _ => ErrorKind::Transport,
        };
        GsvError::new(kind, ErrorContext::new("transport", "request"), err.to_string())
    }
}

/// Source of raw measuring-value frames
pub trait TransportReader: Send {
    /// Wait up to `timeout` for the next frame; `Ok(None)` on timeout
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<MeasurementFrame>, TransportError>;
}

/// Read-only device queries needed to resolve the frame layout
pub trait DeviceCommands: Send + Sync {
    /// Packed object mapping words, if the firmware reports them directly
    fn value_object_info(&self) -> Result<Option<Vec<u32>>, TransportError>;

    fn mode_flags(&self) -> Result<ModeFlags, TransportError>;

    /// Number of active input channels
    fn channel_count(&self) -> Result<u8, TransportError>;

    fn data_type_code(&self) -> Result<u32, TransportError>;

    /// One scale factor per value object, in wire order
    fn scale_factors(&self) -> Result<Vec<f64>, TransportError>;
}

/// Where a designed filter goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTarget {
    AllChannels,
    Channel(u8),
}

/// Device command that stores filter coefficients
pub trait FilterCommitter {
    fn commit_filter(
        &mut self,
        target: CommitTarget,
        type_code: u8,
        cut_ratios: [f64; 2],
        feed_forward: &[f64],
        feedback: &[f64],
    ) -> Result<(), TransportError>;
}
