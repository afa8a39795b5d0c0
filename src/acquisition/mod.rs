// src/acquisition/mod.rs
//! Measuring-value buffering and reception

pub mod buffer_set;
pub mod receiver;
pub mod ring_buffer;
pub mod session;

pub use buffer_set::*;
pub use receiver::{Receiver, ReceiverStats};
pub use ring_buffer::OverwritingRing;
pub use session::Session;
