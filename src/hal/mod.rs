// src/hal/mod.rs
//! Device boundary: frame layout, decoding and collaborator traits

pub mod frame_decoder;
pub mod mock;
pub mod object_map;
pub mod traits;
pub mod types;

pub use frame_decoder::{decode_frame, decode_frame_with_status, FrameDecoder};
pub use object_map::{resolve_object_map, ObjectMap};
pub use traits::*;
pub use types::*;
