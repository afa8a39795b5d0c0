// src/hal/frame_decoder.rs
//! Measuring-value frame decoding
//!
//! Integer fields are big-endian unsigned binary offset; the signed raw value is the
//! field minus half the range and is multiplied by the object's scale factor. Float
//! fields are big-endian IEEE754 and already carry physical units.

use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use crate::hal::object_map::ObjectMap;
use crate::hal::types::{FrameDataType, Sample, ValueErrorFlags};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Decode one frame payload into scaled samples in wire order
pub fn decode_frame(bytes: &[u8], map: &ObjectMap) -> GsvResult<Vec<Sample>> {
    decode_frame_with_status(bytes, map, ValueErrorFlags::NONE)
}

/// Decode one frame and attach the frame's device status flags to every sample
pub fn decode_frame_with_status(
    bytes: &[u8],
    map: &ObjectMap,
    status: ValueErrorFlags,
) -> GsvResult<Vec<Sample>> {
    let expected = map.frame_len();
    if bytes.len() != expected {
        return Err(GsvError::new(
            ErrorKind::FrameSizeMismatch,
            error_context!("frame_decoder", "decode_frame"),
            format!(
                "frame of {} bytes, expected {} ({} objects x {} bytes)",
                bytes.len(),
                expected,
                map.len(),
                map.data_type().width()
            ),
        ));
    }

    let data_type = map.data_type();
    let samples = bytes
        .chunks_exact(data_type.width())
        .zip(map.scale_factors())
        .enumerate()
        .map(|(object_index, (field, &scale))| Sample {
            object_index,
            value: convert_field(field, data_type, scale),
            error_flags: status,
        })
        .collect();

    Ok(samples)
}

/// Convert one field whose length already matches `data_type.width()`
fn convert_field(field: &[u8], data_type: FrameDataType, scale: f64) -> f64 {
    match data_type {
        FrameDataType::Int16Offset => {
            let raw = u16::from_be_bytes([field[0], field[1]]) as i32 - (1 << 15);
            raw as f64 * scale
        }
        FrameDataType::Int24Offset => {
            let unsigned = (field[0] as u32) << 16 | (field[1] as u32) << 8 | field[2] as u32;
            let raw = unsigned as i32 - (1 << 23);
            raw as f64 * scale
        }
        FrameDataType::Float32 => f32::from_be_bytes([field[0], field[1], field[2], field[3]]) as f64,
    }
}

/// Encode scaled values back into a frame payload
///
/// Used by the mock device and by tests. Integer values are rounded and clamped to
/// the field range.
pub fn encode_frame(values: &[f64], map: &ObjectMap) -> GsvResult<Vec<u8>> {
    if values.len() != map.len() {
        return Err(GsvError::new(
            ErrorKind::WrongParameter,
            error_context!("frame_decoder", "encode_frame"),
            format!("{} values for {} objects", values.len(), map.len()),
        ));
    }

    let data_type = map.data_type();
    let mut payload = Vec::with_capacity(map.frame_len());
    for (&value, &scale) in values.iter().zip(map.scale_factors()) {
        match data_type {
            FrameDataType::Int16Offset | FrameDataType::Int24Offset => {
                let half = data_type.bias().unwrap_or(0) as f64;
                let raw = if scale != 0.0 { (value / scale).round() } else { 0.0 };
                let field = (raw + half).clamp(0.0, 2.0 * half - 1.0) as u32;
                let bytes = field.to_be_bytes();
                payload.extend_from_slice(&bytes[4 - data_type.width()..]);
            }
            FrameDataType::Float32 => payload.extend_from_slice(&(value as f32).to_be_bytes()),
        }
    }
    Ok(payload)
}

/// Decoder bound to one object map, keeping frame statistics
#[derive(Debug)]
pub struct FrameDecoder {
    map: ObjectMap,
    frames_decoded: AtomicU64,
    size_errors: AtomicU64,
}

/// Snapshot of decoder statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub size_errors: u64,
}

impl FrameDecoder {
    pub fn new(map: ObjectMap) -> Self {
        Self {
            map,
            frames_decoded: AtomicU64::new(0),
            size_errors: AtomicU64::new(0),
        }
    }

    pub fn map(&self) -> &ObjectMap {
        &self.map
    }

    /// Swap in a re-validated map; statistics carry over
    pub fn set_map(&mut self, map: ObjectMap) {
        self.map = map;
    }

    pub fn decode(&self, bytes: &[u8], status: ValueErrorFlags) -> GsvResult<Vec<Sample>> {
        match decode_frame_with_status(bytes, &self.map, status) {
            Ok(samples) => {
                let count = self.frames_decoded.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(frames = count, objects = samples.len(), "Decoded frame");
                Ok(samples)
            }
            Err(err) => {
                self.size_errors.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            size_errors: self.size_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::protocol::{DATATYP_FLOAT, DATATYP_INT16, DATATYP_INT24};
    use crate::hal::types::ModeFlags;

    fn map(objects: u8, scale: f64, data_type: u32) -> ObjectMap {
        ObjectMap::derive(ModeFlags::default(), objects, vec![scale; objects as usize], data_type).unwrap()
    }

    #[test]
    fn test_int16_binary_offset() {
        let map = map(2, 1.0, DATATYP_INT16);
        let samples = decode_frame(&[0x80, 0x00, 0x80, 0x01], &map).unwrap();
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[1].value, 1.0);

        let samples = decode_frame(&[0x00, 0x00, 0xFF, 0xFF], &map).unwrap();
        assert_eq!(samples[0].value, -32768.0);
        assert_eq!(samples[1].value, 32767.0);
    }

    #[test]
    fn test_int24_scaled() {
        let map = map(1, 0.5, DATATYP_INT24);
        let samples = decode_frame(&[0x80, 0x00, 0x10], &map).unwrap();
        assert_eq!(samples[0].value, 8.0);
        let samples = decode_frame(&[0x7F, 0xFF, 0xFF], &map).unwrap();
        assert_eq!(samples[0].value, -0.5);
    }

    #[test]
    fn test_float32_ignores_scale() {
        let map = map(2, 100.0, DATATYP_FLOAT);
        let mut bytes = 1.5f32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&f32::NAN.to_be_bytes());
        let samples = decode_frame(&bytes, &map).unwrap();
        assert_eq!(samples[0].value, 1.5);
        assert!(samples[1].value.is_nan());
    }

    #[test]
    fn test_frame_size_mismatch() {
        let map = map(3, 1.0, DATATYP_INT16);
        let err = decode_frame(&[0u8; 5], &map).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FrameSizeMismatch);
    }

    #[test]
    fn test_status_attached_to_all_samples() {
        let map = map(2, 1.0, DATATYP_INT16);
        let samples =
            decode_frame_with_status(&[0x80, 0, 0x80, 0], &map, ValueErrorFlags::SATURATED).unwrap();
        assert!(samples.iter().all(|s| s.error_flags == ValueErrorFlags::SATURATED));
        assert_eq!(samples[1].object_index, 1);
    }

    #[test]
    fn test_encode_matches_decode() {
        let map = map(3, 0.25, DATATYP_INT24);
        let payload = encode_frame(&[1.0, -2.5, 0.0], &map).unwrap();
        let values: Vec<f64> = decode_frame(&payload, &map).unwrap().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, -2.5, 0.0]);
    }

    #[test]
    fn test_decoder_stats() {
        let decoder = FrameDecoder::new(map(1, 1.0, DATATYP_INT16));
        decoder.decode(&[0x80, 0x00], ValueErrorFlags::NONE).unwrap();
        assert!(decoder.decode(&[0x80], ValueErrorFlags::NONE).is_err());
        let stats = decoder.stats();
        assert_eq!(stats.frames_decoded, 1);
        assert_eq!(stats.size_errors, 1);
    }
}
