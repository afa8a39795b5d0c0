// src/hal/object_map.rs
//! Layout of the measuring-value frame
//!
//! The object map tells the decoder which value objects a frame carries, in which
//! order, and how to scale them. It is resolved once when a session opens and
//! again after any mode or scale change.

use crate::config::constants::protocol::{IN_CHAN_NO, SIX_AXIS_CHAN_NUM, VALOBJ_NUM_MAX};
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use crate::hal::traits::DeviceCommands;
use crate::hal::types::{FrameDataType, ModeFlags, ObjectMapping, PhysicalType, ValueType};
use tracing::debug;

/// Ordered value objects plus the shared data type and per-object scale factors
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMap {
    mappings: Vec<ObjectMapping>,
    scale_factors: Vec<f64>,
    data_type: FrameDataType,
}

fn inconsistent(operation: &str, message: String) -> GsvError {
    GsvError::new(ErrorKind::ConfigInconsistent, error_context!("object_map", operation), message)
}

impl ObjectMap {
    /// Build a map after checking object count, channel range and scale count
    pub fn new(
        mappings: Vec<ObjectMapping>,
        scale_factors: Vec<f64>,
        data_type: FrameDataType,
    ) -> GsvResult<Self> {
        if mappings.is_empty() || mappings.len() > VALOBJ_NUM_MAX {
            return Err(inconsistent(
                "new",
                format!("{} value objects, allowed 1..={}", mappings.len(), VALOBJ_NUM_MAX),
            ));
        }
        if let Some(bad) = mappings.iter().find(|m| m.channel == 0 || m.channel > IN_CHAN_NO) {
            return Err(inconsistent("new", format!("channel {} out of range", bad.channel)));
        }
        if scale_factors.len() != mappings.len() {
            return Err(inconsistent(
                "new",
                format!("{} scale factors for {} objects", scale_factors.len(), mappings.len()),
            ));
        }

        Ok(Self {
            mappings,
            scale_factors,
            data_type,
        })
    }

    /// Build a map from packed mapping words as reported by the device
    pub fn from_wire(words: &[u32], scale_factors: Vec<f64>, data_type_code: u32) -> GsvResult<Self> {
        let data_type = FrameDataType::from_code(data_type_code)?;
        let mappings = words
            .iter()
            .map(|&word| ObjectMapping::from_wire(word))
            .collect::<GsvResult<Vec<_>>>()?;
        Self::new(mappings, scale_factors, data_type)
    }

    /// Derive the layout from mode flags when the device has no mapping words
    ///
    /// Order is the normal block, then the maximum block, then the minimum block,
    /// each in ascending channel order.
    pub fn derive(
        mode: ModeFlags,
        channel_count: u8,
        scale_factors: Vec<f64>,
        data_type_code: u32,
    ) -> GsvResult<Self> {
        let data_type = FrameDataType::from_code(data_type_code)?;
        if channel_count == 0 || channel_count > IN_CHAN_NO {
            return Err(inconsistent("derive", format!("{} active channels", channel_count)));
        }
        if mode.six_axis && channel_count < SIX_AXIS_CHAN_NUM {
            return Err(inconsistent(
                "derive",
                format!("six-axis mode needs {} channels, device has {}", SIX_AXIS_CHAN_NUM, channel_count),
            ));
        }

        let mut blocks = vec![ValueType::Normal];
        if mode.transmit_max {
            blocks.push(ValueType::Maximum);
        }
        if mode.transmit_min {
            blocks.push(ValueType::Minimum);
        }

        let total = blocks.len() * channel_count as usize;
        if total > VALOBJ_NUM_MAX {
            return Err(inconsistent(
                "derive",
                format!("mode requires {} value objects, maximum is {}", total, VALOBJ_NUM_MAX),
            ));
        }

        let mappings = blocks
            .iter()
            .flat_map(|&value_type| {
                (1..=channel_count).map(move |channel| {
                    let physical_type = if mode.six_axis {
                        PhysicalType::six_axis_component(channel)
                    } else {
                        PhysicalType::Undefined
                    };
                    ObjectMapping::new(channel, value_type, physical_type)
                })
            })
            .collect();

        Self::new(mappings, scale_factors, data_type)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn mappings(&self) -> &[ObjectMapping] {
        &self.mappings
    }

    pub fn scale_factors(&self) -> &[f64] {
        &self.scale_factors
    }

    pub fn data_type(&self) -> FrameDataType {
        self.data_type
    }

    /// Expected payload length of one frame in bytes
    pub fn frame_len(&self) -> usize {
        self.mappings.len() * self.data_type.width()
    }

    pub fn to_wire(&self) -> Vec<u32> {
        self.mappings.iter().map(ObjectMapping::to_wire).collect()
    }
}

/// Query the device and build the current object map
pub fn resolve_object_map(device: &dyn DeviceCommands) -> GsvResult<ObjectMap> {
    let data_type_code = device.data_type_code()?;
    let scale_factors = device.scale_factors()?;

    let map = match device.value_object_info()? {
        Some(words) => ObjectMap::from_wire(&words, scale_factors, data_type_code)?,
        None => {
            let mode = device.mode_flags()?;
            let channels = device.channel_count()?;
            ObjectMap::derive(mode, channels, scale_factors, data_type_code)?
        }
    };

    debug!(
        objects = map.len(),
        data_type = ?map.data_type(),
        "Resolved object map"
    );
    Ok(map)
}
