// src/hal/types.rs
//! Core types describing the GSV measuring-value frame

use crate::config::constants::protocol::*;
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use serde::{Deserialize, Serialize};

/// Kind of value carried by a value object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Normal,
    #[serde(rename = "max")]
    Maximum,
    #[serde(rename = "min")]
    Minimum,
}

impl ValueType {
    pub fn code(self) -> u8 {
        match self {
            ValueType::Normal => VALTYPE_NORMAL,
            ValueType::Maximum => VALTYPE_MAXVAL,
            ValueType::Minimum => VALTYPE_MINVAL,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            VALTYPE_NORMAL => Some(ValueType::Normal),
            VALTYPE_MAXVAL => Some(ValueType::Maximum),
            VALTYPE_MINVAL => Some(ValueType::Minimum),
            _ => None,
        }
    }
}

/// Physical meaning of a value object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalType {
    Undefined,
    ForceX,
    ForceY,
    ForceZ,
    TorqueX,
    TorqueY,
    TorqueZ,
    RawSixAxis,
    Temperature,
}

impl PhysicalType {
    pub fn code(self) -> u8 {
        match self {
            PhysicalType::Undefined => VAL_PHYS_TYPE_NOTDEF,
            PhysicalType::ForceX => VAL_PHYS_TYPE_FORCE_X,
            PhysicalType::ForceY => VAL_PHYS_TYPE_FORCE_Y,
            PhysicalType::ForceZ => VAL_PHYS_TYPE_FORCE_Z,
            PhysicalType::TorqueX => VAL_PHYS_TYPE_TORQUE_X,
            PhysicalType::TorqueY => VAL_PHYS_TYPE_TORQUE_Y,
            PhysicalType::TorqueZ => VAL_PHYS_TYPE_TORQUE_Z,
            PhysicalType::RawSixAxis => VAL_PHYS_TYPE_RAW,
            PhysicalType::Temperature => VAL_PHYS_TYPE_TEMP,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            VAL_PHYS_TYPE_NOTDEF => Some(PhysicalType::Undefined),
            VAL_PHYS_TYPE_FORCE_X => Some(PhysicalType::ForceX),
            VAL_PHYS_TYPE_FORCE_Y => Some(PhysicalType::ForceY),
            VAL_PHYS_TYPE_FORCE_Z => Some(PhysicalType::ForceZ),
            VAL_PHYS_TYPE_TORQUE_X => Some(PhysicalType::TorqueX),
            VAL_PHYS_TYPE_TORQUE_Y => Some(PhysicalType::TorqueY),
            VAL_PHYS_TYPE_TORQUE_Z => Some(PhysicalType::TorqueZ),
            VAL_PHYS_TYPE_RAW => Some(PhysicalType::RawSixAxis),
            VAL_PHYS_TYPE_TEMP => Some(PhysicalType::Temperature),
            _ => None,
        }
    }

    /// Force/torque component delivered by input channel `channel` of a six-axis sensor
    pub fn six_axis_component(channel: u8) -> Self {
        match channel {
            1 => PhysicalType::ForceX,
            2 => PhysicalType::ForceY,
            3 => PhysicalType::ForceZ,
            4 => PhysicalType::TorqueX,
            5 => PhysicalType::TorqueY,
            6 => PhysicalType::TorqueZ,
            _ => PhysicalType::Undefined,
        }
    }
}

/// Encoding of every value in a measuring-value frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameDataType {
    /// 16-bit unsigned binary offset
    Int16Offset,
    /// 24-bit unsigned binary offset
    Int24Offset,
    /// IEEE754 single precision, already scaled
    Float32,
}

impl FrameDataType {
    pub fn from_code(code: u32) -> GsvResult<Self> {
        match code {
            DATATYP_INT16 => Ok(FrameDataType::Int16Offset),
            DATATYP_INT24 => Ok(FrameDataType::Int24Offset),
            DATATYP_FLOAT => Ok(FrameDataType::Float32),
            other => Err(GsvError::new(
                ErrorKind::ConfigInconsistent,
                error_context!("hal", "frame_data_type"),
                format!("unknown frame data type code {}", other),
            )),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            FrameDataType::Int16Offset => DATATYP_INT16,
            FrameDataType::Int24Offset => DATATYP_INT24,
            FrameDataType::Float32 => DATATYP_FLOAT,
        }
    }

    /// Bytes per value on the wire
    pub fn width(self) -> usize {
        match self {
            FrameDataType::Int16Offset => 2,
            FrameDataType::Int24Offset => 3,
            FrameDataType::Float32 => 4,
        }
    }

    /// Binary offset subtracted from integer fields, `None` for floats
    pub fn bias(self) -> Option<i32> {
        match self {
            FrameDataType::Int16Offset => Some(1 << 15),
            FrameDataType::Int24Offset => Some(1 << 23),
            FrameDataType::Float32 => None,
        }
    }
}

/// Description of one value object in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectMapping {
    pub channel: u8,
    pub value_type: ValueType,
    pub physical_type: PhysicalType,
}

impl ObjectMapping {
    pub fn new(channel: u8, value_type: ValueType, physical_type: PhysicalType) -> Self {
        Self {
            channel,
            value_type,
            physical_type,
        }
    }

    /// Unpack a mapping word: bits 7:0 channel, 15:8 value type, 23:16 physical type
    pub fn from_wire(word: u32) -> GsvResult<Self> {
        let field = |shift: u32| ((word >> shift) & MAPPING_FIELD_MASK) as u8;
        let channel = field(MAPPING_CHANNEL_SHIFT);
        let value_code = field(MAPPING_VALTYPE_SHIFT);
        let phys_code = field(MAPPING_PHYSTYPE_SHIFT);

        let inconsistent = |what: String| {
            GsvError::new(ErrorKind::ConfigInconsistent, error_context!("hal", "mapping_from_wire"), what)
        };

        if channel == 0 || channel > IN_CHAN_NO {
            return Err(inconsistent(format!("channel {} in mapping word 0x{:08X}", channel, word)));
        }
        let value_type = ValueType::from_code(value_code)
            .ok_or_else(|| inconsistent(format!("value type {} in mapping word 0x{:08X}", value_code, word)))?;
        let physical_type = PhysicalType::from_code(phys_code)
            .ok_or_else(|| inconsistent(format!("physical type 0x{:02X} in mapping word 0x{:08X}", phys_code, word)))?;

        Ok(Self::new(channel, value_type, physical_type))
    }

    pub fn to_wire(&self) -> u32 {
        (self.channel as u32) << MAPPING_CHANNEL_SHIFT
            | (self.value_type.code() as u32) << MAPPING_VALTYPE_SHIFT
            | (self.physical_type.code() as u32) << MAPPING_PHYSTYPE_SHIFT
    }
}

/// Per-value error flags reported by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueErrorFlags(u8);

impl ValueErrorFlags {
    pub const NONE: Self = Self(0);
    pub const SATURATED: Self = Self(1 << 0);
    pub const MAX_EXCEEDED: Self = Self(1 << 1);
    pub const SENSOR_BROKEN: Self = Self(1 << 2);
    pub const ANALOG_OUTPUT: Self = Self(1 << 3);
    pub const DIGITAL_OUTPUT: Self = Self(1 << 4);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x1F)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Map the device's error type enumeration to a flag
    pub fn from_type_code(code: u32) -> Self {
        match code {
            VALERR_TYPE_SATURATED => Self::SATURATED,
            VALERR_TYPE_MAX_EXCEED => Self::MAX_EXCEEDED,
            VALERR_TYPE_SENSOR_BROKEN => Self::SENSOR_BROKEN,
            ERR_TYPE_ANALOG_OUTPUT => Self::ANALOG_OUTPUT,
            ERR_TYPE_DIGITAL_OUTPUT => Self::DIGITAL_OUTPUT,
            _ => Self::NONE,
        }
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ValueErrorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ValueErrorFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One decoded, scaled measuring value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub object_index: usize,
    pub value: f64,
    pub error_flags: ValueErrorFlags,
}

/// Raw measuring-value frame as handed over by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementFrame {
    pub payload: Vec<u8>,
    pub status: ValueErrorFlags,
}

impl MeasurementFrame {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            status: ValueErrorFlags::NONE,
        }
    }

    pub fn with_status(payload: Vec<u8>, status: ValueErrorFlags) -> Self {
        Self { payload, status }
    }
}

/// Device mode state relevant to the frame layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFlags {
    pub six_axis: bool,
    pub transmit_max: bool,
    pub transmit_min: bool,
}

impl ModeFlags {
    /// Build from the raw mode and transmission flag words
    pub fn from_device_words(mode: u32, tx_mode: u32) -> Self {
        Self {
            six_axis: mode & (SIX_AXIS_SENSOR_ACTIVE | SIX_AXIS_SENSOR_ACT_GSV6) != 0,
            transmit_max: tx_mode & TX_MAXVALUE != 0,
            transmit_min: tx_mode & TX_MINVALUE != 0,
        }
    }
}
