// src/processing/dfilter/mod.rs
//! Digital filter design for the amplifier's per-channel filters
//!
//! Two filter families are supported: 4th-order Butterworth IIR and even-order,
//! linear-phase FIR. Cutoff frequencies are given as ratios of the sample rate.

pub mod designer;
pub mod export;
pub mod fir;
pub mod iir;
pub mod safety;
pub mod simulator;

pub use designer::{DesignTarget, DesignedFilter, FilterDesigner};
pub use export::{save_points, write_points, ExportFormat};
pub use safety::SafetyLimits;
pub use simulator::{simulate, DigitalFilter, SimulationMode, SimulationPoint, SimulationRequest, Spacing};

use crate::config::constants::filters::*;
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use serde::{Deserialize, Serialize};

/// Filter family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterDomain {
    Iir,
    Fir,
}

/// Frequency characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterShape {
    LowPass,
    HighPass,
    BandPass,
    BandStop,
}

impl FilterShape {
    fn code(self) -> u8 {
        match self {
            FilterShape::LowPass => FILT_CHARACT_LP,
            FilterShape::HighPass => FILT_CHARACT_HP,
            FilterShape::BandPass => FILT_CHARACT_BP,
            FilterShape::BandStop => FILT_CHARACT_BS,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code & FILT_CHARACT_MSK {
            FILT_CHARACT_LP => Some(FilterShape::LowPass),
            FILT_CHARACT_HP => Some(FilterShape::HighPass),
            FILT_CHARACT_BP => Some(FilterShape::BandPass),
            FILT_CHARACT_BS => Some(FilterShape::BandStop),
            _ => None,
        }
    }

    pub fn is_band(self) -> bool {
        matches!(self, FilterShape::BandPass | FilterShape::BandStop)
    }
}

/// Cutoff as a ratio of the sample rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Cutoff {
    Single(f64),
    Band { low: f64, high: f64 },
}

impl Cutoff {
    /// Ratios as sent to the device; the second slot is zero for a single cutoff
    pub fn ratios(&self) -> [f64; 2] {
        match *self {
            Cutoff::Single(ratio) => [ratio, 0.0],
            Cutoff::Band { low, high } => [low, high],
        }
    }
}

/// Requested filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub domain: FilterDomain,
    pub shape: FilterShape,
    pub order: usize,
    pub cutoff: Cutoff,
}

fn options_invalid(message: String) -> GsvError {
    GsvError::new(ErrorKind::OptionsInvalid, error_context!("dfilter", "validate"), message)
}

fn combination_invalid(message: String) -> GsvError {
    GsvError::new(
        ErrorKind::ParameterCombinationInvalid,
        error_context!("dfilter", "validate"),
        message,
    )
}

impl FilterSpec {
    /// 4th-order Butterworth IIR
    pub fn iir(shape: FilterShape, cutoff: Cutoff) -> Self {
        Self {
            domain: FilterDomain::Iir,
            shape,
            order: FILT_ORDER_IIR,
            cutoff,
        }
    }

    /// Linear-phase FIR with `order` taps
    pub fn fir(shape: FilterShape, order: usize, cutoff: Cutoff) -> Self {
        Self {
            domain: FilterDomain::Fir,
            shape,
            order,
            cutoff,
        }
    }

    /// Check order, cutoff kind and ratio ranges
    pub fn validate(&self) -> GsvResult<()> {
        match self.domain {
            FilterDomain::Iir if self.order != FILT_ORDER_IIR => {
                return Err(options_invalid(format!(
                    "IIR order {} not supported, must be {}",
                    self.order, FILT_ORDER_IIR
                )));
            }
            FilterDomain::Fir
                if self.order % 2 != 0 || !(FILT_MINORDER_FIR..=FILT_MAXORDER_FIR).contains(&self.order) =>
            {
                return Err(options_invalid(format!(
                    "FIR order {} not supported, must be even within {}..={}",
                    self.order, FILT_MINORDER_FIR, FILT_MAXORDER_FIR
                )));
            }
            _ => {}
        }

        match (self.shape.is_band(), self.cutoff) {
            (true, Cutoff::Single(_)) => {
                return Err(combination_invalid(format!("{:?} needs a band cutoff", self.shape)));
            }
            (false, Cutoff::Band { .. }) => {
                return Err(combination_invalid(format!("{:?} needs a single cutoff", self.shape)));
            }
            _ => {}
        }

        let ratios = match self.cutoff {
            Cutoff::Single(ratio) => vec![ratio],
            Cutoff::Band { low, high } => vec![low, high],
        };
        for ratio in ratios {
            if !ratio.is_finite() || ratio <= 0.0 || ratio >= FILT_FCUT_RATIO_MAX {
                return Err(options_invalid(format!(
                    "cutoff ratio {} outside (0, {})",
                    ratio, FILT_FCUT_RATIO_MAX
                )));
            }
        }

        if let Cutoff::Band { low, high } = self.cutoff {
            if low >= high {
                return Err(combination_invalid(format!(
                    "band lower edge {} not below upper edge {}",
                    low, high
                )));
            }
        }
        Ok(())
    }

    /// Filter type byte: bit 7 FIR, bits 6:4 shape, bits 3:0 order
    pub fn type_code(&self) -> u8 {
        let family = match self.domain {
            FilterDomain::Iir => FILT_TYPE_IIR,
            FilterDomain::Fir => FILT_TYPE_FIR,
        };
        family | self.shape.code() | (self.order as u8 & FILT_ORDER_MSK)
    }

    pub fn from_type_code(code: u8, cutoff: Cutoff) -> GsvResult<Self> {
        let shape = FilterShape::from_code(code)
            .ok_or_else(|| options_invalid(format!("unknown filter characteristic in type 0x{:02X}", code)))?;
        let order = (code & FILT_ORDER_MSK) as usize;
        let domain = if code & FILT_TYPE_FIR != 0 {
            FilterDomain::Fir
        } else {
            FilterDomain::Iir
        };
        Ok(Self {
            domain,
            shape,
            order,
            cutoff,
        })
    }
}

/// Designed coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterCoefficients {
    /// `y[n] = Σ a_k x[n-k] − Σ b_k y[n-1-k]`
    Iir {
        feed_forward: [f64; IIR_FEED_FORWARD_LEN],
        feedback: [f64; IIR_FEEDBACK_LEN],
    },
    /// All taps, symmetric about the centre
    Fir { taps: Vec<f64> },
}

/// Coefficients in the form the device stores them
#[derive(Debug, Clone, PartialEq)]
pub struct WireCoefficients {
    pub feed_forward: Vec<f64>,
    pub feedback: Vec<f64>,
}

impl FilterCoefficients {
    pub fn domain(&self) -> FilterDomain {
        match self {
            FilterCoefficients::Iir { .. } => FilterDomain::Iir,
            FilterCoefficients::Fir { .. } => FilterDomain::Fir,
        }
    }

    /// Compress for the device: a symmetric FIR only sends its first half
    pub fn to_wire(&self) -> WireCoefficients {
        match self {
            FilterCoefficients::Iir { feed_forward, feedback } => WireCoefficients {
                feed_forward: feed_forward.to_vec(),
                feedback: feedback.to_vec(),
            },
            FilterCoefficients::Fir { taps } => WireCoefficients {
                feed_forward: taps[..taps.len() / 2].to_vec(),
                feedback: Vec::new(),
            },
        }
    }

    /// Steady-state gain for a constant input
    pub fn dc_gain(&self) -> f64 {
        match self {
            FilterCoefficients::Iir { feed_forward, feedback } => {
                feed_forward.iter().sum::<f64>() / (1.0 + feedback.iter().sum::<f64>())
            }
            FilterCoefficients::Fir { taps } => taps.iter().sum(),
        }
    }
}
