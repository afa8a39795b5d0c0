// src/processing/dfilter/simulator.rs
//! Offline frequency- and step-response simulation of designed filters

use super::{FilterCoefficients, FilterDomain};
use crate::config::constants::filters::FILT_TYPE_FIR;
use crate::config::constants::simulation::*;
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// What to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationMode {
    FrequencyResponse,
    StepResponse,
}

impl SimulationMode {
    /// Decode a simulation code; the FIR flag selects the filter family
    pub fn from_code(code: u32) -> GsvResult<(Self, FilterDomain)> {
        let domain = if code & FILT_TYPE_FIR as u32 != 0 {
            FilterDomain::Fir
        } else {
            FilterDomain::Iir
        };
        let mode = match code & !(FILT_TYPE_FIR as u32) {
            SIMUL_DFILT_FREQ_RESPONSE => SimulationMode::FrequencyResponse,
            SIMUL_DFILT_STEP_RESPONSE => SimulationMode::StepResponse,
            other => {
                return Err(GsvError::new(
                    ErrorKind::OptionsInvalid,
                    error_context!("simulator", "mode_from_code"),
                    format!("unknown simulation mode {}", other),
                ))
            }
        };
        Ok((mode, domain))
    }
}

/// Frequency spacing for frequency-response simulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    #[default]
    Linear,
    Logarithmic,
}

/// One simulated point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationPoint {
    /// Frequency in Hz, or sample index for a step response
    pub x: f64,
    /// Linear magnitude, or filter output for a step response
    pub y: f64,
    /// Phase in radians; only for frequency responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,
}

/// Simulation parameters
///
/// For a frequency response `start`/`end` are the first and last frequency; for a
/// step response they are the level before and after the step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub mode: SimulationMode,
    pub start: f64,
    pub end: f64,
    pub sample_rate: f64,
    pub points: usize,
    pub spacing: Spacing,
}

impl SimulationRequest {
    pub fn frequency_response(start: f64, end: f64, sample_rate: f64, points: usize) -> Self {
        Self {
            mode: SimulationMode::FrequencyResponse,
            start,
            end,
            sample_rate,
            points,
            spacing: Spacing::Linear,
        }
    }

    pub fn step_response(start: f64, end: f64, points: usize) -> Self {
        Self {
            mode: SimulationMode::StepResponse,
            start,
            end,
            sample_rate: 1.0,
            points,
            spacing: Spacing::Linear,
        }
    }

    pub fn with_spacing(mut self, spacing: Spacing) -> Self {
        self.spacing = spacing;
        self
    }

    fn validate(&self) -> GsvResult<()> {
        let invalid = |message: String| {
            Err(GsvError::new(
                ErrorKind::OptionsInvalid,
                error_context!("simulator", "validate"),
                message,
            ))
        };

        if self.points == 0 || self.points > MAX_SIMULATION_POINTS {
            return invalid(format!("{} points, allowed 1..={}", self.points, MAX_SIMULATION_POINTS));
        }
        if !self.start.is_finite() || !self.end.is_finite() {
            return invalid("start and end must be finite".to_string());
        }

        if self.mode == SimulationMode::FrequencyResponse {
            if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
                return invalid(format!("sample rate {} must be positive", self.sample_rate));
            }
            if self.start < 0.0 || self.start > self.end {
                return invalid(format!("frequency range {}..{} invalid", self.start, self.end));
            }
            if self.end >= self.sample_rate / 2.0 {
                return invalid(format!(
                    "end frequency {} not below Nyquist {}",
                    self.end,
                    self.sample_rate / 2.0
                ));
            }
            if self.spacing == Spacing::Logarithmic && self.start == 0.0 {
                return invalid("logarithmic spacing needs a start frequency above zero".to_string());
            }
        }
        Ok(())
    }

    fn frequency(&self, i: usize) -> f64 {
        if self.points == 1 {
            return self.start;
        }
        let t = i as f64 / (self.points - 1) as f64;
        match self.spacing {
            Spacing::Linear => self.start + (self.end - self.start) * t,
            Spacing::Logarithmic => self.start * (self.end / self.start).powf(t),
        }
    }
}

/// Complex response at normalised angular frequency `w` (radians per sample)
pub fn response_at(coeffs: &FilterCoefficients, w: f64) -> Complex64 {
    let polynomial = |c: &[f64], delay: usize| {
        c.iter()
            .enumerate()
            .fold(Complex64::new(0.0, 0.0), |acc, (k, &v)| {
                acc + Complex64::from_polar(v, -w * (k + delay) as f64)
            })
    };
    match coeffs {
        FilterCoefficients::Iir { feed_forward, feedback } => {
            polynomial(feed_forward, 0) / (Complex64::new(1.0, 0.0) + polynomial(feedback, 1))
        }
        FilterCoefficients::Fir { taps } => polynomial(taps, 0),
    }
}

/// Reject coefficient sets that cannot be evaluated
///
/// The IIR leading denominator coefficient is implicitly 1, so only an empty FIR
/// or a non-finite coefficient can make a set unusable.
fn check_runnable(coeffs: &FilterCoefficients) -> GsvResult<()> {
    let invalid = |message: &str| {
        Err(GsvError::new(
            ErrorKind::OptionsInvalid,
            error_context!("simulator", "check_coefficients"),
            message,
        ))
    };
    let all_finite = match coeffs {
        FilterCoefficients::Iir { feed_forward, feedback } => {
            feed_forward.iter().chain(feedback.iter()).all(|c| c.is_finite())
        }
        FilterCoefficients::Fir { taps } => {
            if taps.is_empty() {
                return invalid("FIR filter without taps");
            }
            taps.iter().all(|c| c.is_finite())
        }
    };
    if !all_finite {
        return invalid("coefficients must be finite");
    }
    Ok(())
}

/// Direct-form filter running designed coefficients sample by sample
#[derive(Debug, Clone)]
pub struct DigitalFilter {
    feed_forward: Vec<f64>,
    feedback: Vec<f64>,
    x_history: Vec<f64>,
    y_history: Vec<f64>,
}

impl DigitalFilter {
    pub fn new(coeffs: &FilterCoefficients) -> GsvResult<Self> {
        check_runnable(coeffs)?;
        let (feed_forward, feedback) = match coeffs {
            FilterCoefficients::Iir { feed_forward, feedback } => (feed_forward.to_vec(), feedback.to_vec()),
            FilterCoefficients::Fir { taps } => (taps.clone(), Vec::new()),
        };
        Ok(Self {
            x_history: vec![0.0; feed_forward.len()],
            y_history: vec![0.0; feedback.len()],
            feed_forward,
            feedback,
        })
    }

    /// Put the filter into the steady state reached for a constant input `level`
    pub fn settle(&mut self, level: f64) {
        let gain = self.feed_forward.iter().sum::<f64>() / (1.0 + self.feedback.iter().sum::<f64>());
        self.x_history.fill(level);
        self.y_history.fill(gain * level);
    }

    pub fn reset(&mut self) {
        self.settle(0.0);
    }

    pub fn process_sample(&mut self, input: f64) -> f64 {
        self.x_history.rotate_right(1);
        self.x_history[0] = input;

        let forward: f64 = self.feed_forward.iter().zip(&self.x_history).map(|(a, x)| a * x).sum();
        let recursive: f64 = self.feedback.iter().zip(&self.y_history).map(|(b, y)| b * y).sum();
        let output = forward - recursive;

        if !self.y_history.is_empty() {
            self.y_history.rotate_right(1);
            self.y_history[0] = output;
        }
        output
    }
}

/// Simulate `coeffs` as described by `request`; points are ordered by `x`
pub fn simulate(coeffs: &FilterCoefficients, request: &SimulationRequest) -> GsvResult<Vec<SimulationPoint>> {
    request.validate()?;
    check_runnable(coeffs)?;

    let points = match request.mode {
        SimulationMode::FrequencyResponse => (0..request.points)
            .map(|i| {
                let frequency = request.frequency(i);
                let h = response_at(coeffs, 2.0 * PI * frequency / request.sample_rate);
                SimulationPoint {
                    x: frequency,
                    y: h.norm(),
                    phase: Some(h.arg()),
                }
            })
            .collect(),
        SimulationMode::StepResponse => {
            let mut filter = DigitalFilter::new(coeffs)?;
            filter.settle(request.start);
            (0..request.points)
                .map(|n| SimulationPoint {
                    x: n as f64,
                    y: filter.process_sample(request.end),
                    phase: None,
                })
                .collect()
        }
    };
    Ok(points)
}
