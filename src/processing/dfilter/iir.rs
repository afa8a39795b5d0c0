// src/processing/dfilter/iir.rs
//! 4th-order Butterworth IIR design via zeros, poles and gain
//!
//! Low- and high-pass filters start from a 4th-order analog prototype; band-pass
//! and band-stop start from a 2nd-order prototype whose band transformation
//! doubles the order. The analog filter is mapped to z with the bilinear
//! transform `s = 2(z-1)/(z+1)` after pre-warping the band edges.

use super::{Cutoff, FilterShape};
use crate::config::constants::filters::{FILT_ORDER_IIR, IIR_FEEDBACK_LEN, IIR_FEED_FORWARD_LEN};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// Zeros, poles and gain of a transfer function
#[derive(Debug, Clone)]
struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

/// Analog Butterworth prototype with unity cutoff
fn butterworth_prototype(order: usize) -> Zpk {
    let n = order as f64;
    let poles = (0..order)
        .map(|k| {
            let m = -(n - 1.0) + 2.0 * k as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect();
    Zpk {
        zeros: Vec::new(),
        poles,
        gain: 1.0,
    }
}

/// Pre-warped analog frequency for a cutoff ratio
fn prewarp(ratio: f64) -> f64 {
    2.0 * (PI * ratio).tan()
}

fn neg_product(roots: &[Complex64]) -> Complex64 {
    roots.iter().fold(Complex64::new(1.0, 0.0), |acc, &r| acc * -r)
}

fn to_lowpass(proto: Zpk, wc: f64) -> Zpk {
    let degree = (proto.poles.len() - proto.zeros.len()) as i32;
    Zpk {
        zeros: proto.zeros.iter().map(|&z| z * wc).collect(),
        poles: proto.poles.iter().map(|&p| p * wc).collect(),
        gain: proto.gain * wc.powi(degree),
    }
}

fn to_highpass(proto: Zpk, wc: f64) -> Zpk {
    let degree = proto.poles.len() - proto.zeros.len();
    let gain = proto.gain * (neg_product(&proto.zeros) / neg_product(&proto.poles)).re;
    let mut zeros: Vec<Complex64> = proto.zeros.iter().map(|&z| wc / z).collect();
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
    Zpk {
        zeros,
        poles: proto.poles.iter().map(|&p| wc / p).collect(),
        gain,
    }
}

/// Each prototype root `r` becomes the pair `r·bw/2 ± sqrt((r·bw/2)² − w0²)`
fn band_pair(root: Complex64, w0: f64) -> [Complex64; 2] {
    let offset = (root * root - w0 * w0).sqrt();
    [root + offset, root - offset]
}

fn to_bandpass(proto: Zpk, w1: f64, w2: f64) -> Zpk {
    let bw = w2 - w1;
    let w0 = (w1 * w2).sqrt();
    let degree = proto.poles.len() - proto.zeros.len();

    let mut zeros: Vec<Complex64> = proto.zeros.iter().flat_map(|&z| band_pair(z * (bw / 2.0), w0)).collect();
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
    Zpk {
        zeros,
        poles: proto.poles.iter().flat_map(|&p| band_pair(p * (bw / 2.0), w0)).collect(),
        gain: proto.gain * bw.powi(degree as i32),
    }
}

fn to_bandstop(proto: Zpk, w1: f64, w2: f64) -> Zpk {
    let bw = w2 - w1;
    let w0 = (w1 * w2).sqrt();
    let degree = proto.poles.len() - proto.zeros.len();
    let gain = proto.gain * (neg_product(&proto.zeros) / neg_product(&proto.poles)).re;

    let mut zeros: Vec<Complex64> = proto
        .zeros
        .iter()
        .flat_map(|&z| band_pair((bw / 2.0) / z, w0))
        .collect();
    for _ in 0..degree {
        zeros.push(Complex64::new(0.0, w0));
        zeros.push(Complex64::new(0.0, -w0));
    }
    Zpk {
        zeros,
        poles: proto.poles.iter().flat_map(|&p| band_pair((bw / 2.0) / p, w0)).collect(),
        gain,
    }
}

/// Bilinear transform with unit sample period: `z = (2 + s) / (2 - s)`
fn bilinear(analog: Zpk) -> Zpk {
    let two = Complex64::new(2.0, 0.0);
    let degree = analog.poles.len() - analog.zeros.len();

    let numerator = analog.zeros.iter().fold(Complex64::new(1.0, 0.0), |acc, &z| acc * (two - z));
    let denominator = analog.poles.iter().fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (two - p));

    let mut zeros: Vec<Complex64> = analog.zeros.iter().map(|&z| (two + z) / (two - z)).collect();
    zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
    Zpk {
        zeros,
        poles: analog.poles.iter().map(|&p| (two + p) / (two - p)).collect(),
        gain: analog.gain * (numerator / denominator).re,
    }
}

/// Expand `Π (1 − r·z⁻¹)` into coefficients of z⁰, z⁻¹, …
pub(crate) fn expand_roots(roots: &[Complex64]) -> Vec<f64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        coeffs.push(Complex64::new(0.0, 0.0));
        for i in (1..coeffs.len()).rev() {
            let prev = coeffs[i - 1];
            coeffs[i] -= root * prev;
        }
    }
    // conjugate pairs cancel the imaginary parts
    coeffs.iter().map(|c| c.re).collect()
}

/// Design the collapsed 5 + 4 coefficient set; the cutoff is already validated
pub fn design_iir(shape: FilterShape, cutoff: Cutoff) -> ([f64; IIR_FEED_FORWARD_LEN], [f64; IIR_FEEDBACK_LEN]) {
    let [r1, r2] = cutoff.ratios();
    let analog = match shape {
        FilterShape::LowPass => to_lowpass(butterworth_prototype(FILT_ORDER_IIR), prewarp(r1)),
        FilterShape::HighPass => to_highpass(butterworth_prototype(FILT_ORDER_IIR), prewarp(r1)),
        FilterShape::BandPass => to_bandpass(butterworth_prototype(FILT_ORDER_IIR / 2), prewarp(r1), prewarp(r2)),
        FilterShape::BandStop => to_bandstop(butterworth_prototype(FILT_ORDER_IIR / 2), prewarp(r1), prewarp(r2)),
    };
    let digital = bilinear(analog);

    let numerator = expand_roots(&digital.zeros);
    let denominator = expand_roots(&digital.poles);

    let mut feed_forward = [0.0; IIR_FEED_FORWARD_LEN];
    for (a, n) in feed_forward.iter_mut().zip(&numerator) {
        *a = n * digital.gain;
    }
    let mut feedback = [0.0; IIR_FEEDBACK_LEN];
    for (b, d) in feedback.iter_mut().zip(denominator.iter().skip(1)) {
        *b = *d;
    }
    (feed_forward, feedback)
}
