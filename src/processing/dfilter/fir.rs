// src/processing/dfilter/fir.rs
//! Windowed-sinc FIR design with exact linear phase

use super::{Cutoff, FilterShape};
use crate::config::constants::filters::{HAMMING_WINDOW_ALPHA, HAMMING_WINDOW_BETA};
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// Ideal low-pass impulse response `sin(2π·fc·m) / (π·m)` at offset `m ≠ 0`
fn ideal_lowpass(ratio: f64, m: f64) -> f64 {
    (2.0 * PI * ratio * m).sin() / (PI * m)
}

/// Ideal all-pass term at a half-integer offset
fn ideal_allpass(m: f64) -> f64 {
    (PI * m).sin() / (PI * m)
}

fn hamming(n: usize, taps: usize) -> f64 {
    HAMMING_WINDOW_ALPHA - HAMMING_WINDOW_BETA * (2.0 * PI * n as f64 / (taps - 1) as f64).cos()
}

/// Frequency where the passband gain is forced to one
fn reference_ratio(shape: FilterShape, cutoff: Cutoff) -> f64 {
    let [r1, r2] = cutoff.ratios();
    match shape {
        FilterShape::LowPass | FilterShape::BandStop => 0.0,
        FilterShape::HighPass => (r1 + 0.5) / 2.0,
        FilterShape::BandPass => (r1 + r2) / 2.0,
    }
}

/// Magnitude of the response at `ratio`
pub(crate) fn gain_at(taps: &[f64], ratio: f64) -> f64 {
    let w = 2.0 * PI * ratio;
    taps.iter()
        .enumerate()
        .map(|(k, &c)| Complex64::from_polar(c, -w * k as f64))
        .sum::<Complex64>()
        .norm()
}

/// Design `order` symmetric taps; the request is already validated (even order)
///
/// The window centre sits between the two middle taps, so every offset is a
/// half-integer. One half is computed and mirrored.
pub fn design_fir(shape: FilterShape, order: usize, cutoff: Cutoff) -> GsvResult<Vec<f64>> {
    let [r1, r2] = cutoff.ratios();
    let centre = (order as f64 - 1.0) / 2.0;

    let mut taps = vec![0.0; order];
    for n in 0..order / 2 {
        let m = n as f64 - centre;
        let ideal = match shape {
            FilterShape::LowPass => ideal_lowpass(r1, m),
            FilterShape::HighPass => ideal_allpass(m) - ideal_lowpass(r1, m),
            FilterShape::BandPass => ideal_lowpass(r2, m) - ideal_lowpass(r1, m),
            FilterShape::BandStop => ideal_allpass(m) - ideal_lowpass(r2, m) + ideal_lowpass(r1, m),
        };
        let value = ideal * hamming(n, order);
        taps[n] = value;
        taps[order - 1 - n] = value;
    }

    let reference = reference_ratio(shape, cutoff);
    let gain = gain_at(&taps, reference);
    if !gain.is_finite() || gain < f64::EPSILON {
        return Err(GsvError::new(
            ErrorKind::CoeffSumTooBig,
            error_context!("fir", "design_fir"),
            format!("passband gain {:e} at ratio {} cannot be normalised", gain, reference),
        ));
    }
    taps.iter_mut().for_each(|c| *c /= gain);
    Ok(taps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_symmetry_and_dc_gain() {
        let taps = design_fir(FilterShape::LowPass, 8, Cutoff::Single(0.1)).unwrap();
        assert_eq!(taps.len(), 8);
        for k in 0..8 {
            assert_eq!(taps[k], taps[7 - k]);
        }
        assert!((taps.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_highpass_normalised_in_passband() {
        let taps = design_fir(FilterShape::HighPass, 14, Cutoff::Single(0.2)).unwrap();
        assert!((gain_at(&taps, 0.35) - 1.0).abs() < 1e-12);
        assert!(gain_at(&taps, 0.0) < 0.2);
    }

    #[test]
    fn test_bandpass_and_bandstop() {
        let band = Cutoff::Band { low: 0.15, high: 0.3 };
        let bp = design_fir(FilterShape::BandPass, 12, band).unwrap();
        assert!((gain_at(&bp, 0.225) - 1.0).abs() < 1e-12);

        let bs = design_fir(FilterShape::BandStop, 12, band).unwrap();
        assert!((bs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(gain_at(&bs, 0.225) < 1.0);
    }

    #[test]
    fn test_hamming_endpoints() {
        assert!((hamming(0, 8) - 0.08).abs() < 1e-12);
        assert!((hamming(7, 8) - 0.08).abs() < 1e-12);
    }
}
