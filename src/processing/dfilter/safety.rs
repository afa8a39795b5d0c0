// src/processing/dfilter/safety.rs
//! Numerical checks run on every design before it is accepted
//!
//! The checks run in a fixed order: convergence and stability of the recursion,
//! coefficient magnitude sum, internal recursion gain. The first failure wins.

use super::FilterCoefficients;
use crate::config::constants::filters::*;
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Thresholds for the design checks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    pub max_root_iterations: usize,
    pub iir_coeff_sum_max: f64,
    pub fir_coeff_sum_max: f64,
    pub intern_gain_max: f64,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_root_iterations: MAX_ROOT_ITERATIONS,
            iir_coeff_sum_max: IIR_COEFF_SUM_MAX,
            fir_coeff_sum_max: FIR_COEFF_SUM_MAX,
            intern_gain_max: INTERN_GAIN_MAX,
        }
    }
}

/// Evaluate a polynomial (highest power first) with Horner's scheme
///
/// Also returns the running bound `Σ|c_k|·|x|^k` used to judge rounding noise.
fn horner(coeffs: &[f64], x: Complex64) -> (Complex64, f64) {
    let magnitude = x.norm();
    coeffs.iter().fold((Complex64::new(0.0, 0.0), 0.0), |(value, bound), &c| {
        (value * x + c, bound * magnitude + c.abs())
    })
}

/// Durand–Kerner search for all roots of a monic polynomial
///
/// `coeffs` lists the polynomial highest power first, starting with the leading 1.
/// A root counts as found once its residual is within rounding noise or its last
/// correction is below `ROOT_TOLERANCE`. Returns `None` when the roots are not
/// found within `max_iterations`.
pub fn find_roots(coeffs: &[f64], max_iterations: usize) -> Option<Vec<Complex64>> {
    let degree = coeffs.len().saturating_sub(1);
    if degree == 0 {
        return Some(Vec::new());
    }

    let seed = Complex64::new(0.4, 0.9);
    let mut roots: Vec<Complex64> = std::iter::successors(Some(Complex64::new(1.0, 0.0)), |z| Some(z * seed))
        .take(degree)
        .collect();

    for _ in 0..max_iterations {
        let mut settled = true;
        let mut largest_step: f64 = 0.0;

        for i in 0..degree {
            let (value, bound) = horner(coeffs, roots[i]);
            if value.norm() <= 8.0 * f64::EPSILON * bound {
                continue;
            }
            settled = false;

            let spread = (0..degree)
                .filter(|&j| j != i)
                .fold(Complex64::new(1.0, 0.0), |acc, j| acc * (roots[i] - roots[j]));
            let step = value / spread;
            if !step.re.is_finite() || !step.im.is_finite() {
                return None;
            }
            roots[i] -= step;
            largest_step = largest_step.max(step.norm() / roots[i].norm().max(1.0));
        }

        if settled || largest_step < ROOT_TOLERANCE {
            return Some(roots);
        }
    }
    None
}

/// Check that the IIR recursion converges and all poles lie inside the unit circle
pub fn check_convergence(feedback: &[f64], max_iterations: usize) -> GsvResult<Vec<Complex64>> {
    let mut denominator = Vec::with_capacity(feedback.len() + 1);
    denominator.push(1.0);
    denominator.extend_from_slice(feedback);

    let poles = find_roots(&denominator, max_iterations).ok_or_else(|| {
        GsvError::new(
            ErrorKind::NoConvergence,
            error_context!("safety", "check_convergence"),
            format!("pole search did not converge within {} iterations", max_iterations),
        )
    })?;

    if let Some(pole) = poles.iter().find(|p| p.norm() >= 1.0 - STABILITY_MARGIN) {
        return Err(GsvError::new(
            ErrorKind::NoConvergence,
            error_context!("safety", "check_convergence"),
            format!("pole {:.6}{:+.6}i on or outside the unit circle", pole.re, pole.im),
        ));
    }
    Ok(poles)
}

/// Peak of `1 / |A(e^{jω})|` over `0..=π`, the gain seen by the recursion state
pub fn internal_gain(feedback: &[f64]) -> f64 {
    (0..GAIN_SCAN_POINTS)
        .map(|i| {
            let w = PI * i as f64 / (GAIN_SCAN_POINTS - 1) as f64;
            let a = feedback
                .iter()
                .enumerate()
                .fold(Complex64::new(1.0, 0.0), |acc, (k, &b)| {
                    acc + Complex64::from_polar(b, -w * (k + 1) as f64)
                });
            1.0 / a.norm()
        })
        .fold(0.0, f64::max)
}

/// Run every check for the coefficients' domain
pub fn check_design(coeffs: &FilterCoefficients, limits: &SafetyLimits) -> GsvResult<()> {
    match coeffs {
        FilterCoefficients::Iir { feed_forward, feedback } => {
            check_convergence(feedback, limits.max_root_iterations)?;

            let sum: f64 = feed_forward.iter().map(|c| c.abs()).sum();
            if sum > limits.iir_coeff_sum_max {
                return Err(coeff_sum_too_big(sum, limits.iir_coeff_sum_max));
            }

            let gain = internal_gain(feedback);
            if gain.is_nan() || gain > limits.intern_gain_max {
                return Err(GsvError::new(
                    ErrorKind::InternGainTooBig,
                    error_context!("safety", "check_design"),
                    format!("internal gain {:.3e} above {:.3e}", gain, limits.intern_gain_max),
                ));
            }
            debug!(coeff_sum = sum, internal_gain = gain, "IIR design passed checks");
        }
        FilterCoefficients::Fir { taps } => {
            let sum: f64 = taps.iter().map(|c| c.abs()).sum();
            if sum.is_nan() || sum > limits.fir_coeff_sum_max {
                return Err(coeff_sum_too_big(sum, limits.fir_coeff_sum_max));
            }
            debug!(coeff_sum = sum, "FIR design passed checks");
        }
    }
    Ok(())
}

fn coeff_sum_too_big(sum: f64, limit: f64) -> GsvError {
    GsvError::new(
        ErrorKind::CoeffSumTooBig,
        error_context!("safety", "check_design"),
        format!("coefficient magnitude sum {:.4} above {}", sum, limit),
    )
}
