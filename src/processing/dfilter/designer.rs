// src/processing/dfilter/designer.rs
//! Filter design entry point with per-family memory of the last accepted design

use super::export::save_points;
use super::fir::design_fir;
use super::iir::design_iir;
use super::safety::{check_design, SafetyLimits};
use super::simulator::{simulate, SimulationPoint, SimulationRequest};
use super::{FilterCoefficients, FilterDomain, FilterSpec};
use crate::config::constants::filters::MAX_FILTER_CHANNEL;
use crate::config::{SessionConfig, SimulationSettings};
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use crate::hal::traits::{CommitTarget, FilterCommitter};
use std::path::Path;
use tracing::{info, warn};

/// Where a design should end up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignTarget {
    /// Compute and store only; the device is never touched
    DesignOnly,
    AllChannels,
    /// Input channel `1..=8`
    Channel(u8),
}

/// An accepted design together with its request
#[derive(Debug, Clone, PartialEq)]
pub struct DesignedFilter {
    pub spec: FilterSpec,
    pub coefficients: FilterCoefficients,
}

/// Design coefficients for `spec` and run the safety checks
///
/// Pure: identical inputs yield bit-identical coefficients.
pub fn design(spec: &FilterSpec, limits: &SafetyLimits) -> GsvResult<FilterCoefficients> {
    spec.validate()?;
    let coefficients = match spec.domain {
        FilterDomain::Iir => {
            let (feed_forward, feedback) = design_iir(spec.shape, spec.cutoff);
            FilterCoefficients::Iir { feed_forward, feedback }
        }
        FilterDomain::Fir => FilterCoefficients::Fir {
            taps: design_fir(spec.shape, spec.order, spec.cutoff)?,
        },
    };
    check_design(&coefficients, limits)?;
    Ok(coefficients)
}

/// Stateful designer remembering the last accepted IIR and FIR design
#[derive(Debug, Clone, Default)]
pub struct FilterDesigner {
    limits: SafetyLimits,
    simulation: SimulationSettings,
    last_iir: Option<DesignedFilter>,
    last_fir: Option<DesignedFilter>,
}

impl FilterDesigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SafetyLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Designer using the safety thresholds and simulation defaults of `config`
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            limits: config.filters.limits(),
            simulation: config.simulation.clone(),
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    /// Design and remember the result; a rejected design keeps the previous one
    pub fn design(&mut self, spec: &FilterSpec) -> GsvResult<FilterCoefficients> {
        match design(spec, &self.limits) {
            Ok(coefficients) => {
                let slot = match spec.domain {
                    FilterDomain::Iir => &mut self.last_iir,
                    FilterDomain::Fir => &mut self.last_fir,
                };
                *slot = Some(DesignedFilter {
                    spec: *spec,
                    coefficients: coefficients.clone(),
                });
                info!(type_code = spec.type_code(), cutoff = ?spec.cutoff, "Filter designed");
                Ok(coefficients)
            }
            Err(err) => {
                warn!(type_code = spec.type_code(), kind = %err.kind(), "Filter design rejected");
                Err(err)
            }
        }
    }

    /// Design and, unless `target` is `DesignOnly`, commit to the device
    ///
    /// FIR coefficients are compressed to their independent half at this point.
    pub fn design_for(
        &mut self,
        target: DesignTarget,
        spec: &FilterSpec,
        committer: &mut dyn FilterCommitter,
    ) -> GsvResult<FilterCoefficients> {
        let commit_target = match target {
            DesignTarget::DesignOnly => None,
            DesignTarget::AllChannels => Some(CommitTarget::AllChannels),
            DesignTarget::Channel(channel) if (1..=MAX_FILTER_CHANNEL).contains(&channel) => {
                Some(CommitTarget::Channel(channel))
            }
            DesignTarget::Channel(channel) => {
                return Err(GsvError::new(
                    ErrorKind::WrongParameter,
                    error_context!("designer", "design_for"),
                    format!("channel {} outside 1..={}", channel, MAX_FILTER_CHANNEL),
                ));
            }
        };

        let coefficients = self.design(spec)?;
        if let Some(commit_target) = commit_target {
            let wire = coefficients.to_wire();
            committer.commit_filter(
                commit_target,
                spec.type_code(),
                spec.cutoff.ratios(),
                &wire.feed_forward,
                &wire.feedback,
            )?;
            info!(target = ?commit_target, type_code = spec.type_code(), "Filter committed");
        }
        Ok(coefficients)
    }

    pub fn last_design(&self, domain: FilterDomain) -> Option<&DesignedFilter> {
        match domain {
            FilterDomain::Iir => self.last_iir.as_ref(),
            FilterDomain::Fir => self.last_fir.as_ref(),
        }
    }

    /// Simulate the last accepted design of `domain`
    pub fn simulate(&self, domain: FilterDomain, request: &SimulationRequest) -> GsvResult<Vec<SimulationPoint>> {
        let designed = self.last_design(domain).ok_or_else(|| {
            GsvError::new(
                ErrorKind::NotInitialized,
                error_context!("designer", "simulate"),
                format!("no {:?} filter designed yet", domain),
            )
        })?;
        simulate(&designed.coefficients, request)
    }

    /// Step response of the last `domain` design between the configured levels
    pub fn simulate_step(&self, domain: FilterDomain, points: usize) -> GsvResult<Vec<SimulationPoint>> {
        self.simulate(domain, &self.simulation.step_request(points))
    }

    /// Frequency response of the last `domain` design with the configured spacing
    pub fn simulate_frequency(
        &self,
        domain: FilterDomain,
        start: f64,
        end: f64,
        sample_rate: f64,
        points: usize,
    ) -> GsvResult<Vec<SimulationPoint>> {
        let request = self.simulation.frequency_request(start, end, sample_rate, points);
        self.simulate(domain, &request)
    }

    /// Simulate the last `domain` design and write it in the configured export format
    pub fn export_simulation(
        &self,
        domain: FilterDomain,
        request: &SimulationRequest,
        path: impl AsRef<Path>,
    ) -> GsvResult<usize> {
        let points = self.simulate(domain, request)?;
        save_points(path, &points, self.simulation.export_format())?;
        Ok(points.len())
    }
}
