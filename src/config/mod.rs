// src/config/mod.rs
//! Session configuration
//!
//! Settings come from built-in defaults, optional TOML files and `GSV_*`
//! environment overrides, merged by [`ConfigLoader`].

pub mod constants;
pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use crate::processing::dfilter::{ExportFormat, SafetyLimits, SimulationRequest, Spacing};
use serde::{Deserialize, Serialize};

/// Complete configuration of one measuring session
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub buffers: BufferSettings,
    #[serde(default)]
    pub receiver: ReceiverSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub filters: FilterSettings,
}

/// Measuring-value buffer sizing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BufferSettings {
    /// Values kept per value object
    #[serde(default = "defaults::buffer_capacity")]
    pub capacity: usize,
}

/// Reception thread settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReceiverSettings {
    #[serde(default = "defaults::poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

/// Filter simulation and export defaults
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulationSettings {
    #[serde(default)]
    pub spacing: Spacing,
    #[serde(default = "defaults::export_delimiter")]
    pub export_delimiter: char,
    #[serde(default = "defaults::step_start")]
    pub step_start: f64,
    #[serde(default = "defaults::step_end")]
    pub step_end: f64,
}

/// Acceptance thresholds for designed filters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilterSettings {
    #[serde(default = "defaults::max_root_iterations")]
    pub max_root_iterations: usize,
    #[serde(default = "defaults::iir_coeff_sum_max")]
    pub iir_coeff_sum_max: f64,
    #[serde(default = "defaults::fir_coeff_sum_max")]
    pub fir_coeff_sum_max: f64,
    #[serde(default = "defaults::intern_gain_max")]
    pub intern_gain_max: f64,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn buffer_capacity() -> usize { buffers::DEFAULT_BUFFER_CAPACITY }
    pub fn poll_timeout_ms() -> u64 { receiver::DEFAULT_POLL_TIMEOUT_MS }

    pub fn export_delimiter() -> char { simulation::DEFAULT_EXPORT_DELIMITER }
    pub fn step_start() -> f64 { simulation::DEFAULT_STEP_START }
    pub fn step_end() -> f64 { simulation::DEFAULT_STEP_END }

    pub fn max_root_iterations() -> usize { filters::MAX_ROOT_ITERATIONS }
    pub fn iir_coeff_sum_max() -> f64 { filters::IIR_COEFF_SUM_MAX }
    pub fn fir_coeff_sum_max() -> f64 { filters::FIR_COEFF_SUM_MAX }
    pub fn intern_gain_max() -> f64 { filters::INTERN_GAIN_MAX }
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            capacity: defaults::buffer_capacity(),
        }
    }
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            poll_timeout_ms: defaults::poll_timeout_ms(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            spacing: Spacing::default(),
            export_delimiter: defaults::export_delimiter(),
            step_start: defaults::step_start(),
            step_end: defaults::step_end(),
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            max_root_iterations: defaults::max_root_iterations(),
            iir_coeff_sum_max: defaults::iir_coeff_sum_max(),
            fir_coeff_sum_max: defaults::fir_coeff_sum_max(),
            intern_gain_max: defaults::intern_gain_max(),
        }
    }
}

impl FilterSettings {
    pub fn limits(&self) -> SafetyLimits {
        SafetyLimits {
            max_root_iterations: self.max_root_iterations,
            iir_coeff_sum_max: self.iir_coeff_sum_max,
            fir_coeff_sum_max: self.fir_coeff_sum_max,
            intern_gain_max: self.intern_gain_max,
        }
    }
}

impl SimulationSettings {
    /// Step-response request using the configured levels
    pub fn step_request(&self, points: usize) -> SimulationRequest {
        SimulationRequest::step_response(self.step_start, self.step_end, points)
    }

    /// Frequency-response request using the configured spacing
    pub fn frequency_request(&self, start: f64, end: f64, sample_rate: f64, points: usize) -> SimulationRequest {
        SimulationRequest::frequency_response(start, end, sample_rate, points).with_spacing(self.spacing)
    }

    pub fn export_format(&self) -> ExportFormat {
        ExportFormat::Delimited {
            delimiter: self.export_delimiter,
        }
    }
}

impl SessionConfig {
    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        use constants::{buffers, receiver};
        let mut errors = Vec::new();

        if !(buffers::MIN_BUFFER_CAPACITY..=buffers::MAX_BUFFER_CAPACITY).contains(&self.buffers.capacity) {
            errors.push(format!(
                "Buffer capacity {} outside {}..={}",
                self.buffers.capacity,
                buffers::MIN_BUFFER_CAPACITY,
                buffers::MAX_BUFFER_CAPACITY
            ));
        }

        if !(receiver::MIN_POLL_TIMEOUT_MS..=receiver::MAX_POLL_TIMEOUT_MS).contains(&self.receiver.poll_timeout_ms) {
            errors.push(format!(
                "Receive poll timeout {} ms outside {}..={}",
                self.receiver.poll_timeout_ms,
                receiver::MIN_POLL_TIMEOUT_MS,
                receiver::MAX_POLL_TIMEOUT_MS
            ));
        }

        if !self.simulation.step_start.is_finite() || !self.simulation.step_end.is_finite() {
            errors.push("Step levels must be finite".to_string());
        }

        if self.simulation.export_delimiter.is_ascii_digit()
            || matches!(self.simulation.export_delimiter, '.' | '-' | '+' | 'e' | '\n')
        {
            errors.push(format!(
                "Export delimiter {:?} collides with number formatting",
                self.simulation.export_delimiter
            ));
        }

        let filters = &self.filters;
        if filters.max_root_iterations == 0 {
            errors.push("Root search needs at least one iteration".to_string());
        }
        for (name, value) in [
            ("iir_coeff_sum_max", filters.iir_coeff_sum_max),
            ("fir_coeff_sum_max", filters.fir_coeff_sum_max),
            ("intern_gain_max", filters.intern_gain_max),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("Filter threshold {} must be positive, got {}", name, value));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and convert failures into a single error
    pub fn validate(&self) -> GsvResult<()> {
        self.validate_consistency().map_err(|errors| {
            GsvError::new(
                ErrorKind::WrongParameter,
                error_context!("config", "validate"),
                errors.join("; "),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffers.capacity, 48_000);
        assert_eq!(config.simulation.export_delimiter, ';');
        assert_eq!(config.filters.limits(), SafetyLimits::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SessionConfig = toml::from_str(
            r#"
[buffers]
capacity = 1000

[simulation]
spacing = "logarithmic"
"#,
        )
        .unwrap();
        assert_eq!(config.buffers.capacity, 1000);
        assert_eq!(config.simulation.spacing, Spacing::Logarithmic);
        assert_eq!(config.receiver.poll_timeout_ms, 50);
        assert_eq!(config.simulation.step_end, 1.0);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SessionConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: SessionConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_simulation_requests_follow_settings() {
        let mut settings = SimulationSettings::default();
        settings.spacing = Spacing::Logarithmic;
        settings.step_end = 5.0;

        let step = settings.step_request(10);
        assert_eq!((step.start, step.end, step.points), (0.0, 5.0, 10));
        assert_eq!(settings.frequency_request(1.0, 10.0, 100.0, 4).spacing, Spacing::Logarithmic);
        assert_eq!(settings.export_format(), ExportFormat::Delimited { delimiter: ';' });
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = SessionConfig::default();
        config.buffers.capacity = 0;
        config.receiver.poll_timeout_ms = 0;
        config.filters.intern_gain_max = -1.0;
        let errors = config.validate_consistency().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::WrongParameter);
    }
}
