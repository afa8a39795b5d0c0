// src/config/loader.rs
//! Configuration loader merging defaults, TOML files and environment overrides

use crate::config::{constants::paths, SessionConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Separator between nesting levels in override variable names
const ENV_LEVEL_SEPARATOR: &str = "__";

/// Configuration loader
///
/// Later files override earlier ones; `GSV_SECTION__FIELD` variables override
/// every file, e.g. `GSV_BUFFERS__CAPACITY=2000`.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    #[error("Configuration parse error: {0}")]
    ParseError(String),
    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl ConfigLoader {
    /// Create loader searching the standard locations
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(config_paths: Vec<PathBuf>) -> Self {
        Self { config_paths }
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load and validate using the process environment
    pub fn load(&self) -> Result<SessionConfig, ConfigError> {
        self.load_with_env(std::env::vars())
    }

    /// Load and validate using the given variables instead of the process environment
    pub fn load_with_env<I>(&self, vars: I) -> Result<SessionConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = toml::Value::try_from(&SessionConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        for config_path in &self.config_paths {
            if config_path.exists() {
                let file_config = Self::load_config_file(config_path)?;
                Self::merge_toml_values(&mut merged, file_config);
                debug!(path = %config_path.display(), "Merged configuration file");
            }
        }

        Self::apply_environment_overrides(&mut merged, vars);

        let config: SessionConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;
        config.validate_consistency().map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    /// Write a configuration as TOML
    pub fn export_config<P: AsRef<Path>>(config: &SessionConfig, path: P) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_config_file<P: AsRef<Path>>(path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        Self::merge_toml_values(base_value, value);
                    } else {
                        base_table.insert(key, value);
                    }
                }
            }
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix(paths::ENV_PREFIX) else {
                continue;
            };
            let path: Vec<String> = stripped
                .split(ENV_LEVEL_SEPARATOR)
                .map(str::to_lowercase)
                .collect();
            if path.iter().any(String::is_empty) {
                continue;
            }
            debug!(variable = %key, "Applying environment override");
            Self::set_nested_value(config, &path, Self::parse_env_value(&value));
        }
    }

    fn parse_env_value(value: &str) -> toml::Value {
        if let Ok(int_val) = value.parse::<i64>() {
            toml::Value::Integer(int_val)
        } else if let Ok(float_val) = value.parse::<f64>() {
            toml::Value::Float(float_val)
        } else if let Ok(bool_val) = value.parse::<bool>() {
            toml::Value::Boolean(bool_val)
        } else {
            toml::Value::String(value.to_string())
        }
    }

    fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut current = config;
        for part in parents {
            let toml::Value::Table(table) = current else {
                return;
            };
            current = table
                .entry(part.clone())
                .or_insert(toml::Value::Table(toml::value::Table::new()));
        }
        if let toml::Value::Table(table) = current {
            table.insert(last.clone(), value);
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(paths::SYSTEM_CONFIG_FILE)];

        if let Some(home_dir) = home_dir() {
            candidates.push(home_dir.join(paths::USER_CONFIG_DIR).join(paths::DEFAULT_CONFIG_FILE));
        }

        candidates.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        candidates
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}
