// src/config/loader.rs
//! Layered TOML configuration loader
//!
//! Layers, lowest priority first: built-in defaults, each configuration file in
//! order, then `BIOSTREAM_<SECTION>_<KEY>` environment variables.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{StreamError, StreamErrorBuilder};

const ENV_PREFIX: &str = "BIOSTREAM_";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    #[error("Configuration parse error: {0}")]
    ParseError(String),
    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for StreamError {
    fn from(err: ConfigError) -> Self {
        StreamErrorBuilder::new("config_loader", "load").configuration(err.to_string())
    }
}

/// Loads and validates [`EngineConfig`] from TOML sources
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_overrides: Vec<(String, String)>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader without files that reads overrides from the process environment
    pub fn new() -> Self {
        Self {
            config_paths: Vec::new(),
            env_overrides: std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)).collect(),
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            ..Self::new()
        }
    }

    /// Replace the environment overrides, mainly for tests
    pub fn with_env_overrides(mut self, overrides: Vec<(String, String)>) -> Self {
        self.env_overrides = overrides;
        self
    }

    /// Load, merge and validate every layer
    pub fn load(&self) -> Result<EngineConfig, ConfigError> {
        let mut merged = toml::Value::try_from(EngineConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        for path in &self.config_paths {
            let layer = Self::load_config_file(path)?;
            debug!(path = %path.display(), "merging configuration layer");
            merge_toml_values(&mut merged, layer);
        }

        self.apply_environment_overrides(&mut merged);
        Self::finish(merged)
    }

    /// Parse a configuration held in memory, layered over defaults
    pub fn load_from_str(&self, content: &str) -> Result<EngineConfig, ConfigError> {
        let mut merged = toml::Value::try_from(EngineConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let layer: toml::Value = toml::from_str(content)?;
        merge_toml_values(&mut merged, layer);
        self.apply_environment_overrides(&mut merged);
        Self::finish(merged)
    }

    /// Export a configuration to file
    pub fn export_config<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<(), ConfigError> {
        let toml_content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn finish(merged: toml::Value) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;
        config.validate_consistency().map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in &self.env_overrides {
            let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            // BIOSTREAM_STREAM_POINTS_PER_BATCH -> stream.points_per_batch
            let lowered = stripped.to_lowercase();
            let Some((section, field)) = lowered.split_once('_') else {
                continue;
            };
            set_nested_value(config, section, field, parse_env_value(value));
        }
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
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

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else if value.contains(',') {
        toml::Value::Array(value.split(',').map(|s| toml::Value::String(s.trim().to_string())).collect())
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, section: &str, field: &str, value: toml::Value) {
    if let toml::Value::Table(root) = config {
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        if let toml::Value::Table(table) = entry {
            // Float fields given as integers ("60") must stay floats
            let value = match (table.get(field), value) {
                (Some(toml::Value::Float(_)), toml::Value::Integer(i)) => toml::Value::Float(i as f64),
                (_, v) => v,
            };
            table.insert(field.to_string(), value);
        }
    }
}
