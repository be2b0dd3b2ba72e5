// src/config/mod.rs
//! Engine configuration
//!
//! `EngineConfig` is the single serde-backed configuration surface. Every
//! field has a default taken from [`constants`], so a partial TOML file is
//! always a valid starting point.

pub mod analyzer_config;
pub mod constants;
pub mod loader;

pub use analyzer_config::*;
pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};

use crate::analysis::SignalType;

/// Complete engine configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub eeg: EegConfig,
    #[serde(default)]
    pub gsr: GsrConfig,
    #[serde(default)]
    pub temperature: TemperatureConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Batching and channel layout shared by every analyzer
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StreamSettings {
    /// Samples re-analyzed per cycle ahead of the data finger
    #[serde(default = "defaults::points_per_batch")]
    pub points_per_batch: usize,

    /// Samples the data finger advances after every cycle
    #[serde(default = "defaults::move_data_finger")]
    pub move_data_finger: usize,

    /// Signal type of each incoming channel, in acquisition order
    #[serde(default)]
    pub streaming_order: Vec<SignalType>,

    #[serde(default = "defaults::collect_features")]
    pub collect_features: bool,
}

mod defaults {
    use crate::config::constants::stream;

    pub fn points_per_batch() -> usize { stream::DEFAULT_POINTS_PER_BATCH }
    pub fn move_data_finger() -> usize { stream::DEFAULT_MOVE_DATA_FINGER }
    pub fn collect_features() -> bool { stream::DEFAULT_COLLECT_FEATURES }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            points_per_batch: defaults::points_per_batch(),
            move_data_finger: defaults::move_data_finger(),
            streaming_order: Vec::new(),
            collect_features: defaults::collect_features(),
        }
    }
}

impl StreamSettings {
    /// Settings with an explicit batch geometry and channel layout
    pub fn new(points_per_batch: usize, move_data_finger: usize, streaming_order: Vec<SignalType>) -> Self {
        Self {
            points_per_batch,
            move_data_finger,
            streaming_order,
            collect_features: defaults::collect_features(),
        }
    }
}

impl EngineConfig {
    /// Check cross-field constraints, collecting every problem found
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.stream.points_per_batch == 0 {
            errors.push("points_per_batch must be positive".to_string());
        }
        if self.stream.move_data_finger == 0 {
            errors.push("move_data_finger must be positive".to_string());
        }
        if self.stream.move_data_finger >= self.stream.points_per_batch {
            errors.push(format!(
                "move_data_finger ({}) must be smaller than points_per_batch ({})",
                self.stream.move_data_finger, self.stream.points_per_batch
            ));
        }
        if self.stream.streaming_order.is_empty() {
            errors.push("streaming_order must name at least one channel".to_string());
        }
        if let Err(err) = self.compiler.validate() {
            errors.push(err.to_string());
        }

        // Analyzer-level checks only run for analyzers actually in use
        for signal_type in self.signal_types() {
            errors.extend(signal_type.static_config_problems(self));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Distinct signal types in order of first appearance
    pub fn signal_types(&self) -> Vec<SignalType> {
        let mut seen = Vec::new();
        for signal_type in &self.stream.streaming_order {
            if !seen.contains(signal_type) {
                seen.push(*signal_type);
            }
        }
        seen
    }
}
