//! Biostream-Core: streaming windowed analysis of physiological signals
//!
//! This library turns continuously arriving EEG, GSR and skin-temperature
//! samples into a time series of smoothed feature vectors. It features:
//!
//! - Per-signal analyzers that filter, mask artifacts and extract features
//! - A data finger that re-analyzes overlapping batches as samples stream in
//! - Sampling-frequency estimation from the stream itself
//! - Trimmed-mean compilation of feature records over a trailing window
//! - Layered TOML configuration with environment overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use biostream_core::config::{EngineConfig, StreamSettings};
//! use biostream_core::analysis::SignalType;
//! use biostream_core::streaming::StreamOrchestrator;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = EngineConfig::default();
//!     config.stream = StreamSettings::new(2000, 200, vec![SignalType::Temperature]);
//!
//!     let times: Vec<f64> = (0..12_000).map(|i| i as f64 / 100.0).collect();
//!     let skin = vec![times.iter().map(|t| 33.0 + 0.001 * t).collect()];
//!
//!     let mut orchestrator = StreamOrchestrator::new(config)?;
//!     orchestrator.replay_recording(&times, &skin)?;
//!     for report in orchestrator.feature_reports() {
//!         println!("{} channel {}: {} records", report.signal_type, report.channel, report.len());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod analysis;
pub mod config;
pub mod error;
pub mod processing;
pub mod streaming;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{AcquisitionSource, RecordedSource, SampleBatch, SimulatedSource};
pub use analysis::{
    Analyzer, AnalysisUpdate, AnalyzerPhase, FilteredBatch, SignalAnalyzer, SignalType, WindowOutcome,
};
pub use config::{ConfigLoader, EngineConfig};
pub use error::{StreamError, StreamResult};
pub use streaming::{StreamLimit, StreamMetrics, StreamOrchestrator};

pub use utils::time::{current_timestamp_nanos, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Streaming windowed-analysis engine for physiological signals".to_string(),
        signal_types: SignalType::ALL.iter().map(|s| s.name().to_string()).collect(),
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Supported analyzer variants
    pub signal_types: Vec<String>,
}
