// src/processing/mod.rs
//! Numeric building blocks used by the analyzers: filters, artifact masks,
//! feature kernels and the feature compiler

pub mod artifact;
pub mod feature_compiler;
pub mod features;
pub mod filters;

pub use feature_compiler::{trimmed_mean, FeatureCompiler};
pub use features::{FeatureSet, SpectralFeatures, TemperatureFeatures, TonicFeatures};
pub use filters::{butterworth_filter, savgol_filter, BandType, FilterError, IirFilter};
