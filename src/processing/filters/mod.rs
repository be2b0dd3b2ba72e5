// src/processing/filters/mod.rs
//! Digital filters for biosignal streams
//!
//! All filters here are causal and operate on whole slices: every analysis
//! cycle re-filters its trailing window from scratch, so no filter state
//! survives between cycles.

pub mod iir;
pub mod savgol;

pub use iir::*;
pub use savgol::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ProcessingStage, StreamError, StreamErrorBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandType {
    Lowpass,
    Highpass,
}

/// Coefficients of one second-order section, normalised so `a0 == 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Gain of the section for a constant input
    pub fn dc_gain(&self) -> f64 {
        let denominator = 1.0 + self.a1 + self.a2;
        if denominator.abs() < f64::EPSILON {
            0.0
        } else {
            (self.b0 + self.b1 + self.b2) / denominator
        }
    }
}

/// Common filter error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Processing error: {0}")]
    ProcessingError(String),
}

impl From<FilterError> for StreamError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidParameters(reason) => {
                StreamErrorBuilder::new("filters", "design").configuration(reason)
            }
            FilterError::ProcessingError(reason) => {
                StreamErrorBuilder::new("filters", "apply").processing(ProcessingStage::Filtering, reason)
            }
        }
    }
}

/// Filter a slice with a freshly designed Butterworth filter
pub fn butterworth_filter(
    data: &[f64],
    order: usize,
    cutoff_hz: f64,
    sampling_freq: f64,
    band_type: BandType,
) -> Result<Vec<f64>, FilterError> {
    let mut filter = IirFilter::butterworth(order, cutoff_hz, sampling_freq, band_type)?;
    Ok(filter.filter_primed(data))
}
