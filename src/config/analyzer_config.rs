// src/config/analyzer_config.rs
//! Per-analyzer configuration structures
//!
//! Durations are in seconds and get converted to sample counts only once the
//! analyzer has estimated its sampling frequency.

use serde::{Deserialize, Serialize};

use crate::config::constants::{artifact, compiler, eeg, filters, general, gsr, temperature};
use crate::error::{StreamErrorBuilder, StreamResult};

/// EEG analyzer configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EegConfig {
    #[serde(default = "defaults::eeg_window")]
    pub feature_window_s: f64,
    #[serde(default = "defaults::eeg_cadence")]
    pub feature_cadence_s: f64,
    #[serde(default = "defaults::eeg_min_fraction")]
    pub min_points_fraction: f64,
    #[serde(default = "defaults::eeg_depth_points")]
    pub buffer_depth_points: usize,
    #[serde(default = "defaults::eeg_depth_s")]
    pub buffer_depth_s: f64,
    #[serde(default = "defaults::eeg_lowpass")]
    pub lowpass_cutoff_hz: f64,
    #[serde(default = "defaults::eeg_lowpass_order")]
    pub lowpass_order: usize,
    #[serde(default = "defaults::eeg_highpass")]
    pub highpass_cutoff_hz: f64,
    #[serde(default = "defaults::eeg_highpass_order")]
    pub highpass_order: usize,
    #[serde(default = "defaults::eeg_min_voltage")]
    pub min_valid_voltage: f64,
    #[serde(default = "defaults::eeg_max_voltage")]
    pub max_valid_voltage: f64,
    #[serde(default = "defaults::eeg_broadening")]
    pub broadening_s: f64,
    #[serde(default = "defaults::broadening_tolerance")]
    pub broadening_tolerance: f64,
    /// Trailing compile window; `None` passes raw features through
    #[serde(default)]
    pub average_window_s: Option<f64>,
}

/// GSR analyzer configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GsrConfig {
    #[serde(default = "defaults::gsr_tonic_window")]
    pub tonic_window_s: f64,
    #[serde(default = "defaults::gsr_phasic_window")]
    pub phasic_window_s: f64,
    #[serde(default = "defaults::gsr_cadence")]
    pub feature_cadence_s: f64,
    #[serde(default = "defaults::gsr_tonic_fraction")]
    pub tonic_min_points_fraction: f64,
    #[serde(default = "defaults::gsr_phasic_fraction")]
    pub phasic_min_points_fraction: f64,
    #[serde(default = "defaults::gsr_depth_points")]
    pub buffer_depth_points: usize,
    #[serde(default = "defaults::gsr_depth_s")]
    pub buffer_depth_s: f64,
    #[serde(default = "defaults::gsr_lowpass")]
    pub lowpass_cutoff_hz: f64,
    #[serde(default = "defaults::gsr_lowpass_order")]
    pub lowpass_order: usize,
    #[serde(default = "defaults::gsr_tonic_cutoff")]
    pub tonic_cutoff_hz: f64,
    #[serde(default = "defaults::gsr_tonic_order")]
    pub tonic_order: usize,
    #[serde(default)]
    pub average_window_s: Option<f64>,
}

/// Temperature analyzer configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TemperatureConfig {
    #[serde(default = "defaults::temp_window")]
    pub feature_window_s: f64,
    #[serde(default = "defaults::temp_cadence")]
    pub feature_cadence_s: f64,
    #[serde(default = "defaults::temp_min_fraction")]
    pub min_points_fraction: f64,
    #[serde(default = "defaults::temp_depth_points")]
    pub buffer_depth_points: usize,
    #[serde(default = "defaults::temp_depth_s")]
    pub buffer_depth_s: f64,
    /// `None` skips the low-pass stage
    #[serde(default = "defaults::temp_lowpass")]
    pub lowpass_cutoff_hz: Option<f64>,
    #[serde(default = "defaults::temp_lowpass_order")]
    pub lowpass_order: usize,
    #[serde(default = "defaults::temp_derivative_threshold")]
    pub derivative_threshold: f64,
    #[serde(default = "defaults::temp_broadening")]
    pub broadening_s: f64,
    #[serde(default = "defaults::broadening_tolerance")]
    pub broadening_tolerance: f64,
    #[serde(default = "defaults::temp_smoothing")]
    pub smoothing_s: f64,
    #[serde(default)]
    pub average_window_s: Option<f64>,
}

/// General monitoring analyzer configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GeneralConfig {
    #[serde(default = "defaults::general_depth_points")]
    pub buffer_depth_points: usize,
    #[serde(default = "defaults::general_depth_s")]
    pub buffer_depth_s: f64,
    #[serde(default = "defaults::general_lowpass")]
    pub lowpass_cutoff_hz: Option<f64>,
    #[serde(default = "defaults::general_lowpass_order")]
    pub lowpass_order: usize,
    #[serde(default = "defaults::general_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default = "defaults::general_smoothing_order")]
    pub smoothing_poly_order: usize,
}

/// Feature compiler configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CompilerConfig {
    #[serde(default = "defaults::trim_proportion")]
    pub trim_proportion: f64,
}

mod defaults {
    use super::*;

    pub fn broadening_tolerance() -> f64 { artifact::DEFAULT_BROADENING_TOLERANCE }

    pub fn eeg_window() -> f64 { eeg::FEATURE_WINDOW_S }
    pub fn eeg_cadence() -> f64 { eeg::FEATURE_CADENCE_S }
    pub fn eeg_min_fraction() -> f64 { eeg::MIN_POINTS_FRACTION }
    pub fn eeg_depth_points() -> usize { eeg::BUFFER_DEPTH_POINTS }
    pub fn eeg_depth_s() -> f64 { eeg::BUFFER_DEPTH_S }
    pub fn eeg_lowpass() -> f64 { eeg::LOWPASS_CUTOFF_HZ }
    pub fn eeg_lowpass_order() -> usize { eeg::LOWPASS_ORDER }
    pub fn eeg_highpass() -> f64 { eeg::HIGHPASS_CUTOFF_HZ }
    pub fn eeg_highpass_order() -> usize { eeg::HIGHPASS_ORDER }
    pub fn eeg_min_voltage() -> f64 { eeg::MIN_VALID_VOLTAGE }
    pub fn eeg_max_voltage() -> f64 { eeg::MAX_VALID_VOLTAGE }
    pub fn eeg_broadening() -> f64 { eeg::BROADENING_S }

    pub fn gsr_tonic_window() -> f64 { gsr::TONIC_WINDOW_S }
    pub fn gsr_phasic_window() -> f64 { gsr::PHASIC_WINDOW_S }
    pub fn gsr_cadence() -> f64 { gsr::FEATURE_CADENCE_S }
    pub fn gsr_tonic_fraction() -> f64 { gsr::TONIC_MIN_POINTS_FRACTION }
    pub fn gsr_phasic_fraction() -> f64 { gsr::PHASIC_MIN_POINTS_FRACTION }
    pub fn gsr_depth_points() -> usize { gsr::BUFFER_DEPTH_POINTS }
    pub fn gsr_depth_s() -> f64 { gsr::BUFFER_DEPTH_S }
    pub fn gsr_lowpass() -> f64 { gsr::LOWPASS_CUTOFF_HZ }
    pub fn gsr_lowpass_order() -> usize { gsr::LOWPASS_ORDER }
    pub fn gsr_tonic_cutoff() -> f64 { gsr::TONIC_CUTOFF_HZ }
    pub fn gsr_tonic_order() -> usize { gsr::TONIC_ORDER }

    pub fn temp_window() -> f64 { temperature::FEATURE_WINDOW_S }
    pub fn temp_cadence() -> f64 { temperature::FEATURE_CADENCE_S }
    pub fn temp_min_fraction() -> f64 { temperature::MIN_POINTS_FRACTION }
    pub fn temp_depth_points() -> usize { temperature::BUFFER_DEPTH_POINTS }
    pub fn temp_depth_s() -> f64 { temperature::BUFFER_DEPTH_S }
    pub fn temp_lowpass() -> Option<f64> { Some(temperature::LOWPASS_CUTOFF_HZ) }
    pub fn temp_lowpass_order() -> usize { temperature::LOWPASS_ORDER }
    pub fn temp_derivative_threshold() -> f64 { temperature::DERIVATIVE_THRESHOLD }
    pub fn temp_broadening() -> f64 { temperature::BROADENING_S }
    pub fn temp_smoothing() -> f64 { temperature::SMOOTHING_S }

    pub fn general_depth_points() -> usize { general::BUFFER_DEPTH_POINTS }
    pub fn general_depth_s() -> f64 { general::BUFFER_DEPTH_S }
    pub fn general_lowpass() -> Option<f64> { Some(general::LOWPASS_CUTOFF_HZ) }
    pub fn general_lowpass_order() -> usize { general::LOWPASS_ORDER }
    pub fn general_smoothing_window() -> usize { general::SMOOTHING_WINDOW }
    pub fn general_smoothing_order() -> usize { general::SMOOTHING_POLY_ORDER }

    pub fn trim_proportion() -> f64 { compiler::TRIM_PROPORTION }
}

impl Default for EegConfig {
    fn default() -> Self {
        Self {
            feature_window_s: defaults::eeg_window(),
            feature_cadence_s: defaults::eeg_cadence(),
            min_points_fraction: defaults::eeg_min_fraction(),
            buffer_depth_points: defaults::eeg_depth_points(),
            buffer_depth_s: defaults::eeg_depth_s(),
            lowpass_cutoff_hz: defaults::eeg_lowpass(),
            lowpass_order: defaults::eeg_lowpass_order(),
            highpass_cutoff_hz: defaults::eeg_highpass(),
            highpass_order: defaults::eeg_highpass_order(),
            min_valid_voltage: defaults::eeg_min_voltage(),
            max_valid_voltage: defaults::eeg_max_voltage(),
            broadening_s: defaults::eeg_broadening(),
            broadening_tolerance: defaults::broadening_tolerance(),
            average_window_s: None,
        }
    }
}

impl Default for GsrConfig {
    fn default() -> Self {
        Self {
            tonic_window_s: defaults::gsr_tonic_window(),
            phasic_window_s: defaults::gsr_phasic_window(),
            feature_cadence_s: defaults::gsr_cadence(),
            tonic_min_points_fraction: defaults::gsr_tonic_fraction(),
            phasic_min_points_fraction: defaults::gsr_phasic_fraction(),
            buffer_depth_points: defaults::gsr_depth_points(),
            buffer_depth_s: defaults::gsr_depth_s(),
            lowpass_cutoff_hz: defaults::gsr_lowpass(),
            lowpass_order: defaults::gsr_lowpass_order(),
            tonic_cutoff_hz: defaults::gsr_tonic_cutoff(),
            tonic_order: defaults::gsr_tonic_order(),
            average_window_s: None,
        }
    }
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            feature_window_s: defaults::temp_window(),
            feature_cadence_s: defaults::temp_cadence(),
            min_points_fraction: defaults::temp_min_fraction(),
            buffer_depth_points: defaults::temp_depth_points(),
            buffer_depth_s: defaults::temp_depth_s(),
            lowpass_cutoff_hz: defaults::temp_lowpass(),
            lowpass_order: defaults::temp_lowpass_order(),
            derivative_threshold: defaults::temp_derivative_threshold(),
            broadening_s: defaults::temp_broadening(),
            broadening_tolerance: defaults::broadening_tolerance(),
            smoothing_s: defaults::temp_smoothing(),
            average_window_s: None,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            buffer_depth_points: defaults::general_depth_points(),
            buffer_depth_s: defaults::general_depth_s(),
            lowpass_cutoff_hz: defaults::general_lowpass(),
            lowpass_order: defaults::general_lowpass_order(),
            smoothing_window: defaults::general_smoothing_window(),
            smoothing_poly_order: defaults::general_smoothing_order(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { trim_proportion: defaults::trim_proportion() }
    }
}

/// Retained buffer depth in samples once the sampling frequency is known
pub fn buffer_depth(points: usize, seconds: f64, sampling_freq: f64) -> usize {
    points.max(seconds_to_points(seconds, sampling_freq))
}

/// Number of whole samples spanning `seconds`
pub fn seconds_to_points(seconds: f64, sampling_freq: f64) -> usize {
    let points = (seconds * sampling_freq).floor();
    if points.is_finite() && points > 0.0 { points as usize } else { 0 }
}

/// Odd smoothing window spanning `seconds`, never shorter than three samples
pub fn smoothing_window(seconds: f64, sampling_freq: f64) -> usize {
    let window = seconds_to_points(seconds, sampling_freq).max(artifact::MIN_BROADENING_WINDOW);
    if window % 2 == 0 { window + 1 } else { window }
}

/// Shared validation helpers, each failing with a configuration error
pub(crate) mod checks {
    use super::*;

    pub fn positive(component: &str, name: &str, value: f64) -> StreamResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(StreamErrorBuilder::new(component, "validate_config")
                .configuration(format!("{} must be positive, got {}", name, value)))
        }
    }

    pub fn non_negative(component: &str, name: &str, value: f64) -> StreamResult<()> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(StreamErrorBuilder::new(component, "validate_config")
                .configuration(format!("{} must not be negative, got {}", name, value)))
        }
    }

    pub fn fraction(component: &str, name: &str, value: f64) -> StreamResult<()> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(())
        } else {
            Err(StreamErrorBuilder::new(component, "validate_config")
                .configuration(format!("{} must lie in (0, 1], got {}", name, value)))
        }
    }

    pub fn filter_order(component: &str, name: &str, order: usize) -> StreamResult<()> {
        if (filters::MIN_FILTER_ORDER..=filters::MAX_FILTER_ORDER).contains(&order) {
            Ok(())
        } else {
            Err(StreamErrorBuilder::new(component, "validate_config").configuration(format!(
                "{} must be within {}..={}, got {}",
                name,
                filters::MIN_FILTER_ORDER,
                filters::MAX_FILTER_ORDER,
                order
            )))
        }
    }

    pub fn below_nyquist(component: &str, name: &str, cutoff_hz: f64, sampling_freq: f64) -> StreamResult<()> {
        if cutoff_hz > 0.0 && cutoff_hz < sampling_freq / 2.0 {
            Ok(())
        } else {
            Err(StreamErrorBuilder::new(component, "validate_config").configuration(format!(
                "{} of {} Hz must lie below the Nyquist frequency {} Hz",
                name,
                cutoff_hz,
                sampling_freq / 2.0
            )))
        }
    }

    pub fn average_window(component: &str, window: Option<f64>) -> StreamResult<()> {
        match window {
            Some(seconds) => non_negative(component, "average_window_s", seconds),
            None => Ok(()),
        }
    }

    /// A feature window must fit inside the samples re-filtered every cycle
    pub fn window_fits_buffer(
        component: &str,
        name: &str,
        window_points: usize,
        retained_points: usize,
    ) -> StreamResult<()> {
        if window_points <= retained_points {
            Ok(())
        } else {
            Err(StreamErrorBuilder::new(component, "validate_config").configuration(format!(
                "{} spans {} samples but only {} are retained per filter window",
                name, window_points, retained_points
            )))
        }
    }
}

impl CompilerConfig {
    /// Trim proportion must leave at least the middle record
    pub fn validate(&self) -> StreamResult<()> {
        if self.trim_proportion.is_finite()
            && self.trim_proportion >= 0.0
            && self.trim_proportion < compiler::MAX_TRIM_PROPORTION
        {
            Ok(())
        } else {
            Err(StreamErrorBuilder::new("compiler", "validate_config").configuration(format!(
                "trim_proportion must lie in [0, {}), got {}",
                compiler::MAX_TRIM_PROPORTION,
                self.trim_proportion
            )))
        }
    }
}
