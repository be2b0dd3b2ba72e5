// src/analysis/temperature.rs
//! Skin temperature analyzer
//!
//! Temperature drifts slowly, so anything changing faster than the derivative
//! threshold is treated as a contact artifact. The kept samples are smoothed
//! as one contiguous series and written back in place.

use crate::analysis::{
    AnalyzerCore, AnalyzerPolicy, AnalyzerSettings, FeatureInterval, FeatureWindow, FilteredBatch, SignalAnalyzer,
    SignalType,
};
use crate::config::analyzer_config::{checks, smoothing_window};
use crate::config::constants::temperature::SMOOTHING_POLY_ORDER;
use crate::config::TemperatureConfig;
use crate::error::StreamResult;
use crate::processing::artifact::{broaden_flags, compact, flag_steep_derivative, scatter};
use crate::processing::features::{FeatureSet, TemperatureFeatures};
use crate::processing::filters::{butterworth_filter, savgol_filter, BandType};

const COMPONENT: &str = "temperature";

#[derive(Debug, Clone)]
pub struct TemperatureAnalyzer {
    config: TemperatureConfig,
    core: AnalyzerCore,
    features: TemperatureFeatures,
}

impl TemperatureAnalyzer {
    pub fn new(config: TemperatureConfig, settings: AnalyzerSettings) -> StreamResult<Self> {
        let analyzer = Self::unchecked(config, settings);
        analyzer.validate_config(None)?;
        Ok(analyzer)
    }

    pub(crate) fn unchecked(config: TemperatureConfig, settings: AnalyzerSettings) -> Self {
        let policy = AnalyzerPolicy {
            buffer_depth_points: config.buffer_depth_points,
            buffer_depth_s: config.buffer_depth_s,
            feature_windows: vec![FeatureWindow::new(
                "feature_window_s",
                config.feature_window_s,
                config.min_points_fraction,
            )],
            feature_cadence_s: config.feature_cadence_s,
            average_window_s: config.average_window_s,
        };
        Self {
            core: AnalyzerCore::new(SignalType::Temperature, settings, policy),
            config,
            features: TemperatureFeatures,
        }
    }

    pub fn config(&self) -> &TemperatureConfig {
        &self.config
    }
}

impl SignalAnalyzer for TemperatureAnalyzer {
    fn core(&self) -> &AnalyzerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AnalyzerCore {
        &mut self.core
    }

    fn validate_variant(&self) -> StreamResult<()> {
        if let Some(cutoff) = self.config.lowpass_cutoff_hz {
            checks::positive(COMPONENT, "lowpass_cutoff_hz", cutoff)?;
            checks::filter_order(COMPONENT, "lowpass_order", self.config.lowpass_order)?;
        }
        checks::positive(COMPONENT, "derivative_threshold", self.config.derivative_threshold)?;
        checks::non_negative(COMPONENT, "broadening_s", self.config.broadening_s)?;
        checks::positive(COMPONENT, "broadening_tolerance", self.config.broadening_tolerance)?;
        checks::non_negative(COMPONENT, "smoothing_s", self.config.smoothing_s)
    }

    fn validate_for_sampling_freq(&self, sampling_freq: f64) -> StreamResult<()> {
        match self.config.lowpass_cutoff_hz {
            Some(cutoff) => checks::below_nyquist(COMPONENT, "lowpass_cutoff_hz", cutoff, sampling_freq),
            None => Ok(()),
        }
    }

    fn filter_batch(&self, times: &[f64], values: &[f64], sampling_freq: f64) -> StreamResult<FilteredBatch> {
        let mut filtered = match self.config.lowpass_cutoff_hz {
            Some(cutoff) => {
                butterworth_filter(values, self.config.lowpass_order, cutoff, sampling_freq, BandType::Lowpass)?
            }
            None => values.to_vec(),
        };

        let flags = flag_steep_derivative(times, &filtered, self.config.derivative_threshold);
        let good_mask = broaden_flags(
            &flags,
            smoothing_window(self.config.broadening_s, sampling_freq),
            self.config.broadening_tolerance,
        )?;

        let kept = compact(&filtered, &good_mask);
        let smoothed = savgol_filter(
            &kept,
            smoothing_window(self.config.smoothing_s, sampling_freq),
            SMOOTHING_POLY_ORDER,
        )?;
        scatter(&mut filtered, &good_mask, &smoothed);

        Ok(FilteredBatch::new(times, filtered, good_mask))
    }

    fn extract_features(&self, intervals: &[FeatureInterval<'_>], sampling_freq: f64) -> Vec<f64> {
        intervals
            .first()
            .map(|interval| self.features.extract(interval.times, interval.values, sampling_freq))
            .unwrap_or_default()
    }

    fn feature_names(&self) -> Vec<String> {
        self.features.names()
    }
}
