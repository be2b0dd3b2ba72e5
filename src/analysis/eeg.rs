// src/analysis/eeg.rs
//! EEG analyzer
//!
//! Electrode contact loss drives the amplifier output to a rail, so samples
//! outside the valid voltage band are masked before band-limiting.

use crate::analysis::{
    AnalyzerCore, AnalyzerPolicy, AnalyzerSettings, FeatureInterval, FeatureWindow, FilteredBatch, SignalAnalyzer,
    SignalType,
};
use crate::config::analyzer_config::{checks, smoothing_window};
use crate::config::EegConfig;
use crate::error::{StreamErrorBuilder, StreamResult};
use crate::processing::artifact::{broaden_flags, flag_out_of_range};
use crate::processing::features::{FeatureSet, SpectralFeatures};
use crate::processing::filters::{BandType, IirFilter};

const COMPONENT: &str = "eeg";

#[derive(Debug, Clone)]
pub struct EegAnalyzer {
    config: EegConfig,
    core: AnalyzerCore,
    features: SpectralFeatures,
}

impl EegAnalyzer {
    pub fn new(config: EegConfig, settings: AnalyzerSettings) -> StreamResult<Self> {
        let analyzer = Self::unchecked(config, settings);
        analyzer.validate_config(None)?;
        Ok(analyzer)
    }

    pub(crate) fn unchecked(config: EegConfig, settings: AnalyzerSettings) -> Self {
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
            core: AnalyzerCore::new(SignalType::Eeg, settings, policy),
            config,
            features: SpectralFeatures::eeg(),
        }
    }

    pub fn config(&self) -> &EegConfig {
        &self.config
    }
}

impl SignalAnalyzer for EegAnalyzer {
    fn core(&self) -> &AnalyzerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AnalyzerCore {
        &mut self.core
    }

    fn validate_variant(&self) -> StreamResult<()> {
        checks::positive(COMPONENT, "lowpass_cutoff_hz", self.config.lowpass_cutoff_hz)?;
        checks::filter_order(COMPONENT, "lowpass_order", self.config.lowpass_order)?;
        checks::positive(COMPONENT, "highpass_cutoff_hz", self.config.highpass_cutoff_hz)?;
        checks::filter_order(COMPONENT, "highpass_order", self.config.highpass_order)?;
        if self.config.highpass_cutoff_hz >= self.config.lowpass_cutoff_hz {
            return Err(StreamErrorBuilder::new(COMPONENT, "validate_config").configuration(format!(
                "highpass_cutoff_hz ({}) must be below lowpass_cutoff_hz ({})",
                self.config.highpass_cutoff_hz, self.config.lowpass_cutoff_hz
            )));
        }
        if self.config.min_valid_voltage >= self.config.max_valid_voltage {
            return Err(StreamErrorBuilder::new(COMPONENT, "validate_config").configuration(format!(
                "valid voltage band [{}, {}] is empty",
                self.config.min_valid_voltage, self.config.max_valid_voltage
            )));
        }
        checks::non_negative(COMPONENT, "broadening_s", self.config.broadening_s)?;
        checks::positive(COMPONENT, "broadening_tolerance", self.config.broadening_tolerance)
    }

    fn validate_for_sampling_freq(&self, sampling_freq: f64) -> StreamResult<()> {
        checks::below_nyquist(COMPONENT, "lowpass_cutoff_hz", self.config.lowpass_cutoff_hz, sampling_freq)?;
        checks::below_nyquist(COMPONENT, "highpass_cutoff_hz", self.config.highpass_cutoff_hz, sampling_freq)
    }

    fn filter_batch(&self, times: &[f64], values: &[f64], sampling_freq: f64) -> StreamResult<FilteredBatch> {
        let flags = flag_out_of_range(values, self.config.min_valid_voltage, self.config.max_valid_voltage);
        let good_mask = broaden_flags(
            &flags,
            smoothing_window(self.config.broadening_s, sampling_freq),
            self.config.broadening_tolerance,
        )?;

        let mut lowpass = IirFilter::butterworth(
            self.config.lowpass_order,
            self.config.lowpass_cutoff_hz,
            sampling_freq,
            BandType::Lowpass,
        )?;
        let mut highpass = IirFilter::butterworth(
            self.config.highpass_order,
            self.config.highpass_cutoff_hz,
            sampling_freq,
            BandType::Highpass,
        )?;
        let filtered = highpass.filter_primed(&lowpass.filter_primed(values));

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BatchGeometry;
    use std::f64::consts::PI;

    fn analyzer(config: EegConfig) -> EegAnalyzer {
        EegAnalyzer::new(config, AnalyzerSettings::new(1, BatchGeometry::new(3000, 10))).unwrap()
    }

    fn alpha_wave(n: usize, fs: f64) -> (Vec<f64>, Vec<f64>) {
        let times: Vec<f64> = (0..n).map(|i| i as f64 / fs).collect();
        let values = times.iter().map(|t| 1.65 + 0.2 * (2.0 * PI * 10.0 * t).sin()).collect();
        (times, values)
    }

    #[test]
    fn test_in_range_signal_is_kept_and_centred() {
        let analyzer = analyzer(EegConfig::default());
        let (times, values) = alpha_wave(5000, 250.0);
        let batch = analyzer.filter_batch(&times, &values, 250.0).unwrap();
        assert_eq!(batch.good_points(), 5000);
        // The high-pass stage removes the 1.65 V offset
        let tail = &batch.values[2500..];
        let mean = tail.iter().sum::<f64>() / tail.len() as f64;
        assert!(mean.abs() < 0.05, "mean {}", mean);
    }

    #[test]
    fn test_rail_excursion_is_masked() {
        let config = EegConfig { broadening_s: 0.0, ..Default::default() };
        let analyzer = analyzer(config);
        let (times, mut values) = alpha_wave(2500, 250.0);
        values[1000..1010].iter_mut().for_each(|v| *v = 3.3);
        let batch = analyzer.filter_batch(&times, &values, 250.0).unwrap();
        assert!(batch.good_mask[..999].iter().all(|&good| good));
        assert!(batch.good_mask[999..1011].iter().all(|&good| !good));
        assert_eq!(batch.good_points(), 2500 - 12);
    }

    #[test]
    fn test_lowpass_must_sit_below_nyquist() {
        let analyzer = analyzer(EegConfig::default());
        assert!(analyzer.validate_config(Some(250.0)).is_ok());
        assert!(analyzer.validate_config(Some(100.0)).unwrap_err().is_configuration());
    }

    #[test]
    fn test_inverted_voltage_band_is_rejected() {
        let config = EegConfig { min_valid_voltage: 3.0, max_valid_voltage: 1.0, ..Default::default() };
        let settings = AnalyzerSettings::new(1, BatchGeometry::new(3000, 10));
        assert!(EegAnalyzer::new(config, settings).unwrap_err().is_configuration());
    }

    #[test]
    fn test_feature_names_match_extraction() {
        let analyzer = analyzer(EegConfig::default());
        let (times, values) = alpha_wave(3750, 250.0);
        let interval = FeatureInterval { times: &times, values: &values };
        let features = analyzer.extract_features(&[interval], 250.0);
        assert_eq!(features.len(), analyzer.feature_names().len());
    }
}
