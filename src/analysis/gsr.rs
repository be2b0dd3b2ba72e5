// src/analysis/gsr.rs
//! Galvanic skin response analyzer
//!
//! Conductance is split into a slow tonic level and the faster phasic
//! residual. The two feed separate trailing windows and a record is only
//! written when both windows hold enough samples.

use crate::analysis::{
    AnalyzerCore, AnalyzerPolicy, AnalyzerSettings, FeatureInterval, FeatureWindow, FilteredBatch, SignalAnalyzer,
    SignalType,
};
use crate::config::analyzer_config::checks;
use crate::config::GsrConfig;
use crate::error::{StreamErrorBuilder, StreamResult};
use crate::processing::features::{FeatureSet, SpectralFeatures, TonicFeatures};
use crate::processing::filters::{butterworth_filter, BandType};

const COMPONENT: &str = "gsr";

#[derive(Debug, Clone)]
pub struct GsrAnalyzer {
    config: GsrConfig,
    core: AnalyzerCore,
    tonic: TonicFeatures,
    phasic: SpectralFeatures,
}

impl GsrAnalyzer {
    pub fn new(config: GsrConfig, settings: AnalyzerSettings) -> StreamResult<Self> {
        let analyzer = Self::unchecked(config, settings);
        analyzer.validate_config(None)?;
        Ok(analyzer)
    }

    pub(crate) fn unchecked(config: GsrConfig, settings: AnalyzerSettings) -> Self {
        let policy = AnalyzerPolicy {
            buffer_depth_points: config.buffer_depth_points,
            buffer_depth_s: config.buffer_depth_s,
            feature_windows: vec![
                FeatureWindow::new("tonic_window_s", config.tonic_window_s, config.tonic_min_points_fraction),
                FeatureWindow::new("phasic_window_s", config.phasic_window_s, config.phasic_min_points_fraction),
            ],
            feature_cadence_s: config.feature_cadence_s,
            average_window_s: config.average_window_s,
        };
        Self {
            core: AnalyzerCore::new(SignalType::Gsr, settings, policy),
            config,
            tonic: TonicFeatures::new("tonic"),
            phasic: SpectralFeatures::phasic(),
        }
    }

    pub fn config(&self) -> &GsrConfig {
        &self.config
    }
}

impl SignalAnalyzer for GsrAnalyzer {
    fn core(&self) -> &AnalyzerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AnalyzerCore {
        &mut self.core
    }

    fn validate_variant(&self) -> StreamResult<()> {
        checks::positive(COMPONENT, "lowpass_cutoff_hz", self.config.lowpass_cutoff_hz)?;
        checks::filter_order(COMPONENT, "lowpass_order", self.config.lowpass_order)?;
        checks::positive(COMPONENT, "tonic_cutoff_hz", self.config.tonic_cutoff_hz)?;
        checks::filter_order(COMPONENT, "tonic_order", self.config.tonic_order)?;
        if self.config.tonic_cutoff_hz >= self.config.lowpass_cutoff_hz {
            return Err(StreamErrorBuilder::new(COMPONENT, "validate_config").configuration(format!(
                "tonic_cutoff_hz ({}) must be below lowpass_cutoff_hz ({})",
                self.config.tonic_cutoff_hz, self.config.lowpass_cutoff_hz
            )));
        }
        Ok(())
    }

    fn validate_for_sampling_freq(&self, sampling_freq: f64) -> StreamResult<()> {
        checks::below_nyquist(COMPONENT, "lowpass_cutoff_hz", self.config.lowpass_cutoff_hz, sampling_freq)?;
        checks::below_nyquist(COMPONENT, "tonic_cutoff_hz", self.config.tonic_cutoff_hz, sampling_freq)
    }

    fn filter_batch(&self, times: &[f64], values: &[f64], sampling_freq: f64) -> StreamResult<FilteredBatch> {
        let filtered = butterworth_filter(
            values,
            self.config.lowpass_order,
            self.config.lowpass_cutoff_hz,
            sampling_freq,
            BandType::Lowpass,
        )?;
        let tonic = butterworth_filter(
            &filtered,
            self.config.tonic_order,
            self.config.tonic_cutoff_hz,
            sampling_freq,
            BandType::Lowpass,
        )?;
        let phasic: Vec<f64> = tonic.iter().zip(&filtered).map(|(t, f)| t - f).collect();

        Ok(FilteredBatch::unmasked(times, filtered).with_components(vec![tonic, phasic]))
    }

    /// Tonic slots followed by phasic slots
    fn extract_features(&self, intervals: &[FeatureInterval<'_>], sampling_freq: f64) -> Vec<f64> {
        let [tonic, phasic] = intervals else {
            return Vec::new();
        };
        let mut features = self.tonic.extract(tonic.times, tonic.values, sampling_freq);
        features.extend(self.phasic.extract(phasic.times, phasic.values, sampling_freq));
        features
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names = self.tonic.names();
        names.extend(self.phasic.names());
        names
    }
}
