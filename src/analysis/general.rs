// src/analysis/general.rs
//! Monitoring-only analyzer for channels without a dedicated model

use crate::analysis::{
    AnalyzerCore, AnalyzerPolicy, AnalyzerSettings, FeatureInterval, FilteredBatch, SignalAnalyzer, SignalType,
};
use crate::config::analyzer_config::checks;
use crate::config::GeneralConfig;
use crate::error::{StreamErrorBuilder, StreamResult};
use crate::processing::filters::{butterworth_filter, savgol_filter, BandType};

const COMPONENT: &str = "general";

/// Low-pass plus Savitzky-Golay smoothing; never extracts features
#[derive(Debug, Clone)]
pub struct GeneralAnalyzer {
    config: GeneralConfig,
    core: AnalyzerCore,
}

impl GeneralAnalyzer {
    pub fn new(config: GeneralConfig, settings: AnalyzerSettings) -> StreamResult<Self> {
        let analyzer = Self::unchecked(config, settings);
        analyzer.validate_config(None)?;
        Ok(analyzer)
    }

    pub(crate) fn unchecked(config: GeneralConfig, settings: AnalyzerSettings) -> Self {
        let policy = AnalyzerPolicy::filter_only(config.buffer_depth_points, config.buffer_depth_s);
        Self { core: AnalyzerCore::new(SignalType::General, settings, policy), config }
    }

    pub fn config(&self) -> &GeneralConfig {
        &self.config
    }
}

impl SignalAnalyzer for GeneralAnalyzer {
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
        let window = self.config.smoothing_window;
        let odd_window = if window % 2 == 0 { window + 1 } else { window };
        if self.config.smoothing_poly_order >= odd_window {
            return Err(StreamErrorBuilder::new(COMPONENT, "validate_config").configuration(format!(
                "smoothing_poly_order ({}) must be below smoothing_window ({})",
                self.config.smoothing_poly_order, self.config.smoothing_window
            )));
        }
        Ok(())
    }

    fn validate_for_sampling_freq(&self, sampling_freq: f64) -> StreamResult<()> {
        match self.config.lowpass_cutoff_hz {
            Some(cutoff) => checks::below_nyquist(COMPONENT, "lowpass_cutoff_hz", cutoff, sampling_freq),
            None => Ok(()),
        }
    }

    fn filter_batch(&self, times: &[f64], values: &[f64], sampling_freq: f64) -> StreamResult<FilteredBatch> {
        let filtered = match self.config.lowpass_cutoff_hz {
            Some(cutoff) => {
                butterworth_filter(values, self.config.lowpass_order, cutoff, sampling_freq, BandType::Lowpass)?
            }
            None => values.to_vec(),
        };
        let smoothed = savgol_filter(&filtered, self.config.smoothing_window, self.config.smoothing_poly_order)?;
        Ok(FilteredBatch::unmasked(times, smoothed))
    }

    fn extract_features(&self, _intervals: &[FeatureInterval<'_>], _sampling_freq: f64) -> Vec<f64> {
        Vec::new()
    }

    fn feature_names(&self) -> Vec<String> {
        Vec::new()
    }
}
