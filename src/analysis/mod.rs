// src/analysis/mod.rs
//! Windowed signal analysis
//!
//! Every analyzer keeps the raw samples of its channels, re-filters a bounded
//! window around the data finger each cycle and extracts features at a fixed
//! cadence over trailing windows of the samples the artifact mask kept.
//!
//! The shared machinery lives in [`AnalyzerCore`] and the provided
//! [`SignalAnalyzer::analyze_batch`]; variants only supply their filter stage
//! and feature sets.

pub mod eeg;
pub mod general;
pub mod gsr;
pub mod state;
pub mod temperature;

pub use state::{
    AnalyzerCore, AnalyzerPolicy, AnalyzerSettings, BatchGeometry, ChannelTrack, DerivedSizes, FeatureWindow,
    MaskIndex,
};
pub use eeg::EegAnalyzer;
pub use general::GeneralAnalyzer;
pub use gsr::GsrAnalyzer;
pub use temperature::TemperatureAnalyzer;

use std::fmt;
use std::ops::{Deref, DerefMut, Range};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use state::ChannelPlan;
use crate::config::EngineConfig;
use crate::error::{StreamError, StreamErrorBuilder, StreamResult};
use crate::processing::artifact::compact;
use crate::processing::FeatureCompiler;

/// Kind of physiological signal a channel carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Eeg,
    Gsr,
    #[serde(alias = "temp")]
    Temperature,
    General,
}

impl SignalType {
    pub const ALL: [SignalType; 4] = [SignalType::Eeg, SignalType::Gsr, SignalType::Temperature, SignalType::General];

    pub fn name(&self) -> &'static str {
        match self {
            SignalType::Eeg => "eeg",
            SignalType::Gsr => "gsr",
            SignalType::Temperature => "temperature",
            SignalType::General => "general",
        }
    }

    /// Problems in this analyzer's own section that do not need a sampling
    /// frequency; batch geometry and compiler settings are checked elsewhere
    pub fn static_config_problems(&self, config: &EngineConfig) -> Vec<String> {
        Analyzer::unchecked(*self, 1, config)
            .analyzer_problems()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eeg" => Ok(SignalType::Eeg),
            "gsr" => Ok(SignalType::Gsr),
            "temp" | "temperature" => Ok(SignalType::Temperature),
            "general" => Ok(SignalType::General),
            other => Err(format!("unknown signal type '{}'", other)),
        }
    }
}

/// Lifecycle of an analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerPhase {
    /// No samples buffered yet
    Uninitialized,
    /// Samples buffered but too few distinct timestamps to estimate fs
    SamplingFrequencyPending,
    Active,
}

/// Output of an analyzer's filter stage over one filter window
///
/// All vectors are aligned with the raw window. Values at positions the mask
/// rejects are never read.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredBatch {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    pub good_mask: Vec<bool>,
    /// Series each feature window reads from, in window order; empty means
    /// every window reads `values`
    pub components: Vec<Vec<f64>>,
}

impl FilteredBatch {
    pub fn new(times: &[f64], values: Vec<f64>, good_mask: Vec<bool>) -> Self {
        Self { times: times.to_vec(), values, good_mask, components: Vec::new() }
    }

    /// Batch where every sample is kept
    pub fn unmasked(times: &[f64], values: Vec<f64>) -> Self {
        let good_mask = vec![true; values.len()];
        Self::new(times, values, good_mask)
    }

    pub fn with_components(mut self, components: Vec<Vec<f64>>) -> Self {
        self.components = components;
        self
    }

    pub fn component(&self, window: usize) -> &[f64] {
        self.components.get(window).map_or(self.values.as_slice(), Vec::as_slice)
    }

    pub fn good_points(&self) -> usize {
        self.good_mask.iter().filter(|&&good| good).count()
    }

    fn check_shape(&self, expected: usize, component: &str) -> StreamResult<()> {
        let aligned = self.times.len() == expected
            && self.values.len() == expected
            && self.good_mask.len() == expected
            && self.components.iter().all(|series| series.len() == expected);
        if aligned {
            Ok(())
        } else {
            Err(StreamErrorBuilder::new(component, "filter_batch").consistency(format!(
                "filter output is not aligned with its {}-sample window (times {}, values {}, mask {})",
                expected,
                self.times.len(),
                self.values.len(),
                self.good_mask.len()
            )))
        }
    }
}

/// Kept samples of one feature window
#[derive(Debug, Clone, Copy)]
pub struct FeatureInterval<'a> {
    pub times: &'a [f64],
    pub values: &'a [f64],
}

/// What happened at one feature time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WindowOutcome {
    Extracted {
        feature_time: f64,
        last_analyzed_index: usize,
        interval_points: Vec<usize>,
    },
    /// At least one window kept too few samples; nothing was recorded
    Insufficient {
        feature_time: f64,
        last_analyzed_index: usize,
        interval_points: Vec<usize>,
        required_points: Vec<usize>,
    },
}

impl WindowOutcome {
    pub fn feature_time(&self) -> f64 {
        match self {
            WindowOutcome::Extracted { feature_time, .. } | WindowOutcome::Insufficient { feature_time, .. } => {
                *feature_time
            }
        }
    }

    pub fn interval_points(&self) -> &[usize] {
        match self {
            WindowOutcome::Extracted { interval_points, .. }
            | WindowOutcome::Insufficient { interval_points, .. } => interval_points,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, WindowOutcome::Extracted { .. })
    }
}

/// Per-channel slice of an [`AnalysisUpdate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelUpdate {
    pub channel: usize,
    /// Raw samples from the data finger to the end of the filter window
    pub raw_times: Vec<f64>,
    pub raw_values: Vec<f64>,
    /// Kept filtered samples over the same span
    pub filtered_times: Vec<f64>,
    pub filtered_values: Vec<f64>,
    /// Kept samples across the whole filter window
    pub retained_points: usize,
    pub outcomes: Vec<WindowOutcome>,
}

/// Everything one analysis cycle produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisUpdate {
    pub signal_type: SignalType,
    pub data_finger: usize,
    pub phase: AnalyzerPhase,
    pub sampling_freq: Option<f64>,
    pub channels: Vec<ChannelUpdate>,
}

impl AnalysisUpdate {
    fn new(signal_type: SignalType, data_finger: usize, phase: AnalyzerPhase) -> Self {
        Self { signal_type, data_finger, phase, sampling_freq: None, channels: Vec::new() }
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &WindowOutcome> {
        self.channels.iter().flat_map(|channel| channel.outcomes.iter())
    }

    /// Feature records written by this cycle across all channels
    pub fn extracted_count(&self) -> usize {
        self.outcomes().filter(|outcome| outcome.is_extracted()).count()
    }
}

/// Contract every analyzer variant fulfils
pub trait SignalAnalyzer: Send {
    fn core(&self) -> &AnalyzerCore;

    fn core_mut(&mut self) -> &mut AnalyzerCore;

    /// Variant checks that do not depend on the sampling frequency
    fn validate_variant(&self) -> StreamResult<()>;

    /// Filter design checks against a known sampling frequency
    fn validate_for_sampling_freq(&self, sampling_freq: f64) -> StreamResult<()>;

    /// Filter one window of raw samples and mark the samples to keep
    fn filter_batch(&self, times: &[f64], values: &[f64], sampling_freq: f64) -> StreamResult<FilteredBatch>;

    /// Feature vector over one interval per feature window
    fn extract_features(&self, intervals: &[FeatureInterval<'_>], sampling_freq: f64) -> Vec<f64>;

    /// Slot names matching [`SignalAnalyzer::extract_features`]
    fn feature_names(&self) -> Vec<String>;

    /// Static checks, plus the frequency-dependent ones when `sampling_freq`
    /// is known
    fn validate_config(&self, sampling_freq: Option<f64>) -> StreamResult<()> {
        self.core().validate_static()?;
        self.validate_variant()?;
        if let Some(fs) = sampling_freq {
            self.validate_for_sampling_freq(fs)?;
            self.core().derive_sizes(fs)?;
        }
        Ok(())
    }

    /// Sizing and variant problems, each reported on its own
    fn analyzer_problems(&self) -> Vec<StreamError> {
        let mut problems: Vec<StreamError> = self.core().validate_policy().err().into_iter().collect();
        problems.extend(self.validate_variant().err());
        problems
    }

    fn signal_type(&self) -> SignalType {
        self.core().signal_type()
    }

    fn phase(&self) -> AnalyzerPhase {
        self.core().phase()
    }

    fn sampling_freq(&self) -> Option<f64> {
        self.core().sampling_freq()
    }

    fn channel_count(&self) -> usize {
        self.core().channel_count()
    }

    fn buffered_points(&self) -> usize {
        self.core().buffered_points()
    }

    fn compiler(&self, channel: usize) -> Option<&FeatureCompiler> {
        self.core().track(channel).map(|track| &track.compiler)
    }

    fn append_samples(&mut self, times: &[f64], channels: &[Vec<f64>]) -> StreamResult<()> {
        self.core_mut().append(times, channels)
    }

    fn reset(&mut self) {
        debug!(signal_type = self.signal_type().name(), "analyzer reset");
        self.core_mut().reset();
    }

    /// Run one analysis cycle with the data finger at `data_finger`
    ///
    /// Estimates the sampling frequency on first use, re-filters the window
    /// around the data finger and extracts features for every pending
    /// feature time inside it. Channel bookkeeping is only advanced once the
    /// whole window has been processed without error.
    fn analyze_batch(&mut self, data_finger: usize) -> StreamResult<AnalysisUpdate> {
        let signal_type = self.signal_type();
        let buffered = self.buffered_points();
        if data_finger > buffered {
            return Err(StreamErrorBuilder::new(signal_type.name(), "analyze_batch").consistency(format!(
                "data finger {} is past the {} buffered samples",
                data_finger, buffered
            )));
        }

        let sampling_freq = match self.sampling_freq() {
            Some(fs) => fs,
            None => match activate(self, data_finger)? {
                Some(fs) => fs,
                None => {
                    debug!(signal_type = signal_type.name(), buffered, "sampling frequency still pending");
                    return Ok(AnalysisUpdate::new(signal_type, data_finger, self.phase()));
                }
            },
        };

        let mut update = AnalysisUpdate::new(signal_type, data_finger, AnalyzerPhase::Active);
        update.sampling_freq = Some(sampling_freq);

        let window = self.core().filter_window(data_finger);
        if window.is_empty() {
            return Ok(update);
        }
        let analyzer: &Self = self;
        let plans = (0..analyzer.channel_count())
            .map(|channel| plan_channel(analyzer, channel, data_finger, window.clone(), sampling_freq))
            .collect::<StreamResult<Vec<_>>>()?;
        for (channel, plan) in plans.iter().enumerate() {
            self.core().check_plan(channel, plan)?;
        }
        for (channel, plan) in plans.into_iter().enumerate() {
            update.channels.push(self.core_mut().commit(channel, plan)?);
        }

        trace!(
            signal_type = signal_type.name(),
            data_finger,
            filter_start = window.start,
            filter_end = window.end,
            extracted = update.extracted_count(),
            "analysis cycle"
        );
        Ok(update)
    }
}

/// Estimate the sampling frequency and switch to the active phase
fn activate<A: SignalAnalyzer + ?Sized>(analyzer: &mut A, data_finger: usize) -> StreamResult<Option<f64>> {
    let start = analyzer.core().filter_window(data_finger).start;
    let Some(sampling_freq) = analyzer.core().estimate_sampling_freq(start) else {
        return Ok(None);
    };
    analyzer.validate_config(Some(sampling_freq))?;
    let sizes = analyzer.core().derive_sizes(sampling_freq)?;
    analyzer.core_mut().activate(sampling_freq, sizes, data_finger);
    Ok(Some(sampling_freq))
}

fn plan_channel<A: SignalAnalyzer + ?Sized>(
    analyzer: &A,
    channel: usize,
    data_finger: usize,
    window: Range<usize>,
    sampling_freq: f64,
) -> StreamResult<ChannelPlan> {
    let core = analyzer.core();
    let component = core.signal_type().name();
    let times = &core.times()[window.clone()];
    let values = &core.channel(channel)[window.clone()];

    let filtered = analyzer.filter_batch(times, values, sampling_freq)?;
    filtered.check_shape(window.len(), component)?;
    let index = MaskIndex::new(&filtered.good_mask, window.start);
    let kept_times = compact(&filtered.times, &filtered.good_mask);
    let kept_values = compact(&filtered.values, &filtered.good_mask);

    let visible = if data_finger < window.end {
        index.translate_span(data_finger, window.end - 1)?
    } else {
        kept_times.len()..kept_times.len()
    };
    let raw_offset = (data_finger - window.start).min(window.len());
    let mut plan = ChannelPlan {
        update: ChannelUpdate {
            channel,
            raw_times: times[raw_offset..].to_vec(),
            raw_values: values[raw_offset..].to_vec(),
            filtered_times: kept_times[visible.clone()].to_vec(),
            filtered_values: kept_values[visible].to_vec(),
            retained_points: index.retained(),
            outcomes: Vec::new(),
        },
        advanced: None,
        records: Vec::new(),
    };

    let (Some(sizes), Some(track)) = (core.derived(), core.track(channel)) else {
        return Ok(plan);
    };
    if !core.extracts_features() {
        return Ok(plan);
    }
    if data_finger > track.last_analyzed_index {
        return Err(StreamErrorBuilder::new(component, "analyze_batch").consistency(format!(
            "data finger {} overtook last analyzed index {} on channel {}",
            data_finger, track.last_analyzed_index, channel
        )));
    }

    let feature_windows = &core.policy().feature_windows;
    let kept_components: Vec<Vec<f64>> = (0..feature_windows.len())
        .map(|w| compact(filtered.component(w), &filtered.good_mask))
        .collect();

    let all_times = core.times();
    let mut last_analyzed = track.last_analyzed_index;
    let mut pointers = track.window_pointers.clone();
    let mut truncated = 0usize;
    while last_analyzed < window.end {
        let feature_time = all_times[last_analyzed];
        let mut spans = Vec::with_capacity(feature_windows.len());
        for (pointer, feature_window) in pointers.iter_mut().zip(feature_windows) {
            let cutoff = feature_time - feature_window.duration_s;
            while all_times[*pointer] < cutoff {
                *pointer += 1;
            }
            // Only reachable when the rate rose above the estimate
            if *pointer < window.start {
                truncated += 1;
            }
            spans.push(index.translate_span((*pointer).max(window.start), last_analyzed)?);
        }

        let interval_points: Vec<usize> = spans.iter().map(|span| span.len()).collect();
        let sufficient = interval_points.iter().zip(&sizes.min_points).all(|(have, need)| have > need);
        if sufficient {
            let intervals: Vec<FeatureInterval<'_>> = spans
                .iter()
                .zip(&kept_components)
                .map(|(span, series)| FeatureInterval { times: &kept_times[span.clone()], values: &series[span.clone()] })
                .collect();
            let features = analyzer.extract_features(&intervals, sampling_freq);
            plan.records.push((feature_time, features));
            plan.update.outcomes.push(WindowOutcome::Extracted {
                feature_time,
                last_analyzed_index: last_analyzed,
                interval_points,
            });
        } else {
            debug!(
                signal_type = component,
                channel,
                feature_time,
                ?interval_points,
                required = ?sizes.min_points,
                "skipping feature time with too few kept samples"
            );
            plan.update.outcomes.push(WindowOutcome::Insufficient {
                feature_time,
                last_analyzed_index: last_analyzed,
                interval_points,
                required_points: sizes.min_points.clone(),
            });
        }
        last_analyzed += sizes.cadence_points;
    }

    if truncated > 0 {
        warn!(
            signal_type = component,
            channel,
            truncated,
            filter_start = window.start,
            "feature windows reach past the buffered depth; sampling rate is above the estimate"
        );
    }

    plan.advanced = Some((last_analyzed, pointers));
    Ok(plan)
}

/// Closed set of analyzer variants
#[derive(Debug, Clone)]
pub enum Analyzer {
    Eeg(EegAnalyzer),
    Gsr(GsrAnalyzer),
    Temperature(TemperatureAnalyzer),
    General(GeneralAnalyzer),
}

impl Analyzer {
    /// Build and validate the analyzer for `signal_type`
    pub fn from_config(signal_type: SignalType, channel_count: usize, config: &EngineConfig) -> StreamResult<Self> {
        let analyzer = Self::unchecked(signal_type, channel_count, config);
        analyzer.validate_config(None)?;
        Ok(analyzer)
    }

    fn unchecked(signal_type: SignalType, channel_count: usize, config: &EngineConfig) -> Self {
        let settings = AnalyzerSettings::from_engine(config, channel_count);
        match signal_type {
            SignalType::Eeg => Analyzer::Eeg(EegAnalyzer::unchecked(config.eeg.clone(), settings)),
            SignalType::Gsr => Analyzer::Gsr(GsrAnalyzer::unchecked(config.gsr.clone(), settings)),
            SignalType::Temperature => {
                Analyzer::Temperature(TemperatureAnalyzer::unchecked(config.temperature.clone(), settings))
            }
            SignalType::General => Analyzer::General(GeneralAnalyzer::unchecked(config.general.clone(), settings)),
        }
    }
}

impl Deref for Analyzer {
    type Target = dyn SignalAnalyzer;

    fn deref(&self) -> &Self::Target {
        match self {
            Analyzer::Eeg(analyzer) => analyzer,
            Analyzer::Gsr(analyzer) => analyzer,
            Analyzer::Temperature(analyzer) => analyzer,
            Analyzer::General(analyzer) => analyzer,
        }
    }
}

impl DerefMut for Analyzer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Analyzer::Eeg(analyzer) => analyzer,
            Analyzer::Gsr(analyzer) => analyzer,
            Analyzer::Temperature(analyzer) => analyzer,
            Analyzer::General(analyzer) => analyzer,
        }
    }
}
