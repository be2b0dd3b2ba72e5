// src/analysis/state.rs
//! Buffers and index bookkeeping shared by every analyzer

use std::ops::Range;

use tracing::info;

use crate::analysis::{AnalyzerPhase, ChannelUpdate, SignalType};
use crate::config::analyzer_config::{buffer_depth, checks, seconds_to_points};
use crate::config::{CompilerConfig, EngineConfig, StreamSettings};
use crate::error::{StreamErrorBuilder, StreamResult};
use crate::processing::FeatureCompiler;

/// Samples re-analyzed per cycle and the data finger stride
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchGeometry {
    pub points_per_batch: usize,
    pub move_data_finger: usize,
}

impl BatchGeometry {
    pub fn new(points_per_batch: usize, move_data_finger: usize) -> Self {
        Self { points_per_batch, move_data_finger }
    }

    pub fn validate(&self, component: &str) -> StreamResult<()> {
        if self.move_data_finger == 0 || self.move_data_finger >= self.points_per_batch {
            return Err(StreamErrorBuilder::new(component, "validate_config").configuration(format!(
                "move_data_finger ({}) must be positive and smaller than points_per_batch ({})",
                self.move_data_finger, self.points_per_batch
            )));
        }
        Ok(())
    }
}

impl From<&StreamSettings> for BatchGeometry {
    fn from(settings: &StreamSettings) -> Self {
        Self::new(settings.points_per_batch, settings.move_data_finger)
    }
}

/// Construction parameters common to all analyzer variants
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSettings {
    pub channel_count: usize,
    pub geometry: BatchGeometry,
    pub collect_features: bool,
    pub trim_proportion: f64,
}

impl AnalyzerSettings {
    pub fn new(channel_count: usize, geometry: BatchGeometry) -> Self {
        Self {
            channel_count,
            geometry,
            collect_features: true,
            trim_proportion: CompilerConfig::default().trim_proportion,
        }
    }

    pub fn from_engine(config: &EngineConfig, channel_count: usize) -> Self {
        Self {
            channel_count,
            geometry: BatchGeometry::from(&config.stream),
            collect_features: config.stream.collect_features,
            trim_proportion: config.compiler.trim_proportion,
        }
    }

    pub fn without_features(mut self) -> Self {
        self.collect_features = false;
        self
    }
}

/// A trailing window features are computed over
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    pub name: String,
    pub duration_s: f64,
    /// Share of `duration_s * fs` samples that must survive the mask
    pub min_points_fraction: f64,
}

impl FeatureWindow {
    pub fn new(name: &str, duration_s: f64, min_points_fraction: f64) -> Self {
        Self { name: name.to_string(), duration_s, min_points_fraction }
    }
}

/// Sizing rules an analyzer variant hands to its core
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerPolicy {
    pub buffer_depth_points: usize,
    pub buffer_depth_s: f64,
    pub feature_windows: Vec<FeatureWindow>,
    pub feature_cadence_s: f64,
    pub average_window_s: Option<f64>,
}

impl AnalyzerPolicy {
    /// Policy for an analyzer that never extracts features
    pub fn filter_only(buffer_depth_points: usize, buffer_depth_s: f64) -> Self {
        Self {
            buffer_depth_points,
            buffer_depth_s,
            feature_windows: Vec::new(),
            feature_cadence_s: 0.0,
            average_window_s: None,
        }
    }

    fn validate(&self, component: &str) -> StreamResult<()> {
        checks::non_negative(component, "buffer_depth_s", self.buffer_depth_s)?;
        for window in &self.feature_windows {
            checks::positive(component, &window.name, window.duration_s)?;
            checks::fraction(component, &format!("{} min_points_fraction", window.name), window.min_points_fraction)?;
        }
        if !self.feature_windows.is_empty() {
            checks::positive(component, "feature_cadence_s", self.feature_cadence_s)?;
        }
        checks::average_window(component, self.average_window_s)
    }
}

/// Sample counts fixed once the sampling frequency is known
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSizes {
    pub buffer_depth: usize,
    pub cadence_points: usize,
    /// Per window: an interval must hold strictly more samples than this
    pub min_points: Vec<usize>,
    pub initial_last_analyzed: usize,
}

/// Feature bookkeeping for one channel
#[derive(Debug, Clone)]
pub struct ChannelTrack {
    pub last_analyzed_index: usize,
    /// Raw index of the oldest sample inside each feature window
    pub window_pointers: Vec<usize>,
    pub compiler: FeatureCompiler,
}

impl ChannelTrack {
    fn new(window_count: usize, average_window: Option<f64>, trim_proportion: f64) -> Self {
        Self {
            last_analyzed_index: 0,
            window_pointers: vec![0; window_count],
            compiler: FeatureCompiler::new(average_window, trim_proportion),
        }
    }
}

/// Cumulative good-sample counts over one filter window
///
/// Maps raw buffer indices onto positions in the arrays that keep only the
/// samples the mask let through.
#[derive(Debug, Clone)]
pub struct MaskIndex {
    filter_start: usize,
    kept_before: Vec<usize>,
}

impl MaskIndex {
    pub fn new(good_mask: &[bool], filter_start: usize) -> Self {
        let mut kept_before = Vec::with_capacity(good_mask.len() + 1);
        let mut kept = 0;
        kept_before.push(0);
        for &good in good_mask {
            kept += usize::from(good);
            kept_before.push(kept);
        }
        Self { filter_start, kept_before }
    }

    pub fn filter_start(&self) -> usize {
        self.filter_start
    }

    /// Samples of the filter window that survived the mask
    pub fn retained(&self) -> usize {
        self.kept_before[self.kept_before.len() - 1]
    }

    /// Compacted range covering the raw indices `first..=last`
    pub fn translate_span(&self, first: usize, last: usize) -> StreamResult<Range<usize>> {
        let window_len = self.kept_before.len() - 1;
        if first < self.filter_start || last < first || last - self.filter_start >= window_len {
            return Err(StreamErrorBuilder::new("mask_index", "translate_span").consistency(format!(
                "raw span {}..={} lies outside filter window {}..{}",
                first,
                last,
                self.filter_start,
                self.filter_start + window_len
            )));
        }
        let start = self.kept_before[first - self.filter_start];
        let end = self.kept_before[last + 1 - self.filter_start];
        Ok(start..end)
    }
}

/// Result of one channel's filter and extraction pass, applied atomically
#[derive(Debug)]
pub(crate) struct ChannelPlan {
    pub update: ChannelUpdate,
    pub advanced: Option<(usize, Vec<usize>)>,
    pub records: Vec<(f64, Vec<f64>)>,
}

/// Raw buffers, sampling frequency and per-channel feature state
#[derive(Debug, Clone)]
pub struct AnalyzerCore {
    signal_type: SignalType,
    settings: AnalyzerSettings,
    policy: AnalyzerPolicy,
    times: Vec<f64>,
    channels: Vec<Vec<f64>>,
    sampling_freq: Option<f64>,
    phase: AnalyzerPhase,
    derived: Option<DerivedSizes>,
    tracks: Vec<ChannelTrack>,
}

impl AnalyzerCore {
    pub fn new(signal_type: SignalType, settings: AnalyzerSettings, policy: AnalyzerPolicy) -> Self {
        let window_count = policy.feature_windows.len();
        let tracks = (0..settings.channel_count)
            .map(|_| ChannelTrack::new(window_count, policy.average_window_s, settings.trim_proportion))
            .collect();
        Self {
            signal_type,
            channels: vec![Vec::new(); settings.channel_count],
            settings,
            policy,
            times: Vec::new(),
            sampling_freq: None,
            phase: AnalyzerPhase::Uninitialized,
            derived: None,
            tracks,
        }
    }

    pub fn signal_type(&self) -> SignalType {
        self.signal_type
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn policy(&self) -> &AnalyzerPolicy {
        &self.policy
    }

    pub fn phase(&self) -> AnalyzerPhase {
        self.phase
    }

    pub fn sampling_freq(&self) -> Option<f64> {
        self.sampling_freq
    }

    pub fn derived(&self) -> Option<&DerivedSizes> {
        self.derived.as_ref()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn channel(&self, index: usize) -> &[f64] {
        &self.channels[index]
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn buffered_points(&self) -> usize {
        self.times.len()
    }

    pub fn track(&self, channel: usize) -> Option<&ChannelTrack> {
        self.tracks.get(channel)
    }

    /// Whether the extraction loop runs at all
    pub fn extracts_features(&self) -> bool {
        self.settings.collect_features && !self.policy.feature_windows.is_empty()
    }

    pub(crate) fn validate_static(&self) -> StreamResult<()> {
        let component = self.signal_type.name();
        if self.settings.channel_count == 0 {
            return Err(StreamErrorBuilder::new(component, "validate_config")
                .configuration("an analyzer needs at least one channel"));
        }
        self.settings.geometry.validate(component)?;
        CompilerConfig { trim_proportion: self.settings.trim_proportion }.validate()?;
        self.validate_policy()
    }

    pub(crate) fn validate_policy(&self) -> StreamResult<()> {
        self.policy.validate(self.signal_type.name())
    }

    /// Append time-aligned samples for every channel of this analyzer
    pub(crate) fn append(&mut self, times: &[f64], channels: &[Vec<f64>]) -> StreamResult<()> {
        let builder = || StreamErrorBuilder::new(self.signal_type.name(), "append_samples");
        if channels.len() != self.channels.len() {
            return Err(builder().consistency(format!(
                "got {} channel series, analyzer owns {}",
                channels.len(),
                self.channels.len()
            )));
        }
        if let Some(series) = channels.iter().find(|series| series.len() != times.len()) {
            return Err(builder().consistency(format!(
                "channel series has {} samples for {} timestamps",
                series.len(),
                times.len()
            )));
        }
        let mut previous = self.times.last().copied();
        for &time in times {
            if !time.is_finite() || previous.is_some_and(|p| time <= p) {
                return Err(builder().consistency(format!(
                    "timestamp {} does not follow {:?}",
                    time, previous
                )));
            }
            previous = Some(time);
        }

        self.times.extend_from_slice(times);
        for (buffer, series) in self.channels.iter_mut().zip(channels) {
            buffer.extend_from_slice(series);
        }
        if self.phase == AnalyzerPhase::Uninitialized && !self.times.is_empty() {
            self.phase = AnalyzerPhase::SamplingFrequencyPending;
        }
        Ok(())
    }

    /// Sample count over elapsed time from `start` to the newest sample
    pub(crate) fn estimate_sampling_freq(&self, start: usize) -> Option<f64> {
        let times = self.times.get(start..)?;
        let (first, last) = (times.first()?, times.last()?);
        let elapsed = last - first;
        if times.len() < 2 || elapsed <= 0.0 {
            return None;
        }
        Some(times.len() as f64 / elapsed)
    }

    pub(crate) fn derive_sizes(&self, sampling_freq: f64) -> StreamResult<DerivedSizes> {
        let component = self.signal_type.name();
        let depth = buffer_depth(self.policy.buffer_depth_points, self.policy.buffer_depth_s, sampling_freq);
        let geometry = self.settings.geometry;
        let retained = depth + geometry.points_per_batch - geometry.move_data_finger;

        let mut min_points = Vec::with_capacity(self.policy.feature_windows.len());
        let mut longest = 0;
        for window in &self.policy.feature_windows {
            let points = seconds_to_points(window.duration_s, sampling_freq);
            if self.settings.collect_features {
                checks::window_fits_buffer(component, &window.name, points, retained)?;
            }
            min_points.push(seconds_to_points(window.duration_s * window.min_points_fraction, sampling_freq));
            longest = longest.max(points);
        }

        Ok(DerivedSizes {
            buffer_depth: depth,
            cadence_points: seconds_to_points(self.policy.feature_cadence_s, sampling_freq).max(1),
            min_points,
            initial_last_analyzed: longest,
        })
    }

    pub(crate) fn activate(&mut self, sampling_freq: f64, sizes: DerivedSizes, data_finger: usize) {
        info!(
            signal_type = self.signal_type.name(),
            sampling_freq,
            buffer_depth = sizes.buffer_depth,
            "sampling frequency set"
        );
        let first_analyzed = sizes.initial_last_analyzed.max(data_finger);
        for track in &mut self.tracks {
            track.last_analyzed_index = first_analyzed;
            track.window_pointers.iter_mut().for_each(|pointer| *pointer = 0);
        }
        self.sampling_freq = Some(sampling_freq);
        self.derived = Some(sizes);
        self.phase = AnalyzerPhase::Active;
    }

    /// Raw index range re-filtered for a cycle at `data_finger`
    pub fn filter_window(&self, data_finger: usize) -> Range<usize> {
        let depth = self
            .derived
            .as_ref()
            .map_or(self.policy.buffer_depth_points, |sizes| sizes.buffer_depth);
        let start = data_finger.saturating_sub(depth);
        let end = (data_finger + self.settings.geometry.points_per_batch).min(self.times.len());
        start..end.max(start)
    }

    /// Fails exactly when `commit` of the same plan would
    pub(crate) fn check_plan(&self, channel: usize, plan: &ChannelPlan) -> StreamResult<()> {
        let track = self.tracks.get(channel).ok_or_else(|| {
            StreamErrorBuilder::new(self.signal_type.name(), "commit")
                .consistency(format!("no channel {} in a {}-channel analyzer", channel, self.tracks.len()))
        })?;
        track.compiler.check(&plan.records)
    }

    /// Apply a checked plan; on error the track is left as it was
    pub(crate) fn commit(&mut self, channel: usize, plan: ChannelPlan) -> StreamResult<ChannelUpdate> {
        self.check_plan(channel, &plan)?;
        let ChannelPlan { update, advanced, records } = plan;
        if let Some((last_analyzed, pointers)) = advanced {
            let track = &mut self.tracks[channel];
            for (time, features) in records {
                track.compiler.push(time, features)?;
            }
            track.last_analyzed_index = last_analyzed;
            track.window_pointers = pointers;
        }
        Ok(update)
    }

    /// Back to an empty, uninitialized analyzer with the same configuration
    pub fn reset(&mut self) {
        self.times.clear();
        self.channels.iter_mut().for_each(Vec::clear);
        self.sampling_freq = None;
        self.derived = None;
        self.phase = AnalyzerPhase::Uninitialized;
        for track in &mut self.tracks {
            track.last_analyzed_index = 0;
            track.window_pointers.iter_mut().for_each(|pointer| *pointer = 0);
            track.compiler.reset();
        }
    }
}
