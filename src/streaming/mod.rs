// src/streaming/mod.rs
//! Stream orchestration
//!
//! The orchestrator owns one analyzer per signal type, routes every incoming
//! channel to its analyzer and drives the shared data finger: whenever at
//! least one full batch lies ahead of it, every analyzer runs a cycle and the
//! finger advances by the configured stride.

pub mod metrics;
pub mod sinks;

pub use metrics::StreamMetrics;
pub use sinks::{
    FeatureReport, FeatureSink, JsonLinesSink, SessionMetadata, UpdateLog, VisualizationSink,
};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::acquisition::{AcquisitionSource, RecordedSource, SampleBatch};
use crate::analysis::{Analyzer, SignalType};
use crate::config::{ConfigError, EngineConfig};
use crate::error::{StreamError, StreamErrorBuilder, StreamResult};
use crate::utils::time::{SystemTimeProvider, TimeProvider};

/// Channels handled by one analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    pub signal_type: SignalType,
    /// Channel indices in acquisition order
    pub channels: Vec<usize>,
}

/// Partition of acquisition channels over analyzers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAssignment {
    groups: Vec<ChannelGroup>,
    channel_count: usize,
}

impl ChannelAssignment {
    /// Every channel index below `channel_count` must appear in exactly one
    /// group, and each signal type may own at most one group
    ///
    /// A group without channels or a repeated signal type is a configuration
    /// error; a set of groups that is not a partition is a consistency error.
    pub fn new(groups: Vec<ChannelGroup>, channel_count: usize) -> StreamResult<Self> {
        let builder = || StreamErrorBuilder::new("channel_assignment", "validate_config");
        let mut owner = vec![None; channel_count];
        for (index, group) in groups.iter().enumerate() {
            if group.channels.is_empty() {
                return Err(builder().configuration(format!("{} analyzer has no channels", group.signal_type)));
            }
            if groups[..index].iter().any(|other| other.signal_type == group.signal_type) {
                return Err(builder().configuration(format!("{} is assigned twice", group.signal_type)));
            }
            for &channel in &group.channels {
                match owner.get_mut(channel) {
                    None => {
                        return Err(builder().consistency(format!(
                            "channel {} out of range for {} channels",
                            channel, channel_count
                        )))
                    }
                    Some(Some(previous)) => {
                        return Err(builder().consistency(format!(
                            "channel {} claimed by both {} and {}",
                            channel, previous, group.signal_type
                        )))
                    }
                    Some(slot) => *slot = Some(group.signal_type),
                }
            }
        }
        if let Some(orphan) = owner.iter().position(Option::is_none) {
            return Err(builder().consistency(format!("channel {} has no analyzer", orphan)));
        }
        Ok(Self { groups, channel_count })
    }

    /// Group channels by signal type in order of first appearance
    pub fn from_streaming_order(order: &[SignalType]) -> StreamResult<Self> {
        let mut groups: Vec<ChannelGroup> = Vec::new();
        for (channel, &signal_type) in order.iter().enumerate() {
            match groups.iter_mut().find(|group| group.signal_type == signal_type) {
                Some(group) => group.channels.push(channel),
                None => groups.push(ChannelGroup { signal_type, channels: vec![channel] }),
            }
        }
        Self::new(groups, order.len())
    }

    pub fn groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }
}

/// When live streaming stops on its own
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StreamLimit {
    /// Seconds of signal time between the first and newest sample
    pub max_duration_s: Option<f64>,
    pub max_samples: Option<usize>,
}

impl StreamLimit {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn seconds(seconds: f64) -> Self {
        Self { max_duration_s: Some(seconds), max_samples: None }
    }

    fn reached(&self, elapsed_s: f64, samples: usize) -> bool {
        self.max_duration_s.is_some_and(|limit| elapsed_s >= limit)
            || self.max_samples.is_some_and(|limit| samples >= limit)
    }
}

/// Drives every analyzer over a shared data finger
pub struct StreamOrchestrator {
    config: EngineConfig,
    assignment: ChannelAssignment,
    analyzers: Vec<Analyzer>,
    data_finger: usize,
    buffered: usize,
    first_time: Option<f64>,
    last_time: Option<f64>,
    sinks: Vec<Box<dyn VisualizationSink>>,
    metrics: StreamMetrics,
    clock: Arc<dyn TimeProvider>,
}

impl StreamOrchestrator {
    pub fn new(config: EngineConfig) -> StreamResult<Self> {
        config
            .validate_consistency()
            .map_err(|errors| StreamError::from(ConfigError::ValidationError(errors)))?;
        let assignment = ChannelAssignment::from_streaming_order(&config.stream.streaming_order)?;
        let analyzers = assignment
            .groups()
            .iter()
            .map(|group| Analyzer::from_config(group.signal_type, group.channels.len(), &config))
            .collect::<StreamResult<Vec<_>>>()?;

        Ok(Self {
            config,
            assignment,
            analyzers,
            data_finger: 0,
            buffered: 0,
            first_time: None,
            last_time: None,
            sinks: Vec::new(),
            metrics: StreamMetrics::default(),
            clock: Arc::new(SystemTimeProvider),
        })
    }

    pub fn with_time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn VisualizationSink>) {
        self.sinks.push(sink);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn assignment(&self) -> &ChannelAssignment {
        &self.assignment
    }

    pub fn analyzers(&self) -> &[Analyzer] {
        &self.analyzers
    }

    pub fn analyzer(&self, signal_type: SignalType) -> Option<&Analyzer> {
        self.analyzers.iter().find(|analyzer| analyzer.signal_type() == signal_type)
    }

    pub fn data_finger(&self) -> usize {
        self.data_finger
    }

    pub fn buffered_points(&self) -> usize {
        self.buffered
    }

    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }

    /// Route a multiplexed batch to the analyzers
    ///
    /// The batch is checked up front so either every analyzer receives it or
    /// none does.
    pub fn ingest(&mut self, batch: &SampleBatch) -> StreamResult<()> {
        let builder = || StreamErrorBuilder::new("orchestrator", "ingest");
        if batch.channel_count() != self.assignment.channel_count() {
            return Err(builder().consistency(format!(
                "batch has {} channels, streaming order names {}",
                batch.channel_count(),
                self.assignment.channel_count()
            )));
        }
        let mut previous = self.last_time;
        for &time in &batch.times {
            if !time.is_finite() || previous.is_some_and(|p| time <= p) {
                return Err(builder().consistency(format!("timestamp {} does not follow {:?}", time, previous)));
            }
            previous = Some(time);
        }
        if batch.is_empty() {
            return Ok(());
        }

        for (analyzer, group) in self.analyzers.iter_mut().zip(self.assignment.groups()) {
            analyzer.append_samples(&batch.times, &batch.select_channels(&group.channels))?;
        }
        self.buffered += batch.len();
        self.first_time = self.first_time.or(batch.times.first().copied());
        self.last_time = batch.times.last().copied();
        self.metrics.record_ingest(batch.len());
        Ok(())
    }

    /// Run cycles while a full batch lies ahead of the data finger
    pub fn pump(&mut self) -> StreamResult<usize> {
        let batch = self.config.stream.points_per_batch;
        let mut cycles = 0;
        while self.buffered - self.data_finger >= batch {
            self.run_cycle()?;
            self.data_finger += self.config.stream.move_data_finger;
            cycles += 1;
        }
        Ok(cycles)
    }

    /// Final cycle over whatever remains past the data finger
    pub fn finish(&mut self) -> StreamResult<()> {
        if self.buffered > 0 {
            self.run_cycle()?;
        }
        info!(
            cycles = self.metrics.cycles,
            samples = self.metrics.samples_ingested,
            features = self.metrics.features_extracted,
            overruns = self.metrics.realtime_overruns,
            "stream finished"
        );
        Ok(())
    }

    fn run_cycle(&mut self) -> StreamResult<()> {
        let started = self.clock.now_nanos();
        let mut extracted = 0;
        for analyzer in &mut self.analyzers {
            let update = analyzer.analyze_batch(self.data_finger)?;
            extracted += update.extracted_count();
            for sink in &mut self.sinks {
                sink.on_update(&update)?;
            }
        }

        let elapsed = self.clock.elapsed_secs(started);
        let budget = self.cycle_budget_secs();
        if self.metrics.record_cycle(elapsed, budget, extracted) {
            warn!(
                data_finger = self.data_finger,
                elapsed_secs = elapsed,
                budget_secs = budget.unwrap_or_default(),
                "analysis cycle slower than real time"
            );
        }
        Ok(())
    }

    /// Signal time the data finger stride spans
    fn cycle_budget_secs(&self) -> Option<f64> {
        self.analyzers
            .iter()
            .find_map(|analyzer| analyzer.sampling_freq())
            .map(|fs| self.config.stream.move_data_finger as f64 / fs)
    }

    /// Pull batches from `source` until it is exhausted or `limit` is hit,
    /// analyzing as data arrives, then run the final cycle
    pub fn stream_from<S: AcquisitionSource>(&mut self, source: &mut S, limit: StreamLimit) -> StreamResult<StreamMetrics> {
        if source.channel_count() != self.assignment.channel_count() {
            return Err(StreamErrorBuilder::new("orchestrator", "stream_from").configuration(format!(
                "source has {} channels, streaming order names {}",
                source.channel_count(),
                self.assignment.channel_count()
            )));
        }
        self.reset();
        info!(channels = source.channel_count(), ?limit, "stream started");

        loop {
            let batch = match source.read_batch() {
                Ok(Some(batch)) => batch,
                Ok(None) => {
                    debug!("source exhausted");
                    break;
                }
                Err(err) => return Err(StreamErrorBuilder::new("orchestrator", "read_batch").acquisition(err)),
            };
            self.ingest(&batch)?;
            self.pump()?;

            let elapsed = match (self.first_time, self.last_time) {
                (Some(first), Some(last)) => last - first,
                _ => 0.0,
            };
            if limit.reached(elapsed, self.buffered) {
                debug!(elapsed, samples = self.buffered, "stream limit reached");
                break;
            }
        }

        self.finish()?;
        Ok(self.metrics.clone())
    }

    /// Replay a stored recording as if it were streamed live, one data
    /// finger stride at a time
    pub fn replay_recording(&mut self, times: &[f64], channels: &[Vec<f64>]) -> StreamResult<StreamMetrics> {
        let recording = SampleBatch::new(times.to_vec(), channels.to_vec())?;
        let mut source = RecordedSource::new(recording, self.config.stream.move_data_finger);
        self.stream_from(&mut source, StreamLimit::unbounded())
    }

    /// Clear every buffer, pointer and feature record
    pub fn reset(&mut self) {
        for analyzer in &mut self.analyzers {
            analyzer.reset();
        }
        self.data_finger = 0;
        self.buffered = 0;
        self.first_time = None;
        self.last_time = None;
        self.metrics.reset();
    }

    /// Feature records of every feature-producing analyzer channel
    pub fn feature_reports(&self) -> Vec<FeatureReport> {
        let mut reports = Vec::new();
        for (analyzer, group) in self.analyzers.iter().zip(self.assignment.groups()) {
            let feature_names = analyzer.feature_names();
            if feature_names.is_empty() {
                continue;
            }
            for (local, &channel) in group.channels.iter().enumerate() {
                if let Some(compiler) = analyzer.compiler(local) {
                    reports.push(FeatureReport {
                        signal_type: group.signal_type,
                        channel,
                        feature_names: feature_names.clone(),
                        times: compiler.times().to_vec(),
                        raw: compiler.raw().to_vec(),
                        compiled: compiler.compiled().to_vec(),
                    });
                }
            }
        }
        reports
    }

    /// Write every feature report to `sink`; returns the records written
    pub fn export_features(&self, sink: &mut dyn FeatureSink, metadata: &SessionMetadata) -> StreamResult<usize> {
        let mut written = 0;
        for report in self.feature_reports() {
            written += sink.write_report(&report, metadata)?;
        }
        sink.flush()?;
        info!(records = written, experiment = %metadata.experiment, "features exported");
        Ok(written)
    }
}
