// src/acquisition/mod.rs
//! Sample sources feeding the stream orchestrator
//!
//! A source hands out multiplexed batches: one shared timestamp vector and
//! one value vector per channel, already converted to physical units.

pub mod simulation;

pub use simulation::{ArtifactConfig, SignalModel, SimulatedChannel, SimulatedSource, SimulationConfig};

use std::convert::Infallible;

use thiserror::Error;

use crate::error::{StreamErrorBuilder, StreamResult};
use crate::utils::conversion::{adc_to_voltage, ChannelUnits};

/// Transport failures reported by acquisition sources
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Source disconnected: {0}")]
    Disconnected(String),

    #[error("Malformed read: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Time-aligned samples for every channel of a source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBatch {
    pub times: Vec<f64>,
    pub channels: Vec<Vec<f64>>,
}

impl SampleBatch {
    pub fn new(times: Vec<f64>, channels: Vec<Vec<f64>>) -> StreamResult<Self> {
        if let Some(series) = channels.iter().find(|series| series.len() != times.len()) {
            return Err(StreamErrorBuilder::new("acquisition", "sample_batch").consistency(format!(
                "channel has {} samples for {} timestamps",
                series.len(),
                times.len()
            )));
        }
        Ok(Self { times, channels })
    }

    /// Batch from raw ADC counts, scaled to volts with `units`
    pub fn from_adc_counts(times: Vec<f64>, counts: Vec<Vec<f64>>, units: &ChannelUnits) -> StreamResult<Self> {
        if !units.is_valid() {
            return Err(StreamErrorBuilder::new("acquisition", "from_adc_counts")
                .configuration(format!("invalid channel units {:?}", units)));
        }
        let channels = counts
            .into_iter()
            .map(|series| series.into_iter().map(|count| adc_to_voltage(count, units)).collect())
            .collect();
        Self::new(times, channels)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Copy of samples `start..end`
    pub fn slice(&self, start: usize, end: usize) -> SampleBatch {
        let end = end.min(self.len());
        let start = start.min(end);
        SampleBatch {
            times: self.times[start..end].to_vec(),
            channels: self.channels.iter().map(|series| series[start..end].to_vec()).collect(),
        }
    }

    /// Values of the channels at `indices`, in that order
    pub fn select_channels(&self, indices: &[usize]) -> Vec<Vec<f64>> {
        indices.iter().map(|&index| self.channels[index].clone()).collect()
    }
}

/// Anything that produces sample batches
pub trait AcquisitionSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn channel_count(&self) -> usize;

    /// Scale of the front end behind this source
    fn units(&self) -> ChannelUnits {
        ChannelUnits::default()
    }

    /// Next batch, `Ok(None)` once the source is exhausted
    fn read_batch(&mut self) -> Result<Option<SampleBatch>, Self::Error>;
}

/// Replays an in-memory recording in fixed-size chunks
#[derive(Debug, Clone)]
pub struct RecordedSource {
    recording: SampleBatch,
    chunk_size: usize,
    position: usize,
}

impl RecordedSource {
    pub fn new(recording: SampleBatch, chunk_size: usize) -> Self {
        Self { recording, chunk_size: chunk_size.max(1), position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.recording.len() - self.position
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl AcquisitionSource for RecordedSource {
    type Error = Infallible;

    fn channel_count(&self) -> usize {
        self.recording.channel_count()
    }

    fn read_batch(&mut self) -> Result<Option<SampleBatch>, Self::Error> {
        if self.position >= self.recording.len() {
            return Ok(None);
        }
        let end = (self.position + self.chunk_size).min(self.recording.len());
        let chunk = self.recording.slice(self.position, end);
        self.position = end;
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(n: usize) -> SampleBatch {
        let times = (0..n).map(|i| i as f64).collect();
        SampleBatch::new(times, vec![vec![1.0; n], vec![2.0; n]]).unwrap()
    }

    #[test]
    fn test_sample_batch_rejects_ragged_channels() {
        let err = SampleBatch::new(vec![0.0, 1.0], vec![vec![1.0]]).unwrap_err();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_from_adc_counts_scales_to_volts() {
        let batch = SampleBatch::from_adc_counts(vec![0.0, 0.1], vec![vec![0.0, 1023.0]], &ChannelUnits::default())
            .unwrap();
        assert_eq!(batch.channels[0][0], 0.0);
        assert!((batch.channels[0][1] - 3.3).abs() < 1e-12);

        let units = ChannelUnits { max_voltage: 0.0, adc_resolution: 1023.0 };
        assert!(SampleBatch::from_adc_counts(vec![0.0], vec![vec![1.0]], &units).is_err());
    }

    #[test]
    fn test_recorded_source_chunks() {
        let mut source = RecordedSource::new(recording(25), 10);
        assert_eq!(source.channel_count(), 2);
        let sizes: Vec<usize> = std::iter::from_fn(|| source.read_batch().unwrap()).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(source.remaining(), 0);
        source.rewind();
        assert_eq!(source.read_batch().unwrap().unwrap().times[0], 0.0);
    }

    #[test]
    fn test_select_channels_reorders() {
        let batch = recording(3);
        let selected = batch.select_channels(&[1, 0]);
        assert_eq!(selected[0], vec![2.0; 3]);
        assert_eq!(selected[1], vec![1.0; 3]);
    }
}
