// src/acquisition/simulation.rs
//! Seeded synthetic biosignal source
//!
//! Each channel is a deterministic waveform plus uniform noise, with optional
//! artifact segments that start at random and add large erratic deflections
//! for a fixed duration.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::acquisition::{AcquisitionError, AcquisitionSource, SampleBatch};
use crate::error::{StreamErrorBuilder, StreamResult};

/// Clean waveform of a simulated channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalModel {
    Constant { level: f64 },
    Sine { offset: f64, amplitude: f64, frequency_hz: f64 },
    Drift { start: f64, rate_per_s: f64 },
}

impl SignalModel {
    pub fn value_at(&self, time: f64) -> f64 {
        match *self {
            SignalModel::Constant { level } => level,
            SignalModel::Sine { offset, amplitude, frequency_hz } => {
                offset + amplitude * (2.0 * PI * frequency_hz * time).sin()
            }
            SignalModel::Drift { start, rate_per_s } => start + rate_per_s * time,
        }
    }
}

/// Random artifact segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Expected segment starts per second of signal
    pub rate_per_s: f64,
    pub duration_s: f64,
    pub amplitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedChannel {
    pub model: SignalModel,
    pub noise_amplitude: f64,
    pub artifacts: Option<ArtifactConfig>,
}

impl SimulatedChannel {
    pub fn new(model: SignalModel, noise_amplitude: f64) -> Self {
        Self { model, noise_amplitude, artifacts: None }
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactConfig) -> Self {
        self.artifacts = Some(artifacts);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub sampling_freq: f64,
    /// Samples handed out per read
    pub chunk_size: usize,
    /// Total signal length; `None` streams forever
    pub duration_s: Option<f64>,
    pub start_time: f64,
    pub seed: u64,
    pub channels: Vec<SimulatedChannel>,
}

impl SimulationConfig {
    pub fn new(sampling_freq: f64, channels: Vec<SimulatedChannel>) -> Self {
        Self { sampling_freq, chunk_size: 100, duration_s: None, start_time: 0.0, seed: 0, channels }
    }

    fn validate(&self) -> StreamResult<()> {
        let builder = || StreamErrorBuilder::new("simulation", "validate_config");
        if !(self.sampling_freq.is_finite() && self.sampling_freq > 0.0) {
            return Err(builder().configuration(format!("sampling_freq must be positive, got {}", self.sampling_freq)));
        }
        if self.chunk_size == 0 {
            return Err(builder().configuration("chunk_size must be positive"));
        }
        if self.channels.is_empty() {
            return Err(builder().configuration("at least one channel is required"));
        }
        Ok(())
    }
}

/// Deterministic source for demos and tests
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    config: SimulationConfig,
    rng: StdRng,
    sample_index: u64,
    total_samples: Option<u64>,
    artifact_remaining: Vec<usize>,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig) -> StreamResult<Self> {
        config.validate()?;
        let total_samples = config.duration_s.map(|seconds| (seconds * config.sampling_freq).floor().max(0.0) as u64);
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            artifact_remaining: vec![0; config.channels.len()],
            sample_index: 0,
            total_samples,
            config,
        })
    }

    pub fn samples_emitted(&self) -> u64 {
        self.sample_index
    }

    fn sample(&mut self, channel: usize, time: f64) -> f64 {
        let channel_spec = &self.config.channels[channel];
        let mut value = channel_spec.model.value_at(time);
        if channel_spec.noise_amplitude > 0.0 {
            value += channel_spec.noise_amplitude * self.rng.gen_range(-1.0..=1.0);
        }

        if let Some(artifacts) = &channel_spec.artifacts {
            if self.artifact_remaining[channel] == 0
                && self.rng.gen::<f64>() < artifacts.rate_per_s / self.config.sampling_freq
            {
                self.artifact_remaining[channel] = (artifacts.duration_s * self.config.sampling_freq).ceil() as usize;
            }
            if self.artifact_remaining[channel] > 0 {
                self.artifact_remaining[channel] -= 1;
                value += artifacts.amplitude * self.rng.gen_range(-1.0..=1.0);
            }
        }
        value
    }
}

impl AcquisitionSource for SimulatedSource {
    type Error = AcquisitionError;

    fn channel_count(&self) -> usize {
        self.config.channels.len()
    }

    fn read_batch(&mut self) -> Result<Option<SampleBatch>, Self::Error> {
        let remaining = self.total_samples.map_or(u64::MAX, |total| total.saturating_sub(self.sample_index));
        let count = (self.config.chunk_size as u64).min(remaining) as usize;
        if count == 0 {
            return Ok(None);
        }

        let mut times = Vec::with_capacity(count);
        let mut channels = vec![Vec::with_capacity(count); self.config.channels.len()];
        for _ in 0..count {
            let time = self.config.start_time + self.sample_index as f64 / self.config.sampling_freq;
            for (channel, series) in channels.iter_mut().enumerate() {
                series.push(self.sample(channel, time));
            }
            times.push(time);
            self.sample_index += 1;
        }

        SampleBatch::new(times, channels)
            .map(Some)
            .map_err(|err| AcquisitionError::Malformed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> SimulationConfig {
        let channel = SimulatedChannel::new(SignalModel::Sine { offset: 1.65, amplitude: 0.2, frequency_hz: 10.0 }, 0.01);
        SimulationConfig { duration_s: Some(2.0), seed, ..SimulationConfig::new(250.0, vec![channel]) }
    }

    #[test]
    fn test_duration_bounds_output() {
        let mut source = SimulatedSource::new(config(1)).unwrap();
        let mut total = 0;
        while let Some(batch) = source.read_batch().unwrap() {
            assert!(batch.len() <= 100);
            total += batch.len();
        }
        assert_eq!(total, 500);
        assert_eq!(source.samples_emitted(), 500);
    }

    #[test]
    fn test_same_seed_same_signal() {
        let mut a = SimulatedSource::new(config(7)).unwrap();
        let mut b = SimulatedSource::new(config(7)).unwrap();
        assert_eq!(a.read_batch().unwrap(), b.read_batch().unwrap());
    }

    #[test]
    fn test_artifacts_leave_the_clean_band() {
        let channel = SimulatedChannel::new(SignalModel::Constant { level: 1.0 }, 0.0).with_artifacts(ArtifactConfig {
            rate_per_s: 5.0,
            duration_s: 0.2,
            amplitude: 10.0,
        });
        let config = SimulationConfig { duration_s: Some(10.0), seed: 3, ..SimulationConfig::new(100.0, vec![channel]) };
        let mut source = SimulatedSource::new(config).unwrap();
        let mut disturbed = 0;
        while let Some(batch) = source.read_batch().unwrap() {
            disturbed += batch.channels[0].iter().filter(|v| (**v - 1.0).abs() > 1e-12).count();
        }
        assert!(disturbed > 0);
        assert!(disturbed < 1000);
    }

    #[test]
    fn test_rejects_empty_channel_list() {
        assert!(SimulatedSource::new(SimulationConfig::new(100.0, Vec::new())).unwrap_err().is_configuration());
    }
}
