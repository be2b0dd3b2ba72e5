// tests/error_propagation_tests.rs
//! Error propagation through the streaming stack
//!
//! Covers the three fatal error classes an embedding application sees:
//! - Configuration errors, at construction or at sampling-frequency activation
//! - Consistency errors, when bookkeeping invariants are violated
//! - Acquisition and persistence errors, wrapped with their source intact

use std::io::{self, Write};

use biostream_core::acquisition::{AcquisitionError, AcquisitionSource, SampleBatch};
use biostream_core::analysis::{Analyzer, AnalyzerPhase, SignalAnalyzer, SignalType};
use biostream_core::config::{EngineConfig, StreamSettings};
use biostream_core::error::StreamError;
use biostream_core::streaming::{JsonLinesSink, SessionMetadata, StreamLimit, StreamOrchestrator};

fn config(order: Vec<SignalType>) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.stream = StreamSettings::new(500, 100, order);
    config
}

fn ramp(n: usize, fs: f64, offset: usize) -> SampleBatch {
    let times: Vec<f64> = (offset..offset + n).map(|i| i as f64 / fs).collect();
    let values = times.iter().map(|t| 33.0 + 0.001 * t).collect();
    SampleBatch::new(times, vec![values]).unwrap()
}

/// Hands out one good batch, then reports a disconnect
struct FlakySource {
    reads: usize,
}

impl AcquisitionSource for FlakySource {
    type Error = AcquisitionError;

    fn channel_count(&self) -> usize {
        1
    }

    fn read_batch(&mut self) -> Result<Option<SampleBatch>, Self::Error> {
        self.reads += 1;
        match self.reads {
            1 => Ok(Some(ramp(100, 100.0, 0))),
            _ => Err(AcquisitionError::Disconnected("cable pulled".to_string())),
        }
    }
}

struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "disk gone"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ================================================================================
// Configuration
// ================================================================================

#[test]
fn test_invalid_geometry_is_rejected_at_construction() {
    let mut bad = config(vec![SignalType::Temperature]);
    bad.stream.move_data_finger = 600;
    let err = StreamOrchestrator::new(bad).err().unwrap();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("move_data_finger"));
}

#[test]
fn test_invalid_variant_parameters_are_rejected_at_construction() {
    let mut bad = config(vec![SignalType::Eeg]);
    bad.eeg.highpass_cutoff_hz = 60.0;
    assert!(StreamOrchestrator::new(bad).err().unwrap().is_configuration());

    let mut bad = config(vec![SignalType::Gsr]);
    bad.gsr.tonic_cutoff_hz = 20.0;
    assert!(Analyzer::from_config(SignalType::Gsr, 1, &bad).err().unwrap().is_configuration());
}

#[test]
fn test_cutoff_above_nyquist_fails_when_frequency_becomes_known() {
    let mut bad = config(vec![SignalType::Temperature]);
    bad.temperature.lowpass_cutoff_hz = Some(60.0);
    // Nothing is known about the sampling rate yet, so construction succeeds
    let mut orchestrator = StreamOrchestrator::new(bad).unwrap();

    orchestrator.ingest(&ramp(500, 100.0, 0)).unwrap();
    let err = orchestrator.pump().unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("lowpass_cutoff_hz"));

    let analyzer = orchestrator.analyzer(SignalType::Temperature).unwrap();
    assert_eq!(analyzer.phase(), AnalyzerPhase::SamplingFrequencyPending);
    assert!(analyzer.sampling_freq().is_none());
}

#[test]
fn test_source_with_wrong_channel_count_is_rejected() {
    let mut orchestrator = StreamOrchestrator::new(config(vec![SignalType::Temperature, SignalType::Gsr])).unwrap();
    let err = orchestrator.stream_from(&mut FlakySource { reads: 0 }, StreamLimit::unbounded()).unwrap_err();
    assert!(err.is_configuration());
}

// ================================================================================
// Consistency
// ================================================================================

#[test]
fn test_ingest_rejects_mismatched_channel_count() {
    let mut orchestrator = StreamOrchestrator::new(config(vec![SignalType::Temperature, SignalType::Gsr])).unwrap();
    let err = orchestrator.ingest(&ramp(10, 100.0, 0)).unwrap_err();
    assert!(err.is_consistency());
    assert_eq!(orchestrator.buffered_points(), 0);
}

#[test]
fn test_ingest_rejects_time_going_backwards() {
    let mut orchestrator = StreamOrchestrator::new(config(vec![SignalType::Temperature])).unwrap();
    orchestrator.ingest(&ramp(100, 100.0, 100)).unwrap();
    let err = orchestrator.ingest(&ramp(100, 100.0, 50)).unwrap_err();
    assert!(err.is_consistency());

    // A rejected batch leaves every analyzer untouched
    assert_eq!(orchestrator.buffered_points(), 100);
    assert_eq!(orchestrator.analyzer(SignalType::Temperature).unwrap().buffered_points(), 100);
}

#[test]
fn test_data_finger_past_buffer_is_a_consistency_error() {
    let mut analyzer = Analyzer::from_config(SignalType::General, 1, &config(vec![SignalType::General])).unwrap();
    let batch = ramp(50, 100.0, 0);
    analyzer.append_samples(&batch.times, &batch.channels).unwrap();

    let err = analyzer.analyze_batch(51).unwrap_err();
    match &err {
        StreamError::Consistency { context, .. } => {
            assert_eq!(context.component, "general");
            assert_eq!(context.operation, "analyze_batch");
        }
        other => panic!("Expected consistency error, got: {:?}", other),
    }
}

// ================================================================================
// Acquisition and persistence
// ================================================================================

#[test]
fn test_source_failure_is_wrapped_with_its_cause() {
    let mut orchestrator = StreamOrchestrator::new(config(vec![SignalType::Temperature])).unwrap();
    let err = orchestrator.stream_from(&mut FlakySource { reads: 0 }, StreamLimit::unbounded()).unwrap_err();

    match &err {
        StreamError::Acquisition { reason, source, .. } => {
            assert!(reason.contains("cable pulled"));
            let cause = source.as_ref().unwrap();
            assert!(cause.downcast_ref::<AcquisitionError>().is_some());
        }
        other => panic!("Expected acquisition error, got: {:?}", other),
    }
    assert!(err.to_string().contains("[ACQUISITION]"));
    // The batch read before the failure was kept
    assert_eq!(orchestrator.buffered_points(), 100);
}

#[test]
fn test_export_failure_is_a_persistence_error() {
    let mut orchestrator = StreamOrchestrator::new(config(vec![SignalType::Temperature])).unwrap();
    let times: Vec<f64> = (0..12_000).map(|i| i as f64 / 100.0).collect();
    let values: Vec<f64> = times.iter().map(|t| 33.0 + 0.001 * t).collect();
    orchestrator.replay_recording(&times, &[values]).unwrap();

    let mut sink = JsonLinesSink::new(BrokenWriter);
    let err = orchestrator
        .export_features(&mut sink, &SessionMetadata::new("baseline", "s01"))
        .unwrap_err();
    assert!(matches!(err, StreamError::Persistence { .. }));
}
