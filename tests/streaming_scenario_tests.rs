// tests/streaming_scenario_tests.rs
//! End-to-end streaming scenarios
//!
//! These tests drive the orchestrator the way a live session does: samples
//! arrive in data-finger-sized chunks, cycles run whenever a full batch is
//! ahead of the finger and one final cycle runs when the stream ends.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use biostream_core::acquisition::{SignalModel, SimulatedChannel, SimulatedSource, SimulationConfig};
use biostream_core::analysis::{AnalysisUpdate, AnalyzerPhase, SignalAnalyzer, SignalType, WindowOutcome};
use biostream_core::config::{EngineConfig, StreamSettings};
use biostream_core::error::StreamResult;
use biostream_core::streaming::{StreamLimit, StreamOrchestrator, UpdateLog, VisualizationSink};
use biostream_core::utils::time::MockTimeProvider;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ================================================================================
// Helpers
// ================================================================================

const FS: f64 = 100.0;
const SECONDS: usize = 120;

fn temperature_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.stream = StreamSettings::new(2000, 200, vec![SignalType::Temperature]);
    config.temperature.lowpass_cutoff_hz = None;
    config.temperature.broadening_s = 0.0;
    config
}

fn skin_temperature() -> (Vec<f64>, Vec<f64>) {
    let n = SECONDS * FS as usize;
    let times: Vec<f64> = (0..n).map(|i| i as f64 / FS).collect();
    let values = times.iter().map(|t| 33.0 + 0.001 * t).collect();
    (times, values)
}

fn contaminate(values: &mut [f64]) {
    for (k, value) in values[8000..8300].iter_mut().enumerate() {
        *value += 5.0 * (k % 7) as f64;
    }
}

fn extracted(log: &UpdateLog) -> Vec<(usize, f64, usize)> {
    log.snapshot()
        .iter()
        .flat_map(|update| update.outcomes().cloned().collect::<Vec<_>>())
        .filter_map(|outcome| match outcome {
            WindowOutcome::Extracted { feature_time, last_analyzed_index, interval_points } => {
                Some((last_analyzed_index, feature_time, interval_points[0]))
            }
            WindowOutcome::Insufficient { .. } => None,
        })
        .collect()
}

fn same_values(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn replay(values: Vec<f64>) -> (StreamOrchestrator, UpdateLog) {
    let (times, _) = skin_temperature();
    let mut orchestrator = StreamOrchestrator::new(temperature_config()).unwrap();
    let log = UpdateLog::new();
    orchestrator.add_sink(Box::new(log.clone()));
    orchestrator.replay_recording(&times, &[values]).unwrap();
    (orchestrator, log)
}

// ================================================================================
// Temperature session
// ================================================================================

#[test]
fn test_temperature_session_produces_one_record_per_second_after_first_window() {
    let (_, values) = skin_temperature();
    let (orchestrator, log) = replay(values);

    let analyzer = orchestrator.analyzer(SignalType::Temperature).unwrap();
    assert_eq!(analyzer.phase(), AnalyzerPhase::Active);
    let fs = analyzer.sampling_freq().unwrap();
    assert!((fs - 2000.0 / 19.99).abs() < 1e-9, "fs estimated from the first batch, got {}", fs);

    let records = extracted(&log);
    assert_eq!(records.len(), 60);
    assert_eq!(records[0].0, 6003);
    assert!((records[0].1 - 60.03).abs() < 1e-9);
    for pair in records.windows(2) {
        assert_eq!(pair[1].0 - pair[0].0, 100);
    }
    for &(_, _, points) in &records {
        assert!((5999..=6001).contains(&points), "full window expected, got {}", points);
    }

    let reports = orchestrator.feature_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].len(), 60);
    assert_eq!(reports[0].feature_names.len(), 11);
    // Without an average window compiled records equal raw ones
    for (raw, compiled) in reports[0].raw.iter().zip(&reports[0].compiled) {
        assert!(same_values(raw, compiled));
    }
}

#[test]
fn test_temperature_mean_tracks_the_drift() {
    let (_, values) = skin_temperature();
    let (orchestrator, _) = replay(values);
    let report = &orchestrator.feature_reports()[0];

    for (time, record) in report.times.iter().zip(&report.raw) {
        // Mean of a linear ramp over (t - 60, t] sits half a window back
        let expected = 33.0 + 0.001 * (time - 30.0);
        assert!((record[0] - expected).abs() < 1e-3, "mean {} at t={}", record[0], time);
        assert!((record[9] - 0.001).abs() < 1e-4, "slope {} at t={}", record[9], time);
    }
}

#[test]
fn test_contaminated_segment_is_excluded_from_covering_windows() {
    let (_, clean_values) = skin_temperature();
    let mut dirty_values = clean_values.clone();
    contaminate(&mut dirty_values);

    let (_, clean_log) = replay(clean_values);
    let (_, dirty_log) = replay(dirty_values);
    let clean = extracted(&clean_log);
    let dirty = extracted(&dirty_log);
    assert_eq!(clean.len(), dirty.len());

    for (c, d) in clean.iter().zip(&dirty) {
        assert_eq!(c.0, d.0);
        if c.0 < 8000 {
            assert_eq!(c.2, d.2, "window ending at {} never sees the segment", c.0);
        } else if c.0 >= 8403 && c.0 < 14000 {
            let excluded = c.2 - d.2;
            assert!((300..=320).contains(&excluded), "excluded {} at index {}", excluded, c.0);
        }
    }
}

#[test]
fn test_filtered_output_never_contains_masked_samples() {
    let (_, mut values) = skin_temperature();
    contaminate(&mut values);
    let (_, log) = replay(values);

    for update in log.snapshot() {
        for channel in &update.channels {
            assert_eq!(channel.filtered_times.len(), channel.filtered_values.len());
            for value in &channel.filtered_values {
                assert!(*value < 33.2, "contaminated value {} leaked into filtered output", value);
            }
        }
    }
}

#[test]
fn test_default_pipeline_on_noisy_sine() {
    let (times, _) = skin_temperature();
    let mut rng = StdRng::seed_from_u64(5);
    let values: Vec<f64> = times
        .iter()
        .map(|t| 33.0 + 0.5 * (2.0 * PI * 0.01 * t).sin() + rng.gen_range(-0.05..0.05))
        .collect();

    // Stock low-pass, broadening and smoothing
    let mut config = EngineConfig::default();
    config.stream = StreamSettings::new(2000, 200, vec![SignalType::Temperature]);
    let mut orchestrator = StreamOrchestrator::new(config).unwrap();
    let log = UpdateLog::new();
    orchestrator.add_sink(Box::new(log.clone()));
    orchestrator.replay_recording(&times, &[values]).unwrap();

    let records = extracted(&log);
    assert_eq!(records.len(), 60);
    assert!(records[0].0 >= 6000, "first record at index {}", records[0].0);
    assert!(records[0].1 >= 60.0, "first record at t={}", records[0].1);
    assert_eq!(orchestrator.feature_reports()[0].len(), 60);
}

// ================================================================================
// Mixed session
// ================================================================================

#[test]
fn test_mixed_session_routes_channels_to_their_analyzers() {
    let mut config = EngineConfig::default();
    config.stream = StreamSettings::new(
        2000,
        200,
        vec![SignalType::Gsr, SignalType::Eeg, SignalType::Temperature, SignalType::General],
    );

    let channels = vec![
        SimulatedChannel::new(SignalModel::Sine { offset: 2.0, amplitude: 0.1, frequency_hz: 0.05 }, 0.001),
        SimulatedChannel::new(SignalModel::Sine { offset: 1.65, amplitude: 0.05, frequency_hz: 10.0 }, 0.01),
        SimulatedChannel::new(SignalModel::Drift { start: 33.0, rate_per_s: 0.001 }, 0.0),
        SimulatedChannel::new(SignalModel::Constant { level: 1.0 }, 0.01),
    ];
    let simulation = SimulationConfig {
        duration_s: Some(90.0),
        chunk_size: 200,
        seed: 11,
        ..SimulationConfig::new(250.0, channels)
    };
    let mut source = SimulatedSource::new(simulation).unwrap();

    let mut orchestrator = StreamOrchestrator::new(config).unwrap();
    let metrics = orchestrator.stream_from(&mut source, StreamLimit::unbounded()).unwrap();
    assert_eq!(metrics.samples_ingested, 22_500);
    assert!(metrics.cycles > 0);
    assert!(metrics.features_extracted > 0);

    for analyzer in orchestrator.analyzers() {
        assert_eq!(analyzer.phase(), AnalyzerPhase::Active, "{}", analyzer.signal_type());
        assert_eq!(analyzer.buffered_points(), 22_500);
        assert_eq!(analyzer.channel_count(), 1);
    }

    let reports = orchestrator.feature_reports();
    let types: Vec<SignalType> = reports.iter().map(|r| r.signal_type).collect();
    assert_eq!(types, vec![SignalType::Gsr, SignalType::Eeg, SignalType::Temperature]);
    assert_eq!(reports[0].channel, 0);
    assert_eq!(reports[1].channel, 1);

    // EEG: 15 s windows every 5 s; GSR: 60 s tonic windows every 10 s
    assert!(reports[1].len() >= 14, "eeg records {}", reports[1].len());
    assert!(reports[0].len() >= 3, "gsr records {}", reports[0].len());
    assert_eq!(reports[0].feature_names.len(), reports[0].raw[0].len());
}

#[test]
fn test_duration_limit_stops_an_endless_source() {
    let mut config = EngineConfig::default();
    config.stream = StreamSettings::new(500, 100, vec![SignalType::General]);
    config.general.lowpass_cutoff_hz = Some(20.0);
    let simulation = SimulationConfig {
        chunk_size: 100,
        ..SimulationConfig::new(
            100.0,
            vec![SimulatedChannel::new(SignalModel::Constant { level: 0.5 }, 0.0)],
        )
    };
    let mut source = SimulatedSource::new(simulation).unwrap();

    let mut orchestrator = StreamOrchestrator::new(config).unwrap();
    let metrics = orchestrator.stream_from(&mut source, StreamLimit::seconds(30.0)).unwrap();

    // Chunks end at 0.99 s, 1.99 s, ... so the limit trips on the 31st chunk
    assert_eq!(metrics.samples_ingested, 3100);
    assert!(orchestrator.feature_reports().is_empty());
}

#[test]
fn test_restreaming_resets_previous_session() {
    let (times, values) = skin_temperature();
    let mut orchestrator = StreamOrchestrator::new(temperature_config()).unwrap();
    orchestrator.replay_recording(&times, &[values.clone()]).unwrap();
    let first = orchestrator.feature_reports();

    orchestrator.replay_recording(&times, &[values]).unwrap();
    let second = orchestrator.feature_reports();
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].times, second[0].times);
    for (a, b) in first[0].raw.iter().zip(&second[0].raw) {
        assert!(same_values(a, b));
    }
    assert_eq!(orchestrator.buffered_points(), times.len());
}

// ================================================================================
// Timing and rate changes
// ================================================================================

#[test]
fn test_rate_increase_mid_session_keeps_streaming() {
    // 100 Hz for 30 s, then 150 Hz until 150 s
    let mut times: Vec<f64> = (0..3000).map(|i| i as f64 / FS).collect();
    times.extend((1..=18_000).map(|i| 30.0 + i as f64 / 150.0));
    let values: Vec<f64> = times.iter().map(|t| 33.0 + 0.001 * t).collect();

    let mut orchestrator = StreamOrchestrator::new(temperature_config()).unwrap();
    let log = UpdateLog::new();
    orchestrator.add_sink(Box::new(log.clone()));
    orchestrator.replay_recording(&times, &[values]).unwrap();

    // The rate estimated from the first window is kept
    let fs = orchestrator.analyzer(SignalType::Temperature).unwrap().sampling_freq().unwrap();
    assert!((fs - 2000.0 / 19.99).abs() < 1e-9);

    let records = extracted(&log);
    assert!(records.last().unwrap().1 > 145.0, "records stopped at t={}", records.last().unwrap().1);
    // A full 60 s window at 150 Hz holds 9000 samples, more than the 70 s
    // depth sized at ~100 Hz keeps behind the data finger
    assert!(records.iter().any(|r| r.1 > 100.0 && r.2 < 8950));
    assert!(records.iter().all(|r| r.2 <= 9001));
}

/// Display that takes a fixed amount of mock time per update
struct SlowDisplay {
    clock: Arc<MockTimeProvider>,
    updates: Arc<AtomicUsize>,
    slow: Arc<AtomicUsize>,
}

impl VisualizationSink for SlowDisplay {
    fn on_update(&mut self, update: &AnalysisUpdate) -> StreamResult<()> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        if update.data_finger % 400 == 0 {
            self.slow.fetch_add(1, Ordering::Relaxed);
            self.clock.advance_secs(3.0);
        } else {
            self.clock.advance_secs(0.5);
        }
        Ok(())
    }
}

#[test]
fn test_cycles_slower_than_real_time_are_counted() {
    let (times, values) = skin_temperature();
    let clock = Arc::new(MockTimeProvider::new(0));
    let updates = Arc::new(AtomicUsize::new(0));
    let slow = Arc::new(AtomicUsize::new(0));

    let mut orchestrator = StreamOrchestrator::new(temperature_config())
        .unwrap()
        .with_time_provider(clock.clone());
    orchestrator.add_sink(Box::new(SlowDisplay { clock, updates: updates.clone(), slow: slow.clone() }));
    let metrics = orchestrator.replay_recording(&times, &[values]).unwrap();

    // Budget is 200 samples at ~100 Hz, just under 2 s
    assert_eq!(metrics.cycles as usize, updates.load(Ordering::Relaxed));
    assert!(slow.load(Ordering::Relaxed) > 0);
    assert_eq!(metrics.realtime_overruns as usize, slow.load(Ordering::Relaxed));
    assert!((metrics.slowest_cycle_secs - 3.0).abs() < 1e-9);
    assert!((metrics.total_cycle_secs - (0.5 * metrics.cycles as f64 + 2.5 * metrics.realtime_overruns as f64)).abs() < 1e-6);
}
