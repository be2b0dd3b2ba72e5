// tests/config_loading_tests.rs
//! Layered configuration files on disk

use std::fs;
use std::path::PathBuf;

use biostream_core::analysis::SignalType;
use biostream_core::config::{ConfigError, ConfigLoader, EngineConfig, StreamSettings};
use biostream_core::streaming::StreamOrchestrator;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_later_files_override_earlier_ones() {
    let dir = TempDir::new().unwrap();
    let base = write(
        &dir,
        "base.toml",
        r#"
        [stream]
        points_per_batch = 2000
        move_data_finger = 200
        streaming_order = ["eeg", "eeg", "temp"]

        [eeg]
        lowpass_cutoff_hz = 40.0
        "#,
    );
    let session = write(
        &dir,
        "session.toml",
        r#"
        [eeg]
        lowpass_cutoff_hz = 30.0

        [compiler]
        trim_proportion = 0.1
        "#,
    );

    let config = ConfigLoader::with_paths(vec![base, session])
        .with_env_overrides(Vec::new())
        .load()
        .unwrap();

    assert_eq!(config.stream.points_per_batch, 2000);
    assert_eq!(config.stream.streaming_order, vec![SignalType::Eeg, SignalType::Eeg, SignalType::Temperature]);
    assert_eq!(config.eeg.lowpass_cutoff_hz, 30.0);
    assert_eq!(config.compiler.trim_proportion, 0.1);
    // Untouched sections keep their defaults
    assert_eq!(config.gsr, EngineConfig::default().gsr);
}

#[test]
fn test_environment_beats_every_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "engine.toml",
        r#"
        [stream]
        streaming_order = ["gsr"]
        move_data_finger = 50
        "#,
    );

    let config = ConfigLoader::with_paths(vec![path])
        .with_env_overrides(vec![("BIOSTREAM_STREAM_MOVE_DATA_FINGER".to_string(), "25".to_string())])
        .load()
        .unwrap();
    assert_eq!(config.stream.move_data_finger, 25);
}

#[test]
fn test_exported_config_loads_back_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut config = EngineConfig::default();
    config.stream = StreamSettings::new(1500, 150, vec![SignalType::Gsr, SignalType::General]);
    config.temperature.derivative_threshold = 0.25;
    config.gsr.average_window_s = Some(30.0);

    let path = dir.path().join("exported.toml");
    ConfigLoader::export_config(&config, &path).unwrap();
    let loaded = ConfigLoader::with_paths(vec![path]).with_env_overrides(Vec::new()).load().unwrap();

    assert_eq!(loaded.stream, config.stream);
    assert_eq!(loaded.gsr, config.gsr);
    assert_eq!(loaded.temperature.derivative_threshold, 0.25);
}

#[test]
fn test_invalid_file_is_reported_with_every_problem() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "bad.toml",
        r#"
        [stream]
        points_per_batch = 100
        move_data_finger = 100
        streaming_order = ["eeg"]

        [eeg]
        min_valid_voltage = 3.0
        max_valid_voltage = 1.0
        "#,
    );

    let err = ConfigLoader::with_paths(vec![path]).with_env_overrides(Vec::new()).load().unwrap_err();
    match err {
        ConfigError::ValidationError(problems) => {
            assert!(problems.iter().any(|p| p.contains("move_data_finger")));
            assert!(problems.iter().any(|p| p.contains("voltage")));
        }
        other => panic!("Expected validation error, got: {:?}", other),
    }
}

#[test]
fn test_unknown_signal_type_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "typo.toml", "[stream]\nstreaming_order = [\"ecg\"]\n");
    let err = ConfigLoader::with_paths(vec![path]).with_env_overrides(Vec::new()).load().unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn test_loaded_config_drives_an_orchestrator() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "temperature.toml",
        r#"
        [stream]
        points_per_batch = 2000
        move_data_finger = 200
        streaming_order = ["temperature"]

        [temperature]
        broadening_s = 0.0
        "#,
    );
    let config = ConfigLoader::with_paths(vec![path]).with_env_overrides(Vec::new()).load().unwrap();
    let mut orchestrator = StreamOrchestrator::new(config).unwrap();

    let times: Vec<f64> = (0..9000).map(|i| i as f64 / 100.0).collect();
    let values = times.iter().map(|t| 34.0 - 0.002 * t).collect();
    orchestrator.replay_recording(&times, &[values]).unwrap();
    assert!(!orchestrator.feature_reports()[0].is_empty());
}
