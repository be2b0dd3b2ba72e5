//! Replay demo: streams a simulated EEG/GSR/temperature session through the
//! orchestrator and writes the compiled features as JSON lines
//!
//! Usage: `biostream-replay [config.toml] [output.jsonl]`

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use biostream_core::acquisition::{ArtifactConfig, SignalModel, SimulatedChannel, SimulatedSource, SimulationConfig};
use biostream_core::analysis::SignalType;
use biostream_core::config::{ConfigLoader, EngineConfig, StreamSettings};
use biostream_core::streaming::{JsonLinesSink, SessionMetadata, StreamLimit, StreamOrchestrator, UpdateLog};
use biostream_core::utils::SystemTimeProvider;

const SAMPLING_FREQ: f64 = 250.0;
const DURATION_S: f64 = 180.0;

fn demo_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.stream = StreamSettings::new(
        2000,
        200,
        vec![SignalType::Eeg, SignalType::Eeg, SignalType::Gsr, SignalType::Temperature],
    );
    config
}

fn demo_channels() -> Vec<SimulatedChannel> {
    let alpha = SignalModel::Sine { offset: 1.65, amplitude: 0.05, frequency_hz: 10.0 };
    let beta = SignalModel::Sine { offset: 1.65, amplitude: 0.02, frequency_hz: 20.0 };
    vec![
        SimulatedChannel::new(alpha, 0.01).with_artifacts(ArtifactConfig { rate_per_s: 0.05, duration_s: 0.5, amplitude: 1.0 }),
        SimulatedChannel::new(beta, 0.01),
        SimulatedChannel::new(SignalModel::Sine { offset: 2.0, amplitude: 0.1, frequency_hz: 0.05 }, 0.002),
        SimulatedChannel::new(SignalModel::Drift { start: 33.0, rate_per_s: 0.002 }, 0.005),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ConfigLoader::with_paths(vec![PathBuf::from(path)]).load()?,
        None => demo_config(),
    };
    let output: Box<dyn Write> = match args.next() {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    let channels = demo_channels();
    if channels.len() != config.stream.streaming_order.len() {
        return Err(format!(
            "demo simulates {} channels, configuration streams {}",
            channels.len(),
            config.stream.streaming_order.len()
        )
        .into());
    }
    let simulation = SimulationConfig {
        duration_s: Some(DURATION_S),
        chunk_size: config.stream.move_data_finger,
        seed: 42,
        ..SimulationConfig::new(SAMPLING_FREQ, channels)
    };
    let mut source = SimulatedSource::new(simulation)?;

    let mut orchestrator = StreamOrchestrator::new(config)?.with_time_provider(Arc::new(SystemTimeProvider));
    let updates = UpdateLog::new();
    orchestrator.add_sink(Box::new(updates.clone()));

    let metrics = orchestrator.stream_from(&mut source, StreamLimit::unbounded())?;
    info!(
        cycles = metrics.cycles,
        updates = updates.len(),
        mean_cycle_ms = metrics.mean_cycle_secs() * 1e3,
        slowest_cycle_ms = metrics.slowest_cycle_secs * 1e3,
        "replay complete"
    );

    let mut sink = JsonLinesSink::new(output);
    let written = orchestrator.export_features(&mut sink, &SessionMetadata::new("replay-demo", "simulated"))?;
    info!(records = written, "export complete");
    Ok(())
}
