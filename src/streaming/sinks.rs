// src/streaming/sinks.rs
//! Consumers of analysis output: live update observers and feature export

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisUpdate, SignalType};
use crate::error::{IntoStreamError, StreamResult};

/// Receives every cycle's [`AnalysisUpdate`], typically for plotting
pub trait VisualizationSink: Send {
    fn on_update(&mut self, update: &AnalysisUpdate) -> StreamResult<()>;
}

/// Keeps every update in memory; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct UpdateLog {
    updates: Arc<Mutex<Vec<AnalysisUpdate>>>,
}

impl UpdateLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.updates.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<AnalysisUpdate> {
        self.updates.lock().clone()
    }

    pub fn clear(&self) {
        self.updates.lock().clear();
    }
}

impl VisualizationSink for UpdateLog {
    fn on_update(&mut self, update: &AnalysisUpdate) -> StreamResult<()> {
        self.updates.lock().push(update.clone());
        Ok(())
    }
}

/// Who and what a session recorded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub experiment: String,
    pub subject: String,
}

impl SessionMetadata {
    pub fn new(experiment: &str, subject: &str) -> Self {
        Self { experiment: experiment.to_string(), subject: subject.to_string() }
    }
}

/// Every feature record one analyzer channel produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReport {
    pub signal_type: SignalType,
    /// Channel index in acquisition order
    pub channel: usize,
    pub feature_names: Vec<String>,
    pub times: Vec<f64>,
    pub raw: Vec<Vec<f64>>,
    pub compiled: Vec<Vec<f64>>,
}

impl FeatureReport {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Destination for exported feature reports
pub trait FeatureSink {
    /// Write one report, returning the number of records written
    fn write_report(&mut self, report: &FeatureReport, metadata: &SessionMetadata) -> StreamResult<usize>;

    fn flush(&mut self) -> StreamResult<()>;
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ExportLine<'a> {
    Header {
        experiment: &'a str,
        subject: &'a str,
        signal_type: SignalType,
        channel: usize,
        feature_names: &'a [String],
    },
    Record {
        signal_type: SignalType,
        channel: usize,
        time: f64,
        raw: &'a [f64],
        compiled: &'a [f64],
    },
}

/// Writes reports as JSON lines: one header per report, then one line per
/// record. Non-finite feature values are written as `null`.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &ExportLine<'_>) -> StreamResult<()> {
        serde_json::to_writer(&mut self.writer, line).persistence_err("json_lines", "write_report")?;
        self.writer.write_all(b"\n").persistence_err("json_lines", "write_report")
    }
}

impl<W: Write> FeatureSink for JsonLinesSink<W> {
    fn write_report(&mut self, report: &FeatureReport, metadata: &SessionMetadata) -> StreamResult<usize> {
        self.write_line(&ExportLine::Header {
            experiment: &metadata.experiment,
            subject: &metadata.subject,
            signal_type: report.signal_type,
            channel: report.channel,
            feature_names: &report.feature_names,
        })?;
        for ((time, raw), compiled) in report.times.iter().zip(&report.raw).zip(&report.compiled) {
            self.write_line(&ExportLine::Record {
                signal_type: report.signal_type,
                channel: report.channel,
                time: *time,
                raw,
                compiled,
            })?;
        }
        Ok(report.len())
    }

    fn flush(&mut self) -> StreamResult<()> {
        self.writer.flush().persistence_err("json_lines", "flush")
    }
}
