// src/processing/feature_compiler.rs
//! Trailing time-average of raw feature records

use crate::config::constants::compiler::TRIM_PROPORTION;
use crate::error::{StreamErrorBuilder, StreamResult};

/// Turns raw feature records into compiled (time-averaged) records
///
/// Each pushed record yields exactly one compiled record with the same
/// timestamp. The compiled value of a slot is the trimmed mean of that slot
/// over every raw record with timestamp in `(t - average_window, t]`.
/// Without an average window, or with a window of zero seconds, records pass
/// through unchanged.
#[derive(Debug, Clone)]
pub struct FeatureCompiler {
    average_window: Option<f64>,
    trim_proportion: f64,
    times: Vec<f64>,
    raw: Vec<Vec<f64>>,
    compiled: Vec<Vec<f64>>,
    window_start: usize,
}

impl Default for FeatureCompiler {
    fn default() -> Self {
        Self::new(None, TRIM_PROPORTION)
    }
}

impl FeatureCompiler {
    pub fn new(average_window: Option<f64>, trim_proportion: f64) -> Self {
        Self {
            average_window,
            trim_proportion,
            times: Vec::new(),
            raw: Vec::new(),
            compiled: Vec::new(),
            window_start: 0,
        }
    }

    /// Whether `records` could be pushed in order without an error
    pub fn check(&self, records: &[(f64, Vec<f64>)]) -> StreamResult<()> {
        let mut previous = self.times.last().copied();
        let mut width = self.raw.first().map(Vec::len);
        for (time, features) in records {
            Self::check_record(previous, width, *time, features.len())?;
            previous = Some(*time);
            width = Some(features.len());
        }
        Ok(())
    }

    fn check_record(previous: Option<f64>, width: Option<usize>, time: f64, slots: usize) -> StreamResult<()> {
        if let Some(last) = previous.filter(|&last| time < last) {
            return Err(StreamErrorBuilder::new("feature_compiler", "push").consistency(format!(
                "feature time {} precedes previous record at {}",
                time, last
            )));
        }
        if let Some(expected) = width.filter(|&expected| expected != slots) {
            return Err(StreamErrorBuilder::new("feature_compiler", "push").consistency(format!(
                "feature vector has {} slots, expected {}",
                slots, expected
            )));
        }
        Ok(())
    }

    /// Append a raw record and return its compiled counterpart
    pub fn push(&mut self, time: f64, features: Vec<f64>) -> StreamResult<&[f64]> {
        Self::check_record(self.times.last().copied(), self.raw.first().map(Vec::len), time, features.len())?;

        self.times.push(time);
        self.raw.push(features);

        let compiled = match self.average_window {
            Some(window) if window > 0.0 => {
                let cutoff = time - window;
                while self.times[self.window_start] <= cutoff {
                    self.window_start += 1;
                }
                self.average_slots(self.window_start)
            }
            _ => self.raw[self.raw.len() - 1].clone(),
        };
        self.compiled.push(compiled);

        Ok(&self.compiled[self.compiled.len() - 1])
    }

    fn average_slots(&self, start: usize) -> Vec<f64> {
        let records = &self.raw[start..];
        let slots = records.first().map_or(0, Vec::len);
        let mut column = Vec::with_capacity(records.len());
        (0..slots)
            .map(|slot| {
                column.clear();
                column.extend(records.iter().map(|record| record[slot]));
                trimmed_mean(&mut column, self.trim_proportion)
            })
            .collect()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn raw(&self) -> &[Vec<f64>] {
        &self.raw
    }

    pub fn compiled(&self) -> &[Vec<f64>] {
        &self.compiled
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn average_window(&self) -> Option<f64> {
        self.average_window
    }

    /// Drop every record; the window settings are kept
    pub fn reset(&mut self) {
        self.times.clear();
        self.raw.clear();
        self.compiled.clear();
        self.window_start = 0;
    }
}

/// Mean after dropping `floor(proportion * n)` values from each end
pub fn trimmed_mean(values: &mut [f64], proportion: f64) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let cut = ((proportion * n as f64).floor() as usize).min((n - 1) / 2);
    let kept = &values[cut..n - cut];
    kept.iter().sum::<f64>() / kept.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_without_window() {
        let mut compiler = FeatureCompiler::new(None, 0.3);
        for i in 0..5 {
            let raw = vec![i as f64, -(i as f64) * 0.5];
            let compiled = compiler.push(i as f64, raw.clone()).unwrap().to_vec();
            assert_eq!(compiled, raw);
        }
        assert_eq!(compiler.raw(), compiler.compiled());
    }

    #[test]
    fn test_zero_window_is_pass_through() {
        let mut compiler = FeatureCompiler::new(Some(0.0), 0.3);
        compiler.push(0.0, vec![1.0]).unwrap();
        let compiled = compiler.push(1.0, vec![5.0]).unwrap().to_vec();
        assert_eq!(compiled, vec![5.0]);
    }

    #[test]
    fn test_window_is_half_open() {
        let mut compiler = FeatureCompiler::new(Some(2.0), 0.0);
        compiler.push(0.0, vec![10.0]).unwrap();
        compiler.push(1.0, vec![20.0]).unwrap();
        // Window (0, 2] excludes the record at t = 0
        let compiled = compiler.push(2.0, vec![30.0]).unwrap().to_vec();
        assert_eq!(compiled, vec![25.0]);
    }

    #[test]
    fn test_trimmed_mean_drops_outliers() {
        let mut values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 1000.0];
        // floor(0.3 * 10) = 3 dropped from each end
        assert_eq!(trimmed_mean(&mut values, 0.3), 5.5);
        assert_eq!(trimmed_mean(&mut [4.0], 0.3), 4.0);
        assert_eq!(trimmed_mean(&mut [4.0, 8.0], 0.3), 6.0);
    }

    #[test]
    fn test_one_compiled_record_per_raw_record() {
        let mut compiler = FeatureCompiler::new(Some(3.0), 0.3);
        for i in 0..20 {
            compiler.push(i as f64 * 0.5, vec![i as f64]).unwrap();
        }
        assert_eq!(compiler.compiled().len(), compiler.raw().len());
        assert_eq!(compiler.times().len(), 20);
    }

    #[test]
    fn test_rejects_out_of_order_and_width_change() {
        let mut compiler = FeatureCompiler::default();
        compiler.push(5.0, vec![1.0, 2.0]).unwrap();
        assert!(compiler.push(4.0, vec![1.0, 2.0]).unwrap_err().is_consistency());
        assert!(compiler.push(6.0, vec![1.0]).unwrap_err().is_consistency());
    }

    #[test]
    fn test_reset_clears_records() {
        let mut compiler = FeatureCompiler::new(Some(10.0), 0.3);
        compiler.push(1.0, vec![1.0]).unwrap();
        compiler.reset();
        assert!(compiler.is_empty());
        assert_eq!(compiler.average_window(), Some(10.0));
    }
}
