// src/streaming/metrics.rs
//! Cycle timing counters

use serde::Serialize;

/// Counters kept across one streaming session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamMetrics {
    pub cycles: u64,
    pub samples_ingested: u64,
    pub features_extracted: u64,
    pub total_cycle_secs: f64,
    pub slowest_cycle_secs: f64,
    /// Cycles that took longer than the data finger stride lasts in signal time
    pub realtime_overruns: u64,
}

impl StreamMetrics {
    /// Record one cycle; returns whether it overran `budget_secs`
    pub fn record_cycle(&mut self, elapsed_secs: f64, budget_secs: Option<f64>, extracted: usize) -> bool {
        self.cycles += 1;
        self.features_extracted += extracted as u64;
        self.total_cycle_secs += elapsed_secs;
        self.slowest_cycle_secs = self.slowest_cycle_secs.max(elapsed_secs);

        let overran = budget_secs.is_some_and(|budget| elapsed_secs > budget);
        if overran {
            self.realtime_overruns += 1;
        }
        overran
    }

    pub fn record_ingest(&mut self, samples: usize) {
        self.samples_ingested += samples as u64;
    }

    pub fn mean_cycle_secs(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.total_cycle_secs / self.cycles as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrun_counting() {
        let mut metrics = StreamMetrics::default();
        assert!(!metrics.record_cycle(0.01, Some(0.1), 2));
        assert!(metrics.record_cycle(0.2, Some(0.1), 0));
        assert!(!metrics.record_cycle(5.0, None, 0));
        assert_eq!(metrics.cycles, 3);
        assert_eq!(metrics.realtime_overruns, 1);
        assert_eq!(metrics.features_extracted, 2);
        assert_eq!(metrics.slowest_cycle_secs, 5.0);
        assert!((metrics.mean_cycle_secs() - 5.21 / 3.0).abs() < 1e-12);
    }
}
