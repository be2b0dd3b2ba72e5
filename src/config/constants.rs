//! Engine-wide configuration constants
//!
//! Every tunable default lives here so analyzers, config defaults and tests
//! agree on the same numbers.

/// Stream batching constants
pub mod stream {
    pub const DEFAULT_POINTS_PER_BATCH: usize = 3000;
    pub const DEFAULT_MOVE_DATA_FINGER: usize = 10;
    pub const DEFAULT_COLLECT_FEATURES: bool = true;
}

/// Acquisition unit constants
pub mod units {
    pub const DEFAULT_MAX_VOLTAGE: f64 = 3.3;
    pub const DEFAULT_ADC_RESOLUTION: f64 = 1023.0;
}

/// Artifact broadening constants shared by the masked analyzers
pub mod artifact {
    /// Smallest smoothing window used when broadening flagged samples
    pub const MIN_BROADENING_WINDOW: usize = 3;
    /// Broadened flag level at or above which a sample is discarded
    pub const DEFAULT_BROADENING_TOLERANCE: f64 = 0.01;
    pub const BROADENING_POLY_ORDER: usize = 1;
}

/// EEG analyzer constants
pub mod eeg {
    pub const FEATURE_WINDOW_S: f64 = 15.0;
    pub const FEATURE_CADENCE_S: f64 = 5.0;
    pub const MIN_POINTS_FRACTION: f64 = 0.75;

    pub const BUFFER_DEPTH_POINTS: usize = 0;
    pub const BUFFER_DEPTH_S: f64 = 100.0;

    pub const LOWPASS_CUTOFF_HZ: f64 = 50.0;
    pub const LOWPASS_ORDER: usize = 3;
    pub const HIGHPASS_CUTOFF_HZ: f64 = 0.05;
    pub const HIGHPASS_ORDER: usize = 4;

    pub const MIN_VALID_VOLTAGE: f64 = 0.1;
    pub const MAX_VALID_VOLTAGE: f64 = 3.15;
    pub const BROADENING_S: f64 = 10.0;

    /// (low, high) Hz edges of delta, theta, alpha, beta, gamma
    pub const BANDS_HZ: [(f64, f64); 5] = [(0.5, 4.0), (4.0, 8.0), (8.0, 12.0), (12.0, 30.0), (30.0, 50.0)];
}

/// GSR analyzer constants
pub mod gsr {
    pub const TONIC_WINDOW_S: f64 = 60.0;
    pub const PHASIC_WINDOW_S: f64 = 15.0;
    pub const FEATURE_CADENCE_S: f64 = 10.0;
    pub const TONIC_MIN_POINTS_FRACTION: f64 = 0.5;
    pub const PHASIC_MIN_POINTS_FRACTION: f64 = 0.75;

    pub const BUFFER_DEPTH_POINTS: usize = 5000;
    pub const BUFFER_DEPTH_S: f64 = 70.0;

    pub const LOWPASS_CUTOFF_HZ: f64 = 15.0;
    pub const LOWPASS_ORDER: usize = 1;
    pub const TONIC_CUTOFF_HZ: f64 = 0.05;
    pub const TONIC_ORDER: usize = 1;

    /// (low, high) Hz edges of the four slow phasic bands
    pub const BANDS_HZ: [(f64, f64); 4] = [(0.0, 0.1), (0.1, 0.2), (0.2, 0.3), (0.3, 0.4)];
}

/// Temperature analyzer constants
pub mod temperature {
    pub const FEATURE_WINDOW_S: f64 = 60.0;
    pub const FEATURE_CADENCE_S: f64 = 1.0;
    pub const MIN_POINTS_FRACTION: f64 = 0.5;

    pub const BUFFER_DEPTH_POINTS: usize = 5000;
    pub const BUFFER_DEPTH_S: f64 = 70.0;

    pub const LOWPASS_CUTOFF_HZ: f64 = 0.1;
    pub const LOWPASS_ORDER: usize = 1;

    /// Absolute derivative (units per second) above which a sample is flagged
    pub const DERIVATIVE_THRESHOLD: f64 = 0.1;
    pub const BROADENING_S: f64 = 20.0;
    pub const SMOOTHING_S: f64 = 15.0;
    pub const SMOOTHING_POLY_ORDER: usize = 1;
}

/// General monitoring analyzer constants
pub mod general {
    pub const BUFFER_DEPTH_POINTS: usize = 5000;
    pub const BUFFER_DEPTH_S: f64 = 0.0;

    pub const LOWPASS_CUTOFF_HZ: f64 = 50.0;
    pub const LOWPASS_ORDER: usize = 3;
    pub const SMOOTHING_WINDOW: usize = 21;
    pub const SMOOTHING_POLY_ORDER: usize = 2;
}

/// Feature compiler constants
pub mod compiler {
    /// Fraction of records trimmed from each tail before averaging
    pub const TRIM_PROPORTION: f64 = 0.3;
    pub const MAX_TRIM_PROPORTION: f64 = 0.5;
}

/// Filter design limits
pub mod filters {
    pub const MIN_FILTER_ORDER: usize = 1;
    pub const MAX_FILTER_ORDER: usize = 8;
}
