//! Feature extraction for biosignal windows
//!
//! A [`FeatureSet`] turns one trailing window of filtered samples into a
//! fixed-length vector. The slot order is fixed per set and described by
//! [`FeatureSet::names`], which is what persistence relies on.
//!
//! - [`TemperatureFeatures`]: level, spread and trend of slow signals
//! - [`TonicFeatures`]: baseline statistics plus derivative summaries
//! - [`SpectralFeatures`]: Hjorth, entropy, fractal and band-power profile

pub mod complexity;
pub mod spectral;
pub mod statistics;

pub use spectral::{welch, HjorthParameters, PowerSpectrum};

use crate::processing::artifact::gradient;
use statistics::*;

/// Pluggable per-signal feature computation
pub trait FeatureSet: Send + Sync {
    /// Ordered slot names, one per value returned by [`FeatureSet::extract`]
    fn names(&self) -> Vec<String>;

    /// Compute the feature vector for one window
    fn extract(&self, times: &[f64], values: &[f64], sampling_freq: f64) -> Vec<f64>;

    fn slot_count(&self) -> usize {
        self.names().len()
    }
}

fn prefixed(prefix: &str, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| if prefix.is_empty() { name.to_string() } else { format!("{}_{}", prefix, name) })
        .collect()
}

/// Statistics describing a slowly varying level
#[derive(Debug, Clone, Default)]
pub struct TemperatureFeatures;

impl TemperatureFeatures {
    const NAMES: [&'static str; 11] = [
        "mean",
        "entropy",
        "standard_deviation",
        "skew",
        "kurtosis",
        "change",
        "average_noise",
        "average_squared_noise",
        "power",
        "slope",
        "intercept",
    ];
}

impl FeatureSet for TemperatureFeatures {
    fn names(&self) -> Vec<String> {
        prefixed("", &Self::NAMES)
    }

    fn extract(&self, times: &[f64], values: &[f64], _sampling_freq: f64) -> Vec<f64> {
        let change = match (values.first(), values.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        let (slope, intercept) = linear_fit(&relative_times(times), values);
        vec![
            mean(values),
            shannon_entropy(values),
            std_dev(values),
            skewness(values),
            kurtosis(values),
            change,
            mean_abs_diff(values),
            mean_squared_diff(values),
            power(values),
            slope,
            intercept,
        ]
    }
}

/// Baseline (tonic) conductance statistics
#[derive(Debug, Clone)]
pub struct TonicFeatures {
    prefix: String,
}

impl TonicFeatures {
    const NAMES: [&'static str; 19] = [
        "mean",
        "entropy",
        "standard_deviation",
        "skew",
        "kurtosis",
        "normalized_area",
        "change",
        "max_change",
        "average_noise",
        "average_squared_noise",
        "power",
        "first_derivative_mean",
        "first_derivative_std",
        "first_derivative_power",
        "second_derivative_mean",
        "second_derivative_std",
        "second_derivative_power",
        "slope",
        "intercept",
    ];

    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_string() }
    }
}

impl FeatureSet for TonicFeatures {
    fn names(&self) -> Vec<String> {
        prefixed(&self.prefix, &Self::NAMES)
    }

    fn extract(&self, times: &[f64], values: &[f64], _sampling_freq: f64) -> Vec<f64> {
        let relative = relative_times(times);
        let duration = relative.last().copied().unwrap_or(0.0);
        let normalized_area = if duration > 0.0 { trapezoid(&relative, values) / duration } else { 0.0 };
        let change = match (values.first(), values.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        let max_change = values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            - values.iter().copied().fold(f64::INFINITY, f64::min);
        let max_change = if max_change.is_finite() { max_change } else { 0.0 };

        let first = gradient(times, values);
        let second = gradient(times, &first);
        let (slope, intercept) = linear_fit(&relative, values);

        vec![
            mean(values),
            shannon_entropy(values),
            std_dev(values),
            skewness(values),
            kurtosis(values),
            normalized_area,
            change,
            max_change,
            mean_abs_diff(values),
            mean_squared_diff(values),
            power(values),
            mean(&first),
            std_dev(&first),
            power(&first),
            mean(&second),
            std_dev(&second),
            power(&second),
            slope,
            intercept,
        ]
    }
}

/// Spectral and complexity profile of an oscillatory signal
#[derive(Debug, Clone)]
pub struct SpectralFeatures {
    prefix: String,
    bands: Vec<(String, f64, f64)>,
}

impl SpectralFeatures {
    const LEADING_NAMES: [&'static str; 17] = [
        "hjorth_activity",
        "hjorth_mobility",
        "hjorth_complexity",
        "first_derivative_variance",
        "second_derivative_variance",
        "psd_hjorth_activity",
        "psd_hjorth_mobility",
        "psd_hjorth_complexity",
        "psd_first_derivative_variance",
        "psd_second_derivative_variance",
        "permutation_entropy",
        "spectral_entropy",
        "svd_entropy",
        "petrosian_fd",
        "katz_fd",
        "higuchi_fd",
        "lempel_ziv_complexity",
    ];

    /// Profile over named `(low, high)` Hz bands; the engagement index uses
    /// bands 1..=3 as `b3 / (b1 + b2)`, so at least four bands are expected
    pub fn new(prefix: &str, bands: &[(&str, (f64, f64))]) -> Self {
        Self {
            prefix: prefix.to_string(),
            bands: bands.iter().map(|(name, (lo, hi))| (name.to_string(), *lo, *hi)).collect(),
        }
    }

    /// Delta, theta, alpha, beta and gamma bands
    pub fn eeg() -> Self {
        use crate::config::constants::eeg::BANDS_HZ;
        let names = ["delta", "theta", "alpha", "beta", "gamma"];
        let bands: Vec<(&str, (f64, f64))> = names.iter().copied().zip(BANDS_HZ.iter().copied()).collect();
        Self::new("", &bands)
    }

    /// Four slow bands for phasic conductance
    pub fn phasic() -> Self {
        use crate::config::constants::gsr::BANDS_HZ;
        let names = ["band_0", "band_1", "band_2", "band_3"];
        let bands: Vec<(&str, (f64, f64))> = names.iter().copied().zip(BANDS_HZ.iter().copied()).collect();
        Self::new("phasic", &bands)
    }

    fn engagement(band_powers: &[f64]) -> f64 {
        if band_powers.len() < 4 {
            return 0.0;
        }
        let denominator = band_powers[1] + band_powers[2];
        if denominator > 0.0 { band_powers[3] / denominator } else { 0.0 }
    }
}

impl FeatureSet for SpectralFeatures {
    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Self::LEADING_NAMES.iter().map(|s| s.to_string()).collect();
        names.extend(self.bands.iter().map(|(name, _, _)| format!("{}_power", name)));
        names.extend(self.bands.iter().map(|(name, _, _)| format!("{}_relative_power", name)));
        names.push("engagement_index".to_string());
        names.push("zero_crossings".to_string());
        names.into_iter()
            .map(|name| if self.prefix.is_empty() { name } else { format!("{}_{}", self.prefix, name) })
            .collect()
    }

    fn extract(&self, times: &[f64], values: &[f64], sampling_freq: f64) -> Vec<f64> {
        let spectrum = welch(values, sampling_freq);

        let mut features = HjorthParameters::from_signal(times, values).to_vec();
        features.extend(spectrum.hjorth().to_vec());
        features.push(complexity::permutation_entropy(values));
        features.push(spectrum.spectral_entropy());
        features.push(complexity::svd_entropy(values));
        features.push(complexity::petrosian_fd(values));
        features.push(complexity::katz_fd(values));
        features.push(complexity::higuchi_fd(values));
        features.push(complexity::lempel_ziv_complexity(values));

        let band_powers: Vec<f64> = self.bands.iter().map(|(_, lo, hi)| spectrum.band_power(*lo, *hi)).collect();
        let total = spectrum.total_power();
        features.extend(band_powers.iter().copied());
        features.extend(band_powers.iter().map(|p| if total > 0.0 { p / total } else { 0.0 }));
        features.push(Self::engagement(&band_powers));
        features.push(zero_crossings(values) as f64);
        features
    }
}
