// src/processing/features/spectral.rs
//! Power spectral density and spectrum-derived features

use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

use super::statistics::{trapezoid, variance};
use crate::processing::artifact::gradient;

/// One-sided power spectral density
#[derive(Debug, Clone, Default)]
pub struct PowerSpectrum {
    pub frequencies: Vec<f64>,
    pub density: Vec<f64>,
}

/// Welch PSD estimate with a Hann window and 50% overlap
///
/// Segment length is `min(4 s, len(data))`. Each segment has its mean removed
/// before windowing; the result uses density scaling.
pub fn welch(data: &[f64], sampling_freq: f64) -> PowerSpectrum {
    let n = data.len();
    if n < 2 || sampling_freq <= 0.0 {
        return PowerSpectrum::default();
    }

    let nperseg = ((4.0 * sampling_freq) as usize).clamp(2, n);
    let step = (nperseg - nperseg / 2).max(1);

    let window: Vec<f64> = (0..nperseg)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / nperseg as f64).cos())
        .collect();
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sampling_freq * window_power);

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);

    let bins = nperseg / 2 + 1;
    let mut density = vec![0.0; bins];
    let mut segments = 0usize;
    let mut buffer = vec![Complex::new(0.0, 0.0); nperseg];

    let mut start = 0;
    while start + nperseg <= n {
        let segment = &data[start..start + nperseg];
        let segment_mean = segment.iter().sum::<f64>() / nperseg as f64;
        for (slot, (x, w)) in buffer.iter_mut().zip(segment.iter().zip(window.iter())) {
            *slot = Complex::new((x - segment_mean) * w, 0.0);
        }
        fft.process(&mut buffer);

        for (k, value) in density.iter_mut().enumerate() {
            let mut p = buffer[k].norm_sqr() * scale;
            let is_nyquist = nperseg % 2 == 0 && k == bins - 1;
            if k != 0 && !is_nyquist {
                p *= 2.0;
            }
            *value += p;
        }
        segments += 1;
        start += step;
    }

    if segments > 0 {
        for value in &mut density {
            *value /= segments as f64;
        }
    }

    let resolution = sampling_freq / nperseg as f64;
    PowerSpectrum {
        frequencies: (0..bins).map(|k| k as f64 * resolution).collect(),
        density,
    }
}

impl PowerSpectrum {
    /// Integrated power between `low` and `high` Hz inclusive
    pub fn band_power(&self, low: f64, high: f64) -> f64 {
        let (freqs, powers): (Vec<f64>, Vec<f64>) = self
            .frequencies
            .iter()
            .zip(self.density.iter())
            .filter(|(f, _)| **f >= low && **f <= high)
            .map(|(f, p)| (*f, *p))
            .unzip();
        trapezoid(&freqs, &powers)
    }

    pub fn total_power(&self) -> f64 {
        trapezoid(&self.frequencies, &self.density)
    }

    /// Shannon entropy of the normalised spectrum, scaled to [0, 1]
    pub fn spectral_entropy(&self) -> f64 {
        let total: f64 = self.density.iter().sum();
        if total <= 0.0 || self.density.len() < 2 {
            return 0.0;
        }
        let entropy: f64 = self
            .density
            .iter()
            .map(|p| p / total)
            .filter(|&p| p > 0.0)
            .map(|p| -p * p.log2())
            .sum();
        entropy / (self.density.len() as f64).log2()
    }

    /// Hjorth descriptors computed from spectral moments
    pub fn hjorth(&self) -> HjorthParameters {
        let m0: f64 = self.density.iter().sum();
        let m2: f64 = self.frequencies.iter().zip(&self.density).map(|(f, p)| f * f * p).sum();
        let m4: f64 = self.frequencies.iter().zip(&self.density).map(|(f, p)| f.powi(4) * p).sum();
        HjorthParameters::from_variances(m0, m2, m4)
    }
}

/// Activity, mobility and complexity plus the derivative variances they use
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HjorthParameters {
    pub activity: f64,
    pub mobility: f64,
    pub complexity: f64,
    pub first_derivative_variance: f64,
    pub second_derivative_variance: f64,
}

impl HjorthParameters {
    fn from_variances(signal: f64, first: f64, second: f64) -> Self {
        let mobility = if signal > 0.0 { (first / signal).sqrt() } else { 0.0 };
        let first_mobility = if first > 0.0 { (second / first).sqrt() } else { 0.0 };
        let complexity = if mobility > 0.0 { first_mobility / mobility } else { 0.0 };
        Self {
            activity: signal,
            mobility,
            complexity,
            first_derivative_variance: first,
            second_derivative_variance: second,
        }
    }

    /// Time-domain Hjorth parameters using time-aware derivatives
    pub fn from_signal(times: &[f64], values: &[f64]) -> Self {
        let first = gradient(times, values);
        let second = gradient(times, &first);
        Self::from_variances(variance(values, 0), variance(&first, 0), variance(&second, 0))
    }

    pub fn to_vec(self) -> Vec<f64> {
        vec![
            self.activity,
            self.mobility,
            self.complexity,
            self.first_derivative_variance,
            self.second_derivative_variance,
        ]
    }
}
