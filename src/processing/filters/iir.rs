// src/processing/filters/iir.rs
//! IIR (Infinite Impulse Response) digital filters

use std::f64::consts::PI;

use super::{BandType, BiquadCoefficients, FilterError};
use crate::config::constants::filters::{MAX_FILTER_ORDER, MIN_FILTER_ORDER};

/// Butterworth filter realised as a cascade of biquad sections
///
/// Each section runs in Direct Form II Transposed. Odd orders end with a
/// first-order section stored as a biquad with `b2 == a2 == 0`.
#[derive(Debug, Clone)]
pub struct IirFilter {
    sections: Vec<BiquadCoefficients>,
    state: Vec<[f64; 2]>,
    order: usize,
}

impl IirFilter {
    /// Create Butterworth filter
    pub fn butterworth(
        order: usize,
        cutoff: f64,
        sample_rate: f64,
        band_type: BandType,
    ) -> Result<Self, FilterError> {
        if !(MIN_FILTER_ORDER..=MAX_FILTER_ORDER).contains(&order) {
            return Err(FilterError::InvalidParameters(format!(
                "Order must be {}-{}, got {}",
                MIN_FILTER_ORDER, MAX_FILTER_ORDER, order
            )));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(FilterError::InvalidParameters(format!("Invalid sample rate {}", sample_rate)));
        }
        if !(cutoff > 0.0 && cutoff < sample_rate / 2.0) {
            return Err(FilterError::InvalidParameters(format!(
                "Cutoff {} Hz outside (0, {}) Hz",
                cutoff,
                sample_rate / 2.0
            )));
        }

        // Pre-warp frequency for bilinear transform
        let k = (PI * cutoff / sample_rate).tan();

        let mut sections = Vec::with_capacity((order + 1) / 2);
        for pair in 0..order / 2 {
            // Angle of the analog pole pair measured from the negative real axis
            let angle = PI * (order - 2 * pair - 1) as f64 / (2 * order) as f64;
            let q = 1.0 / (2.0 * angle.cos());
            sections.push(Self::second_order_section(k, q, band_type));
        }
        if order % 2 == 1 {
            sections.push(Self::first_order_section(k, band_type));
        }

        Ok(Self {
            state: vec![[0.0; 2]; sections.len()],
            sections,
            order,
        })
    }

    fn second_order_section(k: f64, q: f64, band_type: BandType) -> BiquadCoefficients {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        let a1 = 2.0 * (k2 - 1.0) * norm;
        let a2 = (1.0 - k / q + k2) * norm;
        match band_type {
            BandType::Lowpass => BiquadCoefficients {
                b0: k2 * norm,
                b1: 2.0 * k2 * norm,
                b2: k2 * norm,
                a1,
                a2,
            },
            BandType::Highpass => BiquadCoefficients {
                b0: norm,
                b1: -2.0 * norm,
                b2: norm,
                a1,
                a2,
            },
        }
    }

    fn first_order_section(k: f64, band_type: BandType) -> BiquadCoefficients {
        let norm = 1.0 / (1.0 + k);
        let a1 = (k - 1.0) * norm;
        match band_type {
            BandType::Lowpass => BiquadCoefficients { b0: k * norm, b1: k * norm, b2: 0.0, a1, a2: 0.0 },
            BandType::Highpass => BiquadCoefficients { b0: norm, b1: -norm, b2: 0.0, a1, a2: 0.0 },
        }
    }

    /// Process single sample through every section
    pub fn process_sample(&mut self, input: f64) -> f64 {
        let mut x = input;
        for (coeffs, z) in self.sections.iter().zip(self.state.iter_mut()) {
            let y = coeffs.b0 * x + z[0];
            z[0] = coeffs.b1 * x - coeffs.a1 * y + z[1];
            z[1] = coeffs.b2 * x - coeffs.a2 * y;
            x = y;
        }
        x
    }

    /// Put every section in the steady state reached by a constant `input`
    pub fn prime(&mut self, input: f64) {
        let mut x = input;
        for (coeffs, z) in self.sections.iter().zip(self.state.iter_mut()) {
            let y = coeffs.dc_gain() * x;
            z[1] = coeffs.b2 * x - coeffs.a2 * y;
            z[0] = y - coeffs.b0 * x;
            x = y;
        }
    }

    /// Filter a whole slice starting from zero state
    pub fn filter(&mut self, data: &[f64]) -> Vec<f64> {
        self.reset();
        data.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Filter a whole slice starting from the steady state of its first sample
    pub fn filter_primed(&mut self, data: &[f64]) -> Vec<f64> {
        match data.first() {
            Some(&first) => {
                self.prime(first);
                data.iter().map(|&x| self.process_sample(x)).collect()
            }
            None => Vec::new(),
        }
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        for z in &mut self.state {
            *z = [0.0; 2];
        }
    }

    /// Get filter order
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn sections(&self) -> &[BiquadCoefficients] {
        &self.sections
    }
}
