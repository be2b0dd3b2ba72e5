// src/processing/artifact.rs
//! Artifact flagging and good-indices masks
//!
//! A mask is built in two steps: samples are flagged by a signal-specific
//! rule, then the flags are smoothed so that short valid runs squeezed
//! between flagged samples are discarded along with them.

use crate::config::constants::artifact::BROADENING_POLY_ORDER;
use crate::processing::filters::{savgol_filter, FilterError};

/// Derivative of `values` with respect to `times`
///
/// Second-order accurate for interior points on a non-uniform grid,
/// one-sided differences at both edges.
pub fn gradient(times: &[f64], values: &[f64]) -> Vec<f64> {
    let n = values.len().min(times.len());
    if n < 2 {
        return vec![0.0; n];
    }

    let mut grad = Vec::with_capacity(n);
    grad.push(safe_div(values[1] - values[0], times[1] - times[0]));
    for i in 1..n - 1 {
        let hd = times[i] - times[i - 1];
        let hs = times[i + 1] - times[i];
        let numerator = hd * hd * values[i + 1] - hs * hs * values[i - 1] + (hs * hs - hd * hd) * values[i];
        grad.push(safe_div(numerator, hs * hd * (hd + hs)));
    }
    grad.push(safe_div(values[n - 1] - values[n - 2], times[n - 1] - times[n - 2]));
    grad
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 { 0.0 } else { numerator / denominator }
}

/// Flag samples outside `[low, high]`
pub fn flag_out_of_range(values: &[f64], low: f64, high: f64) -> Vec<f64> {
    values
        .iter()
        .map(|&v| if v < low || v > high || v.is_nan() { 1.0 } else { 0.0 })
        .collect()
}

/// Flag samples whose absolute local derivative exceeds `threshold`
pub fn flag_steep_derivative(times: &[f64], values: &[f64], threshold: f64) -> Vec<f64> {
    gradient(times, values)
        .into_iter()
        .map(|g| if g.abs() > threshold || g.is_nan() { 1.0 } else { 0.0 })
        .collect()
}

/// Smooth flags over `window` samples; samples whose smoothed flag reaches
/// `tolerance` are dropped from the returned mask
pub fn broaden_flags(flags: &[f64], window: usize, tolerance: f64) -> Result<Vec<bool>, FilterError> {
    if flags.iter().all(|&f| f == 0.0) {
        return Ok(vec![true; flags.len()]);
    }
    let broadened = savgol_filter(flags, window, BROADENING_POLY_ORDER)?;
    Ok(broadened.into_iter().map(|b| b < tolerance).collect())
}

/// Collect the entries of `values` kept by `mask`
pub fn compact(values: &[f64], mask: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(mask.iter())
        .filter_map(|(&v, &keep)| keep.then_some(v))
        .collect()
}

/// Write `compacted` back into the kept positions of `values`
pub fn scatter(values: &mut [f64], mask: &[bool], compacted: &[f64]) {
    let kept_positions = mask.iter().enumerate().filter_map(|(i, &keep)| keep.then_some(i));
    for (position, &value) in kept_positions.zip(compacted.iter()) {
        values[position] = value;
    }
}
