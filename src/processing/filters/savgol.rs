// src/processing/filters/savgol.rs
//! Savitzky-Golay smoothing with nearest-value edge padding

use ndarray::{Array1, Array2};

use super::FilterError;

/// Smooth `data` with a Savitzky-Golay filter
///
/// Even windows are widened by one sample. Edges are padded by repeating the
/// first and last values, so the output has the same length as the input.
pub fn savgol_filter(data: &[f64], window: usize, poly_order: usize) -> Result<Vec<f64>, FilterError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let window = odd_window(window)?;
    if poly_order >= window {
        return Err(FilterError::InvalidParameters(format!(
            "poly_order {} must be less than window {}",
            poly_order, window
        )));
    }

    if poly_order <= 1 {
        // A linear least-squares fit evaluated at the centre is the window mean
        return Ok(centered_mean(data, window));
    }

    let coefficients = savgol_coefficients(window, poly_order)?;
    let half = window / 2;
    let padded = pad_nearest(data, half);
    Ok((0..data.len())
        .map(|i| {
            padded[i..i + window]
                .iter()
                .zip(coefficients.iter())
                .map(|(x, c)| x * c)
                .sum()
        })
        .collect())
}

/// Smoothing coefficients for the centre point of a window
pub fn savgol_coefficients(window: usize, poly_order: usize) -> Result<Vec<f64>, FilterError> {
    let window = odd_window(window)?;
    let half = (window / 2) as f64;
    let terms = poly_order + 1;

    let mut vandermonde = Array2::<f64>::zeros((window, terms));
    for i in 0..window {
        let x = i as f64 - half;
        for j in 0..terms {
            vandermonde[[i, j]] = x.powi(j as i32);
        }
    }

    let normal = vandermonde.t().dot(&vandermonde);
    let mut rhs = Array1::<f64>::zeros(terms);
    rhs[0] = 1.0;
    let solution = solve_linear(normal, rhs)?;

    Ok(vandermonde.dot(&solution).to_vec())
}

fn odd_window(window: usize) -> Result<usize, FilterError> {
    if window == 0 {
        return Err(FilterError::InvalidParameters("window must be positive".to_string()));
    }
    Ok(if window % 2 == 0 { window + 1 } else { window })
}

fn pad_nearest(data: &[f64], half: usize) -> Vec<f64> {
    let last = data.len() - 1;
    (0..data.len() + 2 * half)
        .map(|k| data[k.saturating_sub(half).min(last)])
        .collect()
}

fn centered_mean(data: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let padded = pad_nearest(data, half);

    let mut prefix = Vec::with_capacity(padded.len() + 1);
    prefix.push(0.0);
    let mut running = 0.0;
    for value in &padded {
        running += value;
        prefix.push(running);
    }

    (0..data.len())
        .map(|i| (prefix[i + window] - prefix[i]) / window as f64)
        .collect()
}

/// Gaussian elimination with partial pivoting
fn solve_linear(mut matrix: Array2<f64>, mut rhs: Array1<f64>) -> Result<Array1<f64>, FilterError> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| matrix[[a, col]].abs().total_cmp(&matrix[[b, col]].abs()))
            .unwrap_or(col);
        if matrix[[pivot, col]].abs() < 1e-12 {
            return Err(FilterError::ProcessingError("singular Savitzky-Golay system".to_string()));
        }
        if pivot != col {
            for k in 0..n {
                matrix.swap([pivot, k], [col, k]);
            }
            rhs.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = matrix[[row, col]] / matrix[[col, col]];
            for k in col..n {
                matrix[[row, k]] -= factor * matrix[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| matrix[[row, k]] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[[row, row]];
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_quadratic_coefficients() {
        // Classic 5-point quadratic smoothing weights: (-3, 12, 17, 12, -3) / 35
        let coefficients = savgol_coefficients(5, 2).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|c| c / 35.0);
        for (c, e) in coefficients.iter().zip(expected.iter()) {
            assert!((c - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_quadratic_preserves_parabola_interior() {
        let data: Vec<f64> = (0..50).map(|i| 0.5 * (i as f64).powi(2) - 3.0 * i as f64).collect();
        let smoothed = savgol_filter(&data, 21, 2).unwrap();
        for i in 10..40 {
            assert!((smoothed[i] - data[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_linear_order_is_window_mean() {
        let data = vec![0.0, 0.0, 3.0, 0.0, 0.0, 0.0];
        let smoothed = savgol_filter(&data, 3, 1).unwrap();
        assert_eq!(smoothed.len(), data.len());
        assert!((smoothed[1] - 1.0).abs() < 1e-12);
        assert!((smoothed[2] - 1.0).abs() < 1e-12);
        assert!((smoothed[3] - 1.0).abs() < 1e-12);
        assert_eq!(smoothed[5], 0.0);
    }

    #[test]
    fn test_even_window_widened() {
        let data = vec![1.0; 10];
        let smoothed = savgol_filter(&data, 4, 1).unwrap();
        assert!(smoothed.iter().all(|x| (x - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_window_longer_than_data() {
        let data = vec![2.0, 4.0];
        let smoothed = savgol_filter(&data, 7, 1).unwrap();
        // Padded sequence: 2,2,2,2,4,4,4,4
        assert!((smoothed[0] - (2.0 * 4.0 + 4.0 * 3.0) / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_order() {
        assert!(savgol_filter(&[1.0, 2.0, 3.0], 3, 3).is_err());
        assert!(savgol_filter(&[1.0], 0, 0).is_err());
    }
}
