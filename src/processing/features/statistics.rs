// src/processing/features/statistics.rs
//! Time-domain statistics over one feature window

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Variance with `ddof` delta degrees of freedom
pub fn variance(data: &[f64], ddof: usize) -> f64 {
    if data.len() <= ddof {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - ddof) as f64
}

/// Sample standard deviation
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data, 1).sqrt()
}

fn central_moment(data: &[f64], m: f64, order: i32) -> f64 {
    data.iter().map(|x| (x - m).powi(order)).sum::<f64>() / data.len() as f64
}

/// Bias-corrected sample skewness
pub fn skewness(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if data.len() < 3 {
        return 0.0;
    }
    let m = mean(data);
    let m2 = central_moment(data, m, 2);
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    let g1 = central_moment(data, m, 3) / m2.powf(1.5);
    (n * (n - 1.0)).sqrt() / (n - 2.0) * g1
}

/// Bias-corrected excess (Fisher) kurtosis
pub fn kurtosis(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if data.len() < 4 {
        return 0.0;
    }
    let m = mean(data);
    let m2 = central_moment(data, m, 2);
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    let g2 = central_moment(data, m, 4) / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

/// Shannon entropy (nats) of the magnitudes, normalised to a distribution
pub fn shannon_entropy(data: &[f64]) -> f64 {
    let total: f64 = data.iter().map(|x| x.abs()).sum();
    if total <= 0.0 {
        return 0.0;
    }
    data.iter()
        .map(|x| x.abs() / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Trapezoidal integral of `values` over `times`
pub fn trapezoid(times: &[f64], values: &[f64]) -> f64 {
    times
        .windows(2)
        .zip(values.windows(2))
        .map(|(t, v)| 0.5 * (t[1] - t[0]) * (v[0] + v[1]))
        .sum()
}

/// Least-squares line through the points, as `(slope, intercept)`
pub fn linear_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean_x = mean(&x[..n]);
    let mean_y = mean(&y[..n]);
    let sxx: f64 = x[..n].iter().map(|xi| (xi - mean_x).powi(2)).sum();
    if sxx <= f64::EPSILON {
        return (0.0, mean_y);
    }
    let sxy: f64 = x[..n].iter().zip(&y[..n]).map(|(xi, yi)| (xi - mean_x) * (yi - mean_y)).sum();
    let slope = sxy / sxx;
    (slope, mean_y - slope * mean_x)
}

/// Mean absolute sample-to-sample difference
pub fn mean_abs_diff(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    data.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (data.len() - 1) as f64
}

/// Mean squared sample-to-sample difference
pub fn mean_squared_diff(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    data.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Mean of the squared samples
pub fn power(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64
}

/// Sign changes of the mean-removed signal
pub fn zero_crossings(data: &[f64]) -> usize {
    let m = mean(data);
    data.windows(2)
        .filter(|w| ((w[0] - m) >= 0.0) != ((w[1] - m) >= 0.0))
        .count()
}

/// Times relative to the first sample, which keeps fits well-conditioned
pub fn relative_times(times: &[f64]) -> Vec<f64> {
    match times.first() {
        Some(&start) => times.iter().map(|t| t - start).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments_of_known_sample() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&data) - 5.0).abs() < 1e-12);
        assert!((variance(&data, 0) - 4.0).abs() < 1e-12);
        assert!((std_dev(&data) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_data_has_zero_skew() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(skewness(&data).abs() < 1e-12);
        // Bias-corrected excess kurtosis of a uniform 5-point grid
        assert!((kurtosis(&data) + 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_constant_data_is_degenerate_not_nan() {
        let data = [3.0; 10];
        assert_eq!(skewness(&data), 0.0);
        assert_eq!(kurtosis(&data), 0.0);
        assert_eq!(std_dev(&data), 0.0);
    }

    #[test]
    fn test_entropy_of_uniform_distribution() {
        let data = [1.0; 8];
        assert!((shannon_entropy(&data) - (8.0f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_recovers_line() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|xi| 3.0 * xi - 1.5).collect();
        let (slope, intercept) = linear_fit(&x, &y);
        assert!((slope - 3.0).abs() < 1e-9);
        assert!((intercept + 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_trapezoid_and_crossings() {
        let t = [0.0, 1.0, 2.0];
        assert!((trapezoid(&t, &[0.0, 2.0, 0.0]) - 2.0).abs() < 1e-12);
        assert_eq!(zero_crossings(&[1.0, -1.0, 1.0, -1.0]), 3);
    }
}
