// src/processing/features/complexity.rs
//! Entropy and fractal-dimension measures

use ndarray::Array2;

use super::statistics::mean;

const EMBEDDING_ORDER: usize = 3;
const EMBEDDING_DELAY: usize = 1;
const HIGUCHI_KMAX: usize = 10;

/// Normalised permutation entropy of ordinal patterns of length 3
pub fn permutation_entropy(data: &[f64]) -> f64 {
    let span = (EMBEDDING_ORDER - 1) * EMBEDDING_DELAY;
    if data.len() <= span {
        return 0.0;
    }

    // 3! ordinal patterns, indexed by their rank code
    let mut counts = [0usize; 27];
    for start in 0..data.len() - span {
        let a = data[start];
        let b = data[start + EMBEDDING_DELAY];
        let c = data[start + 2 * EMBEDDING_DELAY];
        let rank = |x: f64| [a, b, c].iter().filter(|&&y| y < x).count();
        counts[rank(a) * 9 + rank(b) * 3 + rank(c)] += 1;
    }

    let total: usize = counts.iter().sum();
    let entropy: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    entropy / (6.0f64).log2()
}

/// Normalised entropy of the singular values of the delay-embedding matrix
pub fn svd_entropy(data: &[f64]) -> f64 {
    let span = (EMBEDDING_ORDER - 1) * EMBEDDING_DELAY;
    if data.len() <= span {
        return 0.0;
    }
    let rows = data.len() - span;

    // Singular values are square roots of the eigenvalues of E^T E
    let mut gram = Array2::<f64>::zeros((EMBEDDING_ORDER, EMBEDDING_ORDER));
    for r in 0..rows {
        for i in 0..EMBEDDING_ORDER {
            for j in i..EMBEDDING_ORDER {
                gram[[i, j]] += data[r + i * EMBEDDING_DELAY] * data[r + j * EMBEDDING_DELAY];
            }
        }
    }
    for i in 0..EMBEDDING_ORDER {
        for j in 0..i {
            gram[[i, j]] = gram[[j, i]];
        }
    }

    let singular: Vec<f64> = symmetric_eigenvalues(gram)
        .into_iter()
        .map(|ev| ev.max(0.0).sqrt())
        .collect();
    let total: f64 = singular.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let entropy: f64 = singular
        .iter()
        .map(|s| s / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    entropy / (EMBEDDING_ORDER as f64).log2()
}

/// Cyclic Jacobi rotations; returns the diagonal after convergence
fn symmetric_eigenvalues(mut matrix: Array2<f64>) -> Vec<f64> {
    let n = matrix.nrows();
    for _sweep in 0..64 {
        let off_diagonal: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| matrix[[i, j]].powi(2))
            .sum();
        if off_diagonal < 1e-22 {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                let apq = matrix[[p, q]];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let theta = (matrix[[q, q]] - matrix[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let t = if theta == 0.0 { 1.0 } else { t };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let akp = matrix[[k, p]];
                    let akq = matrix[[k, q]];
                    matrix[[k, p]] = c * akp - s * akq;
                    matrix[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = matrix[[p, k]];
                    let aqk = matrix[[q, k]];
                    matrix[[p, k]] = c * apk - s * aqk;
                    matrix[[q, k]] = s * apk + c * aqk;
                }
            }
        }
    }
    (0..n).map(|i| matrix[[i, i]]).collect()
}

/// Petrosian fractal dimension
pub fn petrosian_fd(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if data.len() < 3 {
        return 0.0;
    }
    let diffs: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    let sign_changes = diffs.windows(2).filter(|w| w[0] * w[1] < 0.0).count() as f64;
    let log_n = n.log10();
    log_n / (log_n + (n / (n + 0.4 * sign_changes)).log10())
}

/// Katz fractal dimension
pub fn katz_fd(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let distances: Vec<f64> = data.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let length: f64 = distances.iter().sum();
    let average = mean(&distances);
    let extent = data[1..].iter().map(|x| (x - data[0]).abs()).fold(0.0, f64::max);
    if length <= 0.0 || average <= 0.0 || extent <= 0.0 {
        return 0.0;
    }
    let ln = (length / average).log10();
    ln / (ln + (extent / length).log10())
}

/// Higuchi fractal dimension with `kmax = 10`
pub fn higuchi_fd(data: &[f64]) -> f64 {
    let n = data.len();
    let kmax = HIGUCHI_KMAX.min(n / 2);
    if kmax < 2 {
        return 0.0;
    }

    let mut log_k = Vec::with_capacity(kmax);
    let mut log_length = Vec::with_capacity(kmax);
    for k in 1..=kmax {
        let mut total = 0.0;
        for m in 0..k {
            let steps = (n - m - 1) / k;
            if steps == 0 {
                continue;
            }
            let curve: f64 = (1..=steps).map(|i| (data[m + i * k] - data[m + (i - 1) * k]).abs()).sum();
            total += curve * (n - 1) as f64 / (steps * k) as f64 / k as f64;
        }
        let average = total / k as f64;
        if average > 0.0 {
            log_k.push((1.0 / k as f64).ln());
            log_length.push(average.ln());
        }
    }

    if log_k.len() < 2 {
        return 0.0;
    }
    super::statistics::linear_fit(&log_k, &log_length).0
}

/// Normalised Lempel-Ziv complexity of the signal binarised at its median
pub fn lempel_ziv_complexity(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = if n % 2 == 0 {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    } else {
        sorted[n / 2]
    };
    let bits: Vec<bool> = data.iter().map(|&x| x > median).collect();

    // Kaspar-Schuster counting of distinct substrings
    let (mut i, mut k, mut l) = (0usize, 1usize, 1usize);
    let mut k_max = 1usize;
    let mut complexity = 1usize;
    loop {
        if bits[i + k - 1] == bits[l + k - 1] {
            k += 1;
            if l + k > n {
                complexity += 1;
                break;
            }
        } else {
            k_max = k_max.max(k);
            i += 1;
            if i == l {
                complexity += 1;
                l += k_max;
                if l + 1 > n {
                    break;
                }
                i = 0;
                k = 1;
                k_max = 1;
            } else {
                k = 1;
            }
        }
    }

    complexity as f64 * (n as f64).log2() / n as f64
}
