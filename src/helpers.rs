//! Small numerical helpers shared by the solvers and tests.

use std::cmp::Ordering;

/// Small epsilon for numerical comparisons.
pub const NUMERICAL_EPS: f64 = 1e-10;

/// Cumulative variance fraction used when no truncation is configured.
pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 0.7;

/// Dot product of two equally long slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Congruence coefficient `a·b / sqrt((a·a)(b·b))`.
///
/// Scale invariant and signed. Returns NaN if either vector is all zeros.
pub fn congruence(a: &[f64], b: &[f64]) -> f64 {
    dot(a, b) / (dot(a, a) * dot(b, b)).sqrt()
}

/// Total order on `f64` with every NaN ranked after all numbers.
fn cmp_nan_last(a: f64, b: f64, descending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if descending => b.total_cmp(&a),
        (false, false) => a.total_cmp(&b),
    }
}

/// Indices that sort `values` in non-increasing order (stable). NaNs go last.
pub fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| cmp_nan_last(values[a], values[b], true));
    idx
}

/// Indices that sort `values` in non-decreasing order (stable). NaNs go last.
pub fn ascending_order(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| cmp_nan_last(values[a], values[b], false));
    idx
}

/// Fraction of the total variance carried by each eigenvalue.
pub fn variance_fraction(lambdas: &[f64]) -> Vec<f64> {
    let total: f64 = lambdas.iter().sum();
    lambdas.iter().map(|&l| l / total).collect()
}

/// Smallest number of leading modes whose cumulative variance fraction
/// reaches `threshold`. Always at least 1 and at most `lambdas.len()`.
///
/// # Arguments
/// * `lambdas` - Eigenvalues in non-increasing order
/// * `threshold` - Target fraction in (0, 1]
pub fn leading_modes_for_variance(lambdas: &[f64], threshold: f64) -> usize {
    let fractions = variance_fraction(lambdas);
    let mut acc = 0.0;
    for (k, f) in fractions.iter().enumerate() {
        acc += f;
        if acc >= threshold - NUMERICAL_EPS {
            return k + 1;
        }
    }
    lambdas.len().max(1)
}
