//! Sampling-error estimates and significance tests for EOF eigenvalues and
//! patterns.
//!
//! - [`north_test`]: North et al. (1982) rule-of-thumb eigenvalue errors.
//! - [`bartlett_test`]: chi-square test of equality of trailing eigenvalues.
//! - [`monte_carlo_congruence`]: subsample EOFs compared against the full
//!   sample EOFs through the congruence coefficient.

use rand::prelude::*;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::debug;

use crate::error::{EofError, Result};
use crate::helpers::congruence;
use crate::iter_maybe_parallel;
use crate::matrix::FieldMatrix;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// North's sampling error for each eigenvalue: `λ · sqrt(2 / records)`.
pub fn north_test(lambdas: &[f64], records: usize) -> Vec<f64> {
    let factor = (2.0 / records as f64).sqrt();
    lambdas.iter().map(|l| l * factor).collect()
}

/// Result of the Bartlett test, one entry per truncation `k = 0..p-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BartlettResult {
    /// Chi-square statistic for the equality of eigenvalues `k..p`.
    pub chi: Vec<f64>,
    /// Upper-tail probability of `chi`.
    pub prob: Vec<f64>,
}

/// Upper-tail probability of a chi-square statistic.
///
/// An invalid distribution or a non-finite result maps to probability 0.
pub fn chi_square_upper_tail(chi: f64, dof: f64) -> f64 {
    match ChiSquared::new(dof) {
        Ok(dist) => {
            let p = dist.sf(chi);
            if p.is_finite() {
                p
            } else {
                0.0
            }
        }
        Err(_) => 0.0,
    }
}

/// Bartlett test on the equality of the trailing eigenvalues.
///
/// For each `k` the `q = p − k` trailing eigenvalues are tested with
///
/// `chi = ν · (q · ln(Σλ_j / q) − Σ ln λ_j)`, `ν = records − 1`,
///
/// distributed as chi-square with `(q − 1)(q + 2)/2` degrees of freedom.
/// Non-positive eigenvalues enter the sums as 1 and their own index reports
/// `chi = 0`, `prob = 1`.
///
/// # Arguments
/// * `lambdas` - Eigenvalues in non-increasing order
/// * `records` - Number of records behind the eigenvalues
pub fn bartlett_test(lambdas: &[f64], records: usize) -> BartlettResult {
    let p = lambdas.len();
    if p < 2 {
        return BartlettResult {
            chi: Vec::new(),
            prob: Vec::new(),
        };
    }
    let nu = records as f64 - 1.0;
    let masked: Vec<f64> = lambdas
        .iter()
        .map(|&l| if l <= 0.0 { 1.0 } else { l })
        .collect();
    let logs: Vec<f64> = masked.iter().map(|l| l.ln()).collect();

    let mut chi = vec![0.0; p - 1];
    let mut prob = vec![0.0; p - 1];
    for k in 0..p - 1 {
        if lambdas[k] <= 0.0 {
            chi[k] = 0.0;
            prob[k] = 1.0;
            continue;
        }
        let q = (p - k) as f64;
        let dof = 0.5 * (q - 1.0) * (q + 2.0);
        let mean_tail = masked[k..].iter().sum::<f64>() / q;
        let log_sum: f64 = logs[k..].iter().sum();
        chi[k] = nu * (q * mean_tail.ln() - log_sum);
        prob[k] = chi_square_upper_tail(chi[k], dof);
    }
    BartlettResult { chi, prob }
}

/// Draw `length` distinct record indices out of `records`, ascending.
pub fn random_subsample<R: Rng + ?Sized>(
    length: usize,
    records: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    if length < 2 || length > records {
        return Err(EofError::InvalidSubsample { length, records });
    }
    let mut idx = rand::seq::index::sample(rng, records, length).into_vec();
    idx.sort_unstable();
    Ok(idx)
}

/// Monte-Carlo congruence between subsample EOFs and reference EOFs.
///
/// Subsample `b` is drawn with `StdRng::seed_from_u64(seed + b)`, so the
/// output does not depend on whether subsamples run in parallel.
///
/// # Arguments
/// * `reference` - Reference EOFs as columns (`channels × neofs`)
/// * `records` - Records in the full sample
/// * `subsamples` - Number of subsamples
/// * `length` - Records per subsample
/// * `seed` - Base seed
/// * `decompose` - Leading EOFs (`channels × ≥neofs`) of the given record subset
///
/// # Returns
/// `subsamples × neofs` matrix of absolute congruence coefficients.
pub fn monte_carlo_congruence<F>(
    reference: &FieldMatrix,
    records: usize,
    subsamples: usize,
    length: usize,
    seed: u64,
    decompose: F,
) -> Result<FieldMatrix>
where
    F: Fn(&[usize]) -> Result<FieldMatrix> + Sync + Send,
{
    if length < 2 || length > records {
        return Err(EofError::InvalidSubsample { length, records });
    }
    let neofs = reference.ncols();
    debug!(subsamples, length, neofs, "Monte-Carlo congruence test");

    let rows: Vec<Vec<f64>> = iter_maybe_parallel!(0..subsamples)
        .map(|b| -> Result<Vec<f64>> {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(b as u64));
            let idx = random_subsample(length, records, &mut rng)?;
            let eofs = decompose(&idx)?;
            if eofs.ncols() < neofs || eofs.nrows() != reference.nrows() {
                return Err(EofError::InvalidSubsample { length, records });
            }
            Ok((0..neofs)
                .map(|k| congruence(eofs.column(k), reference.column(k)).abs())
                .collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let mut out = FieldMatrix::zeros(subsamples, neofs);
    for (b, row) in rows.iter().enumerate() {
        for (k, &v) in row.iter().enumerate() {
            out[(b, k)] = v;
        }
    }
    Ok(out)
}
