//! Mean and covariance (or correlation) matrices of record sources that may
//! not fit in memory.
//!
//! Only one record is resident at a time; the scatter matrix itself is
//! `channels × channels`. Two strategies trade traversals for stability:
//!
//! - [`single_pass`] accumulates raw sums and raw outer products in one
//!   traversal and derives `S = Σxxᵗ/N − x̄x̄ᵗ`. Suited to sources that are
//!   expensive or impossible to re-read, at the cost of cancellation when the
//!   mean is large relative to the spread.
//! - [`double_pass`] computes the exact mean first and then accumulates
//!   residual outer products `Σ(x−x̄)(x−x̄)ᵗ/N`. Requires an order-stable
//!   source that can be read twice.
//!
//! Both normalize by `N`, not `N − 1`.

use tracing::{debug, warn};

use crate::config::{CovarianceStrategy, ScatterKind};
use crate::error::{EofError, Result};
use crate::field::RecordSource;
use crate::matrix::FieldMatrix;
use crate::maybe_par_chunks_mut_enumerate;

/// Mean and scatter matrix of a set of records.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceEstimate {
    /// Per-channel time mean.
    pub mean: Vec<f64>,
    /// Symmetric `channels × channels` covariance or correlation matrix.
    pub scatter: FieldMatrix,
    /// Number of records that entered the estimate.
    pub records: usize,
    pub kind: ScatterKind,
}

/// Build the estimate with the requested strategy.
///
/// # Arguments
/// * `source` - Records to accumulate
/// * `records` - Optional subset of record indices; `None` uses every record,
///   an empty subset fails with [`EofError::EmptyInput`]
/// * `strategy` - Single or double traversal
/// * `kind` - Covariance or correlation matrix
pub fn accumulate<S: RecordSource + ?Sized>(
    source: &S,
    records: Option<&[usize]>,
    strategy: CovarianceStrategy,
    kind: ScatterKind,
) -> Result<CovarianceEstimate> {
    match strategy {
        CovarianceStrategy::SinglePass => single_pass(source, records, kind),
        CovarianceStrategy::DoublePass => double_pass(source, records, kind),
    }
}

fn resolve_records<S: RecordSource + ?Sized>(
    source: &S,
    records: Option<&[usize]>,
) -> Result<Vec<usize>> {
    let list = match records {
        Some(r) => r.to_vec(),
        None => (0..source.len()).collect(),
    };
    if list.is_empty() {
        return Err(EofError::EmptyInput("no records selected for covariance"));
    }
    Ok(list)
}

/// `scatter += a ⊗ b`, parallel over columns.
fn add_outer(scatter: &mut FieldMatrix, a: &[f64], b: &[f64]) {
    let c = a.len();
    if c == 0 {
        return;
    }
    maybe_par_chunks_mut_enumerate!(scatter.as_mut_slice(), c, |(j, col): (usize, &mut [f64])| {
        let bj = b[j];
        for (v, &ai) in col.iter_mut().zip(a) {
            *v += ai * bj;
        }
    });
}

/// One traversal: raw sums and raw outer products.
pub fn single_pass<S: RecordSource + ?Sized>(
    source: &S,
    records: Option<&[usize]>,
    kind: ScatterKind,
) -> Result<CovarianceEstimate> {
    let list = resolve_records(source, records)?;
    let c = source.channels();
    let n = list.len() as f64;

    let mut sum = vec![0.0; c];
    let mut scatter = FieldMatrix::zeros(c, c);
    let mut buf = vec![0.0; c];
    for &i in &list {
        source.read_record(i, &mut buf)?;
        for (s, &x) in sum.iter_mut().zip(&buf) {
            *s += x;
        }
        add_outer(&mut scatter, &buf, &buf);
    }

    let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
    for j in 0..c {
        let col = scatter.column_mut(j);
        for (i, v) in col.iter_mut().enumerate() {
            *v = *v / n - mean[i] * mean[j];
        }
    }
    debug!(records = list.len(), channels = c, "single-pass scatter accumulated");

    finish(mean, scatter, list.len(), kind)
}

/// Two traversals: exact mean, then residual outer products.
pub fn double_pass<S: RecordSource + ?Sized>(
    source: &S,
    records: Option<&[usize]>,
    kind: ScatterKind,
) -> Result<CovarianceEstimate> {
    let list = resolve_records(source, records)?;
    let c = source.channels();
    let n = list.len() as f64;

    let mut buf = vec![0.0; c];
    let mut mean = vec![0.0; c];
    for &i in &list {
        source.read_record(i, &mut buf)?;
        for (m, &x) in mean.iter_mut().zip(&buf) {
            *m += x;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut scatter = FieldMatrix::zeros(c, c);
    for &i in &list {
        source.read_record(i, &mut buf)?;
        for (x, &m) in buf.iter_mut().zip(&mean) {
            *x -= m;
        }
        add_outer(&mut scatter, &buf, &buf);
    }
    scatter.as_mut_slice().iter_mut().for_each(|v| *v /= n);
    debug!(records = list.len(), channels = c, "double-pass scatter accumulated");

    finish(mean, scatter, list.len(), kind)
}

fn finish(
    mean: Vec<f64>,
    mut scatter: FieldMatrix,
    records: usize,
    kind: ScatterKind,
) -> Result<CovarianceEstimate> {
    if kind == ScatterKind::Correlation {
        normalize_correlation(&mut scatter);
    }
    Ok(CovarianceEstimate {
        mean,
        scatter,
        records,
        kind,
    })
}

/// Divide `S[i,j]` by `sqrt(S[i,i]·S[j,j])` in place.
///
/// Zero-variance channels are not guarded: their rows and columns become
/// non-finite. A warning is logged for each such channel.
pub fn normalize_correlation(scatter: &mut FieldMatrix) {
    let c = scatter.nrows();
    let stds: Vec<f64> = (0..c).map(|i| scatter[(i, i)].sqrt()).collect();
    for (i, s) in stds.iter().enumerate() {
        if *s == 0.0 {
            warn!(channel = i, "zero-variance channel in correlation matrix");
        }
    }
    for j in 0..c {
        let col = scatter.column_mut(j);
        for (i, v) in col.iter_mut().enumerate() {
            *v /= stds[i] * stds[j];
        }
    }
}
