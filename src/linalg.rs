//! Dense decompositions backing the EOF solvers.
//!
//! Both routines return factors reordered so that singular values and
//! eigenvalues are non-increasing; callers rely on that ordering for
//! truncation and for the Bartlett test.

use nalgebra::{SymmetricEigen, SVD};

use crate::error::{EofError, Result};
use crate::helpers::descending_order;
use crate::matrix::FieldMatrix;

/// Thin SVD `X = U Σ Vᵗ` with `p = min(nrows, ncols)` components.
#[derive(Debug, Clone)]
pub struct SvdParts {
    /// Left singular vectors, `nrows × p`.
    pub u: FieldMatrix,
    /// Singular values, non-increasing.
    pub singular_values: Vec<f64>,
    /// Right singular vectors as columns, `ncols × p`.
    pub v: FieldMatrix,
}

/// Thin singular value decomposition of `x`.
pub fn thin_svd(x: &FieldMatrix) -> Result<SvdParts> {
    let (n, m) = x.shape();
    if n == 0 || m == 0 {
        return Err(EofError::EmptyInput("matrix passed to SVD"));
    }
    let svd = SVD::new(x.to_dmatrix(), true, true);
    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| EofError::Decomposition("SVD did not return U".into()))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| EofError::Decomposition("SVD did not return Vᵗ".into()))?;

    let sv: Vec<f64> = svd.singular_values.iter().cloned().collect();
    let order = descending_order(&sv);
    let p = sv.len();

    let mut u_out = FieldMatrix::zeros(n, p);
    let mut v_out = FieldMatrix::zeros(m, p);
    for (k, &src) in order.iter().enumerate() {
        for i in 0..n {
            u_out[(i, k)] = u[(i, src)];
        }
        for j in 0..m {
            v_out[(j, k)] = v_t[(src, j)];
        }
    }

    Ok(SvdParts {
        u: u_out,
        singular_values: order.iter().map(|&k| sv[k]).collect(),
        v: v_out,
    })
}

/// Eigenvalues and eigenvectors of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct EigenParts {
    /// Eigenvalues, non-increasing.
    pub values: Vec<f64>,
    /// Orthonormal eigenvectors as columns, matching `values`.
    pub vectors: FieldMatrix,
}

/// Symmetric eigen-decomposition of a square scatter matrix.
pub fn symmetric_eigen(s: &FieldMatrix) -> Result<EigenParts> {
    let (n, m) = s.shape();
    if n != m {
        return Err(EofError::ShapeMismatch {
            expected: vec![n, n],
            found: vec![n, m],
        });
    }
    if n == 0 {
        return Err(EofError::EmptyInput("scatter matrix"));
    }
    let eig = SymmetricEigen::new(s.to_dmatrix());
    let vals: Vec<f64> = eig.eigenvalues.iter().cloned().collect();
    let order = descending_order(&vals);

    let mut vectors = FieldMatrix::zeros(n, n);
    for (k, &src) in order.iter().enumerate() {
        for i in 0..n {
            vectors[(i, k)] = eig.eigenvectors[(i, src)];
        }
    }
    Ok(EigenParts {
        values: order.iter().map(|&k| vals[k]).collect(),
        vectors,
    })
}
