//! Column-major matrix used for every flattened quantity in the crate.
//!
//! [`FieldMatrix`] carries its dimensions alongside a flat column-major
//! buffer. Depending on context the rows are records (time steps) and the
//! columns channels, or the rows are channels and the columns modes.

use nalgebra::DMatrix;

/// Column-major dense matrix.
///
/// Element `(row, col)` lives at index `row + col * nrows`, which matches
/// nalgebra's storage so conversions are plain copies. Columns are
/// contiguous: a single EOF (a channel vector) or a single PC series can be
/// borrowed without copying.
///
/// # Examples
///
/// ```
/// use climate_eof::matrix::FieldMatrix;
///
/// // 2 records, 3 channels
/// let mat = FieldMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
/// assert_eq!(mat[(1, 0)], 4.0);
/// assert_eq!(mat.column(2), &[3.0, 6.0]);
/// assert_eq!(mat.row(0), vec![1.0, 2.0, 3.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatrix {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl FieldMatrix {
    /// Create from flat column-major data.
    ///
    /// Returns `None` if `data.len() != nrows * ncols`.
    pub fn from_column_major(data: Vec<f64>, nrows: usize, ncols: usize) -> Option<Self> {
        if data.len() != nrows * ncols {
            return None;
        }
        Some(Self { data, nrows, ncols })
    }

    /// Create from equally long rows.
    ///
    /// Returns `None` for ragged input.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != ncols) {
            return None;
        }
        let mut mat = Self::zeros(nrows, ncols);
        for (i, r) in rows.iter().enumerate() {
            for (j, &v) in r.iter().enumerate() {
                mat[(i, j)] = v;
            }
        }
        Some(mat)
    }

    /// Create a zero-filled matrix.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![0.0; nrows * ncols],
            nrows,
            ncols,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Dimensions as `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Contiguous column slice.
    ///
    /// # Panics
    /// Panics if `col >= ncols`.
    #[inline]
    pub fn column(&self, col: usize) -> &[f64] {
        let start = col * self.nrows;
        &self.data[start..start + self.nrows]
    }

    /// Mutable contiguous column slice.
    ///
    /// # Panics
    /// Panics if `col >= ncols`.
    #[inline]
    pub fn column_mut(&mut self, col: usize) -> &mut [f64] {
        let start = col * self.nrows;
        &mut self.data[start..start + self.nrows]
    }

    /// Copy of a single row. O(ncols), rows are strided.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.ncols)
            .map(|j| self.data[row + j * self.nrows])
            .collect()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Copy into a nalgebra `DMatrix<f64>`.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.nrows, self.ncols, &self.data)
    }

    /// Copy out of a nalgebra `DMatrix<f64>`.
    pub fn from_dmatrix(mat: &DMatrix<f64>) -> Self {
        let (nrows, ncols) = mat.shape();
        Self {
            data: mat.as_slice().to_vec(),
            nrows,
            ncols,
        }
    }

    /// The first `k` columns (clamped to `ncols`). Zero-copy in spirit:
    /// leading columns form a prefix of the column-major buffer.
    pub fn leading_columns(&self, k: usize) -> FieldMatrix {
        let k = k.min(self.ncols);
        Self {
            data: self.data[..k * self.nrows].to_vec(),
            nrows: self.nrows,
            ncols: k,
        }
    }

    pub fn transpose(&self) -> FieldMatrix {
        let mut out = FieldMatrix::zeros(self.ncols, self.nrows);
        for j in 0..self.ncols {
            for i in 0..self.nrows {
                out[(j, i)] = self[(i, j)];
            }
        }
        out
    }

    /// Matrix product `self * rhs`, or `None` when inner dimensions differ.
    pub fn matmul(&self, rhs: &FieldMatrix) -> Option<FieldMatrix> {
        if self.ncols != rhs.nrows {
            return None;
        }
        Some(Self::from_dmatrix(&(self.to_dmatrix() * rhs.to_dmatrix())))
    }

    /// Matrix product `self * rhsᵀ`, or `None` when column counts differ.
    pub fn matmul_transposed(&self, rhs: &FieldMatrix) -> Option<FieldMatrix> {
        if self.ncols != rhs.ncols {
            return None;
        }
        Some(Self::from_dmatrix(
            &(self.to_dmatrix() * rhs.to_dmatrix().transpose()),
        ))
    }

    /// Arithmetic mean of every column.
    pub fn column_means(&self) -> Vec<f64> {
        let n = self.nrows.max(1) as f64;
        (0..self.ncols)
            .map(|j| self.column(j).iter().sum::<f64>() / n)
            .collect()
    }

    /// Multiply every column `j` by `factors[j]`.
    pub fn scale_columns(&self, factors: &[f64]) -> FieldMatrix {
        let mut out = self.clone();
        for (j, &f) in factors.iter().enumerate().take(self.ncols) {
            out.column_mut(j).iter_mut().for_each(|v| *v *= f);
        }
        out
    }
}

impl std::ops::Index<(usize, usize)> for FieldMatrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "FieldMatrix index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &self.data[row + col * self.nrows]
    }
}

impl std::ops::IndexMut<(usize, usize)> for FieldMatrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "FieldMatrix index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &mut self.data[row + col * self.nrows]
    }
}

impl std::fmt::Display for FieldMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldMatrix({}x{})", self.nrows, self.ncols)
    }
}
