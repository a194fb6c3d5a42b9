//! Fields of records over an N-dimensional grid, and the reshaping between
//! those fields and the flat `(records × channels)` matrices the solvers use.
//!
//! A [`Field`] stores records contiguously, each record in row-major order
//! over its grid. [`flatten`] turns it into a [`FieldMatrix`] with records as
//! rows and grid points ("channels") as columns; [`restore`] is its exact
//! inverse. Per-channel results with a trailing mode axis (EOFs, correlation
//! maps) are restored with [`restore_modes`] into [`Patterns`], whose
//! generalized columns [`Patterns::mode`] recover one spatial map per mode.

use crate::error::{EofError, Result};
use crate::matrix::FieldMatrix;

/// Number of channels of a grid (product of its dimensions).
#[inline]
pub fn grid_channels(grid: &[usize]) -> usize {
    grid.iter().product()
}

/// Sequence of equally shaped records over a fixed grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    grid: Vec<usize>,
    records: usize,
    data: Vec<f64>,
}

impl Field {
    /// Build from record-major data: record `i` occupies
    /// `data[i * channels..(i + 1) * channels]`.
    pub fn new(data: Vec<f64>, records: usize, grid: &[usize]) -> Result<Self> {
        let channels = grid_channels(grid);
        if data.len() != records * channels {
            return Err(EofError::ShapeMismatch {
                expected: with_leading(records, grid),
                found: vec![data.len()],
            });
        }
        Ok(Self {
            grid: grid.to_vec(),
            records,
            data,
        })
    }

    /// Build from a list of flattened records sharing `grid`.
    pub fn from_records(records: &[Vec<f64>], grid: &[usize]) -> Result<Self> {
        let channels = grid_channels(grid);
        let mut data = Vec::with_capacity(records.len() * channels);
        for rec in records {
            if rec.len() != channels {
                return Err(EofError::ShapeMismatch {
                    expected: grid.to_vec(),
                    found: vec![rec.len()],
                });
            }
            data.extend_from_slice(rec);
        }
        Ok(Self {
            grid: grid.to_vec(),
            records: records.len(),
            data,
        })
    }

    /// Number of records (leading axis).
    #[inline]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Spatial grid shared by every record.
    #[inline]
    pub fn grid(&self) -> &[usize] {
        &self.grid
    }

    #[inline]
    pub fn channels(&self) -> usize {
        grid_channels(&self.grid)
    }

    /// Full shape: `[records, grid...]`.
    pub fn shape(&self) -> Vec<usize> {
        with_leading(self.records, &self.grid)
    }

    /// Borrow record `i` as a flat slice.
    ///
    /// # Panics
    /// Panics if `i >= records`.
    #[inline]
    pub fn record(&self, i: usize) -> &[f64] {
        let c = self.channels();
        &self.data[i * c..(i + 1) * c]
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Gather a subset of records, in the given order.
    pub fn select(&self, indices: &[usize]) -> Field {
        let c = self.channels();
        let mut data = Vec::with_capacity(indices.len() * c);
        for &i in indices {
            data.extend_from_slice(self.record(i));
        }
        Field {
            grid: self.grid.clone(),
            records: indices.len(),
            data,
        }
    }

    /// Element-wise difference `self - other`. Both fields must share shape.
    pub fn subtract(&self, other: &Field) -> Result<Field> {
        if self.shape() != other.shape() {
            return Err(EofError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a - b)
            .collect();
        Ok(Field {
            grid: self.grid.clone(),
            records: self.records,
            data,
        })
    }
}

fn with_leading(lead: usize, rest: &[usize]) -> Vec<usize> {
    let mut shape = Vec::with_capacity(rest.len() + 1);
    shape.push(lead);
    shape.extend_from_slice(rest);
    shape
}

/// Reshape a field into a `(records × channels)` matrix.
///
/// Returns the matrix and the grid needed by [`restore`]. Records stay on
/// the leading axis and are never mixed into channels.
pub fn flatten(field: &Field) -> (FieldMatrix, Vec<usize>) {
    let n = field.records();
    let c = field.channels();
    let mut mat = FieldMatrix::zeros(n, c);
    for i in 0..n {
        for (j, &v) in field.record(i).iter().enumerate() {
            mat[(i, j)] = v;
        }
    }
    (mat, field.grid.clone())
}

/// Inverse of [`flatten`]: rows become records over `grid`.
pub fn restore(matrix: &FieldMatrix, grid: &[usize]) -> Result<Field> {
    let (n, c) = matrix.shape();
    if c != grid_channels(grid) {
        return Err(EofError::ShapeMismatch {
            expected: grid.to_vec(),
            found: vec![c],
        });
    }
    let mut data = Vec::with_capacity(n * c);
    for i in 0..n {
        data.extend((0..c).map(|j| matrix[(i, j)]));
    }
    Ok(Field {
        grid: grid.to_vec(),
        records: n,
        data,
    })
}

/// Per-channel quantities with a trailing mode axis: shape `[grid..., modes]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Patterns {
    grid: Vec<usize>,
    matrix: FieldMatrix,
}

/// Restore a `(channels × modes)` matrix onto `grid`, appending the mode axis.
pub fn restore_modes(matrix: FieldMatrix, grid: &[usize]) -> Result<Patterns> {
    if matrix.nrows() != grid_channels(grid) {
        return Err(EofError::ShapeMismatch {
            expected: grid.to_vec(),
            found: vec![matrix.nrows()],
        });
    }
    Ok(Patterns {
        grid: grid.to_vec(),
        matrix,
    })
}

impl Patterns {
    #[inline]
    pub fn grid(&self) -> &[usize] {
        &self.grid
    }

    #[inline]
    pub fn modes(&self) -> usize {
        self.matrix.ncols()
    }

    /// Full shape: `[grid..., modes]`.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = self.grid.clone();
        shape.push(self.modes());
        shape
    }

    /// Generalized column `k`: the spatial map of mode `k`, row-major over the grid.
    #[inline]
    pub fn mode(&self, k: usize) -> &[f64] {
        self.matrix.column(k)
    }

    /// Value at a grid position for mode `k`.
    ///
    /// Returns `None` if the index is out of range or of the wrong rank.
    pub fn get(&self, index: &[usize], k: usize) -> Option<f64> {
        if index.len() != self.grid.len() || k >= self.modes() {
            return None;
        }
        let mut flat = 0;
        for (&i, &d) in index.iter().zip(&self.grid) {
            if i >= d {
                return None;
            }
            flat = flat * d + i;
        }
        Some(self.matrix[(flat, k)])
    }

    /// Flat `(channels × modes)` view.
    #[inline]
    pub fn as_matrix(&self) -> &FieldMatrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> FieldMatrix {
        self.matrix
    }
}

/// Indexable, length-queryable sequence of fixed-shape records.
///
/// The out-of-core covariance strategies only need this contract, so a
/// file-backed store can implement it without loading the whole dataset.
/// Implementations must return the same values for the same index on every
/// call when they are used with the double-pass strategy.
pub trait RecordSource {
    /// Number of records.
    fn len(&self) -> usize;

    /// Grid shape of every record.
    fn grid(&self) -> &[usize];

    /// Copy record `index` (flattened, row-major) into `out`, whose length
    /// equals [`RecordSource::channels`].
    fn read_record(&self, index: usize, out: &mut [f64]) -> Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn channels(&self) -> usize {
        grid_channels(self.grid())
    }
}

impl RecordSource for Field {
    fn len(&self) -> usize {
        self.records
    }

    fn grid(&self) -> &[usize] {
        &self.grid
    }

    fn read_record(&self, index: usize, out: &mut [f64]) -> Result<()> {
        if index >= self.records {
            return Err(EofError::LengthMismatch {
                expected: self.records,
                found: index + 1,
            });
        }
        out.copy_from_slice(self.record(index));
        Ok(())
    }
}
