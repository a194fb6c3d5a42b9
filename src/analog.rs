//! Nearest-neighbour analog search in a truncated EOF coordinate space.
//!
//! An [`AnalogSpace`] holds a library dataset together with the coordinates
//! `P` of every library record in some search space. Queries are mapped into
//! the same space and ranked by squared Euclidean distance to the rows of
//! `P`. [`EofAnalog`] uses the leading principal components of the library.
//!
//! [`AnalogSelector`] runs the search for a whole set of patterns and builds
//! averaged, inverse-distance weighted or single-analog reconstructions of
//! the library (or of any other field sharing its record axis).

use std::io::Write;

use tracing::debug;

use crate::config::{EofConfig, PcScaling};
use crate::eof::SvdEofs;
use crate::error::{EofError, Result};
use crate::field::{grid_channels, Field};
use crate::helpers::{ascending_order, leading_modes_for_variance, DEFAULT_VARIANCE_THRESHOLD};
use crate::matrix::FieldMatrix;

/// A library dataset with coordinates in a search space.
pub trait AnalogSpace {
    /// The library the analogs are drawn from.
    fn library(&self) -> &Field;

    /// Coordinates of every library record, one row per record.
    fn coordinates(&self) -> &FieldMatrix;

    /// Coordinates of a single flattened record in the search space.
    fn coordinates_of(&self, record: &[f64]) -> Result<Vec<f64>>;

    /// Squared distances from `record` to every library record.
    fn squared_distances(&self, record: &[f64]) -> Result<Vec<f64>> {
        let q = self.coordinates_of(record)?;
        let p = self.coordinates();
        let mut sq = vec![0.0; p.nrows()];
        for (k, &qk) in q.iter().enumerate().take(p.ncols()) {
            for (s, &pk) in sq.iter_mut().zip(p.column(k)) {
                let d = qk - pk;
                *s += d * d;
            }
        }
        Ok(sq)
    }

    /// Index and squared distance of the closest library record.
    fn find_analog(&self, record: &[f64]) -> Result<(usize, f64)> {
        self.find_n_analogs(record, 1)?
            .into_iter()
            .next()
            .ok_or(EofError::EmptyInput("analog library"))
    }

    /// The `n` closest library records as `(index, squared distance)`, by
    /// ascending distance. Equal distances keep library order and NaN
    /// distances rank after every finite one.
    fn find_n_analogs(&self, record: &[f64], n: usize) -> Result<Vec<(usize, f64)>> {
        let sq = self.squared_distances(record)?;
        Ok(ascending_order(&sq)
            .into_iter()
            .take(n)
            .map(|i| (i, sq[i]))
            .collect())
    }

    /// Number of library records.
    fn len(&self) -> usize {
        self.library().records()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Analog search in the space of the library's leading PCs.
#[derive(Debug, Clone)]
pub struct EofAnalog {
    library: Field,
    scaling: PcScaling,
    neofs: usize,
    coords: FieldMatrix,
    lambdas: Vec<f64>,
    /// Orthonormal EOFs, channels × neofs.
    eofs: FieldMatrix,
}

impl EofAnalog {
    /// Decompose `library` and keep `config.truncation` modes (or as many as
    /// explain 70 % of the variance) in `config.scaling`.
    pub fn new(library: &Field, config: &EofConfig) -> Result<Self> {
        let dec = SvdEofs::new(library)?;
        let neofs = config
            .truncation
            .unwrap_or_else(|| {
                leading_modes_for_variance(dec.eigenvalues(), DEFAULT_VARIANCE_THRESHOLD)
            })
            .clamp(1, dec.neofs());
        debug!(neofs, scaling = ?config.scaling, "EOF analog space built");
        Ok(Self {
            library: library.clone(),
            scaling: config.scaling,
            neofs,
            coords: dec.pcs(config.scaling).leading_columns(neofs),
            lambdas: dec.eigenvalues()[..neofs].to_vec(),
            eofs: dec.flat_eofs(PcScaling::Orthonormal).leading_columns(neofs),
        })
    }

    /// Dimension of the search space.
    pub fn neofs(&self) -> usize {
        self.neofs
    }

    pub fn scaling(&self) -> PcScaling {
        self.scaling
    }

    /// Eigenvalues of the retained modes.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.lambdas
    }
}

impl AnalogSpace for EofAnalog {
    fn library(&self) -> &Field {
        &self.library
    }

    fn coordinates(&self) -> &FieldMatrix {
        &self.coords
    }

    /// `x·E` for orthonormal EOFs, `x·E/√λ` for unit-variance PCs. The
    /// record is projected as given, without removing the library mean.
    fn coordinates_of(&self, record: &[f64]) -> Result<Vec<f64>> {
        if record.len() != self.library.channels() {
            return Err(EofError::ShapeMismatch {
                expected: self.library.grid().to_vec(),
                found: vec![record.len()],
            });
        }
        Ok((0..self.neofs)
            .map(|k| {
                let c = crate::helpers::dot(record, self.eofs.column(k));
                match self.scaling {
                    PcScaling::Orthonormal => c,
                    PcScaling::UnitVariance => c / self.lambdas[k].sqrt(),
                }
            })
            .collect())
    }
}

/// Inverse-distance weights `d^-p`, normalized to sum to 1 along each row.
///
/// A zero distance yields non-finite weights for that row.
pub fn get_weights(distances: &FieldMatrix, weight_exponent: f64) -> FieldMatrix {
    let (n, m) = distances.shape();
    let mut w = FieldMatrix::zeros(n, m);
    for i in 0..n {
        let raw: Vec<f64> = (0..m)
            .map(|j| 1.0 / distances[(i, j)].powf(weight_exponent))
            .collect();
        let total: f64 = raw.iter().sum();
        for (j, r) in raw.iter().enumerate() {
            w[(i, j)] = r / total;
        }
    }
    w
}

/// Analogs of a set of patterns and the reconstructions built from them.
#[derive(Debug)]
pub struct AnalogSelector<'a, S: AnalogSpace + ?Sized> {
    space: &'a S,
    smoothing: usize,
    /// `patterns × smoothing` library indices, row-major by pattern.
    analog_records: Vec<usize>,
    distances: FieldMatrix,
    weights: FieldMatrix,
}

impl<'a, S: AnalogSpace + ?Sized> AnalogSelector<'a, S> {
    /// Search the `smoothing` nearest analogs of every record of `patterns`.
    ///
    /// # Arguments
    /// * `space` - Library and search space
    /// * `patterns` - Query patterns, sharing the library grid
    /// * `smoothing` - Analogs kept per pattern (clamped to the library size)
    /// * `weight_exponent` - Exponent `p` of the `d^-p` weights
    pub fn new(
        space: &'a S,
        patterns: &Field,
        smoothing: usize,
        weight_exponent: f64,
    ) -> Result<Self> {
        let grid = space.library().grid();
        if patterns.grid() != grid {
            return Err(EofError::ShapeMismatch {
                expected: grid.to_vec(),
                found: patterns.grid().to_vec(),
            });
        }
        if smoothing == 0 {
            return Err(EofError::EmptyInput("analog smoothing"));
        }
        if space.is_empty() {
            return Err(EofError::EmptyInput("analog library"));
        }
        let smoothing = smoothing.min(space.len());
        let n = patterns.records();

        let mut analog_records = Vec::with_capacity(n * smoothing);
        let mut distances = FieldMatrix::zeros(n, smoothing);
        for i in 0..n {
            let found = space.find_n_analogs(patterns.record(i), smoothing)?;
            for (j, (idx, sq)) in found.into_iter().enumerate() {
                analog_records.push(idx);
                distances[(i, j)] = sq.sqrt();
            }
        }
        let weights = get_weights(&distances, weight_exponent);
        debug!(patterns = n, smoothing, "analog search completed");

        Ok(Self {
            space,
            smoothing,
            analog_records,
            distances,
            weights,
        })
    }

    /// Number of query patterns.
    pub fn patterns(&self) -> usize {
        self.distances.nrows()
    }

    pub fn smoothing(&self) -> usize {
        self.smoothing
    }

    /// Library indices of the analogs of pattern `i`, closest first.
    ///
    /// # Panics
    /// Panics if `i >= patterns()`.
    pub fn analogs(&self, i: usize) -> &[usize] {
        &self.analog_records[i * self.smoothing..(i + 1) * self.smoothing]
    }

    /// Euclidean distances, `patterns × smoothing`.
    pub fn distances(&self) -> &FieldMatrix {
        &self.distances
    }

    /// Normalized inverse-distance weights, `patterns × smoothing`.
    pub fn weights(&self) -> &FieldMatrix {
        &self.weights
    }

    /// Plain average of the analogs of every pattern, taken from `field`
    /// (defaults to the library).
    pub fn return_average(&self, field: Option<&Field>) -> Result<Field> {
        let inv = 1.0 / self.smoothing as f64;
        self.combine(field, |_, _| inv)
    }

    /// Inverse-distance weighted average of the analogs of every pattern,
    /// taken from `field` (defaults to the library).
    pub fn return_weighted_average(&self, field: Option<&Field>) -> Result<Field> {
        self.combine(field, |i, j| self.weights[(i, j)])
    }

    /// Every analog record of `field` (defaults to the library), pattern by
    /// pattern: `patterns × smoothing` records.
    pub fn return_analogs(&self, field: Option<&Field>) -> Result<Field> {
        let target = self.target(field)?;
        Ok(target.select(&self.analog_records))
    }

    fn target<'f>(&'f self, field: Option<&'f Field>) -> Result<&'f Field> {
        let library = self.space.library();
        let target = field.unwrap_or(library);
        if target.records() != library.records() {
            return Err(EofError::LengthMismatch {
                expected: library.records(),
                found: target.records(),
            });
        }
        Ok(target)
    }

    fn combine<F>(&self, field: Option<&Field>, weight: F) -> Result<Field>
    where
        F: Fn(usize, usize) -> f64,
    {
        let target = self.target(field)?;
        let c = grid_channels(target.grid());
        let n = self.patterns();
        let mut data = vec![0.0; n * c];
        for (i, out) in data.chunks_mut(c.max(1)).enumerate().take(n) {
            for (j, &idx) in self.analogs(i).iter().enumerate() {
                let w = weight(i, j);
                for (o, &x) in out.iter_mut().zip(target.record(idx)) {
                    *o += w * x;
                }
            }
        }
        Field::new(data, n, target.grid())
    }

    /// Text report of distances, weights and analog indices per pattern.
    /// Pattern and analog numbers are 1-based.
    pub fn write_report<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let rule = "-".repeat(3 + 20 * self.smoothing);
        writeln!(writer, "Analog report")?;
        writeln!(writer, "{rule}")?;
        writeln!(writer, "idx distance[weight](analogidx)")?;
        writeln!(writer, "{rule}")?;
        for i in 0..self.patterns() {
            write!(writer, "{:3}", i + 1)?;
            for (j, &idx) in self.analogs(i).iter().enumerate() {
                write!(
                    writer,
                    " {:7.3}[{:5.3}]({:3})",
                    self.distances[(i, j)],
                    self.weights[(i, j)],
                    idx + 1
                )?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
