//! EOFs of datasets too large to hold in memory ("huge data set" EOFs).
//!
//! The scatter matrix is built by streaming records from a [`RecordSource`]
//! through one of the [`covariance`](crate::covariance) strategies, then
//! eigen-decomposed on first use. Only the `channels × channels` matrix and
//! one record are ever resident, so the cost is dominated by I/O on the
//! source rather than by memory.
//!
//! PCs are not stored: [`HdsEofs::pcs`] and [`HdsEofs::whole_pcs`] read the
//! requested records back from the source and project their anomalies.

use std::sync::OnceLock;

use tracing::debug;

use crate::config::{CovarianceStrategy, PcScaling, ScatterKind};
use crate::covariance::{accumulate, CovarianceEstimate};
use crate::error::{EofError, Result};
use crate::eof::{scale_eofs, scale_pcs};
use crate::field::{restore_modes, Patterns, RecordSource};
use crate::linalg::{symmetric_eigen, EigenParts};
use crate::matrix::FieldMatrix;
use crate::significance;

/// Covariance-matrix EOFs of a streamed dataset.
#[derive(Debug)]
pub struct HdsEofs {
    grid: Vec<usize>,
    record_list: Vec<usize>,
    estimate: CovarianceEstimate,
    eigen: OnceLock<EigenParts>,
}

impl HdsEofs {
    /// Accumulate the scatter matrix of `source`.
    ///
    /// # Arguments
    /// * `source` - Records to decompose
    /// * `records` - Optional subset of record indices; `None` uses every record
    /// * `strategy` - Single or double traversal of `source`
    /// * `kind` - Covariance or correlation matrix EOFs
    ///
    /// An empty subset (`Some(&[])`) is rejected with
    /// [`EofError::EmptyInput`] rather than read as "every record".
    pub fn new<S: RecordSource + ?Sized>(
        source: &S,
        records: Option<&[usize]>,
        strategy: CovarianceStrategy,
        kind: ScatterKind,
    ) -> Result<Self> {
        let estimate = accumulate(source, records, strategy, kind)?;
        let record_list = match records {
            Some(r) => r.to_vec(),
            None => (0..source.len()).collect(),
        };
        debug!(
            records = record_list.len(),
            channels = source.channels(),
            ?strategy,
            ?kind,
            "HDS scatter matrix built"
        );
        Ok(Self {
            grid: source.grid().to_vec(),
            record_list,
            estimate,
            eigen: OnceLock::new(),
        })
    }

    /// Single traversal of `source`.
    pub fn single_pass<S: RecordSource + ?Sized>(
        source: &S,
        records: Option<&[usize]>,
        kind: ScatterKind,
    ) -> Result<Self> {
        Self::new(source, records, CovarianceStrategy::SinglePass, kind)
    }

    /// Two traversals of `source`; `source` must be order-stable.
    pub fn double_pass<S: RecordSource + ?Sized>(
        source: &S,
        records: Option<&[usize]>,
        kind: ScatterKind,
    ) -> Result<Self> {
        Self::new(source, records, CovarianceStrategy::DoublePass, kind)
    }

    /// Whether the eigen-decomposition has been computed yet.
    pub fn is_ready(&self) -> bool {
        self.eigen.get().is_some()
    }

    /// Compute-or-fetch the eigen-decomposition of the scatter matrix.
    fn eigen(&self) -> Result<&EigenParts> {
        if let Some(parts) = self.eigen.get() {
            return Ok(parts);
        }
        let parts = symmetric_eigen(&self.estimate.scatter)?;
        debug!(modes = parts.values.len(), "HDS eigen-decomposition computed");
        Ok(self.eigen.get_or_init(|| parts))
    }

    pub fn grid(&self) -> &[usize] {
        &self.grid
    }

    /// Number of records that entered the scatter matrix.
    pub fn records(&self) -> usize {
        self.record_list.len()
    }

    /// Source indices of the records that entered the scatter matrix.
    pub fn record_indices(&self) -> &[usize] {
        &self.record_list
    }

    pub fn kind(&self) -> ScatterKind {
        self.estimate.kind
    }

    /// Eigenvalues of the scatter matrix, non-increasing.
    pub fn eigenvalues(&self) -> Result<&[f64]> {
        Ok(&self.eigen()?.values)
    }

    pub fn variance_fraction(&self) -> Result<Vec<f64>> {
        Ok(crate::helpers::variance_fraction(self.eigenvalues()?))
    }

    /// Leading `neofs` eigenvectors restored onto the grid.
    pub fn eigenvectors(&self, neofs: usize, scaling: PcScaling) -> Result<Patterns> {
        let eig = self.eigen()?;
        let e = scale_eofs(&eig.vectors.leading_columns(neofs), &eig.values, scaling);
        restore_modes(e, &self.grid)
    }

    /// Time mean of the field, flattened.
    pub fn average(&self) -> &[f64] {
        &self.estimate.mean
    }

    /// The covariance or correlation matrix, depending on construction.
    pub fn scattering_measure(&self) -> &FieldMatrix {
        &self.estimate.scatter
    }

    /// PCs of one record of `source`: its anomaly projected on the leading
    /// `neofs` eigenvectors.
    pub fn pcs<S: RecordSource + ?Sized>(
        &self,
        neofs: usize,
        source: &S,
        record: usize,
        scaling: PcScaling,
    ) -> Result<Vec<f64>> {
        self.check_grid(source)?;
        let eig = self.eigen()?;
        let mut buf = vec![0.0; source.channels()];
        self.project_record(eig, neofs, source, record, scaling, &mut buf)
    }

    /// PCs of every record that entered the decomposition, one row per
    /// record in [`record_indices`](Self::record_indices) order.
    pub fn whole_pcs<S: RecordSource + ?Sized>(
        &self,
        neofs: usize,
        source: &S,
        scaling: PcScaling,
    ) -> Result<FieldMatrix> {
        self.check_grid(source)?;
        let eig = self.eigen()?;
        let neofs = neofs.min(eig.values.len());
        let mut buf = vec![0.0; source.channels()];
        let mut out = FieldMatrix::zeros(self.record_list.len(), neofs);
        for (row, &record) in self.record_list.iter().enumerate() {
            let pcs = self.project_record(eig, neofs, source, record, scaling, &mut buf)?;
            for (k, v) in pcs.into_iter().enumerate() {
                out[(row, k)] = v;
            }
        }
        Ok(out)
    }

    fn project_record<S: RecordSource + ?Sized>(
        &self,
        eig: &EigenParts,
        neofs: usize,
        source: &S,
        record: usize,
        scaling: PcScaling,
        buf: &mut [f64],
    ) -> Result<Vec<f64>> {
        source.read_record(record, buf)?;
        for (x, m) in buf.iter_mut().zip(&self.estimate.mean) {
            *x -= m;
        }
        let anomaly = FieldMatrix::from_column_major(buf.to_vec(), 1, buf.len())
            .ok_or(EofError::EmptyInput("record buffer"))?;
        let e = eig.vectors.leading_columns(neofs);
        let coords = anomaly
            .matmul(&e)
            .ok_or_else(|| EofError::Decomposition("projection dimension mismatch".into()))?;
        Ok(scale_pcs(&coords, &eig.values, scaling).into_vec())
    }

    /// North's sampling errors of the eigenvalues.
    pub fn north_test(&self) -> Result<Vec<f64>> {
        Ok(significance::north_test(self.eigenvalues()?, self.records()))
    }

    /// Bartlett test on the equality of trailing eigenvalues.
    pub fn bartlett_test(&self) -> Result<significance::BartlettResult> {
        Ok(significance::bartlett_test(self.eigenvalues()?, self.records()))
    }

    /// Monte-Carlo temporal stability test of the leading `neofs` EOFs.
    ///
    /// Each subsample draws `length` of this decomposition's records and is
    /// decomposed with the double-pass strategy and the same scatter kind.
    pub fn mc_test<S: RecordSource + Sync + ?Sized>(
        &self,
        neofs: usize,
        source: &S,
        subsamples: usize,
        length: usize,
        seed: u64,
    ) -> Result<FieldMatrix> {
        self.check_grid(source)?;
        let eig = self.eigen()?;
        let reference = eig.vectors.leading_columns(neofs);
        let kind = self.estimate.kind;
        significance::monte_carlo_congruence(
            &reference,
            self.records(),
            subsamples,
            length,
            seed,
            |positions| {
                let subset: Vec<usize> = positions.iter().map(|&p| self.record_list[p]).collect();
                let sub = HdsEofs::double_pass(source, Some(&subset), kind)?;
                Ok(sub.eigen()?.vectors.clone())
            },
        )
    }

    fn check_grid<S: RecordSource + ?Sized>(&self, source: &S) -> Result<()> {
        if source.grid() != self.grid.as_slice() {
            return Err(EofError::ShapeMismatch {
                expected: self.grid.clone(),
                found: source.grid().to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eof::SvdEofs;
    use crate::field::Field;
    use crate::helpers::congruence;
    use rand::prelude::*;
    use rand_distr::Normal;

    /// 4 channels with well separated variances along a rotated basis.
    fn generate_field(n: usize, seed: u64) -> Field {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let basis = [
            [0.5, 0.5, 0.5, 0.5],
            [0.5, -0.5, 0.5, -0.5],
            [0.5, 0.5, -0.5, -0.5],
            [0.5, -0.5, -0.5, 0.5],
        ];
        let sds = [4.0, 2.0, 1.0, 0.3];
        let records: Vec<Vec<f64>> = (0..n)
            .map(|_| {
                let amps: Vec<f64> = sds.iter().map(|s| s * rng.sample(normal)).collect();
                (0..4)
                    .map(|c| 5.0 + (0..4).map(|k| amps[k] * basis[k][c]).sum::<f64>())
                    .collect()
            })
            .collect();
        Field::from_records(&records, &[2, 2]).unwrap()
    }

    #[test]
    fn test_lazy_decomposition() {
        let f = generate_field(50, 1);
        let hds = HdsEofs::double_pass(&f, None, ScatterKind::Covariance).unwrap();
        assert!(!hds.is_ready());
        let _ = hds.eigenvalues().unwrap();
        assert!(hds.is_ready());
    }

    #[test]
    fn test_eigenvalues_match_svd_eofs() {
        let f = generate_field(60, 2);
        let svd = SvdEofs::new(&f).unwrap();
        for strategy in [CovarianceStrategy::SinglePass, CovarianceStrategy::DoublePass] {
            let hds = HdsEofs::new(&f, None, strategy, ScatterKind::Covariance).unwrap();
            let l = hds.eigenvalues().unwrap();
            for (a, b) in l.iter().zip(svd.eigenvalues()) {
                assert!((a - b).abs() < 1e-8 * b.max(1.0), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_eigenvectors_congruent_with_svd_eofs() {
        let f = generate_field(80, 3);
        let svd = SvdEofs::new(&f).unwrap();
        let hds = HdsEofs::double_pass(&f, None, ScatterKind::Covariance).unwrap();
        let e = hds.eigenvectors(3, PcScaling::Orthonormal).unwrap();
        assert_eq!(e.shape(), vec![2, 2, 3]);
        let reference = svd.flat_eofs(PcScaling::Orthonormal);
        for k in 0..3 {
            let c = congruence(e.mode(k), reference.column(k)).abs();
            assert!((c - 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn test_whole_pcs_match_svd_pcs_up_to_sign() {
        let f = generate_field(40, 4);
        let svd = SvdEofs::new(&f).unwrap();
        let hds = HdsEofs::single_pass(&f, None, ScatterKind::Covariance).unwrap();
        for scaling in [PcScaling::Orthonormal, PcScaling::UnitVariance] {
            let a = hds.whole_pcs(2, &f, scaling).unwrap();
            let b = svd.pcs(scaling);
            assert_eq!(a.shape(), (40, 2));
            for k in 0..2 {
                let sign = if crate::helpers::dot(a.column(k), b.column(k)) < 0.0 {
                    -1.0
                } else {
                    1.0
                };
                for i in 0..40 {
                    assert!((a[(i, k)] - sign * b[(i, k)]).abs() < 1e-7);
                }
            }
        }
    }

    #[test]
    fn test_single_record_pcs() {
        let f = generate_field(30, 5);
        let hds = HdsEofs::double_pass(&f, None, ScatterKind::Covariance).unwrap();
        let whole = hds.whole_pcs(4, &f, PcScaling::UnitVariance).unwrap();
        let one = hds.pcs(4, &f, 7, PcScaling::UnitVariance).unwrap();
        assert_eq!(one, whole.row(7));
    }

    #[test]
    fn test_correlation_kind() {
        let f = generate_field(50, 6);
        let hds = HdsEofs::double_pass(&f, None, ScatterKind::Correlation).unwrap();
        let s = hds.scattering_measure();
        for i in 0..4 {
            assert!((s[(i, i)] - 1.0).abs() < 1e-12);
        }
        let total: f64 = hds.eigenvalues().unwrap().iter().sum();
        assert!((total - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_and_variance_fraction() {
        let f = generate_field(200, 7);
        let hds = HdsEofs::double_pass(&f, None, ScatterKind::Covariance).unwrap();
        assert!(hds.average().iter().all(|m| (m - 5.0).abs() < 1.0));
        let frac = hds.variance_fraction().unwrap();
        assert!((frac.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(frac[0] > 0.6);
        assert_eq!(hds.north_test().unwrap().len(), 4);
    }

    #[test]
    fn test_record_subset() {
        let f = generate_field(30, 8);
        let subset: Vec<usize> = (0..30).step_by(2).collect();
        let hds = HdsEofs::double_pass(&f, Some(&subset), ScatterKind::Covariance).unwrap();
        assert_eq!(hds.records(), 15);
        let reference = SvdEofs::new(&f.select(&subset)).unwrap();
        for (a, b) in hds.eigenvalues().unwrap().iter().zip(reference.eigenvalues()) {
            assert!((a - b).abs() < 1e-8 * b.max(1.0));
        }
        assert_eq!(hds.whole_pcs(2, &f, PcScaling::Orthonormal).unwrap().nrows(), 15);
    }

    #[test]
    fn test_empty_subset_rejected() {
        let f = generate_field(10, 12);
        for strategy in [CovarianceStrategy::SinglePass, CovarianceStrategy::DoublePass] {
            let err = HdsEofs::new(&f, Some(&[]), strategy, ScatterKind::Covariance).unwrap_err();
            assert!(matches!(err, EofError::EmptyInput(_)));
        }
    }

    #[test]
    fn test_grid_mismatch() {
        let f = generate_field(10, 9);
        let hds = HdsEofs::double_pass(&f, None, ScatterKind::Covariance).unwrap();
        let other = Field::new(vec![0.0; 8], 2, &[4]).unwrap();
        let err = hds.whole_pcs(2, &other, PcScaling::Orthonormal).unwrap_err();
        assert!(matches!(err, EofError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_mc_test_leading_mode_stable() {
        let f = generate_field(120, 10);
        let hds = HdsEofs::double_pass(&f, None, ScatterKind::Covariance).unwrap();
        let cc = hds.mc_test(2, &f, 6, 80, 42).unwrap();
        assert_eq!(cc.shape(), (6, 2));
        assert!(cc.column(0).iter().all(|&v| v > 0.95));
        let again = hds.mc_test(2, &f, 6, 80, 42).unwrap();
        assert_eq!(cc, again);
    }

    #[test]
    fn test_mc_test_rejects_long_subsample() {
        let f = generate_field(20, 11);
        let hds = HdsEofs::double_pass(&f, None, ScatterKind::Covariance).unwrap();
        let err = hds.mc_test(1, &f, 2, 21, 0).unwrap_err();
        assert_eq!(
            err,
            EofError::InvalidSubsample {
                length: 21,
                records: 20
            }
        );
    }
}
