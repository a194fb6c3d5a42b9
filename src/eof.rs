//! EOF decomposition of an in-memory field by SVD of its anomaly matrix.
//!
//! For a field with `N` records the anomalies `X − x̄` are decomposed as
//! `A Σ Vᵗ`. Eigenvalues are `Σ²/N` (no degrees-of-freedom correction for
//! the removed mean), EOFs are the columns of `V` and PCs are `A Σ`, so
//! `PC · EOFᵗ` reproduces the anomalies exactly when all modes are kept.
//! Working on the data matrix instead of the covariance matrix avoids
//! trouble with singular covariance matrices when channels outnumber records.

use tracing::debug;

use crate::config::{McTestConfig, PcScaling};
use crate::error::{EofError, Result};
use crate::field::{flatten, restore, restore_modes, Field, Patterns};
use crate::helpers::{leading_modes_for_variance, DEFAULT_VARIANCE_THRESHOLD};
use crate::linalg::thin_svd;
use crate::matrix::FieldMatrix;
use crate::significance::{self, BartlettResult};

/// Column-center a matrix, returning anomalies and column means.
pub fn center_columns(data: &FieldMatrix) -> (FieldMatrix, Vec<f64>) {
    let means = data.column_means();
    let mut centered = data.clone();
    for (j, &m) in means.iter().enumerate() {
        centered.column_mut(j).iter_mut().for_each(|v| *v -= m);
    }
    (centered, means)
}

/// PCs in the requested scaling from orthonormal-EOF PCs.
pub(crate) fn scale_pcs(pcs: &FieldMatrix, lambdas: &[f64], scaling: PcScaling) -> FieldMatrix {
    match scaling {
        PcScaling::Orthonormal => pcs.clone(),
        PcScaling::UnitVariance => {
            let inv: Vec<f64> = lambdas.iter().map(|l| 1.0 / l.sqrt()).collect();
            pcs.scale_columns(&inv)
        }
    }
}

/// EOFs in the requested scaling from orthonormal EOFs.
pub(crate) fn scale_eofs(eofs: &FieldMatrix, lambdas: &[f64], scaling: PcScaling) -> FieldMatrix {
    match scaling {
        PcScaling::Orthonormal => eofs.clone(),
        PcScaling::UnitVariance => {
            let sq: Vec<f64> = lambdas.iter().map(|l| l.sqrt()).collect();
            eofs.scale_columns(&sq)
        }
    }
}

/// SVD-based EOF decomposition of a field.
///
/// Computed once at construction; every accessor is a pure function of the
/// cached eigenvalues, EOFs and PCs.
#[derive(Debug, Clone)]
pub struct SvdEofs {
    dataset: Field,
    anomalies: FieldMatrix,
    mean: Vec<f64>,
    lambdas: Vec<f64>,
    /// Orthonormal EOFs, channels × p.
    eofs: FieldMatrix,
    /// PCs with variance λ, records × p.
    pcs: FieldMatrix,
}

impl SvdEofs {
    /// Decompose `dataset` (records on the leading axis, any grid).
    ///
    /// At least two records are needed for a meaningful decomposition; with
    /// a single record all eigenvalues are zero.
    pub fn new(dataset: &Field) -> Result<Self> {
        if dataset.records() == 0 || dataset.channels() == 0 {
            return Err(EofError::EmptyInput("field passed to SVD EOFs"));
        }
        let (flat, _) = flatten(dataset);
        let (anomalies, mean) = center_columns(&flat);
        let svd = thin_svd(&anomalies)?;

        let n = dataset.records() as f64;
        let lambdas: Vec<f64> = svd.singular_values.iter().map(|s| s * s / n).collect();
        let pcs = svd.u.scale_columns(&svd.singular_values);
        debug!(
            records = dataset.records(),
            channels = dataset.channels(),
            modes = lambdas.len(),
            "SVD EOF decomposition"
        );

        Ok(Self {
            dataset: dataset.clone(),
            anomalies,
            mean,
            lambdas,
            eofs: svd.v,
            pcs,
        })
    }

    /// The field the decomposition was derived from.
    pub fn dataset(&self) -> &Field {
        &self.dataset
    }

    pub fn records(&self) -> usize {
        self.dataset.records()
    }

    pub fn channels(&self) -> usize {
        self.dataset.channels()
    }

    pub fn grid(&self) -> &[usize] {
        self.dataset.grid()
    }

    /// Number of modes, `min(records, channels)`.
    pub fn neofs(&self) -> usize {
        self.lambdas.len()
    }

    /// Time mean removed before the decomposition.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Eigenvalues (variances), non-increasing.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.lambdas
    }

    /// Principal components as columns (`records × neofs`).
    pub fn pcs(&self, scaling: PcScaling) -> FieldMatrix {
        scale_pcs(&self.pcs, &self.lambdas, scaling)
    }

    /// EOFs as flat columns (`channels × neofs`).
    pub fn flat_eofs(&self, scaling: PcScaling) -> FieldMatrix {
        scale_eofs(&self.eofs, &self.lambdas, scaling)
    }

    /// EOFs restored onto the grid, one generalized column per mode.
    pub fn eofs(&self, scaling: PcScaling) -> Result<Patterns> {
        restore_modes(self.flat_eofs(scaling), self.grid())
    }

    /// EOFs as the correlation between each PC and each channel's anomalies.
    pub fn eofs_as_correlation(&self) -> Result<Patterns> {
        let eofs = self.eofs(PcScaling::Orthonormal)?;
        correlation_from_anomalies(&self.pcs, &eofs, &self.anomalies)
    }

    /// Fraction of each channel's anomaly variance explained by each mode.
    pub fn eofs_as_explained_variance(&self) -> Result<Patterns> {
        let eofs = self.eofs(PcScaling::Orthonormal)?;
        eofs_as_explained_variance(&eofs, PcScaling::Orthonormal, &self.lambdas)
    }

    /// Fraction of the total variance carried by each mode.
    pub fn variance_fraction(&self) -> Vec<f64> {
        variance_fraction(&self.lambdas)
    }

    /// Centered data the decomposition was computed from (`records × channels`).
    pub fn anomalies(&self) -> &FieldMatrix {
        &self.anomalies
    }

    /// Total variance of the anomaly field.
    pub fn total_anomaly_variance(&self) -> f64 {
        let n = self.records() as f64;
        self.anomalies.as_slice().iter().map(|v| v * v).sum::<f64>() / n
    }

    /// Anomaly field rebuilt from the leading `neofs` modes.
    ///
    /// `neofs` is clamped to the number of available modes.
    pub fn reconstructed_field(&self, neofs: usize) -> Result<Field> {
        let p = self.pcs.leading_columns(neofs);
        let e = self.eofs.leading_columns(neofs);
        let flat = p
            .matmul_transposed(&e)
            .ok_or_else(|| EofError::Decomposition("PC/EOF mode count mismatch".into()))?;
        restore(&flat, self.grid())
    }

    /// Coordinates of `field` on the leading `neofs` orthonormal EOFs.
    ///
    /// `field` defaults to the decomposed dataset. It is projected as given:
    /// no mean is removed, unlike the decomposition itself.
    pub fn project_field(&self, neofs: usize, field: Option<&Field>) -> Result<FieldMatrix> {
        let x = field.unwrap_or(&self.dataset);
        self.check_grid(x)?;
        let (flat, _) = flatten(x);
        flat.matmul(&self.eofs.leading_columns(neofs))
            .ok_or_else(|| EofError::Decomposition("projection dimension mismatch".into()))
    }

    /// Part of `field` not reconstructed by its projection on `neofs` EOFs.
    ///
    /// `field` defaults to the decomposed dataset.
    pub fn unreconstructed_field(&self, neofs: usize, field: Option<&Field>) -> Result<Field> {
        let x = field.unwrap_or(&self.dataset);
        let coords = self.project_field(neofs, Some(x))?;
        let e = self.eofs.leading_columns(neofs);
        let explained = coords
            .matmul_transposed(&e)
            .ok_or_else(|| EofError::Decomposition("PC/EOF mode count mismatch".into()))?;
        x.subtract(&restore(&explained, self.grid())?)
    }

    /// North's sampling errors of the eigenvalues.
    pub fn north_test(&self) -> Vec<f64> {
        significance::north_test(&self.lambdas, self.records())
    }

    /// Bartlett test on the equality of trailing eigenvalues.
    pub fn bartlett_test(&self) -> BartlettResult {
        significance::bartlett_test(&self.lambdas, self.records())
    }

    /// Monte-Carlo temporal stability test of the leading EOFs.
    ///
    /// Returns a `subsamples × neofs` matrix of absolute congruence
    /// coefficients between subsample EOFs and the full-sample EOFs.
    pub fn mc_test(&self, config: &McTestConfig) -> Result<FieldMatrix> {
        let neofs = config
            .neofs
            .unwrap_or_else(|| {
                leading_modes_for_variance(&self.lambdas, DEFAULT_VARIANCE_THRESHOLD)
            })
            .min(self.neofs());
        let reference = self.eofs.leading_columns(neofs);
        significance::monte_carlo_congruence(
            &reference,
            self.records(),
            config.subsamples,
            config.length,
            config.seed,
            |idx| Ok(SvdEofs::new(&self.dataset.select(idx))?.eofs),
        )
    }

    fn check_grid(&self, field: &Field) -> Result<()> {
        if field.grid() != self.grid() {
            return Err(EofError::ShapeMismatch {
                expected: self.grid().to_vec(),
                found: field.grid().to_vec(),
            });
        }
        Ok(())
    }
}

/// One-shot decomposition returning `(pcs, eigenvalues, eofs)`.
pub fn svd_eofs(
    dataset: &Field,
    scaling: PcScaling,
) -> Result<(FieldMatrix, Vec<f64>, Patterns)> {
    let dec = SvdEofs::new(dataset)?;
    let eofs = dec.eofs(scaling)?;
    Ok((dec.pcs(scaling), dec.lambdas, eofs))
}

/// Fraction of the total variance carried by each eigenvalue.
pub fn variance_fraction(lambdas: &[f64]) -> Vec<f64> {
    crate::helpers::variance_fraction(lambdas)
}

/// Correlation between each PC series and each channel's anomaly series.
///
/// Accepts PCs and EOFs in either scaling, as long as both use the same one.
pub fn pc_series_correlation(
    pcs: &FieldMatrix,
    eofs: &Patterns,
    dataset: &Field,
) -> Result<Patterns> {
    if eofs.grid() != dataset.grid() {
        return Err(EofError::ShapeMismatch {
            expected: eofs.grid().to_vec(),
            found: dataset.grid().to_vec(),
        });
    }
    let (flat, _) = flatten(dataset);
    let (anomalies, _) = center_columns(&flat);
    correlation_from_anomalies(pcs, eofs, &anomalies)
}

/// `E[c,k] · std(P_k) / std(A_c)` for an already centered anomaly matrix.
fn correlation_from_anomalies(
    pcs: &FieldMatrix,
    eofs: &Patterns,
    anomalies: &FieldMatrix,
) -> Result<Patterns> {
    if pcs.nrows() != anomalies.nrows() {
        return Err(EofError::LengthMismatch {
            expected: anomalies.nrows(),
            found: pcs.nrows(),
        });
    }
    let n = anomalies.nrows() as f64;
    let data_std: Vec<f64> = (0..anomalies.ncols())
        .map(|j| (anomalies.column(j).iter().map(|v| v * v).sum::<f64>() / n).sqrt())
        .collect();

    let modes = eofs.modes().min(pcs.ncols());
    let mut out = FieldMatrix::zeros(eofs.as_matrix().nrows(), modes);
    for k in 0..modes {
        let pc_std = (pcs.column(k).iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        for (c, (o, &e)) in out.column_mut(k).iter_mut().zip(eofs.mode(k)).enumerate() {
            *o = e * pc_std / data_std[c];
        }
    }
    restore_modes(out, eofs.grid())
}

/// Fraction of each channel's variance explained by each mode:
/// `E²λ / Σ_k E²λ` for orthonormal EOFs, `E² / Σ_k E²` for variance-carrying ones.
pub fn eofs_as_explained_variance(
    eofs: &Patterns,
    scaling: PcScaling,
    lambdas: &[f64],
) -> Result<Patterns> {
    let mat = eofs.as_matrix();
    let (c, modes) = mat.shape();
    if scaling == PcScaling::Orthonormal && lambdas.len() < modes {
        return Err(EofError::LengthMismatch {
            expected: modes,
            found: lambdas.len(),
        });
    }
    let mut out = FieldMatrix::zeros(c, modes);
    for k in 0..modes {
        let weight = match scaling {
            PcScaling::Orthonormal => lambdas[k],
            PcScaling::UnitVariance => 1.0,
        };
        for (o, &e) in out.column_mut(k).iter_mut().zip(mat.column(k)) {
            *o = e * e * weight;
        }
    }
    for i in 0..c {
        let total: f64 = (0..modes).map(|k| out[(i, k)]).sum();
        for k in 0..modes {
            out[(i, k)] /= total;
        }
    }
    restore_modes(out, eofs.grid())
}

/// Monte-Carlo stability test of given full-sample EOFs against random
/// subsamples of `dataset`. See [`SvdEofs::mc_test`].
pub fn mc_test_eofs(
    dataset: &Field,
    eofs: &Patterns,
    subsamples: usize,
    length: usize,
    seed: u64,
) -> Result<FieldMatrix> {
    if eofs.grid() != dataset.grid() {
        return Err(EofError::ShapeMismatch {
            expected: eofs.grid().to_vec(),
            found: dataset.grid().to_vec(),
        });
    }
    significance::monte_carlo_congruence(
        eofs.as_matrix(),
        dataset.records(),
        subsamples,
        length,
        seed,
        |idx| Ok(SvdEofs::new(&dataset.select(idx))?.eofs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::dot;

    /// Records over a 3x2 grid with a dominant, a secondary and a weak pattern.
    fn generate_field(n: usize) -> Field {
        let p1 = [1.0, 0.8, 0.6, 0.4, 0.2, 0.0];
        let p2 = [0.0, -0.5, 0.5, 0.0, 1.0, -1.0];
        let p3 = [0.3, 0.0, -0.3, 0.6, 0.0, 0.1];
        let records: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let t = i as f64;
                let a = 3.0 * (0.7 * t).sin();
                let b = 1.5 * (1.9 * t + 0.3).cos();
                let c = 0.4 * (3.1 * t).sin();
                (0..6)
                    .map(|j| {
                        let jitter = 0.01 * ((j * i) as f64).cos();
                        10.0 + a * p1[j] + b * p2[j] + c * p3[j] + jitter
                    })
                    .collect()
            })
            .collect();
        Field::from_records(&records, &[3, 2]).unwrap()
    }

    #[test]
    fn test_shapes() {
        let f = generate_field(20);
        let dec = SvdEofs::new(&f).unwrap();
        assert_eq!(dec.neofs(), 6);
        assert_eq!(dec.pcs(PcScaling::Orthonormal).shape(), (20, 6));
        let eofs = dec.eofs(PcScaling::Orthonormal).unwrap();
        assert_eq!(eofs.shape(), vec![3, 2, 6]);
        assert_eq!(dec.mean().len(), 6);
    }

    #[test]
    fn test_more_channels_than_records() {
        let f = generate_field(4);
        let dec = SvdEofs::new(&f).unwrap();
        assert_eq!(dec.neofs(), 4);
        // centering removes one degree of freedom
        assert!(dec.eigenvalues()[3].abs() < 1e-10);
    }

    #[test]
    fn test_eigenvalues_sorted_non_negative() {
        let dec = SvdEofs::new(&generate_field(30)).unwrap();
        let l = dec.eigenvalues();
        for w in l.windows(2) {
            assert!(w[0] >= w[1]);
        }
        assert!(l.iter().all(|&v| v >= -1e-12));
    }

    #[test]
    fn test_eigenvalues_are_pc_variances() {
        let dec = SvdEofs::new(&generate_field(25)).unwrap();
        let pcs = dec.pcs(PcScaling::Orthonormal);
        for (k, l) in dec.eigenvalues().iter().enumerate() {
            let var = dot(pcs.column(k), pcs.column(k)) / 25.0;
            assert!((var - l).abs() < 1e-9 * l.max(1.0));
        }
        let unit = dec.pcs(PcScaling::UnitVariance);
        let var0 = dot(unit.column(0), unit.column(0)) / 25.0;
        assert!((var0 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_eofs_orthonormal() {
        let dec = SvdEofs::new(&generate_field(25)).unwrap();
        let e = dec.flat_eofs(PcScaling::Orthonormal);
        for a in 0..e.ncols() {
            for b in 0..e.ncols() {
                let d = dot(e.column(a), e.column(b));
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((d - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_full_reconstruction_recovers_anomalies() {
        let f = generate_field(15);
        let dec = SvdEofs::new(&f).unwrap();
        let rec = dec.reconstructed_field(dec.neofs()).unwrap();
        assert_eq!(rec.shape(), f.shape());
        for i in 0..f.records() {
            for (j, (&r, &x)) in rec.record(i).iter().zip(f.record(i)).enumerate() {
                let anomaly = x - dec.mean()[j];
                assert!((r - anomaly).abs() < 1e-9, "({i}, {j}): {r} vs {anomaly}");
            }
        }
    }

    #[test]
    fn test_truncated_reconstruction_uses_leading_modes() {
        let f = generate_field(15);
        let dec = SvdEofs::new(&f).unwrap();
        let pcs = dec.pcs(PcScaling::Orthonormal);
        let eofs = dec.flat_eofs(PcScaling::Orthonormal);
        let rec = dec.reconstructed_field(2).unwrap();
        assert_eq!(rec.shape(), f.shape());
        let mut max_gap: f64 = 0.0;
        for i in 0..f.records() {
            for j in 0..f.channels() {
                let expected: f64 = (0..2).map(|k| pcs[(i, k)] * eofs[(j, k)]).sum();
                assert!((rec.record(i)[j] - expected).abs() < 1e-9);
                let anomaly = f.record(i)[j] - dec.mean()[j];
                max_gap = max_gap.max((rec.record(i)[j] - anomaly).abs());
            }
        }
        // the third pattern has amplitude 0.4 and is left out
        assert!(max_gap > 1e-2, "{max_gap}");
    }

    #[test]
    fn test_scaling_preserves_product() {
        let dec = SvdEofs::new(&generate_field(15)).unwrap();
        let a = dec
            .pcs(PcScaling::Orthonormal)
            .matmul_transposed(&dec.flat_eofs(PcScaling::Orthonormal))
            .unwrap();
        let b = dec
            .pcs(PcScaling::UnitVariance)
            .matmul_transposed(&dec.flat_eofs(PcScaling::UnitVariance))
            .unwrap();
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_variance_fraction_and_total() {
        let dec = SvdEofs::new(&generate_field(20)).unwrap();
        let frac = dec.variance_fraction();
        assert!((frac.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(frac[0] > 0.5);
        let (flat, _) = flatten(dec.dataset());
        let (anom, _) = center_columns(&flat);
        let total = anom.as_slice().iter().map(|v| v * v).sum::<f64>() / 20.0;
        assert!((dec.total_anomaly_variance() - total).abs() < 1e-9);
        let lambda_sum: f64 = dec.eigenvalues().iter().sum();
        assert!((dec.total_anomaly_variance() - lambda_sum).abs() < 1e-9);
        assert_eq!(dec.anomalies(), &anom);
    }

    #[test]
    fn test_projection_of_anomalies_gives_pcs() {
        let f = generate_field(12);
        let dec = SvdEofs::new(&f).unwrap();
        let (flat, _) = flatten(&f);
        let (anom, _) = center_columns(&flat);
        let anomalies = restore(&anom, f.grid()).unwrap();
        let coords = dec.project_field(3, Some(&anomalies)).unwrap();
        let pcs = dec.pcs(PcScaling::Orthonormal);
        assert_eq!(coords.shape(), (12, 3));
        for k in 0..3 {
            for i in 0..12 {
                assert!((coords[(i, k)] - pcs[(i, k)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_projection_does_not_center() {
        let f = generate_field(12);
        let dec = SvdEofs::new(&f).unwrap();
        let raw = dec.project_field(1, None).unwrap();
        let pcs = dec.pcs(PcScaling::Orthonormal);
        let offset = dot(dec.mean(), dec.flat_eofs(PcScaling::Orthonormal).column(0));
        for i in 0..12 {
            assert!((raw[(i, 0)] - pcs[(i, 0)] - offset).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unreconstructed_with_all_modes_is_zero() {
        let f = generate_field(10);
        let dec = SvdEofs::new(&f).unwrap();
        let rest = dec.unreconstructed_field(dec.neofs(), None).unwrap();
        assert!(rest.as_slice().iter().all(|v| v.abs() < 1e-8));
        let partial = dec.unreconstructed_field(1, None).unwrap();
        assert!(partial.as_slice().iter().any(|v| v.abs() > 1e-3));
    }

    #[test]
    fn test_unreconstructed_other_field() {
        let dec = SvdEofs::new(&generate_field(20)).unwrap();
        let data: Vec<f64> = (0..7 * 6).map(|x| 3.0 * (x as f64 * 0.91).sin() + 1.0).collect();
        let target = Field::new(data, 7, &[3, 2]).unwrap();
        let k = 2;
        let e = dec.flat_eofs(PcScaling::Orthonormal);
        let rest = dec.unreconstructed_field(k, Some(&target)).unwrap();
        assert_eq!(rest.shape(), target.shape());
        for i in 0..target.records() {
            let x = target.record(i);
            let coords: Vec<f64> = (0..k).map(|m| dot(x, e.column(m))).collect();
            for (c, &r) in rest.record(i).iter().enumerate() {
                let explained: f64 = (0..k).map(|m| coords[m] * e[(c, m)]).sum();
                assert!((r - (x[c] - explained)).abs() < 1e-9, "({i}, {c})");
            }
            for m in 0..k {
                assert!(dot(rest.record(i), e.column(m)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_projection_shape_mismatch() {
        let dec = SvdEofs::new(&generate_field(10)).unwrap();
        let other = Field::new(vec![0.0; 6], 1, &[6]).unwrap();
        let err = dec.project_field(2, Some(&other)).unwrap_err();
        assert_eq!(
            err,
            EofError::ShapeMismatch {
                expected: vec![3, 2],
                found: vec![6]
            }
        );
    }

    #[test]
    fn test_eofs_as_correlation_bounded() {
        let dec = SvdEofs::new(&generate_field(30)).unwrap();
        let corr = dec.eofs_as_correlation().unwrap();
        for k in 0..corr.modes() {
            assert!(corr.mode(k).iter().all(|v| v.abs() <= 1.0 + 1e-9));
        }
        let via_unit = pc_series_correlation(
            &dec.pcs(PcScaling::UnitVariance),
            &dec.eofs(PcScaling::UnitVariance).unwrap(),
            dec.dataset(),
        )
        .unwrap();
        for (a, b) in corr.as_matrix().as_slice().iter().zip(via_unit.as_matrix().as_slice()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_explained_variance_rows_sum_to_one() {
        let dec = SvdEofs::new(&generate_field(30)).unwrap();
        let ev = dec.eofs_as_explained_variance().unwrap();
        let m = ev.as_matrix();
        for i in 0..m.nrows() {
            let s: f64 = (0..m.ncols()).map(|k| m[(i, k)]).sum();
            assert!((s - 1.0).abs() < 1e-9);
        }
        let unit = eofs_as_explained_variance(
            &dec.eofs(PcScaling::UnitVariance).unwrap(),
            PcScaling::UnitVariance,
            dec.eigenvalues(),
        )
        .unwrap();
        for (a, b) in m.as_slice().iter().zip(unit.as_matrix().as_slice()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_svd_eofs_function_matches_struct() {
        let f = generate_field(10);
        let (pcs, lambdas, eofs) = svd_eofs(&f, PcScaling::UnitVariance).unwrap();
        let dec = SvdEofs::new(&f).unwrap();
        assert_eq!(lambdas, dec.eigenvalues());
        assert_eq!(pcs, dec.pcs(PcScaling::UnitVariance));
        assert_eq!(eofs, dec.eofs(PcScaling::UnitVariance).unwrap());
    }

    #[test]
    fn test_north_and_bartlett_lengths() {
        let dec = SvdEofs::new(&generate_field(20)).unwrap();
        assert_eq!(dec.north_test().len(), dec.neofs());
        let b = dec.bartlett_test();
        assert_eq!(b.chi.len(), dec.neofs() - 1);
        assert!(b.prob.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_mc_test_full_length_subsample_is_congruent() {
        let f = generate_field(24);
        let dec = SvdEofs::new(&f).unwrap();
        let cfg = McTestConfig {
            subsamples: 3,
            length: 24,
            neofs: Some(2),
            seed: 11,
        };
        let cc = dec.mc_test(&cfg).unwrap();
        assert_eq!(cc.shape(), (3, 2));
        assert!(cc.as_slice().iter().all(|v| (v - 1.0).abs() < 1e-8));
    }

    #[test]
    fn test_mc_test_is_reproducible() {
        let f = generate_field(40);
        let dec = SvdEofs::new(&f).unwrap();
        let cfg = McTestConfig {
            subsamples: 5,
            length: 25,
            neofs: None,
            seed: 3,
        };
        let a = dec.mc_test(&cfg).unwrap();
        let b = dec.mc_test(&cfg).unwrap();
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|v| (0.0..=1.0 + 1e-12).contains(v)));
    }

    #[test]
    fn test_mc_test_eofs_function() {
        let f = generate_field(30);
        let dec = SvdEofs::new(&f).unwrap();
        let eofs = restore_modes(dec.flat_eofs(PcScaling::Orthonormal).leading_columns(1), f.grid())
            .unwrap();
        let cc = mc_test_eofs(&f, &eofs, 4, 20, 5).unwrap();
        assert_eq!(cc.shape(), (4, 1));
        assert!(cc.as_slice().iter().all(|&v| v > 0.9));
    }

    #[test]
    fn test_empty_field_rejected() {
        let f = Field::new(Vec::new(), 0, &[3]).unwrap();
        assert!(SvdEofs::new(&f).is_err());
    }
}
