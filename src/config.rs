//! Explicit configuration passed to each operation instead of hidden defaults.

use serde::{Deserialize, Serialize};

use crate::error::EofError;

/// How magnitude is split between PCs and EOFs.
///
/// Serialized as the historical integer code (0 or 1); any other code fails
/// with [`EofError::Scaling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PcScaling {
    /// Orthonormal EOFs; PC variances equal the eigenvalues.
    #[default]
    Orthonormal,
    /// Unit-variance PCs; EOFs carry the variance (scaled by √λ).
    UnitVariance,
}

impl TryFrom<i64> for PcScaling {
    type Error = EofError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PcScaling::Orthonormal),
            1 => Ok(PcScaling::UnitVariance),
            other => Err(EofError::Scaling(other)),
        }
    }
}

impl From<PcScaling> for i64 {
    fn from(s: PcScaling) -> i64 {
        match s {
            PcScaling::Orthonormal => 0,
            PcScaling::UnitVariance => 1,
        }
    }
}

/// Scatter matrix built by the covariance accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatterKind {
    #[default]
    Covariance,
    /// Covariance normalized by per-channel standard deviations.
    Correlation,
}

/// Number of traversals of the data source used to build the scatter matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceStrategy {
    /// Raw sums and raw outer products in one traversal.
    SinglePass,
    /// Exact mean first, then residual outer products.
    #[default]
    DoublePass,
}

/// Settings shared by EOF projections and analog weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EofConfig {
    pub scaling: PcScaling,
    /// Exponent `p` of the inverse-distance analog weights `d^-p`.
    pub weight_exponent: f64,
    /// Number of leading modes to keep. `None` applies the 70 % variance rule.
    pub truncation: Option<usize>,
}

impl Default for EofConfig {
    fn default() -> Self {
        Self {
            scaling: PcScaling::Orthonormal,
            weight_exponent: 2.0,
            truncation: None,
        }
    }
}

/// Monte-Carlo subsample congruence test settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McTestConfig {
    /// Number of random subsamples.
    pub subsamples: usize,
    /// Records per subsample.
    pub length: usize,
    /// Leading modes compared. `None` applies the 70 % variance rule.
    #[serde(default)]
    pub neofs: Option<usize>,
    /// Base seed; subsample `b` draws from `seed + b`.
    #[serde(default)]
    pub seed: u64,
}
