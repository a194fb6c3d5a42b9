//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Errors raised by EOF decomposition, analog search and the t-test.
///
/// Degenerate numerics (zero eigenvalues in the Bartlett test, zero-variance
/// channels in correlation matrices) are deliberately *not* represented here:
/// those paths substitute sentinels so batch loops over many modes complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EofError {
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("invalid PC scaling {0}: expected 0 (orthonormal EOFs) or 1 (unit-variance PCs)")]
    Scaling(i64),

    #[error("length mismatch: expected {expected} records, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("insufficient samples: found {found} points, at least one is required")]
    InsufficientSamples { found: usize },

    #[error("invalid subsample length {length} for a dataset of {records} records")]
    InvalidSubsample { length: usize, records: usize },

    #[error("decomposition failed: {0}")]
    Decomposition(String),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EofError>;
