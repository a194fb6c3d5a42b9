//! # climate-eof
//!
//! Empirical Orthogonal Function (EOF) analysis of climate fields in Rust.
//!
//! This crate provides:
//! - Reshaping of N-dimensional record sequences into `(records × channels)` matrices and back
//! - SVD-based EOFs of in-memory fields, with PCs, reconstructions and projections
//! - Covariance/correlation-matrix EOFs of datasets streamed from disk, in one or two passes
//! - Significance tests: North's rule of thumb, Bartlett's test, Monte-Carlo congruence
//! - Analog search in truncated EOF space with averaged and weighted reconstructions
//! - A pooled two-sample t-test on the difference of means
//!
//! ## Data Layout
//!
//! A [`Field`] stores its records contiguously, each in row-major order over
//! its grid. Flattened quantities are [`FieldMatrix`] values in column-major
//! order:
//! - Data matrices are `records × channels`, so a PC series is a contiguous column
//! - EOF matrices are `channels × modes`, so an EOF is a contiguous column
//!
//! ## Example
//!
//! ```
//! use climate_eof::{Field, PcScaling, SvdEofs};
//!
//! let field = Field::from_records(
//!     &[
//!         vec![1.0, 2.0, 0.5, 3.0],
//!         vec![2.0, 1.0, 0.0, 2.5],
//!         vec![4.0, 3.0, -1.0, 1.0],
//!         vec![0.0, -1.0, 2.5, 4.0],
//!     ],
//!     &[2, 2],
//! )
//! .unwrap();
//! let eofs = SvdEofs::new(&field).unwrap();
//! assert_eq!(eofs.eofs(PcScaling::Orthonormal).unwrap().shape(), vec![2, 2, 4]);
//! assert!(eofs.eigenvalues().windows(2).all(|w| w[0] >= w[1]));
//! ```

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod parallel;

pub mod analog;
pub mod config;
pub mod covariance;
pub mod eof;
pub mod error;
pub mod field;
pub mod hds;
pub mod helpers;
pub mod linalg;
pub mod matrix;
pub mod significance;
pub mod ttest;

// Re-export commonly used items
pub use error::{EofError, Result};
pub use helpers::{congruence, leading_modes_for_variance, NUMERICAL_EPS};
pub use matrix::FieldMatrix;

// Re-export configuration types
pub use config::{CovarianceStrategy, EofConfig, McTestConfig, PcScaling, ScatterKind};

// Re-export the shape codec
pub use field::{flatten, restore, restore_modes, Field, Patterns, RecordSource};

// Re-export decompositions
pub use covariance::CovarianceEstimate;
pub use eof::{mc_test_eofs, pc_series_correlation, svd_eofs, SvdEofs};
pub use hds::HdsEofs;

// Re-export tests and analogs
pub use analog::{AnalogSelector, AnalogSpace, EofAnalog};
pub use significance::{bartlett_test, north_test, BartlettResult};
pub use ttest::TTestDifferenceOfMeans;
