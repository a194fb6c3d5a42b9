//! Two-sample t-test on the difference of means, channel by channel.
//!
//! Both samples are assumed to share one variance, which is estimated by
//! pooling. Records may carry a missing-value marker; marked entries are
//! dropped per channel before any statistic is computed.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{EofError, Result};
use crate::field::Field;

/// Per-channel pooled-variance t-test of `mean(x) − mean(y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TTestDifferenceOfMeans {
    grid: Vec<usize>,
    mean_x: Vec<f64>,
    mean_y: Vec<f64>,
    count_x: Vec<usize>,
    count_y: Vec<usize>,
    t: Vec<f64>,
    p_value: Vec<f64>,
}

struct ChannelMoments {
    count: usize,
    mean: f64,
    /// Sum of squared deviations from `mean`.
    ss: f64,
}

fn is_missing(value: f64, missing: Option<f64>) -> bool {
    match missing {
        Some(m) if m.is_nan() => value.is_nan(),
        Some(m) => value == m,
        None => false,
    }
}

fn moments(field: &Field, channel: usize, missing: Option<f64>) -> ChannelMoments {
    let values: Vec<f64> = (0..field.records())
        .map(|i| field.record(i)[channel])
        .filter(|&v| !is_missing(v, missing))
        .collect();
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let ss = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    ChannelMoments { count, mean, ss }
}

/// Two-sided p-value of `t` under Student's t with `dof` degrees of freedom.
/// NaN when the distribution is undefined.
fn two_sided_p(t: f64, dof: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, dof) {
        Ok(dist) if t.is_finite() => 2.0 * dist.sf(t.abs()),
        _ => f64::NAN,
    }
}

impl TTestDifferenceOfMeans {
    /// Run the test on two fields sharing a grid.
    ///
    /// Fails with `InsufficientSamples` when either field (or any channel,
    /// once missing values are dropped) has no points, and with
    /// `ShapeMismatch` when the grids differ. Channels with fewer than three
    /// points in total have no degrees of freedom left and report NaN.
    pub fn new(x: &Field, y: &Field, missing: Option<f64>) -> Result<Self> {
        if x.grid() != y.grid() {
            return Err(EofError::ShapeMismatch {
                expected: x.grid().to_vec(),
                found: y.grid().to_vec(),
            });
        }
        for f in [x, y] {
            if f.records() == 0 {
                return Err(EofError::InsufficientSamples { found: 0 });
            }
        }

        let channels = x.channels();
        let mut out = Self {
            grid: x.grid().to_vec(),
            mean_x: Vec::with_capacity(channels),
            mean_y: Vec::with_capacity(channels),
            count_x: Vec::with_capacity(channels),
            count_y: Vec::with_capacity(channels),
            t: Vec::with_capacity(channels),
            p_value: Vec::with_capacity(channels),
        };
        for c in 0..channels {
            let mx = moments(x, c, missing);
            let my = moments(y, c, missing);
            if mx.count == 0 || my.count == 0 {
                return Err(EofError::InsufficientSamples {
                    found: mx.count.min(my.count),
                });
            }
            let (nx, ny) = (mx.count as f64, my.count as f64);
            let dof = nx + ny - 2.0;
            let pooled = (mx.ss + my.ss) / dof;
            let t = (mx.mean - my.mean) / (pooled * (1.0 / nx + 1.0 / ny)).sqrt();

            out.mean_x.push(mx.mean);
            out.mean_y.push(my.mean);
            out.count_x.push(mx.count);
            out.count_y.push(my.count);
            out.p_value.push(two_sided_p(t, dof));
            out.t.push(t);
        }
        Ok(out)
    }

    pub fn grid(&self) -> &[usize] {
        &self.grid
    }

    /// Per-channel mean of the first sample.
    pub fn mean_x(&self) -> &[f64] {
        &self.mean_x
    }

    /// Per-channel mean of the second sample.
    pub fn mean_y(&self) -> &[f64] {
        &self.mean_y
    }

    /// Non-missing points per channel in each sample.
    pub fn counts(&self) -> (&[usize], &[usize]) {
        (&self.count_x, &self.count_y)
    }

    /// Per-channel degrees of freedom `nx + ny − 2`.
    pub fn degrees_of_freedom(&self) -> Vec<f64> {
        self.count_x
            .iter()
            .zip(&self.count_y)
            .map(|(&a, &b)| a as f64 + b as f64 - 2.0)
            .collect()
    }

    /// Per-channel t statistic.
    pub fn t_statistic(&self) -> &[f64] {
        &self.t
    }

    /// Per-channel two-sided p-value.
    pub fn p_value(&self) -> &[f64] {
        &self.p_value
    }

    /// Channels whose difference of means is significant at level `alpha`.
    pub fn significant(&self, alpha: f64) -> Vec<bool> {
        self.p_value.iter().map(|&p| p < alpha).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> Field {
        Field::new(values.to_vec(), values.len(), &[1]).unwrap()
    }

    #[test]
    fn test_known_values() {
        let x = column(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = column(&[2.0, 4.0, 6.0, 8.0, 10.0]);
        let t = TTestDifferenceOfMeans::new(&x, &y, None).unwrap();
        assert!((t.mean_x()[0] - 3.0).abs() < 1e-12);
        assert!((t.mean_y()[0] - 6.0).abs() < 1e-12);
        assert!((t.t_statistic()[0] + 1.897_366_596_101_027_5).abs() < 1e-9);
        assert!((t.p_value()[0] - 0.094_349_772_754_578).abs() < 1e-6);
        assert_eq!(t.degrees_of_freedom(), vec![8.0]);
        assert_eq!(t.significant(0.1), vec![true]);
        assert_eq!(t.significant(0.05), vec![false]);
    }

    #[test]
    fn test_missing_values_dropped() {
        let x = column(&[1.0, -999.0, 2.0, 3.0, 4.0, 5.0]);
        let y = column(&[2.0, 4.0, 6.0, -999.0, 8.0, 10.0]);
        let with_missing = TTestDifferenceOfMeans::new(&x, &y, Some(-999.0)).unwrap();
        let clean = TTestDifferenceOfMeans::new(
            &column(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            &column(&[2.0, 4.0, 6.0, 8.0, 10.0]),
            None,
        )
        .unwrap();
        assert_eq!(with_missing.counts(), (&[5][..], &[5][..]));
        assert!((with_missing.t_statistic()[0] - clean.t_statistic()[0]).abs() < 1e-12);
    }

    #[test]
    fn test_nan_missing_marker() {
        let x = column(&[1.0, f64::NAN, 3.0]);
        let y = column(&[1.0, 2.0, 3.0]);
        let t = TTestDifferenceOfMeans::new(&x, &y, Some(f64::NAN)).unwrap();
        assert_eq!(t.counts().0, &[2]);
        assert!(t.mean_x()[0].is_finite());
    }

    #[test]
    fn test_equal_samples_not_significant() {
        let x = Field::new(vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0], 3, &[2]).unwrap();
        let t = TTestDifferenceOfMeans::new(&x, &x, None).unwrap();
        assert!(t.t_statistic().iter().all(|v| v.abs() < 1e-12));
        assert!(t.p_value().iter().all(|p| (p - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_empty_field() {
        let x = Field::new(Vec::new(), 0, &[1]).unwrap();
        let y = column(&[1.0, 2.0]);
        let err = TTestDifferenceOfMeans::new(&x, &y, None).unwrap_err();
        assert_eq!(err, EofError::InsufficientSamples { found: 0 });
    }

    #[test]
    fn test_all_missing_channel() {
        let x = column(&[-1.0, -1.0]);
        let y = column(&[1.0, 2.0]);
        let err = TTestDifferenceOfMeans::new(&x, &y, Some(-1.0)).unwrap_err();
        assert_eq!(err, EofError::InsufficientSamples { found: 0 });
    }

    #[test]
    fn test_grid_mismatch() {
        let x = column(&[1.0, 2.0]);
        let y = Field::new(vec![1.0, 2.0, 3.0, 4.0], 2, &[2]).unwrap();
        assert!(matches!(
            TTestDifferenceOfMeans::new(&x, &y, None),
            Err(EofError::ShapeMismatch { .. })
        ));
    }
}
