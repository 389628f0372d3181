//! Process sigma estimators.
//!
//! Two estimators are kept deliberately separate:
//!
//! - [`moving_range_sigma`]: MR-bar / d2(2), the pairwise first-difference
//!   estimator used by the individuals chart and as `sigma_within` by the
//!   capability engine.
//! - [`subgroup_range_sigma`]: R-bar / d2(n) over contiguous subgroups, used
//!   by the X-bar-R chart.
//!
//! [`SigmaMethod`] selects the sigma source for the sequential monitors and
//! the pattern rules.

use serde::{Deserialize, Serialize};

use super::constants::{standard_constants, ConstantsTable};
use crate::error::{Result, SpcError};
use crate::series::ObservationSeries;
use crate::stats::{moving_ranges, range};
use u_numflow::stats;

/// Relative tolerance under which a sigma estimate counts as zero.
const DEGENERATE_RELATIVE_TOL: f64 = 1e-12;

/// Average moving range MR-bar.
///
/// # Errors
///
/// `InsufficientData` for fewer than two observations.
pub fn average_moving_range(values: &[f64]) -> Result<f64> {
    let ranges = moving_ranges(values);
    stats::mean(&ranges).ok_or(SpcError::insufficient("moving range", 2, values.len()))
}

/// Moving-range sigma estimate, `MR-bar / d2` with d2 = 1.128.
///
/// The result may be zero (constant series); callers that divide by it
/// check for degeneracy themselves.
///
/// # Examples
///
/// ```
/// use spc_engine::spc::moving_range_sigma;
///
/// let sigma = moving_range_sigma(&[10.0, 12.0, 11.0, 13.0]).unwrap();
/// assert!((sigma - (5.0 / 3.0) / 1.128).abs() < 1e-12);
/// ```
pub fn moving_range_sigma(values: &[f64]) -> Result<f64> {
    let mr_bar = average_moving_range(values)?;
    Ok(mr_bar / standard_constants(1)?.d2)
}

/// Means and ranges of contiguous, non-overlapping subgroups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgroups {
    pub size: usize,
    pub means: Vec<f64>,
    pub ranges: Vec<f64>,
}

impl Subgroups {
    /// Partitions `values` into blocks of `size`, dropping a trailing partial block.
    ///
    /// # Errors
    ///
    /// - `UnsupportedSubgroupSize` when `size < 2`.
    /// - `InsufficientData` when fewer than two complete subgroups exist.
    pub fn partition(values: &[f64], size: usize) -> Result<Self> {
        if size < 2 {
            return Err(SpcError::UnsupportedSubgroupSize { size });
        }
        let required = 2 * size;
        if values.len() < required {
            return Err(SpcError::insufficient("subgrouped chart", required, values.len()));
        }
        let mut means = Vec::with_capacity(values.len() / size);
        let mut ranges = Vec::with_capacity(values.len() / size);
        for block in values.chunks_exact(size) {
            let (Some(block_mean), Some(block_range)) = (stats::mean(block), range(block)) else {
                return Err(SpcError::insufficient("subgroup statistics", size, block.len()));
            };
            means.push(block_mean);
            ranges.push(block_range);
        }
        Ok(Self { size, means, ranges })
    }

    /// Grand mean X-double-bar.
    pub fn grand_mean(&self) -> Result<f64> {
        stats::mean(&self.means).ok_or(SpcError::insufficient("grand mean", 1, 0))
    }

    /// Average range R-bar.
    pub fn average_range(&self) -> Result<f64> {
        stats::mean(&self.ranges).ok_or(SpcError::insufficient("average range", 1, 0))
    }
}

/// Subgroup-range sigma estimate, `R-bar / d2(n)`.
pub fn subgroup_range_sigma(values: &[f64], size: usize, table: &ConstantsTable) -> Result<f64> {
    let constants = table.get(size)?;
    let subgroups = Subgroups::partition(values, size)?;
    Ok(subgroups.average_range()? / constants.d2)
}

/// Fails with `DegenerateVariance` when `sigma` is zero or negligible relative to `center`.
pub(crate) fn ensure_nondegenerate(sigma: f64, center: f64, statistic: &'static str) -> Result<f64> {
    if !sigma.is_finite() || sigma <= 0.0 || sigma <= center.abs() * DEGENERATE_RELATIVE_TOL {
        return Err(SpcError::DegenerateVariance { statistic });
    }
    Ok(sigma)
}

// ---------------------------------------------------------------------------
// Sigma source selection
// ---------------------------------------------------------------------------

/// Where a monitor or rule set takes its process sigma from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaMethod {
    /// Sample standard deviation of the series (N−1 divisor).
    SampleStdDev,
    /// MR-bar / 1.128, robust to sustained shifts and isolated outliers.
    MovingRange,
    /// A known historical sigma.
    Known(f64),
}

impl SigmaMethod {
    /// Estimates sigma for `series`, failing on a zero or non-positive result.
    pub fn estimate(&self, series: &ObservationSeries) -> Result<f64> {
        let (sigma, statistic) = match *self {
            Self::SampleStdDev => (series.std_dev()?, "sample standard deviation"),
            Self::MovingRange => (moving_range_sigma(series.values())?, "moving-range sigma"),
            Self::Known(sigma) => {
                self.validate()?;
                return Ok(sigma);
            }
        };
        ensure_nondegenerate(sigma, series.mean()?, statistic)
    }

    /// Rejects a known sigma that is not finite and positive.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Known(sigma) if !sigma.is_finite() || sigma <= 0.0 => Err(SpcError::config(
                "sigma",
                format!("known sigma must be finite and positive, got {sigma}"),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> ObservationSeries {
        ObservationSeries::new(values.to_vec()).unwrap()
    }

    #[test]
    fn moving_range_needs_two_points() {
        let err = moving_range_sigma(&[5.0]).unwrap_err();
        assert_eq!(err, SpcError::insufficient("moving range", 2, 1));
    }

    #[test]
    fn moving_range_sigma_of_constant_is_zero() {
        assert_eq!(moving_range_sigma(&[7.0; 5]).unwrap(), 0.0);
    }

    #[test]
    fn partition_drops_trailing_block() {
        let values = [1.0, 3.0, 2.0, 6.0, 4.0, 5.0, 9.0];
        let groups = Subgroups::partition(&values, 3).unwrap();
        assert_eq!(groups.means, vec![2.0, 5.0]);
        assert_eq!(groups.ranges, vec![2.0, 2.0]);
    }

    #[test]
    fn partition_rejects_size_one() {
        assert_eq!(
            Subgroups::partition(&[1.0, 2.0, 3.0], 1),
            Err(SpcError::UnsupportedSubgroupSize { size: 1 })
        );
    }

    #[test]
    fn subgroup_sigma_uses_size_specific_d2() {
        let values = [1.0, 3.0, 2.0, 6.0, 4.0, 5.0];
        let sigma = subgroup_range_sigma(&values, 3, &ConstantsTable::standard()).unwrap();
        assert!((sigma - 2.0 / 1.693).abs() < 1e-12, "sigma = {sigma}");
    }

    #[test]
    fn estimators_are_distinct() {
        let values = [1.0, 3.0, 2.0, 6.0, 4.0, 5.0];
        let mr = moving_range_sigma(&values).unwrap();
        let sub = subgroup_range_sigma(&values, 3, &ConstantsTable::standard()).unwrap();
        assert!((mr - sub).abs() > 1e-3);
    }

    #[test]
    fn sigma_method_rejects_flat_series() {
        let flat = series(&[7.0; 5]);
        for method in [SigmaMethod::SampleStdDev, SigmaMethod::MovingRange] {
            let err = method.estimate(&flat).unwrap_err();
            assert!(matches!(err, SpcError::DegenerateVariance { .. }), "{method:?}");
        }
    }

    #[test]
    fn known_sigma_is_validated() {
        let s = series(&[1.0, 2.0]);
        assert_eq!(SigmaMethod::Known(2.5).estimate(&s).unwrap(), 2.5);
        assert!(SigmaMethod::Known(0.0).estimate(&s).is_err());
        assert!(SigmaMethod::Known(f64::NAN).estimate(&s).is_err());
    }
}
