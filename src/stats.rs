//! SPC-specific descriptive helpers.
//!
//! Mean, standard deviation, extrema and R-7 quantiles come from
//! [`u_numflow::stats`]; this module adds the block range, moving ranges,
//! the quartile summary and outlier screening built on top of them.

use serde::{Deserialize, Serialize};
use u_numflow::stats;

/// Range (max − min) of a block of observations.
pub fn range(data: &[f64]) -> Option<f64> {
    Some(stats::max(data)? - stats::min(data)?)
}

/// Absolute first differences `|x[i] − x[i−1]|` for `i = 1..n`.
///
/// Returns an empty vector for fewer than two observations.
pub fn moving_ranges(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| (w[1] - w[0]).abs()).collect()
}

// ---------------------------------------------------------------------------
// Descriptive summary
// ---------------------------------------------------------------------------

/// Five-number summary plus mean and sample standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Summary {
    /// Interquartile range `q3 − q1`.
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Computes a [`Summary`], or `None` for fewer than two finite values.
pub fn describe(data: &[f64]) -> Option<Summary> {
    let std_dev = stats::std_dev(data)?;
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    Some(Summary {
        count: data.len(),
        mean: stats::mean(data)?,
        std_dev,
        min: sorted[0],
        q1: stats::quantile_sorted(&sorted, 0.25)?,
        median: stats::quantile_sorted(&sorted, 0.5)?,
        q3: stats::quantile_sorted(&sorted, 0.75)?,
        max: sorted[sorted.len() - 1],
    })
}

/// Outlier screening rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutlierRule {
    /// Outside `[q1 − factor·IQR, q3 + factor·IQR]` (Tukey fences, usually 1.5).
    Iqr { factor: f64 },
    /// `|x − mean| / s` strictly above the threshold (usually 3).
    ZScore { threshold: f64 },
}

/// Indices of observations flagged by `rule`, in production order.
///
/// Returns `None` when the summary statistics are undefined.
pub fn outlier_indices(data: &[f64], rule: OutlierRule) -> Option<Vec<usize>> {
    let summary = describe(data)?;
    let flagged = match rule {
        OutlierRule::Iqr { factor } => {
            let lower = summary.q1 - factor * summary.iqr();
            let upper = summary.q3 + factor * summary.iqr();
            data.iter()
                .enumerate()
                .filter(|(_, &x)| x < lower || x > upper)
                .map(|(i, _)| i)
                .collect()
        }
        OutlierRule::ZScore { threshold } => {
            if summary.std_dev == 0.0 {
                return Some(Vec::new());
            }
            data.iter()
                .enumerate()
                .filter(|(_, &x)| ((x - summary.mean) / summary.std_dev).abs() > threshold)
                .map(|(i, _)| i)
                .collect()
        }
    };
    Some(flagged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_block_has_zero_spread() {
        assert_eq!(range(&[7.0; 5]), Some(0.0));
        assert_eq!(describe(&[7.0; 5]).map(|s| s.std_dev), Some(0.0));
    }

    #[test]
    fn range_of_block() {
        let data = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(range(&data), Some(4.0));
        assert_eq!(range(&[]), None);
        assert_eq!(range(&[1.0, f64::NAN]), None);
    }

    #[test]
    fn moving_ranges_are_absolute_differences() {
        assert_eq!(moving_ranges(&[10.0, 12.0, 9.0]), vec![2.0, 3.0]);
        assert!(moving_ranges(&[10.0]).is_empty());
    }

    #[test]
    fn summary_agrees_with_numflow() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let s = describe(&data).unwrap();
        assert_eq!(Some(s.mean), stats::mean(&data));
        assert_relative_eq!(s.std_dev, 2.138089935299395, epsilon = 1e-12);
        assert_eq!(Some(s.median), stats::quantile(&data, 0.5));
        assert_eq!(Some(s.min), stats::min(&data));
        assert_eq!(Some(s.max), stats::max(&data));
    }

    #[test]
    fn describe_reports_quartiles() {
        let s = describe(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_relative_eq!(s.median, 3.0);
        assert_relative_eq!(s.q1, 2.0);
        assert_relative_eq!(s.q3, 4.0);
        assert_relative_eq!(s.iqr(), 2.0);
    }

    #[test]
    fn iqr_outliers() {
        let data = [10.0, 11.0, 10.5, 10.2, 10.8, 30.0];
        let flagged = outlier_indices(&data, OutlierRule::Iqr { factor: 1.5 }).unwrap();
        assert_eq!(flagged, vec![5]);
    }

    #[test]
    fn zscore_outliers_on_flat_data() {
        let flagged = outlier_indices(&[5.0; 4], OutlierRule::ZScore { threshold: 3.0 }).unwrap();
        assert!(flagged.is_empty());
    }
}
