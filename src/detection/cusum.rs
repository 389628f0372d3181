//! Cumulative Sum (CUSUM) chart for detecting small persistent shifts in process mean.
//!
//! # Algorithm
//!
//! Given observations x_0, ..., x_{n-1} with process mean mu_0 and standard
//! deviation sigma, the standardized values are:
//!
//! ```text
//! z_i = (x_i - mu_0) / sigma
//! ```
//!
//! The upper and lower CUSUM statistics start at zero and accumulate from the
//! second observation:
//!
//! ```text
//! C+_0 = C-_0 = 0
//! C+_i = max(0, z_i - k + C+_{i-1})
//! C-_i = max(0, -z_i - k + C-_{i-1})
//! ```
//!
//! A signal is generated when `C+_i > h` (upward shift) or `C-_i > h`
//! (downward shift).
//!
//! # Parameters
//!
//! - **k**: reference value (allowance), typically 0.5 (designed to detect a 1-sigma shift)
//! - **h**: decision interval, typically 4 or 5
//!
//! # Reference
//!
//! Page, E.S. (1954). "Continuous inspection schemes", *Biometrika* 41(1-2), pp. 100-115.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, SpcError};
use crate::series::ObservationSeries;
use crate::spc::SigmaMethod;

/// CUSUM chart parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CusumConfig {
    /// Reference value in sigma units.
    pub k: f64,
    /// Decision interval in sigma units.
    pub h: f64,
    pub sigma: SigmaMethod,
    /// Process target mu_0; the series mean when absent.
    pub target: Option<f64>,
}

impl Default for CusumConfig {
    fn default() -> Self {
        Self {
            k: 0.5,
            h: 5.0,
            sigma: SigmaMethod::SampleStdDev,
            target: None,
        }
    }
}

impl CusumConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.k.is_finite() || self.k < 0.0 {
            return Err(SpcError::config("k", format!("must be finite and non-negative, got {}", self.k)));
        }
        if !self.h.is_finite() || self.h <= 0.0 {
            return Err(SpcError::config("h", format!("must be finite and positive, got {}", self.h)));
        }
        self.sigma.validate()?;
        if let Some(target) = self.target {
            if !target.is_finite() {
                return Err(SpcError::config("target", format!("must be finite, got {target}")));
            }
        }
        Ok(())
    }
}

/// Direction of a detected mean shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    Up,
    Down,
}

/// A point where one of the cumulative sums crossed `h`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CusumAlarm {
    pub index: usize,
    pub direction: ShiftDirection,
    /// The cumulative sum that crossed the decision interval.
    pub statistic: f64,
}

/// CUSUM chart over a whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CusumChart {
    pub target: f64,
    pub sigma: f64,
    pub k: f64,
    pub h: f64,
    /// Standardized observations.
    pub standardized: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    /// At most one alarm per index; an upward crossing takes precedence.
    pub alarms: Vec<CusumAlarm>,
    /// Estimated onset of the first detected shift.
    pub shift_onset: Option<usize>,
}

impl CusumChart {
    pub fn is_in_control(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn first_alarm(&self) -> Option<&CusumAlarm> {
        self.alarms.first()
    }

    pub fn alarm_count(&self, direction: ShiftDirection) -> usize {
        self.alarms.iter().filter(|a| a.direction == direction).count()
    }
}

/// Computes the tabular CUSUM chart for `series`.
///
/// # Errors
///
/// - `UnsupportedConfiguration` for a negative `k` or non-positive `h`.
/// - `InsufficientData` or `DegenerateVariance` from the sigma estimate.
///
/// # Examples
///
/// ```
/// use spc_engine::ObservationSeries;
/// use spc_engine::detection::{cusum_chart, CusumConfig, ShiftDirection};
/// use spc_engine::spc::SigmaMethod;
///
/// let mut data = vec![10.0, 10.1, 9.9, 10.0, 10.1, 9.9];
/// data.extend([11.5; 8]);
/// let series = ObservationSeries::new(data).unwrap();
/// let config = CusumConfig {
///     sigma: SigmaMethod::Known(0.5),
///     target: Some(10.0),
///     ..CusumConfig::default()
/// };
/// let chart = cusum_chart(&series, &config).unwrap();
/// assert_eq!(chart.first_alarm().unwrap().direction, ShiftDirection::Up);
/// assert_eq!(chart.shift_onset, Some(6));
/// ```
pub fn cusum_chart(series: &ObservationSeries, config: &CusumConfig) -> Result<CusumChart> {
    config.validate()?;
    series.require("cusum", 1)?;
    let target = match config.target {
        Some(target) => target,
        None => series.mean()?,
    };
    let sigma = config.sigma.estimate(series)?;
    let (k, h) = (config.k, config.h);

    let standardized: Vec<f64> = series.values().iter().map(|&x| (x - target) / sigma).collect();
    let n = standardized.len();
    let mut upper = vec![0.0; n];
    let mut lower = vec![0.0; n];
    for i in 1..n {
        let z = standardized[i];
        upper[i] = (z - k + upper[i - 1]).max(0.0);
        lower[i] = (-z - k + lower[i - 1]).max(0.0);
    }

    let mut alarms = Vec::new();
    for i in 0..n {
        let alarm = if upper[i] > h {
            Some((ShiftDirection::Up, upper[i]))
        } else if lower[i] > h {
            Some((ShiftDirection::Down, lower[i]))
        } else {
            None
        };
        if let Some((direction, statistic)) = alarm {
            trace!(index = i, ?direction, statistic, "cusum beyond decision interval");
            alarms.push(CusumAlarm {
                index: i,
                direction,
                statistic,
            });
        }
    }

    let shift_onset = alarms.first().map(|first| {
        let sums = match first.direction {
            ShiftDirection::Up => &upper,
            ShiftDirection::Down => &lower,
        };
        estimate_onset(sums, first.index)
    });

    debug!(
        n,
        target,
        sigma,
        alarms = alarms.len(),
        ?shift_onset,
        "cusum computed"
    );
    Ok(CusumChart {
        target,
        sigma,
        k,
        h,
        standardized,
        upper,
        lower,
        alarms,
        shift_onset,
    })
}

/// Walks back from `alarm_index` to the last index where the cumulative sum
/// was zero; the shift is taken to start right after it.
fn estimate_onset(sums: &[f64], alarm_index: usize) -> usize {
    (0..alarm_index)
        .rev()
        .find(|&j| sums[j] == 0.0)
        .map_or(0, |j| j + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> ObservationSeries {
        ObservationSeries::new(values.to_vec()).unwrap()
    }

    fn known(target: f64, sigma: f64) -> CusumConfig {
        CusumConfig {
            sigma: SigmaMethod::Known(sigma),
            target: Some(target),
            ..CusumConfig::default()
        }
    }

    #[test]
    fn test_cusum_in_control() {
        let data = [10.1, 9.8, 10.2, 9.9, 10.0, 10.1, 9.7, 10.3];
        let chart = cusum_chart(&series(&data), &known(10.0, 1.0)).unwrap();
        assert!(chart.is_in_control());
        assert_eq!(chart.shift_onset, None);
        assert_eq!(chart.upper.len(), data.len());
    }

    #[test]
    fn test_cusum_first_point_is_zero() {
        let chart = cusum_chart(&series(&[20.0, 10.0]), &known(10.0, 1.0)).unwrap();
        assert_eq!(chart.upper[0], 0.0);
        assert_eq!(chart.lower[0], 0.0);
        assert!((chart.standardized[0] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_cusum_recurrence() {
        let data = [10.0, 11.0, 12.0, 9.0];
        let chart = cusum_chart(&series(&data), &known(10.0, 1.0)).unwrap();
        // C+: 0, 0.5, 2.0, 0.5 ; C-: 0, 0, 0, 0.5
        let expected_upper = [0.0, 0.5, 2.0, 0.5];
        let expected_lower = [0.0, 0.0, 0.0, 0.5];
        for i in 0..4 {
            assert!((chart.upper[i] - expected_upper[i]).abs() < 1e-12, "C+[{i}]");
            assert!((chart.lower[i] - expected_lower[i]).abs() < 1e-12, "C-[{i}]");
        }
    }

    #[test]
    fn test_cusum_detects_upward_shift_and_onset() {
        let mut data = vec![10.0; 10];
        data.extend(vec![12.0; 10]);
        let chart = cusum_chart(&series(&data), &known(10.0, 1.0)).unwrap();
        // Each shifted point adds 2 - 0.5 = 1.5; C+ exceeds 5 at the 4th shifted point.
        let first = chart.first_alarm().unwrap();
        assert_eq!(first.index, 13);
        assert_eq!(first.direction, ShiftDirection::Up);
        assert_eq!(chart.shift_onset, Some(10));
        assert_eq!(chart.alarm_count(ShiftDirection::Down), 0);
    }

    #[test]
    fn test_cusum_detects_downward_shift() {
        let mut data = vec![10.0; 5];
        data.extend(vec![8.0; 8]);
        let chart = cusum_chart(&series(&data), &known(10.0, 1.0)).unwrap();
        let first = chart.first_alarm().unwrap();
        assert_eq!(first.direction, ShiftDirection::Down);
        assert_eq!(first.index, 8);
        assert_eq!(chart.shift_onset, Some(5));
    }

    #[test]
    fn test_cusum_sums_never_negative() {
        let data = [3.0, -2.0, 7.0, 1.0, -5.0, 0.5, 4.0, -1.0];
        let chart = cusum_chart(&series(&data), &CusumConfig::default()).unwrap();
        assert!(chart.upper.iter().all(|&c| c >= 0.0));
        assert!(chart.lower.iter().all(|&c| c >= 0.0));
    }

    #[test]
    fn test_cusum_rejects_bad_params() {
        let s = series(&[1.0, 2.0, 3.0]);
        let bad_h = CusumConfig {
            h: 0.0,
            ..CusumConfig::default()
        };
        assert!(cusum_chart(&s, &bad_h).is_err());
        let bad_k = CusumConfig {
            k: -0.1,
            ..CusumConfig::default()
        };
        assert!(cusum_chart(&s, &bad_k).is_err());
    }

    #[test]
    fn test_cusum_flat_series_is_degenerate() {
        let err = cusum_chart(&series(&[4.0; 5]), &CusumConfig::default()).unwrap_err();
        assert!(matches!(err, SpcError::DegenerateVariance { .. }));
    }

    #[test]
    fn test_onset_follows_last_zero() {
        assert_eq!(estimate_onset(&[0.0, 1.0, 3.0, 6.0], 3), 1);
        assert_eq!(estimate_onset(&[0.0, 0.0, 6.0], 2), 2);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn cumulative_sums_non_negative(
            data in proptest::collection::vec(-1e3_f64..1e3, 1..=60),
            k in 0.0_f64..2.0,
            h in 0.5_f64..10.0,
        ) {
            let series = ObservationSeries::new(data).unwrap();
            let config = CusumConfig {
                k,
                h,
                sigma: SigmaMethod::Known(10.0),
                target: None,
            };
            let chart = cusum_chart(&series, &config).unwrap();
            prop_assert!(chart.upper.iter().all(|&c| c >= 0.0));
            prop_assert!(chart.lower.iter().all(|&c| c >= 0.0));
            if let Some(onset) = chart.shift_onset {
                prop_assert!(onset <= chart.alarms[0].index);
            }
        }

        #[test]
        fn chart_is_deterministic(
            data in proptest::collection::vec(-1e3_f64..1e3, 2..=60),
            k in 0.0_f64..2.0,
        ) {
            let series = ObservationSeries::new(data).unwrap();
            let config = CusumConfig { k, ..CusumConfig::default() };
            prop_assert_eq!(cusum_chart(&series, &config), cusum_chart(&series, &config));
        }
    }
}
