//! Variables control charts: Individuals-MR and X-bar-R.
//!
//! Both charts are pure functions of an [`ObservationSeries`]: limits are
//! derived from the full series on every call, and every plotted statistic
//! strictly beyond its limits is reported with its index and side.
//!
//! # Control Chart Factors
//!
//! A2, D3, D4 and d2 come from [`ConstantsTable`]; see
//! [`super::constants`] for the tabulated sizes.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - ASTM E2587 — Standard Practice for Use of Control Charts
//! - Shewhart, W.A. (1931). *Economic Control of Quality of Manufactured Product*.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::chart::{ControlLimitSet, OutOfControlPoint};
use super::constants::{ConstantsTable, ControlConstants};
use super::sigma::{average_moving_range, Subgroups};
use crate::error::{Result, SpcError};
use crate::series::ObservationSeries;

/// Control-limit engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlChartConfig {
    /// Observations per subgroup; 1 selects the individuals chart.
    pub subgroup_size: usize,
    /// Factors for subgroup sizes beyond the standard table.
    pub extra_constants: BTreeMap<usize, ControlConstants>,
}

impl Default for ControlChartConfig {
    fn default() -> Self {
        Self {
            subgroup_size: 1,
            extra_constants: BTreeMap::new(),
        }
    }
}

impl ControlChartConfig {
    /// Config for subgroup size `n` with the standard factor table.
    pub fn with_subgroup_size(subgroup_size: usize) -> Self {
        Self {
            subgroup_size,
            ..Self::default()
        }
    }

    /// Standard factors plus the configured extensions.
    pub fn constants_table(&self) -> Result<ConstantsTable> {
        ConstantsTable::with_extensions(&self.extra_constants)
    }
}

/// Which pair of charts was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Individuals chart with a companion moving-range chart (n = 1).
    IndividualsMovingRange,
    /// Subgroup means with a companion range chart (n > 1).
    XBarRange,
}

/// One plotted statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Observation index (individuals/MR) or subgroup index (X-bar/R).
    pub index: usize,
    pub value: f64,
}

/// Result of the control-limit engine: a location chart and its dispersion
/// companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlChart {
    pub kind: ChartKind,
    pub subgroup_size: usize,
    /// Individuals or X-bar limits.
    pub primary: ControlLimitSet,
    /// Moving-range or range limits.
    pub dispersion: ControlLimitSet,
    pub primary_points: Vec<ChartPoint>,
    /// Moving-range points start at index 1 since MR_0 is undefined.
    pub dispersion_points: Vec<ChartPoint>,
    pub primary_violations: Vec<OutOfControlPoint>,
    pub dispersion_violations: Vec<OutOfControlPoint>,
}

impl ControlChart {
    /// `true` when no individual or subgroup mean is beyond its limits.
    ///
    /// Dispersion-chart breaches are reported separately and do not change
    /// the verdict.
    pub fn is_in_control(&self) -> bool {
        self.primary_violations.is_empty()
    }

    /// `true` when no moving range or subgroup range is beyond its limits.
    pub fn dispersion_in_control(&self) -> bool {
        self.dispersion_violations.is_empty()
    }

    /// Total number of out-of-control points on both charts.
    pub fn violation_count(&self) -> usize {
        self.primary_violations.len() + self.dispersion_violations.len()
    }
}

// ---------------------------------------------------------------------------
// Individuals-MR chart
// ---------------------------------------------------------------------------

/// Individuals and Moving Range (I-MR) chart.
///
/// # Algorithm
///
/// 1. MR_i = |x_i − x_{i−1}| for i >= 1, MR-bar their mean.
/// 2. sigma = MR-bar / d2 (d2 = 1.128).
/// 3. I chart: CL = mean(x), UCL/LCL = CL ± 3·sigma.
/// 4. MR chart: CL = MR-bar, UCL = D4·MR-bar, LCL = D3·MR-bar.
///
/// A constant series yields collapsed limits and no violations.
///
/// # Errors
///
/// `InsufficientData` for fewer than two observations.
///
/// # Examples
///
/// ```
/// use spc_engine::ObservationSeries;
/// use spc_engine::spc::individuals_chart;
///
/// let series = ObservationSeries::new(vec![95.0, 105.0]).unwrap();
/// let chart = individuals_chart(&series).unwrap();
/// assert!((chart.primary.center_line - 100.0).abs() < 1e-12);
/// // UCL = 100 + 3 * 10 / 1.128
/// assert!((chart.primary.upper_limit - 126.595).abs() < 1e-3);
/// ```
pub fn individuals_chart(series: &ObservationSeries) -> Result<ControlChart> {
    series.require("individuals chart", 2)?;
    let constants = ConstantsTable::standard().get(1)?;

    let values = series.values();
    let center = series.mean()?;
    let mr_values = series.moving_ranges();
    let mr_bar = average_moving_range(values)?;
    let sigma = mr_bar / constants.d2;

    let primary = ControlLimitSet::symmetric(center, 3.0 * sigma, sigma);
    let dispersion = ControlLimitSet {
        center_line: mr_bar,
        upper_limit: constants.d4 * mr_bar,
        lower_limit: constants.d3 * mr_bar,
        sigma_estimate: sigma,
    };

    let chart = ControlChart {
        kind: ChartKind::IndividualsMovingRange,
        subgroup_size: 1,
        primary,
        dispersion,
        primary_points: to_points(values, 0),
        dispersion_points: to_points(&mr_values, 1),
        primary_violations: primary.out_of_control(values, 0),
        dispersion_violations: dispersion.out_of_control(&mr_values, 1),
    };
    log_chart(&chart, series.len());
    Ok(chart)
}

// ---------------------------------------------------------------------------
// X-bar-R chart
// ---------------------------------------------------------------------------

/// X-bar and Range chart over contiguous subgroups of `subgroup_size`.
///
/// # Algorithm
///
/// 1. Partition into non-overlapping blocks, dropping a trailing partial block.
/// 2. X-double-bar = mean of block means, R-bar = mean of block ranges.
/// 3. X-bar chart: CL = X-double-bar, UCL/LCL = CL ± A2·R-bar.
/// 4. R chart: CL = R-bar, UCL = D4·R-bar, LCL = D3·R-bar.
/// 5. sigma estimate = R-bar / d2(n).
///
/// # Errors
///
/// - `UnsupportedSubgroupSize` when `table` has no row for `subgroup_size`.
/// - `InsufficientData` for fewer than two complete subgroups.
///
/// # Reference
///
/// Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.,
/// Chapter 6: Control Charts for Variables.
pub fn xbar_r_chart(
    series: &ObservationSeries,
    subgroup_size: usize,
    table: &ConstantsTable,
) -> Result<ControlChart> {
    let constants = table.get(subgroup_size)?;
    let subgroups = Subgroups::partition(series.values(), subgroup_size)?;
    let grand_mean = subgroups.grand_mean()?;
    let r_bar = subgroups.average_range()?;
    let sigma = r_bar / constants.d2;

    let primary = ControlLimitSet::symmetric(grand_mean, constants.a2 * r_bar, sigma);
    let dispersion = ControlLimitSet {
        center_line: r_bar,
        upper_limit: constants.d4 * r_bar,
        lower_limit: constants.d3 * r_bar,
        sigma_estimate: sigma,
    };

    let chart = ControlChart {
        kind: ChartKind::XBarRange,
        subgroup_size,
        primary,
        dispersion,
        primary_points: to_points(&subgroups.means, 0),
        dispersion_points: to_points(&subgroups.ranges, 0),
        primary_violations: primary.out_of_control(&subgroups.means, 0),
        dispersion_violations: dispersion.out_of_control(&subgroups.ranges, 0),
    };
    log_chart(&chart, series.len());
    Ok(chart)
}

/// Builds the chart selected by `config.subgroup_size`.
pub fn control_chart(series: &ObservationSeries, config: &ControlChartConfig) -> Result<ControlChart> {
    match config.subgroup_size {
        0 => Err(SpcError::UnsupportedSubgroupSize { size: 0 }),
        1 => individuals_chart(series),
        n => xbar_r_chart(series, n, &config.constants_table()?),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_points(values: &[f64], index_offset: usize) -> Vec<ChartPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| ChartPoint {
            index: i + index_offset,
            value,
        })
        .collect()
}

fn log_chart(chart: &ControlChart, n: usize) {
    for point in chart.primary_violations.iter().chain(&chart.dispersion_violations) {
        trace!(index = point.index, value = point.value, side = ?point.side, "point beyond control limits");
    }
    debug!(
        kind = ?chart.kind,
        n,
        center_line = chart.primary.center_line,
        sigma = chart.primary.sigma_estimate,
        violations = chart.violation_count(),
        "control chart computed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spc::chart::Side;

    fn series(values: &[f64]) -> ObservationSeries {
        ObservationSeries::new(values.to_vec()).unwrap()
    }

    // --- Individuals-MR ---

    #[test]
    fn test_imr_basic_limits() {
        let data = [10.0, 12.0, 11.0, 13.0, 10.0, 14.0, 11.0, 12.0, 13.0, 10.0];
        let chart = individuals_chart(&series(&data)).unwrap();
        assert!(chart.primary.upper_limit > chart.primary.center_line);
        assert!(chart.primary.center_line > chart.primary.lower_limit);
        assert!(chart.dispersion.upper_limit > chart.dispersion.center_line);
        assert!(chart.dispersion.lower_limit.abs() < f64::EPSILON);
        assert!(chart.is_in_control());
    }

    #[test]
    fn test_imr_needs_two_points() {
        let err = individuals_chart(&series(&[10.0])).unwrap_err();
        assert!(matches!(err, SpcError::InsufficientData { required: 2, actual: 1, .. }));
    }

    #[test]
    fn test_imr_center_line_is_mean() {
        let chart = individuals_chart(&series(&[5.0, 10.0, 15.0, 20.0, 25.0])).unwrap();
        assert!((chart.primary.center_line - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_imr_mr_points_start_at_one() {
        let chart = individuals_chart(&series(&[10.0, 12.0, 9.0])).unwrap();
        let mr = &chart.dispersion_points;
        assert_eq!(mr.len(), 2);
        assert_eq!(mr[0].index, 1);
        assert!((mr[0].value - 2.0).abs() < f64::EPSILON);
        assert!((mr[1].value - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_imr_sigma_uses_d2() {
        let chart = individuals_chart(&series(&[95.0, 105.0])).unwrap();
        assert!((chart.primary.sigma_estimate - 10.0 / 1.128).abs() < 1e-12);
        // MR UCL = D4 * MR-bar = 3.267 * 10
        assert!((chart.dispersion.upper_limit - 32.67).abs() < 1e-9);
    }

    #[test]
    fn test_imr_flags_extreme_point() {
        // MR-bar = 10.5, sigma = 9.309, UCL = 19.2 + 27.93 = 47.13
        let chart = individuals_chart(&series(&[10.0, 12.0, 11.0, 13.0, 50.0])).unwrap();
        assert_eq!(chart.primary_violations.len(), 1);
        assert_eq!(chart.primary_violations[0].index, 4);
        assert_eq!(chart.primary_violations[0].side, Side::Upper);
        // MR of 37 exceeds 3.267 * 10.5 = 34.3
        assert_eq!(chart.dispersion_violations.len(), 1);
        assert_eq!(chart.dispersion_violations[0].index, 4);
        assert!(!chart.is_in_control());
    }

    #[test]
    fn test_imr_range_breach_keeps_verdict() {
        let mut data: Vec<f64> = (0..40_i32).map(|i| f64::from(i % 2)).collect();
        data.extend_from_slice(&[-1.5, 2.5]);
        data.extend((0..10_i32).map(|i| f64::from(i % 2)));
        let chart = individuals_chart(&series(&data)).unwrap();
        assert!(chart.primary_violations.is_empty());
        // MR of 4 exceeds 3.267 * 57 / 51
        assert_eq!(chart.dispersion_violations.len(), 1);
        assert_eq!(chart.dispersion_violations[0].index, 41);
        assert!(chart.is_in_control());
        assert!(!chart.dispersion_in_control());
    }

    #[test]
    fn test_imr_constant_series_collapses() {
        let chart = individuals_chart(&series(&[7.0; 5])).unwrap();
        assert_eq!(chart.primary.upper_limit, 7.0);
        assert_eq!(chart.primary.lower_limit, 7.0);
        assert!(chart.is_in_control());
    }

    #[test]
    fn test_imr_limits_are_symmetric() {
        let chart = individuals_chart(&series(&[3.1, 2.7, 3.4, 2.9, 3.3, 3.0])).unwrap();
        let p = chart.primary;
        let below = p.center_line - p.lower_limit;
        let above = p.upper_limit - p.center_line;
        assert!((below - above).abs() < 1e-12, "{below} vs {above}");
    }

    // --- X-bar-R ---

    #[test]
    fn test_xbar_r_basic_limits() {
        let data = [
            72.0, 84.0, 79.0, 49.0, //
            56.0, 87.0, 33.0, 42.0, //
            55.0, 73.0, 22.0, 60.0, //
            44.0, 80.0, 54.0, 74.0, //
            97.0, 26.0, 48.0, 58.0,
        ];
        let chart = xbar_r_chart(&series(&data), 4, &ConstantsTable::standard()).unwrap();
        // Subgroup means: 71.0, 54.5, 52.5, 63.0, 57.25
        let expected_grand_mean = (71.0 + 54.5 + 52.5 + 63.0 + 57.25) / 5.0;
        assert!((chart.primary.center_line - expected_grand_mean).abs() < 1e-10);
        assert_eq!(chart.kind, ChartKind::XBarRange);
        assert_eq!(chart.primary_points.len(), 5);
    }

    #[test]
    fn test_xbar_r_chart_factors_n5() {
        // For n=5: A2=0.577, D4=2.114; both subgroups have mean 50 and range 10
        let data = [45.0, 47.0, 50.0, 53.0, 55.0, 55.0, 53.0, 50.0, 47.0, 45.0];
        let chart = xbar_r_chart(&series(&data), 5, &ConstantsTable::standard()).unwrap();
        assert!((chart.primary.center_line - 50.0).abs() < f64::EPSILON);
        assert!((chart.dispersion.center_line - 10.0).abs() < f64::EPSILON);
        assert!((chart.primary.upper_limit - 55.77).abs() < 1e-9);
        assert!((chart.primary.lower_limit - 44.23).abs() < 1e-9);
        assert!((chart.dispersion.upper_limit - 21.14).abs() < 1e-9);
        assert!((chart.primary.sigma_estimate - 10.0 / 2.326).abs() < 1e-12);
    }

    #[test]
    fn test_xbar_r_drops_partial_subgroup() {
        let data = [1.0, 2.0, 3.0, 2.0, 3.0, 4.0, 100.0];
        let chart = xbar_r_chart(&series(&data), 3, &ConstantsTable::standard()).unwrap();
        assert_eq!(chart.primary_points.len(), 2);
        assert!((chart.primary.center_line - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_xbar_r_detects_out_of_control() {
        let mut data = Vec::new();
        for _ in 0..5 {
            data.extend_from_slice(&[10.0, 10.5, 9.5]);
        }
        data.extend_from_slice(&[50.0, 51.0, 49.0]);
        let chart = xbar_r_chart(&series(&data), 3, &ConstantsTable::standard()).unwrap();
        assert!(!chart.is_in_control());
        assert!(chart
            .primary_violations
            .iter()
            .any(|p| p.index == 5 && p.side == Side::Upper));
    }

    #[test]
    fn test_unsupported_subgroup_size() {
        let data: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let err = control_chart(&series(&data), &ControlChartConfig::with_subgroup_size(7)).unwrap_err();
        assert_eq!(err, SpcError::UnsupportedSubgroupSize { size: 7 });
        let err = control_chart(&series(&data), &ControlChartConfig::with_subgroup_size(0)).unwrap_err();
        assert_eq!(err, SpcError::UnsupportedSubgroupSize { size: 0 });
    }

    #[test]
    fn test_extended_table_enables_larger_subgroups() {
        let mut config = ControlChartConfig::with_subgroup_size(6);
        config.extra_constants.insert(
            6,
            ControlConstants {
                a2: 0.483,
                d3: 0.0,
                d4: 2.004,
                d2: 2.534,
            },
        );
        let data: Vec<f64> = (0..12).map(|i| (i % 6) as f64).collect();
        let chart = control_chart(&series(&data), &config).unwrap();
        assert_eq!(chart.subgroup_size, 6);
        assert!((chart.dispersion.center_line - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_config_is_individuals() {
        let chart = control_chart(&series(&[1.0, 2.0, 3.0]), &ControlChartConfig::default()).unwrap();
        assert_eq!(chart.kind, ChartKind::IndividualsMovingRange);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn symmetric(limits: &ControlLimitSet) -> bool {
        let up = limits.upper_limit - limits.center_line;
        let down = limits.center_line - limits.lower_limit;
        (up - down).abs() <= 1e-9 * limits.center_line.abs().max(up.abs()).max(1.0)
    }

    proptest! {
        #[test]
        fn individuals_limits_symmetric(
            data in proptest::collection::vec(-1e3_f64..1e3, 2..=50),
        ) {
            let series = ObservationSeries::new(data).unwrap();
            let chart = individuals_chart(&series).unwrap();
            prop_assert!(symmetric(&chart.primary), "{:?}", chart.primary);
        }

        #[test]
        fn xbar_limits_symmetric(
            n in 2_usize..=5,
            data in proptest::collection::vec(-1e3_f64..1e3, 10..=50),
        ) {
            let series = ObservationSeries::new(data).unwrap();
            let chart = xbar_r_chart(&series, n, &ConstantsTable::standard()).unwrap();
            prop_assert!(symmetric(&chart.primary), "{:?}", chart.primary);
        }

        #[test]
        fn control_chart_is_deterministic(
            data in proptest::collection::vec(-1e3_f64..1e3, 2..=50),
        ) {
            let series = ObservationSeries::new(data).unwrap();
            let config = ControlChartConfig::default();
            prop_assert_eq!(control_chart(&series, &config), control_chart(&series, &config));
        }
    }
}
