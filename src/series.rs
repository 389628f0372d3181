//! Validated observation series.
//!
//! An [`ObservationSeries`] is the single input type of every engine: an
//! ordered, immutable sequence of finite measurements in production order.
//! A [`GroupedSeries`] splits observations by a categorical key (shift,
//! line, operator) for group-wise analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};
use crate::stats;
use u_numflow::stats::{mean, std_dev};

/// An ordered sequence of finite measurements, one per production unit.
///
/// Construction rejects NaN and infinite values; afterwards the series is
/// never reordered or mutated, so every derived statistic can assume a
/// clean, chronologically ordered slice.
///
/// # Examples
///
/// ```
/// use spc_engine::ObservationSeries;
///
/// let series = ObservationSeries::new(vec![10.0, 12.0, 11.0]).unwrap();
/// assert_eq!(series.len(), 3);
/// assert!(ObservationSeries::new(vec![1.0, f64::NAN]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ObservationSeries {
    values: Vec<f64>,
}

impl ObservationSeries {
    /// Creates a series, failing with [`SpcError::NonFiniteValue`] on the first
    /// NaN or infinite observation.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if let Some(index) = values.iter().position(|x| !x.is_finite()) {
            return Err(SpcError::NonFiniteValue { index });
        }
        Ok(Self { values })
    }

    /// The observations in production order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fails with `InsufficientData` unless the series has at least `required` points.
    pub fn require(&self, operation: &'static str, required: usize) -> Result<()> {
        if self.values.len() < required {
            return Err(SpcError::insufficient(operation, required, self.values.len()));
        }
        Ok(())
    }

    /// Arithmetic mean; fails on an empty series.
    pub fn mean(&self) -> Result<f64> {
        mean(&self.values).ok_or(SpcError::insufficient("mean", 1, 0))
    }

    /// Sample standard deviation (N−1 divisor); needs two observations.
    pub fn std_dev(&self) -> Result<f64> {
        std_dev(&self.values)
            .ok_or_else(|| SpcError::insufficient("standard deviation", 2, self.values.len()))
    }

    /// Absolute first differences, `len() - 1` values.
    pub fn moving_ranges(&self) -> Vec<f64> {
        stats::moving_ranges(&self.values)
    }

    /// Descriptive summary (count, mean, sd, quartiles).
    pub fn summary(&self) -> Result<stats::Summary> {
        stats::describe(&self.values)
            .ok_or_else(|| SpcError::insufficient("descriptive summary", 2, self.values.len()))
    }

    /// Indices of observations flagged by `rule`, in production order.
    pub fn outliers(&self, rule: stats::OutlierRule) -> Result<Vec<usize>> {
        stats::outlier_indices(&self.values, rule)
            .ok_or_else(|| SpcError::insufficient("outlier screening", 2, self.values.len()))
    }
}

impl TryFrom<Vec<f64>> for ObservationSeries {
    type Error = SpcError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl TryFrom<&[f64]> for ObservationSeries {
    type Error = SpcError;

    fn try_from(values: &[f64]) -> Result<Self> {
        Self::new(values.to_vec())
    }
}

impl From<ObservationSeries> for Vec<f64> {
    fn from(series: ObservationSeries) -> Self {
        series.values
    }
}

impl AsRef<[f64]> for ObservationSeries {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

// ---------------------------------------------------------------------------
// Grouped series
// ---------------------------------------------------------------------------

/// Observations partitioned by a categorical key.
///
/// Keys iterate in sorted order; within each group the production order of
/// the input is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedSeries {
    groups: BTreeMap<String, ObservationSeries>,
}

impl GroupedSeries {
    /// Builds groups from `(key, value)` records in production order.
    ///
    /// Fails with [`SpcError::NonFiniteValue`] carrying the record index of the
    /// first non-finite value.
    ///
    /// # Examples
    ///
    /// ```
    /// use spc_engine::GroupedSeries;
    ///
    /// let grouped = GroupedSeries::from_pairs([
    ///     ("night", 9.8),
    ///     ("day", 10.1),
    ///     ("night", 10.3),
    /// ])
    /// .unwrap();
    /// let keys: Vec<&str> = grouped.keys().collect();
    /// assert_eq!(keys, ["day", "night"]);
    /// assert_eq!(grouped.get("night").unwrap().values(), &[9.8, 10.3]);
    /// ```
    pub fn from_pairs<K, I>(records: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let mut raw: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (index, (key, value)) in records.into_iter().enumerate() {
            if !value.is_finite() {
                return Err(SpcError::NonFiniteValue { index });
            }
            raw.entry(key.into()).or_default().push(value);
        }
        let groups = raw
            .into_iter()
            .map(|(key, values)| Ok((key, ObservationSeries::new(values)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { groups })
    }

    pub fn get(&self, key: &str) -> Option<&ObservationSeries> {
        self.groups.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObservationSeries)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_with_index() {
        let err = ObservationSeries::new(vec![1.0, 2.0, f64::INFINITY]).unwrap_err();
        assert_eq!(err, SpcError::NonFiniteValue { index: 2 });
    }

    #[test]
    fn empty_series_mean_is_insufficient() {
        let series = ObservationSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.mean().is_err());
    }

    #[test]
    fn require_reports_counts() {
        let series = ObservationSeries::new(vec![1.0]).unwrap();
        let err = series.require("moving range", 2).unwrap_err();
        assert_eq!(
            err,
            SpcError::InsufficientData {
                operation: "moving range",
                required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let series: ObservationSeries = serde_json::from_str("[1.0, 2.5, 3.0]").unwrap();
        assert_eq!(series.values(), &[1.0, 2.5, 3.0]);
        assert_eq!(serde_json::to_string(&series).unwrap(), "[1.0,2.5,3.0]");
    }

    #[test]
    fn grouped_preserves_order_within_group() {
        let grouped =
            GroupedSeries::from_pairs([("A", 3.0), ("B", 1.0), ("A", 1.0), ("A", 2.0)]).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.get("A").unwrap().values(), &[3.0, 1.0, 2.0]);
        assert!(grouped.get("C").is_none());
    }

    #[test]
    fn outliers_by_z_score() {
        let mut values = vec![10.0; 20];
        values[3] = 9.0;
        values[7] = 11.0;
        values[12] = 40.0;
        let series = ObservationSeries::new(values).unwrap();
        let flagged = series
            .outliers(stats::OutlierRule::ZScore { threshold: 3.0 })
            .unwrap();
        assert_eq!(flagged, vec![12]);
        assert!(ObservationSeries::new(vec![1.0])
            .unwrap()
            .outliers(stats::OutlierRule::Iqr { factor: 1.5 })
            .is_err());
    }

    #[test]
    fn grouped_rejects_nan_with_record_index() {
        let err = GroupedSeries::from_pairs([("A", 1.0), ("B", f64::NAN)]).unwrap_err();
        assert_eq!(err, SpcError::NonFiniteValue { index: 1 });
    }
}
