//! Pareto analysis of defect causes and losses.
//!
//! Aggregates a magnitude (count, hours lost, cost) per category, ranks the
//! categories by descending magnitude and classifies each one by the
//! cumulative percentage reached at its rank.
//!
//! # Algorithm
//!
//! 1. Sum magnitudes per category.
//! 2. Sort descending by magnitude; ties are broken by category name so the
//!    ordering is reproducible.
//! 3. `percent_i = m_i / total · 100`, `cumulative_i = (m_1 + ... + m_i) / total · 100`.
//! 4. Band by cumulative percent: `≤ 80` vital few, `≤ 95` significant, else trivial.
//!    Priority by cumulative percent: `≤ 50` P1, `≤ 80` P2, `≤ 95` P3, else P4.
//!
//! Both boundaries are inclusive, so a category that brings the cumulative
//! share to exactly 80% is still in the vital few.
//!
//! # References
//!
//! - Juran, J.M. (1951). *Quality Control Handbook*, McGraw-Hill.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SpcError};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Pareto band of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParetoBand {
    /// "A" causes.
    VitalFew,
    /// "B" causes.
    Significant,
    /// "C" causes, the trivial many.
    Trivial,
}

/// Four-level action priority from the cumulative share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    fn from_cumulative(cumulative_percent: f64) -> Self {
        if cumulative_percent <= 50.0 {
            Self::P1
        } else if cumulative_percent <= 80.0 {
            Self::P2
        } else if cumulative_percent <= 95.0 {
            Self::P3
        } else {
            Self::P4
        }
    }
}

/// Cumulative-percent band boundaries, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandThresholds {
    pub vital_few: f64,
    pub significant: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            vital_few: 80.0,
            significant: 95.0,
        }
    }
}

impl BandThresholds {
    /// Requires `0 < vital_few <= significant <= 100`.
    pub fn validate(&self) -> Result<()> {
        let ordered = self.vital_few > 0.0
            && self.vital_few <= self.significant
            && self.significant <= 100.0;
        if !ordered {
            return Err(SpcError::config(
                "band_thresholds",
                format!(
                    "expected 0 < vital_few <= significant <= 100, got {} and {}",
                    self.vital_few, self.significant
                ),
            ));
        }
        Ok(())
    }

    pub fn classify(&self, cumulative_percent: f64) -> ParetoBand {
        if cumulative_percent <= self.vital_few {
            ParetoBand::VitalFew
        } else if cumulative_percent <= self.significant {
            ParetoBand::Significant
        } else {
            ParetoBand::Trivial
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One ranked category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoEntry {
    pub category: String,
    pub magnitude: f64,
    pub percent_of_total: f64,
    pub cumulative_percent: f64,
    pub band: ParetoBand,
    pub priority: Priority,
}

/// Headline figures of a Pareto analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoSummary {
    pub total: f64,
    pub category_count: usize,
    pub vital_few: Vec<String>,
    /// Percent of the total carried by the vital few.
    pub vital_few_share: f64,
    pub top_category: String,
}

/// Ranked categories in descending magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoAnalysis {
    pub total: f64,
    pub thresholds: BandThresholds,
    pub entries: Vec<ParetoEntry>,
}

impl ParetoAnalysis {
    /// Entries in the given band, in rank order.
    pub fn in_band(&self, band: ParetoBand) -> impl Iterator<Item = &ParetoEntry> {
        self.entries.iter().filter(move |e| e.band == band)
    }

    pub fn entry(&self, category: &str) -> Option<&ParetoEntry> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn summary(&self) -> ParetoSummary {
        let vital: Vec<&ParetoEntry> = self.in_band(ParetoBand::VitalFew).collect();
        ParetoSummary {
            total: self.total,
            category_count: self.entries.len(),
            vital_few_share: vital.iter().map(|e| e.percent_of_total).sum(),
            vital_few: vital.iter().map(|e| e.category.clone()).collect(),
            top_category: self
                .entries
                .first()
                .map(|e| e.category.clone())
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Pareto analysis of occurrence counts, one label per defect.
///
/// # Examples
///
/// ```
/// use spc_engine::pareto::{pareto_from_labels, BandThresholds, ParetoBand};
///
/// let labels = ["scratch", "dent", "scratch", "paint", "scratch", "dent"];
/// let pareto = pareto_from_labels(labels, &BandThresholds::default()).unwrap();
/// assert_eq!(pareto.entries[0].category, "scratch");
/// assert_eq!(pareto.entries[0].magnitude, 3.0);
/// assert_eq!(pareto.entries[0].band, ParetoBand::VitalFew);
/// ```
pub fn pareto_from_labels<I, S>(labels: I, thresholds: &BandThresholds) -> Result<ParetoAnalysis>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    pareto_from_magnitudes(labels.into_iter().map(|label| (label, 1.0)), thresholds)
}

/// Pareto analysis of `(category, magnitude)` records; repeated categories are summed.
///
/// # Errors
///
/// - `InvalidMagnitude` for a negative or non-finite magnitude.
/// - `InsufficientData` when no category has a positive magnitude.
/// - `UnsupportedConfiguration` for inconsistent thresholds.
pub fn pareto_from_magnitudes<I, S>(records: I, thresholds: &BandThresholds) -> Result<ParetoAnalysis>
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    thresholds.validate()?;
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for (category, value) in records {
        let category = category.into();
        if !value.is_finite() || value < 0.0 {
            return Err(SpcError::InvalidMagnitude { category, value });
        }
        *totals.entry(category).or_insert(0.0) += value;
    }
    rank(totals, thresholds)
}

/// Cost-weighted Pareto analysis: each label costs its unit cost, or
/// `default_cost` when the category has none.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use spc_engine::pareto::{pareto_by_cost, BandThresholds};
///
/// let costs = BTreeMap::from([("crack".to_string(), 5000.0)]);
/// let labels = ["scratch", "scratch", "scratch", "crack"];
/// let pareto = pareto_by_cost(labels, &costs, 1000.0, &BandThresholds::default()).unwrap();
/// assert_eq!(pareto.entries[0].category, "crack");
/// assert_eq!(pareto.total, 8000.0);
/// ```
pub fn pareto_by_cost<I, S>(
    labels: I,
    unit_costs: &BTreeMap<String, f64>,
    default_cost: f64,
    thresholds: &BandThresholds,
) -> Result<ParetoAnalysis>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let records = labels.into_iter().map(|label| {
        let category: String = label.into();
        let cost = unit_costs.get(&category).copied().unwrap_or(default_cost);
        (category, cost)
    });
    pareto_from_magnitudes(records, thresholds)
}

fn rank(totals: BTreeMap<String, f64>, thresholds: &BandThresholds) -> Result<ParetoAnalysis> {
    let mut ranked: Vec<(String, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let total: f64 = ranked.iter().map(|(_, m)| m).sum();
    if total <= 0.0 {
        let positive = ranked.iter().filter(|(_, m)| *m > 0.0).count();
        return Err(SpcError::insufficient("pareto analysis", 1, positive));
    }

    let mut running = 0.0;
    let entries: Vec<ParetoEntry> = ranked
        .into_iter()
        .map(|(category, magnitude)| {
            running += magnitude;
            let cumulative_percent = running / total * 100.0;
            ParetoEntry {
                category,
                magnitude,
                percent_of_total: magnitude / total * 100.0,
                cumulative_percent,
                band: thresholds.classify(cumulative_percent),
                priority: Priority::from_cumulative(cumulative_percent),
            }
        })
        .collect();

    debug!(
        total,
        categories = entries.len(),
        vital_few = entries.iter().filter(|e| e.band == ParetoBand::VitalFew).count(),
        "pareto ranked"
    );
    Ok(ParetoAnalysis {
        total,
        thresholds: *thresholds,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> ParetoAnalysis {
        let records = [("A", 50.0), ("B", 30.0), ("C", 15.0), ("D", 5.0)];
        pareto_from_magnitudes(records, &BandThresholds::default()).unwrap()
    }

    #[test]
    fn test_bands_with_inclusive_boundaries() {
        let p = abcd();
        let bands: Vec<ParetoBand> = p.entries.iter().map(|e| e.band).collect();
        assert_eq!(
            bands,
            vec![
                ParetoBand::VitalFew,
                ParetoBand::VitalFew,
                ParetoBand::Significant,
                ParetoBand::Trivial
            ]
        );
        let cumulative: Vec<f64> = p.entries.iter().map(|e| e.cumulative_percent).collect();
        assert_eq!(cumulative, vec![50.0, 80.0, 95.0, 100.0]);
    }

    #[test]
    fn test_priorities() {
        let p = abcd();
        let priorities: Vec<Priority> = p.entries.iter().map(|e| e.priority).collect();
        assert_eq!(priorities, vec![Priority::P1, Priority::P2, Priority::P3, Priority::P4]);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let shuffled = [("C", 15.0), ("D", 5.0), ("A", 50.0), ("B", 30.0)];
        let p = pareto_from_magnitudes(shuffled, &BandThresholds::default()).unwrap();
        assert_eq!(p, abcd());
    }

    #[test]
    fn test_ties_broken_by_category() {
        let records = [("zeta", 10.0), ("alpha", 10.0), ("mid", 10.0)];
        let p = pareto_from_magnitudes(records, &BandThresholds::default()).unwrap();
        let order: Vec<&str> = p.entries.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_repeated_categories_are_summed() {
        let records = [("x", 2.0), ("y", 1.0), ("x", 3.0)];
        let p = pareto_from_magnitudes(records, &BandThresholds::default()).unwrap();
        assert_eq!(p.entry("x").unwrap().magnitude, 5.0);
        assert_eq!(p.total, 6.0);
    }

    #[test]
    fn test_labels_count_occurrences() {
        let p = pareto_from_labels(["a", "b", "a", "c", "a"], &BandThresholds::default()).unwrap();
        assert_eq!(p.entries[0].category, "a");
        assert_eq!(p.entries[0].magnitude, 3.0);
        assert!((p.entries[0].percent_of_total - 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_cost_weighting_reorders() {
        let costs = BTreeMap::from([("rare".to_string(), 100.0)]);
        let labels = ["common", "common", "common", "rare"];
        let p = pareto_by_cost(labels, &costs, 10.0, &BandThresholds::default()).unwrap();
        assert_eq!(p.entries[0].category, "rare");
        assert_eq!(p.entry("common").unwrap().magnitude, 30.0);
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        let err = pareto_from_magnitudes([("a", -1.0)], &BandThresholds::default()).unwrap_err();
        assert!(matches!(err, SpcError::InvalidMagnitude { ref category, .. } if category == "a"));
        assert!(pareto_from_magnitudes([("a", f64::NAN)], &BandThresholds::default()).is_err());
    }

    #[test]
    fn test_zero_total_is_insufficient() {
        let err = pareto_from_magnitudes([("a", 0.0)], &BandThresholds::default()).unwrap_err();
        assert!(matches!(err, SpcError::InsufficientData { .. }));
        let empty: [(&str, f64); 0] = [];
        assert!(pareto_from_magnitudes(empty, &BandThresholds::default()).is_err());
    }

    #[test]
    fn test_threshold_validation() {
        let bad = BandThresholds {
            vital_few: 90.0,
            significant: 80.0,
        };
        assert!(pareto_from_labels(["a"], &bad).is_err());
    }

    #[test]
    fn test_summary() {
        let s = abcd().summary();
        assert_eq!(s.total, 100.0);
        assert_eq!(s.category_count, 4);
        assert_eq!(s.vital_few, vec!["A".to_string(), "B".to_string()]);
        assert!((s.vital_few_share - 80.0).abs() < 1e-9);
        assert_eq!(s.top_category, "A");
    }
}
