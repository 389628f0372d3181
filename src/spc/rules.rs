//! Western Electric pattern rules.
//!
//! Six fixed-window tests for special causes of variation. Each rule slides
//! its window one point at a time over the whole series and reports every
//! matching window, not just the first.
//!
//! | Rule | Window | Condition |
//! |------|--------|-----------|
//! | 1 | 1  | \|x − mean\| > 3σ |
//! | 2 | 3  | ≥ 2 of 3 beyond mean ± 2σ, same side |
//! | 3 | 5  | ≥ 4 of 5 beyond mean ± 1σ, same side |
//! | 4 | 8  | all 8 strictly on one side of the mean |
//! | 5 | 6  | 6 strictly increasing or strictly decreasing |
//! | 6 | 14 | every interior point a strict local max or min |
//!
//! # References
//!
//! - Western Electric (1956). *Statistical Quality Control Handbook*.
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::sigma::SigmaMethod;
use crate::error::{Result, SpcError};
use crate::series::ObservationSeries;

/// Identifier of one pattern rule, dispatching to its scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    /// Rule 1: one point beyond 3 sigma.
    BeyondThreeSigma,
    /// Rule 2: 2 of 3 consecutive points beyond 2 sigma, same side.
    TwoOfThreeBeyondTwoSigma,
    /// Rule 3: 4 of 5 consecutive points beyond 1 sigma, same side.
    FourOfFiveBeyondOneSigma,
    /// Rule 4: 8 consecutive points on one side of the mean.
    EightOnOneSide,
    /// Rule 5: 6 consecutive points strictly trending.
    SixTrending,
    /// Rule 6: 14 consecutive points alternating up and down.
    FourteenAlternating,
}

impl RuleId {
    /// All six rules in rule-number order.
    pub const ALL: [RuleId; 6] = [
        RuleId::BeyondThreeSigma,
        RuleId::TwoOfThreeBeyondTwoSigma,
        RuleId::FourOfFiveBeyondOneSigma,
        RuleId::EightOnOneSide,
        RuleId::SixTrending,
        RuleId::FourteenAlternating,
    ];

    /// Conventional rule number, 1..=6.
    pub fn number(self) -> u8 {
        match self {
            Self::BeyondThreeSigma => 1,
            Self::TwoOfThreeBeyondTwoSigma => 2,
            Self::FourOfFiveBeyondOneSigma => 3,
            Self::EightOnOneSide => 4,
            Self::SixTrending => 5,
            Self::FourteenAlternating => 6,
        }
    }

    /// Number of consecutive points the rule inspects.
    pub fn window(self) -> usize {
        match self {
            Self::BeyondThreeSigma => 1,
            Self::TwoOfThreeBeyondTwoSigma => 3,
            Self::FourOfFiveBeyondOneSigma => 5,
            Self::EightOnOneSide => 8,
            Self::SixTrending => 6,
            Self::FourteenAlternating => 14,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::BeyondThreeSigma => "point beyond 3 sigma",
            Self::TwoOfThreeBeyondTwoSigma => "2 of 3 points beyond 2 sigma on the same side",
            Self::FourOfFiveBeyondOneSigma => "4 of 5 points beyond 1 sigma on the same side",
            Self::EightOnOneSide => "8 points in a row on one side of the mean",
            Self::SixTrending => "6 points in a row steadily increasing or decreasing",
            Self::FourteenAlternating => "14 points in a row alternating up and down",
        }
    }

    fn scan(self, values: &[f64], zones: &Zones) -> Vec<RuleViolation> {
        match self {
            Self::BeyondThreeSigma => check_rule1(values, zones),
            Self::TwoOfThreeBeyondTwoSigma => check_rule2(values, zones),
            Self::FourOfFiveBeyondOneSigma => check_rule3(values, zones),
            Self::EightOnOneSide => check_rule4(values, zones),
            Self::SixTrending => check_rule5(values),
            Self::FourteenAlternating => check_rule6(values),
        }
    }
}

/// Direction of the pattern a window matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSide {
    /// Above the mean.
    Upper,
    /// Below the mean.
    Lower,
    Increasing,
    Decreasing,
    /// Zigzag, no single direction.
    Alternating,
}

/// A matching window `[start_index, end_index]` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule: RuleId,
    pub start_index: usize,
    pub end_index: usize,
    pub side: PatternSide,
}

/// Zone boundaries at 1, 2 and 3 sigma.
#[derive(Debug, Clone, Copy)]
struct Zones {
    mean: f64,
    sigma: f64,
}

impl Zones {
    fn above(&self, x: f64, k: f64) -> bool {
        x > self.mean + k * self.sigma
    }

    fn below(&self, x: f64, k: f64) -> bool {
        x < self.mean - k * self.sigma
    }
}

// ---------------------------------------------------------------------------
// Rule scans
// ---------------------------------------------------------------------------

fn violation(rule: RuleId, start_index: usize, side: PatternSide) -> RuleViolation {
    RuleViolation {
        rule,
        start_index,
        end_index: start_index + rule.window() - 1,
        side,
    }
}

/// Rule 1: |x − mean| > 3σ.
fn check_rule1(values: &[f64], zones: &Zones) -> Vec<RuleViolation> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, &x)| {
            if (x - zones.mean).abs() <= 3.0 * zones.sigma {
                return None;
            }
            let side = if x > zones.mean {
                PatternSide::Upper
            } else {
                PatternSide::Lower
            };
            Some(violation(RuleId::BeyondThreeSigma, i, side))
        })
        .collect()
}

/// Counts points beyond `k` sigma on each side and reports windows where
/// either side reaches `needed`.
fn check_k_of_n(values: &[f64], zones: &Zones, rule: RuleId, k: f64, needed: usize) -> Vec<RuleViolation> {
    let mut violations = Vec::new();
    for (start, window) in values.windows(rule.window()).enumerate() {
        let above = window.iter().filter(|&&x| zones.above(x, k)).count();
        if above >= needed {
            violations.push(violation(rule, start, PatternSide::Upper));
            continue;
        }
        let below = window.iter().filter(|&&x| zones.below(x, k)).count();
        if below >= needed {
            violations.push(violation(rule, start, PatternSide::Lower));
        }
    }
    violations
}

/// Rule 2: 2 of 3 beyond 2σ, same side.
fn check_rule2(values: &[f64], zones: &Zones) -> Vec<RuleViolation> {
    check_k_of_n(values, zones, RuleId::TwoOfThreeBeyondTwoSigma, 2.0, 2)
}

/// Rule 3: 4 of 5 beyond 1σ, same side.
fn check_rule3(values: &[f64], zones: &Zones) -> Vec<RuleViolation> {
    check_k_of_n(values, zones, RuleId::FourOfFiveBeyondOneSigma, 1.0, 4)
}

/// Rule 4: 8 in a row strictly on one side. Points exactly on the mean break the run.
fn check_rule4(values: &[f64], zones: &Zones) -> Vec<RuleViolation> {
    let rule = RuleId::EightOnOneSide;
    let mut violations = Vec::new();
    for (start, window) in values.windows(rule.window()).enumerate() {
        if window.iter().all(|&x| x > zones.mean) {
            violations.push(violation(rule, start, PatternSide::Upper));
        } else if window.iter().all(|&x| x < zones.mean) {
            violations.push(violation(rule, start, PatternSide::Lower));
        }
    }
    violations
}

/// Rule 5: 6 strictly increasing or strictly decreasing. Ties break the trend.
fn check_rule5(values: &[f64]) -> Vec<RuleViolation> {
    let rule = RuleId::SixTrending;
    let mut violations = Vec::new();
    for (start, window) in values.windows(rule.window()).enumerate() {
        if window.windows(2).all(|w| w[1] > w[0]) {
            violations.push(violation(rule, start, PatternSide::Increasing));
        } else if window.windows(2).all(|w| w[1] < w[0]) {
            violations.push(violation(rule, start, PatternSide::Decreasing));
        }
    }
    violations
}

/// Rule 6: each of the 12 interior points is a strict local extremum, i.e.
/// consecutive differences alternate in sign with no zero difference.
fn check_rule6(values: &[f64]) -> Vec<RuleViolation> {
    let rule = RuleId::FourteenAlternating;
    let mut violations = Vec::new();
    for (start, window) in values.windows(rule.window()).enumerate() {
        let zigzag = window
            .windows(3)
            .all(|w| (w[1] - w[0]) * (w[2] - w[1]) < 0.0);
        if zigzag {
            violations.push(violation(rule, start, PatternSide::Alternating));
        }
    }
    violations
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

fn check_sigma(sigma: f64) -> Result<()> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(SpcError::DegenerateVariance {
            statistic: "rule sigma",
        });
    }
    Ok(())
}

/// Evaluates one rule over `values` against `mean` and `sigma`.
///
/// # Errors
///
/// - `InsufficientData` when `values` is shorter than the rule window.
/// - `DegenerateVariance` when `sigma` is not strictly positive.
///
/// # Examples
///
/// ```
/// use spc_engine::spc::{evaluate_rule, RuleId};
///
/// let hits = evaluate_rule(RuleId::SixTrending, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 4.0, 1.0)
///     .unwrap();
/// assert_eq!(hits.len(), 2);
/// assert_eq!((hits[1].start_index, hits[1].end_index), (1, 6));
/// ```
pub fn evaluate_rule(rule: RuleId, values: &[f64], mean: f64, sigma: f64) -> Result<Vec<RuleViolation>> {
    if values.len() < rule.window() {
        return Err(SpcError::insufficient(rule.description(), rule.window(), values.len()));
    }
    check_sigma(sigma)?;
    Ok(rule.scan(values, &Zones { mean, sigma }))
}

/// Pattern-rule engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Sigma source; the moving-range estimate is not inflated by the outliers
    /// the rules are meant to find.
    pub sigma: SigmaMethod,
    /// Center line override; the series mean when absent.
    pub center: Option<f64>,
    /// Rules to evaluate.
    pub rules: Vec<RuleId>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            sigma: SigmaMethod::MovingRange,
            center: None,
            rules: RuleId::ALL.to_vec(),
        }
    }
}

impl RuleConfig {
    /// Checks the sigma source and the center override.
    pub fn validate(&self) -> Result<()> {
        self.sigma.validate()?;
        if let Some(center) = self.center {
            if !center.is_finite() {
                return Err(SpcError::config("center", format!("must be finite, got {center}")));
            }
        }
        Ok(())
    }
}

/// Outcome of running a rule set over one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleReport {
    pub mean: f64,
    pub sigma: f64,
    /// All matching windows, ordered by start index then rule number.
    pub violations: Vec<RuleViolation>,
    /// Matches per evaluated rule, zero entries included.
    pub counts: BTreeMap<RuleId, usize>,
    /// Rules whose window is longer than the series.
    pub skipped: Vec<RuleId>,
}

impl RuleReport {
    /// In control iff no evaluated rule matched anywhere.
    pub fn is_in_control(&self) -> bool {
        self.violations.is_empty()
    }

    /// Rules with at least one match, in rule-number order.
    pub fn violated_rules(&self) -> Vec<RuleId> {
        self.counts
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&rule, _)| rule)
            .collect()
    }

    /// The rule with the most matches; ties go to the lower rule number.
    pub fn most_frequent_rule(&self) -> Option<RuleId> {
        let mut best: Option<(RuleId, usize)> = None;
        for (&rule, &count) in &self.counts {
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((rule, count));
            }
        }
        best.map(|(rule, _)| rule)
    }
}

/// Runs `rules` over `series` against a given mean and sigma. Rules whose
/// window exceeds the series length are listed in [`RuleReport::skipped`].
pub fn check_rules(series: &ObservationSeries, mean: f64, sigma: f64, rules: &[RuleId]) -> Result<RuleReport> {
    check_sigma(sigma)?;
    let values = series.values();
    let zones = Zones { mean, sigma };

    let mut violations = Vec::new();
    let mut counts = BTreeMap::new();
    let mut skipped = Vec::new();
    for &rule in rules {
        if values.len() < rule.window() {
            skipped.push(rule);
            continue;
        }
        let found = rule.scan(values, &zones);
        counts.insert(rule, found.len());
        violations.extend(found);
    }
    violations.sort_by_key(|v| (v.start_index, v.rule));

    for v in &violations {
        trace!(rule = v.rule.number(), start = v.start_index, end = v.end_index, side = ?v.side, "pattern rule matched");
    }
    debug!(n = values.len(), mean, sigma, violations = violations.len(), skipped = skipped.len(), "pattern rules evaluated");

    Ok(RuleReport {
        mean,
        sigma,
        violations,
        counts,
        skipped,
    })
}

/// Resolves mean and sigma from `config` and runs the configured rules.
///
/// # Examples
///
/// ```
/// use spc_engine::ObservationSeries;
/// use spc_engine::spc::{evaluate_rules, RuleConfig, RuleId};
///
/// let series = ObservationSeries::new(vec![10.0, 12.0, 11.0, 13.0, 50.0]).unwrap();
/// let report = evaluate_rules(&series, &RuleConfig::default()).unwrap();
/// assert_eq!(report.violated_rules(), vec![RuleId::BeyondThreeSigma]);
/// assert_eq!(report.violations[0].start_index, 4);
/// ```
pub fn evaluate_rules(series: &ObservationSeries, config: &RuleConfig) -> Result<RuleReport> {
    config.validate()?;
    let mean = match config.center {
        Some(center) => center,
        None => series.mean()?,
    };
    let sigma = config.sigma.estimate(series)?;
    check_rules(series, mean, sigma, &config.rules)
}
