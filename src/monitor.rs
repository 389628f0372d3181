//! Running several analyses over one series and combining their verdicts.
//!
//! Every engine is a pure `(series, config) -> result` function. The
//! [`SeriesAnalyzer`] trait gives those functions a common shape keyed by
//! their configuration type, and [`Analysis`] is the tagged variant used when
//! the set of analyses comes from configuration.
//!
//! # Combined status
//!
//! For the control-type analyses of one variable (Shewhart chart, EWMA,
//! CUSUM, pattern rules):
//!
//! | Out-of-control analyses | Status |
//! |---|---|
//! | none | [`ControlStatus::InControl`] |
//! | one | [`ControlStatus::Watch`] |
//! | two or more | [`ControlStatus::OutOfControl`] |
//!
//! Analyses that fail are kept in the report with their error and do not
//! count toward the status. Capability does not take part in it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::{analyze_capability, CapabilityResult, SpecLimits};
use crate::detection::{cusum_chart, ewma_chart, CusumChart, CusumConfig, EwmaChart, EwmaConfig};
use crate::error::{Result, SpcError};
use crate::series::{GroupedSeries, ObservationSeries};
use crate::spc::{control_chart, evaluate_rules, ControlChart, ControlChartConfig, RuleConfig, RuleReport};

/// An analysis configured by `Self` and applied to a whole series.
pub trait SeriesAnalyzer {
    type Output;

    fn analyze(&self, series: &ObservationSeries) -> Result<Self::Output>;
}

impl SeriesAnalyzer for ControlChartConfig {
    type Output = ControlChart;

    fn analyze(&self, series: &ObservationSeries) -> Result<ControlChart> {
        control_chart(series, self)
    }
}

impl SeriesAnalyzer for EwmaConfig {
    type Output = EwmaChart;

    fn analyze(&self, series: &ObservationSeries) -> Result<EwmaChart> {
        ewma_chart(series, self)
    }
}

impl SeriesAnalyzer for CusumConfig {
    type Output = CusumChart;

    fn analyze(&self, series: &ObservationSeries) -> Result<CusumChart> {
        cusum_chart(series, self)
    }
}

impl SeriesAnalyzer for RuleConfig {
    type Output = RuleReport;

    fn analyze(&self, series: &ObservationSeries) -> Result<RuleReport> {
        evaluate_rules(series, self)
    }
}

impl SeriesAnalyzer for SpecLimits {
    type Output = CapabilityResult;

    fn analyze(&self, series: &ObservationSeries) -> Result<CapabilityResult> {
        analyze_capability(series, self)
    }
}

// ---------------------------------------------------------------------------
// Tagged dispatch
// ---------------------------------------------------------------------------

/// One configured analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Analysis {
    ControlChart(ControlChartConfig),
    Ewma(EwmaConfig),
    Cusum(CusumConfig),
    Rules(RuleConfig),
    Capability(SpecLimits),
}

impl Analysis {
    /// The default control-type analyses: individuals chart, EWMA, CUSUM and
    /// all pattern rules.
    pub fn standard_set() -> Vec<Analysis> {
        vec![
            Analysis::ControlChart(ControlChartConfig::default()),
            Analysis::Ewma(EwmaConfig::default()),
            Analysis::Cusum(CusumConfig::default()),
            Analysis::Rules(RuleConfig::default()),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ControlChart(_) => "control_chart",
            Self::Ewma(_) => "ewma",
            Self::Cusum(_) => "cusum",
            Self::Rules(_) => "rules",
            Self::Capability(_) => "capability",
        }
    }

    pub fn run(&self, series: &ObservationSeries) -> Result<AnalysisOutcome> {
        Ok(match self {
            Self::ControlChart(config) => AnalysisOutcome::ControlChart(config.analyze(series)?),
            Self::Ewma(config) => AnalysisOutcome::Ewma(config.analyze(series)?),
            Self::Cusum(config) => AnalysisOutcome::Cusum(config.analyze(series)?),
            Self::Rules(config) => AnalysisOutcome::Rules(config.analyze(series)?),
            Self::Capability(spec) => AnalysisOutcome::Capability(spec.analyze(series)?),
        })
    }
}

/// Result of one [`Analysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    ControlChart(ControlChart),
    Ewma(EwmaChart),
    Cusum(CusumChart),
    Rules(RuleReport),
    Capability(CapabilityResult),
}

impl AnalysisOutcome {
    /// `Some(true)` when a control-type analysis signalled, `None` for capability.
    pub fn out_of_control(&self) -> Option<bool> {
        match self {
            Self::ControlChart(chart) => Some(!chart.is_in_control()),
            Self::Ewma(chart) => Some(!chart.is_in_control()),
            Self::Cusum(chart) => Some(!chart.is_in_control()),
            Self::Rules(report) => Some(!report.is_in_control()),
            Self::Capability(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Combined report
// ---------------------------------------------------------------------------

/// Overall verdict across control-type analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    InControl,
    Watch,
    OutOfControl,
}

impl ControlStatus {
    /// Combines per-analysis out-of-control flags. `None` when there are no flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use spc_engine::monitor::ControlStatus;
    ///
    /// assert_eq!(ControlStatus::combine([false, false]), Some(ControlStatus::InControl));
    /// assert_eq!(ControlStatus::combine([true, false]), Some(ControlStatus::Watch));
    /// assert_eq!(ControlStatus::combine([true, true, false]), Some(ControlStatus::OutOfControl));
    /// assert_eq!(ControlStatus::combine(Vec::<bool>::new()), None);
    /// ```
    pub fn combine<I: IntoIterator<Item = bool>>(flags: I) -> Option<Self> {
        let (mut total, mut signalled) = (0usize, 0usize);
        for out in flags {
            total += 1;
            signalled += usize::from(out);
        }
        match (total, signalled) {
            (0, _) => None,
            (_, 0) => Some(Self::InControl),
            (_, 1) => Some(Self::Watch),
            _ => Some(Self::OutOfControl),
        }
    }
}

/// One analysis and what came of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisEntry {
    pub name: &'static str,
    pub outcome: std::result::Result<AnalysisOutcome, SpcError>,
}

/// All analyses run for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringReport {
    pub entries: Vec<AnalysisEntry>,
    /// `None` when no control-type analysis could be computed.
    pub status: Option<ControlStatus>,
}

impl MonitoringReport {
    pub fn outcome(&self, name: &str) -> Option<&AnalysisOutcome> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.outcome.as_ref().ok())
    }

    /// Analyses that could not be computed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &SpcError)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().err().map(|err| (e.name, err)))
    }
}

/// Runs every analysis over `series`; failures are recorded, not propagated.
///
/// # Examples
///
/// ```
/// use spc_engine::ObservationSeries;
/// use spc_engine::monitor::{monitor, Analysis, ControlStatus};
///
/// let series = ObservationSeries::new(vec![
///     10.0, 10.2, 9.9, 10.1, 10.0, 9.8, 10.1, 10.0, 9.9, 10.2, 10.0, 9.9,
/// ]).unwrap();
/// let report = monitor(&series, &Analysis::standard_set());
/// assert_eq!(report.failures().count(), 0);
/// assert!(report.status.is_some());
/// ```
pub fn monitor(series: &ObservationSeries, analyses: &[Analysis]) -> MonitoringReport {
    let entries: Vec<AnalysisEntry> = analyses
        .iter()
        .map(|analysis| AnalysisEntry {
            name: analysis.name(),
            outcome: analysis.run(series),
        })
        .collect();
    let status = ControlStatus::combine(
        entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok().and_then(AnalysisOutcome::out_of_control)),
    );
    debug!(
        n = series.len(),
        analyses = entries.len(),
        failed = entries.iter().filter(|e| e.outcome.is_err()).count(),
        ?status,
        "monitoring complete"
    );
    MonitoringReport { entries, status }
}

/// Runs [`monitor`] for every group independently, in key order.
pub fn monitor_groups(groups: &GroupedSeries, analyses: &[Analysis]) -> BTreeMap<String, MonitoringReport> {
    groups
        .iter()
        .map(|(key, series)| (key.to_string(), monitor(series, analyses)))
        .collect()
}
