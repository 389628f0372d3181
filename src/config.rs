//! Analysis configuration.
//!
//! [`AnalysisConfig`] collects the parameters of every engine together with
//! the specification limits of each monitored variable. Every field has a
//! default, so a partial JSON document only needs the values it changes:
//!
//! ```json
//! {
//!   "ewma": { "lambda": 0.1 },
//!   "cusum": { "h": 4.0 },
//!   "spec_limits": {
//!     "shaft_diameter": { "usl": 20.0, "lsl": 5.0 }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capability::{improvement_plan, CapabilityResult, ImprovementPlan, SpecLimits, STANDARD_TARGETS};
use crate::detection::{CusumConfig, EwmaConfig};
use crate::error::SpcError;
use crate::monitor::Analysis;
use crate::pareto::BandThresholds;
use crate::series::ObservationSeries;
use crate::spc::{ControlChartConfig, RuleConfig};

/// Errors raised while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] SpcError),
}

/// Parameters for all engines plus per-variable specification limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub control_chart: ControlChartConfig,
    pub ewma: EwmaConfig,
    pub cusum: CusumConfig,
    pub rules: RuleConfig,
    pub pareto: BandThresholds,
    /// Cpk goals for improvement plans.
    pub improvement_targets: Vec<f64>,
    /// Specification limits keyed by variable name.
    pub spec_limits: BTreeMap<String, SpecLimits>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            control_chart: ControlChartConfig::default(),
            ewma: EwmaConfig::default(),
            cusum: CusumConfig::default(),
            rules: RuleConfig::default(),
            pareto: BandThresholds::default(),
            improvement_targets: STANDARD_TARGETS.to_vec(),
            spec_limits: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Examples
    ///
    /// ```
    /// use spc_engine::config::AnalysisConfig;
    ///
    /// let config = AnalysisConfig::from_json_str(
    ///     r#"{ "ewma": { "lambda": 0.1 }, "spec_limits": { "bore": { "usl": 20.0, "lsl": 5.0 } } }"#,
    /// ).unwrap();
    /// assert_eq!(config.ewma.lambda, 0.1);
    /// assert_eq!(config.cusum.h, 5.0);
    /// assert_eq!(config.spec_for("bore").unwrap().target_or_midpoint(), 12.5);
    /// assert!(config.spec_for("shaft").is_err());
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every engine's parameters and every specification.
    pub fn validate(&self) -> Result<(), SpcError> {
        let table = self.control_chart.constants_table()?;
        match self.control_chart.subgroup_size {
            0 => return Err(SpcError::UnsupportedSubgroupSize { size: 0 }),
            1 => {}
            n => {
                table.get(n)?;
            }
        }
        self.ewma.validate()?;
        self.cusum.validate()?;
        self.rules.validate()?;
        self.pareto.validate()?;
        if let Some(&bad) = self.improvement_targets.iter().find(|t| !t.is_finite() || **t <= 0.0) {
            return Err(SpcError::config(
                "improvement_targets",
                format!("targets must be finite and positive, got {bad}"),
            ));
        }
        for (variable, spec) in &self.spec_limits {
            spec.validate().map_err(|err| SpcError::InvalidSpecLimits {
                reason: format!("{variable}: {err}"),
            })?;
        }
        Ok(())
    }

    /// Specification limits for `variable`.
    ///
    /// # Errors
    ///
    /// `InvalidSpecLimits` when none are configured.
    pub fn spec_for(&self, variable: &str) -> Result<SpecLimits, SpcError> {
        self.spec_limits
            .get(variable)
            .copied()
            .ok_or_else(|| SpcError::InvalidSpecLimits {
                reason: format!("no specification limits configured for '{variable}'"),
            })
    }

    /// The configured control-type analyses, plus capability when `variable`
    /// has specification limits.
    ///
    /// Variables without limits get no capability analysis here; use
    /// [`analyses_for_series`](Self::analyses_for_series) to fall back to
    /// limits derived from the data.
    pub fn analyses_for(&self, variable: &str) -> Vec<Analysis> {
        let mut analyses = self.control_analyses();
        if let Ok(spec) = self.spec_for(variable) {
            analyses.push(Analysis::Capability(spec));
        }
        analyses
    }

    /// Like [`analyses_for`](Self::analyses_for), but a variable without
    /// configured limits is judged against `mean ± 3s` of `series`.
    ///
    /// Capability is left out only when no limits can be derived (fewer than
    /// two points or a constant series).
    pub fn analyses_for_series(&self, variable: &str, series: &ObservationSeries) -> Vec<Analysis> {
        let mut analyses = self.control_analyses();
        let spec = self
            .spec_for(variable)
            .or_else(|_| SpecLimits::derive_from(series));
        match spec {
            Ok(spec) => analyses.push(Analysis::Capability(spec)),
            Err(err) => debug!(variable, error = %err, "no specification limits for capability"),
        }
        analyses
    }

    /// Improvement plan against the configured Cpk goals.
    pub fn improvement_plan(&self, result: &CapabilityResult) -> Result<ImprovementPlan, SpcError> {
        improvement_plan(result, &self.improvement_targets)
    }

    fn control_analyses(&self) -> Vec<Analysis> {
        vec![
            Analysis::ControlChart(self.control_chart.clone()),
            Analysis::Ewma(self.ewma),
            Analysis::Cusum(self.cusum),
            Analysis::Rules(self.rules.clone()),
        ]
    }
}
