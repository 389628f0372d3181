//! Statistical Process Control (SPC) charts and pattern rules.
//!
//! # Control-Limit Engine
//!
//! - [`individuals_chart`] — Individuals and Moving Range chart (n = 1)
//! - [`xbar_r_chart`] — X-bar and Range chart for contiguous subgroups (n > 1)
//! - [`control_chart`] — dispatches on [`ControlChartConfig::subgroup_size`]
//!
//! # Sigma Estimation
//!
//! - [`moving_range_sigma`] — MR-bar / 1.128, shared with the capability engine
//! - [`subgroup_range_sigma`] — R-bar / d2(n)
//!
//! # Pattern Rules
//!
//! - [`evaluate_rules`] — the six Western Electric rules over one series
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - ASTM E2587 — Standard Practice for Use of Control Charts
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.

mod chart;
mod constants;
mod rules;
mod sigma;
mod variables;

pub use chart::{ControlLimitSet, OutOfControlPoint, Side};
pub use constants::{standard_constants, ConstantsTable, ControlConstants, MAX_STANDARD_SUBGROUP};
pub use rules::{
    check_rules, evaluate_rule, evaluate_rules, PatternSide, RuleConfig, RuleId, RuleReport,
    RuleViolation,
};
pub use sigma::{average_moving_range, moving_range_sigma, subgroup_range_sigma, SigmaMethod, Subgroups};
pub(crate) use sigma::ensure_nondegenerate;
pub use variables::{
    control_chart, individuals_chart, xbar_r_chart, ChartKind, ChartPoint, ControlChart,
    ControlChartConfig,
};
