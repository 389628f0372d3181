//! Core control chart value types.
//!
//! A [`ControlLimitSet`] is an immutable snapshot derived from one series;
//! it is recomputed on every call and never updated incrementally.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - ASTM E2587 — Standard Practice for Use of Control Charts

use serde::{Deserialize, Serialize};

/// Center line and control limits for one chart.
///
/// # Invariants
///
/// - `lower_limit <= center_line <= upper_limit`
/// - For X/X-bar charts the limits are symmetric about the center line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlLimitSet {
    /// Center line (process mean, or average dispersion for R/MR charts).
    pub center_line: f64,
    /// Upper control limit.
    pub upper_limit: f64,
    /// Lower control limit.
    pub lower_limit: f64,
    /// Process sigma the limits were derived from.
    pub sigma_estimate: f64,
}

impl ControlLimitSet {
    /// Symmetric limits `center ± half_width`.
    pub fn symmetric(center_line: f64, half_width: f64, sigma_estimate: f64) -> Self {
        Self {
            center_line,
            upper_limit: center_line + half_width,
            lower_limit: center_line - half_width,
            sigma_estimate,
        }
    }

    /// Which side of the limits `value` falls on, `None` when inside.
    ///
    /// Points exactly on a limit are in control.
    pub fn classify(&self, value: f64) -> Option<Side> {
        if value > self.upper_limit {
            Some(Side::Upper)
        } else if value < self.lower_limit {
            Some(Side::Lower)
        } else {
            None
        }
    }

    /// Flags every value strictly beyond the limits. Reported indices are
    /// `position + index_offset`.
    pub fn out_of_control(&self, values: &[f64], index_offset: usize) -> Vec<OutOfControlPoint> {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, &value)| {
                self.classify(value).map(|side| OutOfControlPoint {
                    index: i + index_offset,
                    value,
                    side,
                })
            })
            .collect()
    }
}

/// Direction of a departure from the center line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Upper,
    Lower,
}

/// A plotted statistic beyond its control limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutOfControlPoint {
    /// Position of the point on its chart.
    pub index: usize,
    /// The plotted value.
    pub value: f64,
    pub side: Side,
}
