//! Sequential shift detection.
//!
//! Both monitors carry state from one observation to the next, so each
//! point depends on the full history before it.
//!
//! # Charts
//!
//! - [`ewma_chart`] — Exponentially Weighted Moving Average chart (Roberts, 1959)
//!   with time-varying limits
//! - [`cusum_chart`] — tabular Cumulative Sum chart (Page, 1954) with a fixed
//!   decision interval and shift-onset estimation
//!
//! # References
//!
//! - Page, E.S. (1954). "Continuous Inspection Schemes",
//!   *Biometrika* 41(1/2), pp. 100-115.
//! - Roberts, S.W. (1959). "Control Chart Tests Based on Geometric Moving Averages",
//!   *Technometrics* 1(3), pp. 239-250.

mod cusum;
mod ewma;

pub use cusum::{cusum_chart, CusumAlarm, CusumChart, CusumConfig, ShiftDirection};
pub use ewma::{ewma_chart, EwmaAnchor, EwmaChart, EwmaConfig, EwmaPoint, Trend};
