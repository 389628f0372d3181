//! Exponentially Weighted Moving Average (EWMA) chart for detecting small shifts.
//!
//! # Algorithm
//!
//! ```text
//! z_0 = mu_0
//! z_i = lambda * x_i + (1 - lambda) * z_{i-1},   i >= 1
//! ```
//!
//! where `mu_0` is the series mean (or a configured target). Time-varying
//! control limits at 0-based index `i`:
//!
//! ```text
//! UCL_i / LCL_i = mu_0 ± L * sigma * sqrt(lambda / (2 - lambda) * (1 - (1 - lambda)^(2(i+1))))
//! ```
//!
//! The limits widen toward the asymptote `mu_0 ± L * sigma * sqrt(lambda / (2 - lambda))`.
//!
//! # Parameters
//!
//! - **lambda**: smoothing constant in (0, 1]. Smaller values give more weight
//!   to history and detect smaller shifts. Typical range 0.05-0.25.
//! - **L**: limit width in multiples of sigma. Typical 2.7-3.0.
//!
//! # Reference
//!
//! Roberts, S.W. (1959). "Control Chart Tests Based on Geometric Moving Averages",
//! *Technometrics* 1(3), pp. 239-250.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, SpcError};
use crate::series::ObservationSeries;
use crate::spc::{SigmaMethod, Side};

/// Lambda below which the chart is considered tuned for small shifts.
const SMALL_SHIFT_LAMBDA: f64 = 0.3;

/// How the first EWMA value is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EwmaAnchor {
    /// `z_0 = mu_0`; the first observation does not enter the statistic.
    #[default]
    MeanAsFirstPoint,
    /// `mu_0` acts as the prior `z_{-1}`, so `z_0 = lambda * x_0 + (1 - lambda) * mu_0`.
    MeanAsPrior,
}

/// Direction of the most recent EWMA movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

/// EWMA chart parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EwmaConfig {
    /// Smoothing constant (0 < lambda <= 1).
    pub lambda: f64,
    /// Control limit width factor (L).
    pub l_factor: f64,
    pub sigma: SigmaMethod,
    pub anchor: EwmaAnchor,
    /// Number of trailing EWMA values inspected for a trend.
    pub trend_window: usize,
    /// Process target mu_0; the series mean when absent.
    pub target: Option<f64>,
}

impl Default for EwmaConfig {
    fn default() -> Self {
        Self {
            lambda: 0.2,
            l_factor: 3.0,
            sigma: SigmaMethod::SampleStdDev,
            anchor: EwmaAnchor::MeanAsFirstPoint,
            trend_window: 10,
            target: None,
        }
    }
}

impl EwmaConfig {
    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.lambda.is_finite() || self.lambda <= 0.0 || self.lambda > 1.0 {
            return Err(SpcError::config("lambda", format!("must be in (0, 1], got {}", self.lambda)));
        }
        if !self.l_factor.is_finite() || self.l_factor <= 0.0 {
            return Err(SpcError::config(
                "l_factor",
                format!("must be finite and positive, got {}", self.l_factor),
            ));
        }
        self.sigma.validate()?;
        if self.trend_window < 2 {
            return Err(SpcError::config(
                "trend_window",
                format!("must be at least 2, got {}", self.trend_window),
            ));
        }
        if let Some(target) = self.target {
            if !target.is_finite() {
                return Err(SpcError::config("target", format!("must be finite, got {target}")));
            }
        }
        Ok(())
    }

    /// Half-width of the limits at 0-based index `i`.
    ///
    /// The exponent `2(i + 1)` accounts for the reduced variance of the
    /// statistic in early observations.
    fn control_limit_half_width(&self, sigma: f64, i: usize) -> f64 {
        let asymptotic_var = self.lambda / (2.0 - self.lambda);
        let exponent = i32::try_from(2 * (i + 1)).unwrap_or(i32::MAX);
        let decay = (1.0 - self.lambda).powi(exponent);
        self.l_factor * sigma * (asymptotic_var * (1.0 - decay)).sqrt()
    }

    fn asymptotic_half_width(&self, sigma: f64) -> f64 {
        self.l_factor * sigma * (self.lambda / (2.0 - self.lambda)).sqrt()
    }
}

/// One point of an EWMA chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EwmaPoint {
    pub index: usize,
    /// Raw observation x_i.
    pub value: f64,
    /// EWMA statistic z_i.
    pub ewma: f64,
    pub upper_limit: f64,
    pub lower_limit: f64,
    /// Side of the breached limit, if any.
    pub alarm: Option<Side>,
}

/// EWMA chart over a whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EwmaChart {
    pub center_line: f64,
    pub sigma: f64,
    pub lambda: f64,
    pub l_factor: f64,
    pub points: Vec<EwmaPoint>,
    pub asymptotic_upper: f64,
    pub asymptotic_lower: f64,
    pub trend: Trend,
    /// `lambda < 0.3`.
    pub sensitive_to_small_shifts: bool,
}

impl EwmaChart {
    /// Points whose statistic is beyond its limits.
    pub fn alarms(&self) -> impl Iterator<Item = &EwmaPoint> {
        self.points.iter().filter(|p| p.alarm.is_some())
    }

    pub fn alarm_count(&self) -> usize {
        self.alarms().count()
    }

    pub fn is_in_control(&self) -> bool {
        self.alarm_count() == 0
    }

    /// The EWMA statistic aligned with the input series.
    pub fn ewma_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.ewma).collect()
    }
}

/// Computes the EWMA chart for `series`.
///
/// The recurrence is strictly sequential; every call recomputes the whole
/// statistic from the first observation.
///
/// # Errors
///
/// - `UnsupportedConfiguration` for out-of-range parameters.
/// - `InsufficientData` or `DegenerateVariance` from the sigma estimate.
///
/// # Examples
///
/// ```
/// use spc_engine::ObservationSeries;
/// use spc_engine::detection::{ewma_chart, EwmaConfig};
///
/// let series = ObservationSeries::new(vec![10.0, 10.2, 9.9, 10.1, 10.0, 9.8]).unwrap();
/// let chart = ewma_chart(&series, &EwmaConfig::default()).unwrap();
/// assert_eq!(chart.points.len(), 6);
/// assert_eq!(chart.points[0].ewma, chart.center_line);
/// assert!(chart.is_in_control());
/// ```
pub fn ewma_chart(series: &ObservationSeries, config: &EwmaConfig) -> Result<EwmaChart> {
    config.validate()?;
    series.require("ewma", 1)?;
    let center = match config.target {
        Some(target) => target,
        None => series.mean()?,
    };
    let sigma = config.sigma.estimate(series)?;
    let lambda = config.lambda;

    let mut points = Vec::with_capacity(series.len());
    let mut z = center;
    for (i, &x) in series.values().iter().enumerate() {
        if i > 0 || config.anchor == EwmaAnchor::MeanAsPrior {
            z = lambda * x + (1.0 - lambda) * z;
        }
        let half_width = config.control_limit_half_width(sigma, i);
        let upper_limit = center + half_width;
        let lower_limit = center - half_width;
        let alarm = if z > upper_limit {
            Some(Side::Upper)
        } else if z < lower_limit {
            Some(Side::Lower)
        } else {
            None
        };
        if let Some(side) = alarm {
            trace!(index = i, ewma = z, ?side, "ewma beyond limit");
        }
        points.push(EwmaPoint {
            index: i,
            value: x,
            ewma: z,
            upper_limit,
            lower_limit,
            alarm,
        });
    }

    let asymptotic = config.asymptotic_half_width(sigma);
    let chart = EwmaChart {
        center_line: center,
        sigma,
        lambda,
        l_factor: config.l_factor,
        trend: classify_trend(&points, config.trend_window),
        points,
        asymptotic_upper: center + asymptotic,
        asymptotic_lower: center - asymptotic,
        sensitive_to_small_shifts: lambda < SMALL_SHIFT_LAMBDA,
    };
    debug!(
        n = series.len(),
        center_line = center,
        sigma,
        lambda,
        alarms = chart.alarm_count(),
        trend = ?chart.trend,
        "ewma computed"
    );
    Ok(chart)
}

/// Strictly monotonic over the last `window` points, else stable. Series
/// shorter than the window are stable.
fn classify_trend(points: &[EwmaPoint], window: usize) -> Trend {
    if points.len() < window {
        return Trend::Stable;
    }
    let recent = &points[points.len() - window..];
    if recent.windows(2).all(|w| w[1].ewma > w[0].ewma) {
        Trend::Rising
    } else if recent.windows(2).all(|w| w[1].ewma < w[0].ewma) {
        Trend::Falling
    } else {
        Trend::Stable
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lambda_one_reproduces_series(
            data in proptest::collection::vec(-1e3_f64..1e3, 1..=40),
        ) {
            let series = ObservationSeries::new(data.clone()).unwrap();
            let config = EwmaConfig {
                lambda: 1.0,
                anchor: EwmaAnchor::MeanAsPrior,
                sigma: SigmaMethod::Known(1.0),
                ..EwmaConfig::default()
            };
            let chart = ewma_chart(&series, &config).unwrap();
            prop_assert_eq!(chart.ewma_values(), data);
        }

        #[test]
        fn limits_never_narrow(
            data in proptest::collection::vec(-1e3_f64..1e3, 2..=40),
            lambda in 0.01_f64..=1.0,
        ) {
            let series = ObservationSeries::new(data).unwrap();
            let config = EwmaConfig {
                lambda,
                sigma: SigmaMethod::Known(1.0),
                ..EwmaConfig::default()
            };
            let chart = ewma_chart(&series, &config).unwrap();
            for w in chart.points.windows(2) {
                prop_assert!(w[1].upper_limit >= w[0].upper_limit);
                prop_assert!(w[1].upper_limit <= chart.asymptotic_upper + 1e-9);
            }
        }

        #[test]
        fn chart_is_deterministic(
            data in proptest::collection::vec(-1e3_f64..1e3, 2..=40),
            lambda in 0.01_f64..=1.0,
        ) {
            let series = ObservationSeries::new(data).unwrap();
            let config = EwmaConfig { lambda, ..EwmaConfig::default() };
            prop_assert_eq!(ewma_chart(&series, &config), ewma_chart(&series, &config));
        }
    }
}
