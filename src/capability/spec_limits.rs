//! Specification limits for capability analysis.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};
use crate::series::ObservationSeries;
use crate::spc::ensure_nondegenerate;

/// Upper and lower specification limits with an optional target.
///
/// Both limits are required and `usl > lsl`. When `target` is absent the
/// midpoint `(usl + lsl) / 2` is used.
///
/// # Examples
///
/// ```
/// use spc_engine::capability::SpecLimits;
///
/// let spec = SpecLimits::new(20.0, 5.0).unwrap();
/// assert_eq!(spec.target_or_midpoint(), 12.5);
///
/// assert!(SpecLimits::new(5.0, 20.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecLimits {
    pub usl: f64,
    pub lsl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

impl SpecLimits {
    /// Two-sided limits with the midpoint as target.
    ///
    /// # Errors
    ///
    /// `InvalidSpecLimits` when either limit is non-finite or `usl <= lsl`.
    pub fn new(usl: f64, lsl: f64) -> Result<Self> {
        let spec = Self {
            usl,
            lsl,
            target: None,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Sets an explicit target value.
    pub fn with_target(mut self, target: f64) -> Result<Self> {
        self.target = Some(target);
        self.validate()?;
        Ok(self)
    }

    /// Default limits `mean ± 3s` with the mean as target, for variables that
    /// have no configured specification.
    ///
    /// # Errors
    ///
    /// `InsufficientData` for fewer than two observations, `DegenerateVariance`
    /// for a constant series.
    pub fn derive_from(series: &ObservationSeries) -> Result<Self> {
        let mean = series.mean()?;
        let sd = ensure_nondegenerate(series.std_dev()?, mean, "sample standard deviation")?;
        Self::new(mean + 3.0 * sd, mean - 3.0 * sd)?.with_target(mean)
    }

    /// Checks finiteness and ordering.
    pub fn validate(&self) -> Result<()> {
        if !self.usl.is_finite() || !self.lsl.is_finite() {
            return Err(SpcError::InvalidSpecLimits {
                reason: format!("limits must be finite (USL={}, LSL={})", self.usl, self.lsl),
            });
        }
        if self.usl <= self.lsl {
            return Err(SpcError::InvalidSpecLimits {
                reason: format!("USL ({}) must be greater than LSL ({})", self.usl, self.lsl),
            });
        }
        if let Some(target) = self.target {
            if !target.is_finite() {
                return Err(SpcError::InvalidSpecLimits {
                    reason: format!("target must be finite, got {target}"),
                });
            }
        }
        Ok(())
    }

    /// The explicit target, or the midpoint of the limits.
    pub fn target_or_midpoint(&self) -> f64 {
        self.target.unwrap_or((self.usl + self.lsl) / 2.0)
    }

    /// Tolerance width `usl − lsl`.
    pub fn width(&self) -> f64 {
        self.usl - self.lsl
    }

    /// `true` when `lsl <= x <= usl`.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lsl && x <= self.usl
    }
}
