//! Improvement targets derived from a capability result.
//!
//! For a target Cpk the plan answers two questions: how much must
//! sigma_within shrink at the current mean, and how far is the mean from
//! the target value.

use serde::{Deserialize, Serialize};

use super::indices::CapabilityResult;
use super::sigma_level::{sigma_level_from_cpk, sigma_to_ppm};
use crate::error::{Result, SpcError};

/// Conventional capability goals.
pub const STANDARD_TARGETS: [f64; 2] = [1.33, 1.67];

/// What it takes to reach one target Cpk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImprovementTarget {
    pub target_cpk: f64,
    /// Sigma reaching the target at the current mean; `None` when the mean
    /// lies outside the specification.
    pub required_sigma: Option<f64>,
    /// Sigma reaching the target once the process is centred.
    pub required_sigma_centered: f64,
    /// `max(0, (sigma − required) / sigma · 100)`; 100 when no sigma suffices.
    pub sigma_reduction_percent: f64,
    /// `|mean − target|`.
    pub centering_adjustment: f64,
    /// One-sided PPM at the target Cpk.
    pub expected_ppm: f64,
    pub already_met: bool,
}

/// Improvement targets for one analysed variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementPlan {
    pub current_cpk: f64,
    pub current_sigma: f64,
    /// Signed offset `mean − target`.
    pub mean_offset: f64,
    pub current_expected_ppm: f64,
    pub targets: Vec<ImprovementTarget>,
}

/// Requirements for reaching `target_cpk`.
///
/// # Errors
///
/// `UnsupportedConfiguration` unless `target_cpk` is finite and positive.
pub fn improvement_target(result: &CapabilityResult, target_cpk: f64) -> Result<ImprovementTarget> {
    if !target_cpk.is_finite() || target_cpk <= 0.0 {
        return Err(SpcError::config(
            "target_cpk",
            format!("must be finite and positive, got {target_cpk}"),
        ));
    }
    let spec = &result.spec;
    let sigma = result.sigma_within;
    let nearest = (spec.usl - result.mean).min(result.mean - spec.lsl);
    let required_sigma = (nearest > 0.0).then(|| nearest / (3.0 * target_cpk));
    let sigma_reduction_percent = match required_sigma {
        Some(required) => ((sigma - required) / sigma * 100.0).max(0.0),
        None => 100.0,
    };

    Ok(ImprovementTarget {
        target_cpk,
        required_sigma,
        required_sigma_centered: spec.width() / (6.0 * target_cpk),
        sigma_reduction_percent,
        centering_adjustment: (result.mean - spec.target_or_midpoint()).abs(),
        expected_ppm: sigma_to_ppm(sigma_level_from_cpk(target_cpk)),
        already_met: result.indices.cpk >= target_cpk,
    })
}

/// One [`ImprovementTarget`] per entry of `target_cpks`, in the given order.
///
/// Pass [`STANDARD_TARGETS`] for the conventional Cpk 1.33 and 1.67 goals.
///
/// # Errors
///
/// `UnsupportedConfiguration` if any target is not finite and positive.
///
/// # Examples
///
/// ```
/// use spc_engine::ObservationSeries;
/// use spc_engine::capability::{analyze_capability, improvement_plan, SpecLimits, STANDARD_TARGETS};
///
/// let series = ObservationSeries::new(vec![12.0, 14.0, 13.0, 15.0, 14.0, 12.0]).unwrap();
/// let result = analyze_capability(&series, &SpecLimits::new(16.0, 8.0).unwrap()).unwrap();
/// let plan = improvement_plan(&result, &STANDARD_TARGETS).unwrap();
/// assert_eq!(plan.targets.len(), 2);
/// assert!(plan.targets[1].sigma_reduction_percent >= plan.targets[0].sigma_reduction_percent);
/// ```
pub fn improvement_plan(result: &CapabilityResult, target_cpks: &[f64]) -> Result<ImprovementPlan> {
    let targets = target_cpks
        .iter()
        .map(|&cpk| improvement_target(result, cpk))
        .collect::<Result<Vec<_>>>()?;
    Ok(ImprovementPlan {
        current_cpk: result.indices.cpk,
        current_sigma: result.sigma_within,
        mean_offset: result.mean - result.spec.target_or_midpoint(),
        current_expected_ppm: result.ppm.expected_total,
        targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{analyze_capability, SpecLimits};
    use crate::series::ObservationSeries;

    fn analyze(values: &[f64], usl: f64, lsl: f64) -> CapabilityResult {
        let series = ObservationSeries::new(values.to_vec()).unwrap();
        analyze_capability(&series, &SpecLimits::new(usl, lsl).unwrap()).unwrap()
    }

    #[test]
    fn capable_process_needs_no_reduction_for_1_33() {
        let result = analyze(&[10.0, 10.1, 9.9, 10.0, 10.1, 9.9], 12.0, 8.0);
        assert!(result.indices.cpk > 1.67);
        let plan = improvement_plan(&result, &STANDARD_TARGETS).unwrap();
        for target in &plan.targets {
            assert!(target.already_met);
            assert_eq!(target.sigma_reduction_percent, 0.0);
        }
    }

    #[test]
    fn off_center_process_reduction() {
        // mean 14, sigma_within = 1.6 / 1.128, nearest limit 2 away
        let result = analyze(&[12.0, 14.0, 13.0, 15.0, 14.0, 16.0], 16.0, 8.0);
        let t = improvement_target(&result, 1.33).unwrap();
        let required = 2.0 / (3.0 * 1.33);
        assert!((t.required_sigma.unwrap() - required).abs() < 1e-12);
        let expected = (result.sigma_within - required) / result.sigma_within * 100.0;
        assert!((t.sigma_reduction_percent - expected).abs() < 1e-9);
        assert!((t.centering_adjustment - 2.0).abs() < 1e-12);
        assert!((t.required_sigma_centered - 8.0 / (6.0 * 1.33)).abs() < 1e-12);
        assert!(!t.already_met);
    }

    #[test]
    fn mean_outside_spec_needs_full_reduction() {
        let result = analyze(&[21.0, 22.0, 21.5, 22.5], 20.0, 10.0);
        let t = improvement_target(&result, 1.33).unwrap();
        assert_eq!(t.required_sigma, None);
        assert_eq!(t.sigma_reduction_percent, 100.0);
    }

    #[test]
    fn expected_ppm_matches_sigma_level() {
        let result = analyze(&[10.0, 10.2, 9.8, 10.1], 12.0, 8.0);
        let t = improvement_target(&result, 1.5).unwrap();
        // Cpk 1.5 => 6 sigma => ~3.4 PPM
        assert!((t.expected_ppm - 3.4).abs() < 0.1);
    }

    #[test]
    fn plan_follows_requested_targets() {
        let result = analyze(&[10.0, 10.2, 9.8, 10.1], 12.0, 8.0);
        let plan = improvement_plan(&result, &[1.5]).unwrap();
        assert_eq!(plan.targets.len(), 1);
        assert_eq!(plan.targets[0].target_cpk, 1.5);
        assert!(improvement_plan(&result, &[]).unwrap().targets.is_empty());
        assert!(improvement_plan(&result, &[1.33, -1.0]).is_err());
    }

    #[test]
    fn rejects_non_positive_target() {
        let result = analyze(&[10.0, 10.2, 9.8, 10.1], 12.0, 8.0);
        assert!(improvement_target(&result, 0.0).is_err());
        assert!(improvement_target(&result, f64::NAN).is_err());
    }
}
