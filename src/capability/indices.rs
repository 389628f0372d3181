//! Process capability indices (Cp, Cpk, Cpm, Pp, Ppk), PPM and interpretation.
//!
//! Short-term indices (Cp, Cpk, CPU, CPL, Cpm) use the moving-range sigma
//! `sigma_within = MR-bar / 1.128`, the same estimator as the individuals
//! chart. Long-term indices (Pp, Ppk, PPU, PPL) use the sample standard
//! deviation `sigma_overall`.
//!
//! # References
//!
//! - Montgomery (2019), *Introduction to Statistical Quality Control*, 8th ed.,
//!   Chapter 8.
//! - Kane (1986), "Process Capability Indices", *Journal of Quality Technology*
//!   18(1), pp. 41--52.
//! - Chan, Cheng & Spiring (1988), "A New Measure of Process Capability: Cpm",
//!   *Journal of Quality Technology* 20(3), pp. 162--175.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sigma_level::{ppm_to_sigma, sigma_level_from_cpk};
use super::spec_limits::SpecLimits;
use crate::error::Result;
use crate::series::{GroupedSeries, ObservationSeries};
use crate::special::standard_normal_cdf;
use crate::spc::{ensure_nondegenerate, moving_range_sigma};

/// Parts per million scale.
const PPM: f64 = 1_000_000.0;

/// Computed capability and performance indices.
///
/// | Index | Value | Interpretation |
/// |-------|-------|----------------|
/// | Cp/Pp | >= 1.33 | Process spread fits the tolerance |
/// | Cpk/Ppk | >= 1.33 | Capable and centered |
/// | Cpm | >= 1.33 | Meets the Taguchi loss criterion |
///
/// Reference: Montgomery (2019), Chapter 8, Table 8.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityIndices {
    /// Cp = (USL − LSL) / (6 · sigma_within).
    pub cp: f64,
    /// Cpk = min(CPU, CPL).
    pub cpk: f64,
    /// CPU = (USL − mean) / (3 · sigma_within).
    pub cpu: f64,
    /// CPL = (mean − LSL) / (3 · sigma_within).
    pub cpl: f64,
    /// Cpm = (USL − LSL) / (6 · sqrt(sigma_within² + (mean − target)²)).
    ///
    /// Reference: Chan, Cheng & Spiring (1988).
    pub cpm: f64,
    /// Pp = (USL − LSL) / (6 · sigma_overall).
    pub pp: f64,
    /// Ppk = min(PPU, PPL).
    pub ppk: f64,
    pub ppu: f64,
    pub ppl: f64,
    /// Centering index k = |mean − target| / ((USL − LSL) / 2).
    pub k: f64,
}

/// Expected (normal model, sigma_within) and observed defect rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PpmEstimate {
    pub expected_above_usl: f64,
    pub expected_below_lsl: f64,
    pub expected_total: f64,
    pub observed_above_usl: f64,
    pub observed_below_lsl: f64,
    pub observed_total: f64,
}

/// Interpretation band derived from Cpk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityBand {
    /// Cpk < 0: the mean lies outside the specification.
    SpecViolating,
    /// 0 <= Cpk < 0.67
    Inadequate,
    /// 0.67 <= Cpk < 1.00
    Poor,
    /// 1.00 <= Cpk < 1.33
    Acceptable,
    /// 1.33 <= Cpk < 1.67
    Good,
    /// 1.67 <= Cpk < 2.00
    Excellent,
    /// Cpk >= 2.00
    WorldClass,
}

impl CapabilityBand {
    /// Band for a Cpk value.
    pub fn from_cpk(cpk: f64) -> Self {
        match cpk {
            c if c < 0.0 => Self::SpecViolating,
            c if c < 0.67 => Self::Inadequate,
            c if c < 1.00 => Self::Poor,
            c if c < 1.33 => Self::Acceptable,
            c if c < 1.67 => Self::Good,
            c if c < 2.00 => Self::Excellent,
            _ => Self::WorldClass,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SpecViolating => "spec-violating",
            Self::Inadequate => "inadequate",
            Self::Poor => "poor",
            Self::Acceptable => "acceptable",
            Self::Good => "good",
            Self::Excellent => "excellent",
            Self::WorldClass => "world-class",
        }
    }

    /// `true` from [`CapabilityBand::Good`] upwards (Cpk >= 1.33).
    pub fn is_capable(self) -> bool {
        self >= Self::Good
    }
}

/// Centering judgement from k.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Centering {
    /// k < 0.2
    Good,
    OffCenter,
}

/// Spread judgement from Cp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variation {
    /// Cp > 1.33
    Controlled,
    High,
}

/// Suggested next action from (Cp, Cpk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Cpk < 0.67: recentre and reduce variation immediately.
    UrgentRecenterAndReduce,
    /// Spread is fine, the mean is off target.
    RecenterOnly,
    /// Spread is too wide even if centred.
    ReduceVariation,
    /// Cpk >= 1.33.
    Maintain,
    RecenterAndReduce,
}

impl Recommendation {
    pub fn from_indices(cp: f64, cpk: f64) -> Self {
        if cpk < 0.67 {
            Self::UrgentRecenterAndReduce
        } else if cp > 1.33 && cpk < 1.00 {
            Self::RecenterOnly
        } else if cp < 1.00 {
            Self::ReduceVariation
        } else if cpk >= 1.33 {
            Self::Maintain
        } else {
            Self::RecenterAndReduce
        }
    }
}

/// Full capability analysis of one series against one specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResult {
    pub n: usize,
    pub mean: f64,
    /// MR-bar / 1.128.
    pub sigma_within: f64,
    /// Sample standard deviation, N−1 divisor.
    pub sigma_overall: f64,
    /// Limits used, with the target resolved.
    pub spec: SpecLimits,
    pub indices: CapabilityIndices,
    /// 3 · Cpk + 1.5.
    pub sigma_level: f64,
    /// Observed PPM converted back to a sigma level; `None` at 0 or 1e6 PPM.
    pub observed_sigma_level: Option<f64>,
    pub ppm: PpmEstimate,
    pub band: CapabilityBand,
    pub centering: Centering,
    pub variation: Variation,
    pub recommendation: Recommendation,
}

/// Computes capability indices for `series` against `spec`.
///
/// # Errors
///
/// - `InvalidSpecLimits` when `spec` fails validation.
/// - `InsufficientData` for fewer than two observations.
/// - `DegenerateVariance` when sigma_within is zero or numerically zero.
///
/// # Examples
///
/// ```
/// use spc_engine::ObservationSeries;
/// use spc_engine::capability::{analyze_capability, SpecLimits};
///
/// let series = ObservationSeries::new(vec![9.8, 10.1, 10.0, 9.9, 10.2, 10.0]).unwrap();
/// let spec = SpecLimits::new(11.0, 9.0).unwrap();
/// let result = analyze_capability(&series, &spec).unwrap();
/// assert!(result.indices.cpk <= result.indices.cp);
/// assert!(result.band.is_capable());
///
/// let flat = ObservationSeries::new(vec![7.0; 5]).unwrap();
/// assert!(analyze_capability(&flat, &spec).is_err());
/// ```
pub fn analyze_capability(series: &ObservationSeries, spec: &SpecLimits) -> Result<CapabilityResult> {
    spec.validate()?;
    series.require("capability analysis", 2)?;

    let values = series.values();
    let mean = series.mean()?;
    let sigma_within = ensure_nondegenerate(moving_range_sigma(values)?, mean, "sigma_within")?;
    let sigma_overall = ensure_nondegenerate(series.std_dev()?, mean, "sigma_overall")?;

    let target = spec.target_or_midpoint();
    let spec = SpecLimits {
        target: Some(target),
        ..*spec
    };
    let indices = compute_indices(&spec, mean, sigma_within, sigma_overall);
    let ppm = compute_ppm(values, &spec, mean, sigma_within);

    let result = CapabilityResult {
        n: values.len(),
        mean,
        sigma_within,
        sigma_overall,
        spec,
        indices,
        sigma_level: sigma_level_from_cpk(indices.cpk),
        observed_sigma_level: ppm_to_sigma(ppm.observed_total),
        ppm,
        band: CapabilityBand::from_cpk(indices.cpk),
        centering: if indices.k < 0.2 {
            Centering::Good
        } else {
            Centering::OffCenter
        },
        variation: if indices.cp > 1.33 {
            Variation::Controlled
        } else {
            Variation::High
        },
        recommendation: Recommendation::from_indices(indices.cp, indices.cpk),
    };
    debug!(
        n = result.n,
        mean,
        sigma_within,
        cp = indices.cp,
        cpk = indices.cpk,
        band = result.band.label(),
        "capability computed"
    );
    Ok(result)
}

/// Capability per group; each group succeeds or fails independently.
pub fn capability_by_group(
    groups: &GroupedSeries,
    spec: &SpecLimits,
) -> BTreeMap<String, Result<CapabilityResult>> {
    groups
        .iter()
        .map(|(key, series)| (key.to_string(), analyze_capability(series, spec)))
        .collect()
}

/// The group with the lowest Cpk among groups that could be analysed.
pub fn worst_group(results: &BTreeMap<String, Result<CapabilityResult>>) -> Option<(&str, &CapabilityResult)> {
    results
        .iter()
        .filter_map(|(key, result)| result.as_ref().ok().map(|r| (key.as_str(), r)))
        .min_by(|a, b| a.1.indices.cpk.total_cmp(&b.1.indices.cpk))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compute_indices(spec: &SpecLimits, mean: f64, sigma_within: f64, sigma_overall: f64) -> CapabilityIndices {
    let target = spec.target_or_midpoint();
    let width = spec.width();

    let cpu = (spec.usl - mean) / (3.0 * sigma_within);
    let cpl = (mean - spec.lsl) / (3.0 * sigma_within);
    let ppu = (spec.usl - mean) / (3.0 * sigma_overall);
    let ppl = (mean - spec.lsl) / (3.0 * sigma_overall);
    let offset = mean - target;

    CapabilityIndices {
        cp: width / (6.0 * sigma_within),
        cpk: cpu.min(cpl),
        cpu,
        cpl,
        cpm: width / (6.0 * (sigma_within * sigma_within + offset * offset).sqrt()),
        pp: width / (6.0 * sigma_overall),
        ppk: ppu.min(ppl),
        ppu,
        ppl,
        k: offset.abs() / (width / 2.0),
    }
}

fn compute_ppm(values: &[f64], spec: &SpecLimits, mean: f64, sigma_within: f64) -> PpmEstimate {
    let z_upper = (spec.usl - mean) / sigma_within;
    let z_lower = (spec.lsl - mean) / sigma_within;
    let expected_above_usl = standard_normal_cdf(-z_upper) * PPM;
    let expected_below_lsl = standard_normal_cdf(z_lower) * PPM;

    let n = values.len() as f64;
    let above = values.iter().filter(|&&x| x > spec.usl).count() as f64;
    let below = values.iter().filter(|&&x| x < spec.lsl).count() as f64;

    PpmEstimate {
        expected_above_usl,
        expected_below_lsl,
        expected_total: expected_above_usl + expected_below_lsl,
        observed_above_usl: above / n * PPM,
        observed_below_lsl: below / n * PPM,
        observed_total: (above + below) / n * PPM,
    }
}
