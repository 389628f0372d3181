//! Process capability analysis.
//!
//! Relates process spread and centering to specification limits.
//!
//! # Indices
//!
//! - **Cp**, **Cpk**, **CPU**, **CPL** — short-term capability (moving-range sigma)
//! - **Pp**, **Ppk**, **PPU**, **PPL** — long-term performance (sample sigma)
//! - **Cpm** — Taguchi capability (target deviation)
//! - **k** — centering index
//!
//! # Sigma Level
//!
//! - [`sigma_to_ppm`] — Convert sigma level to PPM defect rate
//! - [`ppm_to_sigma`] — Convert PPM defect rate to sigma level
//!
//! # Improvement
//!
//! - [`improvement_plan`] — sigma and centring needed for each target Cpk
//!
//! # References
//!
//! - Montgomery (2019), *Introduction to Statistical Quality Control*, 8th ed.

mod improvement;
mod indices;
mod sigma_level;
mod spec_limits;

pub use improvement::{improvement_plan, improvement_target, ImprovementPlan, ImprovementTarget, STANDARD_TARGETS};
pub use indices::{
    analyze_capability, capability_by_group, worst_group, CapabilityBand, CapabilityIndices,
    CapabilityResult, Centering, PpmEstimate, Recommendation, Variation,
};
pub use sigma_level::{ppm_to_sigma, sigma_level_from_cpk, sigma_to_ppm, LONG_TERM_SHIFT};
pub use spec_limits::SpecLimits;
