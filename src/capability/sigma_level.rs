//! Sigma quality level conversions.
//!
//! Converts between one-sided defect rates in parts per million and sigma
//! quality levels under the 1.5-sigma long-term shift convention:
//!
//! | Sigma | PPM |
//! |-------|---------|
//! | 6.0   | 3.4     |
//! | 5.0   | 233     |
//! | 4.0   | 6,210   |
//! | 3.0   | 66,807  |
//! | 2.0   | 308,538 |
//!
//! A capability engine result relates to these through
//! `sigma_level = 3 · Cpk + 1.5`.
//!
//! # References
//!
//! - Harry & Schroeder (2000), *Six Sigma: The Breakthrough Management
//!   Strategy Revolutionizing the World's Top Corporations*.

use crate::special::{inverse_normal_cdf, standard_normal_cdf};

/// Long-term mean shift in sigma units.
pub const LONG_TERM_SHIFT: f64 = 1.5;

/// Sigma level to PPM: `1e6 · (1 − Phi(sigma − 1.5))`.
///
/// # Examples
///
/// ```
/// use spc_engine::capability::sigma_to_ppm;
///
/// assert!((sigma_to_ppm(6.0) - 3.4).abs() < 0.1);
/// assert!((sigma_to_ppm(3.0) - 66_807.0).abs() < 5.0);
/// ```
pub fn sigma_to_ppm(sigma: f64) -> f64 {
    1_000_000.0 * standard_normal_cdf(LONG_TERM_SHIFT - sigma)
}

/// PPM to sigma level: `Phi_inv(1 − ppm / 1e6) + 1.5`.
///
/// Returns `None` unless `0 < ppm < 1_000_000`.
///
/// # Examples
///
/// ```
/// use spc_engine::capability::ppm_to_sigma;
///
/// let sigma = ppm_to_sigma(3.4).unwrap();
/// assert!((sigma - 6.0).abs() < 0.01);
/// assert!(ppm_to_sigma(0.0).is_none());
/// ```
pub fn ppm_to_sigma(ppm: f64) -> Option<f64> {
    if !(ppm > 0.0 && ppm < 1_000_000.0) {
        return None;
    }
    let z = -inverse_normal_cdf(ppm / 1_000_000.0);
    z.is_finite().then_some(z + LONG_TERM_SHIFT)
}

/// Sigma level implied by a Cpk value.
pub fn sigma_level_from_cpk(cpk: f64) -> f64 {
    3.0 * cpk + LONG_TERM_SHIFT
}
