//! Standard normal distribution functions.
//!
//! Both functions are expressed through the complementary error function so
//! that tail probabilities keep full relative precision far from the mean.
//!
//! ```text
//! Phi(z)      = 0.5 * erfc(-z / sqrt(2))
//! Phi_inv(p)  = -sqrt(2) * erfc_inv(2p)
//! ```

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

/// Standard normal cumulative distribution function Phi(z).
///
/// # Examples
/// ```
/// use spc_engine::special::standard_normal_cdf;
/// assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-15);
/// assert!((standard_normal_cdf(1.959964) - 0.975).abs() < 1e-6);
/// ```
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Inverse standard normal CDF.
///
/// Returns `-inf` at `p == 0`, `+inf` at `p == 1` and NaN outside `[0, 1]`.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}
