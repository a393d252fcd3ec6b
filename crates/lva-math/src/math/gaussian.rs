//! Univariate Gaussian helpers used by the interval emission model.

use std::f64::consts::PI;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)

/// Log-density of `N(mean, variance)` at `x`.
///
/// Returns NaN for non-positive or non-finite variance.
pub fn gaussian_log_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    if variance.is_nan() || variance <= 0.0 || variance.is_infinite() {
        return f64::NAN;
    }
    let diff = x - mean;
    -LOG_SQRT_2PI - 0.5 * variance.ln() - 0.5 * diff * diff / variance
}

/// Map two independent uniforms to a standard normal deviate (Box-Muller).
///
/// `u1` must lie in (0, 1]; it is clamped away from zero so the result is
/// always finite.
pub fn standard_normal_from_uniforms(u1: f64, u2: f64) -> f64 {
    let u1 = u1.clamp(f64::MIN_POSITIVE, 1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Inverse-CDF draw from a discrete distribution given one uniform in [0, 1).
///
/// Falls back to the last index with positive mass when rounding leaves the
/// cumulative sum short of `u`.
pub fn categorical_index(probs: &[f64], u: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &p) in probs.iter().enumerate() {
        if p > 0.0 {
            last_positive = Some(i);
        }
        cumulative += p;
        if u < cumulative {
            return Some(i);
        }
    }
    last_positive
}
