//! Numerically stable primitives for log-domain likelihood math.

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    for v in values {
        sum += (*v - max).exp();
    }
    max + sum.ln()
}

/// Safe natural log: `ln(0) = -inf` instead of a NaN-producing path for
/// negative rounding noise.
pub fn safe_ln(p: f64) -> f64 {
    if p <= 0.0 {
        f64::NEG_INFINITY
    } else {
        p.ln()
    }
}

/// Turn log-weights into a probability vector.
///
/// Returns None when every weight is -inf or any weight is NaN.
pub fn normalize_log_weights(log_weights: &[f64]) -> Option<Vec<f64>> {
    let total = log_sum_exp(log_weights);
    if !total.is_finite() {
        return None;
    }
    Some(log_weights.iter().map(|w| (w - total).exp()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn log_sum_exp_basic() {
        let v = [0.0, 0.0];
        let out = log_sum_exp(&v);
        assert!(approx_eq(out, 2.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_sum_exp_dominance() {
        let v = [-1000.0, 0.0];
        let out = log_sum_exp(&v);
        assert!(approx_eq(out, 0.0, 1e-12));
    }

    #[test]
    fn log_sum_exp_all_neg_inf() {
        let v = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        let out = log_sum_exp(&v);
        assert!(out.is_infinite() && out.is_sign_negative());
    }

    #[test]
    fn log_sum_exp_nan_propagates() {
        let out = log_sum_exp(&[0.0, f64::NAN]);
        assert!(out.is_nan());
    }

    #[test]
    fn safe_ln_zero_is_neg_inf() {
        assert_eq!(safe_ln(0.0), f64::NEG_INFINITY);
        assert_eq!(safe_ln(-1e-300), f64::NEG_INFINITY);
        assert!(approx_eq(safe_ln(1.0), 0.0, 1e-15));
    }

    #[test]
    fn normalize_log_weights_sums_to_one() {
        let probs = normalize_log_weights(&[-1000.0, -1001.0, f64::NEG_INFINITY]).unwrap();
        let sum: f64 = probs.iter().sum();
        assert!(approx_eq(sum, 1.0, 1e-12));
        assert_eq!(probs[2], 0.0);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn normalize_log_weights_rejects_all_neg_inf() {
        assert!(normalize_log_weights(&[f64::NEG_INFINITY; 3]).is_none());
        assert!(normalize_log_weights(&[]).is_none());
    }
}
