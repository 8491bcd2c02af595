//! Numeric helpers for log-space arithmetic.
//!
//! Every value flowing through the evaluation, derivative and search passes
//! is a natural logarithm of a non-negative quantity, so "zero" is `-inf`
//! and "one" is `0.0`.

/// Tolerance used by [`float_equal`].
pub const EPSILON: f64 = 1e-6;

/// Log-sum-exp of an arbitrary number of log-space terms.
///
/// ```text
/// log_sum_exp(x₁, …, xₙ) = m + log Σ exp(xᵢ - m),   m = max xᵢ
/// ```
///
/// Returns `-inf` for an empty input, and also when every term is `-inf`
/// (the exponentials are never evaluated in that case, so no `NaN` appears).
///
/// ```
/// use spn_map::utils::log_sum_exp;
///
/// let x = log_sum_exp([0.5f64.ln(), 0.25f64.ln(), 0.25f64.ln()]);
/// assert!(x.abs() < 1e-12);
/// assert_eq!(log_sum_exp(std::iter::empty::<f64>()), f64::NEG_INFINITY);
/// ```
pub fn log_sum_exp<I>(xs: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let xs = xs.into_iter();
    let max = xs.clone().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = xs.map(|x| (x - max).exp()).sum();
    max + sum.ln()
}

/// Two-term log-sum-exp, `log(exp(a) + exp(b))`.
///
/// This is the accumulator form: `acc = log_add(acc, x)` with `acc`
/// starting at `-inf`.
pub fn log_add(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// Approximate equality with absolute-then-relative tolerance.
///
/// Two values are equal if they differ by at most [`EPSILON`]. Otherwise, if
/// either is (absolutely) close to zero they are considered different, and
/// failing that they are equal if the difference is within [`EPSILON`]
/// relative to either operand.
///
/// Meant for tie detection when comparing results, never for pruning.
pub fn float_equal(x: f64, y: f64) -> bool {
    if x == y {
        // Covers matching infinities, where `x - y` would be NaN.
        return true;
    }
    let diff = x - y;
    if (-EPSILON..=EPSILON).contains(&diff) {
        return true;
    }
    if (-EPSILON..=EPSILON).contains(&x) || (-EPSILON..=EPSILON).contains(&y) {
        return false;
    }
    let rx = diff / x;
    let ry = diff / y;
    (-EPSILON..=EPSILON).contains(&rx) || (-EPSILON..=EPSILON).contains(&ry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sum_exp_matches_direct() {
        let xs = [-1.0, -2.5, 0.3, -10.0];
        let direct = xs.iter().map(|x: &f64| x.exp()).sum::<f64>().ln();
        assert!((log_sum_exp(xs) - direct).abs() < 1e-12);
    }

    #[test]
    fn test_log_sum_exp_degenerate() {
        assert_eq!(log_sum_exp([0.0f64; 0]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp([f64::NEG_INFINITY; 3]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp([f64::NEG_INFINITY, -2.0]), -2.0);
    }

    #[test]
    fn test_log_sum_exp_large_magnitudes() {
        // Naive exp() would underflow to zero here.
        let x = log_sum_exp([-1000.0, -1000.0]);
        assert!((x - (-1000.0 + 2f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn test_log_add() {
        assert_eq!(log_add(f64::NEG_INFINITY, f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(log_add(f64::NEG_INFINITY, 1.5), 1.5);
        assert_eq!(log_add(1.5, f64::NEG_INFINITY), 1.5);
        let x = log_add(0.2f64.ln(), 0.3f64.ln());
        assert!((x - 0.5f64.ln()).abs() < 1e-12);
        assert!((log_add(-3.0, -7.0) - log_sum_exp([-3.0, -7.0])).abs() < 1e-12);
    }

    #[test]
    fn test_float_equal() {
        assert!(float_equal(1.0, 1.0 + 1e-7));
        assert!(float_equal(-1234.5, -1234.5 * (1.0 + 1e-7)));
        assert!(!float_equal(-1234.5, -1234.6));
        assert!(!float_equal(0.0, 1e-3));
        assert!(float_equal(f64::NEG_INFINITY, f64::NEG_INFINITY));
        assert!(!float_equal(f64::NEG_INFINITY, -1.0));
    }
}
