//! Romberg quadrature
//!
//! Trapezoid refinement plus Richardson extrapolation over two rolling rows:
//! level `m` halves the spacing, reuses every previous evaluation (only the
//! `2^{m−2}` new midpoints are sampled), and each column applies
//!
//! ```text
//! T_m[j] = (4^j·T_m[j−1] − T_{m−1}[j−1]) / (4^j − 1)
//! ```
//!
//! boosting the trapezoidal estimate from order `2j` to order `2j+2`. The
//! error estimate is the difference of the deepest extrapolates of the last
//! two rows; convergence requires at least six levels and either tolerance.
//! Reversed bounds integrate the swapped interval and negate the result. The
//! report includes the *effective decimal precision* `⌊−log₁₀ ε_rel⌋` and a
//! string rendering of the result truncated to that many digits.

#![forbid(unsafe_code)]

use std::time::Instant;

use tracing::debug;

use crate::bigfloat::BigFloat;
use crate::context;
use crate::SolveStatus;

/// Quadrature options.
#[derive(Clone, Debug)]
pub struct RombergOptions {
    /// Absolute tolerance; `None` disables the absolute test.
    pub abs_tol: Option<f64>,
    /// Relative tolerance; `None` selects the current precision's ε_p.
    pub rel_tol: Option<f64>,
    /// Cap on refinement levels (each level doubles the sample count).
    pub max_levels: usize,
    /// Cap on Richardson columns per row.
    pub max_columns: usize,
    /// Wall-clock budget in milliseconds.
    pub max_time_ms: Option<u64>,
}

impl Default for RombergOptions {
    fn default() -> Self {
        RombergOptions {
            abs_tol: None,
            rel_tol: None,
            max_levels: 24,
            max_columns: 12,
            max_time_ms: None,
        }
    }
}

/// Quadrature result and convergence report.
#[derive(Debug)]
pub struct RombergResult {
    /// Best integral estimate.
    pub value: BigFloat,
    /// Absolute error estimate (last two deepest extrapolates).
    pub abs_err: BigFloat,
    /// Relative error estimate.
    pub rel_err: BigFloat,
    /// `⌊−log₁₀ ε_rel⌋`, the digits the estimate is believed good to.
    pub effective_digits: i64,
    /// The value rendered to `effective_digits` significant digits.
    pub summary: String,
    /// Refinement levels consumed.
    pub levels: usize,
    /// Integrand evaluations.
    pub evals: usize,
    /// `Done`, `NoConvergence`, or `Timeout`.
    pub status: SolveStatus,
}

/// Integrate `f` over `[a, b]`.
pub fn romberg<F>(mut f: F, a: &BigFloat, b: &BigFloat, opts: &RombergOptions) -> RombergResult
where
    F: FnMut(&BigFloat) -> BigFloat,
{
    let swapped = b < a;
    let (lo, hi) = if swapped { (b, a) } else { (a, b) };
    let started = Instant::now();

    let p = context::precision();
    let rel_tol = match opts.rel_tol {
        Some(tol) => BigFloat::from_f64(tol),
        None => {
            // Default: ε_p with sixteen bits of slack for the rounding noise
            // the trapezoid sums accumulate at working precision.
            let mut e = BigFloat::zero();
            e.set_epsilon().expect("fresh value is mutable");
            e.mul(&BigFloat::from_i64(1 << 16))
        }
    };
    let abs_tol = opts.abs_tol.map(BigFloat::from_f64);

    let span = hi.sub(lo);
    let half = BigFloat::from_f64(0.5);
    let mut evals = 0usize;
    let mut sample = |f: &mut F, x: &BigFloat, n: &mut usize| {
        *n += 1;
        f(x)
    };

    let first = sample(&mut f, lo, &mut evals).add(&sample(&mut f, hi, &mut evals));
    let mut prev: Vec<BigFloat> = vec![span.mul(&half).mul(&first)];
    let mut abs_err = BigFloat::infinity(false);
    let mut rel_err = BigFloat::infinity(false);
    let mut status = SolveStatus::NoConvergence;
    let mut levels = 1usize;

    for m in 2..=opts.max_levels {
        if let Some(budget) = opts.max_time_ms {
            if started.elapsed().as_millis() as u64 > budget {
                status = SolveStatus::Timeout;
                break;
            }
        }
        levels = m;
        let intervals = 1i64 << (m - 1);
        let h = span.div(&BigFloat::from_i64(intervals));

        // Only the new midpoints: x = lo + (2i − 1)·h, i = 1..2^{m−2}.
        let mut mid_sum = BigFloat::zero();
        let mids = 1i64 << (m - 2);
        for i in 1..=mids {
            let x = lo.add(&h.mul(&BigFloat::from_i64(2 * i - 1)));
            mid_sum = mid_sum.add(&sample(&mut f, &x, &mut evals));
        }
        let t0 = prev[0].mul(&half).add(&h.mul(&mid_sum));

        let cols = m.min(opts.max_columns);
        let mut row = Vec::with_capacity(cols);
        row.push(t0);
        for j in 1..cols {
            if j > prev.len() {
                break;
            }
            let pow4 = BigFloat::from_i64(1i64 << (2 * j));
            let num = pow4.mul(&row[j - 1]).sub(&prev[j - 1]);
            let den = pow4.sub(&BigFloat::from_i64(1));
            row.push(num.div(&den));
        }

        let best = row.last().expect("row is never empty");
        let prev_best = prev.last().expect("row is never empty");
        abs_err = best.sub(prev_best).abs();
        rel_err = if best.is_exact_zero() {
            abs_err.clone()
        } else {
            abs_err.div(&best.abs())
        };

        let abs_ok = abs_tol
            .as_ref()
            .map(|tol| abs_err <= *tol)
            .unwrap_or(false);
        let rel_ok = rel_err <= rel_tol;
        prev = row;
        if m > 5 && (abs_ok || rel_ok) {
            status = SolveStatus::Done;
            break;
        }
    }

    let mut value = prev.last().expect("row is never empty").clone();
    if swapped {
        value = value.neg();
    }

    // ⌊−log₁₀ ε_rel⌋ via the binary exponent; an exactly-zero estimate is
    // good to the full working precision.
    let effective_digits = match rel_err.exponent() {
        Some(e) if rel_err.is_finite() && !rel_err.is_exact_zero() => {
            ((-(e as f64)) * std::f64::consts::LOG10_2).floor() as i64
        }
        _ => {
            if rel_err.is_exact_zero() {
                i64::from(context::bits_to_digits(p))
            } else {
                0
            }
        }
    };
    let summary = value.to_string_radix(10, Some(effective_digits.max(1) as usize), false);
    debug!(levels, evals, %summary, "romberg finished");

    RombergResult {
        value,
        abs_err,
        rel_err,
        effective_digits,
        summary,
        levels,
        evals,
        status,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::consts;

    #[test]
    fn quarter_circle_arctangent_gives_pi() {
        let _s = crate::testutil::serial();
        // ∫₀¹ 4/(1+x²) dx = π
        let four = BigFloat::from_i64(4);
        let one = BigFloat::from_i64(1);
        let res = romberg(
            |x| four.div(&one.add(&x.mul(x))),
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &RombergOptions::default(),
        );
        assert_eq!(res.status, SolveStatus::Done);
        let err = res.value.sub(&consts().pi).abs();
        assert!(
            err < BigFloat::from_f64(1e-25),
            "pi error {err}, summary {}",
            res.summary
        );
        assert!(res.effective_digits >= 25, "only {} digits", res.effective_digits);
        assert!(res.summary.starts_with("3.14159265358979"));
    }

    #[test]
    fn polynomial_integrands_converge_in_few_rows() {
        let _s = crate::testutil::serial();
        // ∫₀¹ x³ dx = 1/4; exactness arrives by row ⌈log₂(3+1)⌉+1 = 3, the
        // status gate just requires six levels.
        let res = romberg(
            |x| x.mul(x).mul(x),
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &RombergOptions::default(),
        );
        assert_eq!(res.status, SolveStatus::Done);
        assert!(res.levels <= 7, "took {} levels", res.levels);
        let err = res.value.sub(&BigFloat::from_f64(0.25)).abs();
        assert!(err < BigFloat::from_f64(1e-30), "error {err}");
    }

    #[test]
    fn reversed_bounds_negate() {
        let _s = crate::testutil::serial();
        let res = romberg(
            |x| x.clone(),
            &BigFloat::from_i64(1),
            &BigFloat::zero(),
            &RombergOptions::default(),
        );
        // ∫₁⁰ x dx = −1/2
        let err = res.value.add(&BigFloat::from_f64(0.5)).abs();
        assert!(err < BigFloat::from_f64(1e-30));
    }

    #[test]
    fn level_budget_reports_no_convergence() {
        let _s = crate::testutil::serial();
        let opts = RombergOptions {
            max_levels: 4,
            ..RombergOptions::default()
        };
        let res = romberg(
            |x| x.exp(),
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &opts,
        );
        // The six-level gate cannot be reached: best-so-far plus sentinel.
        assert_eq!(res.status, SolveStatus::NoConvergence);
        assert!(res.value.is_finite());
        assert_eq!(res.levels, 4);
    }

    #[test]
    fn smooth_transcendental_to_working_precision() {
        let _s = crate::testutil::serial();
        // ∫₀¹ eˣ dx = e − 1
        let res = romberg(
            |x| x.exp(),
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &RombergOptions::default(),
        );
        assert_eq!(res.status, SolveStatus::Done);
        let exact = consts().e.sub(&BigFloat::from_i64(1));
        let err = res.value.sub(&exact).abs();
        assert!(err < BigFloat::from_f64(1e-30), "error {err}");
    }
}
