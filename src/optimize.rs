//! Bracketed scalar root finding and minimization
//!
//! [`fzero`] is the Brent-style bracket shrinker: inverse-quadratic (or
//! secant) candidate steps accepted only when they behave, bisection
//! otherwise. The invariants are exactly the contract's: the bracket always
//! holds a sign change, and its width shrinks monotonically to the
//! tolerance.
//!
//! [`fminbnd`] is the golden-section / parabolic-interpolation hybrid on a
//! bracket, with the usual guard: a parabolic step is taken only when it
//! falls inside the bracket and moves less than half the step before last.
//!
//! Both poll their wall-clock/iteration budgets between iterations and
//! return the best-so-far point with a status sentinel on exhaustion.

#![forbid(unsafe_code)]

use std::time::Instant;

use tracing::debug;

use crate::bigfloat::BigFloat;
use crate::SolveStatus;

/// Hard failures of the bracketed solvers.
#[derive(Debug, thiserror::Error)]
pub enum BracketError {
    /// f(a) and f(b) have the same sign.
    #[error("no sign change over the bracket")]
    NoSignChange,
    /// Degenerate bracket.
    #[error("bracket endpoints must differ")]
    InvalidBracket,
}

/// Options shared by the bracketed solvers.
#[derive(Clone, Debug)]
pub struct BracketOptions {
    /// Absolute tolerance on the abscissa; a precision-derived default when
    /// absent (ε-scaled for `fzero`, √ε-scaled for `fminbnd`).
    pub tol: Option<f64>,
    /// Iteration cap.
    pub max_iters: usize,
    /// Wall-clock budget in milliseconds.
    pub max_time_ms: Option<u64>,
}

impl Default for BracketOptions {
    fn default() -> Self {
        BracketOptions {
            tol: None,
            max_iters: 200,
            max_time_ms: None,
        }
    }
}

/// Root-finding result.
#[derive(Debug)]
pub struct FzeroResult {
    /// Best root estimate.
    pub root: BigFloat,
    /// f at the estimate.
    pub f_root: BigFloat,
    /// Iterations consumed.
    pub iterations: usize,
    /// `Done`, `MaxSteps`, or `Timeout`.
    pub status: SolveStatus,
}

/// Minimization result.
#[derive(Debug)]
pub struct FminResult {
    /// Abscissa of the minimum.
    pub xmin: BigFloat,
    /// f at the minimum.
    pub fmin: BigFloat,
    /// Iterations consumed.
    pub iterations: usize,
    /// `Done`, `MaxSteps`, or `Timeout`.
    pub status: SolveStatus,
}

fn epsilon() -> BigFloat {
    let mut e = BigFloat::zero();
    e.set_epsilon().expect("fresh value is mutable");
    e
}

/// |mag| carrying the sign of `dir`.
fn with_sign_of(mag: &BigFloat, dir: &BigFloat) -> BigFloat {
    if dir.is_sign_negative() {
        mag.abs().neg()
    } else {
        mag.abs()
    }
}

/// Find a root of `f` inside the sign-changing bracket `[lo, hi]`.
pub fn fzero<F>(
    mut f: F,
    lo: &BigFloat,
    hi: &BigFloat,
    opts: &BracketOptions,
) -> Result<FzeroResult, BracketError>
where
    F: FnMut(&BigFloat) -> BigFloat,
{
    if lo == hi {
        return Err(BracketError::InvalidBracket);
    }
    let started = Instant::now();
    let zero = BigFloat::zero();
    let half = BigFloat::from_f64(0.5);
    let two = BigFloat::from_i64(2);
    let three = BigFloat::from_i64(3);
    let eps = epsilon();
    let tol = BigFloat::from_f64(opts.tol.unwrap_or(0.0));

    let mut a = lo.clone();
    let mut b = hi.clone();
    let mut fa = f(&a);
    let mut fb = f(&b);
    if fa.mul(&fb) > zero {
        return Err(BracketError::NoSignChange);
    }
    let mut c = a.clone();
    let mut fc = fa.clone();
    let mut d = b.sub(&a);
    let mut e = d.clone();

    let mut status = SolveStatus::MaxSteps;
    let mut iterations = 0usize;
    for iter in 1..=opts.max_iters {
        if let Some(budget) = opts.max_time_ms {
            if started.elapsed().as_millis() as u64 > budget {
                status = SolveStatus::Timeout;
                break;
            }
        }
        iterations = iter;
        if fb.mul(&fc) > zero {
            c = a.clone();
            fc = fa.clone();
            d = b.sub(&a);
            e = d.clone();
        }
        if fc.abs() < fb.abs() {
            a = b.clone();
            b = c.clone();
            c = a.clone();
            fa = fb.clone();
            fb = fc.clone();
            fc = fa.clone();
        }
        let tol1 = two.mul(&eps).mul(&b.abs()).add(&half.mul(&tol));
        let xm = half.mul(&c.sub(&b));
        if xm.abs() <= tol1 || fb.is_exact_zero() {
            status = SolveStatus::Done;
            break;
        }
        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Interpolation candidate: secant when a == c, inverse quadratic
            // otherwise.
            let s = fb.div(&fa);
            let (mut p, mut q) = if a == c {
                (two.mul(&xm).mul(&s), BigFloat::from_i64(1).sub(&s))
            } else {
                let q0 = fa.div(&fc);
                let r = fb.div(&fc);
                let p = s.mul(
                    &two.mul(&xm)
                        .mul(&q0)
                        .mul(&q0.sub(&r))
                        .sub(&b.sub(&a).mul(&r.sub(&BigFloat::from_i64(1)))),
                );
                let q = q0
                    .sub(&BigFloat::from_i64(1))
                    .mul(&r.sub(&BigFloat::from_i64(1)))
                    .mul(&s.sub(&BigFloat::from_i64(1)));
                (p, q)
            };
            if p > zero {
                q = q.neg();
            }
            p = p.abs();
            let lhs = two.mul(&p);
            let cand1 = three.mul(&xm).mul(&q).sub(&tol1.mul(&q).abs());
            let cand2 = e.mul(&q).abs();
            let min_cand = if cand1 < cand2 { cand1 } else { cand2 };
            if lhs < min_cand {
                e = d.clone();
                d = p.div(&q);
            } else {
                d = xm.clone();
                e = d.clone();
            }
        } else {
            d = xm.clone();
            e = d.clone();
        }
        a = b.clone();
        fa = fb.clone();
        if d.abs() > tol1 {
            b = b.add(&d);
        } else {
            b = b.add(&with_sign_of(&tol1, &xm));
        }
        fb = f(&b);
    }
    debug!(iterations, root = %b, "fzero finished");

    Ok(FzeroResult {
        root: b,
        f_root: fb,
        iterations,
        status,
    })
}

/// Minimize `f` over the bracket `[lo, hi]`.
pub fn fminbnd<F>(
    mut f: F,
    lo: &BigFloat,
    hi: &BigFloat,
    opts: &BracketOptions,
) -> Result<FminResult, BracketError>
where
    F: FnMut(&BigFloat) -> BigFloat,
{
    if lo == hi {
        return Err(BracketError::InvalidBracket);
    }
    let started = Instant::now();
    let (mut a, mut b) = if lo < hi {
        (lo.clone(), hi.clone())
    } else {
        (hi.clone(), lo.clone())
    };

    let half = BigFloat::from_f64(0.5);
    let two = BigFloat::from_i64(2);
    let eps = epsilon();
    // Golden section (3 − √5)/2 at working precision.
    let cgold = BigFloat::from_i64(3)
        .sub(&BigFloat::from_i64(5).sqrt())
        .mul(&half);
    let tol = match opts.tol {
        Some(t) => BigFloat::from_f64(t),
        None => eps.sqrt(),
    };
    let zeps = eps.mul(&BigFloat::from_f64(1e-3));
    let zero = BigFloat::zero();

    let mut x = a.add(&cgold.mul(&b.sub(&a)));
    let mut w = x.clone();
    let mut v = x.clone();
    let mut fx = f(&x);
    let mut fw = fx.clone();
    let mut fv = fx.clone();
    let mut d = BigFloat::zero();
    let mut e = BigFloat::zero();

    let mut status = SolveStatus::MaxSteps;
    let mut iterations = 0usize;
    for iter in 1..=opts.max_iters {
        if let Some(budget) = opts.max_time_ms {
            if started.elapsed().as_millis() as u64 > budget {
                status = SolveStatus::Timeout;
                break;
            }
        }
        iterations = iter;
        let xm = half.mul(&a.add(&b));
        let tol1 = tol.mul(&x.abs()).add(&zeps);
        let tol2 = two.mul(&tol1);
        let spread = tol2.sub(&half.mul(&b.sub(&a)));
        if x.sub(&xm).abs() <= spread {
            status = SolveStatus::Done;
            break;
        }
        let mut use_golden = true;
        if e.abs() > tol1 {
            // Parabolic fit through (x, w, v).
            let r = x.sub(&w).mul(&fx.sub(&fv));
            let q0 = x.sub(&v).mul(&fx.sub(&fw));
            let mut p = x.sub(&v).mul(&q0).sub(&x.sub(&w).mul(&r));
            let mut q = two.mul(&q0.sub(&r));
            if q > zero {
                p = p.neg();
            }
            q = q.abs();
            let etemp = e.clone();
            e = d.clone();
            let inside_low = p > q.mul(&a.sub(&x));
            let inside_high = p < q.mul(&b.sub(&x));
            let small_enough = p.abs() < half.mul(&q).mul(&etemp).abs();
            if small_enough && inside_low && inside_high {
                d = p.div(&q);
                let u = x.add(&d);
                if u.sub(&a) < tol2 || b.sub(&u) < tol2 {
                    d = with_sign_of(&tol1, &xm.sub(&x));
                }
                use_golden = false;
            }
        }
        if use_golden {
            e = if x >= xm { a.sub(&x) } else { b.sub(&x) };
            d = cgold.mul(&e);
        }
        let u = if d.abs() >= tol1 {
            x.add(&d)
        } else {
            x.add(&with_sign_of(&tol1, &d))
        };
        let fu = f(&u);
        if fu <= fx {
            if u >= x {
                a = x.clone();
            } else {
                b = x.clone();
            }
            v = w.clone();
            fv = fw.clone();
            w = x.clone();
            fw = fx.clone();
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u.clone();
            } else {
                b = u.clone();
            }
            if fu <= fw || w == x {
                v = w.clone();
                fv = fw.clone();
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }
    debug!(iterations, xmin = %x, "fminbnd finished");

    Ok(FminResult {
        xmin: x,
        fmin: fx,
        iterations,
        status,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::consts;

    #[test]
    fn cosine_root_is_half_pi() {
        let _s = crate::testutil::serial();
        let res = fzero(
            |x| x.cos(),
            &BigFloat::from_i64(1),
            &BigFloat::from_i64(2),
            &BracketOptions::default(),
        )
        .unwrap();
        assert_eq!(res.status, SolveStatus::Done);
        let half_pi = consts().pi.mul(&consts().half);
        let err = res.root.sub(&half_pi).abs();
        assert!(err < BigFloat::from_f64(1e-30), "error {err}");
        assert!(res.f_root.abs() < BigFloat::from_f64(1e-30));
    }

    #[test]
    fn square_root_of_two_by_bracketing() {
        let _s = crate::testutil::serial();
        let two = BigFloat::from_i64(2);
        let res = fzero(
            |x| x.mul(x).sub(&two),
            &BigFloat::zero(),
            &two,
            &BracketOptions::default(),
        )
        .unwrap();
        assert_eq!(res.status, SolveStatus::Done);
        let err = res.root.sub(&two.sqrt()).abs();
        assert!(err < BigFloat::from_f64(1e-30), "error {err}");
    }

    #[test]
    fn fzero_requires_a_sign_change() {
        let _s = crate::testutil::serial();
        let r = fzero(
            |x| x.mul(x).add(&BigFloat::from_i64(1)),
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &BracketOptions::default(),
        );
        assert!(matches!(r, Err(BracketError::NoSignChange)));
        let r2 = fzero(
            |x| x.clone(),
            &BigFloat::from_i64(1),
            &BigFloat::from_i64(1),
            &BracketOptions::default(),
        );
        assert!(matches!(r2, Err(BracketError::InvalidBracket)));
    }

    #[test]
    fn fzero_on_an_endpoint_root() {
        let _s = crate::testutil::serial();
        // Root exactly at a bracket endpoint still converges.
        let res = fzero(
            |x| x.clone(),
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &BracketOptions::default(),
        )
        .unwrap();
        assert_eq!(res.status, SolveStatus::Done);
        assert!(res.root.abs() < BigFloat::from_f64(1e-30));
    }

    #[test]
    fn parabola_minimum() {
        let _s = crate::testutil::serial();
        // (x − 1)² + 3: minimum 3 at x = 1.
        let res = fminbnd(
            |x| {
                let d = x.sub(&BigFloat::from_i64(1));
                d.mul(&d).add(&BigFloat::from_i64(3))
            },
            &BigFloat::from_i64(-4),
            &BigFloat::from_i64(5),
            &BracketOptions::default(),
        )
        .unwrap();
        assert_eq!(res.status, SolveStatus::Done);
        let xerr = res.xmin.sub(&BigFloat::from_i64(1)).abs();
        assert!(xerr < BigFloat::from_f64(1e-15), "x error {xerr}");
        let ferr = res.fmin.sub(&BigFloat::from_i64(3)).abs();
        assert!(ferr < BigFloat::from_f64(1e-30), "f error {ferr}");
    }

    #[test]
    fn cosine_minimum_is_pi() {
        let _s = crate::testutil::serial();
        let res = fminbnd(
            |x| x.cos(),
            &BigFloat::from_i64(2),
            &BigFloat::from_i64(4),
            &BracketOptions::default(),
        )
        .unwrap();
        assert_eq!(res.status, SolveStatus::Done);
        let err = res.xmin.sub(&consts().pi).abs();
        assert!(err < BigFloat::from_f64(1e-15), "error {err}");
        let fval = res.fmin.add(&BigFloat::from_i64(1)).abs();
        assert!(fval < BigFloat::from_f64(1e-30));
    }

    #[test]
    fn iteration_budget_surfaces_as_status() {
        let _s = crate::testutil::serial();
        let opts = BracketOptions {
            max_iters: 2,
            ..BracketOptions::default()
        };
        let res = fzero(
            |x| x.cos(),
            &BigFloat::from_i64(1),
            &BigFloat::from_i64(2),
            &opts,
        )
        .unwrap();
        assert_eq!(res.status, SolveStatus::MaxSteps);
        assert!(res.root.is_finite());
    }
}
