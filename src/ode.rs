//! Dormand–Prince 5(4) adaptive integration
//!
//! [`ode45`] advances a state vector of [`BigFloat`]s with the classic
//! explicit DP 5(4) pair: six derivative stages build the fifth-order
//! candidate, the seventh stage at `(t+h, y_next)` doubles as the next step's
//! first stage (**FSAL**), and the embedded fourth-order solution drives the
//! componentwise error estimate
//!
//! ```text
//! r_i = |h·Σ E_j k_j,i| / (abs_tol + rel_tol·max(|y_i|, |y_next,i|)),  ε = max_i r_i
//! ```
//!
//! Accepted steps (ε ≤ 1) scale the step by `0.9·ε^{−1/5}` clamped to
//! `[0.1, 5]` (an effectively zero ε jumps straight to 5); rejections clamp
//! to `[0.1, 0.8]` and retry. A step magnitude below 10⁻⁵⁰ terminates with
//! the underflow status. Budgets (step cap, wall-clock) are polled between
//! attempts and surface as status sentinels, never as hard failures.

#![forbid(unsafe_code)]

use std::time::Instant;

use tracing::debug;

use crate::bigfloat::BigFloat;
use crate::context::RoundingMode;
use crate::fraction::BigFraction;
use crate::SolveStatus;

/// Hard failures of the integrator (domain errors; budget exhaustion is a
/// status, not an error).
#[derive(Debug, thiserror::Error)]
pub enum OdeError {
    /// The initial state is empty.
    #[error("empty initial state")]
    EmptyState,
    /// The derivative returned a vector of the wrong length.
    #[error("derivative returned {got} components, expected {expected}")]
    DimensionMismatch {
        /// State dimension.
        expected: usize,
        /// Returned dimension.
        got: usize,
    },
}

/// Integration options.
#[derive(Clone, Debug)]
pub struct Ode45Options {
    /// Relative tolerance (default 10⁻²⁰, suited to arbitrary precision).
    pub rel_tol: f64,
    /// Absolute tolerance (default 10⁻²⁰).
    pub abs_tol: f64,
    /// Initial step magnitude; guessed from the span when absent.
    pub initial_step: Option<f64>,
    /// Cap on step attempts (accepted + rejected).
    pub max_steps: usize,
    /// Wall-clock budget in milliseconds.
    pub max_time_ms: Option<u64>,
}

impl Default for Ode45Options {
    fn default() -> Self {
        Ode45Options {
            rel_tol: 1e-20,
            abs_tol: 1e-20,
            initial_step: None,
            max_steps: 100_000,
            max_time_ms: None,
        }
    }
}

/// The computed trajectory plus termination bookkeeping.
#[derive(Debug)]
pub struct Ode45Solution {
    /// Accepted abscissae, strictly monotonic in the integration direction.
    pub t: Vec<BigFloat>,
    /// State vectors parallel to `t`; the first entry is the initial state.
    pub y: Vec<Vec<BigFloat>>,
    /// Termination status.
    pub status: SolveStatus,
    /// Accepted steps.
    pub accepted_steps: usize,
    /// Rejected steps.
    pub failed_steps: usize,
    /// Derivative evaluations.
    pub fn_evals: usize,
}

struct Tableau {
    c: Vec<BigFloat>,
    a: Vec<Vec<BigFloat>>,
    b: Vec<BigFloat>,
    e: Vec<BigFloat>,
}

fn fr(n: i64, d: i64) -> BigFloat {
    BigFraction::from_ratio(n, d).to_big_float()
}

impl Tableau {
    /// The canonical Dormand–Prince 5(4) coefficients, realized at the
    /// current precision from their exact rational forms.
    fn dormand_prince() -> Self {
        Tableau {
            c: vec![
                fr(0, 1),
                fr(1, 5),
                fr(3, 10),
                fr(4, 5),
                fr(8, 9),
                fr(1, 1),
                fr(1, 1),
            ],
            a: vec![
                vec![fr(1, 5)],
                vec![fr(3, 40), fr(9, 40)],
                vec![fr(44, 45), fr(-56, 15), fr(32, 9)],
                vec![
                    fr(19372, 6561),
                    fr(-25360, 2187),
                    fr(64448, 6561),
                    fr(-212, 729),
                ],
                vec![
                    fr(9017, 3168),
                    fr(-355, 33),
                    fr(46732, 5247),
                    fr(49, 176),
                    fr(-5103, 18656),
                ],
            ],
            b: vec![
                fr(35, 384),
                fr(0, 1),
                fr(500, 1113),
                fr(125, 192),
                fr(-2187, 6784),
                fr(11, 84),
                fr(0, 1),
            ],
            e: vec![
                fr(71, 57600),
                fr(0, 1),
                fr(-71, 16695),
                fr(71, 1920),
                fr(-17253, 339200),
                fr(22, 525),
                fr(-1, 40),
            ],
        }
    }
}

/// `y + h·Σ coef_j·k_j` componentwise.
fn stage(y: &[BigFloat], h: &BigFloat, coefs: &[BigFloat], ks: &[&Vec<BigFloat>]) -> Vec<BigFloat> {
    let dim = y.len();
    let mut out = Vec::with_capacity(dim);
    for i in 0..dim {
        let mut acc = BigFloat::zero();
        for (c, k) in coefs.iter().zip(ks.iter()) {
            if c.is_exact_zero() {
                continue;
            }
            acc = acc.add(&c.mul(&k[i]));
        }
        out.push(y[i].add(&h.mul(&acc)));
    }
    out
}

/// Integrate `y' = f(t, y)` from `t0` to `tf`.
pub fn ode45<F>(
    f: F,
    t0: &BigFloat,
    tf: &BigFloat,
    y0: &[BigFloat],
    opts: &Ode45Options,
) -> Result<Ode45Solution, OdeError>
where
    F: FnMut(&BigFloat, &[BigFloat]) -> Vec<BigFloat>,
{
    ode45_with_callback(f, t0, tf, y0, opts, |_t: &BigFloat, _y: &[BigFloat]| {})
}

/// Integrate with a callback invoked synchronously after every accepted step
/// (never on rejection), receiving the accepted `(t, y)`.
pub fn ode45_with_callback<F, C>(
    mut f: F,
    t0: &BigFloat,
    tf: &BigFloat,
    y0: &[BigFloat],
    opts: &Ode45Options,
    mut callback: C,
) -> Result<Ode45Solution, OdeError>
where
    F: FnMut(&BigFloat, &[BigFloat]) -> Vec<BigFloat>,
    C: FnMut(&BigFloat, &[BigFloat]),
{
    if y0.is_empty() {
        return Err(OdeError::EmptyState);
    }
    let dim = y0.len();
    let started = Instant::now();
    let tab = Tableau::dormand_prince();

    let mut fn_evals = 0usize;
    let mut eval = |f: &mut F, t: &BigFloat, y: &[BigFloat], n: &mut usize| {
        *n += 1;
        f(t, y)
    };

    let span = tf.sub(t0);
    let mut t = t0.clone();
    let mut y: Vec<BigFloat> = y0.to_vec();
    let mut sol = Ode45Solution {
        t: vec![t.clone()],
        y: vec![y.clone()],
        status: SolveStatus::Done,
        accepted_steps: 0,
        failed_steps: 0,
        fn_evals: 0,
    };
    if span.is_exact_zero() {
        return Ok(sol);
    }
    let forward = !span.is_sign_negative();
    let span_abs = span.abs();

    // Initial step: user-supplied, else |t_f − t₀|/100 clamped to
    // [1e-6, |t_f − t₀|], sign aligned with the direction.
    let mut h = match opts.initial_step {
        Some(h0) => BigFloat::from_f64(h0.abs()),
        None => {
            let mut guess = span_abs.div(&BigFloat::from_i64(100));
            let floor = BigFloat::from_f64(1e-6);
            if guess < floor {
                guess = floor;
            }
            if guess > span_abs {
                guess = span_abs.clone();
            }
            guess
        }
    };
    if !forward {
        h = h.neg();
    }

    let mut k1 = eval(&mut f, &t, &y, &mut fn_evals);
    if k1.len() != dim {
        return Err(OdeError::DimensionMismatch {
            expected: dim,
            got: k1.len(),
        });
    }

    let abs_tol = BigFloat::from_f64(opts.abs_tol);
    let rel_tol = BigFloat::from_f64(opts.rel_tol);
    let underflow_limit = BigFloat::from_f64(1e-50);
    let zero_eps = BigFloat::from_f64(1e-40);
    let one = BigFloat::from_i64(1);

    let mut attempts = 0usize;
    loop {
        if attempts >= opts.max_steps {
            sol.status = SolveStatus::MaxSteps;
            break;
        }
        if let Some(budget) = opts.max_time_ms {
            if started.elapsed().as_millis() as u64 > budget {
                sol.status = SolveStatus::Timeout;
                break;
            }
        }
        attempts += 1;

        // Clamp the final step onto t_f exactly.
        let remaining = tf.sub(&t);
        let mut last_step = false;
        if h.abs() >= remaining.abs() {
            h = remaining.clone();
            last_step = true;
        }

        let k2 = {
            let ts = t.add(&h.mul(&tab.c[1]));
            let ys = stage(&y, &h, &tab.a[0], &[&k1]);
            eval(&mut f, &ts, &ys, &mut fn_evals)
        };
        let k3 = {
            let ts = t.add(&h.mul(&tab.c[2]));
            let ys = stage(&y, &h, &tab.a[1], &[&k1, &k2]);
            eval(&mut f, &ts, &ys, &mut fn_evals)
        };
        let k4 = {
            let ts = t.add(&h.mul(&tab.c[3]));
            let ys = stage(&y, &h, &tab.a[2], &[&k1, &k2, &k3]);
            eval(&mut f, &ts, &ys, &mut fn_evals)
        };
        let k5 = {
            let ts = t.add(&h.mul(&tab.c[4]));
            let ys = stage(&y, &h, &tab.a[3], &[&k1, &k2, &k3, &k4]);
            eval(&mut f, &ts, &ys, &mut fn_evals)
        };
        let k6 = {
            let ts = t.add(&h);
            let ys = stage(&y, &h, &tab.a[4], &[&k1, &k2, &k3, &k4, &k5]);
            eval(&mut f, &ts, &ys, &mut fn_evals)
        };
        let ks = [&k1, &k2, &k3, &k4, &k5, &k6];
        let y_next = stage(&y, &h, &tab.b[..6], &ks);
        let t_next = if last_step { tf.clone() } else { t.add(&h) };
        let k7 = eval(&mut f, &t_next, &y_next, &mut fn_evals);

        // Weighted max-norm error over the embedded difference.
        let all_ks = [&k1, &k2, &k3, &k4, &k5, &k6, &k7];
        let mut eps = BigFloat::zero();
        for i in 0..dim {
            let mut acc = BigFloat::zero();
            for (ej, k) in tab.e.iter().zip(all_ks.iter()) {
                if ej.is_exact_zero() {
                    continue;
                }
                acc = acc.add(&ej.mul(&k[i]));
            }
            let err = h.mul(&acc).abs();
            let mut scale = y[i].abs();
            let cand = y_next[i].abs();
            if cand > scale {
                scale = cand;
            }
            let denom = abs_tol.add(&rel_tol.mul(&scale));
            let r = err.div(&denom);
            if r > eps {
                eps = r;
            }
        }

        let eps_f = eps.to_f64(RoundingMode::TiesToEven);
        if eps <= one {
            // Accept: advance, FSAL-recycle the last stage, notify.
            t = t_next;
            y = y_next;
            k1 = k7;
            sol.accepted_steps += 1;
            sol.t.push(t.clone());
            sol.y.push(y.clone());
            callback(&t, &y);
            if last_step {
                sol.status = SolveStatus::Done;
                break;
            }
            let factor = if eps <= zero_eps || eps_f <= 1e-40 {
                5.0
            } else {
                (0.9 * eps_f.powf(-0.2)).clamp(0.1, 5.0)
            };
            h = h.mul(&BigFloat::from_f64(factor));
        } else {
            sol.failed_steps += 1;
            let factor = (0.9 * eps_f.powf(-0.2)).clamp(0.1, 0.8);
            h = h.mul(&BigFloat::from_f64(factor));
            if h.abs() < underflow_limit {
                debug!("step size underflow at t = {t}");
                sol.status = SolveStatus::Underflow;
                break;
            }
        }
    }

    sol.fn_evals = fn_evals;
    Ok(sol)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::consts;

    fn close_to(x: &BigFloat, v: &BigFloat, tol: f64) -> bool {
        x.sub(v).abs() < BigFloat::from_f64(tol)
    }

    #[test]
    fn exponential_growth_reaches_e() {
        let _s = crate::testutil::serial();
        let one = BigFloat::from_i64(1);
        let sol = ode45(
            |_t, y| vec![y[0].clone()],
            &BigFloat::zero(),
            &one,
            &[BigFloat::from_i64(1)],
            &Ode45Options::default(),
        )
        .unwrap();
        assert_eq!(sol.status, SolveStatus::Done);
        let e = consts().e.clone();
        let last = sol.y.last().unwrap();
        assert!(
            close_to(&last[0], &e, 1e-15),
            "y(1) = {}, e = {e}",
            last[0]
        );
        // The trajectory ends exactly at t_f.
        assert_eq!(sol.t.last().unwrap(), &one);
        // FSAL: one eval for k1, then six per attempted step.
        assert_eq!(
            sol.fn_evals,
            1 + 6 * (sol.accepted_steps + sol.failed_steps)
        );
    }

    #[test]
    fn circular_motion_quarter_turn() {
        let _s = crate::testutil::serial();
        // y₁' = y₂, y₂' = −y₁, y(0) = (0, 1); at t = π/2: y = (1, 0).
        let half_pi = consts().pi.mul(&consts().half);
        let sol = ode45(
            |_t, y| vec![y[1].clone(), y[0].neg()],
            &BigFloat::zero(),
            &half_pi,
            &[BigFloat::zero(), BigFloat::from_i64(1)],
            &Ode45Options::default(),
        )
        .unwrap();
        assert_eq!(sol.status, SolveStatus::Done);
        let last = sol.y.last().unwrap();
        let err = last[0]
            .sub(&BigFloat::from_i64(1))
            .abs()
            .add(&last[1].abs());
        assert!(
            err < BigFloat::from_f64(1e-15),
            "error {err} at quarter turn"
        );
    }

    #[test]
    fn pure_quadrature_is_reproduced() {
        let _s = crate::testutil::serial();
        // y' = 3t² (no y-dependence): ∫₀² = 8, inside the pair's exactness.
        let sol = ode45(
            |t, _y| {
                let t2 = t.mul(t);
                vec![t2.mul(&BigFloat::from_i64(3))]
            },
            &BigFloat::zero(),
            &BigFloat::from_i64(2),
            &[BigFloat::zero()],
            &Ode45Options::default(),
        )
        .unwrap();
        assert_eq!(sol.status, SolveStatus::Done);
        let last = sol.y.last().unwrap();
        assert!(close_to(&last[0], &BigFloat::from_i64(8), 1e-25));
    }

    #[test]
    fn monotone_trajectory_and_initial_state() {
        let _s = crate::testutil::serial();
        let sol = ode45(
            |_t, y| vec![y[0].neg()],
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &[BigFloat::from_i64(1)],
            &Ode45Options::default(),
        )
        .unwrap();
        assert_eq!(sol.y[0][0], BigFloat::from_i64(1));
        for w in sol.t.windows(2) {
            assert!(w[0] < w[1], "trajectory not strictly increasing");
        }
    }

    #[test]
    fn backward_integration() {
        let _s = crate::testutil::serial();
        let sol = ode45(
            |_t, y| vec![y[0].clone()],
            &BigFloat::from_i64(1),
            &BigFloat::zero(),
            &[consts().e.clone()],
            &Ode45Options::default(),
        )
        .unwrap();
        assert_eq!(sol.status, SolveStatus::Done);
        let last = sol.y.last().unwrap();
        assert!(close_to(&last[0], &BigFloat::from_i64(1), 1e-15));
        for w in sol.t.windows(2) {
            assert!(w[0] > w[1], "trajectory not strictly decreasing");
        }
    }

    #[test]
    fn callback_fires_once_per_accepted_step() {
        let _s = crate::testutil::serial();
        let mut calls = 0usize;
        let sol = ode45_with_callback(
            |_t, y| vec![y[0].clone()],
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &[BigFloat::from_i64(1)],
            &Ode45Options::default(),
            |_t, _y| calls += 1,
        )
        .unwrap();
        assert_eq!(calls, sol.accepted_steps);
    }

    #[test]
    fn step_budget_surfaces_as_status() {
        let _s = crate::testutil::serial();
        let opts = Ode45Options {
            max_steps: 3,
            ..Ode45Options::default()
        };
        let sol = ode45(
            |_t, y| vec![y[0].clone()],
            &BigFloat::zero(),
            &BigFloat::from_i64(1000),
            &[BigFloat::from_i64(1)],
            &opts,
        )
        .unwrap();
        assert_eq!(sol.status, SolveStatus::MaxSteps);
        // Best-so-far trajectory is preserved.
        assert!(!sol.t.is_empty());
    }

    #[test]
    fn dimension_mismatch_is_a_hard_error() {
        let _s = crate::testutil::serial();
        let r = ode45(
            |_t, _y| vec![],
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &[BigFloat::from_i64(1)],
            &Ode45Options::default(),
        );
        assert!(matches!(r, Err(OdeError::DimensionMismatch { .. })));
        let r2 = ode45(
            |_t, y| vec![y[0].clone()],
            &BigFloat::zero(),
            &BigFloat::from_i64(1),
            &[],
            &Ode45Options::default(),
        );
        assert!(matches!(r2, Err(OdeError::EmptyState)));
    }
}
