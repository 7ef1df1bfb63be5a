//! Durand–Kerner simultaneous root iteration
//!
//! All `n` roots of a degree-`n` polynomial are refined together:
//!
//! ```text
//! z_i ← z_i − P(z_i) / Π_{j≠i} (z_i − z_j)
//! ```
//!
//! starting from `n` points on a circle of radius `1 + max|a_i|` (after the
//! monic normalization) at angles `2πk/n + 0.7` — the offset keeps the
//! initial guesses off the axes, where symmetric root sets would otherwise
//! stall. Sweeps update in place and stop when the largest correction falls
//! under the tolerance; budget exhaustion surfaces as a status sentinel with
//! the best-so-far roots.

#![forbid(unsafe_code)]

use std::time::Instant;

use tracing::debug;

use crate::bigfloat::BigFloat;
use crate::complex::Complex;
use crate::context;
use crate::poly::{Order, Poly};
use crate::SolveStatus;

/// Hard failures of the root finder.
#[derive(Debug, thiserror::Error)]
pub enum RootsError {
    /// Operand is a truncated series or has Laurent terms.
    #[error("root finding needs an exact polynomial with non-negative degrees")]
    NotAPolynomial,
    /// Constant (or empty) operand.
    #[error("polynomial degree {0} has no roots to find")]
    DegreeTooLow(i64),
}

/// Iteration options.
#[derive(Clone, Debug)]
pub struct RootsOptions {
    /// Convergence tolerance on the largest correction; a precision-derived
    /// default when absent.
    pub tol: Option<f64>,
    /// Sweep cap.
    pub max_iters: usize,
    /// Wall-clock budget in milliseconds.
    pub max_time_ms: Option<u64>,
}

impl Default for RootsOptions {
    fn default() -> Self {
        RootsOptions {
            tol: None,
            max_iters: 200,
            max_time_ms: None,
        }
    }
}

/// Root set plus convergence bookkeeping.
#[derive(Debug)]
pub struct RootsResult {
    /// The n roots (with multiplicity in the limit).
    pub roots: Vec<Complex>,
    /// Sweeps consumed.
    pub iterations: usize,
    /// Largest correction of the final sweep.
    pub max_delta: BigFloat,
    /// `Done`, `MaxSteps`, or `Timeout`.
    pub status: SolveStatus,
}

fn default_tol() -> BigFloat {
    // ε_p with 32 bits of slack: quadratic convergence stalls at the
    // arithmetic's rounding floor, not at ε_p itself.
    let mut e = BigFloat::zero();
    e.set_epsilon().expect("fresh value is mutable");
    e.mul(&BigFloat::from_i64(1i64 << 32))
}

/// Horner evaluation of dense ascending coefficients at `z`.
fn eval_dense(coeffs: &[Complex], z: &Complex) -> Complex {
    let mut acc = coeffs.last().cloned().unwrap_or_else(Complex::zero);
    for c in coeffs.iter().rev().skip(1) {
        acc = acc.mul(z).add(c);
    }
    acc
}

/// Find all complex roots of `p`.
pub fn poly_roots(p: &Poly<Complex>, opts: &RootsOptions) -> Result<RootsResult, RootsError> {
    if p.order() != Order::Inf {
        return Err(RootsError::NotAPolynomial);
    }
    let coeffs = p
        .dense_nonneg_r()
        .map_err(|_| RootsError::NotAPolynomial)?;
    let n = coeffs.len().saturating_sub(1);
    if n < 1 {
        return Err(RootsError::DegreeTooLow(p.degree()));
    }
    let started = Instant::now();

    // Monic normalization.
    let lead = coeffs[n].clone();
    let monic: Vec<Complex> = coeffs.iter().map(|c| c.div(&lead)).collect();

    // Initial circle: radius 1 + max|a_i|, angles 2πk/n + 0.7.
    let mut radius = BigFloat::zero();
    for c in monic.iter().take(n) {
        let m = c.abs();
        if m > radius {
            radius = m;
        }
    }
    radius = radius.add(&BigFloat::from_i64(1));
    let two_pi = context::consts().pi.mul(&BigFloat::from_i64(2));
    let offset = BigFloat::from_f64(0.7);
    let mut z: Vec<Complex> = (0..n)
        .map(|k| {
            let theta = two_pi
                .mul(&BigFloat::from_i64(k as i64))
                .div(&BigFloat::from_i64(n as i64))
                .add(&offset);
            Complex::from_polar(&radius, &theta)
        })
        .collect();

    let tol = opts.tol.map(BigFloat::from_f64).unwrap_or_else(default_tol);
    let mut status = SolveStatus::MaxSteps;
    let mut iterations = 0usize;
    let mut max_delta = BigFloat::infinity(false);

    for sweep in 1..=opts.max_iters {
        if let Some(budget) = opts.max_time_ms {
            if started.elapsed().as_millis() as u64 > budget {
                status = SolveStatus::Timeout;
                break;
            }
        }
        iterations = sweep;
        max_delta = BigFloat::zero();
        for i in 0..n {
            let num = eval_dense(&monic, &z[i]);
            let mut den = Complex::one();
            for j in 0..n {
                if j != i {
                    den = den.mul(&z[i].sub(&z[j]));
                }
            }
            if den.is_zero() {
                // Colliding guesses; leave this root for the next sweep.
                continue;
            }
            let delta = num.div(&den);
            let mag = delta.abs();
            if mag > max_delta {
                max_delta = mag;
            }
            z[i] = z[i].sub(&delta);
        }
        if max_delta <= tol {
            status = SolveStatus::Done;
            break;
        }
    }
    debug!(iterations, %max_delta, "durand-kerner finished");

    Ok(RootsResult {
        roots: z,
        iterations,
        max_delta,
        status,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RoundingMode;

    fn cpoly(coeffs: &[f64]) -> Poly<Complex> {
        Poly::from_dense(
            &coeffs
                .iter()
                .map(|&c| Complex::from_f64(c))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn fifth_roots_of_thirty_two() {
        let _s = crate::testutil::serial();
        // x⁵ − 32: five roots on the circle of radius 2, one of them 2 + 0i.
        let p = cpoly(&[-32.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let res = poly_roots(&p, &RootsOptions::default()).unwrap();
        assert_eq!(res.status, SolveStatus::Done);
        assert_eq!(res.roots.len(), 5);
        let two = Complex::from_f64(2.0);
        let near_two = res
            .roots
            .iter()
            .filter(|z| z.sub(&two).abs() < BigFloat::from_f64(1e-15))
            .count();
        assert_eq!(near_two, 1, "exactly one root at 2 + 0i");
        // Residuals within tolerance (property: the returned values are roots).
        let coeffs = p.dense_nonneg_r().unwrap();
        for z in &res.roots {
            let residual = eval_dense(&coeffs, z).abs();
            assert!(
                residual < BigFloat::from_f64(1e-20),
                "residual {residual}"
            );
            // All five sit on the circle |z| = 2.
            let m = z.abs().to_f64(RoundingMode::TiesToEven);
            assert!((m - 2.0).abs() < 1e-15);
        }
    }

    #[test]
    fn quadratic_with_real_roots() {
        let _s = crate::testutil::serial();
        // (z − 1)(z − 2) = 2 − 3z + z²
        let p = cpoly(&[2.0, -3.0, 1.0]);
        let res = poly_roots(&p, &RootsOptions::default()).unwrap();
        assert_eq!(res.status, SolveStatus::Done);
        let mut reals: Vec<f64> = res
            .roots
            .iter()
            .map(|z| z.re().to_f64(RoundingMode::TiesToEven))
            .collect();
        reals.sort_by(f64::total_cmp);
        assert!((reals[0] - 1.0).abs() < 1e-20);
        assert!((reals[1] - 2.0).abs() < 1e-20);
        for z in &res.roots {
            assert!(z.im().abs() < BigFloat::from_f64(1e-20));
        }
    }

    #[test]
    fn non_monic_leading_coefficient() {
        let _s = crate::testutil::serial();
        // 3z² − 3 has roots ±1.
        let p = cpoly(&[-3.0, 0.0, 3.0]);
        let res = poly_roots(&p, &RootsOptions::default()).unwrap();
        let mut reals: Vec<f64> = res
            .roots
            .iter()
            .map(|z| z.re().to_f64(RoundingMode::TiesToEven))
            .collect();
        reals.sort_by(f64::total_cmp);
        assert!((reals[0] + 1.0).abs() < 1e-20);
        assert!((reals[1] - 1.0).abs() < 1e-20);
    }

    #[test]
    fn rejects_series_and_constants() {
        let _s = crate::testutil::serial();
        let series = cpoly(&[1.0, 1.0]).truncate(Order::At(5));
        assert!(matches!(
            poly_roots(&series, &RootsOptions::default()),
            Err(RootsError::NotAPolynomial)
        ));
        let constant = cpoly(&[7.0]);
        assert!(matches!(
            poly_roots(&constant, &RootsOptions::default()),
            Err(RootsError::DegreeTooLow(0))
        ));
    }

    #[test]
    fn iteration_budget_surfaces_as_status() {
        let _s = crate::testutil::serial();
        let p = cpoly(&[-32.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let opts = RootsOptions {
            max_iters: 2,
            ..RootsOptions::default()
        };
        let res = poly_roots(&p, &opts).unwrap();
        assert_eq!(res.status, SolveStatus::MaxSteps);
        assert_eq!(res.roots.len(), 5);
    }
}
