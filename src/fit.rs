//! Least-squares polynomial fitting
//!
//! Classic normal equations over the power sums,
//!
//! ```text
//! A[j][k] = Σ xᵢ^{j+k},   B[j] = Σ xᵢ^j·yᵢ,   0 ≤ j,k ≤ order
//! ```
//!
//! solved by Gaussian elimination with partial pivoting. Coefficients are
//! returned in **descending** degree order, with the goodness-of-fit report
//! (SSR, RMSE, R²). A singular system is not a hard failure: it surfaces as
//! the `Singular` status with an empty coefficient set, per the budget /
//! resource error class.

#![forbid(unsafe_code)]

use tracing::debug;

use crate::bigfloat::BigFloat;
use crate::SolveStatus;

/// Hard failures of the fitter (shape errors only).
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    /// x and y lengths differ.
    #[error("sample length mismatch: {xs} x-values, {ys} y-values")]
    LengthMismatch {
        /// Number of x samples.
        xs: usize,
        /// Number of y samples.
        ys: usize,
    },
    /// No samples.
    #[error("cannot fit an empty sample")]
    Empty,
    /// Fit order must be below the sample count.
    #[error("order {order} needs more than {points} points")]
    DegreeTooHigh {
        /// Requested order.
        order: usize,
        /// Available points.
        points: usize,
    },
}

/// Fit result and goodness-of-fit report.
#[derive(Debug)]
pub struct PolyFit {
    /// Coefficients in descending degree order (empty when singular).
    pub coeffs: Vec<BigFloat>,
    /// Sum of squared residuals.
    pub ssr: BigFloat,
    /// Root-mean-square error.
    pub rmse: BigFloat,
    /// Coefficient of determination.
    pub r2: BigFloat,
    /// `Done` or `Singular`.
    pub status: SolveStatus,
}

/// Solve a dense linear system by Gaussian elimination with partial
/// pivoting; `None` when a pivot column vanishes.
fn solve_dense(mut a: Vec<Vec<BigFloat>>, mut b: Vec<BigFloat>) -> Option<Vec<BigFloat>> {
    let n = b.len();
    for col in 0..n {
        // Partial pivot: the largest magnitude in the column.
        let mut pivot = col;
        let mut best = a[col][col].abs();
        for (row, arow) in a.iter().enumerate().skip(col + 1) {
            let m = arow[col].abs();
            if m > best {
                best = m;
                pivot = row;
            }
        }
        if best.is_almost_zero() {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col].div(&a[col][col]);
            if factor.is_exact_zero() {
                continue;
            }
            for k in col..n {
                let t = factor.mul(&a[col][k]);
                a[row][k] = a[row][k].sub(&t);
            }
            let t = factor.mul(&b[col]);
            b[row] = b[row].sub(&t);
        }
    }
    // Back substitution.
    let mut x = vec![BigFloat::zero(); n];
    for row in (0..n).rev() {
        let mut acc = b[row].clone();
        for k in row + 1..n {
            acc = acc.sub(&a[row][k].mul(&x[k]));
        }
        x[row] = acc.div(&a[row][row]);
    }
    Some(x)
}

/// Horner evaluation of descending coefficients.
fn eval_descending(coeffs: &[BigFloat], x: &BigFloat) -> BigFloat {
    let mut acc = BigFloat::zero();
    for c in coeffs {
        acc = acc.mul(x).add(c);
    }
    acc
}

/// Fit a polynomial of the given order to the samples.
pub fn polyfit(xs: &[BigFloat], ys: &[BigFloat], order: usize) -> Result<PolyFit, FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch {
            xs: xs.len(),
            ys: ys.len(),
        });
    }
    if xs.is_empty() {
        return Err(FitError::Empty);
    }
    if order >= xs.len() {
        return Err(FitError::DegreeTooHigh {
            order,
            points: xs.len(),
        });
    }
    let m = order + 1;

    // Power sums S_k = Σ x^k, 0 ≤ k ≤ 2·order, shared by all of A.
    let mut sums = vec![BigFloat::zero(); 2 * order + 1];
    for x in xs {
        let mut pw = BigFloat::from_i64(1);
        for s in sums.iter_mut() {
            *s = s.add(&pw);
            pw = pw.mul(x);
        }
    }
    let a: Vec<Vec<BigFloat>> = (0..m)
        .map(|j| (0..m).map(|k| sums[j + k].clone()).collect())
        .collect();
    let mut b = vec![BigFloat::zero(); m];
    for (x, y) in xs.iter().zip(ys.iter()) {
        let mut pw = BigFloat::from_i64(1);
        for bj in b.iter_mut() {
            *bj = bj.add(&pw.mul(y));
            pw = pw.mul(x);
        }
    }

    let Some(ascending) = solve_dense(a, b) else {
        debug!(order, points = xs.len(), "normal equations are singular");
        return Ok(PolyFit {
            coeffs: Vec::new(),
            ssr: BigFloat::nan(),
            rmse: BigFloat::nan(),
            r2: BigFloat::nan(),
            status: SolveStatus::Singular,
        });
    };
    let coeffs: Vec<BigFloat> = ascending.into_iter().rev().collect();

    // Goodness of fit.
    let n = BigFloat::from_i64(xs.len() as i64);
    let mut ssr = BigFloat::zero();
    let mut mean = BigFloat::zero();
    for y in ys {
        mean = mean.add(y);
    }
    mean = mean.div(&n);
    let mut sst = BigFloat::zero();
    for (x, y) in xs.iter().zip(ys.iter()) {
        let r = y.sub(&eval_descending(&coeffs, x));
        ssr = ssr.add(&r.mul(&r));
        let d = y.sub(&mean);
        sst = sst.add(&d.mul(&d));
    }
    let rmse = ssr.div(&n).sqrt();
    let r2 = if sst.is_exact_zero() {
        BigFloat::from_i64(1)
    } else {
        BigFloat::from_i64(1).sub(&ssr.div(&sst))
    };

    Ok(PolyFit {
        coeffs,
        ssr,
        rmse,
        r2,
        status: SolveStatus::Done,
    })
}

// ============================================================================
// Tests
// ============================================================================
