//! Coefficient capability traits
//!
//! [`Poly`](crate::poly::Poly) is generic over its coefficient type. The
//! capability set a coefficient must provide is expressed as two traits:
//! [`Coefficient`] for the ring/field operations every polynomial needs, and
//! [`SeriesCoefficient`] for the scalar transcendentals the truncated-series
//! functions additionally require.
//!
//! The four numeric types instantiate them as follows: [`BigFraction`] is a
//! `Coefficient` only (its transcendental closure is irrational — the
//! [`Scalar`] tower is the vehicle for exact inputs there), while
//! [`BigFloat`], [`Complex`] and [`Scalar`] provide both.

#![forbid(unsafe_code)]

use std::fmt;

use crate::bigfloat::BigFloat;
use crate::complex::Complex;
use crate::fraction::BigFraction;
use crate::scalar::Scalar;

/// Ring/field operations required of every polynomial coefficient.
pub trait Coefficient: Clone + PartialEq + fmt::Debug + fmt::Display {
    /// Additive identity.
    fn zero() -> Self;
    /// Multiplicative identity.
    fn one() -> Self;
    /// Embed a machine integer.
    fn from_i64(v: i64) -> Self;
    /// The type's +∞, used for pole values (Laurent evaluation at zero).
    /// Types with no infinity in their domain answer with their NaN sentinel.
    fn infinity() -> Self;
    /// Exact zero test (the normalization filter).
    fn is_zero(&self) -> bool;
    /// self + rhs.
    fn add(&self, rhs: &Self) -> Self;
    /// self − rhs.
    fn sub(&self, rhs: &Self) -> Self;
    /// self × rhs.
    fn mul(&self, rhs: &Self) -> Self;
    /// self ÷ rhs.
    fn div(&self, rhs: &Self) -> Self;
    /// −self.
    fn neg(&self) -> Self;
    /// self^k for machine-integer k.
    fn powi(&self, k: i64) -> Self;
}

/// Scalar transcendentals required by the truncated-series functions.
pub trait SeriesCoefficient: Coefficient {
    /// e^self.
    fn exp(&self) -> Self;
    /// Natural logarithm.
    fn log(&self) -> Self;
    /// sin self.
    fn sin(&self) -> Self;
    /// cos self.
    fn cos(&self) -> Self;
    /// asin self.
    fn asin(&self) -> Self;
    /// acos self.
    fn acos(&self) -> Self;
    /// atan self.
    fn atan(&self) -> Self;
    /// self^(n/d).
    fn pow_frac(&self, n: i64, d: i64) -> Self;
    /// The constant π at this coefficient type.
    fn pi() -> Self;
}

// ----------------------------------------------------------------------------
// BigFraction: exact field, no transcendentals
// ----------------------------------------------------------------------------

impl Coefficient for BigFraction {
    fn zero() -> Self {
        BigFraction::zero()
    }
    fn one() -> Self {
        BigFraction::one()
    }
    fn from_i64(v: i64) -> Self {
        BigFraction::from_i64(v)
    }
    fn infinity() -> Self {
        // Reduced pairs cannot express ∞; the NaN sentinel stands in, the
        // same mapping `from_f64(±∞)` uses.
        BigFraction::nan()
    }
    fn is_zero(&self) -> bool {
        BigFraction::is_zero(self)
    }
    fn add(&self, rhs: &Self) -> Self {
        BigFraction::add(self, rhs)
    }
    fn sub(&self, rhs: &Self) -> Self {
        BigFraction::sub(self, rhs)
    }
    fn mul(&self, rhs: &Self) -> Self {
        BigFraction::mul(self, rhs)
    }
    fn div(&self, rhs: &Self) -> Self {
        BigFraction::div(self, rhs)
    }
    fn neg(&self) -> Self {
        BigFraction::neg(self)
    }
    fn powi(&self, k: i64) -> Self {
        BigFraction::pow_i64(self, k)
    }
}

// ----------------------------------------------------------------------------
// BigFloat
// ----------------------------------------------------------------------------

impl Coefficient for BigFloat {
    fn zero() -> Self {
        BigFloat::zero()
    }
    fn one() -> Self {
        BigFloat::from_i64(1)
    }
    fn from_i64(v: i64) -> Self {
        BigFloat::from_i64(v)
    }
    fn infinity() -> Self {
        BigFloat::infinity(false)
    }
    fn is_zero(&self) -> bool {
        self.is_exact_zero()
    }
    fn add(&self, rhs: &Self) -> Self {
        BigFloat::add(self, rhs)
    }
    fn sub(&self, rhs: &Self) -> Self {
        BigFloat::sub(self, rhs)
    }
    fn mul(&self, rhs: &Self) -> Self {
        BigFloat::mul(self, rhs)
    }
    fn div(&self, rhs: &Self) -> Self {
        BigFloat::div(self, rhs)
    }
    fn neg(&self) -> Self {
        BigFloat::neg(self)
    }
    fn powi(&self, k: i64) -> Self {
        self.pow(&BigFloat::from_i64(k))
    }
}

impl SeriesCoefficient for BigFloat {
    fn exp(&self) -> Self {
        BigFloat::exp(self)
    }
    fn log(&self) -> Self {
        BigFloat::ln(self)
    }
    fn sin(&self) -> Self {
        BigFloat::sin(self)
    }
    fn cos(&self) -> Self {
        BigFloat::cos(self)
    }
    fn asin(&self) -> Self {
        BigFloat::asin(self)
    }
    fn acos(&self) -> Self {
        BigFloat::acos(self)
    }
    fn atan(&self) -> Self {
        BigFloat::atan(self)
    }
    fn pow_frac(&self, n: i64, d: i64) -> Self {
        let e = BigFloat::from_i64(n).div(&BigFloat::from_i64(d));
        self.pow(&e)
    }
    fn pi() -> Self {
        let mut x = BigFloat::zero();
        x.set_pi().expect("fresh value is mutable");
        x
    }
}

// ----------------------------------------------------------------------------
// Complex
// ----------------------------------------------------------------------------

impl Coefficient for Complex {
    fn zero() -> Self {
        Complex::zero()
    }
    fn one() -> Self {
        Complex::one()
    }
    fn from_i64(v: i64) -> Self {
        Complex::from_real(BigFloat::from_i64(v))
    }
    fn infinity() -> Self {
        Complex::from_real(BigFloat::infinity(false))
    }
    fn is_zero(&self) -> bool {
        Complex::is_zero(self)
    }
    fn add(&self, rhs: &Self) -> Self {
        Complex::add(self, rhs)
    }
    fn sub(&self, rhs: &Self) -> Self {
        Complex::sub(self, rhs)
    }
    fn mul(&self, rhs: &Self) -> Self {
        Complex::mul(self, rhs)
    }
    fn div(&self, rhs: &Self) -> Self {
        match Complex::div_r(self, rhs) {
            Ok(q) => q,
            Err(_) => Complex::new(BigFloat::nan(), BigFloat::nan()),
        }
    }
    fn neg(&self) -> Self {
        Complex::neg(self)
    }
    fn powi(&self, k: i64) -> Self {
        Complex::powi(self, k)
    }
}

impl SeriesCoefficient for Complex {
    fn exp(&self) -> Self {
        Complex::exp(self)
    }
    fn log(&self) -> Self {
        match Complex::ln_r(self) {
            Ok(w) => w,
            Err(_) => Complex::new(BigFloat::nan(), BigFloat::nan()),
        }
    }
    fn sin(&self) -> Self {
        Complex::sin(self)
    }
    fn cos(&self) -> Self {
        Complex::cos(self)
    }
    fn asin(&self) -> Self {
        Complex::asin(self)
    }
    fn acos(&self) -> Self {
        Complex::acos(self)
    }
    fn atan(&self) -> Self {
        Complex::atan(self)
    }
    fn pow_frac(&self, n: i64, d: i64) -> Self {
        if d == 1 {
            return Complex::powi(self, n);
        }
        let alpha = Complex::from_real(
            BigFloat::from_i64(n).div(&BigFloat::from_i64(d)),
        );
        match Complex::pow_r(self, &alpha) {
            Ok(w) => w,
            Err(_) => Complex::new(BigFloat::nan(), BigFloat::nan()),
        }
    }
    fn pi() -> Self {
        Complex::from_real(<BigFloat as SeriesCoefficient>::pi())
    }
}

// ----------------------------------------------------------------------------
// Scalar
// ----------------------------------------------------------------------------

impl Coefficient for Scalar {
    fn zero() -> Self {
        Scalar::zero()
    }
    fn one() -> Self {
        Scalar::one()
    }
    fn from_i64(v: i64) -> Self {
        Scalar::from_i64(v)
    }
    fn infinity() -> Self {
        Scalar::Real(BigFloat::infinity(false))
    }
    fn is_zero(&self) -> bool {
        Scalar::is_zero(self)
    }
    fn add(&self, rhs: &Self) -> Self {
        Scalar::add(self, rhs)
    }
    fn sub(&self, rhs: &Self) -> Self {
        Scalar::sub(self, rhs)
    }
    fn mul(&self, rhs: &Self) -> Self {
        Scalar::mul(self, rhs)
    }
    fn div(&self, rhs: &Self) -> Self {
        Scalar::div(self, rhs)
    }
    fn neg(&self) -> Self {
        Scalar::neg(self)
    }
    fn powi(&self, k: i64) -> Self {
        Scalar::powi(self, k)
    }
}

impl SeriesCoefficient for Scalar {
    fn exp(&self) -> Self {
        Scalar::exp(self)
    }
    fn log(&self) -> Self {
        Scalar::log(self)
    }
    fn sin(&self) -> Self {
        Scalar::sin(self)
    }
    fn cos(&self) -> Self {
        Scalar::cos(self)
    }
    fn asin(&self) -> Self {
        Scalar::asin(self)
    }
    fn acos(&self) -> Self {
        Scalar::acos(self)
    }
    fn atan(&self) -> Self {
        Scalar::atan(self)
    }
    fn pow_frac(&self, n: i64, d: i64) -> Self {
        Scalar::pow_frac(self, n, d)
    }
    fn pi() -> Self {
        Scalar::Real(<BigFloat as SeriesCoefficient>::pi())
    }
}
