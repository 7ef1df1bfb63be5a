//! Complex arithmetic and transcendentals over the big-float
//!
//! [`Complex`] is a plain value pair `(re, im)` of [`BigFloat`]s. Ring
//! operations are componentwise textbook formulas; the transcendentals reduce
//! to the real primitives (`exp`, `ln`, `sqrt`, `atan2`, trig) through the
//! polar form and the logarithmic identities for the inverse functions.
//!
//! Division by an exact complex zero and the logarithm of zero are **domain
//! errors** ([`ComplexError`]), reported to the caller rather than silently
//! producing NaNs; everything else follows the status discipline of the
//! underlying floats.

#![forbid(unsafe_code)]

use std::fmt;

use crate::bigfloat::BigFloat;
use crate::context::consts;

/// Domain errors of the complex layer.
#[derive(Debug, thiserror::Error)]
pub enum ComplexError {
    /// Division by an exact complex zero.
    #[error("complex division by zero")]
    DivisionByZero,
    /// Logarithm (or power of a zero base with non-positive-real exponent).
    #[error("complex logarithm of zero")]
    LogOfZero,
}

/// A complex number over [`BigFloat`]. Value type; arithmetic allocates.
#[derive(Clone, Debug)]
pub struct Complex {
    re: BigFloat,
    im: BigFloat,
}

impl Complex {
    /// Build from parts.
    pub fn new(re: BigFloat, im: BigFloat) -> Self {
        Complex { re, im }
    }

    /// A purely real value.
    pub fn from_real(re: BigFloat) -> Self {
        Complex {
            re,
            im: BigFloat::zero(),
        }
    }

    /// A purely real value from a double.
    pub fn from_f64(re: f64) -> Self {
        Self::from_real(BigFloat::from_f64(re))
    }

    /// 0.
    pub fn zero() -> Self {
        Complex {
            re: BigFloat::zero(),
            im: BigFloat::zero(),
        }
    }

    /// 1.
    pub fn one() -> Self {
        Self::from_real(consts().one.clone())
    }

    /// The imaginary unit.
    pub fn i() -> Self {
        Complex {
            re: BigFloat::zero(),
            im: consts().one.clone(),
        }
    }

    /// Real part.
    pub fn re(&self) -> &BigFloat {
        &self.re
    }

    /// Imaginary part.
    pub fn im(&self) -> &BigFloat {
        &self.im
    }

    /// Both parts are bit-level zero.
    pub fn is_zero(&self) -> bool {
        self.re.is_exact_zero() && self.im.is_exact_zero()
    }

    /// Either part is NaN.
    pub fn is_nan(&self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }

    /// Both parts finite.
    pub fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    /// The imaginary part is bit-level zero.
    pub fn is_real(&self) -> bool {
        self.im.is_exact_zero()
    }

    // ------------------------------------------------------------ arithmetic

    /// self + rhs.
    pub fn add(&self, rhs: &Self) -> Self {
        Complex {
            re: self.re.add(&rhs.re),
            im: self.im.add(&rhs.im),
        }
    }

    /// self − rhs.
    pub fn sub(&self, rhs: &Self) -> Self {
        Complex {
            re: self.re.sub(&rhs.re),
            im: self.im.sub(&rhs.im),
        }
    }

    /// self × rhs.
    pub fn mul(&self, rhs: &Self) -> Self {
        let ac = self.re.mul(&rhs.re);
        let bd = self.im.mul(&rhs.im);
        let ad = self.re.mul(&rhs.im);
        let bc = self.im.mul(&rhs.re);
        Complex {
            re: ac.sub(&bd),
            im: ad.add(&bc),
        }
    }

    /// Scale by a real factor.
    pub fn scale(&self, k: &BigFloat) -> Self {
        Complex {
            re: self.re.mul(k),
            im: self.im.mul(k),
        }
    }

    /// self ÷ rhs, rejecting an exact zero divisor.
    pub fn div_r(&self, rhs: &Self) -> Result<Self, ComplexError> {
        if rhs.is_zero() {
            return Err(ComplexError::DivisionByZero);
        }
        let denom = rhs.norm_sqr();
        let num = self.mul(&rhs.conj());
        Ok(Complex {
            re: num.re.div(&denom),
            im: num.im.div(&denom),
        })
    }

    /// self ÷ rhs; panics on an exact zero divisor.
    pub fn div(&self, rhs: &Self) -> Self {
        self.div_r(rhs).expect("complex division by zero")
    }

    /// −self.
    pub fn neg(&self) -> Self {
        Complex {
            re: self.re.neg(),
            im: self.im.neg(),
        }
    }

    /// Complex conjugate.
    pub fn conj(&self) -> Self {
        Complex {
            re: self.re.clone(),
            im: self.im.neg(),
        }
    }

    /// re² + im².
    pub fn norm_sqr(&self) -> BigFloat {
        self.re.mul(&self.re).add(&self.im.mul(&self.im))
    }

    /// Modulus |z|.
    pub fn abs(&self) -> BigFloat {
        self.norm_sqr().sqrt()
    }

    /// Argument atan2(im, re) in (−π, π].
    pub fn arg(&self) -> BigFloat {
        self.im.atan2(&self.re)
    }

    /// Build from modulus and argument.
    pub fn from_polar(r: &BigFloat, theta: &BigFloat) -> Self {
        Complex {
            re: r.mul(&theta.cos()),
            im: r.mul(&theta.sin()),
        }
    }

    /// (|z|, arg z).
    pub fn to_polar(&self) -> (BigFloat, BigFloat) {
        (self.abs(), self.arg())
    }

    // -------------------------------------------------------- transcendental

    /// e^z = e^re · (cos im + i sin im).
    pub fn exp(&self) -> Self {
        let m = self.re.exp();
        Complex {
            re: m.mul(&self.im.cos()),
            im: m.mul(&self.im.sin()),
        }
    }

    /// Principal logarithm; zero is a domain error.
    pub fn ln_r(&self) -> Result<Self, ComplexError> {
        if self.is_zero() {
            return Err(ComplexError::LogOfZero);
        }
        Ok(Complex {
            re: self.abs().ln(),
            im: self.arg(),
        })
    }

    /// Principal logarithm; panics on zero.
    pub fn ln(&self) -> Self {
        self.ln_r().expect("complex logarithm of zero")
    }

    /// Principal square root (half-angle polar form).
    pub fn sqrt(&self) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        let (r, theta) = self.to_polar();
        let half_theta = theta.mul(&consts().half);
        Self::from_polar(&r.sqrt(), &half_theta)
    }

    /// z^k for a machine-integer exponent by repeated squaring. A zero base
    /// with a negative exponent is the pole 0^{-|k|} and yields +∞ (real
    /// part infinite), matching the real float convention.
    pub fn powi(&self, k: i64) -> Self {
        if k == 0 {
            return Self::one();
        }
        let mut base = if k < 0 {
            match Self::one().div_r(self) {
                Ok(inv) => inv,
                Err(_) => return Self::from_real(BigFloat::infinity(false)),
            }
        } else {
            self.clone()
        };
        let mut e = k.unsigned_abs();
        let mut acc = Self::one();
        while e > 0 {
            if e & 1 == 1 {
                acc = acc.mul(&base);
            }
            e >>= 1;
            if e > 0 {
                base = base.mul(&base);
            }
        }
        acc
    }

    /// z^w = exp(w · ln z); a zero base needs a positive real exponent.
    pub fn pow_r(&self, w: &Self) -> Result<Self, ComplexError> {
        if self.is_zero() {
            if w.is_zero() {
                return Ok(Self::one());
            }
            let zero = BigFloat::zero();
            if w.im.is_exact_zero() && w.re.compare(&zero) == Some(std::cmp::Ordering::Greater) {
                return Ok(Self::zero());
            }
            return Err(ComplexError::LogOfZero);
        }
        Ok(w.mul(&self.ln_r()?).exp())
    }

    /// z^w; panics on the zero-base domain error.
    pub fn pow(&self, w: &Self) -> Self {
        self.pow_r(w).expect("complex power of zero")
    }

    fn sinh_cosh(x: &BigFloat) -> (BigFloat, BigFloat) {
        let ep = x.exp();
        let em = x.neg().exp();
        let half = &consts().half;
        (ep.sub(&em).mul(half), ep.add(&em).mul(half))
    }

    /// sin z = sin a cosh b + i cos a sinh b.
    pub fn sin(&self) -> Self {
        let (sh, ch) = Self::sinh_cosh(&self.im);
        Complex {
            re: self.re.sin().mul(&ch),
            im: self.re.cos().mul(&sh),
        }
    }

    /// cos z = cos a cosh b − i sin a sinh b.
    pub fn cos(&self) -> Self {
        let (sh, ch) = Self::sinh_cosh(&self.im);
        Complex {
            re: self.re.cos().mul(&ch),
            im: self.re.sin().mul(&sh).neg(),
        }
    }

    /// tan z = sin z / cos z.
    pub fn tan(&self) -> Self {
        self.sin().div(&self.cos())
    }

    /// asin z = −i · ln(iz + √(1 − z²)).
    pub fn asin(&self) -> Self {
        let one = Self::one();
        let iz = Self::i().mul(self);
        let root = one.sub(&self.mul(self)).sqrt();
        let inner = iz.add(&root).ln();
        Self::i().neg().mul(&inner)
    }

    /// acos z = π/2 − asin z.
    pub fn acos(&self) -> Self {
        let half_pi = consts().pi.mul(&consts().half);
        Self::from_real(half_pi).sub(&self.asin())
    }

    /// atan z = (i/2) · ln((1 − iz) / (1 + iz)).
    pub fn atan(&self) -> Self {
        let one = Self::one();
        let iz = Self::i().mul(self);
        let ratio = one.sub(&iz).div(&one.add(&iz));
        let half_i = Self::i().scale(&consts().half);
        half_i.mul(&ratio.ln())
    }
}

impl PartialEq for Complex {
    fn eq(&self, other: &Self) -> bool {
        self.re == other.re && self.im == other.im
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im.is_exact_zero() {
            write!(f, "{}", self.re)
        } else if self.im.is_sign_negative() {
            write!(f, "{}-{}i", self.re, self.im.abs())
        } else {
            write!(f, "{}+{}i", self.re, self.im)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RoundingMode;

    fn c(re: f64, im: f64) -> Complex {
        Complex::new(BigFloat::from_f64(re), BigFloat::from_f64(im))
    }

    fn close(x: &BigFloat, v: f64) -> bool {
        (x.to_f64(RoundingMode::TiesToEven) - v).abs() < 1e-14
    }

    #[test]
    fn ring_operations() {
        let a = c(1.0, 2.0);
        let b = c(3.0, -1.0);
        let s = a.add(&b);
        assert!(close(s.re(), 4.0) && close(s.im(), 1.0));
        let p = a.mul(&b);
        // (1+2i)(3−i) = 5 + 5i
        assert!(close(p.re(), 5.0) && close(p.im(), 5.0));
        let q = p.div(&b);
        assert!(close(q.re(), 1.0) && close(q.im(), 2.0));
    }

    #[test]
    fn division_by_zero_is_a_domain_error() {
        let a = c(1.0, 1.0);
        assert!(matches!(
            a.div_r(&Complex::zero()),
            Err(ComplexError::DivisionByZero)
        ));
    }

    #[test]
    fn polar_round_trip() {
        let z = c(-3.0, 4.0);
        assert!(close(&z.abs(), 5.0));
        let (r, t) = z.to_polar();
        let back = Complex::from_polar(&r, &t);
        assert!(close(back.re(), -3.0) && close(back.im(), 4.0));
    }

    #[test]
    fn euler_identity() {
        let _s = crate::testutil::serial();
        // e^{iπ} = −1
        let ipi = Complex::new(BigFloat::zero(), consts().pi.clone());
        let z = ipi.exp();
        assert!(close(z.re(), -1.0));
        assert!(z.im().is_almost_zero());
    }

    #[test]
    fn sqrt_of_minus_one_is_i() {
        let _s = crate::testutil::serial();
        let z = c(-1.0, 0.0).sqrt();
        assert!(z.re().is_almost_zero());
        assert!(close(z.im(), 1.0));
    }

    #[test]
    fn log_exp_inverse() {
        let z = c(0.5, -1.25);
        let w = z.exp().ln();
        assert!(close(w.re(), 0.5) && close(w.im(), -1.25));
        assert!(matches!(Complex::zero().ln_r(), Err(ComplexError::LogOfZero)));
    }

    #[test]
    fn integer_powers() {
        let _s = crate::testutil::serial();
        let z = c(1.0, 1.0);
        let z4 = z.powi(4);
        // (1+i)^4 = −4
        assert!(close(z4.re(), -4.0));
        assert!(z4.im().is_almost_zero());
        let inv = z.powi(-1);
        assert!(close(inv.re(), 0.5) && close(inv.im(), -0.5));
    }

    #[test]
    fn zero_base_powers() {
        let zero = Complex::zero();
        assert_eq!(zero.pow_r(&Complex::zero()).unwrap(), Complex::one());
        assert!(zero.pow_r(&c(2.0, 0.0)).unwrap().is_zero());
        assert!(zero.pow_r(&c(-1.0, 0.0)).is_err());
    }

    #[test]
    fn trig_identity() {
        let _s = crate::testutil::serial();
        let z = c(0.3, 0.7);
        let s2 = z.sin().mul(&z.sin());
        let c2 = z.cos().mul(&z.cos());
        let one = s2.add(&c2);
        assert!(close(one.re(), 1.0));
        assert!(one.im().is_almost_zero());
    }

    #[test]
    fn inverse_trig_round_trips() {
        let z = c(0.4, 0.2);
        let a = z.asin().sin();
        assert!(close(a.re(), 0.4) && close(a.im(), 0.2));
        let b = z.atan().tan();
        assert!(close(b.re(), 0.4) && close(b.im(), 0.2));
        let d = z.acos().cos();
        assert!(close(d.re(), 0.4) && close(d.im(), 0.2));
    }
}
