//! Type-promoting scalar tower
//!
//! [`Scalar`] is the three-level numeric tower {Rational ⊑ Real ⊑ Complex}.
//! Mixed-type arithmetic promotes both operands to the higher level before
//! computing; promotion is **monotonic** — a value's level only ever
//! increases automatically, never decreases.
//!
//! Promotion is also **lazy**: operations whose result happens to stay exact
//! remain at the low level. `sqrt(4/9)` is the rational `2/3`; `sqrt(2)`
//! promotes to Real; `sqrt(−2)` promotes to Complex. Transcendentals of a
//! rational promote to Real (their values are irrational away from the
//! handful of exact points, which are kept exact).

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use rug::Integer;

use crate::bigfloat::BigFloat;
use crate::complex::Complex;
use crate::context::consts;
use crate::fraction::BigFraction;

/// Tower level of a [`Scalar`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Exact fraction.
    Rational = 0,
    /// Big-float.
    Real = 1,
    /// Complex over big-floats.
    Complex = 2,
}

/// A tagged numeric value; the payload type always matches the level.
#[derive(Clone, Debug)]
pub enum Scalar {
    /// Level 0.
    Rational(BigFraction),
    /// Level 1.
    Real(BigFloat),
    /// Level 2.
    Complex(Complex),
}

impl Scalar {
    /// 0 at the lowest level.
    pub fn zero() -> Self {
        Scalar::Rational(BigFraction::zero())
    }

    /// 1 at the lowest level.
    pub fn one() -> Self {
        Scalar::Rational(BigFraction::one())
    }

    /// An exact machine integer.
    pub fn from_i64(v: i64) -> Self {
        Scalar::Rational(BigFraction::from_i64(v))
    }

    /// An exact ratio of machine integers.
    pub fn from_ratio(n: i64, d: i64) -> Self {
        Scalar::Rational(BigFraction::from_ratio(n, d))
    }

    /// Current level.
    pub fn level(&self) -> Level {
        match self {
            Scalar::Rational(_) => Level::Rational,
            Scalar::Real(_) => Level::Real,
            Scalar::Complex(_) => Level::Complex,
        }
    }

    /// Promote to at least `level` (higher existing levels are kept).
    pub fn promote(&self, level: Level) -> Self {
        match (self, level) {
            (Scalar::Rational(q), Level::Real) => Scalar::Real(q.to_big_float()),
            (Scalar::Rational(q), Level::Complex) => {
                Scalar::Complex(Complex::from_real(q.to_big_float()))
            }
            (Scalar::Real(x), Level::Complex) => Scalar::Complex(Complex::from_real(x.clone())),
            _ => self.clone(),
        }
    }

    fn pair(a: &Scalar, b: &Scalar) -> (Scalar, Scalar) {
        let lvl = a.level().max(b.level());
        (a.promote(lvl), b.promote(lvl))
    }

    /// Exact zero test at the value's level.
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Rational(q) => q.is_zero(),
            Scalar::Real(x) => x.is_exact_zero(),
            Scalar::Complex(z) => z.is_zero(),
        }
    }

    /// NaN at any level.
    pub fn is_nan(&self) -> bool {
        match self {
            Scalar::Rational(q) => q.is_nan(),
            Scalar::Real(x) => x.is_nan(),
            Scalar::Complex(z) => z.is_nan(),
        }
    }

    /// The rational payload, if at level 0.
    pub fn as_rational(&self) -> Option<&BigFraction> {
        match self {
            Scalar::Rational(q) => Some(q),
            _ => None,
        }
    }

    /// The real payload, if at level 1.
    pub fn as_real(&self) -> Option<&BigFloat> {
        match self {
            Scalar::Real(x) => Some(x),
            _ => None,
        }
    }

    /// The complex payload, if at level 2.
    pub fn as_complex(&self) -> Option<&Complex> {
        match self {
            Scalar::Complex(z) => Some(z),
            _ => None,
        }
    }

    // ------------------------------------------------------------ arithmetic

    /// self + rhs at the joint level.
    pub fn add(&self, rhs: &Self) -> Self {
        match Self::pair(self, rhs) {
            (Scalar::Rational(a), Scalar::Rational(b)) => Scalar::Rational(a.add(&b)),
            (Scalar::Real(a), Scalar::Real(b)) => Scalar::Real(a.add(&b)),
            (Scalar::Complex(a), Scalar::Complex(b)) => Scalar::Complex(a.add(&b)),
            _ => unreachable!("pair() aligns levels"),
        }
    }

    /// self − rhs at the joint level.
    pub fn sub(&self, rhs: &Self) -> Self {
        match Self::pair(self, rhs) {
            (Scalar::Rational(a), Scalar::Rational(b)) => Scalar::Rational(a.sub(&b)),
            (Scalar::Real(a), Scalar::Real(b)) => Scalar::Real(a.sub(&b)),
            (Scalar::Complex(a), Scalar::Complex(b)) => Scalar::Complex(a.sub(&b)),
            _ => unreachable!("pair() aligns levels"),
        }
    }

    /// self × rhs at the joint level.
    pub fn mul(&self, rhs: &Self) -> Self {
        match Self::pair(self, rhs) {
            (Scalar::Rational(a), Scalar::Rational(b)) => Scalar::Rational(a.mul(&b)),
            (Scalar::Real(a), Scalar::Real(b)) => Scalar::Real(a.mul(&b)),
            (Scalar::Complex(a), Scalar::Complex(b)) => Scalar::Complex(a.mul(&b)),
            _ => unreachable!("pair() aligns levels"),
        }
    }

    /// self ÷ rhs at the joint level. Rational division by zero yields the
    /// rational NaN; complex division by zero yields complex NaN parts.
    pub fn div(&self, rhs: &Self) -> Self {
        match Self::pair(self, rhs) {
            (Scalar::Rational(a), Scalar::Rational(b)) => Scalar::Rational(a.div(&b)),
            (Scalar::Real(a), Scalar::Real(b)) => Scalar::Real(a.div(&b)),
            (Scalar::Complex(a), Scalar::Complex(b)) => match a.div_r(&b) {
                Ok(q) => Scalar::Complex(q),
                Err(_) => Scalar::Complex(Complex::new(BigFloat::nan(), BigFloat::nan())),
            },
            _ => unreachable!("pair() aligns levels"),
        }
    }

    /// −self.
    pub fn neg(&self) -> Self {
        match self {
            Scalar::Rational(q) => Scalar::Rational(q.neg()),
            Scalar::Real(x) => Scalar::Real(x.neg()),
            Scalar::Complex(z) => Scalar::Complex(z.neg()),
        }
    }

    /// |self|; complex modulus lands at the Real level.
    pub fn abs(&self) -> Self {
        match self {
            Scalar::Rational(q) => Scalar::Rational(q.abs()),
            Scalar::Real(x) => Scalar::Real(x.abs()),
            Scalar::Complex(z) => Scalar::Real(z.abs()),
        }
    }

    /// self^k for a machine-integer exponent, exact where the level is exact.
    pub fn powi(&self, k: i64) -> Self {
        match self {
            Scalar::Rational(q) => Scalar::Rational(q.pow_i64(k)),
            Scalar::Real(x) => {
                let e = BigFloat::from_i64(k);
                Scalar::Real(x.pow(&e))
            }
            Scalar::Complex(z) => Scalar::Complex(z.powi(k)),
        }
    }

    /// self^(n/d) with lazy promotion: exact rational roots stay rational,
    /// irrational real results promote to Real, negative bases under even
    /// roots promote to Complex.
    pub fn pow_frac(&self, n: i64, d: i64) -> Self {
        let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
        if d == 0 {
            return Scalar::Rational(BigFraction::nan());
        }
        if d == 1 {
            return self.powi(n);
        }
        match self {
            Scalar::Rational(q) => {
                if q.is_nan() {
                    return Scalar::Rational(BigFraction::nan());
                }
                if q.is_negative() && d % 2 == 0 {
                    return self.promote(Level::Complex).pow_frac(n, d);
                }
                if let Some(root) = exact_root(q, d as u32) {
                    return Scalar::Rational(root.pow_i64(n));
                }
                self.promote(Level::Real).pow_frac(n, d)
            }
            Scalar::Real(x) => {
                if x.is_sign_negative() && !x.is_exact_zero() && d % 2 == 0 {
                    return self.promote(Level::Complex).pow_frac(n, d);
                }
                let e = BigFloat::from_i64(n).div(&BigFloat::from_i64(d));
                if x.is_sign_negative() {
                    // Odd root of a negative real: route through the magnitude
                    // to keep the real branch.
                    let m = x.abs().pow(&e);
                    return Scalar::Real(if n % 2 == 0 { m } else { m.neg() });
                }
                Scalar::Real(x.pow(&e))
            }
            Scalar::Complex(z) => {
                let alpha = Complex::from_real(
                    BigFloat::from_i64(n).div(&BigFloat::from_i64(d)),
                );
                match z.pow_r(&alpha) {
                    Ok(w) => Scalar::Complex(w),
                    Err(_) => Scalar::Complex(Complex::new(BigFloat::nan(), BigFloat::nan())),
                }
            }
        }
    }

    /// √self with lazy promotion.
    pub fn sqrt(&self) -> Self {
        self.pow_frac(1, 2)
    }

    fn real_unary(
        &self,
        exact_zero: Option<Scalar>,
        real: impl Fn(&BigFloat) -> BigFloat,
        complex: impl Fn(&Complex) -> Complex,
    ) -> Self {
        match self {
            Scalar::Rational(q) => {
                if q.is_zero() {
                    if let Some(v) = exact_zero {
                        return v;
                    }
                }
                Scalar::Real(real(&q.to_big_float()))
            }
            Scalar::Real(x) => Scalar::Real(real(x)),
            Scalar::Complex(z) => Scalar::Complex(complex(z)),
        }
    }

    /// e^self; exp(0) stays the exact rational 1.
    pub fn exp(&self) -> Self {
        self.real_unary(Some(Scalar::one()), BigFloat::exp, Complex::exp)
    }

    /// ln self; log(1) stays the exact rational 0, negative reals promote to
    /// Complex.
    pub fn log(&self) -> Self {
        match self {
            Scalar::Rational(q) if q.is_one() => Scalar::zero(),
            Scalar::Rational(q) if q.is_negative() => {
                self.promote(Level::Complex).log()
            }
            Scalar::Rational(q) => Scalar::Real(q.to_big_float().ln()),
            Scalar::Real(x) if x.is_sign_negative() && !x.is_exact_zero() => {
                self.promote(Level::Complex).log()
            }
            Scalar::Real(x) => Scalar::Real(x.ln()),
            Scalar::Complex(z) => match z.ln_r() {
                Ok(w) => Scalar::Complex(w),
                Err(_) => Scalar::Complex(Complex::new(BigFloat::nan(), BigFloat::nan())),
            },
        }
    }

    /// sin self; sin(0) stays exact.
    pub fn sin(&self) -> Self {
        self.real_unary(Some(Scalar::zero()), BigFloat::sin, Complex::sin)
    }

    /// cos self; cos(0) stays exact.
    pub fn cos(&self) -> Self {
        self.real_unary(Some(Scalar::one()), BigFloat::cos, Complex::cos)
    }

    /// tan self; tan(0) stays exact.
    pub fn tan(&self) -> Self {
        self.real_unary(Some(Scalar::zero()), BigFloat::tan, Complex::tan)
    }

    /// asin self; out-of-domain reals promote to Complex.
    pub fn asin(&self) -> Self {
        match self {
            Scalar::Rational(q) if q.is_zero() => Scalar::zero(),
            Scalar::Rational(_) | Scalar::Real(_) => {
                let x = match self {
                    Scalar::Rational(q) => q.to_big_float(),
                    Scalar::Real(x) => x.clone(),
                    _ => unreachable!(),
                };
                if x.abs().compare(&consts().one) == Some(Ordering::Greater) {
                    Scalar::Complex(Complex::from_real(x).asin())
                } else {
                    Scalar::Real(x.asin())
                }
            }
            Scalar::Complex(z) => Scalar::Complex(z.asin()),
        }
    }

    /// acos self; out-of-domain reals promote to Complex.
    pub fn acos(&self) -> Self {
        match self {
            Scalar::Rational(_) | Scalar::Real(_) => {
                let x = match self {
                    Scalar::Rational(q) => q.to_big_float(),
                    Scalar::Real(x) => x.clone(),
                    _ => unreachable!(),
                };
                if x.abs().compare(&consts().one) == Some(Ordering::Greater) {
                    Scalar::Complex(Complex::from_real(x).acos())
                } else {
                    Scalar::Real(x.acos())
                }
            }
            Scalar::Complex(z) => Scalar::Complex(z.acos()),
        }
    }

    /// atan self; atan(0) stays exact.
    pub fn atan(&self) -> Self {
        self.real_unary(Some(Scalar::zero()), BigFloat::atan, Complex::atan)
    }

    /// Order comparison; complex values and NaNs are unordered.
    pub fn compare(&self, rhs: &Self) -> Option<Ordering> {
        match Self::pair(self, rhs) {
            (Scalar::Rational(a), Scalar::Rational(b)) => a.compare(&b),
            (Scalar::Real(a), Scalar::Real(b)) => a.compare(&b),
            _ => None,
        }
    }
}

/// Exact d-th root of a non-negative rational, if one exists.
fn exact_root(q: &BigFraction, d: u32) -> Option<BigFraction> {
    if q.is_negative() {
        // Odd roots of negatives reduce to the positive case.
        return exact_root(&q.abs(), d).map(|r| r.neg());
    }
    let rn = Integer::from(q.numerator().abs_ref()).root(d);
    let rd = Integer::from(q.denominator()).root(d);
    let num_ok = Integer::from(rug::ops::Pow::pow(&rn, d)) == *q.numerator();
    let den_ok = Integer::from(rug::ops::Pow::pow(&rd, d)) == *q.denominator();
    if num_ok && den_ok {
        Some(BigFraction::new(rn, rd))
    } else {
        None
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match Self::pair(self, other) {
            (Scalar::Rational(a), Scalar::Rational(b)) => a == b,
            (Scalar::Real(a), Scalar::Real(b)) => a == b,
            (Scalar::Complex(a), Scalar::Complex(b)) => a == b,
            _ => unreachable!("pair() aligns levels"),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Rational(q) => write!(f, "{q}"),
            Scalar::Real(x) => write!(f, "{x}"),
            Scalar::Complex(z) => write!(f, "{z}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
