//! Exact rationals over arbitrary-precision integers
//!
//! [`BigFraction`] keeps a reduced pair `(n, d)` with `d ≥ 1` and
//! `gcd(|n|, d) = 1`; the sentinel `(0, 0)` denotes NaN. Construction from an
//! IEEE-754 double is **bit-exact**: the mantissa/exponent decomposition is
//! taken from the bits, so every dyadic rational round-trips and every finite
//! double becomes the rational it actually is (`0.1` becomes
//! `3602879701896397 / 2^55`, not `1/10`).
//!
//! Values are immutable; arithmetic returns fresh instances. NaN propagates
//! through arithmetic and is unordered, mirroring the float conventions.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use rug::ops::Pow;
use rug::{Float, Integer};

use crate::bigfloat::BigFloat;
use crate::context;

/// Hard failures of the rational layer.
#[derive(Debug, thiserror::Error)]
pub enum FractionError {
    /// Unparseable literal.
    #[error("unparseable rational literal {0:?}")]
    Parse(String),
}

/// A reduced exact fraction; see the module docs for the invariants.
#[derive(Clone, Debug)]
pub struct BigFraction {
    num: Integer,
    den: Integer,
}

impl BigFraction {
    /// The NaN sentinel `(0, 0)`.
    pub fn nan() -> Self {
        BigFraction {
            num: Integer::new(),
            den: Integer::new(),
        }
    }

    /// 0/1.
    pub fn zero() -> Self {
        Self::from_i64(0)
    }

    /// 1/1.
    pub fn one() -> Self {
        Self::from_i64(1)
    }

    /// n/1.
    pub fn from_i64(n: i64) -> Self {
        BigFraction {
            num: Integer::from(n),
            den: Integer::from(1),
        }
    }

    /// n/d, reduced; `d = 0` yields the NaN sentinel.
    pub fn new(num: Integer, den: Integer) -> Self {
        Self::reduced(num, den)
    }

    /// n/d over machine integers.
    pub fn from_ratio(n: i64, d: i64) -> Self {
        Self::reduced(Integer::from(n), Integer::from(d))
    }

    fn reduced(mut num: Integer, mut den: Integer) -> Self {
        if den.cmp0() == Ordering::Equal {
            return Self::nan();
        }
        if den.cmp0() == Ordering::Less {
            num = -num;
            den = -den;
        }
        let g = Integer::from(num.gcd_ref(&den));
        if g != 1u32 {
            num /= &g;
            den /= &g;
        }
        BigFraction { num, den }
    }

    /// Bit-exact conversion of an IEEE-754 double. Non-finite inputs map to
    /// the NaN sentinel.
    pub fn from_f64(x: f64) -> Self {
        if !x.is_finite() {
            return Self::nan();
        }
        if x == 0.0 {
            return Self::zero();
        }
        let bits = x.to_bits();
        let neg = bits >> 63 != 0;
        let exp_field = ((bits >> 52) & 0x7ff) as i64;
        let frac = bits & ((1u64 << 52) - 1);
        let (mant, exp) = if exp_field == 0 {
            (frac, -1074i64)
        } else {
            (frac | (1u64 << 52), exp_field - 1075)
        };
        let mut num = Integer::from(mant);
        let mut den = Integer::from(1);
        if exp >= 0 {
            num <<= exp as u32;
        } else {
            den <<= (-exp) as u32;
        }
        if neg {
            num = -num;
        }
        Self::reduced(num, den)
    }

    /// Parse `"a/b"`, a decimal literal, or a plain integer.
    pub fn from_str_r(s: &str) -> Result<Self, FractionError> {
        let s = s.trim();
        let bad = || FractionError::Parse(s.to_owned());
        if let Some((a, b)) = s.split_once('/') {
            let n: Integer = a.trim().parse().map_err(|_| bad())?;
            let d: Integer = b.trim().parse().map_err(|_| bad())?;
            return Ok(Self::reduced(n, d));
        }
        if let Some((int_part, frac_part)) = s.split_once('.') {
            let neg = int_part.trim_start().starts_with('-');
            let ip = if int_part.is_empty() || int_part == "-" || int_part == "+" {
                Integer::new()
            } else {
                int_part.parse().map_err(|_| bad())?
            };
            if frac_part.is_empty() || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad());
            }
            let fp: Integer = frac_part.parse().map_err(|_| bad())?;
            let scale = Integer::from(10u32).pow(frac_part.len() as u32);
            let mut num = ip * &scale;
            if neg {
                num -= fp;
            } else {
                num += fp;
            }
            return Ok(Self::reduced(num, scale));
        }
        let n: Integer = s.parse().map_err(|_| bad())?;
        Ok(BigFraction {
            num: n,
            den: Integer::from(1),
        })
    }

    // --------------------------------------------------------------- queries

    /// The NaN sentinel.
    pub fn is_nan(&self) -> bool {
        self.den.cmp0() == Ordering::Equal
    }

    /// Exactly zero (NaN is not zero).
    pub fn is_zero(&self) -> bool {
        !self.is_nan() && self.num.cmp0() == Ordering::Equal
    }

    /// Exactly one.
    pub fn is_one(&self) -> bool {
        !self.is_nan() && self.den == 1u32 && self.num == 1u32
    }

    /// Strictly negative.
    pub fn is_negative(&self) -> bool {
        self.num.cmp0() == Ordering::Less
    }

    /// Denominator is one.
    pub fn is_integer(&self) -> bool {
        !self.is_nan() && self.den == 1u32
    }

    /// Reduced numerator.
    pub fn numerator(&self) -> &Integer {
        &self.num
    }

    /// Reduced denominator (`0` only for the NaN sentinel).
    pub fn denominator(&self) -> &Integer {
        &self.den
    }

    /// Whether the denominator is a power of two (the dyadic rationals are
    /// precisely the values exactly representable as finite binary floats).
    pub fn is_dyadic(&self) -> bool {
        self.den.count_ones() == Some(1)
    }

    // ------------------------------------------------------------ arithmetic

    /// self + rhs.
    pub fn add(&self, rhs: &Self) -> Self {
        if self.is_nan() || rhs.is_nan() {
            return Self::nan();
        }
        let num = Integer::from(&self.num * &rhs.den) + Integer::from(&rhs.num * &self.den);
        let den = Integer::from(&self.den * &rhs.den);
        Self::reduced(num, den)
    }

    /// self − rhs.
    pub fn sub(&self, rhs: &Self) -> Self {
        self.add(&rhs.neg())
    }

    /// self × rhs.
    pub fn mul(&self, rhs: &Self) -> Self {
        if self.is_nan() || rhs.is_nan() {
            return Self::nan();
        }
        Self::reduced(
            Integer::from(&self.num * &rhs.num),
            Integer::from(&self.den * &rhs.den),
        )
    }

    /// self ÷ rhs; division by zero yields NaN.
    pub fn div(&self, rhs: &Self) -> Self {
        if self.is_nan() || rhs.is_nan() {
            return Self::nan();
        }
        Self::reduced(
            Integer::from(&self.num * &rhs.den),
            Integer::from(&self.den * &rhs.num),
        )
    }

    /// −self.
    pub fn neg(&self) -> Self {
        if self.is_nan() {
            return Self::nan();
        }
        BigFraction {
            num: Integer::from(-&self.num),
            den: self.den.clone(),
        }
    }

    /// |self|.
    pub fn abs(&self) -> Self {
        if self.is_nan() {
            return Self::nan();
        }
        BigFraction {
            num: Integer::from(self.num.abs_ref()),
            den: self.den.clone(),
        }
    }

    /// 1/self; the inverse of zero is NaN.
    pub fn inv(&self) -> Self {
        if self.is_nan() {
            return Self::nan();
        }
        Self::reduced(self.den.clone(), self.num.clone())
    }

    /// self^e for a machine-integer exponent; `0^e` with `e < 0` is NaN and
    /// `x^0 = 1` (including `0^0`).
    pub fn pow_i64(&self, e: i64) -> Self {
        if self.is_nan() {
            return Self::nan();
        }
        if e == 0 {
            return Self::one();
        }
        let base = if e < 0 { self.inv() } else { self.clone() };
        if base.is_nan() {
            return Self::nan();
        }
        let k = e.unsigned_abs() as u32;
        BigFraction {
            num: Integer::from((&base.num).pow(k)),
            den: Integer::from((&base.den).pow(k)),
        }
    }

    /// Exact comparison; `None` when either side is NaN.
    pub fn compare(&self, rhs: &Self) -> Option<Ordering> {
        if self.is_nan() || rhs.is_nan() {
            return None;
        }
        let lhs = Integer::from(&self.num * &rhs.den);
        let r = Integer::from(&rhs.num * &self.den);
        Some(lhs.cmp(&r))
    }

    // ----------------------------------------------------------- conversions

    /// Round to a big-float at the current precision.
    pub fn to_big_float(&self) -> BigFloat {
        if self.is_nan() {
            return BigFloat::nan();
        }
        let p = context::precision();
        let rm = context::default_rounding().backend();
        let guard = p + 32;
        let fnum = Float::with_val(guard, &self.num);
        let fden = Float::with_val(guard, &self.den);
        let mut out = Float::new(p);
        use rug::ops::AssignRound;
        out.assign_round(&fnum / &fden, rm);
        BigFloat::from_backend(out, true, false)
    }

    /// Round to a double.
    pub fn to_f64(&self) -> f64 {
        if self.is_nan() {
            return f64::NAN;
        }
        self.to_big_float()
            .to_f64(crate::context::RoundingMode::TiesToEven)
    }
}

impl PartialEq for BigFraction {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for BigFraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for BigFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nan() {
            f.write_str("NaN")
        } else if self.den == 1u32 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn reduction_and_sign_normalization() {
        let x = BigFraction::from_ratio(6, -4);
        assert_eq!(x.to_string(), "-3/2");
        assert_eq!(*x.denominator(), 2u32);
        assert_eq!(BigFraction::from_ratio(0, 7).to_string(), "0");
    }

    #[test]
    fn half_is_exact() {
        let h = BigFraction::from_f64(0.5);
        assert_eq!(h, BigFraction::from_ratio(1, 2));
        assert!(h.is_dyadic());
    }

    #[test]
    fn tenth_is_not_one_over_ten() {
        let t = BigFraction::from_f64(0.1);
        // 0.1 is not dyadic as a real, so the double is a nearby dyadic.
        assert_ne!(t.to_string(), "1/10");
        assert_ne!(t, BigFraction::from_ratio(1, 10));
        assert!(t.is_dyadic());
        // Exact mantissa of the IEEE double 0.1.
        assert_eq!(t.numerator().to_string(), "3602879701896397");
    }

    #[test]
    fn doubles_round_trip_exactly() {
        let _s = crate::testutil::serial();
        for x in [0.0, 1.0, -2.5, 0.1, 3.141592653589793, 1e-308, 5e-324, 1e300] {
            let f = BigFraction::from_f64(x);
            assert_eq!(f.to_f64(), x, "{x} failed the round-trip");
        }
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let x: f64 = rng.gen_range(-1e12..1e12);
            assert_eq!(BigFraction::from_f64(x).to_f64(), x);
        }
    }

    #[test]
    fn string_forms() {
        assert_eq!(
            BigFraction::from_str_r("3/4").unwrap(),
            BigFraction::from_ratio(3, 4)
        );
        assert_eq!(
            BigFraction::from_str_r("-3.25").unwrap(),
            BigFraction::from_ratio(-13, 4)
        );
        assert_eq!(
            BigFraction::from_str_r("42").unwrap(),
            BigFraction::from_i64(42)
        );
        assert!(BigFraction::from_str_r("x/y").is_err());
        assert!(BigFraction::from_str_r("1.2.3").is_err());
        // d = 0 is the NaN sentinel, not an error.
        assert!(BigFraction::from_str_r("1/0").unwrap().is_nan());
    }

    #[test]
    fn arithmetic_stays_reduced() {
        let a = BigFraction::from_ratio(1, 6);
        let b = BigFraction::from_ratio(1, 3);
        let s = a.add(&b);
        assert_eq!(s, BigFraction::from_ratio(1, 2));
        assert_eq!(*s.denominator(), 2u32);
        assert_eq!(a.mul(&b).to_string(), "1/18");
        assert_eq!(a.div(&b).to_string(), "1/2");
        assert_eq!(a.sub(&b), BigFraction::from_ratio(-1, 6));
    }

    #[test]
    fn nan_is_viral_and_unordered() {
        let nan = BigFraction::nan();
        let one = BigFraction::one();
        assert!(nan.add(&one).is_nan());
        assert!(one.div(&BigFraction::zero()).is_nan());
        assert!(nan.compare(&one).is_none());
        assert_ne!(nan, nan.clone());
    }

    #[test]
    fn powers() {
        let x = BigFraction::from_ratio(2, 3);
        assert_eq!(x.pow_i64(3), BigFraction::from_ratio(8, 27));
        assert_eq!(x.pow_i64(-2), BigFraction::from_ratio(9, 4));
        assert_eq!(x.pow_i64(0), BigFraction::one());
        assert!(BigFraction::zero().pow_i64(-1).is_nan());
    }

    #[test]
    fn comparisons_cross_multiply() {
        assert!(BigFraction::from_ratio(1, 3) < BigFraction::from_ratio(1, 2));
        assert!(BigFraction::from_ratio(-1, 2) < BigFraction::zero());
        assert_eq!(
            BigFraction::from_ratio(2, 4),
            BigFraction::from_ratio(1, 2)
        );
    }
}
