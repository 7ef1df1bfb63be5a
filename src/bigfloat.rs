//! Arbitrary-precision binary float façade
//!
//! [`BigFloat`] wraps a pooled backend float (see [`crate::pool`]) behind the
//! primitive-library contract: a tagged operation enum ([`BfOp`]) instead of
//! the historical single-character opcodes, IEEE-754-style rounding modes, and
//! a per-value accumulated **status word**.
//!
//! ## Status discipline
//!
//! Every operation ORs its outcome bits into the *result's* status word:
//!
//! - `ST_INEXACT` from the backend's ternary rounding report,
//! - `ST_INVALID_OP` when a NaN is produced from non-NaN operands; the
//!   process policy ([`crate::context::set_throw_on_invalid_op`]) decides
//!   whether that raises or is logged and left as NaN,
//! - `ST_DIVIDE_ZERO` for exact infinities from finite operands (logged),
//! - `ST_OVERFLOW` / `ST_UNDERFLOW` when the result exponent leaves the range
//!   configured by the exponent-bits sub-field; the value is clamped to ±∞ or
//!   ±0 respectively.
//!
//! ## Mutability
//!
//! A value constructed as *constant* rejects every in-place mutator with
//! [`BigFloatError::ConstantWrite`]; this protects the shared singletons in
//! [`crate::context::consts`]. Checked `_r` forms return `Result`; the plain
//! forms are thin wrappers that only panic when the caller has opted into the
//! raising invalid-op policy and still uses the unchecked sugar.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering::Relaxed};

use rug::float::{Constant, Special};
use rug::ops::{AssignRound, Pow};
use rug::{Assign, Float, Integer};
use tracing::{debug, warn};

use crate::context::{
    self, RoundingMode, FLAG_ROUNDING_MASK, POW_JS_QUIRKS, ST_DIVIDE_ZERO, ST_INEXACT,
    ST_INVALID_OP, ST_OVERFLOW, ST_UNDERFLOW,
};
use crate::pool::{self, Handle};

// ----------------------------------------------------------------------------
// Errors
// ----------------------------------------------------------------------------

/// Hard failures of the float façade.
#[derive(Debug, thiserror::Error)]
pub enum BigFloatError {
    /// In-place mutation of a value marked constant.
    #[error("write to a constant value")]
    ConstantWrite,
    /// An operation produced BF_ST_INVALID_OP under the raising policy.
    #[error("invalid operation")]
    InvalidOperation,
    /// Unparseable literal.
    #[error("unparseable literal {literal:?} in radix {radix}")]
    Parse {
        /// The offending input.
        literal: String,
        /// The radix the parse was attempted in.
        radix: u32,
    },
    /// Radix outside 2..=36.
    #[error("radix {0} out of range (2..=36)")]
    BadRadix(u32),
}

// ----------------------------------------------------------------------------
// Operations
// ----------------------------------------------------------------------------

/// The dispatched operation set of the primitive contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BfOp {
    /// a + b
    Add,
    /// a − b
    Sub,
    /// a × b
    Mul,
    /// a ÷ b
    Div,
    /// Round-toward-zero remainder.
    Mod,
    /// Round-to-nearest remainder.
    Rem,
    /// Integer bitwise OR.
    Or,
    /// Integer bitwise XOR.
    Xor,
    /// Integer bitwise AND.
    And,
    /// √a
    Sqrt,
    /// Re-round a to the target precision.
    RoundPrec,
    /// Round to integer in the effective rounding mode.
    Rint,
    /// −a
    Neg,
    /// |a|
    Abs,
    /// Sign of a (−1, ±0, +1).
    Sign,
    /// log 2 constant.
    ConstLog2,
    /// π constant.
    ConstPi,
    /// Smallest positive representable value for the exponent range.
    MinValue,
    /// Largest finite representable value for the exponent range.
    MaxValue,
    /// ε_p = 2^(1−p).
    Epsilon,
    /// eᵃ
    Exp,
    /// Natural logarithm.
    Log,
    /// a^b (optionally with the JS quirks bit).
    PowOp,
    /// Trigonometric and inverse-trigonometric family.
    Cos,
    /// sin a
    Sin,
    /// tan a
    Tan,
    /// atan a
    Atan,
    /// atan2(a, b)
    Atan2,
    /// asin a
    Asin,
    /// acos a
    Acos,
}

impl BfOp {
    fn arity(self) -> usize {
        match self {
            BfOp::ConstLog2
            | BfOp::ConstPi
            | BfOp::MinValue
            | BfOp::MaxValue
            | BfOp::Epsilon => 0,
            BfOp::Add
            | BfOp::Sub
            | BfOp::Mul
            | BfOp::Div
            | BfOp::Mod
            | BfOp::Rem
            | BfOp::Or
            | BfOp::Xor
            | BfOp::And
            | BfOp::PowOp
            | BfOp::Atan2 => 2,
            _ => 1,
        }
    }
}

/// An operand of [`BigFloat::calc`]. String and numeric operands are
/// converted to scoped backend temporaries that are dropped on exit from the
/// call, success or failure.
pub enum Operand<'a> {
    /// No operand (padding for low-arity ops).
    None,
    /// A live big-float.
    Bf(&'a BigFloat),
    /// An IEEE-754 double, converted exactly.
    F64(f64),
    /// A machine integer, converted exactly.
    Int(i64),
    /// A radix-10 literal, rounded to the target precision.
    Str(&'a str),
}

impl<'a> From<&'a BigFloat> for Operand<'a> {
    fn from(v: &'a BigFloat) -> Self {
        Operand::Bf(v)
    }
}
impl From<f64> for Operand<'_> {
    fn from(v: f64) -> Self {
        Operand::F64(v)
    }
}
impl From<i64> for Operand<'_> {
    fn from(v: i64) -> Self {
        Operand::Int(v)
    }
}
impl<'a> From<&'a str> for Operand<'a> {
    fn from(v: &'a str) -> Self {
        Operand::Str(v)
    }
}

enum Resolved {
    None,
    Pooled(Handle),
    Temp(Float),
}

impl Resolved {
    fn is_some(&self) -> bool {
        !matches!(self, Resolved::None)
    }
}

fn with_one<R>(a: &Resolved, f: impl FnOnce(&Float) -> R) -> R {
    match a {
        Resolved::Pooled(h) => pool::read(*h, f),
        Resolved::Temp(t) => f(t),
        Resolved::None => unreachable!("missing operand"),
    }
}

fn with_two<R>(a: &Resolved, b: &Resolved, f: impl FnOnce(&Float, &Float) -> R) -> R {
    match (a, b) {
        (Resolved::Pooled(ha), Resolved::Pooled(hb)) => pool::read2(*ha, *hb, f),
        (Resolved::Pooled(ha), Resolved::Temp(tb)) => pool::read(*ha, |fa| f(fa, tb)),
        (Resolved::Temp(ta), Resolved::Pooled(hb)) => pool::read(*hb, |fb| f(ta, fb)),
        (Resolved::Temp(ta), Resolved::Temp(tb)) => f(ta, tb),
        _ => unreachable!("missing operand"),
    }
}

// ----------------------------------------------------------------------------
// The value type
// ----------------------------------------------------------------------------

/// Arbitrary-precision binary float with pooled storage and an accumulated
/// status word. See the module docs for the status and mutability discipline.
pub struct BigFloat {
    handle: Handle,
    status: AtomicU32,
    constant: bool,
}

impl BigFloat {
    // ---------------------------------------------------------------- create

    pub(crate) fn from_backend(f: Float, managed: bool, constant: bool) -> Self {
        BigFloat {
            handle: pool::adopt(f, managed),
            status: AtomicU32::new(0),
            constant,
        }
    }

    /// +0 at the current precision.
    pub fn zero() -> Self {
        Self::from_backend(Float::new(context::precision()), true, false)
    }

    /// NaN at the current precision.
    pub fn nan() -> Self {
        Self::from_backend(
            Float::with_val(context::precision(), Special::Nan),
            true,
            false,
        )
    }

    /// +∞ or −∞ at the current precision.
    pub fn infinity(negative: bool) -> Self {
        let s = if negative {
            Special::NegInfinity
        } else {
            Special::Infinity
        };
        Self::from_backend(Float::with_val(context::precision(), s), true, false)
    }

    /// Exact conversion of an IEEE-754 double (precision at least 53 bits).
    pub fn from_f64(v: f64) -> Self {
        let p = context::precision().max(53);
        Self::from_backend(Float::with_val(p, v), true, false)
    }

    /// Exact conversion of a machine integer.
    pub fn from_i64(v: i64) -> Self {
        let p = context::precision().max(64);
        Self::from_backend(Float::with_val(p, v), true, false)
    }

    /// Conversion of an arbitrary-precision integer, rounded to the current
    /// precision in the default rounding mode.
    pub fn from_integer(v: &Integer) -> Self {
        let rm = context::default_rounding().backend();
        let (f, dir) = Float::with_val_round(context::precision(), v, rm);
        let bf = Self::from_backend(f, true, false);
        if dir != Ordering::Equal {
            bf.status.fetch_or(ST_INEXACT, Relaxed);
        }
        bf
    }

    /// Parse a literal in the given radix at the current precision.
    pub fn from_str_radix_r(s: &str, radix: u32) -> Result<Self, BigFloatError> {
        if !(2..=36).contains(&radix) {
            return Err(BigFloatError::BadRadix(radix));
        }
        let inc = Float::parse_radix(s, radix as i32).map_err(|_| BigFloatError::Parse {
            literal: s.to_owned(),
            radix,
        })?;
        let rm = context::default_rounding().backend();
        let (f, dir) = Float::with_val_round(context::precision(), inc, rm);
        let bf = Self::from_backend(f, true, false);
        if dir != Ordering::Equal {
            bf.status.fetch_or(ST_INEXACT, Relaxed);
        }
        Ok(bf)
    }

    /// Parse a radix-10 literal; panics on malformed input.
    pub fn from_str_lit(s: &str) -> Self {
        Self::from_str_radix_r(s, 10).expect("malformed literal")
    }

    // Shared-constant constructors used by `context::consts` only.

    pub(crate) fn shared_constant_i64(v: i64) -> Self {
        let p = context::precision().max(64);
        Self::from_backend(Float::with_val(p, v), false, true)
    }

    pub(crate) fn shared_constant_half() -> Self {
        let p = context::precision();
        Self::from_backend(Float::with_val(p, 0.5), false, true)
    }

    pub(crate) fn shared_constant_pi() -> Self {
        let p = context::precision();
        Self::from_backend(Float::with_val(p, Constant::Pi), false, true)
    }

    pub(crate) fn shared_constant_e() -> Self {
        let p = context::precision();
        let one = Float::with_val(p, 1u32);
        let mut e = Float::new(p);
        e.assign_round(one.exp_ref(), rug::float::Round::Nearest);
        Self::from_backend(e, false, true)
    }

    /// Mark this value immutable. Further in-place mutation fails fast.
    pub fn into_constant(mut self) -> Self {
        self.constant = true;
        self
    }

    // --------------------------------------------------------------- queries

    /// Accumulated status word.
    pub fn status(&self) -> u32 {
        self.status.load(Relaxed)
    }

    /// Clear the accumulated status word.
    pub fn clear_status(&self) {
        self.status.store(0, Relaxed);
    }

    /// Whether any operation on this value rounded.
    pub fn is_inexact(&self) -> bool {
        self.status() & ST_INEXACT != 0
    }

    /// Whether this value is marked constant.
    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Finite (neither NaN nor infinite).
    pub fn is_finite(&self) -> bool {
        pool::read(self.handle, |f| f.is_finite())
    }

    /// NaN.
    pub fn is_nan(&self) -> bool {
        pool::read(self.handle, |f| f.is_nan())
    }

    /// Bit-level zero (either sign).
    pub fn is_exact_zero(&self) -> bool {
        pool::read(self.handle, |f| f.is_zero())
    }

    /// |x| ≤ ε_p for the current precision p, with ε_p = 2^(1−p).
    pub fn is_almost_zero(&self) -> bool {
        let eps = context::epsilon_for(context::precision());
        pool::read(self.handle, |f| {
            if f.is_nan() {
                return false;
            }
            matches!(
                f.cmp_abs(&eps),
                Some(Ordering::Less) | Some(Ordering::Equal)
            )
        })
    }

    /// Sign bit (true also for −0 and −∞).
    pub fn is_sign_negative(&self) -> bool {
        pool::read(self.handle, |f| f.is_sign_negative())
    }

    /// Precision (mantissa bits) of the stored value.
    pub fn precision_bits(&self) -> u32 {
        pool::read(self.handle, |f| f.prec())
    }

    /// Binary exponent e with value in [2^(e−1), 2^e); `None` for zero and
    /// non-finite values.
    pub fn exponent(&self) -> Option<i64> {
        pool::read(self.handle, |f| f.get_exp().map(i64::from))
    }

    /// Convert to double in the given rounding mode.
    pub fn to_f64(&self, rnd: RoundingMode) -> f64 {
        pool::read(self.handle, |f| f.to_f64_round(rnd.backend()))
    }

    /// Total-order comparison; `None` when either operand is NaN.
    pub fn compare(&self, other: &BigFloat) -> Option<Ordering> {
        pool::read2(self.handle, other.handle, |a, b| a.partial_cmp(b))
    }

    /// Serialize the value out of native storage (see [`crate::pool`]); it
    /// rehydrates bit-exactly on next use.
    pub fn park(&self) {
        pool::park(self.handle);
    }

    /// Whether the value currently lives as a serialized image.
    pub fn is_parked(&self) -> bool {
        pool::is_parked(self.handle)
    }

    pub(crate) fn with_backend<R>(&self, f: impl FnOnce(&Float) -> R) -> R {
        pool::read(self.handle, f)
    }

    // ------------------------------------------------------------------ calc

    /// Dispatch `op` over the operands and store the result in `self`.
    ///
    /// `prec = 0` selects the current precision. `flags` is ORed with the
    /// process-wide default flags after clearing the rounding sub-field;
    /// `rnd`, if present, overrides the rounding sub-field.
    pub fn calc(
        &mut self,
        op: BfOp,
        a: Operand<'_>,
        b: Operand<'_>,
        prec: u32,
        flags: u32,
        rnd: Option<RoundingMode>,
    ) -> Result<(), BigFloatError> {
        if self.constant {
            return Err(BigFloatError::ConstantWrite);
        }
        let p = if prec == 0 { context::precision() } else { prec };
        let eff_flags = flags | (context::default_flags() & !FLAG_ROUNDING_MASK);
        let rm = match rnd {
            Some(r) => r,
            None => {
                let sub = flags & FLAG_ROUNDING_MASK;
                if sub != 0 {
                    RoundingMode::from_flags(sub)
                } else {
                    context::default_rounding()
                }
            }
        };
        let mut st = 0u32;
        let ra = self.resolve(a, p, rm, &mut st)?;
        let rb = self.resolve(b, p, rm, &mut st)?;
        debug_assert_eq!(
            op.arity(),
            usize::from(ra.is_some()) + usize::from(rb.is_some())
        );

        let res = match op.arity() {
            0 => compute0(op, p, rm, &mut st),
            1 => with_one(&ra, |fa| compute1(op, fa, p, rm, &mut st)),
            _ => with_two(&ra, &rb, |fa, fb| compute2(op, fa, fb, p, rm, eff_flags, &mut st)),
        };

        pool::write(self.handle, |dst| *dst = res);
        self.note_status(st)
    }

    fn resolve(
        &self,
        operand: Operand<'_>,
        p: u32,
        rm: RoundingMode,
        st: &mut u32,
    ) -> Result<Resolved, BigFloatError> {
        Ok(match operand {
            Operand::None => Resolved::None,
            Operand::Bf(v) => Resolved::Pooled(v.handle),
            Operand::F64(v) => Resolved::Temp(Float::with_val(p.max(53), v)),
            Operand::Int(v) => Resolved::Temp(Float::with_val(p.max(64), v)),
            Operand::Str(s) => {
                let inc = Float::parse(s).map_err(|_| BigFloatError::Parse {
                    literal: s.to_owned(),
                    radix: 10,
                })?;
                let (f, dir) = Float::with_val_round(p, inc, rm.backend());
                if dir != Ordering::Equal {
                    *st |= ST_INEXACT;
                }
                Resolved::Temp(f)
            }
        })
    }

    fn note_status(&self, st: u32) -> Result<(), BigFloatError> {
        self.status.fetch_or(st, Relaxed);
        if st & ST_DIVIDE_ZERO != 0 {
            debug!("division by zero produced an exact infinity");
        }
        if st & ST_INVALID_OP != 0 {
            if context::throw_on_invalid_op() {
                return Err(BigFloatError::InvalidOperation);
            }
            warn!("invalid operation, result left as NaN");
        }
        Ok(())
    }

    fn self_operand(&self) -> Resolved {
        Resolved::Pooled(self.handle)
    }

    fn calc_on_self(
        &mut self,
        op: BfOp,
        b: Operand<'_>,
        flags: u32,
        rnd: Option<RoundingMode>,
    ) -> Result<(), BigFloatError> {
        if self.constant {
            return Err(BigFloatError::ConstantWrite);
        }
        let p = context::precision();
        let rm = rnd.unwrap_or_else(context::default_rounding);
        let eff_flags = flags | (context::default_flags() & !FLAG_ROUNDING_MASK);
        let mut st = 0u32;
        let ra = self.self_operand();
        let rb = self.resolve(b, p, rm, &mut st)?;
        let res = match op.arity() {
            1 => with_one(&ra, |fa| compute1(op, fa, p, rm, &mut st)),
            _ => with_two(&ra, &rb, |fa, fb| compute2(op, fa, fb, p, rm, eff_flags, &mut st)),
        };
        pool::write(self.handle, |dst| *dst = res);
        self.note_status(st)
    }

    // ------------------------------------------------------ in-place setters

    /// self ← self + rhs
    pub fn set_add<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Add, rhs.into(), 0, None)
    }
    /// self ← self − rhs
    pub fn set_sub<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Sub, rhs.into(), 0, None)
    }
    /// self ← self × rhs
    pub fn set_mul<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Mul, rhs.into(), 0, None)
    }
    /// self ← self ÷ rhs
    pub fn set_div<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Div, rhs.into(), 0, None)
    }
    /// self ← self mod rhs (round-toward-zero remainder)
    pub fn set_mod<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Mod, rhs.into(), 0, None)
    }
    /// self ← self rem rhs (round-to-nearest remainder)
    pub fn set_rem<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Rem, rhs.into(), 0, None)
    }
    /// self ← self | rhs, operands treated as integers
    pub fn set_or<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Or, rhs.into(), 0, None)
    }
    /// self ← self ^ rhs, operands treated as integers
    pub fn set_xor<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Xor, rhs.into(), 0, None)
    }
    /// self ← self & rhs, operands treated as integers
    pub fn set_and<'a>(&mut self, rhs: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::And, rhs.into(), 0, None)
    }
    /// self ← √self
    pub fn set_sqrt(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Sqrt, Operand::None, 0, None)
    }
    /// Re-round self to `prec` bits in mode `rnd`.
    pub fn set_fpround(&mut self, prec: u32, rnd: RoundingMode) -> Result<(), BigFloatError> {
        if self.constant {
            return Err(BigFloatError::ConstantWrite);
        }
        let p = if prec == 0 { context::precision() } else { prec };
        let mut st = 0u32;
        let ra = self.self_operand();
        let res = with_one(&ra, |fa| compute1(BfOp::RoundPrec, fa, p, rnd, &mut st));
        pool::write(self.handle, |dst| *dst = res);
        self.note_status(st)
    }
    /// Round self to an integer, ties to even.
    pub fn set_round(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Rint, Operand::None, 0, Some(RoundingMode::TiesToEven))
    }
    /// Truncate self to an integer.
    pub fn set_trunc(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Rint, Operand::None, 0, Some(RoundingMode::TowardZero))
    }
    /// Floor self to an integer.
    pub fn set_floor(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Rint, Operand::None, 0, Some(RoundingMode::TowardNegInf))
    }
    /// Ceil self to an integer.
    pub fn set_ceil(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Rint, Operand::None, 0, Some(RoundingMode::TowardPosInf))
    }
    /// self ← −self
    pub fn set_neg(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Neg, Operand::None, 0, None)
    }
    /// self ← |self|
    pub fn set_abs(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Abs, Operand::None, 0, None)
    }
    /// self ← sign(self) ∈ {−1, ±0, +1}
    pub fn set_sign(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Sign, Operand::None, 0, None)
    }
    /// self ← log 2
    pub fn set_log2_const(&mut self) -> Result<(), BigFloatError> {
        self.calc(BfOp::ConstLog2, Operand::None, Operand::None, 0, 0, None)
    }
    /// self ← π
    pub fn set_pi(&mut self) -> Result<(), BigFloatError> {
        self.calc(BfOp::ConstPi, Operand::None, Operand::None, 0, 0, None)
    }
    /// self ← smallest positive value of the configured exponent range.
    pub fn set_min_value(&mut self) -> Result<(), BigFloatError> {
        self.calc(BfOp::MinValue, Operand::None, Operand::None, 0, 0, None)
    }
    /// self ← largest finite value of the configured exponent range.
    pub fn set_max_value(&mut self) -> Result<(), BigFloatError> {
        self.calc(BfOp::MaxValue, Operand::None, Operand::None, 0, 0, None)
    }
    /// self ← ε_p
    pub fn set_epsilon(&mut self) -> Result<(), BigFloatError> {
        self.calc(BfOp::Epsilon, Operand::None, Operand::None, 0, 0, None)
    }
    /// self ← e^self
    pub fn set_exp(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Exp, Operand::None, 0, None)
    }
    /// self ← ln self
    pub fn set_log(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Log, Operand::None, 0, None)
    }
    /// self ← self^rhs; `flags` may carry [`POW_JS_QUIRKS`].
    pub fn set_pow<'a>(
        &mut self,
        rhs: impl Into<Operand<'a>>,
        flags: u32,
    ) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::PowOp, rhs.into(), flags, None)
    }
    /// self ← cos self
    pub fn set_cos(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Cos, Operand::None, 0, None)
    }
    /// self ← sin self
    pub fn set_sin(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Sin, Operand::None, 0, None)
    }
    /// self ← tan self
    pub fn set_tan(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Tan, Operand::None, 0, None)
    }
    /// self ← atan self
    pub fn set_atan(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Atan, Operand::None, 0, None)
    }
    /// self ← atan2(self, x)
    pub fn set_atan2<'a>(&mut self, x: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Atan2, x.into(), 0, None)
    }
    /// self ← asin self
    pub fn set_asin(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Asin, Operand::None, 0, None)
    }
    /// self ← acos self
    pub fn set_acos(&mut self) -> Result<(), BigFloatError> {
        self.calc_on_self(BfOp::Acos, Operand::None, 0, None)
    }
    /// Assign another value (re-rounded to the current precision).
    pub fn set<'a>(&mut self, v: impl Into<Operand<'a>>) -> Result<(), BigFloatError> {
        if self.constant {
            return Err(BigFloatError::ConstantWrite);
        }
        let p = context::precision();
        let rm = context::default_rounding();
        let mut st = 0u32;
        let rv = self.resolve(v.into(), p, rm, &mut st)?;
        let res = with_one(&rv, |fv| compute1(BfOp::RoundPrec, fv, p, rm, &mut st));
        pool::write(self.handle, |dst| *dst = res);
        self.note_status(st)
    }

    // ------------------------------------------------------ pure combinators

    fn pure_binary_r(&self, op: BfOp, rhs: &BigFloat, flags: u32) -> Result<BigFloat, BigFloatError> {
        let mut out = BigFloat::zero();
        out.calc(op, Operand::Bf(self), Operand::Bf(rhs), 0, flags, None)?;
        Ok(out)
    }

    fn pure_unary_r(&self, op: BfOp, rnd: Option<RoundingMode>) -> Result<BigFloat, BigFloatError> {
        let mut out = BigFloat::zero();
        out.calc(op, Operand::Bf(self), Operand::None, 0, 0, rnd)?;
        Ok(out)
    }

    /// self + rhs, checked.
    pub fn add_r(&self, rhs: &BigFloat) -> Result<BigFloat, BigFloatError> {
        self.pure_binary_r(BfOp::Add, rhs, 0)
    }
    /// self − rhs, checked.
    pub fn sub_r(&self, rhs: &BigFloat) -> Result<BigFloat, BigFloatError> {
        self.pure_binary_r(BfOp::Sub, rhs, 0)
    }
    /// self × rhs, checked.
    pub fn mul_r(&self, rhs: &BigFloat) -> Result<BigFloat, BigFloatError> {
        self.pure_binary_r(BfOp::Mul, rhs, 0)
    }
    /// self ÷ rhs, checked.
    pub fn div_r(&self, rhs: &BigFloat) -> Result<BigFloat, BigFloatError> {
        self.pure_binary_r(BfOp::Div, rhs, 0)
    }
    /// Round-toward-zero remainder, checked.
    pub fn modulo_r(&self, rhs: &BigFloat) -> Result<BigFloat, BigFloatError> {
        self.pure_binary_r(BfOp::Mod, rhs, 0)
    }
    /// Round-to-nearest remainder, checked.
    pub fn rem_r(&self, rhs: &BigFloat) -> Result<BigFloat, BigFloatError> {
        self.pure_binary_r(BfOp::Rem, rhs, 0)
    }
    /// self^rhs, checked; `flags` may carry [`POW_JS_QUIRKS`].
    pub fn pow_r(&self, rhs: &BigFloat, flags: u32) -> Result<BigFloat, BigFloatError> {
        self.pure_binary_r(BfOp::PowOp, rhs, flags)
    }
    /// atan2(self, x), checked.
    pub fn atan2_r(&self, x: &BigFloat) -> Result<BigFloat, BigFloatError> {
        self.pure_binary_r(BfOp::Atan2, x, 0)
    }
    /// √self, checked.
    pub fn sqrt_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Sqrt, None)
    }
    /// e^self, checked.
    pub fn exp_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Exp, None)
    }
    /// ln self, checked.
    pub fn ln_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Log, None)
    }
    /// sin self, checked.
    pub fn sin_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Sin, None)
    }
    /// cos self, checked.
    pub fn cos_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Cos, None)
    }
    /// tan self, checked.
    pub fn tan_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Tan, None)
    }
    /// asin self, checked.
    pub fn asin_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Asin, None)
    }
    /// acos self, checked.
    pub fn acos_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Acos, None)
    }
    /// atan self, checked.
    pub fn atan_r(&self) -> Result<BigFloat, BigFloatError> {
        self.pure_unary_r(BfOp::Atan, None)
    }

    /// self + rhs. Panics only under the raising invalid-op policy.
    pub fn add(&self, rhs: &BigFloat) -> BigFloat {
        self.add_r(rhs).expect("invalid operation")
    }
    /// self − rhs.
    pub fn sub(&self, rhs: &BigFloat) -> BigFloat {
        self.sub_r(rhs).expect("invalid operation")
    }
    /// self × rhs.
    pub fn mul(&self, rhs: &BigFloat) -> BigFloat {
        self.mul_r(rhs).expect("invalid operation")
    }
    /// self ÷ rhs.
    pub fn div(&self, rhs: &BigFloat) -> BigFloat {
        self.div_r(rhs).expect("invalid operation")
    }
    /// Round-toward-zero remainder.
    pub fn modulo(&self, rhs: &BigFloat) -> BigFloat {
        self.modulo_r(rhs).expect("invalid operation")
    }
    /// Round-to-nearest remainder.
    pub fn rem(&self, rhs: &BigFloat) -> BigFloat {
        self.rem_r(rhs).expect("invalid operation")
    }
    /// self^rhs without the JS quirks.
    pub fn pow(&self, rhs: &BigFloat) -> BigFloat {
        self.pow_r(rhs, 0).expect("invalid operation")
    }
    /// self^rhs with the JS quirks bit set.
    pub fn pow_js(&self, rhs: &BigFloat) -> BigFloat {
        self.pow_r(rhs, POW_JS_QUIRKS).expect("invalid operation")
    }
    /// atan2(self, x).
    pub fn atan2(&self, x: &BigFloat) -> BigFloat {
        self.atan2_r(x).expect("invalid operation")
    }
    /// √self.
    pub fn sqrt(&self) -> BigFloat {
        self.sqrt_r().expect("invalid operation")
    }
    /// e^self.
    pub fn exp(&self) -> BigFloat {
        self.exp_r().expect("invalid operation")
    }
    /// ln self.
    pub fn ln(&self) -> BigFloat {
        self.ln_r().expect("invalid operation")
    }
    /// sin self.
    pub fn sin(&self) -> BigFloat {
        self.sin_r().expect("invalid operation")
    }
    /// cos self.
    pub fn cos(&self) -> BigFloat {
        self.cos_r().expect("invalid operation")
    }
    /// tan self.
    pub fn tan(&self) -> BigFloat {
        self.tan_r().expect("invalid operation")
    }
    /// asin self.
    pub fn asin(&self) -> BigFloat {
        self.asin_r().expect("invalid operation")
    }
    /// acos self.
    pub fn acos(&self) -> BigFloat {
        self.acos_r().expect("invalid operation")
    }
    /// atan self.
    pub fn atan(&self) -> BigFloat {
        self.atan_r().expect("invalid operation")
    }
    /// −self.
    pub fn neg(&self) -> BigFloat {
        self.pure_unary_r(BfOp::Neg, None).expect("invalid operation")
    }
    /// |self|.
    pub fn abs(&self) -> BigFloat {
        self.pure_unary_r(BfOp::Abs, None).expect("invalid operation")
    }
    /// sign(self) ∈ {−1, ±0, +1}.
    pub fn signum(&self) -> BigFloat {
        self.pure_unary_r(BfOp::Sign, None).expect("invalid operation")
    }
    /// Nearest integer, ties to even.
    pub fn round(&self) -> BigFloat {
        self.pure_unary_r(BfOp::Rint, Some(RoundingMode::TiesToEven))
            .expect("invalid operation")
    }
    /// Integer part.
    pub fn trunc(&self) -> BigFloat {
        self.pure_unary_r(BfOp::Rint, Some(RoundingMode::TowardZero))
            .expect("invalid operation")
    }
    /// Largest integer ≤ self.
    pub fn floor(&self) -> BigFloat {
        self.pure_unary_r(BfOp::Rint, Some(RoundingMode::TowardNegInf))
            .expect("invalid operation")
    }
    /// Smallest integer ≥ self.
    pub fn ceil(&self) -> BigFloat {
        self.pure_unary_r(BfOp::Rint, Some(RoundingMode::TowardPosInf))
            .expect("invalid operation")
    }

    // ------------------------------------------------------------ formatting

    /// FIXED-format rendering with round-toward-zero and JS-quirks naming:
    /// `digits` significant digits (current precision's worth when `None`),
    /// trailing zeros trimmed, and in `pretty` mode runs of ≥ 7 identical
    /// trailing digits collapsed to `ddddd(d)`.
    pub fn to_string_radix(&self, radix: u32, digits: Option<usize>, pretty: bool) -> String {
        let radix = radix.clamp(2, 36);
        if let Some(s) = self.special_name() {
            return s;
        }
        if self.is_exact_zero() {
            return "0".to_owned();
        }
        let ndig = digits
            .unwrap_or_else(|| context::bits_to_digits(self.precision_bits()) as usize)
            .max(1);
        let (neg, digits, e10) = pool::read(self.handle, |f| {
            let (ds, e) = significant_digits(f, radix, ndig, RoundingMode::TowardZero);
            (f.is_sign_negative(), ds, e)
        });
        let mut body = render_positional(&digits, e10, radix);
        trim_fraction(&mut body);
        if pretty {
            collapse_repeats(&mut body);
        }
        if neg && body != "0" {
            format!("-{body}")
        } else {
            body
        }
    }

    /// FRAC-format rendering: exactly `frac_digits` digits after the point,
    /// rounded in `rnd`.
    pub fn to_fixed(&self, radix: u32, frac_digits: usize, rnd: RoundingMode) -> String {
        let radix = radix.clamp(2, 36);
        if let Some(s) = self.special_name() {
            return s;
        }
        let (neg, int) = pool::read(self.handle, |f| {
            (f.is_sign_negative(), scaled_integer(f, radix, frac_digits, rnd))
        });
        let mut s = int.to_string_radix(radix as i32);
        if s.len() <= frac_digits {
            let pad = frac_digits + 1 - s.len();
            s.insert_str(0, &"0".repeat(pad));
        }
        if frac_digits > 0 {
            s.insert(s.len() - frac_digits, '.');
        }
        if neg && s.bytes().any(|b| (b'1'..=b'9').contains(&b) || b.is_ascii_alphabetic()) {
            format!("-{s}")
        } else {
            s
        }
    }

    fn special_name(&self) -> Option<String> {
        pool::read(self.handle, |f| {
            if f.is_nan() {
                Some("NaN".to_owned())
            } else if f.is_infinite() {
                Some(if f.is_sign_negative() {
                    "-Infinity".to_owned()
                } else {
                    "Infinity".to_owned()
                })
            } else {
                None
            }
        })
    }
}

impl Clone for BigFloat {
    fn clone(&self) -> Self {
        let f = pool::read(self.handle, |f| f.clone());
        let out = BigFloat::from_backend(f, true, false);
        out.status.store(self.status(), Relaxed);
        out
    }
}

impl Drop for BigFloat {
    fn drop(&mut self) {
        pool::release(self.handle);
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_radix(10, None, false))
    }
}

impl fmt::Debug for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BigFloat({} p={} st={:#x})",
            self.to_string_radix(10, Some(12), false),
            self.precision_bits(),
            self.status()
        )
    }
}

impl std::ops::Add for &BigFloat {
    type Output = BigFloat;
    fn add(self, rhs: &BigFloat) -> BigFloat {
        BigFloat::add(self, rhs)
    }
}
impl std::ops::Sub for &BigFloat {
    type Output = BigFloat;
    fn sub(self, rhs: &BigFloat) -> BigFloat {
        BigFloat::sub(self, rhs)
    }
}
impl std::ops::Mul for &BigFloat {
    type Output = BigFloat;
    fn mul(self, rhs: &BigFloat) -> BigFloat {
        BigFloat::mul(self, rhs)
    }
}
impl std::ops::Div for &BigFloat {
    type Output = BigFloat;
    fn div(self, rhs: &BigFloat) -> BigFloat {
        BigFloat::div(self, rhs)
    }
}
impl std::ops::Neg for &BigFloat {
    type Output = BigFloat;
    fn neg(self) -> BigFloat {
        BigFloat::neg(self)
    }
}

// ----------------------------------------------------------------------------
// Backend computation
// ----------------------------------------------------------------------------

fn clamp_exponent(r: &mut Float, st: &mut u32) {
    if r.is_finite() && !r.is_zero() {
        let e = i64::from(r.get_exp().expect("finite nonzero value has an exponent"));
        let emax = context::exp_max();
        if e > emax {
            let neg = r.is_sign_negative();
            r.assign(if neg {
                Special::NegInfinity
            } else {
                Special::Infinity
            });
            *st |= ST_OVERFLOW | ST_INEXACT;
        } else if e < -emax {
            let neg = r.is_sign_negative();
            r.assign(if neg { Special::NegZero } else { Special::Zero });
            *st |= ST_UNDERFLOW | ST_INEXACT;
        }
    }
}

fn compute0(op: BfOp, p: u32, rm: RoundingMode, st: &mut u32) -> Float {
    let rnd = rm.backend();
    let emax = context::exp_max();
    let mut r = Float::new(p);
    let dir = match op {
        BfOp::ConstLog2 => r.assign_round(Constant::Log2, rnd),
        BfOp::ConstPi => r.assign_round(Constant::Pi, rnd),
        BfOp::MinValue => r.assign_round(Float::i_exp(1, -(emax as i32)), rnd),
        BfOp::MaxValue => {
            let mut m = Float::with_val(p, 1u32);
            m -= Float::with_val(p, Float::i_exp(1, -(p as i32)));
            m <<= emax as i32;
            r.assign_round(&m, rnd)
        }
        BfOp::Epsilon => r.assign_round(Float::i_exp(1, 1 - p as i32), rnd),
        _ => unreachable!("not a nullary op"),
    };
    if dir != Ordering::Equal {
        *st |= ST_INEXACT;
    }
    r
}

fn compute1(op: BfOp, fa: &Float, p: u32, rm: RoundingMode, st: &mut u32) -> Float {
    let rnd = rm.backend();
    let mut r = Float::new(p);
    let dir = match op {
        BfOp::Sqrt => r.assign_round(fa.sqrt_ref(), rnd),
        BfOp::RoundPrec => r.assign_round(fa, rnd),
        BfOp::Rint => match rm {
            RoundingMode::TowardZero => r.assign_round(fa.trunc_ref(), rnd),
            RoundingMode::TowardNegInf => r.assign_round(fa.floor_ref(), rnd),
            RoundingMode::TowardPosInf => r.assign_round(fa.ceil_ref(), rnd),
            RoundingMode::TiesAway => r.assign_round(fa.round_ref(), rnd),
            RoundingMode::AwayFromZero => {
                if fa.is_sign_negative() {
                    r.assign_round(fa.floor_ref(), rnd)
                } else {
                    r.assign_round(fa.ceil_ref(), rnd)
                }
            }
            _ => r.assign_round(fa.round_even_ref(), rnd),
        },
        BfOp::Neg => r.assign_round(-fa, rnd),
        BfOp::Abs => r.assign_round(fa.abs_ref(), rnd),
        BfOp::Sign => {
            if fa.is_nan() || fa.is_zero() {
                r.assign_round(fa, rnd)
            } else if fa.is_sign_negative() {
                r.assign_round(-1i32, rnd)
            } else {
                r.assign_round(1i32, rnd)
            }
        }
        BfOp::Exp => r.assign_round(fa.exp_ref(), rnd),
        BfOp::Log => {
            if fa.is_zero() {
                *st |= ST_DIVIDE_ZERO;
            }
            r.assign_round(fa.ln_ref(), rnd)
        }
        BfOp::Cos => r.assign_round(fa.cos_ref(), rnd),
        BfOp::Sin => r.assign_round(fa.sin_ref(), rnd),
        BfOp::Tan => r.assign_round(fa.tan_ref(), rnd),
        BfOp::Atan => r.assign_round(fa.atan_ref(), rnd),
        BfOp::Asin => r.assign_round(fa.asin_ref(), rnd),
        BfOp::Acos => r.assign_round(fa.acos_ref(), rnd),
        _ => unreachable!("not a unary op"),
    };
    if dir != Ordering::Equal {
        *st |= ST_INEXACT;
    }
    if r.is_nan() && !fa.is_nan() {
        *st |= ST_INVALID_OP;
    }
    clamp_exponent(&mut r, st);
    r
}

fn compute2(
    op: BfOp,
    fa: &Float,
    fb: &Float,
    p: u32,
    rm: RoundingMode,
    flags: u32,
    st: &mut u32,
) -> Float {
    let rnd = rm.backend();
    let mut r = Float::new(p);
    let dir = match op {
        BfOp::Add => r.assign_round(fa + fb, rnd),
        BfOp::Sub => r.assign_round(fa - fb, rnd),
        BfOp::Mul => r.assign_round(fa * fb, rnd),
        BfOp::Div => {
            if fb.is_zero() && fa.is_finite() && !fa.is_zero() {
                *st |= ST_DIVIDE_ZERO;
            }
            r.assign_round(fa / fb, rnd)
        }
        BfOp::Mod => r.assign_round(fa % fb, rnd),
        BfOp::Rem => r.assign_round(fa.remainder_ref(fb), rnd),
        BfOp::PowOp => {
            let one = Float::with_val(4, 1u32);
            let js = flags & POW_JS_QUIRKS != 0;
            if js && fa.cmp_abs(&one) == Some(Ordering::Equal) && fb.is_infinite() {
                r.assign(Special::Nan);
                *st |= ST_INVALID_OP;
                Ordering::Equal
            } else if js && fa.partial_cmp(&one) == Some(Ordering::Equal) && fb.is_nan() {
                r.assign(Special::Nan);
                *st |= ST_INVALID_OP;
                Ordering::Equal
            } else {
                r.assign_round(fa.pow(fb), rnd)
            }
        }
        BfOp::Atan2 => r.assign_round(fa.atan2_ref(fb), rnd),
        BfOp::Or | BfOp::Xor | BfOp::And => {
            if !fa.is_finite() || !fb.is_finite() {
                r.assign(Special::Nan);
                *st |= ST_INVALID_OP;
                Ordering::Equal
            } else {
                let ia = Float::with_val(fa.prec(), fa.trunc_ref())
                    .to_integer()
                    .unwrap_or_default();
                let ib = Float::with_val(fb.prec(), fb.trunc_ref())
                    .to_integer()
                    .unwrap_or_default();
                let iv: Integer = match op {
                    BfOp::Or => ia | ib,
                    BfOp::Xor => ia ^ ib,
                    _ => ia & ib,
                };
                r.assign_round(&iv, rnd)
            }
        }
        _ => unreachable!("not a binary op"),
    };
    if dir != Ordering::Equal {
        *st |= ST_INEXACT;
    }
    if r.is_nan() && !fa.is_nan() && !fb.is_nan() {
        *st |= ST_INVALID_OP;
    }
    clamp_exponent(&mut r, st);
    r
}

// ----------------------------------------------------------------------------
// Digit extraction and positional rendering
// ----------------------------------------------------------------------------

/// Decompose a finite non-zero float as `0.d₁d₂…dₙ · radix^e10` (normalized
/// fraction form), with the digit integer rounded in `rnd`. Exact remainder
/// information is used for the tie decisions, so every mode is correct.
fn significant_digits(f: &Float, radix: u32, ndigits: usize, rnd: RoundingMode) -> (String, i64) {
    let (mant, exp) = f.to_integer_exp().expect("finite nonzero");
    let exp = exp as i64;
    let mut mag = mant;
    if mag.cmp0() == Ordering::Less {
        mag = -mag;
    }
    let bits = mag.significant_bits() as i64 + exp; // value < 2^bits
    let log2r = (radix as f64).log2();
    // First guess for the digit count before the point.
    let mut e10 = (bits as f64 / log2r).floor() as i64;
    loop {
        let (int, _) = scale_to_digits(
            &mag,
            exp,
            radix,
            ndigits as i64 - e10,
            rnd,
            f.is_sign_negative(),
        );
        if int.cmp0() == Ordering::Equal {
            // Estimate was high enough to scale the value below one digit.
            e10 -= 1;
            continue;
        }
        let digits = int.to_string_radix(radix as i32);
        let got = digits.len() as i64;
        if got != ndigits as i64 {
            e10 += got - ndigits as i64;
            continue;
        }
        return (digits, e10);
    }
}

/// floor/round of `mag·2^exp · radix^j` as an exact integer, per `rnd` and
/// the sign of the original value. Returns (integer, was_exact).
fn scale_to_digits(
    mag: &Integer,
    exp: i64,
    radix: u32,
    j: i64,
    rnd: RoundingMode,
    negative: bool,
) -> (Integer, bool) {
    let mut num = mag.clone();
    let mut den = Integer::from(1);
    if exp >= 0 {
        num <<= exp as u32;
    } else {
        den <<= (-exp) as u32;
    }
    if j >= 0 {
        num *= Integer::from(radix).pow(j as u32);
    } else {
        den *= Integer::from(radix).pow((-j) as u32);
    }
    let (q, r) = num.div_rem(den.clone());
    let exact = r.cmp0() == Ordering::Equal;
    if exact {
        return (q, true);
    }
    // q = floor since num, den > 0. Decide whether to bump away from zero.
    let bump = match rnd {
        RoundingMode::TowardZero => false,
        RoundingMode::AwayFromZero => true,
        RoundingMode::TowardNegInf => negative,
        RoundingMode::TowardPosInf => !negative,
        RoundingMode::Faithful => false,
        RoundingMode::TiesToEven | RoundingMode::TiesAway => {
            // Compare 2r against den; ties cannot occur here (r ≠ 0 path
            // handles them via exactness of 2r = den).
            let twice = r << 1u32;
            match twice.cmp(&den) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => {
                    if rnd == RoundingMode::TiesAway {
                        true
                    } else {
                        q.is_odd()
                    }
                }
            }
        }
    };
    if bump {
        (q + 1u32, false)
    } else {
        (q, false)
    }
}

/// Render normalized-fraction digits positionally (no exponent notation).
fn render_positional(digits: &str, e10: i64, _radix: u32) -> String {
    let n = digits.len() as i64;
    if e10 <= 0 {
        let mut s = String::from("0.");
        for _ in 0..(-e10) {
            s.push('0');
        }
        s.push_str(digits);
        s
    } else if e10 >= n {
        let mut s = String::from(digits);
        for _ in 0..(e10 - n) {
            s.push('0');
        }
        s
    } else {
        let (int, frac) = digits.split_at(e10 as usize);
        format!("{int}.{frac}")
    }
}

fn trim_fraction(s: &mut String) {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
}

/// Collapse a run of ≥ 7 identical trailing fraction digits `d` to `ddddd(d)`.
fn collapse_repeats(s: &mut String) {
    let Some(dot) = s.find('.') else { return };
    let frac_start = dot + 1;
    let bytes = s.as_bytes();
    let last = match bytes.last() {
        Some(&b) => b,
        None => return,
    };
    let mut run = 0usize;
    for &b in bytes[frac_start..].iter().rev() {
        if b == last {
            run += 1;
        } else {
            break;
        }
    }
    if run >= 7 {
        let keep = s.len() - (run - 5);
        s.truncate(keep);
        s.push('(');
        s.push(last as char);
        s.push(')');
    }
}

/// round(|x| · radix^frac_digits) as an integer, per `rnd`.
fn scaled_integer(f: &Float, radix: u32, frac_digits: usize, rnd: RoundingMode) -> Integer {
    if f.is_zero() {
        return Integer::new();
    }
    let (mant, exp) = f.to_integer_exp().expect("finite nonzero");
    let exp = exp as i64;
    let mut mag = mant;
    if mag.cmp0() == Ordering::Less {
        mag = -mag;
    }
    scale_to_digits(&mag, exp, radix, frac_digits as i64, rnd, f.is_sign_negative()).0
}

// ============================================================================
// Tests
// ============================================================================
