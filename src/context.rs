//! Process-wide numeric context
//!
//! This module is the **single definition site** for the mutable singletons
//! shared by every arbitrary-precision value in the process:
//!
//! - the current **precision** (mantissa bits) and its push/pop stack,
//! - the default **flags word** (rounding sub-field + exponent-bits sub-field),
//! - the **invalid-operation policy** (`throw_on_invalid_op`),
//! - the cached per-precision epsilon `ε_p = 2^(1−p)`,
//! - the eight shared immutable constants (0, ½, 1, 2, 3, −1, π, e).
//!
//! ## Flags word layout
//!
//! ```text
//! bits  0..3   rounding mode (see [`RoundingMode`])
//! bits  3..9   exponent bits (bounded-exponent range |e| < 2^(n−1))
//! bits 16..18  FTOA format (FIXED / FRAC / FREE / FREE_MIN)
//! bit  20      FTOA_FORCE_EXP
//! bit  21      FTOA_ADD_PREFIX
//! bit  22      JS_QUIRKS (formatting + pow special cases)
//! ```
//!
//! ## Discipline
//!
//! Last-writer-wins; callers scope temporary precision changes with
//! `push_precision`/`pop_precision` pairs (or the RAII [`PrecisionGuard`]) and
//! never leave the stack imbalanced. Popping an empty stack is a **no-op**.
//! The constants are lazily initialized on first touch and never mutated; any
//! in-place mutator on them fails fast (see `bigfloat`).

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rug::float::Round;
use rug::Float;

use crate::bigfloat::BigFloat;

// ----------------------------------------------------------------------------
// Rounding modes and status bits (the primitive-library contract surface)
// ----------------------------------------------------------------------------

/// Rounding modes of the primitive contract. The numeric discriminants are
/// part of the flags-word encoding and must not be reordered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum RoundingMode {
    /// Round to nearest, ties to even (IEEE-754 default).
    TiesToEven = 0,
    /// Round toward zero.
    TowardZero = 1,
    /// Round toward −∞.
    TowardNegInf = 2,
    /// Round toward +∞.
    TowardPosInf = 3,
    /// Round to nearest, ties away from zero.
    TiesAway = 4,
    /// Round away from zero.
    AwayFromZero = 5,
    /// Faithful rounding (either of the two closest representables).
    Faithful = 6,
}

impl RoundingMode {
    /// Decode the low three bits of a flags word.
    pub fn from_flags(flags: u32) -> Self {
        match flags & FLAG_ROUNDING_MASK {
            0 => RoundingMode::TiesToEven,
            1 => RoundingMode::TowardZero,
            2 => RoundingMode::TowardNegInf,
            3 => RoundingMode::TowardPosInf,
            4 => RoundingMode::TiesAway,
            5 => RoundingMode::AwayFromZero,
            _ => RoundingMode::Faithful,
        }
    }

    /// The backend rounding mode servicing this contract mode.
    ///
    /// Ties-away and faithful have no MPFR counterpart and are serviced as
    /// nearest-ties-even; away-from-zero maps onto `Round::AwayZero`.
    pub(crate) fn backend(self) -> Round {
        match self {
            RoundingMode::TiesToEven => Round::Nearest,
            RoundingMode::TowardZero => Round::Zero,
            RoundingMode::TowardNegInf => Round::Down,
            RoundingMode::TowardPosInf => Round::Up,
            RoundingMode::TiesAway => Round::Nearest,
            RoundingMode::AwayFromZero => Round::AwayZero,
            RoundingMode::Faithful => Round::Nearest,
        }
    }
}

/// Mask of the rounding sub-field inside a flags word.
pub const FLAG_ROUNDING_MASK: u32 = 0x7;
/// Shift of the exponent-bits sub-field.
pub const FLAG_EXP_BITS_SHIFT: u32 = 3;
/// Mask (pre-shift) of the exponent-bits sub-field.
pub const FLAG_EXP_BITS_MASK: u32 = 0x3f;

/// FTOA format sub-field shift (bits 16..18).
pub const FTOA_FORMAT_SHIFT: u32 = 16;
/// Render with a fixed number of significant digits.
pub const FTOA_FIXED: u32 = 0 << FTOA_FORMAT_SHIFT;
/// Render with a fixed number of fractional digits.
pub const FTOA_FRAC: u32 = 1 << FTOA_FORMAT_SHIFT;
/// Render with as many digits as needed for exact round-trip.
pub const FTOA_FREE: u32 = 2 << FTOA_FORMAT_SHIFT;
/// Like FREE but with the minimal digit count.
pub const FTOA_FREE_MIN: u32 = 3 << FTOA_FORMAT_SHIFT;
/// Force exponent notation.
pub const FTOA_FORCE_EXP: u32 = 1 << 20;
/// Prefix non-decimal output with the radix marker.
pub const FTOA_ADD_PREFIX: u32 = 1 << 21;
/// JavaScript-compatible special-value naming and trimming.
pub const FLAG_JS_QUIRKS: u32 = 1 << 22;
/// JavaScript pow quirks: (±1)^(±∞) = NaN, 1^NaN = NaN.
pub const POW_JS_QUIRKS: u32 = 1 << 16;

/// Status bit: invalid operation (NaN produced from non-NaN operands).
pub const ST_INVALID_OP: u32 = 1 << 0;
/// Status bit: exact infinity from finite operands (division by zero, log 0).
pub const ST_DIVIDE_ZERO: u32 = 1 << 1;
/// Status bit: exponent overflow (result clamped to ±∞).
pub const ST_OVERFLOW: u32 = 1 << 2;
/// Status bit: exponent underflow (result clamped to ±0).
pub const ST_UNDERFLOW: u32 = 1 << 3;
/// Status bit: the rounded result differs from the exact result.
pub const ST_INEXACT: u32 = 1 << 4;
/// Status bit: allocation failure in the primitive library (does not arise
/// under this backend; kept for contract completeness).
pub const ST_MEM_ERROR: u32 = 1 << 5;

// ----------------------------------------------------------------------------
// Mutable context state
// ----------------------------------------------------------------------------

/// Default mantissa precision in bits.
pub const DEFAULT_PRECISION: u32 = 128;
/// Default exponent-bits sub-field (|e| < 2^29).
pub const DEFAULT_EXP_BITS: u32 = 30;
/// Smallest accepted precision.
pub const MIN_PRECISION: u32 = 4;
/// Largest accepted precision.
pub const MAX_PRECISION: u32 = 1 << 24;

struct CtxState {
    precision: u32,
    stack: Vec<u32>,
    default_flags: u32,
    throw_on_invalid: bool,
    eps_cache: HashMap<u32, Float>,
}

static STATE: Lazy<Mutex<CtxState>> = Lazy::new(|| {
    Mutex::new(CtxState {
        precision: DEFAULT_PRECISION,
        stack: Vec::new(),
        default_flags: (DEFAULT_EXP_BITS & FLAG_EXP_BITS_MASK) << FLAG_EXP_BITS_SHIFT,
        throw_on_invalid: false,
        eps_cache: HashMap::new(),
    })
});

fn clamp_precision(bits: u32) -> u32 {
    bits.clamp(MIN_PRECISION, MAX_PRECISION)
}

/// Current working precision in bits.
pub fn precision() -> u32 {
    STATE.lock().expect("context poisoned").precision
}

/// Set the current precision (clamped to the supported range).
pub fn set_precision(bits: u32) {
    STATE.lock().expect("context poisoned").precision = clamp_precision(bits);
}

/// Push the current precision and switch to `bits`.
pub fn push_precision(bits: u32) {
    let mut st = STATE.lock().expect("context poisoned");
    let prev = st.precision;
    st.stack.push(prev);
    st.precision = clamp_precision(bits);
}

/// Restore the most recently pushed precision. Popping an empty stack is a
/// no-op.
pub fn pop_precision() {
    let mut st = STATE.lock().expect("context poisoned");
    if let Some(prev) = st.stack.pop() {
        st.precision = prev;
    }
}

/// RAII wrapper around a `push_precision`/`pop_precision` pair.
pub struct PrecisionGuard(());

impl PrecisionGuard {
    /// Push `bits` for the lifetime of the guard.
    pub fn new(bits: u32) -> Self {
        push_precision(bits);
        PrecisionGuard(())
    }
}

impl Drop for PrecisionGuard {
    fn drop(&mut self) {
        pop_precision();
    }
}

/// Bits needed for `d` decimal digits: ⌈d·log₂10⌉.
pub fn digits_to_bits(digits: u32) -> u32 {
    (f64::from(digits) * std::f64::consts::LOG2_10).ceil() as u32
}

/// Decimal digits representable in `bits`: ⌊b·log₁₀2⌋.
pub fn bits_to_digits(bits: u32) -> u32 {
    (f64::from(bits) * std::f64::consts::LOG10_2).floor() as u32
}

/// The process-wide default flags word (rounding + exponent-bits sub-fields).
pub fn default_flags() -> u32 {
    STATE.lock().expect("context poisoned").default_flags
}

/// Default rounding mode (low three bits of the default flags word).
pub fn default_rounding() -> RoundingMode {
    RoundingMode::from_flags(default_flags())
}

/// Replace the rounding sub-field of the default flags word.
pub fn set_default_rounding(rm: RoundingMode) {
    let mut st = STATE.lock().expect("context poisoned");
    st.default_flags = (st.default_flags & !FLAG_ROUNDING_MASK) | rm as u32;
}

/// Exponent-bits sub-field of the default flags word.
pub fn exp_bits() -> u32 {
    (default_flags() >> FLAG_EXP_BITS_SHIFT) & FLAG_EXP_BITS_MASK
}

/// Set the exponent-bits sub-field (clamped to 3..=31).
pub fn set_exp_bits(bits: u32) {
    let bits = bits.clamp(3, 31) & FLAG_EXP_BITS_MASK;
    let mut st = STATE.lock().expect("context poisoned");
    st.default_flags = (st.default_flags & !(FLAG_EXP_BITS_MASK << FLAG_EXP_BITS_SHIFT))
        | (bits << FLAG_EXP_BITS_SHIFT);
}

/// Largest exponent admitted by the current exponent-bits setting.
pub(crate) fn exp_max() -> i64 {
    1i64 << (exp_bits() - 1)
}

/// Whether BF_ST_INVALID_OP raises (true) or is only logged (false).
pub fn throw_on_invalid_op() -> bool {
    STATE.lock().expect("context poisoned").throw_on_invalid
}

/// Set the invalid-operation policy.
pub fn set_throw_on_invalid_op(throw: bool) {
    STATE.lock().expect("context poisoned").throw_on_invalid = throw;
}

/// Cached `ε_p = 2^(1−p)` for the given precision, as a backend float.
pub(crate) fn epsilon_for(p: u32) -> Float {
    let mut st = STATE.lock().expect("context poisoned");
    st.eps_cache
        .entry(p)
        .or_insert_with(|| {
            let mut e = Float::with_val(MIN_PRECISION, 1u32);
            e >>= (p as i32) - 1;
            e
        })
        .clone()
}

// ----------------------------------------------------------------------------
// Shared immutable constants
// ----------------------------------------------------------------------------

/// The shared immutable singletons. Every field is marked constant; in-place
/// mutators on them fail fast rather than corrupting a process-wide value.
pub struct Consts {
    /// 0
    pub zero: BigFloat,
    /// ½
    pub half: BigFloat,
    /// 1
    pub one: BigFloat,
    /// 2
    pub two: BigFloat,
    /// 3
    pub three: BigFloat,
    /// −1
    pub minus_one: BigFloat,
    /// π at the precision current when the constants were initialized.
    pub pi: BigFloat,
    /// e at the precision current when the constants were initialized.
    pub e: BigFloat,
}

static CONSTS: Lazy<Consts> = Lazy::new(|| Consts {
    zero: BigFloat::shared_constant_i64(0),
    half: BigFloat::shared_constant_half(),
    one: BigFloat::shared_constant_i64(1),
    two: BigFloat::shared_constant_i64(2),
    three: BigFloat::shared_constant_i64(3),
    minus_one: BigFloat::shared_constant_i64(-1),
    pi: BigFloat::shared_constant_pi(),
    e: BigFloat::shared_constant_e(),
});

/// Access the shared constants, initializing them on first touch.
pub fn consts() -> &'static Consts {
    &CONSTS
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_bit_conversions() {
        // 10 decimal digits need ceil(10 * 3.3219...) = 34 bits.
        assert_eq!(digits_to_bits(10), 34);
        // 34 bits hold floor(34 * 0.30103) = 10 digits.
        assert_eq!(bits_to_digits(34), 10);
        assert_eq!(digits_to_bits(1), 4);
    }

    #[test]
    fn precision_stack_push_pop() {
        let _s = crate::testutil::serial();
        let base = precision();
        push_precision(256);
        assert_eq!(precision(), 256);
        push_precision(64);
        assert_eq!(precision(), 64);
        pop_precision();
        assert_eq!(precision(), 256);
        pop_precision();
        assert_eq!(precision(), base);
        // Popping an empty stack must not change the current precision.
        pop_precision();
        assert_eq!(precision(), base);
    }

    #[test]
    fn precision_guard_scopes() {
        let _s = crate::testutil::serial();
        let base = precision();
        {
            let _g = PrecisionGuard::new(192);
            assert_eq!(precision(), 192);
        }
        assert_eq!(precision(), base);
    }

    #[test]
    fn rounding_subfield_roundtrip() {
        let _s = crate::testutil::serial();
        let before = default_rounding();
        set_default_rounding(RoundingMode::TowardNegInf);
        assert_eq!(default_rounding(), RoundingMode::TowardNegInf);
        assert_eq!(default_flags() & FLAG_ROUNDING_MASK, 2);
        set_default_rounding(before);
    }

    #[test]
    fn flags_decode() {
        assert_eq!(RoundingMode::from_flags(0), RoundingMode::TiesToEven);
        assert_eq!(RoundingMode::from_flags(5), RoundingMode::AwayFromZero);
        assert_eq!(RoundingMode::from_flags(8 | 1), RoundingMode::TowardZero);
    }

    #[test]
    fn shared_constants_have_expected_values() {
        let c = consts();
        assert_eq!(c.two.to_f64(RoundingMode::TiesToEven), 2.0);
        assert_eq!(c.half.to_f64(RoundingMode::TiesToEven), 0.5);
        assert_eq!(c.minus_one.to_f64(RoundingMode::TiesToEven), -1.0);
        let pi = c.pi.to_f64(RoundingMode::TiesToEven);
        assert!((pi - std::f64::consts::PI).abs() < 1e-15);
        let e = c.e.to_f64(RoundingMode::TiesToEven);
        assert!((e - std::f64::consts::E).abs() < 1e-15);
    }
}
