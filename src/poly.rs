//! Sparse univariate polynomials / truncated Laurent series
//!
//! [`Poly<T>`] stores two parallel sequences — strictly ascending integer
//! degrees (negative degrees admitted) and non-zero coefficients — plus a
//! truncation [`Order`]: `Order::Inf` means "exact polynomial", `Order::At(k)`
//! means the value is only known modulo `O(x^k)`.
//!
//! ## Canonical form
//!
//! Every constructor and every arithmetic result passes through
//! normalization: stable-sort ascending by degree, fold duplicate degrees by
//! coefficient addition, drop exact-zero coefficients, drop any term with
//! degree ≥ the order.
//!
//! ## Order arithmetic
//!
//! With `v` the valuation and `o` the order of each operand (∞ absorbing):
//!
//! - add, sub: `o' = min(o_A, o_B)`
//! - mul:      `o' = min(v_A + o_B, v_B + o_A, o_A + o_B)`
//! - div:      `o' = min(o_A − v_B, o_B + v_A − 2·v_B)`
//! - deriv:    `o' = max(0, o − 1)`; integ: `o' = o + 1`
//! - scalar mul / neg: `o' = o`
//!
//! These encode that an `O(x^k)` error in A contributes an `O(x^{k−v_B})`
//! error to A/B, and so on.
//!
//! ## Division
//!
//! Synthetic low-to-high series division (see [`Poly::div_with_limit_r`]):
//! matches formal power series semantics, supports Laurent operands, and
//! coincides with polynomial long division exactly when the remainder empties
//! inside the computation window. An exact division whose quotient does not
//! terminate inside the window loses exactness permanently: the
//! `dropped_significant` flag records it and the result becomes a truncated
//! series.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use crate::coeff::Coefficient;

/// Safety limit for exact divisions with non-terminating quotients.
pub const DEFAULT_DIV_LIMIT: usize = 100;

/// Hard failures of the polynomial layer.
#[derive(Debug, thiserror::Error)]
pub enum PolyError {
    /// Division by the zero polynomial.
    #[error("division by the zero polynomial")]
    DivisionByZero,
    /// Integration of an x⁻¹ term would produce a logarithm.
    #[error("cannot integrate an x^-1 term")]
    IntegrateLogTerm,
    /// Series operation on a Laurent operand with negative valuation.
    #[error("series operation on negative valuation {0}")]
    NegativeValuation(i64),
    /// Series operation on an exact polynomial with positive-degree part.
    #[error("operand is not a truncated series")]
    NotTruncated,
    /// Fractional-power valuation v·n is not divisible by d.
    #[error("power {num}/{den} of valuation {val} has fractional valuation")]
    FractionalValuation {
        /// Operand valuation.
        val: i64,
        /// Exponent numerator.
        num: i64,
        /// Exponent denominator.
        den: i64,
    },
    /// Zero base with a non-positive exponent.
    #[error("zero base with non-positive exponent")]
    ZeroBase,
    /// Zero exponent denominator.
    #[error("exponent denominator is zero")]
    BadExponent,
    /// log of a series with zero constant term.
    #[error("logarithm of a series with zero constant term")]
    ZeroConstantTerm,
    /// Dense non-negative view of a Laurent polynomial.
    #[error("negative valuation {0} has no non-negative dense view")]
    NegativeDense(i64),
}

// ----------------------------------------------------------------------------
// Truncation order
// ----------------------------------------------------------------------------

/// Truncation order `o ∈ ℤ ∪ {+∞}`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Order {
    /// Known modulo `O(x^k)`.
    At(i64),
    /// Exact (not truncated).
    Inf,
}

impl Order {
    /// Finite payload, if any.
    pub fn as_finite(self) -> Option<i64> {
        match self {
            Order::At(k) => Some(k),
            Order::Inf => None,
        }
    }

    /// Whether a term of degree `d` is representable under this order.
    pub fn allows(self, d: i64) -> bool {
        match self {
            Order::At(k) => d < k,
            Order::Inf => true,
        }
    }

    /// min(self, rhs) with ∞ as the top element.
    pub fn min(self, rhs: Order) -> Order {
        match (self, rhs) {
            (Order::At(a), Order::At(b)) => Order::At(a.min(b)),
            (Order::At(a), Order::Inf) | (Order::Inf, Order::At(a)) => Order::At(a),
            (Order::Inf, Order::Inf) => Order::Inf,
        }
    }

    /// self + rhs with ∞ absorbing.
    pub fn plus(self, rhs: Order) -> Order {
        match (self, rhs) {
            (Order::At(a), Order::At(b)) => Order::At(a + b),
            _ => Order::Inf,
        }
    }

    /// self + k with ∞ absorbing.
    pub fn plus_i(self, k: i64) -> Order {
        match self {
            Order::At(a) => Order::At(a + k),
            Order::Inf => Order::Inf,
        }
    }
}

impl PartialOrd for Order {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(match (self, other) {
            (Order::At(a), Order::At(b)) => a.cmp(b),
            (Order::At(_), Order::Inf) => std::cmp::Ordering::Less,
            (Order::Inf, Order::At(_)) => std::cmp::Ordering::Greater,
            (Order::Inf, Order::Inf) => std::cmp::Ordering::Equal,
        })
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::At(k) => write!(f, "{k}"),
            Order::Inf => f.write_str("inf"),
        }
    }
}

// ----------------------------------------------------------------------------
// The polynomial type
// ----------------------------------------------------------------------------

/// Outcome of a division: the quotient plus the exactness bookkeeping.
#[derive(Clone, Debug)]
pub struct Division<T: Coefficient> {
    /// The quotient (order per the division rule).
    pub quotient: Poly<T>,
    /// The remainder emptied inside the window and nothing was dropped.
    pub exact: bool,
    /// A non-zero remainder term was pushed beyond the computation window.
    pub dropped_significant: bool,
}

/// Sparse univariate polynomial / truncated Laurent series over `T`.
#[derive(Clone, Debug)]
pub struct Poly<T: Coefficient> {
    degs: Vec<i64>,
    coefs: Vec<T>,
    order: Order,
}

impl<T: Coefficient> Poly<T> {
    // --------------------------------------------------------- construction

    /// Canonicalize `(degree, coefficient)` pairs under `order`.
    pub fn from_terms(mut terms: Vec<(i64, T)>, order: Order) -> Self {
        terms.sort_by_key(|t| t.0);
        let mut degs = Vec::with_capacity(terms.len());
        let mut coefs: Vec<T> = Vec::with_capacity(terms.len());
        for (d, c) in terms {
            if let (Some(&last), true) = (degs.last(), !coefs.is_empty()) {
                if last == d {
                    let merged = coefs.last().expect("parallel vectors").add(&c);
                    *coefs.last_mut().expect("parallel vectors") = merged;
                    continue;
                }
            }
            degs.push(d);
            coefs.push(c);
        }
        // Zero-filter after duplicate merging, then the order filter.
        let mut out_degs = Vec::with_capacity(degs.len());
        let mut out_coefs = Vec::with_capacity(coefs.len());
        for (d, c) in degs.into_iter().zip(coefs.into_iter()) {
            if !c.is_zero() && order.allows(d) {
                out_degs.push(d);
                out_coefs.push(c);
            }
        }
        Poly {
            degs: out_degs,
            coefs: out_coefs,
            order,
        }
    }

    /// Dense ascending coefficients starting at x⁰; exact order.
    pub fn from_dense(coeffs: &[T]) -> Self {
        let terms = coeffs
            .iter()
            .enumerate()
            .map(|(i, c)| (i as i64, c.clone()))
            .collect();
        Self::from_terms(terms, Order::Inf)
    }

    /// The exact zero polynomial.
    pub fn zero() -> Self {
        Poly {
            degs: Vec::new(),
            coefs: Vec::new(),
            order: Order::Inf,
        }
    }

    /// `O(x^k)`: nothing known below the order.
    pub fn truncated_zero(k: i64) -> Self {
        Poly {
            degs: Vec::new(),
            coefs: Vec::new(),
            order: Order::At(k),
        }
    }

    /// The unit polynomial.
    pub fn one() -> Self {
        Self::constant(T::one())
    }

    /// A constant polynomial (exact).
    pub fn constant(c: T) -> Self {
        Self::from_terms(vec![(0, c)], Order::Inf)
    }

    /// The indeterminate x.
    pub fn x() -> Self {
        Self::monomial(1, T::one())
    }

    /// `c·x^d` (exact).
    pub fn monomial(d: i64, c: T) -> Self {
        Self::from_terms(vec![(d, c)], Order::Inf)
    }

    /// Impose an additional truncation: result order is `min(o, k)` and terms
    /// at or above it are dropped.
    pub fn truncate(&self, k: Order) -> Self {
        let order = self.order.min(k);
        let terms = self
            .terms()
            .map(|(d, c)| (d, c.clone()))
            .collect();
        Self::from_terms(terms, order)
    }

    // -------------------------------------------------------------- queries

    /// Truncation order.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Number of stored terms.
    pub fn len(&self) -> usize {
        self.degs.len()
    }

    /// No stored terms.
    pub fn is_empty(&self) -> bool {
        self.degs.is_empty()
    }

    /// Iterate `(degree, &coefficient)` in ascending degree order.
    pub fn terms(&self) -> impl Iterator<Item = (i64, &T)> + '_ {
        self.degs.iter().copied().zip(self.coefs.iter())
    }

    /// The coefficient at `d`, if stored.
    pub fn coefficient(&self, d: i64) -> Option<&T> {
        self.degs.binary_search(&d).ok().map(|i| &self.coefs[i])
    }

    /// Valuation: smallest stored degree; the order when empty and truncated;
    /// ∞ when empty and exact.
    pub fn valuation(&self) -> Order {
        match self.degs.first() {
            Some(&d) => Order::At(d),
            None => self.order,
        }
    }

    /// Largest stored degree, or −1 when empty.
    pub fn degree(&self) -> i64 {
        self.degs.last().copied().unwrap_or(-1)
    }

    /// Dense view over `[v, deg]`: `(start_degree, coefficients)`.
    pub fn dense(&self) -> (i64, Vec<T>) {
        let Some(&start) = self.degs.first() else {
            return (0, Vec::new());
        };
        let end = self.degree();
        let mut out = vec![T::zero(); (end - start + 1) as usize];
        for (d, c) in self.terms() {
            out[(d - start) as usize] = c.clone();
        }
        (start, out)
    }

    /// Strict non-negative dense view `[0, deg]`; refuses negative valuation.
    pub fn dense_nonneg_r(&self) -> Result<Vec<T>, PolyError> {
        if let Some(&v) = self.degs.first() {
            if v < 0 {
                return Err(PolyError::NegativeDense(v));
            }
        }
        let end = self.degree();
        let mut out = vec![T::zero(); (end + 1).max(0) as usize];
        for (d, c) in self.terms() {
            out[d as usize] = c.clone();
        }
        Ok(out)
    }

    // ----------------------------------------------------------- arithmetic

    /// self + rhs; `o' = min(o_A, o_B)`.
    pub fn add(&self, rhs: &Self) -> Self {
        let order = self.order.min(rhs.order);
        let mut terms: Vec<(i64, T)> = self.terms().map(|(d, c)| (d, c.clone())).collect();
        terms.extend(rhs.terms().map(|(d, c)| (d, c.clone())));
        Self::from_terms(terms, order)
    }

    /// self − rhs; `o' = min(o_A, o_B)`.
    pub fn sub(&self, rhs: &Self) -> Self {
        self.add(&rhs.neg())
    }

    /// −self; the order is unchanged.
    pub fn neg(&self) -> Self {
        Poly {
            degs: self.degs.clone(),
            coefs: self.coefs.iter().map(|c| c.neg()).collect(),
            order: self.order,
        }
    }

    /// Scalar multiple; the order is unchanged.
    pub fn scale(&self, k: &T) -> Self {
        let terms = self.terms().map(|(d, c)| (d, c.mul(k))).collect();
        Self::from_terms(terms, self.order)
    }

    /// Shift every degree by `s` (multiply by x^s); the order shifts with it.
    pub fn shift(&self, s: i64) -> Self {
        Poly {
            degs: self.degs.iter().map(|d| d + s).collect(),
            coefs: self.coefs.clone(),
            order: self.order.plus_i(s),
        }
    }

    /// self × rhs by sparse convolution;
    /// `o' = min(v_A + o_B, v_B + o_A, o_A + o_B)`.
    pub fn mul(&self, rhs: &Self) -> Self {
        let order = self
            .valuation()
            .plus(rhs.order)
            .min(rhs.valuation().plus(self.order))
            .min(self.order.plus(rhs.order));
        let mut acc: BTreeMap<i64, T> = BTreeMap::new();
        for (da, ca) in self.terms() {
            for (db, cb) in rhs.terms() {
                let d = da + db;
                if !order.allows(d) {
                    continue;
                }
                let prod = ca.mul(cb);
                match acc.remove(&d) {
                    Some(prev) => {
                        let sum = prev.add(&prod);
                        if !sum.is_zero() {
                            acc.insert(d, sum);
                        }
                    }
                    None => {
                        acc.insert(d, prod);
                    }
                }
            }
        }
        Self::from_terms(acc.into_iter().collect(), order)
    }

    /// Non-negative integer power by repeated squaring; the zero exponent
    /// yields the unit polynomial at the operand's order.
    pub fn powi(&self, n: u32) -> Self {
        if n == 0 {
            return Self::one().truncate(self.order);
        }
        let mut base = self.clone();
        let mut e = n;
        let mut acc: Option<Self> = None;
        while e > 0 {
            if e & 1 == 1 {
                acc = Some(match acc {
                    Some(a) => a.mul(&base),
                    None => base.clone(),
                });
            }
            e >>= 1;
            if e > 0 {
                base = base.mul(&base);
            }
        }
        acc.expect("n > 0 always sets the accumulator")
    }

    /// self ÷ rhs with the default exact-mode safety limit.
    pub fn div_r(&self, rhs: &Self) -> Result<Self, PolyError> {
        self.div_with_limit_r(rhs, DEFAULT_DIV_LIMIT)
            .map(|d| d.quotient)
    }

    /// Synthetic low-to-high series division.
    ///
    /// Exact mode (both operands exact) runs the loop for at most `limit`
    /// quotient terms; if the running remainder empties in that window the
    /// quotient is the exact polynomial, otherwise exactness is lost forever
    /// and the result is a truncated series of order `v_A − v_B + limit`.
    /// Series mode computes quotient coefficients up to exactly
    /// `o' = min(o_A − v_B, o_B + v_A − 2·v_B)`.
    pub fn div_with_limit_r(&self, rhs: &Self, limit: usize) -> Result<Division<T>, PolyError> {
        if rhs.is_empty() {
            return Err(PolyError::DivisionByZero);
        }
        let v_b = rhs.degs[0];
        let b_low = &rhs.coefs[0];
        let exact_mode = self.order == Order::Inf && rhs.order == Order::Inf;

        // Zero dividend short-circuits: 0/B is exact zero, O(x^k)/B keeps the
        // propagated order.
        if self.is_empty() && self.order == Order::Inf {
            return Ok(Division {
                quotient: Self::zero(),
                exact: true,
                dropped_significant: false,
            });
        }
        let v_a = match self.valuation() {
            Order::At(v) => v,
            Order::Inf => unreachable!("empty exact dividend handled above"),
        };
        let start = v_a - v_b;
        let limit_k = if exact_mode {
            start + limit as i64
        } else {
            let o = self
                .order
                .plus_i(-v_b)
                .min(rhs.order.plus_i(v_a - 2 * v_b));
            match o.as_finite() {
                Some(k) => k,
                None => unreachable!("series mode has a finite order"),
            }
        };
        let window_top = limit_k + v_b;

        let mut rem: BTreeMap<i64, T> = self.terms().map(|(d, c)| (d, c.clone())).collect();
        let mut q_terms: Vec<(i64, T)> = Vec::new();
        let mut dropped = false;

        let mut k = start;
        while k < limit_k && !rem.is_empty() {
            let target = k + v_b;
            if let Some(r) = rem.remove(&target) {
                let qk = r.div(b_low);
                for (db, cb) in rhs.terms().skip(1) {
                    let affect = k + db;
                    let prod = qk.mul(cb);
                    if affect >= window_top {
                        if !prod.is_zero() {
                            dropped = true;
                        }
                        continue;
                    }
                    match rem.remove(&affect) {
                        Some(prev) => {
                            let next = prev.sub(&prod);
                            if !next.is_zero() {
                                rem.insert(affect, next);
                            }
                        }
                        None => {
                            rem.insert(affect, prod.neg());
                        }
                    }
                }
                q_terms.push((k, qk));
            }
            k += 1;
        }

        let exact = exact_mode && rem.is_empty() && !dropped;
        let order = if exact { Order::Inf } else { Order::At(limit_k) };
        Ok(Division {
            quotient: Self::from_terms(q_terms, order),
            exact,
            dropped_significant: dropped,
        })
    }

    /// Formal derivative; `o' = max(0, o − 1)`.
    pub fn deriv(&self) -> Self {
        let order = match self.order {
            Order::At(k) => Order::At((k - 1).max(0)),
            Order::Inf => Order::Inf,
        };
        let terms = self
            .terms()
            .filter(|&(d, _)| d != 0)
            .map(|(d, c)| (d - 1, c.mul(&T::from_i64(d))))
            .collect();
        Self::from_terms(terms, order)
    }

    /// Formal antiderivative (integration constant 0); `o' = o + 1`.
    /// Integration of an x⁻¹ term is rejected — it would produce a logarithm.
    pub fn integ_r(&self) -> Result<Self, PolyError> {
        if self.coefficient(-1).is_some() {
            return Err(PolyError::IntegrateLogTerm);
        }
        let order = self.order.plus_i(1);
        let terms = self
            .terms()
            .map(|(d, c)| (d + 1, c.div(&T::from_i64(d + 1))))
            .collect();
        Ok(Self::from_terms(terms, order))
    }

    /// Evaluate by the direct power sum Σ cᵢ·x^{dᵢ}. Evaluating a negative
    /// valuation at x = 0 is the pole case: the result is the coefficient
    /// type's +∞ ([`Coefficient::infinity`]; the NaN sentinel for types whose
    /// domain has no infinity).
    pub fn eval(&self, x: &T) -> T {
        if x.is_zero() {
            if let Order::At(v) = self.valuation() {
                if v < 0 {
                    return T::infinity();
                }
            }
        }
        let mut acc = T::zero();
        for (d, c) in self.terms() {
            acc = acc.add(&c.mul(&x.powi(d)));
        }
        acc
    }

    /// Approximate equality under a caller-supplied comparator. Both degree
    /// streams are walked in parallel up to `min(o_A, o_B)`; a degree stored
    /// on one side only is compared against the comparator's zero. Terms at
    /// or above the joint order are unknown and cannot falsify equality.
    pub fn approx_eq_by(&self, rhs: &Self, eq: impl Fn(&T, &T) -> bool) -> bool {
        let limit = self.order.min(rhs.order);
        let zero = T::zero();
        let mut i = 0usize;
        let mut j = 0usize;
        loop {
            let da = self.degs.get(i).copied();
            let db = rhs.degs.get(j).copied();
            let (d, ca, cb) = match (da, db) {
                (None, None) => return true,
                (Some(a), None) => (a, Some(&self.coefs[i]), None),
                (None, Some(b)) => (b, None, Some(&rhs.coefs[j])),
                (Some(a), Some(b)) => {
                    if a < b {
                        (a, Some(&self.coefs[i]), None)
                    } else if b < a {
                        (b, None, Some(&rhs.coefs[j]))
                    } else {
                        (a, Some(&self.coefs[i]), Some(&rhs.coefs[j]))
                    }
                }
            };
            if ca.is_some() {
                i += 1;
            }
            if cb.is_some() {
                j += 1;
            }
            if !limit.allows(d) {
                continue;
            }
            let ok = eq(ca.unwrap_or(&zero), cb.unwrap_or(&zero));
            if !ok {
                return false;
            }
        }
    }
}

impl<T: Coefficient> PartialEq for Poly<T> {
    /// Strict equality: same order, same length, degree-for-degree and
    /// coefficient-for-coefficient equal.
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.degs == other.degs && self.coefs == other.coefs
    }
}

impl<T: Coefficient> fmt::Display for Poly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        for (d, c) in self.terms() {
            if wrote {
                f.write_str(" + ")?;
            }
            match d {
                0 => write!(f, "{c}")?,
                1 => write!(f, "{c}*x")?,
                _ => write!(f, "{c}*x^{d}")?,
            }
            wrote = true;
        }
        if let Order::At(k) = self.order {
            if wrote {
                f.write_str(" + ")?;
            }
            write!(f, "O(x^{k})")?;
            wrote = true;
        }
        if !wrote {
            f.write_str("0")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigfloat::BigFloat;
    use crate::complex::Complex;
    use crate::fraction::BigFraction;

    type Q = BigFraction;
    type P = Poly<BigFraction>;

    fn q(n: i64, d: i64) -> Q {
        Q::from_ratio(n, d)
    }

    fn poly(terms: &[(i64, i64)]) -> P {
        P::from_terms(
            terms.iter().map(|&(d, c)| (d, Q::from_i64(c))).collect(),
            Order::Inf,
        )
    }

    fn assert_canonical(p: &P) {
        for w in p.degs.windows(2) {
            assert!(w[0] < w[1], "degrees not strictly ascending");
        }
        for c in &p.coefs {
            assert!(!Coefficient::is_zero(c), "stored zero coefficient");
        }
        for &d in &p.degs {
            assert!(p.order().allows(d), "term at degree {d} >= order");
        }
    }

    #[test]
    fn normalization_merges_sorts_and_filters() {
        let p = P::from_terms(
            vec![
                (3, Q::from_i64(1)),
                (0, Q::from_i64(2)),
                (3, Q::from_i64(-1)), // cancels the first x^3
                (7, Q::from_i64(4)),  // dropped by the order
                (1, Q::from_i64(0)),  // zero filtered
            ],
            Order::At(5),
        );
        assert_canonical(&p);
        assert_eq!(p.len(), 1);
        assert_eq!(p.coefficient(0), Some(&Q::from_i64(2)));
        assert_eq!(p.degree(), 0);
    }

    #[test]
    fn valuation_and_degree_conventions() {
        assert_eq!(P::zero().valuation(), Order::Inf);
        assert_eq!(P::zero().degree(), -1);
        assert_eq!(P::truncated_zero(4).valuation(), Order::At(4));
        let p = poly(&[(-2, 3), (5, 1)]);
        assert_eq!(p.valuation(), Order::At(-2));
        assert_eq!(p.degree(), 5);
    }

    #[test]
    fn order_propagation_add_mul() {
        let a = poly(&[(1, 1)]).truncate(Order::At(5)); // x + O(x^5), v=1
        let b = poly(&[(2, 1)]).truncate(Order::At(7)); // x^2 + O(x^7), v=2
        assert_eq!(a.add(&b).order(), Order::At(5));
        // mul: min(1+7, 2+5, 5+7) = 7
        assert_eq!(a.mul(&b).order(), Order::At(7));
        // exact × series: min(v_exact + 5, 1 + inf, inf) with v_exact = 0
        let c = poly(&[(0, 2)]);
        assert_eq!(c.mul(&a).order(), Order::At(5));
        // exact zero absorbs everything: 0 · (x + O(x^5)) is exact zero.
        let z = P::zero().mul(&a);
        assert_eq!(z.order(), Order::Inf);
        assert!(z.is_empty());
    }

    #[test]
    fn multiplication_convolves() {
        // (1 + x)(1 − x) = 1 − x²
        let p = poly(&[(0, 1), (1, 1)]).mul(&poly(&[(0, 1), (1, -1)]));
        assert_eq!(p, poly(&[(0, 1), (2, -1)]));
        assert_canonical(&p);
    }

    #[test]
    fn laurent_multiplication() {
        // (x⁻¹ + 1)·x = 1 + x
        let p = poly(&[(-1, 1), (0, 1)]).mul(&poly(&[(1, 1)]));
        assert_eq!(p, poly(&[(0, 1), (1, 1)]));
    }

    #[test]
    fn exact_division_terminates() {
        // (x² − 1)/(x − 1) = x + 1 exactly
        let num = poly(&[(0, -1), (2, 1)]);
        let den = poly(&[(0, -1), (1, 1)]);
        let d = num.div_with_limit_r(&den, 100).unwrap();
        assert!(d.exact);
        assert!(!d.dropped_significant);
        assert_eq!(d.quotient, poly(&[(0, 1), (1, 1)]));
    }

    #[test]
    fn geometric_series_division() {
        // 1/(1−x) does not terminate: order 100, leading coefficients all 1.
        let one = poly(&[(0, 1)]);
        let den = poly(&[(0, 1), (1, -1)]);
        let d = one.div_with_limit_r(&den, DEFAULT_DIV_LIMIT).unwrap();
        assert!(!d.exact);
        assert!(d.dropped_significant);
        assert_eq!(d.quotient.order(), Order::At(100));
        for k in 0..10 {
            assert_eq!(d.quotient.coefficient(k), Some(&Q::from_i64(1)));
        }
        assert_canonical(&d.quotient);
    }

    #[test]
    fn series_division_order_formula() {
        // A = x + O(x^6) (v=1, o=6), B = 1 + x + O(x^4) (v=0, o=4)
        // o' = min(6 − 0, 4 + 1 − 0) = 5
        let a = poly(&[(1, 1)]).truncate(Order::At(6));
        let b = poly(&[(0, 1), (1, 1)]).truncate(Order::At(4));
        let q = a.div_r(&b).unwrap();
        assert_eq!(q.order(), Order::At(5));
        // x/(1+x) = x − x² + x³ − x⁴ + O(x^5)
        assert_eq!(q.coefficient(1), Some(&Q::from_i64(1)));
        assert_eq!(q.coefficient(2), Some(&Q::from_i64(-1)));
        assert_eq!(q.coefficient(3), Some(&Q::from_i64(1)));
        assert_eq!(q.coefficient(4), Some(&Q::from_i64(-1)));
        assert_eq!(q.coefficient(5), None);
    }

    #[test]
    fn laurent_division() {
        // (1 + x)/x = x⁻¹ + 1 exactly
        let num = poly(&[(0, 1), (1, 1)]);
        let den = poly(&[(1, 1)]);
        let d = num.div_with_limit_r(&den, 50).unwrap();
        assert!(d.exact);
        assert_eq!(d.quotient, poly(&[(-1, 1), (0, 1)]));
    }

    #[test]
    fn division_rejects_zero_divisor() {
        assert!(matches!(
            poly(&[(0, 1)]).div_r(&P::zero()),
            Err(PolyError::DivisionByZero)
        ));
    }

    #[test]
    fn zero_dividend_shortcuts() {
        let b = poly(&[(0, 1), (1, -1)]);
        let d = P::zero().div_with_limit_r(&b, 10).unwrap();
        assert!(d.exact);
        assert!(d.quotient.is_empty());
        assert_eq!(d.quotient.order(), Order::Inf);
        // O(x^3) / (1 − x): order min(3−0, ∞) = 3, empty.
        let t = P::truncated_zero(3).div_r(&b).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.order(), Order::At(3));
    }

    #[test]
    fn powers_by_squaring() {
        let p = poly(&[(0, 1), (1, 1)]); // 1 + x
        let p4 = p.powi(4);
        assert_eq!(
            p4,
            poly(&[(0, 1), (1, 4), (2, 6), (3, 4), (4, 1)])
        );
        // Zero exponent keeps the operand's order.
        let s = p.truncate(Order::At(3));
        let u = s.powi(0);
        assert_eq!(u.order(), Order::At(3));
        assert_eq!(u.coefficient(0), Some(&Q::from_i64(1)));
    }

    #[test]
    fn derivative_and_integral() {
        // d/dx (x³ + 2x) = 3x² + 2
        let p = poly(&[(1, 2), (3, 1)]);
        assert_eq!(p.deriv(), poly(&[(0, 2), (2, 3)]));
        // ∫(3x² + 2) = x³ + 2x
        assert_eq!(p.deriv().integ_r().unwrap(), p);
        // Order bookkeeping: deriv of O(x^5) data is O(x^4), integ back O(x^5).
        let s = poly(&[(1, 1)]).truncate(Order::At(5));
        assert_eq!(s.deriv().order(), Order::At(4));
        assert_eq!(s.deriv().integ_r().unwrap().order(), Order::At(5));
        // x⁻¹ cannot be integrated.
        assert!(matches!(
            poly(&[(-1, 1)]).integ_r(),
            Err(PolyError::IntegrateLogTerm)
        ));
        // Fractional coefficients from integration stay exact.
        let i = poly(&[(2, 1)]).integ_r().unwrap();
        assert_eq!(i.coefficient(3), Some(&q(1, 3)));
    }

    #[test]
    fn evaluation() {
        let p = poly(&[(0, 3), (2, 1)]); // 3 + x²
        assert_eq!(p.eval(&Q::from_i64(2)), Q::from_i64(7));
        // Laurent evaluation away from zero.
        let l = poly(&[(-1, 1), (1, 1)]); // x⁻¹ + x
        assert_eq!(l.eval(&Q::from_i64(2)), q(5, 2));
    }

    #[test]
    fn laurent_evaluation_at_the_pole() {
        let _s = crate::testutil::serial();
        // v < 0 at x = 0 is the pole: the coefficient type's +∞. Fractions
        // have no infinity, so the NaN sentinel stands in.
        let lq = poly(&[(-1, 1), (1, 1)]); // x⁻¹ + x
        assert!(lq.eval(&Q::zero()).is_nan());
        // Non-negative valuation at zero is still the plain constant term.
        assert_eq!(poly(&[(0, 3), (2, 1)]).eval(&Q::zero()), Q::from_i64(3));

        // Real coefficients: a genuine +∞.
        let lf = Poly::from_terms(
            vec![(-2, BigFloat::from_i64(3)), (0, BigFloat::from_i64(1))],
            Order::Inf,
        );
        let v = lf.eval(&BigFloat::zero());
        assert!(!v.is_finite() && !v.is_nan());
        assert!(!v.is_sign_negative());

        // Complex coefficients: must not panic, real part infinite.
        let lc = Poly::from_terms(vec![(-1, Complex::from_f64(1.0))], Order::Inf);
        let w = lc.eval(&Complex::zero());
        assert!(!w.re().is_finite() && !w.re().is_nan());

        // An empty truncated Laurent series O(x⁻²) has valuation −2 and the
        // same pole at zero.
        let t = Poly::<Q>::truncated_zero(-2);
        assert!(t.eval(&Q::zero()).is_nan());
    }

    #[test]
    fn dense_views() {
        let p = poly(&[(1, 2), (3, 4)]);
        let (start, window) = p.dense();
        assert_eq!(start, 1);
        assert_eq!(
            window,
            vec![Q::from_i64(2), Q::zero(), Q::from_i64(4)]
        );
        let nn = p.dense_nonneg_r().unwrap();
        assert_eq!(nn.len(), 4);
        assert_eq!(nn[0], Q::zero());
        assert_eq!(nn[3], Q::from_i64(4));
        assert!(matches!(
            poly(&[(-1, 1)]).dense_nonneg_r(),
            Err(PolyError::NegativeDense(-1))
        ));
    }

    #[test]
    fn strict_and_approximate_equality() {
        let a = poly(&[(0, 1), (1, 1)]);
        let b = poly(&[(0, 1), (1, 1)]);
        assert_eq!(a, b);
        assert_ne!(a, a.truncate(Order::At(9)));
        // Approximate equality ignores degrees at or above the joint order.
        let s1 = poly(&[(0, 1), (1, 1)]).truncate(Order::At(2));
        let s2 = poly(&[(0, 1), (1, 1), (2, 7)]).truncate(Order::At(3));
        assert!(s1.approx_eq_by(&s2, |x, y| x == y));
        // And a disagreement below it is fatal.
        let s3 = poly(&[(0, 1), (1, 2)]).truncate(Order::At(2));
        assert!(!s1.approx_eq_by(&s3, |x, y| x == y));
    }

    #[test]
    fn shift_moves_order_with_degrees() {
        let s = poly(&[(1, 1)]).truncate(Order::At(4)).shift(2);
        assert_eq!(s.valuation(), Order::At(3));
        assert_eq!(s.order(), Order::At(6));
    }
}
