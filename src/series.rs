//! Truncated-series powers and transcendentals
//!
//! Fractional powers use J.C.P. Miller's recurrence on the normalized form
//! `P = c·x^v·(1 + Δ)`; the transcendentals are closed-form derivations over
//! the series operations that already carry the `O(·)` bookkeeping
//! (`add`/`mul`/`div`/`deriv`/`integ`), so order correctness follows from the
//! propagation rules in [`crate::poly`]:
//!
//! - `exp(P) = exp(c₀)·Σ V^k/k!` with `V = P − c₀` (valuation ≥ 1 makes the
//!   sum terminate inside the truncation window),
//! - `log(P) = ∫ P′/P + log(P(0))`, rejecting `P(0) = 0`,
//! - `sin`/`cos` jointly by the alternating `−V²` recurrence (a halved-work
//!   fast path shared by both),
//! - `tan = sin/cos`, `atan(P) = ∫ P′/(1+P²) + atan(c₀)`,
//! - `asin(P) = ∫ P′·(1−P²)^{−1/2} + asin(c₀)`, `acos = π/2 − asin`.
//!
//! Every entry point rejects Laurent operands (negative valuation) and exact
//! polynomials with a positive-degree part (the result would be an infinite
//! series, which only a truncated operand can absorb).

#![forbid(unsafe_code)]

use crate::coeff::SeriesCoefficient;
use crate::poly::{Order, Poly, PolyError};

enum SeriesForm<T> {
    /// Exact constant polynomial: operate at the coefficient level.
    Constant(T),
    /// Truncated series split as `c₀ + V` with `v(V) ≥ 1` and finite order.
    Split { c0: T, tail: Poly<T>, bound: i64 },
}

impl<T: SeriesCoefficient> Poly<T> {
    fn series_form(&self) -> Result<SeriesForm<T>, PolyError> {
        if let Order::At(v) = self.valuation() {
            if v < 0 {
                return Err(PolyError::NegativeValuation(v));
            }
        }
        match self.order() {
            Order::Inf => {
                if self.degree() > 0 {
                    return Err(PolyError::NotTruncated);
                }
                let c0 = self
                    .coefficient(0)
                    .cloned()
                    .unwrap_or_else(T::zero);
                Ok(SeriesForm::Constant(c0))
            }
            Order::At(bound) => {
                let c0 = self
                    .coefficient(0)
                    .cloned()
                    .unwrap_or_else(T::zero);
                let tail = self.sub(&Poly::constant(c0.clone()));
                Ok(SeriesForm::Split { c0, tail, bound })
            }
        }
    }

    fn scale_recip(&self, k: i64) -> Self {
        self.scale(&T::one().div(&T::from_i64(k)))
    }

    /// exp of the series.
    pub fn exp_r(&self) -> Result<Self, PolyError> {
        match self.series_form()? {
            SeriesForm::Constant(c0) => Ok(Poly::constant(c0.exp())),
            SeriesForm::Split { c0, tail, bound } => {
                let mut sum = Poly::one();
                let mut term = Poly::one();
                for k in 1..=bound.max(1) {
                    term = term.mul(&tail).scale_recip(k);
                    sum = sum.add(&term);
                    if term.is_empty() {
                        break;
                    }
                }
                Ok(sum.scale(&c0.exp()))
            }
        }
    }

    /// Natural logarithm of the series; `P(0) = 0` is a domain error.
    pub fn log_r(&self) -> Result<Self, PolyError> {
        match self.series_form()? {
            SeriesForm::Constant(c0) => {
                if c0.is_zero() {
                    return Err(PolyError::ZeroConstantTerm);
                }
                Ok(Poly::constant(c0.log()))
            }
            SeriesForm::Split { c0, .. } => {
                if c0.is_zero() {
                    return Err(PolyError::ZeroConstantTerm);
                }
                let ratio = self.deriv().div_r(self)?;
                let integrated = ratio.integ_r()?;
                Ok(integrated.add(&Poly::constant(c0.log())))
            }
        }
    }

    /// sin and cos of the series, computed jointly (the two expansions share
    /// every `−V²` power, halving the series work).
    pub fn sin_cos_r(&self) -> Result<(Self, Self), PolyError> {
        match self.series_form()? {
            SeriesForm::Constant(c0) => Ok((
                Poly::constant(c0.sin()),
                Poly::constant(c0.cos()),
            )),
            SeriesForm::Split { c0, tail, bound } => {
                let w = tail.mul(&tail).neg();
                let mut sin_v = tail.clone();
                let mut cos_v = Poly::one();
                let mut term_s = tail.clone();
                let mut term_c = Poly::one();
                let mut k = 1i64;
                loop {
                    term_c = term_c.mul(&w).scale_recip((2 * k - 1) * (2 * k));
                    cos_v = cos_v.add(&term_c);
                    term_s = term_s.mul(&w).scale_recip((2 * k) * (2 * k + 1));
                    sin_v = sin_v.add(&term_s);
                    if (term_c.is_empty() && term_s.is_empty()) || k > bound {
                        break;
                    }
                    k += 1;
                }
                let (sc, cc) = (c0.sin(), c0.cos());
                let sin_p = cos_v.scale(&sc).add(&sin_v.scale(&cc));
                let cos_p = cos_v.scale(&cc).sub(&sin_v.scale(&sc));
                Ok((sin_p, cos_p))
            }
        }
    }

    /// sin of the series.
    pub fn sin_r(&self) -> Result<Self, PolyError> {
        Ok(self.sin_cos_r()?.0)
    }

    /// cos of the series.
    pub fn cos_r(&self) -> Result<Self, PolyError> {
        Ok(self.sin_cos_r()?.1)
    }

    /// tan = sin/cos.
    pub fn tan_r(&self) -> Result<Self, PolyError> {
        let (s, c) = self.sin_cos_r()?;
        s.div_r(&c)
    }

    /// atan(P) = ∫ P′/(1+P²) + atan(c₀).
    pub fn atan_r(&self) -> Result<Self, PolyError> {
        match self.series_form()? {
            SeriesForm::Constant(c0) => Ok(Poly::constant(c0.atan())),
            SeriesForm::Split { c0, .. } => {
                let denom = Poly::one().add(&self.mul(self));
                let ratio = self.deriv().div_r(&denom)?;
                Ok(ratio.integ_r()?.add(&Poly::constant(c0.atan())))
            }
        }
    }

    /// asin(P) = ∫ P′·(1−P²)^{−1/2} + asin(c₀).
    pub fn asin_r(&self) -> Result<Self, PolyError> {
        match self.series_form()? {
            SeriesForm::Constant(c0) => Ok(Poly::constant(c0.asin())),
            SeriesForm::Split { c0, .. } => {
                let body = Poly::one().sub(&self.mul(self));
                let root = body.pow_series_r(-1, 2)?;
                let integrand = self.deriv().mul(&root);
                Ok(integrand.integ_r()?.add(&Poly::constant(c0.asin())))
            }
        }
    }

    /// acos(P) = π/2 − asin(P).
    pub fn acos_r(&self) -> Result<Self, PolyError> {
        match self.series_form()? {
            SeriesForm::Constant(c0) => Ok(Poly::constant(c0.acos())),
            SeriesForm::Split { .. } => {
                let half_pi = T::pi().div(&T::from_i64(2));
                Ok(Poly::constant(half_pi).sub(&self.asin_r()?))
            }
        }
    }

    /// P^(n/d) by J.C.P. Miller's recurrence. The operand must be a truncated
    /// series; `v·n` must be divisible by `d` (the result would otherwise
    /// have fractional valuation). A zero base needs a positive exponent and
    /// yields `O(x^o)`.
    pub fn pow_series_r(&self, n: i64, d: i64) -> Result<Self, PolyError> {
        if d == 0 {
            return Err(PolyError::BadExponent);
        }
        let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
        let bound = match self.order() {
            Order::At(k) => k,
            Order::Inf => return Err(PolyError::NotTruncated),
        };
        if self.is_empty() {
            if n > 0 {
                return Ok(Poly::truncated_zero(bound));
            }
            return Err(PolyError::ZeroBase);
        }
        let v = match self.valuation() {
            Order::At(v) => v,
            Order::Inf => unreachable!("non-empty polynomial has a finite valuation"),
        };
        if (v * n) % d != 0 {
            return Err(PolyError::FractionalValuation { val: v, num: n, den: d });
        }
        let c = self
            .coefficient(v)
            .cloned()
            .expect("valuation term is stored");

        // P = c·x^v·(1 + Δ): relative coefficients a_j = coef(v+j)/c.
        let rel_prec = (bound - v).max(0) as usize;
        let mut a = vec![T::zero(); rel_prec];
        for (deg, coef) in self.terms() {
            let j = deg - v;
            if j > 0 && (j as usize) < rel_prec {
                a[j as usize] = coef.div(&c);
            }
        }

        // Miller: b_0 = 1, b_k = (1/k)·Σ_{j=1..k} ((α+1)·j − k)·a_j·b_{k−j}.
        let mut b = vec![T::zero(); rel_prec.max(1)];
        b[0] = T::one();
        for k in 1..rel_prec {
            let mut acc = T::zero();
            for j in 1..=k {
                let factor =
                    T::from_i64((n + d) * j as i64 - k as i64 * d).div(&T::from_i64(d));
                acc = acc.add(&factor.mul(&a[j]).mul(&b[k - j]));
            }
            b[k] = acc.div(&T::from_i64(k as i64));
        }

        let c_alpha = c.pow_frac(n, d);
        let new_v = v * n / d;
        let terms = b
            .into_iter()
            .enumerate()
            .map(|(k, bk)| (new_v + k as i64, c_alpha.mul(&bk)))
            .collect();
        Ok(Poly::from_terms(terms, Order::At(bound - v + new_v)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigfloat::BigFloat;
    use crate::scalar::Scalar;

    type S = Scalar;
    type P = Poly<Scalar>;

    fn x_series(order: i64) -> P {
        P::x().truncate(Order::At(order))
    }

    fn one_plus_x(order: i64) -> P {
        P::one().add(&P::x()).truncate(Order::At(order))
    }

    fn q(n: i64, d: i64) -> S {
        S::from_ratio(n, d)
    }

    fn rat_eq(a: &S, b: &S) -> bool {
        a == b
    }

    #[test]
    fn exp_of_x_gives_factorials() {
        let e = x_series(6).exp_r().unwrap();
        assert_eq!(e.order(), Order::At(6));
        assert_eq!(e.coefficient(0), Some(&q(1, 1)));
        assert_eq!(e.coefficient(1), Some(&q(1, 1)));
        assert_eq!(e.coefficient(2), Some(&q(1, 2)));
        assert_eq!(e.coefficient(3), Some(&q(1, 6)));
        assert_eq!(e.coefficient(4), Some(&q(1, 24)));
        assert_eq!(e.coefficient(5), Some(&q(1, 120)));
        assert_eq!(e.coefficient(6), None);
    }

    #[test]
    fn exp_scales_by_constant_term() {
        let _s = crate::testutil::serial();
        // exp(1 + x + O(x^3)) = e · (1 + x + x²/2) + O(x^3)
        let p = Poly::<BigFloat>::one()
            .add(&Poly::x())
            .truncate(Order::At(3));
        let e = p.exp_r().unwrap();
        let euler = BigFloat::from_i64(1).exp();
        let half_e = euler.div(&BigFloat::from_i64(2));
        let c2 = e.coefficient(2).unwrap();
        assert!(c2.sub(&half_e).is_almost_zero());
        let c0 = e.coefficient(0).unwrap();
        assert!(c0.sub(&euler).is_almost_zero());
    }

    #[test]
    fn log_of_one_plus_x_is_alternating_harmonic() {
        let l = one_plus_x(6).log_r().unwrap();
        assert_eq!(l.coefficient(0), None); // log 1 = 0 stays exact
        assert_eq!(l.coefficient(1), Some(&q(1, 1)));
        assert_eq!(l.coefficient(2), Some(&q(-1, 2)));
        assert_eq!(l.coefficient(3), Some(&q(1, 3)));
        assert_eq!(l.coefficient(4), Some(&q(-1, 4)));
        assert_eq!(l.coefficient(5), Some(&q(1, 5)));
    }

    #[test]
    fn exp_log_round_trips() {
        let p = one_plus_x(8);
        let back = p.log_r().unwrap().exp_r().unwrap();
        assert!(back.approx_eq_by(&p, rat_eq));
        let x = x_series(8);
        let back2 = x.exp_r().unwrap().log_r().unwrap();
        assert!(back2.approx_eq_by(&x, rat_eq));
    }

    #[test]
    fn pythagorean_identity() {
        let (s, c) = x_series(9).sin_cos_r().unwrap();
        // sin x = x − x³/6 + x⁵/120 − x⁷/5040 …
        assert_eq!(s.coefficient(1), Some(&q(1, 1)));
        assert_eq!(s.coefficient(3), Some(&q(-1, 6)));
        assert_eq!(s.coefficient(5), Some(&q(1, 120)));
        assert_eq!(c.coefficient(0), Some(&q(1, 1)));
        assert_eq!(c.coefficient(2), Some(&q(-1, 2)));
        assert_eq!(c.coefficient(4), Some(&q(1, 24)));
        let unit = s.mul(&s).add(&c.mul(&c));
        assert!(unit.approx_eq_by(&P::one().truncate(Order::At(9)), rat_eq));
    }

    #[test]
    fn derivative_identities() {
        let x = x_series(8);
        let (s, c) = x.sin_cos_r().unwrap();
        // d/dx sin = cos (modulo the tighter derivative order).
        assert!(s.deriv().approx_eq_by(&c, rat_eq));
        // d/dx log(1+x) = 1/(1+x)
        let lhs = one_plus_x(8).log_r().unwrap().deriv();
        let rhs = P::one().div_r(&one_plus_x(8)).unwrap();
        assert!(lhs.approx_eq_by(&rhs, rat_eq));
    }

    #[test]
    fn tan_series() {
        let t = x_series(8).tan_r().unwrap();
        // tan x = x + x³/3 + 2x⁵/15 + 17x⁷/315 …
        assert_eq!(t.coefficient(1), Some(&q(1, 1)));
        assert_eq!(t.coefficient(3), Some(&q(1, 3)));
        assert_eq!(t.coefficient(5), Some(&q(2, 15)));
        assert_eq!(t.coefficient(7), Some(&q(17, 315)));
    }

    #[test]
    fn atan_and_asin_series() {
        let a = x_series(6).atan_r().unwrap();
        assert_eq!(a.coefficient(1), Some(&q(1, 1)));
        assert_eq!(a.coefficient(3), Some(&q(-1, 3)));
        assert_eq!(a.coefficient(5), Some(&q(1, 5)));
        let s = x_series(6).asin_r().unwrap();
        assert_eq!(s.coefficient(1), Some(&q(1, 1)));
        assert_eq!(s.coefficient(3), Some(&q(1, 6)));
        assert_eq!(s.coefficient(5), Some(&q(3, 40)));
    }

    #[test]
    fn acos_complements_asin() {
        let _s = crate::testutil::serial();
        let p = x_series(6);
        let sum = p.acos_r().unwrap().add(&p.asin_r().unwrap());
        // Everything cancels except π/2 (a Real-level scalar).
        assert_eq!(sum.len(), 1);
        let c0 = sum.coefficient(0).unwrap();
        let half_pi = <S as crate::coeff::SeriesCoefficient>::pi().div(&S::from_i64(2));
        let diff = c0.sub(&half_pi);
        match diff {
            Scalar::Real(x) => assert!(x.is_almost_zero()),
            other => panic!("expected a real residue, got {other}"),
        }
    }

    #[test]
    fn miller_square_root_of_one_plus_x() {
        let r = one_plus_x(5).pow_series_r(1, 2).unwrap();
        assert_eq!(r.coefficient(0), Some(&q(1, 1)));
        assert_eq!(r.coefficient(1), Some(&q(1, 2)));
        assert_eq!(r.coefficient(2), Some(&q(-1, 8)));
        assert_eq!(r.coefficient(3), Some(&q(1, 16)));
        assert_eq!(r.coefficient(4), Some(&q(-5, 128)));
        // √ · √ recovers the operand.
        assert!(r.mul(&r).approx_eq_by(&one_plus_x(5), rat_eq));
    }

    #[test]
    fn miller_power_law_addition() {
        let p = one_plus_x(6);
        let lhs = p
            .pow_series_r(1, 2)
            .unwrap()
            .mul(&p.pow_series_r(1, 3).unwrap());
        let rhs = p.pow_series_r(5, 6).unwrap();
        assert!(lhs.approx_eq_by(&rhs, rat_eq));
    }

    #[test]
    fn miller_handles_shifted_valuation() {
        // (x² + x³ + O(x^6))^(1/2) = x·(1 + x)^(1/2) + …, valuation 1.
        let p = P::monomial(2, S::one())
            .add(&P::monomial(3, S::one()))
            .truncate(Order::At(6));
        let r = p.pow_series_r(1, 2).unwrap();
        assert_eq!(r.valuation(), Order::At(1));
        assert_eq!(r.coefficient(1), Some(&q(1, 1)));
        assert_eq!(r.coefficient(2), Some(&q(1, 2)));
        // Order: o − v + v·n/d = 6 − 2 + 1 = 5.
        assert_eq!(r.order(), Order::At(5));
    }

    #[test]
    fn miller_negative_power_inverts() {
        let p = one_plus_x(6);
        let inv = p.pow_series_r(-1, 1).unwrap();
        let direct = P::one().div_r(&p).unwrap();
        assert!(inv.approx_eq_by(&direct, rat_eq));
    }

    #[test]
    fn series_rejections() {
        // Exact polynomial with positive-degree part: not a series.
        let exact = P::one().add(&P::x());
        assert!(matches!(exact.exp_r(), Err(PolyError::NotTruncated)));
        assert!(matches!(
            exact.pow_series_r(1, 2),
            Err(PolyError::NotTruncated)
        ));
        // Laurent operand: negative valuation.
        let laurent = P::monomial(-1, S::one()).truncate(Order::At(3));
        assert!(matches!(
            laurent.sin_r(),
            Err(PolyError::NegativeValuation(-1))
        ));
        // Fractional valuation.
        assert!(matches!(
            x_series(4).pow_series_r(1, 2),
            Err(PolyError::FractionalValuation { .. })
        ));
        // log needs a non-zero constant term.
        assert!(matches!(
            x_series(4).log_r(),
            Err(PolyError::ZeroConstantTerm)
        ));
        // Zero base: positive exponent yields O(x^o), otherwise rejected.
        let zero_series = P::truncated_zero(5);
        let ok = zero_series.pow_series_r(3, 2).unwrap();
        assert!(ok.is_empty());
        assert_eq!(ok.order(), Order::At(5));
        assert!(matches!(
            zero_series.pow_series_r(-1, 2),
            Err(PolyError::ZeroBase)
        ));
        assert!(matches!(
            x_series(4).pow_series_r(1, 0),
            Err(PolyError::BadExponent)
        ));
    }

    #[test]
    fn constant_operands_stay_exact_polynomials() {
        let c = P::constant(S::from_i64(1));
        let e = c.exp_r().unwrap();
        assert_eq!(e.order(), Order::Inf);
        assert_eq!(e.len(), 1);
        // exp(1) promotes to Real inside the scalar tower.
        match e.coefficient(0).unwrap() {
            Scalar::Real(_) => {}
            other => panic!("expected Real, got {other}"),
        }
        // exp(0) = exact rational 1.
        let z = P::constant(S::zero()).exp_r().unwrap();
        assert_eq!(z.coefficient(0), Some(&S::one()));
    }
}
