//! Crate root: public surface and shared conventions
//!
//! `apmath` is an arbitrary-precision numerical kernel: a binary big-float
//! core with IEEE-754-style rounding modes and status flags, exact rationals,
//! complex arithmetic, a type-promoting scalar tower, a sparse Laurent-capable
//! polynomial / truncated-series engine, and a small suite of
//! numerical-analysis algorithms (adaptive Dormand–Prince 5(4) integration,
//! Romberg quadrature, Durand–Kerner roots, least-squares fitting,
//! bracket-based zero finding and minimization).
//!
//! ## Invariants (crate-wide)
//!
//! - **Precision & flags.** The working precision, default rounding mode,
//!   exponent range and invalid-operation policy are process-wide singletons
//!   in [`context`]; callers scope temporary changes with the push/pop pair
//!   (or [`context::PrecisionGuard`]) and never leave the stack imbalanced.
//! - **Storage.** Every [`BigFloat`] owns exactly one handle in the process
//!   [`pool`]; eviction serializes values out of native storage and
//!   rehydrates them bit-exactly on next use. We **forbid unsafe** throughout
//!   the crate.
//! - **Error classes.** Numerical status accumulates in per-value flag words;
//!   domain errors are precise `Result` failures; budget exhaustion
//!   (step/iteration caps, wall-clock, non-convergence, singular systems) is
//!   reported through [`SolveStatus`] with the best-so-far result preserved.
//! - **Scheduling.** Single-threaded cooperative: operations are synchronous,
//!   solver callbacks run inside the owning loop and must not mutate their
//!   own operands in place mid-operation.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Process-wide precision stack, rounding/flags word, shared constants.
pub mod context;
/// Handle pool and LRU garbage collector backing every big-float.
pub mod pool;
/// The arbitrary-precision float façade (dispatch, status, formatting).
pub mod bigfloat;
/// Exact rationals with bit-exact IEEE-754 construction.
pub mod fraction;
/// Complex arithmetic and transcendentals over the big-float.
pub mod complex;
/// The {Rational ⊑ Real ⊑ Complex} promoting scalar tower.
pub mod scalar;
/// Coefficient capability traits instantiated by the numeric types.
pub mod coeff;
/// Sparse univariate polynomials / truncated Laurent series.
pub mod poly;
/// Series powers (J.C.P. Miller) and transcendentals.
pub mod series;
/// Dormand–Prince 5(4) adaptive integration.
pub mod ode;
/// Romberg quadrature with Richardson extrapolation.
pub mod romberg;
/// Durand–Kerner simultaneous root iteration.
pub mod roots;
/// Least-squares polynomial fitting over the normal equations.
pub mod fit;
/// Bracketed zero finding and Brent minimization.
pub mod optimize;

// ============================================================================
// Canonical re-exports (centralization)
// ============================================================================

pub use crate::bigfloat::{BfOp, BigFloat, BigFloatError, Operand};
pub use crate::coeff::{Coefficient, SeriesCoefficient};
pub use crate::complex::{Complex, ComplexError};
pub use crate::context::RoundingMode;
pub use crate::fit::{polyfit, FitError, PolyFit};
pub use crate::fraction::{BigFraction, FractionError};
pub use crate::ode::{ode45, ode45_with_callback, Ode45Options, Ode45Solution, OdeError};
pub use crate::optimize::{fminbnd, fzero, BracketError, BracketOptions, FminResult, FzeroResult};
pub use crate::poly::{Division, Order, Poly, PolyError};
pub use crate::romberg::{romberg, RombergOptions, RombergResult};
pub use crate::roots::{poly_roots, RootsError, RootsOptions, RootsResult};
pub use crate::scalar::{Level, Scalar};

/// Termination sentinel of the budgeted algorithms. Budget exhaustion is not
/// a hard failure: the carrying result keeps the best-so-far state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// Converged / reached the target.
    Done,
    /// Iteration or step cap exhausted.
    MaxSteps,
    /// Wall-clock budget exhausted.
    Timeout,
    /// Step size underflowed (ODE only).
    Underflow,
    /// Tolerances were not met within the level budget.
    NoConvergence,
    /// The linear system was singular (fitting only).
    Singular,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolveStatus::Done => "done",
            SolveStatus::MaxSteps => "max_steps",
            SolveStatus::Timeout => "timeout",
            SolveStatus::Underflow => "underflow",
            SolveStatus::NoConvergence => "no_convergence",
            SolveStatus::Singular => "singular",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Cross-module test serialization: the context and the pool are
    //! process-wide, so tests that touch them (or assert precision-sensitive
    //! values) take this lock to keep the suite deterministic. The first
    //! caller also installs the env-filtered log subscriber, so
    //! `RUST_LOG=debug cargo test` shows the gc/step-control events.

    use std::sync::{Mutex, MutexGuard, Once};

    static LOCK: Mutex<()> = Mutex::new(());
    static INIT: Once = Once::new();

    pub fn serial() -> MutexGuard<'static, ()> {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
        LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}
