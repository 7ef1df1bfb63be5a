//! Handle pool & garbage collector
//!
//! Every [`crate::BigFloat`] owns exactly one **handle**: a slot index plus a
//! generation counter into the process-wide slab below. A slot is either
//! *resident* (it holds a live backend float) or *parked* (the float was
//! serialized into a byte image and its allocation returned to the recycle
//! bin). Parking caps native-memory residency; a parked value rehydrates
//! transparently — and bit-exactly — on next use.
//!
//! ## Invariants
//!
//! - The visitation clock is monotonic modulo 2³²; recency comparisons use the
//!   signed difference `(a − b) as i32`, so ordering survives wrap-around.
//! - `gc()` is non-reentrant: a re-entrant call is a no-op.
//! - After any sequence of operations, native float allocations in existence
//!   are at most (resident slots) + (recycle-bin size); the bin is bounded by
//!   the recycle cap, residency of *managed* slots by the resident cap.
//! - A park/rehydrate cycle restores the exact bit-level value.
//!
//! ## Calling discipline
//!
//! The pool is a process-wide mutable singleton behind a mutex. Closures
//! passed to [`read`]/[`read2`]/[`write`] run under the lock and must operate
//! on the borrowed backend floats only — constructing or dropping a
//! `BigFloat` inside one would re-enter the pool.

#![forbid(unsafe_code)]

use std::sync::Mutex;

use once_cell::sync::Lazy;
use rug::integer::Order as DigitOrder;
use rug::ops::NegAssign;
use rug::{Assign, Float, Integer};
use tracing::debug;

/// Default cap on managed resident values before the collector runs.
pub const DEFAULT_RESIDENT_CAP: usize = 4096;
/// Default cap on detached allocations kept for reuse.
pub const DEFAULT_RECYCLE_CAP: usize = 256;

/// Slot index + generation. Stable for the owning `BigFloat`'s lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Handle {
    pub(crate) idx: u32,
    pub(crate) gen: u32,
}

enum Residency {
    Empty,
    Resident(Float),
    Parked(Vec<u8>),
}

struct Slot {
    res: Residency,
    gen: u32,
    stamp: u32,
    managed: bool,
}

struct Pool {
    slots: Vec<Slot>,
    vacant: Vec<u32>,
    recycled: Vec<Float>,
    clock: u32,
    resident_managed: usize,
    resident_cap: usize,
    recycle_cap: usize,
    in_gc: bool,
    gc_runs: u64,
}

static POOL: Lazy<Mutex<Pool>> = Lazy::new(|| {
    Mutex::new(Pool {
        slots: Vec::new(),
        vacant: Vec::new(),
        recycled: Vec::new(),
        clock: 0,
        resident_managed: 0,
        resident_cap: DEFAULT_RESIDENT_CAP,
        recycle_cap: DEFAULT_RECYCLE_CAP,
        in_gc: false,
        gc_runs: 0,
    })
});

/// Observable pool counters, used by diagnostics and the liveness tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total slab slots ever created.
    pub slots: usize,
    /// Slots currently holding a backend float.
    pub resident: usize,
    /// Slots currently holding a serialized image.
    pub parked: usize,
    /// Detached allocations waiting for reuse.
    pub recycled: usize,
    /// Vacant slab slots.
    pub vacant: usize,
    /// Completed collector runs.
    pub gc_runs: u64,
}

/// `true` iff stamp `a` is more recent than stamp `b` under wrap-around.
fn more_recent(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

impl Pool {
    fn tick(&mut self) -> u32 {
        self.clock = self.clock.wrapping_add(1);
        self.clock
    }

    /// Pull a reusable allocation out of the bin, or make a fresh one.
    fn acquire_float(&mut self) -> Float {
        self.recycled
            .pop()
            .unwrap_or_else(|| Float::new(crate::context::MIN_PRECISION))
    }

    /// Return a detached allocation to the bin; excess is freed.
    fn recycle_float(&mut self, f: Float) {
        if self.recycled.len() < self.recycle_cap {
            self.recycled.push(f);
        }
    }

    fn take_slot_index(&mut self) -> u32 {
        if let Some(idx) = self.vacant.pop() {
            idx
        } else {
            self.slots.push(Slot {
                res: Residency::Empty,
                gen: 0,
                stamp: 0,
                managed: false,
            });
            (self.slots.len() - 1) as u32
        }
    }

    fn park_slot(&mut self, idx: u32) {
        let slot = &mut self.slots[idx as usize];
        if let Residency::Resident(_) = slot.res {
            let taken = std::mem::replace(&mut slot.res, Residency::Empty);
            let f = match taken {
                Residency::Resident(f) => f,
                _ => unreachable!(),
            };
            let image = encode(&f);
            self.slots[idx as usize].res = Residency::Parked(image);
            let managed = self.slots[idx as usize].managed;
            if managed {
                self.resident_managed -= 1;
            }
            self.recycle_float(f);
        }
    }

    fn ensure_resident(&mut self, idx: u32) {
        if let Residency::Parked(_) = self.slots[idx as usize].res {
            let taken = std::mem::replace(&mut self.slots[idx as usize].res, Residency::Empty);
            let image = match taken {
                Residency::Parked(b) => b,
                _ => unreachable!(),
            };
            let mut f = self.acquire_float();
            decode(&image, &mut f);
            let slot = &mut self.slots[idx as usize];
            slot.res = Residency::Resident(f);
            if slot.managed {
                self.resident_managed += 1;
            }
        }
        let stamp = self.tick();
        self.slots[idx as usize].stamp = stamp;
    }

    fn float_ref(&self, idx: u32) -> &Float {
        match &self.slots[idx as usize].res {
            Residency::Resident(f) => f,
            _ => panic!("slot {idx} not resident"),
        }
    }

    /// Evict the least recently visited half of the managed resident set.
    fn gc(&mut self) {
        if self.in_gc {
            return;
        }
        self.in_gc = true;

        let mut cands: Vec<(u32, u32)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.managed && matches!(s.res, Residency::Resident(_)))
            .map(|(i, s)| (i as u32, s.stamp))
            .collect();
        // Most recent first; ordering is wrap-safe.
        cands.sort_by(|a, b| {
            if more_recent(a.1, b.1) {
                std::cmp::Ordering::Less
            } else if more_recent(b.1, a.1) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });

        let keep = self.resident_cap / 2;
        let evicted = cands.len().saturating_sub(keep);
        for &(idx, _) in cands.iter().skip(keep) {
            self.park_slot(idx);
        }
        self.gc_runs += 1;
        self.in_gc = false;
        debug!(evicted, kept = keep.min(cands.len()), "pool gc completed");
    }
}

fn lock() -> std::sync::MutexGuard<'static, Pool> {
    POOL.lock().unwrap_or_else(|e| e.into_inner())
}

/// Install `value` in a fresh slot and return its handle. Managed slots count
/// toward the resident cap and are eligible for eviction; unmanaged slots
/// (shared constants, scoped temporaries) are not.
pub(crate) fn adopt(value: Float, managed: bool) -> Handle {
    let mut pool = lock();
    let idx = pool.take_slot_index();
    let stamp = pool.tick();
    {
        let slot = &mut pool.slots[idx as usize];
        slot.res = Residency::Resident(value);
        slot.stamp = stamp;
        slot.managed = managed;
    }
    let gen = pool.slots[idx as usize].gen;
    if managed {
        pool.resident_managed += 1;
        if pool.resident_managed >= pool.resident_cap {
            pool.gc();
        }
    }
    Handle { idx, gen }
}

/// Release a handle: the slot is vacated and its allocation recycled.
pub(crate) fn release(h: Handle) {
    let mut pool = lock();
    let slot = &mut pool.slots[h.idx as usize];
    if slot.gen != h.gen {
        return;
    }
    let taken = std::mem::replace(&mut slot.res, Residency::Empty);
    slot.gen = slot.gen.wrapping_add(1);
    let managed = slot.managed;
    slot.managed = false;
    if let Residency::Resident(f) = taken {
        if managed {
            pool.resident_managed -= 1;
        }
        pool.recycle_float(f);
    }
    pool.vacant.push(h.idx);
}

/// Visit a value read-only, rehydrating it first if parked.
pub(crate) fn read<R>(h: Handle, f: impl FnOnce(&Float) -> R) -> R {
    let mut pool = lock();
    pool.ensure_resident(h.idx);
    f(pool.float_ref(h.idx))
}

/// Visit two values read-only under one lock acquisition.
pub(crate) fn read2<R>(a: Handle, b: Handle, f: impl FnOnce(&Float, &Float) -> R) -> R {
    let mut pool = lock();
    pool.ensure_resident(a.idx);
    pool.ensure_resident(b.idx);
    if a.idx == b.idx {
        let fa = pool.float_ref(a.idx);
        f(fa, fa)
    } else {
        f(pool.float_ref(a.idx), pool.float_ref(b.idx))
    }
}

/// Visit a value mutably, rehydrating it first if parked.
pub(crate) fn write<R>(h: Handle, f: impl FnOnce(&mut Float) -> R) -> R {
    let mut pool = lock();
    pool.ensure_resident(h.idx);
    match &mut pool.slots[h.idx as usize].res {
        Residency::Resident(v) => f(v),
        _ => unreachable!("ensure_resident failed"),
    }
}

/// Serialize the value out of native storage. No-op on an already parked or
/// vacated slot.
pub(crate) fn park(h: Handle) {
    let mut pool = lock();
    if pool.slots[h.idx as usize].gen == h.gen {
        pool.park_slot(h.idx);
    }
}

/// Whether the handle's value currently lives as a serialized image.
pub(crate) fn is_parked(h: Handle) -> bool {
    let pool = lock();
    let slot = &pool.slots[h.idx as usize];
    slot.gen == h.gen && matches!(slot.res, Residency::Parked(_))
}

/// Force a collector run (diagnostics and tests).
pub fn gc_now() {
    lock().gc();
}

/// Set the managed-residency cap (`gc` trigger threshold).
pub fn set_resident_cap(cap: usize) {
    lock().resident_cap = cap.max(2);
}

/// Set the recycle-bin cap; existing excess is freed immediately.
pub fn set_recycle_cap(cap: usize) {
    let mut pool = lock();
    pool.recycle_cap = cap;
    pool.recycled.truncate(cap);
}

/// Snapshot the pool counters.
pub fn stats() -> PoolStats {
    let pool = lock();
    let mut resident = 0usize;
    let mut parked = 0usize;
    for s in &pool.slots {
        match s.res {
            Residency::Resident(_) => resident += 1,
            Residency::Parked(_) => parked += 1,
            Residency::Empty => {}
        }
    }
    PoolStats {
        slots: pool.slots.len(),
        resident,
        parked,
        recycled: pool.recycled.len(),
        vacant: pool.vacant.len(),
        gc_runs: pool.gc_runs,
    }
}

// ----------------------------------------------------------------------------
// Serialized image
//
// Layout (ABI-private):
//   [0]      kind: 0 normal, 1 +0, 2 −0, 3 +∞, 4 −∞, 5 NaN
//   [1]      mantissa sign (normal only)
//   [2..6]   precision, u32 LE
//   [6..14]  binary exponent of the integer mantissa, i64 LE
//   [14..18] mantissa byte length, u32 LE
//   [18..]   mantissa magnitude bytes, least significant first
// ----------------------------------------------------------------------------

const KIND_NORMAL: u8 = 0;
const KIND_POS_ZERO: u8 = 1;
const KIND_NEG_ZERO: u8 = 2;
const KIND_POS_INF: u8 = 3;
const KIND_NEG_INF: u8 = 4;
const KIND_NAN: u8 = 5;

fn encode(f: &Float) -> Vec<u8> {
    let prec = f.prec();
    let kind = if f.is_nan() {
        KIND_NAN
    } else if f.is_infinite() {
        if f.is_sign_negative() {
            KIND_NEG_INF
        } else {
            KIND_POS_INF
        }
    } else if f.is_zero() {
        if f.is_sign_negative() {
            KIND_NEG_ZERO
        } else {
            KIND_POS_ZERO
        }
    } else {
        KIND_NORMAL
    };

    let mut out = Vec::new();
    out.push(kind);
    if kind != KIND_NORMAL {
        out.push(0);
        out.extend_from_slice(&prec.to_le_bytes());
        out.extend_from_slice(&0i64.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        return out;
    }

    let (mant, exp) = f
        .to_integer_exp()
        .expect("finite value has an integer decomposition");
    let exp = exp as i64;
    let neg = mant.cmp0() == std::cmp::Ordering::Less;
    let digits = mant.to_digits::<u8>(DigitOrder::Lsf);
    out.push(u8::from(neg));
    out.extend_from_slice(&prec.to_le_bytes());
    out.extend_from_slice(&exp.to_le_bytes());
    out.extend_from_slice(&(digits.len() as u32).to_le_bytes());
    out.extend_from_slice(&digits);
    out
}

fn decode(image: &[u8], into: &mut Float) {
    let kind = image[0];
    let neg = image[1] != 0;
    let prec = u32::from_le_bytes(image[2..6].try_into().expect("image header"));
    let exp = i64::from_le_bytes(image[6..14].try_into().expect("image header"));
    let len = u32::from_le_bytes(image[14..18].try_into().expect("image header")) as usize;

    into.set_prec(prec);
    match kind {
        KIND_POS_ZERO => into.assign(rug::float::Special::Zero),
        KIND_NEG_ZERO => into.assign(rug::float::Special::NegZero),
        KIND_POS_INF => into.assign(rug::float::Special::Infinity),
        KIND_NEG_INF => into.assign(rug::float::Special::NegInfinity),
        KIND_NAN => into.assign(rug::float::Special::Nan),
        _ => {
            let mant = Integer::from_digits(&image[18..18 + len], DigitOrder::Lsf);
            // The mantissa carries at most `prec` bits, so this is exact.
            into.assign(&mant);
            *into <<= exp as i32;
            if neg {
                into.neg_assign();
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rug::Float;

    fn f(v: f64, p: u32) -> Float {
        Float::with_val(p, v)
    }

    #[test]
    fn adopt_read_release_roundtrip() {
        let _s = crate::testutil::serial();
        let h = adopt(f(1.5, 64), true);
        assert_eq!(read(h, |x| x.to_f64()), 1.5);
        release(h);
        // Stale-generation release is ignored.
        release(h);
    }

    #[test]
    fn park_restores_exact_bits() {
        let _s = crate::testutil::serial();
        for v in [
            0.1,
            -3.75,
            1e300,
            -1e-300,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NAN,
            0.0,
            -0.0,
        ] {
            let orig = f(v, 96);
            let h = adopt(orig.clone(), true);
            park(h);
            assert!(is_parked(h));
            let same = read(h, |x| {
                x.prec() == orig.prec()
                    && x.is_sign_negative() == orig.is_sign_negative()
                    && (x.is_nan() && orig.is_nan() || *x == orig)
            });
            assert!(same, "value {v} failed the park round-trip");
            assert!(!is_parked(h));
            release(h);
        }
    }

    #[test]
    fn park_restores_full_precision_value() {
        let _s = crate::testutil::serial();
        // A value that genuinely uses all 200 mantissa bits.
        let mut v = Float::with_val(200, 1u32);
        v /= 3u32;
        let h = adopt(v.clone(), true);
        park(h);
        let eq = read(h, |x| *x == v && x.prec() == 200);
        assert!(eq);
        release(h);
    }

    #[test]
    fn gc_evicts_least_recent_half() {
        let _s = crate::testutil::serial();
        set_resident_cap(16);
        let handles: Vec<Handle> = (0..16).map(|i| adopt(f(i as f64, 64), true)).collect();
        // Adoption number 16 crossed the cap and ran the collector: only the
        // most recent half may remain resident.
        let resident = handles.iter().filter(|&&h| !is_parked(h)).count();
        assert!(resident <= 8, "resident={resident}");
        // Values survive eviction.
        for (i, &h) in handles.iter().enumerate() {
            assert_eq!(read(h, |x| x.to_f64()), i as f64);
        }
        for h in handles {
            release(h);
        }
        set_resident_cap(DEFAULT_RESIDENT_CAP);
    }

    #[test]
    fn recycle_bin_is_bounded() {
        let _s = crate::testutil::serial();
        set_recycle_cap(4);
        let handles: Vec<Handle> = (0..32).map(|i| adopt(f(i as f64, 64), true)).collect();
        for h in handles {
            release(h);
        }
        assert!(stats().recycled <= 4);
        set_recycle_cap(DEFAULT_RECYCLE_CAP);
    }

    #[test]
    fn recency_comparison_survives_wraparound() {
        // Stamps straddling the 2³² wrap still order correctly.
        assert!(more_recent(5, u32::MAX - 5));
        assert!(!more_recent(u32::MAX - 5, 5));
        assert!(more_recent(7, 3));
    }
}
