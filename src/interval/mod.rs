//! Directed-rounded interval arithmetic (spec §4.1).
//!
//! An [`Interval`] is a closed set `[lo, hi]` with `lo <= hi`, plus the
//! distinguished `Empty` and `Universe = [-inf, inf]` values. Every
//! elementary operation provides a forward form (the tightest representable
//! enclosure of the real image) and, where the operation is invertible, a
//! projection form used by [`crate::contract::hc4`] to narrow an argument
//! given a known image.
//!
//! Rounding-mode discipline is centralised in [`rounding`]; no other module
//! in the crate computes an interval bound directly from `f64` arithmetic.

pub mod rounding;

use std::fmt;

use rounding::{round_down, round_up, widen_out, widen_out_transcendental};

/// A closed real interval, or the distinguished empty interval.
///
/// `Empty` is represented out-of-band (`is_empty`) rather than as some
/// `lo > hi` sentinel, so that every other field access is unconditionally
/// meaningful on a non-empty interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    lo: f64,
    hi: f64,
    empty: bool,
}

impl Interval {
    /// The whole real line.
    pub const UNIVERSE: Interval = Interval {
        lo: f64::NEG_INFINITY,
        hi: f64::INFINITY,
        empty: false,
    };

    /// The empty interval.
    pub const EMPTY: Interval = Interval {
        lo: 0.0,
        hi: 0.0,
        empty: true,
    };

    pub const ZERO: Interval = Interval {
        lo: 0.0,
        hi: 0.0,
        empty: false,
    };

    pub const ONE: Interval = Interval {
        lo: 1.0,
        hi: 1.0,
        empty: false,
    };

    /// Creates `[lo, hi]`. Returns `Empty` if `lo > hi` or either bound is NaN.
    pub fn new(lo: f64, hi: f64) -> Self {
        if lo.is_nan() || hi.is_nan() || lo > hi {
            Interval::EMPTY
        } else {
            Interval {
                lo,
                hi,
                empty: false,
            }
        }
    }

    /// A degenerate interval containing a single point.
    pub fn singleton(x: f64) -> Self {
        Interval::new(x, x)
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn is_universe(&self) -> bool {
        !self.empty && self.lo == f64::NEG_INFINITY && self.hi == f64::INFINITY
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn width(&self) -> f64 {
        if self.empty {
            0.0
        } else {
            self.hi - self.lo
        }
    }

    pub fn midpoint(&self) -> f64 {
        if self.empty {
            f64::NAN
        } else if self.lo.is_infinite() && self.hi.is_infinite() {
            0.0
        } else if self.lo.is_infinite() {
            f64::MIN
        } else if self.hi.is_infinite() {
            f64::MAX
        } else {
            0.5 * self.lo + 0.5 * self.hi
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        !self.empty && self.lo <= x && x <= self.hi
    }

    pub fn is_subset_of(&self, other: &Interval) -> bool {
        self.empty || (!other.empty && other.lo <= self.lo && self.hi <= other.hi)
    }

    pub fn is_disjoint(&self, other: &Interval) -> bool {
        self.empty || other.empty || self.hi < other.lo || other.hi < self.lo
    }

    /// Set intersection, which is always representable exactly (bound
    /// selection only, no rounding needed).
    pub fn intersect(&self, other: &Interval) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        Interval::new(self.lo.max(other.lo), self.hi.min(other.hi))
    }

    /// The hull (smallest enclosing interval) of `self` and `other`.
    pub fn hull(&self, other: &Interval) -> Interval {
        if self.empty {
            return *other;
        }
        if other.empty {
            return *self;
        }
        Interval::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }

    /// A point below which the interval would be considered sufficiently
    /// narrow for the variable tolerance `tol` (absolute).
    pub fn width_below(&self, tol: f64) -> bool {
        !self.empty && self.width() <= tol
    }

    // ---- forward arithmetic ----------------------------------------------

    pub fn neg(&self) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        Interval::new(-self.hi, -self.lo)
    }

    pub fn add(&self, other: &Interval) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        let (lo, hi) = widen_out(self.lo + other.lo, self.hi + other.hi);
        Interval::new(lo, hi)
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        if self.is_zero() || other.is_zero() {
            return Interval::ZERO;
        }
        let candidates = [
            self.lo * other.lo,
            self.lo * other.hi,
            self.hi * other.lo,
            self.hi * other.hi,
        ];
        let lo = candidates.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = candidates
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        let (lo, hi) = widen_out(lo, hi);
        Interval::new(lo, hi)
    }

    fn is_zero(&self) -> bool {
        !self.empty && self.lo == 0.0 && self.hi == 0.0
    }

    /// Division. Returns `Universe` when the divisor straddles zero with
    /// both sides non-degenerate (no information left to exclude); splits
    /// are the caller's responsibility via [`Self::div_parts`] if needed.
    pub fn div(&self, other: &Interval) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        if other.is_zero() {
            return Interval::EMPTY;
        }
        if other.contains(0.0) {
            // straddles zero: [lo,0) and (0,hi] both intersect self/x; no
            // single interval is tight, widen to Universe per spec §4.1.
            return Interval::UNIVERSE;
        }
        let recip_lo = round_down(1.0 / other.hi);
        let recip_hi = round_up(1.0 / other.lo);
        self.mul(&Interval::new(recip_lo, recip_hi))
    }

    pub fn abs(&self) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        if self.lo >= 0.0 {
            *self
        } else if self.hi <= 0.0 {
            self.neg()
        } else {
            Interval::new(0.0, self.lo.abs().max(self.hi.abs()))
        }
    }

    /// `sign(x) in {-1, 0, 1}`, widened to the convex hull over the interval.
    pub fn sign(&self) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        let lo = if self.lo < 0.0 {
            -1.0
        } else if self.lo > 0.0 {
            1.0
        } else {
            0.0
        };
        let hi = if self.hi < 0.0 {
            -1.0
        } else if self.hi > 0.0 {
            1.0
        } else {
            0.0
        };
        Interval::new(lo.min(hi), lo.max(hi))
    }

    pub fn sqr(&self) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        let a = self.abs();
        let (lo, hi) = widen_out(a.lo * a.lo, a.hi * a.hi);
        Interval::new(if self.contains(0.0) { 0.0 } else { lo }, hi)
    }

    pub fn sqrt(&self) -> Interval {
        if self.empty || self.hi < 0.0 {
            return Interval::EMPTY;
        }
        let lo = self.lo.max(0.0);
        let (lo_r, hi_r) = widen_out(lo.sqrt(), self.hi.sqrt());
        Interval::new(lo_r.max(0.0), hi_r)
    }

    /// Integer power `x^n`, `n >= 0`. Negative `n` is `1 / x^(-n)`.
    pub fn powi(&self, n: i32) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        if n == 0 {
            return Interval::ONE;
        }
        if n < 0 {
            return Interval::ONE.div(&self.powi(-n));
        }
        if n % 2 == 0 {
            self.sqr().powi(n / 2)
        } else {
            let half = self.powi(n - 1);
            self.mul(&half)
        }
    }

    pub fn exp(&self) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        let (lo, hi) = widen_out_transcendental(self.lo.exp(), self.hi.exp());
        Interval::new(lo.max(0.0), hi)
    }

    /// Natural log. Empty if `hi <= 0`; clamps the domain to `(0, inf)`
    /// otherwise (spec: straddling zero narrows rather than aborting).
    pub fn log(&self) -> Interval {
        if self.empty || self.hi <= 0.0 {
            return Interval::EMPTY;
        }
        let lo = self.lo.max(f64::MIN_POSITIVE);
        let (lo_r, hi_r) = widen_out_transcendental(lo.ln(), self.hi.ln());
        Interval::new(lo_r, hi_r)
    }

    pub fn sin(&self) -> Interval {
        self.trig_enclosure(f64::sin, std::f64::consts::FRAC_PI_2)
    }

    pub fn cos(&self) -> Interval {
        self.trig_enclosure(f64::cos, 0.0)
    }

    /// Shared bracketing logic for `sin`/`cos`: if the interval spans at
    /// least one full period, or brackets a maximiser/minimiser of the
    /// shifted cosine, widen to `[-1, 1]`; otherwise bound by the endpoint
    /// values.
    fn trig_enclosure(&self, f: fn(f64) -> f64, phase_of_max: f64) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        let two_pi = 2.0 * std::f64::consts::PI;
        if self.width() >= two_pi {
            return Interval::new(-1.0, 1.0);
        }
        let (flo, fhi) = widen_out_transcendental(f(self.lo), f(self.hi));
        let mut lo = flo.min(fhi);
        let mut hi = flo.max(fhi);
        // does [lo,hi] (the domain) contain a point congruent to phase_of_max
        // mod 2*pi (a maximiser), or phase_of_max + pi (a minimiser)?
        let contains_phase = |phase: f64| -> bool {
            let shifted_lo = self.lo - phase;
            let k = (shifted_lo / two_pi).ceil();
            let candidate = phase + k * two_pi;
            candidate <= self.hi
        };
        if contains_phase(phase_of_max) {
            hi = 1.0;
        }
        if contains_phase(phase_of_max + std::f64::consts::PI) {
            lo = -1.0;
        }
        Interval::new(lo.max(-1.0), hi.min(1.0))
    }

    /// `tan`. Empty near an odd multiple of pi/2 inside the interval
    /// (vertical asymptote); widens to Universe there since no finite
    /// enclosure exists.
    pub fn tan(&self) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        let pi = std::f64::consts::PI;
        let half_pi = std::f64::consts::FRAC_PI_2;
        // an asymptote x = half_pi + k*pi lies in (lo, hi)?
        let k_lo = ((self.lo - half_pi) / pi).ceil();
        let asymptote = half_pi + k_lo * pi;
        if asymptote > self.lo && asymptote < self.hi {
            return Interval::UNIVERSE;
        }
        if self.width() >= pi {
            return Interval::UNIVERSE;
        }
        let (lo, hi) = widen_out_transcendental(self.lo.tan(), self.hi.tan());
        Interval::new(lo, hi)
    }

    pub fn min(&self, other: &Interval) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        Interval::new(self.lo.min(other.lo), self.hi.min(other.hi))
    }

    pub fn max(&self, other: &Interval) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        Interval::new(self.lo.max(other.lo), self.hi.max(other.hi))
    }

    // ---- projections (backward / inverse forms) ---------------------------
    //
    // Given the current arguments `x` (and `y` for binary ops) and the image
    // `z` of `op(x[, y])`, each `proj_*` returns the tightest representable
    // subset of `x` consistent with some `y` s.t. `op(x, y) in z`.

    pub fn proj_neg(x: &Interval, z: &Interval) -> Interval {
        x.intersect(&z.neg())
    }

    pub fn proj_add_x(x: &Interval, y: &Interval, z: &Interval) -> Interval {
        x.intersect(&z.sub(y))
    }

    pub fn proj_sub_x(x: &Interval, y: &Interval, z: &Interval) -> Interval {
        x.intersect(&z.add(y))
    }

    pub fn proj_sub_y(x: &Interval, y: &Interval, z: &Interval) -> Interval {
        y.intersect(&x.sub(z))
    }

    pub fn proj_mul_x(x: &Interval, y: &Interval, z: &Interval) -> Interval {
        if y.is_zero() {
            // x*0 = 0 unconditionally: any x is consistent iff 0 in z.
            return if z.contains(0.0) { *x } else { Interval::EMPTY };
        }
        x.intersect(&z.div(y))
    }

    pub fn proj_div_x(x: &Interval, y: &Interval, z: &Interval) -> Interval {
        x.intersect(&z.mul(y))
    }

    pub fn proj_div_y(x: &Interval, y: &Interval, z: &Interval) -> Interval {
        if z.is_zero() {
            if x.contains(0.0) {
                return *y;
            }
            return Interval::EMPTY;
        }
        y.intersect(&x.div(z))
    }

    pub fn proj_abs(x: &Interval, z: &Interval) -> Interval {
        if z.hi < 0.0 {
            return Interval::EMPTY;
        }
        let z_pos = Interval::new(z.lo.max(0.0), z.hi.max(0.0));
        let pos_part = x.intersect(&z_pos);
        let neg_part = x.intersect(&z_pos.neg());
        pos_part.hull(&neg_part)
    }

    pub fn proj_sqr(x: &Interval, z: &Interval) -> Interval {
        if z.hi < 0.0 {
            return Interval::EMPTY;
        }
        let z_clamped = Interval::new(z.lo.max(0.0), z.hi.max(0.0));
        let root = z_clamped.sqrt();
        let pos_part = x.intersect(&root);
        let neg_part = x.intersect(&root.neg());
        pos_part.hull(&neg_part)
    }

    pub fn proj_sqrt(x: &Interval, z: &Interval) -> Interval {
        // z = sqrt(x) => x = z^2, restricted to x >= 0.
        x.intersect(&z.sqr()).intersect(&Interval::new(0.0, f64::INFINITY))
    }

    pub fn proj_exp(x: &Interval, z: &Interval) -> Interval {
        x.intersect(&z.log())
    }

    pub fn proj_log(x: &Interval, z: &Interval) -> Interval {
        x.intersect(&z.exp())
    }

    /// Backward projection through `sin`, correctly excluding all branches
    /// outside the admissible image by intersecting each candidate
    /// `arcsin + 2*k*pi` / `(pi - arcsin) + 2*k*pi` branch with `x` and
    /// taking the hull of the surviving branches.
    pub fn proj_sin(x: &Interval, z: &Interval) -> Interval {
        let z = z.intersect(&Interval::new(-1.0, 1.0));
        if z.is_empty() || x.is_empty() {
            return Interval::EMPTY;
        }
        Self::proj_periodic(x, &z, |v| v.asin(), |a| std::f64::consts::PI - a)
    }

    /// Backward projection through `cos`.
    pub fn proj_cos(x: &Interval, z: &Interval) -> Interval {
        let z = z.intersect(&Interval::new(-1.0, 1.0));
        if z.is_empty() || x.is_empty() {
            return Interval::EMPTY;
        }
        Self::proj_periodic(x, &z, |v| v.acos(), |a| -a)
    }

    /// Shared scaffolding for `sin`/`cos` projections: `principal(v)` maps
    /// an endpoint of `z` to a principal-branch angle; `other_branch(a)`
    /// produces the angle for the reflected branch within one period. Every
    /// period overlapping `x` is scanned and the union of surviving slivers
    /// is returned.
    fn proj_periodic(
        x: &Interval,
        z: &Interval,
        principal: fn(f64) -> f64,
        other_branch: fn(f64) -> f64,
    ) -> Interval {
        let two_pi = 2.0 * std::f64::consts::PI;
        let a0 = principal(z.lo);
        let a1 = principal(z.hi);
        let (lo_angle, hi_angle) = (a0.min(a1), a0.max(a1));
        let branch_lo = other_branch(hi_angle);
        let branch_hi = other_branch(lo_angle);
        let (branch_lo, branch_hi) = (branch_lo.min(branch_hi), branch_lo.max(branch_hi));

        if x.lo.is_infinite() || x.hi.is_infinite() {
            // unbounded domain: cannot enumerate periods, no contraction.
            return *x;
        }

        let k_min = ((x.lo - hi_angle) / two_pi).floor() as i64 - 1;
        let k_max = ((x.hi - lo_angle) / two_pi).ceil() as i64 + 1;

        let mut result = Interval::EMPTY;
        for k in k_min..=k_max {
            let shift = k as f64 * two_pi;
            let principal_slice = Interval::new(lo_angle + shift, hi_angle + shift);
            let branch_slice = Interval::new(branch_lo + shift, branch_hi + shift);
            result = result.hull(&x.intersect(&principal_slice));
            result = result.hull(&x.intersect(&branch_slice));
        }
        result
    }

    /// `x ∩ { u : ∃ v ∈ y, min(u, v) ∈ z }`.
    ///
    /// If `y` never reaches down into `z` (`y.lo > z.hi`), `x` must supply
    /// the minimiser itself, so `u` is constrained to `z` directly. If `y`
    /// never reaches up to `z` (`y.hi < z.lo`) no pairing can land in `z` at
    /// all. Otherwise `y` can always supply a value in `y ∩ z` no greater
    /// than any larger `u`, so `u` is only bounded below by `z.lo` — any
    /// `u >= z.lo` can be paired with `v = max(y.lo, z.lo) <= z.hi`.
    pub fn proj_min(x: &Interval, y: &Interval, z: &Interval) -> Interval {
        if z.is_empty() {
            return Interval::EMPTY;
        }
        if y.lo > z.hi {
            return x.intersect(z);
        }
        if y.hi < z.lo {
            return Interval::EMPTY;
        }
        x.intersect(&Interval::new(z.lo, f64::INFINITY))
    }

    /// `x ∩ { u : ∃ v ∈ y, max(u, v) ∈ z }`; mirrors [`Interval::proj_min`].
    pub fn proj_max(x: &Interval, y: &Interval, z: &Interval) -> Interval {
        if z.is_empty() {
            return Interval::EMPTY;
        }
        if y.hi < z.lo {
            return x.intersect(z);
        }
        if y.lo > z.hi {
            return Interval::EMPTY;
        }
        x.intersect(&Interval::new(f64::NEG_INFINITY, z.hi))
    }

    /// Projection for the sign operator: if `z` excludes 0, `x` must be
    /// strictly positive/negative accordingly.
    pub fn proj_sign(x: &Interval, z: &Interval) -> Interval {
        if z.lo > 0.0 {
            x.intersect(&Interval::new(rounding::round_up(f64::MIN_POSITIVE), f64::INFINITY))
        } else if z.hi < 0.0 {
            x.intersect(&Interval::new(f64::NEG_INFINITY, -rounding::round_up(f64::MIN_POSITIVE)))
        } else if !z.contains(0.0) {
            Interval::EMPTY
        } else {
            *x
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.empty {
            write!(f, "[]")
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::UNIVERSE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_widens_outward() {
        let x = Interval::new(0.1, 0.2);
        let y = Interval::new(0.1, 0.2);
        let z = x.add(&y);
        assert!(z.lo() <= 0.2);
        assert!(z.hi() >= 0.4);
    }

    #[test]
    fn proj_min_keeps_a_real_solution_the_reversed_bound_would_drop() {
        // min(x, y) in z is satisfiable at x = 15 by picking y = 2:
        // min(15, 2) = 2 in [2, 3].
        let x = Interval::new(-10.0, 20.0);
        let y = Interval::new(-10.0, 2.0);
        let z = Interval::new(2.0, 3.0);
        let projected = Interval::proj_min(&x, &y, &z);
        assert!(projected.contains(15.0));
        assert_eq!(projected, Interval::new(2.0, 20.0));
    }

    #[test]
    fn proj_min_empties_when_y_never_reaches_up_to_z() {
        let x = Interval::new(-10.0, 20.0);
        let y = Interval::new(-10.0, 1.0);
        let z = Interval::new(2.0, 3.0);
        assert!(Interval::proj_min(&x, &y, &z).is_empty());
    }

    #[test]
    fn proj_min_confines_x_to_z_when_y_cannot_be_the_minimiser() {
        let x = Interval::new(-10.0, 20.0);
        let y = Interval::new(5.0, 10.0);
        let z = Interval::new(2.0, 3.0);
        assert_eq!(Interval::proj_min(&x, &y, &z), Interval::new(2.0, 3.0));
    }

    #[test]
    fn proj_max_keeps_a_real_solution_the_reversed_bound_would_drop() {
        // max(x, y) in z is satisfiable at x = -10 by picking y = 2.5:
        // max(-10, 2.5) = 2.5 in [2, 3].
        let x = Interval::new(-20.0, 10.0);
        let y = Interval::new(-2.0, 5.0);
        let z = Interval::new(2.0, 3.0);
        let projected = Interval::proj_max(&x, &y, &z);
        assert!(projected.contains(-10.0));
        assert_eq!(projected, Interval::new(-20.0, 3.0));
    }

    #[test]
    fn proj_max_empties_when_y_never_reaches_down_to_z() {
        let x = Interval::new(-20.0, 10.0);
        let y = Interval::new(4.0, 10.0);
        let z = Interval::new(2.0, 3.0);
        assert!(Interval::proj_max(&x, &y, &z).is_empty());
    }

    #[test]
    fn proj_max_confines_x_to_z_when_y_cannot_be_the_maximiser() {
        let x = Interval::new(-20.0, 10.0);
        let y = Interval::new(-10.0, -5.0);
        let z = Interval::new(2.0, 3.0);
        assert_eq!(Interval::proj_max(&x, &y, &z), Interval::new(2.0, 3.0));
    }

    #[test]
    fn div_by_zero_straddling_widens_to_universe() {
        let x = Interval::new(1.0, 2.0);
        let y = Interval::new(-1.0, 1.0);
        assert!(x.div(&y).is_universe());
    }

    #[test]
    fn div_by_exact_zero_is_empty() {
        let x = Interval::new(1.0, 2.0);
        assert!(x.div(&Interval::ZERO).is_empty());
    }

    #[test]
    fn sqr_of_straddling_interval_has_zero_lower_bound() {
        let x = Interval::new(-2.0, 3.0);
        let z = x.sqr();
        assert_eq!(z.lo(), 0.0);
        assert!(z.hi() >= 9.0);
    }

    #[test]
    fn sqrt_of_negative_only_is_empty() {
        assert!(Interval::new(-5.0, -1.0).sqrt().is_empty());
    }

    #[test]
    fn log_straddling_zero_clamps_to_positive_part() {
        let x = Interval::new(-1.0, std::f64::consts::E);
        let z = x.log();
        assert!(!z.is_empty());
    }

    #[test]
    fn sin_full_period_is_minus_one_to_one() {
        let x = Interval::new(0.0, 10.0);
        let z = x.sin();
        assert_eq!(z.lo(), -1.0);
        assert_eq!(z.hi(), 1.0);
    }

    #[test]
    fn proj_sqr_excludes_non_matching_branch() {
        // x in [0, 10], z = [4, 9] => x in [2, 3]
        let x = Interval::new(0.0, 10.0);
        let z = Interval::new(4.0, 9.0);
        let proj = Interval::proj_sqr(&x, &z);
        assert!((proj.lo() - 2.0).abs() < 1e-9);
        assert!((proj.hi() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn proj_sin_excludes_all_non_matching_periods() {
        // x in [1.0, 7.0] (~ less than 2*pi + small), z = [0.9, 1.0]
        // only branches near pi/2 and its 2*pi-shifts survive.
        let x = Interval::new(1.0, 2.0);
        let z = Interval::new(0.9, 1.0);
        let proj = Interval::proj_sin(&x, &z);
        assert!(!proj.is_empty());
        assert!(proj.lo() >= 1.0 - 1e-9);
        assert!(proj.hi() <= 2.0 + 1e-9);
    }

    #[test]
    fn width_below_tolerance() {
        let x = Interval::new(1.0, 1.0001);
        assert!(x.width_below(1e-3));
        assert!(!x.width_below(1e-6));
    }
}
