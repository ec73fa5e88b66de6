//! First-order affine forms (spec §4.2): `a0 + sum(ai * ei) + E`, with each
//! noise symbol `ei in [-1, 1]` and `E` a non-negative radius absorbing
//! rounding and nonlinear slack. Affine forms track correlation between
//! sub-expressions sharing a noise symbol, which is what lets the
//! affine-revise contractor beat plain interval HC4Revise on expressions
//! where a variable occurs more than once.
//!
//! Noise symbol `i` for `i < n_vars` in the owning [`crate::dag::DagFun`]'s
//! scope is tied one-to-one to that scope's `i`-th variable: `x_i = mid(x_i)
//! + rad(x_i) * e_i`. Symbols `i >= n_vars` are "internal" symbols minted by
//! [`NoiseGen`] during nonlinear linearisation or multiplication; they have
//! no variable to project back onto and are only ever folded into `error`
//! by [`AffineForm::eval_to_interval`].

use crate::interval::Interval;

/// Allocator for noise symbols during one affine evaluation pass over a
/// [`crate::dag::DagFun`]. Symbols `0..n_vars` are reserved for the
/// function's scope variables.
#[derive(Debug, Clone)]
pub struct NoiseGen {
    next: u32,
    n_vars: u32,
}

impl NoiseGen {
    pub fn new(n_vars: usize) -> Self {
        NoiseGen {
            next: n_vars as u32,
            n_vars: n_vars as u32,
        }
    }

    pub fn fresh(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn is_variable_symbol(&self, noise_index: u32) -> bool {
        noise_index < self.n_vars
    }
}

/// One affine term `coefficient * e_noise_index`.
pub type Term = (u32, f64);

#[derive(Debug, Clone, PartialEq)]
pub struct AffineForm {
    centre: f64,
    /// Sorted by noise index, at most one entry per index.
    terms: Vec<Term>,
    /// Non-negative radius of the absorbed error interval `[-error, error]`.
    error: f64,
}

impl AffineForm {
    pub fn constant(value: f64) -> Self {
        AffineForm {
            centre: value,
            terms: Vec::new(),
            error: 0.0,
        }
    }

    /// The affine form of a scope variable at position `noise_index` on
    /// box interval `x`. Returns `None` if `x` is unbounded (no affine
    /// linearisation of an infinite range is meaningful).
    pub fn from_variable(noise_index: u32, x: &Interval) -> Option<Self> {
        if x.is_empty() || x.lo().is_infinite() || x.hi().is_infinite() {
            return None;
        }
        let centre = x.midpoint();
        let radius = 0.5 * x.width();
        let terms = if radius > 0.0 {
            vec![(noise_index, radius)]
        } else {
            Vec::new()
        };
        Some(AffineForm {
            centre,
            terms,
            error: 0.0,
        })
    }

    pub fn centre(&self) -> f64 {
        self.centre
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn coefficient(&self, noise_index: u32) -> f64 {
        self.terms
            .iter()
            .find(|(i, _)| *i == noise_index)
            .map(|(_, c)| *c)
            .unwrap_or(0.0)
    }

    /// Sum of the absolute values of the noise coefficients.
    pub fn radius(&self) -> f64 {
        self.terms.iter().map(|(_, c)| c.abs()).sum()
    }

    /// The interval `a0 + [-r, r] + E` enclosing the affine form's range.
    pub fn eval_to_interval(&self) -> Interval {
        let r = self.radius() + self.error;
        Interval::new(self.centre - r, self.centre + r)
    }

    fn merge_terms(a: &[Term], b: &[Term], fa: f64, fb: f64) -> Vec<Term> {
        let mut out = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() || j < b.len() {
            if j >= b.len() || (i < a.len() && a[i].0 < b[j].0) {
                out.push((a[i].0, fa * a[i].1));
                i += 1;
            } else if i >= a.len() || b[j].0 < a[i].0 {
                out.push((b[j].0, fb * b[j].1));
                j += 1;
            } else {
                let c = fa * a[i].1 + fb * b[j].1;
                if c != 0.0 {
                    out.push((a[i].0, c));
                }
                i += 1;
                j += 1;
            }
        }
        out
    }

    pub fn add(&self, other: &AffineForm) -> AffineForm {
        AffineForm {
            centre: self.centre + other.centre,
            terms: Self::merge_terms(&self.terms, &other.terms, 1.0, 1.0),
            error: self.error + other.error,
        }
    }

    pub fn sub(&self, other: &AffineForm) -> AffineForm {
        AffineForm {
            centre: self.centre - other.centre,
            terms: Self::merge_terms(&self.terms, &other.terms, 1.0, -1.0),
            error: self.error + other.error,
        }
    }

    pub fn neg(&self) -> AffineForm {
        AffineForm {
            centre: -self.centre,
            terms: self.terms.iter().map(|(i, c)| (*i, -c)).collect(),
            error: self.error,
        }
    }

    /// Multiplication by a scalar interval `k`: `k` is itself lifted to an
    /// affine form (centre `mid(k)`, one fresh noise term of radius
    /// `rad(k)`) and the general affine product is used, so uncertainty in
    /// `k` is tracked rather than silently dropped.
    pub fn mul_scalar_interval(&self, k: &Interval, gen: &mut NoiseGen) -> AffineForm {
        if k.width() == 0.0 {
            return self.scale(k.lo());
        }
        let k_affine = AffineForm {
            centre: k.midpoint(),
            terms: vec![(gen.fresh(), 0.5 * k.width())],
            error: 0.0,
        };
        self.mul(&k_affine, gen)
    }

    fn scale(&self, k: f64) -> AffineForm {
        AffineForm {
            centre: self.centre * k,
            terms: self.terms.iter().map(|(i, c)| (*i, c * k)).collect(),
            error: self.error * k.abs(),
        }
    }

    /// General affine product. Introduces one fresh noise term bounding the
    /// quadratic cross terms `(sum ai*ei)(sum bi*ei)` by `radius(a) *
    /// radius(b)`, and folds the remaining error cross terms into `E`.
    pub fn mul(&self, other: &AffineForm, gen: &mut NoiseGen) -> AffineForm {
        let a0 = self.centre;
        let b0 = other.centre;
        let mut terms = Self::merge_terms(&self.terms, &other.terms, b0, a0);

        let ra = self.radius();
        let rb = other.radius();
        let cross = ra * rb;
        if cross > 0.0 {
            terms.push((gen.fresh(), cross));
            terms.sort_by_key(|(i, _)| *i);
        }

        let ea = self.error;
        let eb = other.error;
        let extra_error = a0.abs() * eb + b0.abs() * ea + ea * eb;

        AffineForm {
            centre: a0 * b0,
            terms,
            error: extra_error,
        }
    }

    pub fn sqr(&self, gen: &mut NoiseGen) -> AffineForm {
        self.mul(self, gen)
    }

    /// Generic, sound linearisation `f(x) ~= alpha*(x - centre) + beta +/-
    /// radius`, where `alpha` is a chord slope (any real number keeps the
    /// result sound; it only affects tightness) and `[beta - radius, beta +
    /// radius]` is a *rigorous* interval enclosure of `f(x) - alpha*x` over
    /// the domain, obtained via the crate's directed-rounded interval
    /// operations. This lets every unary transcendental reuse one routine
    /// instead of a bespoke min-range derivation per function.
    fn linearize(
        &self,
        domain: Interval,
        alpha: f64,
        rigorous_image: impl Fn(Interval) -> Interval,
    ) -> AffineForm {
        let alpha_x = domain.mul(&Interval::singleton(alpha));
        let residual = rigorous_image(domain).sub(&alpha_x);
        let beta = residual.midpoint();
        let radius = 0.5 * residual.width();

        let mut terms: Vec<Term> = self.terms.iter().map(|(i, c)| (*i, alpha * c)).collect();
        terms.retain(|(_, c)| *c != 0.0);

        AffineForm {
            centre: alpha * self.centre + beta,
            terms,
            error: alpha.abs() * self.error + radius,
        }
    }

    fn chord_slope(domain: Interval, f: impl Fn(Interval) -> Interval) -> f64 {
        if domain.width() == 0.0 {
            return 0.0;
        }
        let flo = f(Interval::singleton(domain.lo())).midpoint();
        let fhi = f(Interval::singleton(domain.hi())).midpoint();
        (fhi - flo) / domain.width()
    }

    /// `1/x`. Returns `None` when the domain straddles zero: no finite
    /// affine linearisation of the reciprocal exists there, so callers
    /// should fall back to plain interval division.
    pub fn reciprocal(&self) -> Option<AffineForm> {
        let d = self.eval_to_interval();
        if d.contains(0.0) {
            return None;
        }
        let f = |x: Interval| Interval::ONE.div(&x);
        let alpha = Self::chord_slope(d, f);
        Some(self.linearize(d, alpha, f))
    }

    pub fn sqrt(&self) -> Option<AffineForm> {
        let d = self.eval_to_interval();
        if d.hi() < 0.0 {
            return None;
        }
        let d = Interval::new(d.lo().max(0.0), d.hi());
        let f = |x: Interval| x.sqrt();
        let alpha = Self::chord_slope(d, f);
        Some(self.linearize(d, alpha, f))
    }

    pub fn exp(&self) -> AffineForm {
        let d = self.eval_to_interval();
        let f = |x: Interval| x.exp();
        let alpha = Self::chord_slope(d, f);
        self.linearize(d, alpha, f)
    }

    pub fn log(&self) -> Option<AffineForm> {
        let d = self.eval_to_interval();
        if d.hi() <= 0.0 {
            return None;
        }
        let d = Interval::new(d.lo().max(f64::MIN_POSITIVE), d.hi());
        let f = |x: Interval| x.log();
        let alpha = Self::chord_slope(d, f);
        Some(self.linearize(d, alpha, f))
    }

    pub fn sin(&self) -> AffineForm {
        let d = self.eval_to_interval();
        let f = |x: Interval| x.sin();
        let alpha = Self::chord_slope(d, f);
        self.linearize(d, alpha, f)
    }

    pub fn cos(&self) -> AffineForm {
        let d = self.eval_to_interval();
        let f = |x: Interval| x.cos();
        let alpha = Self::chord_slope(d, f);
        self.linearize(d, alpha, f)
    }
}

/// Proof certificate produced by the affine-revise contraction step (§4.2).
/// Kept local to avoid a circular dependency on `crate::contract`; callers
/// convert to `crate::contract::Proof` via `Into`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffineProof {
    Empty,
    Inner,
    Maybe,
}

/// The back-substitution step of the affine-revise contractor: given the
/// function's total affine form `f` over the box and image `[lo, hi]`,
/// contracts each *variable-tied* noise symbol's `[-1, 1]` range and
/// returns `(proof, contracted_epsilons)` where `contracted_epsilons[k]` is
/// the tightened range for scope variable `k`'s noise symbol (only present
/// if contracted).
pub fn affine_revise(
    f: &AffineForm,
    image: Interval,
    gen: &NoiseGen,
) -> (AffineProof, Vec<(u32, Interval)>) {
    let r = f.radius() + f.error;
    let total = Interval::new(f.centre - r, f.centre + r);

    if total.is_subset_of(&image) {
        return (AffineProof::Inner, Vec::new());
    }
    if total.is_disjoint(&image) {
        return (AffineProof::Empty, Vec::new());
    }

    let j = image.sub(&Interval::singleton(f.centre)).add(&Interval::new(-f.error, f.error));

    let mut contracted = Vec::new();
    for &(i, ai) in f.terms() {
        if ai == 0.0 || !gen.is_variable_symbol(i) {
            continue;
        }
        let si = r - ai.abs();
        let candidate = j
            .add(&Interval::new(-si, si))
            .div(&Interval::singleton(ai))
            .intersect(&Interval::new(-1.0, 1.0));
        if candidate.is_empty() {
            return (AffineProof::Empty, Vec::new());
        }
        contracted.push((i, candidate));
    }

    (AffineProof::Maybe, contracted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_affine_form_evaluates_to_its_interval() {
        let x = Interval::new(1.0, 3.0);
        let a = AffineForm::from_variable(0, &x).unwrap();
        let back = a.eval_to_interval();
        assert!((back.lo() - 1.0).abs() < 1e-9);
        assert!((back.hi() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn sum_of_shared_noise_cancels_exactly() {
        // x - x should have zero radius (perfect correlation), unlike
        // interval subtraction x - x which would be [-width, width].
        let x = Interval::new(1.0, 3.0);
        let a = AffineForm::from_variable(0, &x).unwrap();
        let z = a.sub(&a);
        assert_eq!(z.radius(), 0.0);
        assert_eq!(z.centre(), 0.0);
    }

    #[test]
    fn mul_introduces_single_fresh_noise_symbol() {
        let mut gen = NoiseGen::new(1);
        let x = Interval::new(1.0, 3.0);
        let a = AffineForm::from_variable(0, &x).unwrap();
        let z = a.mul(&a, &mut gen);
        // one existing term (scaled) + one fresh cross term
        assert!(z.terms().len() <= 2);
        assert!(z.eval_to_interval().is_subset_of(&x.sqr()));
    }

    #[test]
    fn affine_revise_proves_inner_when_fully_contained() {
        let x = Interval::new(-0.1, 0.1);
        let a = AffineForm::from_variable(0, &x).unwrap();
        let gen = NoiseGen::new(1);
        let (proof, _) = affine_revise(&a, Interval::new(-1.0, 1.0), &gen);
        assert_eq!(proof, AffineProof::Inner);
    }

    #[test]
    fn affine_revise_proves_empty_when_disjoint() {
        let x = Interval::new(5.0, 6.0);
        let a = AffineForm::from_variable(0, &x).unwrap();
        let gen = NoiseGen::new(1);
        let (proof, _) = affine_revise(&a, Interval::new(-1.0, 1.0), &gen);
        assert_eq!(proof, AffineProof::Empty);
    }

    #[test]
    fn affine_revise_contracts_noise_symbol() {
        let x = Interval::new(-2.0, 2.0);
        let a = AffineForm::from_variable(0, &x).unwrap();
        let gen = NoiseGen::new(1);
        let (proof, eps) = affine_revise(&a, Interval::new(-1.0, 1.0), &gen);
        assert_eq!(proof, AffineProof::Maybe);
        assert_eq!(eps.len(), 1);
        assert!(eps[0].1.is_subset_of(&Interval::new(-1.0, 1.0)));
    }
}
