//! The polytope-hull contractor (spec §4.5): relaxes a set of DagFuns to a
//! linear program over the current box and tightens each scope variable by
//! solving `min x_i` / `max x_i` over the relaxation.
//!
//! Only a bound backed by the LP's dual solution is trusted: the raw
//! floating-point simplex optimum is re-verified with outward-rounded
//! interval arithmetic over the dual multipliers (a full
//! Neumaier-Shcherbina check, [`crate::lp::oracle::ns_certified_lower_bound`])
//! before it is allowed to narrow a domain. A bound that fails this check
//! (no dual available, or the certified value doesn't improve on the
//! current bound) is treated as an `LpFailure` and the contractor leaves
//! that variable's bound untouched for this call.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Contractor, Proof};
use crate::dag::{Dag, DagFun};
use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::lp::oracle::{ns_certified_lower_bound, LpOracle, LpVar, LpStatus, Sense, SimplexOracle};
use crate::lp::relax::{linearize, register_box_variables};
use crate::rand::{Corner, SeededRng};
use crate::variable::{Scope, VarId};

/// How the `Taylor` relaxation (spec §4.5) picks the box corner each
/// variable expands around: a single value fixed by the caller, or a fresh
/// coin flip per variable drawn from a seeded generator owned by this
/// contractor, so repeated `contract` calls with the same seed reproduce
/// the same sequence of corner choices.
pub enum CornerChoice {
    /// Any variable absent from the map falls back to [`Corner::Lo`].
    Fixed(HashMap<VarId, Corner>),
    Random(RefCell<SeededRng>),
}

impl CornerChoice {
    pub fn seeded(seed: u64) -> Self {
        CornerChoice::Random(RefCell::new(SeededRng::new(seed)))
    }

    fn resolve(&self, scope: &Scope) -> HashMap<VarId, Corner> {
        match self {
            CornerChoice::Fixed(map) => scope.vars().iter().map(|&v| (v, map.get(&v).copied().unwrap_or(Corner::Lo))).collect(),
            CornerChoice::Random(rng) => {
                let mut rng = rng.borrow_mut();
                scope
                    .vars()
                    .iter()
                    .map(|&v| (v, if rng.next_bool() { Corner::Hi } else { Corner::Lo }))
                    .collect()
            }
        }
    }
}

/// Which linear relaxation builder backs the polytope (spec §4.5): `Taylor`
/// linearizes at a box corner chosen by [`CornerChoice`] (with a McCormick
/// envelope when the whole function is a top-level product); `Rlt`
/// reformulates bilinear and square sub-terms anywhere in the expression
/// with their convex envelopes; `Affine` evaluates the function to a
/// [`crate::affine::AffineForm`] and emits one linear term per noise symbol.
/// See [`crate::lp::relax`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolytopeStyle {
    #[default]
    Taylor,
    Rlt,
    Affine,
}

pub struct PolytopeContractor {
    dag: Arc<Dag>,
    funs: Vec<DagFun>,
    scope: Scope,
    style: PolytopeStyle,
    corners: CornerChoice,
}

impl PolytopeContractor {
    /// Defaults the Taylor corner choice to `CornerChoice::seeded(1)`; use
    /// [`Self::with_corner_choice`] to fix it or change the seed.
    pub fn new(dag: Arc<Dag>, funs: Vec<DagFun>, scope: Scope, style: PolytopeStyle) -> Self {
        PolytopeContractor { dag, funs, scope, style, corners: CornerChoice::seeded(1) }
    }

    pub fn with_corner_choice(mut self, corners: CornerChoice) -> Self {
        self.corners = corners;
        self
    }

    fn build_relaxation(&self, box_: &IntervalBox) -> (SimplexOracle, HashMap<VarId, LpVar>) {
        let mut oracle = SimplexOracle::new();
        let vars = register_box_variables(&mut oracle, box_);
        let corner_map = self.corners.resolve(&self.scope);
        for fun in &self.funs {
            linearize(&self.dag, fun, box_, &mut oracle, &vars, self.style, &corner_map);
        }
        (oracle, vars)
    }

    /// Re-derives a sound bound on `min/max lp_var` from the LP's dual
    /// solution via a Neumaier-Shcherbina check: `sense` was solved as
    /// `minimize sign*objective` internally (`sign = 1` for `Minimize`,
    /// `-1` for `Maximize`), so `oracle.dual_solution()` pairs with
    /// `sign*objective` — negate the resulting lower bound back for
    /// `Maximize`. Returns `None` (treated as `LpFailure`, spec §7) when no
    /// dual is available or the certificate doesn't even match the
    /// reported optimum's finiteness.
    fn certified_bound(&self, oracle: &SimplexOracle, sense: Sense, fallback: f64) -> Option<f64> {
        let y = oracle.dual_solution()?;
        let rows = oracle.constraint_rows();
        let sign = match sense {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        let phase2_cost: Vec<f64> = oracle.objective_coeffs().iter().map(|c| sign * c).collect();
        let lower = ns_certified_lower_bound(&phase2_cost, &rows, oracle.variable_bounds(), &y)?;
        let bound = match sense {
            Sense::Minimize => lower,
            Sense::Maximize => -lower,
        };
        if !bound.is_finite() {
            return None;
        }
        Some(match sense {
            Sense::Minimize => bound.min(fallback),
            Sense::Maximize => bound.max(fallback),
        })
    }
}

impl Contractor for PolytopeContractor {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn kind(&self) -> &'static str {
        "Polytope"
    }

    fn contract(&self, box_: &mut IntervalBox) -> Proof {
        let (mut oracle, vars) = self.build_relaxation(box_);

        for &v in self.scope.vars() {
            let Some(&lp_var) = vars.get(&v) else { continue };
            let current = box_.get(v);
            if current.is_empty() {
                return Proof::Empty;
            }

            oracle.set_objective(&[(lp_var, 1.0)]);
            let new_lo = match oracle.optimize(Sense::Minimize) {
                LpStatus::Optimal => self.certified_bound(&oracle, Sense::Minimize, current.lo()),
                LpStatus::Infeasible => return Proof::Empty,
                _ => None,
            }
            .unwrap_or(current.lo());

            oracle.set_objective(&[(lp_var, 1.0)]);
            let new_hi = match oracle.optimize(Sense::Maximize) {
                LpStatus::Optimal => self.certified_bound(&oracle, Sense::Maximize, current.hi()),
                LpStatus::Infeasible => return Proof::Empty,
                _ => None,
            }
            .unwrap_or(current.hi());

            let narrowed = current.intersect(&Interval::new(new_lo, new_hi));
            if narrowed.is_empty() {
                return Proof::Empty;
            }
            box_.set(v, narrowed);
        }
        Proof::Maybe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Op;
    use crate::interval::Interval;

    #[test]
    fn polytope_contracts_parabolic_band_scenario_five() {
        // y - x^2 >= 0  AND  y + x^2 - 2 <= 0, on x in [-2, 1], y in [-1, 2],
        // Taylor at corner (left-x, right-y) (spec §8 scenario 5): the LP
        // relaxation must tighten x to a subset of [-1.25, 1] and leave y
        // at [-1, 2] unchanged.
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let sx = dag.make_unary("sqr", Op::Sqr, x);

        let f1 = dag.make_binary("sub", Op::Sub, y, sx);
        let fun1 = DagFun::new(&dag, f1, Interval::new(0.0, f64::INFINITY));

        let f2_pre = dag.make_binary("add", Op::Add, y, sx);
        let fun2 = DagFun::new(&dag, f2_pre, Interval::new(f64::NEG_INFINITY, 2.0));

        let dag = Arc::new(dag);
        let scope = Scope::new([VarId(0), VarId(1)]);
        let corners = CornerChoice::Fixed(HashMap::from([(VarId(0), Corner::Lo), (VarId(1), Corner::Hi)]));
        let contractor =
            PolytopeContractor::new(dag, vec![fun1, fun2], scope.clone(), PolytopeStyle::Taylor).with_corner_choice(corners);

        let mut box_ = IntervalBox::new(scope, vec![Interval::new(-2.0, 1.0), Interval::new(-1.0, 2.0)]);
        let proof = contractor.contract(&mut box_);
        assert_ne!(proof, Proof::Empty);
        let xi = box_.get(VarId(0));
        assert!(xi.hi() <= 1.0 + 1e-8);
        assert!(xi.lo() >= -1.25 - 1e-8, "expected x >= -1.25, got {}", xi.lo());
        let yi = box_.get(VarId(1));
        assert!((yi.lo() - (-1.0)).abs() < 1e-8 && (yi.hi() - 2.0).abs() < 1e-8, "y must stay [-1, 2], got {yi:?}");
    }

    #[test]
    fn a_seeded_random_corner_choice_is_reproducible() {
        // Same seed, same sequence of corner picks, same resulting box
        // (spec §5's "Pseudorandomness" determinism requirement).
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let fun = DagFun::new(&dag, x, Interval::new(0.0, 10.0));
        let dag = Arc::new(dag);
        let scope = Scope::new([VarId(0)]);

        let run = || {
            let contractor =
                PolytopeContractor::new(dag.clone(), vec![fun.clone()], scope.clone(), PolytopeStyle::Taylor)
                    .with_corner_choice(CornerChoice::seeded(7));
            let mut box_ = IntervalBox::new(scope.clone(), vec![Interval::new(-3.0, 3.0)]);
            contractor.contract(&mut box_);
            box_.get(VarId(0))
        };
        assert_eq!(run(), run());
    }
}
