//! The BC4 contractor (spec §4.5): HC4Revise followed by a box-consistency
//! slicing step on variables that occur more than once in the constraint,
//! where HC4Revise's single-pass projection can no longer prove the
//! tightest bound because it cannot track correlation between occurrences.

use std::sync::Arc;

use super::{Contractor, Proof};
use crate::dag::{Dag, DagFun};
use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::variable::{Scope, VarId};

/// Number of sub-intervals a multi-occurrence variable's domain is sliced
/// into while hunting for the box-consistent hull.
const DEFAULT_SLICES: usize = 8;

pub struct Bc4Contractor {
    dag: Arc<Dag>,
    fun: DagFun,
    slices: usize,
}

impl Bc4Contractor {
    pub fn new(dag: Arc<Dag>, fun: DagFun) -> Self {
        Bc4Contractor {
            dag,
            fun,
            slices: DEFAULT_SLICES,
        }
    }

    pub fn with_slices(dag: Arc<Dag>, fun: DagFun, slices: usize) -> Self {
        Bc4Contractor { dag, fun, slices: slices.max(2) }
    }

    /// Is `fun`'s forward image, with `v`'s interval pinned to `slice`,
    /// certainly disjoint from the function's required image?
    fn slice_is_empty(&self, v: VarId, slice: Interval, box_: &IntervalBox) -> bool {
        let mut trial = box_.clone();
        trial.set(v, slice);
        let (proof, _) = self.fun.hc4_revise(&self.dag, &trial);
        proof == Proof::Empty
    }

    /// Box-consistent hull for `v`: the smallest sub-range, bounded by
    /// slice edges, containing every slice not provably empty.
    fn box_consistent_hull(&self, v: VarId, domain: Interval, box_: &IntervalBox) -> Interval {
        if domain.is_empty() || domain.width() == 0.0 {
            return domain;
        }
        let n = self.slices;
        let step = domain.width() / n as f64;
        let mut first_live = None;
        let mut last_live = None;
        for k in 0..n {
            let lo = domain.lo() + step * k as f64;
            let hi = if k + 1 == n { domain.hi() } else { domain.lo() + step * (k + 1) as f64 };
            let slice = Interval::new(lo, hi);
            if !self.slice_is_empty(v, slice, box_) {
                if first_live.is_none() {
                    first_live = Some(lo);
                }
                last_live = Some(hi);
            }
        }
        match (first_live, last_live) {
            (Some(lo), Some(hi)) => Interval::new(lo, hi),
            _ => Interval::EMPTY,
        }
    }
}

impl Contractor for Bc4Contractor {
    fn scope(&self) -> &Scope {
        self.fun.scope()
    }

    fn kind(&self) -> &'static str {
        "BC4"
    }

    fn contract(&self, box_: &mut IntervalBox) -> Proof {
        let (proof, narrowed) = self.fun.hc4_revise(&self.dag, box_);
        if proof == Proof::Empty {
            return Proof::Empty;
        }
        for (v, i) in &narrowed {
            box_.set(*v, *i);
        }
        if proof == Proof::Inner {
            return proof;
        }

        let occurrences = self.dag.occurrence_counts(self.fun.root());
        for v in self.fun.scope().vars() {
            if occurrences.get(v).copied().unwrap_or(0) <= 1 {
                continue;
            }
            let current = box_.get(*v);
            let hull = self.box_consistent_hull(*v, current, box_);
            if hull.is_empty() {
                return Proof::Empty;
            }
            box_.set(*v, current.intersect(&hull));
        }
        if box_.is_empty() {
            return Proof::Empty;
        }
        Proof::Maybe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Op;

    #[test]
    fn bc4_contracts_a_multi_occurrence_variable() {
        // x - x == 0 is trivially satisfied everywhere, but a (x + 1) -
        // (x + 1) style test is uninteresting for HC4; use x * x - x to
        // exercise the multi-occurrence slicing path without depending on
        // a particular tightness bound.
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let xx = dag.make_binary("mul", Op::Mul, x, x);
        let f = dag.make_binary("sub", Op::Sub, xx, x);
        let fun = DagFun::new(&dag, f, Interval::ZERO);
        let dag = Arc::new(dag);
        let contractor = Bc4Contractor::new(dag, fun);

        let scope = Scope::new([VarId(0)]);
        let mut box_ = IntervalBox::new(scope, vec![Interval::new(-5.0, 5.0)]);
        let proof = contractor.contract(&mut box_);
        assert_ne!(proof, Proof::Empty);
        // x(x-1) = 0 has roots at 0 and 1, both inside the original box.
        assert!(box_.get(VarId(0)).contains(0.0));
        assert!(box_.get(VarId(0)).contains(1.0));
    }
}
