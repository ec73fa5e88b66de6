//! The var3B contractor (spec §4.5): picks one variable, slices its
//! domain into `n` pieces, and runs an inner contractor on each slice,
//! scanning outside-in and stopping at the first slice from each end that
//! isn't proved empty ("3B-consistency" — the hull of the outermost
//! surviving slices). Cheaper than [`super::varcid`], which scans every
//! slice.

use super::{Contractor, Proof};
use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::variable::{Scope, VarId};

pub struct Var3bContractor {
    inner: Box<dyn Contractor>,
    var: VarId,
    slices: usize,
    /// Slicing is skipped below this width: further narrowing wouldn't be
    /// worth the inner-contractor calls.
    min_width: f64,
}

impl Var3bContractor {
    pub fn new(inner: Box<dyn Contractor>, var: VarId, slices: usize, min_width: f64) -> Self {
        Var3bContractor {
            inner,
            var,
            slices: slices.max(2),
            min_width,
        }
    }

    fn run_inner_on_slice(&self, slice: Interval, box_: &IntervalBox) -> Proof {
        let mut trial = box_.clone();
        trial.set(self.var, slice);
        self.inner.contract(&mut trial)
    }
}

impl Contractor for Var3bContractor {
    fn scope(&self) -> &Scope {
        self.inner.scope()
    }

    fn kind(&self) -> &'static str {
        "var3B"
    }

    fn contract(&self, box_: &mut IntervalBox) -> Proof {
        let domain = box_.get(self.var);
        if domain.is_empty() {
            return Proof::Empty;
        }
        if domain.width() < self.min_width {
            return self.inner.contract(box_);
        }

        let n = self.slices;
        let step = domain.width() / n as f64;
        let slice_at = |k: usize| {
            let lo = domain.lo() + step * k as f64;
            let hi = if k + 1 == n { domain.hi() } else { domain.lo() + step * (k + 1) as f64 };
            Interval::new(lo, hi)
        };

        let mut lo_bound = None;
        for k in 0..n {
            let slice = slice_at(k);
            if self.run_inner_on_slice(slice, box_) != Proof::Empty {
                lo_bound = Some(slice.lo());
                break;
            }
        }
        let lo_bound = match lo_bound {
            Some(v) => v,
            None => return Proof::Empty,
        };

        let mut hi_bound = domain.hi();
        for k in (0..n).rev() {
            let slice = slice_at(k);
            if self.run_inner_on_slice(slice, box_) != Proof::Empty {
                hi_bound = slice.hi();
                break;
            }
        }

        let hull = domain.intersect(&Interval::new(lo_bound, hi_bound));
        if hull.is_empty() {
            return Proof::Empty;
        }
        box_.set(self.var, hull);
        self.inner.contract(box_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::hc4::Hc4Contractor;
    use crate::dag::{Dag, DagFun};
    use std::sync::Arc;

    #[test]
    fn var3b_reproduces_scenario_six() {
        // x in [1.5, 5.5] contractor on x in [0, 10] partitioned into 10
        // slices must return x in [1, 6] (spec §8 scenario 6).
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let fun = DagFun::new(&dag, x, Interval::new(1.5, 5.5));
        let dag = Arc::new(dag);
        let inner = Box::new(Hc4Contractor::new(dag, fun));
        let contractor = Var3bContractor::new(inner, VarId(0), 10, 0.0);

        let scope = Scope::new([VarId(0)]);
        let mut box_ = IntervalBox::new(scope, vec![Interval::new(0.0, 10.0)]);
        let proof = contractor.contract(&mut box_);
        assert_ne!(proof, Proof::Empty);
        assert!((box_.get(VarId(0)).lo() - 1.0).abs() < 1e-9);
        assert!((box_.get(VarId(0)).hi() - 6.0).abs() < 1e-9);
    }
}
