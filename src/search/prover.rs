//! The prover (spec §4.8): attempts to upgrade a candidate solution box's
//! certificate from `Maybe` to `Feasible` (some point of the box solves
//! every constraint) or `Inner` (every point does). Failure leaves the
//! certificate at `Maybe` — the prover never downgrades a box or removes
//! it from the search.

use std::sync::Arc;

use crate::contract::newton::NewtonContractor;
use crate::contract::{Contractor, Proof};
use crate::dag::{Dag, DagFun};
use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::variable::Scope;

/// How many epsilon-inflation attempts the prover makes around a
/// candidate point before giving up on an isolated-solution proof.
const INFLATION_ATTEMPTS: u32 = 5;
const INFLATION_FACTOR: f64 = 2.0;
const INFLATION_SEED: f64 = 1e-10;

pub struct Prover {
    dag: Arc<Dag>,
    /// Equality constraints (image is a single point or otherwise used as
    /// `f(x) = 0`-style residuals); when exactly as many as the scope's
    /// size, the prover runs interval Newton/Krawczyk on them.
    equalities: Vec<DagFun>,
    /// Inequality-only constraints (`f(x) <= U`, `f(x) >= L`, or both);
    /// proved by direct containment since there's no square system to run
    /// Newton on.
    inequalities: Vec<DagFun>,
    scope: Scope,
}

impl Prover {
    pub fn new(dag: Arc<Dag>, equalities: Vec<DagFun>, inequalities: Vec<DagFun>, scope: Scope) -> Self {
        Prover { dag, equalities, inequalities, scope }
    }

    /// Attempts to prove `box_`, returning the best certificate reached
    /// (never worse than `Maybe`).
    pub fn prove(&self, box_: &IntervalBox) -> Proof {
        if self.inequalities_all_hold(box_) && self.equalities.is_empty() {
            return if self.inequalities_all_inner(box_) { Proof::Inner } else { Proof::Feasible };
        }

        if !self.equalities.is_empty() && self.equalities.len() == self.scope.len() {
            if let Some(proof) = self.prove_square_system(box_) {
                return proof;
            }
        }

        Proof::Maybe
    }

    fn inequalities_all_hold(&self, box_: &IntervalBox) -> bool {
        self.inequalities.iter().all(|fun| {
            let v = fun.eval(&self.dag, box_);
            !v.intersect(&fun.image()).is_empty()
        })
    }

    fn inequalities_all_inner(&self, box_: &IntervalBox) -> bool {
        self.inequalities.iter().all(|fun| fun.eval(&self.dag, box_).is_subset_of(&fun.image()))
    }

    /// Runs Krawczyk/interval-Newton on the equality system; if the
    /// operator maps `box_` strictly inside itself the system has a unique
    /// solution there (`Feasible`/`Inner` depending on the inequalities).
    /// Otherwise tries a handful of epsilon-inflations around the box's
    /// midpoint, the standard trick for certifying an isolated root that a
    /// single Newton sweep alone can't enclose tightly enough.
    fn prove_square_system(&self, box_: &IntervalBox) -> Option<Proof> {
        let newton = NewtonContractor::new(self.dag.clone(), self.equalities.clone(), self.scope.clone());

        let mut candidate = box_.clone();
        if newton.contract(&mut candidate) == Proof::Feasible && self.inequalities_all_hold(&candidate) {
            return Some(if self.inequalities_all_inner(&candidate) { Proof::Inner } else { Proof::Feasible });
        }

        let mid: Vec<f64> = box_.intervals().iter().map(Interval::midpoint).collect();
        let mut eps = INFLATION_SEED;
        for _ in 0..INFLATION_ATTEMPTS {
            let inflated = IntervalBox::new(
                self.scope.clone(),
                mid.iter().map(|&m| Interval::new(m - eps, m + eps)).collect(),
            );
            let mut trial = inflated;
            if newton.contract(&mut trial) == Proof::Feasible && self.inequalities_all_hold(&trial) {
                return Some(if self.inequalities_all_inner(&trial) { Proof::Inner } else { Proof::Feasible });
            }
            eps *= INFLATION_FACTOR;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{Dag, Op};
    use crate::variable::VarId;

    #[test]
    fn proves_a_linear_square_system_feasible() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let f1 = dag.make_binary("add", Op::Add, x, y);
        let f2 = dag.make_binary("sub", Op::Sub, x, y);
        let fun1 = DagFun::new(&dag, f1, Interval::singleton(3.0));
        let fun2 = DagFun::new(&dag, f2, Interval::singleton(1.0));
        let scope = Scope::new([VarId(0), VarId(1)]);
        let dag = Arc::new(dag);

        let prover = Prover::new(dag, vec![fun1, fun2], vec![], scope.clone());
        let box_ = IntervalBox::new(scope, vec![Interval::new(1.9, 2.1), Interval::new(0.9, 1.1)]);
        assert_eq!(prover.prove(&box_), Proof::Feasible);
    }

    #[test]
    fn proves_inequality_only_box_inner() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let fun = DagFun::new(&dag, x, Interval::new(-10.0, 10.0));
        let scope = Scope::new([VarId(0)]);
        let dag = Arc::new(dag);

        let prover = Prover::new(dag, vec![], vec![fun], scope.clone());
        let box_ = IntervalBox::new(scope, vec![Interval::new(-1.0, 1.0)]);
        assert_eq!(prover.prove(&box_), Proof::Inner);
    }

    #[test]
    fn leaves_unprovable_box_at_maybe() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let sx = dag.make_unary("sqr", Op::Sqr, x);
        let f1 = dag.make_binary("sub", Op::Sub, y, sx);
        let fun1 = DagFun::new(&dag, f1, Interval::ZERO);
        let scope = Scope::new([VarId(0), VarId(1)]);
        let dag = Arc::new(dag);

        // Only one equality over a two-variable scope: not square, so the
        // prover has no certification path and must leave it at `Maybe`.
        let prover = Prover::new(dag, vec![fun1], vec![], scope.clone());
        let box_ = IntervalBox::new(scope, vec![Interval::new(0.9, 1.1), Interval::new(0.9, 1.1)]);
        assert_eq!(prover.prove(&box_), Proof::Maybe);
    }
}
