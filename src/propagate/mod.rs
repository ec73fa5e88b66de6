//! The propagator (spec §4.6): a queue-based AC3-style fixpoint loop over a
//! pool of contractors, reactivating other contractors whenever one of
//! them shrinks a variable's interval by more than a relative threshold.
//!
//! The propagator is sound (it only ever calls contractors, never widens a
//! box itself), idempotent at fixpoint, and order-independent in the limit:
//! which contractor runs first only changes how much work is spent
//! reaching the fixpoint, not the fixpoint reached.

use std::collections::VecDeque;

use crate::contract::{ContractorPool, Proof};
use crate::domain::IntervalBox;
use crate::stats::Stats;
use crate::variable::VarId;

/// The relative width-decrease threshold above which a contraction
/// reactivates every *other* contractor sharing the narrowed variable.
pub const DEFAULT_REACTIVATION_THRESHOLD: f64 = 0.10;

/// How much work (contractor calls) a single [`Propagator::run`] may spend
/// before giving up and returning `Maybe`; prevents pathological pools from
/// looping the queue forever on residual floating-point jitter.
pub const DEFAULT_WORK_BUDGET: usize = 10_000;

pub struct Propagator<'a> {
    pool: &'a ContractorPool,
    reactivation_threshold: f64,
    work_budget: usize,
}

impl<'a> Propagator<'a> {
    pub fn new(pool: &'a ContractorPool) -> Self {
        Propagator {
            pool,
            reactivation_threshold: DEFAULT_REACTIVATION_THRESHOLD,
            work_budget: DEFAULT_WORK_BUDGET,
        }
    }

    pub fn with_reactivation_threshold(mut self, threshold: f64) -> Self {
        self.reactivation_threshold = threshold;
        self
    }

    pub fn with_work_budget(mut self, budget: usize) -> Self {
        self.work_budget = budget;
        self
    }

    /// Drives every contractor in the pool to a joint fixpoint on `box_`,
    /// mutating it in place. Returns `Empty` the instant any contractor
    /// proves it, `Inner` if every contractor's last call on the fixpoint
    /// returned `Inner`, and `Maybe` otherwise (including when the work
    /// budget is exhausted before the queue empties). Every contractor
    /// invocation is tallied into `stats` by [`Contractor::kind`](crate::contract::Contractor::kind).
    pub fn run(&self, box_: &mut IntervalBox, stats: &mut Stats) -> Proof {
        let n = self.pool.len();
        if n == 0 {
            return Proof::Maybe;
        }

        let mut active = vec![true; n];
        let mut queue: VecDeque<usize> = (0..n).collect();
        let mut last_proof = vec![Proof::Maybe; n];
        let mut work = 0usize;

        while let Some(i) = queue.pop_front() {
            if !active[i] {
                continue;
            }
            active[i] = false;

            work += 1;
            if work > self.work_budget {
                return Proof::Maybe;
            }

            let before: Vec<(VarId, f64)> = self
                .pool
                .get(i)
                .scope()
                .vars()
                .iter()
                .map(|&v| (v, box_.get(v).width()))
                .collect();

            let contractor = self.pool.get(i);
            let proof = contractor.contract(box_);
            stats.record_call(contractor.kind());
            last_proof[i] = proof;
            if proof == Proof::Empty {
                return Proof::Empty;
            }

            for (v, before_width) in before {
                let after_width = box_.get(v).width();
                if !Self::significantly_narrowed(before_width, after_width, self.reactivation_threshold) {
                    continue;
                }
                for (j, other) in self.pool.iter().enumerate() {
                    if j == i || active[j] {
                        continue;
                    }
                    if other.scope().contains(v) {
                        active[j] = true;
                        queue.push_back(j);
                    }
                }
            }
        }

        if last_proof.iter().all(|p| *p == Proof::Inner) {
            Proof::Inner
        } else {
            Proof::Maybe
        }
    }

    fn significantly_narrowed(before: f64, after: f64, threshold: f64) -> bool {
        if before <= 0.0 || !before.is_finite() {
            return false;
        }
        if !after.is_finite() {
            return false;
        }
        (before - after) / before > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::hc4::Hc4Contractor;
    use crate::dag::{Dag, DagFun, Op};
    use crate::interval::Interval;
    use crate::variable::{Scope, VarId};
    use std::sync::Arc;

    fn parabola_and_circle() -> (Arc<Dag>, DagFun, DagFun, Scope) {
        // y - x^2 == 0, x^2 + y^2 - 2 == 0 (spec §8 scenario 1).
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let sx = dag.make_unary("sqr", Op::Sqr, x);
        let f1 = dag.make_binary("sub", Op::Sub, y, sx);
        let fun1 = DagFun::new(&dag, f1, Interval::ZERO);

        let sy = dag.make_unary("sqr", Op::Sqr, y);
        let sum = dag.make_binary("add", Op::Add, sx, sy);
        let f2 = dag.make_binary("sub", Op::Sub, sum, dag.make_const(Interval::singleton(2.0)));
        let fun2 = DagFun::new(&dag, f2, Interval::ZERO);

        let scope = Scope::new([VarId(0), VarId(1)]);
        (Arc::new(dag), fun1, fun2, scope)
    }

    #[test]
    fn propagator_reaches_fixpoint_around_both_roots() {
        let (dag, fun1, fun2, scope) = parabola_and_circle();
        let pool = ContractorPool::new(vec![
            Box::new(Hc4Contractor::new(dag.clone(), fun1)),
            Box::new(Hc4Contractor::new(dag, fun2)),
        ]);
        let propagator = Propagator::new(&pool);

        let mut box_ = IntervalBox::new(scope, vec![Interval::new(-7.0, 3.0), Interval::new(-3.0, 6.0)]);
        let mut stats = Stats::new();
        let proof = propagator.run(&mut box_, &mut stats);
        assert_ne!(proof, Proof::Empty);
        assert!(box_.get(VarId(0)).lo() > -7.0 || box_.get(VarId(0)).hi() < 3.0);
        assert_eq!(stats.calls("HC4"), stats.total_calls());
        assert!(stats.total_calls() >= 2);
    }

    #[test]
    fn empty_pool_is_a_no_op_maybe() {
        let pool = ContractorPool::new(vec![]);
        let propagator = Propagator::new(&pool);
        let scope = Scope::new([VarId(0)]);
        let mut box_ = IntervalBox::new(scope, vec![Interval::new(0.0, 1.0)]);
        let mut stats = Stats::new();
        assert_eq!(propagator.run(&mut box_, &mut stats), Proof::Maybe);
        assert_eq!(stats.total_calls(), 0);
    }

    #[test]
    fn idempotent_on_a_box_already_at_fixpoint() {
        let (dag, fun1, fun2, scope) = parabola_and_circle();
        let pool = ContractorPool::new(vec![
            Box::new(Hc4Contractor::new(dag.clone(), fun1)),
            Box::new(Hc4Contractor::new(dag, fun2)),
        ]);
        let propagator = Propagator::new(&pool);

        let mut box_ = IntervalBox::new(scope, vec![Interval::new(-7.0, 3.0), Interval::new(-3.0, 6.0)]);
        let mut stats = Stats::new();
        propagator.run(&mut box_, &mut stats);
        let once = box_.clone();
        propagator.run(&mut box_, &mut stats);
        assert_eq!(box_, once);
    }
}
