//! The HC4Revise contractor (spec §4.5): wraps one [`DagFun`]. Deterministic,
//! idempotent in one application, cost linear in the DAG.

use std::sync::Arc;

use super::{Contractor, Proof};
use crate::dag::{Dag, DagFun};
use crate::domain::IntervalBox;
use crate::variable::Scope;

pub struct Hc4Contractor {
    dag: Arc<Dag>,
    fun: DagFun,
}

impl Hc4Contractor {
    pub fn new(dag: Arc<Dag>, fun: DagFun) -> Self {
        Hc4Contractor { dag, fun }
    }

    pub fn fun(&self) -> &DagFun {
        &self.fun
    }
}

impl Contractor for Hc4Contractor {
    fn scope(&self) -> &Scope {
        self.fun.scope()
    }

    fn kind(&self) -> &'static str {
        "HC4"
    }

    fn contract(&self, box_: &mut IntervalBox) -> Proof {
        let (proof, narrowed) = self.fun.hc4_revise(&self.dag, box_);
        if proof == Proof::Empty {
            return Proof::Empty;
        }
        for (v, i) in narrowed {
            box_.set(v, i);
        }
        proof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Op;
    use crate::interval::Interval;
    use crate::variable::VarId;

    #[test]
    fn hc4_contractor_contracts_quadratic_scenario() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let z = dag.make_var(VarId(2));
        let sum = dag.make_binary("add", Op::Add, x, y);
        let sq = dag.make_unary("sqr", Op::Sqr, sum);
        let two_z = dag.make_binary("mul", Op::Mul, z, dag.make_const(Interval::singleton(2.0)));
        let lhs = dag.make_binary("sub", Op::Sub, sq, two_z);
        let f = dag.make_binary("add", Op::Add, lhs, dag.make_const(Interval::singleton(2.0)));
        let fun = DagFun::new(&dag, f, Interval::ZERO);
        let dag = Arc::new(dag);
        let contractor = Hc4Contractor::new(dag, fun);

        let scope = Scope::new([VarId(0), VarId(1), VarId(2)]);
        let mut box_ = IntervalBox::new(
            scope,
            vec![
                Interval::new(-10.0, 15.0),
                Interval::new(-20.0, 5.0),
                Interval::new(-10.0, 5.5),
            ],
        );
        let proof = contractor.contract(&mut box_);
        assert_eq!(proof, Proof::Maybe);
        assert!(box_.get(VarId(2)).is_subset_of(&Interval::new(1.0, 5.5)));
    }

    #[test]
    fn hc4_contractor_detects_empty_scenario_four() {
        // Same constraint as scenario 3, but on z in [-10, 0]: the
        // constraint has no solution in the box (spec §8 scenario 4).
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let z = dag.make_var(VarId(2));
        let sum = dag.make_binary("add", Op::Add, x, y);
        let sq = dag.make_unary("sqr", Op::Sqr, sum);
        let two_z = dag.make_binary("mul", Op::Mul, z, dag.make_const(Interval::singleton(2.0)));
        let lhs = dag.make_binary("sub", Op::Sub, sq, two_z);
        let f = dag.make_binary("add", Op::Add, lhs, dag.make_const(Interval::singleton(2.0)));
        let fun = DagFun::new(&dag, f, Interval::ZERO);
        let dag = Arc::new(dag);
        let contractor = Hc4Contractor::new(dag, fun);

        let scope = Scope::new([VarId(0), VarId(1), VarId(2)]);
        let mut box_ = IntervalBox::new(
            scope,
            vec![
                Interval::new(-10.0, 15.0),
                Interval::new(-20.0, 5.0),
                Interval::new(-10.0, 0.0),
            ],
        );
        let proof = contractor.contract(&mut box_);
        assert_eq!(proof, Proof::Empty);
    }
}
