//! The affine-revise contractor (spec §4.2): evaluates a [`DagFun`] to an
//! [`AffineForm`] over the box (one noise symbol per scope variable) and
//! contracts each variable-tied noise symbol's range, then maps it back
//! into that variable's interval. Falls back to a no-op `Maybe` when the
//! function contains an operator with no finite affine linearisation on
//! the current box (e.g. `abs`/`min`/`max`, or `div`/`log`/`sqrt` whose
//! domain doesn't admit one) — callers are expected to pair this
//! contractor with HC4Revise in the pool rather than rely on it alone.

use std::sync::Arc;

use super::{Contractor, Proof};
use crate::affine::{affine_revise, AffineForm, AffineProof, NoiseGen};
use crate::dag::{Dag, DagFun};
use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::variable::Scope;

pub struct AffineReviseContractor {
    dag: Arc<Dag>,
    fun: DagFun,
}

impl AffineReviseContractor {
    pub fn new(dag: Arc<Dag>, fun: DagFun) -> Self {
        AffineReviseContractor { dag, fun }
    }
}

impl Contractor for AffineReviseContractor {
    fn scope(&self) -> &Scope {
        self.fun.scope()
    }

    fn kind(&self) -> &'static str {
        "Affine"
    }

    fn contract(&self, box_: &mut IntervalBox) -> Proof {
        let scope = self.fun.scope();
        let n = scope.len();
        let mut var_forms = std::collections::HashMap::with_capacity(n);
        for (i, v) in scope.vars().iter().enumerate() {
            match AffineForm::from_variable(i as u32, &box_.get(*v)) {
                Some(af) => {
                    var_forms.insert(*v, af);
                }
                None => return Proof::Maybe, // unbounded variable: no affine form
            }
        }
        let mut gen = NoiseGen::new(n);
        let form = match self.dag.eval_affine(self.fun.root(), &var_forms, &mut gen) {
            Some(f) => f,
            None => return Proof::Maybe,
        };

        let (proof, contracted) = affine_revise(&form, self.fun.image(), &gen);
        match proof {
            AffineProof::Empty => Proof::Empty,
            AffineProof::Inner => Proof::Inner,
            AffineProof::Maybe => {
                for (noise_index, eps) in contracted {
                    let v = scope.vars()[noise_index as usize];
                    let current = box_.get(v);
                    let centre = current.midpoint();
                    let radius = 0.5 * current.width();
                    let new_x = Interval::singleton(centre).add(&eps.mul(&Interval::singleton(radius)));
                    let narrowed = current.intersect(&new_x);
                    if narrowed.is_empty() {
                        return Proof::Empty;
                    }
                    box_.set(v, narrowed);
                }
                Proof::Maybe
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Op;
    use crate::variable::VarId;

    #[test]
    fn affine_revise_contracts_shared_occurrence() {
        // x - x in [-100, 100]: perfectly correlated, should prove Inner
        // immediately regardless of box width (unlike interval subtraction).
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let f = dag.make_binary("sub", Op::Sub, x, x);
        let fun = DagFun::new(&dag, f, Interval::new(-100.0, 100.0));
        let dag = Arc::new(dag);
        let contractor = AffineReviseContractor::new(dag, fun);

        let scope = Scope::new([VarId(0)]);
        let mut box_ = IntervalBox::new(scope, vec![Interval::new(-5.0, 5.0)]);
        let proof = contractor.contract(&mut box_);
        assert_eq!(proof, Proof::Inner);
    }
}
