//! The interval Newton/Krawczyk contractor (spec §4.5): applies only to
//! square systems (as many constraints as variables in the pool's shared
//! scope). Uses the interval Jacobian and a preconditioner built from the
//! inverse of the midpoint Jacobian to run one interval Newton
//! (Gauss-Seidel / Hansen-Sengupta) sweep.
//!
//! The preconditioner solve is a small dense system (the scope is usually
//! a handful of variables), so this uses a local Gaussian-elimination
//! solve rather than `crate::linalg`'s sparse KKT-oriented solver, which
//! targets much larger systems.

use std::sync::Arc;

use super::{Contractor, Proof};
use crate::dag::{Dag, DagFun};
use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::variable::Scope;

pub struct NewtonContractor {
    dag: Arc<Dag>,
    funs: Vec<DagFun>,
    scope: Scope,
}

impl NewtonContractor {
    /// `funs` must be square: `funs.len() == scope.len()`.
    pub fn new(dag: Arc<Dag>, funs: Vec<DagFun>, scope: Scope) -> Self {
        assert_eq!(funs.len(), scope.len(), "Newton contractor requires a square system");
        NewtonContractor { dag, funs, scope }
    }

    fn midpoint_jacobian(&self, box_: &IntervalBox) -> Vec<Vec<f64>> {
        let n = self.scope.len();
        let mid_box = IntervalBox::new(
            self.scope.clone(),
            box_.intervals().iter().map(|i| Interval::singleton(i.midpoint())).collect(),
        );
        let mut jac = vec![vec![0.0; n]; n];
        for (row, fun) in self.funs.iter().enumerate() {
            let grad = fun.diff(&self.dag, &mid_box);
            for (col, v) in self.scope.vars().iter().enumerate() {
                jac[row][col] = match fun.scope().index_of(*v) {
                    Some(local) => grad[local].midpoint(),
                    None => 0.0,
                };
            }
        }
        jac
    }

    fn interval_jacobian(&self, box_: &IntervalBox) -> Vec<Vec<Interval>> {
        let n = self.scope.len();
        let mut jac = vec![vec![Interval::ZERO; n]; n];
        for (row, fun) in self.funs.iter().enumerate() {
            let grad = fun.diff(&self.dag, box_);
            for (col, v) in self.scope.vars().iter().enumerate() {
                if let Some(local) = fun.scope().index_of(*v) {
                    jac[row][col] = grad[local];
                }
            }
        }
        jac
    }

    /// Dense Gauss-Jordan inverse via partial pivoting; returns `None` on a
    /// (near-)singular midpoint Jacobian.
    fn invert(mat: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
        let n = mat.len();
        let mut a: Vec<Vec<f64>> = mat.iter().cloned().collect();
        let mut inv: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();

        for col in 0..n {
            let pivot_row = (col..n).max_by(|&r1, &r2| a[r1][col].abs().partial_cmp(&a[r2][col].abs()).unwrap())?;
            if a[pivot_row][col].abs() < 1e-14 {
                return None;
            }
            a.swap(col, pivot_row);
            inv.swap(col, pivot_row);
            let pivot = a[col][col];
            for j in 0..n {
                a[col][j] /= pivot;
                inv[col][j] /= pivot;
            }
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row][col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[row][j] -= factor * a[col][j];
                    inv[row][j] -= factor * inv[col][j];
                }
            }
        }
        Some(inv)
    }
}

impl Contractor for NewtonContractor {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn kind(&self) -> &'static str {
        "Newton"
    }

    fn contract(&self, box_: &mut IntervalBox) -> Proof {
        let n = self.scope.len();
        let mid_jac = self.midpoint_jacobian(box_);
        let precond = match Self::invert(&mid_jac) {
            Some(inv) => inv,
            None => return Proof::Maybe, // singular midpoint Jacobian: no-op this call
        };

        let mid_box = IntervalBox::new(
            self.scope.clone(),
            box_.intervals().iter().map(|i| Interval::singleton(i.midpoint())).collect(),
        );
        // The Newton map is built on the constraint *violation* `F(x) = lhs(x) -
        // image`, not the raw lhs: `F(mid)` must vanish on the solution set, and
        // for a non-degenerate image this is the interval difference against the
        // whole `[L, U]` band (spec §4.8).
        let residual: Vec<Interval> =
            self.funs.iter().map(|f| f.eval(&self.dag, &mid_box).sub(&f.image())).collect();
        let int_jac = self.interval_jacobian(box_);

        // Y = C * F(mid), N = C * J(box)
        let y: Vec<Interval> = (0..n)
            .map(|i| {
                (0..n).fold(Interval::ZERO, |acc, k| {
                    acc.add(&Interval::singleton(precond[i][k]).mul(&residual[k]))
                })
            })
            .collect();
        let big_n: Vec<Vec<Interval>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        (0..n).fold(Interval::ZERO, |acc, k| {
                            acc.add(&Interval::singleton(precond[i][k]).mul(&int_jac[k][j]))
                        })
                    })
                    .collect()
            })
            .collect();

        let old: Vec<Interval> = box_.intervals().to_vec();
        let mut new_box = old.clone();
        let mid: Vec<f64> = old.iter().map(Interval::midpoint).collect();

        for i in 0..n {
            let mut sum = y[i];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let xj_minus_mid = new_box[j].sub(&Interval::singleton(mid[j]));
                sum = sum.add(&big_n[i][j].mul(&xj_minus_mid));
            }
            let candidate = Interval::singleton(mid[i]).sub(&sum);
            let contracted = old[i].intersect(&candidate);
            if contracted.is_empty() {
                return Proof::Empty;
            }
            new_box[i] = contracted;
        }

        let strictly_inside = (0..n).all(|i| new_box[i].is_subset_of(&old[i]) && new_box[i] != old[i]);
        for (i, v) in self.scope.vars().iter().enumerate() {
            box_.set(*v, new_box[i]);
        }
        if strictly_inside {
            Proof::Feasible
        } else {
            Proof::Maybe
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Op;
    use crate::variable::VarId;

    #[test]
    fn newton_contracts_a_linear_square_system() {
        // x + y = 3, x - y = 1  =>  x = 2, y = 1.
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let f1 = dag.make_binary("add", Op::Add, x, y);
        let f2 = dag.make_binary("sub", Op::Sub, x, y);
        let fun1 = DagFun::new(&dag, f1, Interval::singleton(3.0));
        let fun2 = DagFun::new(&dag, f2, Interval::singleton(1.0));
        let scope = Scope::new([VarId(0), VarId(1)]);
        let dag = Arc::new(dag);
        let contractor = NewtonContractor::new(dag, vec![fun1, fun2], scope.clone());

        let mut box_ = IntervalBox::new(scope, vec![Interval::new(0.0, 5.0), Interval::new(-2.0, 4.0)]);
        let proof = contractor.contract(&mut box_);
        assert_ne!(proof, Proof::Empty);
        assert!(box_.get(VarId(0)).contains(2.0));
        assert!(box_.get(VarId(1)).contains(1.0));
    }
}
