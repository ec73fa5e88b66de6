//! Symbolic terms (spec §4.3): a thin, simplifying front end over
//! [`crate::dag::Dag`] insertion. A `Term` *is* a [`NodeId`] — the
//! "immutable shared representation" a term is a handle to is simply the
//! DAG node itself, so hash-consing and term construction are the same
//! act.
//!
//! [`TermBuilder`] carries the one configuration knob spec §9 calls for: a
//! toggle that disables bottom-up simplification entirely, for round-trip
//! tests that need the literal, unsimplified expression shape.

use crate::dag::{Dag, LinData, NodeId, Op};
use crate::interval::Interval;
use crate::variable::VarId;

pub type Term = NodeId;

/// Builds terms against a caller-owned [`Dag`], applying (when enabled)
/// the bottom-up simplifications spec §4.3 calls for: absorbing `0`/`1`,
/// collapsing nested unary minus, folding constants, and canonicalising
/// sums of linear pieces into a single [`crate::dag::Op::Lin`] node.
#[derive(Debug, Clone, Copy)]
pub struct TermBuilder {
    simplify: bool,
}

impl TermBuilder {
    pub fn new(simplify: bool) -> Self {
        TermBuilder { simplify }
    }

    pub fn simplifying() -> Self {
        TermBuilder::new(true)
    }

    pub fn literal() -> Self {
        TermBuilder::new(false)
    }

    pub fn constant(&self, dag: &mut Dag, c: Interval) -> Term {
        dag.make_const(c)
    }

    pub fn var(&self, dag: &mut Dag, v: VarId) -> Term {
        dag.make_var(v)
    }

    fn as_lin(&self, dag: &Dag, n: Term) -> Option<LinData> {
        match dag.op(n) {
            Op::Const(c) => Some(LinData::constant(*c)),
            Op::Var(v) => Some(LinData::variable(*v)),
            Op::Lin(l) => Some(l.clone()),
            _ => None,
        }
    }

    pub fn neg(&self, dag: &mut Dag, a: Term) -> Term {
        if self.simplify {
            if let Op::Neg = dag.op(a) {
                return dag.children(a)[0];
            }
            if let Some(lin) = self.as_lin(dag, a) {
                return dag.make_lin(LinData::neg(&lin));
            }
        }
        dag.make_unary("neg", Op::Neg, a)
    }

    pub fn add(&self, dag: &mut Dag, a: Term, b: Term) -> Term {
        if self.simplify {
            if self.is_zero(dag, a) {
                return b;
            }
            if self.is_zero(dag, b) {
                return a;
            }
            if let (Some(la), Some(lb)) = (self.as_lin(dag, a), self.as_lin(dag, b)) {
                return dag.make_lin(LinData::add(&la, &lb));
            }
        }
        dag.make_binary("add", Op::Add, a, b)
    }

    pub fn sub(&self, dag: &mut Dag, a: Term, b: Term) -> Term {
        if self.simplify {
            if self.is_zero(dag, b) {
                return a;
            }
            if let (Some(la), Some(lb)) = (self.as_lin(dag, a), self.as_lin(dag, b)) {
                return dag.make_lin(LinData::sub(&la, &lb));
            }
        }
        dag.make_binary("sub", Op::Sub, a, b)
    }

    pub fn mul(&self, dag: &mut Dag, a: Term, b: Term) -> Term {
        if self.simplify {
            if self.is_one(dag, a) {
                return b;
            }
            if self.is_one(dag, b) {
                return a;
            }
            if self.is_zero(dag, a) || self.is_zero(dag, b) {
                return dag.make_const(Interval::ZERO);
            }
        }
        dag.make_binary("mul", Op::Mul, a, b)
    }

    pub fn div(&self, dag: &mut Dag, a: Term, b: Term) -> Term {
        if self.simplify && self.is_one(dag, b) {
            return a;
        }
        dag.make_binary("div", Op::Div, a, b)
    }

    pub fn abs(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("abs", Op::Abs, a)
    }

    pub fn sign(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("sign", Op::Sign, a)
    }

    pub fn sqr(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("sqr", Op::Sqr, a)
    }

    pub fn sqrt(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("sqrt", Op::Sqrt, a)
    }

    pub fn powi(&self, dag: &mut Dag, a: Term, n: i32) -> Term {
        if self.simplify && n == 1 {
            return a;
        }
        if self.simplify && n == 2 {
            return self.sqr(dag, a);
        }
        dag.make_powi(n, a)
    }

    pub fn exp(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("exp", Op::Exp, a)
    }

    pub fn log(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("log", Op::Log, a)
    }

    pub fn sin(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("sin", Op::Sin, a)
    }

    pub fn cos(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("cos", Op::Cos, a)
    }

    pub fn tan(&self, dag: &mut Dag, a: Term) -> Term {
        dag.make_unary("tan", Op::Tan, a)
    }

    pub fn min(&self, dag: &mut Dag, a: Term, b: Term) -> Term {
        dag.make_binary("min", Op::Min, a, b)
    }

    pub fn max(&self, dag: &mut Dag, a: Term, b: Term) -> Term {
        dag.make_binary("max", Op::Max, a, b)
    }

    fn is_zero(&self, dag: &Dag, n: Term) -> bool {
        matches!(dag.op(n), Op::Const(c) if c.lo() == 0.0 && c.hi() == 0.0)
    }

    fn is_one(&self, dag: &Dag, n: Term) -> bool {
        matches!(dag.op(n), Op::Const(c) if c.lo() == 1.0 && c.hi() == 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplifying_builder_absorbs_additive_zero() {
        let mut dag = Dag::new();
        let b = TermBuilder::simplifying();
        let x = b.var(&mut dag, VarId(0));
        let zero = b.constant(&mut dag, Interval::ZERO);
        let sum = b.add(&mut dag, x, zero);
        assert_eq!(sum, x);
    }

    #[test]
    fn simplifying_builder_folds_linear_sums_into_one_node() {
        let mut dag = Dag::new();
        let b = TermBuilder::simplifying();
        let x = b.var(&mut dag, VarId(0));
        let y = b.var(&mut dag, VarId(1));
        let sum = b.add(&mut dag, x, y);
        assert!(matches!(dag.op(sum), Op::Lin(_)));
        let sum2 = b.add(&mut dag, sum, x);
        if let Op::Lin(lin) = dag.op(sum2) {
            assert_eq!(lin.terms.len(), 2);
        } else {
            panic!("expected Lin node");
        }
    }

    #[test]
    fn literal_builder_never_simplifies() {
        let mut dag = Dag::new();
        let b = TermBuilder::literal();
        let x = b.var(&mut dag, VarId(0));
        let zero = b.constant(&mut dag, Interval::ZERO);
        let sum = b.add(&mut dag, x, zero);
        assert!(matches!(dag.op(sum), Op::Add));
    }

    #[test]
    fn double_negation_collapses() {
        let mut dag = Dag::new();
        let b = TermBuilder::simplifying();
        let x = b.var(&mut dag, VarId(0));
        let nx = b.neg(&mut dag, x);
        let nnx = b.neg(&mut dag, nx);
        assert_eq!(nnx, x);
    }
}
