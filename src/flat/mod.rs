//! Flattened bytecode form of one [`crate::dag::DagFun`] (spec §4.4): a
//! dense array of instructions indexed by position, replacing the
//! arena-wide hash-map lookups [`crate::dag::Dag`] needs to support
//! sharing across many functions. Each instruction's operands are resolved
//! once at flatten time to one of a constant, a variable, or a prior slot
//! in the same array — the "`const op x`, `x op const`, `x op y`"
//! specialisation spec §4.4 calls for — so the hot per-node loop never
//! indirects through the shared DAG again.

use crate::dag::{Dag, DagFun, LinData, NodeId, Op, Proof};
use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::variable::{Scope, VarId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Const(Interval),
    Var(VarId),
    Slot(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlatOp {
    Lin(LinData),
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Abs,
    Sign,
    Sqr,
    Sqrt,
    Powi(i32),
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatInstr {
    op: FlatOp,
    lhs: Operand,
    rhs: Option<Operand>,
}

/// A flattened [`DagFun`]: one instruction per ancestor node, in
/// evaluation order, plus the scope and image carried over from the
/// source function.
#[derive(Debug, Clone)]
pub struct FlatFunction {
    instrs: Vec<FlatInstr>,
    scope: Scope,
    image: Interval,
}

impl FlatFunction {
    pub fn from_dagfun(dag: &Dag, fun: &DagFun) -> Self {
        let order = dag.ancestors_postorder(fun.root());
        let mut slot_of = std::collections::HashMap::with_capacity(order.len());
        let mut instrs = Vec::with_capacity(order.len());

        let operand_of = |n: NodeId, slot_of: &std::collections::HashMap<NodeId, u32>| -> Operand {
            match dag.op(n) {
                Op::Const(c) => Operand::Const(*c),
                Op::Var(v) => Operand::Var(*v),
                _ => Operand::Slot(slot_of[&n]),
            }
        };

        for n in &order {
            match dag.op(*n) {
                Op::Const(_) | Op::Var(_) => {
                    // leaves contribute no instruction; their operand form
                    // is resolved inline wherever they're referenced.
                }
                Op::Lin(lin) => {
                    instrs.push(FlatInstr {
                        op: FlatOp::Lin(lin.clone()),
                        lhs: Operand::Const(Interval::ZERO),
                        rhs: None,
                    });
                    slot_of.insert(*n, (instrs.len() - 1) as u32);
                }
                op => {
                    let children = dag.children(*n);
                    let lhs = operand_of(children[0], &slot_of);
                    let rhs = children.get(1).map(|c| operand_of(*c, &slot_of));
                    let flat_op = match op {
                        Op::Neg => FlatOp::Neg,
                        Op::Add => FlatOp::Add,
                        Op::Sub => FlatOp::Sub,
                        Op::Mul => FlatOp::Mul,
                        Op::Div => FlatOp::Div,
                        Op::Abs => FlatOp::Abs,
                        Op::Sign => FlatOp::Sign,
                        Op::Sqr => FlatOp::Sqr,
                        Op::Sqrt => FlatOp::Sqrt,
                        Op::Powi(k) => FlatOp::Powi(*k),
                        Op::Exp => FlatOp::Exp,
                        Op::Log => FlatOp::Log,
                        Op::Sin => FlatOp::Sin,
                        Op::Cos => FlatOp::Cos,
                        Op::Tan => FlatOp::Tan,
                        Op::Min => FlatOp::Min,
                        Op::Max => FlatOp::Max,
                        Op::Const(_) | Op::Var(_) | Op::Lin(_) => unreachable!(),
                    };
                    instrs.push(FlatInstr { op: flat_op, lhs, rhs });
                    slot_of.insert(*n, (instrs.len() - 1) as u32);
                }
            }
        }

        FlatFunction {
            instrs,
            scope: fun.scope().clone(),
            image: fun.image(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn image(&self) -> Interval {
        self.image
    }

    fn resolve(operand: Operand, scratch: &[Interval], box_: &IntervalBox) -> Interval {
        match operand {
            Operand::Const(c) => c,
            Operand::Var(v) => box_.get(v),
            Operand::Slot(s) => scratch[s as usize],
        }
    }

    /// Forward evaluation, one array pass.
    pub fn eval(&self, box_: &IntervalBox) -> Interval {
        let mut scratch = vec![Interval::EMPTY; self.instrs.len()];
        for (i, instr) in self.instrs.iter().enumerate() {
            scratch[i] = self.eval_instr(instr, &scratch, box_);
        }
        *scratch.last().unwrap_or(&Interval::EMPTY)
    }

    fn eval_instr(&self, instr: &FlatInstr, scratch: &[Interval], box_: &IntervalBox) -> Interval {
        let lhs = Self::resolve(instr.lhs, scratch, box_);
        let rhs = || Self::resolve(instr.rhs.unwrap(), scratch, box_);
        match &instr.op {
            FlatOp::Lin(lin) => lin
                .terms
                .iter()
                .fold(lin.constant, |acc, (v, c)| acc.add(&c.mul(&box_.get(*v)))),
            FlatOp::Neg => lhs.neg(),
            FlatOp::Add => lhs.add(&rhs()),
            FlatOp::Sub => lhs.sub(&rhs()),
            FlatOp::Mul => lhs.mul(&rhs()),
            FlatOp::Div => lhs.div(&rhs()),
            FlatOp::Abs => lhs.abs(),
            FlatOp::Sign => lhs.sign(),
            FlatOp::Sqr => lhs.sqr(),
            FlatOp::Sqrt => lhs.sqrt(),
            FlatOp::Powi(k) => lhs.powi(*k),
            FlatOp::Exp => lhs.exp(),
            FlatOp::Log => lhs.log(),
            FlatOp::Sin => lhs.sin(),
            FlatOp::Cos => lhs.cos(),
            FlatOp::Tan => lhs.tan(),
            FlatOp::Min => lhs.min(&rhs()),
            FlatOp::Max => lhs.max(&rhs()),
        }
    }

    /// HC4Revise over the flattened array: forward pass, then a single
    /// reverse pass pushing projections into slot targets and, for `Var`/
    /// `Lin` operands, into a per-variable target map.
    pub fn hc4_revise(&self, box_: &IntervalBox) -> (Proof, Vec<(VarId, Interval)>) {
        if self.instrs.is_empty() {
            return (Proof::Inner, Vec::new());
        }
        let n = self.instrs.len();
        let mut scratch = vec![Interval::EMPTY; n];
        for (i, instr) in self.instrs.iter().enumerate() {
            scratch[i] = self.eval_instr(instr, &scratch, box_);
        }
        let forward_root = scratch[n - 1];
        let z = forward_root.intersect(&self.image);
        if z.is_empty() {
            return (Proof::Empty, Vec::new());
        }
        if forward_root.is_subset_of(&self.image) {
            return (Proof::Inner, Vec::new());
        }

        let mut slot_target: Vec<Option<Interval>> = vec![None; n];
        slot_target[n - 1] = Some(z);
        let mut var_target: std::collections::HashMap<VarId, Interval> = std::collections::HashMap::new();

        for i in (0..n).rev() {
            let target = match slot_target[i] {
                Some(t) => t,
                None => continue,
            };
            let instr = &self.instrs[i];
            let lhs_val = Self::resolve(instr.lhs, &scratch, box_);
            let rhs_val = instr.rhs.map(|o| Self::resolve(o, &scratch, box_));

            let mut push_operand = |operand: Operand, proj: Interval| match operand {
                Operand::Const(_) => {}
                Operand::Var(v) => {
                    var_target
                        .entry(v)
                        .and_modify(|cur| *cur = cur.intersect(&proj))
                        .or_insert(proj);
                }
                Operand::Slot(s) => {
                    let cur = slot_target[s as usize];
                    slot_target[s as usize] = Some(match cur {
                        Some(c) => c.intersect(&proj),
                        None => proj,
                    });
                }
            };

            match &instr.op {
                FlatOp::Lin(lin) => {
                    for (v, coeff) in &lin.terms {
                        if coeff.lo() == 0.0 && coeff.hi() == 0.0 {
                            continue;
                        }
                        let mut rest = lin.constant;
                        for (v2, c2) in &lin.terms {
                            if v2 == v {
                                continue;
                            }
                            rest = rest.add(&c2.mul(&box_.get(*v2)));
                        }
                        let proj = target.sub(&rest).div(coeff);
                        var_target
                            .entry(*v)
                            .and_modify(|cur| *cur = cur.intersect(&proj))
                            .or_insert(proj);
                    }
                }
                FlatOp::Neg => push_operand(instr.lhs, Interval::proj_neg(&lhs_val, &target)),
                FlatOp::Add => {
                    let rv = rhs_val.unwrap();
                    push_operand(instr.lhs, Interval::proj_add_x(&lhs_val, &rv, &target));
                    push_operand(instr.rhs.unwrap(), Interval::proj_add_x(&rv, &lhs_val, &target));
                }
                FlatOp::Sub => {
                    let rv = rhs_val.unwrap();
                    push_operand(instr.lhs, Interval::proj_sub_x(&lhs_val, &rv, &target));
                    push_operand(instr.rhs.unwrap(), Interval::proj_sub_y(&lhs_val, &rv, &target));
                }
                FlatOp::Mul => {
                    let rv = rhs_val.unwrap();
                    push_operand(instr.lhs, Interval::proj_mul_x(&lhs_val, &rv, &target));
                    push_operand(instr.rhs.unwrap(), Interval::proj_mul_x(&rv, &lhs_val, &target));
                }
                FlatOp::Div => {
                    let rv = rhs_val.unwrap();
                    push_operand(instr.lhs, Interval::proj_div_x(&lhs_val, &rv, &target));
                    push_operand(instr.rhs.unwrap(), Interval::proj_div_y(&lhs_val, &rv, &target));
                }
                FlatOp::Abs => push_operand(instr.lhs, Interval::proj_abs(&lhs_val, &target)),
                FlatOp::Sign => push_operand(instr.lhs, Interval::proj_sign(&lhs_val, &target)),
                FlatOp::Sqr => push_operand(instr.lhs, Interval::proj_sqr(&lhs_val, &target)),
                FlatOp::Sqrt => push_operand(instr.lhs, Interval::proj_sqrt(&lhs_val, &target)),
                FlatOp::Powi(k) => {
                    if *k == 2 {
                        push_operand(instr.lhs, Interval::proj_sqr(&lhs_val, &target));
                    }
                }
                FlatOp::Exp => push_operand(instr.lhs, Interval::proj_exp(&lhs_val, &target)),
                FlatOp::Log => push_operand(instr.lhs, Interval::proj_log(&lhs_val, &target)),
                FlatOp::Sin => push_operand(instr.lhs, Interval::proj_sin(&lhs_val, &target)),
                FlatOp::Cos => push_operand(instr.lhs, Interval::proj_cos(&lhs_val, &target)),
                FlatOp::Tan => {}
                FlatOp::Min => {
                    let rv = rhs_val.unwrap();
                    push_operand(instr.lhs, Interval::proj_min(&lhs_val, &rv, &target));
                    push_operand(instr.rhs.unwrap(), Interval::proj_min(&rv, &lhs_val, &target));
                }
                FlatOp::Max => {
                    let rv = rhs_val.unwrap();
                    push_operand(instr.lhs, Interval::proj_max(&lhs_val, &rv, &target));
                    push_operand(instr.rhs.unwrap(), Interval::proj_max(&rv, &lhs_val, &target));
                }
            }
        }

        if var_target.values().any(Interval::is_empty) {
            return (Proof::Empty, Vec::new());
        }
        let contracted: Vec<(VarId, Interval)> = var_target
            .into_iter()
            .map(|(v, t)| (v, box_.get(v).intersect(&t)))
            .collect();
        if contracted.iter().any(|(_, i)| i.is_empty()) {
            return (Proof::Empty, Vec::new());
        }
        (Proof::Maybe, contracted)
    }

    /// Interval reverse-mode AD w.r.t. every scope variable (spec §4.4's
    /// `iDiff`), mirroring [`crate::dag::Dag::diff_interval`] but over the
    /// flat array.
    pub fn idiff(&self, box_: &IntervalBox) -> Vec<Interval> {
        if self.instrs.is_empty() {
            return vec![Interval::ZERO; self.scope.len()];
        }
        let n = self.instrs.len();
        let mut scratch = vec![Interval::EMPTY; n];
        for (i, instr) in self.instrs.iter().enumerate() {
            scratch[i] = self.eval_instr(instr, &scratch, box_);
        }
        let mut slot_adjoint = vec![Interval::ZERO; n];
        slot_adjoint[n - 1] = Interval::ONE;
        let mut var_adjoint: std::collections::HashMap<VarId, Interval> = std::collections::HashMap::new();

        for i in (0..n).rev() {
            let bar = slot_adjoint[i];
            let instr = &self.instrs[i];
            let lhs_val = Self::resolve(instr.lhs, &scratch, box_);
            let rhs_val = instr.rhs.map(|o| Self::resolve(o, &scratch, box_));

            let mut accum = |operand: Operand, d: Interval| {
                let contrib = bar.mul(&d);
                match operand {
                    Operand::Const(_) => {}
                    Operand::Var(v) => {
                        var_adjoint
                            .entry(v)
                            .and_modify(|cur| *cur = cur.add(&contrib))
                            .or_insert(contrib);
                    }
                    Operand::Slot(s) => slot_adjoint[s as usize] = slot_adjoint[s as usize].add(&contrib),
                }
            };

            match &instr.op {
                FlatOp::Lin(lin) => {
                    for (v, c) in &lin.terms {
                        let contrib = bar.mul(c);
                        var_adjoint
                            .entry(*v)
                            .and_modify(|cur| *cur = cur.add(&contrib))
                            .or_insert(contrib);
                    }
                }
                FlatOp::Neg => accum(instr.lhs, Interval::singleton(-1.0)),
                FlatOp::Add => {
                    accum(instr.lhs, Interval::ONE);
                    accum(instr.rhs.unwrap(), Interval::ONE);
                }
                FlatOp::Sub => {
                    accum(instr.lhs, Interval::ONE);
                    accum(instr.rhs.unwrap(), Interval::singleton(-1.0));
                }
                FlatOp::Mul => {
                    accum(instr.lhs, rhs_val.unwrap());
                    accum(instr.rhs.unwrap(), lhs_val);
                }
                FlatOp::Div => {
                    let rv = rhs_val.unwrap();
                    accum(instr.lhs, Interval::ONE.div(&rv));
                    accum(instr.rhs.unwrap(), lhs_val.neg().div(&rv.sqr()));
                }
                FlatOp::Abs => {
                    let d = if lhs_val.contains(0.0) {
                        Interval::new(-1.0, 1.0)
                    } else {
                        Interval::singleton(lhs_val.midpoint().signum())
                    };
                    accum(instr.lhs, d);
                }
                FlatOp::Sign => accum(instr.lhs, Interval::ZERO),
                FlatOp::Sqr => accum(instr.lhs, lhs_val.mul(&Interval::singleton(2.0))),
                FlatOp::Sqrt => accum(instr.lhs, Interval::ONE.div(&lhs_val.sqrt().mul(&Interval::singleton(2.0)))),
                FlatOp::Powi(k) => accum(instr.lhs, Interval::singleton(*k as f64).mul(&lhs_val.powi(k - 1))),
                FlatOp::Exp => accum(instr.lhs, lhs_val.exp()),
                FlatOp::Log => accum(instr.lhs, Interval::ONE.div(&lhs_val)),
                FlatOp::Sin => accum(instr.lhs, lhs_val.cos()),
                FlatOp::Cos => accum(instr.lhs, lhs_val.sin().neg()),
                FlatOp::Tan => accum(instr.lhs, Interval::ONE.div(&lhs_val.cos().sqr())),
                FlatOp::Min => {
                    let rv = rhs_val.unwrap();
                    let sel = piecewise_select(lhs_val, rv);
                    accum(instr.lhs, sel);
                    accum(instr.rhs.unwrap(), piecewise_select(rv, lhs_val));
                }
                FlatOp::Max => {
                    let rv = rhs_val.unwrap();
                    let sel = piecewise_select(lhs_val, rv);
                    accum(instr.lhs, sel.neg().add(&Interval::ONE));
                    accum(instr.rhs.unwrap(), piecewise_select(rv, lhs_val).neg().add(&Interval::ONE));
                }
            }
        }

        self.scope
            .vars()
            .iter()
            .map(|v| var_adjoint.get(v).copied().unwrap_or(Interval::ZERO))
            .collect()
    }
}

fn piecewise_select(x: Interval, y: Interval) -> Interval {
    if x.hi() < y.lo() {
        Interval::ONE
    } else if y.hi() < x.lo() {
        Interval::ZERO
    } else {
        Interval::new(0.0, 1.0)
    }
}
