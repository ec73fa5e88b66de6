//! Shared expression DAG (spec §3, §4.3): an arena of nodes in topological
//! order (every child index is strictly less than its parent's), with
//! hash-consing on insertion so that re-inserting an already-present
//! subexpression returns the existing index.
//!
//! Per §5's concurrency note, the DAG is read-only from a contractor's
//! point of view: [`Dag::eval_interval`] and [`Dag::hc4_revise`] take `&self`
//! and thread their scratch state through local maps rather than mutating
//! node fields, so the same `Dag` can back many concurrently-evaluated
//! `DagFun`s without interior mutability.

pub mod bitset;

use std::collections::HashMap;

use bitset::Bitset;

use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::variable::{Scope, VarId};

/// Index of a node in a [`Dag`]'s arena. Also the public handle type
/// returned by [`crate::term::TermBuilder`] — a `Term` *is* a `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A canonicalised linear combination `sum(coeff_i * x_i) + constant`,
/// sorted by variable id for structural (hash-consing) equality.
#[derive(Debug, Clone, PartialEq)]
pub struct LinData {
    pub terms: Vec<(VarId, Interval)>,
    pub constant: Interval,
}

impl LinData {
    pub fn constant(c: Interval) -> Self {
        LinData {
            terms: Vec::new(),
            constant: c,
        }
    }

    pub fn variable(v: VarId) -> Self {
        LinData {
            terms: vec![(v, Interval::ONE)],
            constant: Interval::ZERO,
        }
    }

    fn merge(a: &LinData, b: &LinData, fa: f64, fb: f64) -> LinData {
        let sa = Interval::singleton(fa);
        let sb = Interval::singleton(fb);
        let mut out: Vec<(VarId, Interval)> = Vec::with_capacity(a.terms.len() + b.terms.len());
        let (mut i, mut j) = (0, 0);
        while i < a.terms.len() || j < b.terms.len() {
            if j >= b.terms.len() || (i < a.terms.len() && a.terms[i].0 < b.terms[j].0) {
                out.push((a.terms[i].0, a.terms[i].1.mul(&sa)));
                i += 1;
            } else if i >= a.terms.len() || b.terms[j].0 < a.terms[i].0 {
                out.push((b.terms[j].0, b.terms[j].1.mul(&sb)));
                j += 1;
            } else {
                out.push((a.terms[i].0, a.terms[i].1.mul(&sa).add(&b.terms[j].1.mul(&sb))));
                i += 1;
                j += 1;
            }
        }
        LinData {
            terms: out,
            constant: a.constant.mul(&sa).add(&b.constant.mul(&sb)),
        }
    }

    pub fn add(a: &LinData, b: &LinData) -> LinData {
        Self::merge(a, b, 1.0, 1.0)
    }

    pub fn sub(a: &LinData, b: &LinData) -> LinData {
        Self::merge(a, b, 1.0, -1.0)
    }

    pub fn neg(a: &LinData) -> LinData {
        LinData {
            terms: a.terms.iter().map(|(v, c)| (*v, c.neg())).collect(),
            constant: a.constant.neg(),
        }
    }

    fn eval(&self, box_: &IntervalBox) -> Interval {
        self.terms
            .iter()
            .fold(self.constant, |acc, (v, c)| acc.add(&c.mul(&box_.get(*v))))
    }
}

/// The operator tag of a DAG node. Binary/unary ops reference their
/// operands via the node's `children` index list; `Const`/`Var`/`Lin` are
/// self-contained leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Const(Interval),
    Var(VarId),
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

#[derive(Debug, Clone)]
struct DagNode {
    op: Op,
    children: Vec<NodeId>,
    parents: Vec<NodeId>,
    deps: Bitset,
}

/// Hash-consing key: discriminant-ish tag plus structural payload.
#[derive(Debug, Clone, PartialEq)]
enum NodeKey {
    Const(u64), // bit pattern of (lo, hi)
    Var(u32),
    Lin(Vec<(u32, u64, u64)>, u64, u64),
    Unary(&'static str, NodeId),
    UnaryPow(i32, NodeId),
    Binary(&'static str, NodeId, NodeId),
}

fn interval_key(i: &Interval) -> u64 {
    i.lo().to_bits() ^ i.hi().to_bits().rotate_left(32)
}

/// The shared expression graph.
#[derive(Debug, Clone)]
pub struct Dag {
    nodes: Vec<DagNode>,
    index: HashMap<NodeKey, NodeId>,
}

impl Dag {
    pub fn new() -> Self {
        Dag {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn deps_of(&self, children: &[NodeId]) -> Bitset {
        children
            .iter()
            .fold(Bitset::new(), |acc, c| acc.union(&self.nodes[c.idx()].deps))
    }

    fn intern(&mut self, key: NodeKey, op: Op, children: Vec<NodeId>) -> NodeId {
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let deps = match &op {
            Op::Var(v) => Bitset::singleton(v.0 as usize),
            Op::Lin(lin) => lin
                .terms
                .iter()
                .fold(Bitset::new(), |acc, (v, _)| acc.union(&Bitset::singleton(v.0 as usize))),
            _ => self.deps_of(&children),
        };
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(DagNode {
            op,
            children: children.clone(),
            parents: Vec::new(),
            deps,
        });
        for c in children {
            self.nodes[c.idx()].parents.push(id);
        }
        self.index.insert(key, id);
        id
    }

    pub fn make_const(&mut self, c: Interval) -> NodeId {
        self.intern(NodeKey::Const(interval_key(&c)), Op::Const(c), Vec::new())
    }

    pub fn make_var(&mut self, v: VarId) -> NodeId {
        self.intern(NodeKey::Var(v.0), Op::Var(v), Vec::new())
    }

    pub fn make_lin(&mut self, lin: LinData) -> NodeId {
        let key = NodeKey::Lin(
            lin.terms.iter().map(|(v, c)| (v.0, c.lo().to_bits(), c.hi().to_bits())).collect(),
            lin.constant.lo().to_bits(),
            lin.constant.hi().to_bits(),
        );
        self.intern(key, Op::Lin(lin), Vec::new())
    }

    pub fn make_unary(&mut self, tag: &'static str, op: Op, child: NodeId) -> NodeId {
        self.intern(NodeKey::Unary(tag, child), op, vec![child])
    }

    pub fn make_powi(&mut self, n: i32, child: NodeId) -> NodeId {
        self.intern(NodeKey::UnaryPow(n, child), Op::Powi(n), vec![child])
    }

    pub fn make_binary(&mut self, tag: &'static str, op: Op, a: NodeId, b: NodeId) -> NodeId {
        self.intern(NodeKey::Binary(tag, a, b), op, vec![a, b])
    }

    pub fn op(&self, n: NodeId) -> &Op {
        &self.nodes[n.idx()].op
    }

    pub fn children(&self, n: NodeId) -> &[NodeId] {
        &self.nodes[n.idx()].children
    }

    pub fn parents(&self, n: NodeId) -> &[NodeId] {
        &self.nodes[n.idx()].parents
    }

    pub fn deps(&self, n: NodeId) -> &Bitset {
        &self.nodes[n.idx()].deps
    }

    /// All nodes reachable from `root`, in postorder (children strictly
    /// before parents — valid since the arena is already topologically
    /// ordered by construction). Exposed for [`crate::flat::FlatFunction`],
    /// which flattens exactly this ancestor set into a dense array.
    pub fn ancestors_postorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((n, expanded)) = stack.pop() {
            if visited[n.idx()] {
                continue;
            }
            if expanded {
                visited[n.idx()] = true;
                order.push(n);
            } else {
                stack.push((n, true));
                for c in &self.nodes[n.idx()].children {
                    if !visited[c.idx()] {
                        stack.push((*c, false));
                    }
                }
            }
        }
        order
    }

    /// Forward interval evaluation of `root` on `box_` (spec §4.3).
    pub fn eval_interval(&self, root: NodeId, box_: &IntervalBox) -> Interval {
        let order = self.ancestors_postorder(root);
        let mut vals: HashMap<NodeId, Interval> = HashMap::with_capacity(order.len());
        for n in order {
            let v = self.eval_node(n, &vals, box_);
            vals.insert(n, v);
        }
        vals[&root]
    }

    fn eval_node(&self, n: NodeId, vals: &HashMap<NodeId, Interval>, box_: &IntervalBox) -> Interval {
        let node = &self.nodes[n.idx()];
        let ch = |i: usize| vals[&node.children[i]];
        match &node.op {
            Op::Const(c) => *c,
            Op::Var(v) => box_.get(*v),
            Op::Lin(lin) => lin.eval(box_),
            Op::Neg => ch(0).neg(),
            Op::Add => ch(0).add(&ch(1)),
            Op::Sub => ch(0).sub(&ch(1)),
            Op::Mul => ch(0).mul(&ch(1)),
            Op::Div => ch(0).div(&ch(1)),
            Op::Abs => ch(0).abs(),
            Op::Sign => ch(0).sign(),
            Op::Sqr => ch(0).sqr(),
            Op::Sqrt => ch(0).sqrt(),
            Op::Powi(k) => ch(0).powi(*k),
            Op::Exp => ch(0).exp(),
            Op::Log => ch(0).log(),
            Op::Sin => ch(0).sin(),
            Op::Cos => ch(0).cos(),
            Op::Tan => ch(0).tan(),
            Op::Min => ch(0).min(&ch(1)),
            Op::Max => ch(0).max(&ch(1)),
        }
    }

    /// Forward evaluation of `root` to an [`crate::affine::AffineForm`],
    /// feeding the affine-revise contractor (spec §4.2). `var_forms` gives
    /// each scope variable's affine form (one noise symbol per variable,
    /// built by the caller from the current box); nodes outside its keys
    /// are plain constants. Returns `None` if a nonlinear op's domain
    /// makes no finite affine linearisation possible (e.g. reciprocal of
    /// an interval straddling zero) — callers should fall back to HC4Revise
    /// for that function on this box.
    pub fn eval_affine(
        &self,
        root: NodeId,
        var_forms: &HashMap<VarId, crate::affine::AffineForm>,
        gen: &mut crate::affine::NoiseGen,
    ) -> Option<crate::affine::AffineForm> {
        use crate::affine::AffineForm;
        let order = self.ancestors_postorder(root);
        let mut vals: HashMap<NodeId, AffineForm> = HashMap::with_capacity(order.len());
        for n in &order {
            let node = &self.nodes[n.idx()];
            let ch = |i: usize| vals[&node.children[i]].clone();
            let v = match &node.op {
                Op::Const(c) => AffineForm::constant(c.midpoint()),
                Op::Var(v) => var_forms.get(v)?.clone(),
                Op::Lin(lin) => {
                    let mut acc = AffineForm::constant(lin.constant.midpoint());
                    for (v, c) in &lin.terms {
                        let vf = var_forms.get(v)?;
                        acc = acc.add(&vf.mul_scalar_interval(c, gen));
                    }
                    acc
                }
                Op::Neg => ch(0).neg(),
                Op::Add => ch(0).add(&ch(1)),
                Op::Sub => ch(0).sub(&ch(1)),
                Op::Mul => ch(0).mul(&ch(1), gen),
                Op::Div => {
                    let recip = ch(1).reciprocal()?;
                    ch(0).mul(&recip, gen)
                }
                Op::Abs => {
                    // |x| has no single linear enclosure sign-stable across
                    // zero; fall back via its interval range.
                    return None;
                }
                Op::Sign => return None,
                Op::Sqr => ch(0).sqr(gen),
                Op::Sqrt => ch(0).sqrt()?,
                Op::Powi(k) => {
                    let x = ch(0);
                    if *k == 2 {
                        x.sqr(gen)
                    } else {
                        return None;
                    }
                }
                Op::Exp => ch(0).exp(),
                Op::Log => ch(0).log()?,
                Op::Sin => ch(0).sin(),
                Op::Cos => ch(0).cos(),
                Op::Tan => return None,
                Op::Min => return None,
                Op::Max => return None,
            };
            vals.insert(*n, v);
        }
        vals.remove(&root)
    }

    /// HC4Revise (spec §4.3): forward evaluation, intersection with the
    /// function's image, then backward projection down to variable leaves.
    /// Returns the proof certificate and, for `Maybe`, the narrowed
    /// per-variable intervals (variables not mentioned are unconstrained
    /// by this pass).
    pub fn hc4_revise(&self, root: NodeId, image: Interval, box_: &IntervalBox) -> (Proof, Vec<(VarId, Interval)>) {
        let order = self.ancestors_postorder(root);
        let mut vals: HashMap<NodeId, Interval> = HashMap::with_capacity(order.len());
        for n in &order {
            let v = self.eval_node(*n, &vals, box_);
            vals.insert(*n, v);
        }
        let forward_root = vals[&root];
        let z = forward_root.intersect(&image);
        if z.is_empty() {
            return (Proof::Empty, Vec::new());
        }
        if forward_root.is_subset_of(&image) {
            return (Proof::Inner, Vec::new());
        }

        let mut node_target: HashMap<NodeId, Interval> = HashMap::new();
        node_target.insert(root, z);
        let mut var_target: HashMap<VarId, Interval> = HashMap::new();

        for n in order.iter().rev() {
            let node = &self.nodes[n.idx()];
            let target = match node_target.get(n) {
                Some(t) => *t,
                None => continue, // unreachable from root's active contraction path
            };
            let ch = |i: usize| vals[&node.children[i]];
            let mut push = |child: NodeId, proj: Interval| {
                node_target
                    .entry(child)
                    .and_modify(|cur| *cur = cur.intersect(&proj))
                    .or_insert(proj);
            };
            match &node.op {
                Op::Const(_) => {}
                Op::Var(v) => {
                    var_target
                        .entry(*v)
                        .and_modify(|cur| *cur = cur.intersect(&target))
                        .or_insert(target);
                }
                Op::Lin(lin) => {
                    // n-ary linear projection: solve each term directly
                    // against the rest, rather than recursing through
                    // synthetic Add/Mul children.
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
                Op::Neg => push(node.children[0], Interval::proj_neg(&ch(0), &target)),
                Op::Add => {
                    push(node.children[0], Interval::proj_add_x(&ch(0), &ch(1), &target));
                    push(node.children[1], Interval::proj_add_x(&ch(1), &ch(0), &target));
                }
                Op::Sub => {
                    push(node.children[0], Interval::proj_sub_x(&ch(0), &ch(1), &target));
                    push(node.children[1], Interval::proj_sub_y(&ch(0), &ch(1), &target));
                }
                Op::Mul => {
                    push(node.children[0], Interval::proj_mul_x(&ch(0), &ch(1), &target));
                    push(node.children[1], Interval::proj_mul_x(&ch(1), &ch(0), &target));
                }
                Op::Div => {
                    push(node.children[0], Interval::proj_div_x(&ch(0), &ch(1), &target));
                    push(node.children[1], Interval::proj_div_y(&ch(0), &ch(1), &target));
                }
                Op::Abs => push(node.children[0], Interval::proj_abs(&ch(0), &target)),
                Op::Sign => push(node.children[0], Interval::proj_sign(&ch(0), &target)),
                Op::Sqr => push(node.children[0], Interval::proj_sqr(&ch(0), &target)),
                Op::Sqrt => push(node.children[0], Interval::proj_sqrt(&ch(0), &target)),
                Op::Powi(k) => {
                    // only the invertible cases are projected; otherwise no
                    // contraction (sound: falling back to the forward value).
                    if *k == 2 {
                        push(node.children[0], Interval::proj_sqr(&ch(0), &target));
                    }
                }
                Op::Exp => push(node.children[0], Interval::proj_exp(&ch(0), &target)),
                Op::Log => push(node.children[0], Interval::proj_log(&ch(0), &target)),
                Op::Sin => push(node.children[0], Interval::proj_sin(&ch(0), &target)),
                Op::Cos => push(node.children[0], Interval::proj_cos(&ch(0), &target)),
                Op::Tan => {} // no projection form specified; forward-only.
                Op::Min => {
                    push(node.children[0], Interval::proj_min(&ch(0), &ch(1), &target));
                    push(node.children[1], Interval::proj_min(&ch(1), &ch(0), &target));
                }
                Op::Max => {
                    push(node.children[0], Interval::proj_max(&ch(0), &ch(1), &target));
                    push(node.children[1], Interval::proj_max(&ch(1), &ch(0), &target));
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

    /// For each variable referenced by `root`'s ancestor subgraph, the
    /// number of DAG edges (child slots) referencing its `Var` node within
    /// that subgraph — used by [`crate::contract::bc4`] to find the
    /// variables worth slicing (those occurring more than once, where
    /// HC4Revise's single-occurrence optimality no longer holds).
    pub fn occurrence_counts(&self, root: NodeId) -> HashMap<VarId, usize> {
        let order = self.ancestors_postorder(root);
        let in_set: std::collections::HashSet<NodeId> = order.iter().copied().collect();
        let mut counts = HashMap::new();
        for n in &order {
            for c in &self.nodes[n.idx()].children {
                if !in_set.contains(c) {
                    continue;
                }
                if let Op::Var(v) = &self.nodes[c.idx()].op {
                    *counts.entry(*v).or_insert(0) += 1;
                }
            }
            if let Op::Lin(lin) = &self.nodes[n.idx()].op {
                for (v, _) in &lin.terms {
                    *counts.entry(*v).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Reverse-mode AD of `root` w.r.t. every scope variable, in interval
    /// arithmetic. Piecewise derivatives (`abs`, `min`, `max`, `sign`)
    /// widen to the hull of the one-sided derivatives over the node's
    /// current interval, per spec §4.3.
    pub fn diff_interval(&self, root: NodeId, scope: &Scope, box_: &IntervalBox) -> Vec<Interval> {
        let order = self.ancestors_postorder(root);
        let mut vals: HashMap<NodeId, Interval> = HashMap::with_capacity(order.len());
        for n in &order {
            let v = self.eval_node(*n, &vals, box_);
            vals.insert(*n, v);
        }
        let mut adjoint: HashMap<NodeId, Interval> = HashMap::new();
        adjoint.insert(root, Interval::ONE);
        let mut var_adjoint: HashMap<VarId, Interval> = HashMap::new();

        for n in order.iter().rev() {
            let node = &self.nodes[n.idx()];
            let bar = match adjoint.get(n) {
                Some(b) => *b,
                None => continue,
            };
            let ch = |i: usize| vals[&node.children[i]];
            let mut accum = |child: NodeId, d: Interval| {
                let contrib = bar.mul(&d);
                adjoint
                    .entry(child)
                    .and_modify(|cur| *cur = cur.add(&contrib))
                    .or_insert(contrib);
            };
            match &node.op {
                Op::Const(_) => {}
                Op::Var(v) => {
                    var_adjoint
                        .entry(*v)
                        .and_modify(|cur| *cur = cur.add(&bar))
                        .or_insert(bar);
                }
                Op::Lin(lin) => {
                    for (v, c) in &lin.terms {
                        let contrib = bar.mul(c);
                        var_adjoint
                            .entry(*v)
                            .and_modify(|cur| *cur = cur.add(&contrib))
                            .or_insert(contrib);
                    }
                }
                Op::Neg => accum(node.children[0], Interval::singleton(-1.0)),
                Op::Add => {
                    accum(node.children[0], Interval::ONE);
                    accum(node.children[1], Interval::ONE);
                }
                Op::Sub => {
                    accum(node.children[0], Interval::ONE);
                    accum(node.children[1], Interval::singleton(-1.0));
                }
                Op::Mul => {
                    accum(node.children[0], ch(1));
                    accum(node.children[1], ch(0));
                }
                Op::Div => {
                    let y = ch(1);
                    accum(node.children[0], Interval::ONE.div(&y));
                    accum(node.children[1], ch(0).neg().div(&y.sqr()));
                }
                Op::Abs => accum(node.children[0], widen_piecewise(ch(0), |x| x.signum())),
                Op::Sign => accum(node.children[0], Interval::ZERO),
                Op::Sqr => accum(node.children[0], ch(0).mul(&Interval::singleton(2.0))),
                Op::Sqrt => accum(
                    node.children[0],
                    Interval::ONE.div(&ch(0).sqrt().mul(&Interval::singleton(2.0))),
                ),
                Op::Powi(k) => {
                    let x = ch(0);
                    let d = Interval::singleton(*k as f64).mul(&x.powi(k - 1));
                    accum(node.children[0], d);
                }
                Op::Exp => accum(node.children[0], ch(0).exp()),
                Op::Log => accum(node.children[0], Interval::ONE.div(&ch(0))),
                Op::Sin => accum(node.children[0], ch(0).cos()),
                Op::Cos => accum(node.children[0], ch(0).sin().neg()),
                Op::Tan => {
                    let c = ch(0).cos();
                    accum(node.children[0], Interval::ONE.div(&c.sqr()));
                }
                Op::Min => {
                    let (x, y) = (ch(0), ch(1));
                    accum(node.children[0], piecewise_select(x, y));
                    accum(node.children[1], piecewise_select(y, x));
                }
                Op::Max => {
                    let (x, y) = (ch(0), ch(1));
                    accum(node.children[0], piecewise_select(x, y).neg().add(&Interval::ONE));
                    accum(node.children[1], piecewise_select(y, x).neg().add(&Interval::ONE));
                }
            }
        }

        scope
            .vars()
            .iter()
            .map(|v| var_adjoint.get(v).copied().unwrap_or(Interval::ZERO))
            .collect()
    }
}

impl Default for Dag {
    fn default() -> Self {
        Dag::new()
    }
}

/// Widens a pointwise derivative rule to the hull of its values over an
/// interval argument, conservatively including both branches whenever the
/// interval contains the breakpoint at 0.
fn widen_piecewise(x: Interval, f: fn(f64) -> f64) -> Interval {
    if x.is_empty() {
        return Interval::EMPTY;
    }
    if x.contains(0.0) {
        Interval::new(-1.0, 1.0)
    } else {
        Interval::singleton(f(x.midpoint()))
    }
}

/// Derivative of `min(x, y)` (or, negated-and-shifted, `max`) w.r.t. `x`:
/// `1` where `x` is certainly the minimiser, `0` where `y` is, `[0, 1]`
/// where the ranges overlap and either could be.
fn piecewise_select(x: Interval, y: Interval) -> Interval {
    if x.hi() < y.lo() {
        Interval::ONE
    } else if y.hi() < x.lo() {
        Interval::ZERO
    } else {
        Interval::new(0.0, 1.0)
    }
}

/// Proof certificate lattice (spec §4.5, glossary): `Empty < Maybe <
/// Feasible < Inner`, monotone under contraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Proof {
    Empty,
    Maybe,
    Feasible,
    Inner,
}

/// A view of one root's ancestor set within a shared [`Dag`]: its own
/// scope (the variables it depends on) and the constraint's image `[L,
/// U]` (spec §3).
#[derive(Debug, Clone)]
pub struct DagFun {
    root: NodeId,
    scope: Scope,
    image: Interval,
}

impl DagFun {
    pub fn new(dag: &Dag, root: NodeId, image: Interval) -> Self {
        let deps = dag.deps(root);
        let scope = Scope::new(deps.iter().map(|i| VarId(i as u32)));
        DagFun { root, scope, image }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn image(&self) -> Interval {
        self.image
    }

    pub fn eval(&self, dag: &Dag, box_: &IntervalBox) -> Interval {
        dag.eval_interval(self.root, box_)
    }

    pub fn hc4_revise(&self, dag: &Dag, box_: &IntervalBox) -> (Proof, Vec<(VarId, Interval)>) {
        dag.hc4_revise(self.root, self.image, box_)
    }

    pub fn diff(&self, dag: &Dag, box_: &IntervalBox) -> Vec<Interval> {
        dag.diff_interval(self.root, &self.scope, box_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntervalBox;
    use crate::variable::Scope;

    fn xy_box(x: Interval, y: Interval) -> (Scope, IntervalBox) {
        let scope = Scope::new([VarId(0), VarId(1)]);
        let ib = IntervalBox::new(scope.clone(), vec![x, y]);
        (scope, ib)
    }

    #[test]
    fn hash_consing_is_idempotent() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let c = dag.make_const(Interval::ONE);
        let n1 = dag.make_binary("add", Op::Add, x, c);
        let before = dag.len();
        let n2 = dag.make_binary("add", Op::Add, x, c);
        assert_eq!(n1, n2);
        assert_eq!(dag.len(), before);
    }

    #[test]
    fn hc4_revise_contracts_quadratic() {
        // (x+y)^2 - 2z + 2 = 0  =>  z = ((x+y)^2 + 2) / 2
        // scenario 3 from spec §8.
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let z = dag.make_var(VarId(2));
        let sum = dag.make_binary("add", Op::Add, x, y);
        let sq = dag.make_unary("sqr", Op::Sqr, sum);
        let two_z = dag.make_binary("mul", Op::Mul, z, dag.make_const(Interval::singleton(2.0)));
        let lhs = dag.make_binary("sub", Op::Sub, sq, two_z);
        let f = dag.make_binary("add", Op::Add, lhs, dag.make_const(Interval::singleton(2.0)));

        let scope = Scope::new([VarId(0), VarId(1), VarId(2)]);
        let box_ = IntervalBox::new(
            scope,
            vec![
                Interval::new(-10.0, 15.0),
                Interval::new(-20.0, 5.0),
                Interval::new(-10.0, 5.5),
            ],
        );
        let fun = DagFun::new(&dag, f, Interval::ZERO);
        let (proof, narrowed) = fun.hc4_revise(&dag, &box_);
        assert_eq!(proof, Proof::Maybe);
        for (v, i) in narrowed {
            match v {
                VarId(0) => assert!(i.is_subset_of(&Interval::new(-8.0, 15.0))),
                VarId(1) => assert!(i.is_subset_of(&Interval::new(-18.0, 5.0))),
                VarId(2) => assert!(i.is_subset_of(&Interval::new(1.0, 5.5))),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn hc4_revise_proves_empty() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let z = dag.make_var(VarId(2));
        let sum = dag.make_binary("add", Op::Add, x, y);
        let sq = dag.make_unary("sqr", Op::Sqr, sum);
        let two_z = dag.make_binary("mul", Op::Mul, z, dag.make_const(Interval::singleton(2.0)));
        let lhs = dag.make_binary("sub", Op::Sub, sq, two_z);
        let f = dag.make_binary("add", Op::Add, lhs, dag.make_const(Interval::singleton(2.0)));

        let scope = Scope::new([VarId(0), VarId(1), VarId(2)]);
        let box_ = IntervalBox::new(
            scope,
            vec![
                Interval::new(-10.0, 15.0),
                Interval::new(-20.0, 5.0),
                Interval::new(-10.0, 0.0),
            ],
        );
        let fun = DagFun::new(&dag, f, Interval::ZERO);
        let (proof, _) = fun.hc4_revise(&dag, &box_);
        assert_eq!(proof, Proof::Empty);
    }

    #[test]
    fn diff_of_sum_of_squares_matches_linear_gradient() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let sx = dag.make_unary("sqr", Op::Sqr, x);
        let sy = dag.make_unary("sqr", Op::Sqr, y);
        let root = dag.make_binary("add", Op::Add, sx, sy);
        let (scope, box_) = xy_box(Interval::singleton(3.0), Interval::singleton(4.0));
        let grad = dag.diff_interval(root, &scope, &box_);
        assert!((grad[0].lo() - 6.0).abs() < 1e-9);
        assert!((grad[1].lo() - 8.0).abs() < 1e-9);
    }
}
