//! Preprocessing (spec §4.9): one HC4Revise pass over the initial box,
//! fixing variables whose contracted domain has collapsed to a point,
//! dropping constraints already certainly satisfied on the contracted box,
//! and substituting fixed variables out of every surviving constraint's
//! term so the search never carries dead dimensions.

use std::collections::HashMap;

use crate::dag::{Dag, DagFun, LinData, NodeId, Op, Proof};
use crate::domain::{Domain, IntervalBox};
use crate::interval::Interval;
use crate::problem::{Constraint, ConstraintKind, Problem};
use crate::term::TermBuilder;
use crate::variable::{Variable, VarId};

/// What the pass did, for the `PREPROCESSING` block of the solution file
/// (spec §6) and for deciding whether to run the search at all.
#[derive(Debug, Clone, Default)]
pub struct PreprocessReport {
    /// Variables fixed to a point value, with that value.
    pub fixed: Vec<(VarId, f64)>,
    /// Constraints found certainly satisfied and dropped.
    pub eliminated_constraints: usize,
    /// A constraint was found certainly violated: the whole problem is
    /// infeasible and the search never needs to run.
    pub infeasible: bool,
}

/// Runs the fix-and-eliminate pass, returning the reduced problem (sharing
/// the original variable identifiers — [`crate::variable::Scope`] indexes
/// by hash map, not by position, so eliminated variables simply leave gaps
/// rather than forcing a renumbering) and a report of what happened.
pub fn preprocess(problem: &Problem) -> (Problem, PreprocessReport) {
    let mut report = PreprocessReport::default();
    let mut dag: Dag = (**problem.dag()).clone();
    let builder = TermBuilder::simplifying();

    let mut interval_box = problem.initial_box().to_interval_box();
    for constraint in problem.constraints() {
        let (proof, narrowed) = constraint.fun.hc4_revise(&dag, &interval_box);
        if proof == Proof::Empty {
            report.infeasible = true;
            return (problem.clone(), report);
        }
        for (v, i) in narrowed {
            interval_box.set(v, i);
        }
    }

    let mut subs: HashMap<VarId, Interval> = HashMap::new();
    for variable in problem.variables() {
        let contracted = interval_box.get(variable.id());
        if contracted.width_below(variable.tolerance().max(1e-12)) {
            let point = contracted.midpoint();
            subs.insert(variable.id(), Interval::singleton(point));
            report.fixed.push((variable.id(), point));
        }
    }

    let mut cache: HashMap<NodeId, NodeId> = HashMap::new();
    let mut surviving_constraints = Vec::new();
    for constraint in problem.constraints() {
        let new_root = substitute(&mut dag, &builder, constraint.fun.root(), &subs, &mut cache);
        if let Op::Const(value) = dag.op(new_root).clone() {
            if value.intersect(&constraint.fun.image()).is_empty() {
                report.infeasible = true;
                return (problem.clone(), report);
            }
            report.eliminated_constraints += 1;
            continue;
        }
        let new_scope = problem.scope();
        let fun = DagFun::new(&dag, new_root, constraint.fun.image());
        debug_assert!(fun.scope().is_subset_of(&new_scope));
        surviving_constraints.push(Constraint {
            name: constraint.name.clone(),
            fun,
            kind: constraint.kind,
        });
    }

    let fixed_ids: std::collections::HashSet<VarId> = subs.keys().copied().collect();
    let mut remaining_variables: Vec<Variable> = Vec::new();
    for variable in problem.variables() {
        if fixed_ids.contains(&variable.id()) {
            continue;
        }
        let narrowed_domain = variable.initial_domain().intersect_interval(&interval_box.get(variable.id()));
        remaining_variables.push(Variable::new(
            variable.id(),
            variable.name(),
            variable.is_discrete(),
            narrowed_domain,
            variable.tolerance(),
        ));
    }

    let objective = problem.objective().map(|o| crate::problem::Objective {
        sense: o.sense,
        fun: DagFun::new(&dag, substitute(&mut dag, &builder, o.fun.root(), &subs, &mut cache), o.fun.image()),
    });

    let reduced = Problem::new(remaining_variables, dag, surviving_constraints, objective);
    (reduced, report)
}

/// Rewrites `n`, replacing every fixed variable with its constant value.
/// Memoised over `cache` since the input is a DAG, not a tree: without
/// memoisation, a diamond-shaped subexpression would be rebuilt once per
/// path to it.
fn substitute(
    dag: &mut Dag,
    builder: &TermBuilder,
    n: NodeId,
    subs: &HashMap<VarId, Interval>,
    cache: &mut HashMap<NodeId, NodeId>,
) -> NodeId {
    if let Some(&done) = cache.get(&n) {
        return done;
    }
    let op = dag.op(n).clone();
    let result = match op {
        Op::Const(_) => n,
        Op::Var(v) => match subs.get(&v) {
            Some(value) => dag.make_const(*value),
            None => n,
        },
        Op::Lin(lin) => {
            let mut constant = lin.constant;
            let mut terms = Vec::new();
            for (v, coeff) in lin.terms {
                match subs.get(&v) {
                    Some(value) => constant = constant.add(&coeff.mul(value)),
                    None => terms.push((v, coeff)),
                }
            }
            if terms.is_empty() {
                dag.make_const(constant)
            } else {
                dag.make_lin(LinData { terms, constant })
            }
        }
        Op::Neg => {
            let child = dag.children(n)[0];
            let child = substitute(dag, builder, child, subs, cache);
            builder.neg(dag, child)
        }
        Op::Abs => unary(dag, builder, n, subs, cache, TermBuilder::abs),
        Op::Sign => unary(dag, builder, n, subs, cache, TermBuilder::sign),
        Op::Sqr => unary(dag, builder, n, subs, cache, TermBuilder::sqr),
        Op::Sqrt => unary(dag, builder, n, subs, cache, TermBuilder::sqrt),
        Op::Exp => unary(dag, builder, n, subs, cache, TermBuilder::exp),
        Op::Log => unary(dag, builder, n, subs, cache, TermBuilder::log),
        Op::Sin => unary(dag, builder, n, subs, cache, TermBuilder::sin),
        Op::Cos => unary(dag, builder, n, subs, cache, TermBuilder::cos),
        Op::Tan => unary(dag, builder, n, subs, cache, TermBuilder::tan),
        Op::Powi(k) => {
            let child = dag.children(n)[0];
            let child = substitute(dag, builder, child, subs, cache);
            builder.powi(dag, child, k)
        }
        Op::Add => binary(dag, builder, n, subs, cache, TermBuilder::add),
        Op::Sub => binary(dag, builder, n, subs, cache, TermBuilder::sub),
        Op::Mul => binary(dag, builder, n, subs, cache, TermBuilder::mul),
        Op::Div => binary(dag, builder, n, subs, cache, TermBuilder::div),
        Op::Min => binary(dag, builder, n, subs, cache, TermBuilder::min),
        Op::Max => binary(dag, builder, n, subs, cache, TermBuilder::max),
    };
    cache.insert(n, result);
    result
}

fn unary(
    dag: &mut Dag,
    builder: &TermBuilder,
    n: NodeId,
    subs: &HashMap<VarId, Interval>,
    cache: &mut HashMap<NodeId, NodeId>,
    f: fn(&TermBuilder, &mut Dag, NodeId) -> NodeId,
) -> NodeId {
    let child = dag.children(n)[0];
    let child = substitute(dag, builder, child, subs, cache);
    f(builder, dag, child)
}

fn binary(
    dag: &mut Dag,
    builder: &TermBuilder,
    n: NodeId,
    subs: &HashMap<VarId, Interval>,
    cache: &mut HashMap<NodeId, NodeId>,
    f: fn(&TermBuilder, &mut Dag, NodeId, NodeId) -> NodeId,
) -> NodeId {
    let kids = dag.children(n).to_vec();
    let a = substitute(dag, builder, kids[0], subs, cache);
    let b = substitute(dag, builder, kids[1], subs, cache);
    f(builder, dag, a, b)
}
