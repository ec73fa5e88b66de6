//! Branch-and-prune search (spec §4.7): a tree over boxes, rooted at the
//! initial box, where each node runs the propagator, tests the stop
//! criteria, optionally runs the prover, and otherwise asks the splitter
//! for a variable and point to branch on.

pub mod node;
pub mod prover;
pub mod splitter;
pub mod store;

use std::time::{Duration, Instant};

use crate::callback::{Callback, SearchEvent};
use crate::contract::{ContractorPool, Proof};
use crate::domain::DomainBox;
use crate::propagate::Propagator;
use crate::stats::Stats;
use crate::terminators::Terminator;
use crate::variable::Variable;

use node::SearchNode;
use prover::Prover;
use splitter::Splitter;
use store::{NodeStore, StackStore};

/// Search cutoffs (spec §6 parameter keys `TIME_LIMIT`, `NODE_LIMIT`,
/// `SOLUTION_LIMIT`, `DEPTH_LIMIT`). Any field left `None` never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchLimits {
    pub time_limit: Option<Duration>,
    pub node_limit: Option<u64>,
    pub solution_limit: Option<u64>,
    pub depth_limit: Option<u32>,
}

/// Aggregate counters and the two output lists spec §4.7 requires: solved
/// boxes (with their certificates) and pending boxes left over when a
/// limit fires.
pub struct SearchReport {
    pub solutions: Vec<(DomainBox, Proof)>,
    pub pending: Vec<DomainBox>,
    pub nodes_processed: u64,
    pub elapsed: Duration,
    /// `true` iff some limit fired before the store emptied (spec: "Any
    /// limit that fires marks the search as partial").
    pub partial: bool,
    /// Per-contractor-kind call counts accumulated across every node
    /// (supplements the aggregate counters above; see [`crate::stats`]).
    pub stats: Stats,
}

pub struct Search {
    pool: ContractorPool,
    splitter: Box<dyn Splitter>,
    prover: Option<Prover>,
    limits: SearchLimits,
    terminator: Option<Box<dyn Terminator>>,
    callback: Option<Box<dyn Callback>>,
}

impl Search {
    pub fn new(pool: ContractorPool, splitter: Box<dyn Splitter>, prover: Option<Prover>, limits: SearchLimits) -> Self {
        Search { pool, splitter, prover, limits, terminator: None, callback: None }
    }

    pub fn with_terminator(mut self, terminator: Box<dyn Terminator>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    pub fn with_callback(mut self, callback: Box<dyn Callback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Runs the tree search to completion or until a limit/terminator
    /// fires, producing the final cover.
    pub fn run(&mut self, initial: DomainBox, variables: &[Variable]) -> SearchReport {
        let start = Instant::now();
        if let Some(t) = self.terminator.as_mut() {
            t.initialize();
        }

        let mut store = StackStore::new();
        store.push(SearchNode::root(initial));

        let mut solutions = Vec::new();
        let mut depth_limited_pending = Vec::new();
        let mut nodes_processed: u64 = 0;
        let mut partial = false;
        let mut stats = Stats::new();

        while let Some(mut current) = store.pop() {
            if self.limit_fired(&start, nodes_processed, solutions.len() as u64) {
                store.push(current);
                partial = true;
                break;
            }
            if let Some(t) = self.terminator.as_mut() {
                if t.terminate().is_some() {
                    store.push(current);
                    partial = true;
                    break;
                }
            }

            nodes_processed += 1;

            let mut interval_box = current.box_.to_interval_box();
            let propagator = Propagator::new(&self.pool);
            let proof = propagator.run(&mut interval_box, &mut stats);
            if proof == Proof::Empty {
                continue;
            }
            interval_box.write_back(&mut current.box_);
            current.proof = proof;

            if let Some(callback) = self.callback.as_mut() {
                callback.call(&SearchEvent {
                    nodes_processed,
                    depth: current.depth,
                    proof,
                    box_: &current.box_,
                });
            }

            let at_tolerance = current.box_.within_tolerances(variables);
            if at_tolerance || proof == Proof::Inner {
                let mut certificate = proof;
                if let Some(prover) = &self.prover {
                    let upgraded = prover.prove(&current.box_.to_interval_box());
                    if upgraded > certificate {
                        certificate = upgraded;
                    }
                }
                solutions.push((current.box_, certificate));
                continue;
            }

            if let Some(depth_limit) = self.limits.depth_limit {
                if current.depth >= depth_limit {
                    partial = true;
                    depth_limited_pending.push(current.box_);
                    continue;
                }
            }

            match self.splitter.choose(&current.box_, variables) {
                None => solutions.push((current.box_, proof)),
                Some(choice) => {
                    let (left, right) = current.box_.split_at(choice.index, choice.point);
                    let parent_index = nodes_processed as usize;
                    store.push(current.child(parent_index, left));
                    store.push(current.child(parent_index, right));
                }
            }
        }

        let mut pending = depth_limited_pending;
        while let Some(node) = store.pop() {
            pending.push(node.box_);
        }

        SearchReport {
            solutions,
            pending,
            nodes_processed,
            elapsed: start.elapsed(),
            partial,
            stats,
        }
    }

    fn limit_fired(&self, start: &Instant, nodes_processed: u64, solutions_found: u64) -> bool {
        if let Some(limit) = self.limits.time_limit {
            if start.elapsed() >= limit {
                return true;
            }
        }
        if let Some(limit) = self.limits.node_limit {
            if nodes_processed >= limit {
                return true;
            }
        }
        if let Some(limit) = self.limits.solution_limit {
            if solutions_found >= limit {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::hc4::Hc4Contractor;
    use crate::dag::{Dag, DagFun, Op};
    use crate::domain::Domain;
    use crate::interval::Interval;
    use crate::search::splitter::LargestWidthSplitter;
    use crate::variable::{Scope, VarId};
    use std::sync::Arc;

    #[test]
    fn search_isolates_both_roots_of_scenario_one() {
        // y - x^2 == 0, x^2 + y^2 - 2 == 0 on x in [-7,3], y in [-3,6],
        // HC4 only, tol 1e-4 (spec §8 scenario 1): should isolate the two
        // real roots near (1,1) and (-1,1).
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

        let dag = Arc::new(dag);
        let scope = Scope::new([VarId(0), VarId(1)]);
        let pool = ContractorPool::new(vec![
            Box::new(Hc4Contractor::new(dag.clone(), fun1)),
            Box::new(Hc4Contractor::new(dag, fun2)),
        ]);

        let variables = vec![
            Variable::new(VarId(0), "x", false, Domain::Interval(Interval::new(-7.0, 3.0)), 1e-4),
            Variable::new(VarId(1), "y", false, Domain::Interval(Interval::new(-3.0, 6.0)), 1e-4),
        ];
        let initial = DomainBox::new(
            scope,
            vec![Domain::Interval(Interval::new(-7.0, 3.0)), Domain::Interval(Interval::new(-3.0, 6.0))],
        );

        let mut search = Search::new(
            pool,
            Box::new(LargestWidthSplitter),
            None,
            SearchLimits { node_limit: Some(200_000), ..Default::default() },
        );
        let report = search.run(initial, &variables);

        assert!(!report.partial);
        assert!(report.solutions.len() >= 2);
        let near = |target_x: f64| {
            report.solutions.iter().any(|(b, _)| {
                let xi = b.get(VarId(0)).hull();
                (xi.midpoint() - target_x).abs() < 0.05
            })
        };
        assert!(near(1.0));
        assert!(near(-1.0));
    }

    #[test]
    fn search_enumerates_one_solution_per_admissible_integer_scenario_two() {
        // x^2 + y^2 == n^2, y == x^2 + 1, x in [-7,3], y in [-6,4],
        // n in {0..6} (spec §8 scenario 2): finitely many solutions, one
        // per admissible integer n.
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let y = dag.make_var(VarId(1));
        let n = dag.make_var(VarId(2));
        let sx = dag.make_unary("sqr", Op::Sqr, x);
        let sy = dag.make_unary("sqr", Op::Sqr, y);
        let sn = dag.make_unary("sqr", Op::Sqr, n);
        let sum_xy = dag.make_binary("add", Op::Add, sx, sy);
        let f1 = dag.make_binary("sub", Op::Sub, sum_xy, sn);
        let fun1 = DagFun::new(&dag, f1, Interval::ZERO);

        let y_minus_sx = dag.make_binary("sub", Op::Sub, y, sx);
        let f2 = dag.make_binary("sub", Op::Sub, y_minus_sx, dag.make_const(Interval::singleton(1.0)));
        let fun2 = DagFun::new(&dag, f2, Interval::ZERO);

        let dag = Arc::new(dag);
        let scope = Scope::new([VarId(0), VarId(1), VarId(2)]);
        let pool = ContractorPool::new(vec![
            Box::new(Hc4Contractor::new(dag.clone(), fun1)),
            Box::new(Hc4Contractor::new(dag, fun2)),
        ]);

        let variables = vec![
            Variable::new(VarId(0), "x", false, Domain::Interval(Interval::new(-7.0, 3.0)), 1e-4),
            Variable::new(VarId(1), "y", false, Domain::Interval(Interval::new(-6.0, 4.0)), 1e-4),
            Variable::new(VarId(2), "n", true, Domain::IntRange(0, 6), 1e-9),
        ];
        let initial = DomainBox::new(
            scope,
            vec![
                Domain::Interval(Interval::new(-7.0, 3.0)),
                Domain::Interval(Interval::new(-6.0, 4.0)),
                Domain::IntRange(0, 6),
            ],
        );

        let mut search = Search::new(
            pool,
            Box::new(LargestWidthSplitter),
            None,
            SearchLimits { node_limit: Some(500_000), ..Default::default() },
        );
        let report = search.run(initial, &variables);

        assert!(!report.partial);
        assert!(!report.solutions.is_empty());
        // Every surviving solution box's n-domain must still be an
        // admissible integer within the original {0..6} range.
        for (b, _) in &report.solutions {
            let n_hull = b.get(VarId(2)).hull();
            assert!(n_hull.lo() >= 0.0 && n_hull.hi() <= 6.0);
        }
    }

    #[test]
    fn node_limit_marks_search_partial() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let fun = DagFun::new(&dag, x, Interval::new(-100.0, 100.0));
        let dag = Arc::new(dag);
        let scope = Scope::new([VarId(0)]);
        let pool = ContractorPool::new(vec![Box::new(Hc4Contractor::new(dag, fun))]);
        let variables = vec![Variable::new(VarId(0), "x", false, Domain::Interval(Interval::new(-1e6, 1e6)), 1e-12)];
        let initial = DomainBox::new(scope, vec![Domain::Interval(Interval::new(-1e6, 1e6))]);

        let mut search = Search::new(
            pool,
            Box::new(LargestWidthSplitter),
            None,
            SearchLimits { node_limit: Some(3), ..Default::default() },
        );
        let report = search.run(initial, &variables);
        assert!(report.partial);
        assert_eq!(report.nodes_processed, 3);
    }
}
