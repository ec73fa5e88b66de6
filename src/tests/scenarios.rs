//! End-to-end solver-level integration scenarios (spec §8's six literal
//! inputs/outputs), driven through the public parse -> preprocess -> search
//! pipeline rather than by hand-building a `Dag`, the way
//! `tests/maros_mezaros.rs` drives whole SIF cases through
//! `QuadraticProgram::solver_builder` rather than constructing a QP by hand.
//!
//! Scenarios 3-6 are each grounded on their own contractor's unit tests
//! (`contract::hc4`, `contract::var3b`, `contract::polytope`); this module
//! adds the two scenarios that need the full pipeline (parsing and search)
//! to exercise, plus a parameterised variant of the HC4 band scenario that
//! uses `rstest`'s case-table style rather than two near-identical `#[test]`s.

use rstest::rstest;
use rstest_reuse::{apply, template};

use crate::contract::hc4::Hc4Contractor;
use crate::contract::{Contractor, ContractorPool};
use crate::parser::parse_problem;
use crate::problem::Problem;
use crate::search::splitter::LargestWidthSplitter;
use crate::search::{Search, SearchLimits};
use crate::variable::Variable;

/// Rebuilds `problem` with every variable's tolerance set to `tol`, keeping
/// the same dag/constraints/objective; the parser always assigns its own
/// default tolerance (spec §6 notes parameter-file tolerances are applied
/// by the caller, not the parser).
fn with_tolerance(problem: Problem, tol: f64) -> Problem {
    let variables: Vec<Variable> = problem
        .variables()
        .iter()
        .map(|v| Variable::new(v.id(), v.name(), v.is_discrete(), v.initial_domain().clone(), tol))
        .collect();
    Problem::new(variables, (**problem.dag()).clone(), problem.constraints().to_vec(), problem.objective().cloned())
}

fn hc4_pool(problem: &Problem) -> ContractorPool {
    let dag = problem.dag().clone();
    let contractors: Vec<Box<dyn Contractor>> = problem
        .constraints()
        .iter()
        .map(|c| Box::new(Hc4Contractor::new(dag.clone(), c.fun.clone())) as Box<dyn Contractor>)
        .collect();
    ContractorPool::new(contractors)
}

#[test]
fn scenario_one_isolates_both_roots() {
    let problem = parse_problem(
        "Variables x in [-7, 3], y in [-3, 6];\n\
         Constraints y - sqr(x) == 0.0, sqr(x) + sqr(y) - 2.0 == 0.0;",
    )
    .unwrap();
    let problem = with_tolerance(problem, 1e-4);

    let mut search = Search::new(
        hc4_pool(&problem),
        Box::new(LargestWidthSplitter),
        None,
        SearchLimits { node_limit: Some(500_000), ..Default::default() },
    );
    let report = search.run(problem.initial_box(), problem.variables());

    assert!(!report.partial);
    let x_id = problem.variables()[0].id();
    let near = |target: f64| {
        report
            .solutions
            .iter()
            .any(|(b, _)| (b.get(x_id).hull().midpoint() - target).abs() < 0.05)
    };
    assert!(near(1.0));
    assert!(near(-1.0));
}

#[test]
fn scenario_two_enumerates_one_solution_per_admissible_integer() {
    let problem = parse_problem(
        "Variables x in [-7, 3], y in [-6, 4], n in {0..6};\n\
         Constraints sqr(x) + sqr(y) - sqr(n) == 0.0, y - sqr(x) - 1.0 == 0.0;",
    )
    .unwrap();
    let problem = with_tolerance(problem, 1e-4);

    let mut search = Search::new(
        hc4_pool(&problem),
        Box::new(LargestWidthSplitter),
        None,
        SearchLimits { node_limit: Some(500_000), ..Default::default() },
    );
    let report = search.run(problem.initial_box(), problem.variables());

    assert!(!report.partial);
    assert!(!report.solutions.is_empty());
    let n_id = problem.variables()[2].id();
    for (b, _) in &report.solutions {
        let hull = b.get(n_id).hull();
        assert!(hull.lo() >= 0.0 && hull.hi() <= 6.0);
    }
}

/// Spec §8 scenarios 3 and 4: the same `(x+y)^2 - 2z + 2 == 0` constraint
/// on two different `z` domains, one contracting and one provably empty.
#[template]
#[rstest]
fn hc4_band_cases(#[values((-10.0, 5.5), (-10.0, 0.0))] z_bounds: (f64, f64)) {}

#[apply(hc4_band_cases)]
fn hc4_contracts_or_empties_the_shared_band_constraint(z_bounds: (f64, f64)) {
    let (z_lo, z_hi) = z_bounds;
    let source = format!(
        "Variables x in [-10, 15], y in [-20, 5], z in [{z_lo}, {z_hi}];\n\
         Constraints sqr(x + y) - 2.0 * z + 2.0 == 0.0;"
    );
    let problem = parse_problem(&source).unwrap();
    let pool = hc4_pool(&problem);
    let mut box_ = problem.initial_box().to_interval_box();
    let proof = pool.get(0).contract(&mut box_);

    let z_id = problem.variables()[2].id();
    if z_hi <= 0.0 {
        assert_eq!(proof, crate::contract::Proof::Empty);
    } else {
        assert_ne!(proof, crate::contract::Proof::Empty);
        assert!(box_.get(z_id).is_subset_of(&crate::interval::Interval::new(1.0, 5.5)));
    }
}
