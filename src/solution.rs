//! Solution files (spec §6): same base name as the input problem file,
//! extension `.sol`. Written as plain text so a run can be diffed the same
//! way the teacher's solvers compare a results file against a baseline.

use std::fmt::Write as _;

use crate::contract::Proof;
use crate::domain::DomainBox;
use crate::params::SearchParams;
use crate::preprocess::PreprocessReport;
use crate::problem::Problem;
use crate::search::SearchReport;
use crate::Status;

/// Swaps a problem file's extension for `.sol`, per spec §6.
pub fn solution_path(problem_path: &std::path::Path) -> std::path::PathBuf {
    problem_path.with_extension("sol")
}

/// A solution box's tag (spec §6): how strong a guarantee its certificate
/// gives about the box's contents.
fn tag(proof: Proof) -> &'static str {
    match proof {
        Proof::Inner => "inner",
        Proof::Feasible => "safe",
        Proof::Maybe | Proof::Empty => "unsafe",
    }
}

/// The overall run verdict (spec §6's `solution status`), derived from
/// whether preprocessing alone proved infeasibility and what certificates
/// the search's solution boxes carry.
fn solution_status(preprocess: &PreprocessReport, search: &SearchReport) -> &'static str {
    if preprocess.infeasible {
        return "proved unfeasible";
    }
    if search.solutions.is_empty() {
        return if search.partial { "no solution found" } else { "proved unfeasible" };
    }
    if search.solutions.iter().any(|(_, proof)| matches!(proof, Proof::Inner | Proof::Feasible)) {
        "proved feasible"
    } else {
        "no proof certificate"
    }
}

fn widest(box_: &DomainBox) -> f64 {
    (0..box_.scope().len())
        .map(|i| box_.get_by_index(i).hull().width())
        .fold(0.0_f64, f64::max)
}

fn write_box(out: &mut String, problem: &Problem, box_: &DomainBox, precision: usize) {
    for (idx, &v) in box_.scope().vars().iter().enumerate() {
        let variable = problem.variable(v);
        let hull = box_.get_by_index(idx).hull();
        let _ = writeln!(
            out,
            "    {} in [{:.precision$}, {:.precision$}]",
            variable.name(),
            hull.lo(),
            hull.hi(),
            precision = precision
        );
    }
}

/// Renders a complete `.sol` file body for one solver run.
///
/// `problem` must be the *original*, pre-preprocessing problem: it needs
/// to carry every variable preprocessing may have fixed and dropped so
/// this can still print their names, and every surviving variable a
/// solution or pending box's scope names is necessarily a subset of it.
#[allow(clippy::too_many_arguments)]
pub fn render(
    problem_name: &str,
    problem: &Problem,
    problem_source: &str,
    params_source: Option<&str>,
    params: &SearchParams,
    preprocess: &PreprocessReport,
    preprocess_elapsed: std::time::Duration,
    search: &SearchReport,
    status: Status,
) -> String {
    let precision = params.float_precision();
    let mut out = String::new();

    let _ = writeln!(out, "NCSP SOLVER RESULTS");
    let _ = writeln!(out, "Input problem: {problem_name}");
    let _ = writeln!(out, "Run status: {status:?}");
    let _ = writeln!(out);

    let _ = writeln!(out, "PREPROCESSING");
    let _ = writeln!(out, "  time: {:.6}s", preprocess_elapsed.as_secs_f64());
    let _ = writeln!(out, "  status: {}", if preprocess.infeasible { "infeasible" } else { "ok" });
    let _ = writeln!(out, "  fixed variables: {}", preprocess.fixed.len());
    for (v, value) in &preprocess.fixed {
        let name = problem.variable(*v).name();
        let _ = writeln!(out, "    {name} = {value:.precision$}", precision = precision);
    }
    let _ = writeln!(out, "  inactive constraints: {}", preprocess.eliminated_constraints);
    let _ = writeln!(out);

    let _ = writeln!(out, "SOLVING");
    let _ = writeln!(out, "  time: {:.6}s", search.elapsed.as_secs_f64());
    let _ = writeln!(out, "  nodes processed: {}", search.nodes_processed);
    let _ = writeln!(out, "  search status: {}", if search.partial { "partial" } else { "complete" });
    let _ = writeln!(out, "  solution status: {}", solution_status(preprocess, search));
    if search.stats.total_calls() > 0 {
        let _ = writeln!(out, "  contractor calls: {}", search.stats.total_calls());
        for (kind, count) in search.stats.by_count_desc() {
            let _ = writeln!(out, "    {kind}: {count}");
        }
    }
    let _ = writeln!(out);

    for (i, (box_, proof)) in search.solutions.iter().enumerate() {
        let _ = writeln!(out, "SOLUTION {} [{:.precision$}] [{}]", i + 1, widest(box_), tag(*proof), precision = precision);
        write_box(&mut out, problem, box_, precision);
        let _ = writeln!(out);
    }

    if !search.pending.is_empty() {
        let _ = writeln!(out, "HULL OF PENDING NODES");
        let mut hull = search.pending[0].clone();
        for node in &search.pending[1..] {
            for idx in 0..hull.scope().len() {
                let merged = hull.get_by_index(idx).hull().hull(&node.get_by_index(idx).hull());
                hull.set_by_index(idx, crate::domain::Domain::Interval(merged));
            }
        }
        write_box(&mut out, problem, &hull, precision);
        let _ = writeln!(out, "  pending node count: {}", search.pending.len());
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "INPUT PROBLEM");
    out.push_str(problem_source);
    if !problem_source.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "PARAMETERS");
    match params_source {
        Some(source) => {
            out.push_str(source);
            if !source.ends_with('\n') {
                out.push('\n');
            }
        }
        None => {
            let _ = writeln!(out, "  (defaults)");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{Dag, Op};
    use crate::domain::Domain;
    use crate::interval::Interval;
    use crate::problem::{Constraint, ConstraintKind};
    use crate::variable::{Scope, VarId, Variable};
    use crate::{SolverOptions, Status};
    use std::time::Duration;

    fn toy_problem() -> Problem {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let sx = dag.make_unary("sqr", Op::Sqr, x);
        let variables = vec![Variable::new(VarId(0), "x", false, Domain::Interval(Interval::new(-2.0, 2.0)), 1e-6)];
        let fun = crate::dag::DagFun::new(&dag, sx, Interval::new(0.0, 4.0));
        Problem::new(variables, dag, vec![Constraint { name: None, fun, kind: ConstraintKind::Inequality }], None)
    }

    #[test]
    fn renders_a_feasible_run_with_one_solution_box() {
        let problem = toy_problem();
        let params = SearchParams::new(&SolverOptions::new());
        let preprocess = PreprocessReport::default();
        let scope = Scope::new([VarId(0)]);
        let box_ = DomainBox::new(scope, vec![Domain::Interval(Interval::new(0.9, 1.1))]);
        let search = SearchReport {
            solutions: vec![(box_, Proof::Inner)],
            pending: vec![],
            nodes_processed: 4,
            elapsed: Duration::from_millis(10),
            partial: false,
            stats: crate::stats::Stats::new(),
        };
        let text = render("toy.ncsp", &problem, "Variables x in [-2, 2];\n", None, &params, &preprocess, Duration::from_millis(1), &search, Status::Optimal);
        assert!(text.contains("SOLUTION 1"));
        assert!(text.contains("[inner]"));
        assert!(text.contains("x in ["));
        assert!(text.contains("search status: complete"));
    }

    #[test]
    fn reports_no_solution_found_when_partial_and_empty() {
        let problem = toy_problem();
        let params = SearchParams::new(&SolverOptions::new());
        let preprocess = PreprocessReport::default();
        let search = SearchReport {
            solutions: vec![],
            pending: vec![],
            nodes_processed: 0,
            elapsed: Duration::ZERO,
            partial: true,
            stats: crate::stats::Stats::new(),
        };
        let text = render("toy.ncsp", &problem, "", None, &params, &preprocess, Duration::ZERO, &search, Status::TimeLimit);
        assert!(text.contains("no solution found"));
    }
}
