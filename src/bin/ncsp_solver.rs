//! `ncsp_solver <problem-file> [-p <param-file>]` (spec §6): parses a
//! problem file, runs preprocessing and branch-and-prune search, and
//! writes a `.sol` file next to the input. Exit codes: `0` success
//! (complete or partial), `1` bad arguments or unreadable files, `2`
//! parse error, `3` internal error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ncsp_solver::contract::hc4::Hc4Contractor;
use ncsp_solver::contract::polytope::{CornerChoice, PolytopeContractor, PolytopeStyle};
use ncsp_solver::contract::{Contractor, ContractorPool};
use ncsp_solver::params::{read_param_file, SearchParams};
use ncsp_solver::parser::parse_problem;
use ncsp_solver::preprocess::preprocess;
use ncsp_solver::problem::Problem;
use ncsp_solver::search::splitter::{LargestWidthSplitter, RoundRobinSplitter, Splitter};
use ncsp_solver::search::{Search, SearchLimits};
use ncsp_solver::solution::{render, solution_path};
use ncsp_solver::terminators::InterruptTerminator;
use ncsp_solver::{SolverOptions, Status};

struct Args {
    problem_path: PathBuf,
    param_path: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let mut problem_path = None;
    let mut param_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-p" => {
                let value = args.next().ok_or_else(|| "-p requires a parameter file path".to_string())?;
                param_path = Some(PathBuf::from(value));
            }
            other if problem_path.is_none() => problem_path = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }
    let problem_path = problem_path.ok_or_else(|| "usage: ncsp_solver <problem-file> [-p <param-file>]".to_string())?;
    Ok(Args { problem_path, param_path })
}

/// Builds one HC4 contractor per constraint; `BC4` in `PROPAGATOR` widens
/// to `HC4` here since a generic per-constraint box-consistency pass needs
/// no extra wiring beyond the constraint's own `DagFun`. `POLYTOPE` adds a
/// single joint [`PolytopeContractor`] over every constraint, seeded from
/// `POLYTOPE_STYLE`/`TAYLOR_CORNER_SEED` so a parameter file controls the
/// same corner-choice reproducibility spec §5 asks of the whole solver.
/// `ACID` and `NEWTON` still need context this minimal CLI doesn't
/// assemble — requesting them just prints a note.
fn build_pool(problem: &Problem, params: &SearchParams) -> ContractorPool {
    let dag = problem.dag().clone();
    let mut contractors: Vec<Box<dyn Contractor>> = Vec::new();
    for constraint in problem.constraints() {
        contractors.push(Box::new(Hc4Contractor::new(dag.clone(), constraint.fun.clone())));
    }

    let requested = params.propagator();
    if requested.iter().any(|name| name == "POLYTOPE") {
        let style = match params.polytope_style() {
            "RLT" => PolytopeStyle::Rlt,
            "AFFINE" => PolytopeStyle::Affine,
            _ => PolytopeStyle::Taylor,
        };
        let funs: Vec<_> = problem.constraints().iter().map(|c| c.fun.clone()).collect();
        if !funs.is_empty() {
            let corners = CornerChoice::seeded(params.taylor_corner_seed());
            let polytope = PolytopeContractor::new(dag, funs, problem.scope(), style).with_corner_choice(corners);
            contractors.push(Box::new(polytope));
        }
    }

    for name in &requested {
        if !matches!(name.as_str(), "HC4" | "BC4" | "POLYTOPE") {
            eprintln!("note: PROPAGATOR '{name}' is not wired into this CLI; falling back to HC4");
        }
    }
    ContractorPool::new(contractors)
}

fn build_splitter(strategy: &str) -> Box<dyn Splitter> {
    match strategy {
        "ROUND_ROBIN" => Box::new(RoundRobinSplitter::new()),
        // SMEAR needs the scope's constraint functions threaded through;
        // this CLI keeps it as largest-width until that's wired up.
        _ => Box::new(LargestWidthSplitter),
    }
}

fn run() -> Result<ExitCode, (ExitCode, String)> {
    let args = parse_args().map_err(|e| (ExitCode::from(1), e))?;

    let problem_source = std::fs::read_to_string(&args.problem_path)
        .map_err(|e| (ExitCode::from(1), format!("cannot read '{}': {e}", args.problem_path.display())))?;

    let param_source = match &args.param_path {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .map_err(|e| (ExitCode::from(1), format!("cannot read '{}': {e}", path.display())))?,
        ),
        None => None,
    };

    let options = match &param_source {
        Some(source) => read_param_file(source).map_err(|e| (ExitCode::from(2), format!("{e}")))?,
        None => SolverOptions::new(),
    };
    let params = SearchParams::new(&options);

    let original_problem = parse_problem(&problem_source).map_err(|e| (ExitCode::from(2), format!("{e}")))?;

    let preprocess_start = std::time::Instant::now();
    let (problem, preprocess_report) = if params.preprocessing() {
        preprocess(&original_problem)
    } else {
        (original_problem.clone(), Default::default())
    };
    let preprocess_elapsed = preprocess_start.elapsed();

    let status;
    let search_report;
    if preprocess_report.infeasible {
        status = Status::Infeasible;
        search_report = ncsp_solver::search::SearchReport {
            solutions: vec![],
            pending: vec![],
            nodes_processed: 0,
            elapsed: std::time::Duration::ZERO,
            partial: false,
            stats: ncsp_solver::stats::Stats::new(),
        };
    } else {
        let pool = build_pool(&problem, &params);
        let splitter = build_splitter(params.split_strategy());
        let limits = SearchLimits {
            time_limit: params.time_limit(),
            node_limit: params.node_limit(),
            solution_limit: params.solution_limit(),
            depth_limit: params.depth_limit(),
        };
        let mut search = Search::new(pool, splitter, None, limits).with_terminator(Box::new(InterruptTerminator::new()));

        let initial = problem.initial_box();
        search_report = search.run(initial, problem.variables());
        status = if search_report.partial {
            Status::TimeLimit
        } else if search_report.solutions.is_empty() {
            Status::Infeasible
        } else {
            Status::Optimal
        };
    }

    let problem_name = args.problem_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let sol_text = render(
        &problem_name,
        &original_problem,
        &problem_source,
        param_source.as_deref(),
        &params,
        &preprocess_report,
        preprocess_elapsed,
        &search_report,
        status,
    );

    let out_path: &Path = &solution_path(&args.problem_path);
    std::fs::write(out_path, sol_text).map_err(|e| (ExitCode::from(3), format!("cannot write '{}': {e}", out_path.display())))?;

    println!("wrote {}", out_path.display());
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err((code, message)) => {
            eprintln!("ncsp_solver: {message}");
            code
        }
    }
}
