//! Parameter files (spec §6): `key = value` per line, `#` line comments,
//! populating an [`Options`](crate::Options) registry the same way the
//! teacher's `#[explicit_options]`/`#[use_option]` components read solver
//! tunables out of it.

use macros::{explicit_options, use_option};

use crate::error::{Location, SolverError, SolverResult};
use crate::SolverOptions;

/// Search and propagation tunables recognised in a parameter file, read
/// out of the shared [`Options`](crate::Options) registry via the same
/// `#[explicit_options]` pattern the teacher uses for every configurable
/// component.
#[explicit_options(name = SolverOptions)]
#[use_option(name = "time_limit", type_ = f64, default = "0.0", description = "Search wall-clock cutoff in seconds; 0 disables it.")]
#[use_option(name = "node_limit", type_ = u64, default = "0", description = "Search node-count cutoff; 0 disables it.")]
#[use_option(name = "solution_limit", type_ = u64, default = "0", description = "Search solution-count cutoff; 0 disables it.")]
#[use_option(name = "depth_limit", type_ = u32, default = "0", description = "Search depth cutoff; 0 disables it.")]
#[use_option(name = "split_tol_abs", type_ = f64, default = "1e-8", description = "Default absolute variable split tolerance.")]
#[use_option(name = "split_tol_rel", type_ = f64, default = "1e-6", description = "Default relative variable split tolerance.")]
#[use_option(name = "preprocessing", type_ = bool, default = "true", description = "Run the fix-and-eliminate preprocessing pass before search.")]
#[use_option(name = "log_level", type_ = String, default = "main", description = "Verbosity: none, main, inter, low, or full.")]
#[use_option(name = "propagator", type_ = String, default = "HC4", description = "Comma-separated contractor pool, e.g. HC4,POLYTOPE,NEWTON.")]
#[use_option(name = "split_strategy", type_ = String, default = "LARGEST_WIDTH", description = "LARGEST_WIDTH, ROUND_ROBIN, or SMEAR.")]
#[use_option(name = "polytope_style", type_ = String, default = "TAYLOR", description = "RLT, TAYLOR, or AFFINE.")]
#[use_option(name = "taylor_corner_seed", type_ = u64, default = "1", description = "Seed for the Taylor-corner/tie-breaking PRNG.")]
#[use_option(name = "display_region", type_ = String, default = "STD", description = "STD or VEC solution layout.")]
#[use_option(name = "float_precision", type_ = usize, default = "6", description = "Digits printed for domain bounds in the solution file.")]
pub struct SearchParams {}

impl SearchParams {
    pub fn new(options: &SolverOptions) -> Self {
        Self { options: options.into() }
    }

    pub fn time_limit(&self) -> Option<std::time::Duration> {
        (self.options.time_limit > 0.0).then(|| std::time::Duration::from_secs_f64(self.options.time_limit))
    }

    pub fn node_limit(&self) -> Option<u64> {
        (self.options.node_limit > 0).then_some(self.options.node_limit)
    }

    pub fn solution_limit(&self) -> Option<u64> {
        (self.options.solution_limit > 0).then_some(self.options.solution_limit)
    }

    pub fn depth_limit(&self) -> Option<u32> {
        (self.options.depth_limit > 0).then_some(self.options.depth_limit)
    }

    pub fn split_tol_abs(&self) -> f64 {
        self.options.split_tol_abs
    }

    pub fn split_tol_rel(&self) -> f64 {
        self.options.split_tol_rel
    }

    pub fn preprocessing(&self) -> bool {
        self.options.preprocessing
    }

    pub fn log_level(&self) -> &str {
        &self.options.log_level
    }

    pub fn propagator(&self) -> Vec<String> {
        self.options.propagator.split(',').map(|s| s.trim().to_string()).collect()
    }

    pub fn split_strategy(&self) -> &str {
        &self.options.split_strategy
    }

    pub fn polytope_style(&self) -> &str {
        &self.options.polytope_style
    }

    pub fn taylor_corner_seed(&self) -> u64 {
        self.options.taylor_corner_seed
    }

    pub fn display_region(&self) -> &str {
        &self.options.display_region
    }

    pub fn float_precision(&self) -> usize {
        self.options.float_precision
    }
}

/// Reads a parameter file's `key = value` lines into a fresh
/// [`Options`](crate::Options) registry, skipping blank lines and `#`
/// comments.
pub fn read_param_file(source: &str) -> SolverResult<SolverOptions> {
    let mut options = SolverOptions::new();
    for (line_no, raw_line) in source.lines().enumerate() {
        let line = match raw_line.find('#') {
            Some(idx) => &raw_line[..idx],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| SolverError::Parse {
            location: Location { line: line_no + 1, column: 1 },
            message: format!("expected 'key = value', found '{raw_line}'"),
        })?;
        let key = key.trim();
        let value = value.trim();
        set_recognised_option(&mut options, key, value).map_err(|message| SolverError::Parse {
            location: Location { line: line_no + 1, column: 1 },
            message,
        })?;
    }
    Ok(options)
}

fn set_recognised_option(options: &mut SolverOptions, key: &str, value: &str) -> Result<(), String> {
    let parse_f64 = |v: &str| v.parse::<f64>().map_err(|e| e.to_string());
    let parse_u64 = |v: &str| v.parse::<u64>().map_err(|e| e.to_string());
    let parse_u32 = |v: &str| v.parse::<u32>().map_err(|e| e.to_string());
    let parse_usize = |v: &str| v.parse::<usize>().map_err(|e| e.to_string());
    let parse_bool = |v: &str| match v.to_ascii_uppercase().as_str() {
        "YES" | "TRUE" => Ok(true),
        "NO" | "FALSE" => Ok(false),
        other => Err(format!("expected YES/NO, found '{other}'")),
    };

    match key {
        "TIME_LIMIT" => options.set_option("time_limit", parse_f64(value)?),
        "NODE_LIMIT" => options.set_option("node_limit", parse_u64(value)?),
        "SOLUTION_LIMIT" => options.set_option("solution_limit", parse_u64(value)?),
        "DEPTH_LIMIT" => options.set_option("depth_limit", parse_u32(value)?),
        "SPLIT_TOL_ABS" => options.set_option("split_tol_abs", parse_f64(value)?),
        "SPLIT_TOL_REL" => options.set_option("split_tol_rel", parse_f64(value)?),
        "PREPROCESSING" => options.set_option("preprocessing", parse_bool(value)?),
        "LOG_LEVEL" => options.set_option("log_level", value.to_string()),
        "PROPAGATOR" => options.set_option("propagator", value.to_string()),
        "SPLIT_STRATEGY" => options.set_option("split_strategy", value.to_string()),
        "POLYTOPE_STYLE" => options.set_option("polytope_style", value.to_string()),
        "TAYLOR_CORNER_SEED" => options.set_option("taylor_corner_seed", parse_u64(value)?),
        "DISPLAY_REGION" => options.set_option("display_region", value.to_string()),
        "FLOAT_PRECISION" => options.set_option("float_precision", parse_usize(value)?),
        other => return Err(format!("unrecognised parameter key '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_recognised_keys_and_ignores_comments_and_blanks() {
        let source = "\
# a comment line
LOG_LEVEL = full

TIME_LIMIT = 30
NODE_LIMIT = 5000
";
        let options = read_param_file(source).unwrap();
        let params = SearchParams::new(&options);
        assert_eq!(params.log_level(), "full");
        assert_eq!(params.time_limit(), Some(std::time::Duration::from_secs(30)));
        assert_eq!(params.node_limit(), Some(5000));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let options = SolverOptions::new();
        let params = SearchParams::new(&options);
        assert_eq!(params.log_level(), "main");
        assert!(params.preprocessing());
        assert_eq!(params.time_limit(), None);
    }

    #[test]
    fn rejects_an_unrecognised_key() {
        let err = read_param_file("NOT_A_KEY = 1").unwrap_err();
        assert!(matches!(err, SolverError::Parse { .. }));
    }
}
