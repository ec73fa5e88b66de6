//! Error kinds the core distinguishes, per the error-handling design: user-input
//! and internal-consistency errors abort a run, while numerical conditions during
//! propagation or search are recovered locally and never surface as an [`Err`].

use derive_more::{Display, Error};

/// A source location in a parsed problem or parameter file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors that abort a solver run, as opposed to `Proof::Empty` / interval
/// widening, which are normal control signals handled inside the search.
#[derive(Debug, Display, Error, PartialEq, Clone)]
pub enum SolverError {
    #[display("parse error at {location}: {message}")]
    Parse {
        location: Location,
        message: String,
    },

    #[display("constraint not representable in the DAG: {message}")]
    UnsupportedConstraint { message: String },

    #[display("variable '{name}' declared with an empty initial domain")]
    EmptyDomainAtConstruction { name: String },

    #[display("internal invariant violated: {message}")]
    AssertionViolation { message: String },

    #[display("cannot read file '{path}': {message}")]
    Io { path: String, message: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
