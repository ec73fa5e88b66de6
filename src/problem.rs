//! The top-level `Problem` (spec §3, §6): the parsed/preprocessed set of
//! variables, the shared DAG built over their constraints, and (for
//! echoing/pretty-printing only — this crate is not a global optimiser,
//! spec §1's Non-goals) an optional objective.

use std::sync::Arc;

use crate::dag::{Dag, DagFun};
use crate::domain::Domain;
use crate::variable::{Scope, VarId, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `f(x) == c`, image is a single point (or a tight interval after
    /// floating-point constant folding).
    Equality,
    /// `f(x) <= U`, `f(x) >= L`, or `f(x) in [L, U]`.
    Inequality,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: Option<String>,
    pub fun: DagFun,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Min,
    Max,
}

#[derive(Debug, Clone)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub fun: DagFun,
}

/// A parsed numerical constraint satisfaction problem: dense-from-zero
/// variables, a shared expression DAG, and the constraints built over it.
#[derive(Debug, Clone)]
pub struct Problem {
    variables: Vec<Variable>,
    dag: Arc<Dag>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl Problem {
    pub fn new(variables: Vec<Variable>, dag: Dag, constraints: Vec<Constraint>, objective: Option<Objective>) -> Self {
        Problem { variables, dag: Arc::new(dag), constraints, objective }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn dag(&self) -> &Arc<Dag> {
        &self.dag
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Looks a variable up by id. Variables are *not* guaranteed to sit at
    /// `id.index()` in `self.variables`: preprocessing (spec §4.9) drops
    /// fixed variables from the vector while leaving the survivors'
    /// `VarId`s untouched, so this always searches by id rather than
    /// indexing positionally.
    pub fn variable(&self, id: VarId) -> &Variable {
        self.variables.iter().find(|v| v.id() == id).expect("variable id not present in problem")
    }

    pub fn scope(&self) -> Scope {
        Scope::new(self.variables.iter().map(Variable::id))
    }

    /// The initial box: one domain per variable, in declaration order.
    pub fn initial_box(&self) -> crate::domain::DomainBox {
        crate::domain::DomainBox::new(
            self.scope(),
            self.variables.iter().map(|v| v.initial_domain().clone()).collect(),
        )
    }

    pub fn equality_constraints(&self) -> impl Iterator<Item = &DagFun> {
        self.constraints.iter().filter(|c| c.kind == ConstraintKind::Equality).map(|c| &c.fun)
    }

    pub fn inequality_constraints(&self) -> impl Iterator<Item = &DagFun> {
        self.constraints.iter().filter(|c| c.kind == ConstraintKind::Inequality).map(|c| &c.fun)
    }
}

/// Declares a variable with an empty initial domain cannot construct a
/// `Problem`: callers should check [`Domain::is_empty`] and surface
/// `SolverError::EmptyDomainAtConstruction` (spec §7) before calling
/// [`Problem::new`].
pub fn validate_nonempty_domains(variables: &[Variable]) -> Result<(), crate::error::SolverError> {
    for v in variables {
        if v.initial_domain().is_empty() {
            return Err(crate::error::SolverError::EmptyDomainAtConstruction { name: v.name().to_string() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Op;
    use crate::interval::Interval;

    #[test]
    fn initial_box_matches_declared_domains() {
        let mut dag = Dag::new();
        let x = dag.make_var(VarId(0));
        let _ = dag.make_unary("sqr", Op::Sqr, x);
        let variables = vec![Variable::new(VarId(0), "x", false, Domain::Interval(Interval::new(-1.0, 1.0)), 1e-6)];
        let problem = Problem::new(variables, dag, vec![], None);
        let ib = problem.initial_box().to_interval_box();
        assert_eq!(ib.get(VarId(0)), Interval::new(-1.0, 1.0));
    }

    #[test]
    fn rejects_empty_domain_at_construction() {
        let variables = vec![Variable::new(VarId(0), "x", false, Domain::Interval(Interval::EMPTY), 1e-6)];
        assert!(validate_nonempty_domains(&variables).is_err());
    }
}
