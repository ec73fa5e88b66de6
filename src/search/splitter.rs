//! Splitters (spec §4.7): pick a variable and a split point inside a node's
//! box, producing two children. `LargestWidthSplitter` and
//! `RoundRobinSplitter` are the two required strategies; `SmearSplitter`
//! adds the secondary "impact on constraint violation" criterion spec §4.7
//! calls out, using the interval Jacobian already exposed by `DagFun`.

use std::cell::Cell;
use std::sync::Arc;

use crate::dag::{Dag, DagFun};
use crate::domain::DomainBox;
use crate::variable::{Variable, VarId};

/// A variable (by scope index) and the point inside its domain to split
/// at. The caller is responsible for producing the two half-open children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitChoice {
    pub index: usize,
    pub point: f64,
}

pub trait Splitter {
    /// Picks the variable to split and the point to split it at, or
    /// `None` if no variable in `box_` has a domain wider than its
    /// tolerance (the node's stop criterion has already been met).
    fn choose(&self, box_: &DomainBox, variables: &[Variable]) -> Option<SplitChoice>;
}

/// Splits the variable whose tolerance-normalised domain width is largest.
pub struct LargestWidthSplitter;

impl Splitter for LargestWidthSplitter {
    fn choose(&self, box_: &DomainBox, variables: &[Variable]) -> Option<SplitChoice> {
        let index = box_.widest_index(variables)?;
        let point = box_.get_by_index(index).splitting_point();
        Some(SplitChoice { index, point })
    }
}

/// Cycles through the scope in order, skipping variables already at or
/// below tolerance, wrapping back to the start of the scope.
pub struct RoundRobinSplitter {
    next: Cell<usize>,
}

impl RoundRobinSplitter {
    pub fn new() -> Self {
        RoundRobinSplitter { next: Cell::new(0) }
    }
}

impl Default for RoundRobinSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Splitter for RoundRobinSplitter {
    fn choose(&self, box_: &DomainBox, variables: &[Variable]) -> Option<SplitChoice> {
        let n = variables.len();
        if n == 0 {
            return None;
        }
        let start = self.next.get() % n;
        for offset in 0..n {
            let index = (start + offset) % n;
            if !box_.get_by_index(index).width_below(variables[index].tolerance()) {
                self.next.set((index + 1) % n);
                let point = box_.get_by_index(index).splitting_point();
                return Some(SplitChoice { index, point });
            }
        }
        None
    }
}

/// Ranks candidate variables by "smear": the product of the interval
/// Jacobian's magnitude and the variable's own domain width, summed over
/// every constraint in `funs`, a standard proxy for which split will most
/// reduce the violation of the tightest constraint.
pub struct SmearSplitter {
    dag: Arc<Dag>,
    funs: Vec<DagFun>,
}

impl SmearSplitter {
    pub fn new(dag: Arc<Dag>, funs: Vec<DagFun>) -> Self {
        SmearSplitter { dag, funs }
    }

    fn smear(&self, box_: &DomainBox, v: VarId, width: f64) -> f64 {
        let interval_box = box_.to_interval_box();
        self.funs
            .iter()
            .map(|fun| match fun.scope().index_of(v) {
                Some(local) => {
                    let grad = fun.diff(&self.dag, &interval_box);
                    let g = grad[local];
                    0.5 * (g.lo().abs().max(g.hi().abs())) * width
                }
                None => 0.0,
            })
            .fold(0.0, f64::max)
    }
}

impl Splitter for SmearSplitter {
    fn choose(&self, box_: &DomainBox, variables: &[Variable]) -> Option<SplitChoice> {
        let mut best: Option<(usize, f64)> = None;
        for (index, v) in variables.iter().enumerate() {
            let domain = box_.get_by_index(index);
            if domain.width_below(v.tolerance()) {
                continue;
            }
            let smear = self.smear(box_, v.id(), domain.width());
            if best.map(|(_, b)| smear > b).unwrap_or(true) {
                best = Some((index, smear));
            }
        }
        let (index, _) = best?;
        let point = box_.get_by_index(index).splitting_point();
        Some(SplitChoice { index, point })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::interval::Interval;
    use crate::variable::Scope;

    fn two_vars(tol: f64) -> (Scope, Vec<Variable>) {
        let scope = Scope::new([VarId(0), VarId(1)]);
        let vars = vec![
            Variable::new(VarId(0), "x", false, Domain::Interval(Interval::new(-1.0, 1.0)), tol),
            Variable::new(VarId(1), "y", false, Domain::Interval(Interval::new(-1.0, 1.0)), tol),
        ];
        (scope, vars)
    }

    #[test]
    fn largest_width_picks_the_widest_domain() {
        let (scope, vars) = two_vars(1e-4);
        let box_ = DomainBox::new(
            scope,
            vec![Domain::Interval(Interval::new(0.0, 1.0)), Domain::Interval(Interval::new(0.0, 10.0))],
        );
        let choice = LargestWidthSplitter.choose(&box_, &vars).unwrap();
        assert_eq!(choice.index, 1);
    }

    #[test]
    fn round_robin_cycles_and_skips_tight_domains() {
        let (scope, vars) = two_vars(1e-4);
        let box_ = DomainBox::new(
            scope,
            vec![Domain::Interval(Interval::new(0.0, 1e-9)), Domain::Interval(Interval::new(0.0, 1.0))],
        );
        let splitter = RoundRobinSplitter::new();
        let choice = splitter.choose(&box_, &vars).unwrap();
        assert_eq!(choice.index, 1);
    }

    #[test]
    fn no_choice_when_every_domain_is_within_tolerance() {
        let (scope, vars) = two_vars(10.0);
        let box_ = DomainBox::new(
            scope,
            vec![Domain::Interval(Interval::new(0.0, 1.0)), Domain::Interval(Interval::new(0.0, 1.0))],
        );
        assert!(LargestWidthSplitter.choose(&box_, &vars).is_none());
        assert!(RoundRobinSplitter::new().choose(&box_, &vars).is_none());
    }
}
