//! Contractors (spec §4.5): operators that narrow a box against one or
//! several constraints and return a proof certificate. `Proof` itself
//! lives on [`crate::dag`] since `DagFun::hc4_revise` already produces it;
//! every contractor module here re-exports it rather than re-declaring
//! the lattice.

pub mod acid;
pub mod affine_revise;
pub mod bc4;
pub mod hc4;
pub mod newton;
pub mod polytope;
pub mod var3b;
pub mod varcid;

pub use crate::dag::Proof;

use crate::domain::IntervalBox;
use crate::variable::Scope;

/// A sound operator mapping a box to a (possibly smaller) box plus a proof
/// certificate (glossary). Implementors may only shrink `box_`; per the
/// DAG invariant (spec §3), a non-empty box stays inside its initial
/// domain at all times.
pub trait Contractor {
    /// The variables this contractor can narrow; used by the propagator
    /// to decide which other contractors to reactivate after a
    /// significant contraction (spec §4.6).
    fn scope(&self) -> &Scope;

    /// Narrows `box_` in place, returning the certificate reached.
    fn contract(&self, box_: &mut IntervalBox) -> Proof;

    /// Label used to bucket this contractor's calls in [`crate::stats::Stats`].
    /// Defaults to a generic label; concrete contractors override it.
    fn kind(&self) -> &'static str {
        "contractor"
    }
}

/// A named, ordered list of contractors sharing a scope (spec §4.5
/// "Composition"); the propagator interleaves them to a joint fixpoint.
pub struct ContractorPool {
    contractors: Vec<Box<dyn Contractor>>,
}

impl ContractorPool {
    pub fn new(contractors: Vec<Box<dyn Contractor>>) -> Self {
        ContractorPool { contractors }
    }

    pub fn len(&self) -> usize {
        self.contractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contractors.is_empty()
    }

    pub fn get(&self, i: usize) -> &dyn Contractor {
        self.contractors[i].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Contractor> {
        self.contractors.iter().map(|c| c.as_ref())
    }
}
