//! Search callbacks (spec §6's `LOG_LEVEL`): a hook invoked once per
//! expanded search node for logging/monitoring, selected at `Options`
//! registration time the same way the teacher selects among optimizer
//! callbacks via `build_option_enum!`.

use macros::build_option_enum;

use crate::contract::Proof;
use crate::domain::DomainBox;
use crate::SolverOptions;

/// What a callback sees after a node has been propagated (and, if it
/// reached a leaf, proved): enough to print a one-line trace without
/// exposing the search's internal node store.
pub struct SearchEvent<'a> {
    pub nodes_processed: u64,
    pub depth: u32,
    pub proof: Proof,
    pub box_: &'a DomainBox,
}

/// Hook invoked once per expanded search node for logging, monitoring, or
/// early stopping.
pub trait Callback {
    /// Creates a new callback from solver options.
    fn new(options: &SolverOptions) -> Self
    where
        Self: Sized;

    /// Called after a node has been propagated (and possibly proved).
    fn call(&mut self, event: &SearchEvent);
}

/// A callback that does nothing: `LOG_LEVEL none`.
pub struct NoOpCallback {}

impl Callback for NoOpCallback {
    fn new(_options: &SolverOptions) -> Self {
        Self {}
    }

    fn call(&mut self, _event: &SearchEvent) {}
}

/// Prints one line per node: node count, depth, and certificate.
/// `LOG_LEVEL main`.
pub struct NodeTraceCallback {}

impl Callback for NodeTraceCallback {
    fn new(_options: &SolverOptions) -> Self {
        Self {}
    }

    fn call(&mut self, event: &SearchEvent) {
        println!(
            "| {:6} | depth {:4} | {:?} |",
            event.nodes_processed, event.depth, event.proof
        );
    }
}

/// Prints one line per node plus the widest interval's bounds, for
/// `LOG_LEVEL inter`/`low`: enough detail to follow the search tree
/// without the full per-contractor trace.
pub struct BoxTraceCallback {}

impl Callback for BoxTraceCallback {
    fn new(_options: &SolverOptions) -> Self {
        Self {}
    }

    fn call(&mut self, event: &SearchEvent) {
        let scope = event.box_.scope();
        let widest = (0..scope.len())
            .map(|i| event.box_.get_by_index(i).hull().width())
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        match widest {
            Some((idx, width)) => println!(
                "| {:6} | depth {:4} | {:?} | widest var #{idx} width {:.3e} |",
                event.nodes_processed, event.depth, event.proof, width
            ),
            None => println!("| {:6} | depth {:4} | {:?} |", event.nodes_processed, event.depth, event.proof),
        }
    }
}

build_option_enum!(
    trait_ = Callback,
    name = "Callbacks",
    variants = (NoOpCallback, NodeTraceCallback, BoxTraceCallback),
    new_arguments = (&SolverOptions,),
    doc_header = "Search-node logging callbacks, selected by `LOG_LEVEL`: `none` maps to `NoOpCallback`, `main` to `NodeTraceCallback`, and `inter`/`low`/`full` to `BoxTraceCallback`."
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::interval::Interval;
    use crate::variable::{Scope, VarId};

    #[test]
    fn no_op_callback_does_not_panic_on_any_event() {
        let options = SolverOptions::new();
        let mut cb = NoOpCallback::new(&options);
        let scope = Scope::new([VarId(0)]);
        let box_ = DomainBox::new(scope, vec![Domain::Interval(Interval::new(0.0, 1.0))]);
        cb.call(&SearchEvent { nodes_processed: 1, depth: 0, proof: Proof::Maybe, box_: &box_ });
    }
}
