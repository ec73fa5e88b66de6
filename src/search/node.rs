//! Search nodes (spec §3 "Search node"): a box, its depth and parent, the
//! proof certificate reached by propagation, and a generic *node infos*
//! side-channel keyed by symbolic kind — the original's `CSPNode`/
//! `CSPContext` — shared between the splitter and contractors (ACID's
//! per-variable efficiency estimates, the splitter's smear cache).

use std::any::Any;
use std::collections::HashMap;

use crate::contract::Proof;
use crate::domain::DomainBox;

/// A key into a [`SearchNode`]'s info map. Kept as a plain string (rather
/// than an enum closed over every possible contractor/splitter) so new
/// contractors can stash their own per-node state without touching this
/// module.
pub type InfoKind = &'static str;

/// The generic side-channel carried by every search node.
#[derive(Default)]
pub struct NodeInfos {
    values: HashMap<InfoKind, Box<dyn Any + Send + Sync>>,
}

impl NodeInfos {
    pub fn new() -> Self {
        NodeInfos::default()
    }

    pub fn set<T: Any + Send + Sync>(&mut self, kind: InfoKind, value: T) {
        self.values.insert(kind, Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, kind: InfoKind) -> Option<&T> {
        self.values.get(kind).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn remove(&mut self, kind: InfoKind) {
        self.values.remove(kind);
    }
}

impl Clone for NodeInfos {
    /// Node infos don't survive a split by default: a child's side-channel
    /// starts empty and is repopulated the next time propagation runs on
    /// it. Contractors that want inherited state (ACID's efficiency
    /// estimates) read it off the parent node explicitly before the split.
    fn clone(&self) -> Self {
        NodeInfos::new()
    }
}

pub struct SearchNode {
    pub box_: DomainBox,
    pub depth: u32,
    pub parent: Option<usize>,
    pub proof: Proof,
    pub infos: NodeInfos,
}

impl SearchNode {
    pub fn root(box_: DomainBox) -> Self {
        SearchNode {
            box_,
            depth: 0,
            parent: None,
            proof: Proof::Maybe,
            infos: NodeInfos::new(),
        }
    }

    pub fn child(&self, parent_index: usize, box_: DomainBox) -> Self {
        SearchNode {
            box_,
            depth: self.depth + 1,
            parent: Some(parent_index),
            proof: Proof::Maybe,
            infos: NodeInfos::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_infos_round_trip_by_kind() {
        let mut infos = NodeInfos::new();
        infos.set::<u32>("acid/active_count", 3);
        assert_eq!(infos.get::<u32>("acid/active_count"), Some(&3));
        assert_eq!(infos.get::<f64>("acid/active_count"), None);
        infos.remove("acid/active_count");
        assert_eq!(infos.get::<u32>("acid/active_count"), None);
    }
}
