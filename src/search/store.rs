//! Node stores (spec §4.7): hold pending search nodes between expansions.
//! The contract is only that the store never silently drops a node — a
//! stack (depth-first, the default) and a queue (breadth-first) both
//! satisfy it.

use std::collections::VecDeque;

use super::node::SearchNode;

pub trait NodeStore {
    fn push(&mut self, node: SearchNode);
    fn pop(&mut self) -> Option<SearchNode>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Depth-first: last pushed, first popped.
#[derive(Default)]
pub struct StackStore {
    nodes: Vec<SearchNode>,
}

impl StackStore {
    pub fn new() -> Self {
        StackStore::default()
    }
}

impl NodeStore for StackStore {
    fn push(&mut self, node: SearchNode) {
        self.nodes.push(node);
    }

    fn pop(&mut self) -> Option<SearchNode> {
        self.nodes.pop()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Breadth-first: first pushed, first popped.
#[derive(Default)]
pub struct QueueStore {
    nodes: VecDeque<SearchNode>,
}

impl QueueStore {
    pub fn new() -> Self {
        QueueStore::default()
    }
}

impl NodeStore for QueueStore {
    fn push(&mut self, node: SearchNode) {
        self.nodes.push_back(node);
    }

    fn pop(&mut self) -> Option<SearchNode> {
        self.nodes.pop_front()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}
