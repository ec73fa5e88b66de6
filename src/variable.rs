//! Variables and scopes (spec §3): variables are dense integer identifiers
//! carried by contractors at runtime, grouped into shared, immutable
//! [`Scope`]s.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::Domain;

/// A unique, dense-from-zero variable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A declared problem variable: identity, name, kind, initial domain and
/// the tolerance below which its domain width is deemed sufficiently small.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    id: VarId,
    name: String,
    discrete: bool,
    initial_domain: Domain,
    tolerance: f64,
}

impl Variable {
    pub fn new(id: VarId, name: impl Into<String>, discrete: bool, initial_domain: Domain, tolerance: f64) -> Self {
        Variable {
            id,
            name: name.into(),
            discrete,
            initial_domain,
            tolerance,
        }
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_discrete(&self) -> bool {
        self.discrete
    }

    pub fn is_continuous(&self) -> bool {
        !self.discrete
    }

    pub fn initial_domain(&self) -> &Domain {
        &self.initial_domain
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

/// An ordered, immutable set of variables shared by reference. `O(1)`
/// membership and index-of-variable lookup via an internal hash map;
/// cloning a `Scope` only bumps an `Arc` refcount, which is what makes
/// "many contractors sharing the same scope" cheap in practice.
#[derive(Debug, Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

#[derive(Debug)]
struct ScopeInner {
    vars: Vec<VarId>,
    index_of: HashMap<VarId, usize>,
}

impl Scope {
    pub fn new(vars: impl IntoIterator<Item = VarId>) -> Self {
        let vars: Vec<VarId> = vars.into_iter().collect();
        let index_of = vars.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        Scope {
            inner: Arc::new(ScopeInner { vars, index_of }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.vars.is_empty()
    }

    pub fn vars(&self) -> &[VarId] {
        &self.inner.vars
    }

    pub fn contains(&self, v: VarId) -> bool {
        self.inner.index_of.contains_key(&v)
    }

    /// The position of `v` within this scope's ordering, if present.
    pub fn index_of(&self, v: VarId) -> Option<usize> {
        self.inner.index_of.get(&v).copied()
    }

    /// `self`'s variables all appear in `other` (used by the DAG invariant
    /// that a function view's scope is a superset of its child nodes').
    pub fn is_subset_of(&self, other: &Scope) -> bool {
        self.inner.vars.iter().all(|v| other.contains(*v))
    }

    /// The scope union of `self` and `other`, preserving `self`'s ordering
    /// first and appending any of `other`'s variables not already present.
    pub fn union(&self, other: &Scope) -> Scope {
        let mut vars = self.inner.vars.clone();
        for v in other.vars() {
            if !self.contains(*v) {
                vars.push(*v);
            }
        }
        Scope::new(vars)
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.vars == other.inner.vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;

    #[test]
    fn scope_lookup_is_order_preserving() {
        let scope = Scope::new([VarId(3), VarId(1), VarId(2)]);
        assert_eq!(scope.index_of(VarId(1)), Some(1));
        assert_eq!(scope.index_of(VarId(2)), Some(2));
        assert_eq!(scope.index_of(VarId(9)), None);
    }

    #[test]
    fn scope_clone_is_cheap_and_shares_storage() {
        let a = Scope::new([VarId(0), VarId(1)]);
        let b = a.clone();
        assert_eq!(a, b);
        assert!(b.contains(VarId(0)));
    }

    #[test]
    fn variable_carries_tolerance_and_domain() {
        let v = Variable::new(
            VarId(0),
            "x",
            false,
            Domain::Interval(Interval::new(-1.0, 1.0)),
            1e-8,
        );
        assert_eq!(v.name(), "x");
        assert!(v.is_continuous());
        assert_eq!(v.tolerance(), 1e-8);
    }
}
