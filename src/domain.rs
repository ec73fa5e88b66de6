//! Variable domains (spec §3): an interval, an integer range, a finite
//! integer set, or a disconnected union of intervals produced by a
//! membership constraint `x in S`. Every contractor narrows the interval
//! *hull* of a domain; [`Domain::intersect_interval`] restores holes that a
//! plain interval intersection would otherwise paper over.

use crate::interval::Interval;
use crate::variable::{Scope, VarId};

/// A variable's domain. Continuous variables are always `Interval`;
/// discrete variables may additionally be `IntRange`, `IntSet`, or
/// `IntervalUnion` when declared via a membership constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    Interval(Interval),
    IntRange(i64, i64),
    IntSet(Vec<i64>),
    IntervalUnion(Vec<Interval>),
}

impl Domain {
    /// The interval hull every contractor actually operates on.
    pub fn hull(&self) -> Interval {
        match self {
            Domain::Interval(i) => *i,
            Domain::IntRange(lo, hi) => Interval::new(*lo as f64, *hi as f64),
            Domain::IntSet(vals) => {
                if vals.is_empty() {
                    Interval::EMPTY
                } else {
                    let lo = vals.iter().cloned().min().unwrap();
                    let hi = vals.iter().cloned().max().unwrap();
                    Interval::new(lo as f64, hi as f64)
                }
            }
            Domain::IntervalUnion(parts) => {
                parts.iter().fold(Interval::EMPTY, |acc, p| acc.hull(p))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Domain::Interval(i) => i.is_empty(),
            Domain::IntRange(lo, hi) => lo > hi,
            Domain::IntSet(vals) => vals.is_empty(),
            Domain::IntervalUnion(parts) => parts.iter().all(|p| p.is_empty()),
        }
    }

    pub fn width(&self) -> f64 {
        self.hull().width()
    }

    pub fn midpoint(&self) -> f64 {
        self.hull().midpoint()
    }

    pub fn width_below(&self, tol: f64) -> bool {
        self.hull().width_below(tol)
    }

    /// A splitting point: the midpoint for continuous domains, the nearest
    /// representable integer boundary for discrete ones so that both
    /// children remain non-degenerate dense subsets.
    pub fn splitting_point(&self) -> f64 {
        match self {
            Domain::Interval(i) => i.midpoint(),
            Domain::IntRange(lo, hi) => ((*lo as f64 + *hi as f64) / 2.0).floor().max(*lo as f64),
            Domain::IntSet(_) | Domain::IntervalUnion(_) => self.hull().midpoint(),
        }
    }

    /// Splits this domain at `point` into two halves `[lo, point]` and
    /// `[point, hi]`, reintroducing any gaps a disconnected domain had
    /// (spec §4.7's branch step, generalised beyond plain intervals).
    pub fn split_at(&self, point: f64) -> (Domain, Domain) {
        let hull = self.hull();
        let left = self.intersect_interval(&Interval::new(hull.lo(), point));
        let right = self.intersect_interval(&Interval::new(point, hull.hi()));
        (left, right)
    }

    /// Intersects with a plain interval (the result of some contraction)
    /// and, for disconnected domains, re-excludes any gaps the
    /// intersection crossed over (spec §8 "Integer and disconnected
    /// domains").
    pub fn intersect_interval(&self, i: &Interval) -> Domain {
        match self {
            Domain::Interval(d) => Domain::Interval(d.intersect(i)),
            Domain::IntRange(lo, hi) => {
                let new_lo = (*lo as f64).max(i.lo()).ceil() as i64;
                let new_hi = (*hi as f64).min(i.hi()).floor() as i64;
                Domain::IntRange(new_lo.max(*lo), new_hi.min(*hi))
            }
            Domain::IntSet(vals) => Domain::IntSet(
                vals.iter()
                    .cloned()
                    .filter(|v| i.contains(*v as f64))
                    .collect(),
            ),
            Domain::IntervalUnion(parts) => Domain::IntervalUnion(
                parts
                    .iter()
                    .map(|p| p.intersect(i))
                    .filter(|p| !p.is_empty())
                    .collect(),
            ),
        }
    }
}

/// A scope paired with one domain per variable, in scope order. The basic
/// unit of state propagation and search carries: a value type, cheaply
/// cloned so a failed branch can be discarded without disturbing its
/// parent.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainBox {
    scope: Scope,
    domains: Vec<Domain>,
}

impl DomainBox {
    pub fn new(scope: Scope, domains: Vec<Domain>) -> Self {
        assert_eq!(scope.len(), domains.len());
        DomainBox { scope, domains }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn get(&self, v: VarId) -> &Domain {
        let idx = self.scope.index_of(v).expect("variable not in box's scope");
        &self.domains[idx]
    }

    pub fn get_by_index(&self, idx: usize) -> &Domain {
        &self.domains[idx]
    }

    pub fn set(&mut self, v: VarId, d: Domain) {
        let idx = self.scope.index_of(v).expect("variable not in box's scope");
        self.domains[idx] = d;
    }

    pub fn set_by_index(&mut self, idx: usize, d: Domain) {
        self.domains[idx] = d;
    }

    pub fn is_empty(&self) -> bool {
        self.domains.iter().any(|d| d.is_empty())
    }

    /// All variable domains have width at or below their declared
    /// tolerance (spec §5's node stop criterion).
    pub fn within_tolerances(&self, variables: &[crate::variable::Variable]) -> bool {
        self.domains
            .iter()
            .zip(variables.iter())
            .all(|(d, v)| d.width_below(v.tolerance()))
    }

    /// The variable (by scope index) whose tolerance-normalised width is
    /// largest, used by the largest-width splitter.
    pub fn widest_index(&self, variables: &[crate::variable::Variable]) -> Option<usize> {
        self.domains
            .iter()
            .zip(variables.iter())
            .enumerate()
            .filter(|(_, (d, v))| !d.width_below(v.tolerance()))
            .max_by(|(_, (d1, v1)), (_, (d2, v2))| {
                let w1 = d1.width() / v1.tolerance().max(f64::MIN_POSITIVE);
                let w2 = d2.width() / v2.tolerance().max(f64::MIN_POSITIVE);
                w1.partial_cmp(&w2).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }

    /// Splits the domain at scope index `index` at `point`, producing the
    /// two child boxes the branch step pushes onto the node store.
    pub fn split_at(&self, index: usize, point: f64) -> (DomainBox, DomainBox) {
        let (left_d, right_d) = self.domains[index].split_at(point);
        let mut left = self.clone();
        let mut right = self.clone();
        left.set_by_index(index, left_d);
        right.set_by_index(index, right_d);
        (left, right)
    }

    pub fn to_interval_box(&self) -> IntervalBox {
        IntervalBox {
            scope: self.scope.clone(),
            intervals: self.domains.iter().map(Domain::hull).collect(),
        }
    }
}

/// The interval-hull projection of a [`DomainBox`]: what every contractor
/// actually reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalBox {
    scope: Scope,
    intervals: Vec<Interval>,
}

impl IntervalBox {
    pub fn new(scope: Scope, intervals: Vec<Interval>) -> Self {
        assert_eq!(scope.len(), intervals.len());
        IntervalBox { scope, intervals }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn get(&self, v: VarId) -> Interval {
        let idx = self.scope.index_of(v).expect("variable not in box's scope");
        self.intervals[idx]
    }

    pub fn get_by_index(&self, idx: usize) -> Interval {
        self.intervals[idx]
    }

    pub fn set(&mut self, v: VarId, i: Interval) {
        let idx = self.scope.index_of(v).expect("variable not in box's scope");
        self.intervals[idx] = i;
    }

    pub fn set_by_index(&mut self, idx: usize, i: Interval) {
        self.intervals[idx] = i;
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.iter().any(Interval::is_empty)
    }

    /// Writes this box's hulls back into a `DomainBox`'s per-variable
    /// domains, reintroducing gaps for disconnected domains.
    pub fn write_back(&self, target: &mut DomainBox) {
        for idx in 0..self.intervals.len() {
            let contracted = target.domains[idx].intersect_interval(&self.intervals[idx]);
            target.set_by_index(idx, contracted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VarId;

    fn scope2() -> Scope {
        Scope::new([VarId(0), VarId(1)])
    }

    #[test]
    fn interval_union_reintroduces_gap_on_intersection() {
        let d = Domain::IntervalUnion(vec![Interval::new(0.0, 1.0), Interval::new(4.0, 5.0)]);
        let narrowed = d.intersect_interval(&Interval::new(0.5, 4.5));
        match narrowed {
            Domain::IntervalUnion(parts) => {
                assert_eq!(parts.len(), 2);
                assert!((parts[0].lo() - 0.5).abs() < 1e-9);
                assert!((parts[1].hi() - 4.5).abs() < 1e-9);
            }
            _ => panic!("expected IntervalUnion"),
        }
    }

    #[test]
    fn int_set_filters_out_of_range_values() {
        let d = Domain::IntSet(vec![0, 2, 4, 6]);
        let narrowed = d.intersect_interval(&Interval::new(1.0, 5.0));
        assert_eq!(narrowed, Domain::IntSet(vec![2, 4]));
    }

    #[test]
    fn domain_box_round_trips_through_interval_box() {
        let scope = scope2();
        let db = DomainBox::new(
            scope.clone(),
            vec![
                Domain::Interval(Interval::new(0.0, 1.0)),
                Domain::IntRange(0, 10),
            ],
        );
        let ib = db.to_interval_box();
        assert_eq!(ib.get(VarId(1)), Interval::new(0.0, 10.0));
    }

    #[test]
    fn domain_box_split_at_produces_two_disjoint_halves() {
        let scope = scope2();
        let db = DomainBox::new(
            scope,
            vec![Domain::Interval(Interval::new(0.0, 10.0)), Domain::IntRange(0, 10)],
        );
        let (left, right) = db.split_at(0, 4.0);
        assert_eq!(left.get_by_index(0).hull(), Interval::new(0.0, 4.0));
        assert_eq!(right.get_by_index(0).hull(), Interval::new(4.0, 10.0));
        assert_eq!(left.get_by_index(1), db.get_by_index(1));
    }

    #[test]
    fn interval_box_write_back_preserves_int_range_rounding() {
        let scope = scope2();
        let mut db = DomainBox::new(
            scope.clone(),
            vec![
                Domain::Interval(Interval::new(0.0, 1.0)),
                Domain::IntRange(0, 10),
            ],
        );
        let mut ib = db.to_interval_box();
        ib.set(VarId(1), Interval::new(2.3, 7.8));
        ib.write_back(&mut db);
        assert_eq!(db.get(VarId(1)), &Domain::IntRange(3, 7));
    }
}
