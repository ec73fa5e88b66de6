//! A bounded-variable linear programming oracle for the polytope
//! contractor (spec §4.5/§6). The teacher's own interior-point machinery
//! (`lp::mpc`) targets large sparse systems loaded from MPS files and
//! doesn't give us a dual certificate scoped to a handful of box
//! variables, so this is a small dense two-phase primal simplex instead —
//! sized for the tens-of-rows-and-columns relaxations the polytope
//! contractor builds per node, not for industrial LPs.

use derive_more::{Display, Error};

/// A handle to a variable registered with an [`LpOracle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LpVar(pub usize);

/// Which direction `optimize` should push the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// Outcome of an `optimize` call, mirroring the solver-wide [`crate::Status`]
/// vocabulary (the LP oracle is itself a small iterative solver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LpStatus {
    #[display("optimal")]
    Optimal,
    #[display("infeasible")]
    Infeasible,
    #[display("unbounded")]
    Unbounded,
    #[display("iteration limit reached")]
    Other,
}

#[derive(Debug, Display, Error, PartialEq)]
pub enum LpError {
    #[display("no variables registered")]
    Empty,
}

/// The LP relaxation oracle interface the polytope contractor programs
/// against: incrementally build bounded variables and linear constraints,
/// then optimize a linear objective over them.
pub trait LpOracle {
    fn add_bounded_variable(&mut self, lo: f64, hi: f64) -> LpVar;
    fn add_linear_constraint(&mut self, lo: f64, coeffs: &[(LpVar, f64)], hi: f64);
    fn set_objective(&mut self, coeffs: &[(LpVar, f64)]);
    fn optimize(&mut self, sense: Sense) -> LpStatus;
    fn certified_optimum(&self) -> Option<f64>;
    fn primal_solution(&self) -> Option<Vec<f64>>;
    /// The dual vector for the direction actually solved internally —
    /// `minimize objective` for `Sense::Minimize`, `minimize -objective`
    /// for `Sense::Maximize` — not re-oriented to the caller's `Sense`.
    /// Paired with the *un-flipped* row coefficients/bounds a caller
    /// registered via `add_linear_constraint` and the internal cost
    /// (`objective` or its negation, matching the `Sense` last solved), this
    /// is exactly the input a Neumaier-Shcherbina dual certificate needs;
    /// see [`ns_certified_lower_bound`].
    fn dual_solution(&self) -> Option<Vec<f64>>;
}

struct RawConstraint {
    coeffs: Vec<(usize, f64)>,
    lo: f64,
    hi: f64,
}

/// A dense bounded-variable simplex oracle. Rebuilds its tableau from
/// scratch on every `optimize` call, which is wasteful for repeated
/// re-solves of a slowly changing polytope but keeps the bookkeeping
/// simple for the box-sized relaxations this crate builds.
pub struct SimplexOracle {
    var_bounds: Vec<(f64, f64)>,
    constraints: Vec<RawConstraint>,
    objective: Vec<f64>,
    last_solution: Option<Solution>,
}

struct Solution {
    values: Vec<f64>,
    objective: f64,
    duals: Vec<f64>,
}

const TOL: f64 = 1e-9;
const MAX_ITER: usize = 2000;

impl SimplexOracle {
    pub fn new() -> Self {
        SimplexOracle {
            var_bounds: Vec::new(),
            constraints: Vec::new(),
            objective: Vec::new(),
            last_solution: None,
        }
    }

    fn n_structural(&self) -> usize {
        self.var_bounds.len()
    }

    /// The objective coefficients from the most recent `set_objective` call.
    pub fn objective_coeffs(&self) -> &[f64] {
        &self.objective
    }

    /// Bounds `[lo, hi]` for each structural variable, by index.
    pub fn variable_bounds(&self) -> &[(f64, f64)] {
        &self.var_bounds
    }

    /// Every registered row as `(coeffs, lo, hi)`, in the original
    /// (un-flipped) orientation a caller registered via
    /// `add_linear_constraint` — not the internally sign-adjusted form
    /// `optimize` builds its tableau from.
    pub fn constraint_rows(&self) -> Vec<(&[(usize, f64)], f64, f64)> {
        self.constraints.iter().map(|c| (c.coeffs.as_slice(), c.lo, c.hi)).collect()
    }
}

impl Default for SimplexOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl LpOracle for SimplexOracle {
    fn add_bounded_variable(&mut self, lo: f64, hi: f64) -> LpVar {
        let idx = self.var_bounds.len();
        self.var_bounds.push((lo, hi));
        self.objective.push(0.0);
        LpVar(idx)
    }

    fn add_linear_constraint(&mut self, lo: f64, coeffs: &[(LpVar, f64)], hi: f64) {
        self.constraints.push(RawConstraint {
            coeffs: coeffs.iter().map(|(v, c)| (v.0, *c)).collect(),
            lo,
            hi,
        });
    }

    fn set_objective(&mut self, coeffs: &[(LpVar, f64)]) {
        self.objective.iter_mut().for_each(|c| *c = 0.0);
        for (v, c) in coeffs {
            self.objective[v.0] = *c;
        }
    }

    fn optimize(&mut self, sense: Sense) -> LpStatus {
        self.last_solution = None;
        if self.var_bounds.is_empty() {
            return LpStatus::Other;
        }
        let n = self.n_structural();
        let m = self.constraints.len();

        // Column layout: [0, n) structural, [n, n+m) slack, [n+m, n+2m) artificial.
        let n_slack = m;
        let n_art = m;
        let n_total = n + n_slack + n_art;

        let mut origin = vec![0.0_f64; n_total];
        let mut width = vec![0.0_f64; n_total];
        for (j, (lo, hi)) in self.var_bounds.iter().enumerate() {
            origin[j] = *lo;
            width[j] = hi - lo;
        }

        let mut tab = vec![vec![0.0_f64; n_total + 1]; m];
        for (row, con) in self.constraints.iter().enumerate() {
            let (eff_rhs, slack_hi, sign): (f64, f64, f64) = if con.hi.is_finite() {
                (con.hi, if con.lo.is_finite() { con.hi - con.lo } else { f64::INFINITY }, 1.0)
            } else if con.lo.is_finite() {
                (con.lo, f64::INFINITY, -1.0)
            } else {
                (0.0, f64::INFINITY, 1.0)
            };

            for &(j, c) in &con.coeffs {
                tab[row][j] = sign * c;
            }
            let slack_col = n + row;
            tab[row][slack_col] = 1.0;
            origin[slack_col] = 0.0;
            width[slack_col] = slack_hi;

            // RHS after shifting every structural var to its lower bound.
            let structural_at_origin: f64 = con.coeffs.iter().map(|&(j, c)| sign * c * origin[j]).sum();
            tab[row][n_total] = sign * eff_rhs - structural_at_origin;
        }

        let mut basis = vec![0usize; m];
        let mut at_upper = vec![false; n_total];
        for row in 0..m {
            let art_col = n + n_slack + row;
            let needed = tab[row][n_total];
            let art_sign = if needed >= 0.0 { 1.0 } else { -1.0 };
            tab[row][art_col] = art_sign;
            origin[art_col] = 0.0;
            width[art_col] = f64::INFINITY;
            basis[row] = art_col;
            // Normalize the row so the artificial's pivot entry is +1.
            if art_sign < 0.0 {
                for v in tab[row].iter_mut() {
                    *v = -*v;
                }
            }
        }

        let phase1_cost: Vec<f64> = (0..n_total)
            .map(|j| if j >= n + n_slack { 1.0 } else { 0.0 })
            .collect();
        if !run_simplex(&mut tab, &mut basis, &mut at_upper, &width, &phase1_cost, m, n_total, MAX_ITER) {
            return LpStatus::Other;
        }
        let phase1_value = basic_values(&tab, &basis, &at_upper, &width, m, n_total)
            .iter()
            .enumerate()
            .map(|(row, v)| if basis[row] >= n + n_slack { *v } else { 0.0 })
            .sum::<f64>();
        if phase1_value.abs() > 1e-6 {
            return LpStatus::Infeasible;
        }

        // Pin artificial columns at zero width so phase 2 can't reuse them.
        let mut width2 = width.clone();
        for j in (n + n_slack)..n_total {
            width2[j] = 0.0;
        }
        let sign = match sense {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        let mut phase2_cost = vec![0.0; n_total];
        for j in 0..n {
            phase2_cost[j] = sign * self.objective[j];
        }
        let ok = run_simplex(&mut tab, &mut basis, &mut at_upper, &width2, &phase2_cost, m, n_total, MAX_ITER);

        let values = basic_values(&tab, &basis, &at_upper, &width2, m, n_total);
        let mut x = vec![0.0_f64; n_total];
        for j in 0..n_total {
            x[j] = origin[j] + if at_upper[j] { width2[j] } else { 0.0 };
        }
        for (row, &b) in basis.iter().enumerate() {
            x[b] = origin[b] + values[row];
        }
        let obj_value: f64 = (0..n).map(|j| self.objective[j] * x[j]).sum();

        // Dual for the internal `minimize phase2_cost` problem (slack
        // column `n+row` has coefficient exactly 1 in its row, so its
        // reduced cost is the negative of that row's shadow price); kept
        // un-flipped by `sense` so it pairs directly with `phase2_cost`
        // and the original row data in a Neumaier-Shcherbina check.
        let z = reduced_costs(&tab, &basis, &phase2_cost, m, n_total);
        let duals: Vec<f64> = (0..m).map(|row| -z[n + row]).collect();

        self.last_solution = Some(Solution {
            values: x[0..n].to_vec(),
            objective: obj_value,
            duals,
        });

        if !ok {
            return LpStatus::Other;
        }
        match unbounded_direction_found(&tab, &basis, &at_upper, &width2, &phase2_cost, m, n_total) {
            true => LpStatus::Unbounded,
            false => LpStatus::Optimal,
        }
    }

    fn certified_optimum(&self) -> Option<f64> {
        self.last_solution.as_ref().map(|s| s.objective)
    }

    fn primal_solution(&self) -> Option<Vec<f64>> {
        self.last_solution.as_ref().map(|s| s.values.clone())
    }

    fn dual_solution(&self) -> Option<Vec<f64>> {
        self.last_solution.as_ref().map(|s| s.duals.clone())
    }
}

/// A Neumaier-Shcherbina dual certificate: a rigorous lower bound on
/// `cost^T x` over every `x` satisfying `lo_i <= (row_i . x) <= hi_i` for
/// each row and `var_bounds[j].0 <= x_j <= var_bounds[j].1`, for *any* dual
/// vector `y` (not necessarily the simplex's reported optimum).
///
/// Derivation: for `z_j := cost_j - sum_i y_i * row_i[j]`,
/// `cost^T x = sum_j z_j * x_j + sum_i y_i * (row_i . x)` is an identity for
/// every `y` (substitute `z`'s definition and the sums telescope), so
/// lower-bounding each term over its known range gives a valid bound on
/// `cost^T x` regardless of rounding error in `y` or in whatever produced
/// it — the bound is only as tight as `y` is close to optimal, never
/// unsound. Every accumulation runs in outward-rounded interval arithmetic
/// so floating-point error in the bound itself can't flip the direction of
/// the inequality it's meant to certify.
pub fn ns_certified_lower_bound(
    cost: &[f64],
    rows: &[(&[(usize, f64)], f64, f64)],
    var_bounds: &[(f64, f64)],
    y: &[f64],
) -> Option<f64> {
    use crate::interval::Interval;

    let mut z: Vec<Interval> = cost.iter().map(|&c| Interval::singleton(c)).collect();
    let mut total = Interval::ZERO;
    for (&(coeffs, lo, hi), &yi) in rows.iter().zip(y.iter()) {
        if yi == 0.0 {
            continue;
        }
        let yi_iv = Interval::singleton(yi);
        for &(j, c) in coeffs {
            z[j] = z[j].sub(&yi_iv.mul(&Interval::singleton(c)));
        }
        total = total.add(&yi_iv.mul(&Interval::new(lo, hi)));
    }
    for (j, &(xl, xh)) in var_bounds.iter().enumerate() {
        total = total.add(&z[j].mul(&Interval::new(xl, xh)));
    }
    let bound = total.lo();
    if bound.is_finite() {
        Some(bound)
    } else {
        None
    }
}

fn reduced_costs(tab: &[Vec<f64>], basis: &[usize], cost: &[f64], m: usize, n_total: usize) -> Vec<f64> {
    let mut z = vec![0.0; n_total + 1];
    for j in 0..=n_total {
        let mut acc = if j < n_total { cost[j] } else { 0.0 };
        for row in 0..m {
            acc -= cost[basis[row]] * tab[row][j];
        }
        z[j] = acc;
    }
    z
}

fn basic_values(tab: &[Vec<f64>], basis: &[usize], at_upper: &[bool], width: &[f64], m: usize, n_total: usize) -> Vec<f64> {
    let mut vals = vec![0.0; m];
    for row in 0..m {
        let mut v = tab[row][n_total];
        for j in 0..n_total {
            if j == basis[row] {
                continue;
            }
            if at_upper[j] && width[j].is_finite() {
                v -= tab[row][j] * width[j];
            }
        }
        vals[row] = v;
    }
    vals
}

/// Runs bounded-variable primal simplex (Bland's rule, no cycling) in
/// place on `tab`/`basis`/`at_upper` until optimal or `max_iter` pivots.
/// Returns `false` if the iteration limit was hit before optimality.
#[allow(clippy::too_many_arguments)]
fn run_simplex(
    tab: &mut [Vec<f64>],
    basis: &mut [usize],
    at_upper: &mut [bool],
    width: &[f64],
    cost: &[f64],
    m: usize,
    n_total: usize,
    max_iter: usize,
) -> bool {
    for _ in 0..max_iter {
        let z = reduced_costs(tab, basis, cost, m, n_total);
        let in_basis = |j: usize| basis.contains(&j);

        let mut enter = None;
        for j in 0..n_total {
            if in_basis(j) {
                continue;
            }
            if !at_upper[j] && z[j] < -TOL {
                enter = Some((j, 1.0));
                break;
            }
            if at_upper[j] && width[j] > 0.0 && z[j] > TOL {
                enter = Some((j, -1.0));
                break;
            }
        }
        let (enter, direction) = match enter {
            Some(e) => e,
            None => return true,
        };

        let basic_vals = basic_values(tab, basis, at_upper, width, m, n_total);
        let mut best_limit = width[enter];
        // `hit_upper` records, for the blocking row (if any), whether the
        // leaving variable is pinned to its upper bound (true) or lower
        // bound / zero (false) once it leaves the basis.
        let mut best_row: Option<(usize, bool)> = None;
        for row in 0..m {
            let alpha = tab[row][enter] * direction;
            if alpha > TOL {
                let limit = basic_vals[row] / alpha;
                if limit < best_limit - 1e-12 {
                    best_limit = limit.max(0.0);
                    best_row = Some((row, false));
                }
            } else if alpha < -TOL {
                let cap = width[basis[row]];
                if cap.is_finite() {
                    let limit = (cap - basic_vals[row]) / (-alpha);
                    if limit < best_limit - 1e-12 {
                        best_limit = limit.max(0.0);
                        best_row = Some((row, true));
                    }
                }
            }
        }

        match best_row {
            None => {
                if !best_limit.is_finite() {
                    // Unbounded; caller checks this again after the loop via
                    // unbounded_direction_found, so just stop iterating here.
                    return true;
                }
                at_upper[enter] = !at_upper[enter];
            }
            Some((row, leaving_at_upper)) => {
                let pivot = tab[row][enter];
                let pivot_row: Vec<f64> = tab[row].iter().map(|v| v / pivot).collect();
                tab[row].copy_from_slice(&pivot_row);
                for r in 0..m {
                    if r == row {
                        continue;
                    }
                    let factor = tab[r][enter];
                    if factor.abs() < 1e-14 {
                        continue;
                    }
                    for k in 0..=n_total {
                        tab[r][k] -= factor * pivot_row[k];
                    }
                }
                let leaving = basis[row];
                at_upper[leaving] = leaving_at_upper;
                basis[row] = enter;
            }
        }
    }
    false
}

fn unbounded_direction_found(
    tab: &[Vec<f64>],
    basis: &[usize],
    at_upper: &[bool],
    width: &[f64],
    cost: &[f64],
    m: usize,
    n_total: usize,
) -> bool {
    let z = reduced_costs(tab, basis, cost, m, n_total);
    for j in 0..n_total {
        if basis.contains(&j) {
            continue;
        }
        let improving = (!at_upper[j] && z[j] < -TOL) || (at_upper[j] && z[j] > TOL);
        if !improving {
            continue;
        }
        let direction = if !at_upper[j] { 1.0 } else { -1.0 };
        let blocked = (0..m).any(|row| {
            let alpha = tab[row][j] * direction;
            alpha > TOL || (alpha < -TOL && width[basis[row]].is_finite())
        }) || width[j].is_finite();
        if !blocked {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maximizes_a_bounded_two_variable_lp() {
        // max x + y  s.t. x + 2y <= 4, x in [0,3], y in [0,3]  => x=3,y=0.5 -> obj 3.5? check: x+2y<=4, maximize x+y.
        // At x=3: y<=0.5 -> obj=3.5. At x=0: y<=2 -> obj=2. At x=2,y=1: obj=3. Optimum is x=3,y=0.5, obj=3.5.
        let mut lp = SimplexOracle::new();
        let x = lp.add_bounded_variable(0.0, 3.0);
        let y = lp.add_bounded_variable(0.0, 3.0);
        lp.add_linear_constraint(f64::NEG_INFINITY, &[(x, 1.0), (y, 2.0)], 4.0);
        lp.set_objective(&[(x, 1.0), (y, 1.0)]);
        let status = lp.optimize(Sense::Maximize);
        assert_eq!(status, LpStatus::Optimal);
        let obj = lp.certified_optimum().unwrap();
        assert!((obj - 3.5).abs() < 1e-6, "unexpected objective {obj}");
    }

    #[test]
    fn dual_certificate_reproduces_the_maximize_optimum() {
        // Same LP as `maximizes_a_bounded_two_variable_lp`: max x + y s.t.
        // x + 2y <= 4, x,y in [0,3]. The dual certificate must recover the
        // exact optimum 3.5 here (the vertex is non-degenerate, so the
        // bound is tight, not merely sound).
        let mut lp = SimplexOracle::new();
        let x = lp.add_bounded_variable(0.0, 3.0);
        let y = lp.add_bounded_variable(0.0, 3.0);
        lp.add_linear_constraint(f64::NEG_INFINITY, &[(x, 1.0), (y, 2.0)], 4.0);
        lp.set_objective(&[(x, 1.0), (y, 1.0)]);
        assert_eq!(lp.optimize(Sense::Maximize), LpStatus::Optimal);

        let y_dual = lp.dual_solution().unwrap();
        let rows = lp.constraint_rows();
        let phase2_cost: Vec<f64> = lp.objective_coeffs().iter().map(|c| -c).collect();
        let lower = ns_certified_lower_bound(&phase2_cost, &rows, lp.variable_bounds(), &y_dual).unwrap();
        let certified_max = -lower;
        assert!((certified_max - 3.5).abs() < 1e-6, "unexpected certified bound {certified_max}");
    }

    #[test]
    fn dual_certificate_is_sound_for_an_arbitrary_dual_vector() {
        // Weak duality holds for *any* y, not just the optimum: a garbage
        // dual still yields a valid (if loose) lower bound, never one that
        // overshoots the true optimum of 3.5.
        let mut lp = SimplexOracle::new();
        let x = lp.add_bounded_variable(0.0, 3.0);
        let y = lp.add_bounded_variable(0.0, 3.0);
        lp.add_linear_constraint(f64::NEG_INFINITY, &[(x, 1.0), (y, 2.0)], 4.0);
        lp.set_objective(&[(x, 1.0), (y, 1.0)]);
        assert_eq!(lp.optimize(Sense::Maximize), LpStatus::Optimal);

        let rows = lp.constraint_rows();
        let phase2_cost: Vec<f64> = lp.objective_coeffs().iter().map(|c| -c).collect();
        let lower = ns_certified_lower_bound(&phase2_cost, &rows, lp.variable_bounds(), &[-3.0]).unwrap();
        // `lower` bounds `phase2_cost^T x` (true minimum -3.5) from below,
        // so it must never exceed -3.5; negating it back to the Maximize
        // sense must never undershoot the true optimum 3.5.
        assert!(lower <= -3.5 + 1e-9, "unsound: {lower} exceeds the true phase-2 minimum");
        assert!(-lower >= 3.5 - 1e-9, "unsound: certified upper bound {} undershoots the true optimum", -lower);
    }

    #[test]
    fn detects_infeasible_box() {
        let mut lp = SimplexOracle::new();
        let x = lp.add_bounded_variable(0.0, 1.0);
        lp.add_linear_constraint(5.0, &[(x, 1.0)], 10.0);
        lp.set_objective(&[(x, 1.0)]);
        let status = lp.optimize(Sense::Minimize);
        assert_eq!(status, LpStatus::Infeasible);
    }

    #[test]
    fn minimizes_a_single_variable_equality() {
        let mut lp = SimplexOracle::new();
        let x = lp.add_bounded_variable(-10.0, 10.0);
        lp.add_linear_constraint(2.0, &[(x, 1.0)], 2.0);
        lp.set_objective(&[(x, 1.0)]);
        let status = lp.optimize(Sense::Minimize);
        assert_eq!(status, LpStatus::Optimal);
        assert!((lp.certified_optimum().unwrap() - 2.0).abs() < 1e-6);
    }
}
