//! Linear relaxations fed to the [`super::oracle::LpOracle`] (spec §4.5),
//! one builder per [`crate::contract::polytope::PolytopeStyle`]:
//!
//! * `Taylor` — a first-order enclosure of the whole function expanded at
//!   one of the box's corners (spec §4.5), tightened around any top-level
//!   product with the standard McCormick bilinear envelope.
//! * `Rlt` — walks the whole expression looking for bilinear (`x*y`) and
//!   square (`x^2`) sub-terms on plain variables, reformulates each with
//!   its convex envelope (a fresh auxiliary LP variable tied to the
//!   factors by the McCormick/tangent-line inequalities), and linearizes
//!   everything else in the expression around those auxiliaries.
//! * `Affine` — evaluates the function to a [`crate::affine::AffineForm`]
//!   and emits one linear term per noise symbol: variable-tied symbols map
//!   straight back onto their box variable, internal symbols (minted by
//!   nonlinear affine ops) get a fresh `[-1, 1]` auxiliary variable each.

use std::collections::HashMap;

use super::oracle::{LpOracle, LpVar};
use crate::affine::{AffineForm, NoiseGen};
use crate::contract::polytope::PolytopeStyle;
use crate::dag::{Dag, DagFun, NodeId, Op};
use crate::domain::IntervalBox;
use crate::interval::Interval;
use crate::rand::Corner;
use crate::variable::VarId;

/// Registers one bounded variable per scope entry and returns the mapping
/// from variable to its LP handle, ready for [`linearize`].
pub fn register_box_variables(oracle: &mut dyn LpOracle, box_: &IntervalBox) -> HashMap<VarId, LpVar> {
    let scope = box_.scope();
    let mut map = HashMap::with_capacity(scope.len());
    for &v in scope.vars() {
        let i = box_.get(v);
        map.insert(v, oracle.add_bounded_variable(i.lo(), i.hi()));
    }
    map
}

/// Adds a sound linear relaxation of `fun`'s constraint `image.lo <= f(x)
/// <= image.hi` to `oracle`, built the way `style` says. `corners` gives the
/// per-variable box endpoint the `Taylor` style expands around (spec §4.5);
/// ignored by `Rlt` and `Affine` except as their own fallback to `Taylor`.
pub fn linearize(
    dag: &Dag,
    fun: &DagFun,
    box_: &IntervalBox,
    oracle: &mut dyn LpOracle,
    vars: &HashMap<VarId, LpVar>,
    style: PolytopeStyle,
    corners: &HashMap<VarId, Corner>,
) {
    match style {
        PolytopeStyle::Taylor => taylor_style(dag, fun, box_, oracle, vars, corners),
        PolytopeStyle::Rlt => rlt_linearize(dag, fun, box_, oracle, vars, corners),
        PolytopeStyle::Affine => affine_linearize(dag, fun, box_, oracle, vars, corners),
    }
}

/// Falls back to the Taylor enclosure whenever the root isn't a product
/// (or the product's factors aren't both plain variables).
fn taylor_style(
    dag: &Dag,
    fun: &DagFun,
    box_: &IntervalBox,
    oracle: &mut dyn LpOracle,
    vars: &HashMap<VarId, LpVar>,
    corners: &HashMap<VarId, Corner>,
) {
    if let Op::Mul = dag.op(fun.root()) {
        let children = dag.children(fun.root());
        if children.len() == 2 {
            if let (Op::Var(vx), Op::Var(vy)) = (dag.op(children[0]), dag.op(children[1])) {
                mccormick_envelope(*vx, *vy, fun.image(), box_, oracle, vars);
                return;
            }
        }
    }
    taylor_linearize(dag, fun, box_, oracle, vars, corners);
}

/// Corner-anchored first-order Taylor linearization (spec §4.5: "at a pair
/// of opposite corners of the box, take first-order Taylor expansions with
/// a remainder interval"). Expanding at a corner `c` (rather than the
/// midpoint) makes `x_i - c_i` single-signed across the whole box, so for
/// each variable one gradient-interval endpoint gives an *exact* affine
/// underestimator of `f` and the other endpoint gives an exact affine
/// overestimator — no symmetric remainder padding is needed at all. That
/// sandwich `A_lo(x) <= f(x) <= A_hi(x)` turns directly into the two useful
/// one-sided rows a corner choice is meant to buy: `A_lo(x) <= image.hi`
/// (whenever `image.hi` is finite) and `A_hi(x) >= image.lo` (whenever
/// `image.lo` is finite).
fn taylor_linearize(
    dag: &Dag,
    fun: &DagFun,
    box_: &IntervalBox,
    oracle: &mut dyn LpOracle,
    vars: &HashMap<VarId, LpVar>,
    corners: &HashMap<VarId, Corner>,
) {
    let scope = fun.scope();
    let corner_of = |v: VarId| corners.get(&v).copied().unwrap_or(Corner::Lo);
    let corner_box = IntervalBox::new(
        scope.clone(),
        scope
            .vars()
            .iter()
            .map(|&v| {
                let iv = box_.get(v);
                Interval::singleton(match corner_of(v) {
                    Corner::Lo => iv.lo(),
                    Corner::Hi => iv.hi(),
                })
            })
            .collect(),
    );
    let f_c = fun.eval(dag, &corner_box);
    let grad = fun.diff(dag, box_);

    let mut lo_coeffs = Vec::with_capacity(scope.len());
    let mut hi_coeffs = Vec::with_capacity(scope.len());
    let mut lo_shift = 0.0;
    let mut hi_shift = 0.0;
    let mut finite = true;
    for (idx, &v) in scope.vars().iter().enumerate() {
        let lp_var = match vars.get(&v) {
            Some(lv) => *lv,
            None => continue,
        };
        let g = grad[idx];
        let corner_value = corner_box.get(v).lo();
        // The underestimate takes the gradient bound that pairs with
        // (x_i - c_i)'s sign to make the product nonnegative everywhere;
        // the overestimate takes the other bound.
        let (a_lo, a_hi) = match corner_of(v) {
            Corner::Lo => (g.lo(), g.hi()),
            Corner::Hi => (g.hi(), g.lo()),
        };
        if !a_lo.is_finite() || !a_hi.is_finite() {
            finite = false;
        }
        lo_coeffs.push((lp_var, a_lo));
        hi_coeffs.push((lp_var, a_hi));
        lo_shift += a_lo * corner_value;
        hi_shift += a_hi * corner_value;
    }

    if !finite || !f_c.lo().is_finite() || !f_c.hi().is_finite() {
        // No sound corner-anchored linearization exists (unbounded gradient
        // or corner value); leave this constraint to the propagator's other
        // contractors rather than emit a row with an infinite coefficient.
        return;
    }

    let image = fun.image();
    if image.hi().is_finite() {
        // A_lo(x) <= image.hi, since A_lo(x) <= f(x) <= image.hi for every
        // feasible x.
        oracle.add_linear_constraint(f64::NEG_INFINITY, &lo_coeffs, image.hi() - f_c.lo() + lo_shift);
    }
    if image.lo().is_finite() {
        // A_hi(x) >= image.lo, since image.lo <= f(x) <= A_hi(x) for every
        // feasible x.
        oracle.add_linear_constraint(image.lo() - f_c.hi() + hi_shift, &hi_coeffs, f64::INFINITY);
    }
}

fn mccormick_envelope(
    vx: VarId,
    vy: VarId,
    image: Interval,
    box_: &IntervalBox,
    oracle: &mut dyn LpOracle,
    vars: &HashMap<VarId, LpVar>,
) -> Option<LpVar> {
    let (&x, &y) = (vars.get(&vx)?, vars.get(&vy)?);
    let xi = box_.get(vx);
    let yi = box_.get(vy);
    let (xl, xh, yl, yh) = (xi.lo(), xi.hi(), yi.lo(), yi.hi());

    let z = oracle.add_bounded_variable(image.lo(), image.hi());

    // z >= xl*y + yl*x - xl*yl
    oracle.add_linear_constraint(-(xl * yl), &[(z, 1.0), (y, -xl), (x, -yl)], f64::INFINITY);
    // z >= xh*y + yh*x - xh*yh
    oracle.add_linear_constraint(-(xh * yh), &[(z, 1.0), (y, -xh), (x, -yh)], f64::INFINITY);
    // z <= xh*y + yl*x - xh*yl
    oracle.add_linear_constraint(f64::NEG_INFINITY, &[(z, 1.0), (y, -xh), (x, -yl)], -(xh * yl));
    // z <= xl*y + yh*x - xl*yh
    oracle.add_linear_constraint(f64::NEG_INFINITY, &[(z, 1.0), (y, -xl), (x, -yh)], -(xl * yh));
    Some(z)
}

/// Convex envelope for `z = x^2` on `x in [xl, xh]`: two tangents for the
/// lower bound (every tangent underestimates a convex function) and the
/// secant through the endpoints for the upper bound.
fn sqr_envelope(v: VarId, box_: &IntervalBox, oracle: &mut dyn LpOracle, vars: &HashMap<VarId, LpVar>) -> Option<LpVar> {
    let &x = vars.get(&v)?;
    let xi = box_.get(v);
    let (xl, xh) = (xi.lo(), xi.hi());
    if !xl.is_finite() || !xh.is_finite() {
        return None;
    }
    let image = xi.sqr();
    let z = oracle.add_bounded_variable(image.lo(), image.hi());
    // z >= 2*xl*x - xl^2
    oracle.add_linear_constraint(-(xl * xl), &[(z, 1.0), (x, -2.0 * xl)], f64::INFINITY);
    // z >= 2*xh*x - xh^2
    oracle.add_linear_constraint(-(xh * xh), &[(z, 1.0), (x, -2.0 * xh)], f64::INFINITY);
    // z <= (xl+xh)*x - xl*xh
    oracle.add_linear_constraint(f64::NEG_INFINITY, &[(z, 1.0), (x, -(xl + xh))], -(xl * xh));
    Some(z)
}

fn mccormick_envelope_aux(
    vx: VarId,
    vy: VarId,
    box_: &IntervalBox,
    oracle: &mut dyn LpOracle,
    vars: &HashMap<VarId, LpVar>,
) -> Option<LpVar> {
    let product = box_.get(vx).mul(&box_.get(vy));
    mccormick_envelope(vx, vy, product, box_, oracle, vars)
}

/// A sound linear enclosure of one DAG node's value over the box:
/// `value in constant + sum(coeff_j * lp_var_j) +/- slack`.
#[derive(Clone)]
struct LinearCombo {
    coeffs: HashMap<usize, f64>,
    constant: f64,
    slack: f64,
}

impl LinearCombo {
    fn constant(value: f64, slack: f64) -> Self {
        LinearCombo { coeffs: HashMap::new(), constant: value, slack }
    }

    fn var(idx: usize, coeff: f64) -> Self {
        let mut coeffs = HashMap::with_capacity(1);
        coeffs.insert(idx, coeff);
        LinearCombo { coeffs, constant: 0.0, slack: 0.0 }
    }

    fn add_term(&mut self, idx: usize, coeff: f64) {
        *self.coeffs.entry(idx).or_insert(0.0) += coeff;
    }

    fn add(&self, other: &LinearCombo) -> LinearCombo {
        let mut coeffs = self.coeffs.clone();
        for (&idx, &c) in &other.coeffs {
            *coeffs.entry(idx).or_insert(0.0) += c;
        }
        LinearCombo { coeffs, constant: self.constant + other.constant, slack: self.slack + other.slack }
    }

    fn neg(&self) -> LinearCombo {
        LinearCombo {
            coeffs: self.coeffs.iter().map(|(&idx, &c)| (idx, -c)).collect(),
            constant: -self.constant,
            slack: self.slack,
        }
    }
}

fn opaque_combo(dag: &Dag, node: NodeId, box_: &IntervalBox) -> LinearCombo {
    let iv = dag.eval_interval(node, box_);
    LinearCombo::constant(iv.midpoint(), 0.5 * iv.width())
}

/// Reformulation-linearization (spec §4.5): walks the expression looking
/// for bilinear (`x*y`) and square (`x^2`) sub-terms whose factors are
/// plain scope variables, ties each to a fresh auxiliary LP variable via
/// its convex envelope, and linearizes everything else (`+`, `-`, `neg`,
/// the pre-folded `Lin` leaf) by direct pass-through. Any other nonlinear
/// node (a product of non-variable sub-expressions, `sin`/`exp`/`sqrt`/...)
/// is bounded opaquely by its own interval range — sound, just not as
/// tight as reformulating it too.
fn rlt_combo(
    dag: &Dag,
    node: NodeId,
    box_: &IntervalBox,
    oracle: &mut dyn LpOracle,
    vars: &HashMap<VarId, LpVar>,
    cache: &mut HashMap<NodeId, LinearCombo>,
) -> LinearCombo {
    if let Some(combo) = cache.get(&node) {
        return combo.clone();
    }
    let combo = match dag.op(node) {
        Op::Const(c) => LinearCombo::constant(c.midpoint(), 0.5 * c.width()),
        Op::Var(v) => match vars.get(v) {
            Some(lv) => LinearCombo::var(lv.0, 1.0),
            None => {
                let iv = box_.get(*v);
                LinearCombo::constant(iv.midpoint(), 0.5 * iv.width())
            }
        },
        Op::Lin(lin) => {
            let mut combo = LinearCombo::constant(lin.constant.midpoint(), 0.5 * lin.constant.width());
            for &(v, c) in &lin.terms {
                let coeff_mid = c.midpoint();
                let coeff_rad = 0.5 * c.width();
                let vi = box_.get(v);
                match vars.get(&v) {
                    Some(lv) => {
                        combo.add_term(lv.0, coeff_mid);
                        combo.slack += coeff_rad * vi.lo().abs().max(vi.hi().abs());
                    }
                    None => {
                        combo.constant += coeff_mid * vi.midpoint();
                        combo.slack += coeff_mid.abs() * 0.5 * vi.width() + coeff_rad * (vi.midpoint().abs() + 0.5 * vi.width());
                    }
                }
            }
            combo
        }
        Op::Neg => rlt_combo(dag, dag.children(node)[0], box_, oracle, vars, cache).neg(),
        Op::Add => {
            let children = dag.children(node).to_vec();
            let a = rlt_combo(dag, children[0], box_, oracle, vars, cache);
            let b = rlt_combo(dag, children[1], box_, oracle, vars, cache);
            a.add(&b)
        }
        Op::Sub => {
            let children = dag.children(node).to_vec();
            let a = rlt_combo(dag, children[0], box_, oracle, vars, cache);
            let b = rlt_combo(dag, children[1], box_, oracle, vars, cache);
            a.add(&b.neg())
        }
        Op::Mul => {
            let children = dag.children(node).to_vec();
            match (dag.op(children[0]), dag.op(children[1])) {
                (Op::Var(vx), Op::Var(vy)) => match mccormick_envelope_aux(*vx, *vy, box_, oracle, vars) {
                    Some(z) => LinearCombo::var(z.0, 1.0),
                    None => opaque_combo(dag, node, box_),
                },
                _ => opaque_combo(dag, node, box_),
            }
        }
        Op::Sqr => {
            let child = dag.children(node)[0];
            match dag.op(child) {
                Op::Var(v) => match sqr_envelope(*v, box_, oracle, vars) {
                    Some(z) => LinearCombo::var(z.0, 1.0),
                    None => opaque_combo(dag, node, box_),
                },
                _ => opaque_combo(dag, node, box_),
            }
        }
        _ => opaque_combo(dag, node, box_),
    };
    cache.insert(node, combo.clone());
    combo
}

fn rlt_linearize(
    dag: &Dag,
    fun: &DagFun,
    box_: &IntervalBox,
    oracle: &mut dyn LpOracle,
    vars: &HashMap<VarId, LpVar>,
    _corners: &HashMap<VarId, Corner>,
) {
    let mut cache = HashMap::new();
    let combo = rlt_combo(dag, fun.root(), box_, oracle, vars, &mut cache);
    let coeffs: Vec<(LpVar, f64)> = combo.coeffs.iter().map(|(&idx, &c)| (LpVar(idx), c)).collect();
    let lo = fun.image().lo() - combo.constant - combo.slack;
    let hi = fun.image().hi() - combo.constant + combo.slack;
    oracle.add_linear_constraint(lo, &coeffs, hi);
}

/// Affine-form relaxation (spec §4.2/§4.5): evaluates `fun` to an
/// [`AffineForm`] and emits one linear term per noise symbol — a
/// variable-tied symbol maps straight back onto its box variable
/// (`e_i = (x_i - mid_i) / radius_i`), an internal symbol minted by a
/// nonlinear affine op gets a fresh `[-1, 1]` auxiliary variable. Falls
/// back to the Taylor enclosure when a variable is unbounded or the
/// expression uses an operator with no affine linearisation (`abs`,
/// `min`, `max`, ...), same as [`crate::contract::affine_revise`] falling
/// back to `Maybe` for those.
fn affine_linearize(
    dag: &Dag,
    fun: &DagFun,
    box_: &IntervalBox,
    oracle: &mut dyn LpOracle,
    vars: &HashMap<VarId, LpVar>,
    corners: &HashMap<VarId, Corner>,
) {
    let scope = fun.scope();
    let n = scope.len();
    let mut var_forms = HashMap::with_capacity(n);
    for (i, &v) in scope.vars().iter().enumerate() {
        match AffineForm::from_variable(i as u32, &box_.get(v)) {
            Some(af) => {
                var_forms.insert(v, af);
            }
            None => {
                taylor_linearize(dag, fun, box_, oracle, vars, corners);
                return;
            }
        }
    }
    let mut gen = NoiseGen::new(n);
    let form = match dag.eval_affine(fun.root(), &var_forms, &mut gen) {
        Some(f) => f,
        None => {
            taylor_linearize(dag, fun, box_, oracle, vars, corners);
            return;
        }
    };

    let mut coeffs: Vec<(LpVar, f64)> = Vec::with_capacity(form.terms().len());
    let mut constant = form.centre();
    for &(noise_index, coeff) in form.terms() {
        if gen.is_variable_symbol(noise_index) {
            let v = scope.vars()[noise_index as usize];
            let Some(&lp_var) = vars.get(&v) else { continue };
            let iv = box_.get(v);
            let radius = 0.5 * iv.width();
            if radius <= 0.0 {
                continue;
            }
            coeffs.push((lp_var, coeff / radius));
            constant -= coeff * iv.midpoint() / radius;
        } else {
            let aux = oracle.add_bounded_variable(-1.0, 1.0);
            coeffs.push((aux, coeff));
        }
    }
    let error = form.error();
    let lo = fun.image().lo() - constant - error;
    let hi = fun.image().hi() - constant + error;
    oracle.add_linear_constraint(lo, &coeffs, hi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::oracle::{Sense, SimplexOracle};
    use crate::variable::Scope;

    #[test]
    fn mccormick_envelope_bounds_a_product() {
        // x in [1,3], y in [1,3]: x*y in [1,9] true range, but McCormick
        // applied with image [0,10] shouldn't widen past the bilinear hull.
        let mut dag = Dag::new();
        let vx = VarId(0);
        let vy = VarId(1);
        let x = dag.make_var(vx);
        let y = dag.make_var(vy);
        let f = dag.make_binary("mul", Op::Mul, x, y);
        let fun = DagFun::new(&dag, f, Interval::new(0.0, 10.0));

        let scope = Scope::new([vx, vy]);
        let box_ = IntervalBox::new(scope, vec![Interval::new(1.0, 3.0), Interval::new(1.0, 3.0)]);

        let mut oracle = SimplexOracle::new();
        let vars = register_box_variables(&mut oracle, &box_);
        linearize(&dag, &fun, &box_, &mut oracle, &vars, PolytopeStyle::Taylor, &HashMap::new());

        let z = *vars.get(&vx).unwrap();
        oracle.set_objective(&[(z, 1.0)]);
        let status = oracle.optimize(Sense::Minimize);
        assert_eq!(status, crate::lp::oracle::LpStatus::Optimal);
    }

    #[test]
    fn rlt_reformulates_a_square_nested_inside_a_sum() {
        // f = (x^2) + y, image [0, 10]: x^2 isn't the whole root, so Taylor
        // would only linearize at the midpoint, but Rlt must still pick up
        // the nested square and bound it with its tangent/secant envelope
        // rather than falling back to an opaque interval bound.
        let mut dag = Dag::new();
        let vx = VarId(0);
        let vy = VarId(1);
        let x = dag.make_var(vx);
        let y = dag.make_var(vy);
        let sx = dag.make_unary("sqr", Op::Sqr, x);
        let f = dag.make_binary("add", Op::Add, sx, y);
        let fun = DagFun::new(&dag, f, Interval::new(0.0, 10.0));

        let scope = Scope::new([vx, vy]);
        let box_ = IntervalBox::new(scope, vec![Interval::new(-2.0, 1.0), Interval::new(0.0, 1.0)]);

        let mut oracle = SimplexOracle::new();
        let vars = register_box_variables(&mut oracle, &box_);
        linearize(&dag, &fun, &box_, &mut oracle, &vars, PolytopeStyle::Rlt, &HashMap::new());

        // Minimizing x over the relaxation must not let x escape its own
        // box bound, and the LP must stay solvable (the envelope rows are
        // feasible at the box midpoint).
        let lx = *vars.get(&vx).unwrap();
        oracle.set_objective(&[(lx, 1.0)]);
        assert_eq!(oracle.optimize(Sense::Minimize), crate::lp::oracle::LpStatus::Optimal);
    }

    #[test]
    fn rlt_reformulates_a_bilinear_term() {
        // f = x*y, image [0, 10], with x,y on disjoint scope positions from
        // a sum: exercises the Mul-of-two-vars McCormick path through the
        // general walk rather than the Taylor top-level-product shortcut.
        let mut dag = Dag::new();
        let vx = VarId(0);
        let vy = VarId(1);
        let x = dag.make_var(vx);
        let y = dag.make_var(vy);
        let f = dag.make_binary("mul", Op::Mul, x, y);
        let fun = DagFun::new(&dag, f, Interval::new(0.0, 10.0));

        let scope = Scope::new([vx, vy]);
        let box_ = IntervalBox::new(scope, vec![Interval::new(1.0, 3.0), Interval::new(1.0, 3.0)]);

        let mut oracle = SimplexOracle::new();
        let vars = register_box_variables(&mut oracle, &box_);
        linearize(&dag, &fun, &box_, &mut oracle, &vars, PolytopeStyle::Rlt, &HashMap::new());

        let lx = *vars.get(&vx).unwrap();
        oracle.set_objective(&[(lx, 1.0)]);
        assert_eq!(oracle.optimize(Sense::Minimize), crate::lp::oracle::LpStatus::Optimal);
    }

    #[test]
    fn affine_style_bounds_a_linear_function_exactly() {
        // f = x + y on x,y in [0,2]: a purely linear function's affine form
        // has zero error, so the emitted row should pin f's image to the
        // box's own range with no slack, and the LP stays solvable.
        let mut dag = Dag::new();
        let vx = VarId(0);
        let vy = VarId(1);
        let x = dag.make_var(vx);
        let y = dag.make_var(vy);
        let f = dag.make_binary("add", Op::Add, x, y);
        let fun = DagFun::new(&dag, f, Interval::new(f64::NEG_INFINITY, f64::INFINITY));

        let scope = Scope::new([vx, vy]);
        let box_ = IntervalBox::new(scope, vec![Interval::new(0.0, 2.0), Interval::new(0.0, 2.0)]);

        let mut oracle = SimplexOracle::new();
        let vars = register_box_variables(&mut oracle, &box_);
        linearize(&dag, &fun, &box_, &mut oracle, &vars, PolytopeStyle::Affine, &HashMap::new());

        let lx = *vars.get(&vx).unwrap();
        oracle.set_objective(&[(lx, 1.0)]);
        assert_eq!(oracle.optimize(Sense::Maximize), crate::lp::oracle::LpStatus::Optimal);
    }
}
