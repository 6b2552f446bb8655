//! Integer-programming feasibility engine (spec §4.4).
//!
//! The model builder only ever talks to the [`IlpBackend`] seam (§3.1, §6):
//! it never imports a concrete solver crate directly, so the disjunctive
//! non-overlap algebra below is exercised against [`MockBackend`] under
//! `#[cfg(test)]` without running a real MIP solve. [`GoodLpBackend`] is the
//! shipped default, grounded on the `good_lp` modeling crate's pure-Rust
//! `microlp` solver.

use std::ops::{Add, Mul, Sub};

use crate::error::PackError;
use crate::geometry::PieceSet;
use crate::grid::OccupancyGrid;

pub type VarId = usize;

/// The relational operator of a single linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

/// A linear combination of backend variables plus a constant, built with
/// ordinary `+`/`-`/`*` so the constraint algebra in [`build_model`] reads
/// the way the spec's inequalities do.
#[derive(Debug, Clone)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn constant(c: f64) -> LinearExpr {
        LinearExpr { terms: Vec::new(), constant: c }
    }

    pub fn var(id: VarId) -> LinearExpr {
        LinearExpr { terms: vec![(id, 1.0)], constant: 0.0 }
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;
    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;
    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms.into_iter().map(|(v, c)| (v, -c)));
        self.constant -= rhs.constant;
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;
    fn mul(mut self, rhs: f64) -> LinearExpr {
        for (_, c) in &mut self.terms {
            *c *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

/// The substitutable ILP backend named in spec §6(e): declare variables,
/// add linear constraints, run a feasibility optimize, and read back
/// rounded integer values.
pub trait IlpBackend {
    fn new_int_var(&mut self, lower: f64, upper: f64) -> VarId;
    fn new_binary_var(&mut self) -> VarId;
    fn add_constraint(&mut self, lhs: LinearExpr, relation: Relation, rhs: f64);
    fn solve_feasibility(&mut self) -> Result<bool, PackError>;
    fn value_of(&self, var: VarId) -> i64;
}

/// The default backend, grounded on `good_lp`'s pure-Rust `microlp` solver
/// so this crate never links a system MIP library.
pub struct GoodLpBackend {
    vars: good_lp::ProblemVariables,
    handles: Vec<good_lp::Variable>,
    constraints: Vec<(LinearExpr, Relation, f64)>,
    values: Vec<f64>,
}

impl GoodLpBackend {
    pub fn new() -> GoodLpBackend {
        GoodLpBackend {
            vars: good_lp::ProblemVariables::new(),
            handles: Vec::new(),
            constraints: Vec::new(),
            values: Vec::new(),
        }
    }

    fn to_good_lp_expression(&self, expr: &LinearExpr) -> good_lp::Expression {
        let mut e = good_lp::Expression::from(expr.constant_term());
        for &(var, coef) in expr.terms() {
            e += self.handles[var] * coef;
        }
        e
    }
}

impl Default for GoodLpBackend {
    fn default() -> GoodLpBackend {
        GoodLpBackend::new()
    }
}

impl IlpBackend for GoodLpBackend {
    fn new_int_var(&mut self, lower: f64, upper: f64) -> VarId {
        use good_lp::variable;
        let handle = self.vars.add(variable().integer().min(lower).max(upper));
        self.handles.push(handle);
        self.handles.len() - 1
    }

    fn new_binary_var(&mut self) -> VarId {
        self.new_int_var(0.0, 1.0)
    }

    fn add_constraint(&mut self, lhs: LinearExpr, relation: Relation, rhs: f64) {
        self.constraints.push((lhs, relation, rhs));
    }

    fn solve_feasibility(&mut self) -> Result<bool, PackError> {
        use good_lp::{Solution, SolverModel};

        let vars = std::mem::replace(&mut self.vars, good_lp::ProblemVariables::new());
        let mut model = vars.minimise(0).using(good_lp::microlp);

        for (lhs, relation, rhs) in &self.constraints {
            let expr = self.to_good_lp_expression(lhs);
            model = match relation {
                Relation::Le => model.with(expr.leq(*rhs)),
                Relation::Eq => model.with(expr.eq(*rhs)),
                Relation::Ge => model.with(expr.geq(*rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => {
                self.values = self.handles.iter().map(|&v| solution.value(v)).collect();
                Ok(true)
            }
            Err(good_lp::ResolutionError::Infeasible) => Ok(false),
            Err(other) => Err(PackError::SolverUnavailable { reason: other.to_string() }),
        }
    }

    fn value_of(&self, var: VarId) -> i64 {
        self.values[var].round() as i64
    }
}

/// A mock backend recording the model's shape without running a real solve,
/// used only by `#[cfg(test)]` to exercise [`build_model`]'s constraint
/// algebra in isolation.
#[cfg(test)]
pub struct MockBackend {
    pub int_var_bounds: Vec<(f64, f64)>,
    pub binary_var_count: usize,
    pub constraint_count: usize,
    feasible: bool,
    values: Vec<f64>,
}

#[cfg(test)]
impl MockBackend {
    pub fn always(feasible: bool) -> MockBackend {
        MockBackend {
            int_var_bounds: Vec::new(),
            binary_var_count: 0,
            constraint_count: 0,
            feasible,
            values: Vec::new(),
        }
    }
}

#[cfg(test)]
impl IlpBackend for MockBackend {
    fn new_int_var(&mut self, lower: f64, upper: f64) -> VarId {
        self.int_var_bounds.push((lower, upper));
        self.values.push(lower);
        self.int_var_bounds.len() - 1
    }

    fn new_binary_var(&mut self) -> VarId {
        self.binary_var_count += 1;
        self.new_int_var(0.0, 1.0)
    }

    fn add_constraint(&mut self, _lhs: LinearExpr, _relation: Relation, _rhs: f64) {
        self.constraint_count += 1;
    }

    fn solve_feasibility(&mut self) -> Result<bool, PackError> {
        Ok(self.feasible)
    }

    fn value_of(&self, var: VarId) -> i64 {
        self.values[var].round() as i64
    }
}

struct PieceVars {
    px: VarId,
    py: VarId,
    sx: VarId,
    sy: VarId,
}

/// Builds the feasibility model described in spec §4.4 against `backend`
/// and reports whether a primal solution exists.
fn build_model(
    h: u32,
    w: u32,
    pieces: &PieceSet,
    allow_rotation: bool,
    backend: &mut dyn IlpBackend,
) -> Result<Option<Vec<PieceVars>>, PackError> {
    let hf = h as f64;
    let wf = w as f64;
    let n = pieces.len();
    let mut vars = Vec::with_capacity(n);

    for piece in pieces.as_slice() {
        let px = backend.new_int_var(0.0, wf);
        let py = backend.new_int_var(0.0, hf);

        let (sx, sy) = if allow_rotation && !piece.is_square() {
            let o = backend.new_binary_var();
            let sx = backend.new_int_var(piece.h.min(piece.w) as f64, piece.h.max(piece.w) as f64);
            let sy = backend.new_int_var(piece.h.min(piece.w) as f64, piece.h.max(piece.w) as f64);
            // sx = (1 - o)*h + o*w  <=>  sx - o*(w - h) = h
            // sy = o*h + (1 - o)*w  <=>  sy - o*(h - w) = w      (spec §4.4)
            backend.add_constraint(
                LinearExpr::var(sx) - LinearExpr::var(o) * ((piece.w as f64) - (piece.h as f64)),
                Relation::Eq,
                piece.h as f64,
            );
            backend.add_constraint(
                LinearExpr::var(sy) - LinearExpr::var(o) * ((piece.h as f64) - (piece.w as f64)),
                Relation::Eq,
                piece.w as f64,
            );
            (sx, sy)
        } else {
            let sx = backend.new_int_var(piece.w as f64, piece.w as f64);
            let sy = backend.new_int_var(piece.h as f64, piece.h as f64);
            (sx, sy)
        };

        backend.add_constraint(LinearExpr::var(px) + LinearExpr::var(sx), Relation::Le, wf);
        backend.add_constraint(LinearExpr::var(py) + LinearExpr::var(sy), Relation::Le, hf);

        vars.push(PieceVars { px, py, sx, sy });
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let l = backend.new_binary_var();
            let r = backend.new_binary_var();
            let b = backend.new_binary_var();
            let a = backend.new_binary_var();

            let (pi, pj) = (&vars[i], &vars[j]);
            backend.add_constraint(
                LinearExpr::var(pi.px) - LinearExpr::var(pj.px) + LinearExpr::var(pi.sx)
                    + LinearExpr::var(l) * wf,
                Relation::Le,
                wf,
            );
            backend.add_constraint(
                LinearExpr::var(pj.px) - LinearExpr::var(pi.px) + LinearExpr::var(pj.sx)
                    + LinearExpr::var(r) * wf,
                Relation::Le,
                wf,
            );
            backend.add_constraint(
                LinearExpr::var(pi.py) - LinearExpr::var(pj.py) + LinearExpr::var(pi.sy)
                    + LinearExpr::var(b) * hf,
                Relation::Le,
                hf,
            );
            backend.add_constraint(
                LinearExpr::var(pj.py) - LinearExpr::var(pi.py) + LinearExpr::var(pj.sy)
                    + LinearExpr::var(a) * hf,
                Relation::Le,
                hf,
            );
            backend.add_constraint(
                LinearExpr::var(l) + LinearExpr::var(r) + LinearExpr::var(b) + LinearExpr::var(a),
                Relation::Ge,
                1.0,
            );
        }
    }

    if backend.solve_feasibility()? {
        Ok(Some(vars))
    } else {
        Ok(None)
    }
}

/// Runs the ILP engine with the default [`GoodLpBackend`].
pub fn solve(
    h: u32,
    w: u32,
    pieces: &PieceSet,
    allow_rotation: bool,
) -> Result<Option<OccupancyGrid>, PackError> {
    let mut backend = GoodLpBackend::new();
    solve_with_backend(h, w, pieces, allow_rotation, &mut backend)
}

/// Runs the ILP engine against any [`IlpBackend`], rounding solver output to
/// the nearest integer before painting the grid (spec §9, "Solver-output
/// rounding").
pub fn solve_with_backend(
    h: u32,
    w: u32,
    pieces: &PieceSet,
    allow_rotation: bool,
    backend: &mut dyn IlpBackend,
) -> Result<Option<OccupancyGrid>, PackError> {
    let vars = match build_model(h, w, pieces, allow_rotation, backend)? {
        Some(vars) => vars,
        None => return Ok(None),
    };

    let mut grid = OccupancyGrid::new(h as usize, w as usize);
    for (idx, pv) in vars.iter().enumerate() {
        let px = backend.value_of(pv.px) as usize;
        let py = backend.value_of(pv.py) as usize;
        let sx = backend.value_of(pv.sx) as usize;
        let sy = backend.value_of(pv.sy) as usize;
        grid.paint_rect(py, px, sy, sx, idx + 1);
    }
    Ok(Some(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Piece;

    #[test]
    fn no_rotation_model_fixes_extents_and_counts_constraints() {
        let pieces = PieceSet::new(vec![Piece::new(2, 3), Piece::new(2, 3)]);
        let mut backend = MockBackend::always(true);
        let vars = build_model(4, 3, &pieces, false, &mut backend).unwrap().unwrap();
        assert_eq!(vars.len(), 2);
        // Two bounding + one pair of four disjunctive + one sum constraint.
        assert_eq!(backend.constraint_count, 2 * 2 + 4 + 1);
        assert_eq!(backend.binary_var_count, 4);
    }

    #[test]
    fn rotation_model_adds_orientation_variables() {
        let pieces = PieceSet::new(vec![Piece::new(2, 3)]);
        let mut backend = MockBackend::always(true);
        build_model(4, 3, &pieces, true, &mut backend).unwrap();
        // One orientation binary plus the two fixed-extent int vars it replaces.
        assert_eq!(backend.binary_var_count, 1);
    }

    #[test]
    fn infeasible_backend_yields_no_placement() {
        let pieces = PieceSet::new(vec![Piece::new(2, 3)]);
        let mut backend = MockBackend::always(false);
        let result = build_model(4, 3, &pieces, false, &mut backend).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn solver_unavailable_is_a_distinct_error_from_infeasibility() {
        // The trait contract keeps "backend could not decide" (an Err) and
        // "backend decided no" (Ok(None)) distinct; this just documents the
        // split since MockBackend never raises SolverUnavailable itself.
        let mut backend = MockBackend::always(false);
        let outcome: Result<bool, PackError> = backend.solve_feasibility();
        assert_eq!(outcome.unwrap(), false);
    }
}
