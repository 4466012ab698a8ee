//! Boolean equation solving.
//!
//! Given `F(x, y)`, [`solve_eqn`][Manager::solve_eqn] finds functions
//! `G_i(x)` such that `F(x, G(x)) = 0` wherever the equation `F(x, y) = 0`
//! has a solution at all. The equation is consistent at `x` exactly when
//! `∀y. F(x, y) = 0`.

use log::debug;

use crate::error::{DdError, Result};
use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::VarIndex;

/// Outcome of [`Manager::solve_eqn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// `∀y. F`: the equation has no solution where this holds. Unreferenced.
    pub consistency: Ref,
    /// `solutions[i]` is the value of variable `y_indices[i]`, in terms of
    /// the `x` variables and the unknown itself as a free parameter. Each is
    /// referenced and must be released by the caller.
    pub solutions: Vec<Ref>,
    /// Unknowns, top to bottom in the order of the cube.
    pub y_indices: Vec<VarIndex>,
}

impl Manager {
    /// Solve `f = 0` for the variables of the positive cube `y`.
    pub fn solve_eqn(&mut self, f: Ref, y: Ref) -> Result<Solution> {
        if !self.check_positive_cube(y) {
            return Err(self.record_error(DdError::InvalidArgument("unknowns must be a positive cube".to_string())));
        }
        let mut y_indices = Vec::new();
        let mut c = y;
        while c != self.one {
            y_indices.push(self.node_index(c));
            c = self.cofactors(c).0;
        }
        let mut solutions = vec![Ref::INVALID; y_indices.len()];
        self.ref_node(f);
        let res = self.solve_step(f, &y_indices, 0, &mut solutions);
        self.recursive_deref(f);
        match res {
            Ok(consistency) => {
                debug!("solved for {} unknowns", y_indices.len());
                Ok(Solution {
                    consistency,
                    solutions,
                    y_indices,
                })
            }
            Err(e) => {
                for s in solutions.into_iter().filter(|&s| s != Ref::INVALID) {
                    self.recursive_deref(s);
                }
                Err(e)
            }
        }
    }

    /// Eliminate unknown `i` from the referenced `f`; returns the
    /// consistency condition unreferenced and fills `solutions[i..]`.
    fn solve_step(&mut self, f: Ref, ys: &[VarIndex], i: usize, solutions: &mut [Ref]) -> Result<Ref> {
        let Some(&yi) = ys.get(i) else {
            return Ok(f);
        };
        let var = self.vars[yi as usize];

        let f_all = self.univ_abstract(f, var)?;
        self.ref_node(f_all);
        let consistency = match self.solve_step(f_all, ys, i + 1, solutions) {
            Ok(c) => c,
            Err(e) => {
                self.recursive_deref(f_all);
                return Err(e);
            }
        };
        self.ref_node(consistency);

        // Parametric solution: y_i keeps its own value when both choices
        // satisfy F = 0.
        let held = [f_all, consistency];
        let t = self.with_held(&held, |m| {
            let fv = m.cofactor(f, var)?;
            m.ref_node(fv);
            let fnv = m.cofactor(f, -var);
            let fnv = m.release_on_err(fnv, &[fv])?;
            m.ref_node(fnv);
            let w = m.ite(var, -fv, fnv);
            m.ref_node_if_ok(&w);
            m.recursive_deref(fv);
            m.recursive_deref(fnv);
            let w = w?;
            let t = m.restrict(w, -f_all);
            m.ref_node_if_ok(&t);
            m.recursive_deref(w);
            t
        })?;
        self.recursive_deref(f_all);

        // Substitute the solutions already found for lower unknowns.
        let mut t = t;
        for j in (i + 1..ys.len()).rev() {
            let w = self.compose(t, solutions[j], ys[j]);
            let w = self.release_on_err(w, &[t, consistency])?;
            self.ref_node(w);
            self.recursive_deref(t);
            t = w;
        }
        solutions[i] = t;
        self.deref(consistency);
        Ok(consistency)
    }

    /// Run `op`, releasing `held` if it fails.
    fn with_held<T>(&mut self, held: &[Ref], op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let res = op(self);
        self.release_on_err(res, held)
    }

    fn release_on_err<T>(&mut self, res: Result<T>, held: &[Ref]) -> Result<T> {
        if res.is_err() {
            for &r in held {
                self.recursive_deref(r);
            }
        }
        res
    }

    /// Substitute `solutions` into `f`. The result equals the consistency
    /// condition when the solutions are correct.
    pub fn verify_sol(&mut self, f: Ref, solutions: &[Ref], y_indices: &[VarIndex]) -> Result<Ref> {
        let mut r = f;
        self.ref_node(r);
        for (&g, &y) in solutions.iter().zip(y_indices).rev() {
            let w = self.compose(r, g, y);
            let w = self.release_on_err(w, &[r])?;
            self.ref_node(w);
            self.recursive_deref(r);
            r = w;
        }
        self.deref(r);
        Ok(r)
    }
}
