//! Boolean operations on BDDs with complement edges.
//!
//! Every procedure follows the same recursive scheme:
//!
//! 1. Terminal cases are answered directly (`ite(1, g, h) = g`, ...).
//! 2. Operands are normalized so that equivalent calls share a cache key:
//!    commutative operands are ordered and complements are pulled out to
//!    the result when possible.
//! 3. The operation cache is probed.
//! 4. The top variable is the one at the smallest *current* level among
//!    the operands, so the procedures work for any variable order.
//! 5. Both cofactors are solved recursively, the result node is built
//!    through the unique table and the cache is updated.
//!
//! The complement of `f` is `-f`; negation never allocates.

use std::collections::HashMap;

use log::debug;

use crate::cache::{Op, OpKey};
use crate::error::{DdError, Result, Step};
use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::{NodeId, VarIndex};

impl Manager {
    pub fn not(&self, f: Ref) -> Ref {
        -f
    }

    /// If-then-else: `(f ∧ g) ∨ (¬f ∧ h)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dd_rs::manager::Manager;
    ///
    /// let mut m = Manager::new(2);
    /// let x0 = m.ith_var(0).unwrap();
    /// let x1 = m.ith_var(1).unwrap();
    /// let f = m.ite(x0, x1, -x1).unwrap();
    /// assert_eq!(f, m.xnor(x0, x1).unwrap());
    /// ```
    pub fn ite(&mut self, f: Ref, g: Ref, h: Ref) -> Result<Ref> {
        self.run(|m| m.ite_rec(f, g, h))
    }

    pub fn and(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        self.run(|m| m.and_rec(f, g))
    }

    pub fn or(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        Ok(-self.run(|m| m.and_rec(-f, -g))?)
    }

    pub fn nand(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        Ok(-self.and(f, g)?)
    }

    pub fn nor(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        self.and(-f, -g)
    }

    pub fn xor(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        self.run(|m| m.xor_rec(f, g))
    }

    pub fn xnor(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        self.run(|m| m.xor_rec(f, -g))
    }

    /// Whether `f` implies `g`. Never creates nodes.
    pub fn leq(&mut self, f: Ref, g: Ref) -> bool {
        self.leq_rec(f, g)
    }

    pub(crate) fn ite_rec(&mut self, f: Ref, g: Ref, h: Ref) -> Step<Ref> {
        let one = self.one;
        let zero = -one;

        // One-variable cases.
        if f == one {
            return Ok(g);
        }
        if f == zero {
            return Ok(h);
        }
        if g == one || f == g {
            // ite(F,1,H) = F ∨ H
            if h == zero {
                return Ok(f);
            }
            return Ok(-self.and_rec(-f, -h)?);
        }
        if g == zero || f == -g {
            // ite(F,0,H) = ¬F ∧ H
            if h == one {
                return Ok(-f);
            }
            return self.and_rec(-f, h);
        }
        if h == zero || f == h {
            return self.and_rec(f, g);
        }
        if h == one || f == -h {
            // ite(F,G,1) = ¬F ∨ G
            return Ok(-self.and_rec(f, -g)?);
        }
        if g == h {
            return Ok(g);
        }
        if g == -h {
            return self.xor_rec(f, h);
        }

        // Canonical form: f and g regular.
        let (mut f, mut g, mut h) = (f, g, h);
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }
        let mut complement = false;
        if g.is_negated() {
            g = -g;
            h = -h;
            complement = true;
        }

        let top_f = self.level(f);
        let top_g = self.level(g);
        let top_h = self.level(h);
        let v = top_g.min(top_h);

        // ite(F,G,H) = (x,G,H) when F is the projection of x above G and H.
        if top_f < v && self.cofactors(f) == (one, zero) {
            let index = self.node_index(f);
            let r = self.mk(index, g, h)?;
            return Ok(r.not_cond(complement));
        }

        let key = OpKey::ternary(Op::Ite, f, g, h);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r.not_cond(complement));
        }

        let top = top_f.min(v);
        let mut index = 0;
        for x in [f, g, h] {
            if self.level(x) == top {
                index = self.node_index(x);
            }
        }
        let (fv, fnv) = self.cofactors_at(f, top);
        let (gv, gnv) = self.cofactors_at(g, top);
        let (hv, hnv) = self.cofactors_at(h, top);

        let t = self.ite_rec(fv, gv, hv)?;
        self.ref_node(t);
        let e = self.ite_rec(fnv, gnv, hnv);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;

        self.cache_insert(key, r);
        Ok(r.not_cond(complement))
    }

    pub(crate) fn and_rec(&mut self, f: Ref, g: Ref) -> Step<Ref> {
        let one = self.one;
        if f.regular() == g.regular() {
            return Ok(if f == g { f } else { -one });
        }
        if f.regular() == one {
            return Ok(if f == one { g } else { f });
        }
        if g.regular() == one {
            return Ok(if g == one { f } else { g });
        }

        let (f, g) = if f > g { (g, f) } else { (f, g) };
        let key = OpKey::binary(Op::And, f, g);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let top = self.level(f).min(self.level(g));
        let index = self.node_index(if self.level(f) == top { f } else { g });
        let (fv, fnv) = self.cofactors_at(f, top);
        let (gv, gnv) = self.cofactors_at(g, top);

        let t = self.and_rec(fv, gv)?;
        self.ref_node(t);
        let e = self.and_rec(fnv, gnv);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;

        self.cache_insert(key, r);
        Ok(r)
    }

    pub(crate) fn or_rec(&mut self, f: Ref, g: Ref) -> Step<Ref> {
        Ok(-self.and_rec(-f, -g)?)
    }

    pub(crate) fn xor_rec(&mut self, f: Ref, g: Ref) -> Step<Ref> {
        let one = self.one;
        if f == g {
            return Ok(-one);
        }
        if f == -g {
            return Ok(one);
        }
        let (mut f, mut g) = if f > g { (g, f) } else { (f, g) };
        if g == -one {
            return Ok(f);
        }
        if g == one {
            return Ok(-f);
        }
        if f.is_negated() {
            f = -f;
            g = -g;
        }
        if f == one {
            return Ok(-g);
        }

        let key = OpKey::binary(Op::Xor, f, g);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let top = self.level(f).min(self.level(g));
        let index = self.node_index(if self.level(f) == top { f } else { g });
        let (fv, fnv) = self.cofactors_at(f, top);
        let (gv, gnv) = self.cofactors_at(g, top);

        let t = self.xor_rec(fv, gv)?;
        self.ref_node(t);
        let e = self.xor_rec(fnv, gnv);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;

        self.cache_insert(key, r);
        Ok(r)
    }

    fn leq_rec(&mut self, f: Ref, g: Ref) -> bool {
        if f == g {
            return true;
        }
        let (f, g) = if g.is_negated() {
            // A regular function is true on the all-ones path, a complemented one is not.
            if !f.is_negated() {
                return false;
            }
            (-g, -f)
        } else if f.is_negated() && g < f {
            (-g, -f)
        } else {
            (f, g)
        };
        let one = self.one;
        if g == one {
            return true;
        }
        if f == one || -f == g {
            return false;
        }
        if f == -one {
            return true;
        }

        let key = OpKey::binary(Op::Leq, f, g);
        if let Some(r) = self.cache_lookup(&key) {
            return r == one;
        }

        let top = self.level(f).min(self.level(g));
        let (fv, fnv) = self.cofactors_at(f, top);
        let (gv, gnv) = self.cofactors_at(g, top);
        // Negative cofactors first: their polarity differs from the parents'.
        let res = self.leq_rec(fnv, gnv) && self.leq_rec(fv, gv);
        self.cache_insert(key, if res { one } else { -one });
        res
    }
}

// Quantification and substitution.
impl Manager {
    /// Check that `cube` is a conjunction of positive literals.
    pub(crate) fn check_positive_cube(&self, cube: Ref) -> bool {
        let mut c = cube;
        while c != self.one {
            if c.is_negated() || self.is_constant(c) {
                return false;
            }
            let (t, e) = self.cofactors(c);
            if e != -self.one {
                return false;
            }
            c = t;
        }
        true
    }

    fn require_cube(&mut self, cube: Ref) -> Result<()> {
        if self.check_positive_cube(cube) {
            Ok(())
        } else {
            Err(self.record_error(DdError::InvalidArgument("not a positive cube".to_string())))
        }
    }

    /// Existential quantification of the variables in `cube`.
    pub fn exist_abstract(&mut self, f: Ref, cube: Ref) -> Result<Ref> {
        self.require_cube(cube)?;
        self.run(|m| m.exist_rec(f, cube))
    }

    /// Universal quantification of the variables in `cube`.
    pub fn univ_abstract(&mut self, f: Ref, cube: Ref) -> Result<Ref> {
        self.require_cube(cube)?;
        Ok(-self.run(|m| m.exist_rec(-f, cube))?)
    }

    /// `∃ cube. f ∧ g` without building the conjunction.
    pub fn and_abstract(&mut self, f: Ref, g: Ref, cube: Ref) -> Result<Ref> {
        self.require_cube(cube)?;
        self.run(|m| m.and_abstract_rec(f, g, cube))
    }

    pub(crate) fn exist_rec(&mut self, f: Ref, cube: Ref) -> Step<Ref> {
        let one = self.one;
        if cube == one || f.regular() == one {
            return Ok(f);
        }
        let mut cube = cube;
        while self.level(f) > self.level(cube) {
            cube = self.cofactors(cube).0;
            if cube == one {
                return Ok(f);
            }
        }

        let key = OpKey::binary(Op::ExistAbstract, f, cube);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let (t, e) = self.cofactors(f);
        let r = if self.node_index(f) == self.node_index(cube) {
            if t == one || e == one || t == -e {
                return Ok(one);
            }
            let rest = self.cofactors(cube).0;
            let r1 = self.exist_rec(t, rest)?;
            if r1 == one {
                self.cache_insert(key, one);
                return Ok(one);
            }
            self.ref_node(r1);
            let r2 = self.exist_rec(e, rest);
            let r2 = self.guard(r2, &[r1])?;
            self.ref_node(r2);
            let r = self.or_rec(r1, r2);
            let r = self.guard(r, &[r1, r2])?;
            self.settle(r, &[r1, r2])
        } else {
            let r1 = self.exist_rec(t, cube)?;
            self.ref_node(r1);
            let r2 = self.exist_rec(e, cube);
            let r2 = self.guard(r2, &[r1])?;
            self.ref_node(r2);
            let var = self.vars[self.node_index(f) as usize];
            let r = self.ite_rec(var, r1, r2);
            let r = self.guard(r, &[r1, r2])?;
            self.settle(r, &[r1, r2])
        };
        self.cache_insert(key, r);
        Ok(r)
    }

    pub(crate) fn and_abstract_rec(&mut self, f: Ref, g: Ref, cube: Ref) -> Step<Ref> {
        let one = self.one;
        let zero = -one;
        if f == zero || g == zero || f == -g {
            return Ok(zero);
        }
        if f == one && g == one {
            return Ok(one);
        }
        if cube == one {
            return self.and_rec(f, g);
        }
        if f == one || f == g {
            return self.exist_rec(g, cube);
        }
        if g == one {
            return self.exist_rec(f, cube);
        }

        let (f, g) = if f > g { (g, f) } else { (f, g) };
        let top = self.level(f).min(self.level(g));
        let mut cube = cube;
        while self.level(cube) < top {
            cube = self.cofactors(cube).0;
            if cube == one {
                return self.and_rec(f, g);
            }
        }

        let key = OpKey::ternary(Op::AndAbstract, f, g, cube);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let index = self.node_index(if self.level(f) == top { f } else { g });
        let (ft, fe) = self.cofactors_at(f, top);
        let (gt, ge) = self.cofactors_at(g, top);

        let r = if self.level(cube) == top {
            let rest = self.cofactors(cube).0;
            let t = self.and_abstract_rec(ft, gt, rest)?;
            // t ∨ anything = t when t covers the else branch.
            if t == one || t == fe || t == ge {
                self.cache_insert(key, t);
                return Ok(t);
            }
            self.ref_node(t);
            let e = if t == -fe {
                self.exist_rec(ge, rest)
            } else if t == -ge {
                self.exist_rec(fe, rest)
            } else {
                self.and_abstract_rec(fe, ge, rest)
            };
            let e = self.guard(e, &[t])?;
            if t == e {
                self.deref(t);
                t
            } else {
                self.ref_node(e);
                let r = self.or_rec(t, e);
                let r = self.guard(r, &[t, e])?;
                self.settle(r, &[t, e])
            }
        } else {
            let t = self.and_abstract_rec(ft, gt, cube)?;
            self.ref_node(t);
            let e = self.and_abstract_rec(fe, ge, cube);
            let e = self.guard(e, &[t])?;
            self.ref_node(e);
            self.build(index, t, e)?
        };
        self.cache_insert(key, r);
        Ok(r)
    }

    /// Cofactor of `f` with respect to the cube `g`.
    ///
    /// Works for BDDs and ADDs. `g` must be a nonzero product of literals.
    pub fn cofactor(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        if g == -self.one || g == self.add_zero {
            return Err(self.record_error(DdError::InvalidArgument("cofactor with the zero function".to_string())));
        }
        self.run(|m| m.cofactor_rec(f, g))
    }

    pub(crate) fn cofactor_rec(&mut self, f: Ref, g: Ref) -> Step<Ref> {
        if self.is_constant(f) || g == self.one {
            return Ok(f);
        }
        let complement = f.is_negated();
        let ff = f.regular();
        let key = OpKey::binary(Op::Cofactor, ff, g);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r.not_cond(complement));
        }

        let top_f = self.level(ff);
        let top_g = self.level(g);
        let (f1, f0) = if top_f <= top_g { self.cofactors(ff) } else { (ff, ff) };
        let (g1, g0) = if top_g <= top_f { self.cofactors(g) } else { (g, g) };

        let zero = -self.one;
        let r = if top_f >= top_g {
            if g0 == zero || g0 == self.add_zero {
                self.cofactor_rec(f1, g1)?
            } else if g1 == zero || g1 == self.add_zero {
                self.cofactor_rec(f0, g0)?
            } else {
                return Err(DdError::InvalidArgument("cofactor with a non-cube".to_string()).into());
            }
        } else {
            let t = self.cofactor_rec(f1, g)?;
            self.ref_node(t);
            let e = self.cofactor_rec(f0, g);
            let e = self.guard(e, &[t])?;
            self.ref_node(e);
            let index = self.node_index(ff);
            self.build(index, t, e)?
        };
        self.cache_insert(key, r);
        Ok(r.not_cond(complement))
    }

    /// Substitute `g` for variable `v` in `f`.
    pub fn compose(&mut self, f: Ref, g: Ref, v: VarIndex) -> Result<Ref> {
        if v as usize >= self.read_size() {
            return Err(self.record_error(DdError::InvalidArgument(format!("no variable {}", v))));
        }
        let proj = self.vars[v as usize];
        self.run(|m| m.compose_rec(f, g, proj))
    }

    fn compose_rec(&mut self, f: Ref, g: Ref, proj: Ref) -> Step<Ref> {
        let v = self.level(proj);
        let top_f = self.level(f);
        if top_f > v {
            return Ok(f);
        }
        let complement = f.is_negated();
        let ff = f.regular();
        let key = OpKey::ternary(Op::Compose, ff, g, proj);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r.not_cond(complement));
        }

        let r = if top_f == v {
            let (f1, f0) = self.cofactors(ff);
            self.ite_rec(g, f1, f0)?
        } else {
            let top_g = self.level(g);
            let top = top_f.min(top_g);
            let index = self.node_index(if top_f == top { ff } else { g });
            let (f1, f0) = self.cofactors_at(ff, top);
            let (g1, g0) = self.cofactors_at(g, top);
            let t = self.compose_rec(f1, g1, proj)?;
            self.ref_node(t);
            let e = self.compose_rec(f0, g0, proj);
            let e = self.guard(e, &[t])?;
            self.ref_node(e);
            let var = self.vars[index as usize];
            let r = self.ite_rec(var, t, e);
            let r = self.guard(r, &[t, e])?;
            self.settle(r, &[t, e])
        };
        self.cache_insert(key, r);
        Ok(r.not_cond(complement))
    }

    /// Rename variables: variable `i` of `f` becomes `permutation[i]`.
    pub fn permute(&mut self, f: Ref, permutation: &[VarIndex]) -> Result<Ref> {
        let n = self.read_size();
        if permutation.len() < n || permutation.iter().any(|&p| p as usize >= n) {
            return Err(self.record_error(DdError::InvalidArgument("bad permutation".to_string())));
        }
        self.run(|m| {
            let mut table = HashMap::new();
            let r = m.permute_rec(f, permutation, &mut table);
            if let Ok(r) = r {
                m.ref_node(r);
            }
            for (_, v) in table {
                m.recursive_deref(v);
            }
            if let Ok(r) = r {
                m.deref(r);
            }
            r
        })
    }

    fn permute_rec(&mut self, f: Ref, permutation: &[VarIndex], table: &mut HashMap<NodeId, Ref>) -> Step<Ref> {
        if self.is_constant(f) {
            return Ok(f);
        }
        let complement = f.is_negated();
        if let Some(&r) = table.get(&f.id()) {
            return Ok(r.not_cond(complement));
        }
        let (t, e) = self.cofactors(f.regular());
        let t = self.permute_rec(t, permutation, table)?;
        self.ref_node(t);
        let e = self.permute_rec(e, permutation, table);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let var = self.vars[permutation[self.node_index(f) as usize] as usize];
        let r = self.ite_rec(var, t, e);
        let r = self.guard(r, &[t, e])?;
        let r = self.settle(r, &[t, e]);
        self.ref_node(r);
        table.insert(f.id(), r);
        Ok(r.not_cond(complement))
    }

    /// Reference `r`, release `held`, and hand `r` back unreferenced.
    pub(crate) fn settle(&mut self, r: Ref, held: &[Ref]) -> Ref {
        self.ref_node(r);
        for &h in held {
            self.recursive_deref(h);
        }
        self.deref(r);
        r
    }
}

// Cubes, support and size.
impl Manager {
    /// Conjunction of the given projection functions.
    pub fn cube(&mut self, vars: &[Ref]) -> Result<Ref> {
        let phase = vec![true; vars.len()];
        self.cube_with_phase(vars, &phase)
    }

    /// Conjunction of literals: `vars[i]` when `phase[i]`, its complement otherwise.
    pub fn cube_with_phase(&mut self, vars: &[Ref], phase: &[bool]) -> Result<Ref> {
        if vars.len() != phase.len() {
            return Err(self.record_error(DdError::InvalidArgument("phase length mismatch".to_string())));
        }
        let mut cube = self.one;
        self.ref_node(cube);
        for (&v, &p) in vars.iter().zip(phase).rev() {
            let lit = v.not_cond(!p);
            let next = match self.and(lit, cube) {
                Ok(next) => next,
                Err(e) => {
                    self.recursive_deref(cube);
                    return Err(e);
                }
            };
            self.ref_node(next);
            self.recursive_deref(cube);
            cube = next;
        }
        self.deref(cube);
        Ok(cube)
    }

    /// Positive cube of the given variable indices.
    pub fn indices_to_cube(&mut self, indices: &[VarIndex]) -> Result<Ref> {
        let mut vars = Vec::with_capacity(indices.len());
        for &i in indices {
            vars.push(self.ith_var(i)?);
        }
        self.cube(&vars)
    }

    /// Indices of the variables `f` depends on, in ascending order.
    pub fn support_indices(&self, f: Ref) -> Vec<VarIndex> {
        self.support_indices_many(&[f])
    }

    pub(crate) fn support_indices_many(&self, roots: &[Ref]) -> Vec<VarIndex> {
        let mut seen = vec![false; self.read_size()];
        let mut visited = std::collections::HashSet::new();
        let mut stack: Vec<NodeId> = roots.iter().map(|r| r.id()).collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = &self.nodes[id as usize];
            if let Some((t, e)) = node.children() {
                seen[node.index as usize] = true;
                stack.push(t.id());
                stack.push(e.id());
            }
        }
        (0..seen.len() as VarIndex).filter(|&i| seen[i as usize]).collect()
    }

    pub fn support_size(&self, f: Ref) -> usize {
        self.support_indices(f).len()
    }

    /// Positive cube of the support of `f`.
    pub fn support(&mut self, f: Ref) -> Result<Ref> {
        let mut support = self.support_indices(f);
        support.sort_by_key(|&i| self.perm[i as usize]);
        self.indices_to_cube(&support)
    }

    /// Number of nodes reachable from `f`, terminals included.
    pub fn dag_size(&self, f: Ref) -> usize {
        self.shared_size(&[f])
    }

    /// Number of nodes reachable from any of `roots`.
    pub fn shared_size(&self, roots: &[Ref]) -> usize {
        let mut visited = std::collections::HashSet::new();
        let mut stack: Vec<NodeId> = roots.iter().map(|r| r.id()).collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some((t, e)) = self.nodes[id as usize].children() {
                stack.push(t.id());
                stack.push(e.id());
            }
        }
        visited.len()
    }

    /// Value of the BDD `f` under `inputs`, indexed by variable index.
    /// Variables past the end of `inputs` read as false.
    pub fn eval(&self, f: Ref, inputs: &[bool]) -> bool {
        let mut r = f;
        while !self.is_constant(r) {
            let (t, e) = self.cofactors(r);
            let index = self.node_index(r) as usize;
            r = if inputs.get(index).copied().unwrap_or(false) { t } else { e };
        }
        debug!("eval({}) reached {}", f, r);
        r == self.one
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::testing::{random_function, truth_table};

    #[test]
    fn test_eval_short_inputs() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let z = m.ith_var(2).unwrap();
        let f = m.or(x, -z).unwrap();
        m.ref_node(f);
        assert!(m.eval(f, &[]));
        assert!(m.eval(f, &[true]));
        assert!(!m.eval(z, &[true, true]));
        assert!(m.eval(-z, &[false]));
        m.recursive_deref(f);
    }

    #[test]
    fn test_var() {
        let mut m = Manager::new(1);
        let x = m.ith_var(0).unwrap();
        assert_eq!(m.cofactors(x), (m.one(), m.zero()));
        assert_eq!(m.cofactors(-x), (m.zero(), m.one()));
    }

    #[test]
    fn test_scenario_ite_is_xor() {
        let mut m = Manager::new(2);
        let x0 = m.ith_var(0).unwrap();
        let x1 = m.ith_var(1).unwrap();
        let f = m.ite(x0, x1, -x1).unwrap();
        m.ref_node(f);
        let g = m.xor(x0, x1).unwrap();
        assert_eq!(f, -g);
        let h = m.ite(x0, -x1, x1).unwrap();
        assert_eq!(h, g);
        m.recursive_deref(f);
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_de_morgan() {
        let mut m = Manager::new(2);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let f = -m.and(x, y).unwrap();
        let g = m.or(-x, -y).unwrap();
        assert_eq!(f, g);
        assert_eq!(m.nand(x, y).unwrap(), f);
        assert_eq!(m.nor(x, y).unwrap(), -m.or(x, y).unwrap());
    }

    #[test]
    fn test_xor_itself() {
        let mut m = Manager::new(2);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let f = m.and(x, y).unwrap();
        assert_eq!(m.xor(f, f).unwrap(), m.zero());
        assert_eq!(m.xor(f, -f).unwrap(), m.one());
        assert_eq!(m.xnor(f, f).unwrap(), m.one());
    }

    #[test]
    fn test_ite_matches_and_or() {
        let n = 5;
        let mut m = Manager::new(n);
        for seed in 1..12u64 {
            let f = random_function(&mut m, seed, n);
            let g = random_function(&mut m, seed * 31 + 7, n);
            let h = random_function(&mut m, seed * 17 + 3, n);
            let r = m.ite(f, g, h).unwrap();
            m.ref_node(r);
            let fg = m.and(f, g).unwrap();
            m.ref_node(fg);
            let nfh = m.and(-f, h).unwrap();
            m.ref_node(nfh);
            let expected = m.or(fg, nfh).unwrap();
            assert_eq!(r, expected);

            let (tf, tg, th) = (truth_table(&m, f, n), truth_table(&m, g, n), truth_table(&m, h, n));
            let tr = truth_table(&m, r, n);
            for i in 0..tr.len() {
                assert_eq!(tr[i], if tf[i] { tg[i] } else { th[i] });
            }
            for x in [r, fg, nfh, f, g, h] {
                m.recursive_deref(x);
            }
        }
        assert_eq!(m.check_zero_ref(), 0);
        assert!(m.debug_check().is_ok());
    }

    #[test]
    fn test_canonicity_across_constructions() {
        let mut m = Manager::new(3);
        let a = m.ith_var(0).unwrap();
        let b = m.ith_var(1).unwrap();
        let c = m.ith_var(2).unwrap();
        // a ∧ (b ∨ c) built two ways.
        let bc = m.or(b, c).unwrap();
        m.ref_node(bc);
        let f = m.and(a, bc).unwrap();
        m.ref_node(f);
        let ab = m.and(a, b).unwrap();
        m.ref_node(ab);
        let ac = m.and(a, c).unwrap();
        m.ref_node(ac);
        let g = m.or(ab, ac).unwrap();
        assert_eq!(f, g);
        for x in [bc, f, ab, ac] {
            m.recursive_deref(x);
        }
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_leq() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let xy = m.and(x, y).unwrap();
        assert!(m.leq(xy, x));
        assert!(m.leq(xy, y));
        assert!(!m.leq(x, xy));
        assert!(m.leq(m.zero(), x));
        assert!(m.leq(-x, -xy));
        assert!(!m.leq(x, -x));
    }

    #[test]
    fn test_exist_and_univ_abstract() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let z = m.ith_var(2).unwrap();
        let xy = m.and(x, y).unwrap();
        m.ref_node(xy);
        let f = m.or(xy, z).unwrap();
        m.ref_node(f);
        assert_eq!(m.exist_abstract(f, x).unwrap(), m.or(y, z).unwrap());
        assert_eq!(m.univ_abstract(f, x).unwrap(), z);
        let cube = m.cube(&[x, y]).unwrap();
        m.ref_node(cube);
        assert_eq!(m.exist_abstract(f, cube).unwrap(), m.one());
        assert!(m.exist_abstract(f, -x).is_err());
        for r in [xy, f, cube] {
            m.recursive_deref(r);
        }
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_and_abstract_matches_two_steps() {
        let n = 5;
        let mut m = Manager::new(n);
        let v1 = m.ith_var(1).unwrap();
        let v3 = m.ith_var(3).unwrap();
        let cube = m.cube(&[v1, v3]).unwrap();
        m.ref_node(cube);
        for seed in 1..8u64 {
            let f = random_function(&mut m, seed, n);
            let g = random_function(&mut m, seed + 100, n);
            let r = m.and_abstract(f, g, cube).unwrap();
            m.ref_node(r);
            let fg = m.and(f, g).unwrap();
            m.ref_node(fg);
            assert_eq!(m.exist_abstract(fg, cube).unwrap(), r);
            for x in [r, fg, f, g] {
                m.recursive_deref(x);
            }
        }
        m.recursive_deref(cube);
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_cofactor() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let z = m.ith_var(2).unwrap();
        let f = m.ite(x, y, z).unwrap();
        m.ref_node(f);
        assert_eq!(m.cofactor(f, x).unwrap(), y);
        assert_eq!(m.cofactor(f, -x).unwrap(), z);
        let c = m.and(-x, -z).unwrap();
        assert_eq!(m.cofactor(f, c).unwrap(), m.zero());
        assert!(m.cofactor(f, m.zero()).is_err());
        let not_cube = m.or(x, y).unwrap();
        assert!(m.cofactor(f, not_cube).is_err());
        m.recursive_deref(f);
    }

    #[test]
    fn test_compose() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let z = m.ith_var(2).unwrap();
        let f = m.and(x, y).unwrap();
        m.ref_node(f);
        // f[x := z] = z ∧ y
        assert_eq!(m.compose(f, z, 0).unwrap(), m.and(z, y).unwrap());
        // f[y := ¬x] = 0
        assert_eq!(m.compose(f, -x, 1).unwrap(), m.zero());
        assert!(m.compose(f, z, 9).is_err());
        m.recursive_deref(f);
    }

    #[test]
    fn test_permute() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let z = m.ith_var(2).unwrap();
        let f = m.and(x, -y).unwrap();
        m.ref_node(f);
        let g = m.permute(f, &[2, 0, 1]).unwrap();
        assert_eq!(g, m.and(z, -x).unwrap());
        assert!(m.permute(f, &[0, 1]).is_err());
        m.recursive_deref(f);
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_cube_and_support() {
        let mut m = Manager::new(4);
        let x0 = m.ith_var(0).unwrap();
        let x2 = m.ith_var(2).unwrap();
        let c = m.cube_with_phase(&[x0, x2], &[true, false]).unwrap();
        m.ref_node(c);
        assert_eq!(c, m.and(x0, -x2).unwrap());
        assert_eq!(m.support_indices(c), vec![0, 2]);
        assert_eq!(m.support_size(c), 2);
        let s = m.support(c).unwrap();
        assert_eq!(s, m.indices_to_cube(&[0, 2]).unwrap());
        assert_eq!(m.dag_size(c), 3);
        assert_eq!(m.shared_size(&[c, x0]), 4);
        m.recursive_deref(c);
    }

    #[test]
    fn test_eval() {
        let mut m = Manager::new(2);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let f = m.xor(x, y).unwrap();
        assert!(!m.eval(f, &[false, false]));
        assert!(m.eval(f, &[true, false]));
        assert!(m.eval(f, &[false, true]));
        assert!(!m.eval(f, &[true, true]));
    }
}
