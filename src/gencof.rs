//! Generalized cofactors and don't-care minimization.
//!
//! All procedures take a function `f` and a care set `c` and return a
//! function that agrees with `f` wherever `c` holds:
//!
//! - [`constrain`][Manager::constrain]: the Coudert-Madre generalized
//!   cofactor `f ↓ c`, which maps every point outside `c` to its nearest
//!   point inside `c`.
//! - [`restrict`][Manager::restrict]: like constrain, but first
//!   quantifies out of `c` the variables `f` does not depend on, and never
//!   returns something larger than `f`.
//! - [`lic_compaction`][Manager::lic_compaction]: safe minimization by
//!   marking edges of `f` that lead only to don't-cares.
//! - [`squeeze`][Manager::squeeze]: a small function inside an interval
//!   `[l, u]`.
//!
//! Two vector-valued procedures build on constrain:
//! [`constrain_decomp`][Manager::constrain_decomp] splits `f` into one
//! conjunct per variable, and [`char_to_vect`][Manager::char_to_vect] turns
//! a characteristic function into a vector of functions whose image it is.

use std::collections::HashMap;

use crate::add::AddOp;
use crate::cache::{Op, OpKey};
use crate::error::{DdError, Result, Step};
use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::{Level, NodeId};

/// Edge mark: the edge only reaches don't-care points.
const LIC_DC: u8 = 0;
/// Edge mark: every care point reached evaluates to one.
const LIC_1: u8 = 1;
/// Edge mark: every care point reached evaluates to zero.
const LIC_0: u8 = 2;
/// Edge mark: both values are reached.
const LIC_NL: u8 = 3;

impl Manager {
    /// Generalized cofactor `f ↓ c`.
    ///
    /// Special cases: `f ↓ 0 = 0`, `f ↓ 1 = f`, `f ↓ f = 1`, `f ↓ ¬f = 0`.
    pub fn constrain(&mut self, f: Ref, c: Ref) -> Result<Ref> {
        self.run(|m| m.constrain_rec(f, c))
    }

    fn constrain_rec(&mut self, f: Ref, c: Ref) -> Step<Ref> {
        let one = self.one;
        let zero = -one;
        if c == one {
            return Ok(f);
        }
        if c == zero {
            return Ok(zero);
        }
        if self.is_constant(f) {
            return Ok(f);
        }
        if f == c {
            return Ok(one);
        }
        if f == -c {
            return Ok(zero);
        }
        let complement = f.is_negated();
        let f = f.regular();

        let key = OpKey::binary(Op::Constrain, f, c);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r.not_cond(complement));
        }

        let top = self.level(f).min(self.level(c));
        let index = self.node_index(if self.level(f) == top { f } else { c });
        let (fv, fnv) = self.cofactors_at(f, top);
        let (cv, cnv) = self.cofactors_at(c, top);

        let t = if cv == one {
            fv
        } else if cv == zero {
            // Only the else branch is cared for.
            let r = if cnv == one { fnv } else { self.constrain_rec(fnv, cnv)? };
            return Ok(r.not_cond(complement));
        } else {
            self.constrain_rec(fv, cv)?
        };
        self.ref_node(t);
        let e = if cnv == one {
            fnv
        } else if cnv == zero {
            self.deref(t);
            return Ok(t.not_cond(complement));
        } else {
            let e = self.constrain_rec(fnv, cnv);
            self.guard(e, &[t])?
        };
        self.ref_node(e);
        let r = self.build(index, t, e)?;

        self.cache_insert(key, r);
        Ok(r.not_cond(complement))
    }

    /// Restrict `f` to the care set `c`.
    ///
    /// The result is never larger than `f`: if restriction does not
    /// shrink the diagram, `f` itself is returned.
    pub fn restrict(&mut self, f: Ref, c: Ref) -> Result<Ref> {
        let one = self.one;
        if c == -one {
            return Ok(-one);
        }
        if self.is_constant(f) {
            return Ok(f);
        }
        if f == c {
            return Ok(one);
        }
        if f == -c {
            return Ok(-one);
        }

        let supp_f = self.support_indices(f);
        let supp_c = self.support_indices(c);
        if !supp_c.iter().any(|i| supp_f.contains(i)) {
            return Ok(f);
        }
        let only_c: Vec<_> = supp_c.into_iter().filter(|i| !supp_f.contains(i)).collect();
        let only_c = self.indices_to_cube(&only_c)?;
        self.ref_node(only_c);
        let c_plus = self.exist_abstract(c, only_c);
        self.ref_node_if_ok(&c_plus);
        self.recursive_deref(only_c);
        let c_plus = c_plus?;

        let res = self.run(|m| m.restrict_rec(f, c_plus));
        self.ref_node_if_ok(&res);
        self.recursive_deref(c_plus);
        let res = res?;
        Ok(self.smaller_or_first(f, res))
    }

    /// Given a referenced `res`, return whichever of `f` and `res` is
    /// smaller, unreferenced. Ties go to `f`.
    fn smaller_or_first(&mut self, f: Ref, res: Ref) -> Ref {
        if self.dag_size(f) <= self.dag_size(res) {
            self.recursive_deref(res);
            f
        } else {
            self.deref(res);
            res
        }
    }

    fn restrict_rec(&mut self, f: Ref, c: Ref) -> Step<Ref> {
        let one = self.one;
        let zero = -one;
        if c == one {
            return Ok(f);
        }
        if c == zero {
            return Ok(zero);
        }
        if self.is_constant(f) {
            return Ok(f);
        }
        if f == c {
            return Ok(one);
        }
        if f == -c {
            return Ok(zero);
        }
        let complement = f.is_negated();
        let f = f.regular();

        let key = OpKey::binary(Op::Restrict, f, c);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r.not_cond(complement));
        }

        let top_f = self.level(f);
        let top_c = self.level(c);
        if top_c < top_f {
            // Abstract the top variable of c, which f does not depend on.
            let (c1, c0) = self.cofactors(c);
            let d = self.or_rec(c1, c0)?;
            self.ref_node(d);
            let r = self.restrict_rec(f, d);
            let r = self.guard(r, &[d])?;
            let r = self.settle(r, &[d]);
            self.cache_insert(key, r);
            return Ok(r.not_cond(complement));
        }

        let index = self.node_index(f);
        let (fv, fnv) = self.cofactors(f);
        let (cv, cnv) = self.cofactors_at(c, top_f);

        let t = if cv == one {
            fv
        } else if cv == zero {
            let r = if cnv == one { fnv } else { self.restrict_rec(fnv, cnv)? };
            return Ok(r.not_cond(complement));
        } else {
            self.restrict_rec(fv, cv)?
        };
        self.ref_node(t);
        let e = if cnv == one {
            fnv
        } else if cnv == zero {
            self.deref(t);
            return Ok(t.not_cond(complement));
        } else {
            let e = self.restrict_rec(fnv, cnv);
            self.guard(e, &[t])?
        };
        self.ref_node(e);
        let r = self.build(index, t, e)?;

        self.cache_insert(key, r);
        Ok(r.not_cond(complement))
    }

    /// Non-polluting AND: like `f ∧ g`, but variables of `g` that `f`
    /// does not depend on are quantified away first, so the support of the
    /// result is contained in the support of `f`.
    pub fn np_and(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        self.run(|m| m.np_and_rec(f, g))
    }

    fn np_and_rec(&mut self, f: Ref, g: Ref) -> Step<Ref> {
        let one = self.one;
        if f.regular() == g.regular() {
            return Ok(if f == g { f } else { -one });
        }
        if g.regular() == one {
            return Ok(if g == one { f } else { g });
        }
        if f.regular() == one {
            return Ok(f);
        }

        let key = OpKey::binary(Op::NpAnd, f, g);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let top_f = self.level(f);
        let top_g = self.level(g);
        if top_g < top_f {
            let (g1, g0) = self.cofactors(g);
            let d = self.or_rec(g1, g0)?;
            self.ref_node(d);
            let r = self.np_and_rec(f, d);
            let r = self.guard(r, &[d])?;
            let r = self.settle(r, &[d]);
            self.cache_insert(key, r);
            return Ok(r);
        }

        let index = self.node_index(f);
        let (ft, fe) = self.cofactors(f);
        let (gt, ge) = self.cofactors_at(g, top_f);
        let t = self.and_rec(ft, gt)?;
        self.ref_node(t);
        let e = self.and_rec(fe, ge);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;

        self.cache_insert(key, r);
        Ok(r)
    }

    /// Safe minimization: a function agreeing with `f` on `c` whose
    /// diagram is never larger than that of `f`.
    pub fn lic_compaction(&mut self, f: Ref, c: Ref) -> Result<Ref> {
        if c == -self.one {
            return Ok(-self.one);
        }
        self.run(|m| {
            let mut marks = HashMap::new();
            let mut seen = HashMap::new();
            m.lic_mark_edges(f, c, &mut marks, &mut seen);
            let mut built = HashMap::new();
            let r = m.lic_build(f, &marks, &mut built);
            if let Ok(r) = r {
                m.ref_node(r);
            }
            for (_, v) in built {
                m.recursive_deref(v);
            }
            if let Ok(r) = r {
                m.deref(r);
            }
            r
        })
    }

    fn lic_mark_edges(&self, f: Ref, c: Ref, marks: &mut HashMap<NodeId, u8>, seen: &mut HashMap<(Ref, Ref), u8>) -> u8 {
        let one = self.one;
        if c == -one {
            return LIC_DC;
        }
        if f == one {
            return LIC_1;
        }
        if f == -one {
            return LIC_0;
        }
        let flip = |res: u8, complement: bool| match (complement, res) {
            (true, LIC_0) => LIC_1,
            (true, LIC_1) => LIC_0,
            _ => res,
        };
        let complement = f.is_negated();
        let f = f.regular();
        if let Some(&res) = seen.get(&(f, c)) {
            return flip(res, complement);
        }

        let top_f = self.level(f);
        let top_c = self.level(c);
        let (fv, fnv) = if top_f <= top_c { self.cofactors(f) } else { (f, f) };
        let (cv, cnv) = if top_c <= top_f { self.cofactors(c) } else { (c, c) };
        let res_t = self.lic_mark_edges(fv, cv, marks, seen);
        let res_e = self.lic_mark_edges(fnv, cnv, marks, seen);
        if top_f <= top_c {
            *marks.entry(f.id()).or_insert(0) |= (res_t << 2) | res_e;
        }
        let res = res_t | res_e;
        seen.insert((f, c), res);
        flip(res, complement)
    }

    fn lic_build(&mut self, f: Ref, marks: &HashMap<NodeId, u8>, built: &mut HashMap<NodeId, Ref>) -> Step<Ref> {
        if self.is_constant(f) {
            return Ok(f);
        }
        let complement = f.is_negated();
        let f = f.regular();
        if let Some(&r) = built.get(&f.id()) {
            return Ok(r.not_cond(complement));
        }
        let one = self.one;
        let Some(&markings) = marks.get(&f.id()) else {
            return Err(crate::error::DdError::Internal("unmarked node in compaction".to_string()).into());
        };
        let mark_t = markings >> 2;
        let mark_e = markings & 3;
        let index = self.node_index(f);
        let (fv, fnv) = self.cofactors(f);

        let t = match mark_t {
            LIC_NL => self.lic_build(fv, marks, built)?,
            LIC_1 => one,
            _ => -one,
        };
        self.ref_node(t);
        let e = match mark_e {
            LIC_NL => {
                let e = self.lic_build(fnv, marks, built);
                self.guard(e, &[t])?
            }
            LIC_1 => one,
            _ => -one,
        };
        self.ref_node(e);
        let r = if mark_t == LIC_DC && mark_e != LIC_DC {
            self.deref(t);
            self.deref(e);
            e
        } else if mark_t != LIC_DC && mark_e == LIC_DC {
            self.deref(t);
            self.deref(e);
            t
        } else {
            self.build(index, t, e)?
        };
        self.ref_node(r);
        built.insert(f.id(), r);
        Ok(r.not_cond(complement))
    }

    /// A small function `g` with `l ≤ g ≤ u`.
    pub fn squeeze(&mut self, l: Ref, u: Ref) -> Result<Ref> {
        let res = self.run(|m| m.squeeze_rec(l, u))?;
        self.ref_node(res);
        let mut best = res;
        // Compare with u first so that [0, 1] yields 0.
        if self.dag_size(u) <= self.dag_size(best) {
            self.recursive_deref(best);
            best = u;
            self.ref_node(best);
        }
        if self.dag_size(l) <= self.dag_size(best) {
            self.recursive_deref(best);
            best = l;
            self.ref_node(best);
        }
        self.deref(best);
        Ok(best)
    }

    fn squeeze_rec(&mut self, l: Ref, u: Ref) -> Step<Ref> {
        if l == u {
            return Ok(l);
        }
        let one = self.one;
        let zero = -one;
        if l == zero {
            return Ok(l);
        }
        if u == one {
            return Ok(u);
        }
        // Keep the upper bound regular: [l, u] ↦ ¬[¬u, ¬l].
        let (l, u, complement) = if u.is_negated() { (-u, -l, true) } else { (l, u, false) };

        let key = OpKey::binary(Op::Squeeze, l, u);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r.not_cond(complement));
        }

        let top = self.level(u).min(self.level(l));
        let index = self.node_index(if self.level(u) == top { u } else { l });
        let (ut, ue) = self.cofactors_at(u, top);
        let (lt, le) = self.cofactors_at(l, top);

        // One interval contains the other: use the smaller one.
        if (lt == zero || self.leq_bdd(lt, le)) && (ut == one || self.leq_bdd(ue, ut)) {
            let r = self.squeeze_rec(le, ue)?;
            return Ok(r.not_cond(complement));
        }
        if (le == zero || self.leq_bdd(le, lt)) && (ue == one || self.leq_bdd(ut, ue)) {
            let r = self.squeeze_rec(lt, ut)?;
            return Ok(r.not_cond(complement));
        }
        // Complemented matching: the result is x ≡ g for some g.
        if (le == zero || self.leq_bdd(le, -ut)) && (ue == one || self.leq_bdd(-lt, ue)) {
            let t = self.squeeze_rec(lt, ut)?;
            self.ref_node(t);
            let r = self.mk(index, t, -t);
            let r = self.guard(r, &[t])?;
            self.deref(t);
            self.cache_insert(key, r);
            return Ok(r.not_cond(complement));
        }
        if (lt == zero || self.leq_bdd(lt, -ue)) && (ut == one || self.leq_bdd(-le, ut)) {
            let e = self.squeeze_rec(le, ue)?;
            self.ref_node(e);
            let r = self.mk(index, -e, e);
            let r = self.guard(r, &[e])?;
            self.deref(e);
            self.cache_insert(key, r);
            return Ok(r.not_cond(complement));
        }

        let t = self.squeeze_rec(lt, ut)?;
        self.ref_node(t);
        let e = self.squeeze_rec(le, ue);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;
        self.cache_insert(key, r);
        Ok(r.not_cond(complement))
    }

    fn leq_bdd(&mut self, f: Ref, g: Ref) -> bool {
        self.leq(f, g)
    }

    /// A small function that agrees with `f` on the care set `c`.
    ///
    /// Runs safe minimization with `c` as the care set.
    pub fn minimize(&mut self, f: Ref, c: Ref) -> Result<Ref> {
        let one = self.one;
        if c == -one {
            return Ok(c);
        }
        if self.is_constant(f) {
            return Ok(f);
        }
        if f == c {
            return Ok(one);
        }
        if f == -c {
            return Ok(-one);
        }
        self.lic_compaction(f, c)
    }
}

// Vector decompositions.
impl Manager {
    /// Conjunctive decomposition `f = g_0 ∧ … ∧ g_{n-1}` with one component
    /// per variable, indexed by variable index.
    ///
    /// The component of `x_i` depends only on `x_i` and variables below it
    /// in the current order. Components of variables that never appear are
    /// the constant one. Every component is returned referenced.
    pub fn constrain_decomp(&mut self, f: Ref) -> Result<Vec<Ref>> {
        let mut decomp = vec![Ref::INVALID; self.vars.len()];
        let res = self.run(|m| {
            m.release_components(&mut decomp);
            m.constrain_decomp_rec(f, &mut decomp)
        });
        if let Err(e) = res {
            self.release_components(&mut decomp);
            return Err(e);
        }
        let one = self.one;
        for d in decomp.iter_mut().filter(|d| **d == Ref::INVALID) {
            *d = one;
            self.ref_node(one);
        }
        Ok(decomp)
    }

    fn constrain_decomp_rec(&mut self, f: Ref, decomp: &mut [Ref]) -> Step<()> {
        if self.is_constant(f) {
            return Ok(());
        }
        let index = self.node_index(f);
        let (fv, fnv) = self.cofactors(f);
        let f_abs = self.or_rec(fv, fnv)?;
        self.ref_node(f_abs);
        let res = self.constrain_decomp_rec(f_abs, decomp);
        self.guard(res, &[f_abs])?;
        let r = self.constrain_rec(f, f_abs);
        let r = self.guard(r, &[f_abs])?;
        self.ref_node(r);
        decomp[index as usize] = r;
        self.recursive_deref(f_abs);
        Ok(())
    }

    fn release_components(&mut self, components: &mut [Ref]) {
        for c in components.iter_mut() {
            if *c != Ref::INVALID {
                self.recursive_deref(*c);
                *c = Ref::INVALID;
            }
        }
    }

    /// A vector of functions, indexed by variable index, whose image is
    /// the non-empty set `f`.
    ///
    /// The component of the variable at level `i` depends only on variables
    /// at levels up to `i`, and every point of `f` is mapped to itself.
    /// Every component is returned referenced.
    pub fn char_to_vect(&mut self, f: Ref) -> Result<Vec<Ref>> {
        if f == -self.one {
            return Err(self.record_error(DdError::InvalidArgument("empty characteristic function".to_string())));
        }
        let mut vect = vec![Ref::INVALID; self.vars.len()];
        let res = self.run(|m| {
            m.release_components(&mut vect);
            for level in 0..m.vars.len() {
                let index = m.invperm[level] as usize;
                let x = m.vars[index];
                let r = m.char_to_vect_rec(f, x, level as Level)?;
                m.ref_node(r);
                vect[index] = r;
            }
            Ok(())
        });
        if let Err(e) = res {
            self.release_components(&mut vect);
            return Err(e);
        }
        Ok(vect)
    }

    /// Component for the projection `x` at `level`. `f` is never zero.
    fn char_to_vect_rec(&mut self, f: Ref, x: Ref, level: Level) -> Step<Ref> {
        let one = self.one;
        let zero = -one;
        let top = self.level(f);
        if top > level {
            return Ok(x);
        }
        let key = OpKey::binary(Op::CharToVect, f, x);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let (ft, fe) = self.cofactors(f);
        if top == level {
            return Ok(if ft == zero {
                zero
            } else if fe == zero {
                one
            } else {
                x
            });
        }
        if ft == zero {
            return self.char_to_vect_rec(fe, x, level);
        }
        if fe == zero {
            return self.char_to_vect_rec(ft, x, level);
        }

        let t = self.char_to_vect_rec(ft, x, level)?;
        self.ref_node(t);
        let e = self.char_to_vect_rec(fe, x, level);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let index = self.node_index(f);
        let r = self.build(index, t, e)?;
        self.cache_insert(key, r);
        Ok(r)
    }
}

// ADD variants.
impl Manager {
    /// Generalized cofactor of the ADD `f` by the 0-1 ADD `c`.
    pub fn add_constrain(&mut self, f: Ref, c: Ref) -> Result<Ref> {
        self.run(|m| m.add_constrain_rec(f, c))
    }

    fn add_constrain_rec(&mut self, f: Ref, c: Ref) -> Step<Ref> {
        let one = self.one;
        let zero = self.add_zero;
        if c == one {
            return Ok(f);
        }
        if c == zero {
            return Ok(zero);
        }
        if self.is_constant(f) {
            return Ok(f);
        }
        if f == c {
            return Ok(one);
        }

        let key = OpKey::binary(Op::AddConstrain, f, c);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let top = self.level(f).min(self.level(c));
        let index = self.node_index(if self.level(f) == top { f } else { c });
        let (fv, fnv) = self.cofactors_at(f, top);
        let (cv, cnv) = self.cofactors_at(c, top);

        let t = if cv == one {
            fv
        } else if cv == zero {
            return if cnv == one { Ok(fnv) } else { self.add_constrain_rec(fnv, cnv) };
        } else {
            self.add_constrain_rec(fv, cv)?
        };
        self.ref_node(t);
        let e = if cnv == one {
            fnv
        } else if cnv == zero {
            self.deref(t);
            return Ok(t);
        } else {
            let e = self.add_constrain_rec(fnv, cnv);
            self.guard(e, &[t])?
        };
        self.ref_node(e);
        let r = self.build(index, t, e)?;
        self.cache_insert(key, r);
        Ok(r)
    }

    /// Restrict the ADD `f` to the 0-1 ADD care set `c`. Never returns
    /// something larger than `f`.
    pub fn add_restrict(&mut self, f: Ref, c: Ref) -> Result<Ref> {
        let supp_f = self.support_indices(f);
        let supp_c = self.support_indices(c);
        if !supp_c.iter().any(|i| supp_f.contains(i)) {
            return Ok(f);
        }
        let res = self.run(|m| m.add_restrict_rec(f, c))?;
        self.ref_node(res);
        Ok(self.smaller_or_first(f, res))
    }

    fn add_restrict_rec(&mut self, f: Ref, c: Ref) -> Step<Ref> {
        let one = self.one;
        let zero = self.add_zero;
        if c == one {
            return Ok(f);
        }
        if c == zero {
            return Ok(zero);
        }
        if self.is_constant(f) {
            return Ok(f);
        }
        if f == c {
            return Ok(one);
        }

        let key = OpKey::binary(Op::AddRestrict, f, c);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let top_f = self.level(f);
        let top_c = self.level(c);
        if top_c < top_f {
            let (c1, c0) = self.cofactors(c);
            let d = self.add_apply_rec(AddOp::Or, c1, c0)?;
            self.ref_node(d);
            let r = self.add_restrict_rec(f, d);
            let r = self.guard(r, &[d])?;
            let r = self.settle(r, &[d]);
            self.cache_insert(key, r);
            return Ok(r);
        }

        let index = self.node_index(f);
        let (fv, fnv) = self.cofactors(f);
        let (cv, cnv) = self.cofactors_at(c, top_f);
        let t = if cv == one {
            fv
        } else if cv == zero {
            return if cnv == one { Ok(fnv) } else { self.add_restrict_rec(fnv, cnv) };
        } else {
            self.add_restrict_rec(fv, cv)?
        };
        self.ref_node(t);
        let e = if cnv == one {
            fnv
        } else if cnv == zero {
            self.deref(t);
            return Ok(t);
        } else {
            let e = self.add_restrict_rec(fnv, cnv);
            self.guard(e, &[t])?
        };
        self.ref_node(e);
        let r = self.build(index, t, e)?;
        self.cache_insert(key, r);
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::testing::{random_function, truth_table};

    /// `g` agrees with `f` wherever `c` holds.
    fn agrees_on(m: &Manager, f: Ref, g: Ref, c: Ref, n: usize) -> bool {
        let (tf, tg, tc) = (truth_table(m, f, n), truth_table(m, g, n), truth_table(m, c, n));
        (0..tf.len()).all(|i| !tc[i] || tf[i] == tg[i])
    }

    #[test]
    fn test_constrain_decomp_conjoins_to_f() {
        let n = 5;
        let mut m = Manager::new(n);
        for seed in 1..10u64 {
            let f = random_function(&mut m, seed, n);
            let decomp = m.constrain_decomp(f).unwrap();
            assert_eq!(decomp.len(), n);
            let tables: Vec<Vec<bool>> = decomp.iter().map(|&g| truth_table(&m, g, n)).collect();
            let tf = truth_table(&m, f, n);
            for row in 0..tf.len() {
                assert_eq!(tables.iter().all(|t| t[row]), tf[row], "seed {} row {}", seed, row);
            }
            for (i, &g) in decomp.iter().enumerate() {
                assert!(m.support_indices(g).iter().all(|&j| j as usize >= i), "seed {} component {}", seed, i);
            }
            for g in decomp {
                m.recursive_deref(g);
            }
            m.recursive_deref(f);
        }
        assert_eq!(m.check_zero_ref(), 0);
        assert!(m.debug_check().is_ok());
    }

    #[test]
    fn test_char_to_vect_image_is_f() {
        let n = 4;
        let mut m = Manager::new(n);
        assert!(m.char_to_vect(m.zero()).is_err());
        for seed in 1..12u64 {
            let f = random_function(&mut m, seed, n);
            if f == m.zero() {
                m.recursive_deref(f);
                continue;
            }
            let vect = m.char_to_vect(f).unwrap();
            assert_eq!(vect.len(), n);
            let tf = truth_table(&m, f, n);
            let tables: Vec<Vec<bool>> = vect.iter().map(|&g| truth_table(&m, g, n)).collect();
            let mut image = vec![false; tf.len()];
            for row in 0..tf.len() {
                let mapped = (0..n).filter(|&j| tables[j][row]).fold(0, |acc, j| acc | (1 << j));
                assert!(tf[mapped], "seed {} row {} maps outside f", seed, row);
                if tf[row] {
                    assert_eq!(mapped, row, "seed {}", seed);
                }
                image[mapped] = true;
            }
            assert_eq!(image, tf, "seed {}", seed);
            for (i, &g) in vect.iter().enumerate() {
                assert!(m.support_indices(g).iter().all(|&j| j as usize <= i), "seed {} component {}", seed, i);
            }
            for g in vect {
                m.recursive_deref(g);
            }
            m.recursive_deref(f);
        }
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_constrain_special_cases() {
        let mut m = Manager::new(2);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let f = m.and(x, y).unwrap();
        m.ref_node(f);
        assert_eq!(m.constrain(f, m.one()).unwrap(), f);
        assert_eq!(m.constrain(f, m.zero()).unwrap(), m.zero());
        assert_eq!(m.constrain(f, f).unwrap(), m.one());
        assert_eq!(m.constrain(f, -f).unwrap(), m.zero());
        assert_eq!(m.constrain(f, x).unwrap(), y);
        m.recursive_deref(f);
    }

    #[test]
    fn test_generalized_cofactors_agree_on_care_set() {
        let n = 5;
        let mut m = Manager::new(n);
        for seed in 1..10u64 {
            let f = random_function(&mut m, seed, n);
            let c = random_function(&mut m, seed + 50, n);
            if c == m.zero() {
                m.recursive_deref(f);
                m.recursive_deref(c);
                continue;
            }
            for op in 0..4 {
                let g = match op {
                    0 => m.constrain(f, c),
                    1 => m.restrict(f, c),
                    2 => m.lic_compaction(f, c),
                    _ => m.minimize(f, c),
                }
                .unwrap();
                m.ref_node(g);
                assert!(agrees_on(&m, f, g, c, n), "operation {} seed {}", op, seed);
                if op >= 1 {
                    assert!(m.dag_size(g) <= m.dag_size(f));
                }
                m.recursive_deref(g);
            }
            m.recursive_deref(f);
            m.recursive_deref(c);
        }
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_restrict_disjoint_support_returns_f() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let z = m.ith_var(2).unwrap();
        assert_eq!(m.restrict(x, z).unwrap(), x);
    }

    #[test]
    fn test_np_and_support() {
        let n = 4;
        let mut m = Manager::new(n);
        for seed in 1..8u64 {
            let f = random_function(&mut m, seed, n);
            let g = random_function(&mut m, seed + 9, n);
            let r = m.np_and(f, g).unwrap();
            m.ref_node(r);
            let supp_f = m.support_indices(f);
            assert!(m.support_indices(r).iter().all(|i| supp_f.contains(i)));
            // f ∧ g ≤ npand(f, g) ≤ f
            let fg = m.and(f, g).unwrap();
            assert!(m.leq(fg, r));
            assert!(m.leq(r, f));
            for x in [r, f, g] {
                m.recursive_deref(x);
            }
        }
    }

    #[test]
    fn test_squeeze_in_interval() {
        let n = 5;
        let mut m = Manager::new(n);
        for seed in 1..10u64 {
            let a = random_function(&mut m, seed, n);
            let b = random_function(&mut m, seed + 20, n);
            let l = m.and(a, b).unwrap();
            m.ref_node(l);
            let u = m.or(a, b).unwrap();
            m.ref_node(u);
            let s = m.squeeze(l, u).unwrap();
            m.ref_node(s);
            assert!(m.leq(l, s));
            assert!(m.leq(s, u));
            assert!(m.dag_size(s) <= m.dag_size(l).min(m.dag_size(u)));
            for x in [a, b, l, u, s] {
                m.recursive_deref(x);
            }
        }
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_add_constrain_and_restrict() {
        let mut m = Manager::new(2);
        let x = m.add_ith_var(0).unwrap();
        m.ref_node(x);
        let y = m.add_ith_var(1).unwrap();
        m.ref_node(y);
        let f = m.add_apply(AddOp::Plus, x, y).unwrap();
        m.ref_node(f);
        // Constrained to x = 1, f becomes 1 + y.
        let g = m.add_constrain(f, x).unwrap();
        m.ref_node(g);
        let one = m.one();
        let expected = m.add_apply(AddOp::Plus, y, one).unwrap();
        assert_eq!(g, expected);
        let h = m.add_restrict(f, x).unwrap();
        assert_eq!(m.add_eval(h, &[true, false]), 1.0);
        assert_eq!(m.add_eval(h, &[true, true]), 2.0);
        assert_eq!(m.add_constrain(f, m.add_zero()).unwrap(), m.add_zero());
        for r in [x, y, f, g] {
            m.recursive_deref(r);
        }
    }
}
