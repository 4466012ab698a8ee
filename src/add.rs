//! Algebraic decision diagrams.
//!
//! ADDs share the node arena with BDDs but never use complemented edges:
//! every leaf is an explicit terminal holding an `f64`. The 0-1 ADDs
//! (leaves [`one`][Manager::one] and [`add_zero`][Manager::add_zero]) act
//! as Boolean functions for [`add_ite`][Manager::add_ite] and the Boolean
//! operators of [`AddOp`].

use std::collections::HashMap;

use crate::cache::{Op, OpKey};
use crate::error::{Result, Step};
use crate::manager::Manager;
use crate::reference::Ref;

/// Binary operators for [`Manager::add_apply`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AddOp {
    Plus,
    Times,
    Minus,
    Divide,
    Minimum,
    Maximum,
    /// Boolean OR of 0-1 ADDs.
    Or,
    /// Boolean AND of 0-1 ADDs.
    And,
    /// Boolean XOR of 0-1 ADDs.
    Xor,
    /// `f` where `f == g`, background (`0.0`) elsewhere.
    Agreement,
    /// `f` where `f >= g`, `0.0` elsewhere.
    Threshold,
}

impl AddOp {
    fn is_commutative(self) -> bool {
        matches!(
            self,
            AddOp::Plus | AddOp::Times | AddOp::Minimum | AddOp::Maximum | AddOp::Or | AddOp::And | AddOp::Xor
        )
    }
}

impl Manager {
    /// Apply `op` pointwise to the ADDs `f` and `g`.
    pub fn add_apply(&mut self, op: AddOp, f: Ref, g: Ref) -> Result<Ref> {
        self.run(|m| m.add_apply_rec(op, f, g))
    }

    /// Result of `op` when it can be read off the operands directly.
    fn add_apply_terminal(&mut self, op: AddOp, f: Ref, g: Ref) -> Step<Option<Ref>> {
        let one = self.one;
        let zero = self.add_zero;
        let both_const = self.is_constant(f) && self.is_constant(g);
        let (fv, gv) = (self.value(f).unwrap_or(0.0), self.value(g).unwrap_or(0.0));
        let r = match op {
            AddOp::Plus => {
                if f == zero {
                    Some(g)
                } else if g == zero {
                    Some(f)
                } else if both_const {
                    Some(self.unique_const(fv + gv)?)
                } else {
                    None
                }
            }
            AddOp::Times => {
                if f == zero || g == zero {
                    Some(zero)
                } else if f == one {
                    Some(g)
                } else if g == one {
                    Some(f)
                } else if both_const {
                    Some(self.unique_const(fv * gv)?)
                } else {
                    None
                }
            }
            AddOp::Minus => {
                if f == g {
                    Some(zero)
                } else if f == zero {
                    Some(self.add_negate_rec(g)?)
                } else if g == zero {
                    Some(f)
                } else if both_const {
                    Some(self.unique_const(fv - gv)?)
                } else {
                    None
                }
            }
            AddOp::Divide => {
                if f == zero {
                    Some(zero)
                } else if g == one {
                    Some(f)
                } else if both_const {
                    Some(self.unique_const(fv / gv)?)
                } else {
                    None
                }
            }
            AddOp::Minimum => {
                if f == self.plus_inf {
                    Some(g)
                } else if g == self.plus_inf || f == g {
                    Some(f)
                } else if both_const {
                    Some(if fv <= gv { f } else { g })
                } else {
                    None
                }
            }
            AddOp::Maximum => {
                if f == g || g == self.minus_inf {
                    Some(f)
                } else if f == self.minus_inf {
                    Some(g)
                } else if both_const {
                    Some(if fv >= gv { f } else { g })
                } else {
                    None
                }
            }
            AddOp::Or => {
                if f == one || g == one {
                    Some(one)
                } else if self.is_constant(f) {
                    Some(g)
                } else if self.is_constant(g) || f == g {
                    Some(f)
                } else {
                    None
                }
            }
            AddOp::And => {
                if f == zero || g == zero {
                    Some(zero)
                } else if self.is_constant(f) {
                    Some(g)
                } else if self.is_constant(g) || f == g {
                    Some(f)
                } else {
                    None
                }
            }
            AddOp::Xor => {
                if f == g {
                    Some(zero)
                } else if (f == one && g == zero) || (f == zero && g == one) {
                    Some(one)
                } else if both_const {
                    Some(zero)
                } else {
                    None
                }
            }
            AddOp::Agreement => {
                if f == g || f == zero {
                    Some(f)
                } else if g == zero {
                    Some(g)
                } else if both_const {
                    Some(zero)
                } else {
                    None
                }
            }
            AddOp::Threshold => {
                if f == g || f == self.plus_inf {
                    Some(f)
                } else if both_const {
                    Some(if fv >= gv { f } else { zero })
                } else {
                    None
                }
            }
        };
        Ok(r)
    }

    pub(crate) fn add_apply_rec(&mut self, op: AddOp, f: Ref, g: Ref) -> Step<Ref> {
        if let Some(r) = self.add_apply_terminal(op, f, g)? {
            return Ok(r);
        }
        let (f, g) = if op.is_commutative() && f > g { (g, f) } else { (f, g) };

        let key = OpKey::binary(Op::AddApply, f, g).with_aux(op as u32);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let top = self.level(f).min(self.level(g));
        let index = self.node_index(if self.level(f) == top { f } else { g });
        let (fv, fnv) = self.cofactors_at(f, top);
        let (gv, gnv) = self.cofactors_at(g, top);

        let t = self.add_apply_rec(op, fv, gv)?;
        self.ref_node(t);
        let e = self.add_apply_rec(op, fnv, gnv);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;

        self.cache_insert(key, r);
        Ok(r)
    }

    /// `f ? g : h` where `f` is a 0-1 ADD.
    pub fn add_ite(&mut self, f: Ref, g: Ref, h: Ref) -> Result<Ref> {
        self.run(|m| m.add_ite_rec(f, g, h))
    }

    fn add_ite_rec(&mut self, f: Ref, g: Ref, h: Ref) -> Step<Ref> {
        let one = self.one;
        let zero = self.add_zero;
        if f == zero {
            return Ok(h);
        }
        if self.is_constant(f) {
            return Ok(g);
        }
        // Operands equal to f are known constants in each branch.
        let g = if g == f { one } else { g };
        let h = if h == f { zero } else { h };
        if g == h {
            return Ok(g);
        }
        if g == one && h == zero {
            return Ok(f);
        }

        let top_f = self.level(f);
        let top_g = self.level(g);
        let top_h = self.level(h);
        let v = top_g.min(top_h);
        let index_f = self.node_index(f);

        // f is a single variable above g and h.
        if top_f < v {
            if let Some((t, e)) = self.nodes[f.id() as usize].children() {
                if t == one && e == zero {
                    return self.mk(index_f, g, h);
                }
                if t == zero && e == one {
                    return self.mk(index_f, h, g);
                }
            }
        }

        let key = OpKey::ternary(Op::AddIte, f, g, h);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let v = v.min(top_f);
        let index = [f, g, h]
            .into_iter()
            .find(|&x| self.level(x) == v)
            .map(|x| self.node_index(x))
            .unwrap_or(index_f);
        let (fv, fnv) = self.cofactors_at(f, v);
        let (gv, gnv) = self.cofactors_at(g, v);
        let (hv, hnv) = self.cofactors_at(h, v);

        let t = self.add_ite_rec(fv, gv, hv)?;
        self.ref_node(t);
        let e = self.add_ite_rec(fnv, gnv, hnv);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;

        self.cache_insert(key, r);
        Ok(r)
    }

    /// Complement of a 0-1 ADD: zero leaves become one, every other leaf
    /// becomes zero.
    pub fn add_cmpl(&mut self, f: Ref) -> Result<Ref> {
        self.run(|m| m.add_cmpl_rec(f))
    }

    fn add_cmpl_rec(&mut self, f: Ref) -> Step<Ref> {
        if self.is_constant(f) {
            return Ok(if f == self.add_zero { self.one } else { self.add_zero });
        }
        let key = OpKey::unary(Op::AddCmpl, f);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }
        let index = self.node_index(f);
        let (fv, fnv) = self.cofactors(f);
        let t = self.add_cmpl_rec(fv)?;
        self.ref_node(t);
        let e = self.add_cmpl_rec(fnv);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;
        self.cache_insert(key, r);
        Ok(r)
    }

    /// Arithmetic negation of every leaf.
    pub fn add_negate(&mut self, f: Ref) -> Result<Ref> {
        self.run(|m| m.add_negate_rec(f))
    }

    fn add_negate_rec(&mut self, f: Ref) -> Step<Ref> {
        if let Some(v) = self.value(f) {
            return Ok(self.unique_const(-v)?);
        }
        let key = OpKey::unary(Op::AddNegate, f);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }
        let index = self.node_index(f);
        let (fv, fnv) = self.cofactors(f);
        let t = self.add_negate_rec(fv)?;
        self.ref_node(t);
        let e = self.add_negate_rec(fnv);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;
        self.cache_insert(key, r);
        Ok(r)
    }

    /// Terminal holding the largest leaf of `f`.
    pub fn add_find_max(&self, f: Ref) -> Ref {
        self.add_find_extreme(f, true, &mut HashMap::new())
    }

    /// Terminal holding the smallest leaf of `f`.
    pub fn add_find_min(&self, f: Ref) -> Ref {
        self.add_find_extreme(f, false, &mut HashMap::new())
    }

    fn add_find_extreme(&self, f: Ref, max: bool, memo: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_constant(f) {
            return f;
        }
        if let Some(&r) = memo.get(&f) {
            return r;
        }
        let (fv, fnv) = self.cofactors(f);
        let t = self.add_find_extreme(fv, max, memo);
        // Nothing beats an infinity.
        if (max && t == self.plus_inf) || (!max && t == self.minus_inf) {
            return t;
        }
        let e = self.add_find_extreme(fnv, max, memo);
        let (tv, ev) = (self.value(t).unwrap_or(0.0), self.value(e).unwrap_or(0.0));
        let r = if (max && tv >= ev) || (!max && tv <= ev) { t } else { e };
        memo.insert(f, r);
        r
    }

    /// Leaf value of `f` under the assignment `inputs`, indexed by variable.
    pub fn add_eval(&self, f: Ref, inputs: &[bool]) -> f64 {
        let mut f = f;
        loop {
            if let Some(v) = self.value(f) {
                return v;
            }
            let (t, e) = self.cofactors(f);
            let index = self.node_index(f) as usize;
            f = if inputs.get(index).copied().unwrap_or(false) { t } else { e };
        }
    }
}
