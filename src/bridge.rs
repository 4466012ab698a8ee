//! Conversions between BDDs and ADDs, and between managers.

use std::collections::HashMap;

use crate::cache::{Op, OpKey};
use crate::error::{DdError, Result, Step};
use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::NodeId;

/// Leaf predicate used when turning an ADD into a BDD.
#[derive(Debug, Copy, Clone)]
enum LeafTest {
    /// Leaf differs from `0.0`.
    Pattern,
    /// `v >= t`.
    Threshold(f64),
    /// `v > t`.
    StrictThreshold(f64),
    /// `l <= v <= u`.
    Interval(f64, f64),
    /// Bit `i` of the integer part of `v` is set.
    IthBit(u32),
}

impl LeafTest {
    fn holds(self, v: f64) -> bool {
        match self {
            LeafTest::Pattern => v != 0.0,
            LeafTest::Threshold(t) => v >= t,
            LeafTest::StrictThreshold(t) => v > t,
            LeafTest::Interval(l, u) => l <= v && v <= u,
            LeafTest::IthBit(i) => i < 64 && (v as i64) & (1i64 << i) != 0,
        }
    }

    fn op(self) -> Op {
        match self {
            LeafTest::Pattern => Op::AddBddPattern,
            LeafTest::Threshold(_) => Op::AddBddThreshold,
            LeafTest::StrictThreshold(_) => Op::AddBddStrictThreshold,
            LeafTest::Interval(..) => Op::AddBddInterval,
            LeafTest::IthBit(_) => Op::AddBddIthBit,
        }
    }
}

impl Manager {
    /// The 0-1 ADD of the BDD `f`.
    pub fn bdd_to_add(&mut self, f: Ref) -> Result<Ref> {
        self.run(|m| m.bdd_to_add_rec(f))
    }

    fn bdd_to_add_rec(&mut self, f: Ref) -> Step<Ref> {
        if f == self.one {
            return Ok(self.one);
        }
        if f == -self.one {
            return Ok(self.add_zero);
        }
        let key = OpKey::unary(Op::BddToAdd, f);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }
        let index = self.node_index(f);
        let (ft, fe) = self.cofactors(f);
        let t = self.bdd_to_add_rec(ft)?;
        self.ref_node(t);
        let e = self.bdd_to_add_rec(fe);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;
        self.cache_insert(key, r);
        Ok(r)
    }

    /// BDD of the points where the ADD `f` is not `0.0`.
    pub fn add_bdd_pattern(&mut self, f: Ref) -> Result<Ref> {
        self.add_to_bdd(f, LeafTest::Pattern, Ref::INVALID, Ref::INVALID)
    }

    /// BDD of the points where `f >= value`.
    pub fn add_bdd_threshold(&mut self, f: Ref, value: f64) -> Result<Ref> {
        self.add_to_bdd_with_const(f, LeafTest::Threshold(value), &[value])
    }

    /// BDD of the points where `f > value`.
    pub fn add_bdd_strict_threshold(&mut self, f: Ref, value: f64) -> Result<Ref> {
        self.add_to_bdd_with_const(f, LeafTest::StrictThreshold(value), &[value])
    }

    /// BDD of the points where `lower <= f <= upper`.
    pub fn add_bdd_interval(&mut self, f: Ref, lower: f64, upper: f64) -> Result<Ref> {
        self.add_to_bdd_with_const(f, LeafTest::Interval(lower, upper), &[lower, upper])
    }

    /// BDD of the points where bit `bit` of the integer part of `f` is set.
    pub fn add_bdd_ith_bit(&mut self, f: Ref, bit: u32) -> Result<Ref> {
        self.add_to_bdd(f, LeafTest::IthBit(bit), Ref::INVALID, Ref::INVALID)
    }

    /// Parameters live in the cache key as terminal nodes, referenced for
    /// the duration of the conversion.
    fn add_to_bdd_with_const(&mut self, f: Ref, test: LeafTest, values: &[f64]) -> Result<Ref> {
        let mut consts = Vec::with_capacity(values.len());
        for &v in values {
            match self.add_const(v) {
                Ok(c) => {
                    self.ref_node(c);
                    consts.push(c);
                }
                Err(e) => {
                    for c in consts {
                        self.recursive_deref(c);
                    }
                    return Err(e);
                }
            }
        }
        let g = consts.first().copied().unwrap_or(Ref::INVALID);
        let h = consts.get(1).copied().unwrap_or(Ref::INVALID);
        let res = self.add_to_bdd(f, test, g, h);
        if let Ok(r) = res {
            self.ref_node(r);
        }
        for c in consts {
            self.recursive_deref(c);
        }
        if let Ok(r) = res {
            self.deref(r);
        }
        res
    }

    fn add_to_bdd(&mut self, f: Ref, test: LeafTest, g: Ref, h: Ref) -> Result<Ref> {
        let aux = match test {
            LeafTest::IthBit(i) => i,
            _ => 0,
        };
        let key = OpKey::unary(test.op(), Ref::INVALID).with_aux(aux);
        let key = OpKey { g, h, ..key };
        self.run(|m| m.add_to_bdd_rec(f, test, key))
    }

    fn add_to_bdd_rec(&mut self, f: Ref, test: LeafTest, key: OpKey) -> Step<Ref> {
        if let Some(v) = self.value(f) {
            return Ok(if test.holds(v) { self.one } else { -self.one });
        }
        let key = OpKey { f, ..key };
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }
        let index = self.node_index(f);
        let (ft, fe) = self.cofactors(f);
        let t = self.add_to_bdd_rec(ft, test, key)?;
        self.ref_node(t);
        let e = self.add_to_bdd_rec(fe, test, key);
        let e = self.guard(e, &[t])?;
        self.ref_node(e);
        let r = self.build(index, t, e)?;
        self.cache_insert(key, r);
        Ok(r)
    }
}

// Transfer.
impl Manager {
    /// Copy the BDD `f` of this manager into `dst`.
    ///
    /// Variables are matched by index; `dst` grows to hold every variable
    /// `f` depends on, and its own order is respected. The result belongs
    /// to `dst` and is unreferenced.
    pub fn bdd_transfer(&self, f: Ref, dst: &mut Manager) -> Result<Ref> {
        let mut table: HashMap<NodeId, Ref> = HashMap::new();
        let res = self.transfer_rec(f, dst, &mut table);
        if let Ok(r) = res {
            dst.ref_node(r);
        }
        for (_, r) in table {
            dst.recursive_deref(r);
        }
        if let Ok(r) = res {
            dst.deref(r);
        }
        res
    }

    fn transfer_rec(&self, f: Ref, dst: &mut Manager, table: &mut HashMap<NodeId, Ref>) -> Result<Ref> {
        let complement = f.is_negated();
        if self.is_constant(f) {
            return match self.value(f) {
                Some(v) if v == 1.0 => Ok(dst.one().not_cond(complement)),
                _ => Err(DdError::InvalidArgument("not a BDD".to_string())),
            };
        }
        let f = f.regular();
        if let Some(&r) = table.get(&f.id()) {
            return Ok(r.not_cond(complement));
        }
        let index = self.node_index(f);
        let (ft, fe) = self.cofactors(f);
        let t = self.transfer_rec(ft, dst, table)?;
        dst.ref_node(t);
        let e = match self.transfer_rec(fe, dst, table) {
            Ok(e) => e,
            Err(err) => {
                dst.recursive_deref(t);
                return Err(err);
            }
        };
        dst.ref_node(e);
        let r = dst.ith_var(index).and_then(|v| dst.ite(v, t, e));
        dst.ref_node_if_ok(&r);
        dst.recursive_deref(t);
        dst.recursive_deref(e);
        let r = r?;
        table.insert(f.id(), r);
        Ok(r.not_cond(complement))
    }
}
