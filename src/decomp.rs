//! Two-way conjunctive and disjunctive decompositions.
//!
//! - [`var_conj_decomp`][Manager::var_conj_decomp]: `f = (f ∨ x) ∧ (f ∨ ¬x)`
//!   for a single variable `x`, picked to keep the larger cofactor small.
//! - [`gen_conj_decomp`][Manager::gen_conj_decomp]: generalizes the single
//!   variable split to a frontier of nodes chosen by depth and sharing,
//!   and tends to give balanced factors.
//! - [`iter_conj_decomp`][Manager::iter_conj_decomp]: repeatedly peels off
//!   a superset of the function, and tends to give imbalanced factors.
//!
//! The generalized and iterated procedures return one referenced factor
//! when no meaningful split exists, and two otherwise. The disjunctive
//! variants decompose the complement.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::{Result, Step};
use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::{NodeId, VarIndex};

/// Diagrams whose longest path is shorter than this are not split.
const DECOMP_DEPTH: u32 = 5;

#[derive(Debug, Default, Copy, Clone)]
struct NodeStat {
    /// Longest path to a terminal.
    distance: u32,
    /// Edges into the node from inside the decomposed function.
    local_ref: u32,
}

/// Working state of [`Manager::gen_conj_decomp`].
#[derive(Debug, Default)]
struct Conjuncts {
    stats: HashMap<NodeId, NodeStat>,
    approx: u32,
    max_local_ref: u32,
    /// Factor pairs found so far. Each member holds one reference.
    pairs: HashMap<Ref, (Ref, Ref)>,
    /// Bit 1: used as a `g` factor. Bit 2: used as an `h` factor.
    roles: HashMap<NodeId, u8>,
    last_g: bool,
}

impl Conjuncts {
    fn is_split_point(&self, f: Ref) -> bool {
        let stat = self.stats.get(&f.id()).copied().unwrap_or_default();
        (stat.local_ref > self.max_local_ref * 2 / 3 && stat.distance < self.approx * 2 / 3)
            || stat.distance <= self.approx / 4
    }

    /// Put `f` in one factor and the constant `one` in the other, keeping
    /// the role `f` already has and alternating otherwise.
    fn split(&mut self, f: Ref, one: Ref) -> (Ref, Ref) {
        let role = self.roles.get(&f.id()).copied();
        let as_g = match role {
            Some(1) => true,
            Some(2) => false,
            _ => !self.last_g,
        };
        match role {
            Some(1) | Some(2) => {}
            Some(_) => self.last_g = as_g,
            None => {
                self.last_g = as_g;
                self.roles.insert(f.id(), if as_g { 1 } else { 2 });
            }
        }
        if as_g {
            (f, one)
        } else {
            (one, f)
        }
    }

    /// How many members of the pair already play the same role elsewhere.
    fn reuse(&self, (g, h): (Ref, Ref), one: Ref) -> u8 {
        let has = |r: Ref, bit: u8| r != one && self.roles.get(&r.id()).is_some_and(|&v| v & bit != 0);
        has(g, 1) as u8 + has(h, 2) as u8
    }

    fn record(&mut self, f: Ref, (g, h): (Ref, Ref), one: Ref) {
        if g != one {
            *self.roles.entry(g.id()).or_default() |= 1;
        }
        if h != one {
            *self.roles.entry(h.id()).or_default() |= 2;
        }
        self.pairs.insert(f, (g, h));
    }
}

impl Manager {
    /// Number of nodes of `f` restricted to `x_index = phase`, counted
    /// without building the cofactor.
    pub fn estimate_cofactor(&self, f: Ref, index: VarIndex, phase: bool) -> usize {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![f.id()];
        let mut count = 0;
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = &self.nodes[id as usize];
            match node.children() {
                Some((t, e)) if node.index == index => {
                    stack.push(if phase { t.id() } else { e.id() });
                }
                Some((t, e)) => {
                    count += 1;
                    stack.push(t.id());
                    stack.push(e.id());
                }
                None => count += 1,
            }
        }
        count
    }

    fn best_decomposition_var(&self, f: Ref) -> Option<VarIndex> {
        self.support_indices(f).into_iter().min_by_key(|&i| {
            let est1 = self.estimate_cofactor(f, i, true);
            let est0 = self.estimate_cofactor(f, i, false);
            est1.max(est0)
        })
    }

    /// Conjunctive decomposition `f = g ∧ h`.
    ///
    /// Both parts are returned referenced. When no split helps, `g` is `f`
    /// and `h` is the constant one.
    pub fn var_conj_decomp(&mut self, f: Ref) -> Result<(Ref, Ref)> {
        let one = self.one;
        let Some(best) = self.best_decomposition_var(f) else {
            self.ref_node(f);
            self.ref_node(one);
            return Ok((f, one));
        };
        debug!("decomposing on variable {}", best);
        let var = self.vars[best as usize];
        let g = self.or(f, var)?;
        self.ref_node(g);
        let h = match self.or(f, -var) {
            Ok(h) => h,
            Err(e) => {
                self.recursive_deref(g);
                return Err(e);
            }
        };
        self.ref_node(h);
        if g == one {
            Ok((h, g))
        } else {
            Ok((g, h))
        }
    }

    /// Disjunctive decomposition `f = g ∨ h`. Both parts are referenced.
    pub fn var_disj_decomp(&mut self, f: Ref) -> Result<(Ref, Ref)> {
        let (g, h) = self.var_conj_decomp(-f)?;
        Ok((-g, -h))
    }

    /// Balanced conjunctive decomposition of `f` into one or two factors.
    pub fn gen_conj_decomp(&mut self, f: Ref) -> Result<Vec<Ref>> {
        let one = self.one;
        let mut st = Conjuncts {
            last_g: self.rng.below(2) == 1,
            ..Conjuncts::default()
        };
        let res = self.run(|m| {
            m.release_pairs(&mut st);
            let mut stats = HashMap::new();
            let distance = m.node_stats(f, &mut stats);
            if distance < DECOMP_DEPTH {
                m.ref_node(f);
                m.ref_node(one);
                return Ok((f, one));
            }
            st.max_local_ref = stats.values().map(|s| s.local_ref).max().unwrap_or(0);
            st.stats = stats;
            st.approx = distance;
            let (g, h) = m.conjuncts_rec(f, &mut st)?;
            m.ref_node(g);
            m.ref_node(h);
            Ok((g, h))
        });
        self.release_pairs(&mut st);
        let (g, h) = res?;
        debug!("balanced decomposition: {} and {} nodes", self.dag_size(g), self.dag_size(h));
        Ok(self.nontrivial_factors(g, h))
    }

    /// Balanced disjunctive decomposition of `f` into one or two factors.
    pub fn gen_disj_decomp(&mut self, f: Ref) -> Result<Vec<Ref>> {
        Ok(self.gen_conj_decomp(-f)?.into_iter().map(|g| -g).collect())
    }

    /// Keep the factors that are not the constant one; `f = 1` keeps one.
    fn nontrivial_factors(&mut self, g: Ref, h: Ref) -> Vec<Ref> {
        let one = self.one;
        if g == one {
            self.recursive_deref(g);
            vec![h]
        } else if h == one {
            self.recursive_deref(h);
            vec![g]
        } else {
            vec![g, h]
        }
    }

    fn release_pairs(&mut self, st: &mut Conjuncts) {
        for (_, (g, h)) in st.pairs.drain() {
            self.recursive_deref(g);
            self.recursive_deref(h);
        }
        st.roles.clear();
    }

    /// Longest distance to a terminal of every node below `f`, and how
    /// many edges reach it. Returns the distance of `f`.
    fn node_stats(&self, f: Ref, stats: &mut HashMap<NodeId, NodeStat>) -> u32 {
        if let Some(stat) = stats.get_mut(&f.id()) {
            stat.local_ref += 1;
            return stat.distance;
        }
        let distance = match self.nodes[f.id() as usize].children() {
            Some((t, e)) => 1 + self.node_stats(t, stats).max(self.node_stats(e, stats)),
            None => 0,
        };
        stats.insert(f.id(), NodeStat { distance, local_ref: 1 });
        distance
    }

    /// Factor pair `(g, h)` with `g ∧ h = f`. Pairs of nodes below the
    /// split frontier are owned by `st`.
    fn conjuncts_rec(&mut self, f: Ref, st: &mut Conjuncts) -> Step<(Ref, Ref)> {
        let one = self.one;
        let zero = -one;
        if self.is_constant(f) {
            return Ok((f, f));
        }
        if let Some(&pair) = st.pairs.get(&f) {
            return Ok(pair);
        }
        if st.is_split_point(f) {
            return Ok(st.split(f, one));
        }

        let index = self.node_index(f);
        let var = self.vars[index as usize];
        let (t, e) = self.cofactors(f);

        if t == zero || e == zero {
            // The literal joins whichever factor is not trivial.
            let (child, lit) = if e == zero { (t, var) } else { (e, -var) };
            let (g, h) = self.conjuncts_rec(child, st)?;
            let pair = if g != one {
                (self.and_rec(lit, g)?, h)
            } else {
                (g, self.and_rec(lit, h)?)
            };
            self.ref_node(pair.0);
            self.ref_node(pair.1);
            st.record(f, pair, one);
            return Ok(pair);
        }

        let (gt, ht) = self.conjuncts_rec(t, st)?;
        let (ge, he) = self.conjuncts_rec(e, st)?;
        let g1 = self.ite_rec(var, gt, ge)?;
        self.ref_node(g1);
        let h1 = self.ite_rec(var, ht, he);
        let h1 = self.guard(h1, &[g1])?;
        self.ref_node(h1);
        let g2 = self.ite_rec(var, gt, he);
        let g2 = self.guard(g2, &[g1, h1])?;
        self.ref_node(g2);
        let h2 = self.ite_rec(var, ht, ge);
        let h2 = self.guard(h2, &[g1, h1, g2])?;
        self.ref_node(h2);

        let (first, second) = ((g1, h1), (g2, h2));
        let keep_first = match st.reuse(first, one).cmp(&st.reuse(second, one)) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.pair_refs(first) >= self.pair_refs(second),
        };
        let (keep, drop) = if keep_first { (first, second) } else { (second, first) };
        self.recursive_deref(drop.0);
        self.recursive_deref(drop.1);
        st.record(f, keep, one);
        Ok(keep)
    }

    /// Average reference count of the nontrivial members of a pair.
    fn pair_refs(&self, (g, h): (Ref, Ref)) -> u64 {
        let one = self.one;
        let refs = |r: Ref| self.ref_count(r) as u64;
        match (g == one, h == one) {
            (_, true) => refs(g),
            (true, false) => refs(h),
            (false, false) => (refs(g) + refs(h)) / 2,
        }
    }

    /// Conjunctive decomposition of `f` into one or two factors, found by
    /// repeatedly over-approximating the second factor and minimizing it
    /// against the first.
    pub fn iter_conj_decomp(&mut self, f: Ref) -> Result<Vec<Ref>> {
        let one = self.one;
        if self.is_constant(f) {
            self.ref_node(f);
            return Ok(vec![f]);
        }
        let (mut g, mut h) = (one, f);
        self.ref_node(g);
        self.ref_node(h);
        let mut size = self.shared_size(&[g, h]);
        loop {
            match self.iter_conj_step(g, h) {
                Ok(Some((g_new, h_new))) => {
                    let size_new = self.shared_size(&[g_new, h_new]);
                    if size_new > size {
                        self.recursive_deref(g_new);
                        self.recursive_deref(h_new);
                        break;
                    }
                    self.recursive_deref(g);
                    self.recursive_deref(h);
                    (g, h, size) = (g_new, h_new, size_new);
                }
                Ok(None) => break,
                Err(e) => {
                    self.recursive_deref(g);
                    self.recursive_deref(h);
                    return Err(e);
                }
            }
        }

        // Minimizing the first factor against the second turns it into
        // the constant one when the second is all of `f`.
        let g_min = self.lic_compaction(g, h);
        self.ref_node_if_ok(&g_min);
        self.recursive_deref(g);
        let g = match g_min {
            Ok(g) => g,
            Err(e) => {
                self.recursive_deref(h);
                return Err(e);
            }
        };
        Ok(self.nontrivial_factors(g, h))
    }

    /// One refinement of the referenced pair `(g, h)`. Returns a new
    /// referenced pair with the same conjunction, or `None` when the first
    /// factor stops shrinking.
    fn iter_conj_step(&mut self, g: Ref, h: Ref) -> Result<Option<(Ref, Ref)>> {
        let Some(best) = self.best_decomposition_var(h) else {
            return Ok(None);
        };
        let var = self.vars[best as usize];
        let over = self.exist_abstract(h, var)?;
        self.ref_node(over);
        let superset = self.squeeze(h, over);
        self.ref_node_if_ok(&superset);
        self.recursive_deref(over);
        let superset = superset?;

        let g_new = self.and(g, superset);
        self.ref_node_if_ok(&g_new);
        self.recursive_deref(superset);
        let g_new = g_new?;
        if g_new == g {
            self.recursive_deref(g_new);
            return Ok(None);
        }
        let h_new = self.lic_compaction(h, g_new);
        self.ref_node_if_ok(&h_new);
        if h_new.is_err() {
            self.recursive_deref(g_new);
        }
        Ok(Some((g_new, h_new?)))
    }

    /// Disjunctive counterpart of [`iter_conj_decomp`][Self::iter_conj_decomp].
    pub fn iter_disj_decomp(&mut self, f: Ref) -> Result<Vec<Ref>> {
        Ok(self.iter_conj_decomp(-f)?.into_iter().map(|g| -g).collect())
    }
}
