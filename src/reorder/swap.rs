//! In-place exchange of two adjacent levels.
//!
//! # Algorithm
//!
//! Let `x` be the variable at level `i` and `y` the one at `i + 1`. A node
//! `f = (x, f1, f0)` that does not depend on `y` simply moves down one
//! level. Otherwise its four grandchildren are regrouped:
//!
//! ```text
//!        x                 y
//!      /   \             /   \
//!     y     y    ==>    x     x
//!    / \   / \         / \   / \
//!  f11 f10 f01 f00   f11 f01 f10 f00
//! ```
//!
//! and `f` is relabelled with `y` *in its own slot*, so every handle to `f`
//! keeps denoting the same function. The `y` nodes move up unchanged; those
//! that lose their last parent are freed immediately.
//!
//! Only the two affected subtables are touched, so a swap costs time
//! proportional to the number of nodes at the two levels.

use log::{debug, warn};

use crate::error::{DdError, Result};
use crate::manager::Manager;
use crate::node::{Node, NodeKind};
use crate::reference::Ref;
use crate::types::{Level, NodeId, VarIndex, MAX_REF};

impl Manager {
    /// Size of the diagram as seen by reordering: live nodes minus the
    /// projection functions nothing else points to.
    pub(crate) fn reorder_size(&self) -> usize {
        let live = (self.keys - self.dead) as i64;
        (live - self.isolated).max(0) as usize
    }

    /// Nodes at `level`, not counting an isolated projection function.
    pub(crate) fn level_weight(&self, level: Level) -> i64 {
        let index = self.invperm[level as usize];
        self.subtables[level as usize].keys as i64 - self.is_isolated(index) as i64
    }

    /// Whether the projection function of `index` has no parents.
    pub(crate) fn is_isolated(&self, index: VarIndex) -> bool {
        self.ref_count(self.vars[index as usize]) == 1
    }

    fn is_projection(&self, id: NodeId) -> bool {
        let index = self.nodes[id as usize].index;
        self.vars.get(index as usize).is_some_and(|v| v.id() == id)
    }

    fn reorder_ref(&mut self, r: Ref) {
        let id = r.id();
        let node = &self.nodes[id as usize];
        if node.dead && node.is_constant() {
            self.nodes[id as usize].dead = false;
            self.dead = self.dead.saturating_sub(1);
            self.constants.dead = self.constants.dead.saturating_sub(1);
        }
        self.nodes[id as usize].inc_ref();
        if self.nodes[id as usize].ref_count == 2 && self.is_projection(id) {
            self.isolated -= 1;
        }
    }

    /// Drop one reference; internal nodes left without references are
    /// unlinked and freed on the spot, releasing their children in turn.
    fn reorder_release(&mut self, r: Ref) {
        let mut stack = vec![r.id()];
        while let Some(id) = stack.pop() {
            let count = self.nodes[id as usize].ref_count;
            if count == MAX_REF || count == 0 {
                continue;
            }
            self.nodes[id as usize].ref_count = count - 1;
            if count - 1 == 1 && self.is_projection(id) {
                self.isolated += 1;
            }
            if count - 1 > 0 {
                continue;
            }
            let node = self.nodes[id as usize];
            match node.kind {
                NodeKind::Internal { high, low } => {
                    let level = self.perm[node.index as usize] as usize;
                    self.subtables[level].remove(id, &mut self.nodes);
                    self.free_node(id);
                    self.keys -= 1;
                    stack.push(high.id());
                    stack.push(low.id());
                }
                NodeKind::Constant(_) => {
                    self.nodes[id as usize].dead = true;
                    self.dead += 1;
                    self.constants.dead += 1;
                }
                NodeKind::Free => {}
            }
        }
    }

    /// Find or create `(index, high, low)` in the subtable of `level`,
    /// applying the reduction rule and complement normalization.
    fn swap_node(&mut self, level: Level, index: VarIndex, high: Ref, low: Ref) -> Ref {
        if high == low {
            return high;
        }
        if high.is_negated() {
            return -self.swap_node(level, index, -high, -low);
        }
        let level = level as usize;
        if let Some(id) = self.subtables[level].find(high, low, &self.nodes) {
            return Ref::positive(id);
        }
        let id = self.raw_alloc(Node::internal(index, high, low));
        self.subtables[level].insert(id, &mut self.nodes);
        self.keys += 1;
        self.reorder_ref(high);
        self.reorder_ref(low);
        Ref::positive(id)
    }

    /// Cofactors of `f` with respect to the variable `index`, if `f` is
    /// labelled with it.
    pub(crate) fn cofactors_of(&self, f: Ref, index: VarIndex) -> (Ref, Ref) {
        if self.node_index(f) == index {
            self.cofactors(f)
        } else {
            (f, f)
        }
    }

    /// Exchange the variables at levels `x` and `y = x + 1`.
    ///
    /// Returns the size of the diagram afterwards (see
    /// [`reorder_size`][Self::reorder_size]). Fails without touching the
    /// diagram if node storage cannot hold the worst case.
    ///
    /// The two levels must hold no dead nodes: their children no longer
    /// count them as parents.
    pub(crate) fn swap_in_place(&mut self, x: Level, y: Level) -> Result<usize> {
        debug_assert_eq!(x + 1, y);
        let (xl, yl) = (x as usize, y as usize);
        let xindex = self.invperm[xl];
        let yindex = self.invperm[yl];

        // Every rebuilt node needs at most two fresh children.
        let needed = 2 * self.subtables[xl].keys;
        if self.available_slots() < needed {
            warn!("swap of levels {} and {} needs {} free slots", x, y, needed);
            return Err(DdError::OutOfMemory);
        }

        let x_ids = self.subtables[xl].drain(&self.nodes);
        let y_ids = self.subtables[yl].drain(&self.nodes);
        {
            // Bucket arrays follow their variable; group links stay put.
            let (upper, lower) = self.subtables.split_at_mut(yl);
            upper[xl].swap_contents(&mut lower[0]);
        }
        self.invperm[xl] = yindex;
        self.invperm[yl] = xindex;
        self.perm[xindex as usize] = y;
        self.perm[yindex as usize] = x;

        for &id in &y_ids {
            self.subtables[xl].insert(id, &mut self.nodes);
        }

        let mut rebuild = Vec::new();
        for id in x_ids {
            let Some((f1, f0)) = self.nodes[id as usize].children() else {
                continue;
            };
            if self.node_index(f1) == yindex || self.node_index(f0) == yindex {
                rebuild.push(id);
            } else {
                self.subtables[yl].insert(id, &mut self.nodes);
            }
        }

        for &id in &rebuild {
            let Some((f1, f0)) = self.nodes[id as usize].children() else {
                continue;
            };
            let (f11, f10) = self.cofactors_of(f1, yindex);
            let (f01, f00) = self.cofactors_of(f0, yindex);
            let high = self.swap_node(y, xindex, f11, f01);
            self.reorder_ref(high);
            let low = self.swap_node(y, xindex, f10, f00);
            self.reorder_ref(low);
            debug_assert!(!high.is_negated());

            let node = &mut self.nodes[id as usize];
            node.index = yindex;
            node.kind = NodeKind::Internal { high, low };
            self.subtables[xl].insert(id, &mut self.nodes);

            self.reorder_release(f1);
            self.reorder_release(f0);
        }

        for level in [xl, yl] {
            if self.subtables[level].is_overloaded() {
                self.subtables[level].grow(&mut self.nodes);
            }
        }

        self.swap_steps += 1;
        self.reorder_swaps += 1;
        let size = self.reorder_size();
        debug!(
            "swapped {} and {} at levels {}/{}: {} rebuilt, size {}",
            xindex,
            yindex,
            x,
            y,
            rebuild.len(),
            size
        );
        Ok(size)
    }

    /// Move the variable at level `from` to level `to` by adjacent swaps.
    pub(crate) fn move_level(&mut self, from: Level, to: Level) -> Result<usize> {
        let mut size = self.reorder_size();
        let mut x = from;
        while x > to {
            size = self.swap_in_place(x - 1, x)?;
            x -= 1;
        }
        while x < to {
            size = self.swap_in_place(x, x + 1)?;
            x += 1;
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::testing::{random_function, truth_table};

    #[test]
    fn test_swap_preserves_functions() {
        let n = 5;
        let mut m = Manager::new(n);
        let fs: Vec<Ref> = (1..5u64).map(|seed| random_function(&mut m, seed, n)).collect();
        let tables: Vec<_> = fs.iter().map(|&f| truth_table(&m, f, n)).collect();
        m.garbage_collect();
        m.isolated = m.vars.iter().filter(|&&v| m.ref_count(v) == 1).count() as i64;
        for level in 0..(n as Level - 1) {
            m.swap_in_place(level, level + 1).unwrap();
            assert!(m.debug_check().is_ok());
            for (f, table) in fs.iter().zip(&tables) {
                assert_eq!(&truth_table(&m, *f, n), table);
            }
        }
        assert_eq!(m.order(), vec![1, 2, 3, 4, 0]);
        for f in fs {
            m.recursive_deref(f);
        }
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_swap_twice_restores_size() {
        let mut m = Manager::new(4);
        let x: Vec<Ref> = (0..4).map(|i| m.ith_var(i).unwrap()).collect();
        let a = m.and(x[0], x[2]).unwrap();
        m.ref_node(a);
        let b = m.and(x[1], x[3]).unwrap();
        m.ref_node(b);
        let f = m.or(a, b).unwrap();
        m.ref_node(f);
        m.recursive_deref(a);
        m.recursive_deref(b);
        m.garbage_collect();
        let keys = m.read_keys();
        let size = m.dag_size(f);

        m.swap_in_place(1, 2).unwrap();
        // x0 x2 x1 x3: the interleaved order is smaller.
        assert!(m.dag_size(f) < size);
        m.swap_in_place(1, 2).unwrap();
        assert_eq!(m.dag_size(f), size);
        assert_eq!(m.read_keys(), keys);
        assert_eq!(m.order(), vec![0, 1, 2, 3]);
        assert!(m.debug_check().is_ok());
        m.recursive_deref(f);
    }

    #[test]
    fn test_swap_keeps_node_identity() {
        let mut m = Manager::new(2);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let f = m.xor(x, y).unwrap();
        m.ref_node(f);
        m.garbage_collect();
        m.swap_in_place(0, 1).unwrap();
        assert_eq!(m.node_index(f), 1);
        assert_eq!(m.level(f), 0);
        assert_eq!(m.level(x), 1);
        assert!(m.eval(f, &[true, false]));
        assert!(!m.eval(f, &[true, true]));
        let g = m.xor(x, y).unwrap();
        assert_eq!(g, f);
        m.recursive_deref(f);
    }

    #[test]
    fn test_move_level() {
        let n = 4;
        let mut m = Manager::new(n);
        let f = random_function(&mut m, 11, n);
        let table = truth_table(&m, f, n);
        m.garbage_collect();
        m.move_level(0, 3).unwrap();
        assert_eq!(m.order(), vec![1, 2, 3, 0]);
        m.move_level(3, 1).unwrap();
        assert_eq!(m.order(), vec![1, 0, 2, 3]);
        assert_eq!(truth_table(&m, f, n), table);
        m.recursive_deref(f);
    }
}
