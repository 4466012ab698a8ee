//! Hash-consing, reference counting and garbage collection.
//!
//! # Node lifecycle
//!
//! ```text
//!   unique_inter ──► fresh (ref 0) ──ref_node──► live (ref > 0)
//!                                                  │  ▲
//!                                recursive_deref   │  │ reclaim (lookup hit)
//!                                                  ▼  │
//!                                               dead (ref 0, counted)
//!                                                  │
//!                                   garbage_collect▼
//!                                                free slot
//! ```
//!
//! A dead node stays in its subtable until the next collection, so a
//! lookup that hits it simply brings it back to life along with its
//! descendants. A fresh node that was never referenced still holds its
//! children; a lookup hit leaves it alone and the next collection frees
//! it if nobody referenced it in between.

use log::debug;

use crate::cache::OpKey;
use crate::config::GC_FRAC_HI;
use crate::error::{Abort, DdError, Step};
use crate::manager::Manager;
use crate::node::{Node, NodeKind};
use crate::reference::Ref;
use crate::types::{NodeId, VarIndex, MAX_REF};

impl Manager {
    /// Find or create the node `(index, high, low)` applying the
    /// reduction rule and the complement normalization.
    pub(crate) fn mk(&mut self, index: VarIndex, high: Ref, low: Ref) -> Step<Ref> {
        if high == low {
            return Ok(high);
        }
        if high.is_negated() {
            return Ok(-self.unique_inter(index, -high, -low)?);
        }
        self.unique_inter(index, high, low)
    }

    /// Find or create a node whose then-edge is regular and whose children
    /// differ. Both children must be referenced by the caller.
    pub(crate) fn unique_inter(&mut self, index: VarIndex, high: Ref, low: Ref) -> Step<Ref> {
        debug_assert!(!high.is_negated());
        debug_assert_ne!(high, low);
        let level = self.perm[index as usize] as usize;

        if let Some(id) = self.subtables[level].find(high, low, &self.nodes) {
            if self.nodes[id as usize].dead {
                self.reclaim(id);
            }
            return Ok(Ref::positive(id));
        }

        if self.auto_dyn
            && !self.reordering
            && self.keys - self.dead >= self.next_dyn
            && self.config.max_reorderings > 0
        {
            self.config.max_reorderings -= 1;
            debug!("automatic reordering at {} live nodes", self.keys - self.dead);
            let method = self.auto_method;
            return match self.reduce_heap(method, 10) {
                Ok(()) => Err(Abort::Reordered),
                Err(e) => Err(Abort::Error(e)),
            };
        }

        if self.subtables[level].is_overloaded() {
            if self.config.gc_enabled && !self.reordering && self.dead > self.min_dead() {
                self.garbage_collect_inner();
            } else {
                self.subtables[level].grow(&mut self.nodes);
            }
        }

        let id = self.alloc_node(Node::internal(index, high, low))?;
        self.subtables[level].insert(id, &mut self.nodes);
        self.keys += 1;
        self.nodes[high.id() as usize].inc_ref();
        self.nodes[low.id() as usize].inc_ref();
        Ok(Ref::positive(id))
    }

    /// Find or create the terminal with value `value`.
    pub(crate) fn unique_const(&mut self, value: f64) -> Result<Ref, DdError> {
        let value = if value.abs() < self.config.epsilon { 0.0 } else { value };
        if let Some(id) = self.constants.find(value) {
            if self.nodes[id as usize].dead {
                self.reclaim(id);
            }
            return Ok(Ref::positive(id));
        }
        let id = self.alloc_node(Node::constant(value))?;
        self.constants.insert(value, id);
        self.keys += 1;
        Ok(Ref::positive(id))
    }

    /// Maximum number of node slots allowed by the memory ceiling.
    pub(crate) fn max_slots(&self) -> usize {
        match self.config.max_memory {
            0 => usize::MAX,
            bytes => (bytes / std::mem::size_of::<Node>()).max(1),
        }
    }

    /// Slots that can still be handed out without collecting.
    pub(crate) fn available_slots(&self) -> usize {
        self.free.len() + self.max_slots().saturating_sub(self.nodes.len())
    }

    fn min_dead(&self) -> usize {
        let slots: usize = self.subtables.iter().map(|s| s.slots()).sum();
        (GC_FRAC_HI * slots as f64) as usize
    }

    pub(crate) fn alloc_node(&mut self, node: Node) -> Result<NodeId, DdError> {
        if self.config.max_live > 0 && self.keys - self.dead >= self.config.max_live {
            return Err(DdError::TooManyNodes);
        }
        if self.available_slots() == 0 {
            if self.dead > 0 && !self.reordering {
                self.garbage_collect_inner();
            }
            if self.available_slots() == 0 {
                return Err(DdError::OutOfMemory);
            }
        }
        Ok(self.raw_alloc(node))
    }

    pub(crate) fn free_node(&mut self, id: NodeId) {
        self.nodes[id as usize] = Node::default();
        self.free.push(id);
    }
}

// Reference counts.
impl Manager {
    /// Increase the reference count of `f`. Saturates.
    ///
    /// A handle to a dead node is revived first, so its descendants are
    /// referenced again before the count goes up.
    pub fn ref_node(&mut self, f: Ref) {
        if self.nodes[f.id() as usize].dead {
            self.reclaim(f.id());
        }
        self.nodes[f.id() as usize].inc_ref();
    }

    /// Reference a successful result, typically right before its operands
    /// are released.
    pub(crate) fn ref_node_if_ok<E>(&mut self, res: &Result<Ref, E>) {
        if let Ok(r) = res {
            self.ref_node(*r);
        }
    }

    /// Decrease the reference count of `f` without releasing descendants.
    ///
    /// Meant for results that are about to be referenced again.
    pub fn deref(&mut self, f: Ref) {
        self.nodes[f.id() as usize].dec_ref();
    }

    /// Decrease the reference count of `f`; when it reaches zero the node
    /// becomes dead and its children are released recursively.
    pub fn recursive_deref(&mut self, f: Ref) {
        let mut stack = vec![f.id()];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id as usize];
            if node.ref_count == MAX_REF || node.ref_count == 0 {
                continue;
            }
            node.ref_count -= 1;
            if node.ref_count > 0 {
                continue;
            }
            node.dead = true;
            self.dead += 1;
            match node.kind {
                NodeKind::Internal { high, low } => {
                    let level = self.perm[node.index as usize] as usize;
                    self.subtables[level].dead += 1;
                    stack.push(high.id());
                    stack.push(low.id());
                }
                NodeKind::Constant(_) => self.constants.dead += 1,
                NodeKind::Free => {}
            }
        }
    }

    /// Bring a dead node back to life, re-referencing its dead descendants.
    /// The node itself ends with the count it had. Nodes that are not dead
    /// are left untouched.
    pub(crate) fn reclaim(&mut self, root: NodeId) {
        if !self.nodes[root as usize].dead {
            return;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id as usize];
            if !node.dead {
                node.inc_ref();
                continue;
            }
            node.dead = false;
            node.ref_count = 1;
            self.dead = self.dead.saturating_sub(1);
            match node.kind {
                NodeKind::Internal { high, low } => {
                    let level = self.perm[node.index as usize] as usize;
                    let st = &mut self.subtables[level];
                    st.dead = st.dead.saturating_sub(1);
                    stack.push(high.id());
                    stack.push(low.id());
                }
                NodeKind::Constant(_) => self.constants.dead = self.constants.dead.saturating_sub(1),
                NodeKind::Free => {}
            }
        }
        self.nodes[root as usize].dec_ref();
    }
}

// Computed table.
impl Manager {
    pub(crate) fn cache_lookup(&mut self, key: &OpKey) -> Option<Ref> {
        let r = self.cache.get(key)?;
        if self.nodes[r.id() as usize].dead {
            self.reclaim(r.id());
        }
        Some(r)
    }

    pub(crate) fn cache_insert(&mut self, key: OpKey, value: Ref) {
        self.cache.insert(key, value);
    }
}

// Garbage collection.
impl Manager {
    /// Free every unreferenced node. Returns the number of slots freed.
    pub fn garbage_collect(&mut self) -> usize {
        if self.reordering {
            return 0;
        }
        self.garbage_collect_inner()
    }

    pub(crate) fn garbage_collect_inner(&mut self) -> usize {
        // Fresh nodes nobody referenced still hold their children.
        let fresh: Vec<NodeId> = self
            .subtables
            .iter()
            .flat_map(|st| st.ids(&self.nodes))
            .filter(|&id| {
                let n = &self.nodes[id as usize];
                n.ref_count == 0 && !n.dead
            })
            .collect();
        for id in fresh {
            self.nodes[id as usize].dead = true;
            if let Some((high, low)) = self.nodes[id as usize].children() {
                self.recursive_deref(high);
                self.recursive_deref(low);
            }
        }

        let nodes = &self.nodes;
        let live = |r: Ref| {
            let n = &nodes[r.id() as usize];
            n.ref_count > 0 && !n.is_free()
        };
        self.cache.retain(|k, v| live(*v) && k.operands().all(|r| live(r)));

        let mut freed = Vec::new();
        for st in self.subtables.iter_mut() {
            freed.extend(st.remove_if(&mut self.nodes, |n| n.ref_count == 0));
            st.dead = 0;
        }
        freed.extend(self.constants.remove_dead(&self.nodes));
        for &id in &freed {
            self.free_node(id);
        }
        self.keys -= freed.len();
        self.dead = 0;
        self.gc_count += 1;
        debug!("gc #{}: freed {} nodes, {} remain", self.gc_count, freed.len(), self.keys);
        freed.len()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::Config;

    #[test]
    fn test_reduction_and_complement_normalization() {
        let mut m = Manager::new(2);
        let one = m.one();
        let x = m.mk(0, one, -one).unwrap();
        assert_eq!(x, m.ith_var(0).unwrap());
        assert_eq!(m.mk(0, one, one).unwrap(), one);
        let nx = m.mk(0, -one, one).unwrap();
        assert_eq!(nx, -x);
        assert!(!m.then_child(nx).unwrap().is_negated());
    }

    #[test]
    fn test_dead_then_reclaimed() {
        let mut m = Manager::new(2);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let f = m.and(x, y).unwrap();
        m.ref_node(f);
        let keys = m.read_keys();
        m.recursive_deref(f);
        assert_eq!(m.read_dead(), 1);
        assert_eq!(m.read_keys(), keys);

        let g = m.and(x, y).unwrap();
        assert_eq!(g, f);
        assert_eq!(m.read_dead(), 0);
        m.ref_node(g);
        m.recursive_deref(g);
        assert_eq!(m.garbage_collect(), 1);
        assert_eq!(m.read_keys(), keys - 1);
        assert_eq!(m.read_dead(), 0);
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_gc_drops_stale_cache_entries() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let f = m.xor(x, y).unwrap();
        m.ref_node(f);
        m.recursive_deref(f);
        m.garbage_collect();
        // Recomputed from scratch, the slot may be reused but the answer is right.
        let g = m.xor(x, y).unwrap();
        m.ref_node(g);
        assert_eq!(m.eval(g, &[true, false, false]), true);
        assert_eq!(m.eval(g, &[true, true, false]), false);
        m.recursive_deref(g);
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_out_of_memory_is_reported() {
        let config = Config {
            max_memory: 12 * std::mem::size_of::<Node>(),
            ..Config::default()
        };
        let mut m = Manager::with_config(8, config);
        let mut f = m.one();
        m.ref_node(f);
        let mut failed = false;
        for i in 0..8 {
            let v = m.ith_var(i).unwrap();
            match m.xor(f, v) {
                Ok(g) => {
                    m.ref_node(g);
                    m.recursive_deref(f);
                    f = g;
                }
                Err(e) => {
                    assert_eq!(e, DdError::OutOfMemory);
                    failed = true;
                    break;
                }
            }
        }
        assert!(failed);
        assert_eq!(m.read_error_code(), Some(&DdError::OutOfMemory));
        m.recursive_deref(f);
        assert_eq!(m.check_zero_ref(), 0);
    }

    #[test]
    fn test_dropped_result_is_reused_without_leaking() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let z = m.ith_var(2).unwrap();
        let _dropped = m.and(x, y).unwrap();
        let f = m.and(x, y).unwrap();
        m.ref_node(f);
        let g = m.or(f, z).unwrap();
        m.ref_node(g);
        assert!(m.debug_check().is_ok());
        m.recursive_deref(g);
        m.recursive_deref(f);
        assert!(m.debug_check().is_ok());
        assert_eq!(m.check_zero_ref(), 0);
        m.garbage_collect();
        assert_eq!(m.read_dead(), 0);
        assert!(m.debug_check().is_ok());
    }

    #[test]
    fn test_ref_of_dead_handle_revives_it() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let z = m.ith_var(2).unwrap();
        let f = m.and(x, y).unwrap();
        m.ref_node(f);
        let g = m.or(f, z).unwrap();
        m.ref_node(g);
        m.recursive_deref(f);
        m.recursive_deref(g);
        assert!(m.read_dead() > 1);

        m.ref_node(g);
        // Only the conjunction stays dead.
        assert_eq!(m.read_dead(), 1);
        assert!(m.debug_check().is_ok());
        assert!(m.eval(g, &[true, true, false]));
        m.recursive_deref(g);
        assert_eq!(m.check_zero_ref(), 0);
        assert!(m.check_keys().is_ok());
    }

    #[test]
    fn test_gc_releases_children_of_unreferenced_result() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let z = m.ith_var(2).unwrap();
        let keys = m.read_keys();
        let f = m.and(y, z).unwrap();
        m.ref_node(f);
        let _unused = m.and(x, f).unwrap();
        m.recursive_deref(f);
        // The unreferenced conjunction still holds `f` as its then-child.
        assert_eq!(m.read_dead(), 0);
        assert!(m.check_keys().is_ok());

        m.garbage_collect();
        assert_eq!(m.check_zero_ref(), 0);
        assert!(m.debug_check().is_ok());
        assert_eq!(m.read_keys(), keys);
    }

    #[test]
    fn test_max_live() {
        let config = Config {
            max_live: 10,
            ..Config::default()
        };
        let mut m = Manager::with_config(6, config);
        let vars: Vec<_> = (0..6).map(|i| m.ith_var(i).unwrap()).collect();
        let r = m.cube(&vars);
        assert_eq!(r, Err(DdError::TooManyNodes));
    }
}
