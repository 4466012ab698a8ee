//! Level-ordered queue.
//!
//! Items are dequeued by increasing level, first-in first-out within a
//! level, and each item is held at most once. Used to visit the nodes of a
//! diagram top-down, e.g. for serialization.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::Level;

#[derive(Debug, Clone)]
pub struct LevelQueue<K> {
    levels: BTreeMap<Level, VecDeque<K>>,
    members: HashSet<K>,
}

impl<K> Default for LevelQueue<K> {
    fn default() -> Self {
        Self {
            levels: BTreeMap::new(),
            members: HashSet::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> LevelQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Insert `item` at `level`. Returns `false` if it is already queued.
    pub fn enqueue(&mut self, item: K, level: Level) -> bool {
        if !self.members.insert(item) {
            return false;
        }
        self.levels.entry(level).or_default().push_back(item);
        true
    }

    /// Remove the oldest item of the lowest level.
    pub fn dequeue(&mut self) -> Option<(K, Level)> {
        let mut entry = self.levels.first_entry()?;
        let level = *entry.key();
        let item = entry.get_mut().pop_front()?;
        if entry.get().is_empty() {
            entry.remove();
        }
        self.members.remove(&item);
        Some((item, level))
    }
}

impl Manager {
    /// Regular internal nodes reachable from `roots`, ordered by level.
    pub fn level_order(&self, roots: &[Ref]) -> Vec<Ref> {
        let mut queue = LevelQueue::new();
        let mut seen = HashSet::new();
        for &r in roots {
            let r = r.regular();
            if !self.is_constant(r) && seen.insert(r) {
                queue.enqueue(r, self.level(r));
            }
        }
        let mut order = Vec::new();
        while let Some((r, _)) = queue.dequeue() {
            order.push(r);
            let (t, e) = self.cofactors(r);
            for c in [t.regular(), e.regular()] {
                if !self.is_constant(c) && seen.insert(c) {
                    queue.enqueue(c, self.level(c));
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_queue_order_and_uniqueness() {
        let mut q = LevelQueue::new();
        assert!(q.enqueue('a', 2));
        assert!(q.enqueue('b', 0));
        assert!(q.enqueue('c', 2));
        assert!(!q.enqueue('a', 1));
        assert_eq!(q.len(), 3);
        assert_eq!(q.dequeue(), Some(('b', 0)));
        assert_eq!(q.dequeue(), Some(('a', 2)));
        assert_eq!(q.dequeue(), Some(('c', 2)));
        assert_eq!(q.dequeue(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn test_level_order() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let z = m.ith_var(2).unwrap();
        let xy = m.and(x, y).unwrap();
        m.ref_node(xy);
        let f = m.xor(xy, z).unwrap();
        m.ref_node(f);
        let order = m.level_order(&[f]);
        assert_eq!(order.len(), m.dag_size(f) - 1);
        let levels: Vec<_> = order.iter().map(|&r| m.level(r)).collect();
        assert!(levels.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(order[0], f.regular());
        m.shuffle_heap(&[2, 1, 0]).unwrap();
        let order = m.level_order(&[f]);
        assert_eq!(m.node_index(order[0]), 2);
        m.recursive_deref(xy);
        m.recursive_deref(f);
    }
}
