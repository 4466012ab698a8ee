//! Per-level hash subtable of the unique table.
//!
//! The manager keeps all nodes in a single arena (`Vec<Node>`) and one
//! subtable per level for hash-consing:
//!
//! ```text
//! subtables[0] → nodes labelled with invperm[0]
//! subtables[1] → nodes labelled with invperm[1]
//! ...
//! ```
//!
//! A subtable is an array of buckets, each the head of a collision chain
//! threaded through the `next` field of the nodes themselves. All nodes in
//! a subtable carry the same variable, so the key is just `(high, low)`.
//!
//! Subtables belong to *levels*, not variables: when two adjacent levels are
//! swapped their bucket arrays are exchanged, while the `next` group link
//! stays behind with the level.

use crate::config::MAX_SUBTABLE_DENSITY;
use crate::node::Node;
use crate::reference::Ref;
use crate::types::{Level, NodeId, NIL};
use crate::utils::MyHash;

#[derive(Debug, Clone)]
pub struct Subtable {
    buckets: Vec<NodeId>,
    bitmask: u64,
    /// Number of nodes stored, live or dead.
    pub keys: usize,
    /// Number of nodes with a zero reference count.
    pub dead: usize,
    /// Group link used by group and symmetric sifting.
    ///
    /// Levels of a group form a cycle: each level points to the next one
    /// down and the bottom points back to the top. Singletons point to
    /// themselves.
    pub next: Level,
}

impl Subtable {
    /// Create an empty subtable with at least `slots` buckets.
    pub fn new(slots: usize, level: Level) -> Self {
        let size = slots.max(1).next_power_of_two();
        Self {
            buckets: vec![NIL; size],
            bitmask: (size - 1) as u64,
            keys: 0,
            dead: 0,
            next: level,
        }
    }

    pub fn slots(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_overloaded(&self) -> bool {
        self.keys > self.slots() * MAX_SUBTABLE_DENSITY
    }

    fn bucket(&self, high: Ref, low: Ref) -> usize {
        ((high.raw() as u64, low.raw() as u64).hash() & self.bitmask) as usize
    }

    /// Look up the node with children `(high, low)`.
    pub fn find(&self, high: Ref, low: Ref, nodes: &[Node]) -> Option<NodeId> {
        let mut id = self.buckets[self.bucket(high, low)];
        while id != NIL {
            let node = &nodes[id as usize];
            if node.children() == Some((high, low)) {
                return Some(id);
            }
            id = node.next;
        }
        None
    }

    /// Link an internal node into its chain. The node must not be present yet.
    pub fn insert(&mut self, id: NodeId, nodes: &mut [Node]) {
        let Some((high, low)) = nodes[id as usize].children() else {
            return;
        };
        let b = self.bucket(high, low);
        nodes[id as usize].next = self.buckets[b];
        self.buckets[b] = id;
        self.keys += 1;
    }

    /// Unlink a single node. Returns `false` if it was not in this subtable.
    pub fn remove(&mut self, id: NodeId, nodes: &mut [Node]) -> bool {
        let Some((high, low)) = nodes[id as usize].children() else {
            return false;
        };
        let b = self.bucket(high, low);
        let mut prev = NIL;
        let mut cur = self.buckets[b];
        while cur != NIL {
            let next = nodes[cur as usize].next;
            if cur == id {
                if prev == NIL {
                    self.buckets[b] = next;
                } else {
                    nodes[prev as usize].next = next;
                }
                self.keys -= 1;
                return true;
            }
            prev = cur;
            cur = next;
        }
        false
    }

    /// Collect all node ids in chain order.
    pub fn ids(&self, nodes: &[Node]) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.keys);
        for &head in &self.buckets {
            let mut id = head;
            while id != NIL {
                out.push(id);
                id = nodes[id as usize].next;
            }
        }
        out
    }

    /// Unlink every node and return their ids. Leaves `keys` and `dead` at zero.
    pub fn drain(&mut self, nodes: &[Node]) -> Vec<NodeId> {
        let ids = self.ids(nodes);
        self.buckets.fill(NIL);
        self.keys = 0;
        self.dead = 0;
        ids
    }

    /// Unlink the nodes matching `pred` and return their ids.
    pub fn remove_if(&mut self, nodes: &mut [Node], pred: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        let mut removed = Vec::new();
        for b in 0..self.buckets.len() {
            let mut prev = NIL;
            let mut id = self.buckets[b];
            while id != NIL {
                let next = nodes[id as usize].next;
                if pred(&nodes[id as usize]) {
                    if prev == NIL {
                        self.buckets[b] = next;
                    } else {
                        nodes[prev as usize].next = next;
                    }
                    removed.push(id);
                } else {
                    prev = id;
                }
                id = next;
            }
        }
        self.keys -= removed.len();
        removed
    }

    /// Rehash into `slots` buckets (rounded up to a power of two).
    pub fn rehash(&mut self, slots: usize, nodes: &mut [Node]) {
        let dead = self.dead;
        let ids = self.drain(nodes);
        let size = slots.max(1).next_power_of_two();
        self.buckets = vec![NIL; size];
        self.bitmask = (size - 1) as u64;
        for id in ids {
            self.insert(id, nodes);
        }
        self.dead = dead;
    }

    /// Double the bucket array.
    pub fn grow(&mut self, nodes: &mut [Node]) {
        let slots = self.slots() * 2;
        self.rehash(slots, nodes);
    }

    /// Exchange the node contents of two subtables, keeping their group links.
    pub fn swap_contents(&mut self, other: &mut Subtable) {
        std::mem::swap(&mut self.buckets, &mut other.buckets);
        std::mem::swap(&mut self.bitmask, &mut other.bitmask);
        std::mem::swap(&mut self.keys, &mut other.keys);
        std::mem::swap(&mut self.dead, &mut other.dead);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn arena() -> Vec<Node> {
        vec![
            Node::constant(1.0),
            Node::internal(0, Ref::positive(0), Ref::negative(0)),
            Node::internal(0, Ref::positive(0), Ref::positive(0)),
            Node::internal(0, Ref::positive(1), Ref::negative(1)),
        ]
    }

    #[test]
    fn test_subtable_basic() {
        let mut nodes = arena();
        let mut st = Subtable::new(4, 0);

        assert!(st.find(Ref::positive(0), Ref::negative(0), &nodes).is_none());

        st.insert(1, &mut nodes);
        assert_eq!(st.find(Ref::positive(0), Ref::negative(0), &nodes), Some(1));
        assert_eq!(st.keys, 1);

        let removed = st.remove_if(&mut nodes, |n| n.children() == Some((Ref::positive(0), Ref::negative(0))));
        assert_eq!(removed, vec![1]);
        assert!(st.find(Ref::positive(0), Ref::negative(0), &nodes).is_none());
        assert_eq!(st.keys, 0);
    }

    #[test]
    fn test_subtable_multiple_nodes_survive_rehash() {
        let mut nodes = arena();
        let mut st = Subtable::new(1, 0);
        st.insert(1, &mut nodes);
        st.insert(2, &mut nodes);
        st.insert(3, &mut nodes);
        assert_eq!(st.keys, 3);

        st.grow(&mut nodes);
        assert_eq!(st.slots(), 2);
        assert_eq!(st.keys, 3);
        assert_eq!(st.find(Ref::positive(0), Ref::positive(0), &nodes), Some(2));
        assert_eq!(st.find(Ref::positive(1), Ref::negative(1), &nodes), Some(3));

        let mut ids = st.drain(&nodes);
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(st.keys, 0);
    }

    #[test]
    fn test_remove_single_node() {
        let mut nodes = arena();
        let mut st = Subtable::new(1, 0);
        st.insert(1, &mut nodes);
        st.insert(2, &mut nodes);
        st.insert(3, &mut nodes);
        assert!(st.remove(2, &mut nodes));
        assert!(!st.remove(2, &mut nodes));
        assert_eq!(st.keys, 2);
        assert_eq!(st.find(Ref::positive(1), Ref::negative(1), &nodes), Some(3));
        assert!(st.find(Ref::positive(0), Ref::positive(0), &nodes).is_none());
    }

    #[test]
    fn test_swap_contents_keeps_group_link() {
        let mut nodes = arena();
        let mut a = Subtable::new(4, 0);
        let mut b = Subtable::new(4, 1);
        a.insert(1, &mut nodes);
        a.swap_contents(&mut b);
        assert_eq!(a.keys, 0);
        assert_eq!(b.keys, 1);
        assert_eq!(a.next, 0);
        assert_eq!(b.next, 1);
    }
}
