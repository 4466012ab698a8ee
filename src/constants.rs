//! Unique table for terminal nodes, keyed by the bit pattern of the value.

use std::collections::HashMap;

use crate::node::Node;
use crate::types::NodeId;

#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    map: HashMap<u64, NodeId>,
    pub keys: usize,
    pub dead: usize,
}

/// Lookup key for a terminal value. `-0.0` and `0.0` share a key.
pub fn value_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl ConstantTable {
    pub fn find(&self, value: f64) -> Option<NodeId> {
        self.map.get(&value_key(value)).copied()
    }

    pub fn insert(&mut self, value: f64, id: NodeId) {
        self.map.insert(value_key(value), id);
        self.keys += 1;
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.map.values().copied()
    }

    /// Drop every terminal with a zero reference count and return the ids.
    pub fn remove_dead(&mut self, nodes: &[Node]) -> Vec<NodeId> {
        let mut removed = Vec::new();
        self.map.retain(|_, &mut id| {
            if nodes[id as usize].ref_count == 0 {
                removed.push(id);
                false
            } else {
                true
            }
        });
        self.keys -= removed.len();
        self.dead = 0;
        removed
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_signed_zero_shares_key() {
        assert_eq!(value_key(0.0), value_key(-0.0));
        assert_ne!(value_key(1.0), value_key(-1.0));
    }

    #[test]
    fn test_remove_dead() {
        let mut nodes = vec![Node::constant(1.0), Node::constant(2.0)];
        nodes[0].ref_count = 1;
        let mut table = ConstantTable::default();
        table.insert(1.0, 0);
        table.insert(2.0, 1);
        assert_eq!(table.remove_dead(&nodes), vec![1]);
        assert_eq!(table.keys, 1);
        assert_eq!(table.find(1.0), Some(0));
        assert_eq!(table.find(2.0), None);
    }
}
