//! Variable interaction matrix.
//!
//! Two variables *interact* when both appear in the support of some root of
//! the shared diagram. Variables that do not interact can be swapped without
//! changing the number of nodes at either level, which lets sifting bound
//! the size it can still hope to reach.
//!
//! Only the strict upper triangle is stored, as a bit vector of
//! `n * (n - 1) / 2` bits:
//!
//! ```text
//!        y=1 y=2 y=3
//!   x=0   0   1   2
//!   x=1       3   4
//!   x=2           5
//! ```

use std::collections::HashSet;

use log::debug;

use crate::manager::Manager;
use crate::types::{NodeId, VarIndex};

/// Symmetric interaction relation over variable indices.
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    n: usize,
    /// Storage: each u64 holds 64 pairs.
    words: Vec<u64>,
    count: usize,
}

impl InteractionMatrix {
    /// Number of bits per word.
    const BITS_PER_WORD: usize = 64;

    /// Matrix over `n` variables with no interaction.
    pub fn new(n: usize) -> Self {
        let bits = n * n.saturating_sub(1) / 2;
        let num_words = (bits + Self::BITS_PER_WORD - 1) / Self::BITS_PER_WORD;
        Self {
            n,
            words: vec![0; num_words],
            count: 0,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.n
    }

    /// Number of interacting pairs.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Position of the pair in the upper triangle, or `None` on the diagonal.
    #[inline]
    fn position(&self, x: usize, y: usize) -> Option<usize> {
        let (x, y) = if x < y { (x, y) } else { (y, x) };
        if x == y || y >= self.n {
            return None;
        }
        Some((((2 * self.n - x - 3) * x) >> 1) + y - 1)
    }

    #[inline]
    fn word_and_bit(posn: usize) -> (usize, usize) {
        (posn / Self::BITS_PER_WORD, posn % Self::BITS_PER_WORD)
    }

    /// Record that `x` and `y` interact. Returns true if the pair was new.
    pub fn insert(&mut self, x: usize, y: usize) -> bool {
        let Some(posn) = self.position(x, y) else {
            return false;
        };
        let (word_idx, bit_idx) = Self::word_and_bit(posn);
        let mask = 1u64 << bit_idx;
        let was_clear = (self.words[word_idx] & mask) == 0;
        if was_clear {
            self.words[word_idx] |= mask;
            self.count += 1;
        }
        was_clear
    }

    /// Whether `x` and `y` interact. A variable never interacts with itself.
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        match self.position(x, y) {
            Some(posn) => {
                let (word_idx, bit_idx) = Self::word_and_bit(posn);
                (self.words[word_idx] >> bit_idx) & 1 == 1
            }
            None => false,
        }
    }

    /// Mark every pair of the given support as interacting.
    pub fn insert_support(&mut self, support: &[usize]) {
        for (k, &x) in support.iter().enumerate() {
            for &y in &support[k + 1..] {
                self.insert(x, y);
            }
        }
    }
}

impl Manager {
    /// Build the interaction matrix of the current diagram.
    ///
    /// Levels are scanned top-down; every node not reached from a node
    /// above it is a root, and the full support of each root is recorded.
    pub(crate) fn init_interact(&mut self) {
        let n = self.read_size();
        let mut matrix = InteractionMatrix::new(n);
        let mut reached = vec![false; self.nodes.len()];
        let mut in_support = vec![false; n];
        let mut visited: HashSet<NodeId> = HashSet::new();

        for level in 0..n {
            for root in self.subtables[level].ids(&self.nodes) {
                if reached[root as usize] {
                    continue;
                }
                in_support.fill(false);
                visited.clear();
                let mut stack = vec![root];
                while let Some(id) = stack.pop() {
                    if !visited.insert(id) {
                        continue;
                    }
                    reached[id as usize] = true;
                    let node = &self.nodes[id as usize];
                    if let Some((t, e)) = node.children() {
                        in_support[node.index as usize] = true;
                        stack.push(t.id());
                        stack.push(e.id());
                    }
                }
                let support: Vec<usize> = (0..n).filter(|&i| in_support[i]).collect();
                matrix.insert_support(&support);
            }
        }

        debug!("interaction matrix: {} of {} pairs interact", matrix.len(), n * n.saturating_sub(1) / 2);
        self.interaction = Some(matrix);
    }

    /// Whether variables `x` and `y` interact. Without a matrix every pair
    /// is assumed to interact.
    pub(crate) fn test_interact(&self, x: VarIndex, y: VarIndex) -> bool {
        match &self.interaction {
            Some(m) => m.contains(x as usize, y as usize),
            None => x != y,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_empty() {
        let m = InteractionMatrix::new(4);
        assert!(m.is_empty());
        assert!(!m.contains(0, 1));
        assert!(!m.contains(2, 2));
        assert_eq!(InteractionMatrix::new(0).len(), 0);
        assert_eq!(InteractionMatrix::new(1).len(), 0);
    }

    #[test]
    fn test_insert_is_symmetric() {
        let mut m = InteractionMatrix::new(5);
        assert!(m.insert(3, 1));
        assert!(!m.insert(1, 3));
        assert!(m.contains(1, 3));
        assert!(m.contains(3, 1));
        assert!(!m.contains(1, 2));
        assert!(!m.insert(2, 2));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_positions_are_distinct() {
        let n = 12;
        let mut m = InteractionMatrix::new(n);
        for x in 0..n {
            for y in x + 1..n {
                assert!(m.insert(x, y), "pair ({}, {}) collides", x, y);
            }
        }
        assert_eq!(m.len(), n * (n - 1) / 2);
    }

    #[test]
    fn test_init_from_diagram() {
        let mut mgr = Manager::new(4);
        let x0 = mgr.ith_var(0).unwrap();
        let x1 = mgr.ith_var(1).unwrap();
        let x3 = mgr.ith_var(3).unwrap();
        let f = mgr.and(x0, x1).unwrap();
        mgr.ref_node(f);
        let g = mgr.or(x1, x3).unwrap();
        mgr.ref_node(g);
        mgr.init_interact();
        assert!(mgr.test_interact(0, 1));
        assert!(mgr.test_interact(3, 1));
        assert!(!mgr.test_interact(0, 3));
        assert!(!mgr.test_interact(2, 0));
        mgr.interaction = None;
        assert!(mgr.test_interact(2, 0));
        mgr.recursive_deref(f);
        mgr.recursive_deref(g);
    }
}
