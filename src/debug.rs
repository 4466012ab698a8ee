//! Debug utilities for inspecting diagram structure.
//!
//! These are primarily useful in tests and during development.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::{Level, VarIndex};

/// Detailed information about a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    /// The edge this information was asked for
    pub node_ref: Ref,
    /// Variable at this node (None for terminals)
    pub index: Option<VarIndex>,
    /// Level of the variable in the current order (None for terminals)
    pub level: Option<Level>,
    /// Raw then-child
    pub high: Option<Ref>,
    /// Raw else-child
    pub low: Option<Ref>,
    /// Value of a terminal
    pub value: Option<f64>,
    pub ref_count: u32,
}

impl Display for NodeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.value, self.index, self.high, self.low) {
            (Some(v), ..) => write!(f, "{}: const {} (refs={})", self.node_ref, v, self.ref_count),
            (None, Some(index), Some(high), Some(low)) => write!(
                f,
                "{}: x{}@{} then={} else={} (refs={})",
                self.node_ref,
                index,
                self.level.map_or("?".to_string(), |l| l.to_string()),
                high,
                low,
                self.ref_count
            ),
            _ => write!(f, "{}: free", self.node_ref),
        }
    }
}

impl Manager {
    /// Get detailed information about the node `f` points to.
    pub fn node_info(&self, f: Ref) -> NodeInfo {
        let node = &self.nodes[f.id() as usize];
        let (high, low) = node.children().unzip();
        let index = high.map(|_| node.index);
        NodeInfo {
            node_ref: f,
            index,
            level: index.map(|i| self.perm[i as usize]),
            high,
            low,
            value: node.value(),
            ref_count: node.ref_count,
        }
    }

    /// Describe every node reachable from `f`, sorted by level, one per line.
    ///
    /// Format: `@id: x<index>@<level> then=<edge> else=<edge> (refs=<n>)`
    pub fn print_debug(&self, f: Ref) -> String {
        let mut infos = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![f.regular()];
        while let Some(r) = stack.pop() {
            if !visited.insert(r.id()) {
                continue;
            }
            let info = self.node_info(r);
            if let (Some(high), Some(low)) = (info.high, info.low) {
                stack.push(low.regular());
                stack.push(high.regular());
            }
            infos.push(info);
        }
        infos.sort_by_key(|info| (info.level.unwrap_or(Level::MAX), info.node_ref.id()));

        let mut out = format!("{} ({} nodes):\n", f, infos.len());
        for info in &infos {
            out.push_str("  ");
            out.push_str(&info.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_node_info() {
        let mut m = Manager::new(2);
        let x = m.ith_var(1).unwrap();
        let info = m.node_info(x);
        assert_eq!(info.index, Some(1));
        assert_eq!(info.level, Some(1));
        assert_eq!(info.high, Some(m.one()));
        assert_eq!(info.low, Some(m.zero()));
        assert_eq!(info.value, None);

        let one = m.node_info(m.one());
        assert_eq!(one.value, Some(1.0));
        assert_eq!(one.index, None);
    }

    #[test]
    fn test_print_debug() {
        let mut m = Manager::new(2);
        let x = m.ith_var(0).unwrap();
        let y = m.ith_var(1).unwrap();
        let f = m.and(x, y).unwrap();
        m.ref_node(f);
        let s = m.print_debug(f);
        // Two decision nodes and the terminal.
        assert_eq!(s.lines().count(), 4, "{}", s);
        assert!(s.contains("x0@0"), "{}", s);
        assert!(s.contains("x1@1"), "{}", s);
        assert!(s.contains("const 1"), "{}", s);
        m.recursive_deref(f);
    }
}
