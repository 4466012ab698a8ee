use crate::reference::Ref;
use crate::types::{NodeId, VarIndex, CONST_INDEX, MAX_REF, NIL};

/// Payload of a node slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodeKind {
    /// Decision node. The `high` (then) edge is never complemented.
    Internal { high: Ref, low: Ref },
    /// Terminal carrying a value. BDDs only ever use the constant `1.0`.
    Constant(f64),
    /// Slot on the free list.
    Free,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Node {
    /// Variable index, or [`CONST_INDEX`] for terminals.
    pub index: VarIndex,
    pub ref_count: u32,
    /// Set when the count dropped to zero through a release, so the node's
    /// children no longer hold a reference from it. A freshly created node
    /// with a zero count is not dead.
    pub dead: bool,
    /// Next node in the same collision chain.
    pub next: NodeId,
    pub kind: NodeKind,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            index: CONST_INDEX,
            ref_count: 0,
            dead: false,
            next: NIL,
            kind: NodeKind::Free,
        }
    }
}

impl Node {
    pub fn internal(index: VarIndex, high: Ref, low: Ref) -> Self {
        Self {
            index,
            ref_count: 0,
            dead: false,
            next: NIL,
            kind: NodeKind::Internal { high, low },
        }
    }

    pub fn constant(value: f64) -> Self {
        Self {
            index: CONST_INDEX,
            ref_count: 0,
            dead: false,
            next: NIL,
            kind: NodeKind::Constant(value),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant(_))
    }

    pub fn is_free(&self) -> bool {
        matches!(self.kind, NodeKind::Free)
    }

    /// Children `(high, low)` of an internal node.
    ///
    /// Terminals and free slots have no children.
    pub fn children(&self) -> Option<(Ref, Ref)> {
        match self.kind {
            NodeKind::Internal { high, low } => Some((high, low)),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn inc_ref(&mut self) {
        if self.ref_count != MAX_REF {
            self.ref_count += 1;
        }
    }

    /// Saturated counts stay put; a zero count is left untouched.
    pub fn dec_ref(&mut self) {
        if self.ref_count != MAX_REF && self.ref_count > 0 {
            self.ref_count -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_saturating_refs() {
        let mut node = Node::constant(1.0);
        node.inc_ref();
        assert_eq!(node.ref_count, 1);
        node.dec_ref();
        node.dec_ref();
        assert_eq!(node.ref_count, 0);

        node.ref_count = MAX_REF;
        node.inc_ref();
        node.dec_ref();
        assert_eq!(node.ref_count, MAX_REF);
    }

    #[test]
    fn test_children() {
        let n = Node::internal(2, Ref::positive(0), Ref::negative(0));
        assert_eq!(n.children(), Some((Ref::positive(0), Ref::negative(0))));
        assert_eq!(Node::constant(3.5).value(), Some(3.5));
        assert!(Node::default().is_free());
    }
}
