use std::fmt::{Display, Formatter};
use std::ops::Neg;

use crate::types::NodeId;
use crate::utils::MyHash;

/// Edge to a node, with the complement bit stored in the lowest bit.
///
/// ```text
/// raw = (id << 1) | negated
/// ```
///
/// Negation is a single bit flip, so `f` and `!f` share the whole subgraph.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(u32);

impl Ref {
    /// Placeholder for unused operand slots in cache keys.
    pub const INVALID: Ref = Ref(u32::MAX);

    pub const fn new(id: NodeId, negated: bool) -> Self {
        Self((id << 1) | negated as u32)
    }

    pub const fn positive(id: NodeId) -> Self {
        Self::new(id, false)
    }

    pub const fn negative(id: NodeId) -> Self {
        Self::new(id, true)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Return the internal representation of the reference.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Identifier of the node this edge points to.
    pub const fn id(self) -> NodeId {
        self.0 >> 1
    }

    pub const fn is_negated(self) -> bool {
        self.0 & 1 != 0
    }

    pub const fn negate(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// The same node reached through a regular (non-complemented) edge.
    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }

    /// Complement the edge iff `negate` holds.
    pub const fn not_cond(self, negate: bool) -> Self {
        Self(self.0 ^ negate as u32)
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if *self == Ref::INVALID {
            return write!(f, "@-");
        }
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.id())
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        self.0 as u64
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_negation() {
        let r = Ref::positive(5);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!(-(-r), r);
        assert_eq!((-r).id(), 5);
        assert_eq!((-r).regular(), r);
    }

    #[test]
    fn test_not_cond() {
        let r = Ref::positive(3);
        assert_eq!(r.not_cond(false), r);
        assert_eq!(r.not_cond(true), -r);
        assert_eq!((-r).not_cond(true), r);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ref::positive(4).to_string(), "@4");
        assert_eq!(Ref::negative(4).to_string(), "~@4");
    }
}
