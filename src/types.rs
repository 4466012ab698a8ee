//! Plain index types shared across the manager.
//!
//! Variables are identified by a stable *index* that never changes, while
//! their *level* (position in the current order) changes during reordering.
//! Both are kept as `u32` to match the arena layout; the manager keeps the
//! `perm` (index to level) and `invperm` (level to index) maps in sync.

/// Identifier of a node slot in the manager arena.
pub type NodeId = u32;

/// Variable index: stable across reordering.
pub type VarIndex = u32;

/// Variable level: position in the current order (0 is the top).
pub type Level = u32;

/// Index carried by constant (terminal) nodes.
pub const CONST_INDEX: VarIndex = u32::MAX;

/// Sentinel used to terminate collision chains.
pub const NIL: NodeId = u32::MAX;

/// Saturation point of reference counts.
///
/// A node whose count reaches this value is never reclaimed.
pub const MAX_REF: u32 = u32::MAX;

/// Lazy-sifting grouping annotation of a variable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum LazyGroup {
    #[default]
    None,
    SoftGroup,
    HardGroup,
    Ungroup,
}

/// Per-variable bookkeeping that is indexed by variable index, so it
/// follows the variable through reordering without any extra swapping.
#[derive(Debug, Copy, Clone, Default)]
pub struct VarInfo {
    /// Bound variables are never moved by sifting.
    pub bound: bool,
    /// Preferred partner for lazy sifting.
    pub pair_index: VarIndex,
    pub group: LazyGroup,
    /// Set once lazy sifting has processed the variable.
    pub handled: bool,
}

impl VarInfo {
    pub fn new(index: VarIndex) -> Self {
        Self {
            pair_index: index,
            ..Default::default()
        }
    }

    pub fn to_be_grouped(&self) -> bool {
        matches!(self.group, LazyGroup::SoftGroup | LazyGroup::HardGroup)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var_info_defaults() {
        let info = VarInfo::new(7);
        assert_eq!(info.pair_index, 7);
        assert!(!info.bound);
        assert!(!info.to_be_grouped());
    }

    #[test]
    fn test_to_be_grouped() {
        let mut info = VarInfo::new(0);
        info.group = LazyGroup::SoftGroup;
        assert!(info.to_be_grouped());
        info.group = LazyGroup::HardGroup;
        assert!(info.to_be_grouped());
        info.group = LazyGroup::Ungroup;
        assert!(!info.to_be_grouped());
    }
}
