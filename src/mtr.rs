//! Variable group tree.
//!
//! A group is a contiguous range of levels `[low, low + size)` that the
//! reordering engine keeps together. Groups nest: the children of a group
//! are disjoint sub-ranges sorted by `low`, and levels not covered by any
//! child are single, freely movable variables. The root spans every level.
//!
//! Each group also records `index`, the variable currently at its first
//! level, so that its position can be recovered after reordering.
//!
//! ```
//! use dd_rs::mtr::{GroupFlags, GroupTree};
//!
//! let mut tree = GroupTree::new(0, 6);
//! tree.make_group(0, 2, GroupFlags::DEFAULT).unwrap();
//! tree.make_group(2, 4, GroupFlags::FIXED).unwrap();
//! assert_eq!(tree.print_groups(), "(0(0,1)(2,5|F)5)");
//! ```

use std::fmt::Write;
use std::ops::BitOr;

use crate::error::{DdError, Result};
use crate::manager::Manager;
use crate::types::{Level, VarIndex};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct GroupFlags(u32);

impl GroupFlags {
    pub const DEFAULT: GroupFlags = GroupFlags(0);
    /// Members are never split apart.
    pub const TERMINAL: GroupFlags = GroupFlags(1);
    /// Created by group sifting; may be dissolved again.
    pub const SOFT: GroupFlags = GroupFlags(2);
    /// Children keep their relative order.
    pub const FIXED: GroupFlags = GroupFlags(4);
    pub const NEWNODE: GroupFlags = GroupFlags(8);

    pub fn contains(self, other: GroupFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for GroupFlags {
    type Output = GroupFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        GroupFlags(self.0 | rhs.0)
    }
}

pub type GroupId = usize;

#[derive(Debug, Clone)]
pub struct GroupNode {
    pub low: Level,
    pub size: u32,
    pub index: VarIndex,
    pub flags: GroupFlags,
    pub parent: Option<GroupId>,
    pub child: Option<GroupId>,
    pub elder: Option<GroupId>,
    pub younger: Option<GroupId>,
}

impl GroupNode {
    fn new(low: Level, size: u32, flags: GroupFlags) -> Self {
        Self {
            low,
            size,
            index: low,
            flags,
            parent: None,
            child: None,
            elder: None,
            younger: None,
        }
    }

    /// One past the last level of the group.
    pub fn high(&self) -> Level {
        self.low + self.size
    }

    pub fn is_terminal(&self) -> bool {
        self.flags.contains(GroupFlags::TERMINAL) || self.child.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct GroupTree {
    nodes: Vec<GroupNode>,
    free: Vec<GroupId>,
    root: GroupId,
}

impl GroupTree {
    /// Tree with a single root group `[low, low + size)`.
    pub fn new(low: Level, size: u32) -> Self {
        Self {
            nodes: vec![GroupNode::new(low, size, GroupFlags::DEFAULT)],
            free: Vec::new(),
            root: 0,
        }
    }

    pub fn root(&self) -> GroupId {
        self.root
    }

    pub fn node(&self, id: GroupId) -> &GroupNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: GroupId) -> &mut GroupNode {
        &mut self.nodes[id]
    }

    /// Children of `id`, eldest first.
    pub fn children(&self, id: GroupId) -> Vec<GroupId> {
        let mut res = Vec::new();
        let mut c = self.nodes[id].child;
        while let Some(n) = c {
            res.push(n);
            c = self.nodes[n].younger;
        }
        res
    }

    /// Number of groups, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn alloc(&mut self, node: GroupNode) -> GroupId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Create the group `[low, low + size)`.
    ///
    /// Existing groups inside the range become its children. Fails if the
    /// range is empty, leaves the root, or cuts an existing group.
    pub fn make_group(&mut self, low: Level, size: u32, flags: GroupFlags) -> Option<GroupId> {
        self.make_group_in(self.root, low, size, flags)
    }

    fn make_group_in(&mut self, root: GroupId, low: Level, size: u32, flags: GroupFlags) -> Option<GroupId> {
        if size == 0 {
            return None;
        }
        let high = low + size;
        if low < self.nodes[root].low || high > self.nodes[root].high() {
            return None;
        }

        let mut new = GroupNode::new(low, size, flags);
        new.parent = Some(root);

        let Some(eldest) = self.nodes[root].child else {
            let id = self.alloc(new);
            self.nodes[root].child = Some(id);
            return Some(id);
        };

        // First child that does not end before the new group.
        let mut previous = None;
        let mut first = Some(eldest);
        while let Some(f) = first {
            if low < self.nodes[f].high() {
                break;
            }
            previous = first;
            first = self.nodes[f].younger;
        }

        let Some(first) = first else {
            // Append after the last child.
            new.elder = previous;
            let id = self.alloc(new);
            if let Some(p) = previous {
                self.nodes[p].younger = Some(id);
            }
            return Some(id);
        };

        let (first_low, first_high) = (self.nodes[first].low, self.nodes[first].high());
        if low >= first_low && high <= first_high {
            return self.make_group_in(first, low, size, flags);
        }
        if high <= first_low {
            // Fits in the gap before `first`.
            new.elder = previous;
            new.younger = Some(first);
            let id = self.alloc(new);
            self.nodes[first].elder = Some(id);
            match previous {
                Some(p) => self.nodes[p].younger = Some(id),
                None => self.nodes[root].child = Some(id),
            }
            return Some(id);
        }
        if low > first_low || high < first_high {
            return None;
        }

        // The new group swallows `first` and possibly more siblings.
        let mut last = first;
        while let Some(y) = self.nodes[last].younger {
            if self.nodes[y].low >= high {
                break;
            }
            if self.nodes[y].high() > high {
                return None;
            }
            last = y;
        }

        let after = self.nodes[last].younger;
        new.child = Some(first);
        new.elder = previous;
        new.younger = after;
        let id = self.alloc(new);
        match previous {
            Some(p) => self.nodes[p].younger = Some(id),
            None => self.nodes[root].child = Some(id),
        }
        if let Some(a) = after {
            self.nodes[a].elder = Some(id);
        }
        self.nodes[last].younger = None;
        self.nodes[first].elder = None;
        let mut c = Some(first);
        while let Some(n) = c {
            self.nodes[n].parent = Some(id);
            c = self.nodes[n].younger;
        }
        Some(id)
    }

    /// Remove `group`, making its children children of its parent.
    /// Returns the parent. The root and leaf groups cannot be dissolved.
    pub fn dissolve_group(&mut self, group: GroupId) -> Option<GroupId> {
        let parent = self.nodes[group].parent?;
        if self.nodes[group].is_terminal() {
            return None;
        }
        let children = self.children(group);
        let (first, last) = (*children.first()?, *children.last()?);
        for &c in &children {
            self.nodes[c].parent = Some(parent);
        }
        let (elder, younger) = (self.nodes[group].elder, self.nodes[group].younger);
        self.nodes[last].younger = younger;
        if let Some(y) = younger {
            self.nodes[y].elder = Some(last);
        }
        self.nodes[first].elder = elder;
        match elder {
            Some(e) => self.nodes[e].younger = Some(first),
            None => self.nodes[parent].child = Some(first),
        }
        self.release(group);
        Some(parent)
    }

    /// Remove `group` and all of its descendants.
    pub(crate) fn remove_subtree(&mut self, group: GroupId) {
        let Some(parent) = self.nodes[group].parent else {
            return;
        };
        let (elder, younger) = (self.nodes[group].elder, self.nodes[group].younger);
        match elder {
            Some(e) => self.nodes[e].younger = younger,
            None => self.nodes[parent].child = younger,
        }
        if let Some(y) = younger {
            self.nodes[y].elder = elder;
        }
        let mut stack = vec![group];
        while let Some(g) = stack.pop() {
            stack.extend(self.children(g));
            self.release(g);
        }
    }

    fn release(&mut self, id: GroupId) {
        self.nodes[id] = GroupNode::new(0, 0, GroupFlags::DEFAULT);
        self.free.push(id);
    }

    /// The group spanning exactly `[low, low + size)`.
    pub fn find_group(&self, low: Level, size: u32) -> Option<GroupId> {
        if size == 0 {
            return None;
        }
        let mut node = self.root;
        loop {
            let n = &self.nodes[node];
            if low < n.low || low + size > n.high() {
                return None;
            }
            if n.low == low && n.size == size {
                return Some(node);
            }
            let mut c = n.child?;
            while low >= self.nodes[c].high() {
                c = self.nodes[c].younger?;
            }
            node = c;
        }
    }

    /// Exchange two adjacent sibling groups, shifting the levels of both
    /// subtrees accordingly.
    pub fn swap_groups(&mut self, a: GroupId, b: GroupId) -> bool {
        let (first, second) = if self.nodes[b].younger == Some(a) {
            (b, a)
        } else if self.nodes[a].younger == Some(b) {
            (a, b)
        } else {
            return false;
        };
        let parent = match (self.nodes[first].parent, self.nodes[second].parent) {
            (Some(p), Some(q)) if p == q => p,
            _ => return false,
        };
        let size_first = self.nodes[first].size;
        let size_second = self.nodes[second].size;

        let elder = self.nodes[first].elder;
        let younger = self.nodes[second].younger;
        match elder {
            Some(e) => self.nodes[e].younger = Some(second),
            None => self.nodes[parent].child = Some(second),
        }
        if let Some(y) = younger {
            self.nodes[y].elder = Some(first);
        }
        self.nodes[first].younger = younger;
        self.nodes[first].elder = Some(second);
        self.nodes[second].elder = elder;
        self.nodes[second].younger = Some(first);

        self.shift(first, size_second as i64);
        self.shift(second, -(size_first as i64));
        true
    }

    fn shift(&mut self, group: GroupId, delta: i64) {
        let mut stack = vec![group];
        while let Some(g) = stack.pop() {
            let n = &mut self.nodes[g];
            n.low = (n.low as i64 + delta) as Level;
            stack.extend(self.children(g));
        }
    }

    /// Set every group's `low` from the level of its `index` under `perm`
    /// and re-sort the siblings. The root keeps its range.
    pub fn reorder_groups(&mut self, perm: &[Level]) {
        let mut stack = vec![self.root];
        while let Some(g) = stack.pop() {
            let mut children = self.children(g);
            for &c in &children {
                let i = self.nodes[c].index;
                self.nodes[c].low = perm.get(i as usize).copied().unwrap_or(i);
            }
            children.sort_by_key(|&c| self.nodes[c].low);
            if !children.is_empty() {
                self.relink(g, &children);
            }
            stack.extend(children);
        }
    }

    fn relink(&mut self, parent: GroupId, children: &[GroupId]) {
        self.nodes[parent].child = children.first().copied();
        for (i, &c) in children.iter().enumerate() {
            self.nodes[c].elder = if i == 0 { None } else { Some(children[i - 1]) };
            self.nodes[c].younger = children.get(i + 1).copied();
        }
    }

    /// Recompute positions after the variables moved from `old_invperm` to
    /// the levels in `perm`. Fails if some group is no longer contiguous.
    pub(crate) fn update(&mut self, old_invperm: &[VarIndex], perm: &[Level]) -> bool {
        let mut stack = vec![self.root];
        while let Some(g) = stack.pop() {
            let n = &self.nodes[g];
            let mut min: Option<(Level, VarIndex)> = None;
            let mut max = 0;
            for level in n.low..n.high() {
                let index = old_invperm.get(level as usize).copied().unwrap_or(level);
                let new_level = perm.get(index as usize).copied().unwrap_or(index);
                if min.map_or(true, |(l, _)| new_level < l) {
                    min = Some((new_level, index));
                }
                max = max.max(new_level);
            }
            let Some((low, index)) = min else {
                continue;
            };
            if max - low + 1 != n.size {
                return false;
            }
            self.nodes[g].low = low;
            self.nodes[g].index = index;
            stack.extend(self.children(g));
        }
        // Siblings must be sorted again.
        let mut stack = vec![self.root];
        while let Some(g) = stack.pop() {
            let mut children = self.children(g);
            stack.extend(children.iter().copied());
            children.sort_by_key(|&c| self.nodes[c].low);
            if !children.is_empty() {
                self.relink(g, &children);
            }
        }
        true
    }

    /// Make room for a new variable inserted at `level`.
    pub(crate) fn insert_level(&mut self, level: Level) {
        for (id, n) in self.nodes.iter_mut().enumerate() {
            if self.free.contains(&id) {
                continue;
            }
            if id == self.root {
                n.size = (n.size + 1).max(level + 1);
            } else if n.low >= level {
                n.low += 1;
            } else if level < n.high() {
                n.size += 1;
            }
        }
    }

    /// Extend the root so that it spans at least `size` levels.
    pub(crate) fn extend(&mut self, size: u32) {
        let root = &mut self.nodes[self.root];
        root.size = root.size.max(size.saturating_sub(root.low));
    }

    /// Render the tree as nested `(low ... high|flags)` ranges.
    pub fn print_groups(&self) -> String {
        let mut out = String::new();
        self.print_group(self.root, &mut out);
        out
    }

    fn print_group(&self, g: GroupId, out: &mut String) {
        let n = &self.nodes[g];
        let _ = write!(out, "({}", n.low);
        if n.is_terminal() {
            out.push(',');
        } else {
            for c in self.children(g) {
                self.print_group(c, out);
            }
        }
        let _ = write!(out, "{}", n.high() - 1);
        Self::print_flags(n.flags, out);
        out.push(')');
    }

    fn print_flags(flags: GroupFlags, out: &mut String) {
        let shown = GroupFlags(flags.0 & !GroupFlags::TERMINAL.0);
        if shown != GroupFlags::DEFAULT {
            out.push('|');
            if flags.contains(GroupFlags::FIXED) {
                out.push('F');
            }
            if flags.contains(GroupFlags::NEWNODE) {
                out.push('N');
            }
            if flags.contains(GroupFlags::SOFT) {
                out.push('S');
            }
        }
    }

    /// Render the variable order with its grouping, e.g. `(2,(0,1),3)`.
    pub fn print_grouped_order(&self, invperm: &[VarIndex]) -> String {
        let mut out = String::new();
        self.print_order(self.root, invperm, &mut out);
        out
    }

    fn print_order(&self, g: GroupId, invperm: &[VarIndex], out: &mut String) {
        let n = &self.nodes[g];
        let var = |level: Level| invperm.get(level as usize).copied().unwrap_or(level);
        let mut items = Vec::new();
        let mut level = n.low;
        for c in self.children(g) {
            while level < self.nodes[c].low {
                items.push(var(level).to_string());
                level += 1;
            }
            let mut sub = String::new();
            self.print_order(c, invperm, &mut sub);
            items.push(sub);
            level += self.nodes[c].size;
        }
        while level < n.high() {
            items.push(var(level).to_string());
            level += 1;
        }
        out.push('(');
        out.push_str(&items.join(","));
        Self::print_flags(n.flags, out);
        out.push(')');
    }
}

impl Manager {
    /// Group `size` variables starting with the variable `low`.
    ///
    /// Variables that do not exist yet are assumed to sit at the level
    /// equal to their index.
    pub fn make_tree_node(&mut self, low: VarIndex, size: u32, flags: GroupFlags) -> Result<GroupId> {
        let level = if (low as usize) < self.read_size() { self.perm[low as usize] } else { low };
        let nvars = self.read_size() as u32;
        let first = self.invperm.first().copied().unwrap_or(0);
        let tree = self.tree.get_or_insert_with(|| {
            let mut t = GroupTree::new(0, nvars);
            t.nodes[0].index = first;
            t
        });
        tree.extend((level + size).max(nvars));
        match tree.make_group(level, size, flags) {
            Some(id) => {
                tree.nodes[id].index = low;
                Ok(id)
            }
            None => Err(self.record_error(DdError::InvalidArgument(format!(
                "group [{}, {}) overlaps an existing group",
                level,
                level + size
            )))),
        }
    }

    /// Drop the variable group tree.
    pub fn free_tree(&mut self) {
        self.tree = None;
    }

    pub fn tree(&self) -> Option<&GroupTree> {
        self.tree.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_nested_groups() {
        let mut tree = GroupTree::new(0, 12);
        assert_eq!(tree.print_groups(), "(0,11)");
        tree.make_group(0, 6, GroupFlags::DEFAULT).unwrap();
        tree.make_group(6, 6, GroupFlags::DEFAULT).unwrap();
        assert_eq!(tree.print_groups(), "(0(0,5)(6,11)11)");
        for i in (0..6).step_by(2) {
            tree.make_group(i, 2, GroupFlags::DEFAULT).unwrap();
        }
        tree.make_group(0, 12, GroupFlags::FIXED).unwrap();
        assert_eq!(tree.print_groups(), "(0(0(0(0,1)(2,3)(4,5)5)(6,11)11|F)11)");

        let g = tree.find_group(0, 6).unwrap();
        tree.dissolve_group(g).unwrap();
        assert_eq!(tree.print_groups(), "(0(0(0,1)(2,3)(4,5)(6,11)11|F)11)");

        let g = tree.find_group(4, 2).unwrap();
        let next = tree.node(g).younger.unwrap();
        assert!(tree.swap_groups(g, next));
        assert_eq!(tree.print_groups(), "(0(0(0,1)(2,3)(4,9)(10,11)11|F)11)");
    }

    #[test]
    fn test_cutting_groups_is_rejected() {
        let mut tree = GroupTree::new(0, 4);
        tree.make_group(1, 2, GroupFlags::DEFAULT).unwrap();
        assert!(tree.make_group(0, 2, GroupFlags::DEFAULT).is_none());
        assert!(tree.make_group(2, 2, GroupFlags::DEFAULT).is_none());
        assert!(tree.make_group(0, 1, GroupFlags::DEFAULT).is_some());
        assert!(tree.make_group(3, 2, GroupFlags::DEFAULT).is_none());
        assert!(tree.make_group(1, 0, GroupFlags::DEFAULT).is_none());
        assert_eq!(tree.print_groups(), "(0(0,0)(1,2)3)");
    }

    #[test]
    fn test_find_group() {
        let mut tree = GroupTree::new(0, 8);
        let a = tree.make_group(2, 4, GroupFlags::DEFAULT).unwrap();
        let b = tree.make_group(2, 2, GroupFlags::DEFAULT).unwrap();
        assert_eq!(tree.find_group(2, 4), Some(a));
        assert_eq!(tree.find_group(2, 2), Some(b));
        assert_eq!(tree.find_group(0, 8), Some(tree.root()));
        assert_eq!(tree.find_group(3, 2), None);
        assert_eq!(tree.node(b).parent, Some(a));
    }

    #[test]
    fn test_dissolve_leaf_and_root_fail() {
        let mut tree = GroupTree::new(0, 4);
        let g = tree.make_group(0, 2, GroupFlags::DEFAULT).unwrap();
        assert!(tree.dissolve_group(g).is_none());
        assert!(tree.dissolve_group(tree.root()).is_none());
    }

    #[test]
    fn test_reorder_groups() {
        let mut tree = GroupTree::new(0, 4);
        let a = tree.make_group(0, 2, GroupFlags::DEFAULT).unwrap();
        let b = tree.make_group(2, 2, GroupFlags::DEFAULT).unwrap();
        // Variables 2 and 3 moved to the top.
        tree.reorder_groups(&[2, 3, 0, 1]);
        assert_eq!(tree.children(tree.root()), vec![b, a]);
        assert_eq!(tree.print_groups(), "(0(0,1)(2,3)3)");
        assert_eq!(tree.print_grouped_order(&[2, 3, 0, 1]), "((2,3),(0,1))");
    }

    #[test]
    fn test_grouped_order_with_loose_variables() {
        let mut tree = GroupTree::new(0, 5);
        tree.make_group(1, 2, GroupFlags::FIXED).unwrap();
        assert_eq!(tree.print_grouped_order(&[4, 3, 2, 1, 0]), "(4,(3,2|F),1,0)");
    }

    #[test]
    fn test_make_tree_node() {
        let mut m = Manager::new(4);
        m.make_tree_node(1, 2, GroupFlags::DEFAULT).unwrap();
        assert!(m.make_tree_node(0, 2, GroupFlags::DEFAULT).is_err());
        m.make_tree_node(0, 1, GroupFlags::DEFAULT).unwrap();
        // Groups may be declared before their variables exist.
        m.make_tree_node(6, 2, GroupFlags::FIXED).unwrap();
        let tree = m.tree().unwrap();
        assert_eq!(tree.print_groups(), "(0(0,0)(1,2)(6,7|F)7)");
        m.free_tree();
        assert!(m.tree().is_none());
    }

    #[test]
    fn test_new_variables_extend_tree() {
        let mut m = Manager::new(3);
        m.make_tree_node(1, 2, GroupFlags::DEFAULT).unwrap();
        m.new_var();
        assert_eq!(m.tree().unwrap().print_groups(), "(0(1,2)3)");
        m.new_var_at_level(0);
        assert_eq!(m.tree().unwrap().print_groups(), "(0(2,3)4)");
    }
}
