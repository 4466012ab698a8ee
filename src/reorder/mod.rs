//! Dynamic variable reordering.
//!
//! # Theory: Variable Ordering
//!
//! The size of a decision diagram is highly sensitive to the order in which
//! variables appear. For some functions, different orders make the size vary
//! from linear to exponential in the number of variables.
//!
//! Consider `f = (x₁ ∧ y₁) ∨ (x₂ ∧ y₂) ∨ ... ∨ (xₙ ∧ yₙ)`:
//!
//! - **Good order** (x₁, y₁, x₂, y₂, ..., xₙ, yₙ): O(n) nodes
//! - **Bad order** (x₁, x₂, ..., xₙ, y₁, y₂, ..., yₙ): O(2ⁿ) nodes
//!
//! Finding the optimal order is NP-complete, so the manager improves the
//! order heuristically by exchanging adjacent levels in place (see
//! [`swap`](self::swap)). Every exchange keeps each node handle denoting the
//! same function, so reordering is invisible to the caller except for the
//! change in size.
//!
//! # Methods
//!
//! - [`ReorderMethod::Sift`]: Rudell's sifting. Each variable is moved
//!   through all positions and left where the diagram was smallest.
//! - [`ReorderMethod::SiftConverge`]: sifting repeated until it stops
//!   helping.
//! - [`ReorderMethod::Random`]: random pairwise exchanges, each kept only
//!   as far as it helps.
//! - [`ReorderMethod::SymmSift`]: sifting that detects symmetric variables
//!   and keeps them together.
//! - [`ReorderMethod::GroupSift`]: sifting of variable groups, aggregating
//!   neighbours by extended symmetry and second differences (see
//!   [`GroupCheck`](crate::config::GroupCheck)).
//! - [`ReorderMethod::LazySift`]: group sifting driven by the pairing
//!   annotations of [`Manager::set_pair_index`] and friends.
//!
//! # Groups
//!
//! The variable group tree (see [`mtr`](crate::mtr)) constrains every
//! method: the children of each group are reordered first, then the group
//! is reordered as a block among its siblings. Groups marked
//! [`FIXED`](crate::mtr::GroupFlags::FIXED) keep their internal order.
//!
//! # References
//!
//! - R. Rudell. "Dynamic variable ordering for ordered binary decision diagrams."
//!   ICCAD 1993. DOI: 10.1109/ICCAD.1993.580054
//!
//! - S. Panda & F. Somenzi. "Who are the variables in your neighborhood."
//!   ICCAD 1995.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{GroupCheck, DYN_RATIO};
use crate::error::{DdError, Result};
use crate::manager::Manager;
use crate::mtr::{GroupFlags, GroupId, GroupTree};
use crate::types::{Level, VarIndex};

use self::group::Aggregation;

mod group;
pub mod interact;
mod sift;
mod swap;
mod symm;

/// Reordering algorithm.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ReorderMethod {
    /// Do nothing.
    None,
    /// Whatever method automatic reordering is set to.
    Same,
    Random,
    Sift,
    SiftConverge,
    SymmSift,
    SymmSiftConv,
    GroupSift,
    GroupSiftConv,
    LazySift,
}

impl ReorderMethod {
    pub const ALL: [ReorderMethod; 10] = [
        ReorderMethod::None,
        ReorderMethod::Same,
        ReorderMethod::Random,
        ReorderMethod::Sift,
        ReorderMethod::SiftConverge,
        ReorderMethod::SymmSift,
        ReorderMethod::SymmSiftConv,
        ReorderMethod::GroupSift,
        ReorderMethod::GroupSiftConv,
        ReorderMethod::LazySift,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReorderMethod::None => "none",
            ReorderMethod::Same => "same",
            ReorderMethod::Random => "random",
            ReorderMethod::Sift => "sift",
            ReorderMethod::SiftConverge => "sift-converge",
            ReorderMethod::SymmSift => "symm-sift",
            ReorderMethod::SymmSiftConv => "symm-sift-conv",
            ReorderMethod::GroupSift => "group-sift",
            ReorderMethod::GroupSiftConv => "group-sift-conv",
            ReorderMethod::LazySift => "lazy-sift",
        }
    }
}

impl Display for ReorderMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReorderMethod {
    type Err = DdError;

    fn from_str(s: &str) -> Result<Self> {
        ReorderMethod::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| DdError::InvalidArgument(format!("unknown reordering method '{}'", s)))
    }
}

/// Statistics collected during reordering.
#[derive(Debug, Clone, Default)]
pub struct ReorderStats {
    /// Number of adjacent swaps performed
    pub swaps: usize,
    /// Live nodes before reordering
    pub initial_size: usize,
    /// Live nodes after reordering
    pub final_size: usize,
    pub elapsed: Duration,
}

impl ReorderStats {
    fn unchanged(size: usize) -> Self {
        Self {
            initial_size: size,
            final_size: size,
            ..Default::default()
        }
    }

    /// Calculate the size reduction ratio.
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_size == 0 {
            return 0.0;
        }
        1.0 - (self.final_size as f64 / self.initial_size as f64)
    }

    /// Calculate the percentage reduction.
    pub fn reduction_percent(&self) -> f64 {
        self.reduction_ratio() * 100.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum MoveKind {
    /// Two adjacent levels or groups were exchanged.
    Exchange,
    /// The groups at `x` and `y` were merged.
    NewGroup,
}

/// One step of sifting, with the size of the diagram after it.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Move {
    pub x: Level,
    pub y: Level,
    pub size: usize,
    pub kind: MoveKind,
}

impl Move {
    pub(crate) fn swap(x: Level, y: Level, size: usize) -> Self {
        Self {
            x,
            y,
            size,
            kind: MoveKind::Exchange,
        }
    }
}

impl Manager {
    /// Reorder the variables with `method`.
    ///
    /// Nothing happens if fewer than `minsize` nodes are alive.
    ///
    /// ```
    /// use dd_rs::manager::Manager;
    /// use dd_rs::reorder::ReorderMethod;
    ///
    /// let mut m = Manager::new(4);
    /// let x: Vec<_> = (0..4).map(|i| m.ith_var(i).unwrap()).collect();
    /// let a = m.and(x[0], x[2]).unwrap();
    /// m.ref_node(a);
    /// let b = m.and(x[1], x[3]).unwrap();
    /// m.ref_node(b);
    /// let f = m.or(a, b).unwrap();
    /// m.ref_node(f);
    /// m.recursive_deref(a);
    /// m.recursive_deref(b);
    ///
    /// let before = m.dag_size(f);
    /// m.reduce_heap(ReorderMethod::Sift, 0).unwrap();
    /// assert!(m.dag_size(f) < before);
    /// m.recursive_deref(f);
    /// ```
    pub fn reduce_heap(&mut self, method: ReorderMethod, minsize: usize) -> Result<()> {
        self.reduce_heap_with_stats(method, minsize).map(|_| ())
    }

    /// Like [`reduce_heap`][Self::reduce_heap], reporting what was done.
    pub fn reduce_heap_with_stats(&mut self, method: ReorderMethod, minsize: usize) -> Result<ReorderStats> {
        let live = self.keys - self.dead;
        if live < minsize {
            debug!("reordering skipped: {} live nodes < {}", live, minsize);
            return Ok(ReorderStats::unchanged(live));
        }
        let method = match method {
            ReorderMethod::Same => self.auto_method,
            m => m,
        };
        if matches!(method, ReorderMethod::None | ReorderMethod::Same) {
            return Ok(ReorderStats::unchanged(live));
        }

        self.reorderings += 1;
        let start = Instant::now();
        self.reorder_start = Some(start);
        self.reorder_swaps = 0;
        self.begin_reordering();

        let initial_size = self.reorder_size();
        info!(
            "reordering #{} with {}: {} nodes ({} live)",
            self.reorderings,
            method,
            initial_size,
            self.keys - self.dead
        );
        let res = self.tree_sifting(method);
        let final_size = self.reorder_size();
        self.end_reordering();

        let stats = ReorderStats {
            swaps: self.reorder_swaps,
            initial_size,
            final_size,
            elapsed: start.elapsed(),
        };
        if let Err(e) = res {
            warn!("reordering with {} failed after {} swaps: {}", method, stats.swaps, e);
            return Err(self.record_error(e));
        }

        let consts = self.constants.keys;
        let next = (self.keys - consts + 1) * DYN_RATIO + consts;
        if self.reorderings < 20 || next > self.next_dyn {
            self.next_dyn = next;
        } else {
            self.next_dyn += 20;
        }
        info!(
            "reordering done: {} -> {} nodes ({:.1}% reduction), {} swaps in {:?}, next at {}",
            stats.initial_size,
            stats.final_size,
            stats.reduction_percent(),
            stats.swaps,
            stats.elapsed,
            self.next_dyn
        );
        Ok(stats)
    }

    /// Reorder the variables so that `permutation[level]` is the variable at
    /// `level`. Groups of the variable tree must stay contiguous.
    pub fn shuffle_heap(&mut self, permutation: &[VarIndex]) -> Result<()> {
        let n = self.read_size();
        let mut seen = vec![false; n];
        let valid = permutation.len() == n
            && permutation
                .iter()
                .all(|&i| (i as usize) < n && !std::mem::replace(&mut seen[i as usize], true));
        if !valid {
            return Err(self.record_error(DdError::InvalidArgument(format!(
                "{:?} is not a permutation of {} variables",
                permutation, n
            ))));
        }
        if permutation == self.invperm.as_slice() {
            return Ok(());
        }

        let mut new_perm = vec![0; n];
        for (level, &index) in permutation.iter().enumerate() {
            new_perm[index as usize] = level as Level;
        }
        if let Some(tree) = &self.tree {
            let mut tree = tree.clone();
            if !tree.update(&self.invperm, &new_perm) {
                return Err(self.record_error(DdError::InvalidArgument(
                    "permutation splits a variable group".to_string(),
                )));
            }
            self.tree = Some(tree);
        }

        self.begin_reordering();
        let mut res = Ok(());
        for (level, &index) in permutation.iter().enumerate() {
            let from = self.perm[index as usize];
            if let Err(e) = self.move_level(from, level as Level) {
                res = Err(e);
                break;
            }
        }
        self.end_reordering();
        debug!("shuffled to {:?}: {} nodes", permutation, self.keys);
        res.map_err(|e| self.record_error(e))
    }

    /// Prepare the tables for swapping: no dead nodes, no cached results,
    /// exact isolated-projection count, fresh interaction matrix.
    pub(crate) fn begin_reordering(&mut self) {
        self.cache.clear();
        self.garbage_collect_inner();
        self.reordering = true;
        self.isolated = self.vars.iter().filter(|&&v| self.ref_count(v) == 1).count() as i64;
        self.init_interact();
        self.reset_groups();
    }

    pub(crate) fn end_reordering(&mut self) {
        self.reordering = false;
        self.interaction = None;
        self.reset_groups();
        self.reorder_start = None;
    }

    /// Whether the swap and time budgets allow more work. An expired time
    /// limit also turns automatic reordering off.
    pub(crate) fn reorder_budget_left(&mut self) -> bool {
        if self.reorder_swaps >= self.config.sift_max_swap {
            debug!("swap budget of {} exhausted", self.config.sift_max_swap);
            return false;
        }
        if let (Some(limit), Some(start)) = (self.config.time_limit, self.reorder_start) {
            if start.elapsed() > limit {
                warn!("reordering time limit of {:?} expired, disabling automatic reordering", limit);
                self.auto_dyn = false;
                return false;
            }
        }
        true
    }

    /// Reorder every group of the variable tree bottom-up.
    fn tree_sifting(&mut self, method: ReorderMethod) -> Result<()> {
        let temporary = self.tree.is_none();
        if temporary {
            let mut tree = GroupTree::new(0, self.read_size() as u32);
            let root = tree.root();
            tree.node_mut(root).index = self.invperm.first().copied().unwrap_or(0);
            self.tree = Some(tree);
        }
        self.reset_groups();

        let res = match self.tree.as_ref().map(|t| t.root()) {
            Some(root) => self.tree_sifting_aux(root, method),
            None => Ok(()),
        };

        if temporary {
            self.tree = None;
        } else if let Some(tree) = &mut self.tree {
            tree.reorder_groups(&self.perm);
        }
        res
    }

    fn tree_children(&self, g: GroupId) -> Vec<GroupId> {
        self.tree.as_ref().map(|t| t.children(g)).unwrap_or_default()
    }

    fn tree_sifting_aux(&mut self, g: GroupId, method: ReorderMethod) -> Result<()> {
        let children = self.tree_children(g);
        if !children.is_empty() {
            for c in children {
                self.tree_sifting_aux(c, method)?;
            }
            // Blocks of children move as wholes, without aggregation.
            let saved = self.config.group_check;
            self.config.group_check = GroupCheck::NoCheck;
            let block_method = match method {
                ReorderMethod::LazySift => ReorderMethod::LazySift,
                _ => ReorderMethod::GroupSift,
            };
            let res = self.reorder_children(g, block_method);
            self.config.group_check = saved;
            res
        } else if self.tree.as_ref().is_some_and(|t| t.node(g).size > 1) {
            self.reorder_children(g, method)
        } else {
            Ok(())
        }
    }

    /// Reorder the levels of group `g` with `method`, then make them one
    /// block for the levels above.
    fn reorder_children(&mut self, g: GroupId, method: ReorderMethod) -> Result<()> {
        let Some((lower, upper)) = self.find_node_hi_lo(g) else {
            return Ok(());
        };
        let fixed = self.tree.as_ref().is_some_and(|t| t.node(g).flags.contains(GroupFlags::FIXED));

        let res = if fixed {
            Ok(())
        } else {
            debug!("reordering levels {}..={} with {}", lower, upper, method);
            match method {
                ReorderMethod::None | ReorderMethod::Same => Ok(()),
                ReorderMethod::Random => self.random_swapping(lower, upper),
                ReorderMethod::Sift => self.sifting(lower, upper),
                ReorderMethod::SiftConverge => self.converge(|m| m.sifting(lower, upper)),
                ReorderMethod::SymmSift => self.symm_sifting(lower, upper),
                ReorderMethod::SymmSiftConv => self.symm_sifting_conv(lower, upper),
                ReorderMethod::GroupSift => {
                    let check = self.group_aggregation();
                    self.group_sifting(lower, upper, check)
                }
                ReorderMethod::GroupSiftConv => {
                    let check = self.group_aggregation();
                    self.converge(|m| m.group_sifting(lower, upper, check))
                }
                ReorderMethod::LazySift => self.group_sifting(lower, upper, Aggregation::Lazy),
            }
        };

        self.merge_tree_groups(g, lower, upper);
        res
    }

    fn group_aggregation(&self) -> Aggregation {
        match self.config.group_check {
            GroupCheck::NoCheck => Aggregation::None,
            GroupCheck::Check5 | GroupCheck::Check7 => Aggregation::ExtSymm,
        }
    }

    /// Run `pass` until the diagram stops shrinking.
    fn converge(&mut self, mut pass: impl FnMut(&mut Self) -> Result<()>) -> Result<()> {
        loop {
            let initial = self.reorder_size();
            pass(self)?;
            if self.reorder_size() >= initial || !self.reorder_budget_left() {
                return Ok(());
            }
        }
    }

    /// Current level range of group `g`, or `None` if none of its
    /// variables exist yet.
    fn find_node_hi_lo(&self, g: GroupId) -> Option<(Level, Level)> {
        let tree = self.tree.as_ref()?;
        let n = self.read_size() as Level;
        let node = tree.node(g);
        if node.low >= n {
            return None;
        }
        let level_of = |i: VarIndex| self.perm.get(i as usize).copied().unwrap_or(i);
        let lower = level_of(node.index);
        let high = lower + node.size - 1;
        let upper = if high >= n {
            // Partially existing group: stop before the child that
            // straddles the last level.
            let mut upper = Some(n - 1);
            for c in tree.children(g) {
                let child = tree.node(c);
                let this_lower = level_of(child.index);
                let this_upper = this_lower + child.size - 1;
                if this_upper >= n && this_lower < n {
                    upper = this_lower.checked_sub(1);
                }
            }
            upper?
        } else {
            high
        };
        (upper >= lower).then_some((lower, upper))
    }

    /// Link `low..=high` into one block, unless `g` is the root, and record
    /// the variable now on top in `g` and in the ancestors it heads.
    fn merge_tree_groups(&mut self, g: GroupId, low: Level, high: Level) {
        let is_root = self.tree.as_ref().is_some_and(|t| t.root() == g);
        if !is_root {
            self.link_block(low, high);
        }
        let new_index = self.invperm[low as usize];
        let Some(tree) = self.tree.as_mut() else {
            return;
        };
        let saved = tree.node(g).index;
        let mut a = g;
        loop {
            tree.node_mut(a).index = new_index;
            match tree.node(a).parent {
                Some(p) if tree.node(p).index == saved => a = p,
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::Config;
    use crate::reference::Ref;
    use crate::testing::{interleaving_function, random_function, truth_table};

    #[test]
    fn test_every_method_preserves_functions() {
        let n = 6;
        for method in ReorderMethod::ALL {
            let mut m = Manager::new(n);
            let fs: Vec<Ref> = (40..44u64).map(|seed| random_function(&mut m, seed, n)).collect();
            let tables: Vec<_> = fs.iter().map(|&f| truth_table(&m, f, n)).collect();
            m.reduce_heap(method, 0).unwrap();
            assert!(m.debug_check().is_ok(), "{}", method);
            for (&f, table) in fs.iter().zip(&tables) {
                assert_eq!(&truth_table(&m, f, n), table, "{}", method);
            }
            for f in fs {
                m.recursive_deref(f);
            }
            assert_eq!(m.check_zero_ref(), 0, "{}", method);
        }
    }

    #[test]
    fn test_sifting_methods_shrink_interleaving_function() {
        let k = 4;
        for method in [
            ReorderMethod::Sift,
            ReorderMethod::SiftConverge,
            ReorderMethod::GroupSift,
            ReorderMethod::GroupSiftConv,
            ReorderMethod::SymmSift,
        ] {
            let mut m = Manager::new(2 * k);
            // Aggregation would glue the symmetric y variables together.
            m.set_group_check(GroupCheck::NoCheck);
            let f = interleaving_function(&mut m, k);
            let before = m.dag_size(f);
            let stats = m.reduce_heap_with_stats(method, 0).unwrap();
            assert!(m.dag_size(f) < before, "{}", method);
            assert!(stats.final_size < stats.initial_size);
            assert!(stats.reduction_percent() > 0.0);
            assert_eq!(m.read_reorderings(), 1);
            m.recursive_deref(f);
        }
    }

    #[test]
    fn test_group_stays_adjacent() {
        let n = 6;
        let mut m = Manager::new(n);
        let f = interleaving_function(&mut m, 3);
        m.make_tree_node(0, 3, GroupFlags::DEFAULT).unwrap();
        for method in [ReorderMethod::GroupSift, ReorderMethod::Sift, ReorderMethod::SymmSift] {
            m.reduce_heap(method, 0).unwrap();
            let mut levels: Vec<Level> = (0..3).map(|i| m.read_perm(i)).collect();
            levels.sort();
            assert_eq!(levels[1], levels[0] + 1, "{}", method);
            assert_eq!(levels[2], levels[1] + 1, "{}", method);
        }
        let tree = m.tree().unwrap();
        let group = tree.children(tree.root())[0];
        let mut levels: Vec<Level> = (0..3).map(|i| m.read_perm(i)).collect();
        levels.sort();
        assert_eq!(tree.node(group).low, levels[0]);
        m.recursive_deref(f);
    }

    #[test]
    fn test_fixed_group_keeps_its_order() {
        let n = 6;
        let mut m = Manager::new(n);
        let f = interleaving_function(&mut m, 3);
        m.make_tree_node(0, 3, GroupFlags::FIXED).unwrap();
        m.reduce_heap(ReorderMethod::Sift, 0).unwrap();
        let levels: Vec<Level> = (0..3).map(|i| m.read_perm(i)).collect();
        assert_eq!(levels[1], levels[0] + 1);
        assert_eq!(levels[2], levels[1] + 1);
        m.recursive_deref(f);
    }

    #[test]
    fn test_shuffle_heap() {
        let n = 4;
        let mut m = Manager::new(n);
        let f = random_function(&mut m, 9, n);
        let table = truth_table(&m, f, n);
        m.shuffle_heap(&[3, 1, 0, 2]).unwrap();
        assert_eq!(m.order(), vec![3, 1, 0, 2]);
        assert_eq!(m.read_perm(3), 0);
        assert_eq!(truth_table(&m, f, n), table);
        assert!(m.debug_check().is_ok());

        assert!(m.shuffle_heap(&[0, 1, 2]).is_err());
        assert!(m.shuffle_heap(&[0, 1, 1, 2]).is_err());
        assert!(matches!(m.read_error_code(), Some(DdError::InvalidArgument(_))));
        assert_eq!(m.order(), vec![3, 1, 0, 2]);
        m.recursive_deref(f);
    }

    #[test]
    fn test_shuffle_heap_respects_groups() {
        let mut m = Manager::new(4);
        m.make_tree_node(1, 2, GroupFlags::DEFAULT).unwrap();
        assert!(m.shuffle_heap(&[1, 0, 2, 3]).is_err());
        assert_eq!(m.order(), vec![0, 1, 2, 3]);
        m.shuffle_heap(&[1, 2, 3, 0]).unwrap();
        let tree = m.tree().unwrap();
        let group = tree.children(tree.root())[0];
        assert_eq!(tree.node(group).low, 0);
    }

    #[test]
    fn test_minsize_skips_reordering() {
        let k = 3;
        let mut m = Manager::new(2 * k);
        let f = interleaving_function(&mut m, k);
        let stats = m.reduce_heap_with_stats(ReorderMethod::Sift, 1_000_000).unwrap();
        assert_eq!(stats.swaps, 0);
        assert_eq!(m.read_reorderings(), 0);
        m.reduce_heap(ReorderMethod::None, 0).unwrap();
        assert_eq!(m.read_reorderings(), 0);
        m.recursive_deref(f);
    }

    #[test]
    fn test_next_reordering_threshold() {
        let k = 3;
        let mut m = Manager::new(2 * k);
        let f = interleaving_function(&mut m, k);
        m.reduce_heap(ReorderMethod::Sift, 0).unwrap();
        let consts = m.constants.keys;
        assert_eq!(m.read_next_reordering(), (m.read_keys() - consts + 1) * DYN_RATIO + consts);

        // After twenty reorderings the threshold only grows.
        m.reorderings = 25;
        m.set_next_reordering(1_000_000);
        m.reduce_heap(ReorderMethod::Sift, 0).unwrap();
        assert_eq!(m.read_next_reordering(), 1_000_020);
        m.recursive_deref(f);
    }

    #[test]
    fn test_automatic_reordering() {
        let config = Config {
            auto_method: Some(ReorderMethod::Sift),
            first_reordering: 20,
            ..Config::default()
        };
        let k = 5;
        let mut m = Manager::with_config(2 * k, config);
        let f = interleaving_function(&mut m, k);
        assert!(m.read_reorderings() >= 1);
        let table = truth_table(&m, f, 2 * k);
        let mut expected = vec![false; 1 << (2 * k)];
        for (row, e) in expected.iter_mut().enumerate() {
            *e = (0..k).any(|i| (row >> i) & 1 == 1 && (row >> (i + k)) & 1 == 1);
        }
        assert_eq!(table, expected);
        assert!(m.debug_check().is_ok());
        m.recursive_deref(f);
    }

    #[test]
    fn test_max_reorderings() {
        let config = Config {
            auto_method: Some(ReorderMethod::Sift),
            first_reordering: 20,
            max_reorderings: 0,
            ..Config::default()
        };
        let mut m = Manager::with_config(8, config);
        let f = interleaving_function(&mut m, 4);
        assert_eq!(m.read_reorderings(), 0);
        m.recursive_deref(f);
    }

    #[test]
    fn test_time_limit_disables_automatic_reordering() {
        let k = 4;
        let mut m = Manager::new(2 * k);
        let f = interleaving_function(&mut m, k);
        m.autodyn_enable(ReorderMethod::Sift);
        m.set_time_limit(Some(Duration::ZERO));
        let stats = m.reduce_heap_with_stats(ReorderMethod::Sift, 0).unwrap();
        assert_eq!(stats.swaps, 0);
        assert!(!m.reordering_status().0);
        m.recursive_deref(f);
    }

    #[test]
    fn test_method_names() {
        for method in ReorderMethod::ALL {
            assert_eq!(method.to_string().parse::<ReorderMethod>().unwrap(), method);
        }
        assert!("window4".parse::<ReorderMethod>().is_err());
    }

    #[test]
    fn test_lazy_sifting_groups_pairs() {
        let k = 3;
        let mut m = Manager::new(2 * k);
        let f = interleaving_function(&mut m, k);
        let table = truth_table(&m, f, 2 * k);
        for i in 0..k as VarIndex {
            m.set_pair_index(i, i + k as VarIndex).unwrap();
            m.set_pair_index(i + k as VarIndex, i).unwrap();
            m.set_var_to_be_grouped(i).unwrap();
        }
        m.reduce_heap(ReorderMethod::LazySift, 0).unwrap();
        assert_eq!(truth_table(&m, f, 2 * k), table);
        assert!(m.debug_check().is_ok());
        m.recursive_deref(f);
    }
}
