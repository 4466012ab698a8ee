//! Group sifting.
//!
//! Groups of adjacent levels are linked through [`Subtable::next`]: each
//! level points to the one below it and the bottom level points back to
//! the top, so a singleton points to itself. Groups are sifted as blocks.
//! While a variable is sifted, it may be *aggregated* with its neighbour
//! when an [`Aggregation`] test says the two belong together:
//!
//! - extended symmetry, tolerating a configurable share of violations;
//! - plain symmetry (used by symmetric sifting);
//! - the user-provided pairing of lazy sifting.
//!
//! Every aggregation is recorded as a move, so backtracking can split the
//! group again if the position where it was formed turns out not to be the
//! best one.
//!
//! [`Subtable::next`]: crate::subtable::Subtable::next

use std::cmp::Reverse;

use log::{debug, trace};

use crate::config::GroupCheck;
use crate::error::Result;
use crate::manager::Manager;
use crate::reference::Ref;
use crate::reorder::{Move, MoveKind};
use crate::types::{LazyGroup, Level, VarIndex};

/// Test deciding whether two adjacent groups are merged during sifting.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Aggregation {
    None,
    ExtSymm,
    Symm,
    Lazy,
}

/// One node of layer `x` seen through layer `y`.
pub(crate) struct LayerNode {
    /// Neither child is labelled with the variable of `y`.
    pub bypass: bool,
    /// The node is not an unreferenced projection function.
    pub notproj: bool,
    /// Number of children labelled with the variable of `y`.
    pub arcs: usize,
    pub f11: Ref,
    pub f10: Ref,
    pub f01: Ref,
    pub f00: Ref,
}

// Group links.
impl Manager {
    pub(crate) fn is_singleton(&self, x: Level) -> bool {
        self.subtables[x as usize].next == x
    }

    pub(crate) fn group_bottom(&self, mut x: Level) -> Level {
        while x < self.subtables[x as usize].next {
            x = self.subtables[x as usize].next;
        }
        x
    }

    pub(crate) fn group_top(&self, x: Level) -> Level {
        self.subtables[self.group_bottom(x) as usize].next
    }

    /// Levels of the group containing `x`, top first.
    pub(crate) fn group_levels(&self, x: Level) -> std::ops::RangeInclusive<Level> {
        let bottom = self.group_bottom(x);
        self.subtables[bottom as usize].next..=bottom
    }

    /// Make `top..=bottom` one group.
    pub(crate) fn link_block(&mut self, top: Level, bottom: Level) {
        for l in top..bottom {
            self.subtables[l as usize].next = l + 1;
        }
        self.subtables[bottom as usize].next = top;
    }

    /// Join the group ending at `x` with the group starting at `y = x + 1`.
    pub(crate) fn merge_groups(&mut self, x: Level, y: Level) {
        let gxtop = self.subtables[x as usize].next;
        let gybot = self.group_bottom(y);
        self.subtables[x as usize].next = y;
        self.subtables[gybot as usize].next = gxtop;
    }

    /// Cut the group containing `x` and `y = x + 1` between them.
    pub(crate) fn split_groups(&mut self, x: Level, y: Level) {
        let boty = self.group_bottom(y);
        let topx = self.subtables[boty as usize].next;
        self.subtables[boty as usize].next = y;
        self.subtables[x as usize].next = topx;
    }

    /// Turn every level of the group containing `x` into a singleton.
    pub(crate) fn dissolve_group(&mut self, x: Level) {
        for l in self.group_levels(x) {
            self.subtables[l as usize].next = l;
        }
    }

    pub(crate) fn reset_groups(&mut self) {
        for (l, t) in self.subtables.iter_mut().enumerate() {
            t.next = l as Level;
        }
    }
}

// Aggregation tests.
impl Manager {
    /// Nodes of layer `x` with their cofactors with respect to `x` and `y`.
    pub(crate) fn layer_nodes(&self, x: Level, y: Level) -> Vec<LayerNode> {
        let yindex = self.invperm[y as usize];
        let one = self.one();
        self.subtables[x as usize]
            .ids(&self.nodes)
            .into_iter()
            .filter_map(|id| {
                let node = &self.nodes[id as usize];
                let (f1, f0) = node.children()?;
                let at_y = |r: Ref| self.node_index(r) == yindex;
                let (f11, f10) = self.cofactors_of(f1, yindex);
                let (f01, f00) = self.cofactors_of(f0, yindex);
                Some(LayerNode {
                    bypass: !at_y(f1) && !at_y(f0),
                    notproj: f1 != one || f0.regular() != one || node.ref_count != 1,
                    arcs: at_y(f1) as usize + at_y(f0) as usize,
                    f11,
                    f10,
                    f01,
                    f00,
                })
            })
            .collect()
    }

    /// Sum of the reference counts at level `y`, less the manager's own
    /// reference to the projection function.
    pub(crate) fn layer_ref_total(&self, y: Level) -> i64 {
        let total: i64 = self.subtables[y as usize]
            .ids(&self.nodes)
            .into_iter()
            .map(|id| self.nodes[id as usize].ref_count as i64)
            .sum();
        total - 1
    }

    /// Extended symmetry of the variables at `x` and `y = x + 1`, up to
    /// the tolerated share of violations.
    pub(crate) fn ext_symm_check(&self, x: Level, y: Level) -> bool {
        let xindex = self.invperm[x as usize];
        let yindex = self.invperm[y as usize];
        if !self.test_interact(xindex, yindex) {
            return false;
        }

        let keys_x = self.subtables[x as usize].keys as f64;
        let mut counter = (keys_x * (self.config.symm_violation as f64 / 100.0) + 0.5) as i64;
        let mut arcs = 0;
        for node in self.layer_nodes(x, y) {
            arcs += node.arcs;
            if node.bypass && node.notproj {
                if counter == 0 {
                    return false;
                }
                counter -= 1;
            }
            if node.notproj && node.f01 != node.f10 && node.f11 != node.f00 {
                if counter == 0 {
                    return false;
                }
                counter -= 1;
            }
        }

        let keys_y = self.subtables[y as usize].keys as f64;
        let arc_counter = (keys_y * (self.config.arc_violation as f64 / 100.0) + 0.5) as i64;
        let res = arcs as i64 >= self.layer_ref_total(y) - arc_counter;
        if res {
            trace!("extended symmetry of {} and {} at {}/{}", xindex, yindex, x, y);
        }
        res
    }

    /// Second-difference test: merge `x` and `y` when the number of nodes
    /// changes convexly across the three levels ending at `y`.
    pub(crate) fn sec_diff_check(&self, x: Level, y: Level) -> bool {
        if x == 0 {
            return false;
        }
        let nx = self.subtables[x as usize].keys as f64;
        let nx_1 = self.subtables[x as usize - 1].keys as f64;
        let sx = self.subtables[y as usize].keys as f64 / nx - nx / nx_1;
        let threshold = self.config.recomb as f64 / 100.0;
        sx < threshold && self.test_interact(self.invperm[x as usize], self.invperm[y as usize])
    }

    /// Lazy sifting pairs a variable with its designated partner once one
    /// of them has been handled, as long as the diagram did not grow.
    pub(crate) fn var_group_check(&self, x: Level, y: Level, original: usize) -> bool {
        let xindex = self.invperm[x as usize];
        let yindex = self.invperm[y as usize];
        let xinfo = &self.var_info[xindex as usize];
        let yinfo = &self.var_info[yindex as usize];
        if xinfo.group == LazyGroup::Ungroup {
            return false;
        }
        xinfo.pair_index == yindex
            && (xinfo.handled || yinfo.handled)
            && (xinfo.to_be_grouped() || yinfo.to_be_grouped())
            && self.reorder_size() <= original
    }

    fn aggregates(&self, x: Level, y: Level, check: Aggregation, original: usize) -> bool {
        match check {
            Aggregation::None => false,
            Aggregation::ExtSymm => self.ext_symm_check(x, y),
            Aggregation::Symm => self.symm_check(x, y),
            Aggregation::Lazy => self.var_group_check(x, y, original),
        }
    }
}

// Sifting.
impl Manager {
    /// Sift every group whose bottom lies in `lower..=upper`.
    ///
    /// Groups formed by extended symmetry or second differences only live
    /// while their variable is sifted; symmetry groups and lazy groups are
    /// kept for the rest of the reordering.
    pub(crate) fn group_sifting(&mut self, lower: Level, upper: Level, check: Aggregation) -> Result<()> {
        let n = self.read_size();
        let lazy = check == Aggregation::Lazy;

        // One representative per group: its bottom level.
        let mut reps: Vec<VarIndex> = (0..n as VarIndex)
            .filter(|&i| {
                let x = self.perm[i as usize];
                x >= self.subtables[x as usize].next
            })
            .collect();
        reps.sort_by_key(|&i| Reverse(self.subtables[self.perm[i as usize] as usize].keys));

        if lazy {
            for info in &mut self.var_info {
                info.handled = false;
            }
        }

        let mut sifted = vec![false; n];
        for &xindex in reps.iter().take(self.config.sift_max_var) {
            if !self.reorder_budget_left() {
                break;
            }
            if sifted[xindex as usize] {
                continue;
            }
            let x = self.perm[xindex as usize];
            if x < lower || x > upper || self.var_is_bound(xindex) {
                continue;
            }

            let singleton = self.is_singleton(x);
            let first_check = if singleton { check } else { Aggregation::None };
            self.group_sifting_aux(x, lower, upper, first_check)?;

            let mut merged = false;
            if check == Aggregation::ExtSymm && self.config.group_check == GroupCheck::Check7 {
                let x = self.perm[xindex as usize];
                if self.is_singleton(x) {
                    if x != upper
                        && !sifted[self.invperm[x as usize + 1] as usize]
                        && self.is_singleton(x + 1)
                        && self.sec_diff_check(x, x + 1)
                    {
                        merged = true;
                        self.merge_groups(x, x + 1);
                    }
                    if x != lower
                        && !sifted[self.invperm[x as usize - 1] as usize]
                        && self.is_singleton(x - 1)
                        && self.sec_diff_check(x - 1, x)
                    {
                        merged = true;
                        self.merge_groups(x - 1, x);
                    }
                }
            }
            if merged {
                let x = self.group_bottom(self.perm[xindex as usize]);
                self.group_sifting_aux(x, lower, upper, Aggregation::None)?;
            }

            let x = self.perm[xindex as usize];
            if !self.is_singleton(x) {
                for l in self.group_levels(x) {
                    sifted[self.invperm[l as usize] as usize] = true;
                }
                if singleton && matches!(check, Aggregation::None | Aggregation::ExtSymm) {
                    self.dissolve_group(x);
                }
            }
            if lazy {
                for l in self.group_levels(x) {
                    let index = self.invperm[l as usize];
                    self.var_info[index as usize].handled = true;
                }
            }
        }
        Ok(())
    }

    /// Sift the group of `x` within `low..=high`, first aggregating a
    /// singleton with its neighbours.
    fn group_sifting_aux(&mut self, x: Level, low: Level, high: Level, check: Aggregation) -> Result<()> {
        let initial = self.reorder_size();
        let original = initial;
        let index = self.invperm[x as usize];

        if self.is_singleton(x) {
            // Aggregate upwards; y is the top of x's growing group.
            let mut y = x;
            while y > low && self.aggregates(y - 1, y, check, original) {
                let top = self.subtables[y as usize - 1].next;
                self.subtables[y as usize - 1].next = y;
                self.subtables[x as usize].next = top;
                y = top;
            }
            // Aggregate downwards; y is the bottom of the group.
            let mut y = x;
            while y < high && self.aggregates(y, y + 1, check, original) {
                let bottom = self.group_bottom(y + 1);
                self.subtables[bottom as usize].next = self.subtables[y as usize].next;
                self.subtables[y as usize].next = y + 1;
                y = bottom;
            }
        }

        let x = self.group_bottom(x);
        let mut moves = Vec::new();
        let up = if x == low {
            self.group_sifting_down(x, high, check, original, &mut moves)?;
            false
        } else if x == high {
            let top = self.subtables[x as usize].next;
            self.group_sifting_up(top, low, check, original, &mut moves)?;
            true
        } else if x - low > high - x {
            self.group_sifting_down(x, high, check, original, &mut moves)?;
            let x = moves.last().map_or(x, |m| m.y);
            let top = self.group_top(x);
            self.group_sifting_up(top, low, check, original, &mut moves)?;
            true
        } else {
            let top = self.subtables[x as usize].next;
            self.group_sifting_up(top, low, check, original, &mut moves)?;
            let x = moves.last().map_or(x, |m| m.x);
            let x = self.group_bottom(x);
            self.group_sifting_down(x, high, check, original, &mut moves)?;
            false
        };

        self.group_sifting_backward(initial, &moves, up, check == Aggregation::Lazy)?;
        let levels = self.group_levels(self.perm[index as usize]);
        debug!(
            "sifted group {}..={} of {}: size {} -> {}",
            levels.start(),
            levels.end(),
            index,
            initial,
            self.reorder_size()
        );
        Ok(())
    }

    /// Move the group whose top is `y` upwards, towards `x_low`.
    fn group_sifting_up(
        &mut self,
        mut y: Level,
        x_low: Level,
        check: Aggregation,
        original: usize,
        moves: &mut Vec<Move>,
    ) -> Result<()> {
        let yindex = self.invperm[y as usize];

        // Nodes below the group do not change, nor do the ones above it
        // that do not interact with y. The rest may vanish, except at x_low.
        let mut limit = self.reorder_size();
        let mut bound = limit as i64;
        let gybot = self.group_bottom(y);
        for z in x_low + 1..=gybot {
            let zindex = self.invperm[z as usize];
            if zindex == yindex || self.test_interact(zindex, yindex) {
                bound -= self.level_weight(z);
            }
        }

        while y > x_low && bound <= limit as i64 {
            let x = y - 1;
            let gxtop = self.subtables[x as usize].next;
            if self.aggregates(x, y, check, original) {
                self.merge_groups(x, y);
                moves.push(Move {
                    x,
                    y,
                    size: self.reorder_size(),
                    kind: MoveKind::NewGroup,
                });
            } else if self.is_singleton(x) && self.is_singleton(y) {
                let xindex = self.invperm[x as usize];
                let size = self.swap_in_place(x, y)?;
                if self.test_interact(xindex, yindex) {
                    bound += self.level_weight(y);
                }
                moves.push(Move::swap(x, y, size));
                if size as f64 > limit as f64 * self.config.max_growth {
                    return Ok(());
                }
                limit = limit.min(size);
            } else {
                let m = self.group_move(x, y)?;
                moves.push(m);
                for z in self.group_levels(m.y) {
                    if self.test_interact(self.invperm[z as usize], yindex) {
                        bound += self.level_weight(z);
                    }
                }
                if m.size as f64 > limit as f64 * self.config.max_growth {
                    return Ok(());
                }
                limit = limit.min(m.size);
            }
            y = gxtop;
        }
        Ok(())
    }

    /// Move the group whose bottom is `x` downwards, towards `x_high`.
    fn group_sifting_down(
        &mut self,
        mut x: Level,
        x_high: Level,
        check: Aggregation,
        original: usize,
        moves: &mut Vec<Move>,
    ) -> Result<()> {
        // A group made only of projection functions cannot improve.
        if self.group_levels(x).all(|l| self.subtables[l as usize].keys == 1) {
            return Ok(());
        }

        let xindex = self.invperm[x as usize];
        let gxtop = self.subtables[x as usize].next;
        let mut limit = self.reorder_size();
        let mut size = limit;
        let mut bound: i64 = 0;
        for z in gxtop + 1..=x_high {
            let zindex = self.invperm[z as usize];
            if zindex == xindex || self.test_interact(xindex, zindex) {
                bound += self.level_weight(z);
            }
        }

        while x < x_high && (size as i64 - bound) < limit as i64 {
            let y = x + 1;
            let gybot = self.group_bottom(y);
            if self.aggregates(x, y, check, original) {
                self.merge_groups(x, y);
                moves.push(Move {
                    x,
                    y,
                    size: self.reorder_size(),
                    kind: MoveKind::NewGroup,
                });
            } else if self.is_singleton(x) && self.is_singleton(y) {
                let yindex = self.invperm[y as usize];
                if self.test_interact(xindex, yindex) {
                    bound -= self.level_weight(y);
                }
                size = self.swap_in_place(x, y)?;
                moves.push(Move::swap(x, y, size));
                if size as f64 > limit as f64 * self.config.max_growth {
                    return Ok(());
                }
                limit = limit.min(size);
            } else {
                let gxtop = self.subtables[x as usize].next;
                for z in gxtop + 1..=gybot {
                    let zindex = self.invperm[z as usize];
                    if zindex == xindex || self.test_interact(xindex, zindex) {
                        bound -= self.level_weight(z);
                    }
                }
                let m = self.group_move(x, y)?;
                moves.push(m);
                size = m.size;
                if size as f64 > limit as f64 * self.config.max_growth {
                    return Ok(());
                }
                limit = limit.min(size);
                let gxtop = self.subtables[gybot as usize].next;
                for z in gxtop + 1..=gybot {
                    let zindex = self.invperm[z as usize];
                    if zindex == xindex || self.test_interact(xindex, zindex) {
                        bound += self.level_weight(z);
                    }
                }
            }
            x = gybot;
        }
        Ok(())
    }

    /// Exchange the group ending at `x` with the group starting at
    /// `y = x + 1`, keeping the order inside each group.
    pub(crate) fn group_move(&mut self, x: Level, y: Level) -> Result<Move> {
        debug_assert_eq!(x + 1, y);
        let xtop = self.subtables[x as usize].next;
        let xsize = x - xtop + 1;
        let ybot = self.group_bottom(y);
        let ysize = ybot - y + 1;

        // Each variable of the lower group climbs through the upper one.
        for i in 0..ysize {
            let mut l = y + i;
            for _ in 0..xsize {
                self.swap_in_place(l - 1, l)?;
                l -= 1;
            }
        }

        self.link_block(xtop, xtop + ysize - 1);
        self.link_block(xtop + ysize, ybot);
        Ok(Move::swap(xtop + ysize - 1, xtop + ysize, self.reorder_size()))
    }

    /// Undo `moves` back to the best position.
    ///
    /// Lazy sifting prefers, among the positions of minimum size, the one
    /// closest to the partner of the sifted variable.
    fn group_sifting_backward(&mut self, initial: usize, moves: &[Move], up: bool, lazy: bool) -> Result<()> {
        let best = moves.iter().map(|m| m.size).fold(initial, usize::min);

        let target = match moves.last() {
            Some(last) if lazy => {
                let index = if up {
                    self.invperm[last.x as usize]
                } else {
                    self.invperm[last.y as usize]
                };
                let pair_level = self.perm[self.var_info[index as usize].pair_index as usize];
                moves
                    .iter()
                    .enumerate()
                    .rev()
                    .filter(|(_, m)| m.size == best)
                    .min_by_key(|(_, m)| if up { m.x.abs_diff(pair_level) } else { m.y.abs_diff(pair_level) })
                    .map(|(i, _)| i)
            }
            _ => None,
        };

        for (i, m) in moves.iter().enumerate().rev() {
            let done = if lazy { target == Some(i) } else { m.size == best };
            if done {
                break;
            }
            if self.is_singleton(m.x) && self.is_singleton(m.y) {
                self.swap_in_place(m.x, m.y)?;
            } else if m.kind == MoveKind::NewGroup {
                self.split_groups(m.x, m.y);
            } else {
                self.group_move(m.x, m.y)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::testing::{random_function, truth_table};

    fn prepared(n: usize) -> Manager {
        let mut m = Manager::new(n);
        m.begin_reordering();
        m
    }

    #[test]
    fn test_links() {
        let mut m = prepared(6);
        m.link_block(1, 3);
        assert_eq!(m.group_bottom(1), 3);
        assert_eq!(m.group_top(2), 1);
        assert_eq!(m.group_levels(3), 1..=3);
        assert!(m.is_singleton(0));

        m.merge_groups(3, 4);
        assert_eq!(m.group_levels(4), 1..=4);
        m.split_groups(3, 4);
        assert_eq!(m.group_levels(2), 1..=3);
        assert!(m.is_singleton(4));

        m.dissolve_group(2);
        assert!((0..6).all(|l| m.is_singleton(l)));
        m.end_reordering();
    }

    #[test]
    fn test_group_move() {
        let n = 5;
        let mut m = Manager::new(n);
        let f = random_function(&mut m, 7, n);
        let table = truth_table(&m, f, n);
        m.begin_reordering();
        m.link_block(0, 1);
        m.link_block(2, 4);
        let mv = m.group_move(1, 2).unwrap();
        assert_eq!((mv.x, mv.y), (2, 3));
        assert_eq!(m.order(), vec![2, 3, 4, 0, 1]);
        assert_eq!(m.group_levels(0), 0..=2);
        assert_eq!(m.group_levels(4), 3..=4);

        // Moving back restores the order.
        m.group_move(mv.x, mv.y).unwrap();
        assert_eq!(m.order(), vec![0, 1, 2, 3, 4]);
        m.end_reordering();
        assert_eq!(truth_table(&m, f, n), table);
        m.recursive_deref(f);
    }

    #[test]
    fn test_symmetry_checks() {
        let mut m = Manager::new(3);
        let x0 = m.ith_var(0).unwrap();
        let x1 = m.ith_var(1).unwrap();
        let x2 = m.ith_var(2).unwrap();
        let f = m.xor(x0, x1).unwrap();
        m.ref_node(f);
        m.begin_reordering();
        assert!(m.ext_symm_check(0, 1));
        assert!(m.symm_check(0, 1));
        // x2 does not interact with anything.
        assert!(!m.ext_symm_check(1, 2));
        m.end_reordering();
        m.recursive_deref(f);

        let g = m.ite(x0, x1, x2).unwrap();
        m.ref_node(g);
        m.begin_reordering();
        assert!(!m.ext_symm_check(0, 1));
        assert!(!m.symm_check(0, 1));
        // The single violation is tolerated once every node may violate.
        m.set_symm_violation(100);
        assert!(m.ext_symm_check(0, 1));
        m.end_reordering();
        m.recursive_deref(g);
    }

    #[test]
    fn test_sec_diff_needs_a_level_above() {
        let m = prepared(3);
        assert!(!m.sec_diff_check(0, 1));
    }

    #[test]
    fn test_var_group_check() {
        let mut m = Manager::new(3);
        let x0 = m.ith_var(0).unwrap();
        let x1 = m.ith_var(1).unwrap();
        let f = m.and(x0, x1).unwrap();
        m.ref_node(f);
        m.set_pair_index(0, 1).unwrap();
        m.begin_reordering();
        let size = m.reorder_size();
        assert!(!m.var_group_check(0, 1, size));
        m.set_var_handled(1).unwrap();
        assert!(!m.var_group_check(0, 1, size));
        m.set_var_to_be_grouped(0).unwrap();
        assert!(m.var_group_check(0, 1, size));
        assert!(!m.var_group_check(0, 1, size - 1));
        assert!(!m.var_group_check(1, 2, size));
        m.set_var_to_be_ungrouped(0).unwrap();
        assert!(!m.var_group_check(0, 1, size));
        m.end_reordering();
        m.recursive_deref(f);
    }

    #[test]
    fn test_group_sifting_is_sound() {
        let n = 6;
        let mut m = Manager::new(n);
        let fs: Vec<_> = (20..24u64).map(|seed| random_function(&mut m, seed, n)).collect();
        let tables: Vec<_> = fs.iter().map(|&f| truth_table(&m, f, n)).collect();
        m.begin_reordering();
        let before = m.reorder_size();
        m.group_sifting(0, n as Level - 1, Aggregation::ExtSymm).unwrap();
        assert!(m.reorder_size() <= before);
        m.end_reordering();
        assert!(m.debug_check().is_ok());
        for (&f, table) in fs.iter().zip(&tables) {
            assert_eq!(&truth_table(&m, f, n), table);
        }
        for f in fs {
            m.recursive_deref(f);
        }
    }
}
