//! Symmetric sifting.
//!
//! Two adjacent variables `x` and `y` are symmetric in `f` when exchanging
//! them leaves `f` unchanged, i.e. `f01 == f10` for every node of layer `x`
//! (or `f11 == f00` for negative symmetry). Symmetric variables are best
//! kept next to each other, so symmetric sifting detects them on the fly
//! and moves them as a group afterwards.

use log::info;

use crate::error::{DdError, Result};
use crate::manager::Manager;
use crate::reorder::group::Aggregation;
use crate::types::{Level, VarIndex};

impl Manager {
    /// Whether the variables at `x` and `y = x + 1` are symmetric in every
    /// function of the diagram.
    pub(crate) fn symm_check(&self, x: Level, y: Level) -> bool {
        // A lone node at x is the projection function and cannot reach y.
        if self.subtables[x as usize].keys == 1 {
            return false;
        }
        let yindex = self.invperm[y as usize];
        if self.subtables[y as usize].keys == 1 && self.is_isolated(yindex) {
            return false;
        }

        let mut positive = true;
        let mut negative = true;
        let mut arcs = 0;
        for node in self.layer_nodes(x, y) {
            if node.bypass && node.notproj {
                return false;
            }
            arcs += node.arcs;
            if node.notproj {
                positive &= node.f01 == node.f10;
                negative &= node.f11 == node.f00;
                if !positive && !negative {
                    return false;
                }
            }
        }
        arcs as i64 == self.layer_ref_total(y)
    }

    pub(crate) fn symm_sifting(&mut self, lower: Level, upper: Level) -> Result<()> {
        self.group_sifting(lower, upper, Aggregation::Symm)?;
        self.symm_summary(lower, upper);
        Ok(())
    }

    /// Repeat symmetric sifting while it keeps shrinking the diagram.
    /// Groups found in one pass are moved as blocks in the next.
    pub(crate) fn symm_sifting_conv(&mut self, lower: Level, upper: Level) -> Result<()> {
        loop {
            let initial = self.reorder_size();
            self.group_sifting(lower, upper, Aggregation::Symm)?;
            if self.reorder_size() >= initial || !self.reorder_budget_left() {
                break;
            }
        }
        self.symm_summary(lower, upper);
        Ok(())
    }

    /// Number of symmetry groups in `lower..=upper` and the number of
    /// variables they hold.
    pub(crate) fn symm_groups(&self, lower: Level, upper: Level) -> (usize, usize) {
        let mut groups = 0;
        let mut vars = 0;
        let mut level = lower;
        while level <= upper {
            let levels = self.group_levels(level);
            let size = levels.end() - levels.start() + 1;
            if size > 1 {
                groups += 1;
                vars += size as usize;
            }
            level = levels.end() + 1;
        }
        (groups, vars)
    }

    /// Maximal runs of adjacent symmetric variables between `lower` and
    /// `upper` in the current order, top to bottom. Variables symmetric
    /// with neither neighbor are left out.
    pub fn symm_profile(&mut self, lower: Level, upper: Level) -> Result<Vec<Vec<VarIndex>>> {
        if lower > upper || upper as usize >= self.read_size() {
            return Err(self.record_error(DdError::InvalidArgument(format!(
                "invalid level range {}..={}",
                lower, upper
            ))));
        }
        if self.reordering {
            return Err(self.record_error(DdError::InvalidArgument("profile requested during reordering".to_string())));
        }
        self.begin_reordering();
        let mut groups = Vec::new();
        let mut run = vec![self.invperm[lower as usize]];
        for x in lower..upper {
            if !self.symm_check(x, x + 1) {
                if run.len() > 1 {
                    groups.push(std::mem::take(&mut run));
                } else {
                    run.clear();
                }
            }
            run.push(self.invperm[x as usize + 1]);
        }
        if run.len() > 1 {
            groups.push(run);
        }
        self.end_reordering();

        for group in &groups {
            info!("symmetry group: {:?}", group);
        }
        info!(
            "{} symmetry groups, {} symmetric variables",
            groups.len(),
            groups.iter().map(Vec::len).sum::<usize>()
        );
        Ok(groups)
    }

    fn symm_summary(&self, lower: Level, upper: Level) {
        let (groups, vars) = self.symm_groups(lower, upper);
        info!("symmetric sifting: {} groups, {} symmetric variables", groups, vars);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::reference::Ref;
    use crate::testing::truth_table;
    use crate::types::VarIndex;

    /// Majority of x0, x1, x2, and x3 xor x4.
    fn symmetric_mix(m: &mut Manager) -> Ref {
        let x: Vec<Ref> = (0..5).map(|i| m.ith_var(i).unwrap()).collect();
        let ab = m.and(x[0], x[1]).unwrap();
        m.ref_node(ab);
        let ac = m.and(x[0], x[2]).unwrap();
        m.ref_node(ac);
        let bc = m.and(x[1], x[2]).unwrap();
        m.ref_node(bc);
        let t = m.or(ab, ac).unwrap();
        m.ref_node(t);
        let maj = m.or(t, bc).unwrap();
        m.ref_node(maj);
        let p = m.xor(x[3], x[4]).unwrap();
        m.ref_node(p);
        let f = m.and(maj, p).unwrap();
        m.ref_node(f);
        for g in [ab, ac, bc, t, maj, p] {
            m.recursive_deref(g);
        }
        f
    }

    #[test]
    fn test_symm_check_adjacent() {
        let mut m = Manager::new(4);
        let x: Vec<Ref> = (0..4).map(|i| m.ith_var(i).unwrap()).collect();
        let a = m.and(x[0], x[1]).unwrap();
        m.ref_node(a);
        let f = m.and(a, x[2]).unwrap();
        m.ref_node(f);
        m.recursive_deref(a);
        m.begin_reordering();
        assert!(m.symm_check(0, 1));
        assert!(m.symm_check(1, 2));
        // x3 is only a projection function.
        assert!(!m.symm_check(2, 3));
        m.end_reordering();
        m.recursive_deref(f);
    }

    #[test]
    fn test_symmetric_variables_end_up_grouped() {
        let mut m = Manager::new(5);
        let f = symmetric_mix(&mut m);
        let table = truth_table(&m, f, 5);
        m.begin_reordering();
        m.symm_sifting(0, 4).unwrap();
        assert_eq!(m.symm_groups(0, 4), (2, 5));
        let class = |i: VarIndex| i < 3;
        for level in 0..5 {
            let levels = m.group_levels(level);
            let first = class(m.read_invperm(*levels.start()));
            assert!(levels.clone().all(|l| class(m.read_invperm(l)) == first));
        }
        m.end_reordering();
        assert_eq!(truth_table(&m, f, 5), table);
        assert!(m.debug_check().is_ok());
        m.recursive_deref(f);
    }

    /// Whether `f` is unchanged when variables `a` and `b` are exchanged,
    /// possibly together with complementing both.
    fn symmetric_in(table: &[bool], a: VarIndex, b: VarIndex) -> bool {
        let flip = |row: usize, swap_values: bool| {
            let (va, vb) = ((row >> a) & 1, (row >> b) & 1);
            let (na, nb) = if swap_values { (vb, va) } else { (1 - vb, 1 - va) };
            (row & !(1 << a) & !(1 << b)) | (na << a) | (nb << b)
        };
        let positive = (0..table.len()).all(|row| table[row] == table[flip(row, true)]);
        let negative = (0..table.len()).all(|row| table[row] == table[flip(row, false)]);
        positive || negative
    }

    #[test]
    fn test_symm_profile() {
        let mut m = Manager::new(5);
        let f = symmetric_mix(&mut m);
        let table = truth_table(&m, f, 5);
        let groups = m.symm_profile(0, 4).unwrap();
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4]]);
        for group in &groups {
            for pair in group.windows(2) {
                assert!(symmetric_in(&table, pair[0], pair[1]), "{:?}", pair);
            }
        }
        assert!(!symmetric_in(&table, 2, 3));
        // The order is left alone.
        assert_eq!((0..5).map(|l| m.read_invperm(l)).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(m.symm_profile(3, 2).is_err());
        assert!(m.symm_profile(0, 5).is_err());
        m.recursive_deref(f);
    }

    #[test]
    fn test_symm_sifting_conv_is_sound() {
        let mut m = Manager::new(5);
        let f = symmetric_mix(&mut m);
        let table = truth_table(&m, f, 5);
        let size = m.dag_size(f);
        m.begin_reordering();
        m.symm_sifting_conv(0, 4).unwrap();
        m.end_reordering();
        assert!(m.dag_size(f) <= size);
        assert_eq!(truth_table(&m, f, 5), table);
        m.recursive_deref(f);
    }
}
