//! Rudell's sifting and random pairwise exchange.
//!
//! Sifting moves one variable at a time through a range of levels, going
//! first towards the nearer end of the range, then all the way to the other
//! end, and finally back to the position where the diagram was smallest.
//! A move is abandoned early when the size exceeds `max_growth` times the
//! best size seen, or when the interaction-based bound shows that no better
//! position can follow.

use std::cmp::Reverse;

use log::debug;

use crate::error::Result;
use crate::manager::Manager;
use crate::reorder::Move;
use crate::types::{Level, VarIndex};

impl Manager {
    /// Sift every variable whose level lies in `lower..=upper`, the ones
    /// with the most nodes first.
    pub(crate) fn sifting(&mut self, lower: Level, upper: Level) -> Result<()> {
        let mut vars: Vec<VarIndex> = (0..self.read_size() as VarIndex).collect();
        vars.sort_by_key(|&i| Reverse(self.subtables[self.perm[i as usize] as usize].keys));

        for &index in vars.iter().take(self.config.sift_max_var) {
            if !self.reorder_budget_left() {
                break;
            }
            let x = self.perm[index as usize];
            if x < lower || x > upper || self.var_is_bound(index) {
                continue;
            }
            self.sifting_aux(x, lower, upper)?;
        }
        Ok(())
    }

    fn sifting_aux(&mut self, x: Level, low: Level, high: Level) -> Result<()> {
        let initial = self.reorder_size();
        let index = self.invperm[x as usize];

        // Both phases are undone together, so an aborted second phase
        // still ends at the best position seen.
        let moves = if x == low {
            self.sift_down(x, high)?
        } else if x == high {
            self.sift_up(x, low)?
        } else if x - low > high - x {
            // Closer to the bottom: go down first.
            let mut moves = self.sift_down(x, high)?;
            let x = moves.last().map_or(x, |m| m.y);
            moves.extend(self.sift_up(x, low)?);
            moves
        } else {
            let mut moves = self.sift_up(x, low)?;
            let x = moves.last().map_or(x, |m| m.x);
            moves.extend(self.sift_down(x, high)?);
            moves
        };
        self.sifting_backward(initial, &moves)?;
        debug!(
            "sifted {} to level {}: size {} -> {}",
            index,
            self.perm[index as usize],
            initial,
            self.reorder_size()
        );
        Ok(())
    }

    /// Move the variable at `y` up towards `x_low`.
    fn sift_up(&mut self, mut y: Level, x_low: Level) -> Result<Vec<Move>> {
        let mut moves = Vec::new();
        let yindex = self.invperm[y as usize];

        // Nodes below y do not change, and neither do the levels above y
        // that do not interact with it. The rest may vanish, except the
        // nodes at x_low.
        let mut limit = self.reorder_size();
        let mut bound = limit as i64;
        for x in x_low + 1..y {
            if self.test_interact(self.invperm[x as usize], yindex) {
                bound -= self.level_weight(x);
            }
        }
        bound -= self.level_weight(y);

        while y > x_low && bound <= limit as i64 {
            let x = y - 1;
            if self.test_interact(self.invperm[x as usize], yindex) {
                bound += self.level_weight(x);
            }
            let size = self.swap_in_place(x, y)?;
            moves.push(Move::swap(x, y, size));
            if size as f64 > limit as f64 * self.config.max_growth {
                break;
            }
            limit = limit.min(size);
            y = x;
        }
        Ok(moves)
    }

    /// Move the variable at `x` down towards `x_high`.
    fn sift_down(&mut self, mut x: Level, x_high: Level) -> Result<Vec<Move>> {
        let mut moves = Vec::new();
        let xindex = self.invperm[x as usize];

        // Upper bound on how much moving down can save.
        let mut limit = self.reorder_size();
        let mut size = limit;
        let mut reducible: i64 = 0;
        for y in x + 1..=x_high {
            if self.test_interact(xindex, self.invperm[y as usize]) {
                reducible += self.level_weight(y);
            }
        }

        while x < x_high && (size as i64 - reducible) < limit as i64 {
            let y = x + 1;
            if self.test_interact(xindex, self.invperm[y as usize]) {
                reducible -= self.level_weight(y);
            }
            size = self.swap_in_place(x, y)?;
            moves.push(Move::swap(x, y, size));
            if size as f64 > limit as f64 * self.config.max_growth {
                break;
            }
            limit = limit.min(size);
            x = y;
        }
        Ok(moves)
    }

    /// Undo `moves`, most recent first, until the smallest size is reached.
    /// When several positions tie for the smallest size, the most recent
    /// one is kept.
    pub(crate) fn sifting_backward(&mut self, initial: usize, moves: &[Move]) -> Result<()> {
        let best = moves.iter().map(|m| m.size).fold(initial, usize::min);
        for m in moves.iter().rev() {
            if m.size == best {
                break;
            }
            self.swap_in_place(m.x, m.y)?;
        }
        Ok(())
    }

    /// Exchange randomly chosen pairs of variables in `lower..=upper`,
    /// keeping each exchange only as far as it helps.
    pub(crate) fn random_swapping(&mut self, lower: Level, upper: Level) -> Result<()> {
        let nvars = (upper - lower + 1) as usize;
        if nvars < 2 {
            return Ok(());
        }
        for _ in 0..nvars {
            if !self.reorder_budget_left() {
                break;
            }
            let a = self.rng.below(nvars);
            let mut b = self.rng.below(nvars);
            while b == a {
                b = self.rng.below(nvars);
            }
            let (x, y) = (lower + a.min(b) as Level, lower + a.max(b) as Level);
            let initial = self.reorder_size();
            let moves = self.swap_any(x, y)?;
            self.sifting_backward(initial, &moves)?;
        }
        Ok(())
    }

    /// Exchange the variables at levels `x < y`, recording every swap.
    fn swap_any(&mut self, x: Level, y: Level) -> Result<Vec<Move>> {
        let mut moves = Vec::new();
        for l in x..y {
            let size = self.swap_in_place(l, l + 1)?;
            moves.push(Move::swap(l, l + 1, size));
        }
        for l in (x..y - 1).rev() {
            let size = self.swap_in_place(l, l + 1)?;
            moves.push(Move::swap(l, l + 1, size));
        }
        Ok(moves)
    }
}
