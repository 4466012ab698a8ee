//! Model counting and witness extraction.

use std::collections::HashMap;

use num_bigint::BigUint;

use crate::manager::Manager;
use crate::reference::Ref;

impl Manager {
    /// Terminals counted as "false": BDD zero and the ADD zero.
    fn is_background(&self, f: Ref) -> bool {
        f == -self.one || f == self.add_zero
    }

    /// Number of satisfying assignments of `f` over `num_vars` variables.
    /// For an ADD, the number of assignments mapped to a nonzero value.
    ///
    /// Exact up to the precision of `f64`; see
    /// [`count_minterm_exact`][Self::count_minterm_exact].
    pub fn count_minterm(&self, f: Ref, num_vars: usize) -> f64 {
        let max = 2f64.powi(num_vars as i32);
        let mut cache = HashMap::new();
        self.count_minterm_rec(f, max, &mut cache)
    }

    fn count_minterm_rec(&self, f: Ref, max: f64, cache: &mut HashMap<Ref, f64>) -> f64 {
        if self.is_constant(f) {
            return if self.is_background(f) { 0.0 } else { max };
        }
        if let Some(&count) = cache.get(&f) {
            return count;
        }
        let (t, e) = self.cofactors(f);
        let count = (self.count_minterm_rec(t, max, cache) + self.count_minterm_rec(e, max, cache)) / 2.0;
        cache.insert(f, count);
        count
    }

    /// Number of satisfying assignments of `f` over `num_vars` variables,
    /// with arbitrary precision.
    pub fn count_minterm_exact(&self, f: Ref, num_vars: usize) -> BigUint {
        let max = BigUint::from(2u32).pow(num_vars as u32);
        let mut cache = HashMap::new();
        self.count_exact_rec(f, &max, &mut cache)
    }

    fn count_exact_rec(&self, f: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_constant(f) {
            return if self.is_background(f) { BigUint::ZERO } else { max.clone() };
        }
        if let Some(count) = cache.get(&f) {
            return count.clone();
        }
        let (t, e) = self.cofactors(f.regular());
        let count: BigUint = (self.count_exact_rec(t, max, cache) + self.count_exact_rec(e, max, cache)) >> 1;
        let count = if f.is_negated() { max - count } else { count };
        cache.insert(f, count.clone());
        count
    }

    /// One satisfying cube of `f`, indexed by variable: `Some(value)` for
    /// variables on the chosen path and `None` for don't-cares.
    ///
    /// Returns `None` when `f` is unsatisfiable.
    pub fn pick_one_cube(&self, f: Ref) -> Option<Vec<Option<bool>>> {
        if f == -self.one {
            return None;
        }
        let mut cube = vec![None; self.read_size()];
        let mut r = f;
        while !self.is_constant(r) {
            let (t, e) = self.cofactors(r);
            let index = self.node_index(r) as usize;
            if t != -self.one {
                cube[index] = Some(true);
                r = t;
            } else {
                cube[index] = Some(false);
                r = e;
            }
        }
        Some(cube)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::testing::{random_function, truth_table};

    #[test]
    fn test_count_terminals() {
        let m = Manager::new(3);
        assert_eq!(m.count_minterm(m.one(), 3), 8.0);
        assert_eq!(m.count_minterm(m.zero(), 3), 0.0);
        assert_eq!(m.count_minterm_exact(m.one(), 3), BigUint::from(8u32));
    }

    #[test]
    fn test_count_matches_truth_table() {
        let n = 6;
        let mut m = Manager::new(n);
        for seed in 1..10u64 {
            let f = random_function(&mut m, seed, n);
            let ones = truth_table(&m, f, n).iter().filter(|&&b| b).count();
            assert_eq!(m.count_minterm(f, n), ones as f64);
            assert_eq!(m.count_minterm_exact(f, n), BigUint::from(ones));
            assert_eq!(m.count_minterm_exact(-f, n), BigUint::from((1usize << n) - ones));
            m.recursive_deref(f);
        }
    }

    #[test]
    fn test_count_many_variables() {
        let mut m = Manager::new(100);
        let x = m.ith_var(7).unwrap();
        let expected = BigUint::from(2u32).pow(99);
        assert_eq!(m.count_minterm_exact(x, 100), expected);
    }

    #[test]
    fn test_pick_one_cube() {
        let mut m = Manager::new(3);
        let x = m.ith_var(0).unwrap();
        let z = m.ith_var(2).unwrap();
        let f = m.and(-x, z).unwrap();
        let cube = m.pick_one_cube(f).unwrap();
        assert_eq!(cube, vec![Some(false), None, Some(true)]);
        assert!(m.pick_one_cube(m.zero()).is_none());
        let inputs: Vec<bool> = cube.iter().map(|v| v.unwrap_or(false)).collect();
        assert!(m.eval(f, &inputs));
    }
}
