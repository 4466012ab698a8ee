//! Helpers shared by unit tests.

use crate::manager::Manager;
use crate::reference::Ref;
use crate::types::VarIndex;
use crate::utils::XorShift;

/// Values of the BDD `f` on all `2^n` assignments; bit `j` of the row
/// number is the value of variable `j`.
pub(crate) fn truth_table(m: &Manager, f: Ref, n: usize) -> Vec<bool> {
    (0..1usize << n)
        .map(|row| {
            let inputs: Vec<bool> = (0..m.read_size()).map(|j| j < n && (row >> j) & 1 == 1).collect();
            m.eval(f, &inputs)
        })
        .collect()
}

/// Values of the ADD `f` on all `2^n` assignments.
pub(crate) fn add_table(m: &Manager, f: Ref, n: usize) -> Vec<f64> {
    (0..1usize << n)
        .map(|row| {
            let inputs: Vec<bool> = (0..m.read_size()).map(|j| j < n && (row >> j) & 1 == 1).collect();
            m.add_eval(f, &inputs)
        })
        .collect()
}

/// A pseudo-random referenced BDD over variables `0..n`.
pub(crate) fn random_function(m: &mut Manager, seed: u64, n: usize) -> Ref {
    let mut rng = XorShift::new(seed);
    shannon(m, &mut rng, 0, n)
}

fn shannon(m: &mut Manager, rng: &mut XorShift, i: usize, n: usize) -> Ref {
    if i == n {
        let r = if rng.below(2) == 1 { m.one() } else { m.zero() };
        m.ref_node(r);
        return r;
    }
    let t = shannon(m, rng, i + 1, n);
    let e = shannon(m, rng, i + 1, n);
    let v = m.ith_var(i as VarIndex).unwrap();
    let r = m.ite(v, t, e).unwrap();
    m.ref_node(r);
    m.recursive_deref(t);
    m.recursive_deref(e);
    r
}

/// Referenced `x0·y0 + x1·y1 + ...` over variables `0..2k`, where the
/// `x` variables occupy indices `0..k` and the `y` variables `k..2k`.
/// Exponential in `k` under the identity order.
pub(crate) fn interleaving_function(m: &mut Manager, k: usize) -> Ref {
    let mut f = m.zero();
    m.ref_node(f);
    for i in 0..k {
        let x = m.ith_var(i as VarIndex).unwrap();
        let y = m.ith_var((i + k) as VarIndex).unwrap();
        let xy = m.and(x, y).unwrap();
        m.ref_node(xy);
        let g = m.or(f, xy).unwrap();
        m.ref_node(g);
        m.recursive_deref(xy);
        m.recursive_deref(f);
        f = g;
    }
    f
}
