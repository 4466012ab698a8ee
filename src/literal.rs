//! Operations on cubes viewed as sets of literals.

use crate::cache::{Op, OpKey};
use crate::error::{Result, Step};
use crate::manager::Manager;
use crate::reference::Ref;

impl Manager {
    /// The cube of the literals that appear, with the same phase, in both
    /// cubes `f` and `g`.
    pub fn literal_set_intersection(&mut self, f: Ref, g: Ref) -> Result<Ref> {
        self.run(|m| m.literal_set_rec(f, g))
    }

    /// Drop the top literal of the cube `f`; returns the rest and whether
    /// the literal was positive.
    fn next_literal(&self, f: Ref) -> (Ref, bool) {
        let (t, e) = self.cofactors(f);
        if t == -self.one {
            (e, false)
        } else {
            (t, true)
        }
    }

    fn literal_set_rec(&mut self, f: Ref, g: Ref) -> Step<Ref> {
        let one = self.one;
        if f == g {
            return Ok(f);
        }
        // Complementary single literals.
        if f.regular() == g.regular() {
            return Ok(one);
        }

        // Skip literals that are not shared.
        let (mut f, mut g) = (f, g);
        let (mut top_f, mut top_g) = (self.level(f), self.level(g));
        while top_f != top_g {
            if top_f < top_g {
                f = self.next_literal(f).0;
                top_f = self.level(f);
            } else {
                g = self.next_literal(g).0;
                top_g = self.level(g);
            }
        }
        if f == one {
            return Ok(one);
        }

        let key = OpKey::binary(Op::LiteralSet, f, g);
        if let Some(r) = self.cache_lookup(&key) {
            return Ok(r);
        }

        let index = self.node_index(f);
        let (fc, phase_f) = self.next_literal(f);
        let (gc, phase_g) = self.next_literal(g);
        let rest = self.literal_set_rec(fc, gc)?;
        let r = if phase_f != phase_g {
            rest
        } else {
            self.ref_node(rest);
            let zero = -one;
            let r = if phase_f { self.mk(index, rest, zero) } else { self.mk(index, zero, rest) };
            let r = self.guard(r, &[rest])?;
            self.deref(rest);
            r
        };
        self.cache_insert(key, r);
        Ok(r)
    }
}
