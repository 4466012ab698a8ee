//! Computed table for memoizing recursive operations.
//!
//! Keys are `(operation, aux, f, g, h)` where unused operands are
//! [`Ref::INVALID`] and `aux` carries a small non-node parameter such as
//! the operator of a generic ADD apply. Values are result edges. The cache is a heuristic:
//! lost entries only cost recomputation. Node identities change meaning
//! during reordering, so the manager clears the whole cache before every
//! reordering, and drops entries touching dead nodes before every
//! garbage collection.
//!
//! # Example
//!
//! ```
//! use dd_rs::cache::{Op, OpCache, OpKey};
//! use dd_rs::reference::Ref;
//!
//! let mut cache = OpCache::new(10);
//! let key = OpKey::binary(Op::And, Ref::positive(3), Ref::positive(4));
//! cache.insert(key, Ref::positive(5));
//! assert_eq!(cache.get(&key), Some(Ref::positive(5)));
//! ```

mod direct_mapped;

pub use direct_mapped::DirectMappedCache;

use crate::reference::Ref;
use crate::utils::{mix64, pairing4, MyHash};

/// Operation tags of cached recursive procedures.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Op {
    Ite,
    And,
    Xor,
    Leq,
    ExistAbstract,
    AndAbstract,
    Cofactor,
    Compose,
    Constrain,
    Restrict,
    NpAnd,
    Squeeze,
    CharToVect,
    LiteralSet,
    AddApply,
    AddIte,
    AddCmpl,
    AddNegate,
    AddConstrain,
    AddRestrict,
    BddToAdd,
    AddBddPattern,
    AddBddThreshold,
    AddBddStrictThreshold,
    AddBddInterval,
    AddBddIthBit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct OpKey {
    pub op: Op,
    pub aux: u32,
    pub f: Ref,
    pub g: Ref,
    pub h: Ref,
}

impl OpKey {
    pub fn unary(op: Op, f: Ref) -> Self {
        Self::ternary(op, f, Ref::INVALID, Ref::INVALID)
    }

    pub fn binary(op: Op, f: Ref, g: Ref) -> Self {
        Self::ternary(op, f, g, Ref::INVALID)
    }

    pub fn ternary(op: Op, f: Ref, g: Ref, h: Ref) -> Self {
        Self { op, aux: 0, f, g, h }
    }

    pub fn with_aux(mut self, aux: u32) -> Self {
        self.aux = aux;
        self
    }

    /// Operand edges, skipping unused slots.
    pub fn operands(&self) -> impl Iterator<Item = Ref> {
        [self.f, self.g, self.h].into_iter().filter(|r| *r != Ref::INVALID)
    }
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        mix64(pairing4(
            ((self.op as u64) << 32) | self.aux as u64,
            self.f.raw() as u64,
            self.g.raw() as u64,
            self.h.raw() as u64,
        ))
    }
}

/// Cache type used by the manager.
pub type OpCache = DirectMappedCache<OpKey, Ref>;

/// Snapshot of cache counters.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub slots: usize,
    pub hits: usize,
    pub misses: usize,
    pub faults: usize,
}

impl CacheStats {
    pub fn of(cache: &OpCache) -> Self {
        Self {
            slots: cache.capacity(),
            hits: cache.hits(),
            misses: cache.misses(),
            faults: cache.faults(),
        }
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
