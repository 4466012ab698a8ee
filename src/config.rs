//! Manager configuration.
//!
//! Every field has a working default; use struct update syntax to change a few:
//!
//! ```
//! use dd_rs::config::Config;
//!
//! let config = Config {
//!     unique_slots: 512,
//!     max_growth: 1.1,
//!     ..Config::default()
//! };
//! assert_eq!(config.sift_max_var, 1000);
//! ```

use std::time::Duration;

use crate::reorder::ReorderMethod;

/// Initial number of buckets per unique subtable.
pub const UNIQUE_SLOTS: usize = 256;
/// Initial number of operation cache slots.
pub const CACHE_SLOTS: usize = 1 << 18;
/// Subtables are resized when `keys > buckets * MAX_SUBTABLE_DENSITY`.
pub const MAX_SUBTABLE_DENSITY: usize = 4;
/// Dead nodes tolerated per slot before collection is preferred over resizing.
pub const GC_FRAC_HI: f64 = MAX_SUBTABLE_DENSITY as f64 * 1.0;
/// Live-node count that triggers the first automatic reordering.
pub const FIRST_REORDER: usize = 4004;
/// Factor between live nodes after reordering and the next trigger.
pub const DYN_RATIO: usize = 2;

/// Aggregation test used by group sifting.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum GroupCheck {
    /// Never aggregate.
    NoCheck,
    /// Aggregate on extended symmetry.
    Check5,
    /// Extended symmetry, plus second-difference aggregation after each sift.
    #[default]
    Check7,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Initial buckets per unique subtable.
    pub unique_slots: usize,
    /// Operation cache slots (rounded up to a power of two).
    pub cache_slots: usize,
    /// Ceiling on node storage in bytes; `0` means unlimited.
    pub max_memory: usize,
    /// Limit on live nodes; `0` means unlimited.
    pub max_live: usize,
    /// Sifting stops moving a variable once the size exceeds `best * max_growth`.
    pub max_growth: f64,
    /// Maximum number of variables sifted per reordering.
    pub sift_max_var: usize,
    /// Maximum number of swaps per reordering.
    pub sift_max_swap: usize,
    /// Budget for a single reordering; `None` means unlimited.
    pub time_limit: Option<Duration>,
    /// Live-node threshold for the first automatic reordering.
    pub first_reordering: usize,
    /// Number of automatic reorderings allowed.
    pub max_reorderings: u32,
    pub group_check: GroupCheck,
    /// Second-difference threshold, in percent.
    pub recomb: i32,
    /// Tolerated extended-symmetry violations, in percent of the x layer.
    pub symm_violation: i32,
    /// Tolerated foreign arcs into the y layer, in percent.
    pub arc_violation: i32,
    /// Constants closer than this to zero are snapped to zero.
    pub epsilon: f64,
    pub gc_enabled: bool,
    /// Automatic reordering, enabled when not `None`.
    pub auto_method: Option<ReorderMethod>,
    /// Seed for the randomized swapping method.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unique_slots: UNIQUE_SLOTS,
            cache_slots: CACHE_SLOTS,
            max_memory: 0,
            max_live: 0,
            max_growth: 1.2,
            sift_max_var: 1000,
            sift_max_swap: 2_000_000,
            time_limit: None,
            first_reordering: FIRST_REORDER,
            max_reorderings: u32::MAX,
            group_check: GroupCheck::Check7,
            recomb: 0,
            symm_violation: 0,
            arc_violation: 0,
            epsilon: 1e-12,
            gc_enabled: true,
            auto_method: None,
            seed: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.unique_slots, UNIQUE_SLOTS);
        assert_eq!(config.group_check, GroupCheck::Check7);
        assert!(config.auto_method.is_none());
        assert!(config.time_limit.is_none());
        assert_eq!(config.max_growth, 1.2);
    }
}
