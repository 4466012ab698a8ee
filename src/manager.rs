//! The decision-diagram manager.
//!
//! A [`Manager`] owns every node, the per-level unique subtables, the
//! constant table, the operation cache, the variable order and the group
//! tree. All functions built by a manager are [`Ref`] handles into its
//! arena; handles are meaningless to any other manager (see
//! [`Manager::bdd_transfer`] for moving functions between managers).
//!
//! # Reference discipline
//!
//! Operations return their result *unreferenced*. The caller is expected
//! to [`ref_node`][Manager::ref_node] every result it wants to keep and to
//! [`recursive_deref`][Manager::recursive_deref] it when done. Operands of
//! an operation must be referenced while the operation runs: garbage
//! collection and automatic reordering may happen inside any call that
//! creates nodes, and both only preserve referenced nodes.
//!
//! A result that is dropped without ever being referenced costs nothing
//! beyond its slot: the next collection frees it and releases its
//! children. Asking for the same function again before that returns the
//! same node, which may then be referenced as usual.
//!
//! ```
//! use dd_rs::manager::Manager;
//!
//! let mut m = Manager::new(2);
//! let x = m.ith_var(0).unwrap();
//! let y = m.ith_var(1).unwrap();
//! let f = m.and(x, y).unwrap();
//! m.ref_node(f);
//! assert_eq!(m.dag_size(f), 3);
//! m.recursive_deref(f);
//! assert_eq!(m.check_zero_ref(), 0);
//! ```

use std::fmt::{Debug, Formatter};
use std::time::Instant;

use log::debug;

use crate::cache::{CacheStats, OpCache};
use crate::config::{Config, GroupCheck};
use crate::constants::ConstantTable;
use crate::error::{Abort, DdError, Result, Step};
use crate::mtr::GroupTree;
use crate::node::Node;
use crate::reference::Ref;
use crate::reorder::interact::InteractionMatrix;
use crate::reorder::ReorderMethod;
use crate::subtable::Subtable;
use crate::types::{LazyGroup, Level, NodeId, VarIndex, VarInfo, CONST_INDEX};
use crate::utils::XorShift;

pub struct Manager {
    pub(crate) config: Config,
    pub(crate) nodes: Vec<Node>,
    pub(crate) free: Vec<NodeId>,
    pub(crate) subtables: Vec<Subtable>,
    pub(crate) constants: ConstantTable,
    pub(crate) cache: OpCache,
    /// Level of each variable index.
    pub(crate) perm: Vec<Level>,
    /// Variable index at each level.
    pub(crate) invperm: Vec<VarIndex>,
    /// Projection functions, referenced once by the manager.
    pub(crate) vars: Vec<Ref>,
    pub(crate) var_info: Vec<VarInfo>,
    /// Nodes in the unique table, constants included, live or dead.
    pub(crate) keys: usize,
    /// Nodes whose reference count dropped to zero.
    pub(crate) dead: usize,
    /// Projection functions with no parents, during reordering.
    pub(crate) isolated: i64,
    pub(crate) interaction: Option<InteractionMatrix>,
    pub(crate) tree: Option<GroupTree>,
    pub(crate) one: Ref,
    pub(crate) add_zero: Ref,
    pub(crate) plus_inf: Ref,
    pub(crate) minus_inf: Ref,
    pub(crate) auto_dyn: bool,
    pub(crate) auto_method: ReorderMethod,
    pub(crate) next_dyn: usize,
    pub(crate) reorderings: u32,
    pub(crate) swap_steps: usize,
    /// Swaps performed by the reordering in progress.
    pub(crate) reorder_swaps: usize,
    pub(crate) gc_count: usize,
    pub(crate) reordering: bool,
    pub(crate) reorder_start: Option<Instant>,
    pub(crate) rng: XorShift,
    error: Option<DdError>,
    num_vars_zdd: usize,
}

impl Manager {
    /// Create a manager with `num_vars` BDD variables and default settings.
    pub fn new(num_vars: usize) -> Self {
        Self::with_config(num_vars, Config::default())
    }

    /// Create a manager the way the classic C interface does.
    ///
    /// `num_vars_zdd` is recorded only. `max_memory` bounds node storage in
    /// bytes once the initial variables exist; `0` means unlimited.
    pub fn init(num_vars: usize, num_vars_zdd: usize, unique_slots: usize, cache_slots: usize, max_memory: usize) -> Self {
        let config = Config {
            unique_slots,
            cache_slots,
            max_memory,
            ..Config::default()
        };
        let mut m = Self::with_config(num_vars, config);
        m.num_vars_zdd = num_vars_zdd;
        m
    }

    pub fn with_config(num_vars: usize, config: Config) -> Self {
        let (auto_dyn, auto_method) = match config.auto_method {
            Some(method) => (true, method),
            None => (false, ReorderMethod::Sift),
        };
        let mut m = Self {
            cache: OpCache::with_slots(config.cache_slots),
            next_dyn: config.first_reordering,
            rng: XorShift::new(config.seed),
            config,
            nodes: Vec::new(),
            free: Vec::new(),
            subtables: Vec::new(),
            constants: ConstantTable::default(),
            perm: Vec::new(),
            invperm: Vec::new(),
            vars: Vec::new(),
            var_info: Vec::new(),
            keys: 0,
            dead: 0,
            isolated: 0,
            interaction: None,
            tree: None,
            one: Ref::INVALID,
            add_zero: Ref::INVALID,
            plus_inf: Ref::INVALID,
            minus_inf: Ref::INVALID,
            auto_dyn,
            auto_method,
            reorderings: 0,
            swap_steps: 0,
            reorder_swaps: 0,
            gc_count: 0,
            reordering: false,
            reorder_start: None,
            error: None,
            num_vars_zdd: 0,
        };
        m.one = m.permanent_const(1.0);
        m.add_zero = m.permanent_const(0.0);
        m.plus_inf = m.permanent_const(f64::INFINITY);
        m.minus_inf = m.permanent_const(f64::NEG_INFINITY);
        for _ in 0..num_vars {
            m.push_var(m.perm.len() as Level);
        }
        debug!("init: {} variables, {} nodes", num_vars, m.keys);
        m
    }

    fn permanent_const(&mut self, value: f64) -> Ref {
        let id = self.raw_alloc(Node::constant(value));
        self.constants.insert(value, id);
        self.keys += 1;
        self.nodes[id as usize].inc_ref();
        Ref::positive(id)
    }

    /// Allocate a slot ignoring the memory ceiling.
    pub(crate) fn raw_alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id as usize] = node;
            id
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as NodeId
        }
    }

    /// Add a new variable at `level`, shifting lower levels down by one.
    fn push_var(&mut self, level: Level) -> Ref {
        let index = self.perm.len() as VarIndex;
        for p in self.perm.iter_mut() {
            if *p >= level {
                *p += 1;
            }
        }
        self.perm.push(level);
        self.invperm.insert(level as usize, index);
        self.subtables.insert(level as usize, Subtable::new(self.config.unique_slots, level));
        for (l, st) in self.subtables.iter_mut().enumerate() {
            st.next = l as Level;
        }
        self.var_info.push(VarInfo::new(index));

        let one = self.one;
        let id = self.raw_alloc(Node::internal(index, one, -one));
        self.nodes[one.id() as usize].inc_ref();
        self.nodes[one.id() as usize].inc_ref();
        self.subtables[level as usize].insert(id, &mut self.nodes);
        self.keys += 1;
        let var = Ref::positive(id);
        self.nodes[id as usize].inc_ref();
        self.vars.push(var);

        if let Some(tree) = &mut self.tree {
            tree.insert_level(level);
        }
        debug!("new variable {} at level {}", index, level);
        var
    }

    /// Run a recursive step to completion, restarting it after every
    /// reordering it triggers.
    pub(crate) fn run<T>(&mut self, mut op: impl FnMut(&mut Self) -> Step<T>) -> Result<T> {
        loop {
            match op(self) {
                Ok(r) => return Ok(r),
                Err(Abort::Reordered) => {
                    debug!("restarting operation after reordering");
                }
                Err(Abort::Error(e)) => {
                    self.error = Some(e.clone());
                    return Err(e);
                }
            }
        }
    }

    /// Propagate a failed step after releasing `held`.
    pub(crate) fn guard<T>(&mut self, step: Step<T>, held: &[Ref]) -> Step<T> {
        if step.is_err() {
            for &r in held {
                self.recursive_deref(r);
            }
        }
        step
    }

    /// Build the node `(index, t, e)` from two referenced children,
    /// consuming their references.
    pub(crate) fn build(&mut self, index: VarIndex, t: Ref, e: Ref) -> Step<Ref> {
        let r = self.mk(index, t, e);
        let r = self.guard(r, &[t, e])?;
        self.deref(t);
        self.deref(e);
        Ok(r)
    }

    pub(crate) fn record_error(&mut self, e: DdError) -> DdError {
        self.error = Some(e.clone());
        e
    }
}

// Constants and variables.
impl Manager {
    pub fn one(&self) -> Ref {
        self.one
    }

    /// The BDD constant false, i.e. the complement of [`one`][Self::one].
    pub fn zero(&self) -> Ref {
        -self.one
    }

    /// The ADD constant `0.0`.
    pub fn add_zero(&self) -> Ref {
        self.add_zero
    }

    pub fn plus_infinity(&self) -> Ref {
        self.plus_inf
    }

    pub fn minus_infinity(&self) -> Ref {
        self.minus_inf
    }

    /// Terminal node with the given value.
    pub fn add_const(&mut self, value: f64) -> Result<Ref> {
        match self.unique_const(value) {
            Ok(r) => Ok(r),
            Err(e) => Err(self.record_error(e)),
        }
    }

    /// Projection function of variable `index`, creating variables up to it.
    pub fn ith_var(&mut self, index: VarIndex) -> Result<Ref> {
        if index == CONST_INDEX {
            return Err(self.record_error(DdError::InvalidArgument("variable index out of range".to_string())));
        }
        while self.perm.len() <= index as usize {
            self.push_var(self.perm.len() as Level);
        }
        Ok(self.vars[index as usize])
    }

    /// New variable at the bottom of the order.
    pub fn new_var(&mut self) -> Ref {
        self.push_var(self.perm.len() as Level)
    }

    /// New variable inserted at `level`. Levels at or below move down by one.
    pub fn new_var_at_level(&mut self, level: Level) -> Ref {
        let level = level.min(self.perm.len() as Level);
        self.push_var(level)
    }

    /// ADD projection: `1.0` when variable `index` is true, `0.0` otherwise.
    pub fn add_ith_var(&mut self, index: VarIndex) -> Result<Ref> {
        self.ith_var(index)?;
        let (one, zero) = (self.one, self.add_zero);
        self.run(|m| m.mk(index, one, zero))
    }

    /// Number of BDD variables.
    pub fn read_size(&self) -> usize {
        self.perm.len()
    }

    pub fn read_size_zdd(&self) -> usize {
        self.num_vars_zdd
    }
}

// Node inspection.
impl Manager {
    pub fn is_constant(&self, f: Ref) -> bool {
        self.nodes[f.id() as usize].is_constant()
    }

    /// Variable index of the node `f` points to, [`CONST_INDEX`] for terminals.
    pub fn node_index(&self, f: Ref) -> VarIndex {
        self.nodes[f.id() as usize].index
    }

    /// Current level of the top variable of `f`; `u32::MAX` for terminals.
    pub fn level(&self, f: Ref) -> Level {
        let index = self.node_index(f);
        if index == CONST_INDEX {
            CONST_INDEX
        } else {
            self.perm[index as usize]
        }
    }

    /// Value of a terminal node.
    pub fn value(&self, f: Ref) -> Option<f64> {
        self.nodes[f.id() as usize].value()
    }

    /// Then-child of the node, ignoring the complement bit of `f`.
    pub fn then_child(&self, f: Ref) -> Option<Ref> {
        self.nodes[f.id() as usize].children().map(|(t, _)| t)
    }

    /// Else-child of the node, ignoring the complement bit of `f`.
    pub fn else_child(&self, f: Ref) -> Option<Ref> {
        self.nodes[f.id() as usize].children().map(|(_, e)| e)
    }

    /// Positive and negative cofactors of `f` with respect to its top
    /// variable, with the complement of `f` pushed down.
    pub fn cofactors(&self, f: Ref) -> (Ref, Ref) {
        match self.nodes[f.id() as usize].children() {
            Some((t, e)) => (t.not_cond(f.is_negated()), e.not_cond(f.is_negated())),
            None => (f, f),
        }
    }

    /// Cofactors of `f` with respect to the variable at `level`.
    pub(crate) fn cofactors_at(&self, f: Ref, level: Level) -> (Ref, Ref) {
        if self.level(f) == level {
            self.cofactors(f)
        } else {
            (f, f)
        }
    }

    pub(crate) fn ref_count(&self, f: Ref) -> u32 {
        self.nodes[f.id() as usize].ref_count
    }

    /// Index of the variable at `level`.
    pub fn read_invperm(&self, level: Level) -> VarIndex {
        self.invperm[level as usize]
    }

    /// Level of variable `index`.
    pub fn read_perm(&self, index: VarIndex) -> Level {
        self.perm[index as usize]
    }

    /// Current variable order, top to bottom.
    pub fn order(&self) -> Vec<VarIndex> {
        self.invperm.clone()
    }
}

// Statistics and tunables.
impl Manager {
    pub fn read_keys(&self) -> usize {
        self.keys
    }

    pub fn read_dead(&self) -> usize {
        self.dead
    }

    /// Live nodes, constants included.
    pub fn read_node_count(&self) -> usize {
        self.keys - self.dead
    }

    pub fn read_reorderings(&self) -> u32 {
        self.reorderings
    }

    pub fn read_swap_steps(&self) -> usize {
        self.swap_steps
    }

    pub fn read_gc_count(&self) -> usize {
        self.gc_count
    }

    pub fn read_cache_stats(&self) -> CacheStats {
        CacheStats::of(&self.cache)
    }

    pub fn read_error_code(&self) -> Option<&DdError> {
        self.error.as_ref()
    }

    pub fn clear_error_code(&mut self) {
        self.error = None;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_max_growth(&mut self, max_growth: f64) {
        self.config.max_growth = max_growth;
    }

    pub fn set_sift_max_var(&mut self, n: usize) {
        self.config.sift_max_var = n;
    }

    pub fn set_sift_max_swap(&mut self, n: usize) {
        self.config.sift_max_swap = n;
    }

    pub fn set_time_limit(&mut self, limit: Option<std::time::Duration>) {
        self.config.time_limit = limit;
    }

    pub fn set_group_check(&mut self, check: GroupCheck) {
        self.config.group_check = check;
    }

    pub fn set_recomb(&mut self, recomb: i32) {
        self.config.recomb = recomb;
    }

    pub fn set_symm_violation(&mut self, percent: i32) {
        self.config.symm_violation = percent;
    }

    pub fn set_arc_violation(&mut self, percent: i32) {
        self.config.arc_violation = percent;
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.config.epsilon = epsilon;
    }

    pub fn enable_gc(&mut self) {
        self.config.gc_enabled = true;
    }

    pub fn disable_gc(&mut self) {
        self.config.gc_enabled = false;
    }

    pub fn read_next_reordering(&self) -> usize {
        self.next_dyn
    }

    pub fn set_next_reordering(&mut self, next: usize) {
        self.next_dyn = next;
    }

    pub fn set_max_reorderings(&mut self, n: u32) {
        self.config.max_reorderings = n;
    }

    /// Enable automatic reordering with `method`.
    ///
    /// [`ReorderMethod::Same`] keeps the current method.
    pub fn autodyn_enable(&mut self, method: ReorderMethod) {
        self.auto_dyn = true;
        if method != ReorderMethod::Same {
            self.auto_method = method;
        }
    }

    pub fn autodyn_disable(&mut self) {
        self.auto_dyn = false;
    }

    /// Whether automatic reordering is on, and the method it would use.
    pub fn reordering_status(&self) -> (bool, ReorderMethod) {
        (self.auto_dyn, self.auto_method)
    }

    /// Release the manager and everything it owns.
    pub fn quit(self) {
        debug!("quit: {} nodes, {} reorderings", self.keys, self.reorderings);
    }
}

// Variable binding and lazy sifting annotations.
impl Manager {
    fn info_mut(&mut self, index: VarIndex) -> Result<&mut VarInfo> {
        if (index as usize) < self.var_info.len() {
            Ok(&mut self.var_info[index as usize])
        } else {
            Err(self.record_error(DdError::InvalidArgument(format!("no variable {}", index))))
        }
    }

    /// Prevent sifting from moving variable `index`.
    pub fn bind_var(&mut self, index: VarIndex) -> Result<()> {
        self.info_mut(index)?.bound = true;
        Ok(())
    }

    pub fn unbind_var(&mut self, index: VarIndex) -> Result<()> {
        self.info_mut(index)?.bound = false;
        Ok(())
    }

    pub fn var_is_bound(&self, index: VarIndex) -> bool {
        self.var_info.get(index as usize).is_some_and(|i| i.bound)
    }

    /// Preferred partner of `index` for lazy sifting.
    pub fn set_pair_index(&mut self, index: VarIndex, pair: VarIndex) -> Result<()> {
        self.info_mut(index)?.pair_index = pair;
        Ok(())
    }

    pub fn read_pair_index(&self, index: VarIndex) -> VarIndex {
        self.var_info[index as usize].pair_index
    }

    pub fn set_var_to_be_grouped(&mut self, index: VarIndex) -> Result<()> {
        let info = self.info_mut(index)?;
        if info.group != LazyGroup::HardGroup {
            info.group = LazyGroup::SoftGroup;
        }
        Ok(())
    }

    pub fn set_var_hard_group(&mut self, index: VarIndex) -> Result<()> {
        self.info_mut(index)?.group = LazyGroup::HardGroup;
        Ok(())
    }

    pub fn set_var_to_be_ungrouped(&mut self, index: VarIndex) -> Result<()> {
        self.info_mut(index)?.group = LazyGroup::Ungroup;
        Ok(())
    }

    pub fn reset_var_to_be_grouped(&mut self, index: VarIndex) -> Result<()> {
        let info = self.info_mut(index)?;
        if info.group != LazyGroup::HardGroup {
            info.group = LazyGroup::None;
        }
        Ok(())
    }

    pub fn set_var_handled(&mut self, index: VarIndex) -> Result<()> {
        self.info_mut(index)?.handled = true;
        Ok(())
    }

    pub fn var_is_handled(&self, index: VarIndex) -> bool {
        self.var_info.get(index as usize).is_some_and(|i| i.handled)
    }
}

impl Debug for Manager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("vars", &self.perm.len())
            .field("keys", &self.keys)
            .field("dead", &self.dead)
            .field("slots", &self.nodes.len())
            .field("reorderings", &self.reorderings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_init() {
        let m = Manager::init(3, 2, 64, 1024, 0);
        assert_eq!(m.read_size(), 3);
        assert_eq!(m.read_size_zdd(), 2);
        // Four permanent constants and three projections.
        assert_eq!(m.read_keys(), 7);
        assert_eq!(m.read_dead(), 0);
        assert_eq!(m.order(), vec![0, 1, 2]);
    }

    #[test]
    fn test_constants() {
        let mut m = Manager::new(0);
        assert_eq!(m.zero(), -m.one());
        assert_ne!(m.add_zero(), m.zero());
        assert_eq!(m.value(m.one()), Some(1.0));
        assert_eq!(m.value(m.plus_infinity()), Some(f64::INFINITY));
        let c = m.add_const(2.5).unwrap();
        assert_eq!(m.add_const(2.5).unwrap(), c);
        assert_eq!(m.add_const(1e-20).unwrap(), m.add_zero());
    }

    #[test]
    fn test_ith_var_extends() {
        let mut m = Manager::new(1);
        let x3 = m.ith_var(3).unwrap();
        assert_eq!(m.read_size(), 4);
        assert_eq!(m.node_index(x3), 3);
        assert_eq!(m.cofactors(x3), (m.one(), m.zero()));
        assert_eq!(m.cofactors(-x3), (m.zero(), m.one()));
    }

    #[test]
    fn test_new_var_at_level() {
        let mut m = Manager::new(2);
        let v = m.new_var_at_level(0);
        assert_eq!(m.node_index(v), 2);
        assert_eq!(m.order(), vec![2, 0, 1]);
        assert_eq!(m.read_perm(0), 1);
        assert_eq!(m.level(v), 0);
        assert!(m.debug_check().is_ok());
    }

    #[test]
    fn test_add_ith_var() {
        let mut m = Manager::new(1);
        let a = m.add_ith_var(0).unwrap();
        assert_eq!(m.then_child(a), Some(m.one()));
        assert_eq!(m.else_child(a), Some(m.add_zero()));
    }

    #[test]
    fn test_binding_and_lazy_flags() {
        let mut m = Manager::new(2);
        m.bind_var(1).unwrap();
        assert!(m.var_is_bound(1));
        m.unbind_var(1).unwrap();
        assert!(!m.var_is_bound(1));
        assert!(m.bind_var(5).is_err());
        assert!(matches!(m.read_error_code(), Some(DdError::InvalidArgument(_))));
        m.clear_error_code();
        assert!(m.read_error_code().is_none());

        m.set_var_hard_group(0).unwrap();
        m.reset_var_to_be_grouped(0).unwrap();
        assert_eq!(m.var_info[0].group, LazyGroup::HardGroup);
        m.set_pair_index(0, 1).unwrap();
        assert_eq!(m.read_pair_index(0), 1);
    }

    #[test]
    fn test_autodyn_status() {
        let mut m = Manager::new(2);
        assert!(!m.reordering_status().0);
        m.autodyn_enable(ReorderMethod::GroupSift);
        assert_eq!(m.reordering_status(), (true, ReorderMethod::GroupSift));
        m.autodyn_enable(ReorderMethod::Same);
        assert_eq!(m.reordering_status(), (true, ReorderMethod::GroupSift));
        m.autodyn_disable();
        assert!(!m.reordering_status().0);
    }
}
