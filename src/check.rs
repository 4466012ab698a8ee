//! Consistency audits of the unique table.
//!
//! These walk every node the manager owns, so they are meant for tests and
//! debugging sessions, not for production loops. Problems are logged with
//! `warn!` and summarized in the returned error.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::error::{DdError, Result};
use crate::manager::Manager;
use crate::node::NodeKind;
use crate::types::{Level, NodeId, MAX_REF};

impl Manager {
    /// Verify the structure of every subtable:
    ///
    /// - nodes sit at the level of their variable and are unique there,
    /// - then-edges are regular and the two children differ,
    /// - children sit strictly below their parent,
    /// - every node has at least as many references as parents that are not dead.
    pub fn debug_check(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut parents: HashMap<NodeId, u32> = HashMap::new();

        for (level, st) in self.subtables.iter().enumerate() {
            let level = level as Level;
            let index = self.invperm[level as usize];
            let mut seen = HashSet::new();
            for id in st.ids(&self.nodes) {
                let node = &self.nodes[id as usize];
                let NodeKind::Internal { high, low } = node.kind else {
                    problems.push(format!("slot {} at level {} is not an internal node", id, level));
                    continue;
                };
                if node.index != index {
                    problems.push(format!("node {} with variable {} found at level {} of {}", id, node.index, level, index));
                }
                if !seen.insert((high, low)) {
                    problems.push(format!("duplicate node ({}, {}) at level {}", high, low, level));
                }
                if high.is_negated() {
                    problems.push(format!("node {} has a complemented then-edge", id));
                }
                if high == low {
                    problems.push(format!("node {} has identical children", id));
                }
                if node.dead && node.ref_count != 0 {
                    problems.push(format!("dead node {} has {} references", id, node.ref_count));
                }
                for child in [high, low] {
                    let child_node = &self.nodes[child.id() as usize];
                    if child_node.is_free() {
                        problems.push(format!("node {} points to free slot {}", id, child.id()));
                    } else if self.level(child) <= level {
                        problems.push(format!("node {} at level {} has child {} above it", id, level, child));
                    }
                    if !node.dead {
                        *parents.entry(child.id()).or_default() += 1;
                    }
                }
            }
        }

        for (&id, &count) in &parents {
            let refs = self.nodes[id as usize].ref_count;
            if refs != MAX_REF && refs < count {
                problems.push(format!("node {} has {} references but {} live parents", id, refs, count));
            }
        }

        if let Err(DdError::Internal(msg)) = self.check_keys() {
            problems.push(msg);
        }
        Self::report("debug check", problems)
    }

    /// Verify the key and dead counters against the tables.
    pub fn check_keys(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut keys = 0;
        let mut dead = 0;

        for (level, st) in self.subtables.iter().enumerate() {
            let ids = st.ids(&self.nodes);
            let level_dead = ids.iter().filter(|&&id| self.nodes[id as usize].dead).count();
            if ids.len() != st.keys {
                problems.push(format!("level {} holds {} nodes but counts {}", level, ids.len(), st.keys));
            }
            if level_dead != st.dead {
                problems.push(format!("level {} holds {} dead nodes but counts {}", level, level_dead, st.dead));
            }
            keys += ids.len();
            dead += level_dead;
        }

        let const_dead = self.constants.ids().filter(|&id| self.nodes[id as usize].dead).count();
        if const_dead != self.constants.dead {
            problems.push(format!("{} dead constants but counts {}", const_dead, self.constants.dead));
        }
        keys += self.constants.keys;
        dead += const_dead;

        if keys != self.keys {
            problems.push(format!("tables hold {} nodes but manager counts {}", keys, self.keys));
        }
        if dead != self.dead {
            problems.push(format!("tables hold {} dead nodes but manager counts {}", dead, self.dead));
        }
        Self::report("key check", problems)
    }

    /// Number of nodes still referenced beyond what the manager itself
    /// holds: the projection functions and the permanent constants.
    ///
    /// After every user reference is released this is zero.
    pub fn check_zero_ref(&self) -> usize {
        let permanent = [self.one, self.add_zero, self.plus_inf, self.minus_inf];
        let projections: HashSet<NodeId> = self.vars.iter().map(|v| v.id()).collect();
        let one_refs = 1 + 2 * self.vars.len() as u32;

        let mut count = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            let id = id as NodeId;
            let expected = if id == self.one.id() {
                one_refs
            } else if permanent.iter().any(|r| r.id() == id) || projections.contains(&id) {
                1
            } else {
                0
            };
            if !node.is_free() && node.ref_count != expected {
                warn!("node {} has {} references, expected {}", id, node.ref_count, expected);
                count += 1;
            }
        }
        count
    }

    fn report(what: &str, problems: Vec<String>) -> Result<()> {
        if problems.is_empty() {
            return Ok(());
        }
        for p in &problems {
            warn!("{}: {}", what, p);
        }
        Err(DdError::Internal(format!("{} found {} problems: {}", what, problems.len(), problems.join("; "))))
    }
}
