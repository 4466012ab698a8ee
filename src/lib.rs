//! # dd-rs: Decision Diagrams with Dynamic Reordering
//!
//! **`dd-rs`** is a manager-centric library for **Binary Decision Diagrams (BDDs)** with complement edges
//! and **Algebraic Decision Diagrams (ADDs)** with real-valued leaves, sharing one node arena.
//! It is designed for formal verification, static analysis, and symbolic computation over large variable sets.
//!
//! ## What is a Decision Diagram?
//!
//! A BDD represents a boolean function as a directed acyclic graph.
//! It is **canonical** --- for a fixed variable order, every function has exactly one representation,
//! so equivalence is a pointer comparison. An ADD generalizes the leaves from `{0, 1}` to arbitrary numbers.
//!
//! The size of a diagram depends heavily on the variable order, which is why the manager can
//! **reorder variables in place** while every handle keeps denoting the same function (see [`reorder`]).
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All operations go through the [`Manager`][crate::manager::Manager], which owns the nodes, the per-level unique tables, the operation cache, and the variable order.
//! - **Explicit Reference Counting**: Results are returned unreferenced; callers [`ref_node`][crate::manager::Manager::ref_node] what they keep and [`recursive_deref`][crate::manager::Manager::recursive_deref] it when done. Dead nodes are reclaimed by garbage collection.
//! - **Dynamic Reordering**: Sifting, symmetric sifting, group sifting and lazy sifting, constrained by a tree of variable groups (see [`mtr`]). Reordering can run on demand or automatically as the diagram grows.
//! - **Rich API**: boolean operators, quantification, composition, generalized cofactors, ADD arithmetic, BDD/ADD conversions, equation solving, and decompositions.
//!
//! ## Basic Usage
//!
//! ```rust
//! use dd_rs::manager::Manager;
//!
//! // 1. Initialize the manager with two variables
//! let mut m = Manager::new(2);
//!
//! // 2. Get the projection functions (0-indexed)
//! let x0 = m.ith_var(0).unwrap();
//! let x1 = m.ith_var(1).unwrap();
//!
//! // 3. Build f = ite(x0, x1, ¬x1), i.e. XOR
//! let f = m.ite(x0, x1, -x1).unwrap();
//! m.ref_node(f);
//!
//! // 4. Canonicity: the same function is the same handle
//! let g = m.xor(x0, x1).unwrap();
//! assert_eq!(f, g);
//!
//! // 5. Evaluate (x0=true, x1=false) -> true
//! assert!(m.eval(f, &[true, false]));
//!
//! // 6. Release
//! m.recursive_deref(f);
//! assert_eq!(m.check_zero_ref(), 0);
//! ```
//!
//! ## Core Components
//!
//! - **[`manager`]**: The [`Manager`][crate::manager::Manager] and its configuration accessors.
//! - **[`bdd`]**: Boolean operations; the module documentation explains the recursive scheme all operations share.
//! - **[`add`]** and **[`bridge`]**: ADD operations and BDD/ADD conversions.
//! - **[`reorder`]**: Dynamic variable reordering.
//! - **[`check`]** and **[`debug`]**: Consistency audits and inspection helpers.

pub mod add;
pub mod bdd;
pub mod bridge;
pub mod cache;
pub mod check;
pub mod config;
pub mod constants;
pub mod debug;
pub mod decomp;
pub mod error;
pub mod gencof;
pub mod level_queue;
pub mod literal;
pub mod manager;
pub mod mtr;
pub mod node;
pub mod reference;
pub mod reorder;
pub mod sat;
pub mod solve;
pub mod subtable;
pub mod types;
pub mod unique;
pub mod utils;

#[cfg(test)]
mod testing;
