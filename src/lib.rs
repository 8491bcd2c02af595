//! # spn-map: MAP inference for sum-product networks
//!
//! **`spn-map`** finds most probable assignments (MAP/MPE) of the variables
//! of a **sum-product network** (SPN), optionally under evidence.
//!
//! ## What is an SPN?
//!
//! A sum-product network is a rooted DAG whose leaves are indicators
//! `[X_var = state]`, whose inner nodes are weighted sums and products, and
//! whose root computes an (unnormalized) joint probability. Products are
//! *decomposable* (children over disjoint variables) and sums are *smooth*
//! (children over the same variables), so marginals come out of one linear
//! pass. MAP does not: finding `argmax_x P(x)` is NP-hard, which is why the
//! crate offers a whole ladder of estimators.
//!
//! ## Key Features
//!
//! - **Arena representation**: nodes live in a `Vec` in topological order and
//!   refer to children by [`NodeId`][crate::types::NodeId]. All values are
//!   log-space.
//! - **Arithmetic circuits**: [`Ac`][crate::ac::Ac] models are compiled into
//!   networks with [`Spn::from_ac`][crate::spn::Spn::from_ac].
//! - **Derivatives**: one backward pass scores every single-variable change
//!   of an assignment at once ([`derivative`]).
//! - **Estimators**: best tree, marginal descent, naive Bayes,
//!   argmax-product ([`greedy`]), sampling ([`sampling`]), beam search
//!   ([`beam`]) and k-best trees ([`kbest`]).
//! - **Exact search**: branch-and-bound with forward checking, variable
//!   ordering and network restructuring ([`exact`]).
//! - **Cooperative deadlines**: long searches poll a
//!   [`Deadline`][crate::deadline::Deadline] and return their best answer so
//!   far.
//!
//! ## Basic Usage
//!
//! ```rust
//! use spn_map::method::{MapConfig, Method};
//! use spn_map::query::Query;
//! use spn_map::random::RandomSpn;
//!
//! // 1. Get a network (usually `Spn::load` or `Spn::from_ac(&Ac::load(..)?)`)
//! let spn = RandomSpn::new(8).seed(1).build();
//!
//! // 2. Condition on evidence: x0 = 1, x1 summed out, the rest free
//! let query: Query = "1*??????".parse().unwrap();
//! let cond = spn.condition(query.evidence()).unwrap();
//!
//! // 3. Solve: the greedy best tree, then the exact optimum
//! let config = MapConfig::default();
//! let tree = cond.spn.solve(Method::BestTree, &config);
//! let exact = cond.spn.solve("FC".parse().unwrap(), &config);
//! assert!(tree.score <= exact.score + 1e-9);
//! ```
//!
//! ## Core Components
//!
//! - **[`spn`]**: The [`Spn`][crate::spn::Spn] itself, validation and evaluation.
//! - **[`query`]**: Evidence parsing and conditioning.
//! - **[`method`]**: Named methods, [`MapConfig`][crate::method::MapConfig] and batch solving.
//! - **[`io`]**: `.ac` and `.spn` model files.

pub mod ac;
pub mod assignment;
pub mod beam;
pub mod bitset;
pub mod candidate;
pub mod deadline;
pub mod derivative;
pub mod dot;
pub mod error;
pub mod exact;
pub mod greedy;
pub mod io;
pub mod kbest;
pub mod method;
pub mod query;
pub mod random;
pub mod sampling;
pub mod spn;
pub mod stats;
pub mod types;
pub mod utils;

#[cfg(test)]
mod fixtures;
