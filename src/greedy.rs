//! Greedy MAP estimators.
//!
//! All of them run in one or two linear passes over the network and return a
//! full assignment without any optimality guarantee:
//!
//! - [`Spn::max_max`]: best induced tree (max-product forward, trace back),
//! - [`Spn::sum_max`]: trace back along the largest marginal branch,
//! - [`Spn::naive_bayes`]: per-variable argmax of the single-variable marginal,
//! - [`Spn::argmax_product`]: bottom-up composition of partial assignments.
//!
//! Variables that the trace never reaches default to state 0.

use log::{debug, warn};

use crate::assignment::Assignment;
use crate::candidate::Candidate;
use crate::deadline::Deadline;
use crate::spn::{Node, Spn};
use crate::types::NodeId;

impl Spn {
    /// Follows `choose` from the root down to the terminals.
    ///
    /// `choose` picks the single child of a reached sum node; all children of
    /// a reached product node are followed.
    pub(crate) fn trace(&self, mut choose: impl FnMut(usize) -> NodeId) -> Vec<usize> {
        let mut x = vec![0; self.num_vars()];
        let mut reach = vec![false; self.len()];
        reach[self.root().index()] = true;
        for (i, node) in self.nodes().iter().enumerate().rev() {
            if !reach[i] {
                continue;
            }
            match node {
                &Node::Terminal { var, state } => x[var] = state,
                Node::Sum(_) => reach[choose(i).index()] = true,
                Node::Product(cs) => {
                    for c in cs {
                        reach[c.index()] = true;
                    }
                }
            }
        }
        x
    }

    /// Best induced tree.
    ///
    /// A max-product forward pass selects, at every sum node, the edge with
    /// the highest `weight + value` (the earliest one on ties); the selected
    /// branches are then traced back from the root.
    pub fn max_max(&self) -> Vec<usize> {
        let mut val: Vec<f64> = Vec::with_capacity(self.len());
        let mut branch: Vec<NodeId> = Vec::with_capacity(self.len());
        for (i, node) in self.nodes().iter().enumerate() {
            let (v, b) = match node {
                Node::Terminal { .. } => (0.0, NodeId::new(i)),
                Node::Sum(es) => {
                    let mut best = (f64::NEG_INFINITY, es[0].child);
                    for e in es {
                        let s = e.weight + val[e.child.index()];
                        if s > best.0 {
                            best = (s, e.child);
                        }
                    }
                    best
                }
                Node::Product(cs) => (cs.iter().map(|c| val[c.index()]).sum(), NodeId::new(i)),
            };
            val.push(v);
            branch.push(b);
        }
        self.trace(|i| branch[i])
    }

    /// Greedy descent along the largest marginal branch.
    ///
    /// Like [`max_max`][Self::max_max], but branches are ranked by
    /// `weight + partition value` of the child, i.e. by the true marginal
    /// mass beneath each edge.
    pub fn sum_max(&self) -> Vec<usize> {
        let prt = self.partition();
        self.trace(|i| match self.node(NodeId::new(i)) {
            Node::Sum(es) => {
                let mut best = (f64::NEG_INFINITY, es[0].child);
                for e in es {
                    let s = e.weight + prt[e.child.index()];
                    if s > best.0 {
                        best = (s, e.child);
                    }
                }
                best.1
            }
            _ => unreachable!("trace only asks for sum nodes"),
        })
    }

    /// Per-variable argmax of the marginal `P(X_var = state)`, ignoring
    /// interactions between variables.
    pub fn naive_bayes(&self) -> Vec<usize> {
        let root = self.root();
        (0..self.num_vars())
            .map(|var| {
                let mut best = (f64::NEG_INFINITY, 0);
                for state in 0..self.schema().states(var) {
                    let val = self.eval(&Assignment::restricted(self.schema(), var, state));
                    let p = val[root.index()];
                    if p > best.0 {
                        best = (p, state);
                    }
                }
                best.1
            })
            .collect()
    }

    /// Argmax-product: bottom-up composition of partial assignments.
    ///
    /// Every node caches a partial assignment (`-1` for unset variables):
    /// a terminal sets its own variable, a product unions its children's
    /// assignments, and a sum keeps the child assignment that scores highest
    /// when evaluated *at the sum node itself* (rather than at the child).
    /// Unset variables of the root's assignment default to 0.
    ///
    /// The deadline is polled once per node and once per sum edge. When it
    /// fires, the [cancellation sentinel][Candidate::cancelled] is returned.
    pub fn argmax_product(&self, deadline: &Deadline) -> Candidate {
        let n = self.num_vars();
        let mut cache: Vec<(Vec<i64>, f64)> = Vec::with_capacity(self.len());

        for (i, node) in self.nodes().iter().enumerate() {
            if deadline.is_expired() {
                warn!("argmax-product cancelled at node {} of {}", i, self.len());
                return Candidate::cancelled();
            }
            let at = NodeId::new(i);
            let entry = match node {
                &Node::Terminal { var, state } => {
                    let mut x = vec![-1; n];
                    x[var] = state as i64;
                    (x, 0.0)
                }
                Node::Sum(es) => {
                    let mut best: Option<(usize, f64)> = None;
                    for e in es {
                        if deadline.is_expired() {
                            warn!("argmax-product cancelled at node {} of {}", i, self.len());
                            return Candidate::cancelled();
                        }
                        let x = &cache[e.child.index()].0;
                        let p = self.eval_prefix(&Assignment::from_signed(self.schema(), x), at);
                        if best.map_or(true, |(_, b)| p > b) {
                            best = Some((e.child.index(), p));
                        }
                    }
                    match best {
                        Some((c, p)) => (cache[c].0.clone(), p),
                        None => (vec![-1; n], f64::NEG_INFINITY),
                    }
                }
                Node::Product(cs) => {
                    let mut x = vec![-1; n];
                    for c in cs {
                        for (xi, &v) in x.iter_mut().zip(&cache[c.index()].0) {
                            if v >= 0 {
                                *xi = v;
                            }
                        }
                    }
                    let p = self.eval_prefix(&Assignment::from_signed(self.schema(), &x), at);
                    (x, p)
                }
            };
            cache.push(entry);
        }

        let (x, p) = cache.swap_remove(self.root().index());
        let complete = x.iter().all(|&v| v >= 0);
        let x: Vec<usize> = x.into_iter().map(|v| v.max(0) as usize).collect();
        let score = if complete { p } else { self.eval_x(&x) };
        debug!("argmax-product finished with score {}", score);
        Candidate::new(x, score)
    }
}
