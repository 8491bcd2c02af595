//! Random sum-product networks.
//!
//! [`RandomSpn`] grows a valid network top-down over a random recursive
//! partition of the variables:
//!
//! - a single variable gets `fan_in` distributions, each a sum over all its
//!   terminals;
//! - a larger scope is cut into two random non-empty halves, and gets
//!   `fan_in` mixtures, each over `fan_in` products pairing a random
//!   distribution of the left half with a random distribution of the right
//!   half.
//!
//! Terminals and distributions are shared between parents, so the result is
//! a DAG. All sum weights are normalized, so the partition function is 1.
//! The generator is deterministic in its seed.

use log::debug;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::spn::{Node, Spn, SumEdge};
use crate::types::{NodeId, Schema};

/// Builder for random networks.
///
/// ```
/// use spn_map::random::RandomSpn;
///
/// let spn = RandomSpn::new(6).states(3).fan_in(2).seed(42).build();
/// assert_eq!(spn.num_vars(), 6);
/// assert!(spn.partition()[spn.root().index()].abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomSpn {
    schema: Schema,
    fan_in: usize,
    seed: u64,
}

impl RandomSpn {
    /// A network over `vars` binary variables, fan-in 2, seed 0.
    pub fn new(vars: usize) -> Self {
        Self {
            schema: Schema::binary(vars),
            fan_in: 2,
            seed: 0,
        }
    }

    /// Gives every variable `states` states.
    pub fn states(mut self, states: usize) -> Self {
        self.schema = Schema::new(vec![states; self.schema.len()]);
        self
    }

    /// Uses the given per-variable state counts.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Number of alternatives per scope and of products per mixture.
    pub fn fan_in(mut self, fan_in: usize) -> Self {
        self.fan_in = fan_in.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Generates the network.
    ///
    /// # Panics
    ///
    /// Panics if the schema is empty or some variable has zero states.
    pub fn build(&self) -> Spn {
        assert!(!self.schema.is_empty(), "a random network needs at least one variable");
        assert!(self.schema.iter().all(|&s| s > 0), "every variable needs at least one state");

        let mut g = Grower {
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            fan_in: self.fan_in,
            nodes: Vec::new(),
            terminals: Vec::with_capacity(self.schema.len()),
        };
        for (var, &states) in self.schema.iter().enumerate() {
            let ts = (0..states).map(|state| g.push(Node::Terminal { var, state })).collect();
            g.terminals.push(ts);
        }

        let mut vars: Vec<usize> = (0..self.schema.len()).collect();
        let top = g.region(&mut vars);
        g.mixture(top);

        debug!(
            "random network: {} nodes over {} variables (seed {})",
            g.nodes.len(),
            self.schema.len(),
            self.seed
        );
        Spn::new_unchecked(g.nodes, self.schema.clone())
    }
}

struct Grower {
    rng: ChaCha8Rng,
    fan_in: usize,
    nodes: Vec<Node>,
    /// Terminal ids, by variable and state.
    terminals: Vec<Vec<NodeId>>,
}

impl Grower {
    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId::new(self.nodes.len() - 1)
    }

    /// A sum over `children` with random normalized weights.
    fn mixture(&mut self, children: Vec<NodeId>) -> NodeId {
        let raw: Vec<f64> = children.iter().map(|_| self.rng.random::<f64>() + 0.01).collect();
        let total: f64 = raw.iter().sum();
        let edges = children
            .into_iter()
            .zip(raw)
            .map(|(c, w)| SumEdge::new((w / total).ln(), c))
            .collect();
        self.push(Node::Sum(edges))
    }

    /// `fan_in` alternative distributions over the scope `vars`.
    fn region(&mut self, vars: &mut [usize]) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.fan_in);
        if let [var] = *vars {
            let ts = self.terminals[var].clone();
            for _ in 0..self.fan_in {
                out.push(self.mixture(ts.clone()));
            }
            return out;
        }

        vars.shuffle(&mut self.rng);
        let cut = self.rng.random_range(1..vars.len());
        let (l, r) = vars.split_at_mut(cut);
        let left = self.region(l);
        let right = self.region(r);

        for _ in 0..self.fan_in {
            let mut products = Vec::with_capacity(self.fan_in);
            for _ in 0..self.fan_in {
                let a = left[self.rng.random_range(0..left.len())];
                let b = right[self.rng.random_range(0..right.len())];
                products.push(self.push(Node::Product(vec![a, b])));
            }
            out.push(self.mixture(products));
        }
        out
    }
}
