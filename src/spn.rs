//! Sum-product networks.
//!
//! An [`Spn`] is the canonical representation every inference routine works
//! on. Nodes live in one arena in topological order (children before
//! parents) and the last node is the root, which is always a sum node.
//!
//! All values are log-space: a terminal evaluates to the log of its
//! indicator weight, a sum to the log-sum-exp of its weighted children, and
//! a product to the sum of its children.
//!
//! Algorithm families are implemented in separate modules as further
//! `impl Spn` blocks: [`derivative`][crate::derivative],
//! [`greedy`][crate::greedy], [`sampling`][crate::sampling],
//! [`beam`][crate::beam], [`kbest`][crate::kbest], [`exact`][crate::exact],
//! [`query`][crate::query], [`io`][crate::io] and [`dot`][crate::dot].

use log::debug;

use crate::ac::{Ac, AcNode};
use crate::assignment::Assignment;
use crate::bitset::BitSet;
use crate::error::CircuitError;
use crate::types::{NodeId, Schema};
use crate::utils::log_sum_exp;

/// A weighted edge of a sum node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SumEdge {
    /// Log-weight.
    pub weight: f64,
    pub child: NodeId,
}

impl SumEdge {
    pub fn new(weight: f64, child: NodeId) -> Self {
        Self { weight, child }
    }
}

/// A node of a sum-product network.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The indicator `1[X_var = state]`.
    Terminal { var: usize, state: usize },
    Sum(Vec<SumEdge>),
    Product(Vec<NodeId>),
}

impl Node {
    /// Iterates over child ids, in edge order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        let (edges, prods): (&[SumEdge], &[NodeId]) = match self {
            Node::Terminal { .. } => (&[], &[]),
            Node::Sum(es) => (es, &[]),
            Node::Product(cs) => (&[], cs),
        };
        edges.iter().map(|e| e.child).chain(prods.iter().copied())
    }

    pub fn is_sum(&self) -> bool {
        matches!(self, Node::Sum(_))
    }
}

/// A validated sum-product network.
#[derive(Debug, Clone, PartialEq)]
pub struct Spn {
    nodes: Vec<Node>,
    schema: Schema,
}

impl Spn {
    /// Builds a network, checking topological order, schema ranges, edge
    /// weights, decomposability of products and smoothness of sums.
    ///
    /// If the last node is not a sum, a single-edge sum with weight 0 is
    /// appended as the new root.
    pub fn new(nodes: Vec<Node>, schema: Schema) -> Result<Self, CircuitError> {
        validate(&nodes, &schema)?;
        Ok(Self::new_unchecked(nodes, schema))
    }

    /// Builds a network from nodes that are valid by construction.
    pub(crate) fn new_unchecked(mut nodes: Vec<Node>, schema: Schema) -> Self {
        debug_assert!(validate(&nodes, &schema).is_ok(), "invalid network: {:?}", validate(&nodes, &schema));
        if !nodes.last().is_some_and(Node::is_sum) {
            let root = NodeId::new(nodes.len() - 1);
            nodes.push(Node::Sum(vec![SumEdge::new(0.0, root)]));
        }
        Self { nodes, schema }
    }

    /// Compiles an arithmetic circuit into an equivalent network.
    ///
    /// Constants never become nodes: they are folded into the log-weights of
    /// sum edges. A product absorbs the weight accumulated under its non-sum
    /// children and keeps only the children that depend on some variable. A
    /// sum edge carries the weight accumulated under its child. Edges of
    /// weight `-inf` are dropped unless that would leave the sum empty.
    pub fn from_ac(ac: &Ac) -> Self {
        let acn = ac.nodes();
        let n = acn.len();
        // New id of every AC node that survives as a network node.
        let mut ids: Vec<Option<NodeId>> = vec![None; n];
        let mut weight = vec![0.0; n];
        let mut nodes: Vec<Node> = Vec::with_capacity(n + 1);

        for (i, node) in acn.iter().enumerate() {
            let new = match node {
                &AcNode::Indicator { var, state } => Some(Node::Terminal { var, state }),
                &AcNode::Constant(c) => {
                    weight[i] = c.ln();
                    None
                }
                AcNode::Product(cs) => {
                    let mut w = 0.0;
                    let mut children = Vec::with_capacity(cs.len());
                    for c in cs {
                        if let Some(id) = ids[c.index()] {
                            children.push(id);
                        }
                        if !matches!(acn[c.index()], AcNode::Sum(_)) {
                            w += weight[c.index()];
                        }
                    }
                    weight[i] = w;
                    (!children.is_empty()).then_some(Node::Product(children))
                }
                AcNode::Sum(cs) => {
                    let all: Vec<SumEdge> = cs
                        .iter()
                        .filter_map(|c| ids[c.index()].map(|id| SumEdge::new(weight[c.index()], id)))
                        .collect();
                    let finite: Vec<SumEdge> = all.iter().copied().filter(|e| e.weight > f64::NEG_INFINITY).collect();
                    Some(Node::Sum(if finite.is_empty() { all } else { finite }))
                }
            };
            if let Some(node) = new {
                ids[i] = Some(NodeId::new(nodes.len()));
                nodes.push(node);
            }
        }

        // A circuit whose root is not a sum gets a synthetic sum root that
        // carries the root's accumulated weight.
        let root = n - 1;
        if !matches!(acn[root], AcNode::Sum(_)) {
            if let Some(id) = ids[root] {
                nodes.push(Node::Sum(vec![SumEdge::new(weight[root], id)]));
            }
        }

        debug!(
            "compiled AC with {} nodes into SPN with {} nodes over {} variables",
            n,
            nodes.len(),
            ac.schema().len()
        );
        Self::new_unchecked(nodes, ac.schema().clone())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a network has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.schema.len()
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(self.nodes.len() - 1)
    }

    /// Forward pass over nodes `0..upto`, with terminal values given by `leaf`.
    fn forward(&self, upto: usize, leaf: impl Fn(usize, usize) -> f64) -> Vec<f64> {
        let mut val: Vec<f64> = Vec::with_capacity(upto);
        for node in &self.nodes[..upto] {
            let v = match node {
                &Node::Terminal { var, state } => leaf(var, state),
                Node::Sum(es) => log_sum_exp(es.iter().map(|e| e.weight + val[e.child.index()])),
                Node::Product(cs) => cs.iter().map(|c| val[c.index()]).sum(),
            };
            val.push(v);
        }
        val
    }

    /// Log-values of all nodes under a soft assignment.
    pub fn eval(&self, ass: &Assignment) -> Vec<f64> {
        self.forward(self.nodes.len(), |var, state| ass.weight(var, state).ln())
    }

    /// Log-probability of a full assignment.
    pub fn eval_x(&self, x: &[usize]) -> f64 {
        let val = self.forward(self.nodes.len(), |var, state| {
            if x[var] == state {
                0.0
            } else {
                f64::NEG_INFINITY
            }
        });
        val[val.len() - 1]
    }

    /// Value of node `at` under a soft assignment, evaluating only the nodes
    /// up to it.
    pub fn eval_prefix(&self, ass: &Assignment, at: NodeId) -> f64 {
        let val = self.forward(at.index() + 1, |var, state| ass.weight(var, state).ln());
        val[at.index()]
    }

    /// Log-values of all nodes with every variable summed out.
    ///
    /// The root value is the log of the normalizing constant.
    pub fn partition(&self) -> Vec<f64> {
        self.forward(self.nodes.len(), |_, _| 0.0)
    }

    /// Max-product value of the root: sums take their best weighted child.
    ///
    /// This is the score of the best induced tree and an upper bound on the
    /// score of any full assignment's best tree.
    pub fn max_value(&self) -> f64 {
        let mut val: Vec<f64> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let v = match node {
                Node::Terminal { .. } => 0.0,
                Node::Sum(es) => es
                    .iter()
                    .map(|e| e.weight + val[e.child.index()])
                    .fold(f64::NEG_INFINITY, f64::max),
                Node::Product(cs) => cs.iter().map(|c| val[c.index()]).sum(),
            };
            val.push(v);
        }
        val[val.len() - 1]
    }

    /// Scope of every node.
    pub fn scopes(&self) -> Vec<BitSet> {
        let mut scopes: Vec<BitSet> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let scope = match node {
                &Node::Terminal { var, .. } => BitSet::singleton(var),
                _ => {
                    let mut s = BitSet::empty();
                    for c in node.children() {
                        s.union_with(&scopes[c.index()]);
                    }
                    s
                }
            };
            scopes.push(scope);
        }
        scopes
    }
}

fn validate(nodes: &[Node], schema: &Schema) -> Result<(), CircuitError> {
    if nodes.is_empty() {
        return Err(CircuitError::Empty);
    }
    if let Some(var) = schema.iter().position(|&s| s == 0) {
        return Err(CircuitError::ZeroStates { var });
    }

    let mut scopes: Vec<BitSet> = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let id = NodeId::new(i);
        for child in node.children() {
            if child.index() >= i {
                return Err(CircuitError::ForwardReference { node: id, child });
            }
        }
        let scope = match node {
            &Node::Terminal { var, state } => {
                if var >= schema.len() {
                    return Err(CircuitError::VariableOutOfRange {
                        node: id,
                        var,
                        vars: schema.len(),
                    });
                }
                if state >= schema.states(var) {
                    return Err(CircuitError::StateOutOfRange {
                        node: id,
                        var,
                        state,
                        states: schema.states(var),
                    });
                }
                BitSet::singleton(var)
            }
            Node::Sum(es) => {
                let Some(first) = es.first() else {
                    return Err(CircuitError::NoChildren { node: id, kind: "sum" });
                };
                if let Some(e) = es.iter().find(|e| e.weight.is_nan() || e.weight == f64::INFINITY) {
                    return Err(CircuitError::InvalidWeight { node: id, weight: e.weight });
                }
                let scope = scopes[first.child.index()].clone();
                for e in &es[1..] {
                    if scopes[e.child.index()] != scope {
                        return Err(CircuitError::NotSmooth { node: id, child: e.child });
                    }
                }
                scope
            }
            Node::Product(cs) => {
                if cs.is_empty() {
                    return Err(CircuitError::NoChildren { node: id, kind: "product" });
                }
                let mut scope = BitSet::empty();
                for c in cs {
                    if let Some(var) = scope.first_common(&scopes[c.index()]) {
                        return Err(CircuitError::NotDecomposable { node: id, var });
                    }
                    scope.union_with(&scopes[c.index()]);
                }
                scope
            }
        };
        scopes.push(scope);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::two_vars;

    fn id(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_eval_x() {
        let spn = two_vars();
        assert!(close(spn.eval_x(&[0, 0]), (0.6f64 * 0.2).ln()));
        assert!(close(spn.eval_x(&[0, 1]), (0.6f64 * 0.8).ln()));
        assert!(close(spn.eval_x(&[1, 0]), (0.4f64 * 0.9).ln()));
        assert!(close(spn.eval_x(&[1, 1]), (0.4f64 * 0.1).ln()));
    }

    #[test]
    fn test_partition_and_soft_evidence() {
        let spn = two_vars();
        assert!(close(spn.partition()[spn.root().index()], 0.0));

        let ass = Assignment::from_signed(spn.schema(), &[-1, 0]);
        let val = spn.eval(&ass);
        assert!(close(val[spn.root().index()], (0.12f64 + 0.36).ln()));
        assert!(close(spn.eval_prefix(&ass, id(4)), 0.2f64.ln()));
    }

    #[test]
    fn test_max_value() {
        let spn = two_vars();
        assert!(close(spn.max_value(), 0.48f64.ln()));
    }

    #[test]
    fn test_synthetic_root() {
        let nodes = vec![
            Node::Terminal { var: 0, state: 1 },
            Node::Terminal { var: 1, state: 0 },
            Node::Product(vec![id(0), id(1)]),
        ];
        let spn = Spn::new(nodes, Schema::binary(2)).unwrap();
        assert_eq!(spn.len(), 4);
        assert_eq!(spn.node(spn.root()), &Node::Sum(vec![SumEdge::new(0.0, id(2))]));
        assert!(close(spn.eval_x(&[1, 0]), 0.0));
        assert_eq!(spn.eval_x(&[0, 0]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_invalid_weight() {
        let nodes = vec![
            Node::Terminal { var: 0, state: 0 },
            Node::Sum(vec![SumEdge::new(f64::NAN, id(0))]),
        ];
        assert!(matches!(
            Spn::new(nodes, Schema::binary(1)),
            Err(CircuitError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_not_smooth() {
        let nodes = vec![
            Node::Terminal { var: 0, state: 0 },
            Node::Terminal { var: 1, state: 0 },
            Node::Sum(vec![SumEdge::new(0.0, id(0)), SumEdge::new(0.0, id(1))]),
        ];
        assert_eq!(
            Spn::new(nodes, Schema::binary(2)),
            Err(CircuitError::NotSmooth { node: id(2), child: id(1) })
        );
    }

    #[test]
    fn test_from_ac() {
        use crate::ac::AcNode::*;
        // (0.5 * [x0=0] * (0.2*[x1=0] + 0.8*[x1=1])) + (0.5 * [x0=1] * [x1=1])
        let ac_nodes = vec![
            Indicator { var: 0, state: 0 }, // 0
            Indicator { var: 0, state: 1 }, // 1
            Indicator { var: 1, state: 0 }, // 2
            Indicator { var: 1, state: 1 }, // 3
            Constant(0.2),                  // 4
            Constant(0.8),                  // 5
            Product(vec![id(4), id(2)]),    // 6
            Product(vec![id(5), id(3)]),    // 7
            Sum(vec![id(6), id(7)]),        // 8
            Constant(0.5),                  // 9
            Product(vec![id(9), id(0), id(8)]), // 10
            Product(vec![id(9), id(1), id(3)]), // 11
            Sum(vec![id(10), id(11)]),      // 12
        ];
        let ac = Ac::new(ac_nodes, Schema::binary(2)).unwrap();
        let spn = Spn::from_ac(&ac);
        assert!(spn.node(spn.root()).is_sum());
        assert!(!spn.nodes().iter().any(|n| matches!(n, Node::Product(cs) if cs.is_empty())));
        for x in [[0, 0], [0, 1], [1, 0], [1, 1]] {
            let (a, b) = (ac.eval_x(&x), spn.eval_x(&x));
            assert!(a == b || (a - b).abs() < 1e-9, "{:?}: {} vs {}", x, a, b);
        }
    }

    #[test]
    fn test_from_ac_product_root() {
        use crate::ac::AcNode::*;
        let ac_nodes = vec![Indicator { var: 0, state: 1 }, Constant(0.25), Product(vec![id(0), id(1)])];
        let ac = Ac::new(ac_nodes, Schema::binary(1)).unwrap();
        let spn = Spn::from_ac(&ac);
        assert_eq!(spn.len(), 3);
        assert!(close(spn.eval_x(&[1]), 0.25f64.ln()));
        assert_eq!(spn.eval_x(&[0]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_from_ac_prunes_zero_edges() {
        use crate::ac::AcNode::*;
        let ac_nodes = vec![
            Indicator { var: 0, state: 0 },
            Indicator { var: 0, state: 1 },
            Constant(0.0),
            Constant(1.0),
            Product(vec![id(2), id(0)]),
            Product(vec![id(3), id(1)]),
            Sum(vec![id(4), id(5)]),
        ];
        let ac = Ac::new(ac_nodes, Schema::binary(1)).unwrap();
        let spn = Spn::from_ac(&ac);
        match spn.node(spn.root()) {
            Node::Sum(es) => assert_eq!(es.len(), 1),
            n => panic!("unexpected root {:?}", n),
        }
        assert_eq!(spn.eval_x(&[0]), f64::NEG_INFINITY);
        assert!(close(spn.eval_x(&[1]), 0.0));
    }

    #[test]
    fn test_scopes() {
        let spn = two_vars();
        let scopes = spn.scopes();
        assert_eq!(scopes[4].iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(scopes[spn.root().index()].iter().collect::<Vec<_>>(), vec![0, 1]);
    }
}
