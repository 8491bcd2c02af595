//! Arithmetic circuits.
//!
//! An [`Ac`] is a DAG of indicator, constant, product and (unweighted) sum
//! nodes computing a network polynomial. It is the interchange format: every
//! inference routine runs on the [`Spn`][crate::spn::Spn] compiled from it
//! by [`Spn::from_ac`][crate::spn::Spn::from_ac].

use crate::assignment::Assignment;
use crate::bitset::BitSet;
use crate::error::CircuitError;
use crate::types::{NodeId, Schema};
use crate::utils::log_sum_exp;

/// A node of an arithmetic circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum AcNode {
    /// The indicator `1[X_var = state]`.
    Indicator { var: usize, state: usize },
    /// A non-negative constant.
    Constant(f64),
    Product(Vec<NodeId>),
    Sum(Vec<NodeId>),
}

impl AcNode {
    pub fn children(&self) -> &[NodeId] {
        match self {
            AcNode::Product(cs) | AcNode::Sum(cs) => cs,
            _ => &[],
        }
    }
}

/// A validated arithmetic circuit: nodes in topological order, the last one
/// being the output.
#[derive(Debug, Clone, PartialEq)]
pub struct Ac {
    nodes: Vec<AcNode>,
    schema: Schema,
}

impl Ac {
    /// Builds a circuit, checking topological order, schema ranges,
    /// decomposability of products and smoothness of sums.
    pub fn new(nodes: Vec<AcNode>, schema: Schema) -> Result<Self, CircuitError> {
        validate(&nodes, &schema)?;
        Ok(Self { nodes, schema })
    }

    /// Builds a circuit from nodes that are valid by construction.
    pub(crate) fn new_unchecked(nodes: Vec<AcNode>, schema: Schema) -> Self {
        debug_assert!(validate(&nodes, &schema).is_ok(), "invalid circuit: {:?}", validate(&nodes, &schema));
        Self { nodes, schema }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a validated circuit has at least one node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[AcNode] {
        &self.nodes
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(self.nodes.len() - 1)
    }

    /// Log-values of all nodes under a soft assignment.
    pub fn eval(&self, ass: &Assignment) -> Vec<f64> {
        let mut val: Vec<f64> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let v = match node {
                AcNode::Indicator { var, state } => ass.weight(*var, *state).ln(),
                AcNode::Constant(c) => c.ln(),
                AcNode::Product(cs) => cs.iter().map(|c| val[c.index()]).sum(),
                AcNode::Sum(cs) => log_sum_exp(cs.iter().map(|c| val[c.index()])),
            };
            val.push(v);
        }
        val
    }

    /// Log-probability of a full assignment.
    pub fn eval_x(&self, x: &[usize]) -> f64 {
        let val = self.eval(&Assignment::from_states(&self.schema, x));
        val[val.len() - 1]
    }
}

fn validate(nodes: &[AcNode], schema: &Schema) -> Result<(), CircuitError> {
    if nodes.is_empty() {
        return Err(CircuitError::Empty);
    }
    if let Some(var) = schema.iter().position(|&s| s == 0) {
        return Err(CircuitError::ZeroStates { var });
    }

    let mut scopes: Vec<BitSet> = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let id = NodeId::new(i);
        for &child in node.children() {
            if child.index() >= i {
                return Err(CircuitError::ForwardReference { node: id, child });
            }
        }
        let scope = match node {
            &AcNode::Indicator { var, state } => {
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
            &AcNode::Constant(value) => {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(CircuitError::InvalidConstant { node: id, value });
                }
                BitSet::empty()
            }
            AcNode::Product(cs) => {
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
            AcNode::Sum(cs) => {
                let Some(first) = cs.first() else {
                    return Err(CircuitError::NoChildren { node: id, kind: "sum" });
                };
                let scope = scopes[first.index()].clone();
                for &c in &cs[1..] {
                    if scopes[c.index()] != scope {
                        return Err(CircuitError::NotSmooth { node: id, child: c });
                    }
                }
                if scope.is_empty() {
                    return Err(CircuitError::ScopeFreeSum { node: id });
                }
                scope
            }
        };
        scopes.push(scope);
    }

    if scopes.last().is_some_and(|s| s.is_empty()) {
        return Err(CircuitError::ScopeFree);
    }
    Ok(())
}
