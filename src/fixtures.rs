//! Small hand-built networks shared by unit tests.

use crate::candidate::Candidate;
use crate::spn::{Node, Spn, SumEdge};
use crate::types::{NodeId, Schema};

fn id(i: usize) -> NodeId {
    NodeId::new(i)
}

/// `0.6 * [x0=0] * (0.2/0.8 over x1) + 0.4 * [x0=1] * (0.9/0.1 over x1)`.
///
/// MAP is `(0, 1)` with probability 0.48.
pub fn two_vars() -> Spn {
    let nodes = vec![
        Node::Terminal { var: 0, state: 0 },
        Node::Terminal { var: 0, state: 1 },
        Node::Terminal { var: 1, state: 0 },
        Node::Terminal { var: 1, state: 1 },
        Node::Sum(vec![SumEdge::new(0.2f64.ln(), id(2)), SumEdge::new(0.8f64.ln(), id(3))]),
        Node::Sum(vec![SumEdge::new(0.9f64.ln(), id(2)), SumEdge::new(0.1f64.ln(), id(3))]),
        Node::Product(vec![id(0), id(4)]),
        Node::Product(vec![id(1), id(5)]),
        Node::Sum(vec![SumEdge::new(0.6f64.ln(), id(6)), SumEdge::new(0.4f64.ln(), id(7))]),
    ];
    Spn::new(nodes, Schema::binary(2)).unwrap()
}

/// A mixture where the best induced tree is not the MAP assignment.
///
/// Three components over two binary variables:
/// `0.4 * [x=(0,0)] + 0.35 * [x=(1,1)] + 0.25 * [x=(1,1)]`,
/// so the best tree selects `(0,0)` (0.4) while MAP is `(1,1)` (0.6).
pub fn split_mass() -> Spn {
    let nodes = vec![
        Node::Terminal { var: 0, state: 0 },
        Node::Terminal { var: 0, state: 1 },
        Node::Terminal { var: 1, state: 0 },
        Node::Terminal { var: 1, state: 1 },
        Node::Product(vec![id(0), id(2)]),
        Node::Product(vec![id(1), id(3)]),
        Node::Product(vec![id(1), id(3)]),
        Node::Sum(vec![
            SumEdge::new(0.4f64.ln(), id(4)),
            SumEdge::new(0.35f64.ln(), id(5)),
            SumEdge::new(0.25f64.ln(), id(6)),
        ]),
    ];
    Spn::new(nodes, Schema::binary(2)).unwrap()
}

/// One ternary and one binary variable, fully factorized:
/// `P(x0) = (0.2, 0.5, 0.3)`, `P(x1) = (0.7, 0.3)`.
pub fn ternary() -> Spn {
    let nodes = vec![
        Node::Terminal { var: 0, state: 0 },
        Node::Terminal { var: 0, state: 1 },
        Node::Terminal { var: 0, state: 2 },
        Node::Terminal { var: 1, state: 0 },
        Node::Terminal { var: 1, state: 1 },
        Node::Sum(vec![
            SumEdge::new(0.2f64.ln(), id(0)),
            SumEdge::new(0.5f64.ln(), id(1)),
            SumEdge::new(0.3f64.ln(), id(2)),
        ]),
        Node::Sum(vec![SumEdge::new(0.7f64.ln(), id(3)), SumEdge::new(0.3f64.ln(), id(4))]),
        Node::Product(vec![id(5), id(6)]),
        Node::Sum(vec![SumEdge::new(0.0, id(7))]),
    ];
    Spn::new(nodes, Schema::new(vec![3, 2])).unwrap()
}

/// Enumerates every full assignment and returns the best one.
///
/// Ties keep the first assignment in [`all_assignments`] order.
pub fn brute_force(spn: &Spn) -> Candidate {
    let mut best = Candidate::worst();
    for x in all_assignments(spn.schema()) {
        let score = spn.eval_x(&x);
        if best.assignment.is_empty() || score > best.score {
            best = Candidate::new(x, score);
        }
    }
    best
}

/// All full assignments of a schema, in odometer order (variable 0 fastest).
pub fn all_assignments(schema: &Schema) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut x = vec![0; schema.len()];
    loop {
        out.push(x.clone());
        let mut var = 0;
        loop {
            if var == x.len() {
                return out;
            }
            x[var] += 1;
            if x[var] < schema.states(var) {
                break;
            }
            x[var] = 0;
            var += 1;
        }
    }
}
