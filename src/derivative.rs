//! Backward (derivative) pass.
//!
//! For every node `i`, [`Spn::derivative`] computes `log |d root / d val(i)|`,
//! the log of the partial derivative of the root value with respect to the
//! node's (linear-space) value. Summed over the terminals of one
//! `(variable, state)` pair it gives the network value with that indicator
//! switched on, which is the bound every pruning decision relies on.
//!
//! Values of exactly zero (`-inf` in log-space) are handled explicitly at
//! product nodes, where a naive `total - child` subtraction would produce
//! `NaN`:
//!
//! - no zero child: each child receives `total - val(child)`;
//! - exactly one zero child: only that child receives the product of the
//!   others, every other child's derivative vanishes;
//! - two or more zero children: every child's derivative vanishes.

use crate::assignment::Assignment;
use crate::spn::{Node, Spn};
use crate::utils::log_add;

impl Spn {
    /// Per-node log-derivatives of the root under a soft assignment.
    pub fn derivative(&self, ass: &Assignment) -> Vec<f64> {
        let val = self.eval(ass);
        self.backward(&val)
    }

    /// Backward pass given the forward values of every node.
    pub(crate) fn backward(&self, val: &[f64]) -> Vec<f64> {
        let mut dr = vec![f64::NEG_INFINITY; self.len()];
        dr[self.root().index()] = 0.0;

        for (i, node) in self.nodes().iter().enumerate().rev() {
            let d = dr[i];
            if d == f64::NEG_INFINITY {
                continue;
            }
            match node {
                Node::Terminal { .. } => {}
                Node::Sum(es) => {
                    for e in es {
                        let c = e.child.index();
                        dr[c] = log_add(dr[c], d + e.weight);
                    }
                }
                Node::Product(cs) => {
                    let mut zeros = 0;
                    let mut zero_child = 0;
                    let mut total = 0.0;
                    for c in cs {
                        let v = val[c.index()];
                        if v == f64::NEG_INFINITY {
                            zeros += 1;
                            zero_child = c.index();
                        } else {
                            total += v;
                        }
                    }
                    match zeros {
                        0 => {
                            for c in cs {
                                let c = c.index();
                                dr[c] = log_add(dr[c], d + total - val[c]);
                            }
                        }
                        1 => {
                            dr[zero_child] = log_add(dr[zero_child], d + total);
                        }
                        _ => {}
                    }
                }
            }
        }
        dr
    }

    /// Log-derivative of the root with respect to each `(variable, state)`
    /// indicator, under a soft assignment.
    ///
    /// Entry `[var][state]` equals the log-value of the network with `var`
    /// observed in `state` and every other variable weighted as in `ass`. It
    /// upper-bounds the score of any full assignment consistent with `ass`
    /// that puts `var` in `state`.
    pub fn state_derivatives(&self, ass: &Assignment) -> Vec<Vec<f64>> {
        let dr = self.derivative(ass);
        let mut d: Vec<Vec<f64>> = self.schema().iter().map(|&n| vec![f64::NEG_INFINITY; n]).collect();
        for (i, node) in self.nodes().iter().enumerate() {
            if let &Node::Terminal { var, state } = node {
                d[var][state] = log_add(d[var][state], dr[i]);
            }
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::assignment::Assignment;
    use crate::fixtures::{all_assignments, split_mass, ternary, two_vars};
    use crate::spn::{Node, Spn};
    use crate::types::{NodeId, Schema};

    fn close(a: f64, b: f64) -> bool {
        a == b || (a - b).abs() < 1e-9
    }

    /// The derivative at indicator `(k, v)` of a full assignment equals the
    /// value of that assignment with `x[k] := v`.
    fn check_flips(spn: &Spn) {
        for x in all_assignments(spn.schema()) {
            let d = spn.state_derivatives(&Assignment::from_states(spn.schema(), &x));
            for (k, &n) in spn.schema().iter().enumerate() {
                for v in 0..n {
                    let mut y = x.clone();
                    y[k] = v;
                    let expected = spn.eval_x(&y);
                    assert!(close(d[k][v], expected), "x={:?} k={} v={}: {} vs {}", x, k, v, d[k][v], expected);
                }
            }
        }
    }

    #[test]
    fn test_derivative_equals_flip() {
        check_flips(&two_vars());
        check_flips(&split_mass());
        check_flips(&ternary());
    }

    #[test]
    fn test_zero_siblings() {
        let nodes = vec![
            Node::Terminal { var: 0, state: 1 },
            Node::Terminal { var: 1, state: 0 },
            Node::Product(vec![NodeId::new(0), NodeId::new(1)]),
        ];
        let spn = Spn::new(nodes, Schema::binary(2)).unwrap();
        check_flips(&spn);

        // One zero sibling: only the zero child is responsible.
        let dr = spn.derivative(&Assignment::from_states(spn.schema(), &[0, 0]));
        assert_eq!(dr[0], 0.0);
        assert_eq!(dr[1], f64::NEG_INFINITY);

        // Two zero siblings: nobody is.
        let dr = spn.derivative(&Assignment::from_states(spn.schema(), &[0, 1]));
        assert_eq!(dr[0], f64::NEG_INFINITY);
        assert_eq!(dr[1], f64::NEG_INFINITY);
        assert!(dr.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_marginal_derivative_is_marginal() {
        let spn = two_vars();
        let d = spn.state_derivatives(&Assignment::marginal(spn.schema()));
        assert!(close(d[0][0], 0.6f64.ln()));
        assert!(close(d[0][1], 0.4f64.ln()));
        assert!(close(d[1][0], (0.12f64 + 0.36).ln()));
        assert!(close(d[1][1], (0.48f64 + 0.04).ln()));
    }
}
