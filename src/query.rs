//! Evidence and conditioning.
//!
//! A [`Query`] tags every variable of a network as observed, marginalized or
//! free. [`Spn::condition`] turns a network and a query into a new, smaller
//! network over the free variables only, such that for every assignment `y`
//! of the free variables
//!
//! ```text
//! conditioned(y) = sum over marginalized z of original(evidence, y, z)
//! ```
//!
//! Conditioning walks the arena once. Terminals of non-free variables become
//! constant log-weights; a node whose whole subtree became constant collapses
//! into a weight that its parents absorb (a product adds it, a sum edge
//! carries it). The source network is never modified.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::error::QueryError;
use crate::spn::{Node, Spn, SumEdge};
use crate::types::{NodeId, Schema};
use crate::utils::log_sum_exp;

/// Evidence about a single variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Evidence {
    /// The variable is known to be in the given state.
    Observed(usize),
    /// The variable is summed out.
    Marginalized,
    /// The variable is part of the MAP query.
    Free,
}

impl Evidence {
    fn parse(token: &str) -> Result<Self, QueryError> {
        match token {
            "?" | "-1" => Ok(Evidence::Free),
            "*" => Ok(Evidence::Marginalized),
            _ => token
                .parse::<usize>()
                .map(Evidence::Observed)
                .map_err(|_| QueryError::BadToken(token.to_string())),
        }
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::Observed(s) => write!(f, "{}", s),
            Evidence::Marginalized => write!(f, "*"),
            Evidence::Free => write!(f, "?"),
        }
    }
}

/// Per-variable evidence, in variable order.
///
/// Parsed from either one character per variable (`"0?*1"`) or
/// comma-separated tokens (`"0,?,*,12"`, also accepting `-1` for free):
///
/// ```
/// use spn_map::query::{Evidence, Query};
///
/// let q: Query = "1?*".parse().unwrap();
/// assert_eq!(q.evidence(), &[Evidence::Observed(1), Evidence::Free, Evidence::Marginalized]);
/// assert_eq!(q, "1,-1,*".parse::<Query>().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Query(Vec<Evidence>);

impl Query {
    pub fn new(evidence: Vec<Evidence>) -> Self {
        Query(evidence)
    }

    /// Every one of `n` variables free: plain MAP over the whole network.
    pub fn free(n: usize) -> Self {
        Query(vec![Evidence::Free; n])
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of free variables.
    pub fn free_count(&self) -> usize {
        self.0.iter().filter(|e| **e == Evidence::Free).count()
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let evidence = if s.contains(',') {
            s.split(',').map(|t| Evidence::parse(t.trim())).collect::<Result<_, _>>()?
        } else {
            s.chars()
                .map(|c| Evidence::parse(c.encode_utf8(&mut [0; 4])))
                .collect::<Result<_, _>>()?
        };
        Ok(Query(evidence))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compact = self.0.iter().all(|e| !matches!(e, Evidence::Observed(s) if *s > 9));
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 && !compact {
                write!(f, ",")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

/// A network conditioned on evidence.
#[derive(Debug, Clone)]
pub struct Conditioned {
    /// Network over the free variables, renumbered `0..free_vars.len()`.
    pub spn: Spn,
    /// Original index of every variable of `spn`.
    pub free_vars: Vec<usize>,
    evidence: Vec<Evidence>,
}

impl Conditioned {
    /// Maps an assignment of the conditioned network back to the original
    /// variables. Marginalized variables have no state.
    pub fn lift(&self, local: &[usize]) -> Vec<Option<usize>> {
        let mut x: Vec<Option<usize>> = self
            .evidence
            .iter()
            .map(|e| match *e {
                Evidence::Observed(s) => Some(s),
                _ => None,
            })
            .collect();
        for (&var, &state) in self.free_vars.iter().zip(local) {
            x[var] = Some(state);
        }
        x
    }
}

impl Spn {
    /// Conditions the network on per-variable evidence.
    ///
    /// Fails if the evidence does not match the schema, or if no free
    /// variable is left in the conditioned network.
    pub fn condition(&self, evidence: &[Evidence]) -> Result<Conditioned, QueryError> {
        let n = self.num_vars();
        if evidence.len() != n {
            return Err(QueryError::Length {
                expected: n,
                found: evidence.len(),
            });
        }

        let mut local: Vec<Option<usize>> = vec![None; n];
        let mut free_vars = Vec::new();
        for (var, e) in evidence.iter().enumerate() {
            match *e {
                Evidence::Observed(state) if state >= self.schema().states(var) => {
                    return Err(QueryError::StateOutOfRange {
                        var,
                        state,
                        states: self.schema().states(var),
                    });
                }
                Evidence::Free => {
                    local[var] = Some(free_vars.len());
                    free_vars.push(var);
                }
                _ => {}
            }
        }
        if free_vars.is_empty() {
            return Err(QueryError::NoFreeVariable);
        }

        // New id of every surviving node; `we` is the constant log-weight a
        // node contributes to its parent.
        let mut ids: Vec<Option<NodeId>> = vec![None; self.len()];
        let mut we = vec![0.0; self.len()];
        let mut nodes: Vec<Node> = Vec::with_capacity(self.len());

        for (i, node) in self.nodes().iter().enumerate() {
            let new = match node {
                &Node::Terminal { var, state } => match evidence[var] {
                    Evidence::Free => local[var].map(|var| Node::Terminal { var, state }),
                    Evidence::Observed(s) => {
                        we[i] = if s == state { 0.0 } else { f64::NEG_INFINITY };
                        None
                    }
                    Evidence::Marginalized => None,
                },
                Node::Sum(es) => {
                    // Smoothness: either all children collapsed or none did.
                    if ids[es[0].child.index()].is_none() {
                        we[i] = log_sum_exp(es.iter().map(|e| e.weight + we[e.child.index()]));
                        None
                    } else {
                        let edges = es
                            .iter()
                            .filter_map(|e| {
                                let c = e.child.index();
                                ids[c].map(|id| SumEdge::new(e.weight + we[c], id))
                            })
                            .collect();
                        Some(Node::Sum(edges))
                    }
                }
                Node::Product(cs) => {
                    we[i] = cs.iter().map(|c| we[c.index()]).sum();
                    let children: Vec<NodeId> = cs.iter().filter_map(|c| ids[c.index()]).collect();
                    (!children.is_empty()).then_some(Node::Product(children))
                }
            };
            if let Some(node) = new {
                ids[i] = Some(NodeId::new(nodes.len()));
                nodes.push(node);
            }
        }

        if ids[self.root().index()].is_none() {
            // The free variables do not occur under the root.
            return Err(QueryError::NoFreeVariable);
        }

        let schema = Schema::new(free_vars.iter().map(|&v| self.schema().states(v)).collect());
        debug!(
            "conditioned network: {} -> {} nodes, {} -> {} variables",
            self.len(),
            nodes.len(),
            n,
            free_vars.len()
        );
        Ok(Conditioned {
            spn: Spn::new_unchecked(nodes, schema),
            free_vars,
            evidence: evidence.to_vec(),
        })
    }

    /// Conditions on a partial assignment: `Some(state)` is observed, `None`
    /// is free.
    pub fn stage(&self, partial: &[Option<usize>]) -> Result<Conditioned, QueryError> {
        let evidence: Vec<Evidence> = partial
            .iter()
            .map(|p| p.map_or(Evidence::Free, Evidence::Observed))
            .collect();
        self.condition(&evidence)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::fixtures::{all_assignments, split_mass, ternary, two_vars};
    use crate::utils::log_sum_exp;

    fn q(s: &str) -> Query {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            q("0?*").evidence(),
            &[Evidence::Observed(0), Evidence::Free, Evidence::Marginalized]
        );
        assert_eq!(
            q("12, -1, *").evidence(),
            &[Evidence::Observed(12), Evidence::Free, Evidence::Marginalized]
        );
        assert_eq!(q("??1").free_count(), 2);
        assert_eq!("0x".parse::<Query>(), Err(QueryError::BadToken("x".to_string())));
        assert_eq!("0,,1".parse::<Query>(), Err(QueryError::BadToken(String::new())));
    }

    #[test]
    fn test_display() {
        assert_eq!(q("0?*1").to_string(), "0?*1");
        assert_eq!(q("10,?,*").to_string(), "10,?,*");
    }

    #[test]
    fn test_condition_observed() {
        let spn = two_vars();
        let cond = spn.condition(q("1?").evidence()).unwrap();
        assert_eq!(cond.free_vars, vec![1]);
        assert_eq!(cond.spn.schema(), &Schema::binary(1));
        for s in 0..2 {
            let a = cond.spn.eval_x(&[s]);
            let b = spn.eval_x(&[1, s]);
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(cond.lift(&[0]), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_condition_marginalized() {
        let spn = ternary();
        let cond = spn.condition(q("*?").evidence()).unwrap();
        for s in 0..2 {
            let expected = log_sum_exp((0..3).map(|x0| spn.eval_x(&[x0, s])));
            assert!((cond.spn.eval_x(&[s]) - expected).abs() < 1e-9);
        }
        assert_eq!(cond.lift(&[1]), vec![None, Some(1)]);
    }

    #[test]
    fn test_condition_all_free_is_equivalent() {
        let spn = split_mass();
        let cond = spn.condition(Query::free(2).evidence()).unwrap();
        for x in all_assignments(spn.schema()) {
            assert!((cond.spn.eval_x(&x) - spn.eval_x(&x)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_condition_errors() {
        let spn = two_vars();
        assert_eq!(
            spn.condition(q("?").evidence()).unwrap_err(),
            QueryError::Length { expected: 2, found: 1 }
        );
        assert_eq!(spn.condition(q("01").evidence()).unwrap_err(), QueryError::NoFreeVariable);
        assert_eq!(
            spn.condition(q("?2").evidence()).unwrap_err(),
            QueryError::StateOutOfRange { var: 1, state: 2, states: 2 }
        );
    }

    #[test]
    fn test_stage() {
        let spn = ternary();
        let cond = spn.stage(&[Some(2), None]).unwrap();
        assert_eq!(cond.free_vars, vec![1]);
        assert!((cond.spn.eval_x(&[0]) - spn.eval_x(&[2, 0])).abs() < 1e-9);
        assert!(spn.stage(&[Some(0), Some(1)]).is_err());
    }
}
