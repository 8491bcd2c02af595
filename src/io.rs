//! Model file I/O.
//!
//! Both formats are line-oriented text. The first line is the schema, the
//! per-variable state counts in parentheses. Every following line is one
//! node; node ids are implicit, the i-th body line (0-indexed) has id i.
//! A line holding exactly `EOF` ends the body.
//!
//! # Arithmetic circuit (.ac)
//!
//! ```text
//! (2 2)
//! v <var> <state>        # indicator
//! n <value>              # constant
//! * <id> <id> ...        # product
//! + <id> <id> ...        # sum
//! EOF
//! ```
//!
//! # Sum-product network (.spn)
//!
//! ```text
//! (2 2)
//! v <var> <state>                    # terminal
//! + <id> <log-weight> <id> ...       # sum, (child, log-weight) pairs
//! * <id> <id> ...                    # product
//! EOF
//! ```
//!
//! Floats are written in shortest round-trip form, so saving and loading
//! reproduces the exact weights.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::info;

use crate::ac::{Ac, AcNode};
use crate::error::IoError;
use crate::spn::{Node, Spn, SumEdge};
use crate::types::{NodeId, Schema};

/// A tokenized body line with its 1-based line number in the file.
type Line<'a> = (usize, Vec<&'a str>);

fn parse_schema(no: usize, line: &str) -> Result<Schema, IoError> {
    let inner = line
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| IoError::parse(no, format!("expected schema header `(n0 n1 ...)`, found {:?}", line)))?;
    let states = inner
        .split_whitespace()
        .map(|t| number(no, t, "state count"))
        .collect::<Result<Vec<usize>, _>>()?;
    Ok(Schema::new(states))
}

/// Splits a model file into its schema and tokenized body lines.
fn split(content: &str) -> Result<(Schema, Vec<Line<'_>>), IoError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (no, header) = lines
        .next()
        .ok_or_else(|| IoError::parse(1, "missing schema header"))?;
    let schema = parse_schema(no, header)?;

    let mut body = Vec::new();
    for (no, line) in lines {
        if line == "EOF" {
            return Ok((schema, body));
        }
        body.push((no, line.split_whitespace().collect()));
    }
    Err(IoError::MissingEof)
}

fn number<T: FromStr>(no: usize, token: &str, what: &str) -> Result<T, IoError> {
    token
        .parse()
        .map_err(|_| IoError::parse(no, format!("invalid {} {:?}", what, token)))
}

fn node_id(no: usize, token: &str) -> Result<NodeId, IoError> {
    let id: u32 = number(no, token, "node id")?;
    Ok(NodeId::new(id as usize))
}

fn node_ids(no: usize, tokens: &[&str]) -> Result<Vec<NodeId>, IoError> {
    tokens.iter().map(|t| node_id(no, t)).collect()
}

fn indicator(no: usize, tokens: &[&str]) -> Result<(usize, usize), IoError> {
    match tokens {
        [var, state] => Ok((number(no, var, "variable")?, number(no, state, "state")?)),
        _ => Err(IoError::parse(no, "expected `v <var> <state>`")),
    }
}

fn join(ids: &[NodeId]) -> String {
    ids.iter().map(|c| c.index().to_string()).collect::<Vec<_>>().join(" ")
}

// ─── Arithmetic circuits ───

impl Ac {
    /// Reads a circuit from an `.ac` file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use spn_map::ac::Ac;
    ///
    /// let ac = Ac::load("nltcs.ac").unwrap();
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let content = fs::read_to_string(path.as_ref())?;
        let ac = Self::from_ac_str(&content)?;
        info!(
            "loaded AC with {} nodes over {} variables from {}",
            ac.len(),
            ac.schema().len(),
            path.as_ref().display()
        );
        Ok(ac)
    }

    /// Parses a circuit from the `.ac` text format.
    pub fn from_ac_str(content: &str) -> Result<Self, IoError> {
        let (schema, body) = split(content)?;
        let mut nodes = Vec::with_capacity(body.len());
        for (no, tokens) in body {
            let node = match tokens[0] {
                "v" => {
                    let (var, state) = indicator(no, &tokens[1..])?;
                    AcNode::Indicator { var, state }
                }
                "n" => match tokens[1..] {
                    [value] => AcNode::Constant(number(no, value, "constant")?),
                    _ => return Err(IoError::parse(no, "expected `n <value>`")),
                },
                "*" => AcNode::Product(node_ids(no, &tokens[1..])?),
                "+" => AcNode::Sum(node_ids(no, &tokens[1..])?),
                other => return Err(IoError::parse(no, format!("unknown node type {:?}", other))),
            };
            nodes.push(node);
        }
        Ok(Ac::new(nodes, schema)?)
    }

    /// Renders the circuit in the `.ac` text format.
    pub fn to_ac_string(&self) -> String {
        let mut out = format!("{}\n", self.schema());
        for node in self.nodes() {
            let line = match node {
                AcNode::Indicator { var, state } => format!("v {} {}", var, state),
                AcNode::Constant(c) => format!("n {}", c),
                AcNode::Product(cs) => format!("* {}", join(cs)),
                AcNode::Sum(cs) => format!("+ {}", join(cs)),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("EOF\n");
        out
    }

    /// Writes the circuit to an `.ac` file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        fs::write(path, self.to_ac_string())?;
        Ok(())
    }
}

// ─── Sum-product networks ───

impl Spn {
    /// Reads a network from an `.spn` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let content = fs::read_to_string(path.as_ref())?;
        let spn = Self::from_spn_str(&content)?;
        info!(
            "loaded SPN with {} nodes over {} variables from {}",
            spn.len(),
            spn.num_vars(),
            path.as_ref().display()
        );
        Ok(spn)
    }

    /// Parses a network from the `.spn` text format.
    pub fn from_spn_str(content: &str) -> Result<Self, IoError> {
        let (schema, body) = split(content)?;
        let mut nodes = Vec::with_capacity(body.len());
        for (no, tokens) in body {
            let node = match tokens[0] {
                "v" => {
                    let (var, state) = indicator(no, &tokens[1..])?;
                    Node::Terminal { var, state }
                }
                "+" => {
                    let pairs = &tokens[1..];
                    if pairs.len() % 2 != 0 {
                        return Err(IoError::parse(no, "expected `+ <id> <weight> ...` pairs"));
                    }
                    let edges = pairs
                        .chunks(2)
                        .map(|p| -> Result<SumEdge, IoError> {
                            Ok(SumEdge::new(number(no, p[1], "weight")?, node_id(no, p[0])?))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Node::Sum(edges)
                }
                "*" => Node::Product(node_ids(no, &tokens[1..])?),
                other => return Err(IoError::parse(no, format!("unknown node type {:?}", other))),
            };
            nodes.push(node);
        }
        Ok(Spn::new(nodes, schema)?)
    }

    /// Renders the network in the `.spn` text format.
    pub fn to_spn_string(&self) -> String {
        let mut out = format!("{}\n", self.schema());
        for node in self.nodes() {
            let line = match node {
                Node::Terminal { var, state } => format!("v {} {}", var, state),
                Node::Sum(es) => {
                    let pairs: Vec<String> = es.iter().map(|e| format!("{} {}", e.child.index(), e.weight)).collect();
                    format!("+ {}", pairs.join(" "))
                }
                Node::Product(cs) => format!("* {}", join(cs)),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("EOF\n");
        out
    }

    /// Writes the network to an `.spn` file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        fs::write(path, self.to_spn_string())?;
        Ok(())
    }

    /// Expands the network into an equivalent arithmetic circuit.
    ///
    /// Every sum edge `(w, child)` becomes the product of a constant `exp(w)`
    /// and the child, under an unweighted sum.
    pub fn to_ac(&self) -> Ac {
        let mut ids: Vec<NodeId> = Vec::with_capacity(self.len());
        let mut nodes: Vec<AcNode> = Vec::with_capacity(self.len() * 2);
        for node in self.nodes() {
            let new = match node {
                &Node::Terminal { var, state } => AcNode::Indicator { var, state },
                Node::Sum(es) => {
                    let mut terms = Vec::with_capacity(es.len());
                    for e in es {
                        nodes.push(AcNode::Constant(e.weight.exp()));
                        let constant = NodeId::new(nodes.len() - 1);
                        nodes.push(AcNode::Product(vec![constant, ids[e.child.index()]]));
                        terms.push(NodeId::new(nodes.len() - 1));
                    }
                    AcNode::Sum(terms)
                }
                Node::Product(cs) => AcNode::Product(cs.iter().map(|c| ids[c.index()]).collect()),
            };
            nodes.push(new);
            ids.push(NodeId::new(nodes.len() - 1));
        }
        Ac::new_unchecked(nodes, self.schema().clone())
    }

    /// Writes the network to an `.ac` file.
    pub fn save_as_ac<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        self.to_ac().save(path)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::error::CircuitError;
    use crate::fixtures::{all_assignments, split_mass, ternary, two_vars};

    const TWO_VARS_AC: &str = "\
(2 2)
v 0 0
v 0 1
v 1 0
v 1 1
n 0.2
n 0.8
* 4 2
* 5 3
+ 6 7
n 0.5
* 9 0 8
* 9 1 3
+ 10 11
EOF
";

    #[test]
    fn test_parse_ac() {
        let ac = Ac::from_ac_str(TWO_VARS_AC).unwrap();
        assert_eq!(ac.len(), 13);
        assert_eq!(ac.schema(), &Schema::binary(2));
        assert!((ac.eval_x(&[0, 1]) - 0.4f64.ln()).abs() < 1e-9);
        assert!((ac.eval_x(&[1, 1]) - 0.5f64.ln()).abs() < 1e-9);
        assert_eq!(ac.eval_x(&[1, 0]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_ac_round_trip() {
        let ac = Ac::from_ac_str(TWO_VARS_AC).unwrap();
        assert_eq!(ac.to_ac_string(), TWO_VARS_AC);
        assert_eq!(Ac::from_ac_str(&ac.to_ac_string()).unwrap(), ac);
    }

    #[test]
    fn test_spn_round_trip() {
        for spn in [two_vars(), split_mass(), ternary()] {
            let text = spn.to_spn_string();
            assert!(text.ends_with("EOF\n"));
            assert_eq!(Spn::from_spn_str(&text).unwrap(), spn);
        }
    }

    #[test]
    fn test_to_ac_is_equivalent() {
        for spn in [two_vars(), split_mass(), ternary()] {
            let ac = spn.to_ac();
            for x in all_assignments(spn.schema()) {
                assert!((ac.eval_x(&x) - spn.eval_x(&x)).abs() < 1e-9);
            }
            let back = Spn::from_ac(&Ac::from_ac_str(&ac.to_ac_string()).unwrap());
            for x in all_assignments(spn.schema()) {
                assert!((back.eval_x(&x) - spn.eval_x(&x)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_trailing_content_and_blank_lines() {
        let text = "(2)\n\nv 0 0\nv 0 1\n+ 0 -0.5 1 -1\nEOF\nignored\n";
        let spn = Spn::from_spn_str(text).unwrap();
        assert_eq!(spn.len(), 3);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Spn::from_spn_str("(2)\nv 0 0\n"), Err(IoError::MissingEof)));
        assert!(matches!(Spn::from_spn_str("2\nv 0 0\nEOF\n"), Err(IoError::Parse { line: 1, .. })));
        assert!(matches!(
            Spn::from_spn_str("(2)\nv 0 0\nx 1\nEOF\n"),
            Err(IoError::Parse { line: 3, .. })
        ));
        assert!(matches!(
            Spn::from_spn_str("(2)\nv 0 0\n+ 0\nEOF\n"),
            Err(IoError::Parse { line: 3, .. })
        ));
        assert!(matches!(
            Ac::from_ac_str("(2)\nv 0 zero\nEOF\n"),
            Err(IoError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            Spn::from_spn_str("(2)\nv 0 0\n* 2\nEOF\n"),
            Err(IoError::Circuit(CircuitError::ForwardReference { .. }))
        ));
    }

    #[test]
    fn test_infinite_weight() {
        let spn = Spn::from_spn_str("(2)\nv 0 0\nv 0 1\n+ 0 0 1 -inf\nEOF\n").unwrap();
        assert_eq!(spn.eval_x(&[1]), f64::NEG_INFINITY);
        assert!(spn.to_spn_string().contains("-inf"));
    }
}
