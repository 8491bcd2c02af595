//! SPN to DOT (Graphviz) conversion.
//!
//! The generated graph is undirected and laid out left to right, root first.
//! Nodes are drawn as small colored points:
//!
//! - **Sum nodes** are blue
//! - **Product nodes** are grey
//! - **Terminals** are red for state 0 and green for any other state
//!
//! Nodes close to the terminals are drawn as a tree: every node whose
//! distance to the nearest terminal is at most [`DotConfig::tree_depth`] is
//! repeated under each parent, which keeps the many small leaf factors of a
//! learned network readable. Everything above that level is drawn as a DAG,
//! each shared node once.
//!
//! # Examples
//!
//! ```
//! use spn_map::dot::DotConfig;
//! use spn_map::random::RandomSpn;
//!
//! let spn = RandomSpn::new(4).seed(1).build();
//! let dot = spn.to_dot(&DotConfig::default()).unwrap();
//! assert!(dot.starts_with("graph {"));
//! // Render with: dot -Tsvg network.dot -o network.svg
//! ```

use std::fmt::{self, Write as _};

use crate::spn::{Node, Spn};
use crate::types::NodeId;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Nodes at most this far from a terminal are drawn as a tree (default: 1)
    pub tree_depth: usize,
    /// Graph layout direction (default: "LR")
    pub rankdir: &'static str,
    /// Shape of every node (default: "point")
    pub node_shape: &'static str,
    /// Color of sum nodes (default: "blue")
    pub sum_color: &'static str,
    /// Color of product nodes (default: "grey")
    pub product_color: &'static str,
    /// Color of terminals testing state 0 (default: "red")
    pub zero_color: &'static str,
    /// Color of terminals testing any other state (default: "green")
    pub state_color: &'static str,
    /// Color of edges (default: "grey")
    pub edge_color: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            tree_depth: 1,
            rankdir: "LR",
            node_shape: "point",
            sum_color: "blue",
            product_color: "grey",
            zero_color: "red",
            state_color: "green",
            edge_color: "grey",
        }
    }
}

struct Plot<'a> {
    spn: &'a Spn,
    config: &'a DotConfig,
    /// Distance from each node to its nearest terminal.
    depth: Vec<usize>,
    visited: Vec<bool>,
    dot: String,
}

impl Plot<'_> {
    /// Emits the subgraph under `id` and returns the DOT id it was drawn as.
    fn emit(&mut self, id: NodeId, from: &str) -> Result<String, fmt::Error> {
        let i = id.index();
        let nid = if self.depth[i] > self.config.tree_depth {
            let nid = format!("n{}", i);
            if self.visited[i] {
                return Ok(nid);
            }
            self.visited[i] = true;
            nid
        } else {
            format!("{}n{}", from, i)
        };

        let node = self.spn.node(id);
        let color = match node {
            Node::Terminal { state: 0, .. } => self.config.zero_color,
            Node::Terminal { .. } => self.config.state_color,
            Node::Sum(_) => self.config.sum_color,
            Node::Product(_) => self.config.product_color,
        };
        for child in node.children() {
            let cid = self.emit(child, &nid)?;
            writeln!(self.dot, "{} -- {} [color={}];", nid, cid, self.config.edge_color)?;
        }
        writeln!(self.dot, "{} [color={}];", nid, color)?;
        Ok(nid)
    }
}

impl Spn {
    /// Converts the network to DOT (Graphviz) format.
    pub fn to_dot(&self, config: &DotConfig) -> Result<String, fmt::Error> {
        let mut depth: Vec<usize> = Vec::with_capacity(self.len());
        for node in self.nodes() {
            let d = match node {
                Node::Terminal { .. } => 0,
                _ => 1 + node.children().map(|c| depth[c.index()]).min().unwrap_or(0),
            };
            depth.push(d);
        }

        let mut plot = Plot {
            spn: self,
            config,
            depth,
            visited: vec![false; self.len()],
            dot: String::new(),
        };
        writeln!(plot.dot, "graph {{")?;
        writeln!(plot.dot, "rankdir=\"{}\";", config.rankdir)?;
        writeln!(plot.dot, "node [shape={}];", config.node_shape)?;
        plot.emit(self.root(), "n")?;
        writeln!(plot.dot, "}}")?;
        Ok(plot.dot)
    }
}
