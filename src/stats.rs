//! Structural statistics of circuits.

use std::fmt;

use crate::ac::{Ac, AcNode};
use crate::spn::{Node, Spn};

/// Summary statistics of a list of numbers.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Stat {
    pub sum: f64,
    pub avg: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Stat {
    /// Statistics of `xs`; all zeros when `xs` is empty.
    pub fn of(xs: &[f64]) -> Self {
        if xs.is_empty() {
            return Self::default();
        }
        let n = xs.len() as f64;
        let sum: f64 = xs.iter().sum();
        let avg = sum / n;
        let var = xs.iter().map(|x| x * x).sum::<f64>() / n - avg * avg;
        Self {
            sum,
            avg,
            std: var.max(0.0).sqrt(),
            min: xs.iter().copied().fold(f64::INFINITY, f64::min),
            max: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sum={} avg={:.2} std={:.2} min={} max={}",
            self.sum, self.avg, self.std, self.min, self.max
        )
    }
}

/// Node counts and fan-in statistics of a network.
#[derive(Debug, Clone, PartialEq)]
pub struct SpnInfo {
    pub variables: usize,
    pub terminals: usize,
    pub sums: usize,
    pub products: usize,
    pub sum_edges: Stat,
    pub product_edges: Stat,
}

impl fmt::Display for SpnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "SPN: {} variables, {} terminals, {} sums, {} products",
            self.variables, self.terminals, self.sums, self.products
        )?;
        writeln!(f, "  sum edges:     {}", self.sum_edges)?;
        write!(f, "  product edges: {}", self.product_edges)
    }
}

/// Node counts and fan-in statistics of an arithmetic circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct AcInfo {
    pub variables: usize,
    pub indicators: usize,
    pub constants: usize,
    pub sums: usize,
    pub products: usize,
    pub sum_edges: Stat,
    pub product_edges: Stat,
}

impl fmt::Display for AcInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "AC: {} variables, {} indicators, {} constants, {} sums, {} products",
            self.variables, self.indicators, self.constants, self.sums, self.products
        )?;
        writeln!(f, "  sum edges:     {}", self.sum_edges)?;
        write!(f, "  product edges: {}", self.product_edges)
    }
}

impl Spn {
    pub fn info(&self) -> SpnInfo {
        let mut terminals = 0;
        let mut sum_fan = Vec::new();
        let mut product_fan = Vec::new();
        for node in self.nodes() {
            match node {
                Node::Terminal { .. } => terminals += 1,
                Node::Sum(es) => sum_fan.push(es.len() as f64),
                Node::Product(cs) => product_fan.push(cs.len() as f64),
            }
        }
        SpnInfo {
            variables: self.num_vars(),
            terminals,
            sums: sum_fan.len(),
            products: product_fan.len(),
            sum_edges: Stat::of(&sum_fan),
            product_edges: Stat::of(&product_fan),
        }
    }
}

impl Ac {
    pub fn info(&self) -> AcInfo {
        let (mut indicators, mut constants) = (0, 0);
        let mut sum_fan = Vec::new();
        let mut product_fan = Vec::new();
        for node in self.nodes() {
            match node {
                AcNode::Indicator { .. } => indicators += 1,
                AcNode::Constant(_) => constants += 1,
                AcNode::Sum(cs) => sum_fan.push(cs.len() as f64),
                AcNode::Product(cs) => product_fan.push(cs.len() as f64),
            }
        }
        AcInfo {
            variables: self.schema().len(),
            indicators,
            constants,
            sums: sum_fan.len(),
            products: product_fan.len(),
            sum_edges: Stat::of(&sum_fan),
            product_edges: Stat::of(&product_fan),
        }
    }
}
