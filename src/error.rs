//! Error types.
//!
//! Only construction and loading can fail. Inference never returns an error:
//! an impossible assignment scores `-inf`, and a search cancelled before it
//! produced anything reports a `NaN` score.

use std::io;

use thiserror::Error;

use crate::types::NodeId;

/// A structural defect of a circuit, detected at construction time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CircuitError {
    #[error("circuit has no nodes")]
    Empty,
    #[error("variable {var} has zero states")]
    ZeroStates { var: usize },
    #[error("node {node} refers to child {child}, which is not defined before it")]
    ForwardReference { node: NodeId, child: NodeId },
    #[error("node {node} tests variable {var}, but the schema has {vars} variables")]
    VariableOutOfRange { node: NodeId, var: usize, vars: usize },
    #[error("node {node} tests state {state} of variable {var}, which has {states} states")]
    StateOutOfRange { node: NodeId, var: usize, state: usize, states: usize },
    #[error("constant node {node} has invalid value {value}")]
    InvalidConstant { node: NodeId, value: f64 },
    #[error("{kind} node {node} has no children")]
    NoChildren { node: NodeId, kind: &'static str },
    #[error("product node {node} is not decomposable: variable {var} occurs under two children")]
    NotDecomposable { node: NodeId, var: usize },
    #[error("sum node {node} is not smooth: child {child} has a different scope")]
    NotSmooth { node: NodeId, child: NodeId },
    #[error("sum node {node} has edge weight {weight}")]
    InvalidWeight { node: NodeId, weight: f64 },
    #[error("sum node {node} does not depend on any variable")]
    ScopeFreeSum { node: NodeId },
    #[error("circuit root does not depend on any variable")]
    ScopeFree,
}

/// Error type for model file I/O.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed line, with its 1-based line number in the file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    /// The `EOF` terminator line is missing.
    #[error("missing EOF terminator line")]
    MissingEof,
    /// The file parsed, but describes an invalid circuit.
    #[error("invalid circuit: {0}")]
    Circuit(#[from] CircuitError),
}

impl IoError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        IoError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Error type for evidence/query handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query covers {found} variables, but the network has {expected}")]
    Length { expected: usize, found: usize },
    #[error("invalid evidence token {0:?}")]
    BadToken(String),
    #[error("variable {var} observed in state {state}, but it has {states} states")]
    StateOutOfRange { var: usize, state: usize, states: usize },
    #[error("query has no free variable")]
    NoFreeVariable,
    #[error("unknown method {0:?}")]
    UnknownMethod(String),
}
