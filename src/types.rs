//! Type-safe wrappers for node identifiers and variable schemas.
//!
//! Nodes of both circuit representations live in a single arena (a `Vec`)
//! and refer to their children by [`NodeId`]. The arena is kept in
//! topological order, so a child's id is always strictly smaller than its
//! parent's and the last node is the root.
use std::fmt;
use std::ops::Deref;

/// A dense node identifier (0-indexed position in the node arena).
///
/// # Invariants
///
/// - Ids are assigned in construction order: `0..N`
/// - Every child id is strictly smaller than its parent id
/// - The node with id `N - 1` is the root
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new node id with the given arena index.
    pub fn new(index: usize) -> Self {
        assert!(index <= u32::MAX as usize, "Node index {} does not fit into u32", index);
        NodeId(index as u32)
    }

    /// Returns the arena index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> Self {
        id.index()
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId::new(index)
    }
}

/// The number of states of each discrete variable, in variable order.
///
/// Variables are 0-indexed. A schema is immutable once a network is built.
///
/// ```
/// use spn_map::types::Schema;
///
/// let schema = Schema::binary(3);
/// assert_eq!(schema.len(), 3);
/// assert_eq!(schema.states(1), 2);
/// assert_eq!(schema.assignment_count(), 8.0);
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct Schema(Vec<usize>);

impl Schema {
    /// Creates a schema from per-variable state counts.
    pub fn new(states: Vec<usize>) -> Self {
        Schema(states)
    }

    /// Creates a schema of `n` binary variables.
    pub fn binary(n: usize) -> Self {
        Schema(vec![2; n])
    }

    /// Number of states of variable `var`.
    pub fn states(&self, var: usize) -> usize {
        self.0[var]
    }

    /// Number of complete assignments, as a float (it overflows integers quickly).
    pub fn assignment_count(&self) -> f64 {
        self.0.iter().map(|&s| s as f64).product()
    }

    /// Checks whether every variable is binary.
    pub fn is_binary(&self) -> bool {
        self.0.iter().all(|&s| s == 2)
    }
}

impl Deref for Schema {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for Schema {
    fn from(states: Vec<usize>) -> Self {
        Schema(states)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, s) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, ")")
    }
}
