//! k-best induced trees.
//!
//! [`Spn::top_k_max_max`] generalizes [`Spn::max_max`] from the single best
//! induced tree to the `k` best ones. Every node keeps a score-sorted list of
//! at most `k` *links*; a link is one derivation of the node (one induced
//! subtree) with back-pointers to the links it was built from:
//!
//! - a terminal has the single link of score 0;
//! - a sum merges its children's lists, shifted by the edge weights, with a
//!   linear two-pointer merge (the lists are already sorted);
//! - a product combines its children pairwise with a best-first walk over
//!   the `(left index, right index)` grid driven by a binary heap, so only
//!   `O(k)` of the `left x right` pairs are ever looked at.
//!
//! The root's links are finally unfolded into full assignments.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use log::{debug, warn};

use crate::deadline::Deadline;
use crate::spn::{Node, Spn};

/// One derivation of a node, stored in a shared arena.
#[derive(Debug, Copy, Clone)]
struct Link {
    score: f64,
    left: Option<usize>,
    right: Option<usize>,
    terminal: Option<(usize, usize)>,
}

/// A candidate cell of the product grid.
#[derive(Debug, Copy, Clone)]
struct Cell {
    score: f64,
    left: usize,
    right: usize,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    /// Max-heap on score; ties go to the cell closer to the grid origin.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.left.cmp(&self.left))
            .then_with(|| other.right.cmp(&self.right))
    }
}

#[derive(Debug, Default)]
struct Arena {
    links: Vec<Link>,
}

impl Arena {
    fn push(&mut self, link: Link) -> usize {
        self.links.push(link);
        self.links.len() - 1
    }

    fn score(&self, id: usize) -> f64 {
        self.links[id].score
    }

    /// Merges the sorted list `acc` (already weighted) with the sorted list
    /// `child` shifted by `weight`, keeping the `k` best. `acc` wins ties.
    fn merge_sum(&mut self, acc: &[usize], child: &[usize], weight: f64, k: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(k.min(acc.len() + child.len()));
        let (mut i, mut j) = (0, 0);
        while out.len() < k {
            let take_left = match (acc.get(i), child.get(j)) {
                (Some(&l), Some(&r)) => self.score(l) >= self.score(r) + weight,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if take_left {
                out.push(acc[i]);
                i += 1;
            } else {
                let r = child[j];
                let link = Link {
                    score: self.score(r) + weight,
                    left: Some(r),
                    right: None,
                    terminal: None,
                };
                out.push(self.push(link));
                j += 1;
            }
        }
        out
    }

    /// The `k` best pairings of two sorted lists.
    fn merge_product(&mut self, left: &[usize], right: &[usize], k: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(k);
        if left.is_empty() || right.is_empty() {
            return out;
        }
        let cell = |arena: &Arena, i: usize, j: usize| Cell {
            score: arena.score(left[i]) + arena.score(right[j]),
            left: i,
            right: j,
        };

        let mut fringe = BinaryHeap::new();
        let mut seen = HashSet::new();
        fringe.push(cell(self, 0, 0));
        seen.insert((0, 0));

        while out.len() < k {
            let Some(c) = fringe.pop() else { break };
            let link = Link {
                score: c.score,
                left: Some(left[c.left]),
                right: Some(right[c.right]),
                terminal: None,
            };
            out.push(self.push(link));
            if c.left + 1 < left.len() && seen.insert((c.left + 1, c.right)) {
                fringe.push(cell(self, c.left + 1, c.right));
            }
            if c.right + 1 < right.len() && seen.insert((c.left, c.right + 1)) {
                fringe.push(cell(self, c.left, c.right + 1));
            }
        }
        out
    }

    /// Writes the terminals of the subtree rooted at `link` into `x`.
    fn unfold(&self, link: usize, x: &mut [usize]) {
        let mut stack = vec![link];
        while let Some(id) = stack.pop() {
            let l = &self.links[id];
            if let Some((var, state)) = l.terminal {
                x[var] = state;
            }
            stack.extend(l.left);
            stack.extend(l.right);
        }
    }
}

impl Spn {
    /// The assignments of the `k` best induced trees, best first.
    ///
    /// Fewer than `k` assignments are returned when the network has fewer
    /// trees. Different trees may induce the same assignment, so the result
    /// can contain duplicates. The first entry is always the
    /// [`max_max`][Self::max_max] assignment.
    ///
    /// The deadline is polled once per node; if it fires, nothing is
    /// returned.
    pub fn top_k_max_max(&self, k: usize, deadline: &Deadline) -> Vec<Vec<usize>> {
        if k == 0 {
            return Vec::new();
        }
        let mut arena = Arena::default();
        let mut lists: Vec<Vec<usize>> = Vec::with_capacity(self.len());

        for (i, node) in self.nodes().iter().enumerate() {
            if deadline.is_expired() {
                warn!("k-best extraction cancelled at node {} of {}", i, self.len());
                return Vec::new();
            }
            let list = match node {
                &Node::Terminal { var, state } => {
                    let link = Link {
                        score: 0.0,
                        left: None,
                        right: None,
                        terminal: Some((var, state)),
                    };
                    vec![arena.push(link)]
                }
                Node::Sum(es) => {
                    let mut acc = Vec::new();
                    for e in es {
                        acc = arena.merge_sum(&acc, &lists[e.child.index()], e.weight, k);
                    }
                    acc
                }
                Node::Product(cs) => {
                    let mut acc = lists[cs[0].index()].clone();
                    for c in &cs[1..] {
                        acc = arena.merge_product(&acc, &lists[c.index()], k);
                    }
                    acc
                }
            };
            lists.push(list);
        }

        let root = &lists[self.root().index()];
        debug!("k-best: {} trees at the root, {} links in total", root.len(), arena.links.len());
        root.iter()
            .map(|&link| {
                let mut x = vec![0; self.num_vars()];
                arena.unfold(link, &mut x);
                x
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::fixtures::{split_mass, ternary, two_vars};

    #[test]
    fn test_all_trees_in_order() {
        let xs = two_vars().top_k_max_max(10, &Deadline::never());
        assert_eq!(xs, vec![vec![0, 1], vec![1, 0], vec![0, 0], vec![1, 1]]);
    }

    #[test]
    fn test_truncated() {
        let xs = two_vars().top_k_max_max(2, &Deadline::never());
        assert_eq!(xs, vec![vec![0, 1], vec![1, 0]]);
        assert!(two_vars().top_k_max_max(0, &Deadline::never()).is_empty());
    }

    #[test]
    fn test_duplicate_assignments() {
        let xs = split_mass().top_k_max_max(5, &Deadline::never());
        assert_eq!(xs, vec![vec![0, 0], vec![1, 1], vec![1, 1]]);
    }

    #[test]
    fn test_first_is_max_max() {
        for spn in [two_vars(), split_mass(), ternary()] {
            let xs = spn.top_k_max_max(3, &Deadline::never());
            assert_eq!(xs[0], spn.max_max());
        }
    }

    #[test]
    fn test_product_grid() {
        // 3 x 2 = 6 trees, scores are products of the marginals.
        let xs = ternary().top_k_max_max(6, &Deadline::never());
        let spn = ternary();
        let scores: Vec<f64> = xs.iter().map(|x| spn.eval_x(x)).collect();
        assert_eq!(xs.len(), 6);
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(xs[0], vec![1, 0]);
        assert_eq!(xs[1], vec![2, 0]);
    }

    #[test]
    fn test_cancelled() {
        assert!(two_vars().top_k_max_max(4, &Deadline::expired()).is_empty());
        assert!(two_vars().top_k_max_max(4, &Deadline::after_polls(5)).is_empty());
        assert_eq!(two_vars().top_k_max_max(4, &Deadline::after_polls(9)).len(), 4);
    }
}
