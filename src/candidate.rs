//! Scored assignments.
//!
//! A [`Candidate`] pairs a full assignment with its log-probability. It is
//! the unit every estimator and search procedure produces, compares and
//! stores.

use std::collections::HashSet;

use crate::utils::float_equal;

/// A full assignment together with its log-probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub assignment: Vec<usize>,
    pub score: f64,
}

impl Candidate {
    pub fn new(assignment: Vec<usize>, score: f64) -> Self {
        Self { assignment, score }
    }

    /// The worst possible candidate: empty assignment, score `-inf`.
    ///
    /// Any real candidate (even an impossible one) compares at least as good.
    pub fn worst() -> Self {
        Self::new(Vec::new(), f64::NEG_INFINITY)
    }

    /// Sentinel for a search cancelled before it produced anything.
    pub fn cancelled() -> Self {
        Self::new(Vec::new(), f64::NAN)
    }

    /// Checks for the [cancellation sentinel][Self::cancelled].
    pub fn is_cancelled(&self) -> bool {
        self.score.is_nan()
    }

    /// Strictly better score than `other`.
    pub fn beats(&self, other: &Candidate) -> bool {
        self.score > other.score
    }

    /// Scores are equal up to [`float_equal`] tolerance.
    pub fn ties(&self, other: &Candidate) -> bool {
        float_equal(self.score, other.score)
    }
}

/// The highest scoring candidate; [`Candidate::worst`] for an empty input.
///
/// The first of several equally scored candidates wins.
pub fn best<'a>(candidates: impl IntoIterator<Item = &'a Candidate>) -> Candidate {
    let mut best = Candidate::worst();
    for c in candidates {
        let first = best.assignment.is_empty() && !c.is_cancelled();
        if first || c.beats(&best) {
            best = c.clone();
        }
    }
    best
}

/// Drops candidates whose assignment already occurred earlier in the list.
pub fn unique(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.assignment.clone()))
        .collect()
}

/// The `k` highest scoring candidates, best first.
///
/// Returns all of them if there are fewer than `k`.
pub fn top_k(mut candidates: Vec<Candidate>, k: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: &[usize], p: f64) -> Candidate {
        Candidate::new(x.to_vec(), p)
    }

    #[test]
    fn test_best() {
        let cs = vec![c(&[0, 0], -3.0), c(&[0, 1], -1.0), c(&[1, 1], -1.0)];
        assert_eq!(best(&cs), c(&[0, 1], -1.0));
        assert_eq!(best(&[]), Candidate::worst());
    }

    #[test]
    fn test_best_of_impossible() {
        // An impossible candidate is still a candidate.
        let cs = vec![c(&[1], f64::NEG_INFINITY)];
        assert_eq!(best(&cs).assignment, vec![1]);
    }

    #[test]
    fn test_unique_ignores_score() {
        let cs = vec![c(&[0, 1], -1.0), c(&[1, 1], -2.0), c(&[0, 1], -5.0)];
        let u = unique(cs);
        assert_eq!(u, vec![c(&[0, 1], -1.0), c(&[1, 1], -2.0)]);
    }

    #[test]
    fn test_top_k() {
        let cs = vec![c(&[0], -3.0), c(&[1], -1.0), c(&[2], -2.0)];
        let top = top_k(cs.clone(), 2);
        assert_eq!(top, vec![c(&[1], -1.0), c(&[2], -2.0)]);
        assert_eq!(top_k(cs, 10).len(), 3);
    }

    #[test]
    fn test_sentinels() {
        assert!(Candidate::cancelled().is_cancelled());
        assert!(!Candidate::worst().is_cancelled());
        assert!(c(&[0], -1.0).ties(&c(&[1], -1.0 - 1e-9)));
    }
}
