//! Beam search over full assignments.
//!
//! The beam holds at most `width` candidates. Each round it is deduplicated
//! and cut down to its best members, then every member is expanded into its
//! improving one-variable flips. A single derivative pass scores all flips of
//! a candidate at once: for a full assignment `x`, the derivative at
//! indicator `(var, state)` is exactly the score of `x` with `x[var] := state`.
//!
//! Scores strictly increase along every expansion chain, so the search stops
//! when no member of the beam has an improving flip left.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::assignment::Assignment;
use crate::candidate::{self, Candidate};
use crate::deadline::Deadline;
use crate::spn::Spn;

impl Spn {
    /// All single-variable flips of `c` that score strictly better than `c`.
    pub fn improving_flips(&self, c: &Candidate) -> Vec<Candidate> {
        let d = self.state_derivatives(&Assignment::from_states(self.schema(), &c.assignment));
        let mut flips = Vec::new();
        for (var, scores) in d.iter().enumerate() {
            for (state, &score) in scores.iter().enumerate() {
                if state != c.assignment[var] && score > c.score {
                    let mut x = c.assignment.clone();
                    x[var] = state;
                    flips.push(Candidate::new(x, score));
                }
            }
        }
        flips
    }

    /// Beam search from the given seed candidates.
    ///
    /// Cancelled or malformed seeds are ignored. Returns the best candidate
    /// ever held by the beam, or [`Candidate::worst`] if no seed was usable.
    /// The deadline is polled
    /// once per round, before expansion.
    pub fn beam_search(&self, seeds: Vec<Candidate>, width: usize, deadline: &Deadline) -> Candidate {
        let mut best = Candidate::worst();
        let mut beam: Vec<Candidate> = seeds
            .into_iter()
            .filter(|c| !c.is_cancelled() && c.assignment.len() == self.num_vars())
            .collect();
        let mut round = 0;
        while !beam.is_empty() {
            beam = candidate::top_k(candidate::unique(beam), width);
            if let Some(top) = beam.first() {
                if best.assignment.is_empty() || top.beats(&best) {
                    best = top.clone();
                }
            }
            debug!("beam round {}: {} candidates, best {}", round, beam.len(), best.score);
            if deadline.is_expired() {
                warn!("beam search cancelled after {} rounds", round);
                return best;
            }
            // Barrier: all neighbours of this round are collected before the next.
            beam = beam.par_iter().flat_map_iter(|c| self.improving_flips(c)).collect();
            round += 1;
        }
        info!("beam search finished after {} rounds with score {}", round, best.score);
        best
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::fixtures::{brute_force, split_mass, ternary, two_vars};

    #[test]
    fn test_improving_flips() {
        let spn = two_vars();
        let x = vec![1, 1];
        let c = Candidate::new(x.clone(), spn.eval_x(&x));
        let flips = spn.improving_flips(&c);
        // (1,1) = 0.04 improves to (0,1) = 0.48 and (1,0) = 0.36.
        assert_eq!(flips.len(), 2);
        for f in &flips {
            assert!((f.score - spn.eval_x(&f.assignment)).abs() < 1e-9);
            assert!(f.beats(&c));
        }
    }

    #[test]
    fn test_beam_reaches_optimum() {
        for (spn, x) in [(two_vars(), vec![1, 1]), (ternary(), vec![0, 1])] {
            let seed = Candidate::new(x.clone(), spn.eval_x(&x));
            let best = spn.beam_search(vec![seed], 4, &Deadline::never());
            assert!((best.score - brute_force(&spn).score).abs() < 1e-9);
        }
    }

    #[test]
    fn test_beam_local_optimum() {
        // No single flip leaves the best tree's assignment (0,0) without
        // passing through a zero-probability assignment.
        let spn = split_mass();
        let x = spn.max_max();
        let seed = Candidate::new(x.clone(), spn.eval_x(&x));
        let best = spn.beam_search(vec![seed.clone()], 4, &Deadline::never());
        assert_eq!(best, seed);
        assert!(best.score <= brute_force(&spn).score);
    }

    #[test]
    fn test_beam_no_seeds() {
        let best = two_vars().beam_search(vec![], 3, &Deadline::never());
        assert_eq!(best, Candidate::worst());
    }

    #[test]
    fn test_beam_cancelled_keeps_seed() {
        let spn = split_mass();
        let seed = Candidate::new(vec![0, 0], spn.eval_x(&[0, 0]));
        let best = spn.beam_search(vec![seed.clone()], 2, &Deadline::expired());
        assert_eq!(best, seed);
    }
}
