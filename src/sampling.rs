//! Ancestral sampling.
//!
//! A draw walks the network from the root: every product node descends into
//! all its children, every sum node into one child chosen with probability
//! proportional to `weight * partition(child)` (inverse CDF in log-space).
//! The visited terminals form a full assignment distributed exactly as the
//! network's joint distribution.
//!
//! Draws are independent and run in parallel. Each draw owns its own
//! ChaCha stream, so results depend only on the seed and the draw index and
//! not on thread scheduling.

use log::debug;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::candidate::{self, Candidate};
use crate::spn::{Node, Spn};
use crate::types::NodeId;
use crate::utils::log_add;

impl Spn {
    /// Draws one full assignment.
    ///
    /// `partition` must be the result of [`Spn::partition`].
    pub fn sample<R: Rng>(&self, partition: &[f64], rng: &mut R) -> Vec<usize> {
        self.trace(|i| {
            let Node::Sum(es) = self.node(NodeId::new(i)) else {
                unreachable!("trace only asks for sum nodes")
            };
            let target = rng.random::<f64>().ln() + partition[i];
            let mut acc = f64::NEG_INFINITY;
            let mut fallback = es[0].child;
            for e in es {
                let mass = e.weight + partition[e.child.index()];
                if mass > f64::NEG_INFINITY {
                    fallback = e.child;
                }
                acc = log_add(acc, mass);
                if target < acc {
                    return e.child;
                }
            }
            // Rounding left the target just above the total mass.
            fallback
        })
    }

    /// Draws `k` independent assignments and scores them.
    ///
    /// Draw `i` uses a ChaCha8 generator seeded with `seed` on stream `i`.
    pub fn sample_k(&self, k: usize, seed: u64) -> Vec<Candidate> {
        let prt = self.partition();
        let samples: Vec<Candidate> = (0..k)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(i as u64);
                let x = self.sample(&prt, &mut rng);
                let score = self.eval_x(&x);
                Candidate::new(x, score)
            })
            .collect();
        debug!("drew {} samples with seed {}", samples.len(), seed);
        samples
    }

    /// The best of `k` independent draws.
    pub fn sample_best(&self, k: usize, seed: u64) -> Candidate {
        candidate::best(&self.sample_k(k, seed))
    }

    /// Scores many full assignments in parallel.
    pub fn eval_x_batch(&self, xs: Vec<Vec<usize>>) -> Vec<Candidate> {
        xs.into_par_iter()
            .map(|x| {
                let score = self.eval_x(&x);
                Candidate::new(x, score)
            })
            .collect()
    }
}
