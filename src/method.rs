//! Named MAP methods, their configuration and batch solving.
//!
//! [`Spn::solve`] runs one [`Method`] on a network and always returns a
//! scored full assignment. [`Spn::solve_queries`] conditions the network on
//! every query and solves the conditioned networks in parallel.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{debug, info};
use rayon::prelude::*;

use crate::candidate::{self, Candidate};
use crate::deadline::Deadline;
use crate::error::QueryError;
use crate::exact::{Policy, StageThresholds};
use crate::query::Query;
use crate::spn::Spn;

/// A MAP method, named by its short name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// `BT`: best induced tree.
    BestTree,
    /// `NG`: greedy descent along the largest marginal branch.
    SumMax,
    /// `NB`: per-variable marginal argmax.
    NaiveBayes,
    /// `AMAP`: argmax-product.
    ArgmaxProduct,
    /// `PRB`: best of independent samples.
    Sampling,
    /// `BS`: beam search seeded with samples and the best tree.
    Beam,
    /// `KBT`: best of the k best induced trees.
    KBestTrees,
    /// `MP`, `FC`, `ORDERING`, `STAGE`: exact branch-and-bound.
    Exact(Policy),
}

impl Method {
    pub const ALL: [Method; 11] = [
        Method::BestTree,
        Method::SumMax,
        Method::NaiveBayes,
        Method::ArgmaxProduct,
        Method::Sampling,
        Method::Beam,
        Method::KBestTrees,
        Method::Exact(Policy::Baseline),
        Method::Exact(Policy::ForwardChecking),
        Method::Exact(Policy::Ordering),
        Method::Exact(Policy::Stage),
    ];

    /// Whether the method returns the optimum when it finishes in time.
    pub fn is_exact(self) -> bool {
        matches!(self, Method::Exact(_))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::BestTree => "BT",
            Method::SumMax => "NG",
            Method::NaiveBayes => "NB",
            Method::ArgmaxProduct => "AMAP",
            Method::Sampling => "PRB",
            Method::Beam => "BS",
            Method::KBestTrees => "KBT",
            Method::Exact(policy) => return write!(f, "{}", policy),
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Method {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BT" => Ok(Method::BestTree),
            "NG" => Ok(Method::SumMax),
            "NB" => Ok(Method::NaiveBayes),
            "AMAP" => Ok(Method::ArgmaxProduct),
            "PRB" => Ok(Method::Sampling),
            "BS" => Ok(Method::Beam),
            "KBT" => Ok(Method::KBestTrees),
            _ => s.parse().map(Method::Exact),
        }
    }
}

/// Parameters shared by all methods.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Seed of every random choice (sampling and beam seeds).
    pub seed: u64,
    /// Time budget per solved network (None for no limit).
    pub timeout: Option<Duration>,
    /// Beam width, also the number of sampled beam seeds.
    pub beam_width: usize,
    /// Number of induced trees for `KBT`.
    pub k: usize,
    /// Number of draws for `PRB`.
    pub samples: usize,
    /// Minimum number of fixed variables before `STAGE` restructures.
    pub stage_min_fixed: usize,
    /// `STAGE` restructures only while more than this many variables are free.
    pub stage_min_free: usize,
}

impl MapConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        let stage = StageThresholds::default();
        Self {
            seed: 0,
            timeout: None,
            beam_width: 10,
            k: 100,
            samples: 1000,
            stage_min_fixed: stage.min_fixed,
            stage_min_free: stage.min_free,
        }
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the time budget per network.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the beam width.
    pub fn with_beam_width(mut self, width: usize) -> Self {
        self.beam_width = width;
        self
    }

    /// Set the number of induced trees.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the number of samples.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Set the `STAGE` restructuring thresholds.
    pub fn with_stage(mut self, min_fixed: usize, min_free: usize) -> Self {
        self.stage_min_fixed = min_fixed;
        self.stage_min_free = min_free;
        self
    }

    pub fn stage_thresholds(&self) -> StageThresholds {
        StageThresholds {
            min_fixed: self.stage_min_fixed,
            min_free: self.stage_min_free,
        }
    }

    /// A fresh deadline for one solve, starting now.
    pub fn deadline(&self) -> Deadline {
        Deadline::from_timeout(self.timeout)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The answer to one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Best assignment of the free variables, in query order.
    pub candidate: Candidate,
    /// State of every variable of the unconditioned network; `None` for
    /// marginalized variables.
    pub assignment: Vec<Option<usize>>,
    /// Wall-clock time of the search, conditioning excluded.
    pub elapsed: Duration,
}

impl Spn {
    fn scored(&self, x: Vec<usize>) -> Candidate {
        let score = self.eval_x(&x);
        Candidate::new(x, score)
    }

    /// Runs one method with a fresh deadline from `config`.
    pub fn solve(&self, method: Method, config: &MapConfig) -> Candidate {
        let deadline = config.deadline();
        let c = match method {
            Method::BestTree => self.scored(self.max_max()),
            Method::SumMax => self.scored(self.sum_max()),
            Method::NaiveBayes => self.scored(self.naive_bayes()),
            Method::ArgmaxProduct => self.argmax_product(&deadline),
            Method::Sampling => self.sample_best(config.samples, config.seed),
            Method::Beam => {
                let mut seeds = self.sample_k(config.beam_width, config.seed);
                seeds.push(self.scored(self.max_max()));
                self.beam_search(seeds, config.beam_width, &deadline)
            }
            Method::KBestTrees => {
                let xs = self.top_k_max_max(config.k, &deadline);
                if xs.is_empty() && config.k > 0 {
                    Candidate::cancelled()
                } else {
                    candidate::best(&self.eval_x_batch(xs))
                }
            }
            Method::Exact(policy) => {
                self.exact_with(policy, None, config.stage_thresholds(), &deadline)
                    .best
            }
        };
        debug!("{} finished with score {}", method, c.score);
        c
    }

    /// Conditions the network on every query and solves them in parallel.
    ///
    /// Fails if any query does not fit the network; nothing is solved then.
    pub fn solve_queries(
        &self,
        queries: &[Query],
        method: Method,
        config: &MapConfig,
    ) -> Result<Vec<Solution>, QueryError> {
        let conditioned = queries
            .par_iter()
            .map(|q| self.condition(q.evidence()))
            .collect::<Result<Vec<_>, _>>()?;

        let solutions: Vec<Solution> = conditioned
            .par_iter()
            .map(|cond| {
                let start = Instant::now();
                let candidate = cond.spn.solve(method, config);
                let elapsed = start.elapsed();
                let assignment = if candidate.assignment.is_empty() {
                    Vec::new()
                } else {
                    cond.lift(&candidate.assignment)
                };
                Solution {
                    candidate,
                    assignment,
                    elapsed,
                }
            })
            .collect();
        info!("solved {} queries with {}", solutions.len(), method);
        Ok(solutions)
    }
}
