//! Exact MAP by depth-first branch-and-bound.
//!
//! The search walks the tree of partial assignments, keeping the best full
//! assignment found so far (the incumbent). Subtrees are cut with the
//! admissible bounds of [`Spn::state_derivatives`]: under the current
//! partial assignment, the bound of `(var, state)` is the total mass of all
//! completions that put `var` in `state`, which is at least the score of the
//! best of them.
//!
//! Four policies share this shape:
//!
//! - [`Policy::Baseline`]: no propagation; variables in index order, a branch
//!   is entered only if its prefix marginal beats the incumbent.
//! - [`Policy::ForwardChecking`]: before branching, repeatedly eliminate every
//!   state whose bound does not beat the incumbent (a variable left with no
//!   state prunes the subtree, one left with a single state is forced).
//!   Branches on the first free variable, weakest state first.
//! - [`Policy::Ordering`]: forward checking, branching on the free variable
//!   with the strongest best-state bound, strongest state first.
//! - [`Policy::Stage`]: like `Ordering`, but once enough variables are fixed
//!   the network is conditioned on them and the search continues on the
//!   smaller network.
//!
//! The deadline is polled once per recursive call. On expiry the search
//! unwinds and reports the incumbent with `finished == false`: a lower bound
//! on the optimum, not the optimum itself.

use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};

use crate::assignment::Assignment;
use crate::candidate::Candidate;
use crate::deadline::Deadline;
use crate::error::QueryError;
use crate::spn::Spn;

/// Variable and value selection policy of the exact search.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Policy {
    Baseline,
    ForwardChecking,
    Ordering,
    Stage,
}

impl Policy {
    pub const ALL: [Policy; 4] = [Policy::Baseline, Policy::ForwardChecking, Policy::Ordering, Policy::Stage];
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Policy::Baseline => "MP",
            Policy::ForwardChecking => "FC",
            Policy::Ordering => "ORDERING",
            Policy::Stage => "STAGE",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Policy {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MP" | "BASELINE" => Ok(Policy::Baseline),
            "FC" => Ok(Policy::ForwardChecking),
            "ORDERING" => Ok(Policy::Ordering),
            "STAGE" => Ok(Policy::Stage),
            _ => Err(QueryError::UnknownMethod(s.to_string())),
        }
    }
}

/// When [`Policy::Stage`] conditions the network on the fixed variables.
///
/// Restructuring happens when more than `min_free` variables are free and at
/// least `min_fixed` (and at least one) are fixed. The defaults are a tuned
/// heuristic, not a correctness requirement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StageThresholds {
    pub min_fixed: usize,
    pub min_free: usize,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            min_fixed: 5,
            min_free: 1,
        }
    }
}

/// Outcome of an exact search.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactResult {
    /// Best assignment found, in the caller's variable indexing.
    pub best: Candidate,
    /// Whether the search completed before the deadline. Only then is
    /// `best` guaranteed to be optimal.
    pub finished: bool,
    /// Number of recursive calls made.
    pub calls: usize,
}

/// Maps the variables of a (possibly conditioned) network back to the
/// variables of the network the search started on.
struct Frame {
    /// Original index of each local variable.
    vars: Vec<usize>,
    /// Original-indexed assignment holding the states of variables that were
    /// conditioned away.
    base: Vec<usize>,
}

impl Frame {
    fn identity(n: usize) -> Self {
        Self {
            vars: (0..n).collect(),
            base: vec![0; n],
        }
    }

    fn to_original(&self, local: &[usize]) -> Vec<usize> {
        let mut x = self.base.clone();
        for (l, &o) in self.vars.iter().enumerate() {
            x[o] = local[l];
        }
        x
    }
}

struct Search<'a> {
    policy: Policy,
    stage: StageThresholds,
    deadline: &'a Deadline,
    best: Candidate,
    calls: usize,
    cancelled: bool,
}

impl Search<'_> {
    /// Polls the deadline, counting the call.
    fn enter(&mut self) -> bool {
        self.calls += 1;
        if !self.cancelled && self.deadline.is_expired() {
            warn!("exact search ({}) cancelled after {} calls", self.policy, self.calls);
            self.cancelled = true;
        }
        !self.cancelled
    }

    /// Takes `local` as the new incumbent if its bound beats the current one
    /// and its actual score does too.
    fn offer(&mut self, spn: &Spn, frame: &Frame, local: &[usize], bound: f64) {
        if bound <= self.best.score {
            return;
        }
        let score = spn.eval_x(local);
        if score > self.best.score {
            debug!("new incumbent {}", score);
            self.best = Candidate::new(frame.to_original(local), score);
        }
    }

    fn baseline(&mut self, spn: &Spn, x: &mut [usize], var: usize) {
        if !self.enter() {
            return;
        }
        if var == x.len() {
            let score = spn.eval_x(x);
            if score > self.best.score {
                debug!("new incumbent {}", score);
                self.best = Candidate::new(x.to_vec(), score);
            }
            return;
        }
        for state in 0..spn.schema().states(var) {
            x[var] = state;
            let mut ass = Assignment::marginal(spn.schema());
            for (v, &s) in x[..=var].iter().enumerate() {
                ass.observe(v, s);
            }
            let bound = spn.eval_prefix(&ass, spn.root());
            if bound > self.best.score {
                self.baseline(spn, x, var + 1);
            }
            if self.cancelled {
                return;
            }
        }
    }

    /// Eliminates states whose bound does not beat the incumbent until
    /// nothing changes. Returns the bounds of the final assignment, or `None`
    /// if some free variable lost all its states.
    fn propagate(&self, spn: &Spn, ass: &mut Assignment) -> Option<Vec<Vec<f64>>> {
        loop {
            let d = spn.state_derivatives(ass);
            let mut changed = false;
            for var in 0..ass.len() {
                if ass.fixed(var).is_some() {
                    continue;
                }
                let allowed: Vec<usize> = ass.allowed(var).collect();
                let dead: Vec<usize> = allowed
                    .iter()
                    .copied()
                    .filter(|&s| d[var][s] <= self.best.score)
                    .collect();
                if dead.len() == allowed.len() {
                    return None;
                }
                for s in dead {
                    ass.forbid(var, s);
                    changed = true;
                }
            }
            if !changed {
                return Some(d);
            }
        }
    }

    fn branch(&mut self, spn: &Spn, frame: &Frame, mut ass: Assignment) {
        if !self.enter() {
            return;
        }
        let Some(d) = self.propagate(spn, &mut ass) else {
            return;
        };

        let n = ass.len();
        let free: Vec<usize> = (0..n).filter(|&v| ass.fixed(v).is_none()).collect();
        let mut x: Vec<usize> = (0..n).map(|v| ass.fixed(v).unwrap_or(0)).collect();

        match free.len() {
            0 => {
                // Every bound of a variable in the root scope equals the score
                // of the single assignment left; the others are -inf.
                let score = (0..n).map(|v| d[v][x[v]]).fold(f64::NEG_INFINITY, f64::max);
                self.offer(spn, frame, &x, score);
                return;
            }
            1 => {
                // With all other variables fixed, the bounds are exact scores.
                let var = free[0];
                if let Some(state) = ass.allowed(var).max_by(|&a, &b| d[var][a].total_cmp(&d[var][b])) {
                    x[var] = state;
                    self.offer(spn, frame, &x, d[var][state]);
                }
                return;
            }
            _ => {}
        }

        let fixed = n - free.len();
        if self.policy == Policy::Stage && free.len() > self.stage.min_free && fixed >= self.stage.min_fixed.max(1) {
            let evidence: Vec<Option<usize>> = (0..n).map(|v| ass.fixed(v)).collect();
            match spn.stage(&evidence) {
                Ok(cond) => {
                    debug!(
                        "stage: {} fixed, network shrinks from {} to {} nodes",
                        fixed,
                        spn.len(),
                        cond.spn.len()
                    );
                    let sub_frame = Frame {
                        vars: cond.free_vars.iter().map(|&v| frame.vars[v]).collect(),
                        base: frame.to_original(&x),
                    };
                    let mut sub = Assignment::marginal(cond.spn.schema());
                    for (l, &v) in cond.free_vars.iter().enumerate() {
                        for s in 0..spn.schema().states(v) {
                            if ass.weight(v, s) == 0.0 {
                                sub.forbid(l, s);
                            }
                        }
                    }
                    self.branch(&cond.spn, &sub_frame, sub);
                    return;
                }
                Err(e) => warn!("stage restructuring skipped: {}", e),
            }
        }

        let (var, states) = match self.policy {
            Policy::ForwardChecking => {
                let var = free[0];
                let mut states: Vec<usize> = ass.allowed(var).collect();
                states.sort_by(|&a, &b| d[var][a].total_cmp(&d[var][b]));
                (var, states)
            }
            _ => {
                let strongest = |v: usize| ass.allowed(v).map(|s| d[v][s]).fold(f64::NEG_INFINITY, f64::max);
                let mut var = free[0];
                let mut top = strongest(var);
                for &v in &free[1..] {
                    let b = strongest(v);
                    if b > top {
                        var = v;
                        top = b;
                    }
                }
                let mut states: Vec<usize> = ass.allowed(var).collect();
                states.sort_by(|&a, &b| d[var][b].total_cmp(&d[var][a]));
                (var, states)
            }
        };

        for state in states {
            let mut child = ass.clone();
            child.observe(var, state);
            self.branch(spn, frame, child);
            if self.cancelled {
                return;
            }
        }
    }
}

impl Spn {
    /// Exact MAP search with the default stage thresholds.
    ///
    /// See [`exact_with`][Self::exact_with].
    pub fn exact(&self, policy: Policy, incumbent: Option<Candidate>, deadline: &Deadline) -> ExactResult {
        self.exact_with(policy, incumbent, StageThresholds::default(), deadline)
    }

    /// Exact MAP search.
    ///
    /// The search starts from `incumbent` (a full assignment with its score)
    /// or, when none is given, from the [`max_max`][Self::max_max] estimate.
    /// The returned candidate is never worse than the starting one.
    pub fn exact_with(
        &self,
        policy: Policy,
        incumbent: Option<Candidate>,
        stage: StageThresholds,
        deadline: &Deadline,
    ) -> ExactResult {
        let n = self.num_vars();
        let best = incumbent
            .filter(|c| !c.is_cancelled() && c.assignment.len() == n)
            .unwrap_or_else(|| {
                let x = self.max_max();
                let score = self.eval_x(&x);
                Candidate::new(x, score)
            });
        let mut search = Search {
            policy,
            stage,
            deadline,
            best,
            calls: 0,
            cancelled: false,
        };

        if n > 0 {
            match policy {
                Policy::Baseline => search.baseline(self, &mut vec![0; n], 0),
                _ => {
                    // No terminal tests a variable outside the root scope, so
                    // all its bounds are -inf. Pin it to state 0 up front.
                    let scope = &self.scopes()[self.root().index()];
                    let mut start = Assignment::marginal(self.schema());
                    for var in (0..n).filter(|&v| !scope.contains(v)) {
                        debug!("variable {} is not in the root scope, fixed to 0", var);
                        start.observe(var, 0);
                    }
                    search.branch(self, &Frame::identity(n), start)
                }
            }
        }

        info!(
            "exact search ({}) {} after {} calls with score {}",
            policy,
            if search.cancelled { "cancelled" } else { "finished" },
            search.calls,
            search.best.score
        );
        ExactResult {
            best: search.best,
            finished: !search.cancelled,
            calls: search.calls,
        }
    }
}
