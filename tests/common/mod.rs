//! Helpers shared by the integration tests.

#![allow(dead_code)]

use spn_map::candidate::Candidate;
use spn_map::random::RandomSpn;
use spn_map::spn::Spn;
use spn_map::types::Schema;

/// Every full assignment of `schema`, variable 0 varying fastest.
pub fn all_assignments(schema: &Schema) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut x = vec![0; schema.len()];
    loop {
        out.push(x.clone());
        let mut var = 0;
        loop {
            if var == x.len() {
                return out;
            }
            x[var] += 1;
            if x[var] < schema.states(var) {
                break;
            }
            x[var] = 0;
            var += 1;
        }
    }
}

/// The MAP assignment by enumeration; the first one wins ties.
pub fn brute_force(spn: &Spn) -> Candidate {
    let mut best = Candidate::worst();
    for x in all_assignments(spn.schema()) {
        let score = spn.eval_x(&x);
        if best.assignment.is_empty() || score > best.score {
            best = Candidate::new(x, score);
        }
    }
    best
}

/// A spread of small random networks, binary and multi-valued.
pub fn networks() -> Vec<Spn> {
    let mut out = Vec::new();
    for seed in 0..4 {
        out.push(RandomSpn::new(7).fan_in(2).seed(seed).build());
        out.push(RandomSpn::new(5).states(3).fan_in(3).seed(100 + seed).build());
    }
    out.push(RandomSpn::new(1).states(4).seed(7).build());
    out
}

/// Both values are `-inf`, or they differ by at most `1e-9`.
pub fn close(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < 1e-9
}
