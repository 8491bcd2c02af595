//! Regression values on the 16-variable NLTCS benchmark circuit.
//!
//! The model is not bundled; put it at `tests/data/nltcs.ac` and run these
//! with `cargo test --test nltcs -- --ignored`.

mod common;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use test_log::test;

use spn_map::ac::Ac;
use spn_map::method::{MapConfig, Method};
use spn_map::query::Query;
use spn_map::spn::Spn;

const NLTCS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/nltcs.ac");

fn load() -> (Ac, Spn) {
    let ac = Ac::load(NLTCS).unwrap_or_else(|e| panic!("cannot load {}: {}", NLTCS, e));
    let spn = Spn::from_ac(&ac);
    (ac, spn)
}

#[test]
#[ignore = "needs tests/data/nltcs.ac"]
fn known_values() {
    let (ac, spn) = load();
    assert_eq!(spn.num_vars(), 16);

    let zeros = vec![0; 16];
    let ones = vec![1; 16];
    let zero_one: Vec<usize> = (0..16).map(|i| i % 2).collect();
    let one_zero: Vec<usize> = (0..16).map(|i| 1 - i % 2).collect();
    for (x, expected) in [
        (zeros, -1.750023),
        (ones, -3.519511),
        (zero_one, -15.535905),
        (one_zero, -27.309816),
    ] {
        assert!((spn.eval_x(&x) - expected).abs() < 1e-6, "{:?}", x);
        assert!((ac.eval_x(&x) - expected).abs() < 1e-6, "{:?}", x);
    }
}

#[test]
#[ignore = "needs tests/data/nltcs.ac"]
fn circuit_and_network_agree() {
    let (ac, spn) = load();
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for _ in 0..100 {
        let x: Vec<usize> = (0..16).map(|_| rng.random_range(0..2)).collect();
        assert!((ac.eval_x(&x) - spn.eval_x(&x)).abs() < 1e-9);
    }
}

#[test]
#[ignore = "needs tests/data/nltcs.ac"]
fn methods_on_nltcs() {
    let (_, spn) = load();
    let opt = common::brute_force(&spn);
    let config = MapConfig::new().with_samples(500).with_k(50);
    for m in Method::ALL {
        let c = spn.solve(m, &config);
        assert!(c.score <= opt.score + 1e-9, "{}", m);
        if m.is_exact() {
            assert!(common::close(c.score, opt.score), "{}", m);
        }
    }

    let query: Query = "1*??????????????".parse().unwrap();
    let sol = spn.solve_queries(&[query], Method::Exact(spn_map::exact::Policy::Ordering), &config).unwrap();
    assert_eq!(sol[0].assignment[0], Some(1));
    assert_eq!(sol[0].assignment[1], None);
}
