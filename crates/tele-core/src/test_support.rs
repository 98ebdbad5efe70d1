//! Shared fixtures for unit tests.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::correlation::CorrelationMatrix;

/// Random symmetric matrix with a unit diagonal and off-diagonal values in [-1, 1).
pub fn random_matrix(n: usize, seed: u64) -> CorrelationMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![1.0f32; n * n];
    for a in 0..n {
        for b in 0..a {
            let v: f32 = rng.gen_range(-1.0..1.0);
            data[a * n + b] = v;
            data[b * n + a] = v;
        }
    }
    CorrelationMatrix::new(n, data).unwrap()
}

/// Random lag-1 autocorrelations in [0, 0.6).
pub fn random_autocorrelations(n: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0.0..0.6)).collect()
}
