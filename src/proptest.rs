//! Strategies for generating kernel inputs with `proptest`.
use ::proptest::collection::vec;
use ::proptest::prelude::*;

/// Triples `(trial D1D, test D1D, Q1D)` with `test D1D <= trial D1D <= Q1D`.
pub fn divergence_sizes(max_trial_d1d: usize) -> impl Strategy<Value = (usize, usize, usize)> {
    (1..=max_trial_d1d).prop_flat_map(|trial| (Just(trial), 1..=trial, trial..=trial + 2))
}

/// Pairs `(D1D, Q1D)` with `2 <= D1D <= Q1D`.
pub fn energy_sizes(max_d1d: usize) -> impl Strategy<Value = (usize, usize)> {
    (2..=max_d1d).prop_flat_map(|d| (Just(d), d..=d + 2))
}

/// Values uniformly distributed in `[-1, 1]`.
pub fn unit_values(len: usize) -> impl Strategy<Value = Vec<f64>> {
    vec(-1.0..=1.0, len)
}

/// Jacobians in the layout `[point][row][col][element]` that deviate from the identity by at
/// most `0.25` per entry, and are therefore safely invertible.
pub fn perturbed_jacobians(dim: usize, num_points: usize, num_elements: usize) -> impl Strategy<Value = Vec<f64>> {
    vec(-0.25..=0.25, num_points * dim * dim * num_elements).prop_map(move |mut entries| {
        for (i, entry) in entries.iter_mut().enumerate() {
            let r = (i / num_points) % dim;
            let c = (i / (num_points * dim)) % dim;
            if r == c {
                *entry += 1.0;
            }
        }
        entries
    })
}
