//! Helpers shared by the `sumfact` test suites and benchmarks.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Poor man's approx assertion for slices of equal length.
#[macro_export]
macro_rules! assert_approx_slice_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let x: &[f64] = &$x;
        let y: &[f64] = &$y;
        assert_eq!(x.len(), y.len(), "slices must have equal length");

        let max_absdiff = x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        if max_absdiff > $tol {
            println!("abstol: {:e}", $tol);
            println!("max absdiff: {:e}", max_absdiff);
        }
        assert!(max_absdiff <= $tol);
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::{catch_unwind, AssertUnwindSafe};
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(AssertUnwindSafe(|| $e));
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Deterministic pseudo-random values uniformly distributed in `[-1, 1)`.
pub fn random_vec(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Plain dot product of two slices of equal length.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Relative difference `|a - b| / max(|a|, |b|, 1)`, used for adjointness comparisons whose
/// magnitude depends on problem size.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    (a - b).abs() / a.abs().max(b.abs()).max(1.0)
}
