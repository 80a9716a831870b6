//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::{Error, Rule};
use std::f64::consts::PI;

/// Newton iterations are stopped once the update falls below this threshold.
const NEWTON_TOLERANCE: f64 = 1e-15;

/// Upper bound on Newton iterations. The initial guesses are accurate enough that convergence
/// happens within a handful of iterations for all practical rule sizes.
const MAX_NEWTON_ITERATIONS: usize = 100;

/// Recurrence relation for Legendre polynomials.
///
/// The derivative formula is *not* defined at |x| == 1, so evaluation is restricted to
/// the open interval (-1, 1).
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // p_n(x)
    p1: f64,
    // p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    pub fn evaluate(n: usize, x: f64) -> Self {
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        let mut p3;
        for m in 1..=n {
            let m = m as f64;
            p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }

        Self { n, x, p1, p2 }
    }

    fn value(&self) -> f64 {
        self.p1
    }

    fn derivative(&self) -> f64 {
        let Self { n, x, p1, p2 } = &self;
        let n = *n as f64;
        // dp_n/dx (x) = n * (x * p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
        n * (x * p1 - p2) / (x * x - 1.0)
    }

    /// Second derivative, obtained from the Legendre differential equation
    ///  (1 - x^2) p_n'' - 2 x p_n' + n (n + 1) p_n = 0.
    fn second_derivative(&self) -> f64 {
        let n = self.n as f64;
        let x = self.x;
        (2.0 * x * self.derivative() - n * (n + 1.0) * self.value()) / (1.0 - x * x)
    }

    fn value_and_derivative(&self) -> (f64, f64) {
        (self.value(), self.derivative())
    }
}

/// Gauss quadrature for the reference interval [-1, 1].
///
/// Returns the [Gauss quadrature rule] with the given number of points, sorted in ascending
/// order. Given `n` points, the rule integrates polynomials of order up to `2 n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
///
/// [Gauss quadrature rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    // Loosely based on the procedure used in
    // Numerical Recipes, The art of Scientific Computing, Third Edition (2007)
    let m = (n + 1) / 2;

    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];

    // Only the first m roots are computed, the rest follow by symmetry
    for i in 0..m {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let (mut p, mut dp) = LegendreRecurrence::evaluate(n, x).value_and_derivative();

        for _ in 0..MAX_NEWTON_ITERATIONS {
            let dx = -p / dp;
            x += dx;
            (p, dp) = LegendreRecurrence::evaluate(n, x).value_and_derivative();
            if dx.abs() <= NEWTON_TOLERANCE {
                break;
            }
        }

        let w = 2.0 / ((1.0 - x * x) * dp * dp);

        // The cosine guess produces roots in descending order
        points[n - 1 - i] = [x];
        weights[n - 1 - i] = w;
        points[i] = [-x];
        weights[i] = w;
    }

    (weights, points)
}

/// Gauss-Lobatto quadrature for the reference interval [-1, 1].
///
/// The rule contains both endpoints and the `n - 2` roots of $p_{n-1}'$, sorted in ascending
/// order. Given `n` points, the rule integrates polynomials of order up to `2 n - 3` exactly.
/// The points are the standard nodes of high-order nodal tensor-product bases.
///
/// Fails with [`Error::NoRuleAvailable`] if fewer than two points are requested.
pub fn try_gauss_lobatto(num_points: usize) -> Result<Rule<1>, Error> {
    let n = num_points;
    if n < 2 {
        return Err(Error::NoRuleAvailable);
    }

    let degree = n - 1;
    let endpoint_weight = 2.0 / (n * degree) as f64;
    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];
    points[0] = [-1.0];
    points[n - 1] = [1.0];
    weights[0] = endpoint_weight;
    weights[n - 1] = endpoint_weight;

    // Interior nodes are the roots of p'_{n-1}, found by Newton's method starting from the
    // Chebyshev-Gauss-Lobatto nodes
    let num_interior = n - 2;
    for i in 1..=(num_interior + 1) / 2 {
        let mut x = -(PI * i as f64 / degree as f64).cos();
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let recurrence = LegendreRecurrence::evaluate(degree, x);
            let dx = -recurrence.derivative() / recurrence.second_derivative();
            x += dx;
            if dx.abs() <= NEWTON_TOLERANCE {
                break;
            }
        }

        let p = LegendreRecurrence::evaluate(degree, x).value();
        let w = endpoint_weight / (p * p);

        points[i] = [x];
        weights[i] = w;
        points[n - 1 - i] = [-x];
        weights[n - 1 - i] = w;
    }

    // The middle node of an odd rule is exactly zero
    if n % 2 == 1 {
        let mid = n / 2;
        let p = LegendreRecurrence::evaluate(degree, 0.0).value();
        points[mid] = [0.0];
        weights[mid] = endpoint_weight / (p * p);
    }

    Ok((weights, points))
}

/// Gauss-Lobatto quadrature for the reference interval [-1, 1].
///
/// # Panics
///
/// Panics if fewer than two points are requested.
pub fn gauss_lobatto(num_points: usize) -> Rule<1> {
    match try_gauss_lobatto(num_points) {
        Ok(rule) => rule,
        Err(err) => panic!("{} (Gauss-Lobatto rules require at least two points)", err),
    }
}
