//! Quadrature rules for tensor-product reference domains.
//!
//! The main purpose of this crate is to supply the one-dimensional rules and the lexicographic
//! tensor-product rules consumed by the `sumfact` partial assembly kernels. All rules are defined
//! on the reference interval `[-1, 1]` and its tensor products.
//!
//! Tensor-product rules are ordered *lexicographically with the x index running fastest*, i.e.
//! the point `(qx, qy, qz)` is stored at index `qx + Q1D * (qy + Q1D * qz)`. This is the point
//! ordering every kernel in `sumfact` assumes.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(f, "There is no quadrature rule satisfying the requirements available")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A three-dimensional point.
pub type Point3 = Point<3>;

/// A D-dimensional rule, stored as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional quadrature rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// A three-dimensional rule.
pub type Rule3d = Rule<3>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}

/// Extracts the coordinates of a one-dimensional rule as a plain vector.
pub fn points_1d(rule: &Rule1d) -> Vec<f64> {
    rule.1.iter().map(|&[x]| x).collect()
}
