//! 2D and 3D quadrature rules formed by tensor products of 1D rules.
//!
//! Points are ordered lexicographically with the x index running fastest, so that the point
//! `(qx, qy)` of a quadrilateral rule with `n` points per direction is found at index
//! `qx + n * qy`, and `(qx, qy, qz)` of a hexahedral rule at `qx + n * (qy + n * qz)`.

use crate::univariate::{gauss, gauss_lobatto};
use crate::{Rule, Rule1d};

/// Constructs the lexicographic tensor product of a 1D rule with itself on the reference square.
pub fn quadrilateral_tensor_rule(rule1d: &Rule1d) -> Rule<2> {
    let (weights1d, points1d) = rule1d;
    let n = weights1d.len();
    let mut weights2d = Vec::with_capacity(n * n);
    let mut points2d = Vec::with_capacity(n * n);

    for (&wy, &[y]) in weights1d.iter().zip(points1d) {
        for (&wx, &[x]) in weights1d.iter().zip(points1d) {
            weights2d.push(wx * wy);
            points2d.push([x, y]);
        }
    }

    (weights2d, points2d)
}

/// Constructs the lexicographic tensor product of a 1D rule with itself on the reference cube.
pub fn hexahedron_tensor_rule(rule1d: &Rule1d) -> Rule<3> {
    let (weights1d, points1d) = rule1d;
    let n = weights1d.len();
    let mut weights3d = Vec::with_capacity(n * n * n);
    let mut points3d = Vec::with_capacity(n * n * n);

    for (&wz, &[z]) in weights1d.iter().zip(points1d) {
        for (&wy, &[y]) in weights1d.iter().zip(points1d) {
            for (&wx, &[x]) in weights1d.iter().zip(points1d) {
                weights3d.push(wx * wy * wz);
                points3d.push([x, y, z]);
            }
        }
    }

    (weights3d, points3d)
}

/// A Gauss quadrature rule for the reference quadrilateral with the provided number of
/// points per dimension.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    quadrilateral_tensor_rule(&gauss(num_points_per_dim))
}

/// A Gauss quadrature rule for the reference hexahedron with the provided number of
/// points per dimension.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule<3> {
    hexahedron_tensor_rule(&gauss(num_points_per_dim))
}

/// A Gauss-Lobatto quadrature rule for the reference quadrilateral.
///
/// # Panics
///
/// Panics if fewer than two points per dimension are requested.
pub fn quadrilateral_gauss_lobatto(num_points_per_dim: usize) -> Rule<2> {
    quadrilateral_tensor_rule(&gauss_lobatto(num_points_per_dim))
}

/// A Gauss-Lobatto quadrature rule for the reference hexahedron.
///
/// # Panics
///
/// Panics if fewer than two points per dimension are requested.
pub fn hexahedron_gauss_lobatto(num_points_per_dim: usize) -> Rule<3> {
    hexahedron_tensor_rule(&gauss_lobatto(num_points_per_dim))
}
