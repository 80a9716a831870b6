//! Closed-form linear algebra for the small per-point matrices of the kernels.
//!
//! Determinants, adjugates and inverses of `2x2` and `3x3` matrices are evaluated by explicit
//! cofactor expansion. No pivoting or singularity checks are performed: a singular matrix
//! yields non-finite inverses, which the calling solver is expected to detect.
//!
//! Products of the small matrices use the fixed-size `nalgebra` products, which are fully
//! unrolled for these sizes.
use nalgebra::{Matrix2, Matrix3};

#[inline(always)]
pub fn det2(m: &Matrix2<f64>) -> f64 {
    m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]
}

#[inline(always)]
pub fn det3(m: &Matrix3<f64>) -> f64 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(2, 1)] * m[(1, 2)])
        - m[(1, 0)] * (m[(0, 1)] * m[(2, 2)] - m[(2, 1)] * m[(0, 2)])
        + m[(2, 0)] * (m[(0, 1)] * m[(1, 2)] - m[(1, 1)] * m[(0, 2)])
}

/// The adjugate `det(m) * inv(m)` of a `2x2` matrix.
#[inline(always)]
pub fn adjugate2(m: &Matrix2<f64>) -> Matrix2<f64> {
    Matrix2::new(m[(1, 1)], -m[(0, 1)], -m[(1, 0)], m[(0, 0)])
}

/// The adjugate `det(m) * inv(m)` of a `3x3` matrix.
#[inline(always)]
pub fn adjugate3(m: &Matrix3<f64>) -> Matrix3<f64> {
    let (j11, j12, j13) = (m[(0, 0)], m[(0, 1)], m[(0, 2)]);
    let (j21, j22, j23) = (m[(1, 0)], m[(1, 1)], m[(1, 2)]);
    let (j31, j32, j33) = (m[(2, 0)], m[(2, 1)], m[(2, 2)]);
    #[rustfmt::skip]
    let adj = Matrix3::new(
        j22 * j33 - j23 * j32, j32 * j13 - j12 * j33, j12 * j23 - j22 * j13,
        j31 * j23 - j21 * j33, j11 * j33 - j13 * j31, j21 * j13 - j11 * j23,
        j21 * j32 - j31 * j22, j31 * j12 - j11 * j32, j11 * j22 - j12 * j21,
    );
    adj
}

#[inline(always)]
pub fn inverse2(m: &Matrix2<f64>) -> Matrix2<f64> {
    adjugate2(m) / det2(m)
}

#[inline(always)]
pub fn inverse3(m: &Matrix3<f64>) -> Matrix3<f64> {
    adjugate3(m) / det3(m)
}
