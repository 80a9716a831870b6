//! Setup kernels for the vector divergence operator.
//!
//! Given element Jacobians in the layout `[point][row][col][element]`, the setup stores
//! `w[q] * coeff * adj(J)` per point in the same layout. The result is the operator tensor
//! consumed by every subsequent apply.
use crate::linalg::{adjugate2, adjugate3};
use crate::tensor::{View, ViewMut};
use nalgebra::{Matrix2, Matrix3};
use rayon::prelude::*;

pub fn setup_2d(q1d: usize, num_elements: usize, weights: &[f64], jacobians: &[f64], coeff: f64, op: &mut [f64]) {
    let nq = q1d * q1d;
    let stride = nq * 4;
    debug_assert_eq!(weights.len(), nq);
    debug_assert_eq!(jacobians.len(), stride * num_elements);
    debug_assert_eq!(op.len(), stride * num_elements);

    op.par_chunks_mut(stride)
        .zip(jacobians.par_chunks(stride))
        .for_each(|(op_e, j_e)| {
            let j = View::new(j_e, [nq, 2, 2]);
            let mut op = ViewMut::new(op_e, [nq, 2, 2]);
            for (q, &w) in weights.iter().enumerate() {
                let jac = Matrix2::new(j[[q, 0, 0]], j[[q, 0, 1]], j[[q, 1, 0]], j[[q, 1, 1]]);
                let adj = adjugate2(&jac);
                let cw = w * coeff;
                for r in 0..2 {
                    for c in 0..2 {
                        op[[q, r, c]] = cw * adj[(r, c)];
                    }
                }
            }
        });
}

pub fn setup_3d(q1d: usize, num_elements: usize, weights: &[f64], jacobians: &[f64], coeff: f64, op: &mut [f64]) {
    let nq = q1d * q1d * q1d;
    let stride = nq * 9;
    debug_assert_eq!(weights.len(), nq);
    debug_assert_eq!(jacobians.len(), stride * num_elements);
    debug_assert_eq!(op.len(), stride * num_elements);

    op.par_chunks_mut(stride)
        .zip(jacobians.par_chunks(stride))
        .for_each(|(op_e, j_e)| {
            let j = View::new(j_e, [nq, 3, 3]);
            let mut op = ViewMut::new(op_e, [nq, 3, 3]);
            for (q, &w) in weights.iter().enumerate() {
                let jac = Matrix3::from_fn(|r, c| j[[q, r, c]]);
                let adj = adjugate3(&jac);
                let cw = w * coeff;
                for r in 0..3 {
                    for c in 0..3 {
                        op[[q, r, c]] = cw * adj[(r, c)];
                    }
                }
            }
        });
}
