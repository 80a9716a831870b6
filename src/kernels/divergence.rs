//! Apply kernels for the vector divergence operator.
//!
//! The forward action maps a trial field with `dim` components, laid out as
//! `[dx][dy]([dz])[component][element]`, to a scalar test field `[dx][dy]([dz])[element]`.
//! The transpose maps back. Both accumulate into their output.
use crate::basis::DofToQuad;
use crate::kernels::contraction::{
    gradient_2d, gradient_3d, integrate_2d, integrate_3d, integrate_gradient_2d, integrate_gradient_3d,
    interpolate_2d, interpolate_3d,
};
use crate::kernels::resolve;
use crate::tensor::{View, ViewMut};
use crate::workspace::{tile, KernelScratch};
use rayon::prelude::*;

/// Everything a divergence kernel reads besides its input and output vectors.
#[derive(Debug, Clone, Copy)]
pub struct DivergenceBatch<'a> {
    pub num_elements: usize,
    pub trial: &'a DofToQuad,
    pub test: &'a DofToQuad,
    /// Operator tensor in the layout `[point][row][col][element]`.
    pub op: &'a [f64],
    pub scratch: &'a KernelScratch,
}

impl<'a> DivergenceBatch<'a> {
    pub fn q1d(&self) -> usize {
        self.trial.nqpt
    }
}

/// Signature shared by all divergence kernels: `(batch, input, output)`.
pub type DivergenceKernel = fn(&DivergenceBatch<'_>, &[f64], &mut [f64]);

#[derive(Debug, Default)]
struct DivergenceScratch {
    field: Vec<f64>,
    grad: Vec<f64>,
    line: Vec<f64>,
    plane: Vec<f64>,
}

pub fn apply_2d<const TR: usize, const TE: usize, const Q: usize>(
    batch: &DivergenceBatch<'_>,
    x: &[f64],
    y: &mut [f64],
) {
    let tr = resolve::<TR>(batch.trial.ndof);
    let te = resolve::<TE>(batch.test.ndof);
    let q = resolve::<Q>(batch.q1d());
    let nq = q * q;
    let m = tr.max(te).max(q);

    let b = View::new(batch.trial.b.as_slice(), [q, tr]);
    let g = View::new(batch.trial.g.as_slice(), [q, tr]);
    let bt = View::new(batch.test.bt.as_slice(), [te, q]);

    y.par_chunks_mut(te * te)
        .zip(x.par_chunks(2 * tr * tr))
        .zip(batch.op.par_chunks(4 * nq))
        .for_each(|((y_e, x_e), op_e)| {
            batch.scratch.with(|ws: &mut DivergenceScratch| {
                let DivergenceScratch { field, grad, line, .. } = ws;
                let line = tile(line, 3 * m);
                let grad_tile = tile(grad, 2 * nq);
                let mut div = ViewMut::new(tile(field, nq), [q, q]);
                let op = View::new(op_e, [nq, 2, 2]);
                div.fill(0.0);

                for c in 0..2 {
                    let x_c = View::new(&x_e[c * tr * tr..], [tr, tr]);
                    let mut grad = ViewMut::new(&mut *grad_tile, [2, q, q]);
                    gradient_2d(b, g, x_c, &mut grad, line);
                    for qy in 0..q {
                        for qx in 0..q {
                            let qi = qx + q * qy;
                            div[[qx, qy]] += grad[[0, qx, qy]] * op[[qi, 0, c]] + grad[[1, qx, qy]] * op[[qi, 1, c]];
                        }
                    }
                }

                let mut y_e = ViewMut::new(y_e, [te, te]);
                integrate_2d(bt, div.as_view(), &mut y_e, line);
            })
        });
}

pub fn apply_3d<const TR: usize, const TE: usize, const Q: usize>(
    batch: &DivergenceBatch<'_>,
    x: &[f64],
    y: &mut [f64],
) {
    let tr = resolve::<TR>(batch.trial.ndof);
    let te = resolve::<TE>(batch.test.ndof);
    let q = resolve::<Q>(batch.q1d());
    let nq = q * q * q;
    let m = tr.max(te).max(q);

    let b = View::new(batch.trial.b.as_slice(), [q, tr]);
    let g = View::new(batch.trial.g.as_slice(), [q, tr]);
    let bt = View::new(batch.test.bt.as_slice(), [te, q]);

    y.par_chunks_mut(te * te * te)
        .zip(x.par_chunks(3 * tr * tr * tr))
        .zip(batch.op.par_chunks(9 * nq))
        .for_each(|((y_e, x_e), op_e)| {
            batch.scratch.with(|ws: &mut DivergenceScratch| {
                let DivergenceScratch {
                    field,
                    grad,
                    line,
                    plane,
                } = ws;
                let line = tile(line, 3 * m);
                let plane = tile(plane, 3 * m * m);
                let grad_tile = tile(grad, 3 * nq);
                let mut div = ViewMut::new(tile(field, nq), [q, q, q]);
                let op = View::new(op_e, [nq, 3, 3]);
                div.fill(0.0);

                for c in 0..3 {
                    let x_c = View::new(&x_e[c * tr * tr * tr..], [tr, tr, tr]);
                    let mut grad = ViewMut::new(&mut *grad_tile, [3, q, q, q]);
                    gradient_3d(b, g, x_c, &mut grad, line, plane);
                    for qz in 0..q {
                        for qy in 0..q {
                            for qx in 0..q {
                                let qi = qx + q * (qy + q * qz);
                                div[[qx, qy, qz]] += grad[[0, qx, qy, qz]] * op[[qi, 0, c]]
                                    + grad[[1, qx, qy, qz]] * op[[qi, 1, c]]
                                    + grad[[2, qx, qy, qz]] * op[[qi, 2, c]];
                            }
                        }
                    }
                }

                let mut y_e = ViewMut::new(y_e, [te, te, te]);
                integrate_3d(bt, div.as_view(), &mut y_e, line, plane);
            })
        });
}

pub fn apply_transpose_2d<const TR: usize, const TE: usize, const Q: usize>(
    batch: &DivergenceBatch<'_>,
    x: &[f64],
    y: &mut [f64],
) {
    let tr = resolve::<TR>(batch.trial.ndof);
    let te = resolve::<TE>(batch.test.ndof);
    let q = resolve::<Q>(batch.q1d());
    let nq = q * q;
    let m = tr.max(te).max(q);

    let bt = View::new(batch.trial.bt.as_slice(), [tr, q]);
    let gt = View::new(batch.trial.gt.as_slice(), [tr, q]);
    let b = View::new(batch.test.b.as_slice(), [q, te]);

    y.par_chunks_mut(2 * tr * tr)
        .zip(x.par_chunks(te * te))
        .zip(batch.op.par_chunks(4 * nq))
        .for_each(|((y_e, x_e), op_e)| {
            batch.scratch.with(|ws: &mut DivergenceScratch| {
                let DivergenceScratch { field, grad, line, .. } = ws;
                let line = tile(line, 3 * m);
                let mut grad = ViewMut::new(tile(grad, 2 * nq), [2, q, q]);
                let mut quad_test = ViewMut::new(tile(field, nq), [q, q]);
                let op = View::new(op_e, [nq, 2, 2]);

                interpolate_2d(b, View::new(x_e, [te, te]), &mut quad_test, line);

                for (c, y_c) in y_e.chunks_exact_mut(tr * tr).enumerate() {
                    for qy in 0..q {
                        for qx in 0..q {
                            let qi = qx + q * qy;
                            let s = quad_test[[qx, qy]];
                            grad[[0, qx, qy]] = s * op[[qi, 0, c]];
                            grad[[1, qx, qy]] = s * op[[qi, 1, c]];
                        }
                    }
                    let mut y_c = ViewMut::new(y_c, [tr, tr]);
                    integrate_gradient_2d(bt, gt, grad.as_view(), &mut y_c, line);
                }
            })
        });
}

pub fn apply_transpose_3d<const TR: usize, const TE: usize, const Q: usize>(
    batch: &DivergenceBatch<'_>,
    x: &[f64],
    y: &mut [f64],
) {
    let tr = resolve::<TR>(batch.trial.ndof);
    let te = resolve::<TE>(batch.test.ndof);
    let q = resolve::<Q>(batch.q1d());
    let nq = q * q * q;
    let m = tr.max(te).max(q);

    let bt = View::new(batch.trial.bt.as_slice(), [tr, q]);
    let gt = View::new(batch.trial.gt.as_slice(), [tr, q]);
    let b = View::new(batch.test.b.as_slice(), [q, te]);

    y.par_chunks_mut(3 * tr * tr * tr)
        .zip(x.par_chunks(te * te * te))
        .zip(batch.op.par_chunks(9 * nq))
        .for_each(|((y_e, x_e), op_e)| {
            batch.scratch.with(|ws: &mut DivergenceScratch| {
                let DivergenceScratch {
                    field,
                    grad,
                    line,
                    plane,
                } = ws;
                let line = tile(line, 3 * m);
                let plane = tile(plane, 3 * m * m);
                let mut grad = ViewMut::new(tile(grad, 3 * nq), [3, q, q, q]);
                let mut quad_test = ViewMut::new(tile(field, nq), [q, q, q]);
                let op = View::new(op_e, [nq, 3, 3]);

                interpolate_3d(b, View::new(x_e, [te, te, te]), &mut quad_test, line, plane);

                for (c, y_c) in y_e.chunks_exact_mut(tr * tr * tr).enumerate() {
                    for qz in 0..q {
                        for qy in 0..q {
                            for qx in 0..q {
                                let qi = qx + q * (qy + q * qz);
                                let s = quad_test[[qx, qy, qz]];
                                for r in 0..3 {
                                    grad[[r, qx, qy, qz]] = s * op[[qi, r, c]];
                                }
                            }
                        }
                    }
                    let mut y_c = ViewMut::new(y_c, [tr, tr, tr]);
                    integrate_gradient_3d(bt, gt, grad.as_view(), &mut y_c, line, plane);
                }
            })
        });
}
