//! Quadrature-point energy densities of mesh quality metrics.
//!
//! For every quadrature point, the physical Jacobian `Jpr = dX/dxi` is obtained from the
//! element-local nodal coordinates by sum factorization. The deformation gradient relative to
//! the target Jacobian `Jtr` is `Jpt = Jpr Jtr^{-1}`, and the kernels store
//!
//! ```text
//! E[q, e] = weight * mu(Jpt),   L[q, e] = weight,
//! weight  = metric_normal * coeff(q, e) * w[q] * det(use_det_a ? Jpr : Jtr)
//! ```
//!
//! Target Jacobians are laid out point-major as `[row][col][point][element]`, nodal
//! coordinates as `[dx][dy]([dz])[component][element]` and both outputs as `[point][element]`.
use crate::basis::DofToQuad;
use crate::coefficient::Coefficient;
use crate::kernels::contraction::{gradient_2d, gradient_3d};
use crate::kernels::resolve;
use crate::linalg::{det2, det3, inverse2, inverse3};
use crate::metrics::{Metric2d, Metric3d};
use crate::tensor::{View, ViewMut};
use crate::workspace::{tile, KernelScratch};
use itertools::izip;
use nalgebra::{Matrix2, Matrix3};
use rayon::prelude::*;

/// Everything an energy kernel reads besides the nodal coordinates.
#[derive(Debug, Clone, Copy)]
pub struct EnergyBatch<'a, M> {
    pub num_elements: usize,
    pub maps: &'a DofToQuad,
    /// Tensor-product quadrature weights, `Q1D^dim` entries.
    pub weights: &'a [f64],
    pub jtr: &'a [f64],
    pub metric: M,
    pub metric_normal: f64,
    pub coefficient: &'a Coefficient,
    /// Take the determinant of the physical Jacobian instead of the target Jacobian.
    pub use_det_a: bool,
    pub scratch: &'a KernelScratch,
}

impl<'a, M> EnergyBatch<'a, M> {
    /// The same batch evaluating a different metric.
    pub fn with_metric<N>(&self, metric: N) -> EnergyBatch<'a, N> {
        EnergyBatch {
            num_elements: self.num_elements,
            maps: self.maps,
            weights: self.weights,
            jtr: self.jtr,
            metric,
            metric_normal: self.metric_normal,
            coefficient: self.coefficient,
            use_det_a: self.use_det_a,
            scratch: self.scratch,
        }
    }
}

/// Signature shared by all energy kernels: `(batch, x, energy, measure)`.
pub type EnergyKernel<M> = fn(&EnergyBatch<'_, M>, &[f64], &mut [f64], &mut [f64]);

#[derive(Debug, Default)]
struct EnergyScratch {
    jpr: Vec<f64>,
    line: Vec<f64>,
    plane: Vec<f64>,
}

pub fn energy_2d<const D: usize, const Q: usize>(
    batch: &EnergyBatch<'_, Metric2d>,
    x: &[f64],
    energy: &mut [f64],
    measure: &mut [f64],
) {
    let d = resolve::<D>(batch.maps.ndof);
    let q = resolve::<Q>(batch.maps.nqpt);
    let nq = q * q;
    let b = View::new(batch.maps.b.as_slice(), [q, d]);
    let g = View::new(batch.maps.g.as_slice(), [q, d]);

    energy
        .par_chunks_mut(nq)
        .zip(measure.par_chunks_mut(nq))
        .zip(x.par_chunks(2 * d * d))
        .zip(batch.jtr.par_chunks(4 * nq))
        .enumerate()
        .for_each(|(e, (((energy_e, measure_e), x_e), jtr_e))| {
            batch.scratch.with(|ws: &mut EnergyScratch| {
                let EnergyScratch { jpr, line, .. } = ws;
                let line = tile(line, 2 * q.max(d));
                let jpr_tile = tile(jpr, 4 * nq);
                for (r, grad_r) in jpr_tile.chunks_exact_mut(2 * nq).enumerate() {
                    let x_r = View::new(&x_e[r * d * d..], [d, d]);
                    gradient_2d(b, g, x_r, &mut ViewMut::new(grad_r, [2, q, q]), line);
                }
                let jpr = View::new(jpr_tile, [2, nq, 2]);
                let jtr = View::new(jtr_e, [2, 2, nq]);

                let points = izip!(batch.weights, energy_e.iter_mut(), measure_e.iter_mut());
                for (qi, (&w, energy_q, measure_q)) in points.enumerate() {
                    let jtr_q = Matrix2::from_fn(|r, c| jtr[[r, c, qi]]);
                    let jpr_q = Matrix2::from_fn(|r, c| jpr[[c, qi, r]]);
                    let jpt = jpr_q * inverse2(&jtr_q);
                    let det = if batch.use_det_a { det2(&jpr_q) } else { det2(&jtr_q) };
                    let weight = batch.metric_normal * batch.coefficient.at(qi, e, nq) * w * det;
                    *energy_q = weight * batch.metric.evaluate(&jpt);
                    *measure_q = weight;
                }
            })
        });
}

pub fn energy_3d<const D: usize, const Q: usize>(
    batch: &EnergyBatch<'_, Metric3d>,
    x: &[f64],
    energy: &mut [f64],
    measure: &mut [f64],
) {
    let d = resolve::<D>(batch.maps.ndof);
    let q = resolve::<Q>(batch.maps.nqpt);
    let nq = q * q * q;
    let m = q.max(d);
    let b = View::new(batch.maps.b.as_slice(), [q, d]);
    let g = View::new(batch.maps.g.as_slice(), [q, d]);

    energy
        .par_chunks_mut(nq)
        .zip(measure.par_chunks_mut(nq))
        .zip(x.par_chunks(3 * d * d * d))
        .zip(batch.jtr.par_chunks(9 * nq))
        .enumerate()
        .for_each(|(e, (((energy_e, measure_e), x_e), jtr_e))| {
            batch.scratch.with(|ws: &mut EnergyScratch| {
                let EnergyScratch { jpr, line, plane } = ws;
                let line = tile(line, 2 * m);
                let plane = tile(plane, 3 * m * m);
                let jpr_tile = tile(jpr, 9 * nq);
                for (r, grad_r) in jpr_tile.chunks_exact_mut(3 * nq).enumerate() {
                    let x_r = View::new(&x_e[r * d * d * d..], [d, d, d]);
                    gradient_3d(b, g, x_r, &mut ViewMut::new(grad_r, [3, q, q, q]), line, plane);
                }
                let jpr = View::new(jpr_tile, [3, nq, 3]);
                let jtr = View::new(jtr_e, [3, 3, nq]);

                let points = izip!(batch.weights, energy_e.iter_mut(), measure_e.iter_mut());
                for (qi, (&w, energy_q, measure_q)) in points.enumerate() {
                    let jtr_q = Matrix3::from_fn(|r, c| jtr[[r, c, qi]]);
                    let jpr_q = Matrix3::from_fn(|r, c| jpr[[c, qi, r]]);
                    let jpt = jpr_q * inverse3(&jtr_q);
                    let det = if batch.use_det_a { det3(&jpr_q) } else { det3(&jtr_q) };
                    let weight = batch.metric_normal * batch.coefficient.at(qi, e, nq) * w * det;
                    *energy_q = weight * batch.metric.evaluate(&jpt);
                    *measure_q = weight;
                }
            })
        });
}
