//! Element Jacobians at tensor-product quadrature points.
use crate::basis::DofToQuad;
use crate::error::{check_len, or_abort, PaError};
use crate::kernels::contraction::{gradient_2d, gradient_3d};
use crate::tensor::{View, ViewMut};
use crate::workspace::{tile, KernelScratch};
use log::trace;
use rayon::prelude::*;

#[derive(Debug, Default)]
struct GeometryScratch {
    grad: Vec<f64>,
    line: Vec<f64>,
    plane: Vec<f64>,
}

/// Computes the Jacobians `J(q, r, c) = dx_r / dxi_c` of all elements.
///
/// `nodes` holds the element-local nodal coordinates in the layout
/// `[dx][dy]([dz])[component][element]`, interpolated with the basis `maps`. The result uses
/// the layout `[point][row][col][element]` consumed by the divergence setup.
pub fn try_compute_jacobians(
    dim: usize,
    maps: &DofToQuad,
    num_elements: usize,
    nodes: &[f64],
) -> Result<Vec<f64>, PaError> {
    if dim != 2 && dim != 3 {
        return Err(PaError::UnsupportedDimension {
            dim,
            kernel: "geometric factor",
        });
    }
    if maps.ndof == 0 || maps.nqpt == 0 {
        return Err(PaError::EmptyBasis);
    }
    let d = maps.ndof;
    let q = maps.nqpt;
    let ndofs = d.pow(dim as u32);
    let nq = q.pow(dim as u32);
    check_len("nodes", nodes.len(), dim * ndofs * num_elements)?;

    let b = View::new(maps.b.as_slice(), [q, d]);
    let g = View::new(maps.g.as_slice(), [q, d]);
    let m = q.max(d);
    let scratch = KernelScratch::new();
    let mut jacobians = vec![0.0; nq * dim * dim * num_elements];
    trace!("computing {} Jacobians per element for {} elements", nq, num_elements);

    jacobians
        .par_chunks_mut(nq * dim * dim)
        .zip(nodes.par_chunks(dim * ndofs))
        .for_each(|(j_e, x_e)| {
            scratch.with(|ws: &mut GeometryScratch| {
                let GeometryScratch { grad, line, plane } = ws;
                let line = tile(line, 2 * m);
                let plane = tile(plane, 3 * m * m);
                let grad = tile(grad, dim * nq);
                let mut j_e = ViewMut::new(j_e, [nq, dim, dim]);
                for r in 0..dim {
                    let x_r = &x_e[r * ndofs..(r + 1) * ndofs];
                    if dim == 2 {
                        gradient_2d(b, g, View::new(x_r, [d, d]), &mut ViewMut::new(&mut *grad, [2, q, q]), line);
                    } else {
                        let mut grad = ViewMut::new(&mut *grad, [3, q, q, q]);
                        gradient_3d(b, g, View::new(x_r, [d, d, d]), &mut grad, line, plane);
                    }
                    let grad = View::new(&*grad, [dim, nq]);
                    for qi in 0..nq {
                        for c in 0..dim {
                            j_e[[qi, r, c]] = grad[[c, qi]];
                        }
                    }
                }
            })
        });

    Ok(jacobians)
}

/// Same as [`try_compute_jacobians`].
///
/// # Panics
///
/// Panics if the dimension is not 2 or 3, if the basis is empty or if `nodes` has the wrong
/// length.
pub fn compute_jacobians(dim: usize, maps: &DofToQuad, num_elements: usize, nodes: &[f64]) -> Vec<f64> {
    or_abort(try_compute_jacobians(dim, maps, num_elements, nodes))
}

/// Reorders Jacobians from `[point][row][col][element]` to `[row][col][point][element]`.
///
/// The point-major layout stores each Jacobian as a contiguous column-major matrix and is the
/// layout of target Jacobians in the energy kernels.
pub fn to_point_major(dim: usize, num_points: usize, jacobians: &[f64]) -> Vec<f64> {
    let stride = num_points * dim * dim;
    let mut result = vec![0.0; jacobians.len()];
    for (out_e, j_e) in result.chunks_exact_mut(stride).zip(jacobians.chunks_exact(stride)) {
        let j = View::new(j_e, [num_points, dim, dim]);
        let mut out = ViewMut::new(out_e, [dim, dim, num_points]);
        for qi in 0..num_points {
            for c in 0..dim {
                for r in 0..dim {
                    out[[r, c, qi]] = j[[qi, r, c]];
                }
            }
        }
    }
    result
}
