//! Target Jacobians for size-adaptive mesh optimization.
//!
//! The targets combine an ideal element shape `W` with a discrete size field `s` given at the
//! element nodes. At every quadrature point the target is
//!
//! ```text
//! Jtr = alpha * W,   alpha = (max(s(q), s_min) / r_e)^(1 / dim),
//! ```
//!
//! where `s(q)` is the interpolated size, `s_min` the smallest nodal size of the element and
//! `r_e` the size reduction factor of element `e` for non-conforming refinement.
use crate::basis::DofToQuad;
use crate::error::{check_len, or_abort, PaError};
use crate::kernels::contraction::{interpolate_2d, interpolate_3d};
use crate::tensor::{View, ViewMut};
use crate::workspace::{tile, KernelScratch};
use nalgebra::DMatrix;
use rayon::prelude::*;

#[derive(Debug, Default)]
struct SizeScratch {
    sizes: Vec<f64>,
    line: Vec<f64>,
    plane: Vec<f64>,
}

/// Computes the target Jacobians in the point-major layout `[row][col][point][element]`.
///
/// `size_field` holds the nodal sizes as `[dx][dy]([dz])[element]` and `nc_reduce` one
/// factor per element. A positive `input_min_size` replaces the elementwise minimal size.
pub fn try_compute_size_targets(
    dim: usize,
    maps: &DofToQuad,
    ideal: &DMatrix<f64>,
    size_field: &[f64],
    nc_reduce: &[f64],
    input_min_size: f64,
) -> Result<Vec<f64>, PaError> {
    if dim != 2 && dim != 3 {
        return Err(PaError::UnsupportedDimension {
            dim,
            kernel: "size target",
        });
    }
    let d = maps.ndof;
    let q = maps.nqpt;
    if d == 0 || q == 0 {
        return Err(PaError::EmptyBasis);
    }
    if d > q {
        return Err(PaError::DofsExceedQuadrature { d1d: d, q1d: q });
    }
    check_len("ideal", ideal.len(), dim * dim)?;
    let num_elements = nc_reduce.len();
    let ndofs = d.pow(dim as u32);
    let nq = q.pow(dim as u32);
    check_len("size_field", size_field.len(), ndofs * num_elements)?;

    let b = View::new(maps.b.as_slice(), [q, d]);
    let scratch = KernelScratch::new();
    let exponent = 1.0 / dim as f64;
    let mut targets = vec![0.0; dim * dim * nq * num_elements];

    targets
        .par_chunks_mut(dim * dim * nq)
        .zip(size_field.par_chunks(ndofs))
        .zip(nc_reduce.par_iter())
        .for_each(|((jtr_e, s_e), &reduction)| {
            scratch.with(|ws: &mut SizeScratch| {
                let SizeScratch { sizes, line, plane } = ws;
                let line = tile(line, q);
                let plane = tile(plane, q * q);
                let sizes = tile(sizes, nq);
                if dim == 2 {
                    interpolate_2d(b, View::new(s_e, [d, d]), &mut ViewMut::new(&mut *sizes, [q, q]), line);
                } else {
                    let mut out = ViewMut::new(&mut *sizes, [q, q, q]);
                    interpolate_3d(b, View::new(s_e, [d, d, d]), &mut out, line, plane);
                }

                let min_size = if input_min_size > 0.0 {
                    input_min_size
                } else {
                    s_e.iter().copied().fold(f64::INFINITY, f64::min)
                };

                let mut jtr = ViewMut::new(jtr_e, [dim, dim, nq]);
                for (qi, &s) in sizes.iter().enumerate() {
                    let alpha = (s.max(min_size) / reduction).powf(exponent);
                    for c in 0..dim {
                        for r in 0..dim {
                            jtr[[r, c, qi]] = alpha * ideal[(r, c)];
                        }
                    }
                }
            })
        });

    Ok(targets)
}

/// Same as [`try_compute_size_targets`].
///
/// # Panics
///
/// Panics on an unsupported dimension, on a basis with more dofs than quadrature points per
/// direction, or on buffers of the wrong length.
pub fn compute_size_targets(
    dim: usize,
    maps: &DofToQuad,
    ideal: &DMatrix<f64>,
    size_field: &[f64],
    nc_reduce: &[f64],
    input_min_size: f64,
) -> Vec<f64> {
    or_abort(try_compute_size_targets(
        dim,
        maps,
        ideal,
        size_field,
        nc_reduce,
        input_min_size,
    ))
}
