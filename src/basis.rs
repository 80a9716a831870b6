//! One-dimensional basis tabulations consumed by the sum-factorized kernels.
use crate::error::{or_abort, PaError};
use nalgebra::DMatrix;
use sumfact_quadrature::univariate::{gauss, try_gauss_lobatto};
use sumfact_quadrature::{points_1d, tensor};

/// Values and derivatives of a 1D nodal basis tabulated at 1D quadrature points.
///
/// `b` and `g` are `nqpt x ndof` matrices with `b[(q, d)]` the value and `g[(q, d)]` the
/// derivative of basis function `d` at point `q`. Since `nalgebra` stores matrices in
/// column-major order, `b.as_slice()[q + nqpt * d] == b[(q, d)]`, which is the layout the
/// kernels index directly. `bt` and `gt` hold the transposes.
#[derive(Debug, Clone, PartialEq)]
pub struct DofToQuad {
    pub ndof: usize,
    pub nqpt: usize,
    pub b: DMatrix<f64>,
    pub bt: DMatrix<f64>,
    pub g: DMatrix<f64>,
    pub gt: DMatrix<f64>,
}

impl DofToQuad {
    /// Tabulates the Lagrange basis on `nodes` at the given `points`.
    pub fn try_new(nodes: &[f64], points: &[f64]) -> Result<Self, PaError> {
        if nodes.is_empty() || points.is_empty() {
            return Err(PaError::EmptyBasis);
        }
        let ndof = nodes.len();
        let nqpt = points.len();
        let b = DMatrix::from_fn(nqpt, ndof, |q, d| lagrange_value(nodes, d, points[q]));
        let g = DMatrix::from_fn(nqpt, ndof, |q, d| lagrange_derivative(nodes, d, points[q]));
        Ok(Self {
            ndof,
            nqpt,
            bt: b.transpose(),
            gt: g.transpose(),
            b,
            g,
        })
    }

    /// Same as [`try_new`](Self::try_new).
    ///
    /// # Panics
    ///
    /// Panics if `nodes` or `points` is empty.
    pub fn new(nodes: &[f64], points: &[f64]) -> Self {
        or_abort(Self::try_new(nodes, points))
    }

    /// The Lagrange basis on `d1d` Gauss-Lobatto nodes tabulated at `q1d` Gauss points.
    ///
    /// A single node is placed at the center of the reference interval.
    ///
    /// # Panics
    ///
    /// Panics if `d1d` or `q1d` is zero.
    pub fn gauss_lobatto(d1d: usize, q1d: usize) -> Self {
        let nodes = match try_gauss_lobatto(d1d) {
            Ok(rule) => points_1d(&rule),
            Err(_) => vec![0.0; d1d],
        };
        let points = if q1d > 0 { points_1d(&gauss(q1d)) } else { Vec::new() };
        Self::new(&nodes, &points)
    }
}

/// Tensor-product Gauss weights for `q1d` points per direction in the given dimension.
///
/// # Panics
///
/// Panics unless `dim` is 2 or 3.
pub fn gauss_weights(dim: usize, q1d: usize) -> Vec<f64> {
    match dim {
        2 => tensor::quadrilateral_gauss(q1d).0,
        3 => tensor::hexahedron_gauss(q1d).0,
        _ => panic!(
            "{}",
            PaError::UnsupportedDimension {
                dim,
                kernel: "tensor quadrature"
            }
        ),
    }
}

fn lagrange_value(nodes: &[f64], i: usize, x: f64) -> f64 {
    nodes
        .iter()
        .enumerate()
        .filter(|&(k, _)| k != i)
        .map(|(_, &xk)| (x - xk) / (nodes[i] - xk))
        .product()
}

fn lagrange_derivative(nodes: &[f64], i: usize, x: f64) -> f64 {
    let xi = nodes[i];
    let mut derivative = 0.0;
    for (m, &xm) in nodes.iter().enumerate().filter(|&(m, _)| m != i) {
        let mut term = 1.0 / (xi - xm);
        for (_, &xk) in nodes.iter().enumerate().filter(|&(k, _)| k != i && k != m) {
            term *= (x - xk) / (xi - xk);
        }
        derivative += term;
    }
    derivative
}
