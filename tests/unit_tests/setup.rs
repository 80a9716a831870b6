use super::perturbed_identity_jacobians;
use matrixcompare::assert_scalar_eq;
use sumfact::basis::gauss_weights;
use sumfact::coefficient::Coefficient;
use sumfact::dispatch::{setup, try_setup};
use sumfact::error::PaError;
use sumfact::tensor::View;
use util::{assert_approx_slice_eq, assert_panics};

/// Repeats the column-major matrix `j` at `num_points` points of `num_elements` elements in
/// the layout `[point][row][col][element]`.
fn constant_jacobians(dim: usize, j: &[f64], num_points: usize, num_elements: usize) -> Vec<f64> {
    let mut result = Vec::new();
    for _ in 0..num_elements {
        for entry in j.iter().take(dim * dim) {
            result.extend(std::iter::repeat(*entry).take(num_points));
        }
    }
    result
}

#[test]
fn setup_2d_stores_weighted_adjugate() {
    let (q1d, ne) = (3, 2);
    let nq = q1d * q1d;
    let weights = gauss_weights(2, q1d);
    // J = [2 1; 0 3], column-major
    let jacobians = constant_jacobians(2, &[2.0, 0.0, 1.0, 3.0], nq, ne);
    let mut op = vec![0.0; nq * 4 * ne];
    setup(2, q1d, ne, &weights, &jacobians, &Coefficient::Constant(1.5), &mut op);

    let op = View::new(&op, [nq, 2, 2, ne]);
    for e in 0..ne {
        for (q, &w) in weights.iter().enumerate() {
            assert_scalar_eq!(op[[q, 0, 0, e]], 1.5 * w * 3.0, comp = abs, tol = 1e-14);
            assert_scalar_eq!(op[[q, 0, 1, e]], 1.5 * w * -1.0, comp = abs, tol = 1e-14);
            assert_scalar_eq!(op[[q, 1, 0, e]], 0.0, comp = abs, tol = 1e-14);
            assert_scalar_eq!(op[[q, 1, 1, e]], 1.5 * w * 2.0, comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn setup_3d_stores_weighted_adjugate() {
    let (q1d, ne) = (2, 3);
    let nq = q1d * q1d * q1d;
    let weights = gauss_weights(3, q1d);
    // J = [1 2 0; 0 1 0; 3 0 2], column-major
    let j = [1.0, 0.0, 3.0, 2.0, 1.0, 0.0, 0.0, 0.0, 2.0];
    let adj = [[2.0, -4.0, 0.0], [0.0, 2.0, 0.0], [-3.0, 6.0, 1.0]];
    let jacobians = constant_jacobians(3, &j, nq, ne);
    let mut op = vec![0.0; nq * 9 * ne];
    setup(3, q1d, ne, &weights, &jacobians, &Coefficient::Constant(1.0), &mut op);

    let op = View::new(&op, [nq, 3, 3, ne]);
    for e in 0..ne {
        for (q, &w) in weights.iter().enumerate() {
            for r in 0..3 {
                for c in 0..3 {
                    assert_scalar_eq!(op[[q, r, c, e]], w * adj[r][c], comp = abs, tol = 1e-14);
                }
            }
        }
    }
}

#[test]
fn setup_is_linear_in_coefficient() {
    for dim in [2, 3] {
        let (q1d, ne): (usize, usize) = (3, 4);
        let nq = q1d.pow(dim as u32);
        let weights = gauss_weights(dim, q1d);
        let jacobians = perturbed_identity_jacobians(dim, nq, ne, 7);
        let mut op = vec![0.0; jacobians.len()];
        let mut scaled = vec![0.0; jacobians.len()];
        setup(dim, q1d, ne, &weights, &jacobians, &Coefficient::Constant(1.0), &mut op);
        setup(dim, q1d, ne, &weights, &jacobians, &Coefficient::Constant(-2.5), &mut scaled);

        let expected: Vec<f64> = op.iter().map(|x| -2.5 * x).collect();
        assert_approx_slice_eq!(scaled, expected, abstol = 1e-14);
    }
}

#[test]
fn setup_rejects_unsupported_configurations() {
    let weights = gauss_weights(2, 2);
    let jacobians = perturbed_identity_jacobians(2, 4, 1, 1);
    let mut op = vec![0.0; 16];

    assert_eq!(
        try_setup(1, 2, 1, &weights, &jacobians, &Coefficient::default(), &mut op),
        Err(PaError::UnsupportedDimension {
            dim: 1,
            kernel: "divergence setup"
        })
    );
    assert_eq!(
        try_setup(2, 2, 1, &weights, &jacobians, &Coefficient::Quadrature(vec![1.0; 4]), &mut op),
        Err(PaError::UnsupportedCoefficient {
            kernel: "divergence setup"
        })
    );
    assert_eq!(
        try_setup(2, 2, 1, &weights, &jacobians, &Coefficient::default(), &mut op[..12]),
        Err(PaError::BufferSize {
            buffer: "op",
            expected: 16,
            actual: 12
        })
    );

    assert_panics!({
        let mut op = vec![0.0; 16];
        setup(1, 2, 1, &weights, &jacobians, &Coefficient::default(), &mut op)
    });
}
