use matrixcompare::assert_scalar_eq;
use sumfact_quadrature::integrate;
use sumfact_quadrature::tensor::{
    hexahedron_gauss, hexahedron_gauss_lobatto, quadrilateral_gauss, quadrilateral_gauss_lobatto,
};
use sumfact_quadrature::univariate::gauss;

fn monomial_integral_1d(alpha: i32) -> f64 {
    (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0)
}

#[test]
fn quadrilateral_gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=12 {
        // Degree that the rule can exactly integrate *along each dimension*
        let expected_polynomial_degree = 2 * n - 1;
        let rule = quadrilateral_gauss(n);

        assert_eq!(rule.0.len(), n * n);
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            for beta in 0..=expected_polynomial_degree as i32 {
                let expected = monomial_integral_1d(alpha) * monomial_integral_1d(beta);
                let estimated = integrate(&rule, |&[x, y]| x.powi(alpha) * y.powi(beta));
                assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-13);
            }
        }
    }
}

#[test]
fn hexahedral_gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=6 {
        let expected_polynomial_degree = 2 * n - 1;
        let rule = hexahedron_gauss(n);

        assert_eq!(rule.0.len(), n * n * n);
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            for beta in 0..=expected_polynomial_degree as i32 {
                for gamma in 0..=expected_polynomial_degree as i32 {
                    let expected =
                        monomial_integral_1d(alpha) * monomial_integral_1d(beta) * monomial_integral_1d(gamma);
                    let estimated =
                        integrate(&rule, |&[x, y, z]| x.powi(alpha) * y.powi(beta) * z.powi(gamma));
                    assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-13);
                }
            }
        }
    }
}

#[test]
fn tensor_rules_are_ordered_with_x_fastest() {
    let n = 3;
    let (_, points1d) = gauss(n);
    let (_, points2d) = quadrilateral_gauss(n);
    let (_, points3d) = hexahedron_gauss(n);

    for qy in 0..n {
        for qx in 0..n {
            assert_eq!(points2d[qx + n * qy], [points1d[qx][0], points1d[qy][0]]);
        }
    }

    for qz in 0..n {
        for qy in 0..n {
            for qx in 0..n {
                let expected = [points1d[qx][0], points1d[qy][0], points1d[qz][0]];
                assert_eq!(points3d[qx + n * (qy + n * qz)], expected);
            }
        }
    }
}

#[test]
fn gauss_lobatto_tensor_rules_integrate_volume() {
    for n in 2..=6 {
        let area: f64 = quadrilateral_gauss_lobatto(n).0.iter().sum();
        let volume: f64 = hexahedron_gauss_lobatto(n).0.iter().sum();
        assert_scalar_eq!(area, 4.0, comp = abs, tol = 1e-13);
        assert_scalar_eq!(volume, 8.0, comp = abs, tol = 1e-13);
    }
}
