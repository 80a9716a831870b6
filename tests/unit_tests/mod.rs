use sumfact::basis::{gauss_weights, DofToQuad};
use sumfact::divergence::VectorDivergenceIntegrator;
use sumfact::quadrature::points_1d;
use sumfact::quadrature::univariate::gauss_lobatto;
use util::random_vec;

mod config;
mod energy;
mod setup;
mod smem;

/// Jacobians `I + 0.25 * R` with `R` uniformly random in `[-1, 1)`, in the layout
/// `[point][row][col][element]`.
pub fn perturbed_identity_jacobians(dim: usize, num_points: usize, num_elements: usize, seed: u64) -> Vec<f64> {
    let mut jacobians = random_vec(num_points * dim * dim * num_elements, seed);
    for (i, entry) in jacobians.iter_mut().enumerate() {
        *entry *= 0.25;
        let r = (i / num_points) % dim;
        let c = (i / (num_points * dim)) % dim;
        if r == c {
            *entry += 1.0;
        }
    }
    jacobians
}

/// A divergence operator between Gauss-Lobatto bases on randomly perturbed elements.
pub fn assembled_divergence(
    dim: usize,
    trial_d1d: usize,
    test_d1d: usize,
    q1d: usize,
    num_elements: usize,
    seed: u64,
) -> VectorDivergenceIntegrator {
    let trial = DofToQuad::gauss_lobatto(trial_d1d, q1d);
    let test = DofToQuad::gauss_lobatto(test_d1d, q1d);
    let weights = gauss_weights(dim, q1d);
    let jacobians = perturbed_identity_jacobians(dim, q1d.pow(dim as u32), num_elements, seed);
    let mut integrator = VectorDivergenceIntegrator::new(trial, test);
    integrator.assemble(dim, num_elements, &weights, &jacobians);
    integrator
}

/// Element-local nodal coordinates `[dx][dy]([dz])[component][element]` of Gauss-Lobatto
/// nodes mapped by `map` from the reference element. Every element receives the same nodes.
pub fn mapped_nodes(dim: usize, d1d: usize, num_elements: usize, map: impl Fn(&[f64]) -> Vec<f64>) -> Vec<f64> {
    let nodes_1d = points_1d(&gauss_lobatto(d1d));
    let ndofs = d1d.pow(dim as u32);
    let mut element = vec![0.0; dim * ndofs];
    for i in 0..ndofs {
        let xi: Vec<f64> = (0..dim)
            .map(|k| nodes_1d[(i / d1d.pow(k as u32)) % d1d])
            .collect();
        for (component, value) in map(&xi).into_iter().enumerate() {
            element[i + ndofs * component] = value;
        }
    }
    element.repeat(num_elements)
}
