use super::assembled_divergence;
use sumfact::config::KernelConfig;
use sumfact::dispatch::{registry, try_select_divergence, Action, KernelKey, KernelVariant};
use sumfact::divergence::VectorDivergenceIntegrator;
use sumfact::error::PaError;
use sumfact::kernels::divergence::DivergenceBatch;
use sumfact::workspace::KernelScratch;
use util::{assert_approx_slice_eq, assert_panics, random_vec};

/// The same operator as `assembled_divergence`, applied with the tiled kernels.
fn tiled_divergence(dim: usize, tr: usize, te: usize, q: usize, ne: usize, seed: u64) -> VectorDivergenceIntegrator {
    let integrator = assembled_divergence(dim, tr, te, q, ne, seed);
    let config = integrator.config().with_shared_memory(true);
    integrator.with_config(config)
}

#[test]
fn tiled_3d_apply_matches_plain_apply() {
    // Registered sizes, an unregistered size and a size with D = Q
    for (tr, te, q) in [(3, 2, 4), (2, 2, 2), (3, 3, 5), (4, 4, 5), (2, 1, 3)] {
        let plain = assembled_divergence(3, tr, te, q, 4, 41);
        let tiled = tiled_divergence(3, tr, te, q, 4, 41);
        let x = random_vec(plain.trial_len(), 42);

        let initial = random_vec(plain.test_len(), 43);
        let mut y_plain = initial.clone();
        let mut y_tiled = initial;
        plain.add_mult(&x, &mut y_plain);
        tiled.add_mult(&x, &mut y_tiled);
        assert_approx_slice_eq!(y_tiled, y_plain, abstol = 1e-12);
    }
}

#[test]
fn tiled_3d_transpose_uses_plain_kernel() {
    let plain = assembled_divergence(3, 3, 2, 4, 2, 51);
    let tiled = tiled_divergence(3, 3, 2, 4, 2, 51);
    let z = random_vec(plain.test_len(), 52);

    let mut y_plain = vec![0.0; plain.trial_len()];
    let mut y_tiled = vec![0.0; plain.trial_len()];
    plain.add_mult_transpose(&z, &mut y_plain);
    tiled.add_mult_transpose(&z, &mut y_tiled);
    assert_eq!(y_tiled, y_plain);
}

#[test]
fn tiled_2d_apply_is_unimplemented() {
    let plain = assembled_divergence(2, 3, 2, 4, 2, 61);
    let tiled = tiled_divergence(2, 3, 2, 4, 2, 61);
    let x = random_vec(plain.trial_len(), 62);
    let mut y = vec![0.0; plain.test_len()];

    assert!(matches!(tiled.try_add_mult(&x, &mut y), Err(PaError::Unimplemented { .. })));
    assert!(y.iter().all(|&y| y == 0.0));
    assert_panics!({
        let mut y = vec![0.0; plain.test_len()];
        tiled.add_mult(&x, &mut y)
    });

    // The transpose is not tiled, so it still runs
    let z = random_vec(plain.test_len(), 63);
    let mut w = vec![0.0; plain.trial_len()];
    assert_eq!(tiled.try_add_mult_transpose(&z, &mut w), Ok(()));
}

#[test]
fn tiled_2d_kernel_panics_when_called_directly() {
    let integrator = assembled_divergence(2, 2, 2, 3, 1, 71);
    let scratch = KernelScratch::new();
    let batch = DivergenceBatch {
        num_elements: integrator.num_elements(),
        trial: integrator.trial(),
        test: integrator.test(),
        op: integrator.pa_data(),
        scratch: &scratch,
    };
    let (kernel, variant) = registry().smem_apply_2d.select(KernelKey::new(2, 2, 2, 3));
    assert_eq!(variant, KernelVariant::Generic);
    assert_eq!(registry().smem_apply_2d.num_specialized(), 0);

    let x = random_vec(integrator.trial_len(), 72);
    assert_panics!({
        let mut y = vec![0.0; integrator.test_len()];
        kernel(&batch, &x, &mut y)
    });
}

#[test]
fn tiled_selection_reports_variant() {
    let integrator = assembled_divergence(3, 3, 2, 4, 1, 81);
    let scratch = KernelScratch::new();
    let batch = DivergenceBatch {
        num_elements: 1,
        trial: integrator.trial(),
        test: integrator.test(),
        op: integrator.pa_data(),
        scratch: &scratch,
    };
    let config = KernelConfig::default().with_shared_memory(true);
    let (x_len, y_len) = (integrator.trial_len(), integrator.test_len());

    let (_, variant) = try_select_divergence(&config, 3, Action::Forward, &batch, x_len, y_len).unwrap();
    assert_eq!(variant, KernelVariant::Specialized);

    let unregistered = assembled_divergence(3, 3, 3, 7, 1, 82);
    let batch = DivergenceBatch {
        num_elements: 1,
        trial: unregistered.trial(),
        test: unregistered.test(),
        op: unregistered.pa_data(),
        scratch: &scratch,
    };
    let (x_len, y_len) = (unregistered.trial_len(), unregistered.test_len());
    let (_, variant) = try_select_divergence(&config, 3, Action::Forward, &batch, x_len, y_len).unwrap();
    assert_eq!(variant, KernelVariant::Generic);
}
