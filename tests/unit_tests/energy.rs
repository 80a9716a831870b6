use super::mapped_nodes;
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;
use sumfact::basis::{gauss_weights, DofToQuad};
use sumfact::coefficient::Coefficient;
use sumfact::config::{DofQuadLimits, KernelConfig};
use sumfact::dispatch::{energy as pointwise_energy, registry, try_energy, KernelKey, KernelVariant};
use sumfact::error::PaError;
use sumfact::kernels::energy::{energy_2d, energy_3d, EnergyBatch};
use sumfact::metrics::{Metric2d, Metric3d, QualityMetric};
use sumfact::tmop::TmopEnergy;
use sumfact::workspace::KernelScratch;
use util::{assert_approx_slice_eq, assert_panics, random_vec};

/// Identity targets in the layout `[row][col][point][element]`.
fn identity_targets(dim: usize, num_points: usize, num_elements: usize) -> Vec<f64> {
    let identity: Vec<f64> = (0..dim * dim)
        .map(|i| if i % (dim + 1) == 0 { 1.0 } else { 0.0 })
        .collect();
    identity.repeat(num_points * num_elements)
}

fn tmop_energy(dim: usize, metric: impl Into<QualityMetric>, d1d: usize, q1d: usize, ne: usize) -> TmopEnergy {
    let nq = q1d.pow(dim as u32);
    TmopEnergy::new(
        KernelConfig::default(),
        dim,
        metric.into(),
        DofToQuad::gauss_lobatto(d1d, q1d),
        gauss_weights(dim, q1d),
        identity_targets(dim, nq, ne),
        ne,
    )
}

fn scaled(factor: f64) -> impl Fn(&[f64]) -> Vec<f64> {
    move |xi| xi.iter().map(|x| factor * x).collect()
}

#[test]
fn reference_geometry_with_identity_targets() {
    let ne = 3;
    let x = mapped_nodes(2, 3, ne, scaled(1.0));

    let shape = tmop_energy(2, Metric2d::Mu2, 3, 4, ne);
    assert_scalar_eq!(shape.local_state_energy(&x), 0.0, comp = abs, tol = 1e-12);

    let frobenius = tmop_energy(2, Metric2d::Mu1, 3, 4, ne);
    assert_eq!(frobenius.num_points(), 16 * ne);
    assert_scalar_eq!(frobenius.local_state_energy(&x), 8.0 * ne as f64, comp = abs, tol = 1e-12);
    let (metric_energy, measure) = frobenius.normalization_energies(&x);
    assert_scalar_eq!(metric_energy, 8.0 * ne as f64, comp = abs, tol = 1e-12);
    assert_scalar_eq!(measure, 4.0 * ne as f64, comp = abs, tol = 1e-12);
}

#[test]
fn scaled_geometry_energies() {
    let ne = 2;
    let x = mapped_nodes(2, 2, ne, scaled(2.0));
    let energy = tmop_energy(2, Metric2d::Mu1, 2, 3, ne);

    // Jpt = 2 I, so mu_1 = 8 at every point
    let (metric_energy, measure) = energy.normalization_energies(&x);
    assert_scalar_eq!(metric_energy, 32.0 * ne as f64, comp = abs, tol = 1e-12);
    assert_scalar_eq!(measure, 4.0 * ne as f64, comp = abs, tol = 1e-12);

    // The combo measure is the physical area, 16 per element
    let (metric_energy, measure) = energy.combo_local_energy(&x, energy.target_jacobians());
    assert_scalar_eq!(metric_energy, 128.0 * ne as f64, comp = abs, tol = 1e-11);
    assert_scalar_eq!(measure, 16.0 * ne as f64, comp = abs, tol = 1e-12);

    let weighted = energy.with_metric_normal(0.5).with_coefficient(2.0);
    assert_scalar_eq!(weighted.local_state_energy(&x), 32.0 * ne as f64, comp = abs, tol = 1e-12);
    // Normalization ignores both scalings
    assert_scalar_eq!(weighted.normalization_energies(&x).0, 32.0 * ne as f64, comp = abs, tol = 1e-12);
}

#[test]
fn combo_energy_uses_supplied_targets() {
    let ne = 1;
    let nq = 9;
    let x = mapped_nodes(2, 2, ne, scaled(2.0));
    let energy = tmop_energy(2, Metric2d::Mu2, 2, 3, ne);

    // Targets 2 I match the geometry exactly, so the shape metric vanishes
    let targets: Vec<f64> = identity_targets(2, nq, ne).iter().map(|j| 2.0 * j).collect();
    let (metric_energy, measure) = energy.combo_local_energy(&x, &targets);
    assert_scalar_eq!(metric_energy, 0.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(measure, 16.0, comp = abs, tol = 1e-12);

    assert_panics!(energy.combo_local_energy(&x, &targets[1..]));
}

#[test]
fn stretched_hexahedra() {
    let ne = 2;
    let x = mapped_nodes(3, 2, ne, |xi| vec![2.0 * xi[0], xi[1], xi[2]]);
    let energy = tmop_energy(3, Metric3d::Mu302, 2, 3, ne);
    assert_scalar_eq!(energy.local_state_energy(&x), 4.0 * ne as f64, comp = abs, tol = 1e-12);
    let (_, measure) = energy.normalization_energies(&x);
    assert_scalar_eq!(measure, 8.0 * ne as f64, comp = abs, tol = 1e-12);
    let (_, volume) = energy.combo_local_energy(&x, energy.target_jacobians());
    assert_scalar_eq!(volume, 16.0 * ne as f64, comp = abs, tol = 1e-12);

    let untangled = tmop_energy(3, Metric3d::Mu315, 2, 3, ne);
    assert_scalar_eq!(untangled.local_state_energy(&x), 8.0 * ne as f64, comp = abs, tol = 1e-12);
}

#[test]
fn quadrature_coefficient_weights_each_point() {
    let (ne, q1d) = (3, 3);
    let nq = q1d * q1d;
    let x = mapped_nodes(2, 2, ne, scaled(1.0));
    let values: Vec<f64> = (0..nq * ne).map(|i| (i / nq + 1) as f64).collect();
    let energy = tmop_energy(2, Metric2d::Mu1, 2, q1d, ne).with_coefficient(Coefficient::Quadrature(values));
    // mu_1 = 2 on reference elements of area 4
    assert_scalar_eq!(energy.local_state_energy(&x), 8.0 * (1.0 + 2.0 + 3.0), comp = abs, tol = 1e-12);

    let short = tmop_energy(2, Metric2d::Mu1, 2, q1d, ne).with_coefficient(Coefficient::Quadrature(vec![1.0; nq]));
    assert_panics!(short.local_state_energy(&x));
}

#[test]
fn energy_enforces_configured_limits() {
    let maps = DofToQuad::gauss_lobatto(3, 4);
    let weights = gauss_weights(2, 4);
    let targets = identity_targets(2, 16, 1);
    let new_energy = |max_d1d, max_q1d| {
        TmopEnergy::try_new(
            KernelConfig::default().with_limits(DofQuadLimits { max_d1d, max_q1d }),
            2,
            Metric2d::Mu2.into(),
            maps.clone(),
            weights.clone(),
            targets.clone(),
            1,
        )
    };
    assert!(matches!(
        new_energy(2, 14),
        Err(PaError::DofLimitExceeded { d1d: 3, max_d1d: 2 })
    ));
    assert!(matches!(
        new_energy(14, 3),
        Err(PaError::QuadLimitExceeded { q1d: 4, max_q1d: 3 })
    ));
    assert!(new_energy(3, 4).is_ok());
    assert_panics!(TmopEnergy::new(
        KernelConfig::default().with_limits(DofQuadLimits { max_d1d: 14, max_q1d: 3 }),
        2,
        Metric2d::Mu2.into(),
        maps.clone(),
        weights.clone(),
        targets.clone(),
        1
    ));

    let coefficient = Coefficient::Constant(1.0);
    let scratch = KernelScratch::new();
    let batch = EnergyBatch {
        num_elements: 1,
        maps: &maps,
        weights: &weights,
        jtr: &targets,
        metric: QualityMetric::from(Metric2d::Mu2),
        metric_normal: 1.0,
        coefficient: &coefficient,
        use_det_a: false,
        scratch: &scratch,
    };
    let x = mapped_nodes(2, 3, 1, scaled(1.0));
    let (mut energy, mut measure) = (vec![0.0; 16], vec![0.0; 16]);
    let small = KernelConfig::default().with_limits(DofQuadLimits { max_d1d: 2, max_q1d: 14 });
    assert_eq!(
        try_energy(&small, &batch, &x, &mut energy, &mut measure),
        Err(PaError::DofLimitExceeded { d1d: 3, max_d1d: 2 })
    );
    assert_panics!({
        let (mut energy, mut measure) = (vec![0.0; 16], vec![0.0; 16]);
        pointwise_energy(&small, &batch, &x, &mut energy, &mut measure)
    });
    assert_eq!(
        try_energy(&KernelConfig::default(), &batch, &x, &mut energy, &mut measure),
        Ok(())
    );
    // Reference elements have unit Jacobians and measure 4
    assert_scalar_eq!(measure.iter().sum::<f64>(), 4.0, comp = abs, tol = 1e-12);
}

#[test]
fn energy_rejects_invalid_configurations() {
    let maps = DofToQuad::gauss_lobatto(2, 3);
    let weights = gauss_weights(2, 3);
    let targets = identity_targets(2, 9, 1);

    let mismatch = TmopEnergy::try_new(
        KernelConfig::default(),
        3,
        Metric2d::Mu2.into(),
        maps.clone(),
        weights.clone(),
        targets.clone(),
        1,
    );
    assert!(matches!(mismatch, Err(PaError::MetricDimensionMismatch { id: 2, .. })));
    assert_panics!(TmopEnergy::new(
        KernelConfig::default(),
        2,
        Metric3d::Mu302.into(),
        maps.clone(),
        weights.clone(),
        targets.clone(),
        1
    ));

    let wrong_targets = TmopEnergy::try_new(
        KernelConfig::default(),
        2,
        Metric2d::Mu2.into(),
        maps.clone(),
        weights.clone(),
        targets[..8].to_vec(),
        1,
    );
    assert!(matches!(wrong_targets, Err(PaError::BufferSize { buffer: "jtr", .. })));

    let energy = tmop_energy(2, Metric2d::Mu2, 2, 3, 1);
    assert_panics!(energy.local_state_energy(&[0.0; 3]));
}

#[test]
fn specialized_energy_kernels_match_generic_kernels() {
    let scratch = KernelScratch::new();
    let coefficient = Coefficient::Constant(1.25);
    for dim in [2, 3] {
        let (d1d, q1d, ne): (usize, usize, usize) = (3, 4, 3);
        let nq = q1d.pow(dim as u32);
        let maps = DofToQuad::gauss_lobatto(d1d, q1d);
        let weights = gauss_weights(dim, q1d);
        let jtr: Vec<f64> = identity_targets(dim, nq, ne)
            .iter()
            .zip(random_vec(dim * dim * nq * ne, 91))
            .map(|(j, r)| j + 0.2 * r)
            .collect();
        let mut x = mapped_nodes(dim, d1d, ne, scaled(1.0));
        for (x, r) in x.iter_mut().zip(random_vec(dim * d1d.pow(dim as u32) * ne, 92)) {
            *x += 0.05 * r;
        }
        let batch = EnergyBatch {
            num_elements: ne,
            maps: &maps,
            weights: &weights,
            jtr: &jtr,
            metric: (),
            metric_normal: 0.7,
            coefficient: &coefficient,
            use_det_a: false,
            scratch: &scratch,
        };

        let key = KernelKey::new(dim, d1d, d1d, q1d);
        let mut specialized = (vec![0.0; nq * ne], vec![0.0; nq * ne]);
        let mut generic = (vec![0.0; nq * ne], vec![0.0; nq * ne]);
        if dim == 2 {
            let (kernel, variant) = registry().energy_2d.select(key);
            assert_eq!(variant, KernelVariant::Specialized);
            let batch = batch.with_metric(Metric2d::Mu80 { weights: [0.4, 0.6] });
            kernel(&batch, &x, &mut specialized.0, &mut specialized.1);
            energy_2d::<0, 0>(&batch, &x, &mut generic.0, &mut generic.1);
        } else {
            let (kernel, variant) = registry().energy_3d.select(key);
            assert_eq!(variant, KernelVariant::Specialized);
            let batch = batch.with_metric(Metric3d::Mu338 { weights: [0.4, 0.6] });
            kernel(&batch, &x, &mut specialized.0, &mut specialized.1);
            energy_3d::<0, 0>(&batch, &x, &mut generic.0, &mut generic.1);
        }
        assert_approx_slice_eq!(specialized.0, generic.0, abstol = 1e-12);
        assert_approx_slice_eq!(specialized.1, generic.1, abstol = 1e-14);
        assert!(specialized.0.iter().all(|e| e.is_finite()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn energy_is_translation_invariant(
        (d1d, q1d) in sumfact::proptest::energy_sizes(4),
        shift in sumfact::proptest::unit_values(2),
        seed in 0..1000u64,
    ) {
        let ne = 2;
        let mut x = mapped_nodes(2, d1d, ne, scaled(1.0));
        for (x, r) in x.iter_mut().zip(random_vec(2 * d1d * d1d * ne, seed)) {
            *x += 0.05 * r;
        }
        let ndofs = d1d * d1d;
        let shifted: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, x)| x + shift[(i / ndofs) % 2])
            .collect();

        let energy = tmop_energy(2, Metric2d::Mu7, d1d, q1d, ne);
        let original = energy.local_state_energy(&x);
        let translated = energy.local_state_energy(&shifted);
        prop_assert!((original - translated).abs() <= 1e-10 * original.abs().max(1.0));
    }
}
