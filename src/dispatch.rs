//! Validation and kernel selection.
//!
//! Every entry point in this module validates its configuration completely before any
//! parallel work is launched. The `try_*` functions report misuse as a [`PaError`], the
//! remaining functions panic with the error message.
//!
//! Kernels are looked up in registries keyed by the packed
//! `(dim, trial D1D, test D1D, Q1D)` tuple. A registered key selects an instance with
//! compile-time loop bounds, every other configuration runs the generic instance with
//! runtime bounds.
use crate::coefficient::Coefficient;
use crate::config::KernelConfig;
use crate::error::{check_len, or_abort, PaError};
use crate::kernels::divergence::{
    apply_2d, apply_3d, apply_transpose_2d, apply_transpose_3d, DivergenceBatch, DivergenceKernel,
};
use crate::kernels::energy::{energy_2d, energy_3d, EnergyBatch, EnergyKernel};
use crate::kernels::setup::{setup_2d, setup_3d};
use crate::kernels::smem::{smem_apply_2d, smem_apply_3d};
use crate::metrics::{Metric2d, Metric3d, QualityMetric};
use log::debug;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// A bit-packed `(dim, trial D1D, test D1D, Q1D)` tuple with 8 bits per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelKey(u32);

impl KernelKey {
    /// Packs the tuple, or returns `None` if an entry does not fit into 8 bits.
    pub fn new(dim: usize, trial_d1d: usize, test_d1d: usize, q1d: usize) -> Option<Self> {
        let fits = |n: usize| n <= 0xff;
        if fits(dim) && fits(trial_d1d) && fits(test_d1d) && fits(q1d) {
            Some(Self(
                ((dim as u32) << 24) | ((trial_d1d as u32) << 16) | ((test_d1d as u32) << 8) | q1d as u32,
            ))
        } else {
            None
        }
    }

    pub fn packed(&self) -> u32 {
        self.0
    }
}

/// Whether a kernel runs with compile-time or runtime loop bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelVariant {
    Specialized,
    Generic,
}

/// A registry of specialized kernel instances with a generic fallback.
#[derive(Debug)]
pub struct KernelTable<F> {
    specialized: FxHashMap<KernelKey, F>,
    generic: F,
}

impl<F: Copy> KernelTable<F> {
    fn new(generic: F) -> Self {
        Self {
            specialized: FxHashMap::default(),
            generic,
        }
    }

    fn register(&mut self, key: Option<KernelKey>, kernel: F) {
        if let Some(key) = key {
            self.specialized.insert(key, kernel);
        }
    }

    /// Selects the kernel for the given key.
    pub fn select(&self, key: Option<KernelKey>) -> (F, KernelVariant) {
        match key.and_then(|key| self.specialized.get(&key)) {
            Some(kernel) => (*kernel, KernelVariant::Specialized),
            None => (self.generic, KernelVariant::Generic),
        }
    }

    pub fn num_specialized(&self) -> usize {
        self.specialized.len()
    }
}

/// Registers instances of a divergence kernel for `(trial D1D, test D1D, Q1D)` triples.
macro_rules! register_divergence {
    ($table:expr, $dim:literal, $kernel:ident, [$(($tr:literal, $te:literal, $q:literal)),* $(,)?]) => {
        $(
            $table.register(
                KernelKey::new($dim, $tr, $te, $q),
                $kernel::<$tr, $te, $q> as DivergenceKernel,
            );
        )*
    };
}

/// Registers instances of an energy kernel for `(D1D, Q1D)` pairs.
macro_rules! register_energy {
    ($table:expr, $dim:literal, $kernel:ident, $metric:ty, [$(($d:literal, $q:literal)),* $(,)?]) => {
        $(
            $table.register(
                KernelKey::new($dim, $d, $d, $q),
                $kernel::<$d, $q> as EnergyKernel<$metric>,
            );
        )*
    };
}

/// Trial/test pairs of H1 trial spaces of order `p` with test spaces of order `p` or `p - 1`,
/// integrated with `p + 2` points per direction.
macro_rules! divergence_instances {
    ($table:expr, $dim:literal, $kernel:ident) => {
        register_divergence!(
            $table,
            $dim,
            $kernel,
            [(2, 1, 3), (2, 2, 3), (3, 2, 4), (3, 3, 4), (4, 3, 5), (4, 4, 5), (5, 4, 6), (5, 5, 6)]
        )
    };
}

macro_rules! energy_instances {
    ($table:expr, $dim:literal, $kernel:ident, $metric:ty) => {
        register_energy!(
            $table,
            $dim,
            $kernel,
            $metric,
            [
                (2, 2),
                (2, 3),
                (2, 4),
                (2, 5),
                (2, 6),
                (3, 3),
                (3, 4),
                (3, 5),
                (3, 6),
                (4, 4),
                (4, 5),
                (4, 6),
                (5, 5),
                (5, 6)
            ]
        )
    };
}

/// All kernel registries, built on first use.
#[derive(Debug)]
pub struct Registry {
    pub apply_2d: KernelTable<DivergenceKernel>,
    pub apply_3d: KernelTable<DivergenceKernel>,
    pub apply_transpose_2d: KernelTable<DivergenceKernel>,
    pub apply_transpose_3d: KernelTable<DivergenceKernel>,
    pub smem_apply_2d: KernelTable<DivergenceKernel>,
    pub smem_apply_3d: KernelTable<DivergenceKernel>,
    pub energy_2d: KernelTable<EnergyKernel<Metric2d>>,
    pub energy_3d: KernelTable<EnergyKernel<Metric3d>>,
}

impl Registry {
    fn build() -> Self {
        let mut registry = Self {
            apply_2d: KernelTable::new(apply_2d::<0, 0, 0> as DivergenceKernel),
            apply_3d: KernelTable::new(apply_3d::<0, 0, 0> as DivergenceKernel),
            apply_transpose_2d: KernelTable::new(apply_transpose_2d::<0, 0, 0> as DivergenceKernel),
            apply_transpose_3d: KernelTable::new(apply_transpose_3d::<0, 0, 0> as DivergenceKernel),
            smem_apply_2d: KernelTable::new(smem_apply_2d::<0, 0, 0> as DivergenceKernel),
            smem_apply_3d: KernelTable::new(smem_apply_3d::<0, 0, 0> as DivergenceKernel),
            energy_2d: KernelTable::new(energy_2d::<0, 0> as EnergyKernel<Metric2d>),
            energy_3d: KernelTable::new(energy_3d::<0, 0> as EnergyKernel<Metric3d>),
        };
        divergence_instances!(registry.apply_2d, 2, apply_2d);
        divergence_instances!(registry.apply_3d, 3, apply_3d);
        divergence_instances!(registry.apply_transpose_2d, 2, apply_transpose_2d);
        divergence_instances!(registry.apply_transpose_3d, 3, apply_transpose_3d);
        divergence_instances!(registry.smem_apply_3d, 3, smem_apply_3d);
        energy_instances!(registry.energy_2d, 2, energy_2d, Metric2d);
        energy_instances!(registry.energy_3d, 3, energy_3d, Metric3d);
        registry
    }
}

/// The process-wide kernel registry.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::build)
}

/// Direction of an operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward,
    Transpose,
}

fn check_dim(dim: usize, kernel: &'static str) -> Result<(), PaError> {
    match dim {
        2 | 3 => Ok(()),
        _ => Err(PaError::UnsupportedDimension { dim, kernel }),
    }
}

/// Stores `weights[q] * coeff * adj(J)` for every point and element into `op`.
///
/// `jacobians` and `op` use the layout `[point][row][col][element]`.
pub fn try_setup(
    dim: usize,
    q1d: usize,
    num_elements: usize,
    weights: &[f64],
    jacobians: &[f64],
    coefficient: &Coefficient,
    op: &mut [f64],
) -> Result<(), PaError> {
    check_dim(dim, "divergence setup")?;
    let coeff = coefficient.constant("divergence setup")?;
    if q1d == 0 {
        return Err(PaError::EmptyBasis);
    }
    let nq = q1d.pow(dim as u32);
    check_len("weights", weights.len(), nq)?;
    check_len("jacobians", jacobians.len(), nq * dim * dim * num_elements)?;
    check_len("op", op.len(), nq * dim * dim * num_elements)?;

    debug!(
        "divergence setup: dim = {}, Q1D = {}, {} elements, {} operator entries",
        dim,
        q1d,
        num_elements,
        op.len()
    );
    match dim {
        2 => setup_2d(q1d, num_elements, weights, jacobians, coeff, op),
        _ => setup_3d(q1d, num_elements, weights, jacobians, coeff, op),
    }
    Ok(())
}

/// Same as [`try_setup`].
///
/// # Panics
///
/// Panics if the dimension is not 2 or 3, if the coefficient is not constant or if a buffer
/// has the wrong length.
pub fn setup(
    dim: usize,
    q1d: usize,
    num_elements: usize,
    weights: &[f64],
    jacobians: &[f64],
    coefficient: &Coefficient,
    op: &mut [f64],
) {
    or_abort(try_setup(dim, q1d, num_elements, weights, jacobians, coefficient, op))
}

/// Validates a divergence action and selects its kernel.
pub fn try_select_divergence(
    config: &KernelConfig,
    dim: usize,
    action: Action,
    batch: &DivergenceBatch<'_>,
    x_len: usize,
    y_len: usize,
) -> Result<(DivergenceKernel, KernelVariant), PaError> {
    check_dim(dim, "divergence apply")?;
    let (trial, test) = (batch.trial, batch.test);
    if trial.nqpt != test.nqpt {
        return Err(PaError::QuadratureMismatch {
            trial_q1d: trial.nqpt,
            test_q1d: test.nqpt,
        });
    }
    let (tr, te, q) = (trial.ndof, test.ndof, trial.nqpt);
    config.limits.check_dofs(tr)?;
    config.limits.check_dofs(te)?;
    config.limits.check_quadrature(q)?;
    check_len("trial basis", trial.b.len(), q * tr)?;
    check_len("test basis", test.b.len(), q * te)?;

    let pow = |n: usize| n.pow(dim as u32);
    let ne = batch.num_elements;
    check_len("op", batch.op.len(), pow(q) * dim * dim * ne)?;
    let (trial_len, test_len) = (dim * pow(tr) * ne, pow(te) * ne);
    match action {
        Action::Forward => {
            check_len("x", x_len, trial_len)?;
            check_len("y", y_len, test_len)?;
        }
        Action::Transpose => {
            check_len("x", x_len, test_len)?;
            check_len("y", y_len, trial_len)?;
        }
    }

    let registry = registry();
    let tiled = config.use_shared_memory && action == Action::Forward;
    if tiled && dim == 2 {
        return Err(PaError::Unimplemented {
            kernel: "shared-memory 2D divergence apply",
        });
    }
    let table = match (dim, action, tiled) {
        (2, Action::Forward, _) => &registry.apply_2d,
        (2, Action::Transpose, _) => &registry.apply_transpose_2d,
        (_, Action::Forward, true) => &registry.smem_apply_3d,
        (_, Action::Forward, false) => &registry.apply_3d,
        (_, Action::Transpose, _) => &registry.apply_transpose_3d,
    };
    let (kernel, variant) = table.select(KernelKey::new(dim, tr, te, q));
    debug!(
        "divergence {:?} apply (dim = {}, trial D1D = {}, test D1D = {}, Q1D = {}, tiled = {}): {:?} kernel",
        action, dim, tr, te, q, tiled, variant
    );
    Ok((kernel, variant))
}

/// Accumulates the divergence action (or its transpose) of `x` into `y`.
pub fn try_divergence_apply(
    config: &KernelConfig,
    dim: usize,
    action: Action,
    batch: &DivergenceBatch<'_>,
    x: &[f64],
    y: &mut [f64],
) -> Result<(), PaError> {
    let (kernel, _) = try_select_divergence(config, dim, action, batch, x.len(), y.len())?;
    kernel(batch, x, y);
    Ok(())
}

/// Same as [`try_divergence_apply`].
///
/// # Panics
///
/// Panics on any unsupported configuration, see [`PaError`].
pub fn divergence_apply(
    config: &KernelConfig,
    dim: usize,
    action: Action,
    batch: &DivergenceBatch<'_>,
    x: &[f64],
    y: &mut [f64],
) {
    or_abort(try_divergence_apply(config, dim, action, batch, x, y))
}

fn check_energy_batch<M>(
    config: &KernelConfig,
    dim: usize,
    batch: &EnergyBatch<'_, M>,
    x: &[f64],
    energy: &[f64],
    measure: &[f64],
) -> Result<(), PaError> {
    let (d, q) = (batch.maps.ndof, batch.maps.nqpt);
    config.limits.check_dofs(d)?;
    config.limits.check_quadrature(q)?;
    check_len("basis", batch.maps.b.len(), q * d)?;
    let nq = q.pow(dim as u32);
    let ne = batch.num_elements;
    check_len("weights", batch.weights.len(), nq)?;
    check_len("jtr", batch.jtr.len(), dim * dim * nq * ne)?;
    check_len("x", x.len(), dim * d.pow(dim as u32) * ne)?;
    check_len("energy", energy.len(), nq * ne)?;
    check_len("measure", measure.len(), nq * ne)?;
    if let Coefficient::Quadrature(values) = batch.coefficient {
        check_len("coefficient", values.len(), nq * ne)?;
    }
    Ok(())
}

/// Evaluates the pointwise weighted energies and measures of the batch's metric.
///
/// The metric determines the dimension. Each output has one entry per quadrature point
/// and element, see [`energy`](crate::kernels::energy).
pub fn try_energy(
    config: &KernelConfig,
    batch: &EnergyBatch<'_, QualityMetric>,
    x: &[f64],
    energy: &mut [f64],
    measure: &mut [f64],
) -> Result<(), PaError> {
    let metric = &batch.metric;
    let dim = metric.dim();
    check_energy_batch(config, dim, batch, x, energy, measure)?;
    let key = KernelKey::new(dim, batch.maps.ndof, batch.maps.ndof, batch.maps.nqpt);
    let registry = registry();
    let variant = match metric {
        QualityMetric::Planar(metric) => {
            let (kernel, variant) = registry.energy_2d.select(key);
            kernel(&batch.with_metric(*metric), x, energy, measure);
            variant
        }
        QualityMetric::Volumetric(metric) => {
            let (kernel, variant) = registry.energy_3d.select(key);
            kernel(&batch.with_metric(*metric), x, energy, measure);
            variant
        }
    };
    debug!(
        "metric {} energy (dim = {}, D1D = {}, Q1D = {}): {:?} kernel",
        metric.id(),
        dim,
        batch.maps.ndof,
        batch.maps.nqpt,
        variant
    );
    Ok(())
}

/// Same as [`try_energy`].
///
/// # Panics
///
/// Panics on any unsupported configuration, see [`PaError`].
pub fn energy(
    config: &KernelConfig,
    batch: &EnergyBatch<'_, QualityMetric>,
    x: &[f64],
    energy: &mut [f64],
    measure: &mut [f64],
) {
    or_abort(try_energy(config, batch, x, energy, measure))
}
