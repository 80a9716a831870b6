//! The vector divergence operator in partially assembled form.
use crate::basis::DofToQuad;
use crate::coefficient::Coefficient;
use crate::config::KernelConfig;
use crate::dispatch::{try_divergence_apply, try_setup, Action};
use crate::error::{or_abort, PaError};
use crate::kernels::divergence::DivergenceBatch;
use crate::workspace::KernelScratch;
use log::debug;

/// Partially assembled form of $(q \nabla \cdot \vec u, v)$ for a vector-valued trial field
/// $\vec u$ and a scalar test field $v$ on tensor-product elements.
///
/// Assembly stores, per element and quadrature point, the quadrature-weighted adjugate of the
/// element Jacobian scaled by the coefficient $q$. The operator actions then only need the 1D
/// bases of the trial and test spaces.
///
/// Trial vectors are element-local with the layout `[dx][dy]([dz])[component][element]`,
/// test vectors with `[dx][dy]([dz])[element]`.
#[derive(Debug)]
pub struct VectorDivergenceIntegrator {
    trial: DofToQuad,
    test: DofToQuad,
    coefficient: Coefficient,
    config: KernelConfig,
    dim: usize,
    num_elements: usize,
    pa_data: Vec<f64>,
    scratch: KernelScratch,
}

impl VectorDivergenceIntegrator {
    pub fn new(trial: DofToQuad, test: DofToQuad) -> Self {
        Self {
            trial,
            test,
            coefficient: Coefficient::default(),
            config: KernelConfig::default(),
            dim: 0,
            num_elements: 0,
            pa_data: Vec::new(),
            scratch: KernelScratch::new(),
        }
    }

    pub fn with_coefficient(self, coefficient: impl Into<Coefficient>) -> Self {
        Self {
            coefficient: coefficient.into(),
            ..self
        }
    }

    pub fn with_config(self, config: KernelConfig) -> Self {
        Self { config, ..self }
    }

    /// Computes the operator tensor from the element Jacobians.
    ///
    /// `weights` are the tensor-product quadrature weights and `jacobians` the element
    /// Jacobians in the layout `[point][row][col][element]`. Any previously assembled data is
    /// replaced.
    pub fn try_assemble(
        &mut self,
        dim: usize,
        num_elements: usize,
        weights: &[f64],
        jacobians: &[f64],
    ) -> Result<(), PaError> {
        if self.trial.nqpt != self.test.nqpt {
            return Err(PaError::QuadratureMismatch {
                trial_q1d: self.trial.nqpt,
                test_q1d: self.test.nqpt,
            });
        }
        let limits = &self.config.limits;
        limits.check_dofs(self.trial.ndof)?;
        limits.check_dofs(self.test.ndof)?;
        limits.check_quadrature(self.trial.nqpt)?;

        let q1d = self.trial.nqpt;
        let mut pa_data = vec![0.0; q1d.pow(dim as u32) * dim * dim * num_elements];
        try_setup(dim, q1d, num_elements, weights, jacobians, &self.coefficient, &mut pa_data)?;
        debug!(
            "assembled vector divergence: dim = {}, trial D1D = {}, test D1D = {}, Q1D = {}, {} elements",
            dim, self.trial.ndof, self.test.ndof, q1d, num_elements
        );

        self.dim = dim;
        self.num_elements = num_elements;
        self.pa_data = pa_data;
        Ok(())
    }

    /// Same as [`try_assemble`](Self::try_assemble).
    ///
    /// # Panics
    ///
    /// Panics if the configuration is not supported, see [`PaError`].
    pub fn assemble(&mut self, dim: usize, num_elements: usize, weights: &[f64], jacobians: &[f64]) {
        or_abort(self.try_assemble(dim, num_elements, weights, jacobians))
    }

    fn batch(&self) -> DivergenceBatch<'_> {
        DivergenceBatch {
            num_elements: self.num_elements,
            trial: &self.trial,
            test: &self.test,
            op: &self.pa_data,
            scratch: &self.scratch,
        }
    }

    fn check_assembled(&self) -> Result<(), PaError> {
        if self.dim == 0 {
            Err(PaError::NotAssembled {
                operator: "vector divergence operator",
            })
        } else {
            Ok(())
        }
    }

    /// Accumulates the operator action on the trial vector `x` into the test vector `y`.
    pub fn try_add_mult(&self, x: &[f64], y: &mut [f64]) -> Result<(), PaError> {
        self.check_assembled()?;
        try_divergence_apply(&self.config, self.dim, Action::Forward, &self.batch(), x, y)
    }

    /// Accumulates the operator action on the trial vector `x` into the test vector `y`.
    ///
    /// # Panics
    ///
    /// Panics if the operator has not been assembled, if the buffers have the wrong length, if the
    /// configuration was tightened below the assembled basis sizes or if the shared-memory
    /// variant was requested in 2D.
    pub fn add_mult(&self, x: &[f64], y: &mut [f64]) {
        or_abort(self.try_add_mult(x, y))
    }

    /// Accumulates the transposed action on the test vector `x` into the trial vector `y`.
    pub fn try_add_mult_transpose(&self, x: &[f64], y: &mut [f64]) -> Result<(), PaError> {
        self.check_assembled()?;
        try_divergence_apply(&self.config, self.dim, Action::Transpose, &self.batch(), x, y)
    }

    /// Accumulates the transposed action on the test vector `x` into the trial vector `y`.
    ///
    /// # Panics
    ///
    /// Panics if the operator has not been assembled or if the buffers have the wrong length.
    pub fn add_mult_transpose(&self, x: &[f64], y: &mut [f64]) {
        or_abort(self.try_add_mult_transpose(x, y))
    }

    /// Overwrites `y` with the operator action on `x`.
    pub fn mult(&self, x: &[f64], y: &mut [f64]) {
        y.fill(0.0);
        self.add_mult(x, y);
    }

    /// Overwrites `y` with the transposed action on `x`.
    pub fn mult_transpose(&self, x: &[f64], y: &mut [f64]) {
        y.fill(0.0);
        self.add_mult_transpose(x, y);
    }

    /// The operator tensor in the layout `[point][row][col][element]`.
    pub fn pa_data(&self) -> &[f64] {
        &self.pa_data
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn trial(&self) -> &DofToQuad {
        &self.trial
    }

    pub fn test(&self) -> &DofToQuad {
        &self.test
    }

    pub fn coefficient(&self) -> &Coefficient {
        &self.coefficient
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Length of an element-local trial vector.
    pub fn trial_len(&self) -> usize {
        self.dim * self.trial.ndof.pow(self.dim as u32) * self.num_elements
    }

    /// Length of an element-local test vector.
    pub fn test_len(&self) -> usize {
        self.test.ndof.pow(self.dim as u32) * self.num_elements
    }
}
