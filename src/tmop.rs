//! Mesh quality energies evaluated in partially assembled form.
use crate::basis::DofToQuad;
use crate::coefficient::Coefficient;
use crate::config::KernelConfig;
use crate::dispatch::try_energy;
use crate::error::{check_len, or_abort, PaError};
use crate::kernels::energy::EnergyBatch;
use crate::metrics::QualityMetric;
use crate::workspace::KernelScratch;
use log::trace;
use nalgebra::DVector;

/// The energy $\int_\Omega \mu(\vec J_{pt}) \, d\Omega$ of a quality metric over a mesh of
/// tensor-product elements.
///
/// The energy holds the target Jacobians at all quadrature points, laid out point-major as
/// `[row][col][point][element]`, and evaluates the metric on the deformation gradient between
/// the targets and the current nodal positions. Every evaluation produces one weighted value per
/// quadrature point, which is reduced to a scalar by an inner product with a vector of ones.
#[derive(Debug)]
pub struct TmopEnergy {
    config: KernelConfig,
    dim: usize,
    metric: QualityMetric,
    metric_normal: f64,
    coefficient: Coefficient,
    maps: DofToQuad,
    weights: Vec<f64>,
    jtr: Vec<f64>,
    num_elements: usize,
    ones: DVector<f64>,
    scratch: KernelScratch,
}

impl TmopEnergy {
    /// Creates the energy for `num_elements` elements of dimension `dim`.
    ///
    /// `weights` are the tensor-product quadrature weights and `jtr` the target Jacobians.
    pub fn try_new(
        config: KernelConfig,
        dim: usize,
        metric: QualityMetric,
        maps: DofToQuad,
        weights: Vec<f64>,
        jtr: Vec<f64>,
        num_elements: usize,
    ) -> Result<Self, PaError> {
        match dim {
            2 => metric.as_planar().map(|_| ()),
            3 => metric.as_volumetric().map(|_| ()),
            _ => Err(PaError::UnsupportedDimension {
                dim,
                kernel: "metric energy",
            }),
        }?;
        config.limits.check_dofs(maps.ndof)?;
        config.limits.check_quadrature(maps.nqpt)?;
        let nq = maps.nqpt.pow(dim as u32);
        check_len("weights", weights.len(), nq)?;
        check_len("jtr", jtr.len(), dim * dim * nq * num_elements)?;

        Ok(Self {
            config,
            dim,
            metric,
            metric_normal: 1.0,
            coefficient: Coefficient::default(),
            maps,
            weights,
            jtr,
            num_elements,
            ones: DVector::from_element(nq * num_elements, 1.0),
            scratch: KernelScratch::new(),
        })
    }

    /// Same as [`try_new`](Self::try_new).
    ///
    /// # Panics
    ///
    /// Panics if the metric does not match the dimension, if the basis exceeds the configured
    /// limits or if a buffer has the wrong length.
    pub fn new(
        config: KernelConfig,
        dim: usize,
        metric: QualityMetric,
        maps: DofToQuad,
        weights: Vec<f64>,
        jtr: Vec<f64>,
        num_elements: usize,
    ) -> Self {
        or_abort(Self::try_new(config, dim, metric, maps, weights, jtr, num_elements))
    }

    /// Scales the metric energy by `metric_normal`.
    pub fn with_metric_normal(self, metric_normal: f64) -> Self {
        Self { metric_normal, ..self }
    }

    /// Weights the energy with a coefficient, either constant or given per point and element.
    pub fn with_coefficient(self, coefficient: impl Into<Coefficient>) -> Self {
        Self {
            coefficient: coefficient.into(),
            ..self
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> &QualityMetric {
        &self.metric
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Number of quadrature points over all elements.
    pub fn num_points(&self) -> usize {
        self.ones.len()
    }

    pub fn target_jacobians(&self) -> &[f64] {
        &self.jtr
    }

    fn try_reduce(
        &self,
        x: &[f64],
        jtr: &[f64],
        metric_normal: f64,
        coefficient: &Coefficient,
        use_det_a: bool,
    ) -> Result<(f64, f64), PaError> {
        let n = self.num_points();
        let mut energy = DVector::<f64>::zeros(n);
        let mut measure = DVector::<f64>::zeros(n);
        let batch = EnergyBatch {
            num_elements: self.num_elements,
            maps: &self.maps,
            weights: &self.weights,
            jtr,
            metric: self.metric,
            metric_normal,
            coefficient,
            use_det_a,
            scratch: &self.scratch,
        };
        try_energy(
            &self.config,
            &batch,
            x,
            energy.as_mut_slice(),
            measure.as_mut_slice(),
        )?;
        let metric_energy = energy.dot(&self.ones);
        let measure = measure.dot(&self.ones);
        trace!(
            "metric {} energy = {:e}, measure = {:e}",
            self.metric.id(),
            metric_energy,
            measure
        );
        Ok((metric_energy, measure))
    }

    /// The metric energy of the nodal positions `x`, scaled by the metric normal and the
    /// coefficient.
    ///
    /// `x` holds element-local nodal coordinates in the layout `[dx][dy]([dz])[component][element]`.
    ///
    /// # Panics
    ///
    /// Panics if `x` or a per-point coefficient has the wrong length.
    pub fn local_state_energy(&self, x: &[f64]) -> f64 {
        or_abort(self.try_reduce(x, &self.jtr, self.metric_normal, &self.coefficient, false)).0
    }

    /// The unscaled metric energy and the target measure `sum w[q] det(Jtr)` of `x`.
    ///
    /// Neither the metric normal nor the coefficient is applied. The two values are used to
    /// compute the metric normal itself.
    ///
    /// # Panics
    ///
    /// Panics if `x` has the wrong length.
    pub fn normalization_energies(&self, x: &[f64]) -> (f64, f64) {
        or_abort(self.try_reduce(x, &self.jtr, 1.0, &Coefficient::Constant(1.0), false))
    }

    /// The unscaled metric energy and the physical volume of `x` relative to caller-supplied
    /// targets `jtr`.
    ///
    /// The quadrature measure uses the physical Jacobian, so the second value is the volume of
    /// the mesh described by `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x` or `jtr` has the wrong length.
    pub fn combo_local_energy(&self, x: &[f64], jtr: &[f64]) -> (f64, f64) {
        or_abort(self.try_reduce(x, jtr, 1.0, &Coefficient::Constant(1.0), true))
    }
}
