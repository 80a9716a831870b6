//! Scalar coefficients supported by the kernels.
use crate::error::PaError;

/// A scalar coefficient multiplying an integrand.
///
/// The divergence kernels only support constant coefficients. The energy kernels additionally
/// accept one value per quadrature point and element, laid out as `[point][element]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Coefficient {
    Constant(f64),
    Quadrature(Vec<f64>),
}

impl Default for Coefficient {
    fn default() -> Self {
        Self::Constant(1.0)
    }
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl Coefficient {
    /// Returns the constant value, or an error naming the kernel family that required it.
    pub fn constant(&self, kernel: &'static str) -> Result<f64, PaError> {
        match self {
            Self::Constant(value) => Ok(*value),
            Self::Quadrature(_) => Err(PaError::UnsupportedCoefficient { kernel }),
        }
    }

    /// The coefficient at quadrature point `q` of element `e` for `nq` points per element.
    #[inline]
    pub fn at(&self, q: usize, e: usize, nq: usize) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::Quadrature(values) => values[q + nq * e],
        }
    }
}
