//! Kernel configuration.
use crate::error::PaError;
use serde::{Deserialize, Serialize};

/// Maximum numbers of degrees of freedom and quadrature points per direction.
///
/// The limits bound the size of per-element scratch tiles. Kernels refuse to run on bases
/// exceeding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DofQuadLimits {
    pub max_d1d: usize,
    pub max_q1d: usize,
}

impl Default for DofQuadLimits {
    fn default() -> Self {
        Self {
            max_d1d: 14,
            max_q1d: 14,
        }
    }
}

impl DofQuadLimits {
    pub fn check_dofs(&self, d1d: usize) -> Result<(), PaError> {
        if d1d == 0 {
            Err(PaError::EmptyBasis)
        } else if d1d > self.max_d1d {
            Err(PaError::DofLimitExceeded {
                d1d,
                max_d1d: self.max_d1d,
            })
        } else {
            Ok(())
        }
    }

    pub fn check_quadrature(&self, q1d: usize) -> Result<(), PaError> {
        if q1d == 0 {
            Err(PaError::EmptyBasis)
        } else if q1d > self.max_q1d {
            Err(PaError::QuadLimitExceeded {
                q1d,
                max_q1d: self.max_q1d,
            })
        } else {
            Ok(())
        }
    }
}

/// Configuration shared by the operator integrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub limits: DofQuadLimits,
    /// Route the forward divergence action through the shared-memory tiled kernel.
    ///
    /// Only the 3D tiled kernel exists; requesting it in 2D is a configuration error.
    pub use_shared_memory: bool,
}

impl KernelConfig {
    pub fn with_limits(self, limits: DofQuadLimits) -> Self {
        Self { limits, ..self }
    }

    pub fn with_shared_memory(self, use_shared_memory: bool) -> Self {
        Self {
            use_shared_memory,
            ..self
        }
    }
}
