//! Mesh quality metrics evaluated on the local deformation gradient.
//!
//! A metric $\mu(\vec T)$ measures the deviation of the deformation gradient
//! $\vec T = \vec J_{pr} \vec J_{tr}^{-1}$ from an ideal target. The catalog consists of the
//! metrics commonly used for mesh optimization, all expressed through rotation-invariant
//! quantities of $\vec T$. Metrics are identified by the same integer identifiers as the
//! literature on target-matrix optimization.
use crate::error::PaError;
use crate::linalg::{det2, det3};
use nalgebra::{Matrix2, Matrix3};
use serde::{Deserialize, Serialize};

/// Invariants of a `2x2` matrix $\vec J$.
///
/// $I_1 = |\vec J|_F^2$, $\bar I_2 = |\det \vec J|$, $I_2 = \det(\vec J)^2$ and
/// $\bar I_1 = I_1 / \bar I_2$.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invariants2d {
    pub i1: f64,
    pub i1b: f64,
    pub i2: f64,
    pub i2b: f64,
}

impl Invariants2d {
    pub fn new(j: &Matrix2<f64>) -> Self {
        let i1 = j.norm_squared();
        let det = det2(j);
        let i2b = det.abs();
        Self {
            i1,
            i1b: i1 / i2b,
            i2: det * det,
            i2b,
        }
    }
}

/// Invariants of a `3x3` matrix $\vec J$.
///
/// $I_1 = |\vec J|_F^2$, $I_2 = \frac{1}{2}(I_1^2 - |\vec J^T \vec J|_F^2)$,
/// $\bar I_3 = |\det \vec J|$, $I_3 = \det(\vec J)^2$,
/// $\bar I_1 = I_1 \bar I_3^{-2/3}$ and $\bar I_2 = I_2 \bar I_3^{-4/3}$.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invariants3d {
    pub i1: f64,
    pub i1b: f64,
    pub i2: f64,
    pub i2b: f64,
    pub i3: f64,
    pub i3b: f64,
}

impl Invariants3d {
    pub fn new(j: &Matrix3<f64>) -> Self {
        let i1 = j.norm_squared();
        let c = j.transpose() * j;
        let i2 = 0.5 * (i1 * i1 - c.norm_squared());
        let det = det3(j);
        let i3b = det.abs();
        Self {
            i1,
            i1b: i1 * i3b.powf(-2.0 / 3.0),
            i2,
            i2b: i2 * i3b.powf(-4.0 / 3.0),
            i3: det * det,
            i3b,
        }
    }
}

/// Quality metrics for planar elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metric2d {
    /// $\mu_1 = I_1$.
    Mu1,
    /// $\mu_2 = \frac{1}{2} \bar I_1 - 1$.
    Mu2,
    /// $\mu_7 = I_1 (1 + 1 / I_2) - 4$.
    Mu7,
    /// $\mu_{56} = \frac{1}{2}(\bar I_2 + 1 / \bar I_2) - 1$.
    Mu56,
    /// $\mu_{77} = \frac{1}{2}(\bar I_2^2 + \bar I_2^{-2} - 2)$.
    Mu77,
    /// $\mu_{80} = w_0 \mu_2 + w_1 \mu_{77}$.
    Mu80 { weights: [f64; 2] },
    /// $\mu_{94} = w_0 \mu_2 + w_1 \mu_{56}$.
    Mu94 { weights: [f64; 2] },
}

impl Metric2d {
    pub fn id(&self) -> u32 {
        match self {
            Self::Mu1 => 1,
            Self::Mu2 => 2,
            Self::Mu7 => 7,
            Self::Mu56 => 56,
            Self::Mu77 => 77,
            Self::Mu80 { .. } => 80,
            Self::Mu94 { .. } => 94,
        }
    }

    #[inline]
    pub fn evaluate(&self, t: &Matrix2<f64>) -> f64 {
        let ie = Invariants2d::new(t);
        let mu2 = || 0.5 * ie.i1b - 1.0;
        let mu56 = || 0.5 * (ie.i2b + 1.0 / ie.i2b) - 1.0;
        let mu77 = || 0.5 * (ie.i2b * ie.i2b + 1.0 / (ie.i2b * ie.i2b) - 2.0);
        match self {
            Self::Mu1 => ie.i1,
            Self::Mu2 => mu2(),
            Self::Mu7 => ie.i1 * (1.0 + 1.0 / ie.i2) - 4.0,
            Self::Mu56 => mu56(),
            Self::Mu77 => mu77(),
            Self::Mu80 { weights: [w0, w1] } => w0 * mu2() + w1 * mu77(),
            Self::Mu94 { weights: [w0, w1] } => w0 * mu2() + w1 * mu56(),
        }
    }
}

/// Quality metrics for volumetric elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metric3d {
    /// $\mu_{302} = \bar I_1 \bar I_2 / 9 - 1$.
    Mu302,
    /// $\mu_{303} = \bar I_1 / 3 - 1$.
    Mu303,
    /// $\mu_{315} = (\bar I_3 - 1)^2$.
    Mu315,
    /// $\mu_{318} = \frac{1}{2}(I_3 + 1 / I_3) - 1$.
    Mu318,
    /// $\mu_{321} = I_1 + I_2 / I_3 - 6$.
    Mu321,
    /// $\mu_{332} = w_0 \mu_{302} + w_1 \mu_{315}$.
    Mu332 { weights: [f64; 2] },
    /// $\mu_{338} = w_0 \mu_{302} + w_1 \mu_{318}$.
    Mu338 { weights: [f64; 2] },
}

impl Metric3d {
    pub fn id(&self) -> u32 {
        match self {
            Self::Mu302 => 302,
            Self::Mu303 => 303,
            Self::Mu315 => 315,
            Self::Mu318 => 318,
            Self::Mu321 => 321,
            Self::Mu332 { .. } => 332,
            Self::Mu338 { .. } => 338,
        }
    }

    #[inline]
    pub fn evaluate(&self, t: &Matrix3<f64>) -> f64 {
        let ie = Invariants3d::new(t);
        let mu302 = || ie.i1b * ie.i2b / 9.0 - 1.0;
        let mu315 = || (ie.i3b - 1.0) * (ie.i3b - 1.0);
        let mu318 = || 0.5 * (ie.i3 + 1.0 / ie.i3) - 1.0;
        match self {
            Self::Mu302 => mu302(),
            Self::Mu303 => ie.i1b / 3.0 - 1.0,
            Self::Mu315 => mu315(),
            Self::Mu318 => mu318(),
            Self::Mu321 => ie.i1 + ie.i2 / ie.i3 - 6.0,
            Self::Mu332 { weights: [w0, w1] } => w0 * mu302() + w1 * mu315(),
            Self::Mu338 { weights: [w0, w1] } => w0 * mu302() + w1 * mu318(),
        }
    }
}

/// A quality metric of either dimension.
///
/// Composite metrics carry their weights, so that the kernels never need to inspect the
/// metric beyond its variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QualityMetric {
    Planar(Metric2d),
    Volumetric(Metric3d),
}

impl From<Metric2d> for QualityMetric {
    fn from(metric: Metric2d) -> Self {
        Self::Planar(metric)
    }
}

impl From<Metric3d> for QualityMetric {
    fn from(metric: Metric3d) -> Self {
        Self::Volumetric(metric)
    }
}

impl QualityMetric {
    /// Looks up a metric by its identifier.
    ///
    /// Composite metrics (80, 94, 332 and 338) require exactly two weights. The weights are
    /// ignored for all other metrics.
    pub fn from_id(id: u32, weights: &[f64]) -> Result<Self, PaError> {
        let pair = || match weights {
            &[w0, w1] => Ok([w0, w1]),
            _ => Err(PaError::MetricWeights {
                id,
                expected: 2,
                actual: weights.len(),
            }),
        };
        let metric: QualityMetric = match id {
            1 => Metric2d::Mu1.into(),
            2 => Metric2d::Mu2.into(),
            7 => Metric2d::Mu7.into(),
            56 => Metric2d::Mu56.into(),
            77 => Metric2d::Mu77.into(),
            80 => Metric2d::Mu80 { weights: pair()? }.into(),
            94 => Metric2d::Mu94 { weights: pair()? }.into(),
            302 => Metric3d::Mu302.into(),
            303 => Metric3d::Mu303.into(),
            315 => Metric3d::Mu315.into(),
            318 => Metric3d::Mu318.into(),
            321 => Metric3d::Mu321.into(),
            332 => Metric3d::Mu332 { weights: pair()? }.into(),
            338 => Metric3d::Mu338 { weights: pair()? }.into(),
            _ => return Err(PaError::UnknownMetric { id }),
        };
        Ok(metric)
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::Planar(metric) => metric.id(),
            Self::Volumetric(metric) => metric.id(),
        }
    }

    /// The spatial dimension the metric is defined for.
    pub fn dim(&self) -> usize {
        match self {
            Self::Planar(_) => 2,
            Self::Volumetric(_) => 3,
        }
    }

    /// The weights of a composite metric.
    pub fn weights(&self) -> Option<[f64; 2]> {
        match self {
            Self::Planar(Metric2d::Mu80 { weights } | Metric2d::Mu94 { weights })
            | Self::Volumetric(Metric3d::Mu332 { weights } | Metric3d::Mu338 { weights }) => Some(*weights),
            _ => None,
        }
    }

    pub fn as_planar(&self) -> Result<Metric2d, PaError> {
        match self {
            Self::Planar(metric) => Ok(*metric),
            Self::Volumetric(metric) => Err(PaError::MetricDimensionMismatch {
                id: metric.id(),
                metric_dim: 3,
                dim: 2,
            }),
        }
    }

    pub fn as_volumetric(&self) -> Result<Metric3d, PaError> {
        match self {
            Self::Volumetric(metric) => Ok(*metric),
            Self::Planar(metric) => Err(PaError::MetricDimensionMismatch {
                id: metric.id(),
                metric_dim: 2,
                dim: 3,
            }),
        }
    }
}
