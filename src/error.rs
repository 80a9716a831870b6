//! Configuration errors reported by the partial assembly kernels.
//!
//! Every error in this module describes *misuse* of the kernels: an unsupported dimension,
//! coefficient or metric, mismatched bases, sizes beyond the configured tile limits or buffers
//! of the wrong size. None of them is recoverable at runtime. The operator-level entry points
//! validate their inputs before any parallel work is launched and panic with the message of
//! the corresponding [`PaError`]; the `try_*` functions return the error instead, so that
//! callers can validate a configuration up front.
//!
//! Numerically degenerate input (such as singular Jacobians) is *not* an error. It propagates
//! as non-finite values in the output.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// An unsupported partial assembly configuration.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PaError {
    /// The spatial dimension is not supported by the named kernel family.
    UnsupportedDimension { dim: usize, kernel: &'static str },
    /// Only constant coefficients are supported by the named kernel family.
    UnsupportedCoefficient { kernel: &'static str },
    /// The metric identifier is not in the catalog.
    UnknownMetric { id: u32 },
    /// A composite metric received the wrong number of weights.
    MetricWeights { id: u32, expected: usize, actual: usize },
    /// The metric is defined for a different dimension than the one being evaluated.
    MetricDimensionMismatch { id: u32, metric_dim: usize, dim: usize },
    /// Trial and test bases use different numbers of quadrature points per direction.
    QuadratureMismatch { trial_q1d: usize, test_q1d: usize },
    /// The number of degrees of freedom per direction exceeds the configured tile limit.
    DofLimitExceeded { d1d: usize, max_d1d: usize },
    /// The number of quadrature points per direction exceeds the configured tile limit.
    QuadLimitExceeded { q1d: usize, max_q1d: usize },
    /// A basis without degrees of freedom or without quadrature points.
    EmptyBasis,
    /// The kernel requires at most as many degrees of freedom as quadrature points per direction.
    DofsExceedQuadrature { d1d: usize, q1d: usize },
    /// A buffer does not have the size implied by the element count and basis sizes.
    BufferSize {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The requested kernel variant does not exist.
    Unimplemented { kernel: &'static str },
    /// An operator action was requested before the operator was assembled.
    NotAssembled { operator: &'static str },
}

impl Display for PaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDimension { dim, kernel } => {
                write!(f, "dim == {} is not supported by the {} kernels", dim, kernel)
            }
            Self::UnsupportedCoefficient { kernel } => {
                write!(f, "only constant coefficients are supported by the {} kernels", kernel)
            }
            Self::UnknownMetric { id } => write!(f, "metric {} is not implemented", id),
            Self::MetricWeights { id, expected, actual } => write!(
                f,
                "metric {} requires {} weights, but {} were given",
                id, expected, actual
            ),
            Self::MetricDimensionMismatch { id, metric_dim, dim } => write!(
                f,
                "metric {} is a {}D metric and cannot be evaluated in {}D",
                id, metric_dim, dim
            ),
            Self::QuadratureMismatch { trial_q1d, test_q1d } => write!(
                f,
                "trial and test spaces must have the same number of quadrature points \
                 (trial Q1D = {}, test Q1D = {})",
                trial_q1d, test_q1d
            ),
            Self::DofLimitExceeded { d1d, max_d1d } => {
                write!(f, "D1D = {} exceeds the maximum of {}", d1d, max_d1d)
            }
            Self::QuadLimitExceeded { q1d, max_q1d } => {
                write!(f, "Q1D = {} exceeds the maximum of {}", q1d, max_q1d)
            }
            Self::EmptyBasis => write!(f, "basis tabulations must have at least one dof and one point"),
            Self::DofsExceedQuadrature { d1d, q1d } => {
                write!(f, "D1D = {} must not exceed Q1D = {}", d1d, q1d)
            }
            Self::BufferSize {
                buffer,
                expected,
                actual,
            } => write!(
                f,
                "buffer `{}` has length {}, but {} was expected",
                buffer, actual, expected
            ),
            Self::Unimplemented { kernel } => write!(f, "{} is not implemented", kernel),
            Self::NotAssembled { operator } => write!(f, "the {} has not been assembled", operator),
        }
    }
}

impl Error for PaError {}

/// Checks that a buffer has exactly the expected length.
pub(crate) fn check_len(buffer: &'static str, actual: usize, expected: usize) -> Result<(), PaError> {
    if actual == expected {
        Ok(())
    } else {
        Err(PaError::BufferSize {
            buffer,
            expected,
            actual,
        })
    }
}

/// Unwraps a validated configuration, aborting the call with the error message otherwise.
pub(crate) fn or_abort<T>(result: Result<T, PaError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{}", err),
    }
}
