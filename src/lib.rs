//! Matrix-free partial assembly kernels for tensor-product finite elements.
//!
//! The crate evaluates finite element operators on batches of quadrilateral and hexahedral
//! elements without forming element or global matrices. A *setup* stage precomputes a small
//! tensor per quadrature point from the element geometry, after which every operator action
//! is computed by sum factorization: fields are interpolated to quadrature points one axis at
//! a time with 1D basis matrices, multiplied pointwise by the stored tensor and integrated back
//! to the degrees of freedom.
//!
//! Two families of operators are provided:
//!
//! - [`VectorDivergenceIntegrator`](divergence::VectorDivergenceIntegrator), the mixed
//!   divergence form between a vector-valued trial space and a scalar test space, with its
//!   transpose and a tiled 3D variant.
//! - [`TmopEnergy`](tmop::TmopEnergy), integrated mesh quality metrics relative to target
//!   Jacobians, as used for mesh optimization.
//!
//! All buffers are element-local and column-major, see [`tensor`].

pub mod basis;
pub mod coefficient;
pub mod config;
pub mod dispatch;
pub mod divergence;
pub mod error;
pub mod geometry;
pub mod kernels;
pub mod linalg;
pub mod metrics;
pub mod target;
pub mod tensor;
pub mod tmop;

pub mod workspace;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate sumfact_quadrature as quadrature;
