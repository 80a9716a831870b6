//! Element-batch kernels.
//!
//! Kernels are parameterized by const generics `TR`, `TE`, `D` and `Q` for the numbers of
//! dofs and quadrature points per direction. A value of zero means "given at runtime", so the
//! same source yields both the specialized instances registered in
//! [`dispatch`](crate::dispatch) and the generic fallbacks. Kernels assume validated input;
//! the checked entry points live in the dispatch layer.
pub mod contraction;
pub mod divergence;
pub mod energy;
pub mod setup;
pub mod smem;

/// Resolves a const-generic extent, falling back to the runtime value when `N == 0`.
#[inline(always)]
pub(crate) const fn resolve<const N: usize>(runtime: usize) -> usize {
    if N > 0 {
        N
    } else {
        runtime
    }
}
