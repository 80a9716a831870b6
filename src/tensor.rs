//! Column-major multi-dimensional views into flat buffers.
//!
//! All kernel buffers are flat `f64` arrays interpreted with the *first* index running fastest,
//! i.e. the entry `[i0, i1, ..., iN]` of a buffer of shape `[n0, n1, ..., nN]` lives at offset
//! `i0 + n0 * (i1 + n1 * (... + n(N-1) * iN))`. The views in this module make that
//! interpretation explicit at every use site.
use std::ops::{Index, IndexMut};

/// Offset of the multi-index `index` into a column-major array of the given shape.
#[inline(always)]
pub fn column_major_offset<const N: usize>(shape: &[usize; N], index: &[usize; N]) -> usize {
    let mut offset = 0;
    for k in (0..N).rev() {
        debug_assert!(index[k] < shape[k], "index out of bounds in dimension {}", k);
        offset = offset * shape[k] + index[k];
    }
    offset
}

/// A read-only column-major view of rank `N`.
#[derive(Debug, Clone, Copy)]
pub struct View<'a, const N: usize> {
    data: &'a [f64],
    shape: [usize; N],
}

impl<'a, const N: usize> View<'a, N> {
    /// Interprets the first `product(shape)` entries of `data` with the given shape.
    ///
    /// # Panics
    ///
    /// Panics if `data` is shorter than the product of the extents.
    pub fn new(data: &'a [f64], shape: [usize; N]) -> Self {
        let len = shape.iter().product();
        Self {
            data: &data[..len],
            shape,
        }
    }

    pub fn shape(&self) -> [usize; N] {
        self.shape
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }
}

impl<'a, const N: usize> Index<[usize; N]> for View<'a, N> {
    type Output = f64;

    #[inline(always)]
    fn index(&self, index: [usize; N]) -> &f64 {
        &self.data[column_major_offset(&self.shape, &index)]
    }
}

/// A mutable column-major view of rank `N`.
#[derive(Debug)]
pub struct ViewMut<'a, const N: usize> {
    data: &'a mut [f64],
    shape: [usize; N],
}

impl<'a, const N: usize> ViewMut<'a, N> {
    /// Interprets the first `product(shape)` entries of `data` with the given shape.
    ///
    /// # Panics
    ///
    /// Panics if `data` is shorter than the product of the extents.
    pub fn new(data: &'a mut [f64], shape: [usize; N]) -> Self {
        let len = shape.iter().product();
        Self {
            data: &mut data[..len],
            shape,
        }
    }

    pub fn shape(&self) -> [usize; N] {
        self.shape
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn as_view(&self) -> View<'_, N> {
        View {
            data: &*self.data,
            shape: self.shape,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut *self.data
    }
}

impl<'a, const N: usize> Index<[usize; N]> for ViewMut<'a, N> {
    type Output = f64;

    #[inline(always)]
    fn index(&self, index: [usize; N]) -> &f64 {
        &self.data[column_major_offset(&self.shape, &index)]
    }
}

impl<'a, const N: usize> IndexMut<[usize; N]> for ViewMut<'a, N> {
    #[inline(always)]
    fn index_mut(&mut self, index: [usize; N]) -> &mut f64 {
        &mut self.data[column_major_offset(&self.shape, &index)]
    }
}
