//! Sum-factorized 1D contractions between tensor-product dofs and quadrature points.
//!
//! Every primitive contracts one tensor axis at a time with a 1D basis matrix, so that
//! evaluating a field of `D^dim` dofs at `Q^dim` points costs `O(dim * D * Q^dim)` operations.
//! Basis matrices are views of shape `[Q, D]` (`B`, `G`) or `[D, Q]` (`Bt`, `Gt`).
//! Gradients at quadrature points have shape `[dim, Q, Q(, Q)]`, so that the reference
//! derivative `r` at the flat point `q` lives at offset `r + dim * q`.
//!
//! Forward contractions overwrite their output, backward contractions accumulate into it.
//! `line` and `plane` are caller-provided scratch tiles.
use crate::tensor::{View, ViewMut};

/// Reference gradient of a scalar field on a quadrilateral.
///
/// `x` has shape `[D, D]`, `grad` receives shape `[2, Q, Q]`. `line` must hold `2 * Q` values.
#[inline(always)]
pub fn gradient_2d(b: View<2>, g: View<2>, x: View<2>, grad: &mut ViewMut<3>, line: &mut [f64]) {
    let [q1d, d1d] = b.shape();
    grad.fill(0.0);
    let mut grad_x = ViewMut::new(line, [2, q1d]);
    for dy in 0..d1d {
        grad_x.fill(0.0);
        for dx in 0..d1d {
            let s = x[[dx, dy]];
            for qx in 0..q1d {
                grad_x[[0, qx]] += s * g[[qx, dx]];
                grad_x[[1, qx]] += s * b[[qx, dx]];
            }
        }
        for qy in 0..q1d {
            let wy = b[[qy, dy]];
            let wdy = g[[qy, dy]];
            for qx in 0..q1d {
                grad[[0, qx, qy]] += grad_x[[0, qx]] * wy;
                grad[[1, qx, qy]] += grad_x[[1, qx]] * wdy;
            }
        }
    }
}

/// Reference gradient of a scalar field on a hexahedron.
///
/// `x` has shape `[D, D, D]`, `grad` receives shape `[3, Q, Q, Q]`. `line` must hold `2 * Q`
/// and `plane` `3 * Q * Q` values.
///
/// The x contraction produces both `G x` and `B x`. The latter is shared by the y and z
/// derivatives, which differ only in which of the remaining axes is contracted with `G`.
#[inline(always)]
pub fn gradient_3d(
    b: View<2>,
    g: View<2>,
    x: View<3>,
    grad: &mut ViewMut<4>,
    line: &mut [f64],
    plane: &mut [f64],
) {
    let [q1d, d1d] = b.shape();
    grad.fill(0.0);
    let mut grad_x = ViewMut::new(line, [2, q1d]);
    let mut grad_xy = ViewMut::new(plane, [3, q1d, q1d]);
    for dz in 0..d1d {
        grad_xy.fill(0.0);
        for dy in 0..d1d {
            grad_x.fill(0.0);
            for dx in 0..d1d {
                let s = x[[dx, dy, dz]];
                for qx in 0..q1d {
                    grad_x[[0, qx]] += s * g[[qx, dx]];
                    grad_x[[1, qx]] += s * b[[qx, dx]];
                }
            }
            for qy in 0..q1d {
                let wy = b[[qy, dy]];
                let wdy = g[[qy, dy]];
                for qx in 0..q1d {
                    let gx = grad_x[[0, qx]];
                    let bx = grad_x[[1, qx]];
                    grad_xy[[0, qx, qy]] += gx * wy;
                    grad_xy[[1, qx, qy]] += bx * wdy;
                    grad_xy[[2, qx, qy]] += bx * wy;
                }
            }
        }
        for qz in 0..q1d {
            let wz = b[[qz, dz]];
            let wdz = g[[qz, dz]];
            for qy in 0..q1d {
                for qx in 0..q1d {
                    grad[[0, qx, qy, qz]] += grad_xy[[0, qx, qy]] * wz;
                    grad[[1, qx, qy, qz]] += grad_xy[[1, qx, qy]] * wz;
                    grad[[2, qx, qy, qz]] += grad_xy[[2, qx, qy]] * wdz;
                }
            }
        }
    }
}

/// Values of a scalar field at the quadrature points of a quadrilateral.
///
/// `x` has shape `[D, D]`, `out` receives shape `[Q, Q]`. `line` must hold `Q` values.
#[inline(always)]
pub fn interpolate_2d(b: View<2>, x: View<2>, out: &mut ViewMut<2>, line: &mut [f64]) {
    let [q1d, d1d] = b.shape();
    out.fill(0.0);
    let mut val_x = ViewMut::new(line, [q1d]);
    for dy in 0..d1d {
        val_x.fill(0.0);
        for dx in 0..d1d {
            let s = x[[dx, dy]];
            for qx in 0..q1d {
                val_x[[qx]] += s * b[[qx, dx]];
            }
        }
        for qy in 0..q1d {
            let wy = b[[qy, dy]];
            for qx in 0..q1d {
                out[[qx, qy]] += val_x[[qx]] * wy;
            }
        }
    }
}

/// Values of a scalar field at the quadrature points of a hexahedron.
///
/// `x` has shape `[D, D, D]`, `out` receives shape `[Q, Q, Q]`. `line` must hold `Q` and
/// `plane` `Q * Q` values.
#[inline(always)]
pub fn interpolate_3d(b: View<2>, x: View<3>, out: &mut ViewMut<3>, line: &mut [f64], plane: &mut [f64]) {
    let [q1d, d1d] = b.shape();
    out.fill(0.0);
    let mut val_x = ViewMut::new(line, [q1d]);
    let mut val_xy = ViewMut::new(plane, [q1d, q1d]);
    for dz in 0..d1d {
        val_xy.fill(0.0);
        for dy in 0..d1d {
            val_x.fill(0.0);
            for dx in 0..d1d {
                let s = x[[dx, dy, dz]];
                for qx in 0..q1d {
                    val_x[[qx]] += s * b[[qx, dx]];
                }
            }
            for qy in 0..q1d {
                let wy = b[[qy, dy]];
                for qx in 0..q1d {
                    val_xy[[qx, qy]] += val_x[[qx]] * wy;
                }
            }
        }
        for qz in 0..q1d {
            let wz = b[[qz, dz]];
            for qy in 0..q1d {
                for qx in 0..q1d {
                    out[[qx, qy, qz]] += val_xy[[qx, qy]] * wz;
                }
            }
        }
    }
}

/// Accumulates `Bt (x) Bt` applied to a quadrature field on a quadrilateral into `y`.
///
/// `bt` has shape `[D, Q]`, `f` shape `[Q, Q]` and `y` shape `[D, D]`. `line` must hold
/// `D` values.
#[inline(always)]
pub fn integrate_2d(bt: View<2>, f: View<2>, y: &mut ViewMut<2>, line: &mut [f64]) {
    let [d1d, q1d] = bt.shape();
    let mut f_x = ViewMut::new(line, [d1d]);
    for qy in 0..q1d {
        f_x.fill(0.0);
        for qx in 0..q1d {
            let s = f[[qx, qy]];
            for dx in 0..d1d {
                f_x[[dx]] += bt[[dx, qx]] * s;
            }
        }
        for dy in 0..d1d {
            let wy = bt[[dy, qy]];
            for dx in 0..d1d {
                y[[dx, dy]] += wy * f_x[[dx]];
            }
        }
    }
}

/// Accumulates `Bt (x) Bt (x) Bt` applied to a quadrature field on a hexahedron into `y`.
///
/// `bt` has shape `[D, Q]`, `f` shape `[Q, Q, Q]` and `y` shape `[D, D, D]`. `line` must hold
/// `D` and `plane` `D * D` values.
#[inline(always)]
pub fn integrate_3d(bt: View<2>, f: View<3>, y: &mut ViewMut<3>, line: &mut [f64], plane: &mut [f64]) {
    let [d1d, q1d] = bt.shape();
    let mut f_x = ViewMut::new(line, [d1d]);
    let mut f_xy = ViewMut::new(plane, [d1d, d1d]);
    for qz in 0..q1d {
        f_xy.fill(0.0);
        for qy in 0..q1d {
            f_x.fill(0.0);
            for qx in 0..q1d {
                let s = f[[qx, qy, qz]];
                for dx in 0..d1d {
                    f_x[[dx]] += bt[[dx, qx]] * s;
                }
            }
            for dy in 0..d1d {
                let wy = bt[[dy, qy]];
                for dx in 0..d1d {
                    f_xy[[dx, dy]] += wy * f_x[[dx]];
                }
            }
        }
        for dz in 0..d1d {
            let wz = bt[[dz, qz]];
            for dy in 0..d1d {
                for dx in 0..d1d {
                    y[[dx, dy, dz]] += wz * f_xy[[dx, dy]];
                }
            }
        }
    }
}

/// Accumulates the transpose of [`gradient_2d`] applied to `grad` into `y`.
///
/// `bt` and `gt` have shape `[D, Q]`, `grad` shape `[2, Q, Q]` and `y` shape `[D, D]`.
/// `line` must hold `2 * D` values.
#[inline(always)]
pub fn integrate_gradient_2d(bt: View<2>, gt: View<2>, grad: View<3>, y: &mut ViewMut<2>, line: &mut [f64]) {
    let [d1d, q1d] = bt.shape();
    let mut grad_x = ViewMut::new(line, [2, d1d]);
    for qy in 0..q1d {
        grad_x.fill(0.0);
        for qx in 0..q1d {
            let gx = grad[[0, qx, qy]];
            let gy = grad[[1, qx, qy]];
            for dx in 0..d1d {
                grad_x[[0, dx]] += gx * gt[[dx, qx]];
                grad_x[[1, dx]] += gy * bt[[dx, qx]];
            }
        }
        for dy in 0..d1d {
            let wy = bt[[dy, qy]];
            let wdy = gt[[dy, qy]];
            for dx in 0..d1d {
                y[[dx, dy]] += grad_x[[0, dx]] * wy + grad_x[[1, dx]] * wdy;
            }
        }
    }
}

/// Accumulates the transpose of [`gradient_3d`] applied to `grad` into `y`.
///
/// `bt` and `gt` have shape `[D, Q]`, `grad` shape `[3, Q, Q, Q]` and `y` shape `[D, D, D]`.
/// `line` must hold `3 * D` and `plane` `3 * D * D` values.
#[inline(always)]
pub fn integrate_gradient_3d(
    bt: View<2>,
    gt: View<2>,
    grad: View<4>,
    y: &mut ViewMut<3>,
    line: &mut [f64],
    plane: &mut [f64],
) {
    let [d1d, q1d] = bt.shape();
    let mut grad_x = ViewMut::new(line, [3, d1d]);
    let mut grad_xy = ViewMut::new(plane, [3, d1d, d1d]);
    for qz in 0..q1d {
        grad_xy.fill(0.0);
        for qy in 0..q1d {
            grad_x.fill(0.0);
            for qx in 0..q1d {
                let gx = grad[[0, qx, qy, qz]];
                let gy = grad[[1, qx, qy, qz]];
                let gz = grad[[2, qx, qy, qz]];
                for dx in 0..d1d {
                    let wx = bt[[dx, qx]];
                    let wdx = gt[[dx, qx]];
                    grad_x[[0, dx]] += gx * wdx;
                    grad_x[[1, dx]] += gy * wx;
                    grad_x[[2, dx]] += gz * wx;
                }
            }
            for dy in 0..d1d {
                let wy = bt[[dy, qy]];
                let wdy = gt[[dy, qy]];
                for dx in 0..d1d {
                    grad_xy[[0, dx, dy]] += grad_x[[0, dx]] * wy;
                    grad_xy[[1, dx, dy]] += grad_x[[1, dx]] * wdy;
                    grad_xy[[2, dx, dy]] += grad_x[[2, dx]] * wy;
                }
            }
        }
        for dz in 0..d1d {
            let wz = bt[[dz, qz]];
            let wdz = gt[[dz, qz]];
            for dy in 0..d1d {
                for dx in 0..d1d {
                    y[[dx, dy, dz]] +=
                        grad_xy[[0, dx, dy]] * wz + grad_xy[[1, dx, dy]] * wz + grad_xy[[2, dx, dy]] * wdz;
                }
            }
        }
    }
}
