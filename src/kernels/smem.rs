//! Tiled 3D divergence apply staged through a per-element scratch arena.
//!
//! This is the same computation as [`apply_3d`](crate::kernels::divergence::apply_3d),
//! restructured the way a thread-block kernel executes it: the 1D bases and every
//! intermediate sum-factorization stage live in a small arena of slots sized by
//! `max(D, Q)` per direction, and the stages are separated by barriers. Each loop nest
//! below corresponds to the work of one thread block, with the innermost indices mapped to
//! threads.
//!
//! Slots are reused across stages. The logical views of each slot are:
//!
//! | slot      | stage                | view    | shape          |
//! |-----------|----------------------|---------|----------------|
//! | `basis[0]`| load basis           | `B`     | `[Q, Dr]`      |
//! | `basis[1]`| load basis           | `G`     | `[Q, Dr]`      |
//! | `sm0[2]`  | load dofs            | `X`     | `[Dr, Dr, Dr]` |
//! | `sm0[0,1]`| contract x           | `DDQ`   | `[Q, Dr, Dr]`  |
//! | `sm1[0..3]`| contract y          | `DQQ`   | `[Q, Q, Dr]`   |
//! | `sm0[0..3]`| contract z          | `QQQ`   | `[Q, Q, Q]`    |
//! | `div`     | divergence           | `div`   | `[Q, Q, Q]`    |
//! | `basis[0]`| load test basis      | `Bt`    | `[De, Q]`      |
//! | `sm1[0]`  | integrate x          | `QQD`   | `[De, Q, Q]`   |
//! | `sm0[0]`  | integrate y          | `QDD`   | `[De, De, Q]`  |
//!
//! A slot is only reused once every view previously placed in it is dead. In particular `X`
//! is overwritten by the z contraction, after the x contraction consumed it.
use crate::error::PaError;
use crate::kernels::divergence::DivergenceBatch;
use crate::kernels::resolve;
use crate::tensor::{View, ViewMut};
use crate::workspace::tile;
use rayon::prelude::*;

/// Phases of the tiled kernel, separated by barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    LoadBasis,
    LoadDofs,
    ContractX,
    ContractY,
    ContractZ,
    Divergence,
    LoadTestBasis,
    IntegrateX,
    IntegrateY,
    IntegrateZ,
}

impl Stage {
    /// Whether `next` may directly follow `self`.
    fn precedes(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (IntegrateZ, LoadBasis)
                | (LoadBasis, LoadDofs)
                | (LoadDofs, ContractX)
                | (ContractX, ContractY)
                | (ContractY, ContractZ)
                | (ContractZ, Divergence)
                | (Divergence, LoadDofs)
                | (Divergence, LoadTestBasis)
                | (LoadTestBasis, IntegrateX)
                | (IntegrateX, IntegrateY)
                | (IntegrateY, IntegrateZ)
        )
    }
}

/// The scratch arena of one element group.
#[derive(Debug)]
struct SharedArena {
    basis: [Vec<f64>; 2],
    sm0: [Vec<f64>; 3],
    sm1: [Vec<f64>; 3],
    div: Vec<f64>,
    stage: Stage,
}

impl Default for SharedArena {
    fn default() -> Self {
        Self {
            basis: Default::default(),
            sm0: Default::default(),
            sm1: Default::default(),
            div: Vec::new(),
            stage: Stage::IntegrateZ,
        }
    }
}

impl SharedArena {
    /// Sizes every slot for `mdq = max(D, Q)` entries per direction.
    fn reserve(&mut self, mdq: usize) {
        for slot in self.basis.iter_mut() {
            tile(slot, mdq * mdq);
        }
        for slot in self.sm0.iter_mut().chain(self.sm1.iter_mut()) {
            tile(slot, mdq * mdq * mdq);
        }
        tile(&mut self.div, mdq * mdq * mdq);
    }

    /// Marks the end of the current stage. All writes of the previous stage are visible after
    /// the barrier.
    #[inline]
    fn barrier(&mut self, next: Stage) {
        debug_assert!(
            self.stage.precedes(next),
            "invalid stage transition {:?} -> {:?}",
            self.stage,
            next
        );
        self.stage = next;
    }
}

/// Forward 3D divergence action using the tiled arena. Accumulates into `y`.
pub fn smem_apply_3d<const TR: usize, const TE: usize, const Q: usize>(
    batch: &DivergenceBatch<'_>,
    x: &[f64],
    y: &mut [f64],
) {
    let dr = resolve::<TR>(batch.trial.ndof);
    let de = resolve::<TE>(batch.test.ndof);
    let q = resolve::<Q>(batch.q1d());
    let nq = q * q * q;
    let mdq = dr.max(de).max(q);

    let b = View::new(batch.trial.b.as_slice(), [q, dr]);
    let g = View::new(batch.trial.g.as_slice(), [q, dr]);
    let bt = View::new(batch.test.bt.as_slice(), [de, q]);

    y.par_chunks_mut(de * de * de)
        .zip(x.par_chunks(3 * dr * dr * dr))
        .zip(batch.op.par_chunks(9 * nq))
        .for_each(|((y_e, x_e), op_e)| {
            batch.scratch.with(|arena: &mut SharedArena| {
                arena.reserve(mdq);
                let op = View::new(op_e, [nq, 3, 3]);
                let x_e = View::new(x_e, [dr, dr, dr, 3]);
                let mut y_e = ViewMut::new(y_e, [de, de, de]);

                arena.barrier(Stage::LoadBasis);
                {
                    let [b_slot, g_slot] = &mut arena.basis;
                    let mut s_b = ViewMut::new(b_slot, [q, dr]);
                    let mut s_g = ViewMut::new(g_slot, [q, dr]);
                    for d in 0..dr {
                        for qx in 0..q {
                            s_b[[qx, d]] = b[[qx, d]];
                            s_g[[qx, d]] = g[[qx, d]];
                        }
                    }
                    ViewMut::new(&mut arena.div, [q, q, q]).fill(0.0);
                }

                for c in 0..3 {
                    arena.barrier(Stage::LoadDofs);
                    {
                        let mut s_x = ViewMut::new(&mut arena.sm0[2], [dr, dr, dr]);
                        for dz in 0..dr {
                            for dy in 0..dr {
                                for dx in 0..dr {
                                    s_x[[dx, dy, dz]] = x_e[[dx, dy, dz, c]];
                                }
                            }
                        }
                    }

                    arena.barrier(Stage::ContractX);
                    {
                        let s_b = View::new(&arena.basis[0], [q, dr]);
                        let s_g = View::new(&arena.basis[1], [q, dr]);
                        let [ddq0, ddq1, s_x] = &mut arena.sm0;
                        let s_x = View::new(s_x, [dr, dr, dr]);
                        let mut ddq0 = ViewMut::new(ddq0, [q, dr, dr]);
                        let mut ddq1 = ViewMut::new(ddq1, [q, dr, dr]);
                        for dz in 0..dr {
                            for dy in 0..dr {
                                for qx in 0..q {
                                    let mut u = 0.0;
                                    let mut v = 0.0;
                                    for dx in 0..dr {
                                        let coord = s_x[[dx, dy, dz]];
                                        u += coord * s_b[[qx, dx]];
                                        v += coord * s_g[[qx, dx]];
                                    }
                                    ddq0[[qx, dy, dz]] = u;
                                    ddq1[[qx, dy, dz]] = v;
                                }
                            }
                        }
                    }

                    arena.barrier(Stage::ContractY);
                    {
                        let s_b = View::new(&arena.basis[0], [q, dr]);
                        let s_g = View::new(&arena.basis[1], [q, dr]);
                        let ddq0 = View::new(&arena.sm0[0], [q, dr, dr]);
                        let ddq1 = View::new(&arena.sm0[1], [q, dr, dr]);
                        let [dqq0, dqq1, dqq2] = &mut arena.sm1;
                        let mut dqq0 = ViewMut::new(dqq0, [q, q, dr]);
                        let mut dqq1 = ViewMut::new(dqq1, [q, q, dr]);
                        let mut dqq2 = ViewMut::new(dqq2, [q, q, dr]);
                        for dz in 0..dr {
                            for qy in 0..q {
                                for qx in 0..q {
                                    let mut u = 0.0;
                                    let mut v = 0.0;
                                    let mut w = 0.0;
                                    for dy in 0..dr {
                                        u += ddq1[[qx, dy, dz]] * s_b[[qy, dy]];
                                        v += ddq0[[qx, dy, dz]] * s_g[[qy, dy]];
                                        w += ddq0[[qx, dy, dz]] * s_b[[qy, dy]];
                                    }
                                    dqq0[[qx, qy, dz]] = u;
                                    dqq1[[qx, qy, dz]] = v;
                                    dqq2[[qx, qy, dz]] = w;
                                }
                            }
                        }
                    }

                    arena.barrier(Stage::ContractZ);
                    {
                        let s_b = View::new(&arena.basis[0], [q, dr]);
                        let s_g = View::new(&arena.basis[1], [q, dr]);
                        let dqq0 = View::new(&arena.sm1[0], [q, q, dr]);
                        let dqq1 = View::new(&arena.sm1[1], [q, q, dr]);
                        let dqq2 = View::new(&arena.sm1[2], [q, q, dr]);
                        let [qqq0, qqq1, qqq2] = &mut arena.sm0;
                        let mut qqq0 = ViewMut::new(qqq0, [q, q, q]);
                        let mut qqq1 = ViewMut::new(qqq1, [q, q, q]);
                        let mut qqq2 = ViewMut::new(qqq2, [q, q, q]);
                        for qz in 0..q {
                            for qy in 0..q {
                                for qx in 0..q {
                                    let mut u = 0.0;
                                    let mut v = 0.0;
                                    let mut w = 0.0;
                                    for dz in 0..dr {
                                        u += dqq0[[qx, qy, dz]] * s_b[[qz, dz]];
                                        v += dqq1[[qx, qy, dz]] * s_b[[qz, dz]];
                                        w += dqq2[[qx, qy, dz]] * s_g[[qz, dz]];
                                    }
                                    qqq0[[qx, qy, qz]] = u;
                                    qqq1[[qx, qy, qz]] = v;
                                    qqq2[[qx, qy, qz]] = w;
                                }
                            }
                        }
                    }

                    arena.barrier(Stage::Divergence);
                    {
                        let qqq0 = View::new(&arena.sm0[0], [q, q, q]);
                        let qqq1 = View::new(&arena.sm0[1], [q, q, q]);
                        let qqq2 = View::new(&arena.sm0[2], [q, q, q]);
                        let mut div = ViewMut::new(&mut arena.div, [q, q, q]);
                        for qz in 0..q {
                            for qy in 0..q {
                                for qx in 0..q {
                                    let qi = qx + q * (qy + q * qz);
                                    div[[qx, qy, qz]] += qqq0[[qx, qy, qz]] * op[[qi, 0, c]]
                                        + qqq1[[qx, qy, qz]] * op[[qi, 1, c]]
                                        + qqq2[[qx, qy, qz]] * op[[qi, 2, c]];
                                }
                            }
                        }
                    }
                }

                arena.barrier(Stage::LoadTestBasis);
                {
                    let mut s_bt = ViewMut::new(&mut arena.basis[0], [de, q]);
                    for d in 0..de {
                        for qx in 0..q {
                            s_bt[[d, qx]] = bt[[d, qx]];
                        }
                    }
                }

                arena.barrier(Stage::IntegrateX);
                {
                    let s_bt = View::new(&arena.basis[0], [de, q]);
                    let div = View::new(&arena.div, [q, q, q]);
                    let mut qqd = ViewMut::new(&mut arena.sm1[0], [de, q, q]);
                    for qz in 0..q {
                        for qy in 0..q {
                            for dx in 0..de {
                                let mut u = 0.0;
                                for qx in 0..q {
                                    u += div[[qx, qy, qz]] * s_bt[[dx, qx]];
                                }
                                qqd[[dx, qy, qz]] = u;
                            }
                        }
                    }
                }

                arena.barrier(Stage::IntegrateY);
                {
                    let s_bt = View::new(&arena.basis[0], [de, q]);
                    let qqd = View::new(&arena.sm1[0], [de, q, q]);
                    let mut qdd = ViewMut::new(&mut arena.sm0[0], [de, de, q]);
                    for qz in 0..q {
                        for dy in 0..de {
                            for dx in 0..de {
                                let mut u = 0.0;
                                for qy in 0..q {
                                    u += qqd[[dx, qy, qz]] * s_bt[[dy, qy]];
                                }
                                qdd[[dx, dy, qz]] = u;
                            }
                        }
                    }
                }

                arena.barrier(Stage::IntegrateZ);
                {
                    let s_bt = View::new(&arena.basis[0], [de, q]);
                    let qdd = View::new(&arena.sm0[0], [de, de, q]);
                    for dz in 0..de {
                        for dy in 0..de {
                            for dx in 0..de {
                                let mut u = 0.0;
                                for qz in 0..q {
                                    u += qdd[[dx, dy, qz]] * s_bt[[dz, qz]];
                                }
                                y_e[[dx, dy, dz]] += u;
                            }
                        }
                    }
                }
            })
        });
}

/// The tiled 2D variant is not available. Always panics.
pub fn smem_apply_2d<const TR: usize, const TE: usize, const Q: usize>(
    _batch: &DivergenceBatch<'_>,
    _x: &[f64],
    _y: &mut [f64],
) {
    panic!(
        "{}",
        PaError::Unimplemented {
            kernel: "shared-memory 2D divergence apply"
        }
    )
}
