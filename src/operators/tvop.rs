//! Finite-difference (total variation) operator
//!
//! Forward differences along the first two axes of an (M, N) image with a
//! zero boundary: the last row of channel 0 and the last column of
//! channel 1 are zero. The adjoint is the matching negative backward
//! difference, so `<Dx, g> = <x, D^H g>` holds exactly.

use super::LinearOperator;
use crate::array::{MultiAxisArray, Scalar};
use crate::config::FiniteDifferenceConfig;
use rayon::prelude::*;

/// 2-D forward-difference gradient, output extents (M, N, 2)
#[derive(Debug, Clone)]
pub struct FiniteDifference {
    hx: f64,
    hy: f64,
}

impl Default for FiniteDifference {
    fn default() -> Self {
        Self::new(&FiniteDifferenceConfig::default())
    }
}

impl FiniteDifference {
    pub fn new(config: &FiniteDifferenceConfig) -> Self {
        let [vsx, vsy] = config.spacing;
        assert!(vsx > 0.0 && vsy > 0.0, "grid spacing must be positive");
        Self { hx: 1.0 / vsx, hy: 1.0 / vsy }
    }
}

impl<T: Scalar> LinearOperator<T> for FiniteDifference {
    fn trafo(&self, x: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        assert!(x.is_2d(), "finite differences need a 2-D image");
        let (nx, ny) = (x.dim(0), x.dim(1));
        let hx = T::from_real(self.hx);
        let hy = T::from_real(self.hy);
        let src = x.as_slice();

        let mut out = MultiAxisArray::new3(nx, ny, 2);
        let (gx, gy) = out.as_mut_slice().split_at_mut(nx * ny);

        // Fortran order: index = i + j*nx, one column per task
        gx.par_chunks_mut(nx)
            .zip(gy.par_chunks_mut(nx))
            .enumerate()
            .for_each(|(j, (gx_col, gy_col))| {
                let col = &src[j * nx..(j + 1) * nx];
                for i in 0..nx - 1 {
                    gx_col[i] = (col[i + 1] - col[i]) * hx;
                }
                if j + 1 < ny {
                    let next = &src[(j + 1) * nx..(j + 2) * nx];
                    for i in 0..nx {
                        gy_col[i] = (next[i] - col[i]) * hy;
                    }
                }
            });
        out
    }

    fn adjoint(&self, g: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        assert_eq!(g.dim(2), 2, "gradient input needs two channels on axis 2");
        assert!(g.is_3d(), "gradient input must be (M, N, 2)");
        let (nx, ny) = (g.dim(0), g.dim(1));
        let hx = T::from_real(self.hx);
        let hy = T::from_real(self.hy);
        let (gx, gy) = g.as_slice().split_at(nx * ny);

        let mut out = MultiAxisArray::new2(nx, ny);
        out.as_mut_slice()
            .par_chunks_mut(nx)
            .enumerate()
            .for_each(|(j, div)| {
                let gx_col = &gx[j * nx..(j + 1) * nx];
                let gy_col = &gy[j * nx..(j + 1) * nx];
                for i in 0..nx {
                    let mut v = T::zero();
                    if i + 1 < nx {
                        v -= gx_col[i];
                    }
                    if i > 0 {
                        v += gx_col[i - 1];
                    }
                    let mut w = T::zero();
                    if j + 1 < ny {
                        w -= gy_col[i];
                    }
                    if j > 0 {
                        w += gy[(j - 1) * nx + i];
                    }
                    div[i] = v * hx + w * hy;
                }
            });
        out
    }
}
