//! FFT wrapper for 1/2/3-D transforms using rustfft
//!
//! Unnormalised forward (e^{-2πi k·x}) and backward (e^{+2πi k·x}) transforms
//! on column-major buffers, as needed by the gridding NUFFT. Axes of
//! extent 1 are skipped.

use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

/// FFT workspace that caches plans and scratch buffers for reuse
pub struct FftWorkspace {
    nx: usize,
    ny: usize,
    nz: usize,
    // Forward FFT plans
    fft_x: Arc<dyn Fft<f64>>,
    fft_y: Arc<dyn Fft<f64>>,
    fft_z: Arc<dyn Fft<f64>>,
    // Backward FFT plans
    ifft_x: Arc<dyn Fft<f64>>,
    ifft_y: Arc<dyn Fft<f64>>,
    ifft_z: Arc<dyn Fft<f64>>,
    // Scratch buffers
    scratch: Vec<Complex64>,
    buffer_y: Vec<Complex64>,
    buffer_z: Vec<Complex64>,
}

impl FftWorkspace {
    /// Create a workspace for an `nx × ny × nz` grid (use 1 for unused axes)
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        let mut planner = FftPlanner::new();

        let fft_x = planner.plan_fft(nx, FftDirection::Forward);
        let fft_y = planner.plan_fft(ny, FftDirection::Forward);
        let fft_z = planner.plan_fft(nz, FftDirection::Forward);

        let ifft_x = planner.plan_fft(nx, FftDirection::Inverse);
        let ifft_y = planner.plan_fft(ny, FftDirection::Inverse);
        let ifft_z = planner.plan_fft(nz, FftDirection::Inverse);

        let scratch_len = [&fft_x, &fft_y, &fft_z, &ifft_x, &ifft_y, &ifft_z]
            .iter()
            .map(|p| p.get_inplace_scratch_len())
            .max()
            .unwrap_or(0);

        Self {
            nx, ny, nz,
            fft_x, fft_y, fft_z,
            ifft_x, ifft_y, ifft_z,
            scratch: vec![Complex64::new(0.0, 0.0); scratch_len],
            buffer_y: vec![Complex64::new(0.0, 0.0); ny],
            buffer_z: vec![Complex64::new(0.0, 0.0); nz],
        }
    }

    /// Total number of grid points
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// In-place unnormalised forward transform
    pub fn forward(&mut self, data: &mut [Complex64]) {
        self.transform(data, FftDirection::Forward);
    }

    /// In-place unnormalised backward transform
    pub fn backward(&mut self, data: &mut [Complex64]) {
        self.transform(data, FftDirection::Inverse);
    }

    fn transform(&mut self, data: &mut [Complex64], direction: FftDirection) {
        let (nx, ny, nz) = (self.nx, self.ny, self.nz);
        assert_eq!(data.len(), nx * ny * nz, "FFT buffer length mismatch");
        let (px, py, pz) = match direction {
            FftDirection::Forward => (&self.fft_x, &self.fft_y, &self.fft_z),
            FftDirection::Inverse => (&self.ifft_x, &self.ifft_y, &self.ifft_z),
        };

        // Transform along x-axis (contiguous)
        if nx > 1 {
            for line in data.chunks_exact_mut(nx) {
                px.process_with_scratch(line, &mut self.scratch);
            }
        }

        // Transform along y-axis
        if ny > 1 {
            for k in 0..nz {
                for i in 0..nx {
                    for j in 0..ny {
                        self.buffer_y[j] = data[idx3d(i, j, k, nx, ny)];
                    }
                    py.process_with_scratch(&mut self.buffer_y, &mut self.scratch);
                    for j in 0..ny {
                        data[idx3d(i, j, k, nx, ny)] = self.buffer_y[j];
                    }
                }
            }
        }

        // Transform along z-axis
        if nz > 1 {
            for j in 0..ny {
                for i in 0..nx {
                    for k in 0..nz {
                        self.buffer_z[k] = data[idx3d(i, j, k, nx, ny)];
                    }
                    pz.process_with_scratch(&mut self.buffer_z, &mut self.scratch);
                    for k in 0..nz {
                        data[idx3d(i, j, k, nx, ny)] = self.buffer_z[k];
                    }
                }
            }
        }
    }
}

/// Column-major 3D index
#[inline(always)]
pub fn idx3d(i: usize, j: usize, k: usize, nx: usize, ny: usize) -> usize {
    i + j * nx + k * nx * ny
}
