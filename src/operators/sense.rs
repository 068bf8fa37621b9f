//! Multi-channel SENSE encoding on non-Cartesian trajectories
//!
//! `E x = [F(s_1 x), ..., F(s_nc x)]` and `E^H y = Σ_c conj(s_c) F^H(y_c)`,
//! where `F` is the gridding NUFFT. Sensitivities have extents
//! (N0, N1[, N2], nc); encoded data has extents (M, nc). Channels are
//! distributed over a fixed thread pool with one NUFFT plan per worker.

use super::nufft::Nufft;
use super::LinearOperator;
use crate::array::MultiAxisArray;
use crate::config::NufftConfig;
use crate::error::{Error, Result};
use num_complex::Complex64;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

/// Intensity correction `1 / sqrt(Σ_c |s_c|²)`, zero where the sum vanishes.
/// Extents are those of the sensitivities without the channel axis.
pub fn intensity_map(sens: &MultiAxisArray<Complex64>) -> MultiAxisArray<f64> {
    let dim = sens.ndims() - 1;
    assert!(dim >= 1, "sensitivities need image axes plus a channel axis");
    let extents: Vec<usize> = (0..dim).map(|d| sens.dim(d)).collect();
    let n: usize = extents.iter().product();
    let channels = sens.dim(dim);
    let data = sens.as_slice();

    MultiAxisArray::from_fn(&extents, |i| {
        let sum: f64 = (0..channels).map(|c| data[i + c * n].norm_sqr()).sum();
        if sum > 0.0 {
            1.0 / sum.sqrt()
        } else {
            0.0
        }
    })
}

/// SENSE encoding operator `E`
pub struct SenseEncoding {
    sens: MultiAxisArray<Complex64>,
    image_dims: Vec<usize>,
    channels: usize,
    num_nodes: usize,
    plans: Vec<Nufft>,
    pool: ThreadPool,
}

impl SenseEncoding {
    /// `threads = None` uses every available hardware thread
    pub fn new(
        sens: MultiAxisArray<Complex64>,
        num_nodes: usize,
        config: &NufftConfig,
        threads: Option<usize>,
    ) -> Result<Self> {
        let dim = sens.ndims() - 1;
        assert!((1..=3).contains(&dim), "sensitivities must have 1 to 3 image axes plus channels");
        let image_dims: Vec<usize> = (0..dim).map(|d| sens.dim(d)).collect();
        let channels = sens.dim(dim);

        let threads = threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| Error::Config { key: "np".to_string(), reason: e.to_string() })?;
        let plans = (0..threads).map(|_| Nufft::new(&image_dims, num_nodes, config)).collect();

        info!(
            "SENSE encoding: image {:?}, {} channels, {} nodes, {} threads",
            image_dims, channels, num_nodes, threads
        );

        Ok(Self { sens, image_dims, channels, num_nodes, plans, pool })
    }

    pub fn set_trajectory(&mut self, k: &MultiAxisArray<f64>) {
        let plans = &mut self.plans;
        self.pool.install(|| plans.par_iter_mut().for_each(|p| p.set_trajectory(k)));
    }

    pub fn set_weights(&mut self, w: &MultiAxisArray<f64>) {
        let plans = &mut self.plans;
        self.pool.install(|| plans.par_iter_mut().for_each(|p| p.set_weights(w)));
    }

    pub fn set_phase_correction(&mut self, pc: &MultiAxisArray<Complex64>) {
        self.plans.iter_mut().for_each(|p| p.set_phase_correction(pc));
    }

    /// Replace the sensitivities; extents must not change
    pub fn set_sensitivities(&mut self, sens: MultiAxisArray<Complex64>) {
        assert_eq!(sens.dims(), self.sens.dims(), "sensitivity extents changed");
        self.sens = sens;
    }

    pub fn sensitivities(&self) -> &MultiAxisArray<Complex64> {
        &self.sens
    }

    pub fn image_dims(&self) -> &[usize] {
        &self.image_dims
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn threads(&self) -> usize {
        self.plans.len()
    }

    fn image_len(&self) -> usize {
        self.image_dims.iter().product()
    }

    /// Plan owned by the calling pool worker
    fn plan(&self) -> &Nufft {
        let idx = rayon::current_thread_index().unwrap_or(0) % self.plans.len();
        &self.plans[idx]
    }

    fn coil(&self, c: usize) -> &[Complex64] {
        let n = self.image_len();
        &self.sens.as_slice()[c * n..(c + 1) * n]
    }
}

impl LinearOperator<Complex64> for SenseEncoding {
    /// Image to per-channel samples (M, nc)
    fn trafo(&self, x: &MultiAxisArray<Complex64>) -> MultiAxisArray<Complex64> {
        assert_eq!(x.size(), self.image_len(), "image does not match the sensitivities");
        let channels: Vec<Vec<Complex64>> = self.pool.install(|| {
            (0..self.channels)
                .into_par_iter()
                .map(|c| {
                    let weighted = x.iter().zip(self.coil(c)).map(|(&v, &s)| v * s).collect();
                    let image = MultiAxisArray::from_vec(&self.image_dims, weighted);
                    self.plan().trafo(&image).into_vec()
                })
                .collect()
        });

        let mut out = MultiAxisArray::new2(self.num_nodes, self.channels);
        for (dst, src) in out.as_mut_slice().chunks_exact_mut(self.num_nodes).zip(channels) {
            dst.copy_from_slice(&src);
        }
        out
    }

    /// Per-channel samples (M, nc) to the coil-combined image
    fn adjoint(&self, y: &MultiAxisArray<Complex64>) -> MultiAxisArray<Complex64> {
        assert_eq!(y.size(), self.num_nodes * self.channels, "expected {} × {} samples", self.num_nodes, self.channels);
        let n = self.image_len();
        let m = self.num_nodes;
        let combined = self.pool.install(|| {
            (0..self.channels)
                .into_par_iter()
                .map(|c| {
                    let samples = MultiAxisArray::from_vec(&[m], y.as_slice()[c * m..(c + 1) * m].to_vec());
                    let image = self.plan().adjoint(&samples);
                    image.iter().zip(self.coil(c)).map(|(&v, &s)| v * s.conj()).collect::<Vec<_>>()
                })
                .reduce(
                    || vec![Complex64::new(0.0, 0.0); n],
                    |mut acc, part| {
                        acc.iter_mut().zip(part).for_each(|(a, b)| *a += b);
                        acc
                    },
                )
        });
        MultiAxisArray::from_vec(&self.image_dims, combined)
    }
}

/// Intensity-corrected operator: `trafo(x) = A(x·ic)`, `adjoint(y) = A^H(y)·ic`
pub struct Corrected<O> {
    inner: O,
    ic: MultiAxisArray<Complex64>,
}

impl<O: LinearOperator<Complex64>> Corrected<O> {
    pub fn new(inner: O, ic: &MultiAxisArray<f64>) -> Self {
        Self { inner, ic: ic.map(|v| Complex64::new(v, 0.0)) }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut O {
        &mut self.inner
    }

    pub fn intensity(&self) -> &MultiAxisArray<Complex64> {
        &self.ic
    }

    pub fn set_intensity(&mut self, ic: &MultiAxisArray<f64>) {
        assert_eq!(ic.dims(), self.ic.dims(), "intensity map extents changed");
        self.ic = ic.map(|v| Complex64::new(v, 0.0));
    }
}

impl<O: LinearOperator<Complex64>> LinearOperator<Complex64> for Corrected<O> {
    fn trafo(&self, x: &MultiAxisArray<Complex64>) -> MultiAxisArray<Complex64> {
        self.inner.trafo(&(x * &self.ic))
    }

    fn adjoint(&self, y: &MultiAxisArray<Complex64>) -> MultiAxisArray<Complex64> {
        self.inner.adjoint(y) * &self.ic
    }
}
