//! Non-uniform FFT by Kaiser-Bessel gridding
//!
//! Forward (`trafo`):  f_j = Σ_k f̂_k e^{-2πi k·x_j}
//! Adjoint:            f̂_k = Σ_j f_j e^{+2πi k·x_j}
//!
//! Image index `i` maps to frequency `k = i - N/2`. Nodes live in
//! [-0.5, 0.5)^d. Every transform goes through an oversampled grid of
//! `n = ⌈αN⌉` (rounded up to even) points per axis:
//!
//! 1. trafo: ĝ_k = f̂_k / φ̂(k), g = FFT(ĝ), f_j = Σ_l g_l φ(n x_j - l)
//! 2. adjoint: g_l = Σ_j f_j φ(n x_j - l), ĝ = IFFT(g), f̂_k = ĝ_k / φ̂(k)
//!
//! `adjoint` on the [`LinearOperator`] trait runs the density-weighted,
//! damped CGNR inverse for `ft_iter` iterations; with `ft_iter = 0` it is
//! the weighted adjoint `A^H W y`. [`Nufft::adjoint_direct`] is the exact
//! adjoint of `trafo`.

use super::window::KaiserBessel;
use super::LinearOperator;
use crate::array::{ComplexScalar, MultiAxisArray};
use crate::config::NufftConfig;
use crate::fft::FftWorkspace;
use num_complex::Complex64;
use std::sync::Mutex;
use tracing::debug;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

fn oversampled(image: usize, alpha: f64) -> usize {
    let g = ((alpha * image as f64).ceil() as usize).max(image);
    g + g % 2
}

/// Scratch memory fully overwritten on every call
struct Plan {
    fft: FftWorkspace,
    grid: Vec<Complex64>,
}

/// Gridding NUFFT in 1, 2 or 3 dimensions
///
/// Samples of a real image are complex, so the operator is implemented for
/// complex element types only:
///
/// ```compile_fail
/// use recon_core::config::NufftConfig;
/// use recon_core::operators::Nufft;
/// use recon_core::{LinearOperator, MultiAxisArray};
///
/// let plan = Nufft::new(&[8], 4, &NufftConfig::default());
/// let image: MultiAxisArray<f64> = MultiAxisArray::new1(8);
/// let _ = plan.trafo(&image);
/// ```
pub struct Nufft {
    config: NufftConfig,
    dims: usize,
    /// Image extents, padded with 1
    image: [usize; 3],
    /// Oversampled grid extents, padded with 1
    grid: [usize; 3],
    /// Window width per axis (1 on padded axes)
    width: [usize; 3],
    windows: [KaiserBessel; 3],
    /// 1/φ̂(k) per axis and image index
    deapod: [Vec<f64>; 3],
    num_nodes: usize,
    /// First grid index touched by each node, per axis
    node_start: Vec<[i64; 3]>,
    /// Window weights per node: width[0] + width[1] + width[2] values
    node_weight: Vec<f64>,
    weights: Vec<f64>,
    damping: Vec<f64>,
    phase: Option<Vec<Complex64>>,
    plan: Mutex<Plan>,
    initialised: bool,
}

impl Nufft {
    /// Plan for an image of extents `image_dims` (1 to 3 axes) sampled at
    /// `num_nodes` points. The trajectory must be set before transforming.
    pub fn new(image_dims: &[usize], num_nodes: usize, config: &NufftConfig) -> Self {
        let dims = image_dims.len();
        assert!((1..=3).contains(&dims), "NUFFT supports 1 to 3 dimensions, got {}", dims);
        assert!(config.alpha >= 1.0, "oversampling factor must be at least 1");
        assert!(num_nodes > 0, "NUFFT needs at least one node");

        let mut image = [1usize; 3];
        let mut grid = [1usize; 3];
        let mut width = [1usize; 3];
        image[..dims].copy_from_slice(image_dims);
        for d in 0..dims {
            assert!(image[d] > 1, "image extent along axis {} must exceed 1", d);
            grid[d] = oversampled(image[d], config.alpha);
            width[d] = 2 * config.m + 1;
        }

        let windows = [0, 1, 2].map(|d| KaiserBessel::new(image[d], grid[d], config.m));
        let deapod = [0, 1, 2].map(|d| {
            if d >= dims {
                return vec![1.0];
            }
            let half = (image[d] / 2) as i64;
            (0..image[d] as i64).map(|i| 1.0 / windows[d].phi_hat(i - half)).collect()
        });
        let damping = damping_weights(&image, dims);

        debug!(
            "NUFFT plan: image {:?}, grid {:?}, nodes {}, m {}",
            &image[..dims], &grid[..dims], num_nodes, config.m
        );

        Self {
            config: config.clone(),
            dims,
            image,
            grid,
            width,
            windows,
            deapod,
            num_nodes,
            node_start: Vec::new(),
            node_weight: Vec::new(),
            weights: vec![1.0; num_nodes],
            damping,
            phase: None,
            plan: Mutex::new(Plan {
                fft: FftWorkspace::new(grid[0], grid[1], grid[2]),
                grid: vec![ZERO; grid.iter().product()],
            }),
            initialised: false,
        }
    }

    /// Set node positions: extents (d, M), values in [-0.5, 0.5)
    pub fn set_trajectory(&mut self, k: &MultiAxisArray<f64>) {
        let d = self.dims;
        assert_eq!(k.dim(0), d, "trajectory must have {} rows", d);
        assert_eq!(k.size(), d * self.num_nodes, "trajectory must hold {} nodes", self.num_nodes);

        let stride: usize = self.width.iter().sum();
        self.node_start = Vec::with_capacity(self.num_nodes);
        self.node_weight = vec![0.0; stride * self.num_nodes];

        for j in 0..self.num_nodes {
            let mut start = [0i64; 3];
            let mut offset = j * stride;
            for axis in 0..3 {
                if axis >= d {
                    self.node_weight[offset] = 1.0;
                    offset += 1;
                    continue;
                }
                let x = k[axis + j * d];
                assert!((-0.5..0.5).contains(&x), "node {} lies outside [-0.5, 0.5): {}", j, x);
                let u = x * self.grid[axis] as f64;
                let first = (u - self.config.m as f64).ceil() as i64;
                start[axis] = first;
                for w in 0..self.width[axis] {
                    self.node_weight[offset + w] = self.windows[axis].phi(u - (first + w as i64) as f64);
                }
                offset += self.width[axis];
            }
            self.node_start.push(start);
        }
        self.initialised = true;
    }

    /// Density compensation weights, extents (M)
    pub fn set_weights(&mut self, w: &MultiAxisArray<f64>) {
        assert_eq!(w.size(), self.num_nodes, "expected {} weights", self.num_nodes);
        self.weights = w.as_slice().to_vec();
    }

    /// Image-space phase applied before `trafo` and conjugated after `adjoint`
    pub fn set_phase_correction(&mut self, pc: &MultiAxisArray<Complex64>) {
        assert_eq!(pc.size(), self.image_len(), "phase map must match the image");
        self.phase = Some(pc.as_slice().to_vec());
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn image_dims(&self) -> &[usize] {
        &self.image[..self.dims]
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn config(&self) -> &NufftConfig {
        &self.config
    }

    fn image_len(&self) -> usize {
        self.image.iter().product()
    }

    fn check_initialised(&self) {
        assert!(self.initialised, "NUFFT used before a trajectory was set");
    }

    /// Grid offsets and combined weight of every grid point touched by node `j`
    #[inline]
    fn for_each_tap<F: FnMut(usize, f64)>(&self, j: usize, mut f: F) {
        let stride: usize = self.width.iter().sum();
        let base = j * stride;
        let wx = &self.node_weight[base..base + self.width[0]];
        let wy = &self.node_weight[base + self.width[0]..base + self.width[0] + self.width[1]];
        let wz = &self.node_weight[base + self.width[0] + self.width[1]..base + stride];
        let start = self.node_start[j];
        let [nx, ny, nz] = self.grid.map(|g| g as i64);

        for (c, &vz) in wz.iter().enumerate() {
            if vz == 0.0 {
                continue;
            }
            let lz = (start[2] + c as i64).rem_euclid(nz) as usize;
            for (b, &vy) in wy.iter().enumerate() {
                if vy == 0.0 {
                    continue;
                }
                let ly = (start[1] + b as i64).rem_euclid(ny) as usize;
                let row = (ly + lz * ny as usize) * nx as usize;
                let vyz = vy * vz;
                for (a, &vx) in wx.iter().enumerate() {
                    if vx == 0.0 {
                        continue;
                    }
                    let lx = (start[0] + a as i64).rem_euclid(nx) as usize;
                    f(row + lx, vx * vyz);
                }
            }
        }
    }

    #[inline]
    fn deapod_at(&self, i: [usize; 3]) -> f64 {
        self.deapod[0][i[0]] * self.deapod[1][i[1]] * self.deapod[2][i[2]]
    }

    /// Grid offset of image index (i0, i1, i2)
    #[inline]
    fn grid_offset(&self, i: [usize; 3]) -> usize {
        let mut off = 0;
        let mut stride = 1;
        for d in 0..3 {
            let k = i[d] as i64 - (self.image[d] / 2) as i64;
            off += (k.rem_euclid(self.grid[d] as i64) as usize) * stride;
            stride *= self.grid[d];
        }
        off
    }

    fn for_each_image_index<F: FnMut(usize, [usize; 3])>(&self, mut f: F) {
        let [n0, n1, n2] = self.image;
        let mut lin = 0;
        for i2 in 0..n2 {
            for i1 in 0..n1 {
                for i0 in 0..n0 {
                    f(lin, [i0, i1, i2]);
                    lin += 1;
                }
            }
        }
    }

    /// Unweighted forward transform on raw buffers
    fn forward_raw(&self, plan: &mut Plan, f_hat: &[Complex64]) -> Vec<Complex64> {
        plan.grid.iter_mut().for_each(|g| *g = ZERO);
        self.for_each_image_index(|lin, i| {
            let scale = self.deapod_at(i);
            let v = match &self.phase {
                Some(pc) => f_hat[lin] * pc[lin],
                None => f_hat[lin],
            };
            plan.grid[self.grid_offset(i)] = v * scale;
        });
        plan.fft.forward(&mut plan.grid);

        let grid = &plan.grid;
        (0..self.num_nodes)
            .map(|j| {
                let mut acc = ZERO;
                self.for_each_tap(j, |l, w| acc += grid[l] * w);
                acc
            })
            .collect()
    }

    /// Exact adjoint on raw buffers
    fn adjoint_raw(&self, plan: &mut Plan, f: &[Complex64]) -> Vec<Complex64> {
        plan.grid.iter_mut().for_each(|g| *g = ZERO);
        for (j, &fj) in f.iter().enumerate() {
            let grid = &mut plan.grid;
            self.for_each_tap(j, |l, w| grid[l] += fj * w);
        }
        plan.fft.backward(&mut plan.grid);

        let mut out = vec![ZERO; self.image_len()];
        self.for_each_image_index(|lin, i| {
            let scale = self.deapod_at(i);
            let v = plan.grid[self.grid_offset(i)] * scale;
            out[lin] = match &self.phase {
                Some(pc) => v * pc[lin].conj(),
                None => v,
            };
        });
        out
    }

    fn lock_plan(&self) -> std::sync::MutexGuard<'_, Plan> {
        self.plan.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Density-weighted, damped CGNR inverse starting from zero
    fn inverse_raw(&self, plan: &mut Plan, y: &[Complex64]) -> Vec<Complex64> {
        let w = &self.weights;
        let w_hat = &self.damping;
        let weighted = |v: &[Complex64]| -> Vec<Complex64> { v.iter().zip(w).map(|(&a, &b)| a * b).collect() };
        let dot_w = |v: &[Complex64]| -> f64 { v.iter().zip(w).map(|(a, &b)| a.norm_sqr() * b).sum() };
        let dot_w_hat = |v: &[Complex64]| -> f64 { v.iter().zip(w_hat).map(|(a, &b)| a.norm_sqr() * b).sum() };

        let mut f_hat = vec![ZERO; self.image_len()];
        let mut r = y.to_vec();
        let mut dot_r = dot_w(&r);
        let mut z_hat = self.adjoint_raw(plan, &weighted(&r));
        let mut dot_z = dot_w_hat(&z_hat);
        let mut p_hat = z_hat.clone();

        for iter in 0..self.config.ft_iter {
            if dot_r < self.config.ft_eps {
                break;
            }
            let wp: Vec<Complex64> = p_hat.iter().zip(w_hat).map(|(&p, &d)| p * d).collect();
            let v = self.forward_raw(plan, &wp);
            let dot_v = dot_w(&v);
            if dot_v == 0.0 {
                break;
            }
            let alpha = dot_z / dot_v;
            for (f, &pw) in f_hat.iter_mut().zip(&wp) {
                *f += pw * alpha;
            }
            for (ri, &vi) in r.iter_mut().zip(&v) {
                *ri -= vi * alpha;
            }
            dot_r = dot_w(&r);
            z_hat = self.adjoint_raw(plan, &weighted(&r));
            let dot_z_old = dot_z;
            dot_z = dot_w_hat(&z_hat);
            let beta = if dot_z_old > 0.0 { dot_z / dot_z_old } else { 0.0 };
            for (p, &z) in p_hat.iter_mut().zip(&z_hat) {
                *p = *p * beta + z;
            }
            debug!("NUFFT inverse iteration {}: weighted residual {:.3e}", iter, dot_r);
        }
        f_hat
    }

    fn image_array<T: ComplexScalar>(&self, data: Vec<Complex64>) -> MultiAxisArray<T> {
        MultiAxisArray::from_vec(self.image_dims(), data.into_iter().map(T::from_c64).collect())
    }

    /// Exact adjoint `A^H y` (no weights, no iterations)
    pub fn adjoint_direct<T: ComplexScalar>(&self, y: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        self.check_initialised();
        assert_eq!(y.size(), self.num_nodes, "expected {} samples", self.num_nodes);
        let f: Vec<Complex64> = y.iter().map(|v| v.to_c64()).collect();
        let mut plan = self.lock_plan();
        let out = self.adjoint_raw(&mut plan, &f);
        self.image_array(out)
    }
}

/// Circular damping: 1 inside radius N/2 of the centred frequency grid, 0 outside.
/// Constant 1 in one dimension.
fn damping_weights(image: &[usize; 3], dims: usize) -> Vec<f64> {
    let len: usize = image.iter().product();
    if dims == 1 {
        return vec![1.0; len];
    }
    let radius = image[0] as f64 / 2.0;
    let mut out = Vec::with_capacity(len);
    for i2 in 0..image[2] {
        for i1 in 0..image[1] {
            for i0 in 0..image[0] {
                let k = [i0, i1, i2]
                    .iter()
                    .zip(image.iter())
                    .take(dims)
                    .map(|(&i, &n)| {
                        let k = i as f64 - (n / 2) as f64;
                        k * k
                    })
                    .sum::<f64>()
                    .sqrt();
                out.push(if k > radius { 0.0 } else { 1.0 });
            }
        }
    }
    out
}

impl<T: ComplexScalar> LinearOperator<T> for Nufft {
    /// Image (N0[, N1[, N2]]) to samples (M)
    fn trafo(&self, x: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        self.check_initialised();
        assert_eq!(x.size(), self.image_len(), "image size does not match the plan");
        let f_hat: Vec<Complex64> = x.iter().map(|v| v.to_c64()).collect();
        let mut plan = self.lock_plan();
        let f = self.forward_raw(&mut plan, &f_hat);
        MultiAxisArray::from_vec(&[self.num_nodes], f.into_iter().map(T::from_c64).collect())
    }

    /// Samples (M) to image; weighted inverse when `ft_iter > 0`
    fn adjoint(&self, y: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        self.check_initialised();
        assert_eq!(y.size(), self.num_nodes, "expected {} samples", self.num_nodes);
        let f: Vec<Complex64> = y.iter().map(|v| v.to_c64()).collect();
        let mut plan = self.lock_plan();
        let out = if self.config.ft_iter == 0 {
            let wf: Vec<Complex64> = f.iter().zip(&self.weights).map(|(&a, &b)| a * b).collect();
            self.adjoint_raw(&mut plan, &wf)
        } else {
            self.inverse_raw(&mut plan, &f)
        };
        self.image_array(out)
    }
}
