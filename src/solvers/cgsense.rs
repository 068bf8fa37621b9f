//! CG-SENSE reconstruction for non-Cartesian parallel imaging
//!
//! `trafo(m) = E(m / ic)` and `adjoint(y)` solves
//! `min ‖E diag(ic) z - y‖² + λ‖z‖²` by CGLS and returns `z·ic`, where `ic`
//! is the intensity map of the sensitivities.
//!
//! Reference:
//! Pruessmann et al., "Advances in sensitivity encoding with arbitrary
//! k-space trajectories", MRM 2001.

use super::cgls::cgls_with_progress;
use super::SolverOutcome;
use crate::array::MultiAxisArray;
use crate::config::{CgConfig, SenseConfig};
use crate::error::Result;
use crate::operators::{intensity_map, Corrected, LinearOperator, SenseEncoding};
use num_complex::Complex64;
use tracing::info;

/// Iterative SENSE operator
pub struct CgSense {
    op: Corrected<SenseEncoding>,
    config: CgConfig,
}

impl CgSense {
    /// Sensitivities have extents (N0, N1[, N2], nc)
    pub fn new(sens: MultiAxisArray<Complex64>, num_nodes: usize, config: &SenseConfig) -> Result<Self> {
        let ic = intensity_map(&sens);
        let encoding = SenseEncoding::new(sens, num_nodes, &config.nufft, config.threads)?;
        info!(
            "CG-SENSE: eps {:.3e}, iter {}, lambda {:.3e}; NUFFT: eps {:.3e}, iter {}, m {}, alpha {:.3e}",
            config.cg.eps,
            config.cg.max_iter,
            config.cg.lambda,
            config.nufft.ft_eps,
            config.nufft.ft_iter,
            config.nufft.m,
            config.nufft.alpha
        );
        Ok(Self { op: Corrected::new(encoding, &ic), config: config.cg.clone() })
    }

    pub fn set_trajectory(&mut self, k: &MultiAxisArray<f64>) {
        self.op.inner_mut().set_trajectory(k);
    }

    pub fn set_weights(&mut self, w: &MultiAxisArray<f64>) {
        self.op.inner_mut().set_weights(w);
    }

    pub fn set_phase_correction(&mut self, pc: &MultiAxisArray<Complex64>) {
        self.op.inner_mut().set_phase_correction(pc);
    }

    /// Swap in new sensitivities and recompute the intensity map
    pub fn set_sensitivities(&mut self, sens: MultiAxisArray<Complex64>) {
        let ic = intensity_map(&sens);
        self.op.inner_mut().set_sensitivities(sens);
        self.op.set_intensity(&ic);
    }

    pub fn encoding(&self) -> &SenseEncoding {
        self.op.inner()
    }

    pub fn intensity(&self) -> &MultiAxisArray<Complex64> {
        self.op.intensity()
    }

    pub fn config(&self) -> &CgConfig {
        &self.config
    }

    /// Full solver outcome; `x` and the recorded iterates are rescaled by `ic`
    pub fn solve(&self, y: &MultiAxisArray<Complex64>) -> SolverOutcome<Complex64> {
        self.solve_with_progress(y, |_, _, _| {})
    }

    pub fn solve_with_progress<F>(&self, y: &MultiAxisArray<Complex64>, progress_callback: F) -> SolverOutcome<Complex64>
    where
        F: FnMut(usize, usize, f64),
    {
        let mut out = cgls_with_progress(&self.op, y, &self.config, progress_callback);
        let ic = self.op.intensity();
        out.x *= ic;
        for iterate in out.iterates.iter_mut() {
            *iterate *= ic;
        }
        info!("CG-SENSE finished: {:?} after {} iterations", out.termination, out.iterations);
        out
    }
}

impl LinearOperator<Complex64> for CgSense {
    fn trafo(&self, m: &MultiAxisArray<Complex64>) -> MultiAxisArray<Complex64> {
        self.op.inner().trafo(&(m / self.op.intensity()))
    }

    fn adjoint(&self, y: &MultiAxisArray<Complex64>) -> MultiAxisArray<Complex64> {
        self.solve(y).x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NufftConfig;
    use crate::solvers::Termination;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn smooth_coils(n: usize, nc: usize) -> MultiAxisArray<Complex64> {
        let mut s = MultiAxisArray::new3(n, n, nc);
        for c in 0..nc {
            let phase = std::f64::consts::PI * c as f64 / nc as f64;
            for j in 0..n {
                for i in 0..n {
                    let w = 1.0 + 0.5 * ((i as f64 + phase) / n as f64).cos() + 0.2 * c as f64 * j as f64 / n as f64;
                    *s.at3_mut(i, j, c) = Complex64::from_polar(w, phase);
                }
            }
        }
        s
    }

    fn config(max_iter: usize) -> SenseConfig {
        SenseConfig {
            nufft: NufftConfig { alpha: 2.0, m: 3, ft_iter: 0, ft_eps: 0.0 },
            cg: CgConfig { max_iter, eps: 1e-14, lambda: 0.0, keep_iterates: true },
            threads: Some(2),
        }
    }

    #[test]
    fn test_trafo_divides_by_intensity() {
        let n = 8;
        let m = 20;
        let mut rng = StdRng::seed_from_u64(1);
        let k = MultiAxisArray::from_fn(&[2, m], |_| rng.random_range(-0.5..0.5));
        let mut op = CgSense::new(smooth_coils(n, 2), m, &config(5)).unwrap();
        op.set_trajectory(&k);

        let mut x: MultiAxisArray<Complex64> = MultiAxisArray::new2(n, n);
        x.fill_random(&mut rng);
        let direct = op.encoding().trafo(&(&x / op.intensity()));
        assert_eq!(op.trafo(&x), direct);
    }

    #[test]
    fn test_reconstructs_simulated_data() {
        let n = 8;
        let m = 160;
        let mut rng = StdRng::seed_from_u64(2);
        let k = MultiAxisArray::from_fn(&[2, m], |_| rng.random_range(-0.5..0.5));
        let mut op = CgSense::new(smooth_coils(n, 2), m, &config(300)).unwrap();
        op.set_trajectory(&k);

        let mut truth: MultiAxisArray<Complex64> = MultiAxisArray::new2(n, n);
        truth.fill_random(&mut rng);
        let y = op.encoding().trafo(&truth);

        let out = op.solve(&y);
        assert_ne!(out.termination, Termination::Diverged);
        assert_eq!(out.iterates.len(), out.iterations);
        let err = (&out.x - &truth).norm() / truth.norm();
        assert!(err < 1e-3, "relative error {}", err);
    }
}
