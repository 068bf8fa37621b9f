//! Kaiser-Bessel gridding window
//!
//! For an oversampled grid of `n` points, cutoff `m` and shape
//! `b = π(2 - 1/σ)` with `σ = n / N`:
//!
//! ```text
//! φ(u)  = sinh(b·sqrt(m² - u²)) / (π·sqrt(m² - u²)),   |u| ≤ m  (u in grid units)
//! φ̂(k) = I0(m·sqrt(b² - (2πk/n)²))
//! ```

use std::f64::consts::PI;

/// Modified Bessel function of the first kind, order zero (power series)
pub fn bessel_i0(x: f64) -> f64 {
    let q = 0.25 * x * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    loop {
        term *= q / (k * k);
        sum += term;
        if term <= sum * 1e-17 {
            break;
        }
        k += 1.0;
    }
    sum
}

/// Window along one axis
#[derive(Debug, Clone, Copy)]
pub struct KaiserBessel {
    /// Oversampled grid size
    pub n: usize,
    /// Cutoff in grid points
    pub m: usize,
    /// Shape parameter
    pub b: f64,
}

impl KaiserBessel {
    pub fn new(image: usize, grid: usize, m: usize) -> Self {
        let sigma = grid as f64 / image as f64;
        Self { n: grid, m, b: PI * (2.0 - 1.0 / sigma) }
    }

    /// Window value at `u` grid points from the node; zero beyond the cutoff
    #[inline]
    pub fn phi(&self, u: f64) -> f64 {
        let m = self.m as f64;
        let arg = m * m - u * u;
        if arg < 0.0 {
            return 0.0;
        }
        let s = arg.sqrt();
        if s < 1e-12 {
            self.b / PI
        } else {
            (self.b * s).sinh() / (PI * s)
        }
    }

    /// Deapodisation factor for frequency `k`
    pub fn phi_hat(&self, k: i64) -> f64 {
        let w = 2.0 * PI * k as f64 / self.n as f64;
        let arg = (self.b * self.b - w * w).max(0.0);
        bessel_i0(self.m as f64 * arg.sqrt())
    }
}
