//! Common test utilities for recon-core integration tests

#![allow(dead_code)]

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recon_core::MultiAxisArray;

/// Compute RMSE between two complex images, only within mask (non-zero values)
pub fn rmse(a: &[Complex64], b: &[Complex64], mask: &[u8]) -> f64 {
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for i in 0..a.len() {
        if mask[i] > 0 {
            sum_sq += (a[i] - b[i]).norm_sqr();
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    (sum_sq / count as f64).sqrt()
}

/// Compute NRMSE (normalized by the largest ground-truth magnitude within mask)
pub fn nrmse(a: &[Complex64], b: &[Complex64], mask: &[u8]) -> f64 {
    let rmse_val = rmse(a, b, mask);
    let peak = b
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m > 0)
        .map(|(v, _)| v.norm())
        .fold(0.0, f64::max);
    if peak == 0.0 {
        return 0.0;
    }
    rmse_val / peak
}

/// Pearson correlation of the magnitudes within mask
pub fn correlation(a: &[Complex64], b: &[Complex64], mask: &[u8]) -> f64 {
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    let mut sum_ab = 0.0;
    let mut sum_a2 = 0.0;
    let mut sum_b2 = 0.0;
    let mut n = 0usize;

    for i in 0..a.len() {
        if mask[i] > 0 {
            let (x, y) = (a[i].norm(), b[i].norm());
            sum_a += x;
            sum_b += y;
            sum_ab += x * y;
            sum_a2 += x * x;
            sum_b2 += y * y;
            n += 1;
        }
    }

    if n == 0 {
        return 0.0;
    }

    let n = n as f64;
    let numerator = n * sum_ab - sum_a * sum_b;
    let denominator = ((n * sum_a2 - sum_a * sum_a) * (n * sum_b2 - sum_b * sum_b)).sqrt();

    if denominator == 0.0 {
        return 0.0;
    }

    numerator / denominator
}

/// Ellipse phantom on an n×n grid: a bright disc with two darker inserts
pub fn phantom(n: usize) -> MultiAxisArray<Complex64> {
    let c = (n as f64 - 1.0) / 2.0;
    let r = n as f64 * 0.35;
    let mut out = MultiAxisArray::new2(n, n);
    for j in 0..n {
        for i in 0..n {
            let x = (i as f64 - c) / r;
            let y = (j as f64 - c) / r;
            let mut v = 0.0;
            if x * x + y * y <= 1.0 {
                v = 1.0;
                if (x - 0.3).powi(2) / 0.04 + y * y / 0.16 <= 1.0 {
                    v -= 0.5;
                }
                if (x + 0.35).powi(2) / 0.09 + (y + 0.1).powi(2) / 0.04 <= 1.0 {
                    v -= 0.3;
                }
            }
            *out.at2_mut(i, j) = Complex64::new(v, 0.0);
        }
    }
    out
}

/// Support of `phantom(n)` as a mask
pub fn phantom_mask(n: usize) -> Vec<u8> {
    phantom(n).iter().map(|v| u8::from(v.norm() > 0.0)).collect()
}

/// Smooth coil profiles with distinct phases, extents (n, n, nc)
pub fn coil_maps(n: usize, nc: usize) -> MultiAxisArray<Complex64> {
    let mut s = MultiAxisArray::new3(n, n, nc);
    for c in 0..nc {
        let angle = 2.0 * std::f64::consts::PI * c as f64 / nc as f64;
        let (cx, cy) = (0.5 + 0.6 * angle.cos(), 0.5 + 0.6 * angle.sin());
        for j in 0..n {
            for i in 0..n {
                let dx = i as f64 / n as f64 - cx;
                let dy = j as f64 / n as f64 - cy;
                let w = (-(dx * dx + dy * dy) / 0.5).exp();
                *s.at3_mut(i, j, c) = Complex64::from_polar(w, angle);
            }
        }
    }
    s
}

/// Uniform random sampling positions in [-0.5, 0.5), extents (d, m)
pub fn random_trajectory(d: usize, m: usize, seed: u64) -> MultiAxisArray<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    MultiAxisArray::from_fn(&[d, m], |_| rng.random_range(-0.5..0.5))
}

/// Radial trajectory with `spokes` spokes of `samples` points
pub fn radial_trajectory(spokes: usize, samples: usize) -> MultiAxisArray<f64> {
    let mut k = MultiAxisArray::new2(2, spokes * samples);
    for s in 0..spokes {
        let angle = std::f64::consts::PI * s as f64 / spokes as f64;
        for t in 0..samples {
            let r = (t as f64 - samples as f64 / 2.0) / samples as f64;
            let node = s * samples + t;
            *k.at2_mut(0, node) = r * angle.cos();
            *k.at2_mut(1, node) = r * angle.sin();
        }
    }
    k
}

/// Direct non-uniform DFT of a column-major image (reference transform)
pub fn ndft(image: &MultiAxisArray<Complex64>, dims: &[usize], k: &MultiAxisArray<f64>) -> Vec<Complex64> {
    let d = dims.len();
    let m = k.size() / d;
    (0..m)
        .map(|j| {
            let mut sum = Complex64::new(0.0, 0.0);
            for (lin, &v) in image.iter().enumerate() {
                let mut rest = lin;
                let mut phase = 0.0;
                for (axis, &n) in dims.iter().enumerate() {
                    let idx = (rest % n) as f64 - (n / 2) as f64;
                    rest /= n;
                    phase += idx * k[axis + j * d];
                }
                sum += v * Complex64::from_polar(1.0, -2.0 * std::f64::consts::PI * phase);
            }
            sum
        })
        .collect()
}

/// Result of running an algorithm test
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub rmse: f64,
    pub nrmse: f64,
    pub correlation: f64,
}

impl TestResult {
    pub fn new(name: &str, output: &[Complex64], ground_truth: &[Complex64], mask: &[u8]) -> Self {
        TestResult {
            name: name.to_string(),
            rmse: rmse(output, ground_truth, mask),
            nrmse: nrmse(output, ground_truth, mask),
            correlation: correlation(output, ground_truth, mask),
        }
    }

    pub fn print(&self) {
        println!("{:<15} RMSE={:.6}  NRMSE={:.4}  r={:.4}",
            self.name, self.rmse, self.nrmse, self.correlation);
    }
}
