//! SIMD-accelerated reductions for the solver inner loops
//!
//! With the `simd` feature these use 256-bit lanes (f64x4). Complex64
//! buffers are reduced through their interleaved re/im view. All operations
//! have scalar fallbacks when SIMD is disabled.

#[cfg(feature = "simd")]
use wide::f64x4;

/// SIMD lane width (4 for f64x4)
#[cfg(feature = "simd")]
pub const SIMD_WIDTH: usize = 4;

#[cfg(not(feature = "simd"))]
pub const SIMD_WIDTH: usize = 1;

#[cfg(feature = "simd")]
#[inline]
fn load(a: &[f64], idx: usize) -> f64x4 {
    f64x4::from([a[idx], a[idx + 1], a[idx + 2], a[idx + 3]])
}

/// Compute dot product: sum(a[i] * b[i])
#[cfg(feature = "simd")]
#[inline]
pub fn dot_product_f64(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let chunks = a.len() / SIMD_WIDTH;

    let mut sum = f64x4::ZERO;
    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        sum += load(a, idx) * load(b, idx);
    }

    let mut result = sum.reduce_add();
    for i in chunks * SIMD_WIDTH..a.len() {
        result += a[i] * b[i];
    }
    result
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn dot_product_f64(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&ai, &bi)| ai * bi).sum()
}

/// Compute squared norm: sum(a[i]^2)
#[cfg(feature = "simd")]
#[inline]
pub fn norm_squared_f64(a: &[f64]) -> f64 {
    let chunks = a.len() / SIMD_WIDTH;

    let mut sum = f64x4::ZERO;
    for i in 0..chunks {
        let va = load(a, i * SIMD_WIDTH);
        sum += va * va;
    }

    let mut result = sum.reduce_add();
    for v in &a[chunks * SIMD_WIDTH..] {
        result += v * v;
    }
    result
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn norm_squared_f64(a: &[f64]) -> f64 {
    a.iter().map(|&ai| ai * ai).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product() {
        let a: Vec<f64> = (0..11).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..11).map(|i| 2.0 - i as f64).collect();
        let expected: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert!((dot_product_f64(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_norm_squared_remainder() {
        // 7 elements exercises both the lane loop and the tail
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(norm_squared_f64(&a), 140.0);
        assert_eq!(norm_squared_f64(&[]), 0.0);
    }
}
