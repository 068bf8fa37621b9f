//! Bridge between [`MultiAxisArray`] planes and faer matrices
//!
//! Real element kinds are computed in `f64`, complex kinds in `Complex64`.
//! Results are converted back to the caller's element type.

use crate::array::{Element, MultiAxisArray};
use crate::MIN_PARALLEL_LEN;
use faer::linalg::matmul::matmul_with_conj;
use faer::mat::{Mat, MatRef};
use faer::{Accum, Conj, Par};
use faer_traits::ComplexField;
use num_complex::Complex64;

/// How the right operand of a product is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trans {
    /// B
    No,
    /// B^T
    Transpose,
    /// B^H (equals B^T for real types)
    ConjTranspose,
}

/// Working precision for a factorisation or product
pub(crate) trait Compute: ComplexField + Copy + Send + Sync + 'static {
    fn from_element<T: Element>(value: T) -> Self;
    fn to_element<T: Element>(self) -> T;
    fn to_c64(self) -> Complex64;
    fn modulus(self) -> f64;
    fn unit() -> Self;
}

impl Compute for f64 {
    #[inline]
    fn from_element<T: Element>(value: T) -> Self {
        value.to_c64().re
    }
    #[inline]
    fn to_element<T: Element>(self) -> T {
        T::from_f64(self)
    }
    #[inline]
    fn to_c64(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
    #[inline]
    fn modulus(self) -> f64 {
        self.abs()
    }
    #[inline]
    fn unit() -> Self {
        1.0
    }
}

impl Compute for Complex64 {
    #[inline]
    fn from_element<T: Element>(value: T) -> Self {
        value.to_c64()
    }
    #[inline]
    fn to_element<T: Element>(self) -> T {
        T::from_c64(self)
    }
    #[inline]
    fn to_c64(self) -> Complex64 {
        self
    }
    #[inline]
    fn modulus(self) -> f64 {
        self.norm()
    }
    #[inline]
    fn unit() -> Self {
        Complex64::new(1.0, 0.0)
    }
}

/// Copy the inner 2-D plane into a faer matrix
pub(crate) fn to_mat<E: Compute, T: Element>(a: &MultiAxisArray<T>) -> Mat<E> {
    assert!(a.is_2d(), "matrix operation requires a 2-D operand");
    Mat::from_fn(a.dim(0), a.dim(1), |i, j| E::from_element(a.at2(i, j)))
}

pub(crate) fn from_mat<E: Compute, T: Element>(m: MatRef<'_, E>) -> MultiAxisArray<T> {
    let rows = m.nrows();
    MultiAxisArray::from_fn(&[rows, m.ncols()], |k| m[(k % rows, k / rows)].to_element())
}

fn parallelism(work: usize) -> Par {
    if work >= MIN_PARALLEL_LEN {
        Par::rayon(0)
    } else {
        Par::Seq
    }
}

pub(crate) fn matmul_in<E: Compute>(a: MatRef<'_, E>, b: MatRef<'_, E>, trans_b: Trans) -> Mat<E> {
    let (rhs, conj_b) = match trans_b {
        Trans::No => (b, Conj::No),
        Trans::Transpose => (b.transpose(), Conj::No),
        Trans::ConjTranspose => (b.transpose(), Conj::Yes),
    };
    assert_eq!(
        a.ncols(),
        rhs.nrows(),
        "inner dimensions differ: {}x{} · {}x{}",
        a.nrows(),
        a.ncols(),
        rhs.nrows(),
        rhs.ncols()
    );
    let mut c = Mat::<E>::zeros(a.nrows(), rhs.ncols());
    let par = parallelism(a.nrows() * a.ncols() * rhs.ncols());
    matmul_with_conj(c.as_mut(), Accum::Replace, a, Conj::No, rhs, conj_b, E::unit(), par);
    c
}

fn gemm_in<E: Compute, T: Element>(a: &MultiAxisArray<T>, b: &MultiAxisArray<T>, trans_b: Trans) -> MultiAxisArray<T> {
    let am = to_mat::<E, T>(a);
    let bm = to_mat::<E, T>(b);
    from_mat(matmul_in(am.as_ref(), bm.as_ref(), trans_b).as_ref())
}

/// `C = A · op(B)` over the inner 2-D planes
pub fn gemm<T: Element>(a: &MultiAxisArray<T>, b: &MultiAxisArray<T>, trans_b: Trans) -> MultiAxisArray<T> {
    if T::KIND.is_complex() {
        gemm_in::<Complex64, T>(a, b, trans_b)
    } else {
        gemm_in::<f64, T>(a, b, trans_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gemm_matches_naive() {
        let a = MultiAxisArray::from_fn(&[3, 4], |i| i as f64 + 1.0);
        let b = MultiAxisArray::from_fn(&[4, 2], |i| 0.5 * i as f64);
        let c = gemm(&a, &b, Trans::No);
        for i in 0..3 {
            for j in 0..2 {
                let expected: f64 = (0..4).map(|l| a.at2(i, l) * b.at2(l, j)).sum();
                assert_abs_diff_eq!(c.at2(i, j), expected, epsilon = 1e-12);
            }
        }
        let ct = gemm(&a, &b.tr(), Trans::Transpose);
        for (x, y) in ct.iter().zip(c.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gemm_integer_rounds_back() {
        let a = MultiAxisArray::from_vec(&[2, 2], vec![1i16, 2, 3, 4]);
        let c = gemm(&a, &a, Trans::No);
        assert_eq!(c.as_slice(), &[7, 10, 15, 22]);
    }

    #[test]
    fn test_conj_transpose_conjugates() {
        let b = MultiAxisArray::from_vec(&[1, 2], vec![Complex64::new(0.0, 1.0), Complex64::new(2.0, -1.0)]);
        let a = MultiAxisArray::from_vec(&[1, 2], vec![Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)]);
        let c = gemm(&a, &b, Trans::ConjTranspose);
        assert_abs_diff_eq!((c[0] - Complex64::new(2.0, 0.0)).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    #[should_panic(expected = "inner dimensions differ")]
    fn test_gemm_inner_mismatch() {
        let a: MultiAxisArray<f32> = MultiAxisArray::new2(3, 4);
        let b: MultiAxisArray<f32> = MultiAxisArray::new2(3, 4);
        let _ = gemm(&a, &b, Trans::No);
    }
}
