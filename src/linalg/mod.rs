//! Dense linear algebra on the inner 2-D plane of a [`MultiAxisArray`]
//!
//! Products and factorisations run on faer. Failures are returned as
//! [`Error`](crate::Error) values carrying a LAPACK-style `info` code.

pub mod simd_ops;

mod dense;

pub use dense::{gemm, Trans};

use crate::array::{Element, MultiAxisArray, Scalar};
use crate::error::{Error, Result};
use dense::{from_mat, matmul_in, to_mat, Compute};
use faer::linalg::solvers::{DenseSolveCore, LltError};
use faer::mat::{Mat, MatRef};
use faer::Side;
use num_complex::Complex64;

/// Economy-size SVD `A = U diag(s) V^H`
#[derive(Debug, Clone)]
pub struct Svd<T> {
    /// m × k left singular vectors
    pub u: MultiAxisArray<T>,
    /// k singular values, descending
    pub s: MultiAxisArray<f64>,
    /// k × n conjugate-transposed right singular vectors
    pub vh: MultiAxisArray<T>,
}

/// General eigendecomposition
#[derive(Debug, Clone)]
pub struct Eig {
    pub values: MultiAxisArray<Complex64>,
    /// Right eigenvectors as columns, unit 2-norm
    pub right: Option<MultiAxisArray<Complex64>>,
    /// Left eigenvectors as columns, unit 2-norm
    pub left: Option<MultiAxisArray<Complex64>>,
}

fn assert_square<T: Element>(a: &MultiAxisArray<T>, what: &str) {
    assert!(a.is_2d() && a.dim(0) == a.dim(1), "{} requires a square matrix", what);
}

/// LU with partial pivoting. A pivot below `n·ε·max|u_ii|` is reported as
/// singular with its 1-based position as `info`.
fn inverse_in<E: Compute>(a: MatRef<'_, E>) -> Result<Mat<E>> {
    let n = a.nrows();
    let lu = a.partial_piv_lu();
    let u = lu.U();
    let pivots: Vec<f64> = (0..n).map(|k| u[(k, k)].modulus()).collect();
    let largest = pivots.iter().cloned().fold(0.0, f64::max);
    let tol = n as f64 * f64::EPSILON * largest;
    if let Some(k) = pivots.iter().position(|&p| p <= tol || !p.is_finite()) {
        return Err(Error::Singular { info: (k + 1) as i32 });
    }
    Ok(lu.inverse())
}

fn cholesky_in<E: Compute>(a: MatRef<'_, E>) -> Result<faer::linalg::solvers::Llt<E>> {
    a.llt(Side::Lower).map_err(|e| match e {
        LltError::NonPositivePivot { index } => Error::NotPositiveDefinite { info: (index + 1) as i32 },
    })
}

fn owned<E: Compute>(m: MatRef<'_, E>) -> Mat<E> {
    Mat::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)])
}

struct SvdParts<E> {
    u: Mat<E>,
    s: Vec<f64>,
    v: Mat<E>,
}

fn svd_in<E: Compute>(a: MatRef<'_, E>) -> Result<SvdParts<E>> {
    let k = a.nrows().min(a.ncols());
    let f = a.thin_svd().map_err(|_| Error::NoConvergence { info: k as i32 })?;
    let s = f.S().column_vector();
    Ok(SvdParts { u: owned(f.U()), s: (0..k).map(|i| s[i].modulus()).collect(), v: owned(f.V()) })
}

/// `V diag(1/s) U^H` over singular values above `max(m,n)·ε·s_max`
fn pinv_in<E: Compute>(a: MatRef<'_, E>) -> Result<Mat<E>> {
    let f = svd_in(a)?;
    let tol = a.nrows().max(a.ncols()) as f64 * f64::EPSILON * f.s.first().copied().unwrap_or(0.0);
    let mut vs = f.v;
    for (j, &sj) in f.s.iter().enumerate() {
        let scale = if sj > tol { 1.0 / sj } else { 0.0 };
        for i in 0..vs.nrows() {
            vs[(i, j)] = E::from_element(vs[(i, j)].to_c64() * scale);
        }
    }
    Ok(matmul_in(vs.as_ref(), f.u.as_ref(), Trans::ConjTranspose))
}

fn eig_hermitian_in<E: Compute>(a: MatRef<'_, E>) -> Result<(Vec<f64>, Mat<E>)> {
    let n = a.nrows();
    let f = a.self_adjoint_eigen(Side::Lower).map_err(|_| Error::NoConvergence { info: n as i32 })?;
    let s = f.S().column_vector();
    Ok(((0..n).map(|i| s[i].to_c64().re).collect(), owned(f.U())))
}

fn normalise_columns(m: &mut Mat<Complex64>) {
    for j in 0..m.ncols() {
        let nrm = (0..m.nrows()).map(|i| m[(i, j)].norm_sqr()).sum::<f64>().sqrt();
        if nrm > 0.0 {
            for i in 0..m.nrows() {
                m[(i, j)] /= nrm;
            }
        }
    }
}

impl<T: Element> MultiAxisArray<T> {
    /// Matrix product `self · b`
    pub fn prod(&self, b: &Self) -> Self {
        gemm(self, b, Trans::No)
    }

    /// `self · b^H` (`self · b^T` for real types)
    pub fn prodt(&self, b: &Self) -> Self {
        gemm(self, b, Trans::ConjTranspose)
    }
}

impl<T: Scalar> MultiAxisArray<T> {
    /// Matrix inverse by LU with partial pivoting
    pub fn inv(&self) -> Result<Self> {
        assert_square(self, "inverse");
        if T::KIND.is_complex() {
            Ok(from_mat(inverse_in(to_mat::<Complex64, T>(self).as_ref())?.as_ref()))
        } else {
            Ok(from_mat(inverse_in(to_mat::<f64, T>(self).as_ref())?.as_ref()))
        }
    }

    /// Moore-Penrose pseudo-inverse
    pub fn pinv(&self) -> Result<Self> {
        if T::KIND.is_complex() {
            Ok(from_mat(pinv_in(to_mat::<Complex64, T>(self).as_ref())?.as_ref()))
        } else {
            Ok(from_mat(pinv_in(to_mat::<f64, T>(self).as_ref())?.as_ref()))
        }
    }

    /// Lower Cholesky factor `L` with `self = L L^H`
    pub fn chol(&self) -> Result<Self> {
        fn lower<E: Compute, T: Element>(a: &MultiAxisArray<T>) -> Result<MultiAxisArray<T>> {
            let f = cholesky_in(to_mat::<E, T>(a).as_ref())?;
            let l = f.L();
            let n = l.nrows();
            Ok(MultiAxisArray::from_fn(&[n, n], |k| {
                let (i, j) = (k % n, k / n);
                if i >= j {
                    l[(i, j)].to_element()
                } else {
                    T::zero()
                }
            }))
        }
        assert_square(self, "Cholesky");
        if T::KIND.is_complex() {
            lower::<Complex64, T>(self)
        } else {
            lower::<f64, T>(self)
        }
    }

    /// Inverse of a Hermitian positive definite matrix via Cholesky
    pub fn chol_inv(&self) -> Result<Self> {
        assert_square(self, "Cholesky");
        if T::KIND.is_complex() {
            Ok(from_mat(cholesky_in(to_mat::<Complex64, T>(self).as_ref())?.inverse().as_ref()))
        } else {
            Ok(from_mat(cholesky_in(to_mat::<f64, T>(self).as_ref())?.inverse().as_ref()))
        }
    }

    pub fn svd(&self) -> Result<Svd<T>> {
        fn parts<E: Compute, T: Element>(a: &MultiAxisArray<T>) -> Result<Svd<T>> {
            let f = svd_in(to_mat::<E, T>(a).as_ref())?;
            let k = f.s.len();
            let v = f.v.as_ref();
            let vh = MultiAxisArray::from_fn(&[k, v.nrows()], |idx| T::from_c64(v[(idx / k, idx % k)].to_c64().conj()));
            Ok(Svd { u: from_mat(f.u.as_ref()), s: MultiAxisArray::from_vec(&[k], f.s), vh })
        }
        if T::KIND.is_complex() {
            parts::<Complex64, T>(self)
        } else {
            parts::<f64, T>(self)
        }
    }

    /// Eigenvalues and optionally eigenvectors of a general square matrix
    pub fn eig(&self, right: bool, left: bool) -> Result<Eig> {
        assert_square(self, "eigendecomposition");
        let n = self.dim(0);
        let a = to_mat::<Complex64, T>(self);
        let f = a.as_ref().eigen().map_err(|_| Error::NoConvergence { info: n as i32 })?;
        let s = f.S().column_vector();
        let values = MultiAxisArray::from_fn(&[n], |i| s[i]);
        if !right && !left {
            return Ok(Eig { values, right: None, left: None });
        }

        let mut v = f.U().to_owned();
        normalise_columns(&mut v);
        let left = if left {
            // Rows of V^{-1} are the left eigenvectors
            let v_inv = inverse_in(v.as_ref())?;
            let mut l = v_inv.as_ref().adjoint().to_owned();
            normalise_columns(&mut l);
            Some(from_mat(l.as_ref()))
        } else {
            None
        };
        Ok(Eig { values, right: if right { Some(from_mat(v.as_ref())) } else { None }, left })
    }

    /// Eigenvalues (ascending) and orthonormal eigenvectors of a Hermitian matrix
    pub fn eig_hermitian(&self) -> Result<(MultiAxisArray<f64>, Self)> {
        fn parts<E: Compute, T: Element>(a: &MultiAxisArray<T>) -> Result<(MultiAxisArray<f64>, MultiAxisArray<T>)> {
            let (w, v) = eig_hermitian_in(to_mat::<E, T>(a).as_ref())?;
            let n = w.len();
            Ok((MultiAxisArray::from_vec(&[n], w), from_mat(v.as_ref())))
        }
        assert_square(self, "eigendecomposition");
        if T::KIND.is_complex() {
            parts::<Complex64, T>(self)
        } else {
            parts::<f64, T>(self)
        }
    }

    /// Minimum-norm least-squares solution of `self · x = b`
    pub fn lstsq(&self, b: &Self) -> Result<Self> {
        assert_eq!(self.dim(0), b.dim(0), "right-hand side has {} rows, expected {}", b.dim(0), self.dim(0));
        Ok(self.pinv()?.prod(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex32;

    fn close<T: Element>(a: &MultiAxisArray<T>, b: &MultiAxisArray<T>, tol: f64) -> bool {
        a.iter().zip(b.iter()).all(|(&x, &y)| (x - y).magnitude() <= tol)
    }

    fn hermitian_pd(n: usize) -> MultiAxisArray<Complex64> {
        MultiAxisArray::from_fn(&[n, n], |k| {
            let (i, j) = (k % n, k / n);
            if i == j {
                Complex64::new(n as f64, 0.0)
            } else {
                let im = if i < j { 0.1 } else { -0.1 };
                Complex64::new(1.0 / (1.0 + (i as f64 - j as f64).abs()), im)
            }
        })
    }

    fn sample(m: usize, n: usize) -> MultiAxisArray<Complex64> {
        MultiAxisArray::from_fn(&[m, n], |k| {
            let (i, j) = (k % m, k / m);
            Complex64::new((i * 3 + j) as f64 % 7.0 - 3.0, (i as f64 - j as f64) * 0.25)
        })
    }

    fn eigen_residual(a: &MultiAxisArray<Complex64>, v: &MultiAxisArray<Complex64>, values: &MultiAxisArray<Complex64>) -> f64 {
        let av = a.prod(v);
        let n = a.dim(0);
        let mut worst: f64 = 0.0;
        for k in 0..n {
            for i in 0..n {
                worst = worst.max((av.at2(i, k) - v.at2(i, k) * values[k]).norm());
            }
        }
        worst
    }

    #[test]
    fn test_inv_real() {
        let a = MultiAxisArray::from_vec(&[2, 2], vec![4.0, 2.0, 7.0, 6.0]);
        let ai = a.inv().unwrap();
        assert!(close(&a.prod(&ai), &MultiAxisArray::identity(2), 1e-12));
    }

    #[test]
    fn test_inv_complex() {
        let a = hermitian_pd(5);
        let ai = a.inv().unwrap();
        assert!(close(&a.prod(&ai), &MultiAxisArray::identity(5), 1e-10));
    }

    #[test]
    fn test_inv_singular() {
        let a = MultiAxisArray::from_vec(&[2, 2], vec![1.0, 2.0, 2.0, 4.0]);
        let err = a.inv().unwrap_err();
        assert_eq!(err.info(), 2);
    }

    #[test]
    fn test_inv_rank_deficient_in_rounding() {
        // Rank 2, but elimination leaves a pivot of order ε rather than 0
        let a = MultiAxisArray::from_vec(&[3, 3], vec![1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]);
        assert!(matches!(a.inv(), Err(Error::Singular { .. })));
    }

    #[test]
    fn test_prodt_is_conjugate() {
        let a = MultiAxisArray::from_vec(&[1, 2], vec![Complex32::new(0.0, 1.0), Complex32::new(1.0, 0.0)]);
        let g = a.prodt(&a);
        assert_eq!(g.dims()[..2], [1, 1]);
        assert!((g[0] - Complex32::new(2.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_svd_real_reconstruction() {
        let a = MultiAxisArray::from_fn(&[4, 3], |i| ((i * 5) % 7) as f64 - 2.5);
        let f = a.svd().unwrap();
        let mut us = f.u.clone();
        for k in 0..3 {
            for i in 0..4 {
                *us.at2_mut(i, k) *= f.s[k];
            }
        }
        assert!(close(&us.prod(&f.vh), &a, 1e-9));
    }

    #[test]
    fn test_svd_tall_and_wide() {
        for (m, n) in [(6, 4), (3, 5), (4, 4)] {
            let a = sample(m, n);
            let f = a.svd().unwrap();
            let k = m.min(n);
            assert_eq!(f.s.size(), k);
            assert!(f.s.as_slice().windows(2).all(|w| w[0] >= w[1]));
            let mut us = f.u.clone();
            for j in 0..k {
                for i in 0..m {
                    *us.at2_mut(i, j) *= Complex64::new(f.s[j], 0.0);
                }
            }
            assert!(close(&us.prod(&f.vh), &a, 1e-9));
        }
    }

    #[test]
    fn test_pinv_penrose_identity() {
        let a = sample(5, 3);
        let p = a.pinv().unwrap();
        assert!(close(&a.prod(&p).prod(&a), &a, 1e-9));
    }

    #[test]
    fn test_lstsq_overdetermined() {
        // Fit y = 1 + 2x exactly
        let a = MultiAxisArray::from_vec(&[4, 2], vec![1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 2.0, 3.0]);
        let b = MultiAxisArray::from_vec(&[4, 1], vec![1.0, 3.0, 5.0, 7.0]);
        let x = a.lstsq(&b).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_eig_hermitian_real() {
        let a: MultiAxisArray<f64> = MultiAxisArray::from_vec(&[2, 2], vec![2.0, 1.0, 1.0, 2.0]);
        let (w, v) = a.eig_hermitian().unwrap();
        assert_abs_diff_eq!(w[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[1], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.at2(0, 1).abs(), 0.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_eig_hermitian_complex() {
        let a = hermitian_pd(4);
        let (w, v) = a.eig_hermitian().unwrap();
        assert!(w.as_slice().windows(2).all(|p| p[0] <= p[1]));
        let wc = w.map(|x| Complex64::new(x, 0.0));
        assert!(eigen_residual(&a, &v, &wc) < 1e-10);
        assert!(close(&v.tr().prod(&v), &MultiAxisArray::identity(4), 1e-10));
    }

    #[test]
    fn test_eig_diagonal() {
        let mut a: MultiAxisArray<f64> = MultiAxisArray::new2(3, 3);
        *a.at2_mut(0, 0) = 3.0;
        *a.at2_mut(1, 1) = -1.0;
        *a.at2_mut(2, 2) = 0.5;
        let e = a.eig(true, false).unwrap();
        let mut re: Vec<f64> = e.values.iter().map(|c| c.re).collect();
        re.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_abs_diff_eq!(re[0], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(re[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(re[2], 3.0, epsilon = 1e-12);
        assert!(e.right.is_some());
        assert!(e.left.is_none());
    }

    #[test]
    fn test_eig_rotation() {
        // 90° rotation: eigenvalues ±i
        let a = MultiAxisArray::from_vec(&[2, 2], vec![0.0, 1.0, -1.0, 0.0]);
        let e = a.eig(true, false).unwrap();
        let mut ims: Vec<f64> = e.values.iter().map(|c| c.im).collect();
        ims.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_abs_diff_eq!(ims[0], -1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(ims[1], 1.0, epsilon = 1e-10);
        let ac = a.map(|x| Complex64::new(x, 0.0));
        assert!(eigen_residual(&ac, e.right.as_ref().unwrap(), &e.values) < 1e-10);
    }

    #[test]
    fn test_eig_left_vectors() {
        let n = 5;
        let a = MultiAxisArray::from_fn(&[n, n], |k| {
            let (i, j) = (k % n, k / n);
            if i == j {
                Complex64::new(j as f64 * 2.0, 0.0)
            } else {
                Complex64::new(((i * 7 + j * 3) % 5) as f64 - 2.0, 0.0)
            }
        });
        let e = a.eig(true, true).unwrap();
        assert!(eigen_residual(&a, e.right.as_ref().unwrap(), &e.values) < 1e-8);

        // u_k^H A = λ_k u_k^H
        let l = e.left.unwrap();
        let lha = l.tr().prod(&a);
        for k in 0..n {
            for j in 0..n {
                let expected = l.at2(j, k).conj() * e.values[k];
                assert_abs_diff_eq!((lha.at2(k, j) - expected).norm(), 0.0, epsilon = 1e-8);
            }
        }

        let trace: Complex64 = (0..n).map(|i| a.at2(i, i)).sum();
        let sum: Complex64 = e.values.iter().sum();
        assert_abs_diff_eq!((trace - sum).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_chol_roundtrip() {
        let a = MultiAxisArray::from_vec(&[2, 2], vec![4.0, 2.0, 2.0, 3.0]);
        let l = a.chol().unwrap();
        assert_eq!(l.at2(0, 1), 0.0);
        assert!(close(&l.prodt(&l), &a, 1e-12));
        let ai = a.chol_inv().unwrap();
        assert!(close(&a.prod(&ai), &MultiAxisArray::identity(2), 1e-12));
    }

    #[test]
    fn test_chol_complex() {
        let a = hermitian_pd(4);
        let l = a.chol().unwrap();
        assert!(close(&l.prodt(&l), &a, 1e-10));
        assert!(close(&a.prod(&a.chol_inv().unwrap()), &MultiAxisArray::identity(4), 1e-10));
    }

    #[test]
    fn test_chol_not_positive_definite() {
        let a = MultiAxisArray::from_vec(&[3, 3], vec![1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(a.chol(), Err(Error::NotPositiveDefinite { .. })));
    }
}
