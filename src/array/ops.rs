//! Elementwise algebra, comparisons and masks
//!
//! Array-array operators require identical extents. Division by an element
//! that equals zero writes zero; division by a zero scalar panics.

use super::{Element, Mask, MultiAxisArray};
use crate::linalg::simd_ops;
use crate::MIN_PARALLEL_LEN;
use num_complex::Complex64;
use rayon::prelude::*;
use std::ops::{Add, AddAssign, BitAnd, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

impl<T: Element> MultiAxisArray<T> {
    fn assert_same_shape<U>(&self, other: &MultiAxisArray<U>) {
        assert_eq!(
            self.dims, other.dims,
            "extent mismatch: {:?} vs {:?}",
            &self.dims[..self.ndims()],
            &other.dims[..other.dims.iter().rposition(|&d| d > 1).map_or(1, |i| i + 1)]
        );
    }

    /// Apply `f(self[i], other[i])` in place
    pub(crate) fn zip_apply<F>(&mut self, other: &Self, f: F)
    where
        F: Fn(T, T) -> T + Sync + Send,
    {
        self.assert_same_shape(other);
        if self.data.len() >= MIN_PARALLEL_LEN {
            self.data
                .par_iter_mut()
                .zip(other.data.par_iter())
                .for_each(|(a, &b)| *a = f(*a, b));
        } else {
            for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
                *a = f(*a, b);
            }
        }
    }

    /// Apply `f` to every element in place
    pub(crate) fn apply<F>(&mut self, f: F)
    where
        F: Fn(T) -> T + Sync + Send,
    {
        if self.data.len() >= MIN_PARALLEL_LEN {
            self.data.par_iter_mut().for_each(|a| *a = f(*a));
        } else {
            self.data.iter_mut().for_each(|a| *a = f(*a));
        }
    }

    /// `self += alpha * x`
    pub fn axpy(&mut self, alpha: T, x: &Self) {
        self.zip_apply(x, |a, b| a + alpha * b);
    }

    /// `self = x + beta * self`
    pub fn xpby(&mut self, x: &Self, beta: T) {
        self.zip_apply(x, |a, b| b + beta * a);
    }

    /// Elementwise integer power
    pub fn powi(&self, p: i32) -> Self {
        let mut out = self.clone();
        out.apply(|v| T::from_c64(v.to_c64().powi(p)));
        out
    }

    /// Elementwise logical or: one where either operand is non-zero
    pub fn or(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.zip_apply(other, |a, b| if !a.is_zero() || !b.is_zero() { T::one() } else { T::zero() });
        out
    }

    /// Elementwise logical and: one where both operands are non-zero
    pub fn and(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.zip_apply(other, |a, b| if !a.is_zero() && !b.is_zero() { T::one() } else { T::zero() });
        out
    }

    /// Keep elements where `mask` is set, zero elsewhere
    pub fn masked(&self, mask: &Mask) -> Self {
        self.assert_same_shape(mask);
        let data = self
            .data
            .iter()
            .zip(mask.data.iter())
            .map(|(&v, &m)| if m { v } else { T::zero() })
            .collect();
        Self { dims: self.dims, data }
    }

    fn compare_scalar(&self, s: T, f: impl Fn(T, T) -> bool) -> Mask {
        MultiAxisArray { dims: self.dims, data: self.data.iter().map(|&v| f(v, s)).collect() }
    }

    fn compare_elem(&self, other: &Self, f: impl Fn(T, T) -> bool) -> Mask {
        self.assert_same_shape(other);
        let data = self.data.iter().zip(other.data.iter()).map(|(&a, &b)| f(a, b)).collect();
        MultiAxisArray { dims: self.dims, data }
    }

    pub fn eq_scalar(&self, s: T) -> Mask {
        self.compare_scalar(s, |a, b| a == b)
    }

    pub fn ne_scalar(&self, s: T) -> Mask {
        self.compare_scalar(s, |a, b| a != b)
    }

    /// Ordering uses value for reals and magnitude for complex
    pub fn gt_scalar(&self, s: T) -> Mask {
        self.compare_scalar(s, |a, b| a.order_key() > b.order_key())
    }

    pub fn ge_scalar(&self, s: T) -> Mask {
        self.compare_scalar(s, |a, b| a.order_key() >= b.order_key())
    }

    pub fn lt_scalar(&self, s: T) -> Mask {
        self.compare_scalar(s, |a, b| a.order_key() < b.order_key())
    }

    pub fn le_scalar(&self, s: T) -> Mask {
        self.compare_scalar(s, |a, b| a.order_key() <= b.order_key())
    }

    pub fn eq_elem(&self, other: &Self) -> Mask {
        self.compare_elem(other, |a, b| a == b)
    }

    pub fn ne_elem(&self, other: &Self) -> Mask {
        self.compare_elem(other, |a, b| a != b)
    }

    pub fn gt_elem(&self, other: &Self) -> Mask {
        self.compare_elem(other, |a, b| a.order_key() > b.order_key())
    }

    pub fn ge_elem(&self, other: &Self) -> Mask {
        self.compare_elem(other, |a, b| a.order_key() >= b.order_key())
    }

    pub fn lt_elem(&self, other: &Self) -> Mask {
        self.compare_elem(other, |a, b| a.order_key() < b.order_key())
    }

    pub fn le_elem(&self, other: &Self) -> Mask {
        self.compare_elem(other, |a, b| a.order_key() <= b.order_key())
    }

    /// Transpose of the inner 2-D plane; conjugate transpose for complex types
    pub fn tr(&self) -> Self {
        assert!(self.is_2d(), "transpose requires a 2-D array");
        let (m, n) = (self.dims[0], self.dims[1]);
        let mut out = Self::new2(n, m);
        for j in 0..n {
            for i in 0..m {
                out.data[j + i * n] = self.data[i + j * m].conj();
            }
        }
        out
    }

    /// Frobenius norm
    pub fn norm(&self) -> f64 {
        if let Some(flat) = T::as_f64_slice(&self.data) {
            return simd_ops::norm_squared_f64(flat).sqrt();
        }
        self.data.iter().map(|v| v.magnitude().powi(2)).sum::<f64>().sqrt()
    }

    /// Unconjugated inner product `Σ a_i b_i`
    pub fn dot(&self, other: &Self) -> T {
        assert_eq!(self.size(), other.size(), "dot requires equal sizes");
        let sum: Complex64 =
            self.data.iter().zip(other.data.iter()).map(|(&a, &b)| a.to_c64() * b.to_c64()).sum();
        T::from_c64(sum)
    }

    /// Conjugated inner product `Σ conj(a_i) b_i`
    pub fn dotc(&self, other: &Self) -> T {
        assert_eq!(self.size(), other.size(), "dotc requires equal sizes");
        if !T::KIND.is_complex() {
            if let (Some(a), Some(b)) = (T::as_f64_slice(&self.data), T::as_f64_slice(&other.data)) {
                return T::from_f64(simd_ops::dot_product_f64(a, b));
            }
        }
        let sum: Complex64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a.to_c64().conj() * b.to_c64())
            .sum();
        T::from_c64(sum)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $f:expr) => {
        impl<T: Element> $assign_trait<&MultiAxisArray<T>> for MultiAxisArray<T> {
            fn $assign_method(&mut self, rhs: &MultiAxisArray<T>) {
                self.zip_apply(rhs, $f);
            }
        }

        impl<T: Element> $trait<&MultiAxisArray<T>> for &MultiAxisArray<T> {
            type Output = MultiAxisArray<T>;

            fn $method(self, rhs: &MultiAxisArray<T>) -> MultiAxisArray<T> {
                let mut out = self.clone();
                out.zip_apply(rhs, $f);
                out
            }
        }

        impl<T: Element> $trait<&MultiAxisArray<T>> for MultiAxisArray<T> {
            type Output = MultiAxisArray<T>;

            fn $method(mut self, rhs: &MultiAxisArray<T>) -> MultiAxisArray<T> {
                self.zip_apply(rhs, $f);
                self
            }
        }

        impl<T: Element> $trait<MultiAxisArray<T>> for MultiAxisArray<T> {
            type Output = MultiAxisArray<T>;

            fn $method(mut self, rhs: MultiAxisArray<T>) -> MultiAxisArray<T> {
                self.zip_apply(&rhs, $f);
                self
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, |a: T, b: T| a + b);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, |a: T, b: T| a - b);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, |a: T, b: T| a * b);
impl_binary_op!(Div, div, DivAssign, div_assign, |a: T, b: T| {
    if b.is_zero() {
        T::zero()
    } else {
        a / b
    }
});

macro_rules! impl_scalar_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl<T: Element> $assign_trait<T> for MultiAxisArray<T> {
            fn $assign_method(&mut self, s: T) {
                self.apply(move |a| a $op s);
            }
        }

        impl<T: Element> $trait<T> for &MultiAxisArray<T> {
            type Output = MultiAxisArray<T>;

            fn $method(self, s: T) -> MultiAxisArray<T> {
                let mut out = self.clone();
                out.apply(move |a| a $op s);
                out
            }
        }

        impl<T: Element> $trait<T> for MultiAxisArray<T> {
            type Output = MultiAxisArray<T>;

            fn $method(mut self, s: T) -> MultiAxisArray<T> {
                self.apply(move |a| a $op s);
                self
            }
        }
    };
}

impl_scalar_op!(Add, add, AddAssign, add_assign, +);
impl_scalar_op!(Sub, sub, SubAssign, sub_assign, -);
impl_scalar_op!(Mul, mul, MulAssign, mul_assign, *);

impl<T: Element> DivAssign<T> for MultiAxisArray<T> {
    fn div_assign(&mut self, s: T) {
        assert!(!s.is_zero(), "division by zero scalar");
        self.apply(move |a| a / s);
    }
}

impl<T: Element> Div<T> for &MultiAxisArray<T> {
    type Output = MultiAxisArray<T>;

    fn div(self, s: T) -> MultiAxisArray<T> {
        let mut out = self.clone();
        out /= s;
        out
    }
}

impl<T: Element> Div<T> for MultiAxisArray<T> {
    type Output = MultiAxisArray<T>;

    fn div(mut self, s: T) -> MultiAxisArray<T> {
        self /= s;
        self
    }
}

impl<T: Element> Neg for &MultiAxisArray<T> {
    type Output = MultiAxisArray<T>;

    fn neg(self) -> MultiAxisArray<T> {
        let mut out = self.clone();
        out.apply(|a| -a);
        out
    }
}

impl<T: Element> Neg for MultiAxisArray<T> {
    type Output = MultiAxisArray<T>;

    fn neg(mut self) -> MultiAxisArray<T> {
        self.apply(|a| -a);
        self
    }
}

/// `a & mask`
impl<T: Element> BitAnd<&Mask> for &MultiAxisArray<T> {
    type Output = MultiAxisArray<T>;

    fn bitand(self, mask: &Mask) -> MultiAxisArray<T> {
        self.masked(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex32;

    fn ramp(n: usize) -> MultiAxisArray<f64> {
        MultiAxisArray::from_fn(&[n, n], |i| i as f64)
    }

    #[test]
    fn test_add_sub_mul() {
        let a = ramp(3);
        let b = MultiAxisArray::ones(3, 3);
        let c = &a + &b;
        assert_eq!(c[4], 5.0);
        let d = &c - &b;
        assert_eq!(d, a);
        let e = &a * &a;
        assert_eq!(e[3], 9.0);
        let f = &a * 2.0;
        assert_eq!(f[8], 16.0);
    }

    #[test]
    fn test_division_by_zero_element_writes_zero() {
        let a = MultiAxisArray::from_vec(&[3], vec![4.0, 5.0, 6.0]);
        let b = MultiAxisArray::from_vec(&[3], vec![2.0, 0.0, 3.0]);
        let c = &a / &b;
        assert_eq!(c.as_slice(), &[2.0, 0.0, 2.0]);
    }

    #[test]
    fn test_scalar_division_divides() {
        let a = MultiAxisArray::from_vec(&[2], vec![4.0f32, 6.0]);
        assert_eq!((&a / 2.0).as_slice(), &[2.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "division by zero scalar")]
    fn test_scalar_division_by_zero_panics() {
        let a = MultiAxisArray::from_vec(&[2], vec![4.0f32, 6.0]);
        let _ = &a / 0.0;
    }

    #[test]
    #[should_panic(expected = "extent mismatch")]
    fn test_shape_mismatch_panics() {
        let a: MultiAxisArray<f64> = MultiAxisArray::new2(2, 3);
        let b: MultiAxisArray<f64> = MultiAxisArray::new2(3, 2);
        let _ = &a + &b;
    }

    #[test]
    fn test_transpose_involution() {
        let a = MultiAxisArray::from_fn(&[3, 5], |i| Complex32::new(i as f32, -(i as f32) * 0.5));
        let t = a.tr();
        assert_eq!(t.dims()[..2], [5, 3]);
        assert_eq!(t.at2(1, 2), a.at2(2, 1).conj());
        assert_eq!(t.tr(), a);

        let r = ramp(4);
        assert_eq!(r.tr().tr(), r);
    }

    #[test]
    fn test_dotc_matches_norm() {
        let a = MultiAxisArray::from_fn(&[7], |i| Complex64::new(i as f64, 1.0 - i as f64));
        let d = a.dotc(&a);
        assert_abs_diff_eq!(d.re, a.norm().powi(2), epsilon = 1e-10);
        assert_abs_diff_eq!(d.im, 0.0, epsilon = 1e-12);

        let r = ramp(4);
        assert_abs_diff_eq!(r.dotc(&r), r.norm().powi(2), epsilon = 1e-10);
    }

    #[test]
    fn test_dot_is_unconjugated() {
        let a = MultiAxisArray::from_vec(&[1], vec![Complex64::new(0.0, 1.0)]);
        assert_eq!(a.dot(&a), Complex64::new(-1.0, 0.0));
        assert_eq!(a.dotc(&a), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_masks() {
        let a = MultiAxisArray::from_vec(&[4], vec![1.0, -2.0, 3.0, 0.5]);
        let m = a.gt_scalar(0.75);
        assert_eq!(m.as_slice(), &[true, false, true, false]);
        assert_eq!(m.count(), 2);
        let kept = &a & &m;
        assert_eq!(kept.as_slice(), &[1.0, 0.0, 3.0, 0.0]);

        let c = MultiAxisArray::from_vec(&[2], vec![Complex64::new(0.0, -3.0), Complex64::new(1.0, 0.0)]);
        assert_eq!(c.gt_scalar(Complex64::new(2.0, 0.0)).as_slice(), &[true, false]);
    }

    #[test]
    fn test_logical_and_or() {
        let a = MultiAxisArray::from_vec(&[4], vec![1i16, 0, 3, 0]);
        let b = MultiAxisArray::from_vec(&[4], vec![0i16, 0, 2, 5]);
        assert_eq!(a.or(&b).as_slice(), &[1, 0, 1, 1]);
        assert_eq!(a.and(&b).as_slice(), &[0, 0, 1, 0]);
    }

    #[test]
    fn test_powi() {
        let a = MultiAxisArray::from_vec(&[3], vec![2.0, -3.0, 0.5]);
        assert_eq!(a.powi(2).as_slice(), &[4.0, 9.0, 0.25]);
    }

    #[test]
    fn test_large_parallel_path() {
        let n = crate::MIN_PARALLEL_LEN + 17;
        let a = MultiAxisArray::from_fn(&[n], |i| i as f64);
        let mut b = a.clone();
        b.axpy(-1.0, &a);
        assert!(b.iter().all(|&v| v == 0.0));
    }
}
