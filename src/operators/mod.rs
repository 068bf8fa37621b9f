//! Linear operators with forward and adjoint transforms
//!
//! Every operator here is configured once and then applied many times.
//! `trafo` and `adjoint` depend only on their input and the precomputed
//! state; scratch buffers are fully rewritten on each call.

pub mod dwt;
pub mod filters;
pub mod nufft;
pub mod sense;
pub mod tvop;
pub mod window;

pub use dwt::Wavelet;
pub use nufft::Nufft;
pub use sense::{intensity_map, Corrected, SenseEncoding};
pub use tvop::FiniteDifference;

use crate::array::{MultiAxisArray, Scalar};
use serde::{Deserialize, Serialize};

/// Forward/adjoint pair
pub trait LinearOperator<T> {
    fn trafo(&self, x: &MultiAxisArray<T>) -> MultiAxisArray<T>;
    fn adjoint(&self, y: &MultiAxisArray<T>) -> MultiAxisArray<T>;
}

impl<T, O: LinearOperator<T> + ?Sized> LinearOperator<T> for &O {
    fn trafo(&self, x: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        (**self).trafo(x)
    }

    fn adjoint(&self, y: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        (**self).adjoint(y)
    }
}

/// Wavelet family selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveletFamily {
    /// Pass-through
    #[serde(alias = "None", alias = "ID")]
    Identity,
    Haar,
    HaarCentered,
    Daubechies,
    DaubechiesCentered,
    BSpline,
    BSplineCentered,
}

impl WaveletFamily {
    pub fn is_centered(self) -> bool {
        matches!(self, Self::HaarCentered | Self::DaubechiesCentered | Self::BSplineCentered)
    }
}

/// Matrix `A` as an operator: `trafo = A·x`, `adjoint = A^H·y`
#[derive(Debug, Clone)]
pub struct DenseOperator<T> {
    a: MultiAxisArray<T>,
    a_h: MultiAxisArray<T>,
}

impl<T: Scalar> DenseOperator<T> {
    pub fn new(a: MultiAxisArray<T>) -> Self {
        assert!(a.is_2d(), "dense operator needs a 2-D matrix");
        let a_h = a.tr();
        Self { a, a_h }
    }

    pub fn matrix(&self) -> &MultiAxisArray<T> {
        &self.a
    }
}

impl<T: Scalar> LinearOperator<T> for DenseOperator<T> {
    fn trafo(&self, x: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        self.a.prod(x)
    }

    fn adjoint(&self, y: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        self.a_h.prod(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_dense_operator_adjoint() {
        let a = MultiAxisArray::from_fn(&[3, 2], |i| Complex64::new(i as f64, 1.0 - i as f64));
        let op = DenseOperator::new(a);
        let x = MultiAxisArray::from_vec(&[2, 1], vec![Complex64::new(1.0, 2.0), Complex64::new(-0.5, 0.0)]);
        let y = MultiAxisArray::from_vec(
            &[3, 1],
            vec![Complex64::new(0.0, 1.0), Complex64::new(2.0, 0.0), Complex64::new(1.0, -1.0)],
        );
        let lhs = op.trafo(&x).dotc(&y);
        let rhs = x.dotc(&op.adjoint(&y));
        assert!((lhs - rhs).norm() < 1e-12);
    }

    #[test]
    fn test_wavelet_family_serde_names() {
        let f: WaveletFamily = serde_json::from_str("\"None\"").unwrap();
        assert_eq!(f, WaveletFamily::Identity);
        let f: WaveletFamily = serde_json::from_str("\"DaubechiesCentered\"").unwrap();
        assert!(f.is_centered());
    }
}
