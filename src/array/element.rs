//! Element types storable in a [`MultiAxisArray`](super::MultiAxisArray)
//!
//! Real and complex behaviour differs in three places: ordering (value vs.
//! magnitude), transposition (plain vs. conjugate) and random fills. All three
//! are resolved here through the [`Element`] trait so the array code is
//! written once.

use num_complex::{Complex32, Complex64};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Tag identifying an element type in files and transport payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Float32,
    Float64,
    Int16,
    Complex32,
    Complex64,
}

impl ElementKind {
    /// Bytes per stored element
    pub fn byte_size(self) -> usize {
        match self {
            ElementKind::Int16 => 2,
            ElementKind::Float32 => 4,
            ElementKind::Float64 | ElementKind::Complex32 => 8,
            ElementKind::Complex64 => 16,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, ElementKind::Complex32 | ElementKind::Complex64)
    }
}

/// Numeric element of a multi-axis array
pub trait Element:
    Copy
    + Default
    + PartialEq
    + Debug
    + Display
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
{
    const KIND: ElementKind;
    /// Size of one element on disk
    const BYTES: usize;

    fn zero() -> Self;
    fn one() -> Self;

    /// Complex conjugate; identity for real types
    fn conj(self) -> Self;

    /// |x| for real types, modulus for complex types
    fn magnitude(self) -> f64;

    /// Key used by max/min and the comparison operators
    fn order_key(self) -> f64;

    fn to_c64(self) -> Complex64;

    /// Real types keep the real part; integers round to nearest
    fn from_c64(value: Complex64) -> Self;

    fn from_f64(value: f64) -> Self {
        Self::from_c64(Complex64::new(value, 0.0))
    }

    fn is_zero(self) -> bool {
        self == Self::zero()
    }

    /// Uniform sample: [-1, 1) per component for floats, [-12, 12] for integers
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self;

    fn write_le(self, out: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;

    /// View a buffer as flat f64 values when the layout allows it
    /// (f64, and Complex64 as interleaved re/im)
    fn as_f64_slice(_data: &[Self]) -> Option<&[f64]> {
        None
    }
}

/// Floating element types, i.e. those the solvers and operators accept
pub trait Scalar: Element {
    /// Machine epsilon of the underlying real type
    const EPSILON: f64;

    /// Embed a real value
    fn from_real(value: f64) -> Self {
        Self::from_f64(value)
    }

    /// Squared modulus
    fn abs2(self) -> f64 {
        let m = self.magnitude();
        m * m
    }
}

/// Complex floating element types. Transforms whose output is complex
/// for real input are only defined on these.
pub trait ComplexScalar: Scalar {}

macro_rules! impl_real_element {
    ($t:ty, $kind:expr, $bytes:expr, $as_f64:ident) => {
        impl Element for $t {
            const KIND: ElementKind = $kind;
            const BYTES: usize = $bytes;

            #[inline]
            fn zero() -> Self {
                0.0
            }
            #[inline]
            fn one() -> Self {
                1.0
            }
            #[inline]
            fn conj(self) -> Self {
                self
            }
            #[inline]
            fn magnitude(self) -> f64 {
                (self as f64).abs()
            }
            #[inline]
            fn order_key(self) -> f64 {
                self as f64
            }
            #[inline]
            fn to_c64(self) -> Complex64 {
                Complex64::new(self as f64, 0.0)
            }
            #[inline]
            fn from_c64(value: Complex64) -> Self {
                value.re as $t
            }
            fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.random_range(-1.0..1.0)
            }
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $bytes];
                buf.copy_from_slice(&bytes[..$bytes]);
                <$t>::from_le_bytes(buf)
            }
            fn as_f64_slice(data: &[Self]) -> Option<&[f64]> {
                $as_f64(data)
            }
        }

        impl Scalar for $t {
            const EPSILON: f64 = <$t>::EPSILON as f64;
        }
    };
}

fn no_f64_view<T>(_data: &[T]) -> Option<&[f64]> {
    None
}

fn f64_view(data: &[f64]) -> Option<&[f64]> {
    Some(data)
}

/// Interleaved re/im view of a Complex64 buffer
fn complex_f64_view(data: &[Complex64]) -> Option<&[f64]> {
    Some(bytemuck::cast_slice(data))
}

impl_real_element!(f32, ElementKind::Float32, 4, no_f64_view);
impl_real_element!(f64, ElementKind::Float64, 8, f64_view);

macro_rules! impl_complex_element {
    ($t:ty, $re:ty, $kind:expr, $bytes:expr, $as_f64:ident) => {
        impl Element for $t {
            const KIND: ElementKind = $kind;
            const BYTES: usize = $bytes;

            #[inline]
            fn zero() -> Self {
                <$t>::new(0.0, 0.0)
            }
            #[inline]
            fn one() -> Self {
                <$t>::new(1.0, 0.0)
            }
            #[inline]
            fn conj(self) -> Self {
                <$t>::conj(&self)
            }
            #[inline]
            fn magnitude(self) -> f64 {
                self.norm() as f64
            }
            #[inline]
            fn order_key(self) -> f64 {
                self.norm() as f64
            }
            #[inline]
            fn to_c64(self) -> Complex64 {
                Complex64::new(self.re as f64, self.im as f64)
            }
            #[inline]
            fn from_c64(value: Complex64) -> Self {
                <$t>::new(value.re as $re, value.im as $re)
            }
            fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
                <$t>::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0))
            }
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.re.to_le_bytes());
                out.extend_from_slice(&self.im.to_le_bytes());
            }
            fn read_le(bytes: &[u8]) -> Self {
                <$t>::new(<$re>::read_le(bytes), <$re>::read_le(&bytes[$bytes / 2..]))
            }
            fn as_f64_slice(data: &[Self]) -> Option<&[f64]> {
                $as_f64(data)
            }
        }

        impl Scalar for $t {
            const EPSILON: f64 = <$re>::EPSILON as f64;
        }

        impl ComplexScalar for $t {}
    };
}

impl_complex_element!(Complex32, f32, ElementKind::Complex32, 8, no_f64_view);
impl_complex_element!(Complex64, f64, ElementKind::Complex64, 16, complex_f64_view);

impl Element for i16 {
    const KIND: ElementKind = ElementKind::Int16;
    const BYTES: usize = 2;

    #[inline]
    fn zero() -> Self {
        0
    }
    #[inline]
    fn one() -> Self {
        1
    }
    #[inline]
    fn conj(self) -> Self {
        self
    }
    #[inline]
    fn magnitude(self) -> f64 {
        (self as f64).abs()
    }
    #[inline]
    fn order_key(self) -> f64 {
        self as f64
    }
    #[inline]
    fn to_c64(self) -> Complex64 {
        Complex64::new(self as f64, 0.0)
    }
    #[inline]
    fn from_c64(value: Complex64) -> Self {
        value.re.round() as i16
    }
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.random_range(-12..=12)
    }
    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
    fn read_le(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complex_view_is_interleaved() {
        let data = [Complex64::new(1.0, -2.0), Complex64::new(3.5, 0.25)];
        assert_eq!(Complex64::as_f64_slice(&data), Some(&[1.0, -2.0, 3.5, 0.25][..]));
        assert_eq!(f64::as_f64_slice(&[4.0, 5.0]), Some(&[4.0, 5.0][..]));
        assert_eq!(Complex32::as_f64_slice(&[Complex32::new(1.0, 1.0)]), None);
    }

    #[test]
    fn test_order_key_real_vs_complex() {
        assert_eq!((-3.0f64).order_key(), -3.0);
        assert_eq!(Complex64::new(-3.0, 4.0).order_key(), 5.0);
    }

    #[test]
    fn test_conj() {
        assert_eq!(Element::conj(2.5f32), 2.5);
        assert_eq!(Element::conj(Complex32::new(1.0, 2.0)), Complex32::new(1.0, -2.0));
    }

    #[test]
    fn test_le_bytes() {
        let mut buf = Vec::new();
        Complex64::new(1.5, -2.0).write_le(&mut buf);
        (-7i16).write_le(&mut buf);
        assert_eq!(buf.len(), Complex64::BYTES + i16::BYTES);
        assert_eq!(Complex64::read_le(&buf), Complex64::new(1.5, -2.0));
        assert_eq!(i16::read_le(&buf[16..]), -7);
    }

    #[test]
    fn test_kind_sizes_match_codecs() {
        assert_eq!(ElementKind::Float32.byte_size(), f32::BYTES);
        assert_eq!(ElementKind::Float64.byte_size(), f64::BYTES);
        assert_eq!(ElementKind::Int16.byte_size(), i16::BYTES);
        assert_eq!(ElementKind::Complex32.byte_size(), Complex32::BYTES);
        assert_eq!(ElementKind::Complex64.byte_size(), Complex64::BYTES);
    }

    #[test]
    fn test_random_ranges() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let v = f64::random(&mut rng);
            assert!((-1.0..1.0).contains(&v));
            let k = i16::random(&mut rng);
            assert!((-12..=12).contains(&k));
        }
    }
}
