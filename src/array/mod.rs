//! Dense sixteen-axis arrays
//!
//! `MultiAxisArray<T>` stores up to sixteen named axes in one flat buffer,
//! column-major (axis 0 varies fastest):
//!
//! ```text
//! offset = i0 + i1*n0 + i2*n0*n1 + ... + i15*n0*...*n14
//! ```
//!
//! Unused axes have extent 1. Extents are never 0.

mod element;
mod ops;

pub use element::{ComplexScalar, Element, ElementKind, Scalar};

use rand::Rng;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Number of named axes
pub const AXES: usize = 16;

/// Named axes in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Axis {
    Col = 0,
    Lin,
    Cha,
    Set,
    Eco,
    Phs,
    Rep,
    Seg,
    Par,
    Slc,
    Ida,
    Idb,
    Idc,
    Idd,
    Ide,
    Ave,
}

impl Axis {
    pub const ALL: [Axis; AXES] = [
        Axis::Col, Axis::Lin, Axis::Cha, Axis::Set,
        Axis::Eco, Axis::Phs, Axis::Rep, Axis::Seg,
        Axis::Par, Axis::Slc, Axis::Ida, Axis::Idb,
        Axis::Idc, Axis::Idd, Axis::Ide, Axis::Ave,
    ];

    pub fn name(self) -> &'static str {
        const NAMES: [&str; AXES] = [
            "COL", "LIN", "CHA", "SET", "ECO", "PHS", "REP", "SEG",
            "PAR", "SLC", "IDA", "IDB", "IDC", "IDD", "IDE", "AVE",
        ];
        NAMES[self as usize]
    }
}

/// Dense column-major array with sixteen named axes
#[derive(Clone, PartialEq)]
pub struct MultiAxisArray<T> {
    dims: [usize; AXES],
    data: Vec<T>,
}

/// Boolean mask produced by comparisons
pub type Mask = MultiAxisArray<bool>;

fn check_dims(dims: &[usize; AXES]) {
    for (i, &d) in dims.iter().enumerate() {
        assert!(d > 0, "extent of axis {} must be positive, got 0", Axis::ALL[i].name());
    }
}

impl<T: Copy + Default> MultiAxisArray<T> {
    /// Zero-filled array with all sixteen extents given
    pub fn new(dims: [usize; AXES]) -> Self {
        check_dims(&dims);
        let size = dims.iter().product();
        Self { dims, data: vec![T::default(); size] }
    }

    /// Zero-filled array from a leading list of extents; missing axes are 1
    pub fn from_extents(extents: &[usize]) -> Self {
        assert!(extents.len() <= AXES, "at most {} extents, got {}", AXES, extents.len());
        let mut dims = [1usize; AXES];
        dims[..extents.len()].copy_from_slice(extents);
        Self::new(dims)
    }

    /// Extents as carried by signed transport/file headers
    pub fn from_signed_extents(extents: &[i64; AXES]) -> Self {
        let mut dims = [1usize; AXES];
        for (d, &e) in dims.iter_mut().zip(extents.iter()) {
            assert!(e >= 0, "negative extent {}", e);
            *d = e as usize;
        }
        Self::new(dims)
    }

    /// Column vector (m)
    pub fn new1(m: usize) -> Self {
        Self::from_extents(&[m])
    }

    /// Matrix (m, n)
    pub fn new2(m: usize, n: usize) -> Self {
        Self::from_extents(&[m, n])
    }

    /// Volume (m, n, k)
    pub fn new3(m: usize, n: usize, k: usize) -> Self {
        Self::from_extents(&[m, n, k])
    }

    pub fn new4(m: usize, n: usize, k: usize, l: usize) -> Self {
        Self::from_extents(&[m, n, k, l])
    }

    /// Wrap an existing column-major buffer
    pub fn from_vec(extents: &[usize], data: Vec<T>) -> Self {
        let mut out = Self { dims: [1; AXES], data: Vec::new() };
        assert!(extents.len() <= AXES, "at most {} extents, got {}", AXES, extents.len());
        out.dims[..extents.len()].copy_from_slice(extents);
        check_dims(&out.dims);
        assert_eq!(
            data.len(),
            out.size(),
            "buffer length {} does not match extents {:?}",
            data.len(),
            extents
        );
        out.data = data;
        out
    }

    /// Fill from a function of the linear index
    pub fn from_fn<F: FnMut(usize) -> T>(extents: &[usize], f: F) -> Self {
        let mut out = Self::from_extents(extents);
        let n = out.size();
        out.data = (0..n).map(f).collect();
        out
    }

    /// All sixteen extents
    #[inline]
    pub fn dims(&self) -> [usize; AXES] {
        self.dims
    }

    #[inline]
    pub fn dim(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    /// Extent of a named axis
    #[inline]
    pub fn extent(&self, axis: Axis) -> usize {
        self.dims[axis as usize]
    }

    /// Change one extent. The buffer is untouched until [`reset`](Self::reset).
    pub fn set_dim(&mut self, axis: usize, extent: usize) {
        assert!(extent > 0, "extent of axis {} must be positive", axis);
        self.dims[axis] = extent;
    }

    /// Reallocate zero-filled to the current extents
    pub fn reset(&mut self) {
        let size = self.size();
        self.data.clear();
        self.data.resize(size, T::default());
    }

    /// Reallocate zero-filled to new extents
    pub fn reset_to(&mut self, dims: [usize; AXES]) {
        check_dims(&dims);
        self.dims = dims;
        self.reset();
    }

    /// Zero every element, keeping extents
    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = T::default());
    }

    /// Release the buffer and collapse every extent to 1.
    /// The array is unallocated until the next `reset`.
    pub fn clear(&mut self) {
        self.dims = [1; AXES];
        self.data = Vec::new();
    }

    /// Product of all extents
    #[inline]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size() * std::mem::size_of::<T>()
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.data.len() == self.size()
    }

    /// Index of the last non-unit axis plus one
    pub fn ndims(&self) -> usize {
        self.dims.iter().rposition(|&d| d > 1).map_or(1, |i| i + 1)
    }

    fn only_leading(&self, n: usize) -> bool {
        self.dims[n..].iter().all(|&d| d == 1)
    }

    /// Only the first two axes may be non-unit
    pub fn is_2d(&self) -> bool {
        self.only_leading(2)
    }

    pub fn is_3d(&self) -> bool {
        self.only_leading(3)
    }

    pub fn is_4d(&self) -> bool {
        self.only_leading(4)
    }

    /// Linear offset of a full index tuple
    #[inline]
    pub fn offset_of(&self, idx: &[usize; AXES]) -> usize {
        let mut offset = 0;
        let mut stride = 1;
        for i in 0..AXES {
            debug_assert!(idx[i] < self.dims[i], "index {} out of range on axis {}", idx[i], i);
            offset += idx[i] * stride;
            stride *= self.dims[i];
        }
        offset
    }

    #[inline]
    pub fn at2(&self, i: usize, j: usize) -> T {
        self.data[i + j * self.dims[0]]
    }

    #[inline]
    pub fn at2_mut(&mut self, i: usize, j: usize) -> &mut T {
        let n0 = self.dims[0];
        &mut self.data[i + j * n0]
    }

    #[inline]
    pub fn at3(&self, i: usize, j: usize, k: usize) -> T {
        self.data[i + (j + k * self.dims[1]) * self.dims[0]]
    }

    #[inline]
    pub fn at3_mut(&mut self, i: usize, j: usize, k: usize) -> &mut T {
        let off = i + (j + k * self.dims[1]) * self.dims[0];
        &mut self.data[off]
    }

    pub fn at_axes(&self, idx: &[usize; AXES]) -> T {
        self.data[self.offset_of(idx)]
    }

    pub fn at_axes_mut(&mut self, idx: &[usize; AXES]) -> &mut T {
        let off = self.offset_of(idx);
        &mut self.data[off]
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Elementwise map into a new array of the same extents
    pub fn map<U: Copy + Default, F: Fn(T) -> U>(&self, f: F) -> MultiAxisArray<U> {
        MultiAxisArray { dims: self.dims, data: self.data.iter().map(|&v| f(v)).collect() }
    }

    /// Row `r` of the inner 2-D plane as a new vector of length `dims[1]`
    pub fn row(&self, r: usize) -> Self {
        assert!(r < self.dims[0], "row {} out of range ({})", r, self.dims[0]);
        let n0 = self.dims[0];
        let data = (0..self.dims[1]).map(|j| self.data[r + j * n0]).collect();
        Self::from_vec(&[self.dims[1]], data)
    }

    /// Column `c` of the inner 2-D plane as a new vector of length `dims[0]`
    pub fn column(&self, c: usize) -> Self {
        assert!(c < self.dims[1], "column {} out of range ({})", c, self.dims[1]);
        let n0 = self.dims[0];
        Self::from_vec(&[n0], self.data[c * n0..(c + 1) * n0].to_vec())
    }

    /// Plane `s` along axis 2 as a new (dims[0], dims[1]) array
    pub fn slice(&self, s: usize) -> Self {
        assert!(s < self.dims[2], "slice {} out of range ({})", s, self.dims[2]);
        let plane = self.dims[0] * self.dims[1];
        Self::from_vec(&[self.dims[0], self.dims[1]], self.data[s * plane..(s + 1) * plane].to_vec())
    }

    /// Replace plane `s` along axis 2
    pub fn set_slice(&mut self, s: usize, plane: &Self) {
        let n = self.dims[0] * self.dims[1];
        assert_eq!(plane.size(), n, "plane size mismatch");
        self.data[s * n..(s + 1) * n].copy_from_slice(&plane.data);
    }
}

impl<T: Element> MultiAxisArray<T> {
    /// n×n identity
    pub fn identity(n: usize) -> Self {
        let mut out = Self::new2(n, n);
        for i in 0..n {
            *out.at2_mut(i, i) = T::one();
        }
        out
    }

    pub fn ones(m: usize, n: usize) -> Self {
        let mut out = Self::new2(m, n);
        out.data.iter_mut().for_each(|v| *v = T::one());
        out
    }

    pub fn zeros(m: usize, n: usize) -> Self {
        Self::new2(m, n)
    }

    /// Overwrite with uniform random values (see [`Element::random`])
    pub fn fill_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for v in self.data.iter_mut() {
            *v = T::random(rng);
        }
    }

    fn extremum(&self, better: impl Fn(f64, f64) -> bool) -> T {
        assert!(!self.data.is_empty(), "extremum of an unallocated array");
        let mut best = self.data[0];
        let mut key = best.order_key();
        for &v in &self.data[1..] {
            let k = v.order_key();
            if better(k, key) {
                best = v;
                key = k;
            }
        }
        best
    }

    /// Largest element (by value for reals, by magnitude for complex).
    /// The first occurrence wins ties.
    pub fn max(&self) -> T {
        self.extremum(|a, b| a > b)
    }

    pub fn min(&self) -> T {
        self.extremum(|a, b| a < b)
    }

    /// Largest magnitude
    pub fn maxabs(&self) -> f64 {
        self.data.iter().map(|v| v.magnitude()).fold(0.0, f64::max)
    }

    /// Smallest magnitude
    pub fn minabs(&self) -> f64 {
        self.data.iter().map(|v| v.magnitude()).fold(f64::INFINITY, f64::min)
    }

    /// Convert every element through complex double precision
    pub fn cast<U: Element>(&self) -> MultiAxisArray<U> {
        self.map(|v| U::from_c64(v.to_c64()))
    }
}

impl Mask {
    /// Number of set entries
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }
}

impl<T> Index<usize> for MultiAxisArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for MultiAxisArray<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

impl<T> Default for MultiAxisArray<T>
where
    T: Copy + Default,
{
    /// Single zero element
    fn default() -> Self {
        Self::new([1; AXES])
    }
}

impl<T: fmt::Debug> fmt::Debug for MultiAxisArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.dims.iter().rposition(|&d| d > 1).map_or(1, |i| i + 1);
        f.debug_struct("MultiAxisArray")
            .field("dims", &&self.dims[..shown])
            .field("len", &self.data.len())
            .finish()
    }
}

/// Prints the inner 2-D plane row by row
impl<T: fmt::Display> fmt::Display for MultiAxisArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (m, n) = (self.dims[0], self.dims[1]);
        if self.data.len() < m * n {
            return writeln!(f, "<unallocated>");
        }
        for i in 0..m {
            for j in 0..n {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.data[i + j * m])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
