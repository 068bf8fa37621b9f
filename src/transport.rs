//! Payloads for moving arrays across a process boundary
//!
//! A [`RawPayload`] carries the 16 extents as signed integers and the data
//! as separate real and imaginary sequences. Real element kinds leave
//! `imag` empty. Values travel as `f64`, so every element kind survives a
//! round trip unchanged.

use crate::array::{Element, MultiAxisArray, AXES};
use crate::error::{Error, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayload {
    pub dims: [i64; AXES],
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
}

impl RawPayload {
    pub fn from_array<T: Element>(array: &MultiAxisArray<T>) -> Self {
        let mut dims = [1i64; AXES];
        for (d, &e) in dims.iter_mut().zip(array.dims().iter()) {
            *d = e as i64;
        }
        let values: Vec<Complex64> = array.iter().map(|v| v.to_c64()).collect();
        let real = values.iter().map(|v| v.re).collect();
        let imag = if T::KIND.is_complex() { values.iter().map(|v| v.im).collect() } else { Vec::new() };
        Self { dims, real, imag }
    }

    /// Rebuild the array; negative extents are fatal, length mismatches are
    /// errors. A real element type rejects payloads with a non-zero
    /// imaginary part.
    pub fn to_array<T: Element>(&self) -> Result<MultiAxisArray<T>> {
        let mut array = MultiAxisArray::from_signed_extents(&self.dims);
        if self.real.len() != array.size() {
            return Err(Error::Format {
                format: "payload",
                reason: format!("{} values for {} elements", self.real.len(), array.size()),
            });
        }
        if !self.imag.is_empty() && self.imag.len() != self.real.len() {
            return Err(Error::Format {
                format: "payload",
                reason: format!("{} imaginary parts for {} values", self.imag.len(), self.real.len()),
            });
        }
        if !T::KIND.is_complex() {
            if let Some(i) = self.imag.iter().position(|&im| im != 0.0) {
                return Err(Error::Format {
                    format: "payload",
                    reason: format!("imaginary part {} at element {} for a real {:?} array", self.imag[i], i, T::KIND),
                });
            }
        }
        for (i, v) in array.as_mut_slice().iter_mut().enumerate() {
            let im = self.imag.get(i).copied().unwrap_or(0.0);
            *v = T::from_c64(Complex64::new(self.real[i], im));
        }
        Ok(array)
    }

    pub fn size(&self) -> usize {
        self.real.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<T: Element> From<&MultiAxisArray<T>> for RawPayload {
    fn from(array: &MultiAxisArray<T>) -> Self {
        Self::from_array(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    #[test]
    fn test_complex_payload() {
        let a = MultiAxisArray::from_fn(&[2, 2, 3], |i| Complex32::new(i as f32 * 0.5, -(i as f32)));
        let p = RawPayload::from_array(&a);
        assert_eq!(p.dims[..4], [2, 2, 3, 1]);
        assert_eq!(p.imag.len(), 12);
        assert_eq!(p.to_array::<Complex32>().unwrap(), a);
    }

    #[test]
    fn test_pixel_payload_via_json() {
        let a = MultiAxisArray::from_fn(&[5], |i| i as i16 * -300);
        let p = RawPayload::from(&a);
        assert!(p.imag.is_empty());
        let back = RawPayload::from_json(&p.to_json().unwrap()).unwrap();
        assert_eq!(back.to_array::<i16>().unwrap(), a);
    }

    #[test]
    fn test_length_mismatch() {
        let mut p = RawPayload::from_array(&MultiAxisArray::from_fn(&[3], |i| i as f64));
        p.real.pop();
        assert!(p.to_array::<f64>().is_err());
    }

    #[test]
    fn test_real_target_rejects_imaginary_data() {
        let c = MultiAxisArray::from_vec(&[3], vec![Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.5), Complex64::new(3.0, 0.0)]);
        let p = RawPayload::from_array(&c);
        let err = p.to_array::<f64>().unwrap_err();
        assert!(err.to_string().contains("element 1"), "{}", err);

        // Purely real complex data converts
        let r = MultiAxisArray::from_fn(&[3], |i| Complex64::new(i as f64, 0.0));
        let back = RawPayload::from_array(&r).to_array::<f32>().unwrap();
        assert_eq!(back.as_slice(), &[0.0, 1.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "negative extent")]
    fn test_negative_extent_panics() {
        let mut dims = [1i64; AXES];
        dims[0] = -2;
        let p = RawPayload { dims, real: vec![], imag: vec![] };
        let _ = p.to_array::<f64>();
    }
}
