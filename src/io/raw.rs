//! Raw column-major dumps
//!
//! Elements are written back to back in little-endian order with no header;
//! complex values as interleaved real/imaginary parts. The format carries no
//! shape, so it is write-only.

use crate::array::{Element, MultiAxisArray};
use crate::error::Result;
use std::path::Path;

/// Raw bytes of an array
pub fn to_bytes<T: Element>(array: &MultiAxisArray<T>) -> Vec<u8> {
    let mut out = Vec::with_capacity(array.size_in_bytes());
    for &v in array.iter() {
        v.write_le(&mut out);
    }
    out
}

pub fn write_raw<T: Element>(path: &Path, array: &MultiAxisArray<T>) -> Result<()> {
    std::fs::write(path, to_bytes(array))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    #[test]
    fn test_raw_layout() {
        let a = MultiAxisArray::from_vec(&[2], vec![Complex32::new(1.0, -1.0), Complex32::new(0.5, 2.0)]);
        let bytes = to_bytes(&a);
        assert_eq!(bytes.len(), 16);
        assert_eq!(f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), -1.0);
        assert_eq!(f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 0.5);
    }
}
