//! NIfTI-1 file I/O for real-valued arrays
//!
//! Reads .nii and .nii.gz (gzip is auto-detected) of any stored data type
//! into arrays of up to seven axes. Writes single-file NIfTI-1 with the
//! array's own element type; a `.gz` suffix selects gzip compression.

use crate::array::{Element, ElementKind, MultiAxisArray};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array, IxDyn};
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};
use std::io::{Cursor, Write};
use std::path::Path;

const HEADER_SIZE: usize = 348;
const VOX_OFFSET: usize = 352;
const MAX_AXES: usize = 7;

/// Volume read from a NIfTI file
#[derive(Debug, Clone)]
pub struct NiftiVolume<T> {
    pub array: MultiAxisArray<T>,
    /// Voxel sizes along the first three axes
    pub voxel_size: [f64; 3],
    /// Affine transformation matrix (4x4, row-major)
    pub affine: [f64; 16],
}

fn format_error(reason: impl Into<String>) -> Error {
    Error::Format { format: "nifti", reason: reason.into() }
}

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// NIfTI datatype code and bit width for an element kind
fn datatype(kind: ElementKind) -> Result<(i16, i16)> {
    match kind {
        ElementKind::Int16 => Ok((4, 16)),
        ElementKind::Float32 => Ok((16, 32)),
        ElementKind::Float64 => Ok((64, 64)),
        ElementKind::Complex32 | ElementKind::Complex64 => {
            Err(format_error("complex arrays cannot be stored as NIfTI"))
        }
    }
}

/// Parse NIfTI bytes into an array of real values
pub fn load_nifti<T: Element>(bytes: &[u8]) -> Result<NiftiVolume<T>> {
    if T::KIND.is_complex() {
        return Err(format_error("complex arrays cannot be read from NIfTI"));
    }
    let obj: InMemNiftiObject = if is_gzip(bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes)))
            .map_err(|e| format_error(format!("failed to read gzipped NIfTI: {}", e)))?
    } else {
        InMemNiftiObject::from_reader(Cursor::new(bytes))
            .map_err(|e| format_error(format!("failed to read NIfTI: {}", e)))?
    };

    let header = obj.header();
    let pixdim = header.pixdim;
    let voxel_size = [pixdim[1] as f64, pixdim[2] as f64, pixdim[3] as f64];
    let affine = get_affine(header);

    let volume: Array<f64, IxDyn> = obj
        .into_volume()
        .into_ndarray()
        .map_err(|e| format_error(format!("failed to convert volume: {}", e)))?;

    let shape = volume.shape().to_vec();
    if shape.is_empty() || shape.len() > MAX_AXES {
        return Err(format_error(format!("unsupported number of axes: {}", shape.len())));
    }

    // Fortran order (x fastest): row-major walk over the reversed axes
    let data: Vec<T> = volume.t().iter().map(|&v| T::from_f64(v)).collect();
    Ok(NiftiVolume { array: MultiAxisArray::from_vec(&shape, data), voxel_size, affine })
}

/// Get affine transformation matrix from header
fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    // Prefer sform if available (sform_code > 0)
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        let vs = [header.pixdim[1] as f64, header.pixdim[2] as f64, header.pixdim[3] as f64];
        scaling_affine(vs)
    }
}

fn scaling_affine(vs: [f64; 3]) -> [f64; 16] {
    [
        vs[0], 0.0, 0.0, 0.0,
        0.0, vs[1], 0.0, 0.0,
        0.0, 0.0, vs[2], 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Serialise an array as uncompressed NIfTI-1 bytes
pub fn save_nifti<T: Element>(array: &MultiAxisArray<T>, voxel_size: [f64; 3], affine: &[f64; 16]) -> Result<Vec<u8>> {
    let (code, bitpix) = datatype(T::KIND)?;
    let ndims = array.ndims();
    if ndims > MAX_AXES {
        return Err(format_error(format!("NIfTI holds at most {} axes, array has {}", MAX_AXES, ndims)));
    }

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&(HEADER_SIZE as i32).to_le_bytes());

    // dim[0..7]
    let mut dim = [1i16; 8];
    dim[0] = ndims as i16;
    for (axis, d) in dim[1..=ndims].iter_mut().enumerate() {
        *d = i16::try_from(array.dim(axis))
            .map_err(|_| format_error(format!("extent {} of axis {} exceeds the NIfTI limit", array.dim(axis), axis)))?;
    }
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    header[70..72].copy_from_slice(&code.to_le_bytes());
    header[72..74].copy_from_slice(&bitpix.to_le_bytes());

    let pixdim: [f32; 8] = [1.0, voxel_size[0] as f32, voxel_size[1] as f32, voxel_size[2] as f32, 1.0, 1.0, 1.0, 1.0];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    header[108..112].copy_from_slice(&(VOX_OFFSET as f32).to_le_bytes());
    // scl_slope = 1, scl_inter = 0
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes());

    // sform_code = 1 (scanner anat), srow_x/y/z
    header[254..256].copy_from_slice(&1i16.to_le_bytes());
    for row in 0..3 {
        for i in 0..4 {
            let offset = 280 + row * 16 + i * 4;
            header[offset..offset + 4].copy_from_slice(&(affine[row * 4 + i] as f32).to_le_bytes());
        }
    }
    header[344..348].copy_from_slice(b"n+1\0");

    let mut buffer = Vec::with_capacity(VOX_OFFSET + array.size() * T::BYTES);
    buffer.extend_from_slice(&header);
    // no extensions
    buffer.extend_from_slice(&[0u8; 4]);
    for &v in array.iter() {
        v.write_le(&mut buffer);
    }
    Ok(buffer)
}

/// Serialise as gzipped NIfTI bytes (.nii.gz)
pub fn save_nifti_gz<T: Element>(array: &MultiAxisArray<T>, voxel_size: [f64; 3], affine: &[f64; 16]) -> Result<Vec<u8>> {
    let uncompressed = save_nifti(array, voxel_size, affine)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&uncompressed)?;
    Ok(encoder.finish()?)
}

/// Read a .nii or .nii.gz file
pub fn read_nifti_file<T: Element>(path: &Path) -> Result<NiftiVolume<T>> {
    let bytes = std::fs::read(path)?;
    load_nifti(&bytes)
}

/// Write with unit voxels; `.gz` paths are compressed
pub fn write_nifti_file<T: Element>(path: &Path, array: &MultiAxisArray<T>) -> Result<()> {
    let unit = [1.0; 3];
    save_nifti_volume(path, array, unit, &scaling_affine(unit))
}

/// Write with explicit geometry; `.gz` paths are compressed
pub fn save_nifti_volume<T: Element>(
    path: &Path,
    array: &MultiAxisArray<T>,
    voxel_size: [f64; 3],
    affine: &[f64; 16],
) -> Result<()> {
    let gz = path.extension().is_some_and(|e| e == "gz");
    let bytes = if gz { save_nifti_gz(array, voxel_size, affine)? } else { save_nifti(array, voxel_size, affine)? };
    std::fs::write(path, bytes)?;
    Ok(())
}
