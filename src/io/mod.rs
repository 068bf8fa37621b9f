//! Array serialisation
//!
//! [`read`] and [`write`] address an array by file, dataset name and
//! location. Only the container format stores several arrays per file;
//! NIfTI and raw files ignore name and location.

pub mod container;
pub mod nifti;
pub mod raw;

pub use container::Container;

use crate::array::{Element, MultiAxisArray};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// On-disk format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Named datasets under slash-separated locations
    #[default]
    Container,
    /// NIfTI-1, real arrays only
    Nifti,
    /// Headerless column-major dump, write-only
    Raw,
}

impl Format {
    /// Format for a short tag such as `"h5"`, `"nii"` or `"raw"`
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "h5" | "hdf5" | "container" => Ok(Format::Container),
            "nii" | "nii.gz" | "nifti" => Ok(Format::Nifti),
            "raw" | "dat" => Ok(Format::Raw),
            other => Err(Error::Format { format: "tag", reason: format!("unknown format tag '{}'", other) }),
        }
    }

    /// Guess from the file name, falling back to the container format
    pub fn from_path(path: &Path) -> Self {
        let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Format::Nifti
        } else if name.ends_with(".raw") || name.ends_with(".dat") {
            Format::Raw
        } else {
            Format::Container
        }
    }
}

/// Read dataset `name` under `location`
pub fn read<T: Element>(path: &Path, name: &str, location: &str, format: Format) -> Result<MultiAxisArray<T>> {
    debug!("Reading '{}' from {} ({:?})", name, path.display(), format);
    match format {
        Format::Container => {
            if !path.exists() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )));
            }
            Container::open(path)?.get(location, name)
        }
        Format::Nifti => Ok(nifti::read_nifti_file(path)?.array),
        Format::Raw => Err(Error::Format { format: "raw", reason: "raw files are write-only".to_string() }),
    }
}

/// Write `array` as dataset `name` under `location`; other datasets in an
/// existing container file are kept
pub fn write<T: Element>(path: &Path, name: &str, location: &str, array: &MultiAxisArray<T>, format: Format) -> Result<()> {
    debug!("Writing '{}' to {} ({:?})", name, path.display(), format);
    match format {
        Format::Container => {
            let mut container = Container::open(path)?;
            container.put(location, name, array);
            container.save(path)
        }
        Format::Nifti => nifti::write_nifti_file(path, array),
        Format::Raw => raw::write_raw(path, array),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_format_tags() {
        assert_eq!(Format::from_tag("h5").unwrap(), Format::Container);
        assert_eq!(Format::from_tag("NII").unwrap(), Format::Nifti);
        assert_eq!(Format::from_tag("raw").unwrap(), Format::Raw);
        assert!(Format::from_tag("mat").is_err());
        assert_eq!(Format::default(), Format::Container);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a/b.nii.gz")), Format::Nifti);
        assert_eq!(Format::from_path(Path::new("dump.raw")), Format::Raw);
        assert_eq!(Format::from_path(Path::new("out.h5")), Format::Container);
    }

    #[test]
    fn test_write_keeps_other_datasets() {
        let path = std::env::temp_dir().join("recon_core_io_keep.rcds");
        std::fs::remove_file(&path).ok();
        let a = MultiAxisArray::from_fn(&[2, 3], |i| Complex64::new(i as f64, 1.0));
        let b = MultiAxisArray::from_fn(&[4], |i| i as f64);
        write(&path, "a", "/", &a, Format::Container).unwrap();
        write(&path, "b", "/aux", &b, Format::Container).unwrap();

        let a2: MultiAxisArray<Complex64> = read(&path, "a", "/", Format::Container).unwrap();
        let b2: MultiAxisArray<f64> = read(&path, "b", "/aux", Format::Container).unwrap();
        assert_eq!(a2, a);
        assert_eq!(b2, b);
        assert!(matches!(read::<f64>(&path, "c", "/", Format::Container), Err(Error::DatasetNotFound { .. })));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_raw_is_write_only() {
        let path = std::env::temp_dir().join("recon_core_io_dump.raw");
        let a = MultiAxisArray::from_fn(&[3], |i| i as f64);
        write(&path, "a", "/", &a, Format::Raw).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 24);
        assert!(read::<f64>(&path, "a", "/", Format::Raw).is_err());
        std::fs::remove_file(&path).ok();
    }
}
