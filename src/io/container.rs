//! Multi-dataset container files
//!
//! One file holds any number of arrays addressed by a slash-separated
//! location and a name. The file is a bincode-encoded [`Header`]
//! followed by the bincode-encoded [`Container`]; each dataset keeps its
//! element kind, 16 extents and little-endian sample bytes.

use crate::array::{Element, ElementKind, MultiAxisArray, AXES};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const MAGIC: [u8; 4] = *b"RCDS";
const VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u32,
}

/// Stored array in its on-disk element kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dataset {
    kind: ElementKind,
    dims: [usize; AXES],
    bytes: Vec<u8>,
}

impl Dataset {
    fn validate(&self, path: &str) -> Result<()> {
        if self.dims.contains(&0) {
            return Err(format_error(format!("dataset '{}' has a zero extent", path)));
        }
        let expected = self
            .dims
            .iter()
            .try_fold(self.kind.byte_size(), |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| format_error(format!("dataset '{}' is too large", path)))?;
        if expected != self.bytes.len() {
            return Err(format_error(format!(
                "dataset '{}' holds {} bytes, extents need {}",
                path,
                self.bytes.len(),
                expected
            )));
        }
        Ok(())
    }
}

/// In-memory image of a container file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    datasets: BTreeMap<String, Dataset>,
}

/// Canonical key: location without surrounding slashes, then the name
fn dataset_path(location: &str, name: &str) -> String {
    let location = location.trim_matches('/');
    if location.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", location, name)
    }
}

fn format_error(reason: impl Into<String>) -> Error {
    Error::Format { format: "container", reason: reason.into() }
}

fn decode<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::BYTES).map(T::read_le).collect()
}

/// Decode stored bytes of any kind into `U`, converting through Complex64
fn decode_as<U: Element>(kind: ElementKind, bytes: &[u8]) -> Vec<U> {
    fn convert<S: Element, U: Element>(bytes: &[u8]) -> Vec<U> {
        bytes.chunks_exact(S::BYTES).map(|b| U::from_c64(S::read_le(b).to_c64())).collect()
    }
    if kind == U::KIND {
        return decode(bytes);
    }
    match kind {
        ElementKind::Float32 => convert::<f32, U>(bytes),
        ElementKind::Float64 => convert::<f64, U>(bytes),
        ElementKind::Int16 => convert::<i16, U>(bytes),
        ElementKind::Complex32 => convert::<num_complex::Complex32, U>(bytes),
        ElementKind::Complex64 => convert::<num_complex::Complex64, U>(bytes),
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a container; a missing file yields an empty container
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config = bincode::config::standard();
        let (header, used): (Header, usize) = bincode::serde::decode_from_slice(bytes, config)
            .map_err(|e| format_error(format!("unreadable header: {}", e)))?;
        if header.magic != MAGIC {
            return Err(format_error("bad magic"));
        }
        if header.version != VERSION {
            return Err(format_error(format!("unsupported version {}", header.version)));
        }
        let (container, _): (Self, usize) = bincode::serde::decode_from_slice(&bytes[used..], config)
            .map_err(|e| format_error(format!("unreadable datasets: {}", e)))?;
        for (path, ds) in &container.datasets {
            ds.validate(path)?;
        }
        Ok(container)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let config = bincode::config::standard();
        let header = Header { magic: MAGIC, version: VERSION };
        let mut out = bincode::serde::encode_to_vec(header, config)
            .map_err(|e| format_error(format!("cannot encode header: {}", e)))?;
        out.extend(
            bincode::serde::encode_to_vec(self, config)
                .map_err(|e| format_error(format!("cannot encode datasets: {}", e)))?,
        );
        Ok(out)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        debug!("Wrote {} datasets to {}", self.datasets.len(), path.display());
        Ok(())
    }

    /// Insert or replace a dataset
    pub fn put<T: Element>(&mut self, location: &str, name: &str, array: &MultiAxisArray<T>) {
        let mut bytes = Vec::with_capacity(array.size() * T::BYTES);
        for &v in array.iter() {
            v.write_le(&mut bytes);
        }
        self.datasets.insert(dataset_path(location, name), Dataset { kind: T::KIND, dims: array.dims(), bytes });
    }

    /// Read a dataset, converting from its stored element kind when needed
    pub fn get<T: Element>(&self, location: &str, name: &str) -> Result<MultiAxisArray<T>> {
        let ds = self.datasets.get(&dataset_path(location, name)).ok_or_else(|| Error::DatasetNotFound {
            name: name.to_string(),
            location: location.trim_matches('/').to_string(),
        })?;
        let mut array = MultiAxisArray::new(ds.dims);
        array.as_mut_slice().copy_from_slice(&decode_as::<T>(ds.kind, &ds.bytes));
        Ok(array)
    }

    pub fn contains(&self, location: &str, name: &str) -> bool {
        self.datasets.contains_key(&dataset_path(location, name))
    }

    /// Stored element kind of a dataset
    pub fn kind(&self, location: &str, name: &str) -> Option<ElementKind> {
        self.datasets.get(&dataset_path(location, name)).map(|ds| ds.kind)
    }

    pub fn remove(&mut self, location: &str, name: &str) -> bool {
        self.datasets.remove(&dataset_path(location, name)).is_some()
    }

    /// Full dataset paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
