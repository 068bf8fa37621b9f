//! Reconstruction parameters
//!
//! [`Params`] is a string-keyed bag of JSON values handed explicitly to
//! strategies and operators. The typed configs below read their fields
//! from it (keys as used in reconstruction parameter files) and fall back
//! to their defaults for absent keys.

use crate::error::{Error, Result};
use crate::operators::WaveletFamily;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Key/value parameter container
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    entries: BTreeMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store any serialisable value, replacing an existing entry
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.entries.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Typed lookup; missing keys and type mismatches are errors
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.entries.get(key).ok_or_else(|| Error::Config {
            key: key.to_string(),
            reason: "missing".to_string(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| Error::Config { key: key.to_string(), reason: e.to_string() })
    }

    /// Typed lookup with a default for missing keys
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        if self.exists(key) {
            self.get(key)
        } else {
            Ok(default)
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.entries {
            writeln!(f, "{}: {}", k, v)?;
        }
        Ok(())
    }
}

/// Non-uniform FFT plan settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NufftConfig {
    /// Oversampling factor of the gridding grid (≥ 1)
    pub alpha: f64,
    /// Window cutoff in grid points
    pub m: usize,
    /// Iterations of the weighted inverse run by `adjoint` (0: plain weighted adjoint)
    pub ft_iter: usize,
    /// Residual threshold of that inverse
    pub ft_eps: f64,
}

impl Default for NufftConfig {
    fn default() -> Self {
        Self { alpha: 1.0, m: 1, ft_iter: 3, ft_eps: 7.0e-4 }
    }
}

impl NufftConfig {
    pub fn from_params(params: &Params) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            alpha: params.get_or("alpha", d.alpha)?,
            m: params.get_or("m", d.m)?,
            ft_iter: params.get_or("ftiter", d.ft_iter)?,
            ft_eps: params.get_or("fteps", d.ft_eps)?,
        })
    }
}

/// Conjugate-gradient settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CgConfig {
    /// Iteration cap
    pub max_iter: usize,
    /// Threshold on the relative residual `rn / xn`
    pub eps: f64,
    /// Tikhonov weight
    pub lambda: f64,
    /// Record the (rescaled) iterate after every update
    pub keep_iterates: bool,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self { max_iter: 100, eps: 1.0e-6, lambda: 1.0e-6, keep_iterates: false }
    }
}

impl CgConfig {
    pub fn from_params(params: &Params) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            max_iter: params.get_or("cgiter", d.max_iter)?,
            eps: params.get_or("cgeps", d.eps)?,
            lambda: params.get_or("lambda", d.lambda)?,
            keep_iterates: params.get_or("verbose", d.keep_iterates)?,
        })
    }
}

/// Wavelet operator settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveletConfig {
    pub family: WaveletFamily,
    /// Family member (filter length, or 202/404 for B-splines)
    pub member: usize,
    /// Coarsest decomposition level
    pub min_level: usize,
}

impl Default for WaveletConfig {
    fn default() -> Self {
        Self { family: WaveletFamily::Daubechies, member: 4, min_level: 4 }
    }
}

impl WaveletConfig {
    pub fn from_params(params: &Params) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            family: params.get_or("wavelet_family", d.family)?,
            member: params.get_or("wavelet_member", d.member)?,
            min_level: params.get_or("wavelet_min_level", d.min_level)?,
        })
    }
}

/// Finite-difference settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiniteDifferenceConfig {
    /// Grid spacing along axes 0 and 1
    pub spacing: [f64; 2],
}

impl Default for FiniteDifferenceConfig {
    fn default() -> Self {
        Self { spacing: [1.0, 1.0] }
    }
}

/// CG-SENSE settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenseConfig {
    pub nufft: NufftConfig,
    pub cg: CgConfig,
    /// Worker threads; `None` uses the available hardware threads
    pub threads: Option<usize>,
}

impl SenseConfig {
    pub fn from_params(params: &Params) -> Result<Self> {
        Ok(Self {
            nufft: NufftConfig::from_params(params)?,
            cg: CgConfig::from_params(params)?,
            threads: params.get_or("np", None)?,
        })
    }
}
