//! Named arrays shared between a host and its strategies
//!
//! A [`Workspace`] keeps three maps keyed by name: complex measurement
//! data, real helper data (trajectories, weights) and pixel images. It is
//! passed to strategies explicitly; there is no global instance.

use crate::array::MultiAxisArray;
use crate::config::Params;
use crate::error::{Error, Result};
use num_complex::Complex64;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    complex: BTreeMap<String, MultiAxisArray<Complex64>>,
    real: BTreeMap<String, MultiAxisArray<f64>>,
    pixel: BTreeMap<String, MultiAxisArray<i16>>,
    /// Parameters visible to every strategy working on this workspace
    pub params: Params,
}

/// Element types a [`Workspace`] can hold
pub trait WorkspaceSlot: Sized {
    fn slot(ws: &Workspace) -> &BTreeMap<String, MultiAxisArray<Self>>;
    fn slot_mut(ws: &mut Workspace) -> &mut BTreeMap<String, MultiAxisArray<Self>>;
}

impl WorkspaceSlot for Complex64 {
    fn slot(ws: &Workspace) -> &BTreeMap<String, MultiAxisArray<Self>> {
        &ws.complex
    }
    fn slot_mut(ws: &mut Workspace) -> &mut BTreeMap<String, MultiAxisArray<Self>> {
        &mut ws.complex
    }
}

impl WorkspaceSlot for f64 {
    fn slot(ws: &Workspace) -> &BTreeMap<String, MultiAxisArray<Self>> {
        &ws.real
    }
    fn slot_mut(ws: &mut Workspace) -> &mut BTreeMap<String, MultiAxisArray<Self>> {
        &mut ws.real
    }
}

impl WorkspaceSlot for i16 {
    fn slot(ws: &Workspace) -> &BTreeMap<String, MultiAxisArray<Self>> {
        &ws.pixel
    }
    fn slot_mut(ws: &mut Workspace) -> &mut BTreeMap<String, MultiAxisArray<Self>> {
        &mut ws.pixel
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: Params) -> Self {
        Self { params, ..Self::default() }
    }

    /// Store an array, replacing any previous one under the same name
    pub fn insert<T: WorkspaceSlot + Copy + Default>(&mut self, name: &str, array: MultiAxisArray<T>) {
        debug!("Workspace: storing '{}' ({} elements)", name, array.size());
        T::slot_mut(self).insert(name.to_string(), array);
    }

    pub fn get<T: WorkspaceSlot>(&self, name: &str) -> Result<&MultiAxisArray<T>> {
        T::slot(self).get(name).ok_or_else(|| Error::MissingInput(name.to_string()))
    }

    pub fn get_mut<T: WorkspaceSlot>(&mut self, name: &str) -> Result<&mut MultiAxisArray<T>> {
        T::slot_mut(self).get_mut(name).ok_or_else(|| Error::MissingInput(name.to_string()))
    }

    /// Remove and return an array
    pub fn take<T: WorkspaceSlot>(&mut self, name: &str) -> Result<MultiAxisArray<T>> {
        T::slot_mut(self).remove(name).ok_or_else(|| Error::MissingInput(name.to_string()))
    }

    pub fn contains<T: WorkspaceSlot>(&self, name: &str) -> bool {
        T::slot(self).contains_key(name)
    }

    pub fn names<'a, T: WorkspaceSlot + 'a>(&'a self) -> impl Iterator<Item = &'a str> {
        T::slot(self).keys().map(|k| k.as_str())
    }

    /// Drop every array; parameters are kept
    pub fn clear(&mut self) {
        self.complex.clear();
        self.real.clear();
        self.pixel.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.complex.is_empty() && self.real.is_empty() && self.pixel.is_empty()
    }
}
