//! Reconstruction strategies and the context that drives them
//!
//! A strategy runs in phases: `init` once with the parameters, then
//! `prepare`, `process` and `finalise` against a [`Workspace`]. Strategies
//! are created by name through a [`ModuleLoader`]; the [`StaticLoader`]
//! serves a compiled-in table of `create`/`destroy` entry points.
//!
//! The context exchanges five named arrays with its host, mirroring the
//! measurement pipeline: raw data, complex helper data (coil
//! sensitivities), real helper data (density weights), the k-space
//! trajectory and pixel images.

pub mod cgsense;
pub mod dummy;
pub mod regrid;

pub use cgsense::CgSenseRecon;
pub use dummy::DummyRecon;
pub use regrid::GenericRegrid;

use crate::array::MultiAxisArray;
use crate::config::Params;
use crate::error::{Error, Result};
use crate::transport::RawPayload;
use crate::workspace::{Workspace, WorkspaceSlot};
use num_complex::Complex64;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Measurement data (complex)
pub const RAW: &str = "raw";
/// Complex helper data, e.g. coil sensitivities
pub const RHELPER: &str = "rhelper";
/// Real helper data, e.g. density compensation weights
pub const HELPER: &str = "helper";
/// Sampling positions, extents (d, M)
pub const KSPACE: &str = "kspace";
/// Pixel image
pub const PIXEL: &str = "pixel";

/// A reconstruction algorithm driven in phases
pub trait ReconStrategy: Send {
    fn name(&self) -> &str;

    /// Read configuration; called once before any other phase
    fn init(&mut self, params: &Params) -> Result<()>;

    fn prepare(&mut self, _ws: &mut Workspace) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, ws: &mut Workspace) -> Result<()>;

    fn finalise(&mut self, _ws: &mut Workspace) -> Result<()> {
        Ok(())
    }
}

/// Factory entry point; `None` signals that no strategy could be built
pub type CreateFn = fn() -> Option<Box<dyn ReconStrategy>>;
/// Teardown entry point paired with a [`CreateFn`]
pub type DestroyFn = fn(Box<dyn ReconStrategy>);

/// Symbol exported by a strategy module
#[derive(Clone, Copy)]
pub enum Symbol {
    Create(CreateFn),
    Destroy(DestroyFn),
}

/// Opened module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    name: String,
}

impl ModuleHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Resolves strategy modules by name
pub trait ModuleLoader {
    fn load(&mut self, module: &str) -> Result<ModuleHandle>;
    fn lookup(&self, handle: &ModuleHandle, symbol: &str) -> Result<Symbol>;
    fn close(&mut self, handle: ModuleHandle);
}

#[derive(Clone, Copy)]
struct ModuleEntry {
    create: CreateFn,
    destroy: DestroyFn,
}

fn drop_strategy(strategy: Box<dyn ReconStrategy>) {
    debug!("Destroying strategy '{}'", strategy.name());
}

/// Loader over a table of compiled-in modules
#[derive(Clone, Default)]
pub struct StaticLoader {
    modules: BTreeMap<String, ModuleEntry>,
    open: usize,
}

impl StaticLoader {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the strategies shipped with this crate
    pub fn with_builtin() -> Self {
        let mut loader = Self::new();
        loader.register("DummyRecon", dummy::create, drop_strategy);
        loader.register("GenericRegrid", regrid::create, drop_strategy);
        loader.register("CGSENSE", cgsense::create, drop_strategy);
        loader
    }

    pub fn register(&mut self, module: &str, create: CreateFn, destroy: DestroyFn) {
        self.modules.insert(module.to_string(), ModuleEntry { create, destroy });
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(|k| k.as_str())
    }

    /// Number of handles currently open
    pub fn open_handles(&self) -> usize {
        self.open
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&mut self, module: &str) -> Result<ModuleHandle> {
        if !self.modules.contains_key(module) {
            return Err(Error::ModuleNotFound(module.to_string()));
        }
        self.open += 1;
        Ok(ModuleHandle { name: module.to_string() })
    }

    fn lookup(&self, handle: &ModuleHandle, symbol: &str) -> Result<Symbol> {
        let entry = self.modules.get(&handle.name).ok_or_else(|| Error::ModuleNotFound(handle.name.clone()))?;
        match symbol {
            "create" => Ok(Symbol::Create(entry.create)),
            "destroy" => Ok(Symbol::Destroy(entry.destroy)),
            _ => Err(Error::SymbolNotFound { module: handle.name.clone(), symbol: symbol.to_string() }),
        }
    }

    fn close(&mut self, _handle: ModuleHandle) {
        self.open = self.open.saturating_sub(1);
    }
}

/// Owns one strategy, its module handle and the workspace it runs on
pub struct ReconContext<L: ModuleLoader = StaticLoader> {
    loader: L,
    module: String,
    handle: Option<ModuleHandle>,
    strategy: Option<Box<dyn ReconStrategy>>,
    destroy: Option<DestroyFn>,
    workspace: Workspace,
}

impl<L: ModuleLoader> ReconContext<L> {
    /// Load `module` and create its strategy
    pub fn new(mut loader: L, module: &str) -> Result<Self> {
        let handle = loader.load(module)?;
        let create = match loader.lookup(&handle, "create") {
            Ok(Symbol::Create(f)) => f,
            Ok(Symbol::Destroy(_)) => {
                loader.close(handle);
                return Err(Error::SymbolNotFound { module: module.to_string(), symbol: "create".to_string() });
            }
            Err(e) => {
                loader.close(handle);
                return Err(e);
            }
        };
        let destroy = match loader.lookup(&handle, "destroy") {
            Ok(Symbol::Destroy(f)) => Some(f),
            _ => None,
        };
        let strategy = create();
        if strategy.is_none() {
            loader.close(handle);
            return Err(Error::NullStrategy(module.to_string()));
        }
        info!("Loaded reconstruction strategy '{}'", module);
        Ok(Self {
            loader,
            module: module.to_string(),
            handle: Some(handle),
            strategy,
            destroy,
            workspace: Workspace::new(),
        })
    }

    /// Context without a strategy; every phase fails with `NullStrategy`
    pub fn empty(loader: L) -> Self {
        Self {
            loader,
            module: String::new(),
            handle: None,
            strategy: None,
            destroy: None,
            workspace: Workspace::new(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn has_strategy(&self) -> bool {
        self.strategy.is_some()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn strategy_mut(&mut self) -> Result<&mut Box<dyn ReconStrategy>> {
        let module = &self.module;
        self.strategy.as_mut().ok_or_else(|| Error::NullStrategy(module.clone()))
    }

    /// Merge `params` into the workspace parameters and initialise
    pub fn init(&mut self, params: &Params) -> Result<()> {
        for key in params.keys() {
            let value: serde_json::Value = params.get(key)?;
            self.workspace.params.set(key, value)?;
        }
        let params = self.workspace.params.clone();
        let strategy = self.strategy_mut()?;
        info!("Init '{}'", strategy.name());
        strategy.init(&params)
    }

    pub fn prepare(&mut self) -> Result<()> {
        let strategy = self.strategy.as_mut().ok_or_else(|| Error::NullStrategy(self.module.clone()))?;
        info!("Prepare '{}'", strategy.name());
        strategy.prepare(&mut self.workspace)
    }

    pub fn process(&mut self) -> Result<()> {
        let strategy = self.strategy.as_mut().ok_or_else(|| Error::NullStrategy(self.module.clone()))?;
        info!("Process '{}'", strategy.name());
        strategy.process(&mut self.workspace)
    }

    pub fn finalise(&mut self) -> Result<()> {
        let strategy = self.strategy.as_mut().ok_or_else(|| Error::NullStrategy(self.module.clone()))?;
        info!("Finalise '{}'", strategy.name());
        strategy.finalise(&mut self.workspace)
    }

    /// Run prepare, process and finalise in order
    pub fn run(&mut self) -> Result<()> {
        self.prepare()?;
        self.process()?;
        self.finalise()
    }

    fn store<T: WorkspaceSlot + crate::array::Element>(&mut self, name: &str, payload: &RawPayload) -> Result<()> {
        self.strategy_mut()?;
        let array = payload.to_array::<T>()?;
        self.workspace.insert(name, array);
        Ok(())
    }

    /// Hand out an array and drop it from the workspace
    fn fetch<T: WorkspaceSlot + crate::array::Element>(&mut self, name: &str) -> Result<RawPayload> {
        self.strategy_mut()?;
        let array: MultiAxisArray<T> = self.workspace.take(name)?;
        Ok(RawPayload::from_array(&array))
    }

    pub fn set_raw(&mut self, payload: &RawPayload) -> Result<()> {
        self.store::<Complex64>(RAW, payload)
    }

    pub fn get_raw(&mut self) -> Result<RawPayload> {
        self.fetch::<Complex64>(RAW)
    }

    pub fn set_rhelper(&mut self, payload: &RawPayload) -> Result<()> {
        self.store::<Complex64>(RHELPER, payload)
    }

    pub fn get_rhelper(&mut self) -> Result<RawPayload> {
        self.fetch::<Complex64>(RHELPER)
    }

    pub fn set_helper(&mut self, payload: &RawPayload) -> Result<()> {
        self.store::<f64>(HELPER, payload)
    }

    pub fn get_helper(&mut self) -> Result<RawPayload> {
        self.fetch::<f64>(HELPER)
    }

    pub fn set_kspace(&mut self, payload: &RawPayload) -> Result<()> {
        self.store::<f64>(KSPACE, payload)
    }

    pub fn get_kspace(&mut self) -> Result<RawPayload> {
        self.fetch::<f64>(KSPACE)
    }

    pub fn set_pixel(&mut self, payload: &RawPayload) -> Result<()> {
        self.store::<i16>(PIXEL, payload)
    }

    pub fn get_pixel(&mut self) -> Result<RawPayload> {
        self.fetch::<i16>(PIXEL)
    }
}

impl<L: ModuleLoader> Drop for ReconContext<L> {
    fn drop(&mut self) {
        if let Some(strategy) = self.strategy.take() {
            match self.destroy {
                Some(destroy) => destroy(strategy),
                None => drop(strategy),
            }
        }
        if let Some(handle) = self.handle.take() {
            self.loader.close(handle);
        }
    }
}
