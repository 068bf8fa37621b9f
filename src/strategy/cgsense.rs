//! CG-SENSE strategy
//!
//! Inputs: coil sensitivities in `rhelper`, trajectory in `kspace`,
//! optional density weights in `helper` and the multi-channel samples
//! (M, nc) in `raw`. The reconstructed image replaces `raw`; the residual
//! history is stored as the real array `residuals`.

use super::{ReconStrategy, HELPER, KSPACE, RAW, RHELPER};
use crate::array::MultiAxisArray;
use crate::config::{Params, SenseConfig};
use crate::error::{Error, Result};
use crate::solvers::CgSense;
use crate::workspace::Workspace;
use num_complex::Complex64;
use tracing::{debug, info, warn};

/// Name of the residual history written by `process`
pub const RESIDUALS: &str = "residuals";

#[derive(Default)]
pub struct CgSenseRecon {
    config: SenseConfig,
    solver: Option<CgSense>,
}

pub fn create() -> Option<Box<dyn ReconStrategy>> {
    Some(Box::new(CgSenseRecon::default()))
}

impl CgSenseRecon {
    pub fn config(&self) -> &SenseConfig {
        &self.config
    }

    /// Build the operator from the workspace inputs
    fn build(&mut self, ws: &Workspace) -> Result<()> {
        let sens = ws.get::<Complex64>(RHELPER)?.clone();
        let k = ws.get::<f64>(KSPACE)?;
        let d = sens.ndims() - 1;
        if d == 0 || k.dim(0) != d {
            return Err(Error::Format {
                format: "workspace",
                reason: format!("trajectory has {} rows, sensitivities describe a {}-D image", k.dim(0), d),
            });
        }
        let num_nodes = k.size() / d;
        let mut solver = CgSense::new(sens, num_nodes, &self.config)?;
        solver.set_trajectory(k);
        if let Ok(w) = ws.get::<f64>(HELPER) {
            solver.set_weights(w);
        }
        self.solver = Some(solver);
        Ok(())
    }
}

impl ReconStrategy for CgSenseRecon {
    fn name(&self) -> &str {
        "CGSENSE"
    }

    fn init(&mut self, params: &Params) -> Result<()> {
        self.config = SenseConfig::from_params(params)?;
        self.solver = None;
        Ok(())
    }

    /// Builds the operator early when all inputs are already present
    fn prepare(&mut self, ws: &mut Workspace) -> Result<()> {
        if ws.contains::<Complex64>(RHELPER) && ws.contains::<f64>(KSPACE) {
            self.build(ws)?;
        }
        Ok(())
    }

    fn process(&mut self, ws: &mut Workspace) -> Result<()> {
        if self.solver.is_none() {
            self.build(ws)?;
        }
        let Some(solver) = self.solver.as_ref() else {
            return Err(Error::NullStrategy("CGSENSE".to_string()));
        };

        let y = ws.get::<Complex64>(RAW)?;
        let encoding = solver.encoding();
        if y.size() != encoding.num_nodes() * encoding.channels() {
            return Err(Error::Format {
                format: "workspace",
                reason: format!(
                    "expected {} samples for {} channels, got {}",
                    encoding.num_nodes(),
                    encoding.channels(),
                    y.size()
                ),
            });
        }

        let out = solver.solve_with_progress(y, |iter, max_iter, residual| {
            debug!("CGSENSE iteration {}/{}: residual {:.3e}", iter, max_iter, residual);
        });
        if !out.converged() {
            warn!("CGSENSE stopped without converging ({:?})", out.termination);
        }
        info!("CGSENSE: {} iterations", out.iterations);

        if !out.residuals.is_empty() {
            ws.insert(RESIDUALS, MultiAxisArray::from_vec(&[out.residuals.len()], out.residuals.clone()));
        }
        ws.insert(RAW, out.x);
        Ok(())
    }

    fn finalise(&mut self, _ws: &mut Workspace) -> Result<()> {
        self.solver = None;
        Ok(())
    }
}
