//! Pass-through strategy

use super::{ReconStrategy, RAW};
use crate::config::Params;
use crate::error::Result;
use crate::workspace::Workspace;
use num_complex::Complex64;
use tracing::info;

/// Leaves the workspace untouched
#[derive(Debug, Default)]
pub struct DummyRecon {
    initialised: bool,
}

pub fn create() -> Option<Box<dyn ReconStrategy>> {
    Some(Box::new(DummyRecon::default()))
}

impl ReconStrategy for DummyRecon {
    fn name(&self) -> &str {
        "DummyRecon"
    }

    fn init(&mut self, _params: &Params) -> Result<()> {
        self.initialised = true;
        Ok(())
    }

    fn process(&mut self, ws: &mut Workspace) -> Result<()> {
        if let Ok(raw) = ws.get::<Complex64>(RAW) {
            info!("DummyRecon: passing through {} raw samples", raw.size());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::MultiAxisArray;

    #[test]
    fn test_data_passes_through() {
        let mut ws = Workspace::new();
        let raw = MultiAxisArray::from_fn(&[3, 2], |i| Complex64::new(i as f64, 0.0));
        ws.insert(RAW, raw.clone());
        let mut s = DummyRecon::default();
        s.init(&Params::new()).unwrap();
        s.prepare(&mut ws).unwrap();
        s.process(&mut ws).unwrap();
        s.finalise(&mut ws).unwrap();
        assert_eq!(ws.get::<Complex64>(RAW).unwrap(), &raw);
    }
}
