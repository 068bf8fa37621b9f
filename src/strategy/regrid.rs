//! Non-Cartesian regridding
//!
//! Maps raw samples (M[, nc]) on the trajectory in `kspace` to images
//! (N0[, N1[, N2]][, nc]) through the NUFFT adjoint. Density weights are
//! taken from `helper` when present. The image replaces the raw data.

use super::{ReconStrategy, HELPER, KSPACE, RAW};
use crate::array::MultiAxisArray;
use crate::config::{NufftConfig, Params};
use crate::error::{Error, Result};
use crate::operators::{LinearOperator, Nufft};
use crate::workspace::Workspace;
use num_complex::Complex64;
use tracing::info;

#[derive(Debug, Default)]
pub struct GenericRegrid {
    image_dims: Vec<usize>,
    config: NufftConfig,
}

pub fn create() -> Option<Box<dyn ReconStrategy>> {
    Some(Box::new(GenericRegrid::default()))
}

/// Image extents from the `dims` parameter
pub(crate) fn image_dims_from(params: &Params) -> Result<Vec<usize>> {
    let dims: Vec<usize> = params.get("dims")?;
    if dims.is_empty() || dims.len() > 3 {
        return Err(Error::Config { key: "dims".to_string(), reason: format!("expected 1 to 3 extents, got {}", dims.len()) });
    }
    if let Some(d) = dims.iter().find(|&&d| d < 2) {
        return Err(Error::Config { key: "dims".to_string(), reason: format!("extent {} is too small", d) });
    }
    Ok(dims)
}

impl GenericRegrid {
    pub fn image_dims(&self) -> &[usize] {
        &self.image_dims
    }
}

impl ReconStrategy for GenericRegrid {
    fn name(&self) -> &str {
        "GenericRegrid"
    }

    fn init(&mut self, params: &Params) -> Result<()> {
        self.image_dims = image_dims_from(params)?;
        self.config = NufftConfig::from_params(params)?;
        info!("GenericRegrid: image {:?}, alpha {}, m {}", self.image_dims, self.config.alpha, self.config.m);
        Ok(())
    }

    fn process(&mut self, ws: &mut Workspace) -> Result<()> {
        let raw = ws.get::<Complex64>(RAW)?;
        let k = ws.get::<f64>(KSPACE)?;
        let d = self.image_dims.len();
        if k.dim(0) != d || k.size() % d != 0 {
            return Err(Error::Config {
                key: "dims".to_string(),
                reason: format!("trajectory has {} rows for a {}-D image", k.dim(0), d),
            });
        }
        let num_nodes = k.size() / d;
        let channels = raw.dim(1);
        if raw.dim(0) != num_nodes || raw.size() != num_nodes * channels {
            return Err(Error::Format {
                format: "workspace",
                reason: format!("raw data {:?} does not match {} nodes", &raw.dims()[..2], num_nodes),
            });
        }

        let mut plan = Nufft::new(&self.image_dims, num_nodes, &self.config);
        plan.set_trajectory(k);
        if let Ok(w) = ws.get::<f64>(HELPER) {
            plan.set_weights(w);
        }

        let image_len: usize = self.image_dims.iter().product();
        let mut extents = self.image_dims.clone();
        extents.push(channels);
        let mut image: MultiAxisArray<Complex64> = MultiAxisArray::from_extents(&extents);
        for c in 0..channels {
            let y = raw.column(c);
            let x = plan.adjoint(&y);
            image.as_mut_slice()[c * image_len..(c + 1) * image_len].copy_from_slice(x.as_slice());
        }
        info!("GenericRegrid: {} channel(s) regridded", channels);
        ws.insert(RAW, image);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims_parameter_is_checked() {
        let mut s = GenericRegrid::default();
        assert!(matches!(s.init(&Params::new()), Err(Error::Config { .. })));
        let p = Params::from_json_str(r#"{"dims": [16, 16, 16, 2]}"#).unwrap();
        assert!(s.init(&p).is_err());
        let p = Params::from_json_str(r#"{"dims": [16, 1]}"#).unwrap();
        assert!(s.init(&p).is_err());
    }

    #[test]
    fn test_regrids_each_channel() {
        let n = 8;
        let m = 40;
        let p = Params::from_json_str(r#"{"dims": [8, 8], "alpha": 2.0, "m": 3, "ftiter": 0}"#).unwrap();
        let mut s = GenericRegrid::default();
        s.init(&p).unwrap();

        let k = MultiAxisArray::from_fn(&[2, m], |i| ((i * 7) % 19) as f64 / 19.0 - 0.5);
        let raw = MultiAxisArray::from_fn(&[m, 2], |i| Complex64::new((i % 5) as f64, 1.0));
        let mut ws = Workspace::new();
        ws.insert(KSPACE, k.clone());
        ws.insert(RAW, raw.clone());
        s.process(&mut ws).unwrap();

        let image = ws.get::<Complex64>(RAW).unwrap();
        assert_eq!(&image.dims()[..3], &[n, n, 2]);

        let mut plan = Nufft::new(&[n, n], m, &NufftConfig { alpha: 2.0, m: 3, ft_iter: 0, ft_eps: 0.0 });
        plan.set_trajectory(&k);
        let second = plan.adjoint(&raw.column(1));
        assert_eq!(image.slice(1), second);
    }

    #[test]
    fn test_missing_trajectory() {
        let mut s = GenericRegrid::default();
        s.init(&Params::from_json_str(r#"{"dims": [4, 4]}"#).unwrap()).unwrap();
        let mut ws = Workspace::new();
        ws.insert(RAW, MultiAxisArray::<Complex64>::new1(4));
        assert!(matches!(s.process(&mut ws), Err(Error::MissingInput(n)) if n == KSPACE));
    }
}
