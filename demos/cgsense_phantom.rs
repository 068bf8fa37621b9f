//! CG-SENSE reconstruction of a simulated radial acquisition
//!
//! Usage: cargo run --release --example cgsense_phantom [output_dir]

use std::f64::consts::PI;
use std::path::PathBuf;
use std::time::Instant;

use num_complex::Complex64;
use recon_core::config::{Params, SenseConfig};
use recon_core::io::{self, nifti, Format};
use recon_core::solvers::CgSense;
use recon_core::strategy::{ReconContext, StaticLoader};
use recon_core::transport::RawPayload;
use recon_core::{LinearOperator, MultiAxisArray};
use tracing::info;
use tracing_subscriber::EnvFilter;

const N: usize = 64;
const COILS: usize = 8;
const SPOKES: usize = 96;

fn phantom(n: usize) -> MultiAxisArray<Complex64> {
    let c = (n as f64 - 1.0) / 2.0;
    let r = n as f64 * 0.4;
    let mut out = MultiAxisArray::new2(n, n);
    for j in 0..n {
        for i in 0..n {
            let x = (i as f64 - c) / r;
            let y = (j as f64 - c) / r;
            let mut v = 0.0;
            if x * x / 0.69 + y * y / 0.92 <= 1.0 {
                v = 1.0;
                if x * x / 0.62 + (y + 0.02).powi(2) / 0.84 <= 1.0 {
                    v = 0.3;
                }
                if (x - 0.22).powi(2) / 0.012 + y * y / 0.17 <= 1.0 {
                    v = 0.1;
                }
                if (x + 0.22).powi(2) / 0.026 + y * y / 0.25 <= 1.0 {
                    v = 0.1;
                }
                if x * x / 0.05 + (y - 0.35).powi(2) / 0.06 <= 1.0 {
                    v = 0.5;
                }
            }
            *out.at2_mut(i, j) = Complex64::new(v, 0.0);
        }
    }
    out
}

fn coil_maps(n: usize, nc: usize) -> MultiAxisArray<Complex64> {
    let mut s = MultiAxisArray::new3(n, n, nc);
    for c in 0..nc {
        let angle = 2.0 * PI * c as f64 / nc as f64;
        let (cx, cy) = (0.5 + 0.7 * angle.cos(), 0.5 + 0.7 * angle.sin());
        for j in 0..n {
            for i in 0..n {
                let dx = i as f64 / n as f64 - cx;
                let dy = j as f64 / n as f64 - cy;
                *s.at3_mut(i, j, c) = Complex64::from_polar((-(dx * dx + dy * dy) / 0.4).exp(), angle);
            }
        }
    }
    s
}

fn radial(spokes: usize, samples: usize) -> MultiAxisArray<f64> {
    let mut k = MultiAxisArray::new2(2, spokes * samples);
    for s in 0..spokes {
        let angle = PI * s as f64 / spokes as f64;
        for t in 0..samples {
            let r = (t as f64 - samples as f64 / 2.0) / samples as f64;
            *k.at2_mut(0, s * samples + t) = r * angle.cos();
            *k.at2_mut(1, s * samples + t) = r * angle.sin();
        }
    }
    k
}

/// Ram-Lak style density compensation for radial spokes
fn ramp_weights(k: &MultiAxisArray<f64>) -> MultiAxisArray<f64> {
    let m = k.dim(1);
    MultiAxisArray::from_fn(&[m], |j| {
        let r = (k.at2(0, j).powi(2) + k.at2(1, j).powi(2)).sqrt();
        r.max(0.5 / m as f64)
    })
}

fn main() -> recon_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let output_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| std::env::temp_dir().join("cgsense_phantom"));
    std::fs::create_dir_all(&output_dir)?;

    let total_start = Instant::now();

    // ========================================================================
    // Simulate acquisition
    // ========================================================================
    let truth = phantom(N);
    let sens = coil_maps(N, COILS);
    let k = radial(SPOKES, 2 * N);
    let weights = ramp_weights(&k);

    let mut params = Params::new();
    params.set("alpha", 2.0)?;
    params.set("m", 3)?;
    params.set("ftiter", 0)?;
    params.set("cgiter", 30)?;
    params.set("cgeps", 1e-8)?;
    params.set("lambda", 1e-4)?;

    let mut sim = CgSense::new(sens.clone(), k.dim(1), &SenseConfig::from_params(&params)?)?;
    sim.set_trajectory(&k);
    let data = sim.encoding().trafo(&truth);
    info!("Simulated {} samples on {} coils", k.dim(1), COILS);

    // ========================================================================
    // Reconstruct through the strategy context
    // ========================================================================
    let start = Instant::now();
    let mut ctx = ReconContext::new(StaticLoader::with_builtin(), "CGSENSE")?;
    ctx.init(&params)?;
    ctx.set_rhelper(&RawPayload::from_array(&sens))?;
    ctx.set_kspace(&RawPayload::from_array(&k))?;
    ctx.set_helper(&RawPayload::from_array(&weights))?;
    ctx.set_raw(&RawPayload::from_array(&data))?;
    ctx.run()?;
    let image = ctx.get_raw()?.to_array::<Complex64>()?;
    info!("Reconstructed in {:.2?}", start.elapsed());

    let err = (&image - &truth).norm() / truth.norm();
    info!("Relative error {:.4}", err);

    // ========================================================================
    // Save results
    // ========================================================================
    let session = output_dir.join("session.rcds");
    io::write(&session, "truth", "/sim", &truth, Format::Container)?;
    io::write(&session, "sens", "/sim", &sens, Format::Container)?;
    io::write(&session, "image", "/recon", &image, Format::Container)?;

    let magnitude = image.map(|v| v.norm());
    nifti::write_nifti_file(&output_dir.join("magnitude.nii.gz"), &magnitude)?;

    info!("Wrote results to {} in {:.2?}", output_dir.display(), total_start.elapsed());
    Ok(())
}
