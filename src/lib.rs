//! recon-core: arrays, operators and solvers for MRI reconstruction
//!
//! This crate provides the numerical substrate of a strategy-based image
//! reconstruction framework.
//!
//! # Modules
//! - `array`: 16-axis column-major arrays and elementwise algebra
//! - `linalg`: matrix products, inverses, decompositions, least squares
//! - `fft`: 1/2/3-D FFT workspace using rustfft
//! - `operators`: NUFFT, finite differences, wavelets, SENSE encoding
//! - `solvers`: CGLS and CG-SENSE
//! - `io`: container, NIfTI and raw file formats
//! - `transport`: flat payloads for moving arrays between processes
//! - `strategy`: reconstruction strategies, module loader and context
//! - `workspace`: named arrays shared with strategies
//! - `config`: parameter container and typed operator settings

// Core modules
pub mod array;
pub mod error;
pub mod fft;
pub mod linalg;

// Algorithm modules
pub mod operators;
pub mod solvers;

// Configuration and plumbing
pub mod config;
pub mod io;
pub mod strategy;
pub mod transport;
pub mod workspace;

pub use array::{Axis, ComplexScalar, Element, ElementKind, Mask, MultiAxisArray, Scalar, AXES};
pub use config::Params;
pub use error::{Error, Result};
pub use operators::LinearOperator;
pub use solvers::{SolverOutcome, Termination};

/// Element count above which elementwise loops go parallel
pub const MIN_PARALLEL_LEN: usize = 1 << 15;
