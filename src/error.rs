//! Error types for recon-core
//!
//! Precondition violations on arrays (zero extents, shape mismatch,
//! non-dyadic wavelet input, uninitialised operators) are panics. Everything
//! that depends on data or the environment comes back as an [`Error`].

use thiserror::Error;

/// Result type alias using recon-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in recon-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Matrix is singular to working precision (LU pivot `info` is negligible)
    #[error("Matrix is singular: U({info},{info}) is negligible")]
    Singular {
        /// 1-based index of the failing pivot
        info: i32,
    },

    /// Cholesky factorisation hit a non-positive leading minor
    #[error("Matrix is not positive definite: leading minor of order {info} is not positive")]
    NotPositiveDefinite {
        /// Order of the failing leading minor
        info: i32,
    },

    /// An iterative decomposition did not converge
    #[error("Decomposition failed to converge ({info} values unresolved)")]
    NoConvergence {
        /// Number of unresolved values
        info: i32,
    },

    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File content does not match the expected layout
    #[error("Invalid {format} data: {reason}")]
    Format {
        /// Format name
        format: &'static str,
        /// What went wrong
        reason: String,
    },

    /// Named dataset is absent from a container
    #[error("Dataset '{location}/{name}' not found")]
    DatasetNotFound {
        /// Dataset name
        name: String,
        /// Group path inside the container
        location: String,
    },

    /// Configuration value missing or of the wrong type
    #[error("Configuration error for '{key}': {reason}")]
    Config {
        /// Parameter key
        key: String,
        /// What went wrong
        reason: String,
    },

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Strategy module not registered with the loader
    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    /// Module does not export the requested symbol
    #[error("Symbol '{symbol}' not found in module '{module}'")]
    SymbolNotFound {
        /// Module name
        module: String,
        /// Symbol name
        symbol: String,
    },

    /// Factory returned no strategy
    #[error("Module '{0}' did not produce a strategy")]
    NullStrategy(String),

    /// Strategy expected a named array that the workspace does not hold
    #[error("Missing input array '{0}'")]
    MissingInput(String),
}

impl Error {
    /// Status code carried by numerical kernel failures; 0 for other errors
    pub fn info(&self) -> i32 {
        match self {
            Error::Singular { info }
            | Error::NotPositiveDefinite { info }
            | Error::NoConvergence { info } => *info,
            _ => 0,
        }
    }
}
