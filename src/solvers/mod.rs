//! Conjugate-gradient least-squares solvers
//!
//! Both solvers minimise `‖A x - b‖² + λ‖x‖²` through the normal equations
//! and report how they stopped through [`Termination`]. Hitting the
//! iteration cap or diverging is not an error: the best estimate so far is
//! always returned.

pub mod cgls;
pub mod cgsense;

pub use cgls::{cgls, cgls_with_progress};
pub use cgsense::CgSense;

use crate::array::MultiAxisArray;

/// Terminal state of a solver run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative residual fell to `eps`
    Converged,
    MaxIterReached,
    /// The residual ratio became NaN
    Diverged,
}

/// Result of a solver run
#[derive(Debug, Clone)]
pub struct SolverOutcome<T> {
    pub x: MultiAxisArray<T>,
    /// Number of updates applied to `x`
    pub iterations: usize,
    /// Relative residual `rn / xn` seen at the start of every pass
    pub residuals: Vec<f64>,
    pub termination: Termination,
    /// `x` after every update, when requested
    pub iterates: Vec<MultiAxisArray<T>>,
}

impl<T> SolverOutcome<T> {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}
