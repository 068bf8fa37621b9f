//! CGLS with Tikhonov regularisation
//!
//! Conjugate gradients on `(A^H A + λI) x = A^H b`, starting from `x = 0`.
//! The relative residual `rn / xn` compares `‖r‖²` with `‖A^H b‖²`.
//!
//! Reference:
//! Hestenes & Stiefel, "Methods of conjugate gradients for solving linear
//! systems", J. Res. NBS 1952.

use super::{SolverOutcome, Termination};
use crate::array::{MultiAxisArray, Scalar};
use crate::config::CgConfig;
use crate::operators::LinearOperator;
use tracing::{debug, warn};

/// Solve `min ‖A x - b‖² + λ‖x‖²`
///
/// # Arguments
/// * `op` - Operator providing `A` (`trafo`) and `A^H` (`adjoint`)
/// * `b` - Right-hand side in the range of `A`
/// * `config` - Iteration cap, residual threshold, `λ` and iterate recording
pub fn cgls<T, A>(op: &A, b: &MultiAxisArray<T>, config: &CgConfig) -> SolverOutcome<T>
where
    T: Scalar,
    A: LinearOperator<T> + ?Sized,
{
    cgls_with_progress(op, b, config, |_, _, _| {})
}

/// Same as [`cgls`] but calls `progress_callback(iteration, max_iter, residual)`
/// at the start of every pass.
pub fn cgls_with_progress<T, A, F>(
    op: &A,
    b: &MultiAxisArray<T>,
    config: &CgConfig,
    mut progress_callback: F,
) -> SolverOutcome<T>
where
    T: Scalar,
    A: LinearOperator<T> + ?Sized,
    F: FnMut(usize, usize, f64),
{
    let lambda = T::from_real(config.lambda);

    let mut r = op.adjoint(b);
    let mut p = r.clone();
    let mut x: MultiAxisArray<T> = MultiAxisArray::new(r.dims());

    let xn = r.norm().powi(2);
    let mut rn = xn;

    let mut iterations = 0;
    let mut residuals = Vec::new();
    let mut iterates = Vec::new();

    let termination = loop {
        let ratio = rn / xn;
        residuals.push(ratio);
        progress_callback(iterations, config.max_iter, ratio);

        if ratio.is_nan() {
            warn!("CGLS diverged after {} iterations", iterations);
            break Termination::Diverged;
        }
        if ratio <= config.eps {
            debug!("CGLS converged after {} iterations: {:.3e}", iterations, ratio);
            break Termination::Converged;
        }
        if iterations == config.max_iter {
            warn!("CGLS reached {} iterations with residual {:.3e}", iterations, ratio);
            break Termination::MaxIterReached;
        }

        // q = (A^H A + λ) p
        let mut q = op.adjoint(&op.trafo(&p));
        q.axpy(lambda, &p);

        let alpha = T::from_real(rn) / p.dotc(&q);
        x.axpy(alpha, &p);
        r.axpy(-alpha, &q);

        let rn_new = r.norm().powi(2);
        p.xpby(&r, T::from_real(rn_new / rn));
        rn = rn_new;
        iterations += 1;

        if config.keep_iterates {
            iterates.push(x.clone());
        }
        debug!("CGLS iteration {}: residual {:.3e}", iterations, rn / xn);
    };

    SolverOutcome { x, iterations, residuals, termination, iterates }
}
