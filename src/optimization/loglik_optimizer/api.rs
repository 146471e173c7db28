//! High-level entry point for maximizing a `LogLikelihood`.
//!
//! This selects an L-BFGS solver with either Hager–Zhang or More–Thuente line
//! search, wraps the objective in an `ArgMinAdapter` (which *minimizes*
//! `-ℓ(θ)`), and delegates the run to `run_lbfgs`.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` using L-BFGS with the chosen line search.
///
/// # Behavior
/// - Validates the initial guess via `f.check(&theta0, data)`.
/// - Wraps `(f, data)` in an `ArgMinAdapter` exposing `c(θ) = -ℓ(θ)`.
/// - Builds the solver selected by `opts.line_searcher` and runs it.
///
/// # Errors
/// - Propagates errors from `f.check`, the builders, and `run_lbfgs`.
///
/// # Example
/// ```no_run
/// use cmix::optimization::{
///     errors::OptResult,
///     loglik_optimizer::{LogLikelihood, MLEOptions, Theta, Grad, maximize},
/// };
/// use ndarray::array;
///
/// struct Bowl;
/// impl LogLikelihood for Bowl {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
///     fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
///         Ok(theta.mapv(|t| -2.0 * t))
///     }
/// }
///
/// let out = maximize(&Bowl, array![0.5, -0.25], &(), &MLEOptions::default())?;
/// assert!(out.theta_hat.iter().all(|t| t.abs() < 1e-4));
/// # Ok::<(), cmix::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}
