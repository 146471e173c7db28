//! Execution helper that runs an `argmin` solver on a log-likelihood problem and
//! returns a crate-friendly [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run an `argmin` optimization for a log-likelihood problem.
///
/// Shared runner for both line-search variants. It moves `theta0` into the
/// executor state, applies `opts.tols.max_iter`, optionally attaches the
/// slog observer, runs the solver and converts the final state into an
/// [`OptimOutcome`] expressed in log-likelihood terms (`value = -best_cost`).
///
/// # Feature flags
/// With `obs_slog` enabled and `opts.verbose == true`, a terminal slog
/// observer is attached with `ObserverMode::Always` and the starting
/// objective is logged at `info` level.
///
/// # Errors
/// - Propagates any `argmin` runtime error (solver errors, line-search
///   failures, errors raised by the objective) via
///   `From<argmin::core::Error>`.
/// - Propagates validation errors from [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let num_params = theta0.len();
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    log::debug!(
        "L-BFGS over {num_params} parameters finished after {iterations} iterations: {termination:?}"
    );
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let start = -problem.cost(theta0)?;
    match problem.gradient(theta0) {
        Ok(g) => log::info!("L-BFGS start: objective {start:.6}, |grad| {:.6}", g.l2_norm()),
        Err(_) => log::info!("L-BFGS start: objective {start:.6}"),
    }
    Ok(())
}
