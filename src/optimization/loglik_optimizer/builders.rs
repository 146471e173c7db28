//! loglik_optimizer::builders: L-BFGS solver construction helpers.
//!
//! Purpose
//! -------
//! Hide Argmin's generic wiring behind two builders (one per supported line
//! search) that apply the crate-level options: history size and the
//! gradient / cost-change tolerances. Initial parameters and the iteration
//! cap are runtime concerns applied by [`run_lbfgs`](super::run::run_lbfgs).
//!
//! Conventions
//! -----------
//! - The L-BFGS memory is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`]. The
//!   conditional mixture trainer forwards its `num_grad` setting here.
//! - Any tolerance Argmin rejects surfaces as an [`OptError`](crate::optimization::errors::OptError)
//!   through the `From<argmin::core::Error>` conversion.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// Construct L-BFGS with Hager–Zhang line search and the configured
/// tolerances.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let hager_zhang = HagerZhangLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsHagerZhang::new(hager_zhang, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Construct L-BFGS with More–Thuente line search and the configured
/// tolerances.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let more_thuente = MoreThuenteLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsMoreThuente::new(more_thuente, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Apply optional tolerances to an L-BFGS solver, regardless of its line
/// search. Absent tolerances leave Argmin's defaults in effect.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
