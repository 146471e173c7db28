//! mcbm: conditional mixture of experts for binary outputs.
//!
//! Purpose
//! -------
//! Model `p(y | x)` for a bit `y` and a real input vector `x` with `K`
//! experts whose energies combine squared projections through a shared
//! feature bank with linear input and output terms. Training is gradient
//! based: an analytic gradient engine feeds the crate's L-BFGS optimizer.
//!
//! Key behaviors
//! -------------
//! - [`MCBM`] implements
//!   [`ConditionalDistribution`](crate::distribution::ConditionalDistribution)
//!   (`sample`, `log_likelihood`, `evaluate` in bits per output bit).
//! - `compute_gradient` evaluates the average log-likelihood in bits per
//!   sample and its gradient for any subset of the six parameter groups,
//!   in column batches of `batch_size`.
//! - `check_gradient` compares the analytic gradient with central
//!   differences of the same objective.
//! - `train` drives L-BFGS through [`MCBMObjective`] and reports whether
//!   the optimizer converged.
//!
//! Invariants & assumptions
//! ------------------------
//! - Array shapes are fixed at construction: priors `K`, weights `K × F`,
//!   features `D × F`, predictors `K × D`, input biases `D × K`, output
//!   biases `K`.
//! - Flattened vectors follow [`ParamLayout`]: trainable groups only, in
//!   the order of [`ParamGroup::ALL`], each row-major.
//! - Outputs are exactly `0.0` or `1.0`.
//!
//! Conventions
//! -----------
//! - Batches hold one sample per column.
//! - Non-convergence is a `false` return from `train`, not an error.
//! - Training progress is logged through `log` when `verbosity > 0`.
//!
//! Testing notes
//! -------------
//! - Unit tests sit next to each submodule. Integration tests check the
//!   gradient for every subset of trainable groups, batch-size invariance,
//!   end-to-end training on separable data, and callback early stopping.

pub mod core;
pub mod errors;
pub mod models;

pub use self::core::{MCBMData, MCBMParams, ParamGroup, ParamLayout, TrainingCallback};
pub use self::errors::{MCBMError, MCBMResult};
pub use self::models::{MCBM, MCBMObjective};

pub mod prelude {
    pub use super::core::{MCBMData, MCBMParams, ParamGroup, TrainingCallback};
    pub use super::errors::{MCBMError, MCBMResult};
    pub use super::models::MCBM;
    pub use crate::distribution::ConditionalDistribution;
}
