//! loglik_optimizer: argmin-powered L-BFGS optimizer for log-likelihoods.
//!
//! Purpose
//! -------
//! Provide the quasi-Newton layer that model code drives through a single
//! trait, [`LogLikelihood`], and a single entry point, [`maximize`]. The
//! optimizer owns the iteration loop; models only expose "evaluate objective
//! and gradient at θ" together with a fixed parameter-vector layout.
//!
//! Key behaviors
//! -------------
//! - Convert log-likelihoods `ℓ(θ)` into Argmin cost functions
//!   `c(θ) = -ℓ(θ)` via [`adapter::ArgMinAdapter`].
//! - Select an L-BFGS solver via [`builders`] based on
//!   [`traits::LineSearcher`], execute it via [`run::run_lbfgs`], and
//!   normalize results into an [`OptimOutcome`].
//! - Provide finite-difference helpers in [`finite_diff`]: a fallback
//!   gradient for objectives without analytic derivatives and the
//!   central-difference gradient checker used to verify analytic ones.
//! - Centralize configuration ([`Tolerances`], [`MLEOptions`]) and
//!   validation logic ([`validation`]).
//!
//! Conventions
//! -----------
//! - Parameters live in a flat unconstrained vector [`Theta`]; any mapping
//!   to structured model parameters happens in the model layer.
//! - Gradients returned by [`LogLikelihood::grad`] are for `ℓ`; the adapter
//!   flips signs for the cost.
//! - Errors bubble up as [`OptResult<T>`](crate::optimization::errors::OptResult);
//!   this module never intentionally panics.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; end-to-end runs are exercised
//!   by the conditional mixture training tests.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::finite_diff::gradient_check_error;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
